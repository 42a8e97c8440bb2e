fn main() {
    let health = tonic_build::manual::Service::builder()
        .name("Health")
        .package("svckit.health")
        .method(
            tonic_build::manual::Method::builder()
                .name("check")
                .route_name("Check")
                .input_type("crate::health::HealthCheckRequest")
                .output_type("crate::health::HealthCheckResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[health]);
}
