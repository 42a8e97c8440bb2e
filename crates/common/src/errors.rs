//! Error kinds and their translation to gRPC statuses
//!
//! [`ErrorTranslator`] logs a failure at the severity its kind calls for and
//! hands back the `tonic::Status` to return to the remote caller. It performs
//! no retry and no recovery.

use std::fmt::{self, Display};

use tonic::{Code, Status};
use tracing::Level;

use crate::logger::{Fields, Logger};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Internal,
    NotFound,
    AlreadyExists,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::Validation,
        ErrorKind::Internal,
        ErrorKind::NotFound,
        ErrorKind::AlreadyExists,
    ];

    /// Wire status for this kind.
    pub fn code(self) -> Code {
        match self {
            ErrorKind::Validation => Code::InvalidArgument,
            ErrorKind::Internal => Code::Internal,
            ErrorKind::NotFound => Code::NotFound,
            ErrorKind::AlreadyExists => Code::AlreadyExists,
        }
    }

    /// Severity used when logging a failure of this kind.
    pub fn level(self) -> Level {
        match self {
            ErrorKind::Internal => Level::ERROR,
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::AlreadyExists => Level::WARN,
        }
    }

    /// Value of the `error.kind` log field.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Internal => "InternalError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::AlreadyExists => "AlreadyExistsError",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by error types that know which [`ErrorKind`] they belong to.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

#[derive(Clone, Debug)]
pub struct ErrorTranslator {
    service_name: String,
    logger: Logger,
}

impl ErrorTranslator {
    pub fn new(service_name: impl Into<String>, logger: Logger) -> Self {
        Self { service_name: service_name.into(), logger }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn not_found(&self, fields: &Fields) -> Status {
        let msg = format!("{} not found", self.service_name);
        self.log(ErrorKind::NotFound, &msg, None, fields);
        Status::new(ErrorKind::NotFound.code(), msg)
    }

    pub fn already_exists(&self, fields: &Fields) -> Status {
        let msg = format!("{} already exists", self.service_name);
        self.log(ErrorKind::AlreadyExists, &msg, None, fields);
        Status::new(ErrorKind::AlreadyExists.code(), msg)
    }

    pub fn internal<E: Display + ?Sized>(&self, err: &E, fields: &Fields) -> Status {
        let msg = format!("{} got an internal error", self.service_name);
        let cause = err.to_string();
        self.log(ErrorKind::Internal, &msg, Some(&cause), fields);
        Status::new(ErrorKind::Internal.code(), cause)
    }

    pub fn invalid_argument<E: Display + ?Sized>(&self, err: &E, fields: &Fields) -> Status {
        let cause = err.to_string();
        self.log(ErrorKind::Validation, "request validation failed", Some(&cause), fields);
        Status::new(ErrorKind::Validation.code(), cause)
    }

    /// Log and translate any classified error.
    pub fn translate<E>(&self, err: &E, fields: &Fields) -> Status
    where
        E: Classify + Display + ?Sized,
    {
        match err.kind() {
            ErrorKind::Validation => self.invalid_argument(err, fields),
            ErrorKind::Internal => self.internal(err, fields),
            ErrorKind::NotFound => self.not_found(&fields.clone().with("reason", err)),
            ErrorKind::AlreadyExists => self.already_exists(&fields.clone().with("reason", err)),
        }
    }

    /// Log a classified error without building a status.
    pub fn report<E>(&self, err: &E, fields: &Fields)
    where
        E: Classify + Display + ?Sized,
    {
        let _ = self.translate(err, fields);
    }

    fn log(&self, kind: ErrorKind, msg: &str, cause: Option<&str>, fields: &Fields) {
        let service = self.service_name.as_str();
        let cause = cause.unwrap_or_default();
        self.logger.span().in_scope(|| {
            if kind.level() == Level::ERROR {
                tracing::error!(error.kind = kind.as_str(), %service, context = %fields, error = cause, "{msg}");
            } else {
                tracing::warn!(error.kind = kind.as_str(), %service, context = %fields, error = cause, "{msg}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Missing;

    impl Display for Missing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("no rows")
        }
    }

    impl Classify for Missing {
        fn kind(&self) -> ErrorKind {
            ErrorKind::NotFound
        }
    }

    fn translator() -> ErrorTranslator {
        ErrorTranslator::new("user", Logger::named("user"))
    }

    #[test]
    fn codes_are_stable_per_kind() {
        for kind in ErrorKind::ALL {
            assert_eq!(kind.code(), kind.code());
        }
        assert_eq!(ErrorKind::Validation.code(), Code::InvalidArgument);
        assert_eq!(ErrorKind::Internal.code(), Code::Internal);
        assert_eq!(ErrorKind::NotFound.code(), Code::NotFound);
        assert_eq!(ErrorKind::AlreadyExists.code(), Code::AlreadyExists);
    }

    #[test]
    fn expected_outcomes_never_log_at_error() {
        assert_eq!(ErrorKind::NotFound.level(), Level::WARN);
        assert_eq!(ErrorKind::AlreadyExists.level(), Level::WARN);
        assert_eq!(ErrorKind::Validation.level(), Level::WARN);
        assert_eq!(ErrorKind::Internal.level(), Level::ERROR);
    }

    #[test]
    fn statuses_carry_messages() {
        let t = translator();
        let fields = Fields::new().with("id", "usr_1");

        let nf = t.not_found(&fields);
        assert_eq!(nf.code(), Code::NotFound);
        assert_eq!(nf.message(), "user not found");

        let ae = t.already_exists(&fields);
        assert_eq!(ae.code(), Code::AlreadyExists);
        assert_eq!(ae.message(), "user already exists");

        let internal = t.internal("connection reset", &fields);
        assert_eq!(internal.code(), Code::Internal);
        assert_eq!(internal.message(), "connection reset");

        let invalid = t.invalid_argument("name required", &Fields::new());
        assert_eq!(invalid.code(), Code::InvalidArgument);
        assert_eq!(invalid.message(), "name required");
    }

    #[test]
    fn translate_dispatches_on_kind() {
        let status = translator().translate(&Missing, &Fields::new());
        assert_eq!(status.code(), Code::NotFound);
    }
}
