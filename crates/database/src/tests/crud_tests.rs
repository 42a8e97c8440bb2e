use anyhow::Result;
use common::{ids, Classify, ErrorKind};
use configs::FailurePolicy;
use sea_orm::{IntoActiveModel, Set};

use super::account;
use super::sqlite_store;
use crate::StoreError;

fn account(id: &str, name: &str, created_at: i64) -> account::ActiveModel {
    account::ActiveModel {
        id: Set(id.to_string()),
        name: Set(name.to_string()),
        email: Set(format!("{name}@example.com")),
        created_at: Set(created_at),
    }
}

#[tokio::test]
async fn test_create_generates_prefixed_id() -> Result<()> {
    let store = sqlite_store("usr", FailurePolicy::Propagate).await?;

    let id = store.create(account("", "a", 1)).await?;
    assert!(ids::is_generated(&id, "usr"), "unexpected id {id}");

    let found = store.find_by_id::<account::Entity>(&id).await?;
    assert_eq!(found.id, id);
    assert_eq!(found.name, "a");
    Ok(())
}

#[tokio::test]
async fn test_create_generates_id_when_key_unset() -> Result<()> {
    for policy in [FailurePolicy::Propagate, FailurePolicy::LogOnly] {
        let store = sqlite_store("usr", policy).await?;
        let record = account::ActiveModel {
            name: Set("a".into()),
            email: Set("e".into()),
            created_at: Set(1),
            ..Default::default()
        };

        let id = store.create(record).await?;
        assert!(ids::is_generated(&id, "usr"), "unexpected id {id}");
        assert_eq!(store.find_by_id::<account::Entity>(&id).await?.name, "a");
    }
    Ok(())
}

#[tokio::test]
async fn test_create_keeps_caller_id() -> Result<()> {
    let store = sqlite_store("usr", FailurePolicy::Propagate).await?;

    let id = store.create(account("fixed-1", "b", 1)).await?;
    assert_eq!(id, "fixed-1");

    let found = store.find_by_id::<account::Entity>("fixed-1").await?;
    assert_eq!(
        found,
        account::Model { id: "fixed-1".into(), name: "b".into(), email: "b@example.com".into(), created_at: 1 }
    );
    Ok(())
}

#[tokio::test]
async fn test_create_from_model() -> Result<()> {
    let store = sqlite_store("", FailurePolicy::Propagate).await?;
    let model = account::Model { id: "m-1".into(), name: "m".into(), email: "m@example.com".into(), created_at: 7 };

    store.create(model.clone().into_active_model()).await?;
    assert_eq!(store.find_by_id::<account::Entity>("m-1").await?, model);
    Ok(())
}

#[tokio::test]
async fn test_update_changes_only_set_fields() -> Result<()> {
    let store = sqlite_store("usr", FailurePolicy::Propagate).await?;
    let id = store.create(account("", "before", 5)).await?;
    let target = store.find_by_id::<account::Entity>(&id).await?;

    let patch = account::ActiveModel { name: Set("after".into()), ..Default::default() };
    store.update(&target, patch).await?;

    let found = store.find_by_id::<account::Entity>(&id).await?;
    assert_eq!(found.name, "after");
    assert_eq!(found.email, "before@example.com");
    assert_eq!(found.created_at, 5);
    Ok(())
}

#[tokio::test]
async fn test_update_with_empty_patch_is_rejected() -> Result<()> {
    let store = sqlite_store("usr", FailurePolicy::LogOnly).await?;
    let id = store.create(account("", "a", 1)).await?;
    let target = store.find_by_id::<account::Entity>(&id).await?;

    let err = store.update(&target, account::ActiveModel::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn test_delete_then_find_is_not_found() -> Result<()> {
    let store = sqlite_store("usr", FailurePolicy::Propagate).await?;
    let id = store.create(account("", "gone", 1)).await?;
    let target = store.find_by_id::<account::Entity>(&id).await?;

    store.delete(&target).await?;

    let err = store.find_by_id::<account::Entity>(&id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_find_missing_id_is_not_found() -> Result<()> {
    let store = sqlite_store("usr", FailurePolicy::LogOnly).await?;

    let err = store.find_by_id::<account::Entity>("usr_missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_query_filters_and_orders() -> Result<()> {
    let store = sqlite_store("usr", FailurePolicy::Propagate).await?;
    store.create(account("", "a", 10)).await?;
    store.create(account("", "a", 30)).await?;
    store.create(account("", "b", 20)).await?;
    store.create(account("", "a", 20)).await?;

    let rows = store
        .query::<account::Entity>("name = ?", "created_at desc", vec!["a".into()])
        .await?;
    let times: Vec<i64> = rows.iter().map(|r| r.created_at).collect();
    assert_eq!(times, vec![30, 20, 10]);
    assert!(rows.iter().all(|r| r.name == "a"));

    let all = store.query::<account::Entity>("", "", vec![]).await?;
    assert_eq!(all.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_query_rejects_bad_order() -> Result<()> {
    let store = sqlite_store("usr", FailurePolicy::Propagate).await?;

    let err = store
        .query::<account::Entity>("", "name; drop table accounts", vec![])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn test_exec_runs_parameterized_statement() -> Result<()> {
    let store = sqlite_store("usr", FailurePolicy::Propagate).await?;
    let id = store.create(account("", "a", 1)).await?;

    store
        .exec("UPDATE accounts SET email = ? WHERE id = ?", vec!["x@example.com".into(), id.clone().into()])
        .await?;

    let found = store.find_by_id::<account::Entity>(&id).await?;
    assert_eq!(found.email, "x@example.com");
    Ok(())
}

#[tokio::test]
async fn test_drop_table() -> Result<()> {
    let store = sqlite_store("usr", FailurePolicy::Propagate).await?;
    store.drop_table().await?;

    let err = store.query::<account::Entity>("", "", vec![]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    // a second drop is a no-op
    store.drop_table().await?;
    Ok(())
}

#[tokio::test]
async fn test_new_id_is_unique_with_single_separator() -> Result<()> {
    let store = sqlite_store("", FailurePolicy::Propagate).await?;
    let a = store.new_id("ord");
    let b = store.new_id("ord");
    assert_ne!(a, b);
    assert_eq!(a.matches('_').count(), 1);
    assert!(!store.new_id("").contains('_'));
    Ok(())
}
