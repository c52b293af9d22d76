//! Integration tests for the read-write repository surface.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use docstore::contracts::*;
use docstore::store::StoreOp;
use docstore::{
    CancellationToken, CollectionLink, CollectionSettings, CrudRepository, Entity, InMemoryStore,
    ProvisioningState, RepositoryError, ResourceKind, StoreError,
};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Todo {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    title: String,
    done: bool,
}

impl Entity for Todo {
    fn document_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

fn todo(title: &str) -> Todo {
    Todo {
        id: None,
        title: title.to_string(),
        done: false,
    }
}

fn repository(store: &InMemoryStore) -> CrudRepository<Todo> {
    CrudRepository::new("shop", "orders", Arc::new(store.clone()), None)
}

async fn provisioned(store: &InMemoryStore) -> CrudRepository<Todo> {
    let repo = repository(store);
    repo.ready(&CancellationToken::new()).await.unwrap();
    repo
}

#[tokio::test]
async fn test_add_assigns_system_fields() {
    let store = InMemoryStore::new();
    let repo = provisioned(&store).await;
    let cancel = CancellationToken::new();

    let created = repo.add(&todo("Test1"), &cancel).await.unwrap();

    assert!(created.id().is_some());
    assert!(created.etag().is_some());
    assert!(created.timestamp().is_some());
    assert_eq!(created.get("title"), Some(&json!("Test1")));
    assert_eq!(created.get("done"), Some(&json!(false)));
}

#[tokio::test]
async fn test_store_and_retrieve_lifecycle() {
    let store = InMemoryStore::new();
    let repo = provisioned(&store).await;
    let cancel = CancellationToken::new();

    // Create
    let created = repo.add(&todo("Test1"), &cancel).await.unwrap();
    let id = created.id().unwrap().to_string();

    // Retrieve by id
    let fetched = repo.get(&id, &cancel).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Test1");
    assert!(!fetched.done);
    assert_eq!(fetched.id.as_deref(), Some(id.as_str()));

    // Delete, then the read comes back empty
    repo.delete(&id, &cancel).await.unwrap();
    assert!(repo.get(&id, &cancel).await.unwrap().is_none());

    // Drop the whole collection; point reads now surface the fault
    repo.delete_all(&cancel).await.unwrap();
    let result = repo.get(&id, &cancel).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Store(StoreError::NotFound {
            kind: ResourceKind::Collection,
            ..
        }))
    ));
}

#[tokio::test]
async fn test_get_missing_document_returns_none() {
    let store = InMemoryStore::new();
    let repo = provisioned(&store).await;
    let cancel = CancellationToken::new();

    let fetched = repo.get("does-not-exist", &cancel).await.unwrap();
    assert!(fetched.is_none());
}

#[tokio::test]
async fn test_add_honors_embedded_id_and_rejects_duplicates() {
    let store = InMemoryStore::new();
    let repo = provisioned(&store).await;
    let cancel = CancellationToken::new();

    let entity = Todo {
        id: Some("todo-1".to_string()),
        title: "Pinned".to_string(),
        done: false,
    };

    let created = repo.add(&entity, &cancel).await.unwrap();
    assert_eq!(created.id(), Some("todo-1"));

    let result = repo.add(&entity, &cancel).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Store(StoreError::Conflict(_)))
    ));
}

#[tokio::test]
async fn test_update_replaces_document_at_address() {
    let store = InMemoryStore::new();
    let repo = provisioned(&store).await;
    let cancel = CancellationToken::new();

    let id = repo
        .add(&todo("Draft"), &cancel)
        .await
        .unwrap()
        .id()
        .unwrap()
        .to_string();

    let updated = Todo {
        id: None,
        title: "Final".to_string(),
        done: true,
    };
    let replaced = repo.update(&id, &updated, &cancel).await.unwrap();

    // The address wins over whatever the body carries
    assert_eq!(replaced.id(), Some(id.as_str()));
    let fetched = repo.get(&id, &cancel).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Final");
    assert!(fetched.done);

    let result = repo.update("missing", &updated, &cancel).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Store(StoreError::NotFound {
            kind: ResourceKind::Document,
            ..
        }))
    ));
}

#[tokio::test]
async fn test_update_entity_requires_embedded_id() {
    let store = InMemoryStore::new();
    let repo = provisioned(&store).await;
    let cancel = CancellationToken::new();

    let created = repo
        .add(
            &Todo {
                id: Some("todo-7".to_string()),
                title: "Draft".to_string(),
                done: false,
            },
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(created.id(), Some("todo-7"));

    let revised = Todo {
        id: Some("todo-7".to_string()),
        title: "Revised".to_string(),
        done: false,
    };
    repo.update_entity(&revised, &cancel).await.unwrap();
    let fetched = repo.get("todo-7", &cancel).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Revised");

    // Without an id there is nothing to address
    let result = repo.update_entity(&todo("Anonymous"), &cancel).await;
    assert!(matches!(result, Err(RepositoryError::InvalidEntity(_))));
}

#[tokio::test]
async fn test_upsert_inserts_then_replaces() {
    let store = InMemoryStore::new();
    let repo = provisioned(&store).await;
    let cancel = CancellationToken::new();

    let inserted = repo.upsert("todo-9", &todo("First"), &cancel).await.unwrap();
    assert_eq!(inserted.id(), Some("todo-9"));
    assert_eq!(repo.count(&cancel).await.unwrap(), 1);

    repo.upsert("todo-9", &todo("Second"), &cancel).await.unwrap();
    assert_eq!(repo.count(&cancel).await.unwrap(), 1);

    let fetched = repo.get("todo-9", &cancel).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Second");
}

#[tokio::test]
async fn test_delete_missing_document_errors() {
    let store = InMemoryStore::new();
    let repo = provisioned(&store).await;
    let cancel = CancellationToken::new();

    let result = repo.delete("does-not-exist", &cancel).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Store(StoreError::NotFound {
            kind: ResourceKind::Document,
            ..
        }))
    ));
}

#[tokio::test]
async fn test_update_collection_settings() {
    let store = InMemoryStore::new();
    let repo = provisioned(&store).await;
    let cancel = CancellationToken::new();

    let info = repo.collection_info(&cancel).await.unwrap();
    assert_eq!(info.database_id, "shop");
    assert_eq!(info.collection_id, "orders");
    assert_eq!(info.document_count, 0);
    assert!(info.settings.default_ttl_seconds.is_none());

    let settings = CollectionSettings {
        partition_key_path: Some("/tenant".to_string()),
        default_ttl_seconds: Some(3600),
    };
    let updated = repo.update_collection(&settings, &cancel).await.unwrap();
    assert_eq!(updated.settings, settings);

    let info = repo.collection_info(&cancel).await.unwrap();
    assert_eq!(info.settings.partition_key_path.as_deref(), Some("/tenant"));
}

#[tokio::test]
async fn test_execute_stored_procedure() {
    let store = InMemoryStore::new();
    let repo = provisioned(&store).await;
    let cancel = CancellationToken::new();

    let link = CollectionLink::new("shop", "orders").procedure("make_todo");
    store.register_procedure(&link, |parameters| {
        let title = parameters
            .first()
            .and_then(|value| value.as_str())
            .unwrap_or("untitled");
        Ok(json!({ "title": title, "done": true }))
    });

    let produced: Todo = repo
        .execute_stored_proc("make_todo", vec![json!("From sproc")], &cancel)
        .await
        .unwrap();
    assert_eq!(produced.title, "From sproc");
    assert!(produced.done);

    let result = repo.execute_stored_proc("missing", vec![], &cancel).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Store(StoreError::NotFound {
            kind: ResourceKind::Procedure,
            ..
        }))
    ));
}

#[tokio::test]
async fn test_precancelled_operations_touch_nothing() {
    let store = InMemoryStore::new();
    let repo = provisioned(&store).await;
    store.clear_ops();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let add = repo.add(&todo("Test1"), &cancel).await;
    assert!(matches!(add, Err(RepositoryError::Cancelled)));

    let get = repo.get("anything", &cancel).await;
    assert!(matches!(get, Err(RepositoryError::Cancelled)));

    let delete_all = repo.delete_all(&cancel).await;
    assert!(matches!(delete_all, Err(RepositoryError::Cancelled)));

    assert_eq!(store.total_ops(), 0);
}

#[tokio::test]
async fn test_cancellation_mid_flight_abandons_the_write() {
    let store = InMemoryStore::new();
    let repo = Arc::new(provisioned(&store).await);
    let link = CollectionLink::new("shop", "orders");

    store.set_latency(Some(Duration::from_millis(200)));

    let cancel = CancellationToken::new();
    let task = {
        let repo = Arc::clone(&repo);
        let cancel = cancel.clone();
        tokio::spawn(async move { repo.add(&todo("Slow"), &cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(RepositoryError::Cancelled)));

    // The store saw the call but the write never landed
    assert_eq!(store.op_count(StoreOp::Create), 1);
    assert_eq!(store.document_count(&link), 0);
}

#[tokio::test]
async fn test_delete_all_does_not_reset_provisioning() {
    let store = InMemoryStore::new();
    let repo = provisioned(&store).await;
    let cancel = CancellationToken::new();

    repo.add(&todo("Test1"), &cancel).await.unwrap();
    repo.delete_all(&cancel).await.unwrap();

    // The instance still reports ready, so later calls surface store faults
    assert_eq!(repo.provisioning_state(), ProvisioningState::Ready);
    let result = repo.count(&cancel).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Store(StoreError::NotFound {
            kind: ResourceKind::Collection,
            ..
        }))
    ));

    // A fresh instance provisions the collection again
    let replacement = provisioned(&store).await;
    assert_eq!(replacement.count(&cancel).await.unwrap(), 0);
}
