//! Storage-backed PATCH through `PatchService`.

use crate::common::{WIDGET_EXTENSION_ID, widget_schemas};
use scim_patch::patch::{PatchOpRequest, PatchRequestOperation, RecordingOperationHandler};
use scim_patch::storage::{InMemoryStorage, StorageError, StorageKey, StorageProvider};
use scim_patch::{HttpVersion, OperationKind, PatchConfig, PatchService, ScimError};
use serde_json::json;

async fn widget_service() -> (PatchService<InMemoryStorage>, StorageKey) {
    let service = PatchService::new(InMemoryStorage::new()).register(widget_schemas());
    let key = StorageKey::new("tenant-a", "Widget", "w-1");
    service
        .store(
            key.clone(),
            json!({
                "id": "w-1",
                "label": "stored",
                WIDGET_EXTENSION_ID: {"level": 1}
            }),
        )
        .await
        .unwrap();
    (service, key)
}

#[tokio::test]
async fn test_patch_with_matching_etag() {
    let (service, key) = widget_service().await;
    let current = service.get(key.clone()).await.unwrap().unwrap();
    let request = PatchOpRequest::new(vec![PatchRequestOperation::replace("label", json!("patched"))]);

    let patched = service
        .patch(key.clone(), &request, Some(&current.etag()))
        .await
        .unwrap();

    assert_ne!(patched.version, current.version);
    assert_eq!(patched.resource.attribute("label"), Some(&json!("patched")));

    let raw = service.storage().get(key).await.unwrap().unwrap();
    assert_eq!(raw["label"], json!("patched"));
    assert!(raw["meta"]["lastModified"].is_string());
}

#[tokio::test]
async fn test_etag_header_round_trip() {
    let (service, key) = widget_service().await;
    let current = service.get(key.clone()).await.unwrap().unwrap();
    let header: HttpVersion = current.etag().to_string().parse().unwrap();
    let request = PatchOpRequest::new(vec![PatchRequestOperation::remove(WIDGET_EXTENSION_ID)]);

    let patched = service.patch(key, &request, Some(&header)).await.unwrap();
    assert!(!patched.resource.has_extension(WIDGET_EXTENSION_ID));
}

#[tokio::test]
async fn test_stale_etag_rejected() {
    let (service, key) = widget_service().await;
    let stale = service.get(key.clone()).await.unwrap().unwrap().etag();
    let first = PatchOpRequest::new(vec![PatchRequestOperation::replace("label", json!("one"))]);
    service.patch(key.clone(), &first, None).await.unwrap();

    let second = PatchOpRequest::new(vec![PatchRequestOperation::replace("label", json!("two"))]);
    let error = service.patch(key.clone(), &second, Some(&stale)).await.unwrap_err();

    assert!(matches!(error, ScimError::VersionMismatch { .. }));
    let stored = service.get(key).await.unwrap().unwrap();
    assert_eq!(stored.resource.attribute("label"), Some(&json!("one")));
}

#[tokio::test]
async fn test_unchanged_patch_keeps_version() {
    let (service, key) = widget_service().await;
    let before = service.get(key.clone()).await.unwrap().unwrap();
    let request = PatchOpRequest::new(vec![PatchRequestOperation::replace("label", json!("stored"))]);

    let after = service.patch(key, &request, None).await.unwrap();
    assert_eq!(after.version, before.version);
    assert_eq!(after.resource.attribute("meta"), None);
}

#[tokio::test]
async fn test_custom_handler_receives_operations() {
    let (service, key) = widget_service().await;
    let request = PatchOpRequest::new(vec![
        PatchRequestOperation::add("tags", json!(["a", "b"])),
        PatchRequestOperation::remove(WIDGET_EXTENSION_ID),
    ]);
    let mut recorder = RecordingOperationHandler::new();

    service
        .patch_with_handler(key, &request, None, &mut recorder)
        .await
        .unwrap();

    assert_eq!(
        recorder.kinds(),
        vec![
            OperationKind::MultivaluedSimpleAttribute,
            OperationKind::RemoveExtensionRef
        ]
    );
}

#[tokio::test]
async fn test_rejected_patch_is_not_stored() {
    let (service, key) = widget_service().await;
    let before = service.storage().get(key.clone()).await.unwrap();
    let request = PatchOpRequest::new(vec![
        PatchRequestOperation::replace("label", json!("changed")),
        PatchRequestOperation::add("level", json!("high")),
    ]);

    let error = service.patch(key.clone(), &request, None).await.unwrap_err();

    assert!(matches!(error, ScimError::Patch(_)));
    assert_eq!(service.storage().get(key).await.unwrap(), before);
}

#[tokio::test]
async fn test_disabled_patch() {
    let service = PatchService::new(InMemoryStorage::new())
        .register(widget_schemas())
        .with_config(PatchConfig::builder().supported(false).build());
    let key = StorageKey::new("tenant-a", "Widget", "w-9");
    service.store(key.clone(), json!({"id": "w-9"})).await.unwrap();

    let request = PatchOpRequest::new(vec![PatchRequestOperation::add("label", json!("x"))]);
    let error = service.patch(key, &request, None).await.unwrap_err();
    assert!(error.to_string().contains("PATCH is not supported"));
}

#[tokio::test]
async fn test_unknown_resource_type() {
    let service = PatchService::new(InMemoryStorage::new()).register(widget_schemas());
    let request = PatchOpRequest::new(vec![]);
    let error = service
        .patch(StorageKey::new("tenant-a", "Gadget", "1"), &request, None)
        .await
        .unwrap_err();
    assert!(matches!(error, ScimError::InvalidRequest { .. }));
}

#[tokio::test]
async fn test_concurrent_patches_on_different_resources() {
    let service = std::sync::Arc::new(PatchService::new(InMemoryStorage::new()).register(widget_schemas()));
    let patches = (0..8).map(|index| {
        let service = service.clone();
        tokio::spawn(async move {
            let key = StorageKey::new("tenant-a", "Widget", format!("w-{index}"));
            service.store(key.clone(), json!({"id": format!("w-{index}")})).await.unwrap();
            let request = PatchOpRequest::new(vec![PatchRequestOperation::add("count", json!(index))]);
            service.patch(key, &request, None).await.unwrap()
        })
    });
    for (index, patched) in futures::future::join_all(patches).await.into_iter().enumerate() {
        let patched = patched.unwrap();
        assert_eq!(patched.resource.attribute("count"), Some(&json!(index)));
    }
    assert_eq!(service.storage().stats().await.total_resources, 8);
}

#[tokio::test]
async fn test_concurrent_patches_on_one_resource_lose_no_update() {
    let (service, key) = widget_service().await;
    let service = std::sync::Arc::new(service);
    let patches = (0..8).map(|index| {
        let service = service.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let request =
                PatchOpRequest::new(vec![PatchRequestOperation::add("tags", json!([format!("t{index}")]))]);
            let mut conflicts = 0;
            loop {
                match service.patch(key.clone(), &request, None).await {
                    Ok(_) => return conflicts,
                    Err(ScimError::Storage(StorageError::ConcurrentModification { .. })) => {
                        conflicts += 1;
                    }
                    Err(error) => panic!("unexpected error: {error}"),
                }
            }
        })
    });
    for attempt in futures::future::join_all(patches).await {
        attempt.unwrap();
    }

    let stored = service.get(key).await.unwrap().unwrap();
    let mut tags: Vec<String> = serde_json::from_value(stored.resource.attribute("tags").unwrap().clone()).unwrap();
    tags.sort();
    let expected: Vec<String> = (0..8).map(|index| format!("t{index}")).collect();
    assert_eq!(tags, expected);
}

#[tokio::test]
async fn test_write_after_load_is_not_overwritten() {
    let (service, key) = widget_service().await;
    let stale = service.get(key.clone()).await.unwrap().unwrap();
    let competing = json!({"id": "w-1", "label": "competing"});
    service.storage().put(key.clone(), competing.clone()).await.unwrap();

    // The If-Match version predates the competing write.
    let request = PatchOpRequest::new(vec![PatchRequestOperation::replace("label", json!("mine"))]);
    let error = service.patch(key.clone(), &request, Some(&stale.etag())).await.unwrap_err();

    assert!(matches!(error, ScimError::VersionMismatch { .. }));
    assert_eq!(service.storage().get(key).await.unwrap(), Some(competing));
}
