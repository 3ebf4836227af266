//! FFI surface tests: the exported object, error mapping and callbacks.

use std::sync::{Arc, Mutex};

use medichain_core::{
    open_store, open_store_in_memory, resolve_image, FfiMedicineRequest, MedichainError,
    RequestListener,
};

#[derive(Default)]
struct CountingListener {
    payload_sizes: Mutex<Vec<usize>>,
}

impl RequestListener for CountingListener {
    fn on_change(&self, requests: Vec<FfiMedicineRequest>) {
        self.payload_sizes.lock().unwrap().push(requests.len());
    }
}

#[test]
fn test_add_and_list_roundtrip() {
    let core = open_store_in_memory();

    let added = core
        .add_request(r#"{"medicineName": "Paracetamol", "price": 0.01}"#.into())
        .unwrap();
    assert_eq!(added.medicine_name, "Paracetamol");
    assert_eq!(added.price, Some(0.01));
    assert_eq!(added.id, Some(1));

    let listed = core.list_requests().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].medicine_name, "Paracetamol");
}

#[test]
fn test_add_rejects_invalid_payloads() {
    let core = open_store_in_memory();

    assert!(matches!(
        core.add_request("null".into()),
        Err(MedichainError::InvalidPayload(_))
    ));
    assert!(matches!(
        core.add_request("\"a string\"".into()),
        Err(MedichainError::InvalidPayload(_))
    ));
    assert!(matches!(
        core.add_request("not json".into()),
        Err(MedichainError::SerializationError(_))
    ));
}

#[test]
fn test_update_and_clear() {
    let core = open_store_in_memory();
    let added = core
        .add_request(r#"{"medicineName": "A"}"#.into())
        .unwrap();

    let updated = core
        .update_request(added.id.unwrap(), r#"{"status": "approved"}"#.into())
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "approved");

    assert!(core
        .update_request(999, r#"{"status": "approved"}"#.into())
        .unwrap()
        .is_none());

    core.clear_requests().unwrap();
    assert!(core.list_requests().unwrap().is_empty());
}

#[test]
fn test_listener_receives_changes() {
    let core = open_store_in_memory();
    let listener = Arc::new(CountingListener::default());
    core.subscribe(listener.clone()).unwrap();

    core.add_request(r#"{"medicineName": "A"}"#.into()).unwrap();
    core.add_request(r#"{"medicineName": "B"}"#.into()).unwrap();
    core.clear_requests().unwrap();

    assert_eq!(*listener.payload_sizes.lock().unwrap(), vec![1, 2, 0]);
}

#[test]
fn test_metadata_crosses_as_json_text() {
    let core = open_store_in_memory();
    let added = core
        .add_request(r#"{"medicineName": "A", "metadata": {"batchCheck": true}}"#.into())
        .unwrap();

    let metadata = added.metadata.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&metadata).unwrap();
    assert_eq!(parsed["batchCheck"], serde_json::Value::Bool(true));
}

#[test]
fn test_resolve_image_export() {
    assert_eq!(
        resolve_image("ipfs://abc".into()),
        Some("https://ipfs.io/ipfs/abc".into())
    );
    assert_eq!(resolve_image("".into()), None);
}

#[test]
fn test_open_store_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("requests.db");

    {
        let core = open_store(path.to_string_lossy().into_owned()).unwrap();
        core.add_request(r#"{"medicineName": "Durable"}"#.into())
            .unwrap();
    }

    let core = open_store(path.to_string_lossy().into_owned()).unwrap();
    let listed = core.list_requests().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].medicine_name, "Durable");
}
