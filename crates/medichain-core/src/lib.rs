//! Medichain Core Library
//!
//! Local-first store for medicine restock requests, embedded in the host
//! application UI.
//!
//! # Architecture
//!
//! ```text
//! Raw entry (untrusted JSON)
//!         │
//!    Normalization ── field aliasing, numeric coercion, IPFS image resolution
//!         │
//!    Sort + Dedup ── newest first, keyed by clientRequestId/CID/id/composite
//!         │
//! ┌───────▼────────────────────────┐
//! │   RequestStore (collection)    │
//! │ blob key: "medicine_requests"  │
//! └───────┬────────────────────────┘
//!         │
//!   SQLite backend / in-memory fallback
//!         │
//!   ChangeEvent broadcast → host UI views
//! ```
//!
//! # Core Principle
//!
//! **No raw input ever surfaces.** Every record leaving the store has passed
//! normalization; callers always receive defaulted, type-coerced copies.
//!
//! # Modules
//!
//! - [`models`]: Domain types (MedicineRequest, ChangeEvent)
//! - [`normalize`]: Entry normalization and IPFS image-pointer resolution
//! - [`store`]: RequestStore with pluggable blob backends

pub mod models;
pub mod normalize;
pub mod store;

// Re-export commonly used types
pub use models::{ChangeEvent, MedicineRequest};
pub use normalize::{normalize_request, resolve_image_pointer, IPFS_GATEWAY};
pub use store::{
    BlobStore, ChangeListener, MemoryBlobStore, Patch, RequestStore, SqliteBlobStore, StoreError,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use serde_json::Value;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MedichainError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<StoreError> for MedichainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidPayload(msg) => MedichainError::InvalidPayload(msg),
            StoreError::Json(e) => MedichainError::SerializationError(e.to_string()),
            StoreError::Sqlite(e) => MedichainError::StorageError(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for MedichainError {
    fn from(e: serde_json::Error) -> Self {
        MedichainError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for MedichainError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        MedichainError::StorageError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a request store backed by SQLite at the given path.
#[uniffi::export]
pub fn open_store(path: String) -> Result<Arc<MedichainCore>, MedichainError> {
    let store = RequestStore::open(&path).map_err(MedichainError::from)?;
    Ok(Arc::new(MedichainCore {
        store: Arc::new(Mutex::new(store)),
    }))
}

/// Create a store with the in-memory fallback backend (no durable storage).
#[uniffi::export]
pub fn open_store_in_memory() -> Arc<MedichainCore> {
    Arc::new(MedichainCore {
        store: Arc::new(Mutex::new(RequestStore::in_memory())),
    })
}

/// Resolve an image pointer (bare CID, `ipfs://` URI or HTTP URL) to an
/// absolute gateway URL.
#[uniffi::export]
pub fn resolve_image(pointer: String) -> Option<String> {
    normalize::resolve_image_str(&pointer)
}

// =========================================================================
// Change Listener (foreign callback)
// =========================================================================

/// Host-side observer of request-collection changes.
#[uniffi::export(with_foreign)]
pub trait RequestListener: Send + Sync {
    /// Called with the full collection after every persist.
    fn on_change(&self, requests: Vec<FfiMedicineRequest>);
}

/// Bridges foreign listeners onto the core change broadcast.
struct ForeignListener {
    inner: Arc<dyn RequestListener>,
}

impl ChangeListener for ForeignListener {
    fn on_change(&self, event: &ChangeEvent) {
        let requests = event.requests.iter().cloned().map(Into::into).collect();
        self.inner.on_change(requests);
    }
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe store wrapper for FFI.
#[derive(uniffi::Object)]
pub struct MedichainCore {
    store: Arc<Mutex<RequestStore>>,
}

#[uniffi::export]
impl MedichainCore {
    /// List the current collection, normalized and deduplicated.
    pub fn list_requests(&self) -> Result<Vec<FfiMedicineRequest>, MedichainError> {
        let store = self.store.lock()?;
        Ok(store.load().into_iter().map(Into::into).collect())
    }

    /// Add a request from a raw JSON entry.
    pub fn add_request(&self, request_json: String) -> Result<FfiMedicineRequest, MedichainError> {
        let input: Value = serde_json::from_str(&request_json)?;
        let mut store = self.store.lock()?;
        let added = store.add(&input)?;
        Ok(added.into())
    }

    /// Apply a partial JSON patch to the record with the given id.
    ///
    /// Returns `None` when no record matches; nothing is persisted then.
    pub fn update_request(
        &self,
        id: i64,
        patch_json: String,
    ) -> Result<Option<FfiMedicineRequest>, MedichainError> {
        let patch: Value = serde_json::from_str(&patch_json)?;
        let mut store = self.store.lock()?;
        let updated = store.update(id, patch)?;
        Ok(updated.map(Into::into))
    }

    /// Empty the whole collection.
    pub fn clear_requests(&self) -> Result<(), MedichainError> {
        let mut store = self.store.lock()?;
        store.clear();
        Ok(())
    }

    /// Register a change listener.
    pub fn subscribe(&self, listener: Arc<dyn RequestListener>) -> Result<(), MedichainError> {
        let mut store = self.store.lock()?;
        store.subscribe(Arc::new(ForeignListener { inner: listener }));
        Ok(())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe medicine request. `metadata` crosses the boundary as JSON text.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicineRequest {
    pub id: Option<i64>,
    pub doctor_id: Option<String>,
    pub doctor_address: Option<String>,
    pub doctor_name: Option<String>,
    pub medicine_name: String,
    pub generic_name: String,
    pub manufacturer: String,
    pub description: String,
    pub strength: String,
    pub dosage_form: String,
    pub therapeutic_class: String,
    pub regulatory_id: String,
    pub expiry: String,
    pub batch: String,
    pub storage: Vec<String>,
    pub ingredients: Vec<String>,
    pub price: Option<f64>,
    pub currency: String,
    pub stock: Option<f64>,
    pub urgency_level: String,
    pub request_reason: String,
    pub request_date: String,
    pub created_at: Option<String>,
    pub updated_at: String,
    pub processed_at: Option<String>,
    pub status: String,
    pub ipfs_cid: Option<String>,
    pub ipfs_url: Option<String>,
    pub image: Option<String>,
    pub metadata: Option<String>,
    pub client_request_id: Option<String>,
    pub tx_hash: Option<String>,
}

impl From<MedicineRequest> for FfiMedicineRequest {
    fn from(req: MedicineRequest) -> Self {
        Self {
            id: req.id,
            doctor_id: req.doctor_id,
            doctor_address: req.doctor_address,
            doctor_name: req.doctor_name,
            medicine_name: req.medicine_name,
            generic_name: req.generic_name,
            manufacturer: req.manufacturer,
            description: req.description,
            strength: req.strength,
            dosage_form: req.dosage_form,
            therapeutic_class: req.therapeutic_class,
            regulatory_id: req.regulatory_id,
            expiry: req.expiry,
            batch: req.batch,
            storage: req.storage,
            ingredients: req.ingredients,
            price: req.price,
            currency: req.currency,
            stock: req.stock,
            urgency_level: req.urgency_level,
            request_reason: req.request_reason,
            request_date: req.request_date,
            created_at: req.created_at,
            updated_at: req.updated_at,
            processed_at: req.processed_at,
            status: req.status,
            ipfs_cid: req.ipfs_cid,
            ipfs_url: req.ipfs_url,
            image: req.image,
            metadata: req.metadata.map(|v| v.to_string()),
            client_request_id: req.client_request_id,
            tx_hash: req.tx_hash,
        }
    }
}
