//! Request store: the single owner of the persisted medicine-request
//! collection.
//!
//! Every operation re-reads the full collection from the backend, mutates a
//! private copy and writes the whole collection back. There is no locking
//! across execution contexts; concurrent writers can lose updates, which is
//! accepted for the single-user usage this store serves. Observers get
//! eventual consistency through the change broadcast.

mod blob;
mod events;

pub use blob::*;
pub use events::ChangeListener;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::MedicineRequest;
use crate::normalize::normalize_request;
use events::ListenerRegistry;

/// Fixed key the collection blob lives under.
pub const REQUESTS_KEY: &str = "medicine_requests";

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A partial update applied to one record.
pub enum Patch {
    /// Literal partial object merged over the record
    Fields(Value),
    /// Computed partial, derived from the current record (e.g. status
    /// transitions)
    Compute(Box<dyn FnOnce(&MedicineRequest) -> Value + Send>),
}

impl Patch {
    pub fn fields(partial: Value) -> Self {
        Patch::Fields(partial)
    }

    pub fn compute<F>(f: F) -> Self
    where
        F: FnOnce(&MedicineRequest) -> Value + Send + 'static,
    {
        Patch::Compute(Box::new(f))
    }

    fn resolve(self, existing: &MedicineRequest) -> Value {
        match self {
            Patch::Fields(partial) => partial,
            Patch::Compute(f) => f(existing),
        }
    }
}

impl From<Value> for Patch {
    fn from(partial: Value) -> Self {
        Patch::Fields(partial)
    }
}

/// Owner of the medicine-request collection.
pub struct RequestStore {
    backend: Box<dyn BlobStore>,
    listeners: ListenerRegistry,
}

impl RequestStore {
    /// Open a store backed by a SQLite database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self::with_backend(Box::new(SqliteBlobStore::open(path)?)))
    }

    /// Create a store with the in-memory fallback backend.
    pub fn in_memory() -> Self {
        Self::with_backend(Box::new(MemoryBlobStore::new()))
    }

    /// Create a store over an injected backend.
    pub fn with_backend(backend: Box<dyn BlobStore>) -> Self {
        Self {
            backend,
            listeners: ListenerRegistry::default(),
        }
    }

    /// Register a change listener.
    pub fn subscribe(&mut self, listener: Arc<dyn ChangeListener>) {
        self.listeners.subscribe(listener);
    }

    /// Read the persisted collection: normalized, newest first, deduplicated.
    ///
    /// A missing, malformed or non-array blob yields an empty collection;
    /// this never fails.
    pub fn load(&self) -> Vec<MedicineRequest> {
        let Some(blob) = self.backend.get(REQUESTS_KEY) else {
            return Vec::new();
        };
        let entries = match serde_json::from_str::<Value>(&blob) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                warn!("persisted blob is not an array, treating as empty");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "persisted blob is not valid JSON, treating as empty");
                Vec::new()
            }
        };

        let mut list: Vec<MedicineRequest> = entries.iter().filter_map(normalize_request).collect();
        // Stable sort keeps tie order deterministic before dedup
        list.sort_by(|a, b| b.request_date.cmp(&a.request_date));

        let mut seen = HashSet::new();
        list.retain(|r| seen.insert(r.dedup_key()));
        list
    }

    /// Write the full collection and notify listeners.
    ///
    /// Write failures are logged and swallowed; the broadcast fires after
    /// every attempt regardless of outcome.
    pub fn persist(&mut self, list: &[MedicineRequest]) {
        match serde_json::to_string(list) {
            Ok(blob) => {
                if let Err(e) = self.backend.set(REQUESTS_KEY, &blob) {
                    warn!(error = %e, "request write failed, keeping in-memory state");
                } else {
                    debug!(count = list.len(), "persisted request collection");
                }
            }
            Err(e) => warn!(error = %e, "request serialization failed, write skipped"),
        }
        self.listeners.broadcast(list);
    }

    /// Add a request, deduplicating against the existing collection.
    ///
    /// The candidate's `createdAt`/`requestDate`/`updatedAt` are forced to
    /// now, overriding caller-supplied values for those three fields only. A
    /// record with a matching client request id or IPFS CID is merged in
    /// place instead of inserted.
    pub fn add(&mut self, input: &Value) -> StoreResult<MedicineRequest> {
        let mut list = self.load();

        let mut candidate = normalize_request(input).ok_or_else(|| {
            StoreError::InvalidPayload("request payload must be an object".into())
        })?;
        let now = chrono::Utc::now().to_rfc3339();
        candidate.created_at = Some(now.clone());
        candidate.request_date = now.clone();
        candidate.updated_at = now;

        let duplicate = candidate
            .client_request_id
            .as_deref()
            .and_then(|crid| {
                list.iter()
                    .position(|r| r.client_request_id.as_deref() == Some(crid))
            })
            .or_else(|| {
                candidate.ipfs_cid.as_deref().and_then(|cid| {
                    list.iter().position(|r| r.ipfs_cid.as_deref() == Some(cid))
                })
            });

        if let Some(pos) = duplicate {
            let merged = merge_preferring(candidate, &list[pos]);
            list[pos] = merged.clone();
            self.persist(&list);
            return Ok(merged);
        }

        if candidate.id.is_none() {
            let next = list.iter().filter_map(|r| r.id).max().unwrap_or(0) + 1;
            candidate.id = Some(next);
        }
        // Drop any stale entry that coincidentally carries the same id
        list.retain(|r| r.id != candidate.id);
        list.insert(0, candidate.clone());
        self.persist(&list);
        Ok(candidate)
    }

    /// Apply a partial update to the record with the given id.
    ///
    /// Returns `None` without persisting or broadcasting when no record
    /// matches.
    pub fn update(&mut self, id: i64, patch: impl Into<Patch>) -> StoreResult<Option<MedicineRequest>> {
        let mut list = self.load();
        let Some(pos) = list.iter().position(|r| r.id == Some(id)) else {
            return Ok(None);
        };

        let patch: Patch = patch.into();
        let partial = patch.resolve(&list[pos]);
        let mut base = serde_json::to_value(&list[pos])?;
        if let (Value::Object(base_obj), Value::Object(patch_obj)) = (&mut base, partial) {
            for (key, value) in patch_obj {
                base_obj.insert(key, value);
            }
        }

        let Some(mut updated) = normalize_request(&base) else {
            return Ok(None);
        };
        updated.touch();
        list[pos] = updated.clone();
        self.persist(&list);
        Ok(Some(updated))
    }

    /// Empty the whole collection. The broadcast still fires.
    pub fn clear(&mut self) {
        self.persist(&[]);
    }
}

/// Merge a duplicate: the candidate's non-default values win over the
/// existing record's. The existing id is preserved only when the candidate
/// lacks one; this asymmetry is load-bearing for idempotent re-submission.
fn merge_preferring(candidate: MedicineRequest, existing: &MedicineRequest) -> MedicineRequest {
    fn pick(candidate: String, existing: &str, default: &str) -> String {
        if candidate != default {
            candidate
        } else {
            existing.to_string()
        }
    }
    fn pick_list(candidate: Vec<String>, existing: &[String]) -> Vec<String> {
        if candidate.is_empty() {
            existing.to_vec()
        } else {
            candidate
        }
    }

    MedicineRequest {
        id: candidate.id.or(existing.id),
        doctor_id: candidate.doctor_id.or_else(|| existing.doctor_id.clone()),
        doctor_address: candidate
            .doctor_address
            .or_else(|| existing.doctor_address.clone()),
        doctor_name: candidate.doctor_name.or_else(|| existing.doctor_name.clone()),
        medicine_name: pick(candidate.medicine_name, &existing.medicine_name, ""),
        generic_name: pick(candidate.generic_name, &existing.generic_name, ""),
        manufacturer: pick(candidate.manufacturer, &existing.manufacturer, ""),
        description: pick(candidate.description, &existing.description, ""),
        strength: pick(candidate.strength, &existing.strength, ""),
        dosage_form: pick(candidate.dosage_form, &existing.dosage_form, ""),
        therapeutic_class: pick(candidate.therapeutic_class, &existing.therapeutic_class, ""),
        regulatory_id: pick(candidate.regulatory_id, &existing.regulatory_id, ""),
        expiry: pick(candidate.expiry, &existing.expiry, ""),
        batch: pick(candidate.batch, &existing.batch, ""),
        storage: pick_list(candidate.storage, &existing.storage),
        ingredients: pick_list(candidate.ingredients, &existing.ingredients),
        price: candidate.price.or(existing.price),
        currency: pick(candidate.currency, &existing.currency, "ETH"),
        stock: candidate.stock.or(existing.stock),
        urgency_level: pick(candidate.urgency_level, &existing.urgency_level, "normal"),
        request_reason: pick(candidate.request_reason, &existing.request_reason, ""),
        request_date: candidate.request_date,
        created_at: candidate.created_at.or_else(|| existing.created_at.clone()),
        updated_at: candidate.updated_at,
        processed_at: candidate
            .processed_at
            .or_else(|| existing.processed_at.clone()),
        status: pick(candidate.status, &existing.status, "pending"),
        ipfs_cid: candidate.ipfs_cid.or_else(|| existing.ipfs_cid.clone()),
        ipfs_url: candidate.ipfs_url.or_else(|| existing.ipfs_url.clone()),
        image: candidate.image.or_else(|| existing.image.clone()),
        metadata: candidate.metadata.or_else(|| existing.metadata.clone()),
        client_request_id: candidate
            .client_request_id
            .or_else(|| existing.client_request_id.clone()),
        tx_hash: candidate.tx_hash.or_else(|| existing.tx_hash.clone()),
    }
}
