//! Medicine request models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A doctor's request to restock or supply a medicine.
///
/// Every instance has passed normalization: text fields are present with
/// defaulted values, numeric fields are finite or `None`, and the image
/// pointer (if any) is a resolved absolute URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRequest {
    /// Unique numeric id, assigned by the store on first insert
    pub id: Option<i64>,
    /// Requesting doctor's record id
    pub doctor_id: Option<String>,
    /// Requesting doctor's wallet address
    pub doctor_address: Option<String>,
    /// Requesting doctor's display name
    pub doctor_name: Option<String>,
    /// Medicine trade name
    pub medicine_name: String,
    /// Generic (non-proprietary) name
    pub generic_name: String,
    pub manufacturer: String,
    pub description: String,
    /// Strength per unit (e.g. "500mg")
    pub strength: String,
    /// Dosage form (e.g. "tablet", "syrup")
    pub dosage_form: String,
    pub therapeutic_class: String,
    /// Regulatory registration number
    pub regulatory_id: String,
    pub expiry: String,
    pub batch: String,
    /// Storage/handling notes, one note per entry
    pub storage: Vec<String>,
    /// Active ingredient tokens
    pub ingredients: Vec<String>,
    /// Unit price; `None` when absent or non-finite
    pub price: Option<f64>,
    pub currency: String,
    /// Requested stock quantity
    pub stock: Option<f64>,
    pub urgency_level: String,
    pub request_reason: String,
    /// When the request was made (RFC 3339)
    pub request_date: String,
    pub created_at: Option<String>,
    /// Last modification timestamp (RFC 3339)
    pub updated_at: String,
    pub processed_at: Option<String>,
    pub status: String,
    /// IPFS content id of the medicine image
    pub ipfs_cid: Option<String>,
    /// Gateway URL the image was pinned under
    pub ipfs_url: Option<String>,
    /// Resolved absolute image URL
    pub image: Option<String>,
    /// Opaque caller payload, passed through unchanged
    pub metadata: Option<Value>,
    /// Caller-supplied idempotency key
    pub client_request_id: Option<String>,
    /// On-chain transaction reference
    pub tx_hash: Option<String>,
}

impl MedicineRequest {
    /// Key used to decide whether two records represent the same request.
    ///
    /// Priority: client request id, then IPFS CID, then numeric id, then a
    /// composite of doctor identity, request date and medicine name. The CID
    /// and id forms are prefixed so the key spaces cannot collide.
    pub fn dedup_key(&self) -> String {
        if let Some(crid) = &self.client_request_id {
            return crid.clone();
        }
        if let Some(cid) = &self.ipfs_cid {
            return format!("cid:{cid}");
        }
        if let Some(id) = self.id {
            return format!("id:{id}");
        }
        let doctor = self
            .doctor_id
            .as_deref()
            .or(self.doctor_address.as_deref())
            .or(self.doctor_name.as_deref())
            .unwrap_or("");
        format!("{}|{}|{}", doctor, self.request_date, self.medicine_name)
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Payload broadcast to listeners after every persist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    /// The full collection as of the write
    pub requests: Vec<MedicineRequest>,
}
