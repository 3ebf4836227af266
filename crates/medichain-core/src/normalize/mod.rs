//! Medicine-request normalization.
//!
//! Handles:
//! - Field aliasing (stock→quantity, clientRequestId→signature, etc.)
//! - Numeric coercion (only finite numbers survive, never NaN/Infinity)
//! - Storage-note splitting (newline/period/semicolon delimited blobs)
//! - IPFS image-pointer resolution
//!
//! Upstream producers are heterogeneous, so the input is an arbitrary
//! `serde_json::Value`. Normalization is total over objects: every field of
//! the output is present with a defaulted value, and running the output
//! through normalization again is a no-op.

mod image;

pub use image::*;

use serde_json::{Map, Value};

use crate::models::MedicineRequest;

/// Delimiters used to split a raw storage blob into individual notes.
const NOTE_DELIMITERS: [char; 3] = ['\n', '.', ';'];

/// Normalize an arbitrary untrusted entry into a fully-defaulted record.
///
/// Non-objects (null, strings, arrays, numbers) yield `None`. Deterministic
/// except for the now-substituted timestamps when the source fields are
/// absent.
pub fn normalize_request(entry: &Value) -> Option<MedicineRequest> {
    let obj = entry.as_object()?;
    let now = chrono::Utc::now().to_rfc3339();

    let image = first_present(obj, &["image", "imageUrl"]).and_then(resolve_image_pointer);

    Some(MedicineRequest {
        id: first_present(obj, &["id"]).and_then(coerce_id),
        doctor_id: opt_text(obj, &["doctorId"]),
        doctor_address: opt_text(obj, &["doctorAddress"]),
        doctor_name: opt_text(obj, &["doctorName"]),
        medicine_name: text_or_empty(obj, &["medicineName"]),
        generic_name: text_or_empty(obj, &["genericName"]),
        manufacturer: text_or_empty(obj, &["manufacturer"]),
        description: text_or_empty(obj, &["description"]),
        strength: text_or_empty(obj, &["strength"]),
        dosage_form: text_or_empty(obj, &["dosageForm"]),
        therapeutic_class: text_or_empty(obj, &["therapeuticClass"]),
        regulatory_id: text_or_empty(obj, &["regulatoryId"]),
        expiry: text_or_empty(obj, &["expiry"]),
        batch: text_or_empty(obj, &["batch"]),
        storage: first_present(obj, &["storage"])
            .map(coerce_notes)
            .unwrap_or_default(),
        ingredients: first_present(obj, &["ingredients", "activeIngredients"])
            .map(coerce_tokens)
            .unwrap_or_default(),
        price: first_present(obj, &["price"]).and_then(coerce_finite),
        currency: opt_text(obj, &["currency"]).unwrap_or_else(|| "ETH".into()),
        stock: first_present(obj, &["stock", "quantity"]).and_then(coerce_finite),
        urgency_level: opt_text(obj, &["urgencyLevel"]).unwrap_or_else(|| "normal".into()),
        request_reason: text_or_empty(obj, &["requestReason"]),
        request_date: opt_text(obj, &["requestDate"]).unwrap_or_else(|| now.clone()),
        created_at: opt_text(obj, &["createdAt"]),
        updated_at: opt_text(obj, &["updatedAt"]).unwrap_or_else(|| now.clone()),
        processed_at: opt_text(obj, &["processedAt"]),
        status: opt_text(obj, &["status"]).unwrap_or_else(|| "pending".into()),
        ipfs_cid: opt_text(obj, &["ipfsCid", "cid", "ipfsHash"]),
        ipfs_url: opt_text(obj, &["ipfsUrl", "ipfsGatewayUrl"]),
        image,
        metadata: obj.get("metadata").filter(|v| !v.is_null()).cloned(),
        client_request_id: opt_text(obj, &["clientRequestId", "signature"]),
        tx_hash: opt_text(obj, &["txHash"]),
    })
}

/// Split a raw storage blob into trimmed, non-empty notes.
pub fn split_notes(raw: &str) -> Vec<String> {
    raw.split(|c| NOTE_DELIMITERS.contains(&c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// First non-null value among the given field names, in priority order.
///
/// Fallback happens on absence only: a present field that later fails
/// coercion does not fall through to lower-priority names.
fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

/// Coerce a scalar to trimmed non-empty text. Numbers stringify.
fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a number or numeric string to a finite f64.
fn coerce_finite(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Coerce a record id to an integer. Whole-valued floats are accepted.
fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Storage notes: either an array of strings or a raw delimited blob.
fn coerce_notes(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(coerce_text).collect(),
        Value::String(s) => split_notes(s),
        _ => Vec::new(),
    }
}

/// Ingredient tokens: either an array of strings or one comma-separated line.
fn coerce_tokens(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(coerce_text).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

fn opt_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    first_present(obj, keys).and_then(coerce_text)
}

fn text_or_empty(obj: &Map<String, Value>, keys: &[&str]) -> String {
    opt_text(obj, keys).unwrap_or_default()
}
