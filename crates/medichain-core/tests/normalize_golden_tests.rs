//! Golden tests for request normalization.
//!
//! These tests verify normalization and image-pointer resolution against
//! known cases, plus property tests for totality and idempotence.

use medichain_core::normalize::{normalize_request, resolve_image_pointer, resolve_image_str};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Known normalization case.
struct GoldenCase {
    id: &'static str,
    input: Value,
    expected_name: &'static str,
    expected_price: Option<f64>,
    expected_currency: &'static str,
    expected_status: &'static str,
    expected_image: Option<&'static str>,
}

fn get_golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            id: "minimal-entry",
            input: json!({"medicineName": "Paracetamol"}),
            expected_name: "Paracetamol",
            expected_price: None,
            expected_currency: "ETH",
            expected_status: "pending",
            expected_image: None,
        },
        GoldenCase {
            id: "priced-entry",
            input: json!({
                "medicineName": "Amoxicillin",
                "price": "0.02",
                "currency": "USDC",
                "status": "approved",
            }),
            expected_name: "Amoxicillin",
            expected_price: Some(0.02),
            expected_currency: "USDC",
            expected_status: "approved",
            expected_image: None,
        },
        GoldenCase {
            id: "ipfs-image-entry",
            input: json!({
                "medicineName": "Ibuprofen",
                "image": "ipfs://QmImg",
            }),
            expected_name: "Ibuprofen",
            expected_price: None,
            expected_currency: "ETH",
            expected_status: "pending",
            expected_image: Some("https://ipfs.io/ipfs/QmImg"),
        },
        GoldenCase {
            id: "pointer-object-entry",
            input: json!({
                "medicineName": "Insulin",
                "imageUrl": {"gatewayUrl": "https://gw.example/ipfs/QmIns"},
                "price": "not a number",
            }),
            expected_name: "Insulin",
            expected_price: None,
            expected_currency: "ETH",
            expected_status: "pending",
            expected_image: Some("https://gw.example/ipfs/QmIns"),
        },
    ]
}

#[test]
fn test_golden_normalization_cases() {
    for case in get_golden_cases() {
        let req = normalize_request(&case.input)
            .unwrap_or_else(|| panic!("case {} failed to normalize", case.id));

        assert_eq!(req.medicine_name, case.expected_name, "case {}", case.id);
        assert_eq!(req.price, case.expected_price, "case {}", case.id);
        assert_eq!(req.currency, case.expected_currency, "case {}", case.id);
        assert_eq!(req.status, case.expected_status, "case {}", case.id);
        assert_eq!(
            req.image.as_deref(),
            case.expected_image,
            "case {}",
            case.id
        );
    }
}

#[test]
fn test_image_resolution_table() {
    assert_eq!(
        resolve_image_str("ipfs://abc123"),
        Some("https://ipfs.io/ipfs/abc123".into())
    );
    assert_eq!(
        resolve_image_str("https://x.com/a.png"),
        Some("https://x.com/a.png".into())
    );
    assert_eq!(resolve_image_str(""), None);
    assert_eq!(
        resolve_image_pointer(&json!({"cid": "Qm123"})),
        Some("https://ipfs.io/ipfs/Qm123".into())
    );
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(|n| json!(n)),
        (-1.0e9..1.0e9f64).prop_map(|f| json!(f)),
        "[a-zA-Z0-9 .;,]{0,20}".prop_map(Value::String),
    ]
}

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("id"),
        Just("medicineName"),
        Just("genericName"),
        Just("doctorId"),
        Just("price"),
        Just("stock"),
        Just("quantity"),
        Just("storage"),
        Just("ingredients"),
        Just("currency"),
        Just("status"),
        Just("urgencyLevel"),
        Just("clientRequestId"),
        Just("signature"),
        Just("ipfsCid"),
        Just("image"),
        Just("metadata"),
        Just("requestDate"),
        Just("someUnknownField"),
    ]
    .prop_map(String::from)
}

fn arb_entry() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(arb_key(), arb_scalar(), 0..10).prop_map(|fields| {
        Value::Object(Map::from_iter(fields))
    })
}

proptest! {
    /// Normalizing an already-normalized record is a no-op.
    #[test]
    fn prop_normalization_idempotent(entry in arb_entry()) {
        let once = normalize_request(&entry).unwrap();
        let reserialized = serde_json::to_value(&once).unwrap();
        let twice = normalize_request(&reserialized).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Resolution is total and idempotent on its own output.
    #[test]
    fn prop_image_resolution_idempotent(raw in ".{0,40}") {
        let resolved = resolve_image_str(&raw);
        if let Some(url) = &resolved {
            prop_assert_eq!(resolve_image_str(url), resolved.clone());
        }
    }

    /// Arbitrary pointer values never panic the resolver.
    #[test]
    fn prop_pointer_resolution_total(pointer in arb_scalar()) {
        let _ = resolve_image_pointer(&pointer);
    }
}
