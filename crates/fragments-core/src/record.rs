// ABOUTME: The persisted metadata record for a fragment and the owner listing shape.
// ABOUTME: Serialized field names match the public JSON form (id, ownerId, created, updated, type, size).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata stored for every fragment under the key `(owner_id, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentRecord {
    pub id: String,
    pub owner_id: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(rename = "type")]
    pub media_type: String,
    pub size: u64,
}

/// Result of listing an owner's fragments: either bare ids or full records,
/// in insertion order. Serializes as a plain JSON array either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FragmentListing {
    Ids(Vec<String>),
    Records(Vec<FragmentRecord>),
}

impl FragmentListing {
    pub fn empty(expand: bool) -> Self {
        if expand {
            FragmentListing::Records(Vec::new())
        } else {
            FragmentListing::Ids(Vec::new())
        }
    }

    /// Build the listing for `expand` from records already in insertion order.
    pub fn from_records(records: Vec<FragmentRecord>, expand: bool) -> Self {
        if expand {
            FragmentListing::Records(records)
        } else {
            FragmentListing::Ids(records.into_iter().map(|r| r.id).collect())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FragmentListing::Ids(ids) => ids.len(),
            FragmentListing::Records(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids in listing order, regardless of shape.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            FragmentListing::Ids(ids) => ids.iter().map(String::as_str).collect(),
            FragmentListing::Records(records) => records.iter().map(|r| r.id.as_str()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> FragmentRecord {
        let now = Utc::now();
        FragmentRecord {
            id: id.to_string(),
            owner_id: "owner".to_string(),
            created: now,
            updated: now,
            media_type: "text/plain; charset=utf-8".to_string(),
            size: 19,
        }
    }

    #[test]
    fn record_serializes_with_public_field_names() {
        let json = serde_json::to_value(record("a")).unwrap();
        assert_eq!(json["id"], "a");
        assert_eq!(json["ownerId"], "owner");
        assert_eq!(json["type"], "text/plain; charset=utf-8");
        assert_eq!(json["size"], 19);
        assert!(json["created"].is_string());
        assert!(json.get("media_type").is_none());
    }

    #[test]
    fn listing_keeps_order_in_both_shapes() {
        let records = vec![record("b"), record("a"), record("c")];

        let ids = FragmentListing::from_records(records.clone(), false);
        assert_eq!(ids.ids(), vec!["b", "a", "c"]);
        assert_eq!(serde_json::to_value(&ids).unwrap(), serde_json::json!(["b", "a", "c"]));

        let full = FragmentListing::from_records(records, true);
        assert_eq!(full.ids(), vec!["b", "a", "c"]);
        let json = serde_json::to_value(&full).unwrap();
        assert_eq!(json[1]["id"], "a");
    }

    #[test]
    fn empty_listing_serializes_as_empty_array() {
        for expand in [false, true] {
            let listing = FragmentListing::empty(expand);
            assert!(listing.is_empty());
            assert_eq!(serde_json::to_string(&listing).unwrap(), "[]");
        }
    }
}
