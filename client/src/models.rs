use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The abstract design of a stamp, common to every physical copy of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stamp {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scott_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_owned: bool,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<StampInstance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub box_names: Vec<String>,
}

/// A group of physical copies sharing a condition and a storage box.
/// "3 Used copies in Box 1" is one instance with quantity 3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampInstance {
    pub id: String,
    pub stamp_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_name: Option<String>,
    pub quantity: i64,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageBox {
    pub id: String,
    pub name: String,
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub stamp_count: i64,
}

/// Body of `POST /api/stamps`. Absent optional fields are sent as
/// explicit nulls, matching what the server's partial decoder expects.
#[derive(Debug, Clone, Serialize)]
pub struct NewStamp {
    pub name: String,
    pub scott_number: Option<String>,
    pub issue_date: Option<String>,
    pub series: Option<String>,
    pub tags: Vec<String>,
}

/// Body of `POST /api/instances/{stamp_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct NewInstance {
    pub condition: Option<String>,
    pub box_id: Option<String>,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::NewStamp;

    #[test]
    fn test_new_stamp_sends_nulls() {
        let payload = NewStamp {
            name: "Inverted Jenny".to_string(),
            scott_number: None,
            issue_date: None,
            series: None,
            tags: vec![],
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["scott_number"].is_null());
        assert!(json["issue_date"].is_null());
        assert!(json["series"].is_null());
        assert_eq!(json["tags"], serde_json::json!([]));
    }
}
