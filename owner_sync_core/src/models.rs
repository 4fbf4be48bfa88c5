use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Property carrying the record owner on both contacts and deals.
pub const OWNER_PROPERTY: &str = "hubspot_owner_id";
pub const EMAIL_PROPERTY: &str = "email";
pub const CREATED_PROPERTY: &str = "createdate";
pub const DEAL_NAME_PROPERTY: &str = "dealname";

/// A record as returned by `/crm/v3/objects/{type}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmObject {
    pub id: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

impl CrmObject {
    /// String property value; nulls and empty strings read as absent.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// One page of a collection listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectPage {
    #[serde(default)]
    pub results: Vec<CrmObject>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl ObjectPage {
    pub fn next_after(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_ref())
            .map(|n| n.after.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<PagingNext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagingNext {
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    pub email: Option<String>,
    pub owner_id: Option<String>,
}

impl From<&CrmObject> for Contact {
    fn from(obj: &CrmObject) -> Self {
        Self {
            id: obj.id.clone(),
            email: obj.property(EMAIL_PROPERTY).map(str::to_string),
            owner_id: obj.property(OWNER_PROPERTY).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    pub id: String,
    pub name: Option<String>,
    /// Denormalized join key.
    pub email: Option<String>,
    pub owner_id: Option<String>,
    /// Raw creation timestamp; see [`parse_timestamp`].
    pub created_at: Option<String>,
}

impl Deal {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

impl From<&CrmObject> for Deal {
    fn from(obj: &CrmObject) -> Self {
        let created_at = obj
            .property(CREATED_PROPERTY)
            .map(str::to_string)
            .or_else(|| obj.created_at.clone().filter(|s| !s.is_empty()));
        Self {
            id: obj.id.clone(),
            name: obj.property(DEAL_NAME_PROPERTY).map(str::to_string),
            email: obj.property(EMAIL_PROPERTY).map(str::to_string),
            owner_id: obj.property(OWNER_PROPERTY).map(str::to_string),
            created_at,
        }
    }
}

/// A contact whose owner should change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateDecision {
    pub contact_id: String,
    pub current_owner_id: Option<String>,
    pub proposed_owner_id: String,
    /// The deal the proposed owner was taken from.
    pub deal_id: String,
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub contacts: usize,
    pub deals: usize,
    pub matched: usize,
    pub updated: usize,
    pub dry_run: bool,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Parse a HubSpot timestamp.
///
/// Accepts RFC 3339 (`2024-06-01T10:00:00.000Z`), a bare date (midnight UTC),
/// or epoch milliseconds. Anything else is `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamp_forms() {
        let iso = parse_timestamp("2024-06-01T10:30:00.000Z").unwrap();
        assert_eq!(iso.to_rfc3339(), "2024-06-01T10:30:00+00:00");

        let date = parse_timestamp("2024-01-01").unwrap();
        assert_eq!(date.to_rfc3339(), "2024-01-01T00:00:00+00:00");

        let ms = parse_timestamp("1704067200000").unwrap();
        assert_eq!(ms, date);

        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("  ").is_none());
    }

    #[test]
    fn projects_contact_and_deal_from_wire_shape() {
        let contact: CrmObject = serde_json::from_value(json!({
            "id": "101",
            "properties": {"email": "a@x.com", "hubspot_owner_id": ""},
            "createdAt": "2023-01-01T00:00:00Z",
            "archived": false
        }))
        .unwrap();
        let c = Contact::from(&contact);
        assert_eq!(c.email.as_deref(), Some("a@x.com"));
        assert_eq!(c.owner_id, None);

        let deal: CrmObject = serde_json::from_value(json!({
            "id": "9",
            "properties": {"email": "a@x.com", "hubspot_owner_id": "77", "createdate": null},
            "createdAt": "2024-02-02T00:00:00Z"
        }))
        .unwrap();
        let d = Deal::from(&deal);
        assert_eq!(d.owner_id.as_deref(), Some("77"));
        assert_eq!(d.created_at.as_deref(), Some("2024-02-02T00:00:00Z"));
    }

    #[test]
    fn page_cursor() {
        let page: ObjectPage = serde_json::from_value(json!({
            "results": [],
            "paging": {"next": {"after": "200", "link": "https://example"}}
        }))
        .unwrap();
        assert_eq!(page.next_after(), Some("200"));

        let last: ObjectPage = serde_json::from_value(json!({"results": []})).unwrap();
        assert_eq!(last.next_after(), None);
    }
}
