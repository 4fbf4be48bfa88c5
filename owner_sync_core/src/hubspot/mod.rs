//! HubSpot CRM v3 access: the authenticated HTTP client and the object
//! endpoints the owner sync touches.

pub mod client;

pub use client::HubSpotClient;

pub const CONTACTS: &str = "contacts";
pub const DEALS: &str = "deals";

/// Collection endpoint for an object type.
pub fn objects_path(resource: &str) -> String {
    format!("/crm/v3/objects/{resource}")
}

/// Single-record endpoint for an object type.
pub fn object_path(resource: &str, id: &str) -> String {
    format!("/crm/v3/objects/{resource}/{id}")
}
