use crate::hubspot::{CONTACTS, object_path};
use crate::models::OWNER_PROPERTY;
use crate::traits::{ApiRequest, CrmApi};
use crate::Result;

/// Set `hubspot_owner_id` on one contact via a partial update.
///
/// No read-back and no concurrency check: the last write wins remotely.
#[tracing::instrument(level = "debug", skip(api))]
pub async fn set_owner(api: &dyn CrmApi, contact_id: &str, owner_id: &str) -> Result<()> {
    let body = serde_json::json!({
        "properties": { OWNER_PROPERTY: owner_id }
    });
    api.request(ApiRequest::patch(object_path(CONTACTS, contact_id), body))
        .await?;
    Ok(())
}
