#![cfg(test)]

use crate::traits::{ApiRequest, CrmApi};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Method;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

const OBJECTS_PREFIX: &str = "/crm/v3/objects/";

/// In-memory stand-in for the HubSpot objects API.
///
/// Listing pages are keyed by `(resource, after)`; unknown keys answer 404.
/// PATCHes are recorded and succeed unless the contact id is marked failing.
#[derive(Default)]
pub(crate) struct FakeCrm {
    pages: HashMap<(String, Option<String>), serde_json::Value>,
    failing_patches: HashSet<String>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeCrm {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(
        mut self,
        resource: &str,
        after: Option<&str>,
        page: serde_json::Value,
    ) -> Self {
        self.pages
            .insert((resource.to_string(), after.map(str::to_string)), page);
        self
    }

    pub(crate) fn failing_patch(mut self, contact_id: &str) -> Self {
        self.failing_patches.insert(contact_id.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// `(contact_id, body)` for every PATCH issued, in order.
    pub(crate) fn patches(&self) -> Vec<(String, serde_json::Value)> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == Method::PATCH)
            .map(|c| {
                let id = c.path.rsplit('/').next().unwrap_or_default().to_string();
                (id, c.body.unwrap_or_default())
            })
            .collect()
    }
}

#[async_trait]
impl CrmApi for FakeCrm {
    async fn request(&self, req: ApiRequest) -> Result<serde_json::Value> {
        self.calls.lock().unwrap().push(req.clone());
        let rest = req.path.strip_prefix(OBJECTS_PREFIX).unwrap_or_default();

        if req.method == Method::PATCH {
            let id = rest.rsplit('/').next().unwrap_or_default();
            if self.failing_patches.contains(id) {
                return Err(Error::Api {
                    endpoint: req.path.clone(),
                    status: 500,
                    body: "{\"message\":\"internal error\"}".to_string(),
                });
            }
            return Ok(serde_json::json!({ "id": id, "properties": req.body }));
        }

        let key = (
            rest.to_string(),
            req.query_value("after").map(str::to_string),
        );
        self.pages.get(&key).cloned().ok_or_else(|| Error::Api {
            endpoint: req.path.clone(),
            status: 404,
            body: format!("no page for {key:?}"),
        })
    }
}
