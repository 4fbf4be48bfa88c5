use crate::hubspot::{CONTACTS, DEALS, objects_path};
use crate::models::{
    CREATED_PROPERTY, Contact, CrmObject, DEAL_NAME_PROPERTY, Deal, EMAIL_PROPERTY, ObjectPage,
    OWNER_PROPERTY,
};
use crate::traits::{ApiRequest, CrmApi};
use crate::{Error, Result};

/// Paging limits for collection listings.
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub page_size: u32,
    pub max_pages: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            page_size: crate::config::MAX_PAGE_SIZE,
            max_pages: 10_000,
        }
    }
}

/// Fetch every record of `resource`, following `paging.next.after` until the
/// remote stops returning a cursor. Page order is preserved.
#[tracing::instrument(level = "info", skip(api, properties, limits))]
pub async fn fetch_all(
    api: &dyn CrmApi,
    resource: &str,
    properties: &[&str],
    limits: PageLimits,
) -> Result<Vec<CrmObject>> {
    let path = objects_path(resource);
    let properties = properties.join(",");
    let mut out = Vec::new();
    let mut after: Option<String> = None;
    let mut pages = 0usize;

    loop {
        if pages >= limits.max_pages {
            tracing::error!(
                resource,
                pages,
                "remote kept returning cursors; giving up"
            );
            return Err(Error::PaginationLimit {
                resource: resource.to_string(),
                pages,
            });
        }

        let mut req = ApiRequest::get(&path).with_query("limit", limits.page_size.to_string());
        if let Some(cursor) = after.as_deref() {
            req = req.with_query("after", cursor);
        }
        req = req.with_query("properties", properties.clone());

        let value = api.request(req).await?;
        let page: ObjectPage = serde_json::from_value(value).map_err(|source| Error::Decode {
            endpoint: path.clone(),
            source,
        })?;
        pages += 1;

        let next = page.next_after().map(str::to_string);
        tracing::debug!(resource, page = pages, records = page.results.len(), "fetched page");
        out.extend(page.results);

        match next {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }

    tracing::debug!(resource, pages, total = out.len(), "collection fetched");
    Ok(out)
}

pub async fn fetch_contacts(api: &dyn CrmApi, limits: PageLimits) -> Result<Vec<Contact>> {
    let objects = fetch_all(api, CONTACTS, &[EMAIL_PROPERTY, OWNER_PROPERTY], limits).await?;
    Ok(objects.iter().map(Contact::from).collect())
}

pub async fn fetch_deals(api: &dyn CrmApi, limits: PageLimits) -> Result<Vec<Deal>> {
    let objects = fetch_all(
        api,
        DEALS,
        &[
            DEAL_NAME_PROPERTY,
            OWNER_PROPERTY,
            EMAIL_PROPERTY,
            CREATED_PROPERTY,
        ],
        limits,
    )
    .await?;
    Ok(objects.iter().map(Deal::from).collect())
}
