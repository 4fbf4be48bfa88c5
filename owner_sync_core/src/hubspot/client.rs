use crate::config::SyncConfig;
use crate::traits::{ApiRequest, CrmApi};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

/// Bearer-authenticated JSON client for the HubSpot API.
#[derive(Clone)]
pub struct HubSpotClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for HubSpotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubSpotClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HubSpotClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("build http client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    pub fn from_config(cfg: &SyncConfig) -> Result<Self> {
        Self::new(&cfg.base_url, &cfg.api_key, cfg.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| Error::InvalidConfig(format!("api key is not a valid header: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn send(&self, req: &ApiRequest) -> Result<Response> {
        let mut builder = self
            .http
            .request(req.method.clone(), self.url(&req.path))
            .headers(self.headers()?);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        builder.send().await.map_err(|source| {
            tracing::error!(endpoint = %req.path, error = %source, "hubspot request failed");
            Error::Transport {
                endpoint: req.path.clone(),
                source,
            }
        })
    }

    async fn map_error(&self, endpoint: &str, resp: Response) -> Error {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        tracing::error!(
            endpoint,
            status,
            body = %body,
            "hubspot responded with an error status"
        );
        Error::Api {
            endpoint: endpoint.to_string(),
            status,
            body,
        }
    }
}

#[async_trait]
impl CrmApi for HubSpotClient {
    #[tracing::instrument(level = "debug", skip(self, req), fields(method = %req.method, endpoint = %req.path))]
    async fn request(&self, req: ApiRequest) -> Result<Value> {
        let resp = self.send(&req).await?;
        if !resp.status().is_success() {
            return Err(self.map_error(&req.path, resp).await);
        }

        let text = resp.text().await.map_err(|source| {
            tracing::error!(endpoint = %req.path, error = %source, "reading hubspot response failed");
            Error::Transport {
                endpoint: req.path.clone(),
                source,
            }
        })?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|source| {
            tracing::error!(endpoint = %req.path, error = %source, "hubspot response was not json");
            Error::Decode {
                endpoint: req.path.clone(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn header(headers: &AxumHeaders, name: &str) -> Value {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null)
    }

    fn fake_hubspot() -> Router {
        Router::new()
            .route(
                "/crm/v3/objects/:resource",
                get(
                    |Path(resource): Path<String>,
                     headers: AxumHeaders,
                     Query(q): Query<HashMap<String, String>>| async move {
                        Json(json!({
                            "resource": resource,
                            "authorization": header(&headers, "authorization"),
                            "content_type": header(&headers, "content-type"),
                            "query": q,
                        }))
                    },
                ),
            )
            .route(
                "/crm/v3/objects/contacts/:id",
                axum::routing::patch(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                    if id == "missing" {
                        return Err((StatusCode::NOT_FOUND, "{\"message\":\"resource not found\"}"));
                    }
                    Ok(Json(json!({"id": id, "echo": body})))
                }),
            )
            .route("/empty", get(|| async { StatusCode::NO_CONTENT }))
            .route("/html", get(|| async { "<html>oops</html>" }))
    }

    fn client(base: &str) -> HubSpotClient {
        HubSpotClient::new(base, "secret-token", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn trims_trailing_slash() {
        let c = client("https://api.hubapi.com/");
        assert_eq!(c.base_url(), "https://api.hubapi.com");
    }

    #[tokio::test]
    async fn get_attaches_bearer_and_query() {
        let base = spawn(fake_hubspot()).await;
        let out = client(&base)
            .request(
                ApiRequest::get("/crm/v3/objects/deals")
                    .with_query("limit", "100")
                    .with_query("properties", "email,hubspot_owner_id"),
            )
            .await
            .unwrap();

        assert_eq!(out["resource"], "deals");
        assert_eq!(out["authorization"], "Bearer secret-token");
        assert_eq!(out["content_type"], "application/json");
        assert_eq!(out["query"]["limit"], "100");
        assert_eq!(out["query"]["properties"], "email,hubspot_owner_id");
    }

    #[tokio::test]
    async fn patch_sends_json_body() {
        let base = spawn(fake_hubspot()).await;
        let out = client(&base)
            .request(ApiRequest::patch(
                "/crm/v3/objects/contacts/42",
                json!({"properties": {"hubspot_owner_id": "7"}}),
            ))
            .await
            .unwrap();
        assert_eq!(out["id"], "42");
        assert_eq!(out["echo"]["properties"]["hubspot_owner_id"], "7");
    }

    #[tokio::test]
    async fn non_success_maps_to_api_error() {
        let base = spawn(fake_hubspot()).await;
        let err = client(&base)
            .request(ApiRequest::patch(
                "/crm/v3/objects/contacts/missing",
                json!({"properties": {}}),
            ))
            .await
            .unwrap_err();
        match err {
            Error::Api {
                endpoint,
                status,
                body,
            } => {
                assert_eq!(endpoint, "/crm/v3/objects/contacts/missing");
                assert_eq!(status, 404);
                assert!(body.contains("resource not found"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_body_is_null() {
        let base = spawn(fake_hubspot()).await;
        let out = client(&base).request(ApiRequest::get("/empty")).await.unwrap();
        assert!(out.is_null());
    }

    #[tokio::test]
    async fn non_json_body_is_decode_error() {
        let base = spawn(fake_hubspot()).await;
        let err = client(&base)
            .request(ApiRequest::get("/html"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}"))
            .request(ApiRequest::get("/crm/v3/objects/contacts"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { .. }), "got {err:?}");
    }
}
