use crate::{Error, Result};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";
/// Six-field cron (with seconds): top of every minute.
pub const DEFAULT_SCHEDULE: &str = "0 * * * * *";
/// HubSpot caps `limit` on the objects endpoints at 100.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Process-wide settings, built once at startup and shared by `Arc`.
#[derive(Clone)]
pub struct SyncConfig {
    /// Bearer credential. Left unvalidated; an empty key fails on the first call.
    pub api_key: String,
    pub base_url: String,
    /// Cron expression driving the scheduler.
    pub schedule: String,
    pub page_size: u32,
    /// Upper bound on pages followed per collection.
    pub max_pages: usize,
    pub request_timeout: Duration,
    /// Log decisions without issuing updates.
    pub dry_run: bool,
    pub log_format: LogFormat,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            schedule: DEFAULT_SCHEDULE.to_string(),
            page_size: MAX_PAGE_SIZE,
            max_pages: 10_000,
            request_timeout: Duration::from_secs(30),
            dry_run: false,
            log_format: LogFormat::Text,
        }
    }
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("schedule", &self.schedule)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("request_timeout", &self.request_timeout)
            .field("dry_run", &self.dry_run)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(v) = lookup("API_KEY") {
            cfg.api_key = v.trim().to_string();
        }
        if let Some(v) = get("HUBSPOT_BASE_URL") {
            cfg.base_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = get("SYNC_SCHEDULE") {
            cfg.schedule = v.trim().to_string();
        }
        if let Some(v) = get("PAGE_SIZE") {
            cfg.page_size = parse_num("PAGE_SIZE", &v)?;
        }
        if let Some(v) = get("MAX_PAGES") {
            cfg.max_pages = parse_num("MAX_PAGES", &v)?;
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout = Duration::from_secs(parse_num("REQUEST_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("DRY_RUN") {
            cfg.dry_run = parse_bool(&v);
        }
        if let Some(v) = get("LOG_FORMAT") {
            cfg.log_format = LogFormat::parse(&v)
                .ok_or_else(|| Error::InvalidConfig(format!("invalid LOG_FORMAT: {v}")))?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::InvalidConfig("base_url is empty".to_string()));
        }
        if self.schedule.trim().is_empty() {
            return Err(Error::InvalidConfig("schedule is empty".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidConfig(format!(
                "page_size must be in 1..={MAX_PAGE_SIZE}"
            )));
        }
        if self.max_pages == 0 {
            return Err(Error::InvalidConfig("max_pages must be > 0".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "request_timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Printable view of the effective settings with the credential masked.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "API_KEY": redact(&self.api_key),
            "HUBSPOT_BASE_URL": self.base_url,
            "SYNC_SCHEDULE": self.schedule,
            "PAGE_SIZE": self.page_size,
            "MAX_PAGES": self.max_pages,
            "REQUEST_TIMEOUT_SECS": self.request_timeout.as_secs(),
            "DRY_RUN": self.dry_run,
            "LOG_FORMAT": self.log_format.as_str(),
        })
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, v: &str) -> Result<T> {
    v.trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("invalid {key}: {v}")))
}

fn parse_bool(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

pub fn redact(s: &str) -> String {
    if s.is_empty() {
        return "<unset>".to_string();
    }
    if s.len() <= 8 || !s.is_ascii() {
        return "***".to_string();
    }
    format!("{}***{}", &s[..4], &s[s.len() - 4..])
}
