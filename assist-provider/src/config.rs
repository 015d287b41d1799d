use crate::assist::HttpAssistConfig;

/// Default settings for the HTTP assist proxy.
#[derive(Debug, Clone, Copy)]
pub struct HttpAssistDefaults {
    pub endpoint: &'static str,
    pub timeout_secs: Option<u64>,
}

/// Shared defaults so service wiring and tests stay in sync.
pub const HTTP_ASSIST_DEFAULTS: HttpAssistDefaults = HttpAssistDefaults {
    endpoint: "http://localhost:9000/prod/claude",
    timeout_secs: None,
};

/// Convenience helper to build an [`HttpAssistConfig`] from the shared
/// defaults, honoring the `GALLERY_ASSIST_ENDPOINT` environment override.
pub fn default_http_config() -> HttpAssistConfig {
    let endpoint = std::env::var("GALLERY_ASSIST_ENDPOINT")
        .unwrap_or_else(|_| HTTP_ASSIST_DEFAULTS.endpoint.to_string());
    HttpAssistConfig { endpoint, timeout_secs: HTTP_ASSIST_DEFAULTS.timeout_secs }
}
