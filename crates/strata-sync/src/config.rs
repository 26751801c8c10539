//! Remote API endpoint configuration.

/// Environment variable consulted when no runtime override is supplied.
pub const API_URL_ENV: &str = "STRATA_API_URL";

/// Local development default.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";

/// Where the remote API lives.
///
/// Precedence: runtime-injected override > environment variable >
/// hardcoded local default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    pub fn resolve(override_url: Option<&str>) -> Self {
        let base_url = override_url
            .map(str::to_string)
            .or_else(|| std::env::var(API_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::resolve(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test covers the whole precedence chain: splitting it up would
    // race on the process-wide environment variable.
    #[test]
    fn base_url_resolution_precedence() {
        std::env::remove_var(API_URL_ENV);
        assert_eq!(ApiConfig::resolve(None).base_url, DEFAULT_API_URL);

        std::env::set_var(API_URL_ENV, "https://api.strata.example/v1/");
        assert_eq!(
            ApiConfig::resolve(None).base_url,
            "https://api.strata.example/v1"
        );

        assert_eq!(
            ApiConfig::resolve(Some("https://staging.strata.example/v1")).base_url,
            "https://staging.strata.example/v1"
        );

        std::env::remove_var(API_URL_ENV);
    }
}
