use crate::constants::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_UPLOAD_TIMEOUT_MS};

/// API route configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    base_url: String,
    timeout_ms: u32,
}

impl Default for ApiConfig {
    /// Same-origin `/api` unless the build injected `API_BASE_URL`.
    fn default() -> Self {
        let base = option_env!("API_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_API_BASE_URL);
        Self::from_url(base)
    }
}

impl ApiConfig {
    /// Create a new ApiConfig from a URL string
    pub fn from_url(url: &str) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    /// Copy of this configuration with the longer upload timeout.
    pub fn for_uploads(&self) -> Self {
        self.clone().with_timeout(DEFAULT_UPLOAD_TIMEOUT_MS)
    }

    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Get the base URL for all API calls
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Get a full API URL for a given path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_without_double_slashes() {
        let config = ApiConfig::from_url("https://api.example.com/api/");
        assert_eq!(config.base_url(), "https://api.example.com/api");
        assert_eq!(config.url("/workflows"), "https://api.example.com/api/workflows");
        assert_eq!(config.url("agents/3"), "https://api.example.com/api/agents/3");
    }

    #[test]
    fn upload_config_uses_longer_timeout() {
        let config = ApiConfig::from_url("/api");
        assert_eq!(config.timeout_ms(), DEFAULT_REQUEST_TIMEOUT_MS);
        assert_eq!(config.for_uploads().timeout_ms(), DEFAULT_UPLOAD_TIMEOUT_MS);
        assert_eq!(config.for_uploads().base_url(), "/api");
    }
}
