//! HTTP client for the simulation backend.
//!
//! Every request goes through one `reqwest::Client` rooted at the configured
//! API base, so the bearer token is attached to pagination links as well as to
//! the first request of a walk.

use crate::config::Config;
use crate::error::{AppError, FetchError, Result};
use crate::services::PageSource;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Authenticated client for the simulation REST API.
pub struct BackendClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl BackendClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let base = parse_base(&config.api_base)?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            token: config.api_token.clone(),
        })
    }

    /// Base URL every relative path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a relative path, or a link returned by the backend, to a URL
    /// under the client's base.
    pub fn resolve(&self, path: &str) -> std::result::Result<Url, FetchError> {
        let relative = normalize_link(path, &self.base);
        self.base
            .join(&relative)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// GET a path and decode the body as JSON.
    pub async fn get_json(&self, path: &str) -> std::result::Result<Value, FetchError> {
        let url = self.resolve(path)?;
        debug!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16()));
        }

        Ok(response.json::<Value>().await?)
    }

    /// GET a single resource and decode it into `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, FetchError> {
        let value = self.get_json(path).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl PageSource for BackendClient {
    fn normalize_link(&self, link: &str) -> String {
        normalize_link(link, &self.base)
    }

    async fn fetch_page(&self, path: &str) -> std::result::Result<Value, FetchError> {
        self.get_json(path).await
    }
}

/// Parse the API base, forcing a trailing slash so `Url::join` appends to it.
fn parse_base(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| AppError::Config(format!("invalid API base {:?}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(AppError::Config(format!("API base {:?} cannot be a base URL", raw)));
    }
    Ok(url)
}

/// Rewrite a path or pagination link so it is relative to `base`.
///
/// Absolute links lose their scheme and host. A leading path equal to the
/// base path is removed. When the base ends in `api/v<N>/`, its path is also
/// matched with any version in that position, so links minted under another
/// API version lose the same prefix, mount path included. Otherwise a bare
/// leading `api/v<N>/` is dropped. The query string is kept as-is.
pub fn normalize_link(link: &str, base: &Url) -> String {
    let link = link.trim();
    let path_and_query = match Url::parse(link) {
        Ok(url) if !url.cannot_be_a_base() => match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        },
        _ => link.to_string(),
    };

    let base_path = base.path().trim_start_matches('/');
    let mut rest = path_and_query.trim_start_matches('/');

    if !base_path.is_empty() {
        if let Some(stripped) = rest.strip_prefix(base_path) {
            return stripped.trim_start_matches('/').to_string();
        }
    }

    if let Some(mount) = version_mount(base_path) {
        if let Some(stripped) = rest.strip_prefix(mount).and_then(strip_version_prefix) {
            return stripped.to_string();
        }
    }

    if let Some(stripped) = strip_version_prefix(rest) {
        rest = stripped;
    }
    rest.to_string()
}

/// Strip a leading `api/v<N>/` segment pair.
fn strip_version_prefix(path: &str) -> Option<&str> {
    let after_api = path.strip_prefix("api/")?;
    let (version, rest) = after_api.split_once('/')?;
    is_version(version).then_some(rest)
}

/// Path in front of a trailing `api/v<N>/` in the base path, e.g. `backend/`
/// for `backend/api/v1/` and the empty string for `api/v1/`.
fn version_mount(base_path: &str) -> Option<&str> {
    let trimmed = base_path.strip_suffix('/').unwrap_or(base_path);
    let (head, version) = trimmed.rsplit_once('/')?;
    if !is_version(version) {
        return None;
    }
    let mount = head.strip_suffix("api")?;
    (mount.is_empty() || mount.ends_with('/')).then_some(mount)
}

fn is_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .map_or(false, |digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;

    fn base() -> Url {
        parse_base("http://localhost:8000/api/v1").unwrap()
    }

    fn config_with_base(api_base: &str) -> Config {
        Config {
            api_base: api_base.to_string(),
            api_token: Some("secret".to_string()),
            poll_interval_ms: 1_000,
            request_timeout_ms: 1_000,
            max_pages: 10,
            log_capacity: 10,
            endpoints: Endpoints::default(),
        }
    }

    // =========================================================================
    // normalize_link Tests
    // =========================================================================

    #[test]
    fn test_normalize_absolute_same_prefix() {
        assert_eq!(
            normalize_link("http://host/api/v1/x?page=2", &base()),
            "x?page=2"
        );
    }

    #[test]
    fn test_normalize_absolute_other_version() {
        assert_eq!(
            normalize_link("https://api.example.com/api/v2/simulations/4/daily-results/?page=3", &base()),
            "simulations/4/daily-results/?page=3"
        );
    }

    #[test]
    fn test_normalize_mounted_base_other_version() {
        let mounted = parse_base("https://host/backend/api/v1").unwrap();
        assert_eq!(
            normalize_link("https://host/backend/api/v2/x?page=2", &mounted),
            "x?page=2"
        );
        assert_eq!(
            normalize_link("https://host/backend/api/v1/x?page=2", &mounted),
            "x?page=2"
        );
        assert_eq!(normalize_link("/backend/api/v3/simulations/4/", &mounted), "simulations/4/");
    }

    #[test]
    fn test_resolve_mounted_base_other_version() {
        let client = BackendClient::new(&config_with_base("https://host/backend/api/v1")).unwrap();
        assert_eq!(
            client
                .resolve("https://other/backend/api/v2/simulations/1/ticks/?page=2")
                .unwrap()
                .as_str(),
            "https://host/backend/api/v1/simulations/1/ticks/?page=2"
        );
    }

    #[test]
    fn test_version_mount() {
        assert_eq!(version_mount("backend/api/v1/"), Some("backend/"));
        assert_eq!(version_mount("api/v12/"), Some(""));
        assert_eq!(version_mount("backend/v1/"), None);
        assert_eq!(version_mount("myapi/v1/"), None);
        assert_eq!(version_mount(""), None);
    }

    #[test]
    fn test_normalize_relative_inputs() {
        assert_eq!(normalize_link("simulations/4/", &base()), "simulations/4/");
        assert_eq!(normalize_link("/simulations/4/", &base()), "simulations/4/");
        assert_eq!(normalize_link("/api/v1/simulations/4/", &base()), "simulations/4/");
    }

    #[test]
    fn test_normalize_keeps_non_version_segments() {
        assert_eq!(normalize_link("/api/vx/items", &base()), "api/vx/items");
        assert_eq!(normalize_link("/apiv1/items", &base()), "apiv1/items");
    }

    #[test]
    fn test_normalize_with_root_base() {
        let root = parse_base("http://localhost:9000").unwrap();
        assert_eq!(normalize_link("http://other/api/v1/x?page=2", &root), "x?page=2");
        assert_eq!(normalize_link("http://other/x?page=2", &root), "x?page=2");
    }

    // =========================================================================
    // BackendClient Tests
    // =========================================================================

    #[test]
    fn test_parse_base_adds_slash() {
        assert_eq!(base().as_str(), "http://localhost:8000/api/v1/");
    }

    #[test]
    fn test_parse_base_rejects_garbage() {
        assert!(matches!(parse_base("not a url"), Err(AppError::Config(_))));
        assert!(matches!(parse_base("mailto:ops@example.com"), Err(AppError::Config(_))));
    }

    #[test]
    fn test_resolve_rewrites_foreign_host() {
        let client = BackendClient::new(&config_with_base("http://localhost:8000/api/v1")).unwrap();
        let url = client
            .resolve("http://internal-lb:9999/api/v1/simulations/1/results/?page=2")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/v1/simulations/1/results/?page=2"
        );
    }

    #[test]
    fn test_resolve_relative_path() {
        let client = BackendClient::new(&config_with_base("http://localhost:8000/api/v1/")).unwrap();
        let url = client.resolve("simulations/1/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/v1/simulations/1/");
        assert_eq!(client.base_url().path(), "/api/v1/");
    }
}
