//! Public site URLs and toast redirects
//!
//! Redirect targets carry a toast message in the query string
//! (`?error=...&error_description=...`) that the frontend renders.

use url::form_urlencoded;

/// Base URL used when no public site URL is configured
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000/";

/// Normalized public base URL of the web application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrl {
    base: String,
}

impl SiteUrl {
    /// Build from a configured value, falling back to [`DEFAULT_SITE_URL`]
    /// when absent or blank. Trailing slashes are dropped and `https://` is
    /// prefixed when the value carries no http scheme.
    pub fn from_env_value(value: Option<&str>) -> Self {
        let raw = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_SITE_URL);

        let trimmed = raw.trim_end_matches('/');
        let base = if trimmed.contains("http") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        Self { base }
    }

    /// Absolute URL for `path` (leading slashes ignored). An empty path
    /// yields the bare base URL.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base.clone()
        } else {
            format!("{}/{}", self.base, path)
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

impl Default for SiteUrl {
    fn default() -> Self {
        Self::from_env_value(None)
    }
}

/// Redirect to `path` with an error toast. The description is omitted when
/// empty.
pub fn error_redirect(path: &str, name: &str, description: &str) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("error", name);
    if !description.is_empty() {
        query.append_pair("error_description", description);
    }

    format!("{}?{}", path, query.finish())
}
