//! Where the feed learns about the request it is serving.
//!
//! Production reads the live rocket request; tests plug in a fixed
//! environment so URLs in feed entries are deterministic.

use crate::config::normalize_site_root;
use crate::state::AppState;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};

/// The parts of the current HTTP request the feed depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub is_secure: bool,
    pub raw_url: String,
}

pub trait FeedEnvironment {
    fn http_context(&self) -> RequestContext;

    /// Absolute site root ending in `/`, with the scheme of the request.
    fn site_root(&self) -> String;
}

/// Rewrites the scheme of the configured site root to match the request.
pub fn site_root_for(configured: &str, is_secure: bool) -> String {
    let root = normalize_site_root(configured);
    let rest = root
        .strip_prefix("https://")
        .or_else(|| root.strip_prefix("http://"))
        .unwrap_or(&root);

    if is_secure {
        format!("https://{rest}")
    } else {
        format!("http://{rest}")
    }
}

/// Environment derived from a live request.
#[derive(Debug, Clone)]
pub struct RequestEnvironment {
    context: RequestContext,
    configured_site_root: String,
}

impl RequestEnvironment {
    pub fn new(context: RequestContext, configured_site_root: impl Into<String>) -> Self {
        Self {
            context,
            configured_site_root: configured_site_root.into(),
        }
    }
}

impl FeedEnvironment for RequestEnvironment {
    fn http_context(&self) -> RequestContext {
        self.context.clone()
    }

    fn site_root(&self) -> String {
        site_root_for(&self.configured_site_root, self.context.is_secure)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestEnvironment {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(state) = request.rocket().state::<AppState>() else {
            return Outcome::Error((Status::InternalServerError, ()));
        };

        // TLS terminates at the proxy in front of the gallery.
        let is_secure = request
            .headers()
            .get_one("X-Forwarded-Proto")
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));

        let host = request
            .headers()
            .get_one("Host")
            .unwrap_or(state.config.host.as_str());
        let scheme = if is_secure { "https" } else { "http" };
        let raw_url = format!("{scheme}://{host}{}", request.uri());

        Outcome::Success(RequestEnvironment::new(
            RequestContext { is_secure, raw_url },
            state.config.site_root.clone(),
        ))
    }
}

/// Deterministic environment for tests and tooling. With a raw URL the
/// request counts as secure when the URL is https; without one it is a plain
/// http request to the feed root.
#[derive(Debug, Clone, Default)]
pub struct FixedEnvironment {
    pub raw_url: Option<String>,
    pub configured_site_root: String,
}

impl FixedEnvironment {
    pub const DEFAULT_RAW_URL: &'static str = "http://localhost/api/v2/";

    pub fn new(configured_site_root: impl Into<String>) -> Self {
        Self {
            raw_url: None,
            configured_site_root: configured_site_root.into(),
        }
    }

    pub fn with_raw_url(mut self, raw_url: impl Into<String>) -> Self {
        self.raw_url = Some(raw_url.into());
        self
    }
}

impl FeedEnvironment for FixedEnvironment {
    fn http_context(&self) -> RequestContext {
        match self.raw_url.as_deref() {
            Some(raw_url) if !raw_url.is_empty() => RequestContext {
                is_secure: raw_url.starts_with("https"),
                raw_url: raw_url.to_string(),
            },
            _ => RequestContext {
                is_secure: false,
                raw_url: Self::DEFAULT_RAW_URL.to_string(),
            },
        }
    }

    fn site_root(&self) -> String {
        site_root_for(&self.configured_site_root, self.http_context().is_secure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_root_follows_request_scheme() {
        assert_eq!(site_root_for("http://nuget.org", true), "https://nuget.org/");
        assert_eq!(site_root_for("https://nuget.org/", false), "http://nuget.org/");
        assert_eq!(site_root_for("nuget.org", false), "http://nuget.org/");
    }

    #[test]
    fn test_fixed_environment_defaults_to_insecure() {
        let env = FixedEnvironment::new("https://nuget.org/");
        let context = env.http_context();
        assert!(!context.is_secure);
        assert_eq!(context.raw_url, FixedEnvironment::DEFAULT_RAW_URL);
        assert_eq!(env.site_root(), "http://nuget.org/");
    }

    #[test]
    fn test_fixed_environment_https_raw_url() {
        let env = FixedEnvironment::new("http://nuget.org/")
            .with_raw_url("https://nuget.org/api/v2/Packages");
        assert!(env.http_context().is_secure);
        assert_eq!(env.site_root(), "https://nuget.org/");
    }

    #[test]
    fn test_fixed_environment_empty_raw_url_is_default() {
        let env = FixedEnvironment::new("http://nuget.org/").with_raw_url("");
        assert_eq!(env.http_context().raw_url, FixedEnvironment::DEFAULT_RAW_URL);
    }
}
