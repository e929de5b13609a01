/**
 * Application Configuration
 * Runtime settings read from the environment (and `.env` via dotenvy)
 */
use std::time::Duration;

/// Domain that published portfolios are served under.
pub const DEFAULT_ROOT_DOMAIN: &str = "elysien.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub root_domain: String,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3001),
            root_domain: std::env::var("ROOT_DOMAIN")
                .ok()
                .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_ROOT_DOMAIN.to_string()),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(30),
            ),
        }
    }
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Public host for a portfolio slug, e.g. `abc123.elysien.com`.
    pub fn public_host(&self, subdomain: &str) -> String {
        format!("{}.{}", subdomain, self.root_domain)
    }

    pub fn public_url(&self, subdomain: &str) -> String {
        format!("https://{}", self.public_host(subdomain))
    }

    /// Accepts either a bare slug or a full public host and returns the slug.
    pub fn strip_root_domain<'a>(&self, host: &'a str) -> &'a str {
        let split = match host.len().checked_sub(self.root_domain.len() + 1) {
            Some(split) if split > 0 => split,
            _ => return host,
        };

        match (host.get(..split), host.get(split..)) {
            (Some(slug), Some(rest))
                if rest.starts_with('.') && rest[1..].eq_ignore_ascii_case(&self.root_domain) =>
            {
                slug
            }
            _ => host,
        }
    }
}
