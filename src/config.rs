use std::path::Path;
use std::time::Duration;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use url::Url;

/// Where the users collection lives, if nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/users";

const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Settings for a [`UsersClient`](crate::UsersClient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The collection endpoint. Single users are addressed as `{base_url}/{id}`
    pub base_url: Url,
    /// Request timeout in milliseconds. \
    /// `None` leaves the transports default in place
    pub timeout_ms: Option<u64>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("Default base url is valid"),
            timeout_ms: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {

    /// Creates a config pointing at `base_url`, with everything else left at the defaults
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid base url: {base_url}"))?;
        let config = Self {
            base_url,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads a json config file, e.g. `{"base_url": "https://users.example.com/api/users", "timeout_ms": 10000}`
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Could not parse config in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the request timeout. Partial milliseconds round up, so a non-zero timeout never becomes zero
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let mut millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if timeout.subsec_nanos() % 1_000_000 != 0 {
            millis = millis.saturating_add(1);
        }
        self.timeout_ms = Some(millis);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Makes sure the base url can actually have ids appended to it
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.base_url.scheme() {
            "http" | "https" => {},
            scheme => bail!("Unsupported scheme in base url: {scheme}"),
        }
        if self.base_url.cannot_be_a_base() {
            bail!("Base url cannot have paths appended: {}", self.base_url);
        }
        if self.timeout_ms == Some(0) {
            bail!("Timeout must be greater than zero");
        }
        Ok(())
    }

}
