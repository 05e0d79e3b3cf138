use std::{collections::BTreeMap, fmt, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_MS: u64 = 1500;
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// How the configured `auth` value is presented to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthType {
    /// `Authorization: Basic <auth>`
    Basic,
    /// `Authorization: Bearer <auth>`
    Bearer,
    /// `X-API-Key: <auth>`
    ApiKey,
    /// `Authorization: <auth>`, value sent verbatim
    Other(String),
}

impl From<String> for AuthType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "basic" => AuthType::Basic,
            "bearer" => AuthType::Bearer,
            "x-api-key" => AuthType::ApiKey,
            _ => AuthType::Other(value),
        }
    }
}

impl From<&str> for AuthType {
    fn from(value: &str) -> Self {
        AuthType::from(value.to_string())
    }
}

impl From<AuthType> for String {
    fn from(value: AuthType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::Basic => f.write_str("basic"),
            AuthType::Bearer => f.write_str("bearer"),
            AuthType::ApiKey => f.write_str("x-api-key"),
            AuthType::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

/// Proxy settings in the `{protocol, host, port, auth}` shape used by
/// JavaScript HTTP clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub protocol: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub auth: Option<ProxyAuth>,
}

impl ProxyConfig {
    pub fn url(&self) -> String {
        let protocol = self.protocol.as_deref().unwrap_or("http");
        let protocol = protocol.trim_end_matches(':');
        match self.port {
            Some(port) => format!("{protocol}://{}:{port}", self.host),
            None => format!("{protocol}://{}", self.host),
        }
    }
}

/// Static settings applied to every request an executor sends.
///
/// Every optional field is skipped when absent; nothing here is validated
/// until the first request goes out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiConfig {
    pub base_url: String,
    pub auth_type: Option<AuthType>,
    pub auth: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub cookies: Option<Vec<String>>,
    /// Maximum redirects to follow; `0` returns 3xx responses untouched.
    pub redirect: Option<u32>,
    /// Milliseconds.
    pub timeout: Option<u64>,
    pub proxy: Option<ProxyConfig>,
    pub response_type: Option<String>,
    pub accept: Option<String>,
    pub cache_control: Option<String>,
    pub connection: Option<String>,
    pub response_output_dir: Option<PathBuf>,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_auth(mut self, auth_type: impl Into<AuthType>, auth: impl Into<String>) -> Self {
        self.auth_type = Some(auth_type.into());
        self.auth = Some(auth.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cookies<I, S>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cookies = Some(cookies.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_redirect(mut self, max: u32) -> Self {
        self.redirect = Some(max);
        self
    }

    pub fn with_timeout(mut self, millis: u64) -> Self {
        self.timeout = Some(millis);
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_response_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.response_output_dir = Some(dir.into());
        self
    }

    /// Deadline for a whole call, redirects included. Zero counts as unset.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(
            self.timeout
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_TIMEOUT_MS),
        )
    }

    pub fn max_redirects(&self) -> u32 {
        self.redirect.unwrap_or(DEFAULT_MAX_REDIRECTS)
    }
}
