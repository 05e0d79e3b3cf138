mod api;
mod environment;
mod loader;

pub use api::{
    ApiConfig, AuthType, ProxyAuth, ProxyConfig, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_MS,
};
pub use environment::{EnvironmentBuilder, HarnessEnvironment};
pub use loader::{load_config, HarnessConfig, LoadedConfig, CONFIG_FILE_NAME};
