//! Application constants
//!
//! Fixed values of the registry protocol and defaults for configurable settings.

/// Registry protocol constants
pub mod protocol {
    /// Path of the service discovery document
    pub const WELL_KNOWN_PATH: &str = ".well-known/terraform.json";
    /// Default modules.v1 service path
    pub const DEFAULT_MODULES_V1: &str = "/v1/modules/";
    /// Default providers.v1 service path
    pub const DEFAULT_PROVIDERS_V1: &str = "/v1/providers/";
    /// Provider protocol versions advertised for every release
    pub const DEFAULT_PROVIDER_PROTOCOLS: &[&str] = &["5.0"];
    /// Upstream host used when a registry source omits it
    pub const DEFAULT_REGISTRY_HOST: &str = "registry.terraform.io";
}

/// Release asset conventions
pub mod release {
    /// Suffix of the checksum manifest asset
    pub const SHASUMS_SUFFIX: &str = "_SHA256SUMS";
    /// Suffix of the detached manifest signature asset
    pub const SHASUMS_SIG_SUFFIX: &str = "_SHA256SUMS.sig";
    /// Page size used for releases and their assets
    pub const PAGE_SIZE: usize = 100;
}

/// Network constants
pub mod network {
    /// GitHub GraphQL endpoint
    pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
    /// Environment variable holding the GitHub API token
    pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Default retry count for transient failures
    pub const DEFAULT_RETRY_COUNT: u32 = 2;
    /// Default base delay between retries (milliseconds)
    pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
    /// Upper bound for a single backoff delay (milliseconds)
    pub const MAX_RETRY_DELAY_MS: u64 = 30_000;
    pub const USER_AGENT: &str = concat!("tfstaticregistry/", env!("CARGO_PKG_VERSION"));
}

/// Output layout constants
pub mod output {
    /// Default configuration file name
    pub const DEFAULT_CONFIG_FILE: &str = "registry.toml";
    /// Default output directory
    pub const DEFAULT_OUTPUT_DIR: &str = "public";
    /// Directory (relative to the output root) holding staged module archives
    pub const DOWNLOADS_DIR: &str = "downloads";
    /// Netlify state directory kept when the output is cleaned
    pub const NETLIFY_STATE_DIR: &str = ".netlify";
    /// Default public base URL of the generated site
    pub const DEFAULT_BASE_URL: &str = "https://registry.lvh.me:2015";
}

/// Logging constants
pub mod log {
    /// Default log filter
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}
