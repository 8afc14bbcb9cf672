use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::constants::{network, output, protocol};
use crate::core::model::{Protocols, WellKnownServices};
use crate::error::{AppError, AppResult};

/// Registry configuration file (`registry.toml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Target web server; detected from the output directory when unset
    #[serde(default)]
    pub server: Option<ServerType>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Directory of `<namespace>/<module archive>` files
    #[serde(default)]
    pub modules_dir: Option<PathBuf>,
    /// Public URL the generated site is served from
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_protocols")]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default, rename = "provider")]
    pub providers: Vec<ProviderConfig>,
}

fn default_base_url() -> String {
    output::DEFAULT_BASE_URL.to_string()
}

fn default_protocols() -> Vec<String> {
    Protocols::default().to_vec()
}

/// Paths advertised in `.well-known/terraform.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_modules_v1")]
    pub modules_v1: String,
    #[serde(default = "default_providers_v1")]
    pub providers_v1: String,
}

fn default_modules_v1() -> String {
    protocol::DEFAULT_MODULES_V1.to_string()
}

fn default_providers_v1() -> String {
    protocol::DEFAULT_PROVIDERS_V1.to_string()
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            modules_v1: default_modules_v1(),
            providers_v1: default_providers_v1(),
        }
    }
}

impl ServicesConfig {
    pub fn well_known(&self) -> WellKnownServices {
        WellKnownServices {
            modules_v1: Some(self.modules_v1.clone()),
            providers_v1: Some(self.providers_v1.clone()),
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_timeout_secs() -> u64 {
    network::DEFAULT_TIMEOUT_SECS
}

fn default_retry_count() -> u32 {
    network::DEFAULT_RETRY_COUNT
}

fn default_retry_delay_ms() -> u64 {
    network::DEFAULT_RETRY_DELAY_MS
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Web server the static output is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    /// Plain files, no routing rules
    Filesystem,
    /// Netlify `_redirects` and `_headers`
    Netlify,
    /// Caddyfile and import rules
    Caddy,
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerType::Filesystem => "filesystem",
            ServerType::Netlify => "netlify",
            ServerType::Caddy => "caddy",
        };
        f.write_str(name)
    }
}

impl FromStr for ServerType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "filesystem" | "fs" => Ok(ServerType::Filesystem),
            "netlify" => Ok(ServerType::Netlify),
            "caddy" => Ok(ServerType::Caddy),
            other => Err(AppError::config(format!("server type {other:?} not supported"))),
        }
    }
}

/// One `[[provider]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub github: Option<GitHubSource>,
    #[serde(default)]
    pub registry: Option<RegistrySource>,
    #[serde(default)]
    pub manual: Option<ManualSource>,
}

impl fmt::Display for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Releases of a GitHub repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSource {
    /// `owner/name`
    pub repository: String,
    /// Armored public key that signs the SHASUMS files
    pub public_key_file: PathBuf,
}

/// Mirror of a provider published by another registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySource {
    /// `[host/]namespace/name`
    pub source: String,
}

/// Placeholder for locally supplied provider builds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualSource {}

/// The source block a provider was configured with
#[derive(Debug, Clone, Copy)]
pub enum ProviderSource<'a> {
    GitHub(&'a GitHubSource),
    Registry(&'a RegistrySource),
    Manual(&'a ManualSource),
}

impl ProviderConfig {
    pub fn source(&self) -> AppResult<ProviderSource<'_>> {
        match (&self.github, &self.registry, &self.manual) {
            (Some(github), None, None) => Ok(ProviderSource::GitHub(github)),
            (None, Some(registry), None) => Ok(ProviderSource::Registry(registry)),
            (None, None, Some(manual)) => Ok(ProviderSource::Manual(manual)),
            (None, None, None) => Err(AppError::config(format!(
                "a source block of github, registry, or manual is required for provider {:?}",
                self.to_string()
            ))),
            _ => Err(AppError::config(format!(
                "only one source block is allowed for provider {:?}",
                self.to_string()
            ))),
        }
    }
}

/// GitHub repository reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepositoryRef {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(AppError::config(format!("malformed github repository {s:?}"))),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Provider address on an upstream registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamProvider {
    pub host: String,
    pub namespace: String,
    pub name: String,
}

impl FromStr for UpstreamProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let (host, namespace, name) = match parts.as_slice() {
            [namespace, name] => (protocol::DEFAULT_REGISTRY_HOST, *namespace, *name),
            [host, namespace, name] => (*host, *namespace, *name),
            _ => return Err(AppError::config(format!("malformed registry source: {s:?}"))),
        };
        if host.is_empty() || namespace.is_empty() || name.is_empty() {
            return Err(AppError::config(format!("malformed registry source: {s:?}")));
        }

        Ok(Self {
            host: host.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

impl RegistryConfig {
    /// Load and validate a configuration file.
    ///
    /// Relative paths inside the file are resolved against its directory.
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!(
                "unable to read configuration file {:?}: {}",
                path.display().to_string(),
                e
            ))
        })?;

        let mut config = Self::from_toml(&content)?;
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::config(format!("unable to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        if let Some(dir) = self.output_dir.as_mut() {
            resolve(dir);
        }
        if let Some(dir) = self.modules_dir.as_mut() {
            resolve(dir);
        }
        for provider in &mut self.providers {
            if let Some(github) = provider.github.as_mut() {
                resolve(&mut github.public_key_file);
            }
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        // output paths are lower case, so keys differing only in case collide
        let mut seen = HashSet::new();
        for p in &self.providers {
            if p.namespace.trim().is_empty() {
                return Err(AppError::validation("namespace", "a blank namespace is not allowed"));
            }
            if p.name.trim().is_empty() {
                return Err(AppError::validation("name", "a blank name is not allowed"));
            }
            p.source()?;
            if !seen.insert(p.to_string().to_lowercase()) {
                return Err(AppError::validation(
                    "provider",
                    format!("provider {:?} is configured more than once", p.to_string()),
                ));
            }
        }

        for (field, path) in [
            ("services.modules_v1", &self.services.modules_v1),
            ("services.providers_v1", &self.services.providers_v1),
        ] {
            if !path.starts_with('/') || !path.ends_with('/') {
                return Err(AppError::validation(
                    field,
                    format!("{path:?} must start and end with '/'"),
                ));
            }
        }

        if self.protocols.is_empty() {
            return Err(AppError::validation(
                "protocols",
                "at least one protocol version is required",
            ));
        }

        url::Url::parse(&self.base_url)
            .map_err(|e| AppError::validation("base_url", format!("{e}")))?;

        Ok(())
    }

    pub fn protocols(&self) -> Protocols {
        Protocols::new(self.protocols.clone())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            server: None,
            output_dir: None,
            modules_dir: None,
            base_url: default_base_url(),
            protocols: default_protocols(),
            services: ServicesConfig::default(),
            http: HttpConfig::default(),
            providers: Vec::new(),
        }
    }
}
