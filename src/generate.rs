//! The generation pipeline: collect every source into a fresh index, then
//! hand the index to the selected backend.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::collectors::{GitHubCollector, ModuleCollector, RegistryCollector};
use crate::core::constants::{network, output};
use crate::core::index::{ProviderReleases, RegistryIndex};
use crate::core::model::ProviderKey;
use crate::emitters::{create_backend, OutputSettings};
use crate::error::{with_context, AppError, ContextualError, ContextualResult};
use crate::infrastructure::config::{ProviderConfig, ProviderSource, RegistryConfig, ServerType};
use crate::infrastructure::remote::{GitHubClient, HttpClient, ReleaseSource, TextFetcher};

/// Counts reported after a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSummary {
    pub server: ServerType,
    pub output_dir: PathBuf,
    pub providers: usize,
    pub provider_versions: usize,
    pub downloads: usize,
    pub module_versions: usize,
}

/// Pick the backend: explicit setting first, then Netlify when the output
/// directory already holds Netlify state, else plain files
pub fn resolve_server(configured: Option<ServerType>, output_dir: &Path) -> ServerType {
    match configured {
        Some(server) => server,
        None if output_dir.join(output::NETLIFY_STATE_DIR).is_dir() => {
            info!("found {} in output directory, using netlify", output::NETLIFY_STATE_DIR);
            ServerType::Netlify
        }
        None => ServerType::Filesystem,
    }
}

/// Runs one generation over a configuration
pub struct Generator {
    config: RegistryConfig,
    releases: Option<Box<dyn ReleaseSource>>,
    fetcher: Box<dyn TextFetcher>,
}

impl Generator {
    /// Generator talking to GitHub and upstream registries over HTTP.
    ///
    /// The GitHub client exists only when `GITHUB_TOKEN` is set.
    pub fn new(config: RegistryConfig) -> ContextualResult<Self> {
        let http = HttpClient::new(&config.http)
            .map_err(|e| e.with_context("create HTTP client"))?;
        let releases = GitHubClient::from_env(http.clone())
            .map(|client| Box::new(client) as Box<dyn ReleaseSource>);

        Ok(Self::with_sources(config, releases, Box::new(http)))
    }

    pub fn with_sources(
        config: RegistryConfig,
        releases: Option<Box<dyn ReleaseSource>>,
        fetcher: Box<dyn TextFetcher>,
    ) -> Self {
        Self {
            config,
            releases,
            fetcher,
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.config
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(output::DEFAULT_OUTPUT_DIR))
    }

    /// Drain every configured source, one at a time
    pub async fn collect(&self) -> ContextualResult<RegistryIndex> {
        let mut index = RegistryIndex::default();

        for provider in &self.config.providers {
            let collected = self.collect_provider(provider).await.map_err(|e| {
                let operation = format!("collect provider {:?}", provider.to_string());
                let hint = match &e {
                    AppError::SigningKey { .. } => {
                        Some("the key file must hold exactly one armored public key")
                    }
                    AppError::Config { message } if message.contains(network::GITHUB_TOKEN_ENV) => {
                        Some("export GITHUB_TOKEN with a token that can read the repository")
                    }
                    _ => None,
                };
                let err = e.with_context(operation);
                match hint {
                    Some(hint) => err.with_suggestion(hint),
                    None => err,
                }
            })?;

            info!(
                provider = %provider,
                versions = collected.releases.len(),
                "provider collected"
            );
            index.insert_provider(collected);
        }

        if let Some(dir) = &self.config.modules_dir {
            let modules = with_context(ModuleCollector::collect(dir), "collect modules")?;
            info!(count = modules.len(), "modules collected");
            index.add_modules(modules);
        }

        if !index.is_consistent() {
            warn!("registry index lists downloads without a matching release platform");
        }

        Ok(index)
    }

    async fn collect_provider(
        &self,
        provider: &ProviderConfig,
    ) -> Result<ProviderReleases, AppError> {
        let key = ProviderKey::new(provider.namespace.clone(), provider.name.clone());
        let protocols = self.config.protocols();

        match provider.source()? {
            ProviderSource::GitHub(source) => {
                let releases = self.releases.as_deref().ok_or_else(|| {
                    AppError::config(format!(
                        "no GitHub client configured, set {}",
                        network::GITHUB_TOKEN_ENV
                    ))
                })?;
                GitHubCollector::new(releases, self.fetcher.as_ref(), protocols)
                    .collect(key, source)
                    .await
            }
            ProviderSource::Registry(source) => {
                RegistryCollector::new(self.fetcher.as_ref(), protocols)
                    .collect(key, source)
                    .await
            }
            ProviderSource::Manual(_) => Err(AppError::Unsupported {
                message: "manual providers are not yet supported".to_string(),
            }),
        }
    }

    /// Collect everything, then write the site
    pub async fn run(&self) -> ContextualResult<GenerateSummary> {
        let index = self.collect().await?;

        let output_dir = self.output_dir();
        let server = resolve_server(self.config.server, &output_dir);
        let settings = OutputSettings {
            output_dir: output_dir.clone(),
            services: self.config.services.clone(),
            base_url: self.config.base_url.clone(),
        };

        let write = |e: AppError| -> ContextualError {
            e.with_context(format!(
                "write {server} registry to {:?}",
                output_dir.display().to_string()
            ))
        };
        let backend = create_backend(server, settings).map_err(write)?;
        backend.emit(&index).map_err(write)?;

        let provider_versions = index
            .provider_versions()
            .map(|(_, versions)| versions.versions.len())
            .sum();

        Ok(GenerateSummary {
            server,
            output_dir,
            providers: index.provider_versions().count(),
            provider_versions,
            downloads: index.downloads().count(),
            module_versions: index.modules().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeFetcher {
        documents: HashMap<String, String>,
    }

    impl FakeFetcher {
        fn with(mut self, url: &str, body: serde_json::Value) -> Self {
            self.documents.insert(url.to_string(), body.to_string());
            self
        }
    }

    #[async_trait]
    impl TextFetcher for FakeFetcher {
        async fn get_text(&self, url: &str) -> AppResult<String> {
            self.documents
                .get(url)
                .cloned()
                .ok_or_else(|| AppError::network(format!("request to {url}: HTTP 404")))
        }
    }

    fn upstream() -> FakeFetcher {
        FakeFetcher::default()
            .with(
                "https://registry.terraform.io/.well-known/terraform.json",
                serde_json::json!({"providers.v1": "/v1/providers/"}),
            )
            .with(
                "https://registry.terraform.io/v1/providers/hashicorp/random/versions",
                serde_json::json!({
                    "id": "hashicorp/random",
                    "versions": [{"version": "3.5.1", "protocols": ["5.0"],
                                  "platforms": [{"os": "linux", "arch": "amd64"}]}]
                }),
            )
            .with(
                "https://registry.terraform.io/v1/providers/hashicorp/random/3.5.1/download/linux/amd64",
                serde_json::json!({
                    "protocols": ["5.0"], "os": "linux", "arch": "amd64",
                    "filename": "terraform-provider-random_3.5.1_linux_amd64.zip",
                    "download_url": "https://releases.example.com/random.zip",
                    "shasums_url": "https://releases.example.com/SHA256SUMS",
                    "shasums_signature_url": "https://releases.example.com/SHA256SUMS.sig",
                    "shasum": "5f9c",
                    "signing_keys": {"gpg_public_keys": []}
                }),
            )
    }

    fn config(dir: &Path, toml: &str) -> RegistryConfig {
        let mut config = RegistryConfig::from_toml(toml).unwrap();
        config.output_dir = Some(dir.join("public"));
        config
    }

    #[test]
    fn test_resolve_server() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_server(None, dir.path()), ServerType::Filesystem);
        assert_eq!(
            resolve_server(Some(ServerType::Caddy), dir.path()),
            ServerType::Caddy
        );

        fs::create_dir_all(dir.path().join(".netlify")).unwrap();
        assert_eq!(resolve_server(None, dir.path()), ServerType::Netlify);
    }

    #[tokio::test]
    async fn test_modules_end_to_end() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("modules/acme/terraform-aws-vpc-1.2.3.tar.gz");
        fs::create_dir_all(archive.parent().unwrap()).unwrap();
        fs::write(&archive, b"vpc module").unwrap();

        let mut config = config(dir.path(), "");
        config.modules_dir = Some(dir.path().join("modules"));

        let generator = Generator::with_sources(config, None, Box::new(FakeFetcher::default()));
        let summary = generator.run().await.unwrap();
        assert_eq!(summary.server, ServerType::Filesystem);
        assert_eq!(summary.module_versions, 1);

        let index: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(
                dir.path().join("public/v1/modules/acme/vpc/aws/versions/index.json"),
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(index["modules"][0]["versions"][0]["version"], "1.2.3");
    }

    #[tokio::test]
    async fn test_registry_mirror_end_to_end() {
        let dir = TempDir::new().unwrap();
        let config = config(
            dir.path(),
            r#"
server = "netlify"

[[provider]]
namespace = "mirror"
name = "random"
[provider.registry]
source = "hashicorp/random"
"#,
        );

        let generator = Generator::with_sources(config, None, Box::new(upstream()));
        let summary = generator.run().await.unwrap();
        assert_eq!(summary.providers, 1);
        assert_eq!(summary.provider_versions, 1);
        assert_eq!(summary.downloads, 1);

        let out = dir.path().join("public");
        assert!(out.join("v1/providers/mirror/random/versions.json").exists());
        assert!(out.join("v1/providers/mirror/random/3.5.1-linux-amd64.json").exists());
        assert!(out.join("_redirects").exists());
    }

    #[tokio::test]
    async fn test_fatal_provider_errors_carry_identity() {
        let dir = TempDir::new().unwrap();

        let manual = config(
            dir.path(),
            r#"
[[provider]]
namespace = "acme"
name = "local"
[provider.manual]
"#,
        );
        let err = Generator::with_sources(manual, None, Box::new(FakeFetcher::default()))
            .run()
            .await
            .unwrap_err();
        assert!(err.context.operation.contains("acme/local"));
        assert!(err.to_string().contains("not yet supported"), "{err}");

        let github = config(
            dir.path(),
            r#"
[[provider]]
namespace = "acme"
name = "tool"
[provider.github]
repository = "acme/terraform-provider-tool"
public_key_file = "acme.asc"
"#,
        );
        let err = Generator::with_sources(github, None, Box::new(FakeFetcher::default()))
            .run()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("GITHUB_TOKEN"), "{err}");
        assert!(!err.context.suggestions.is_empty());

        // nothing is written when collection fails
        assert!(!dir.path().join("public").exists());
    }
}
