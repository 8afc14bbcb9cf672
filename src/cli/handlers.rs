use std::path::{Path, PathBuf};

use crate::cli::commands::Commands;
use crate::core::signing::SigningKey;
use crate::error::{AppError, ContextualResult};
use crate::generate::Generator;
use crate::infrastructure::config::{
    ProviderSource, RegistryConfig, RepositoryRef, ServerType, UpstreamProvider,
};

/// Command handler
pub struct CommandHandler;

impl CommandHandler {
    pub async fn handle_command(command: Commands) -> ContextualResult<()> {
        match command {
            Commands::Generate {
                config,
                server,
                output,
                modules,
            } => Self::handle_generate(&config, server, output, modules).await,
            Commands::Validate { config } => Self::handle_validate(&config),
        }
    }

    fn load_config(path: &Path) -> ContextualResult<RegistryConfig> {
        RegistryConfig::load(path).map_err(|e| {
            e.with_context(format!("load configuration {:?}", path.display().to_string()))
                .with_suggestion("pass the configuration file with --config")
        })
    }

    async fn handle_generate(
        config_path: &Path,
        server: Option<ServerType>,
        output: Option<PathBuf>,
        modules: Option<PathBuf>,
    ) -> ContextualResult<()> {
        let mut config = Self::load_config(config_path)?;
        // command line flags win over the file
        if server.is_some() {
            config.server = server;
        }
        if output.is_some() {
            config.output_dir = output;
        }
        if modules.is_some() {
            config.modules_dir = modules;
        }

        let generator = Generator::new(config)?;
        let summary = generator.run().await?;

        println!(
            "✅ wrote {} registry to {}",
            summary.server,
            summary.output_dir.display()
        );
        println!(
            "   {} providers, {} provider versions, {} downloads, {} module versions",
            summary.providers, summary.provider_versions, summary.downloads, summary.module_versions
        );
        Ok(())
    }

    fn handle_validate(config_path: &Path) -> ContextualResult<()> {
        let config = Self::load_config(config_path)?;

        for provider in &config.providers {
            let check = |e: AppError| {
                e.with_context(format!("validate provider {:?}", provider.to_string()))
            };
            let kind = match provider.source().map_err(check)? {
                ProviderSource::GitHub(github) => {
                    let repository: RepositoryRef = github.repository.parse().map_err(check)?;
                    let key = SigningKey::load(&github.public_key_file).map_err(check)?;
                    format!("github {repository}, signing key {}", key.key_id)
                }
                ProviderSource::Registry(registry) => {
                    let upstream: UpstreamProvider = registry.source.parse().map_err(check)?;
                    format!(
                        "registry {}/{}/{}",
                        upstream.host, upstream.namespace, upstream.name
                    )
                }
                ProviderSource::Manual(_) => "manual (not yet supported)".to_string(),
            };
            println!("  {provider}: {kind}");
        }
        if let Some(dir) = &config.modules_dir {
            println!("  modules: {}", dir.display());
        }

        println!("✅ {} is valid", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const KEY: &str = include_str!("../core/testdata/single_key.asc");

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("registry.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_validate_checks_signing_keys() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("acme.asc"), KEY).unwrap();
        let body = r#"
[[provider]]
namespace = "acme"
name = "tool"
[provider.github]
repository = "acme/terraform-provider-tool"
public_key_file = "acme.asc"
"#;
        let path = write_config(dir.path(), body);
        CommandHandler::handle_validate(&path).unwrap();

        fs::write(dir.path().join("acme.asc"), "not a key").unwrap();
        let err = CommandHandler::handle_validate(&path).unwrap_err();
        assert!(err.context.operation.contains("acme/tool"));
    }

    #[test]
    fn test_validate_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = CommandHandler::handle_validate(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.context.operation.starts_with("load configuration"));
        assert!(!err.context.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_generate_flags_override_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(dir.path(), "server = \"caddy\"\noutput_dir = \"ignored\"\n");
        let out = dir.path().join("site");

        CommandHandler::handle_command(Commands::Generate {
            config: path,
            server: Some(ServerType::Filesystem),
            output: Some(out.clone()),
            modules: None,
        })
        .await
        .unwrap();

        assert!(out.join(".well-known/terraform.json").exists());
        assert!(!out.join("Caddyfile").exists());
        assert!(!dir.path().join("ignored").exists());
    }
}
