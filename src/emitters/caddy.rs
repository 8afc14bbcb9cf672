use serde_json::json;
use tracing::info;
use url::Url;

use super::{Backend, FileSystemBackend, OutputSettings, TemplateEngine};
use crate::core::index::RegistryIndex;
use crate::error::{AppError, AppResult};
use crate::infrastructure::config::ServerType;
use crate::utils::FileSystemUtils;

/// Filesystem output plus a `Caddyfile` and its download rules
pub struct CaddyBackend {
    files: FileSystemBackend,
    templates: TemplateEngine,
}

impl CaddyBackend {
    pub fn new(settings: OutputSettings) -> AppResult<Self> {
        Ok(Self {
            files: FileSystemBackend::new(settings),
            templates: TemplateEngine::new()?,
        })
    }

    fn host(&self) -> AppResult<String> {
        let base_url = &self.files.settings().base_url;
        Url::parse(base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .ok_or_else(|| AppError::validation("base_url", format!("{base_url:?} has no host")))
    }
}

impl Backend for CaddyBackend {
    fn server_type(&self) -> ServerType {
        ServerType::Caddy
    }

    fn setup(&self, index: &RegistryIndex) -> AppResult<()> {
        self.files.setup(index)?;

        info!("creating Caddyfile");
        let caddyfile = self.templates.render(
            "caddyfile",
            &json!({
                "host": self.host()?,
                "providers": self.files.settings().services.providers_v1.trim_end_matches('/'),
            }),
        )?;
        FileSystemUtils::write_string(&self.files.output_dir().join("Caddyfile"), &caddyfile)?;
        Ok(())
    }

    fn write_versions(&self, index: &RegistryIndex) -> AppResult<()> {
        self.files.write_versions(index)
    }

    fn write_downloads(&self, index: &RegistryIndex) -> AppResult<()> {
        self.files.write_downloads(index)?;

        let downloads = self.files.module_routes(index)?;

        info!("creating file caddy-imports/downloads");
        let rules = self
            .templates
            .render("caddy_downloads", &json!({ "downloads": downloads }))?;
        FileSystemUtils::write_string(
            &self.files.output_dir().join("caddy-imports").join("downloads"),
            &rules,
        )?;
        Ok(())
    }
}
