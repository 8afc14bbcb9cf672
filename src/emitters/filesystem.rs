use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{Backend, DownloadRoute, OutputSettings};
use crate::core::constants::{output, protocol};
use crate::core::index::{ModuleKey, RegistryIndex};
use crate::core::model::{CollectedModuleVersion, ModuleProviderVersions, ModuleVersions};
use crate::error::{AppError, AppResult};
use crate::infrastructure::config::ServerType;
use crate::utils::FileSystemUtils;

/// Plain static files, no routing rules
pub struct FileSystemBackend {
    settings: OutputSettings,
}

impl FileSystemBackend {
    pub fn new(settings: OutputSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &OutputSettings {
        &self.settings
    }

    pub fn output_dir(&self) -> &Path {
        &self.settings.output_dir
    }

    /// Output directory of a service path such as `/v1/providers/`
    fn service_dir(&self, service: &str) -> PathBuf {
        self.output_dir().join(service.trim_matches('/'))
    }

    fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> AppResult<()> {
        debug!(file = %path.display(), "creating file");
        FileSystemUtils::write_json(path, value).map_err(|e| AppError::Path {
            path: path.display().to_string(),
            reason: format!("unable to write file: {e}"),
        })
    }

    /// Where a module archive is staged, named by its content hash
    pub fn staged_archive(&self, module: &CollectedModuleVersion) -> PathBuf {
        self.output_dir()
            .join(output::DOWNLOADS_DIR)
            .join(format!("{}.tar.gz", module.hash))
    }

    /// Site path of the staged archive, e.g. `/downloads/<hash>.tar.gz`
    pub fn archive_url_path(&self, module: &CollectedModuleVersion) -> AppResult<String> {
        let staged = self.staged_archive(module);
        let relative = FileSystemUtils::relative_path(&staged, self.output_dir())
            .ok_or_else(|| AppError::path_conversion_failed(&staged))?;
        Ok(FileSystemUtils::url_path(&relative))
    }

    /// go-getter address of a module version, served as `X-Terraform-Get`
    pub fn archive_location(&self, module: &CollectedModuleVersion) -> AppResult<String> {
        Ok(format!(
            "{}{}//*?archive=tar.gz",
            self.settings.base_url.trim_end_matches('/'),
            self.archive_url_path(module)?
        ))
    }

    /// Registry path of a module version's download endpoint
    pub fn module_download_path(&self, module: &CollectedModuleVersion) -> String {
        format!(
            "{}{}/{}/{}/{}/download",
            self.settings.services.modules_v1,
            module.namespace.to_lowercase(),
            module.name.to_lowercase(),
            module.provider.to_lowercase(),
            module.version
        )
    }

    /// Download route of every module version
    pub fn module_routes(&self, index: &RegistryIndex) -> AppResult<Vec<DownloadRoute>> {
        index
            .modules()
            .iter()
            .map(|module| {
                Ok(DownloadRoute {
                    path: self.module_download_path(module),
                    location: self.archive_location(module)?,
                })
            })
            .collect()
    }

    /// Directory holding one module's documents
    pub fn module_dir(&self, key: &ModuleKey) -> PathBuf {
        self.service_dir(&self.settings.services.modules_v1)
            .join(&key.namespace)
            .join(&key.name)
            .join(&key.provider)
    }

    fn write_provider_versions(&self, index: &RegistryIndex) -> AppResult<()> {
        let providers_dir = self.service_dir(&self.settings.services.providers_v1);
        for (key, versions) in index.provider_versions() {
            let path = providers_dir
                .join(key.namespace.to_lowercase())
                .join(key.name.to_lowercase())
                .join("versions.json");
            self.write_json(&path, versions)?;
        }
        Ok(())
    }

    fn write_module_versions(&self, index: &RegistryIndex) -> AppResult<()> {
        for (key, versions) in index.modules_by_source() {
            let document = ModuleVersions {
                modules: vec![ModuleProviderVersions {
                    source: key.source(),
                    versions,
                }],
            };
            let path = self.module_dir(&key).join("versions").join("index.json");
            self.write_json(&path, &document)?;
        }
        Ok(())
    }

    fn write_provider_downloads(&self, index: &RegistryIndex) -> AppResult<()> {
        let providers_dir = self.service_dir(&self.settings.services.providers_v1);
        for (key, download) in index.downloads() {
            let path = providers_dir
                .join(key.namespace.to_lowercase())
                .join(key.name.to_lowercase())
                .join(format!("{}-{}-{}.json", key.version, key.os, key.arch));
            self.write_json(&path, download)?;
        }
        Ok(())
    }

    /// Copy every module archive into the downloads directory
    fn stage_archives(&self, index: &RegistryIndex) -> AppResult<()> {
        for module in index.modules() {
            let staged = self.staged_archive(module);
            if staged.exists() {
                debug!(
                    source = %module.source(),
                    version = %module.version,
                    "archive already staged"
                );
                continue;
            }
            debug!(source = %module.source(), version = %module.version, "copying download file");
            FileSystemUtils::copy_file(&module.src, &staged).map_err(|e| AppError::Path {
                path: module.src.display().to_string(),
                reason: format!("unable to stage archive: {e}"),
            })?;
        }
        Ok(())
    }
}

impl Backend for FileSystemBackend {
    fn server_type(&self) -> ServerType {
        ServerType::Filesystem
    }

    fn setup(&self, _index: &RegistryIndex) -> AppResult<()> {
        info!(dir = %self.output_dir().display(), "preparing output directory");
        FileSystemUtils::clean_dir(self.output_dir(), &[output::NETLIFY_STATE_DIR])?;

        self.write_json(
            &self.output_dir().join(protocol::WELL_KNOWN_PATH),
            &self.settings.services.well_known(),
        )
    }

    fn write_versions(&self, index: &RegistryIndex) -> AppResult<()> {
        info!("writing version listings");
        self.write_provider_versions(index)?;
        self.write_module_versions(index)
    }

    fn write_downloads(&self, index: &RegistryIndex) -> AppResult<()> {
        info!("writing download documents");
        self.write_provider_downloads(index)?;
        self.stage_archives(index)
    }
}
