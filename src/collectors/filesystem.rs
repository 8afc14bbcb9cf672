use std::io;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::core::filename::parse_module_filename;
use crate::core::model::CollectedModuleVersion;
use crate::error::{AppError, AppResult};
use crate::utils::FileSystemUtils;

/// Scans `<modules_dir>/<namespace>/<archive>` for module versions
pub struct ModuleCollector;

impl ModuleCollector {
    /// Collect every archive whose name follows the module convention.
    ///
    /// Only files exactly one directory below `modules_dir` are considered;
    /// the directory name is the namespace. Results are ordered by path.
    pub fn collect(modules_dir: &Path) -> AppResult<Vec<CollectedModuleVersion>> {
        if !modules_dir.is_dir() {
            return Err(AppError::Path {
                path: modules_dir.display().to_string(),
                reason: "modules directory does not exist".to_string(),
            });
        }

        info!(dir = %modules_dir.display(), "collecting modules");

        let mut collected = Vec::new();
        let walker = WalkDir::new(modules_dir)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            let Some(parsed) = parse_module_filename(&file_name) else {
                debug!(file = %entry.path().display(), "not a module archive, ignoring");
                continue;
            };

            let namespace = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| AppError::path_conversion_failed(entry.path()))?;

            let hash = FileSystemUtils::sha256_file(entry.path())?;
            info!(%namespace, file = %file_name, "ingesting module");

            collected.push(CollectedModuleVersion {
                hash,
                namespace,
                name: parsed.name,
                provider: parsed.provider,
                version: parsed.version,
                src: entry.path().to_path_buf(),
            });
        }

        Ok(collected)
    }
}
