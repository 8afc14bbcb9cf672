//! Output backends. Each one reads a finished [`RegistryIndex`] and writes
//! the static site for one kind of web server.

pub mod caddy;
pub mod filesystem;
pub mod netlify;
pub mod templates;

pub use caddy::*;
pub use filesystem::*;
pub use netlify::*;
pub use templates::*;

use std::path::PathBuf;
use tracing::info;

use crate::core::index::RegistryIndex;
use crate::error::AppResult;
use crate::infrastructure::config::{ServerType, ServicesConfig};

/// Writes the registry for one server type.
///
/// Backends never modify the index, and running one twice over the same
/// index produces the same tree.
pub trait Backend {
    /// Server type this backend targets
    fn server_type(&self) -> ServerType;

    /// Reset the output directory and write service discovery
    fn setup(&self, index: &RegistryIndex) -> AppResult<()>;

    /// Write provider and module version listings
    fn write_versions(&self, index: &RegistryIndex) -> AppResult<()>;

    /// Write download documents, staged archives and routing rules
    fn write_downloads(&self, index: &RegistryIndex) -> AppResult<()>;

    /// Run every stage in order
    fn emit(&self, index: &RegistryIndex) -> AppResult<()> {
        info!(server = %self.server_type(), "writing registry");
        self.setup(index)?;
        self.write_versions(index)?;
        self.write_downloads(index)?;
        Ok(())
    }
}

/// Settings shared by every backend
#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub output_dir: PathBuf,
    pub services: ServicesConfig,
    /// Public URL of the site, used for module download locations
    pub base_url: String,
}

/// Build the backend for `server`
pub fn create_backend(server: ServerType, settings: OutputSettings) -> AppResult<Box<dyn Backend>> {
    let backend: Box<dyn Backend> = match server {
        ServerType::Filesystem => Box::new(FileSystemBackend::new(settings)),
        ServerType::Netlify => Box::new(NetlifyBackend::new(settings)?),
        ServerType::Caddy => Box::new(CaddyBackend::new(settings)?),
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_backend() {
        let settings = OutputSettings {
            output_dir: PathBuf::from("public"),
            services: ServicesConfig::default(),
            base_url: "https://registry.example.com".to_string(),
        };
        for server in [ServerType::Filesystem, ServerType::Netlify, ServerType::Caddy] {
            let backend = create_backend(server, settings.clone()).unwrap();
            assert_eq!(backend.server_type(), server);
        }
    }
}
