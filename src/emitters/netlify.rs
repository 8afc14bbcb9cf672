use serde_json::json;
use tracing::info;

use super::{Backend, FileSystemBackend, OutputSettings, RouteData, TemplateEngine};
use crate::core::index::RegistryIndex;
use crate::error::AppResult;
use crate::infrastructure::config::ServerType;
use crate::utils::FileSystemUtils;

/// Filesystem output plus Netlify `_redirects` and `_headers`
pub struct NetlifyBackend {
    files: FileSystemBackend,
    templates: TemplateEngine,
}

impl NetlifyBackend {
    pub fn new(settings: OutputSettings) -> AppResult<Self> {
        Ok(Self {
            files: FileSystemBackend::new(settings),
            templates: TemplateEngine::new()?,
        })
    }

    fn routes(&self) -> RouteData {
        let services = &self.files.settings().services;
        RouteData {
            providers: services.providers_v1.trim_end_matches('/').to_string(),
            modules: services.modules_v1.trim_end_matches('/').to_string(),
        }
    }
}

impl Backend for NetlifyBackend {
    fn server_type(&self) -> ServerType {
        ServerType::Netlify
    }

    fn setup(&self, index: &RegistryIndex) -> AppResult<()> {
        self.files.setup(index)
    }

    fn write_versions(&self, index: &RegistryIndex) -> AppResult<()> {
        self.files.write_versions(index)
    }

    fn write_downloads(&self, index: &RegistryIndex) -> AppResult<()> {
        self.files.write_downloads(index)?;

        let downloads = self.files.module_routes(index)?;
        let out = self.files.output_dir();

        // Netlify answers the rewritten download route with 200; the
        // location travels in the header and the body
        for route in &downloads {
            let document = out.join(format!("{}.json", route.path.trim_start_matches('/')));
            FileSystemUtils::write_json(&document, &json!({ "location": route.location }))?;
        }

        info!("writing redirects file");
        let redirects = self.templates.render("netlify_redirects", &self.routes())?;
        FileSystemUtils::write_string(&out.join("_redirects"), &redirects)?;

        info!("writing headers file");
        let headers = self
            .templates
            .render("netlify_headers", &json!({ "downloads": downloads }))?;
        FileSystemUtils::write_string(&out.join("_headers"), &headers)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::ModuleCollector;
    use crate::emitters::filesystem::tests::{sample_index, settings};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_netlify_glue() {
        let dir = TempDir::new().unwrap();
        let index = sample_index(dir.path());
        let backend = NetlifyBackend::new(settings(dir.path())).unwrap();
        backend.emit(&index).unwrap();

        let out = dir.path().join("public");
        let redirects = fs::read_to_string(out.join("_redirects")).unwrap();
        assert!(redirects.contains(
            "/v1/providers/:namespace/:name/:version/download/:os/:arch\t/v1/providers/:namespace/:name/:version-:os-:arch.json\t200"
        ));
        assert!(redirects.contains(
            "/v1/providers/:namespace/:name/versions\t/v1/providers/:namespace/:name/versions.json\t200"
        ));
        assert!(redirects.contains("/v1/modules/:namespace/:name/:provider/versions/index.json"));

        let headers = fs::read_to_string(out.join("_headers")).unwrap();
        assert!(headers.contains("/v1/modules/acme/vpc/aws/1.2.3/download\n"));
        assert!(headers.contains(
            "  X-Terraform-Get: https://registry.example.com/downloads/d1f0.tar.gz//*?archive=tar.gz"
        ));

        let document: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(out.join("v1/modules/acme/vpc/aws/1.2.3/download.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(
            document["location"],
            "https://registry.example.com/downloads/d1f0.tar.gz//*?archive=tar.gz"
        );

        // plain files are still there
        assert!(out.join("v1/providers/acme/tool/versions.json").exists());
        assert!(out.join("downloads/d1f0.tar.gz").exists());
    }

    #[test]
    fn test_custom_service_paths() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(dir.path());
        settings.services.providers_v1 = "/providers/v1/".to_string();
        let backend = NetlifyBackend::new(settings).unwrap();
        backend.emit(&RegistryIndex::default()).unwrap();

        let redirects = fs::read_to_string(dir.path().join("public/_redirects")).unwrap();
        assert!(redirects.contains("/providers/v1/:namespace/:name/versions\t"));
        let headers = fs::read_to_string(dir.path().join("public/_headers")).unwrap();
        assert!(!headers.contains("X-Terraform-Get"));
    }

    #[test]
    fn test_one_route_per_module_version() {
        let dir = TempDir::new().unwrap();
        let modules = dir.path().join("modules/acme");
        fs::create_dir_all(&modules).unwrap();
        fs::write(modules.join("terraform-aws-vpc-1.2.3.tar.gz"), b"gzip build").unwrap();
        fs::write(modules.join("terraform-aws-vpc-1.2.3.tgz"), b"other build").unwrap();

        let mut index = RegistryIndex::default();
        index.add_modules(ModuleCollector::collect(&dir.path().join("modules")).unwrap());
        let backend = NetlifyBackend::new(settings(dir.path())).unwrap();
        backend.emit(&index).unwrap();

        let out = dir.path().join("public");
        let headers = fs::read_to_string(out.join("_headers")).unwrap();
        assert_eq!(headers.matches("X-Terraform-Get").count(), 1, "{headers}");
        assert_eq!(fs::read_dir(out.join("downloads")).unwrap().count(), 1);
    }
}
