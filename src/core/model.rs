use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::core::constants::protocol;

/// Upstream registries send `null` for some empty lists and strings
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Provider protocol versions advertised by every release.
///
/// Injected into the index and the collectors instead of living in a global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Protocols(Vec<String>);

impl Protocols {
    pub fn new(versions: Vec<String>) -> Self {
        Self(versions)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl Default for Protocols {
    fn default() -> Self {
        Self(
            protocol::DEFAULT_PROVIDER_PROTOCOLS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        )
    }
}

/// `.well-known/terraform.json` document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellKnownServices {
    #[serde(rename = "modules.v1", default, skip_serializing_if = "Option::is_none")]
    pub modules_v1: Option<String>,
    #[serde(rename = "providers.v1", default, skip_serializing_if = "Option::is_none")]
    pub providers_v1: Option<String>,
}

impl Default for WellKnownServices {
    fn default() -> Self {
        Self {
            modules_v1: Some(protocol::DEFAULT_MODULES_V1.to_string()),
            providers_v1: Some(protocol::DEFAULT_PROVIDERS_V1.to_string()),
        }
    }
}

/// Operating system / architecture pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Key of a provider's versions index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderKey {
    pub namespace: String,
    pub name: String,
}

impl ProviderKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Registry id, `namespace/name`
    pub fn id(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Key of a single provider download document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DownloadKey {
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub os: String,
    pub arch: String,
}

impl DownloadKey {
    pub fn new(provider: &ProviderKey, version: &str, platform: &Platform) -> Self {
        Self {
            namespace: provider.namespace.clone(),
            name: provider.name.clone(),
            version: version.to_string(),
            os: platform.os.clone(),
            arch: platform.arch.clone(),
        }
    }

    pub fn provider(&self) -> ProviderKey {
        ProviderKey::new(self.namespace.clone(), self.name.clone())
    }

    pub fn platform(&self) -> Platform {
        Platform::new(self.os.clone(), self.arch.clone())
    }
}

/// `versions.json` document for one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderVersions {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub versions: Vec<ProviderVersion>,
}

impl ProviderVersions {
    pub fn new(key: &ProviderKey) -> Self {
        Self {
            id: key.id(),
            warnings: Vec::new(),
            versions: Vec::new(),
        }
    }
}

/// One release of a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderVersion {
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub protocols: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub platforms: Vec<Platform>,
}

/// Download document for one (provider, version, platform)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDownload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub protocols: Vec<String>,
    pub os: String,
    pub arch: String,
    pub filename: String,
    pub download_url: String,
    pub shasums_url: String,
    pub shasums_signature_url: String,
    pub shasum: String,
    pub signing_keys: SigningKeys,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKeys {
    #[serde(default, deserialize_with = "null_as_default")]
    pub gpg_public_keys: Vec<GpgPublicKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpgPublicKey {
    pub key_id: String,
    pub ascii_armor: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trust_signature: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_url: String,
}

/// A module archive found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedModuleVersion {
    /// Hex SHA-256 of the archive bytes, also the staged file name
    pub hash: String,
    pub namespace: String,
    pub name: String,
    pub provider: String,
    pub version: String,
    pub src: PathBuf,
}

impl CollectedModuleVersion {
    /// Registry source address, `namespace/name/provider`
    pub fn source(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.name, self.provider)
    }
}

/// `versions/index.json` document for one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleVersions {
    pub modules: Vec<ModuleProviderVersions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProviderVersions {
    pub source: String,
    pub versions: Vec<ModuleVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub version: String,
    pub root: VersionSubmodule,
    pub submodules: Vec<VersionSubmodule>,
}

impl ModuleVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            root: VersionSubmodule::default(),
            submodules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSubmodule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub providers: Vec<ModuleProviderDep>,
    pub dependencies: Vec<ModuleDep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProviderDep {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDep {
    pub name: String,
    pub source: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_serialization() {
        let json = serde_json::to_value(WellKnownServices::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"modules.v1": "/v1/modules/", "providers.v1": "/v1/providers/"})
        );
    }

    #[test]
    fn test_upstream_well_known_without_modules() {
        let wk: WellKnownServices =
            serde_json::from_str(r#"{"providers.v1": "/v1/providers/", "login.v1": {}}"#).unwrap();
        assert_eq!(wk.modules_v1, None);
        assert_eq!(wk.providers_v1.as_deref(), Some("/v1/providers/"));
    }

    #[test]
    fn test_module_version_document_shape() {
        let doc = ModuleVersions {
            modules: vec![ModuleProviderVersions {
                source: "acme/vpc/aws".to_string(),
                versions: vec![ModuleVersion::new("1.2.3")],
            }],
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "modules": [{
                    "source": "acme/vpc/aws",
                    "versions": [{
                        "version": "1.2.3",
                        "root": {"providers": [], "dependencies": []},
                        "submodules": []
                    }]
                }]
            })
        );
    }

    #[test]
    fn test_null_fields_from_upstream() {
        let versions: ProviderVersions = serde_json::from_str(
            r#"{"id": "hashicorp/random", "warnings": null, "versions": [{"version": "1.0.0", "protocols": null, "platforms": []}]}"#,
        )
        .unwrap();
        assert!(versions.warnings.is_empty());
        assert!(versions.versions[0].protocols.is_empty());

        let key: GpgPublicKey =
            serde_json::from_str(r#"{"key_id": "ABC", "ascii_armor": "", "source_url": null}"#)
                .unwrap();
        assert_eq!(key.source_url, "");
        assert_eq!(key.trust_signature, "");
    }

    #[test]
    fn test_default_protocols() {
        assert_eq!(Protocols::default().as_slice(), &["5.0".to_string()]);
    }
}
