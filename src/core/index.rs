use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::core::model::{
    CollectedModuleVersion, DownloadKey, ModuleVersion, Platform, ProviderDownload, ProviderKey,
    ProviderVersion, ProviderVersions,
};

/// One release and the download documents of each of its platforms.
///
/// Built by a collector and handed to the index as a unit, so a release is
/// either fully present or absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord {
    pub version: String,
    pub protocols: Vec<String>,
    downloads: Vec<(Platform, ProviderDownload)>,
}

impl ReleaseRecord {
    pub fn new(version: impl Into<String>, protocols: Vec<String>) -> Self {
        Self {
            version: version.into(),
            protocols,
            downloads: Vec::new(),
        }
    }

    /// Add a platform; a repeated platform replaces the earlier download
    pub fn add_download(&mut self, platform: Platform, download: ProviderDownload) {
        match self.downloads.iter_mut().find(|(p, _)| *p == platform) {
            Some(existing) => existing.1 = download,
            None => self.downloads.push((platform, download)),
        }
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.downloads.iter().map(|(p, _)| p.clone()).collect()
    }
}

/// Every accepted release of one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReleases {
    pub key: ProviderKey,
    pub releases: Vec<ReleaseRecord>,
}

impl ProviderReleases {
    pub fn new(key: ProviderKey) -> Self {
        Self {
            key,
            releases: Vec::new(),
        }
    }

    pub fn push(&mut self, release: ReleaseRecord) {
        self.releases.push(release);
    }
}

/// Module versions sharing one `namespace/name/provider` source.
///
/// Segments are lower case, matching the emitted paths.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ModuleKey {
    pub namespace: String,
    pub name: String,
    pub provider: String,
}

impl ModuleKey {
    pub fn of(module: &CollectedModuleVersion) -> Self {
        Self {
            namespace: module.namespace.to_lowercase(),
            name: module.name.to_lowercase(),
            provider: module.provider.to_lowercase(),
        }
    }

    pub fn source(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.name, self.provider)
    }
}

/// In-memory registry built during one generation run.
///
/// Collectors write, emitters read. Ordered maps keep output deterministic.
#[derive(Debug, Clone, Default)]
pub struct RegistryIndex {
    provider_versions: BTreeMap<ProviderKey, ProviderVersions>,
    downloads: BTreeMap<DownloadKey, ProviderDownload>,
    modules: Vec<CollectedModuleVersion>,
    module_versions: BTreeSet<(ModuleKey, String)>,
}

impl RegistryIndex {

    /// Store a provider's releases under `(namespace, name)`.
    ///
    /// A provider collected twice keeps only the second collection.
    pub fn insert_provider(&mut self, collected: ProviderReleases) {
        let key = collected.key;
        if self.provider_versions.remove(&key).is_some() {
            warn!(
                provider = %key,
                "provider collected more than once, keeping the last collection"
            );
            self.downloads
                .retain(|k, _| k.namespace != key.namespace || k.name != key.name);
        }

        let mut versions = ProviderVersions::new(&key);
        for release in collected.releases {
            versions.versions.push(ProviderVersion {
                version: release.version.clone(),
                protocols: release.protocols.clone(),
                platforms: release.platforms(),
            });
            for (platform, download) in release.downloads {
                self.downloads
                    .insert(DownloadKey::new(&key, &release.version, &platform), download);
            }
        }

        self.provider_versions.insert(key, versions);
    }

    /// Record module archives. One archive per `(source, version)`: the
    /// first one wins and later ones are dropped with a warning.
    pub fn add_modules(&mut self, modules: impl IntoIterator<Item = CollectedModuleVersion>) {
        for module in modules {
            let key = (ModuleKey::of(&module), module.version.clone());
            if !self.module_versions.insert(key) {
                warn!(
                    source = %module.source(),
                    version = %module.version,
                    archive = %module.src.display(),
                    "module version already collected, ignoring archive"
                );
                continue;
            }
            self.modules.push(module);
        }
    }

    pub fn provider_versions(&self) -> impl Iterator<Item = (&ProviderKey, &ProviderVersions)> {
        self.provider_versions.iter()
    }

    pub fn downloads(&self) -> impl Iterator<Item = (&DownloadKey, &ProviderDownload)> {
        self.downloads.iter()
    }

    pub fn download(&self, key: &DownloadKey) -> Option<&ProviderDownload> {
        self.downloads.get(key)
    }

    pub fn versions_of(&self, key: &ProviderKey) -> Option<&ProviderVersions> {
        self.provider_versions.get(key)
    }

    pub fn modules(&self) -> &[CollectedModuleVersion] {
        &self.modules
    }

    /// Module versions grouped by source, in collection order within a group
    pub fn modules_by_source(&self) -> BTreeMap<ModuleKey, Vec<ModuleVersion>> {
        let mut grouped: BTreeMap<ModuleKey, Vec<ModuleVersion>> = BTreeMap::new();
        for module in &self.modules {
            grouped
                .entry(ModuleKey::of(module))
                .or_default()
                .push(ModuleVersion::new(module.version.clone()));
        }
        grouped
    }

    /// Every download must be listed as a platform of its release
    pub fn is_consistent(&self) -> bool {
        self.downloads.keys().all(|key| {
            self.provider_versions
                .get(&key.provider())
                .and_then(|pv| pv.versions.iter().find(|v| v.version == key.version))
                .map(|v| v.platforms.contains(&key.platform()))
                .unwrap_or(false)
        })
    }
}
