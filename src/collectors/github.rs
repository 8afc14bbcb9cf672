use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::core::constants::release;
use crate::core::filename::{parse_provider_asset, MalformedAssetName};
use crate::core::index::{ProviderReleases, ReleaseRecord};
use crate::core::model::{Protocols, ProviderDownload, ProviderKey};
use crate::core::shasums::{cross_reference, parse_shasums, DanglingReference, InvalidShasumsLine};
use crate::core::signing::SigningKey;
use crate::error::{AppError, AppResult};
use crate::infrastructure::config::{GitHubSource, RepositoryRef};
use crate::infrastructure::remote::{Release, ReleaseAsset, ReleaseSource, TextFetcher};

/// Why a release produced no records
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("draft release")]
    Draft,
    #[error("not valid semver: {0}")]
    InvalidVersion(#[from] semver::Error),
    #[error("no release assets")]
    NoAssets,
    #[error("no SHASUMS asset found")]
    MissingShasums,
    #[error("no signature asset found")]
    MissingSignature,
    #[error("unable to download SHASUMS asset: {0}")]
    ShasumsUnavailable(AppError),
    #[error(transparent)]
    InvalidShasums(#[from] InvalidShasumsLine),
    #[error(transparent)]
    Dangling(#[from] DanglingReference),
    #[error(transparent)]
    MalformedAsset(#[from] MalformedAssetName),
}

/// Result of processing one release
#[derive(Debug)]
pub enum ReleaseOutcome {
    Accepted(ReleaseRecord),
    Skipped(SkipReason),
}

fn skip(reason: impl Into<SkipReason>) -> AppResult<ReleaseOutcome> {
    Ok(ReleaseOutcome::Skipped(reason.into()))
}

/// Assets of a release split by role
struct PartitionedAssets<'a> {
    shasums: Option<&'a ReleaseAsset>,
    signature: Option<&'a ReleaseAsset>,
    by_name: HashMap<String, &'a ReleaseAsset>,
}

impl<'a> PartitionedAssets<'a> {
    fn new(assets: &'a [ReleaseAsset]) -> Self {
        let mut partitioned = Self {
            shasums: None,
            signature: None,
            by_name: HashMap::new(),
        };
        for asset in assets {
            if asset.name.ends_with(release::SHASUMS_SUFFIX) {
                partitioned.shasums = Some(asset);
            } else if asset.name.ends_with(release::SHASUMS_SIG_SUFFIX) {
                partitioned.signature = Some(asset);
            } else {
                partitioned.by_name.insert(asset.name.clone(), asset);
            }
        }
        partitioned
    }
}

/// Collects provider releases published on GitHub
pub struct GitHubCollector<'a> {
    releases: &'a dyn ReleaseSource,
    fetcher: &'a dyn TextFetcher,
    protocols: Protocols,
}

impl<'a> GitHubCollector<'a> {
    pub fn new(
        releases: &'a dyn ReleaseSource,
        fetcher: &'a dyn TextFetcher,
        protocols: Protocols,
    ) -> Self {
        Self {
            releases,
            fetcher,
            protocols,
        }
    }

    /// Load the signing key, then page through every release of the repository
    pub async fn collect(
        &self,
        key: ProviderKey,
        source: &GitHubSource,
    ) -> AppResult<ProviderReleases> {
        let repository: RepositoryRef = source.repository.parse()?;
        let signing_key = SigningKey::load(&source.public_key_file)?;
        debug!(provider = %key, key_id = %signing_key.key_id, "loaded signing key");

        self.collect_releases(key, &repository, &signing_key).await
    }

    pub async fn collect_releases(
        &self,
        key: ProviderKey,
        repository: &RepositoryRef,
        signing_key: &SigningKey,
    ) -> AppResult<ProviderReleases> {
        info!(provider = %key, %repository, "collecting GitHub releases");

        let mut collected = ProviderReleases::new(key);
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .releases
                .releases_page(repository, cursor.as_deref())
                .await?;

            for release in &page.nodes {
                info!(provider = %collected.key, tag = %release.tag_name, "processing tag");
                match self.process_release(release, signing_key).await? {
                    ReleaseOutcome::Accepted(record) => {
                        debug!(
                            provider = %collected.key,
                            version = %record.version,
                            platforms = record.platforms().len(),
                            "release accepted"
                        );
                        collected.push(record);
                    }
                    ReleaseOutcome::Skipped(reason) => {
                        warn!(
                            provider = %collected.key,
                            tag = %release.tag_name,
                            "skipping release: {reason}"
                        );
                    }
                }
            }

            if !page.page_info.has_next_page {
                break;
            }
            match page.page_info.end_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    return Err(AppError::network(format!(
                        "releases of {repository} report another page without a cursor"
                    )))
                }
            }
        }

        Ok(collected)
    }

    /// Turn one release into a record, or the reason it was skipped.
    ///
    /// Only an asset list spanning several pages is an error.
    pub async fn process_release(
        &self,
        release: &Release,
        signing_key: &SigningKey,
    ) -> AppResult<ReleaseOutcome> {
        if release.release_assets.page_info.has_next_page {
            return Err(AppError::Unsupported {
                message: format!(
                    "release {:?} has over {} assets",
                    release.tag_name,
                    release::PAGE_SIZE
                ),
            });
        }

        if release.is_draft {
            return skip(SkipReason::Draft);
        }

        let version = release
            .tag_name
            .strip_prefix('v')
            .unwrap_or(&release.tag_name);
        if let Err(e) = semver::Version::parse(version) {
            return skip(e);
        }

        if release.release_assets.nodes.is_empty() {
            return skip(SkipReason::NoAssets);
        }

        let assets = PartitionedAssets::new(&release.release_assets.nodes);
        let Some(shasums_asset) = assets.shasums else {
            return skip(SkipReason::MissingShasums);
        };
        let Some(signature_asset) = assets.signature else {
            return skip(SkipReason::MissingSignature);
        };

        let text = match self.fetcher.get_text(&shasums_asset.download_url).await {
            Ok(text) => text,
            Err(e) => return skip(SkipReason::ShasumsUnavailable(e)),
        };
        let sums = match parse_shasums(&text) {
            Ok(sums) => sums,
            Err(e) => return skip(e),
        };
        let resolved = match cross_reference(&sums, &assets.by_name) {
            Ok(resolved) => resolved,
            Err(e) => return skip(e),
        };

        let signing_keys = signing_key.to_signing_keys();
        let mut record = ReleaseRecord::new(version, self.protocols.to_vec());
        for (sum, asset) in resolved {
            let parsed = match parse_provider_asset(&sum.file) {
                Ok(parsed) => parsed,
                Err(e) => return skip(e),
            };

            let download = ProviderDownload {
                protocols: self.protocols.to_vec(),
                os: parsed.platform.os.clone(),
                arch: parsed.platform.arch.clone(),
                filename: sum.file.clone(),
                download_url: asset.download_url.clone(),
                shasums_url: shasums_asset.download_url.clone(),
                shasums_signature_url: signature_asset.download_url.clone(),
                shasum: sum.sum.clone(),
                signing_keys: signing_keys.clone(),
            };
            record.add_download(parsed.platform, download);
        }

        Ok(ReleaseOutcome::Accepted(record))
    }
}
