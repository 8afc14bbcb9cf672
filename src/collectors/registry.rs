use futures_util::future::try_join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::core::constants::protocol;
use crate::core::index::{ProviderReleases, ReleaseRecord};
use crate::core::model::{
    Protocols, ProviderDownload, ProviderKey, ProviderVersions, WellKnownServices,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::config::{RegistrySource, UpstreamProvider};
use crate::infrastructure::remote::TextFetcher;

async fn fetch_json<T: DeserializeOwned>(fetcher: &dyn TextFetcher, url: &Url) -> AppResult<T> {
    debug!(%url, "fetching");
    let body = fetcher.get_text(url.as_str()).await?;
    serde_json::from_str(&body)
        .map_err(|e| AppError::network(format!("unable to decode JSON from {url}: {e}")))
}

fn join(base: &Url, path: &str) -> AppResult<Url> {
    base.join(path).map_err(|e| {
        AppError::network(format!("unable to build URL from {base} and {path:?}: {e}"))
    })
}

/// Mirrors a provider from another registry speaking the provider protocol
pub struct RegistryCollector<'a> {
    fetcher: &'a dyn TextFetcher,
    protocols: Protocols,
}

impl<'a> RegistryCollector<'a> {
    pub fn new(fetcher: &'a dyn TextFetcher, protocols: Protocols) -> Self {
        Self { fetcher, protocols }
    }

    /// Fetch every version and platform of the upstream provider.
    ///
    /// Records are keyed by `key`, the locally configured provider, not by the
    /// upstream address. Any failed request fails the whole provider.
    pub async fn collect(
        &self,
        key: ProviderKey,
        source: &RegistrySource,
    ) -> AppResult<ProviderReleases> {
        let upstream: UpstreamProvider = source.source.parse()?;
        info!(provider = %key, upstream = %source.source, "collecting registry information");

        let providers_url = self.discover(&upstream.host).await?;
        let provider_path = format!(
            "{}/{}/",
            upstream.namespace.to_lowercase(),
            upstream.name.to_lowercase()
        );
        let provider_url = join(&providers_url, &provider_path)?;

        let versions: ProviderVersions =
            fetch_json(self.fetcher, &join(&provider_url, "versions")?).await?;
        info!(
            provider = %key,
            count = versions.versions.len(),
            "fetched upstream versions index"
        );

        let mut collected = ProviderReleases::new(key);
        for version in versions.versions {
            debug!(provider = %collected.key, version = %version.version, "fetching version");

            let protocols = if version.protocols.is_empty() {
                self.protocols.to_vec()
            } else {
                version.protocols.clone()
            };

            let base = &provider_url;
            let number = &version.version;
            let requests = version.platforms.iter().map(|platform| {
                let path = format!("{}/download/{}/{}", number, platform.os, platform.arch);
                async move {
                    let url = join(base, &path)?;
                    let download: ProviderDownload = fetch_json(self.fetcher, &url)
                        .await
                        .map_err(|e| {
                            AppError::network(format!(
                                "unable to get download info for {number:?} {platform}: {e}"
                            ))
                        })?;
                    Ok::<_, AppError>((platform.clone(), download))
                }
            });

            let mut record = ReleaseRecord::new(version.version.clone(), protocols);
            for (platform, download) in try_join_all(requests).await? {
                record.add_download(platform, download);
            }
            collected.push(record);
        }

        Ok(collected)
    }

    /// Resolve the upstream `providers.v1` service URL
    async fn discover(&self, host: &str) -> AppResult<Url> {
        let base = Url::parse(&format!("https://{host}/"))
            .map_err(|e| AppError::config(format!("invalid registry host {host:?}: {e}")))?;

        let services: WellKnownServices =
            fetch_json(self.fetcher, &join(&base, protocol::WELL_KNOWN_PATH)?)
                .await
                .map_err(|e| {
                    AppError::network(format!("unable to get service discovery information: {e}"))
                })?;

        let mut providers = services.providers_v1.ok_or_else(|| {
            AppError::network(format!("registry {host} does not offer providers.v1"))
        })?;
        if !providers.ends_with('/') {
            providers.push('/');
        }

        join(&base, &providers)
    }
}
