pub mod github_client;
pub mod http_client;

pub use github_client::*;
pub use http_client::*;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppResult;
use crate::infrastructure::config::RepositoryRef;

/// Fetches documents by URL (SHASUMS manifests, registry JSON)
#[async_trait]
pub trait TextFetcher: Send + Sync {
    async fn get_text(&self, url: &str) -> AppResult<String>;
}

/// Lists the releases of a repository, newest first, one page at a time
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn releases_page(
        &self,
        repository: &RepositoryRef,
        cursor: Option<&str>,
    ) -> AppResult<ReleasesPage>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// A page of releases
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleasesPage {
    pub page_info: PageInfo,
    pub nodes: Vec<Release>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub is_prerelease: bool,
    #[serde(default)]
    pub is_draft: bool,
    pub release_assets: ReleaseAssets,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseAssets {
    pub page_info: PageInfo,
    pub nodes: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
}
