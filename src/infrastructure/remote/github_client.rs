use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{HttpClient, ReleaseSource, ReleasesPage};
use crate::core::constants::{network, release};
use crate::error::{AppError, AppResult};
use crate::infrastructure::config::RepositoryRef;

fn releases_query() -> String {
    format!(
        r#"query($owner: String!, $name: String!, $releasesCursor: String) {{
  repository(owner: $owner, name: $name) {{
    releases(first: {page}, orderBy: {{field: CREATED_AT, direction: DESC}}, after: $releasesCursor) {{
      pageInfo {{ endCursor hasNextPage }}
      nodes {{
        tagName
        isPrerelease
        isDraft
        releaseAssets(first: {page}) {{
          pageInfo {{ endCursor hasNextPage }}
          nodes {{ contentType downloadUrl name }}
        }}
      }}
    }}
  }}
}}"#,
        page = release::PAGE_SIZE
    )
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<QueryData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    repository: Option<RepositoryData>,
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    releases: ReleasesPage,
}

/// GitHub GraphQL API client
pub struct GitHubClient {
    http: HttpClient,
    token: String,
    endpoint: String,
}

impl GitHubClient {
    pub fn new(http: HttpClient, token: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
            endpoint: network::GITHUB_GRAPHQL_URL.to_string(),
        }
    }

    /// Token from `GITHUB_TOKEN`; `None` when unset or empty
    pub fn from_env(http: HttpClient) -> Option<Self> {
        std::env::var(network::GITHUB_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .map(|token| Self::new(http, token))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ReleaseSource for GitHubClient {
    async fn releases_page(
        &self,
        repository: &RepositoryRef,
        cursor: Option<&str>,
    ) -> AppResult<ReleasesPage> {
        let body = json!({
            "query": releases_query(),
            "variables": {
                "owner": repository.owner,
                "name": repository.name,
                "releasesCursor": cursor,
            },
        });

        let response: GraphQlResponse = self
            .http
            .post_json(&self.endpoint, &self.token, &body)
            .await?;

        if !response.errors.is_empty() {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(AppError::network(format!(
                "GitHub query for {} failed: {}",
                repository,
                messages.join("; ")
            )));
        }

        response
            .data
            .and_then(|d| d.repository)
            .map(|r| r.releases)
            .ok_or_else(|| AppError::network(format!("repository {} not found", repository)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::HttpConfig;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> GitHubClient {
        let http = HttpClient::new(&HttpConfig {
            timeout_secs: 5,
            retry_count: 0,
            retry_delay_ms: 1,
        })
        .unwrap();
        GitHubClient::new(http, "secret").with_endpoint(server.url("/graphql"))
    }

    fn repo() -> RepositoryRef {
        "acme/terraform-provider-tool".parse().unwrap()
    }

    #[tokio::test]
    async fn test_releases_page() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/graphql")
                .header("authorization", "Bearer secret")
                .body_includes("terraform-provider-tool");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{"data": {"repository": {"releases": {
                        "pageInfo": {"endCursor": "Y3Vyc29y", "hasNextPage": true},
                        "nodes": [{
                            "tagName": "v1.0.0",
                            "isPrerelease": false,
                            "isDraft": false,
                            "releaseAssets": {
                                "pageInfo": {"endCursor": null, "hasNextPage": false},
                                "nodes": [{
                                    "contentType": "application/zip",
                                    "downloadUrl": "https://github.com/acme/tool/releases/download/v1.0.0/tool_1.0.0_linux_amd64.zip",
                                    "name": "tool_1.0.0_linux_amd64.zip"
                                }]
                            }
                        }]
                    }}}}"#,
                );
        });

        let page = client(&server).releases_page(&repo(), None).await.unwrap();
        mock.assert();

        assert!(page.page_info.has_next_page);
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("Y3Vyc29y"));
        assert_eq!(page.nodes.len(), 1);
        assert_eq!(page.nodes[0].tag_name, "v1.0.0");
        assert_eq!(
            page.nodes[0].release_assets.nodes[0].name,
            "tool_1.0.0_linux_amd64.zip"
        );
    }

    #[tokio::test]
    async fn test_graphql_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(200).body(
                r#"{"data": {"repository": null}, "errors": [{"message": "Could not resolve to a Repository"}]}"#,
            );
        });

        let err = client(&server)
            .releases_page(&repo(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Could not resolve"), "{err}");
    }
}
