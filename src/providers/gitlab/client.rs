use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response};
use url::Url;

use super::history::{ArtifactDownloader, JobLister, PipelineLister, PAGE_SIZE};
use super::types::{Job, JobScope, Pipeline};
use crate::auth::Token;
use crate::error::{PublisherError, Result};

/// Thin GitLab REST v4 client covering the calls history continuity needs.
pub struct GitLabClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("allure-publisher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PublisherError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut base = Url::parse(base_url)
            .map_err(|e| PublisherError::Config(format!("Invalid base URL: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let api_url = base
            .join("api/v4/")
            .map_err(|e| PublisherError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    /// Construct project base URL
    fn project_url(&self, project_id: &str) -> Result<Url> {
        self.api_url
            .join(&format!("projects/{}/", urlencoding::encode(project_id)))
            .map_err(|e| PublisherError::Config(format!("Invalid project URL: {e}")))
    }

    fn endpoint(&self, project_id: &str, path: &str) -> Result<Url> {
        self.project_url(project_id)?
            .join(path)
            .map_err(|e| PublisherError::Config(format!("Invalid API URL: {e}")))
    }

    async fn get(&self, url: Url) -> Result<Response> {
        debug!("GET {url}");

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = token.apply(request);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PublisherError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(PublisherError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl PipelineLister for GitLabClient {
    async fn list_pipelines(
        &self,
        project_id: &str,
        ref_: &str,
        source: &str,
    ) -> Result<Vec<Pipeline>> {
        let mut url = self.endpoint(project_id, "pipelines")?;
        {
            let mut query = url.query_pairs_mut();
            if !ref_.is_empty() {
                query.append_pair("ref", ref_);
            }
            if !source.is_empty() {
                query.append_pair("source", source);
            }
            query
                .append_pair("per_page", &PAGE_SIZE.to_string())
                .append_pair("page", "1");
        }

        Ok(self.get(url).await?.json().await?)
    }
}

#[async_trait]
impl JobLister for GitLabClient {
    async fn list_jobs(
        &self,
        project_id: &str,
        pipeline_id: u64,
        scope: JobScope,
    ) -> Result<Vec<Job>> {
        let mut url = self.endpoint(project_id, &format!("pipelines/{pipeline_id}/jobs"))?;
        url.query_pairs_mut()
            .append_pair("scope[]", scope.as_str())
            .append_pair("include_retried", "false")
            .append_pair("per_page", &PAGE_SIZE.to_string());

        Ok(self.get(url).await?.json().await?)
    }
}

#[async_trait]
impl ArtifactDownloader for GitLabClient {
    async fn download_artifact(
        &self,
        project_id: &str,
        job_id: u64,
        artifact_path: &str,
    ) -> Result<Vec<u8>> {
        let url = self.endpoint(project_id, &format!("jobs/{job_id}/artifacts/{artifact_path}"))?;
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| PublisherError::Transport(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    #[tokio::test]
    async fn test_list_pipelines_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/123/pipelines")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ref".into(), "main".into()),
                Matcher::UrlEncoded("source".into(), "push".into()),
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .match_header("PRIVATE-TOKEN", "glpat-test")
            .with_status(200)
            .with_body(r#"[{"id": 200, "status": "running"}, {"id": 199, "status": "success"}]"#)
            .create_async()
            .await;

        let client =
            GitLabClient::new(&server.url(), Some(Token::Private("glpat-test".into()))).unwrap();
        let pipelines = client.list_pipelines("123", "main", "push").await.unwrap();

        mock.assert_async().await;
        assert_eq!(pipelines, vec![Pipeline { id: 200 }, Pipeline { id: 199 }]);
    }

    #[tokio::test]
    async fn test_list_jobs_scope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/123/pipelines/199/jobs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("scope[]".into(), "failed".into()),
                Matcher::UrlEncoded("include_retried".into(), "false".into()),
                Matcher::UrlEncoded("per_page".into(), "100".into()),
            ]))
            .match_header("JOB-TOKEN", "job-token")
            .with_status(200)
            .with_body(r#"[{"id": 555, "name": "test-job", "stage": "test"}]"#)
            .create_async()
            .await;

        let client =
            GitLabClient::new(&server.url(), Some(Token::Job("job-token".into()))).unwrap();
        let jobs = client.list_jobs("123", 199, JobScope::Failed).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            jobs,
            vec![Job {
                id: 555,
                name: "test-job".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_download_artifact() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/123/jobs/555/artifacts/reports/history/history.json")
            .with_status(200)
            .with_body(r#"{"uuid":"test-uuid"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let bytes = client
            .download_artifact("123", 555, "reports/history/history.json")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, br#"{"uuid":"test-uuid"}"#);
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/123/jobs/555/artifacts/reports/history/history.json")
            .with_status(404)
            .with_body("404 Not found")
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let err = client
            .download_artifact("123", 555, "reports/history/history.json")
            .await
            .unwrap_err();

        assert!(matches!(err, PublisherError::ApiError { status: 404, .. }));
    }

    #[test]
    fn test_project_url_encodes_path() {
        let client = GitLabClient::new("https://gitlab.example.com/gitlab", None).unwrap();
        assert_eq!(
            client.project_url("group/project").unwrap().as_str(),
            "https://gitlab.example.com/gitlab/api/v4/projects/group%2Fproject/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            GitLabClient::new("::invalid::", None),
            Err(PublisherError::Config(_))
        ));
    }
}
