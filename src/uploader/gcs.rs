use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;

use super::ObjectStore;
use crate::error::{PublisherError, Result};

const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

#[derive(Clone, Debug, Default)]
pub struct GcsConfig {
    /// JSON API endpoint, mainly for emulators
    pub endpoint: Option<String>,
    /// OAuth2 bearer token
    pub access_token: Option<String>,
}

/// Google Cloud Storage through the JSON API.
pub struct GcsStore {
    client: Client,
    endpoint: Url,
    access_token: Option<String>,
    bucket: String,
    base_url: Option<String>,
}

impl GcsStore {
    pub fn new(config: GcsConfig, bucket: String, base_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("allure-publisher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PublisherError::Config(format!("Failed to create HTTP client: {e}")))?;

        let raw = config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        let endpoint = Url::parse(raw)
            .map_err(|e| PublisherError::Config(format!("Invalid GCS endpoint '{raw}': {e}")))?;

        Ok(Self {
            client,
            endpoint,
            access_token: config.access_token,
            bucket,
            base_url,
        })
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        self.endpoint
            .join(path)
            .map_err(|e| PublisherError::Config(format!("Invalid GCS URL: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let mut url = self.api_url(&format!("upload/storage/v1/b/{}/o", self.bucket))?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);
        debug!("POST {url}");

        let response = self
            .authorize(self.client.post(url))
            .header("content-type", content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| PublisherError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublisherError::ApiError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut url = self.api_url(&format!(
            "storage/v1/b/{}/o/{}",
            self.bucket,
            urlencoding::encode(key)
        ))?;
        url.query_pairs_mut().append_pair("alt", "media");
        debug!("GET {url}");

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| PublisherError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(PublisherError::ApiError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(Some(response.bytes().await?.to_vec()))
    }

    fn object_url(&self, key: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/{key}", base.trim_end_matches('/')),
            None => format!("{DEFAULT_ENDPOINT}/{}/{key}", self.bucket),
        }
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    fn store(endpoint: String) -> GcsStore {
        GcsStore::new(
            GcsConfig {
                endpoint: Some(endpoint),
                access_token: Some("ya29.token".to_string()),
            },
            "allure-reports".to_string(),
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_put_object_media_upload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/storage/v1/b/allure-reports/o")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("uploadType".into(), "media".into()),
                Matcher::UrlEncoded("name".into(), "prefix/1/index.html".into()),
            ]))
            .match_header("authorization", "Bearer ya29.token")
            .match_header("content-type", "text/html; charset=utf-8")
            .match_body("<html></html>")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        store(server.url())
            .put_object(
                "prefix/1/index.html",
                b"<html></html>".to_vec(),
                "text/html; charset=utf-8",
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_object() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/storage/v1/b/allure-reports/o/prefix%2Fhistory%2Fhistory.json")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let object = store(server.url())
            .get_object("prefix/history/history.json")
            .await
            .unwrap();

        assert_eq!(object, Some(b"[]".to_vec()));
    }

    #[tokio::test]
    async fn test_get_object_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let object = store(server.url()).get_object("missing.json").await.unwrap();
        assert!(object.is_none());
    }

    #[test]
    fn test_object_url() {
        let store = GcsStore::new(GcsConfig::default(), "bucket".to_string(), None).unwrap();
        assert_eq!(
            store.object_url("p/1/index.html"),
            "https://storage.googleapis.com/bucket/p/1/index.html"
        );
    }
}
