use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::debug;
use reqwest::{Client, Method, StatusCode};
use sha2::{Digest, Sha256};
use url::Url;

use super::ObjectStore;
use crate::error::{PublisherError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Credentials and endpoint for S3 compatible storage.
#[derive(Clone, Debug)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl S3Config {
    fn endpoint_url(&self) -> Result<Url> {
        let raw = self
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", self.region));

        Url::parse(&raw)
            .map_err(|e| PublisherError::Config(format!("Invalid S3 endpoint '{raw}': {e}")))
    }
}

/// S3 object store using path-style requests signed with Signature V4.
pub struct S3Store {
    client: Client,
    config: S3Config,
    endpoint: Url,
    bucket: String,
    base_url: Option<String>,
}

impl S3Store {
    pub fn new(config: S3Config, bucket: String, base_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("allure-publisher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PublisherError::Config(format!("Failed to create HTTP client: {e}")))?;
        let endpoint = config.endpoint_url()?;

        Ok(Self {
            client,
            config,
            endpoint,
            bucket,
            base_url,
        })
    }

    fn canonical_uri(&self, key: &str) -> String {
        let segments: Vec<String> = self
            .endpoint
            .path()
            .split('/')
            .chain(std::iter::once(self.bucket.as_str()))
            .chain(key.split('/'))
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        format!("/{}", segments.join("/"))
    }

    fn authority(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    fn request_url(&self, canonical_uri: &str) -> String {
        format!(
            "{}://{}{canonical_uri}",
            self.endpoint.scheme(),
            self.authority()
        )
    }

    async fn send(
        &self,
        method: Method,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<reqwest::Response> {
        let canonical_uri = self.canonical_uri(key);
        let signed = sign(
            &self.config,
            &method,
            &canonical_uri,
            &self.authority(),
            &body,
            Utc::now(),
        )?;
        let url = self.request_url(&canonical_uri);
        debug!("{method} {url}");

        let mut request = self
            .client
            .request(method, url)
            .header("authorization", signed.authorization);
        for (name, value) in signed.headers {
            // reqwest derives these from the URL and body
            if name == "host" || name == "content-length" {
                continue;
            }
            request = request.header(name, value);
        }
        if let Some(content_type) = content_type {
            request = request.header("content-type", content_type);
        }

        request
            .body(body)
            .send()
            .await
            .map_err(|e| PublisherError::Transport(e.to_string()))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let response = self.send(Method::PUT, key, body, Some(content_type)).await?;
        error_for_status(response).await.map(|_| ())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let response = self.send(Method::GET, key, Vec::new(), None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let bytes = error_for_status(response).await?.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    fn object_url(&self, key: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/{key}", base.trim_end_matches('/')),
            None => self.request_url(&self.canonical_uri(key)),
        }
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Err(PublisherError::ApiError {
        status: status.as_u16(),
        message,
    })
}

struct SignedRequest {
    headers: Vec<(String, String)>,
    authorization: String,
    #[cfg(test)]
    canonical_request: String,
}

fn sign(
    config: &S3Config,
    method: &Method,
    canonical_uri: &str,
    authority: &str,
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<SignedRequest> {
    let payload_hash = hex::encode(Sha256::digest(body));
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();

    let mut headers = vec![
        ("host".to_string(), authority.to_string()),
        ("x-amz-content-sha256".to_string(), payload_hash.clone()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if !body.is_empty() || *method == Method::PUT {
        headers.push(("content-length".to_string(), body.len().to_string()));
    }
    if let Some(token) = &config.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{method}\n{canonical_uri}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    );

    let credential_scope = format!("{date_stamp}/{}/s3/aws4_request", config.region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let signing_key = derive_signing_key(&config.secret_key, &date_stamp, &config.region)?;
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);
    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
        config.access_key
    );

    Ok(SignedRequest {
        headers,
        authorization,
        #[cfg(test)]
        canonical_request,
    })
}

fn derive_signing_key(secret_key: &str, date: &str, region: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, b"s3")?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| PublisherError::Config(format!("Invalid signing key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
