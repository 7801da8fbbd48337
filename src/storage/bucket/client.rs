use bytes::Bytes;
use reqwest::{header, StatusCode};

use super::signer::Signer;
use crate::config::BucketConfig;
use crate::error::{AppError, Result};

/// Signature lifetime for server-side requests
const REQUEST_SIGN_SECS: u32 = 600;

/// Minimal object client: put, get, head, delete and presigned GET
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    secret_id: String,
    secret_key: String,
    host: String,
}

impl Client {
    pub fn new(config: &BucketConfig) -> Self {
        let host = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("{}.cos.{}.myqcloud.com", config.bucket, config.region));
        Self {
            http: reqwest::Client::new(),
            secret_id: config.secret_id.clone(),
            secret_key: config.secret_key.clone(),
            host,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `key` -> `/key`
    pub fn url_path(key: &str) -> String {
        format!("/{}", key.trim_start_matches('/'))
    }

    fn url(&self, url_path: &str) -> String {
        format!("https://{}{}", self.host(), url_path)
    }

    fn authorization(&self, method: &str, url_path: &str, valid_secs: u32) -> String {
        Signer::new(method, url_path)
            .header("host", &self.host)
            .sign(&self.secret_id, &self.secret_key, valid_secs)
    }

    fn request(&self, method: reqwest::Method, key: &str) -> reqwest::RequestBuilder {
        let url_path = Self::url_path(key);
        let auth = self.authorization(method.as_str(), &url_path, REQUEST_SIGN_SECS);
        self.http
            .request(method, self.url(&url_path))
            .header(header::HOST, &self.host)
            .header(header::AUTHORIZATION, auth)
    }

    pub async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        let resp = self
            .request(reqwest::Method::PUT, key)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, data.len())
            .body(data)
            .send()
            .await?;
        check(resp.status(), key)
    }

    pub async fn get_object(&self, key: &str) -> Result<Bytes> {
        let resp = self.request(reqwest::Method::GET, key).send().await?;
        check(resp.status(), key)?;
        Ok(resp.bytes().await?)
    }

    pub async fn head_object(&self, key: &str) -> Result<bool> {
        let resp = self.request(reqwest::Method::HEAD, key).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status => check(status, key).map(|_| true),
        }
    }

    pub async fn delete_object(&self, key: &str) -> Result<()> {
        let resp = self.request(reqwest::Method::DELETE, key).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status => check(status, key),
        }
    }

    /// Presigned GET URL valid for `expire_secs`
    pub fn presigned_url(&self, key: &str, expire_secs: u32) -> String {
        let url_path = Self::url_path(key);
        let signature = self.authorization("get", &url_path, expire_secs);
        format!("{}?{}", self.url(&url_path), signature)
    }
}

fn check(status: StatusCode, key: &str) -> Result<()> {
    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound("File not found".to_string()));
    }
    if !status.is_success() {
        return Err(AppError::Storage(format!(
            "Bucket request for {} failed with status {}",
            key, status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BucketConfig {
        BucketConfig {
            secret_id: "AKID".to_string(),
            secret_key: "secret".to_string(),
            bucket: "photos-125".to_string(),
            region: "ap-guangzhou".to_string(),
            ..BucketConfig::default()
        }
    }

    #[test]
    fn test_default_host() {
        let client = Client::new(&config());
        assert_eq!(client.host(), "photos-125.cos.ap-guangzhou.myqcloud.com");
    }

    #[test]
    fn test_endpoint_override_and_paths() {
        let mut cfg = config();
        cfg.endpoint = Some("storage.local:9000".to_string());
        let client = Client::new(&cfg);
        assert_eq!(client.host(), "storage.local:9000");
        assert_eq!(Client::url_path("a.jpg"), "/a.jpg");
        assert_eq!(Client::url_path("/a.jpg"), "/a.jpg");

        let url = client.presigned_url("gallery/a.jpg", 60);
        assert!(url.starts_with("https://storage.local:9000/gallery/a.jpg?q-sign-algorithm=sha1&q-ak=AKID"));
    }
}
