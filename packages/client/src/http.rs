//! REST client for the override backend.
//!
//! Every non-2xx response becomes [`AdapterError::Status`] carrying the
//! status code and body, so callers can tell an expired session (401/403)
//! from everything else.

use async_trait::async_trait;
use folio_common::PageSlug;
use folio_overrides::adapter::{AdapterResult, PersistenceAdapter};
use folio_overrides::{
    AdapterError, AdminStatus, ImageUpload, OverrideId, OverrideRecord, SavePayload,
    SectionOrder, UploadedImage,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// HTTP client for a single backend.
#[derive(Debug, Clone)]
pub struct HttpAdapter {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// `GET /api/overrides` answers with a bare list or an envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum OverrideListing {
    Bare(Vec<OverrideRecord>),
    Wrapped { overrides: Vec<OverrideRecord> },
}

impl From<OverrideListing> for Vec<OverrideRecord> {
    fn from(listing: OverrideListing) -> Self {
        match listing {
            OverrideListing::Bare(records) => records,
            OverrideListing::Wrapped { overrides } => overrides,
        }
    }
}

#[derive(Serialize)]
struct SectionOrderBody<'a> {
    page: &'a PageSlug,
    order: &'a [String],
}

impl HttpAdapter {
    /// * `base_url` - Site origin, e.g. `https://example.com`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] (cookie store, proxies, pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: reqwest::RequestBuilder) -> AdapterResult<reqwest::Response> {
        let response = builder.send().await.map_err(transport)?;
        Self::ensure_success(response).await
    }

    /// Returns the response unchanged on success, or the status and body
    /// text on failure.
    async fn ensure_success(response: reqwest::Response) -> AdapterResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AdapterError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(builder: reqwest::RequestBuilder) -> AdapterResult<T> {
        let response = Self::send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| AdapterError::Decode(err.to_string()))
    }
}

fn transport(err: reqwest::Error) -> AdapterError {
    AdapterError::Transport(err.to_string())
}

#[async_trait]
impl PersistenceAdapter for HttpAdapter {
    async fn load_overrides(&self, page: &PageSlug) -> AdapterResult<Vec<OverrideRecord>> {
        debug!(page = %page, "GET /api/overrides");
        let listing: OverrideListing = Self::parse_response(
            self.request(reqwest::Method::GET, "/api/overrides")
                .query(&[("page", page.as_str())]),
        )
        .await?;
        Ok(listing.into())
    }

    async fn save_override(&self, payload: &SavePayload) -> AdapterResult<OverrideRecord> {
        debug!(selector = %payload.target_selector, update = payload.id.is_some(), "POST /api/overrides");
        Self::parse_response(
            self.request(reqwest::Method::POST, "/api/overrides")
                .json(payload),
        )
        .await
    }

    async fn delete_override(&self, id: &OverrideId) -> AdapterResult<()> {
        debug!(id = %id, "DELETE /api/overrides");
        Self::send(self.request(
            reqwest::Method::DELETE,
            &format!("/api/overrides/{}", id),
        ))
        .await?;
        Ok(())
    }

    async fn get_section_order(&self, page: &PageSlug) -> AdapterResult<SectionOrder> {
        Self::parse_response(
            self.request(reqwest::Method::GET, "/api/section-order")
                .query(&[("page", page.as_str())]),
        )
        .await
    }

    async fn set_section_order(
        &self,
        page: &PageSlug,
        order: &[String],
    ) -> AdapterResult<SectionOrder> {
        Self::parse_response(
            self.request(reqwest::Method::PUT, "/api/section-order")
                .json(&SectionOrderBody { page, order }),
        )
        .await
    }

    async fn upload_image(&self, file: &ImageUpload) -> AdapterResult<UploadedImage> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(transport)?;
        let form = reqwest::multipart::Form::new().part("image", part);

        Self::parse_response(
            self.request(reqwest::Method::POST, "/api/upload")
                .multipart(form),
        )
        .await
    }

    async fn check_admin_status(&self) -> AdapterResult<AdminStatus> {
        Self::parse_response(self.request(reqwest::Method::GET, "/api/admin/status")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let adapter = HttpAdapter::new("https://example.com/");
        assert_eq!(adapter.url("/api/overrides"), "https://example.com/api/overrides");
    }

    #[test]
    fn test_listing_shapes() {
        let bare: OverrideListing = serde_json::from_str("[]").unwrap();
        assert!(Vec::<OverrideRecord>::from(bare).is_empty());

        let wrapped: OverrideListing = serde_json::from_str(
            r#"{"overrides": [{"id": 1, "targetPage": "index", "targetSelector": "s", "contentType": "text"}]}"#,
        )
        .unwrap();
        let records = Vec::<OverrideRecord>::from(wrapped);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "1");
    }
}
