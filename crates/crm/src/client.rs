//! CRM client trait and HTTP implementation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value, json};
use url::Url;

use crate::envelope::{RecordResult, parse_record_results};
use crate::error::CrmError;
use crate::token::TokenProvider;

/// Module holding deals.
pub const DEALS_MODULE: &str = "Deals";

/// Module holding vehicle records.
pub const VEHICLES_MODULE: &str = "Vehicles";

/// Trait for the remote CRM operations used by the order saga.
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Creates records in `module`, returning one result per submitted record
    /// in submission order.
    async fn create_records(
        &self,
        module: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordResult>, CrmError>;

    /// Uploads a local file as an attachment of a record.
    async fn attach_file(&self, module: &str, record_id: &str, file: &Path)
    -> Result<(), CrmError>;

    /// Attaches a remote document to a record by URL.
    async fn attach_url(&self, module: &str, record_id: &str, url: &Url) -> Result<(), CrmError>;

    /// Updates fields of an existing record, returning the CRM's response body.
    async fn update_record(
        &self,
        module: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Value, CrmError>;
}

/// Appends path segments to a base URL, keeping any path the base already has.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(segments);
    Some(url)
}

/// CRM client speaking the v2 REST API over HTTP.
pub struct HttpCrmClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpCrmClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(
        base_url: Url,
        tokens: Arc<dyn TokenProvider>,
        timeout: Duration,
    ) -> Result<Self, CrmError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, CrmError> {
        endpoint(&self.base_url, segments).ok_or_else(|| {
            CrmError::MalformedResponse(format!("invalid CRM base url: {}", self.base_url))
        })
    }

    async fn authorization(&self) -> Result<String, CrmError> {
        let token = self.tokens.access_token().await?;
        Ok(format!("Zoho-oauthtoken {token}"))
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, CrmError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrmError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn post_attachment(&self, module: &str, record_id: &str, form: Form) -> Result<(), CrmError> {
        let url = self.url(&[module, record_id, "Attachments"])?;
        let response = self
            .http
            .post(url)
            .header("Authorization", self.authorization().await?)
            .multipart(form)
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        tracing::debug!(module, record_id, response = %body, "attachment uploaded");
        Ok(())
    }
}

#[async_trait]
impl CrmClient for HttpCrmClient {
    #[tracing::instrument(skip(self, records), fields(count = records.len()))]
    async fn create_records(
        &self,
        module: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordResult>, CrmError> {
        let response = self
            .http
            .post(self.url(&[module])?)
            .header("Authorization", self.authorization().await?)
            .json(&json!({ "data": records }))
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        parse_record_results(body)
    }

    #[tracing::instrument(skip(self))]
    async fn attach_file(
        &self,
        module: &str,
        record_id: &str,
        file: &Path,
    ) -> Result<(), CrmError> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        self.post_attachment(module, record_id, form).await
    }

    #[tracing::instrument(skip(self))]
    async fn attach_url(&self, module: &str, record_id: &str, url: &Url) -> Result<(), CrmError> {
        let form = Form::new().text("attachmentUrl", url.to_string());
        self.post_attachment(module, record_id, form).await
    }

    #[tracing::instrument(skip(self, fields))]
    async fn update_record(
        &self,
        module: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Value, CrmError> {
        let response = self
            .http
            .put(self.url(&[module, record_id])?)
            .header("Authorization", self.authorization().await?)
            .json(&json!({ "data": [fields] }))
            .send()
            .await?;

        Self::read_json(response).await
    }
}
