//! HTTP client for the drug registry API
//!
//! Implements the [`RegistrySource`] trait against the registry's REST
//! endpoints: the paginated catalog, per-item detail, per-item document
//! metadata, and raw document download. Transport and status failures are
//! mapped into [`RegistryError`] at this boundary; transient failures are
//! retried with exponential backoff, terminal failures are returned to the
//! caller untouched.

use crate::adapters::registry::models::{DocumentMetadataPayload, DrugDetailPayload};
use crate::adapters::registry::pacer::RequestPacer;
use crate::config::RegistryConfig;
use crate::domain::errors::RegistryError;
use crate::domain::{DocumentDescriptor, DrugCode, DrugRecord, MedregError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Header carrying the optional registry API key
const API_KEY_HEADER: &str = "X-Api-Key";

/// Source of catalog, detail, and document data
///
/// The ingestion pipeline depends on this trait rather than on the HTTP
/// client so the per-item control flow can be exercised against in-memory
/// doubles.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Fetches the full catalog of drug codes for a reporting period
    ///
    /// Pages through the catalog endpoint, deduplicating codes while
    /// preserving first-seen order.
    async fn fetch_catalog(
        &self,
        period: &str,
        page_size: usize,
    ) -> Result<Vec<DrugCode>, RegistryError>;

    /// Fetches full metadata for one item
    async fn fetch_detail(&self, code: &DrugCode) -> Result<DrugRecord, RegistryError>;

    /// Fetches document descriptors for one item, filtered by document type
    ///
    /// An empty list is the normal outcome for items without matching
    /// documents.
    async fn fetch_document_metadata(
        &self,
        code: &DrugCode,
        doc_type: &str,
    ) -> Result<Vec<DocumentDescriptor>, RegistryError>;

    /// Downloads the raw content for one document descriptor
    async fn fetch_document(
        &self,
        descriptor: &DocumentDescriptor,
    ) -> Result<Vec<u8>, RegistryError>;
}

/// HTTP implementation of [`RegistrySource`]
pub struct HttpRegistryClient {
    base_url: String,
    client: Client,
    download_timeout: Duration,
    max_document_bytes: Option<u64>,
    pacer: Option<Arc<RequestPacer>>,
    config: RegistryConfig,
}

impl HttpRegistryClient {
    /// Creates a new registry client
    ///
    /// # Arguments
    ///
    /// * `config` - Registry connection and retry configuration
    /// * `pacer` - Optional shared request pacer applied to every call
    /// * `max_document_bytes` - Optional document size cap
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        config: RegistryConfig,
        pacer: Option<Arc<RequestPacer>>,
        max_document_bytes: Option<u64>,
    ) -> Result<Self, MedregError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30));

        if !config.tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().map_err(|e| {
            MedregError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            base_url,
            client,
            download_timeout: Duration::from_secs(config.download_timeout_seconds),
            max_document_bytes,
            pacer,
            config,
        })
    }

    /// Base URL of the registry API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Waits for a send slot when pacing is configured
    async fn pace(&self) {
        if let Some(pacer) = &self.pacer {
            pacer.acquire().await;
        }
    }

    /// Builds a GET request with the API key header applied
    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(key) = &self.config.api_key {
            request = request.header(API_KEY_HEADER, key.expose_secret().as_ref());
        }
        request
    }

    /// Retry a request with exponential backoff
    ///
    /// Only transient failures consume the retry budget; terminal failures
    /// (4xx, schema mismatches) are returned immediately.
    async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T, RegistryError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, RegistryError>>,
    {
        let max_retries = self.config.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(e);
                    }

                    let delay = self.config.retry.backoff_delay(attempt);

                    tracing::warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying registry request after transient error"
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Maps a transport-level failure into the error taxonomy
    fn map_send_error(e: reqwest::Error) -> RegistryError {
        if e.is_timeout() {
            RegistryError::Timeout(e.to_string())
        } else {
            RegistryError::ConnectionFailed(e.to_string())
        }
    }

    /// Classifies a non-success status code
    async fn check_status(resp: Response, context: &str) -> Result<Response, RegistryError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(RegistryError::NotFound(context.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(RegistryError::RateLimited(context.to_string())),
            s if s.is_server_error() => Err(RegistryError::ServerError {
                status: s.as_u16(),
                message: body,
            }),
            s => Err(RegistryError::ClientError {
                status: s.as_u16(),
                message: body,
            }),
        }
    }

    /// Fetches one catalog page
    async fn fetch_catalog_page(
        &self,
        period: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<String>, RegistryError> {
        let url = format!("{}/items", self.base_url);
        let page_param = page.to_string();
        let page_size_param = page_size.to_string();

        self.retry_request(|| async {
            self.pace().await;

            let resp = self
                .get(&url)
                .query(&[
                    ("period", period),
                    ("page", page_param.as_str()),
                    ("pageSize", page_size_param.as_str()),
                ])
                .send()
                .await
                .map_err(Self::map_send_error)?;

            let resp = Self::check_status(resp, &format!("catalog page {page}")).await?;

            resp.json::<Vec<String>>()
                .await
                .map_err(|e| RegistryError::InvalidResponse(e.to_string()))
        })
        .await
    }
}

#[async_trait]
impl RegistrySource for HttpRegistryClient {
    async fn fetch_catalog(
        &self,
        period: &str,
        page_size: usize,
    ) -> Result<Vec<DrugCode>, RegistryError> {
        let mut seen: HashSet<DrugCode> = HashSet::new();
        let mut codes: Vec<DrugCode> = Vec::new();
        let mut page = 1;

        loop {
            let batch = self.fetch_catalog_page(period, page, page_size).await?;

            if batch.is_empty() {
                break;
            }

            let before = codes.len();
            for raw in batch {
                match DrugCode::new(raw) {
                    Ok(code) => {
                        if seen.insert(code.clone()) {
                            codes.push(code);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping invalid drug code in catalog");
                    }
                }
            }

            // A page contributing nothing new means the server is past the
            // end of the catalog, or ignores the page parameter entirely and
            // always returns the full list.
            if codes.len() == before {
                break;
            }

            tracing::debug!(page = page, total = codes.len(), "Fetched catalog page");
            page += 1;
        }

        tracing::info!(
            period = period,
            count = codes.len(),
            pages = page,
            "Fetched catalog from registry"
        );

        Ok(codes)
    }

    async fn fetch_detail(&self, code: &DrugCode) -> Result<DrugRecord, RegistryError> {
        let url = format!("{}/items/{}", self.base_url, code);

        self.retry_request(|| async {
            self.pace().await;

            let resp = self
                .get(&url)
                .send()
                .await
                .map_err(Self::map_send_error)?;

            let resp = Self::check_status(resp, code.as_str()).await?;

            let raw = resp
                .text()
                .await
                .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

            let payload: DrugDetailPayload = serde_json::from_str(&raw).map_err(|e| {
                tracing::warn!(code = %code, payload = %raw, error = %e, "Detail payload failed to parse");
                RegistryError::SchemaMismatch(format!("detail for {code}: {e}"))
            })?;

            payload.into_record().map_err(|e| {
                tracing::warn!(code = %code, payload = %raw, error = %e, "Detail payload rejected");
                RegistryError::SchemaMismatch(format!("detail for {code}: {e}"))
            })
        })
        .await
    }

    async fn fetch_document_metadata(
        &self,
        code: &DrugCode,
        doc_type: &str,
    ) -> Result<Vec<DocumentDescriptor>, RegistryError> {
        let url = format!("{}/documents-metadata/{}", self.base_url, code);

        let payloads = self
            .retry_request(|| async {
                self.pace().await;

                let resp = self
                    .get(&url)
                    .query(&[("type", doc_type)])
                    .send()
                    .await
                    .map_err(Self::map_send_error)?;

                // No documents is a normal outcome, reported as 404 by some
                // registry deployments and as an empty list by others.
                if resp.status() == StatusCode::NOT_FOUND {
                    return Ok(Vec::new());
                }

                let resp = Self::check_status(resp, code.as_str()).await?;

                let value = resp
                    .json::<serde_json::Value>()
                    .await
                    .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

                // A single document arrives as a bare object
                let entries = match value {
                    serde_json::Value::Null => Vec::new(),
                    serde_json::Value::Array(items) => items,
                    obj @ serde_json::Value::Object(_) => vec![obj],
                    other => {
                        return Err(RegistryError::SchemaMismatch(format!(
                            "document metadata for {code}: expected object or array, got {other}"
                        )))
                    }
                };

                entries
                    .into_iter()
                    .map(|entry| {
                        serde_json::from_value::<DocumentMetadataPayload>(entry).map_err(|e| {
                            RegistryError::SchemaMismatch(format!(
                                "document metadata for {code}: {e}"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .await?;

        let mut descriptors = Vec::new();
        for payload in payloads {
            match payload.into_descriptor(doc_type) {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(e) => {
                    tracing::warn!(code = %code, error = %e, "Skipping invalid document metadata entry");
                }
            }
        }

        Ok(descriptors)
    }

    async fn fetch_document(
        &self,
        descriptor: &DocumentDescriptor,
    ) -> Result<Vec<u8>, RegistryError> {
        let url = format!("{}/documents/{}", self.base_url, descriptor.document_id);

        self.retry_request(|| async {
            self.pace().await;

            let resp = self
                .get(&url)
                .timeout(self.download_timeout)
                .send()
                .await
                .map_err(Self::map_send_error)?;

            let resp = Self::check_status(resp, descriptor.document_id.as_str()).await?;

            // An HTML body is an error page served with a success status
            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            if content_type.starts_with("text/html") {
                return Err(RegistryError::InvalidResponse(format!(
                    "document {} returned content-type {content_type}",
                    descriptor.document_id
                )));
            }

            if let (Some(limit), Some(announced)) =
                (self.max_document_bytes, resp.content_length())
            {
                if announced > limit {
                    return Err(RegistryError::OversizeDocument {
                        document_id: descriptor.document_id.to_string(),
                        size: announced,
                        limit,
                    });
                }
            }

            let bytes = resp
                .bytes()
                .await
                .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

            if bytes.is_empty() {
                return Err(RegistryError::EmptyDocument(
                    descriptor.document_id.to_string(),
                ));
            }

            if let Some(limit) = self.max_document_bytes {
                if bytes.len() as u64 > limit {
                    return Err(RegistryError::OversizeDocument {
                        document_id: descriptor.document_id.to_string(),
                        size: bytes.len() as u64,
                        limit,
                    });
                }
            }

            Ok(bytes.to_vec())
        })
        .await
    }
}
