use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::classroom::{GoogleErrorEnvelope, ListCourseWorkResponse, ListCoursesResponse};

/// Failure of a single upstream call
#[derive(Error, Debug)]
pub enum ClassroomError {
    /// The Classroom API answered with a non-success status
    #[error("{status} - {reason}")]
    Api { status: u16, reason: String },

    /// The request never produced a usable response
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Read operations the gateway needs from the Classroom API
#[async_trait]
pub trait ClassroomApi: Send + Sync {
    /// First page of courses visible to the token holder
    async fn list_courses(
        &self,
        access_token: &str,
        page_size: Option<u32>,
    ) -> Result<Vec<Value>, ClassroomError>;

    /// First page of course work for one course
    async fn list_course_work(
        &self,
        access_token: &str,
        course_id: &str,
    ) -> Result<Vec<Value>, ClassroomError>;
}

/// HTTP client for the Google Classroom REST API
pub struct ClassroomHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// API root, e.g. https://classroom.googleapis.com
    base_url: Url,
}

impl ClassroomHttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, connect_timeout: u64, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Self::with_client(client, base_url)
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid Classroom API base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Classroom API base URL cannot be a base: {}", base_url);
        }

        Ok(Self { client, base_url })
    }

    /// Build an endpoint URL from path segments (each segment is percent-encoded)
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GET a JSON document with a bearer token
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        access_token: &str,
    ) -> Result<T, ClassroomError> {
        tracing::debug!(url = %url, "Sending Classroom API request");

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection_failed"
                } else {
                    "request_error"
                };
                tracing::warn!(error_kind = error_kind, error = %e, url = %url, "HTTP request error");
                ClassroomError::Transport(e)
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let reason = extract_reason(status, &error_text);

            tracing::error!(
                status = status.as_u16(),
                url = %url,
                reason = %reason,
                "Classroom API request failed"
            );
            return Err(ClassroomError::Api {
                status: status.as_u16(),
                reason,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ClassroomApi for ClassroomHttpClient {
    async fn list_courses(
        &self,
        access_token: &str,
        page_size: Option<u32>,
    ) -> Result<Vec<Value>, ClassroomError> {
        let mut url = self.endpoint(&["v1", "courses"]);
        if let Some(size) = page_size {
            url.query_pairs_mut()
                .append_pair("pageSize", &size.to_string());
        }

        let body: ListCoursesResponse = self.get_json(url, access_token).await?;
        Ok(body.courses)
    }

    async fn list_course_work(
        &self,
        access_token: &str,
        course_id: &str,
    ) -> Result<Vec<Value>, ClassroomError> {
        let url = self.endpoint(&["v1", "courses", course_id, "courseWork"]);

        let body: ListCourseWorkResponse = self.get_json(url, access_token).await?;
        Ok(body.course_work)
    }
}

/// Pull a reason out of a Google error body, falling back to the status phrase
fn extract_reason(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<GoogleErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.reason())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        })
}
