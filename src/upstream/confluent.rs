//! Confluent Schema Registry client
//!
//! Talks to the registry REST API:
//! - GET /schemas/ids/{id} - fetch a schema by id
//! - POST /subjects/{subject}/versions - register a schema under a subject

use super::{SchemaId, SchemaRegistry};
use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

/// Connection settings for the upstream registry
#[derive(Debug, Clone)]
pub struct ConfluentConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl Default for ConfluentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for a Confluent-compatible schema registry
pub struct ConfluentClient {
    http_client: Client,
    config: ConfluentConfig,
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    schema: String,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    schema: &'a str,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    id: SchemaId,
}

/// Error body returned by the registry on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl ConfluentClient {
    pub fn new(config: ConfluentConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RegistryError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config: ConfluentConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.config.username, &self.config.password) {
            (Some(user), password) => request.basic_auth(user, password.as_ref()),
            _ => request,
        }
    }
}

#[async_trait]
impl SchemaRegistry for ConfluentClient {
    async fn fetch(&self, id: SchemaId) -> Result<String> {
        let url = format!("{}/schemas/ids/{}", self.config.base_url, id);
        debug!("GET {}", url);

        let response = self
            .with_auth(self.http_client.get(&url))
            .header("Accept", CONTENT_TYPE)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body: SchemaResponse = parse_body(response).await?;
                Ok(body.schema)
            }
            StatusCode::NOT_FOUND => Err(RegistryError::SchemaNotFound { id }),
            status => {
                let message = error_message(response).await;
                warn!("Fetching schema {} failed with {}: {}", id, status, message);
                Err(RegistryError::Upstream {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn register(&self, subject: &str, schema: &str) -> Result<SchemaId> {
        let url = format!(
            "{}/subjects/{}/versions",
            self.config.base_url,
            urlencoding::encode(subject)
        );
        debug!("POST {}", url);

        let response = self
            .with_auth(self.http_client.post(&url))
            .header("Content-Type", CONTENT_TYPE)
            .header("Accept", CONTENT_TYPE)
            .json(&RegisterRequest { schema })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body: RegisterResponse = parse_body(response).await?;
                Ok(body.id)
            }
            StatusCode::UNPROCESSABLE_ENTITY => Err(RegistryError::InvalidSchema {
                subject: subject.to_string(),
                cause: error_message(response).await,
            }),
            status => {
                let message = error_message(response).await;
                warn!(
                    "Registering schema under '{}' failed with {}: {}",
                    subject, status, message
                );
                Err(RegistryError::Upstream {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

async fn parse_body<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status().as_u16();
    let bytes = response.bytes().await?;

    serde_json::from_slice(&bytes).map_err(|e| RegistryError::Upstream {
        status,
        message: format!("Failed to parse response body: {}", e),
    })
}

async fn error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) if !body.message.is_empty() => body.message,
        _ => text,
    }
}
