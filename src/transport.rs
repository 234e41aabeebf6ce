//! Chat-log API client
//!
//! This module handles the two calls the dashboard makes to the backend:
//! - listing every chat log (`GET` on the listing endpoint)
//! - appending operator messages to one chat (`POST` on the append endpoint)
//!
//! Every request is signed by a `RequestSigner`. Each call is exactly one
//! round trip; retrying is left to the caller.

use crate::config::Settings;
use crate::crypto::{RequestSigner, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::store::{ChatLog, Message};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Response envelope shared by both endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Error reported by the backend, if any
    #[serde(default)]
    pub error: Option<String>,
    /// Payload of a successful call
    #[serde(default = "Option::default")]
    pub result: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Fail on a non-empty `error`, whatever the HTTP status was
    pub fn check_error(&self) -> Result<()> {
        match self.error.as_deref() {
            Some(err) if !err.trim().is_empty() => Err(Error::Transport(err.to_string())),
            _ => Ok(()),
        }
    }

    /// Payload of a successful call
    pub fn into_result(self) -> Result<T> {
        self.check_error()?;
        self.result
            .ok_or_else(|| Error::Transport("Response has no result".to_string()))
    }
}

/// Body of an append request
#[derive(Debug, Clone, Serialize)]
pub struct AppendRequest<'a> {
    /// Conversation to append to
    #[serde(rename = "clientId")]
    pub client_id: &'a str,
    /// Messages to append, in order
    #[serde(rename = "newUserLog")]
    pub new_user_log: Vec<&'a Message>,
}

/// Read and write access to the chat-log backend
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Fetch the full current list of chat logs, in backend order
    async fn fetch_chat_logs(&self) -> Result<Vec<ChatLog>>;

    /// Append one message to the conversation of `client_id`
    async fn append_message(&self, client_id: &str, message: &Message) -> Result<()>;
}

/// `ChatTransport` over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    chat_logs_url: String,
    append_url: String,
    signer: RequestSigner,
}

impl HttpTransport {
    /// Create a transport from the application settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            chat_logs_url: settings.chat_logs_url(),
            append_url: settings.append_url(),
            signer: RequestSigner::new(&settings.shared_secret, settings.encrypt_payloads),
        })
    }

    /// Send one signed request and decode the response envelope
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<ApiResponse<T>> {
        let signed = match &payload {
            Some(plaintext) => self.signer.sign_request(plaintext, Utc::now().timestamp())?,
            None => {
                let timestamp = Utc::now().timestamp();
                crate::crypto::SignedRequest {
                    body: Vec::new(),
                    timestamp,
                    signature: self.signer.sign(&[], timestamp),
                }
            }
        };

        let mut request = self
            .client
            .request(method.clone(), url)
            .header(TIMESTAMP_HEADER, signed.timestamp.to_string())
            .header(SIGNATURE_HEADER, signed.signature);
        if payload.is_some() {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(signed.body);
        }

        debug!("{} {}", method, url);
        let response = request.send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            Error::Transport(format!("Request failed: {}", e))
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read response: {}", e)))?;
        let body = self
            .signer
            .open_body(&bytes)
            .map_err(|e| Error::Transport(format!("Failed to open response: {}", e)))?;

        decode_response(status, &body)
    }
}

/// Decode a response envelope, mapping HTTP and payload errors
///
/// An explicit `error` field wins over the status code; otherwise a
/// non-success status is an error even when the body parses.
pub fn decode_response<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<ApiResponse<T>> {
    let parsed = serde_json::from_slice::<ApiResponse<T>>(body);

    if let Ok(envelope) = &parsed {
        envelope.check_error()?;
    }

    if !status.is_success() {
        warn!("Backend answered with status {}", status);
        return Err(Error::Transport(format!("Request failed with status {}", status)));
    }

    parsed.map_err(|e| Error::Transport(format!("Malformed response: {}", e)))
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn fetch_chat_logs(&self) -> Result<Vec<ChatLog>> {
        let logs = self
            .call::<Vec<ChatLog>>(Method::GET, &self.chat_logs_url, None)
            .await?
            .into_result()?;
        info!("Fetched {} chat logs", logs.len());
        Ok(logs)
    }

    async fn append_message(&self, client_id: &str, message: &Message) -> Result<()> {
        let request = AppendRequest {
            client_id,
            new_user_log: vec![message],
        };
        let payload = serde_json::to_vec(&request)?;

        self.call::<serde_json::Value>(Method::POST, &self.append_url, Some(payload))
            .await?
            .check_error()?;
        info!("Appended message to client {}", client_id);
        Ok(())
    }
}
