// SPDX-License-Identifier: MIT

//! Thin REST client over the request surface (C8, spec.md §6.1). Grounded
//! on the teacher's `DaemonClient` shape (one struct owning the transport,
//! typed `query`/`send` methods per command module) but talking to `sf-api`
//! over HTTP instead of the teacher's local socket protocol.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sf_wire::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{message}")]
    Api { status: u16, message: String },
}

/// A connection to one `sfd` instance's `/api/v1` surface.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    /// `GET` with query parameters, used by every `list` subcommand. Built
    /// from plain pairs rather than the `sf-wire` query DTOs since those
    /// are `Deserialize`-only (they exist to be extracted server-side, not
    /// sent).
    pub async fn get_query<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T, ClientError> {
        let response = self.http.get(self.url(path)).query(params).send().await?;
        Self::decode(response).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let response = self.http.put(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    /// DELETE with no response body expected (spec.md §6.1: 204 on delete).
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let response = self.http.delete(self.url(path)).send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::api_error(response).await)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn api_error(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => format!("request failed with status {status}"),
        };
        ClientError::Api { status, message }
    }
}
