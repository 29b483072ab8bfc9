//! Game server client
//!
//! [`GameServer`] is the seam between the round controller and the remote
//! game; [`HttpGameServer`] talks to it over JSON/HTTP. The server keeps the
//! game in a cookie session, so the HTTP client stores cookies.

use crate::error::{ClientError, Result};
use adivina_common::api::{
    self, ErrorBody, GuessRequest, GuessResult, HintPayload, SolvedSong, StartRequest,
    StartResponse,
};
use adivina_common::config::ClientConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const USER_AGENT: &str = concat!("Adivina/", env!("CARGO_PKG_VERSION"));

/// Guess response, typed and raw
///
/// The raw JSON is kept for the legacy artist-only scan, which looks at
/// fields the typed schema does not know.
#[derive(Debug, Clone, PartialEq)]
pub struct GuessReply {
    pub result: GuessResult,
    pub raw: Value,
}

impl GuessReply {
    pub fn from_value(raw: Value) -> Result<Self> {
        let result = serde_json::from_value(raw.clone())
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(Self { result, raw })
    }

    /// Raw record of attempt `index` in `jugadas`
    pub fn attempt_record(&self, index: usize) -> Option<Value> {
        self.raw
            .get("jugadas")
            .and_then(|jugadas| jugadas.get(index))
            .cloned()
    }
}

/// Operations the game server offers
#[async_trait]
pub trait GameServer: Send + Sync {
    /// Start a game for a playlist
    async fn start(&self, request: &StartRequest) -> Result<StartResponse>;

    /// Hint for a 1-based attempt number
    async fn hint(&self, attempt: usize) -> Result<HintPayload>;

    /// Submit a guess (may be empty)
    async fn guess(&self, guess: &str) -> Result<GuessReply>;

    /// Songs finished during this session
    async fn global_history(&self) -> Result<Vec<SolvedSong>>;

    /// Drop the server-side session
    async fn reset(&self) -> Result<()>;
}

/// [`GameServer`] over HTTP
pub struct HttpGameServer {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpGameServer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.server_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fail on non-2xx with the server's message, else decode the body
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|json| ErrorBody::message_from(&json));
        tracing::debug!(status = status.as_u16(), ?message, "Game server returned an error");

        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

fn transport(e: reqwest::Error) -> ClientError {
    ClientError::Transport(e.to_string())
}

#[async_trait]
impl GameServer for HttpGameServer {
    async fn start(&self, request: &StartRequest) -> Result<StartResponse> {
        tracing::debug!(playlist_id = ?request.playlist_id, "Starting game");
        let response = self
            .http_client
            .post(self.url(api::START_PATH))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        Self::read_json(response).await
    }

    async fn hint(&self, attempt: usize) -> Result<HintPayload> {
        let response = self
            .http_client
            .get(self.url(api::HINT_PATH))
            .query(&[("attempt", attempt)])
            .send()
            .await
            .map_err(transport)?;
        Self::read_json(response).await
    }

    async fn guess(&self, guess: &str) -> Result<GuessReply> {
        let body = GuessRequest {
            guess: guess.to_string(),
        };
        let response = self
            .http_client
            .post(self.url(api::GUESS_PATH))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let raw: Value = Self::read_json(response).await?;
        GuessReply::from_value(raw)
    }

    async fn global_history(&self) -> Result<Vec<SolvedSong>> {
        let response = self
            .http_client
            .get(self.url(api::HISTORY_PATH))
            .send()
            .await
            .map_err(transport)?;
        let songs: Option<Vec<SolvedSong>> = Self::read_json(response).await?;
        Ok(songs.unwrap_or_default())
    }

    async fn reset(&self) -> Result<()> {
        let response = self
            .http_client
            .post(self.url(api::RESET_PATH))
            .send()
            .await
            .map_err(transport)?;
        Self::check_status(response).await?;
        Ok(())
    }
}
