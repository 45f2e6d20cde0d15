//! HTTP API client for the Escoba gateway.

use anyhow::{Context, Result};
use async_trait::async_trait;
use escoba::{
    game::{CardId, MatchId, MatchSnapshot, Username},
    net::{
        errors::{TransportError, TransportResult},
        messages::{
            CreateMatchRequest, CreateMatchResponse, HealthStatus, MatchHistory, PlayCardRequest,
            PlayCardResponse, PlayerProfile, classify,
        },
        transport::MatchTransport,
    },
};
use reqwest::Url;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Instant;

use crate::{
    config::ClientConfig,
    logging::{log_api_request, log_performance},
};

/// API client for communicating with the Escoba gateway
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    match_prefix: String,
    client: reqwest::Client,
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    password: &'a str,
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: config.server_url.trim_end_matches('/').to_string(),
            match_prefix: config.match_prefix.trim_end_matches('/').to_string(),
            client,
            access_token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Register a new user
    pub async fn register(&self, username: &str, password: &str, email: &str) -> Result<String> {
        let request = RegisterRequest {
            username,
            password,
            email,
        };
        let url = self.endpoint(&["auth", "register"])?;
        let response: MessageResponse = self
            .exchange("POST", url, |url| self.client.post(url).json(&request))
            .await
            .context("Registration failed")?;

        Ok(response
            .message
            .unwrap_or_else(|| "User created successfully".to_string()))
    }

    /// Login with username and password
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let request = LoginRequest { username, password };
        let url = self.endpoint(&["auth", "login"])?;
        let response: AuthResponse = self
            .exchange("POST", url, |url| self.client.post(url).json(&request))
            .await
            .context("Login failed")?;

        self.access_token = Some(response.token);
        Ok(())
    }

    /// Get a player's profile and statistics
    pub async fn player_profile(&self, username: &Username) -> TransportResult<PlayerProfile> {
        let url = self.endpoint(&["players", username.as_str()])?;
        self.exchange("GET", url, |url| self.client.get(url)).await
    }

    /// Get a player's finished matches
    pub async fn player_history(&self, username: &Username) -> TransportResult<MatchHistory> {
        let url = self.endpoint(&["history", username.as_str()])?;
        self.exchange("GET", url, |url| self.client.get(url)).await
    }

    /// Check that the gateway is up
    pub async fn health(&self) -> TransportResult<HealthStatus> {
        let url = self.endpoint(&["health"])?;
        self.exchange("GET", url, |url| self.client.get(url)).await
    }

    /// One round trip: send, read the body, classify it.
    async fn exchange<T, F>(&self, method: &str, url: Url, build: F) -> TransportResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce(Url) -> reqwest::RequestBuilder,
    {
        let start = Instant::now();
        let path = url.path().to_string();
        let mut request = build(url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                log_api_request(method, &path, None, elapsed_ms(start));
                return Err(TransportError::Network(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(format!("Failed to read response body: {e}")))?;

        let duration_ms = elapsed_ms(start);
        log_api_request(method, &path, Some(status), duration_ms);
        log_performance(&format!("{method} {path}"), duration_ms, None);

        classify(status, &body)
    }

    /// Gateway URL for `segments`, each percent-encoded as a single path
    /// segment.
    fn endpoint(&self, segments: &[&str]) -> TransportResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| TransportError::Network(format!("Invalid server URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| {
                TransportError::Network(format!("Server URL {} can't carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn match_url(&self, match_id: Option<&MatchId>, action: Option<&str>) -> TransportResult<Url> {
        let mut segments: Vec<&str> = self
            .match_prefix
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        segments.extend(match_id.map(MatchId::as_str));
        segments.extend(action);
        self.endpoint(&segments)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl MatchTransport for ApiClient {
    async fn create_match(
        &self,
        player1: &Username,
        player2: &Username,
    ) -> TransportResult<CreateMatchResponse> {
        let request = CreateMatchRequest { player1, player2 };
        let url = self.match_url(None, None)?;
        self.exchange("POST", url, |url| self.client.post(url).json(&request))
            .await
    }

    async fn fetch_state(
        &self,
        match_id: &MatchId,
        as_player: &Username,
    ) -> TransportResult<MatchSnapshot> {
        let url = self.match_url(Some(match_id), None)?;
        self.exchange("GET", url, |url| {
            self.client
                .get(url)
                .query(&[("player", as_player.as_str())])
        })
        .await
    }

    async fn play_card(
        &self,
        match_id: &MatchId,
        as_player: &Username,
        card_id: CardId,
    ) -> TransportResult<Option<String>> {
        let request = PlayCardRequest {
            player: as_player,
            card_id,
        };
        let url = self.match_url(Some(match_id), Some("play"))?;
        let response: PlayCardResponse = self
            .exchange("POST", url, |url| self.client.post(url).json(&request))
            .await?;
        Ok(response.message)
    }
}
