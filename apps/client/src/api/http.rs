use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use super::dto::{
    AiIntroductions, AiResponses, AiVotes, StartGameRequest, UsageStatsBody, VoteRequest,
};
use super::{
    ActionInvoker, ChatLine, ChatReply, GameStateResponse, IntroductionCompleted, LobbyApi,
    OutgoingChat, PhaseAdvance, StartedGame, StateFetcher, VoteCast,
};
use crate::config::DEFAULT_AI_REQUEST_TIMEOUT_MS;
use crate::error::ClientError;

/// Calls that wait on the server's AI players and need the longer timeout.
const AI_BACKED_ACTIONS: [&str; 5] = [
    "auto_progress",
    "ai_speak_sequential",
    "ai_vote",
    "ai_introduction_sequential",
    "complete_introduction",
];

/// REST client for the game-state server.
///
/// Every request carries a timeout so a call that never resolves fails
/// instead of stalling its branch. Calls in [`AI_BACKED_ACTIONS`] use the
/// AI timeout: the server answers them only after its AI players have run,
/// and a client-side timeout there would retry work the server completed.
#[derive(Debug, Clone)]
pub struct HttpGameClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    ai_timeout: Duration,
}

impl HttpGameClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ClientError::from_reqwest("build_client", timeout, err))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            timeout,
            ai_timeout: timeout.max(Duration::from_millis(DEFAULT_AI_REQUEST_TIMEOUT_MS)),
        })
    }

    pub fn with_ai_timeout(mut self, ai_timeout: Duration) -> Self {
        self.ai_timeout = ai_timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn timeout_for(&self, action: &str) -> Duration {
        if AI_BACKED_ACTIONS.contains(&action) {
            self.ai_timeout
        } else {
            self.timeout
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json(&self, action: &'static str, path: &str) -> Result<JsonValue, ClientError> {
        let url = self.endpoint(path);
        let timeout = self.timeout_for(action);
        debug!(action, %url, "GET");
        let resp = self
            .http
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| ClientError::from_reqwest(action, timeout, err))?;
        self.read_body(action, timeout, resp).await
    }

    async fn post_json<B>(
        &self,
        action: &'static str,
        path: &str,
        body: Option<&B>,
    ) -> Result<JsonValue, ClientError>
    where
        B: Serialize + Sync,
    {
        let url = self.endpoint(path);
        let timeout = self.timeout_for(action);
        debug!(action, %url, timeout_ms = timeout.as_millis() as u64, "POST");
        let mut req = self.http.post(&url).timeout(timeout);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req
            .send()
            .await
            .map_err(|err| ClientError::from_reqwest(action, timeout, err))?;
        self.read_body(action, timeout, resp).await
    }

    async fn read_body(
        &self,
        action: &'static str,
        timeout: Duration,
        resp: reqwest::Response,
    ) -> Result<JsonValue, ClientError> {
        let status = resp.status();
        if !status.is_success() {
            warn!(action, status = status.as_u16(), "Server returned error status");
            return Err(ClientError::Status {
                action,
                status: status.as_u16(),
            });
        }
        resp.json::<JsonValue>()
            .await
            .map_err(|err| ClientError::from_reqwest(action, timeout, err))
    }
}

/// Reject `{"success": false}` envelopes, then decode the payload.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    action: &'static str,
    body: JsonValue,
) -> Result<T, ClientError> {
    if body.get("success").and_then(JsonValue::as_bool) == Some(false) {
        let detail = body
            .get("message")
            .and_then(JsonValue::as_str)
            .unwrap_or("request was not successful")
            .to_string();
        return Err(ClientError::rejected(action, detail));
    }
    serde_json::from_value(body).map_err(|err| ClientError::Decode {
        action,
        detail: err.to_string(),
        source: Some(Box::new(err)),
    })
}

#[async_trait]
impl StateFetcher for HttpGameClient {
    async fn fetch_state(&self) -> Result<GameStateResponse, ClientError> {
        let body = self.get_json("fetch_state", "game/state").await?;
        decode_envelope("fetch_state", body)
    }
}

#[async_trait]
impl ActionInvoker for HttpGameClient {
    async fn auto_progress(&self) -> Result<PhaseAdvance, ClientError> {
        let body = self
            .post_json::<()>("auto_progress", "game/auto-progress", None)
            .await?;
        decode_envelope("auto_progress", body)
    }

    async fn ai_speak_sequential(&self) -> Result<Vec<ChatLine>, ClientError> {
        let body = self
            .post_json::<()>("ai_speak_sequential", "game/ai-speak-sequential", None)
            .await?;
        let parsed: AiResponses = decode_envelope("ai_speak_sequential", body)?;
        Ok(parsed.ai_responses)
    }

    async fn ai_vote(&self) -> Result<Vec<VoteCast>, ClientError> {
        let body = self.post_json::<()>("ai_vote", "game/ai-vote", None).await?;
        let parsed: AiVotes = decode_envelope("ai_vote", body)?;
        Ok(parsed.ai_votes)
    }

    async fn submit_vote(&self, voter: &str, target: &str) -> Result<bool, ClientError> {
        let body = self
            .post_json("submit_vote", "vote", Some(&VoteRequest { voter, target }))
            .await?;
        Ok(body
            .get("success")
            .and_then(JsonValue::as_bool)
            .unwrap_or(true))
    }
}

#[async_trait]
impl LobbyApi for HttpGameClient {
    async fn check_connection(&self) -> Result<(), ClientError> {
        self.get_json("check_connection", "status").await.map(|_| ())
    }

    async fn start_game(&self, player_name: &str) -> Result<StartedGame, ClientError> {
        let body = self
            .post_json(
                "start_game",
                "game/start",
                Some(&StartGameRequest { player_name }),
            )
            .await?;
        decode_envelope("start_game", body)
    }

    async fn complete_introduction(&self) -> Result<IntroductionCompleted, ClientError> {
        let body = self
            .post_json::<()>("complete_introduction", "game/complete-introduction", None)
            .await?;
        decode_envelope("complete_introduction", body)
    }

    async fn ai_introduction_sequential(&self) -> Result<Vec<ChatLine>, ClientError> {
        let body = self
            .post_json::<()>(
                "ai_introduction_sequential",
                "game/ai-introduction-sequential",
                None,
            )
            .await?;
        let parsed: AiIntroductions = decode_envelope("ai_introduction_sequential", body)?;
        Ok(parsed.ai_introductions)
    }

    async fn send_chat(&self, message: &OutgoingChat) -> Result<ChatReply, ClientError> {
        let body = self.post_json("send_chat", "chat", Some(message)).await?;
        decode_envelope("send_chat", body)
    }

    async fn usage_stats(&self) -> Result<JsonValue, ClientError> {
        let body = self.get_json("usage_stats", "game/usage-stats").await?;
        let parsed: UsageStatsBody = decode_envelope("usage_stats", body)?;
        Ok(parsed.usage_stats)
    }

    async fn reset_usage_stats(&self) -> Result<(), ClientError> {
        let body = self
            .post_json::<()>("reset_usage_stats", "game/reset-usage-stats", None)
            .await?;
        decode_envelope::<JsonValue>("reset_usage_stats", body).map(|_| ())
    }
}
