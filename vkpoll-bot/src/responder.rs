//! Dialogflow (api.ai v1) text query client.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

const QUERY_URL: &str = "https://api.api.ai/v1/query?v=20150910";

/// Sent when the agent cannot be reached or answers with an error status.
pub const ERROR_REPLY: &str = "Ошибочка ...";
/// Sent when the agent answers with an empty speech line.
pub const EMPTY_REPLY: &str = "Хм...";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Query<'a> {
    query:      &'a str,
    lang:       &'a str,
    session_id: String,
}

pub struct Responder {
    http:  reqwest::Client,
    token: String,
    lang:  String,
}

impl Responder {
    pub fn new(token: String, lang: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(20)).build()?;
        Ok(Self { http, token, lang })
    }

    /// The agent's answer to `text` from `user_id`.  Never fails: errors
    /// become [`ERROR_REPLY`].
    pub async fn reply(&self, user_id: i64, text: &str) -> String {
        match self.query(user_id, text).await {
            Ok(body) => reply_from(&body),
            Err(e) => {
                log::warn!("[vkpoll-bot] agent query failed: {e}");
                ERROR_REPLY.to_string()
            }
        }
    }

    async fn query(&self, user_id: i64, text: &str) -> Result<Value, reqwest::Error> {
        let body = Query { query: text, lang: &self.lang, session_id: session_id(user_id) };
        self.http
            .post(QUERY_URL)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

/// One agent session per VK user.
fn session_id(user_id: i64) -> String {
    format!("vk_{user_id}")
}

/// `result.fulfillment.speech`, or [`EMPTY_REPLY`] if absent or blank.
fn reply_from(body: &Value) -> String {
    body.pointer("/result/fulfillment/speech")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| EMPTY_REPLY.to_string(), str::to_string)
}
