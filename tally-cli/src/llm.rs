use serde::{Deserialize, Serialize};

use tally_core::{CancelToken, Error, Suggestion, parse_suggestions};

use crate::auth::AuthState;
use crate::session::SuggestionSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    pub fn parse(s: &str) -> Result<Provider, Error> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            other => Err(Error::config(format!(
                "unknown llm provider {other:?} (expected \"anthropic\" or \"openai\")"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub provider: Provider,
    pub model: String,
    /// OpenAI-compatible base URL; ignored by the Anthropic variant.
    pub base_url: String,
}

/// Per-model sampling temperatures. Category suggestion wants near-greedy
/// output; models absent from this table run at 0.
const MODEL_TEMPERATURES: &[(&str, f32)] = &[
    ("gpt-4o", 0.3),
    ("gpt-4o-mini", 0.3),
    ("gpt-4.1", 0.3),
    ("gpt-4.1-mini", 0.3),
    ("claude-3-5-sonnet-latest", 0.2),
    ("claude-3-5-haiku-latest", 0.2),
];

pub fn temperature_for(model: &str) -> f32 {
    MODEL_TEMPERATURES
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, t)| *t)
        .unwrap_or(0.0)
}

/// One completion call against the configured backend.
///
/// The cancel token is checked immediately before the request goes out and
/// again once it resolves; either checkpoint returns `Error::Cancelled`
/// without committing any side effect.
pub async fn generate(
    cfg: &BackendConfig,
    auth: &AuthState,
    system: &str,
    prompt: &str,
    cancel: &CancelToken,
) -> Result<String, Error> {
    cancel.check()?;
    let text = match cfg.provider {
        Provider::Anthropic => anthropic_complete(cfg, auth, system, prompt).await?,
        Provider::OpenAi => openai_complete(cfg, auth, system, prompt).await?,
    };
    cancel.check()?;
    Ok(text)
}

async fn anthropic_complete(
    cfg: &BackendConfig,
    auth: &AuthState,
    system: &str,
    prompt: &str,
) -> Result<String, Error> {
    let key = auth.anthropic_api_key.as_deref().ok_or_else(|| {
        Error::config("missing Anthropic API key; run: tally auth paste-anthropic-key")
    })?;

    #[derive(Serialize)]
    struct Msg {
        role: String,
        content: String,
    }

    #[derive(Serialize)]
    struct Req {
        model: String,
        max_tokens: i32,
        temperature: f32,
        system: String,
        messages: Vec<Msg>,
    }

    #[derive(Deserialize)]
    struct Resp {
        content: Vec<ContentBlock>,
    }

    #[derive(Deserialize)]
    struct ContentBlock {
        #[serde(rename = "type")]
        t: String,
        text: Option<String>,
    }

    let body = Req {
        model: cfg.model.clone(),
        max_tokens: 700,
        temperature: temperature_for(&cfg.model),
        system: system.to_string(),
        messages: vec![Msg {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
    };

    let client = reqwest::Client::new();
    let resp = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", key)
        .header("anthropic-version", "2023-06-01")
        .json(&body)
        .send()
        .await
        .map_err(request_error)?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(Error::transport(Some(status.as_u16()), txt));
    }

    let out: Resp = resp.json().await.map_err(request_error)?;
    // multi-part responses are joined with newlines before parsing
    let parts: Vec<String> = out
        .content
        .into_iter()
        .filter(|b| b.t == "text")
        .filter_map(|b| b.text)
        .collect();
    Ok(parts.join("\n").trim().to_string())
}

async fn openai_complete(
    cfg: &BackendConfig,
    auth: &AuthState,
    system: &str,
    prompt: &str,
) -> Result<String, Error> {
    let key = auth.openai_api_key.as_deref().ok_or_else(|| {
        Error::config("missing OpenAI API key; run: tally auth paste-openai-key")
    })?;

    #[derive(Serialize)]
    struct Msg {
        role: String,
        content: String,
    }

    #[derive(Serialize)]
    struct Req {
        model: String,
        messages: Vec<Msg>,
        temperature: f32,
    }

    #[derive(Deserialize)]
    struct Resp {
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: MsgOut,
    }

    #[derive(Deserialize)]
    struct MsgOut {
        content: Option<String>,
    }

    let body = Req {
        model: cfg.model.clone(),
        messages: vec![
            Msg {
                role: "system".to_string(),
                content: system.to_string(),
            },
            Msg {
                role: "user".to_string(),
                content: prompt.to_string(),
            },
        ],
        temperature: temperature_for(&cfg.model),
    };

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/v1/chat/completions", cfg.base_url.trim_end_matches('/')))
        .header("Authorization", format!("Bearer {key}"))
        .json(&body)
        .send()
        .await
        .map_err(request_error)?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(Error::transport(Some(status.as_u16()), txt));
    }

    let out: Resp = resp.json().await.map_err(request_error)?;
    let content = out
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();
    Ok(content.trim().to_string())
}

fn request_error(err: reqwest::Error) -> Error {
    Error::transport(err.status().map(|s| s.as_u16()), err.to_string())
}

/// The run's suggestion source: one configured backend plus the shared
/// cancel token, producing parsed suggestions from raw completion text.
pub struct LlmBackend {
    cfg: BackendConfig,
    auth: AuthState,
    cancel: CancelToken,
}

impl LlmBackend {
    pub fn new(cfg: BackendConfig, auth: AuthState, cancel: CancelToken) -> Self {
        Self { cfg, auth, cancel }
    }
}

impl SuggestionSource for LlmBackend {
    async fn suggest(&self, system: &str, prompt: &str) -> Result<Vec<Suggestion>, Error> {
        let raw = generate(&self.cfg, &self.auth, system, prompt, &self.cancel).await?;
        Ok(parse_suggestions(&raw))
    }
}
