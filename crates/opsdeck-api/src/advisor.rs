use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use opsdeck_types::api::{AskRequest, AskResponse};

use crate::auth::AppState;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const UNCONFIGURED_GUIDANCE: &str = "AI assistant is not configured. Set OPSDECK_ADVISOR_API_KEY \
to enable advisory responses. The rest of the platform works without it.";

/// Thin client over a hosted language-model endpoint. Never fails the
/// caller: an unconfigured key or a transport error becomes a readable
/// inline string instead of an error.
pub struct Advisor {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl Advisor {
    pub fn new(api_key: Option<String>, model: Option<String>) -> Self {
        let advisor = Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };
        if advisor.is_enabled() {
            info!("Advisor enabled with model {}", advisor.model);
        } else {
            warn!("OPSDECK_ADVISOR_API_KEY not set; advisory responses disabled");
        }
        advisor
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("OPSDECK_ADVISOR_API_KEY").ok(),
            std::env::var("OPSDECK_ADVISOR_MODEL").ok(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Forward a prompt and return the model's text. Always returns a
    /// non-empty string; failures surface inline, never as errors.
    pub async fn ask(&self, prompt: &str) -> String {
        if prompt.trim().is_empty() {
            return "Empty prompt provided.".to_string();
        }

        let Some(api_key) = &self.api_key else {
            return UNCONFIGURED_GUIDANCE.to_string();
        };

        match self.generate(api_key, prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Advisory generation failed: {}", e);
                format!("Error generating response: {e}")
            }
        }
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/{}:generateContent", API_BASE, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: 2048,
                temperature: 0.7,
            },
        };

        let response: GenerateResponse = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow::anyhow!("model returned no text"))?;

        Ok(text)
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

/// POST /advisor/ask — the dashboard sends the user's question plus a
/// context line built from the page's aggregates; identity arrives with
/// the request rather than from any ambient session.
pub async fn ask(State(state): State<AppState>, Json(req): Json<AskRequest>) -> Json<AskResponse> {
    let full_prompt = match &req.context {
        Some(context) if !context.is_empty() => {
            format!("{}\n\nUser question: {}", context, req.prompt)
        }
        _ => req.prompt.clone(),
    };

    let answer = state.advisor.ask(&full_prompt).await;
    Json(AskResponse { answer })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_advisor_returns_guidance() {
        let advisor = Advisor::new(None, None);
        assert!(!advisor.is_enabled());

        let answer = advisor.ask("What should we patch first?").await;
        assert_eq!(answer, UNCONFIGURED_GUIDANCE);
    }

    #[tokio::test]
    async fn empty_prompt_short_circuits() {
        let advisor = Advisor::new(Some("key".into()), None);
        assert_eq!(advisor.ask("   ").await, "Empty prompt provided.");
    }

    #[test]
    fn empty_key_counts_as_unconfigured() {
        let advisor = Advisor::new(Some(String::new()), None);
        assert!(!advisor.is_enabled());
    }

    #[test]
    fn model_defaults_and_overrides() {
        assert_eq!(Advisor::new(None, None).model, DEFAULT_MODEL);
        assert_eq!(
            Advisor::new(None, Some("gemini-2.0-pro".into())).model,
            "gemini-2.0-pro"
        );
    }
}
