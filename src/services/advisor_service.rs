use crate::config::AdvisorConfig;
use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

pub const ADVISOR_UNAVAILABLE: &str = "AI Advisor is unavailable. Please configure your API key.";
pub const ADVISOR_FAILED: &str =
    "Sorry, I couldn't generate advice at the moment. Please check the console for errors.";

const TEMPERATURE: f64 = 0.7;
const TOP_P: f64 = 0.95;
const MAX_OUTPUT_TOKENS: u32 = 200;

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Asks a generative model for advice on running an equb
pub struct AdvisorService {
    client: reqwest::Client,
    config: AdvisorConfig,
}

impl AdvisorService {
    pub fn new(config: AdvisorConfig) -> Self {
        if !config.is_enabled() {
            warn!("Gemini API key not found. AI advisor is disabled.");
        }
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Advice for the situation described in `prompt`. Upstream failures are
    /// logged and answered with a fixed apology rather than an error.
    pub async fn advise(&self, prompt: &str) -> AppResult<String> {
        if prompt.trim().is_empty() {
            return Err(AppError::Validation("Prompt cannot be empty".to_string()));
        }

        let api_key = match &self.config.api_key {
            Some(key) => key,
            None => return Ok(ADVISOR_UNAVAILABLE.to_string()),
        };

        match self.generate(api_key, prompt).await {
            Ok(advice) => {
                info!("Generated advice ({} chars)", advice.len());
                Ok(advice)
            }
            Err(e) => {
                error!("Error calling Gemini API: {}", e);
                Ok(ADVISOR_FAILED.to_string())
            }
        }
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> AppResult<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            self.config.model
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": advisor_prompt(prompt) }] }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "topP": TOP_P,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            }
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Gemini returned {}",
                response.status()
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        extract_text(parsed)
            .ok_or_else(|| AppError::ExternalService("Gemini returned no text".to_string()))
    }
}

/// Frame the admin's situation for the model
pub fn advisor_prompt(situation: &str) -> String {
    format!(
        "As an expert in managing informal rotating savings and credit associations (ROSCAs) like the Ethiopian Equb, provide concise, actionable advice for the following situation:\n\nSITUATION: \"{}\"\n\nADVICE:",
        situation
    )
}

fn extract_text(response: GenerateContentResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
