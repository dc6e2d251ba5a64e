//! Generative text helpers for activity write-ups.
//!
//! Every call site goes through the `*_or_*` fallbacks: an unavailable or
//! failing model never blocks logging, it just leaves the text as written.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AssistantConfig;
use crate::models::{Activity, ActivityCategory};

/// Used when the period summary cannot be generated
pub const SUMMARY_FALLBACK: &str = "Summary generated automatically based on logged hours.";
/// Used when the model answers with nothing
pub const SUMMARY_EMPTY_FALLBACK: &str = "Work period successfully completed and logged.";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Assistant is disabled")]
    Disabled,
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("Empty response from model")]
    EmptyResponse,
}

/// Text service used to polish and classify activity logs
pub trait TextAssistant {
    /// Rewrite `draft` in a professional register for the payroll record
    fn enhance(&self, task: &str, draft: &str) -> Result<String, AssistantError>;
    /// Pick the category that best fits a task title
    fn classify(&self, task: &str) -> Result<ActivityCategory, AssistantError>;
    /// Short executive summary of a period's activities
    fn summarize(&self, activities: &[Activity]) -> Result<String, AssistantError>;
}

pub fn enhance_or_original(assistant: &dyn TextAssistant, task: &str, draft: &str) -> String {
    match assistant.enhance(task, draft) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => draft.to_string(),
        Err(e) => {
            warn!("enhance failed, keeping original text: {}", e);
            draft.to_string()
        }
    }
}

pub fn classify_or_other(assistant: &dyn TextAssistant, task: &str) -> ActivityCategory {
    assistant.classify(task).unwrap_or_else(|e| {
        warn!("classify failed, using Other: {}", e);
        ActivityCategory::Other
    })
}

pub fn summarize_or_default(assistant: &dyn TextAssistant, activities: &[Activity]) -> String {
    match assistant.summarize(activities) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => SUMMARY_EMPTY_FALLBACK.to_string(),
        Err(AssistantError::EmptyResponse) => SUMMARY_EMPTY_FALLBACK.to_string(),
        Err(e) => {
            warn!("summary failed, using default text: {}", e);
            SUMMARY_FALLBACK.to_string()
        }
    }
}

/// Map a model reply onto a category; anything unrecognised is `Other`
pub fn parse_category_reply(reply: &str) -> ActivityCategory {
    let cleaned = reply.trim().trim_matches(|c: char| c == '"' || c == '.' || c == '*');
    ActivityCategory::ALL
        .iter()
        .copied()
        .find(|c| c.as_str() == cleaned)
        .unwrap_or(ActivityCategory::Other)
}

fn enhance_prompt(company: &str, task: &str, draft: &str) -> String {
    format!(
        "You are an expert operations assistant for \"{company}\", an automotive locksmith and security firm.\n\
         Professionalize this activity log for HR payroll.\n\n\
         Task: {task}\n\
         Draft: {draft}\n\n\
         Output ONLY the refined description."
    )
}

fn classify_prompt(task: &str) -> String {
    let names: Vec<&str> = ActivityCategory::ALL.iter().map(|c| c.as_str()).collect();
    format!(
        "Based on this task title: \"{task}\", which category from this list fits best: {}?\n\
         Return ONLY the category name.",
        names.join(", ")
    )
}

fn summary_prompt(company: &str, activities: &[Activity]) -> String {
    let data: Vec<String> = activities
        .iter()
        .map(|a| format!("{}: {} ({}h)", a.category, a.task, a.duration_hours))
        .collect();
    format!(
        "Summarize this payroll period's work for \"{company}\" staff. \
         Create a professional, punchy summary of major accomplishments.\n\n\
         Activities:\n{}\n\n\
         Output 2-3 sentences max.",
        data.join("\n")
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Google Generative Language REST client
pub struct GeminiAssistant {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    company: String,
}

impl GeminiAssistant {
    pub fn new(config: &AssistantConfig, api_key: String, company: &str) -> Result<Self, AssistantError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            company: company.to_string(),
        })
    }

    fn generate(&self, prompt: String, generation: Option<GenerationConfig>) -> Result<String, AssistantError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: generation,
        };

        debug!(model = %self.model, "requesting generation");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AssistantError::Api { status, body });
        }

        let parsed: GenerateResponse = response.json()?;
        parsed.text().ok_or(AssistantError::EmptyResponse)
    }
}

impl TextAssistant for GeminiAssistant {
    fn enhance(&self, task: &str, draft: &str) -> Result<String, AssistantError> {
        self.generate(
            enhance_prompt(&self.company, task, draft),
            Some(GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 150,
            }),
        )
    }

    fn classify(&self, task: &str) -> Result<ActivityCategory, AssistantError> {
        let reply = self.generate(
            classify_prompt(task),
            Some(GenerationConfig {
                temperature: 0.1,
                max_output_tokens: 20,
            }),
        )?;
        Ok(parse_category_reply(&reply))
    }

    fn summarize(&self, activities: &[Activity]) -> Result<String, AssistantError> {
        self.generate(summary_prompt(&self.company, activities), None)
    }
}

/// Assistant that always declines, so every fallback applies
pub struct OfflineAssistant;

impl TextAssistant for OfflineAssistant {
    fn enhance(&self, _task: &str, _draft: &str) -> Result<String, AssistantError> {
        Err(AssistantError::Disabled)
    }

    fn classify(&self, _task: &str) -> Result<ActivityCategory, AssistantError> {
        Err(AssistantError::Disabled)
    }

    fn summarize(&self, _activities: &[Activity]) -> Result<String, AssistantError> {
        Err(AssistantError::Disabled)
    }
}

/// Pick the assistant for this configuration
///
/// Falls back to [`OfflineAssistant`] when disabled or when no key is set.
pub fn build_assistant(config: &AssistantConfig, company: &str) -> Box<dyn TextAssistant> {
    if !config.enabled {
        return Box::new(OfflineAssistant);
    }

    let api_key = match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            debug!("{}", AssistantError::MissingApiKey(config.api_key_env.clone()));
            return Box::new(OfflineAssistant);
        }
    };

    match GeminiAssistant::new(config, api_key, company) {
        Ok(assistant) => Box::new(assistant),
        Err(e) => {
            warn!("could not create assistant client: {}", e);
            Box::new(OfflineAssistant)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    impl TextAssistant for Canned {
        fn enhance(&self, _task: &str, _draft: &str) -> Result<String, AssistantError> {
            Ok(self.0.to_string())
        }
        fn classify(&self, _task: &str) -> Result<ActivityCategory, AssistantError> {
            Ok(parse_category_reply(self.0))
        }
        fn summarize(&self, _activities: &[Activity]) -> Result<String, AssistantError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn offline_assistant_falls_back_everywhere() {
        assert_eq!(enhance_or_original(&OfflineAssistant, "t", "my draft"), "my draft");
        assert_eq!(classify_or_other(&OfflineAssistant, "t"), ActivityCategory::Other);
        assert_eq!(summarize_or_default(&OfflineAssistant, &[]), SUMMARY_FALLBACK);
    }

    #[test]
    fn empty_replies_keep_original_text() {
        assert_eq!(enhance_or_original(&Canned("   "), "t", "draft"), "draft");
        assert_eq!(summarize_or_default(&Canned(""), &[]), SUMMARY_EMPTY_FALLBACK);
    }

    #[test]
    fn replies_are_trimmed() {
        assert_eq!(
            enhance_or_original(&Canned("  Replaced ignition cylinder.\n"), "t", "fixed car"),
            "Replaced ignition cylinder."
        );
    }

    #[test]
    fn category_reply_parsing() {
        assert_eq!(parse_category_reply("Locksmith"), ActivityCategory::Locksmith);
        assert_eq!(parse_category_reply(" \"Customer Service\"\n"), ActivityCategory::CustomerService);
        assert_eq!(parse_category_reply("Admin."), ActivityCategory::Admin);
        assert_eq!(parse_category_reply("Plumbing"), ActivityCategory::Other);
        assert_eq!(parse_category_reply("locksmith"), ActivityCategory::Other);
    }

    #[test]
    fn classify_prompt_lists_every_category() {
        let prompt = classify_prompt("Rekey front door");
        for category in ActivityCategory::ALL {
            assert!(prompt.contains(category.as_str()));
        }
    }

    #[test]
    fn response_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello world"));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn disabled_config_builds_offline_assistant() {
        let config = AssistantConfig {
            enabled: false,
            ..AssistantConfig::default()
        };
        let assistant = build_assistant(&config, "Wheels & Keys Inc.");
        assert!(matches!(assistant.classify("x"), Err(AssistantError::Disabled)));
    }
}
