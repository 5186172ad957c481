//! Prompt composition for the creative "muse" page and the remote content client.
//!
//! Requests are single blocking calls bounded by a timeout and never retried.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{MuseArgs, MuseKind};

/// Placeholder sent for optional fields left empty.
pub const OPEN_CHOICE: &str = "a elección";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptRequest {
    Character {
        name: Option<String>,
        gender: String,
        role: String,
        setting: Option<String>,
    },
    Story {
        genre: String,
        length: String,
        theme: Option<String>,
    },
}

fn or_open(value: &Option<String>) -> &str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(OPEN_CHOICE)
}

impl PromptRequest {
    pub fn compose_prompt(&self) -> String {
        match self {
            PromptRequest::Character {
                name,
                gender,
                role,
                setting,
            } => format!(
                "Crea un personaje original de anime.\n\
                 Nombre: {}.\n\
                 Género: {}.\n\
                 Tipo: {}.\n\
                 Ambientación: {}.\n\
                 Describe su apariencia, personalidad, poderes o habilidades, trasfondo y motivación.\n\
                 Presenta la respuesta en formato narrativo y visualmente atractivo.\n",
                or_open(name),
                gender,
                role,
                or_open(setting)
            ),
            PromptRequest::Story {
                genre,
                length,
                theme,
            } => format!(
                "Crea una historia original de anime.\n\
                 Género: {}.\n\
                 Extensión: {}.\n\
                 Tema central: {}.\n\
                 Describe personajes, ambientación y conflicto principal.\n\
                 Da un título atractivo y un cierre inspirador.\n",
                genre,
                length,
                or_open(theme)
            ),
        }
    }
}

impl From<&MuseArgs> for PromptRequest {
    fn from(args: &MuseArgs) -> Self {
        match &args.kind {
            MuseKind::Character {
                name,
                gender,
                role,
                setting,
            } => PromptRequest::Character {
                name: name.clone(),
                gender: gender.clone(),
                role: role.clone(),
                setting: setting.clone(),
            },
            MuseKind::Story {
                genre,
                length,
                theme,
            } => PromptRequest::Story {
                genre: genre.clone(),
                length: length.clone(),
                theme: theme.clone(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum MuseError {
    /// The environment variable holding the API key is unset or empty.
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
    #[error("Could not reach the content service: {0}")]
    Transport(String),
    #[error("Content service returned {code}: {message}")]
    Status { code: u16, message: String },
    /// The service answered but the body carried no text.
    #[error("Content service returned no text")]
    EmptyResponse,
    #[error("Could not decode the service response: {0}")]
    Decode(String),
}

/// A remote text generator.
pub trait ContentClient {
    fn generate(&self, prompt: &str) -> Result<String, MuseError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<PartOut<'a>>,
}

#[derive(Debug, Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Debug, Deserialize)]
struct PartIn {
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let text: String = self
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
}

fn request_body(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![PartOut { text: prompt }],
        }],
    }
}

#[cfg(feature = "http")]
pub use client::GeminiClient;

#[cfg(feature = "http")]
mod client {
    use std::time::Duration;

    use tracing::debug;

    use super::{request_body, ContentClient, GenerateResponse, MuseError};
    use crate::config::MuseConfig;

    pub struct GeminiClient {
        endpoint: String,
        model: String,
        api_key: String,
        timeout: Duration,
    }

    impl GeminiClient {
        pub fn new(
            endpoint: impl Into<String>,
            model: impl Into<String>,
            api_key: impl Into<String>,
            timeout: Duration,
        ) -> Self {
            Self {
                endpoint: endpoint.into(),
                model: model.into(),
                api_key: api_key.into(),
                timeout,
            }
        }

        /// Build a client from config, reading the key from the configured environment variable.
        pub fn from_config(config: &MuseConfig) -> Result<Self, MuseError> {
            let api_key = std::env::var(&config.api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| MuseError::MissingApiKey(config.api_key_env.clone()))?;
            Ok(Self::new(
                config.endpoint.clone(),
                config.model.clone(),
                api_key,
                Duration::from_secs(config.timeout_secs),
            ))
        }

        pub fn with_model(mut self, model: impl Into<String>) -> Self {
            self.model = model.into();
            self
        }

        pub fn url(&self) -> String {
            format!(
                "{}/{}:generateContent",
                self.endpoint.trim_end_matches('/'),
                self.model
            )
        }
    }

    impl ContentClient for GeminiClient {
        fn generate(&self, prompt: &str) -> Result<String, MuseError> {
            debug!(model = %self.model, "requesting generated content");
            let response = ureq::post(&self.url())
                .timeout(self.timeout)
                .set("x-goog-api-key", &self.api_key)
                .send_json(request_body(prompt))
                .map_err(|e| match e {
                    ureq::Error::Status(code, r) => MuseError::Status {
                        code,
                        message: r.status_text().to_string(),
                    },
                    ureq::Error::Transport(t) => MuseError::Transport(t.to_string()),
                })?;
            let body: GenerateResponse = response
                .into_json()
                .map_err(|e| MuseError::Decode(e.to_string()))?;
            body.into_text().ok_or(MuseError::EmptyResponse)
        }
    }

}
