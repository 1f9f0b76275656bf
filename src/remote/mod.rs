//! Remote collaborators: text completion and speech synthesis.
//!
//! The orchestrator only sees the [`CompletionService`] and [`SpeechService`]
//! traits. [`gemini::GeminiClient`] implements both against the hosted
//! generative-language REST API.

pub mod gemini;

use async_trait::async_trait;
use serde::Serialize;

/// Errors from a remote call. Callers in this crate turn every variant into
/// a fallback value.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("response carried no audio")]
    EmptyAudio,

    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,
}

/// Speaker of a message on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

impl From<crate::conversation::Role> for ChatRole {
    fn from(role: crate::conversation::Role) -> Self {
        match role {
            crate::conversation::Role::User => Self::User,
            crate::conversation::Role::Assistant => Self::Model,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Fixed sampling parameters sent with every completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            top_k: 40,
            top_p: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Oldest first; the final entry is the new user message.
    pub messages: Vec<ChatMessage>,
    pub system_instruction: String,
    pub sampling: SamplingParams,
}

/// What the completion endpoint returned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    pub text: String,
    /// The provider withheld the answer on safety grounds.
    pub blocked: bool,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RemoteError>;
}

/// A single utterance to synthesize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_name: String,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, voice_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_name: voice_name.into(),
        }
    }

    /// Instruction string wrapping the text to speak.
    pub fn prompt(&self) -> String {
        format!(
            "Say this in a soft, affectionate, and slightly flirty voice: {}",
            self.text
        )
    }
}

#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Returns base64-encoded 16-bit little-endian PCM.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<String, RemoteError>;
}
