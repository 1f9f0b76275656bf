//! Gemini REST client for chat completion and text-to-speech.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{
    Completion, CompletionRequest, CompletionService, RemoteError, SpeechRequest, SpeechService,
};
use crate::config::ApiConfig;

const SAFETY_FINISH_REASON: &str = "SAFETY";

/// Client for the hosted generative-language API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    chat_model: String,
    tts_model: String,
}

impl GeminiClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_model: config.chat_model.clone(),
            tts_model: config.tts_model.clone(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, RemoteError> {
        let api_key = self.api_key.as_deref().ok_or(RemoteError::MissingApiKey)?;
        let url = format!("{}/{model}:generateContent", self.base_url);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CompletionService for GeminiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RemoteError> {
        let body = completion_body(request);
        tracing::debug!(
            model = %self.chat_model,
            messages = body.contents.len(),
            "sending completion request"
        );
        let response = self.generate(&self.chat_model, &body).await?;
        Ok(interpret_completion(response))
    }
}

#[async_trait]
impl SpeechService for GeminiClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<String, RemoteError> {
        let body = speech_body(request);
        tracing::debug!(model = %self.tts_model, voice = %request.voice_name, "sending speech request");
        let response = self.generate(&self.tts_model, &body).await?;
        extract_audio(response)
    }
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartResponse {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

// ── Request / response mapping ──────────────────────────────────────────

fn completion_body(request: &CompletionRequest) -> GenerateContentRequest {
    let contents = request
        .messages
        .iter()
        .map(|m| Content {
            role: Some(m.role.as_str()),
            parts: vec![TextPart {
                text: m.text.clone(),
            }],
        })
        .collect();

    GenerateContentRequest {
        contents,
        system_instruction: Some(Content {
            role: None,
            parts: vec![TextPart {
                text: request.system_instruction.clone(),
            }],
        }),
        generation_config: GenerationConfig {
            temperature: Some(request.sampling.temperature),
            top_k: Some(request.sampling.top_k),
            top_p: Some(request.sampling.top_p),
            ..GenerationConfig::default()
        },
    }
}

fn speech_body(request: &SpeechRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: None,
            parts: vec![TextPart {
                text: request.prompt(),
            }],
        }],
        system_instruction: None,
        generation_config: GenerationConfig {
            response_modalities: Some(vec!["AUDIO"]),
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: request.voice_name.clone(),
                    },
                },
            }),
            ..GenerationConfig::default()
        },
    }
}

/// Concatenate the first candidate's text parts and note any safety block.
fn interpret_completion(response: GenerateContentResponse) -> Completion {
    let prompt_blocked = response
        .prompt_feedback
        .as_ref()
        .is_some_and(|f| f.block_reason.is_some());

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Completion {
            text: String::new(),
            blocked: prompt_blocked,
        };
    };

    let blocked = prompt_blocked || candidate.finish_reason.as_deref() == Some(SAFETY_FINISH_REASON);
    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    Completion {
        text: text.trim().to_string(),
        blocked,
    }
}

fn extract_audio(response: GenerateContentResponse) -> Result<String, RemoteError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().find_map(|p| p.inline_data))
        .map(|d| d.data)
        .filter(|d| !d.is_empty())
        .ok_or(RemoteError::EmptyAudio)
}

fn map_http_error(status: StatusCode, body: &str) -> RemoteError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    RemoteError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{ChatMessage, ChatRole, SamplingParams};

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn completion_body_shape() {
        let request = CompletionRequest {
            messages: vec![
                ChatMessage::new(ChatRole::Model, "hi there"),
                ChatMessage::new(ChatRole::User, "hello"),
            ],
            system_instruction: "be nice".into(),
            sampling: SamplingParams::default(),
        };
        let json = serde_json::to_value(completion_body(&request)).unwrap();

        assert_eq!(json["contents"][0]["role"], "model");
        assert_eq!(json["contents"][1]["role"], "user");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "hello");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be nice");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert!(json["generationConfig"].get("responseModalities").is_none());
    }

    #[test]
    fn speech_body_shape() {
        let json = serde_json::to_value(speech_body(&SpeechRequest::new("hey", "Kore"))).unwrap();
        assert_eq!(json["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            json["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Kore"
        );
        assert!(json["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .ends_with(": hey"));
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn completion_text_is_joined_and_trimmed() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"  Hi "},{"text":"love  "}]},"finishReason":"STOP"}]}"#,
        );
        let completion = interpret_completion(response);
        assert_eq!(completion.text, "Hi love");
        assert!(!completion.blocked);
    }

    #[test]
    fn safety_finish_reason_marks_blocked() {
        let response = parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#);
        let completion = interpret_completion(response);
        assert!(completion.blocked);
        assert!(completion.text.is_empty());
    }

    #[test]
    fn prompt_block_marks_blocked() {
        let response = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert!(interpret_completion(response).blocked);
    }

    #[test]
    fn missing_candidates_is_empty_not_blocked() {
        let completion = interpret_completion(parse("{}"));
        assert_eq!(completion, Completion::default());
    }

    #[test]
    fn audio_is_extracted_from_inline_data() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"audio/L16;rate=24000","data":"AAE="}}]}}]}"#,
        );
        assert_eq!(extract_audio(response).unwrap(), "AAE=");
    }

    #[test]
    fn missing_audio_is_an_error() {
        let response = parse(r#"{"candidates":[{"content":{"parts":[{"text":"no audio"}]}}]}"#);
        assert!(matches!(extract_audio(response), Err(RemoteError::EmptyAudio)));
    }

    #[test]
    fn http_error_uses_api_message() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":429,"message":"quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        match err {
            RemoteError::Status { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "RESOURCE_EXHAUSTED: quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let client = GeminiClient::new(&ApiConfig {
            api_key: None,
            ..ApiConfig::default()
        });
        assert!(!client.has_api_key());
        let err = client
            .synthesize(&SpeechRequest::new("hi", "Kore"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::MissingApiKey));
    }
}
