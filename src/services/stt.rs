//! Speech-to-text over a Whisper-style multipart endpoint

use async_trait::async_trait;

use crate::services::{TranscriptionService, MAX_CLIP_BYTES};
use crate::{Error, Result};

/// Response from a Whisper-style transcription API
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Transcribes WAV clips via an HTTP multipart upload
pub struct TranscriberClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl TranscriberClient {
    /// Create a new transcription client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(url: String, api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "transcription API key required".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            url,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl TranscriptionService for TranscriberClient {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        if wav.len() > MAX_CLIP_BYTES {
            return Err(Error::Stt(format!(
                "clip of {} bytes exceeds the {MAX_CLIP_BYTES} byte request cap",
                wav.len()
            )));
        }

        tracing::debug!(clip_bytes = wav.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("clip.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Stt(format!("transcription error {status}: {body}")));
        }

        let result: TranscriptionResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse transcription response");
            e
        })?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        let result = TranscriberClient::new(
            "https://example.invalid/stt".to_string(),
            String::new(),
            "whisper-1".to_string(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn oversized_clip_fails_locally() {
        let client = TranscriberClient::new(
            "https://example.invalid/stt".to_string(),
            "key".to_string(),
            "whisper-1".to_string(),
        )
        .unwrap();

        let err = client
            .transcribe(vec![0u8; MAX_CLIP_BYTES + 1])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Stt(_)));
    }

    #[test]
    fn response_schema_parses() {
        let parsed: TranscriptionResponse =
            serde_json::from_str(r#"{"text": "hello world"}"#).unwrap();
        assert_eq!(parsed.text, "hello world");
    }
}
