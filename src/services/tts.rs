//! Speech synthesis over an HTTP endpoint returning MP3 audio

use async_trait::async_trait;

use crate::audio::playback::decode_mp3;
use crate::speech::narrator::Synthesizer;
use crate::{Error, Result};

#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
}

/// Synthesizes text chunks to playback-ready samples
pub struct SynthesisClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    voice: String,
    speed: f32,
}

impl SynthesisClient {
    /// Create a new synthesis client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(
        url: String,
        api_key: String,
        model: String,
        voice: String,
        speed: f32,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("synthesis API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            url,
            api_key,
            model,
            voice,
            speed,
        })
    }
}

#[async_trait]
impl Synthesizer for SynthesisClient {
    async fn synthesize(&self, chunk: &str) -> Result<Vec<f32>> {
        tracing::debug!(chars = chunk.len(), voice = %self.voice, "synthesizing");

        let request = SpeechRequest {
            model: &self.model,
            input: chunk,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "synthesis request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "synthesis API error");
            return Err(Error::Tts(format!("synthesis error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        let samples = decode_mp3(&audio)?;

        tracing::debug!(mp3_bytes = audio.len(), samples = samples.len(), "chunk decoded");
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        let result = SynthesisClient::new(
            "https://example.invalid/tts".to_string(),
            String::new(),
            "tts-1".to_string(),
            "alloy".to_string(),
            1.0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn request_carries_voice_and_speed() {
        let request = SpeechRequest {
            model: "tts-1",
            input: "hello",
            voice: "alloy",
            speed: 1.25,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["voice"], "alloy");
        assert_eq!(json["input"], "hello");
        assert!((json["speed"].as_f64().unwrap() - 1.25).abs() < f64::EPSILON);
    }
}
