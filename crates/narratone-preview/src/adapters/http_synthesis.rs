//! HTTP adapter for the cloud synthesis service.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use narratone_core::domain::{StyleParams, SynthesisSettings, VoiceParams};
use narratone_core::{SynthesisError, SynthesisProvider};

/// Cap on how much of an error response body gets carried into the error.
const ERROR_BODY_LIMIT: usize = 512;

/// Synthesis over HTTP: `POST {endpoint}/v1/synthesize` with a JSON body,
/// WAV bytes back.
pub struct HttpSynthesisProvider {
    client: Client,
    settings: SynthesisSettings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeBody<'a> {
    voice: &'a VoiceParams,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a StyleParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

impl HttpSynthesisProvider {
    #[must_use]
    pub fn new(settings: SynthesisSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn synthesize_url(&self) -> String {
        format!(
            "{}/v1/synthesize",
            self.settings.endpoint.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl SynthesisProvider for HttpSynthesisProvider {
    async fn synthesize(
        &self,
        voice: &VoiceParams,
        text: &str,
        style: Option<&StyleParams>,
    ) -> Result<Vec<u8>, SynthesisError> {
        let body = SynthesizeBody {
            voice,
            text,
            style,
            model: self.settings.model.as_deref(),
        };

        let mut request = self.client.post(self.synthesize_url()).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            message.truncate(ERROR_BODY_LIMIT);
            return Err(SynthesisError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        // The pipeline caches and decodes WAV; reject anything else early.
        if bytes.len() < 12 || &bytes[..4] != b"RIFF" {
            return Err(SynthesisError::InvalidResponse(
                "response is not a WAV payload".into(),
            ));
        }

        tracing::debug!(bytes = bytes.len(), voice_id = %voice.voice_id, "Synthesis response received");
        Ok(bytes.to_vec())
    }
}
