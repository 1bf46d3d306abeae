// Cadence
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use async_trait::async_trait;
use cadence_common::error::{CadenceErrorKind, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{FeedbackService, Transcriber};
use crate::settings::ServiceSettings;

const FEEDBACK_PROMPT: &str = "You are a supportive coach. The student answered a \
reflection question from today's lesson. Reply in two or three sentences: \
acknowledge the answer and offer one concrete suggestion.";

/// ureq is blocking, so every call runs on the blocking pool under a hard
/// deadline.
async fn call<T, F>(timeout_ms: u64, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(f);
    match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
        Ok(Ok(res)) => res,
        Ok(Err(err)) => Err(CadenceErrorKind::Service(err.to_string()).into()),
        Err(_) => Err(CadenceErrorKind::ServiceTimeout(timeout_ms).into()),
    }
}

fn agent(settings: &ServiceSettings) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(Duration::from_millis(settings.timeout_ms))
        .build()
}

fn service_error(err: impl std::fmt::Display) -> cadence_common::error::CadenceError {
    CadenceErrorKind::Service(err.to_string()).into()
}

/// Talks to an OpenAI-compatible chat completions endpoint.
pub struct HttpFeedback {
    settings: ServiceSettings,
    agent: ureq::Agent,
}

impl HttpFeedback {
    pub fn new(settings: ServiceSettings) -> Self {
        let agent = agent(&settings);
        HttpFeedback { settings, agent }
    }
}

#[derive(Deserialize)]
struct Completion {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

#[async_trait]
impl FeedbackService for HttpFeedback {
    async fn validate(&self, question: &str, answer: &str) -> Result<String> {
        let mut request = self
            .agent
            .post(&self.settings.endpoint)
            .set("Accept", "application/json")
            .set("Content-Type", "application/json");
        if let Some(key) = &self.settings.api_key {
            request = request.set("Authorization", &format!("Bearer {key}"));
        }
        let body = json!({
            "model": self.settings.model.as_deref().unwrap_or("gpt-4o-mini"),
            "messages": [
                {"role": "system", "content": FEEDBACK_PROMPT},
                {"role": "user", "content": format!("Question: {question}\nAnswer: {answer}")},
            ],
        });

        let completion: Completion = call(self.settings.timeout_ms, move || {
            request
                .send_json(body)
                .map_err(service_error)?
                .into_json()
                .map_err(service_error)
        })
        .await?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_owned())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| service_error("empty completion"))?;
        debug!(chars = text.len(), "Received answer feedback");
        Ok(text)
    }
}

/// Posts raw audio to a transcription endpoint that answers `{"text": ...}`.
pub struct HttpTranscriber {
    settings: ServiceSettings,
    agent: ureq::Agent,
}

impl HttpTranscriber {
    pub fn new(settings: ServiceSettings) -> Self {
        let agent = agent(&settings);
        HttpTranscriber { settings, agent }
    }
}

#[derive(Deserialize)]
struct Transcript {
    text: String,
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String> {
        let mut request = self
            .agent
            .post(&self.settings.endpoint)
            .set("Accept", "application/json")
            .set("Content-Type", "audio/ogg");
        if let Some(model) = &self.settings.model {
            request = request.query("model", model);
        }
        if let Some(key) = &self.settings.api_key {
            request = request.set("Authorization", &format!("Bearer {key}"));
        }

        let transcript: Transcript = call(self.settings.timeout_ms, move || {
            request
                .send_bytes(&audio)
                .map_err(service_error)?
                .into_json()
                .map_err(service_error)
        })
        .await?;

        let text = transcript.text.trim().to_owned();
        if text.is_empty() {
            return Err(service_error("empty transcript"));
        }
        Ok(text)
    }
}
