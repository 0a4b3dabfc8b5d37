//! Concrete provider backends.
//!
//! Cloud: HuggingFace Inference (feature extraction) and Groq (chat
//! completions). Local: Ollama for both. All calls carry per-request
//! deadlines; retries are the calling client's concern.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ChatBackend, ChatRequest, EmbeddingBackend, SHORT_CALL_TIMEOUT};
use crate::error::{Error, Result};

/// Probe timeout for local-instance liveness checks.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co/pipeline/feature-extraction";
const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

fn http_client() -> reqwest::Client {
    reqwest::Client::new()
}

// ============================================================================
// EMBEDDINGS
// ============================================================================

/// HuggingFace Inference API feature-extraction backend.
pub struct HuggingFaceEmbeddings {
    api_token: String,
    model: String,
    client: reqwest::Client,
}

impl HuggingFaceEmbeddings {
    pub fn new(api_token: String, model: String) -> Self {
        Self {
            api_token,
            model,
            client: http_client(),
        }
    }
}

#[async_trait]
impl EmbeddingBackend for HuggingFaceEmbeddings {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/{}", HF_INFERENCE_URL, self.model);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "inputs": text }))
            .timeout(SHORT_CALL_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("HuggingFace request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "HuggingFace returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("HuggingFace response unreadable: {e}")))?;

        parse_vector(&body)
            .ok_or_else(|| Error::Upstream("HuggingFace response carried no vector".to_string()))
    }

    async fn probe(&self) -> bool {
        !self.api_token.is_empty()
    }
}

/// Ollama `/api/embeddings` backend.
pub struct OllamaEmbeddings {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaEmbeddings {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: http_client(),
        }
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaEmbeddings {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&json!({ "model": self.model, "prompt": text }))
            .timeout(SHORT_CALL_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Ollama request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "Ollama returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Ollama response unreadable: {e}")))?;

        parse_vector(&body["embedding"])
            .ok_or_else(|| Error::Upstream("Ollama response carried no embedding".to_string()))
    }

    async fn probe(&self) -> bool {
        probe_ollama(&self.client, &self.base_url).await
    }
}

/// Accepts `[f32...]` and the pooled `[[f32...]]` shape.
fn parse_vector(value: &Value) -> Option<Vec<f32>> {
    let array = value.as_array()?;
    let flat = match array.first() {
        Some(Value::Array(inner)) => inner,
        _ => array,
    };
    let vector: Vec<f32> = flat
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect();
    if vector.len() == flat.len() && !vector.is_empty() {
        Some(vector)
    } else {
        None
    }
}

// ============================================================================
// CHAT
// ============================================================================

/// Groq OpenAI-compatible chat completions backend.
pub struct GroqChat {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GroqChat {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: http_client(),
        }
    }
}

#[async_trait]
impl ChatBackend for GroqChat {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .client
            .post(GROQ_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Groq request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!("Groq returned {}", response.status())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Groq response unreadable: {e}")))?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();
        if content.is_empty() {
            return Err(Error::Upstream("Empty response from Groq".to_string()));
        }
        Ok(content)
    }

    async fn probe(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Ollama `/api/chat` backend.
pub struct OllamaChat {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaChat {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: http_client(),
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaChat {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            },
        });
        if request.json {
            body["format"] = json!("json");
        }

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Ollama request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "Ollama returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Ollama response unreadable: {e}")))?;

        let content = body["message"]["content"].as_str().unwrap_or("").trim().to_string();
        if content.is_empty() {
            return Err(Error::Upstream("Empty response from Ollama".to_string()));
        }
        Ok(content)
    }

    async fn probe(&self) -> bool {
        probe_ollama(&self.client, &self.base_url).await
    }
}

async fn probe_ollama(client: &reqwest::Client, base_url: &str) -> bool {
    client
        .get(format!("{base_url}/api/tags"))
        .timeout(PROBE_TIMEOUT)
        .send()
        .await
        .map(|r| r.status().is_success())
        .unwrap_or(false)
}
