//! OpenRouter / OpenAI-compatible chat completions

use crate::*;
use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

/// Client for any `/chat/completions` endpoint speaking the OpenAI dialect
pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl OpenRouterProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let api_key = api_key.into();
        let is_openrouter = api_key.starts_with("sk-or-")
            || api_base
                .as_ref()
                .map(|b| b.contains("openrouter"))
                .unwrap_or(false);

        let api_base = api_base.unwrap_or_else(|| {
            if is_openrouter {
                "https://openrouter.ai/api/v1".to_string()
            } else {
                "https://api.openai.com/v1".to_string()
            }
        });

        let default_model = default_model.unwrap_or_else(|| {
            if is_openrouter {
                "openai/gpt-4o".to_string()
            } else {
                "gpt-4o".to_string()
            }
        });

        Self {
            client: Client::new(),
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            default_model,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let messages: Vec<serde_json::Value> = params
            .messages
            .iter()
            .map(|m| {
                let mut obj = json!({ "role": &m.role });
                if let Some(content) = &m.content {
                    obj["content"] = json!(content);
                }
                if let Some(tool_calls) = &m.tool_calls {
                    // The wire format carries arguments as a JSON-encoded string
                    let calls: Vec<serde_json::Value> = tool_calls
                        .iter()
                        .map(|c| {
                            json!({
                                "id": &c.id,
                                "type": &c.call_type,
                                "function": {
                                    "name": &c.function.name,
                                    "arguments": c.function.arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                    obj["tool_calls"] = json!(calls);
                }
                if let Some(tool_call_id) = &m.tool_call_id {
                    obj["tool_call_id"] = json!(tool_call_id);
                }
                if let Some(name) = &m.name {
                    obj["name"] = json!(name);
                }
                obj
            })
            .collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });

        if !params.tools.is_empty() {
            let tools: Vec<serde_json::Value> = params
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": &t.function.name,
                            "description": &t.function.description,
                            "parameters": &t.function.parameters
                        }
                    })
                })
                .collect();

            body["tools"] = json!(tools);
            body["tool_choice"] = match &params.tool_choice {
                ToolChoice::Auto => json!("auto"),
                ToolChoice::Required(name) => {
                    json!({"type": "function", "function": {"name": name}})
                }
                ToolChoice::None => json!("none"),
            };
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let choice = json["choices"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;
        let message = &choice["message"];
        let content = message["content"].as_str().map(|s| s.to_string());
        let finish_reason = choice["finish_reason"]
            .as_str()
            .unwrap_or("stop")
            .to_string();

        let mut tool_calls = Vec::new();
        if let Some(calls) = message["tool_calls"].as_array() {
            for call in calls {
                let function = &call["function"];
                // Arguments normally arrive as a string; unparseable text is kept
                // verbatim so the tool can reject it
                let args = match &function["arguments"] {
                    serde_json::Value::String(s) => serde_json::from_str(s)
                        .unwrap_or_else(|_| serde_json::Value::String(s.clone())),
                    other => other.clone(),
                };

                let id = call["id"]
                    .as_str()
                    .filter(|id| !id.is_empty())
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));

                tool_calls.push(ToolCall {
                    id,
                    name: function["name"].as_str().unwrap_or("").to_string(),
                    arguments: args,
                });
            }
        }

        let usage = if let Some(usage) = json["usage"].as_object() {
            let count = |key: &str| usage.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            Usage {
                prompt_tokens: count("prompt_tokens"),
                completion_tokens: count("completion_tokens"),
                total_tokens: count("total_tokens"),
            }
        } else {
            Usage::default()
        };

        Ok(ChatResponse {
            content,
            tool_calls,
            finish_reason,
            usage,
        })
    }

    async fn send(&self, body: &serde_json::Value) -> Result<Response> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }

        let url = format!("{}/chat/completions", self.api_base);
        trace!("Sending completion request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }

        let text = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|json| json["error"]["message"].as_str().map(|s| s.to_string()))
            .unwrap_or_else(|| format!("{} {}", status.as_u16(), text.trim()));
        Err(ProviderError::Api(error))
    }
}

#[async_trait::async_trait]
impl Provider for OpenRouterProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        let body = self.build_request(&params);
        let response = self.send(&body).await?;
        let json: serde_json::Value = response.json().await?;

        let parsed = self.parse_response(json)?;
        log_response(&parsed);
        Ok(parsed)
    }

    async fn chat_stream(&self, params: ChatParams) -> Result<TextStream> {
        let mut body = self.build_request(&params);
        body["stream"] = json!(true);

        let response = self.send(&body).await?;
        debug!("Streaming completion from {}", self.api_base);
        Ok(text_stream(response.bytes_stream()))
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
