//! OpenAI-compatible agent invoker.
//!
//! Implements the `AgentInvoker` seam over a plain (non-streaming)
//! `/chat/completions` call. Works with OpenAI, Ollama, vLLM, Groq,
//! OpenRouter, etc. Each turn is prompted from the agent's registry
//! persona plus the data the executor put in the `TurnContext`:
//! reviewer turns see the output under review and answer with a
//! `pass_review` verdict, member turns see their reviewer's feedback.

use std::collections::HashMap;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use troupe_core::config::{AgentSpec, ModelConfig};
use troupe_core::error::{Result, TroupeError};
use troupe_core::traits::AgentInvoker;
use troupe_core::types::{Message, TurnContext};

const DEFAULT_PERSONA: &str = "You are a helpful assistant.";

const REVIEW_PERSONA: &str = "You review a teammate's response against the team goal. \
    Respond with JSON: {\"pass_review\": bool, \"feedback\": \"what to improve\"}.";

pub struct ChatInvoker {
    http: Client,
    model: ModelConfig,
    agents: HashMap<String, AgentSpec>,
}

impl ChatInvoker {
    pub fn new(model: ModelConfig, agents: HashMap<String, AgentSpec>) -> Self {
        Self {
            http: Client::new(),
            model,
            agents,
        }
    }

    fn spec(&self, member: &str) -> Option<&AgentSpec> {
        self.agents.get(member)
    }

    fn system_prompt(&self, ctx: &TurnContext) -> String {
        if ctx.is_reviewer {
            // A dedicated "reviewer" registry entry overrides the
            // default review persona.
            return self
                .spec("reviewer")
                .and_then(|s| s.persona.clone())
                .unwrap_or_else(|| REVIEW_PERSONA.to_string());
        }
        self.spec(&ctx.member)
            .and_then(|s| s.persona.clone())
            .unwrap_or_else(|| DEFAULT_PERSONA.to_string())
    }

    fn user_prompt(&self, ctx: &TurnContext) -> String {
        let mut prompt = format!("The team goal is: {}\n", ctx.goal);

        if ctx.is_reviewer {
            match &ctx.under_review {
                Some(output) => {
                    prompt.push_str(&format!(
                        "\nReview this response from '{}':\n{}\n",
                        ctx.member,
                        output.payload_text()
                    ));
                }
                None => {
                    prompt.push_str(&format!(
                        "\n'{}' has produced no response yet; fail the review.\n",
                        ctx.member
                    ));
                }
            }
            prompt.push_str(
                "\nRespond with JSON: {\"pass_review\": bool, \"feedback\": \"...\"}",
            );
        } else {
            if let Some(feedback) = &ctx.feedback {
                prompt.push_str(&format!(
                    "\nYour reviewer provided this feedback to guide your next response:\n{}\n",
                    feedback.payload_text()
                ));
            }
            prompt.push_str("\nRespond with a JSON object containing your response.");
        }
        prompt
    }

    fn model_for(&self, ctx: &TurnContext) -> String {
        self.spec(&ctx.member)
            .and_then(|s| s.model.clone())
            .unwrap_or_else(|| self.model.name.clone())
    }

    async fn chat(&self, model: String, system: String, user: String) -> Result<String> {
        let api_key = std::env::var(&self.model.api_key_env).map_err(|_| {
            TroupeError::LlmRequest(format!(
                "API key env var '{}' is not set",
                self.model.api_key_env
            ))
        })?;

        let request = ChatRequest {
            model,
            messages: vec![
                ChatRequestMessage {
                    role: "system",
                    content: system,
                },
                ChatRequestMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.model.temperature,
            max_tokens: self.model.max_tokens,
            response_format: ResponseFormat {
                r#type: "json_object",
            },
        };

        let url = format!("{}/chat/completions", self.model.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TroupeError::LlmRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TroupeError::LlmRequest(format!("{status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TroupeError::LlmParse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| TroupeError::LlmParse("response contained no choices".to_string()))
    }
}

impl AgentInvoker for ChatInvoker {
    fn invoke(&self, ctx: &TurnContext) -> BoxFuture<'_, Result<Message>> {
        let node = ctx.node.clone();
        let is_reviewer = ctx.is_reviewer;
        let needs_review = self.spec(&ctx.member).map(|s| s.needs_review).unwrap_or(false);
        let model = self.model_for(ctx);
        let system = self.system_prompt(ctx);
        let user = self.user_prompt(ctx);

        Box::pin(async move {
            debug!(node = %node, model = %model, "chat completion request");
            let content = self.chat(model, system, user).await?;

            let payload = parse_payload(&content);
            let finished = derive_finished(is_reviewer, needs_review, &payload);

            let mut message = Message::new(node, payload);
            message.finished = finished;
            Ok(message)
        })
    }
}

/// Parse the model's reply as JSON, falling back to a plain string.
fn parse_payload(content: &str) -> serde_json::Value {
    serde_json::from_str(content)
        .unwrap_or_else(|_| serde_json::Value::String(content.to_string()))
}

/// Completion signal for the produced message.
///
/// A member that skips review is finished as soon as it responds; a
/// reviewed member is finished only by its reviewer's verdict, carried
/// on the review message.
fn derive_finished(is_reviewer: bool, needs_review: bool, payload: &serde_json::Value) -> bool {
    if is_reviewer {
        payload
            .get("pass_review")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    } else {
        !needs_review
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatRequestMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatRequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoker() -> ChatInvoker {
        let mut agents = HashMap::new();
        agents.insert(
            "writer".to_string(),
            AgentSpec {
                needs_review: true,
                persona: Some("You write short stories.".to_string()),
                model: Some("gpt-4o".to_string()),
            },
        );
        agents.insert("editor".to_string(), AgentSpec::default());
        ChatInvoker::new(ModelConfig::default(), agents)
    }

    #[test]
    fn test_member_prompt_includes_persona_and_feedback() {
        let inv = invoker();
        let ctx = TurnContext::member_turn("writer", "write a haiku")
            .with_feedback(Message::text("writer_reviewer", "too long"));

        assert_eq!(inv.system_prompt(&ctx), "You write short stories.");
        let user = inv.user_prompt(&ctx);
        assert!(user.contains("write a haiku"));
        assert!(user.contains("too long"));
    }

    #[test]
    fn test_review_prompt_includes_output_under_review() {
        let inv = invoker();
        let ctx = TurnContext::review_turn("writer_reviewer", "writer", "write a haiku")
            .with_under_review(Message::text("writer", "an old silent pond"));

        assert!(inv.system_prompt(&ctx).contains("pass_review"));
        let user = inv.user_prompt(&ctx);
        assert!(user.contains("an old silent pond"));
        assert!(user.contains("pass_review"));
    }

    #[test]
    fn test_model_override_per_agent() {
        let inv = invoker();
        let writer = TurnContext::member_turn("writer", "goal");
        let editor = TurnContext::member_turn("editor", "goal");
        assert_eq!(inv.model_for(&writer), "gpt-4o");
        assert_eq!(inv.model_for(&editor), "gpt-4o-mini");
    }

    #[test]
    fn test_parse_payload_json_or_text() {
        let json = parse_payload(r#"{"response": "hi"}"#);
        assert_eq!(json["response"], "hi");

        let text = parse_payload("not json at all");
        assert_eq!(text, serde_json::Value::String("not json at all".to_string()));
    }

    #[test]
    fn test_finished_signal_derivation() {
        // Members that skip review finish immediately.
        assert!(derive_finished(false, false, &serde_json::json!({})));
        // Reviewed members wait for their reviewer.
        assert!(!derive_finished(false, true, &serde_json::json!({})));
        // Review turns carry the verdict.
        assert!(derive_finished(
            true,
            true,
            &serde_json::json!({"pass_review": true})
        ));
        assert!(!derive_finished(
            true,
            true,
            &serde_json::json!({"pass_review": false})
        ));
        assert!(!derive_finished(true, true, &serde_json::json!({})));
    }

    #[test]
    fn test_chat_response_deserialization() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "{\"response\": \"ok\"}"}}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "{\"response\": \"ok\"}");
    }
}
