//! Tool-calling narrative agent over an OpenAI-compatible chat completions API.
//!
//! The model gets two tools: `get_trend_analysis`, which hands back the
//! deterministic decision as JSON, and `submit_recommendation`, whose
//! arguments are the structured answer. Prose without a tool call is accepted
//! as a last resort and its recommendation inferred by keyword search.

use crate::domain::entities::decision::{NarrativeAnalysis, RecommendationSource};
use crate::domain::error::DomainError;
use crate::domain::ports::narrative_agent::{NarrativeAgent, NarrativeRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

const MAX_ROUNDS: usize = 4;
const ANALYSIS_TOOL: &str = "get_trend_analysis";
const SUBMIT_TOOL: &str = "submit_recommendation";

const SYSTEM_PROMPT: &str = "You are a cautious treasury assistant monitoring an asset price feed. \
Call get_trend_analysis to obtain the computed trend statistics, explain them in two or three plain sentences, \
then call submit_recommendation exactly once with your recommendation on whether the user should deposit now.";

#[derive(Debug, Clone)]
pub struct OpenAiAgentConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl OpenAiAgentConfig {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Self {
        Self {
            api_key,
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            base_url: base_url
                .unwrap_or_else(|| "https://api.openai.com".to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

pub struct OpenAiToolAgent {
    client: Client,
    config: OpenAiAgentConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Value],
    tools: &'a Value,
    tool_choice: &'a str,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct SubmittedRecommendation {
    should_deposit: bool,
    explanation: String,
}

fn function_kind() -> String {
    "function".to_string()
}

impl OpenAiToolAgent {
    pub fn new(config: OpenAiAgentConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn tools() -> Value {
        json!([
            {
                "type": "function",
                "function": {
                    "name": ANALYSIS_TOOL,
                    "description": "Returns the computed price trend statistics and the rule-based deposit decision.",
                    "parameters": { "type": "object", "properties": {}, "additionalProperties": false }
                }
            },
            {
                "type": "function",
                "function": {
                    "name": SUBMIT_TOOL,
                    "description": "Submit the final recommendation with a short explanation for the user.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "should_deposit": { "type": "boolean" },
                            "explanation": { "type": "string" }
                        },
                        "required": ["should_deposit", "explanation"],
                        "additionalProperties": false
                    }
                }
            }
        ])
    }

    async fn complete(&self, messages: &[Value], tools: &Value) -> Result<ChatMessage, DomainError> {
        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&ChatRequest {
                model: &self.config.model,
                messages,
                tools,
                tool_choice: "auto",
                temperature: 0.0,
            })
            .send()
            .await
            .map_err(|e| DomainError::Narrative(format!("chat API error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DomainError::Narrative(format!("chat API {status}: {body}")));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| DomainError::Parse(format!("chat response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| DomainError::Narrative("chat API returned no choices".into()))
    }
}

#[async_trait]
impl NarrativeAgent for OpenAiToolAgent {
    fn name(&self) -> &str {
        "openai_tool_agent"
    }

    async fn narrate(&self, request: &NarrativeRequest) -> Result<NarrativeAnalysis, DomainError> {
        let tools = Self::tools();
        let mut messages = vec![
            json!({ "role": "system", "content": SYSTEM_PROMPT }),
            json!({ "role": "user", "content": user_prompt(request) }),
        ];

        for round in 0..MAX_ROUNDS {
            let message = self.complete(&messages, &tools).await?;

            if message.tool_calls.is_empty() {
                let text = message.content.unwrap_or_default();
                if text.trim().is_empty() {
                    return Err(DomainError::Narrative("model returned an empty reply".into()));
                }
                debug!(round, "model answered in prose; inferring recommendation from text");
                return Ok(NarrativeAnalysis {
                    narrative_recommendation: infer_recommendation(&text),
                    explanation: text,
                    source: RecommendationSource::Keyword,
                    model: self.config.model.clone(),
                });
            }

            messages.push(json!({
                "role": "assistant",
                "content": message.content,
                "tool_calls": message.tool_calls,
            }));

            for call in &message.tool_calls {
                debug!(round, tool = %call.function.name, "model called tool");
                let output = match call.function.name.as_str() {
                    ANALYSIS_TOOL => analysis_payload(request).to_string(),
                    SUBMIT_TOOL => {
                        match serde_json::from_str::<SubmittedRecommendation>(&call.function.arguments) {
                            Ok(rec) => {
                                info!(should_deposit = rec.should_deposit, "structured recommendation received");
                                return Ok(NarrativeAnalysis {
                                    explanation: rec.explanation,
                                    narrative_recommendation: Some(rec.should_deposit),
                                    source: RecommendationSource::Structured,
                                    model: self.config.model.clone(),
                                });
                            }
                            Err(e) => json!({ "error": format!("invalid arguments: {e}") }).to_string(),
                        }
                    }
                    other => json!({ "error": format!("unknown tool {other}") }).to_string(),
                };
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": output,
                }));
            }
        }

        Err(DomainError::Narrative(format!(
            "agent did not submit a recommendation within {MAX_ROUNDS} rounds"
        )))
    }
}

fn user_prompt(request: &NarrativeRequest) -> String {
    let p = &request.preferences;
    format!(
        "Asset {} is at {:.6} (confidence ±{:.6}) as of {}. \
         I am looking at a {} horizon, want at least {:.2}% profit, and my risk tolerance is {}. \
         Should I deposit now?",
        request.observation.symbol,
        request.observation.price,
        request.observation.confidence,
        request.observation.publish_time.to_rfc3339(),
        p.monitoring_period,
        p.profit_margin,
        p.risk_tolerance,
    )
}

fn analysis_payload(request: &NarrativeRequest) -> Value {
    json!({
        "decision": request.decision,
        "patterns": request.patterns,
        "preferences": request.preferences,
    })
}

/// Best-effort reading of a free-text recommendation. Negations win over
/// affirmations; `None` when the text commits to neither.
pub fn infer_recommendation(text: &str) -> Option<bool> {
    const NEGATIVE: [&str; 8] = [
        "should not deposit",
        "shouldn't deposit",
        "do not deposit",
        "don't deposit",
        "not recommend depositing",
        "not recommended to deposit",
        "avoid depositing",
        "hold off",
    ];
    const POSITIVE: [&str; 5] = [
        "should deposit",
        "recommend depositing",
        "recommended to deposit",
        "good time to deposit",
        "deposit now",
    ];

    let lower = text.to_lowercase();
    if NEGATIVE.iter().any(|k| lower.contains(k)) {
        Some(false)
    } else if POSITIVE.iter().any(|k| lower.contains(k)) {
        Some(true)
    } else {
        None
    }
}
