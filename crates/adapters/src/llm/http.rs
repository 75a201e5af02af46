// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP implementation of the LLM provider over the model catalog.
//!
//! Speaks each vendor's chat API directly with reqwest; API keys come from
//! the conventional environment variables and never touch disk.

use super::catalog::{self, ModelSpec, ProviderKind};
use super::cost::{CostTracker, DailySummary};
use super::prompts;
use super::{AnalysisRequest, LlmError, LlmProvider};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;
use vigil_core::config::LlmConfig;
use vigil_core::LlmAnalysis;

/// Raw completion before analysis assembly.
struct Completion {
    text: String,
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Catalog-backed provider with fallback and budget enforcement.
pub struct HttpLlmProvider {
    client: reqwest::Client,
    cost: CostTracker,
    configured_model: String,
}

impl HttpLlmProvider {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            cost: CostTracker::new(config.daily_budget_usd),
            configured_model: config.model.clone(),
        }
    }

    pub fn cost_tracker(&self) -> &CostTracker {
        &self.cost
    }

    /// Run one completion against a catalog model.
    async fn complete(
        &self,
        model_id: &str,
        prompt: &str,
        config: &LlmConfig,
    ) -> Result<(Completion, &'static ModelSpec), LlmError> {
        let spec = catalog::lookup(model_id)
            .ok_or_else(|| LlmError::UnknownModel(model_id.to_string()))?;
        let api_key = std::env::var(spec.env_key).map_err(|_| LlmError::MissingApiKey {
            model: model_id.to_string(),
            env_key: spec.env_key.to_string(),
        })?;

        let timeout = Duration::from_secs(config.timeout_seconds);
        let bare = catalog::bare_model_name(model_id);

        let completion = match spec.kind {
            ProviderKind::Anthropic => {
                let body = json!({
                    "model": bare,
                    "max_tokens": config.max_tokens,
                    "temperature": config.temperature,
                    "messages": [{"role": "user", "content": prompt}],
                });
                let value = self
                    .post_json(
                        model_id,
                        self.client
                            .post("https://api.anthropic.com/v1/messages")
                            .header("x-api-key", &api_key)
                            .header("anthropic-version", "2023-06-01")
                            .timeout(timeout)
                            .json(&body),
                    )
                    .await?;
                Completion {
                    text: string_at(&value, &["content", "0", "text"], model_id)?,
                    prompt_tokens: u64_at(&value, &["usage", "input_tokens"]),
                    completion_tokens: u64_at(&value, &["usage", "output_tokens"]),
                }
            }

            ProviderKind::OpenAi | ProviderKind::DeepSeek => {
                let url = match spec.kind {
                    ProviderKind::DeepSeek => "https://api.deepseek.com/chat/completions",
                    _ => "https://api.openai.com/v1/chat/completions",
                };
                let body = json!({
                    "model": bare,
                    "messages": [{"role": "user", "content": prompt}],
                    "temperature": config.temperature,
                    "max_tokens": config.max_tokens,
                });
                let value = self
                    .post_json(
                        model_id,
                        self.client
                            .post(url)
                            .bearer_auth(&api_key)
                            .timeout(timeout)
                            .json(&body),
                    )
                    .await?;
                Completion {
                    text: string_at(
                        &value,
                        &["choices", "0", "message", "content"],
                        model_id,
                    )?,
                    prompt_tokens: u64_at(&value, &["usage", "prompt_tokens"]),
                    completion_tokens: u64_at(&value, &["usage", "completion_tokens"]),
                }
            }

            ProviderKind::Gemini => {
                let url = format!(
                    "https://generativelanguage.googleapis.com/v1beta/models/{bare}:generateContent?key={api_key}"
                );
                let body = json!({
                    "contents": [{"parts": [{"text": prompt}]}],
                    "generationConfig": {
                        "temperature": config.temperature,
                        "maxOutputTokens": config.max_tokens,
                    },
                });
                let value = self
                    .post_json(model_id, self.client.post(url).timeout(timeout).json(&body))
                    .await?;
                Completion {
                    text: string_at(
                        &value,
                        &["candidates", "0", "content", "parts", "0", "text"],
                        model_id,
                    )?,
                    prompt_tokens: u64_at(&value, &["usageMetadata", "promptTokenCount"]),
                    completion_tokens: u64_at(&value, &["usageMetadata", "candidatesTokenCount"]),
                }
            }
        };

        Ok((completion, spec))
    }

    async fn post_json(
        &self,
        model_id: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, LlmError> {
        let response = request.send().await.map_err(|e| LlmError::Request {
            model: model_id.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                model: model_id.to_string(),
                status: status.as_u16(),
                message: truncate(&message, 300),
            });
        }

        response.json().await.map_err(|e| LlmError::BadResponse {
            model: model_id.to_string(),
            message: e.to_string(),
        })
    }

    /// Try the primary model, then the fallback once.
    async fn complete_with_fallback(
        &self,
        prompt: &str,
        config: &LlmConfig,
    ) -> Result<(Completion, &'static ModelSpec), LlmError> {
        match self.complete(&config.model, prompt, config).await {
            Ok(done) => Ok(done),
            Err(primary_err) => {
                let Some(fallback) = config.fallback_model.as_deref() else {
                    return Err(primary_err);
                };
                tracing::warn!(
                    model = %config.model,
                    fallback,
                    error = %primary_err,
                    "primary model failed, trying fallback"
                );
                self.complete(fallback, prompt, config).await
            }
        }
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn analyze_report(&self, request: AnalysisRequest) -> Result<LlmAnalysis, LlmError> {
        if !self.cost.can_spend(0.01) {
            tracing::warn!(
                checker = %request.checker_name,
                "daily LLM budget exceeded, skipping analysis"
            );
            return Ok(LlmAnalysis {
                request_id: "budget_exceeded".to_string(),
                checker_name: request.checker_name,
                prompt_tokens: 0,
                completion_tokens: 0,
                cost_usd: 0.0,
                model_used: request.config.model,
                analysis_text: "Daily budget exceeded. Analysis skipped.".to_string(),
                root_causes: Vec::new(),
                fix_suggestions: Vec::new(),
                evidence_summary: "budget_exceeded".to_string(),
                timestamp: Utc::now(),
                report_hash: String::new(),
                report_was_fresh: false,
            });
        }

        let prompt = prompts::build_analysis_prompt(
            &request.project_name,
            &request.checker_name,
            &request.report,
            request.evidence_context.as_deref(),
        );

        let (completion, spec) = self.complete_with_fallback(&prompt, &request.config).await?;
        let cost_usd =
            catalog::cost_usd(spec, completion.prompt_tokens, completion.completion_tokens);
        self.cost.record(cost_usd, spec.id);

        let parsed = prompts::parse_analysis_response(&completion.text);
        Ok(LlmAnalysis {
            request_id: uuid::Uuid::new_v4().to_string(),
            checker_name: request.checker_name,
            prompt_tokens: completion.prompt_tokens,
            completion_tokens: completion.completion_tokens,
            cost_usd,
            model_used: spec.id.to_string(),
            analysis_text: completion.text,
            root_causes: parsed.root_causes,
            fix_suggestions: parsed.fix_suggestions,
            evidence_summary: format!(
                "prompt_chars={}, evidence_context={}",
                prompt.len(),
                request.evidence_context.is_some()
            ),
            timestamp: Utc::now(),
            report_hash: String::new(),
            report_was_fresh: false,
        })
    }

    async fn generate_report(
        &self,
        project_name: &str,
        scan_summary: &str,
        config: &LlmConfig,
    ) -> Result<String, LlmError> {
        let prompt = prompts::build_report_prompt(project_name, scan_summary);
        // A whole-scan narrative needs more room than a single analysis
        let mut report_config = config.clone();
        report_config.max_tokens = config.max_tokens.max(4000);
        report_config.timeout_seconds = config.timeout_seconds.max(60);

        let (completion, spec) = self.complete_with_fallback(&prompt, &report_config).await?;
        let cost_usd =
            catalog::cost_usd(spec, completion.prompt_tokens, completion.completion_tokens);
        self.cost.record(cost_usd, spec.id);
        Ok(completion.text)
    }

    fn is_available(&self) -> bool {
        catalog::lookup(&self.configured_model)
            .is_some_and(|spec| std::env::var(spec.env_key).is_ok())
    }

    fn daily_summary(&self) -> DailySummary {
        self.cost.daily_summary()
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    }
}

fn string_at(value: &Value, path: &[&str], model_id: &str) -> Result<String, LlmError> {
    let mut cursor = value;
    for key in path {
        cursor = match key.parse::<usize>() {
            Ok(index) => cursor.get(index),
            Err(_) => cursor.get(key),
        }
        .unwrap_or(&Value::Null);
    }
    cursor
        .as_str()
        .map(String::from)
        .ok_or_else(|| LlmError::BadResponse {
            model: model_id.to_string(),
            message: format!("missing field {}", path.join(".")),
        })
}

fn u64_at(value: &Value, path: &[&str]) -> u64 {
    let mut cursor = value;
    for key in path {
        cursor = cursor.get(key).unwrap_or(&Value::Null);
    }
    cursor.as_u64().unwrap_or(0)
}
