//! Emergent Research Activity
//!
//! Combinatory play over whatever research earlier cycles have gathered:
//! scans recent fetch_research/web_research records, asks the chat skill
//! for cross-cutting insights, and stores them under `emergent_insights`
//! where the reflection activity picks them up.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::activity::{Activity, ActivityResult, ActivitySpec};
use crate::context::SharedContext;
use crate::memory::MemoryRecord;
use crate::skills::{capability, ChatCompletionApi};

const SYSTEM_PROMPT: &str = "You are an innovative AI researcher skilled at identifying \
patterns, connections, and novel insights across different research papers and web \
content. Practice combinatory play - connect seemingly unrelated ideas to generate new \
insights and hypotheses. Focus on common themes, unexpected connections between topics, \
novel hypotheses and research directions, and potential breakthroughs. Be specific and \
concrete while maintaining scientific rigor.";

const RECENT_SCAN_LIMIT: usize = 20;
const MAX_TOKENS: usize = 1000;

pub struct EmergentResearchActivity {
    chat: Arc<dyn ChatCompletionApi>,
}

impl EmergentResearchActivity {
    pub fn new(chat: Arc<dyn ChatCompletionApi>) -> Self {
        Self { chat }
    }

    pub fn spec() -> ActivitySpec {
        ActivitySpec::new("emergent_research", 0.5, Duration::from_secs(7200))
            .requires(capability::CHAT)
    }

    /// Pull paper/finding items out of recent successful research records.
    fn collect_research_data(records: &[MemoryRecord]) -> Vec<Value> {
        let mut research_data = Vec::new();

        for record in records {
            if !record.success {
                continue;
            }
            let Some(data) = &record.data else { continue };

            let items = match record.activity_type.as_str() {
                "fetch_research" => data.get("papers"),
                "web_research" => data.get("findings"),
                _ => None,
            };
            if let Some(Value::Array(items)) = items {
                research_data.extend(items.iter().cloned());
            }
        }

        research_data
    }

    /// Flatten the collected items into a prompt-ready summary. Papers carry
    /// a `summary` field; web findings carry `content`.
    fn prepare_research_summary(research_data: &[Value]) -> String {
        let mut parts = Vec::new();

        for item in research_data {
            let title = item
                .get("title")
                .and_then(Value::as_str)
                .or_else(|| item.get("query").and_then(Value::as_str))
                .unwrap_or("(untitled)");
            parts.push(format!("- Title: {}", title));

            if let Some(summary) = item.get("summary").and_then(Value::as_str) {
                parts.push(format!("  Abstract: {}", summary));
                if let Some(categories) = item.get("categories") {
                    parts.push(format!("  Categories: {}\n", categories));
                }
            } else {
                if let Some(content) = item.get("content").and_then(Value::as_str) {
                    parts.push(format!("  Content: {}", content));
                }
                if let Some(url) = item.get("url").and_then(Value::as_str) {
                    parts.push(format!("  URL: {}\n", url));
                }
            }
        }

        parts.join("\n")
    }
}

#[async_trait]
impl Activity for EmergentResearchActivity {
    async fn execute(&self, ctx: &SharedContext) -> ActivityResult {
        info!("Starting emergent research analysis");

        let recent = ctx.memory().recent_activities(RECENT_SCAN_LIMIT).await;
        let research_data = Self::collect_research_data(&recent);

        if research_data.is_empty() {
            return ActivityResult::error_result("No research data found in memory");
        }

        let research_summary = Self::prepare_research_summary(&research_data);
        let analysis_prompt = format!(
            "Analyze the following research data and generate emergent insights:\n\n\
             Research Data:\n{}\n\n\
             Please provide:\n\
             1. Key patterns and themes identified across sources\n\
             2. Novel connections between different topics\n\
             3. Potential breakthrough ideas or hypotheses\n\
             4. Suggested directions for future research",
            research_summary
        );

        let completion = match self
            .chat
            .chat_completion(&analysis_prompt, SYSTEM_PROMPT, MAX_TOKENS)
            .await
        {
            Ok(completion) => completion,
            Err(e) => return ActivityResult::error_result(e.to_string()),
        };

        ctx.memory()
            .store(
                "emergent_insights",
                json!({
                    "content": completion.content,
                    "timestamp": ctx.now().to_rfc3339(),
                    "source_count": research_data.len(),
                }),
            )
            .await;

        ActivityResult::success_with_metadata(
            json!({
                "insights": completion.content,
                "source_counts": {
                    "research_data": research_data.len(),
                },
            }),
            json!({
                "model": completion.model,
                "finish_reason": completion.finish_reason,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLog;
    use crate::skills::{ChatCompletion, SkillError};
    use chrono::Utc;
    use std::sync::Mutex;

    struct MockChat {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl ChatCompletionApi for MockChat {
        async fn chat_completion(
            &self,
            prompt: &str,
            _system_prompt: &str,
            _max_tokens: usize,
        ) -> Result<ChatCompletion, SkillError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(SkillError::Api {
                    service: "anthropic".to_string(),
                    status: 500,
                    message: "Chat API error".to_string(),
                });
            }
            Ok(ChatCompletion {
                content: "Test insight content".to_string(),
                model: "claude-sonnet-4-20250514".to_string(),
                finish_reason: "end_turn".to_string(),
            })
        }
    }

    fn mock_chat(fail: bool) -> Arc<MockChat> {
        Arc::new(MockChat {
            prompts: Mutex::new(Vec::new()),
            fail,
        })
    }

    async fn seed_research(memory: &MemoryLog) {
        memory
            .record(MemoryRecord::from_result(
                "fetch_research",
                Utc::now(),
                &ActivityResult::success_result(json!({
                    "papers": [{
                        "title": "Test Paper 1",
                        "summary": "A study on AI",
                        "categories": ["cs.AI"],
                    }],
                    "count": 1,
                })),
            ))
            .await;
        memory
            .record(MemoryRecord::from_result(
                "web_research",
                Utc::now(),
                &ActivityResult::success_result(json!({
                    "findings": [{
                        "query": "recent AI developments",
                        "content": "Recent developments in AI",
                    }],
                    "synthesis": "summary",
                })),
            ))
            .await;
    }

    #[tokio::test]
    async fn test_synthesis_over_recent_research() {
        let memory = Arc::new(MemoryLog::in_memory());
        seed_research(&memory).await;
        let ctx = SharedContext::new(memory.clone(), Utc::now());

        let chat = mock_chat(false);
        let activity = EmergentResearchActivity::new(chat.clone());
        let result = activity.execute(&ctx).await;

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["insights"], "Test insight content");
        assert_eq!(data["source_counts"]["research_data"], 2);

        // Both sources appear in the analysis prompt
        let prompts = chat.prompts.lock().unwrap();
        assert!(prompts[0].contains("Test Paper 1"));
        assert!(prompts[0].contains("Recent developments in AI"));

        // Insights stored for the reflection activity to pick up
        let insights = memory.retrieve("emergent_insights").await.unwrap();
        assert_eq!(insights["content"], "Test insight content");
        assert_eq!(insights["source_count"], 2);
    }

    #[tokio::test]
    async fn test_empty_log_fails_with_exact_error() {
        let memory = Arc::new(MemoryLog::in_memory());
        let ctx = SharedContext::new(memory.clone(), Utc::now());

        let activity = EmergentResearchActivity::new(mock_chat(false));
        let result = activity.execute(&ctx).await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("No research data found in memory")
        );
    }

    #[tokio::test]
    async fn test_failed_research_records_are_ignored() {
        let memory = Arc::new(MemoryLog::in_memory());
        memory
            .record(MemoryRecord::from_result(
                "fetch_research",
                Utc::now(),
                &ActivityResult::error_result("arxiv down"),
            ))
            .await;
        let ctx = SharedContext::new(memory.clone(), Utc::now());

        let activity = EmergentResearchActivity::new(mock_chat(false));
        let result = activity.execute(&ctx).await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("No research data found in memory")
        );
    }

    #[tokio::test]
    async fn test_chat_failure_surfaces_as_failed_result() {
        let memory = Arc::new(MemoryLog::in_memory());
        seed_research(&memory).await;
        let ctx = SharedContext::new(memory.clone(), Utc::now());

        let activity = EmergentResearchActivity::new(mock_chat(true));
        let result = activity.execute(&ctx).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("Chat API error"));
        assert!(memory.retrieve("emergent_insights").await.is_none());
    }

    #[test]
    fn test_prepare_research_summary_formats_both_kinds() {
        let items = vec![
            json!({"title": "Paper", "summary": "Abstract text", "categories": ["cs.AI"]}),
            json!({"query": "web query", "content": "Web content", "url": "https://example.com"}),
        ];
        let summary = EmergentResearchActivity::prepare_research_summary(&items);

        assert!(summary.contains("- Title: Paper"));
        assert!(summary.contains("Abstract: Abstract text"));
        assert!(summary.contains("- Title: web query"));
        assert!(summary.contains("Content: Web content"));
        assert!(summary.contains("URL: https://example.com"));
    }
}
