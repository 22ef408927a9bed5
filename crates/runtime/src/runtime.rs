use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use researcher_config::AppConfig;
use researcher_llm::{ClientSettings, CompletionOracle, OpenAiCompatClient, extract_insight};
use researcher_memory::{CandidateOrigin, InsightMemory, InsightRecord};
use researcher_search::{SearchHit, SearchProvider, SearchSettings, WebSearch, build_web_search};

use crate::prompt_builder::{PromptInputs, build_chat_messages, is_manual_teaching};

/// Everything produced by one research turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub answer: String,
    /// Insights recalled for this message, most relevant first.
    pub memory: Vec<InsightRecord>,
    pub search: Vec<SearchHit>,
    /// Insight learned during this turn, if one passed the gatekeeper.
    pub new_insight: Option<InsightRecord>,
    /// The answer is a placeholder because the model was unavailable.
    pub degraded: bool,
}

/// Recall, search, answer, learn.
#[derive(Clone)]
pub struct ResearchRuntime {
    pub config: AppConfig,
    oracle: Arc<dyn CompletionOracle>,
    search: Arc<dyn WebSearch>,
    memory: InsightMemory,
}

impl ResearchRuntime {
    pub fn new(
        config: AppConfig,
        oracle: Arc<dyn CompletionOracle>,
        search: Arc<dyn WebSearch>,
        memory: InsightMemory,
    ) -> Self {
        Self {
            config,
            oracle,
            search,
            memory,
        }
    }

    /// Wire up the HTTP completion client, the configured search backend and
    /// the file-backed insight memory.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let llm = &config.llm;
        let oracle = OpenAiCompatClient::new(ClientSettings {
            base_url: llm.base_url.clone(),
            model: llm.model.clone(),
            api_key: Some(llm.api_key.clone()).filter(|key| !key.trim().is_empty()),
            temperature: llm.temperature,
            timeout: Duration::from_secs(llm.timeout_secs.max(1)),
        })?;

        let Some(provider) = SearchProvider::from_label(&config.search.provider) else {
            bail!(
                "unknown search provider '{}' (expected you, brave or none)",
                config.search.provider
            );
        };
        let search = build_web_search(SearchSettings {
            provider,
            api_key: Some(config.search.api_key.clone()).filter(|key| !key.trim().is_empty()),
            max_results: config.search.max_results.max(1),
            timeout: Duration::from_secs(config.search.timeout_secs.max(1)),
        })?;

        let memory = InsightMemory::open(&config.memory.path)
            .with_recall_limit(config.memory.recall_limit)
            .with_extra_markers(&config.memory.extra_degraded_markers);

        Ok(Self::new(config, Arc::new(oracle), search, memory))
    }

    pub fn memory(&self) -> &InsightMemory {
        &self.memory
    }

    /// Answer `message`, then try to learn from the exchange.
    ///
    /// `previous_question` is only consulted when `message` is a manual
    /// teaching ("The answer is: ..."); the message then becomes the insight
    /// stored against that earlier question.
    #[instrument(skip(self, previous_question), fields(bot = %self.config.agent.name, user_len = message.len()))]
    pub async fn respond(&self, message: &str, previous_question: Option<&str>) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            bail!("message is required");
        }

        let recall = {
            let memory = self.memory.clone();
            let query = message.to_string();
            tokio::task::spawn_blocking(move || memory.recall(&query))
        };
        let (recalled, hits) = tokio::join!(recall, self.search.search(message));
        let recalled = recalled.context("insight recall task failed")?;
        debug!(recalled = recalled.len(), hits = hits.len(), "context gathered");

        let messages = build_chat_messages(&PromptInputs {
            agent_name: &self.config.agent.name,
            user_message: message,
            insights: &recalled,
            hits: &hits,
        });
        let completion = self.oracle.complete(&messages).await;
        if completion.is_degraded() {
            warn!("answer is a placeholder; completion provider unavailable");
        }

        let new_insight = match self
            .learn(message, previous_question, &completion.text, completion.is_degraded())
            .await
        {
            Ok(saved) => saved,
            Err(err) => {
                warn!(error = %err, "learning failed; answering anyway");
                None
            }
        };

        Ok(ChatReply {
            answer: completion.text,
            memory: recalled,
            search: hits,
            new_insight,
            degraded: completion.degraded,
        })
    }

    async fn learn(
        &self,
        message: &str,
        previous_question: Option<&str>,
        answer: &str,
        answer_degraded: bool,
    ) -> Result<Option<InsightRecord>> {
        let previous_question = previous_question.map(str::trim).filter(|q| !q.is_empty());

        let (query, candidate, origin) = match previous_question {
            Some(question) if is_manual_teaching(message) => {
                info!(question, "manual teaching received");
                (question.to_string(), message.to_string(), CandidateOrigin::Generated)
            }
            _ if answer_degraded => (
                message.to_string(),
                answer.to_string(),
                CandidateOrigin::Degraded,
            ),
            _ if !self.config.memory.auto_learn => {
                debug!("auto-learn disabled; skipping insight extraction");
                return Ok(None);
            }
            _ => {
                let extracted = extract_insight(self.oracle.as_ref(), message, answer).await;
                let origin = if extracted.is_degraded() {
                    CandidateOrigin::Degraded
                } else {
                    CandidateOrigin::Generated
                };
                (message.to_string(), extracted.text, origin)
            }
        };

        let memory = self.memory.clone();
        let saved = tokio::task::spawn_blocking(move || memory.learn(&query, &candidate, origin))
            .await
            .context("insight commit task failed")??;
        Ok(saved)
    }
}
