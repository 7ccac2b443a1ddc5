//! The query engine: retrieval, confidence gating and web fallback.

use super::{
    language_name, resolve_language, AnswerOrigin, RagResponse, SearchResult, CONTENT_NOT_FOUND_MESSAGE,
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_RETRIEVAL_K, SETUP_REQUIRED_MESSAGE,
};
use crate::config::{Prompts, NO_CONTEXT_PROMPT, RAG_PROMPT, WEB_QA_PROMPT};
use crate::embedding::Embedder;
use crate::error::{Result, YoutubotError};
use crate::index::KnowledgeBase;
use crate::llm::ChatModel;
use crate::websearch::WebSearch;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

/// Confidence assumed when the self-evaluation gives nothing usable.
const DEFAULT_WEB_CONFIDENCE: f32 = 0.5;

/// Language of the setup message when no override is given.
const SETUP_LANGUAGE: &str = "en";

/// Answers questions against the active knowledge base.
///
/// The knowledge base (index plus video list) is held as one value and
/// replaced as a whole, so readers always see a matching pair.
pub struct QueryEngine {
    knowledge: RwLock<Option<Arc<KnowledgeBase>>>,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    web: Arc<dyn WebSearch>,
    prompts: Prompts,
    retrieval_k: usize,
    confidence_threshold: f32,
    default_language: String,
}

impl QueryEngine {
    /// Create an engine with no knowledge base loaded.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        web: Arc<dyn WebSearch>,
        prompts: Prompts,
    ) -> Self {
        Self {
            knowledge: RwLock::new(None),
            embedder,
            chat,
            web,
            prompts,
            retrieval_k: DEFAULT_RETRIEVAL_K,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            default_language: "en".to_string(),
        }
    }

    /// Set the number of passages retrieved per question.
    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k.max(1);
        self
    }

    /// Set the minimum top similarity for answering from the transcript.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the language used when no video language is known.
    pub fn with_default_language(mut self, language: &str) -> Self {
        self.default_language = language.to_string();
        self
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Replace the active knowledge base.
    pub async fn load(&self, knowledge: KnowledgeBase) {
        let passages = knowledge.index.len();
        let videos = knowledge.videos.len();
        let expected = self.embedder.dimensions();
        if expected != 0 && passages > 0 && expected != knowledge.index.dimensions() {
            warn!(
                "Knowledge base has {}-dimensional embeddings but the embedder produces {}; questions will fail until it is rebuilt",
                knowledge.index.dimensions(),
                expected
            );
        }
        *self.knowledge.write().await = Some(Arc::new(knowledge));
        info!("Loaded knowledge base with {} passages from {} videos", passages, videos);
    }

    /// Drop the active knowledge base.
    pub async fn unload(&self) {
        *self.knowledge.write().await = None;
    }

    /// The active knowledge base, if any.
    pub async fn knowledge(&self) -> Option<Arc<KnowledgeBase>> {
        self.knowledge.read().await.clone()
    }

    /// Answer a question. Never fails: errors become a response describing them.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn answer(&self, query: &str, override_language: Option<&str>) -> RagResponse {
        let override_language = override_language.map(str::trim).filter(|l| !l.is_empty());

        let knowledge = match self.knowledge().await {
            Some(kb) if !kb.index.is_empty() => kb,
            _ => {
                return RagResponse {
                    query: query.to_string(),
                    answer: SETUP_REQUIRED_MESSAGE.to_string(),
                    sources: Vec::new(),
                    language: override_language.unwrap_or(SETUP_LANGUAGE).to_string(),
                    confidence_score: None,
                    origin: AnswerOrigin::SetupRequired,
                };
            }
        };

        let base_language = knowledge
            .base_language()
            .unwrap_or(&self.default_language)
            .to_string();
        let final_language = resolve_language(override_language, &knowledge.videos, &self.default_language);

        let languages = Languages {
            base: &base_language,
            override_language,
            resolved: &final_language,
        };

        match self.answer_from_knowledge(&knowledge, query, &languages).await {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to answer '{}': {}", query, e);
                RagResponse {
                    query: query.to_string(),
                    answer: format!("An error occurred while generating the answer: {}", e),
                    sources: Vec::new(),
                    language: final_language,
                    confidence_score: None,
                    origin: AnswerOrigin::Failed,
                }
            }
        }
    }

    async fn answer_from_knowledge(
        &self,
        knowledge: &KnowledgeBase,
        query: &str,
        languages: &Languages<'_>,
    ) -> Result<RagResponse> {
        let query_embedding = self.embedder.embed(query).await?;
        if query_embedding.len() != knowledge.index.dimensions() {
            return Err(YoutubotError::Index(format!(
                "Query embedding has {} dimensions but the index has {}; was this session built with a different embedding model?",
                query_embedding.len(),
                knowledge.index.dimensions()
            )));
        }
        let results = knowledge.index.search(&query_embedding, self.retrieval_k);

        let Some(top) = results.first() else {
            debug!("Retrieval returned nothing, falling back to web search");
            return self.web_fallback(query, languages).await;
        };

        let confidence = top.score;
        if confidence < self.confidence_threshold {
            info!(
                "Top similarity {:.3} below threshold {:.3}, falling back to web search",
                confidence, self.confidence_threshold
            );
            return self.web_fallback(query, languages).await;
        }

        let context = results
            .iter()
            .map(|r| r.passage.text.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n");

        let answer = self.generate(RAG_PROMPT, &context, query, languages).await?;

        Ok(RagResponse {
            query: query.to_string(),
            answer,
            sources: results.into_iter().map(SearchResult::from).collect(),
            language: languages.resolved.to_string(),
            confidence_score: Some(confidence),
            origin: AnswerOrigin::Context,
        })
    }

    async fn web_fallback(&self, query: &str, languages: &Languages<'_>) -> Result<RagResponse> {
        let found = self
            .web
            .search(query)
            .await
            .filter(|r| !r.snippet.trim().is_empty());

        let Some(result) = found else {
            let answer = self
                .prompts
                .template_exact(NO_CONTEXT_PROMPT, languages.resolved)
                .unwrap_or(CONTENT_NOT_FOUND_MESSAGE)
                .to_string();

            return Ok(RagResponse {
                query: query.to_string(),
                answer,
                sources: Vec::new(),
                language: languages.resolved.to_string(),
                confidence_score: Some(0.0),
                origin: AnswerOrigin::NotFound,
            });
        };

        let answer = self.generate(WEB_QA_PROMPT, &result.snippet, query, languages).await?;
        let confidence = self.evaluate(query, &answer).await;

        Ok(RagResponse {
            query: query.to_string(),
            answer,
            sources: vec![SearchResult {
                video_title: format!("Web Search: {}", result.title),
                video_url: result.url,
                text_content: result.snippet,
                similarity_score: 0.0,
            }],
            language: languages.resolved.to_string(),
            confidence_score: Some(confidence),
            origin: AnswerOrigin::Web,
        })
    }

    /// Fill a template chosen by the base language and ask the model.
    async fn generate(
        &self,
        prompt_name: &str,
        context: &str,
        question: &str,
        languages: &Languages<'_>,
    ) -> Result<String> {
        let template = self
            .prompts
            .template(prompt_name, languages.base)
            .ok_or_else(|| YoutubotError::Config(format!("No '{}' prompt template", prompt_name)))?;

        let mut prompt = Prompts::render(
            template,
            &[
                ("context", context),
                ("question", question),
                ("language", language_name(languages.resolved)),
            ],
        );

        if let Some(language) = languages.override_language {
            prompt.push_str(&format!(
                "\n\nIMPORTANT: You must provide the final answer in the following language: {}.",
                language_name(language)
            ));
        }

        self.chat.complete(&prompt).await
    }

    /// Ask the model to grade an answer.
    async fn evaluate(&self, query: &str, answer: &str) -> f32 {
        let prompt = Prompts::render(&self.prompts.evaluation, &[("query", query), ("response", answer)]);

        match self.chat.complete(&prompt).await {
            Ok(reply) => parse_confidence(&reply),
            Err(e) => {
                warn!("Could not evaluate response quality: {}", e);
                DEFAULT_WEB_CONFIDENCE
            }
        }
    }
}

struct Languages<'a> {
    base: &'a str,
    override_language: Option<&'a str>,
    resolved: &'a str,
}

fn score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d\.\d+)").expect("valid score regex"))
}

/// First decimal like `0.7` in a grading reply, clamped to [0, 1].
pub(crate) fn parse_confidence(reply: &str) -> f32 {
    score_regex()
        .captures(reply)
        .and_then(|c| c[1].parse::<f32>().ok())
        .map(|score| score.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_WEB_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{cosine_similarity, SimilarityIndex};
    use crate::testing::{
        passage, video_metadata, FailingEmbedder, FakeWeb, FixedEmbedder, KeywordEmbedder, ScriptedChat,
    };
    use std::sync::atomic::Ordering;

    const VOCABULARY: [&str; 3] = ["ownership", "borrow", "lifetime"];

    async fn rust_knowledge(embedder: &KeywordEmbedder, language: &str) -> KnowledgeBase {
        let index = SimilarityIndex::build(
            vec![
                passage("ownership moves values"),
                passage("borrow checker rules"),
                passage("lifetime annotations"),
            ],
            embedder,
        )
        .await
        .unwrap();
        KnowledgeBase::new(index, vec![video_metadata("Rust Basics", language)])
    }

    fn grading_chat() -> Arc<ScriptedChat> {
        Arc::new(ScriptedChat::new(|prompt| {
            if prompt.contains("Rate how well") {
                Ok("0.8 The answer is accurate.".to_string())
            } else {
                Ok("generated answer".to_string())
            }
        }))
    }

    async fn engine_with(
        language: &str,
        chat: Arc<ScriptedChat>,
        web: Arc<FakeWeb>,
    ) -> QueryEngine {
        let embedder = Arc::new(KeywordEmbedder::new(&VOCABULARY));
        let kb = rust_knowledge(&embedder, language).await;
        let engine = QueryEngine::new(embedder, chat, web, Prompts::default());
        engine.load(kb).await;
        engine
    }

    #[tokio::test]
    async fn test_no_knowledge_requires_setup() {
        let chat = Arc::new(ScriptedChat::replying("unused"));
        let web = Arc::new(FakeWeb::nothing());
        let engine = QueryEngine::new(
            Arc::new(KeywordEmbedder::new(&VOCABULARY)),
            chat.clone(),
            web.clone(),
            Prompts::default(),
        );

        let response = engine.answer("what is ownership?", None).await;
        assert_eq!(response.answer, SETUP_REQUIRED_MESSAGE);
        assert_eq!(response.origin, AnswerOrigin::SetupRequired);
        assert!(response.sources.is_empty());
        assert_eq!(response.confidence_score, None);
        assert_eq!(response.language, "en");

        let response = engine.answer("what is ownership?", Some("fr")).await;
        assert_eq!(response.language, "fr");

        assert!(chat.prompts().is_empty());
        assert_eq!(web.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_index_requires_setup() {
        let engine = QueryEngine::new(
            Arc::new(KeywordEmbedder::new(&VOCABULARY)),
            Arc::new(ScriptedChat::replying("unused")),
            Arc::new(FakeWeb::nothing()),
            Prompts::default(),
        );
        let empty = KnowledgeBase::new(SimilarityIndex::from_parts(vec![], vec![]).unwrap(), vec![]);
        engine.load(empty).await;

        let response = engine.answer("anything", None).await;
        assert_eq!(response.origin, AnswerOrigin::SetupRequired);
        assert!(response.sources.is_empty());
    }

    #[tokio::test]
    async fn test_confident_retrieval_answers_from_context() {
        let chat = grading_chat();
        let web = Arc::new(FakeWeb::found("Ownership", "https://example.com", "snippet"));
        let engine = engine_with("en", chat.clone(), web.clone()).await;

        let response = engine.answer("explain ownership", None).await;

        assert_eq!(response.origin, AnswerOrigin::Context);
        assert_eq!(response.answer, "generated answer");
        assert_eq!(response.sources.len(), 3);
        assert_eq!(response.sources[0].text_content, "ownership moves values");
        assert_eq!(response.sources[0].video_title, "Test Video");
        assert!(response.confidence_score.unwrap() >= 0.5);
        assert_eq!(response.language, "en");

        let prompts = chat.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("ownership moves values\n---\nborrow checker rules\n---\nlifetime annotations"));
        assert!(prompts[0].contains("Question: explain ownership"));
        assert!(!prompts[0].contains("IMPORTANT"));
        assert_eq!(web.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retrieval_k_limits_sources() {
        let embedder = Arc::new(KeywordEmbedder::new(&VOCABULARY));
        let kb = rust_knowledge(&embedder, "en").await;
        let engine = QueryEngine::new(embedder, grading_chat(), Arc::new(FakeWeb::nothing()), Prompts::default())
            .with_retrieval_k(2);
        engine.load(kb).await;

        let response = engine.answer("ownership", None).await;
        assert_eq!(response.sources.len(), 2);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let passage_vector = vec![1.0, 2.0];
        let query_vector = vec![2.0, 1.0];
        let top_score = cosine_similarity(&query_vector, &passage_vector);

        let embedder = Arc::new(
            FixedEmbedder::new(vec![0.0, 0.0])
                .with("indexed passage", passage_vector.clone())
                .with("boundary question", query_vector.clone()),
        );
        let index = SimilarityIndex::build(vec![passage("indexed passage")], embedder.as_ref())
            .await
            .unwrap();
        let kb = KnowledgeBase::new(index, vec![video_metadata("Boundary", "en")]);

        let at_threshold = QueryEngine::new(
            embedder.clone(),
            grading_chat(),
            Arc::new(FakeWeb::found("Web", "https://example.com", "web snippet")),
            Prompts::default(),
        )
        .with_confidence_threshold(top_score);
        at_threshold.load(kb.clone()).await;

        let response = at_threshold.answer("boundary question", None).await;
        assert_eq!(response.origin, AnswerOrigin::Context);
        assert_eq!(response.confidence_score, Some(top_score));

        let above_threshold = QueryEngine::new(
            embedder,
            grading_chat(),
            Arc::new(FakeWeb::found("Web", "https://example.com", "web snippet")),
            Prompts::default(),
        )
        .with_confidence_threshold(top_score + 0.001);
        above_threshold.load(kb).await;

        let response = above_threshold.answer("boundary question", None).await;
        assert_eq!(response.origin, AnswerOrigin::Web);
    }

    #[tokio::test]
    async fn test_unrelated_question_uses_web_answer() {
        let chat = grading_chat();
        let web = Arc::new(FakeWeb::found(
            "Tokio tutorial",
            "https://tokio.rs/tokio/tutorial",
            "Tokio is an asynchronous runtime for Rust.",
        ));
        let engine = engine_with("en", chat.clone(), web.clone()).await;

        let response = engine.answer("what is tokio?", None).await;

        assert_eq!(response.origin, AnswerOrigin::Web);
        assert_eq!(response.answer, "generated answer");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].video_title, "Web Search: Tokio tutorial");
        assert_eq!(response.sources[0].video_url, "https://tokio.rs/tokio/tutorial");
        assert_eq!(response.sources[0].similarity_score, 0.0);
        assert_eq!(response.confidence_score, Some(0.8));

        let prompts = chat.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Tokio is an asynchronous runtime for Rust."));
        assert!(prompts[1].contains("Answer: generated answer"));
        assert_eq!(web.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unrelated_question_without_web_result() {
        let chat = grading_chat();
        let engine = engine_with("en", chat.clone(), Arc::new(FakeWeb::nothing())).await;

        let response = engine.answer("what is tokio?", None).await;

        assert_eq!(response.origin, AnswerOrigin::NotFound);
        assert!(response.sources.is_empty());
        assert_eq!(response.confidence_score, Some(0.0));
        assert_eq!(
            response.answer,
            Prompts::default().template_exact(NO_CONTEXT_PROMPT, "en").unwrap()
        );
        assert!(chat.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_not_found_message_follows_resolved_language() {
        let engine = engine_with("en", grading_chat(), Arc::new(FakeWeb::nothing())).await;

        let german = engine.answer("what is tokio?", Some("de")).await;
        assert_eq!(german.language, "de");
        assert_eq!(
            german.answer,
            Prompts::default().template_exact(NO_CONTEXT_PROMPT, "de").unwrap()
        );

        let italian = engine.answer("what is tokio?", Some("it")).await;
        assert_eq!(italian.answer, CONTENT_NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_empty_web_snippet_counts_as_nothing() {
        let engine = engine_with("en", grading_chat(), Arc::new(FakeWeb::found("Title", "https://x.org", "  "))).await;
        let response = engine.answer("what is tokio?", None).await;
        assert_eq!(response.origin, AnswerOrigin::NotFound);
    }

    #[tokio::test]
    async fn test_override_language_applies_on_every_branch() {
        let chat = grading_chat();
        let engine = engine_with("en", chat.clone(), Arc::new(FakeWeb::found("W", "https://w.org", "web text"))).await;

        let from_context = engine.answer("ownership", Some("fr")).await;
        assert_eq!(from_context.origin, AnswerOrigin::Context);
        assert_eq!(from_context.language, "fr");

        let from_web = engine.answer("tokio", Some("fr")).await;
        assert_eq!(from_web.origin, AnswerOrigin::Web);
        assert_eq!(from_web.language, "fr");

        let prompts = chat.prompts();
        assert!(prompts[0].starts_with("Use the following pieces of context"));
        assert!(prompts[0].ends_with(
            "IMPORTANT: You must provide the final answer in the following language: French."
        ));
        assert!(prompts[1].ends_with("following language: French."));

        let not_found = engine_with("en", grading_chat(), Arc::new(FakeWeb::nothing()))
            .await
            .answer("tokio", Some("fr"))
            .await;
        assert_eq!(not_found.language, "fr");
    }

    #[tokio::test]
    async fn test_template_follows_ingested_language() {
        let chat = grading_chat();
        let engine = engine_with("tr", chat.clone(), Arc::new(FakeWeb::nothing())).await;

        let response = engine.answer("ownership", None).await;
        assert_eq!(response.language, "tr");
        assert!(chat.prompts()[0].contains("Bağlam:"));
        assert!(chat.prompts()[0].contains("Turkish"));
    }

    #[tokio::test]
    async fn test_unknown_ingested_language_uses_english_template() {
        let chat = grading_chat();
        let engine = engine_with("it", chat.clone(), Arc::new(FakeWeb::nothing())).await;

        let response = engine.answer("ownership", None).await;
        assert_eq!(response.language, "it");
        assert!(chat.prompts()[0].starts_with("Use the following pieces of context"));
    }

    #[tokio::test]
    async fn test_evaluation_failure_defaults_confidence() {
        let chat = Arc::new(ScriptedChat::new(|prompt| {
            if prompt.contains("Rate how well") {
                Err(YoutubotError::Llm("grader offline".to_string()))
            } else {
                Ok("web answer".to_string())
            }
        }));
        let engine = engine_with("en", chat, Arc::new(FakeWeb::found("W", "https://w.org", "web text"))).await;

        let response = engine.answer("tokio", None).await;
        assert_eq!(response.origin, AnswerOrigin::Web);
        assert_eq!(response.confidence_score, Some(0.5));
    }

    #[tokio::test]
    async fn test_chat_failure_becomes_failed_response() {
        let engine = engine_with(
            "en",
            Arc::new(ScriptedChat::failing("model not loaded")),
            Arc::new(FakeWeb::nothing()),
        )
        .await;

        let response = engine.answer("ownership", Some("es")).await;
        assert_eq!(response.origin, AnswerOrigin::Failed);
        assert!(response.answer.contains("model not loaded"));
        assert!(response.sources.is_empty());
        assert_eq!(response.language, "es");
    }

    #[tokio::test]
    async fn test_embedding_failure_becomes_failed_response() {
        let embedder = Arc::new(KeywordEmbedder::new(&VOCABULARY));
        let kb = rust_knowledge(&embedder, "en").await;
        let engine = QueryEngine::new(
            Arc::new(FailingEmbedder),
            grading_chat(),
            Arc::new(FakeWeb::nothing()),
            Prompts::default(),
        );
        engine.load(kb).await;

        let response = engine.answer("ownership", None).await;
        assert_eq!(response.origin, AnswerOrigin::Failed);
    }

    #[tokio::test]
    async fn test_embedding_dimension_mismatch_fails() {
        let chat = grading_chat();
        let web = Arc::new(FakeWeb::found("Web", "https://example.com", "web snippet"));
        let engine = QueryEngine::new(
            Arc::new(FixedEmbedder::new(vec![1.0, 0.0])),
            chat.clone(),
            web.clone(),
            Prompts::default(),
        );
        engine.load(crate::testing::knowledge_base()).await;

        let response = engine.answer("ownership", None).await;
        assert_eq!(response.origin, AnswerOrigin::Failed);
        assert!(response.answer.contains("2 dimensions but the index has 3"));
        assert!(response.sources.is_empty());
        assert!(chat.prompts().is_empty());
        assert_eq!(web.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_load_and_unload() {
        let engine = engine_with("en", grading_chat(), Arc::new(FakeWeb::nothing())).await;
        assert_eq!(engine.knowledge().await.unwrap().videos[0].title, "Rust Basics");

        engine.unload().await;
        assert!(engine.knowledge().await.is_none());
        assert_eq!(engine.answer("ownership", None).await.origin, AnswerOrigin::SetupRequired);
    }

    #[test]
    fn test_parse_confidence() {
        assert_eq!(parse_confidence("Score: 0.75, mostly right"), 0.75);
        assert_eq!(parse_confidence("no number here"), 0.5);
        assert_eq!(parse_confidence("10"), 0.5);
        assert_eq!(parse_confidence("I'd say 3.5 out of 5"), 1.0);
    }
}
