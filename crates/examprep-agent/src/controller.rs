//! Turn controller: drives one user submission end to end.
//!
//! ```text
//! Idle --submit--> AwaitingSearch --> AwaitingModelReply --ok--> Idle
//!                                                         \--err--> Error --> Idle
//! ```
//!
//! `AwaitingSearch` is skipped when research is not pre-fetched. Only one
//! submission is in flight at a time: `submit` takes `&mut self`.

use std::{fmt, str::FromStr, sync::Arc};

use examprep_ai::Usage;
use examprep_search::SearchProvider;
use serde::{Deserialize, Serialize};

use crate::{
    prompt,
    search_tool::{SEARCH_TOOL_NAME, SearchTool},
    session::{ConversationSession, SessionConfig, ToolCallRecord},
    tool::ToolRegistry,
    transcript::Transcript,
    transport::Transport,
};

/// Warning shown alongside a rate-limited failure
pub const RATE_LIMIT_WARNING: &str = "High traffic. Please wait 1 minute and try again.";

/// How research reaches the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchMode {
    /// Search once with the topic, embed the result in the prompt
    #[default]
    Prefetch,
    /// Let the model call `search_web` itself
    Tool,
    /// No search at all
    #[serde(alias = "none")]
    Off,
}

impl ResearchMode {
    /// Whether this mode needs a search provider
    pub fn uses_search(self) -> bool {
        !matches!(self, ResearchMode::Off)
    }
}

impl FromStr for ResearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefetch" | "pre-fetch" => Ok(ResearchMode::Prefetch),
            "tool" => Ok(ResearchMode::Tool),
            "off" | "none" => Ok(ResearchMode::Off),
            other => Err(format!(
                "unknown research mode '{}' (expected prefetch, tool, or off)",
                other
            )),
        }
    }
}

impl fmt::Display for ResearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResearchMode::Prefetch => "prefetch",
            ResearchMode::Tool => "tool",
            ResearchMode::Off => "off",
        })
    }
}

/// Where the controller is within a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingSearch,
    AwaitingModelReply,
    Error,
}

/// Receives progress as a turn runs.
///
/// Every method has a no-op default.
pub trait TurnObserver {
    /// The submitted text, before any search or model call starts
    fn user_message(&mut self, _text: &str) {}

    /// The controller moved to `state`
    fn state_changed(&mut self, _state: TurnState) {}
}

/// A successful turn
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// The model's text, shown verbatim
    pub reply: String,
    /// Pre-fetched search text embedded in the prompt, when there was one
    pub search_context: Option<String>,
    /// Searches the model ran itself
    pub tool_calls: Vec<ToolCallRecord>,
    pub usage: Usage,
}

/// A failed turn, ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct TurnFailure {
    pub message: String,
    pub rate_limited: bool,
}

impl TurnFailure {
    /// "An error occurred: ..." line
    pub fn headline(&self) -> String {
        format!("An error occurred: {}", self.message)
    }

    /// Extra guidance when the provider is rate limiting
    pub fn warning(&self) -> Option<&'static str> {
        self.rate_limited.then_some(RATE_LIMIT_WARNING)
    }
}

/// Result of one submission
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    Reply(TurnReply),
    Failed(TurnFailure),
    /// Blank input: nothing ran
    Ignored,
}

/// Runs submissions one at a time against a [`ConversationSession`].
pub struct TurnController {
    session: ConversationSession,
    research: ResearchMode,
    search: Option<Arc<dyn SearchProvider>>,
    state: TurnState,
}

impl TurnController {
    /// Build a controller.
    ///
    /// Research modes that need search fall back to [`ResearchMode::Off`]
    /// when no provider is given.
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        research: ResearchMode,
        search: Option<Arc<dyn SearchProvider>>,
    ) -> Self {
        let research = match (&search, research) {
            (None, mode) if mode.uses_search() => {
                tracing::warn!("No search provider configured; research mode '{}' disabled", mode);
                ResearchMode::Off
            }
            (_, mode) => mode,
        };

        let mut session = ConversationSession::new(config, transport);
        if research == ResearchMode::Tool {
            if let Some(provider) = &search {
                let tools = ToolRegistry::new().with(Arc::new(SearchTool::new(provider.clone())));
                session = session.with_tools(tools);
            }
        }

        Self {
            session,
            research,
            search,
            state: TurnState::Idle,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn research(&self) -> ResearchMode {
        self.research
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    fn transition(&mut self, next: TurnState, observer: &mut dyn TurnObserver) {
        tracing::debug!(from = ?self.state, to = ?next, "Turn state");
        self.state = next;
        observer.state_changed(next);
    }

    /// Run one submission.
    ///
    /// The topic is reported to `observer` before any work starts. The
    /// transcript changes only when the model replies; a failed turn leaves it
    /// exactly as it was.
    pub async fn submit(
        &mut self,
        transcript: &mut Transcript,
        topic: &str,
        observer: &mut dyn TurnObserver,
    ) -> TurnOutcome {
        let topic = topic.trim();
        if topic.is_empty() {
            return TurnOutcome::Ignored;
        }

        observer.user_message(topic);

        let (prompt, search_context) = match (self.research, self.search.clone()) {
            (ResearchMode::Prefetch, Some(provider)) => {
                self.transition(TurnState::AwaitingSearch, observer);
                let result = provider.lookup(topic).await;
                let context = result.render();
                tracing::debug!(
                    chars = context.len(),
                    live = result.has_live_data(),
                    "Search context ready"
                );
                let prompt = if result.has_live_data() {
                    prompt::compose(topic, Some(&context))
                } else {
                    prompt::compose_without_results(topic, &context)
                };
                (prompt, Some(context))
            }
            (ResearchMode::Tool, Some(_)) => (prompt::compose_for_tool(topic, SEARCH_TOOL_NAME), None),
            _ => (prompt::compose(topic, None), None),
        };

        self.transition(TurnState::AwaitingModelReply, observer);
        let outcome = match self.session.send(transcript, &prompt).await {
            Ok(exchange) => {
                *transcript = exchange.transcript;
                TurnOutcome::Reply(TurnReply {
                    reply: exchange.reply,
                    search_context,
                    tool_calls: exchange.tool_calls,
                    usage: exchange.usage,
                })
            }
            Err(e) => {
                tracing::warn!("Turn failed: {}", e);
                self.transition(TurnState::Error, observer);
                TurnOutcome::Failed(TurnFailure {
                    rate_limited: e.is_rate_limited(),
                    message: e.to_string(),
                })
            }
        };

        self.transition(TurnState::Idle, observer);
        outcome
    }

    /// Forget every prior turn
    pub fn reset(&mut self, transcript: &mut Transcript) {
        transcript.clear();
        self.state = TurnState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{MockTransport, Scripted, test_model, tool_call_message};
    use async_trait::async_trait;
    use examprep_ai::Message;
    use examprep_search::{SearchError, SearchHit, SearchResult};
    use parking_lot::Mutex;

    /// Records the order of observer callbacks and search calls
    #[derive(Default)]
    struct Log(Arc<Mutex<Vec<String>>>);

    impl TurnObserver for Log {
        fn user_message(&mut self, text: &str) {
            self.0.lock().push(format!("user:{}", text));
        }
        fn state_changed(&mut self, state: TurnState) {
            self.0.lock().push(format!("state:{:?}", state));
        }
    }

    /// Returns `result` for every query; `None` fails with a provider status
    struct MockSearch {
        log: Arc<Mutex<Vec<String>>>,
        result: Option<SearchResult>,
    }

    #[async_trait]
    impl SearchProvider for MockSearch {
        fn name(&self) -> &str {
            "mock"
        }

        async fn try_search(&self, query: &str) -> examprep_search::Result<SearchResult> {
            self.log.lock().push(format!("search:{}", query));
            self.result.clone().ok_or_else(|| SearchError::Status {
                status: 432,
                message: "usage limit".into(),
            })
        }
    }

    fn deadlock_hits() -> SearchResult {
        SearchResult::Hits(vec![SearchHit {
            title: "Deadlock".into(),
            snippet: "Processes each wait on a resource held by another.".into(),
        }])
    }

    fn controller(
        script: Vec<Scripted>,
        research: ResearchMode,
        fail_search: bool,
    ) -> (TurnController, Arc<MockTransport>, Arc<Mutex<Vec<String>>>) {
        controller_with(script, research, (!fail_search).then(deadlock_hits))
    }

    fn controller_with(
        script: Vec<Scripted>,
        research: ResearchMode,
        search_result: Option<SearchResult>,
    ) -> (TurnController, Arc<MockTransport>, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let transport = Arc::new(MockTransport::new(script));
        let search: Arc<dyn SearchProvider> = Arc::new(MockSearch {
            log: log.clone(),
            result: search_result,
        });
        let controller = TurnController::new(
            SessionConfig::new(test_model()),
            transport.clone(),
            research,
            Some(search),
        );
        (controller, transport, log)
    }

    #[tokio::test]
    async fn test_user_message_shown_before_search() {
        let (mut ctl, _transport, log) = controller(
            vec![Scripted::Reply(Message::assistant("quiz"))],
            ResearchMode::Prefetch,
            false,
        );
        let mut observer = Log(log.clone());
        let mut transcript = Transcript::new();

        let outcome = ctl.submit(&mut transcript, "Deadlocks", &mut observer).await;
        assert!(matches!(outcome, TurnOutcome::Reply(_)));

        let log = log.lock();
        assert_eq!(log[0], "user:Deadlocks");
        assert_eq!(log[1], "state:AwaitingSearch");
        assert_eq!(log[2], "search:Deadlocks");
        assert_eq!(log.last().map(String::as_str), Some("state:Idle"));
        assert_eq!(ctl.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_prompt_embeds_topic_and_snippet() {
        let (mut ctl, transport, log) = controller(
            vec![Scripted::Reply(Message::assistant("quiz"))],
            ResearchMode::Prefetch,
            false,
        );
        let mut transcript = Transcript::new();
        let outcome = ctl
            .submit(&mut transcript, "Operating Systems Deadlocks", &mut Log(log))
            .await;

        let TurnOutcome::Reply(reply) = outcome else {
            panic!("expected reply");
        };
        assert!(reply.search_context.unwrap().contains("Snippet: Processes"));

        let sent = &transport.calls.lock()[0].0;
        let prompt = sent[0].text();
        assert!(prompt.contains("Operating Systems Deadlocks"));
        assert!(prompt.contains("Processes each wait on a resource held by another."));
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].text(), prompt);
    }

    #[tokio::test]
    async fn test_search_failure_still_reaches_model() {
        let (mut ctl, transport, log) = controller(
            vec![Scripted::Reply(Message::assistant("quiz from memory"))],
            ResearchMode::Prefetch,
            true,
        );
        let mut transcript = Transcript::new();
        let outcome = ctl.submit(&mut transcript, "Paging", &mut Log(log)).await;

        let TurnOutcome::Reply(reply) = outcome else {
            panic!("expected reply");
        };
        assert!(reply.search_context.unwrap().contains("usage limit"));

        let prompt = transport.calls.lock()[0].0[0].text();
        assert!(prompt.contains("Search error: provider returned 432: usage limit"));
        assert!(prompt.contains(prompt::NO_LIVE_DATA_NOTICE));
        assert!(prompt.contains("Based on well-established academic knowledge:"));
        assert!(!prompt.contains("Live search results:"));
        assert!(!prompt.contains("Based *only* on the search results above:"));
    }

    /// Sends one prefetch turn and returns the prompt the model saw
    async fn prefetch_prompt(result: SearchResult) -> String {
        let (mut ctl, transport, log) = controller_with(
            vec![Scripted::Reply(Message::assistant("quiz"))],
            ResearchMode::Prefetch,
            Some(result),
        );
        let mut transcript = Transcript::new();
        let outcome = ctl.submit(&mut transcript, "Paging", &mut Log(log)).await;
        assert!(matches!(outcome, TurnOutcome::Reply(_)));
        let prompt = transport.calls.lock()[0].0[0].text();
        prompt
    }

    #[tokio::test]
    async fn test_answer_is_grounded_as_live_results() {
        let prompt = prefetch_prompt(SearchResult::Answer(
            "Paging splits memory into fixed-size pages.".into(),
        ))
        .await;
        assert!(prompt.contains("Live search results:\nPaging splits memory into fixed-size pages."));
        assert!(prompt.contains("Based *only* on the search results above:"));
        assert!(!prompt.contains(prompt::NO_LIVE_DATA_NOTICE));
    }

    #[tokio::test]
    async fn test_empty_hits_count_as_no_live_data() {
        let prompt = prefetch_prompt(SearchResult::Hits(vec![])).await;
        assert!(prompt.contains(examprep_search::NO_RESULTS_TEXT));
        assert!(prompt.contains(prompt::NO_LIVE_DATA_NOTICE));
        assert!(!prompt.contains("Live search results:"));
    }

    #[tokio::test]
    async fn test_raw_payload_reaches_prompt() {
        let prompt = prefetch_prompt(SearchResult::Raw(serde_json::json!({
            "query": "Paging",
            "follow_up_questions": ["What is a page fault?"]
        })))
        .await;
        assert!(prompt.contains("Live search results:"));
        assert!(prompt.contains("What is a page fault?"));
        assert!(!prompt.contains(prompt::NO_LIVE_DATA_NOTICE));
    }

    #[tokio::test]
    async fn test_rate_limit_leaves_transcript_unchanged() {
        let (mut ctl, _transport, log) = controller(
            vec![
                Scripted::Reply(Message::assistant("first reply")),
                Scripted::StreamError {
                    message: "RESOURCE_EXHAUSTED: quota".into(),
                    status: Some(429),
                },
            ],
            ResearchMode::Off,
            false,
        );
        let mut transcript = Transcript::new();
        ctl.submit(&mut transcript, "Semaphores", &mut Log(log.clone())).await;
        let before = transcript.clone();

        let outcome = ctl.submit(&mut transcript, "Monitors", &mut Log(log.clone())).await;

        let TurnOutcome::Failed(failure) = outcome else {
            panic!("expected failure");
        };
        assert!(failure.rate_limited);
        assert!(failure.headline().starts_with("An error occurred: "));
        assert_eq!(failure.warning(), Some(RATE_LIMIT_WARNING));
        assert_eq!(transcript, before);
        assert!(log.lock().contains(&"state:Error".to_string()));
        assert_eq!(ctl.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_generic_failure_has_no_warning() {
        let (mut ctl, _transport, log) = controller(
            vec![Scripted::TransportError(500)],
            ResearchMode::Off,
            false,
        );
        let mut transcript = Transcript::new();
        let TurnOutcome::Failed(failure) = ctl.submit(&mut transcript, "TLB", &mut Log(log)).await
        else {
            panic!("expected failure");
        };
        assert!(!failure.rate_limited);
        assert_eq!(failure.warning(), None);
        assert!(transcript.is_empty());
    }

    #[tokio::test]
    async fn test_off_mode_skips_search() {
        let (mut ctl, _transport, log) = controller(
            vec![Scripted::Reply(Message::assistant("quiz"))],
            ResearchMode::Off,
            false,
        );
        let mut transcript = Transcript::new();
        ctl.submit(&mut transcript, "Threads", &mut Log(log.clone())).await;

        let log = log.lock();
        assert!(!log.iter().any(|l| l.starts_with("search:")));
        assert!(transcript.messages()[0].text().contains(prompt::NO_LIVE_DATA_NOTICE));
    }

    #[tokio::test]
    async fn test_tool_mode_registers_search_web() {
        let (mut ctl, transport, log) = controller(
            vec![
                Scripted::Reply(tool_call_message("deadlock conditions")),
                Scripted::Reply(Message::assistant("quiz")),
            ],
            ResearchMode::Tool,
            false,
        );
        assert_eq!(ctl.session().tool_names(), vec!["search_web"]);

        let mut transcript = Transcript::new();
        let TurnOutcome::Reply(reply) = ctl.submit(&mut transcript, "Deadlocks", &mut Log(log.clone())).await
        else {
            panic!("expected reply");
        };
        assert_eq!(reply.tool_calls.len(), 1);
        assert!(reply.search_context.is_none());
        assert!(log.lock().contains(&"search:deadlock conditions".to_string()));
        assert_eq!(transport.calls.lock()[0].1, 1);
    }

    #[test]
    fn test_missing_provider_disables_research() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let ctl = TurnController::new(
            SessionConfig::new(test_model()),
            transport,
            ResearchMode::Tool,
            None,
        );
        assert_eq!(ctl.research(), ResearchMode::Off);
        assert!(!ctl.session().uses_tools());
    }

    #[tokio::test]
    async fn test_blank_topic_ignored() {
        let (mut ctl, transport, log) = controller(vec![], ResearchMode::Prefetch, false);
        let mut transcript = Transcript::new();
        let outcome = ctl.submit(&mut transcript, "   ", &mut Log(log.clone())).await;
        assert!(matches!(outcome, TurnOutcome::Ignored));
        assert!(log.lock().is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let (mut ctl, transport, log) = controller(
            vec![
                Scripted::Reply(Message::assistant("one")),
                Scripted::Reply(Message::assistant("two")),
            ],
            ResearchMode::Off,
            false,
        );
        let mut transcript = Transcript::new();
        ctl.submit(&mut transcript, "Pipes", &mut Log(log.clone())).await;
        assert!(!transcript.is_empty());

        ctl.reset(&mut transcript);
        assert!(transcript.is_empty());
        assert_eq!(ctl.state(), TurnState::Idle);

        ctl.submit(&mut transcript, "Sockets", &mut Log(log)).await;
        // only the new prompt went out
        assert_eq!(transport.calls.lock()[1].0.len(), 1);
    }

    #[test]
    fn test_research_mode_parse() {
        assert_eq!("prefetch".parse::<ResearchMode>(), Ok(ResearchMode::Prefetch));
        assert_eq!("TOOL".parse::<ResearchMode>(), Ok(ResearchMode::Tool));
        assert_eq!("none".parse::<ResearchMode>(), Ok(ResearchMode::Off));
        assert!("web".parse::<ResearchMode>().is_err());
        assert_eq!(ResearchMode::Tool.to_string(), "tool");
    }
}
