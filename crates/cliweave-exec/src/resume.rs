//! Resume strategy resolution.
//!
//! Decides how prior context reaches the tool for a new invocation: through
//! the tool's own session resume, through history injected into the prompt,
//! or through a merge of several conversations.
//!
//! Store lookups here are reads only. A failing read is logged and treated as
//! "not found" so a broken history database never blocks a run.

use std::fmt;

use tracing::{debug, warn};

use cliweave_core::{Conversation, Error, Tool, Turn};
use cliweave_store::ConversationStore;

use crate::command::NativeResume;
use crate::merge::{merge_turns, MergedHistory};

/// How prior context is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeStrategy {
    /// The tool resumes its own session
    Native,
    /// A bounded slice of history is injected into a fresh session
    Hybrid,
    /// The whole history is injected into a fresh session
    PromptConcat,
    /// Histories of several conversations are interleaved and injected
    Merge,
}

impl ResumeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeStrategy::Native => "native",
            ResumeStrategy::Hybrid => "hybrid",
            ResumeStrategy::PromptConcat => "prompt-concat",
            ResumeStrategy::Merge => "merge",
        }
    }
}

impl fmt::Display for ResumeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller asked to resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeTarget {
    Latest,
    Single(String),
    Multiple(Vec<String>),
}

impl ResumeTarget {
    /// Parse `latest`, a single id, or comma-separated ids.
    ///
    /// Blank input and empty list entries are ignored; duplicate ids are
    /// dropped keeping the first occurrence.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.eq_ignore_ascii_case("latest") {
            return Some(ResumeTarget::Latest);
        }

        let mut ids: Vec<String> = Vec::new();
        for id in trimmed.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !ids.iter().any(|existing| existing == id) {
                ids.push(id.to_string());
            }
        }

        match ids.len() {
            0 => None,
            1 => ids.pop().map(ResumeTarget::Single),
            _ => Some(ResumeTarget::Multiple(ids)),
        }
    }
}

/// Where the new turn will be recorded.
#[derive(Debug, Clone)]
pub enum ConversationPlan {
    /// Start a new conversation, optionally seeded with merged history.
    Create {
        parent_id: Option<String>,
        seed: Option<MergedHistory>,
    },
    /// Append to an existing conversation.
    Continue(Conversation),
    /// Append independently to each of several conversations.
    AppendEach(Vec<Conversation>),
}

/// Outcome of resume resolution.
#[derive(Debug, Clone)]
pub struct ResumeDecision {
    /// `None` when no prior context is involved
    pub strategy: Option<ResumeStrategy>,
    /// Tool-side session to resume (native only)
    pub native_session_id: Option<String>,
    /// Resume the tool's most recent session (native only)
    pub is_latest: bool,
    /// Turns to inject into the prompt
    pub context_turns: Vec<Turn>,
    /// Conversation id the run is reported under
    pub primary_id: String,
    pub plan: ConversationPlan,
}

impl ResumeDecision {
    fn fresh(primary_id: String, parent_id: Option<String>) -> Self {
        Self {
            strategy: None,
            native_session_id: None,
            is_latest: false,
            context_turns: vec![],
            primary_id,
            plan: ConversationPlan::Create {
                parent_id,
                seed: None,
            },
        }
    }

    /// Resume directive for the command builder.
    pub fn native_resume(&self) -> Option<NativeResume> {
        if self.strategy != Some(ResumeStrategy::Native) {
            return None;
        }
        if self.is_latest {
            Some(NativeResume::Latest)
        } else {
            self.native_session_id.clone().map(NativeResume::Session)
        }
    }

    /// Whether the prompt must carry injected history.
    pub fn injects_context(&self) -> bool {
        !self.context_turns.is_empty()
    }
}

/// Inputs to [`ResumeResolver::resolve`].
#[derive(Debug, Clone)]
pub struct ResumeRequest<'a> {
    pub tool: Tool,
    pub target: Option<&'a ResumeTarget>,
    pub explicit_id: Option<&'a str>,
    pub disable_native: bool,
}

/// Chooses a resume strategy using the conversation store.
pub struct ResumeResolver<'a> {
    store: &'a dyn ConversationStore,
    hybrid_context_turns: usize,
}

impl<'a> ResumeResolver<'a> {
    pub fn new(store: &'a dyn ConversationStore, hybrid_context_turns: usize) -> Self {
        Self {
            store,
            hybrid_context_turns,
        }
    }

    /// Decide how to run `request`.
    ///
    /// Fails when every id of a multi-target merge is unresolvable, or when a
    /// fork or merge names a new id that already holds history.
    pub async fn resolve(&self, request: &ResumeRequest<'_>) -> Result<ResumeDecision, Error> {
        let explicit = request.explicit_id.map(str::to_string);

        let decision = match request.target {
            Some(ResumeTarget::Latest) => self.resolve_latest(request, explicit).await?,
            Some(ResumeTarget::Multiple(ids)) => self.resolve_merge(ids, explicit).await?,
            Some(ResumeTarget::Single(id)) => self.resolve_single(request, id, explicit).await?,
            None => match explicit {
                Some(id) => match self.load(&id).await {
                    Some(existing) => self.continue_in_place(request, existing).await,
                    None => ResumeDecision::fresh(id, None),
                },
                None => ResumeDecision::fresh(Conversation::generate_id(request.tool), None),
            },
        };

        debug!(
            tool = %request.tool,
            conversation_id = %decision.primary_id,
            strategy = decision.strategy.map(|s| s.as_str()).unwrap_or("none"),
            context_turns = decision.context_turns.len(),
            "Resolved resume strategy"
        );
        Ok(decision)
    }

    async fn resolve_latest(
        &self,
        request: &ResumeRequest<'_>,
        explicit: Option<String>,
    ) -> Result<ResumeDecision, Error> {
        let tool = request.tool;

        if tool.supports_native_latest() && !request.disable_native {
            let latest = self.most_recent(Some(tool)).await;
            let mut decision = match (explicit, latest) {
                (Some(id), latest) => ResumeDecision::fresh(self.claim_new_id(id).await?, latest),
                (None, Some(latest_id)) => match self.load(&latest_id).await {
                    Some(existing) => ResumeDecision {
                        primary_id: existing.id.clone(),
                        plan: ConversationPlan::Continue(existing),
                        ..ResumeDecision::fresh(latest_id, None)
                    },
                    None => ResumeDecision::fresh(latest_id, None),
                },
                (None, None) => ResumeDecision::fresh(Conversation::generate_id(tool), None),
            };
            decision.strategy = Some(ResumeStrategy::Native);
            decision.is_latest = true;
            return Ok(decision);
        }

        let latest = match self.most_recent(Some(tool)).await {
            Some(id) => Some(id),
            None => self.most_recent(None).await,
        };

        match latest {
            Some(id) => self.resolve_single(request, &id, explicit).await,
            None => {
                debug!(tool = %tool, "No stored conversation to resume");
                let id = match explicit {
                    Some(id) => self.claim_new_id(id).await?,
                    None => Conversation::generate_id(tool),
                };
                Ok(ResumeDecision::fresh(id, None))
            }
        }
    }

    async fn resolve_merge(
        &self,
        ids: &[String],
        explicit: Option<String>,
    ) -> Result<ResumeDecision, Error> {
        let mut sources = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load(id).await {
                Some(conversation) => sources.push(conversation),
                None => warn!(conversation_id = %id, "Merge target not found, skipping"),
            }
        }

        if sources.is_empty() {
            return Err(Error::UnresolvedTargets(ids.to_vec()));
        }

        let merged = merge_turns(&sources);
        let context_turns = merged.turns.clone();

        let (primary_id, plan) = match explicit {
            Some(id) => (
                self.claim_new_id(id).await?,
                ConversationPlan::Create {
                    parent_id: None,
                    seed: Some(merged),
                },
            ),
            None => (sources[0].id.clone(), ConversationPlan::AppendEach(sources)),
        };

        Ok(ResumeDecision {
            strategy: Some(ResumeStrategy::Merge),
            native_session_id: None,
            is_latest: false,
            context_turns,
            primary_id,
            plan,
        })
    }

    async fn resolve_single(
        &self,
        request: &ResumeRequest<'_>,
        target_id: &str,
        explicit: Option<String>,
    ) -> Result<ResumeDecision, Error> {
        let target = self.load(target_id).await;

        let decision = match (target, explicit) {
            // Fork: the target is context only.
            (Some(target), Some(new_id)) if new_id != target.id => {
                let new_id = self.claim_new_id(new_id).await?;
                let mut decision = ResumeDecision::fresh(new_id, Some(target.id.clone()));
                if target.turns.is_empty() {
                    return Ok(decision);
                }
                if target.tool == request.tool {
                    decision.strategy = Some(ResumeStrategy::PromptConcat);
                    decision.context_turns = target.turns;
                } else {
                    decision.strategy = Some(ResumeStrategy::Hybrid);
                    decision.context_turns = self.bounded(&target.turns);
                }
                decision
            }
            (Some(target), _) => self.continue_in_place(request, target).await,
            (None, explicit) => {
                warn!(
                    conversation_id = %target_id,
                    "Resume target not found, starting a new conversation"
                );
                match explicit {
                    Some(new_id) => ResumeDecision::fresh(self.claim_new_id(new_id).await?, None),
                    None => ResumeDecision::fresh(target_id.to_string(), None),
                }
            }
        };
        Ok(decision)
    }

    /// Check that `id` can start a new conversation without replacing history.
    async fn claim_new_id(&self, id: String) -> Result<String, Error> {
        match self.load(&id).await {
            Some(existing) if !existing.turns.is_empty() => Err(Error::Config(format!(
                "Conversation '{}' already exists with {} turns; pick another id or resume it directly",
                id, existing.turn_count
            ))),
            _ => Ok(id),
        }
    }

    async fn continue_in_place(
        &self,
        request: &ResumeRequest<'_>,
        existing: Conversation,
    ) -> ResumeDecision {
        let mut decision = ResumeDecision::fresh(existing.id.clone(), None);

        if existing.turns.is_empty() {
            decision.plan = ConversationPlan::Continue(existing);
            return decision;
        }

        if existing.tool != request.tool {
            decision.strategy = Some(ResumeStrategy::Hybrid);
            decision.context_turns = self.bounded(&existing.turns);
        } else if request.disable_native || !request.tool.supports_native_resume() {
            decision.strategy = Some(ResumeStrategy::PromptConcat);
            decision.context_turns = existing.turns.clone();
        } else {
            match self.native_mapping(&existing.id).await {
                Some(mapping) if mapping.artifact_present() => {
                    decision.strategy = Some(ResumeStrategy::Native);
                    decision.native_session_id = Some(mapping.native_session_id);
                }
                Some(mapping) => {
                    debug!(
                        conversation_id = %existing.id,
                        path = ?mapping.native_session_path,
                        "Native session artifact missing"
                    );
                    decision.strategy = Some(ResumeStrategy::Hybrid);
                    decision.context_turns = self.bounded(&existing.turns);
                }
                None => {
                    decision.strategy = Some(ResumeStrategy::PromptConcat);
                    decision.context_turns = existing.turns.clone();
                }
            }
        }

        decision.plan = ConversationPlan::Continue(existing);
        decision
    }

    fn bounded(&self, turns: &[Turn]) -> Vec<Turn> {
        let start = turns.len().saturating_sub(self.hybrid_context_turns);
        turns[start..].to_vec()
    }

    async fn load(&self, id: &str) -> Option<Conversation> {
        match self.store.get(id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(conversation_id = %id, error = %e, "Failed to load conversation");
                None
            }
        }
    }

    async fn most_recent(&self, tool: Option<Tool>) -> Option<String> {
        match self.store.most_recent(tool).await {
            Ok(summary) => summary.map(|s| s.id),
            Err(e) => {
                warn!(error = %e, "Failed to look up most recent conversation");
                None
            }
        }
    }

    async fn native_mapping(&self, id: &str) -> Option<cliweave_core::NativeSessionMapping> {
        match self.store.get_native_mapping(id).await {
            Ok(mapping) => mapping,
            Err(e) => {
                warn!(conversation_id = %id, error = %e, "Failed to load native session mapping");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use cliweave_core::{
        Category, ExecutionMode, NativeSessionMapping, OutputCapture, TurnStatus,
    };
    use cliweave_store::SqliteConversationStore;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteConversationStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteConversationStore::new(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    fn conversation(id: &str, tool: Tool, turns: usize) -> Conversation {
        let mut conv = Conversation::new(id, tool, None, ExecutionMode::Analysis, Category::User);
        let start = Utc::now() - Duration::hours(1);
        for i in 0..turns {
            conv.append_turn(Turn::new(
                format!("{} prompt {}", id, i + 1),
                start + Duration::seconds(i as i64),
                10,
                TurnStatus::Success,
                Some(0),
                OutputCapture::capture("answer", "", 100, 100, false),
            ));
        }
        conv
    }

    fn request(tool: Tool, target: Option<&ResumeTarget>) -> ResumeRequest<'_> {
        ResumeRequest {
            tool,
            target,
            explicit_id: None,
            disable_native: false,
        }
    }

    #[test]
    fn test_parse_targets() {
        assert_eq!(ResumeTarget::parse(""), None);
        assert_eq!(ResumeTarget::parse(" , "), None);
        assert_eq!(ResumeTarget::parse("LATEST"), Some(ResumeTarget::Latest));
        assert_eq!(
            ResumeTarget::parse(" abc "),
            Some(ResumeTarget::Single("abc".into()))
        );
        assert_eq!(
            ResumeTarget::parse("a, b,,a"),
            Some(ResumeTarget::Multiple(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            ResumeTarget::parse("a,a"),
            Some(ResumeTarget::Single("a".into()))
        );
    }

    #[tokio::test]
    async fn test_no_resume_is_new_conversation() {
        let (store, _tmp) = create_test_store();
        let resolver = ResumeResolver::new(&store, 5);

        let decision = resolver.resolve(&request(Tool::Gemini, None)).await.unwrap();
        assert!(decision.strategy.is_none());
        assert!(decision.primary_id.contains("-gemini-"));
        assert!(matches!(
            decision.plan,
            ConversationPlan::Create { seed: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_latest_uses_native_latest() {
        let (store, _tmp) = create_test_store();
        store.save(&conversation("prev", Tool::Claude, 2)).await.unwrap();
        let resolver = ResumeResolver::new(&store, 5);

        let target = ResumeTarget::Latest;
        let decision = resolver
            .resolve(&request(Tool::Claude, Some(&target)))
            .await
            .unwrap();
        assert_eq!(decision.strategy, Some(ResumeStrategy::Native));
        assert!(decision.is_latest);
        assert_eq!(decision.native_resume(), Some(NativeResume::Latest));
        assert_eq!(decision.primary_id, "prev");
        assert!(!decision.injects_context());
        assert!(matches!(decision.plan, ConversationPlan::Continue(_)));
    }

    #[tokio::test]
    async fn test_latest_with_native_disabled_concatenates() {
        let (store, _tmp) = create_test_store();
        store.save(&conversation("prev", Tool::Qwen, 3)).await.unwrap();
        let resolver = ResumeResolver::new(&store, 5);

        let target = ResumeTarget::Latest;
        let mut req = request(Tool::Qwen, Some(&target));
        req.disable_native = true;
        let decision = resolver.resolve(&req).await.unwrap();
        assert_eq!(decision.strategy, Some(ResumeStrategy::PromptConcat));
        assert_eq!(decision.context_turns.len(), 3);
        assert_eq!(decision.primary_id, "prev");
        assert!(decision.native_resume().is_none());
    }

    #[tokio::test]
    async fn test_single_with_mapping_is_native() {
        let (store, _tmp) = create_test_store();
        store.save(&conversation("c1", Tool::Gemini, 2)).await.unwrap();
        store
            .save_native_mapping(&NativeSessionMapping::new("c1", Tool::Gemini, "native-9"))
            .await
            .unwrap();
        let resolver = ResumeResolver::new(&store, 5);

        let target = ResumeTarget::Single("c1".into());
        let decision = resolver
            .resolve(&request(Tool::Gemini, Some(&target)))
            .await
            .unwrap();
        assert_eq!(decision.strategy, Some(ResumeStrategy::Native));
        assert_eq!(
            decision.native_resume(),
            Some(NativeResume::Session("native-9".into()))
        );
    }

    #[tokio::test]
    async fn test_missing_artifact_falls_back_to_hybrid() {
        let (store, tmp) = create_test_store();
        store.save(&conversation("c1", Tool::Gemini, 8)).await.unwrap();
        store
            .save_native_mapping(
                &NativeSessionMapping::new("c1", Tool::Gemini, "native-9")
                    .with_path(tmp.path().join("gone.json")),
            )
            .await
            .unwrap();
        let resolver = ResumeResolver::new(&store, 5);

        let target = ResumeTarget::Single("c1".into());
        let decision = resolver
            .resolve(&request(Tool::Gemini, Some(&target)))
            .await
            .unwrap();
        assert_eq!(decision.strategy, Some(ResumeStrategy::Hybrid));
        assert_eq!(decision.context_turns.len(), 5);
        assert_eq!(decision.context_turns[0].index, 4);
    }

    #[tokio::test]
    async fn test_other_tool_is_hybrid() {
        let (store, _tmp) = create_test_store();
        store.save(&conversation("c1", Tool::Codex, 2)).await.unwrap();
        let resolver = ResumeResolver::new(&store, 5);

        let target = ResumeTarget::Single("c1".into());
        let decision = resolver
            .resolve(&request(Tool::Claude, Some(&target)))
            .await
            .unwrap();
        assert_eq!(decision.strategy, Some(ResumeStrategy::Hybrid));
        assert_eq!(decision.context_turns.len(), 2);
        assert!(matches!(decision.plan, ConversationPlan::Continue(_)));
    }

    #[tokio::test]
    async fn test_same_tool_without_mapping_concatenates() {
        let (store, _tmp) = create_test_store();
        store.save(&conversation("c1", Tool::Codex, 7)).await.unwrap();
        let resolver = ResumeResolver::new(&store, 5);

        let target = ResumeTarget::Single("c1".into());
        let decision = resolver
            .resolve(&request(Tool::Codex, Some(&target)))
            .await
            .unwrap();
        assert_eq!(decision.strategy, Some(ResumeStrategy::PromptConcat));
        assert_eq!(decision.context_turns.len(), 7);
    }

    #[tokio::test]
    async fn test_fork_starts_new_lineage() {
        let (store, _tmp) = create_test_store();
        store.save(&conversation("base", Tool::Gemini, 2)).await.unwrap();
        let resolver = ResumeResolver::new(&store, 5);

        let target = ResumeTarget::Single("base".into());
        let mut req = request(Tool::Gemini, Some(&target));
        req.explicit_id = Some("fork");
        let decision = resolver.resolve(&req).await.unwrap();

        assert_eq!(decision.primary_id, "fork");
        assert_eq!(decision.strategy, Some(ResumeStrategy::PromptConcat));
        assert_eq!(decision.context_turns.len(), 2);
        match decision.plan {
            ConversationPlan::Create { parent_id, seed } => {
                assert_eq!(parent_id.as_deref(), Some("base"));
                assert!(seed.is_none());
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fork_onto_existing_history_is_rejected() {
        let (store, _tmp) = create_test_store();
        store.save(&conversation("base", Tool::Gemini, 1)).await.unwrap();
        store.save(&conversation("mine", Tool::Gemini, 3)).await.unwrap();
        let resolver = ResumeResolver::new(&store, 5);

        let single = ResumeTarget::Single("base".into());
        let latest = ResumeTarget::Latest;
        let merge = ResumeTarget::Multiple(vec!["base".into(), "mine".into()]);
        for target in [&single, &latest, &merge] {
            let mut req = request(Tool::Gemini, Some(target));
            req.explicit_id = Some("mine");
            let err = resolver.resolve(&req).await.unwrap_err();
            assert!(
                matches!(err, Error::Config(ref msg) if msg.contains("mine")),
                "target {:?} gave {:?}",
                target,
                err
            );
        }
    }

    #[tokio::test]
    async fn test_fork_onto_empty_record_is_allowed() {
        let (store, _tmp) = create_test_store();
        store.save(&conversation("base", Tool::Gemini, 2)).await.unwrap();
        store.save(&conversation("blank", Tool::Gemini, 0)).await.unwrap();
        let resolver = ResumeResolver::new(&store, 5);

        let target = ResumeTarget::Single("base".into());
        let mut req = request(Tool::Gemini, Some(&target));
        req.explicit_id = Some("blank");
        let decision = resolver.resolve(&req).await.unwrap();
        assert_eq!(decision.primary_id, "blank");
        assert_eq!(decision.context_turns.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_single_target_starts_new() {
        let (store, _tmp) = create_test_store();
        let resolver = ResumeResolver::new(&store, 5);

        let target = ResumeTarget::Single("ghost".into());
        let decision = resolver
            .resolve(&request(Tool::Gemini, Some(&target)))
            .await
            .unwrap();
        assert!(decision.strategy.is_none());
        assert_eq!(decision.primary_id, "ghost");
    }

    #[tokio::test]
    async fn test_explicit_id_with_history_continues() {
        let (store, _tmp) = create_test_store();
        store.save(&conversation("mine", Tool::Qwen, 1)).await.unwrap();
        let resolver = ResumeResolver::new(&store, 5);

        let mut req = request(Tool::Qwen, None);
        req.explicit_id = Some("mine");
        let decision = resolver.resolve(&req).await.unwrap();
        assert_eq!(decision.strategy, Some(ResumeStrategy::PromptConcat));
        assert!(matches!(decision.plan, ConversationPlan::Continue(_)));
    }

    #[tokio::test]
    async fn test_merge_drops_unresolvable_ids() {
        let (store, _tmp) = create_test_store();
        store.save(&conversation("a", Tool::Gemini, 2)).await.unwrap();
        store.save(&conversation("b", Tool::Codex, 3)).await.unwrap();
        let resolver = ResumeResolver::new(&store, 5);

        let target = ResumeTarget::Multiple(vec!["a".into(), "missing".into(), "b".into()]);
        let decision = resolver
            .resolve(&request(Tool::Gemini, Some(&target)))
            .await
            .unwrap();
        assert_eq!(decision.strategy, Some(ResumeStrategy::Merge));
        assert_eq!(decision.context_turns.len(), 5);
        assert_eq!(decision.primary_id, "a");
        match decision.plan {
            ConversationPlan::AppendEach(sources) => assert_eq!(sources.len(), 2),
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_merge_with_new_id_seeds_conversation() {
        let (store, _tmp) = create_test_store();
        store.save(&conversation("a", Tool::Gemini, 2)).await.unwrap();
        store.save(&conversation("b", Tool::Codex, 3)).await.unwrap();
        let resolver = ResumeResolver::new(&store, 5);

        let target = ResumeTarget::Multiple(vec!["a".into(), "b".into()]);
        let mut req = request(Tool::Gemini, Some(&target));
        req.explicit_id = Some("ab");
        let decision = resolver.resolve(&req).await.unwrap();
        assert_eq!(decision.primary_id, "ab");
        match decision.plan {
            ConversationPlan::Create {
                seed: Some(seed), ..
            } => assert_eq!(seed.turns.len(), 5),
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_merge_fails_when_nothing_resolves() {
        let (store, _tmp) = create_test_store();
        let resolver = ResumeResolver::new(&store, 5);

        let target = ResumeTarget::Multiple(vec!["x".into(), "y".into()]);
        let err = resolver
            .resolve(&request(Tool::Gemini, Some(&target)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedTargets(ref ids) if ids.len() == 2));
    }
}
