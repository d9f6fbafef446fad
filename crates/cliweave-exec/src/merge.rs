//! Merging the histories of several conversations.

use cliweave_core::{Category, Conversation, ExecutionMode, Tool, Turn};

/// Combined view of several source conversations.
#[derive(Debug, Clone, Default)]
pub struct MergedHistory {
    /// Turns of every source, in timestamp order, numbered 1..=n
    pub turns: Vec<Turn>,
    /// Sum of the sources' durations
    pub total_duration_ms: u64,
    /// Source conversation ids in the order they were given
    pub source_ids: Vec<String>,
}

/// Interleave the turns of `sources` by timestamp.
///
/// Each turn is tagged with the conversation it came from unless it already
/// carries a source tag from an earlier merge. The sort is stable, so turns
/// sharing a timestamp keep the order in which the sources were given.
pub fn merge_turns(sources: &[Conversation]) -> MergedHistory {
    let mut turns: Vec<Turn> = sources
        .iter()
        .flat_map(|conv| {
            conv.turns.iter().map(move |turn| {
                if turn.source_id.is_some() {
                    turn.clone()
                } else {
                    turn.clone().with_source(conv.id.clone())
                }
            })
        })
        .collect();

    turns.sort_by_key(|turn| turn.timestamp);
    for (i, turn) in turns.iter_mut().enumerate() {
        turn.index = i as u32 + 1;
    }

    MergedHistory {
        turns,
        total_duration_ms: sources.iter().map(|c| c.total_duration_ms).sum(),
        source_ids: sources.iter().map(|c| c.id.clone()).collect(),
    }
}

impl MergedHistory {
    /// Build a new conversation holding the merged history.
    ///
    /// The new turn is not included; append it once it has run.
    pub fn into_conversation(
        self,
        id: impl Into<String>,
        tool: Tool,
        model: Option<String>,
        mode: ExecutionMode,
        category: Category,
    ) -> Conversation {
        let mut conversation = Conversation::new(id, tool, model, mode, category);
        if let Some(first) = self.turns.first() {
            conversation.created_at = first.timestamp;
        }
        if let Some(last) = self.turns.last() {
            conversation.updated_at = last.timestamp;
            conversation.latest_status = Some(last.status);
        }
        conversation.turn_count = self.turns.len() as u32;
        conversation.total_duration_ms = self.total_duration_ms;
        conversation.turns = self.turns;
        conversation.merged_from = self.source_ids;
        conversation
    }
}

/// Append one completed turn to every source conversation independently.
///
/// Each source gets its own next index. The sources' tool, model and mode are
/// updated to reflect the run that produced the turn.
pub fn append_to_each(
    sources: &mut [Conversation],
    turn: &Turn,
    tool: Tool,
    model: Option<&str>,
    mode: ExecutionMode,
) {
    for conversation in sources.iter_mut() {
        conversation.tool = tool;
        conversation.model = model.map(str::to_string);
        conversation.mode = mode;
        conversation.append_turn(turn.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use cliweave_core::{OutputCapture, TurnStatus};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
    }

    fn conversation(id: &str, offsets: &[i64]) -> Conversation {
        let mut conv = Conversation::new(
            id,
            Tool::Gemini,
            None,
            ExecutionMode::Analysis,
            Category::User,
        );
        for offset in offsets {
            conv.append_turn(Turn::new(
                format!("{} at {}", id, offset),
                base() + Duration::seconds(*offset),
                100,
                TurnStatus::Success,
                Some(0),
                OutputCapture::default(),
            ));
        }
        conv
    }

    fn new_turn() -> Turn {
        Turn::new(
            "combined question",
            base() + Duration::seconds(100),
            250,
            TurnStatus::Success,
            Some(0),
            OutputCapture::default(),
        )
    }

    #[test]
    fn test_merge_orders_by_timestamp_and_renumbers() {
        let a = conversation("a", &[1, 5]);
        let b = conversation("b", &[2, 3, 8]);

        let merged = merge_turns(&[a, b]);
        let prompts: Vec<_> = merged.turns.iter().map(|t| t.prompt.as_str()).collect();
        assert_eq!(
            prompts,
            vec!["a at 1", "b at 2", "b at 3", "a at 5", "b at 8"]
        );
        let indices: Vec<_> = merged.turns.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
        assert_eq!(merged.total_duration_ms, 500);
        assert_eq!(merged.turns[0].source_id.as_deref(), Some("a"));
        assert_eq!(merged.turns[1].source_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_equal_timestamps_keep_source_order() {
        let a = conversation("a", &[4]);
        let b = conversation("b", &[4]);

        let merged = merge_turns(&[b, a]);
        assert_eq!(merged.turns[0].source_id.as_deref(), Some("b"));
        assert_eq!(merged.turns[1].source_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_existing_source_tag_is_kept() {
        let mut a = conversation("a", &[1]);
        a.turns[0].source_id = Some("older".into());

        let merged = merge_turns(&[a]);
        assert_eq!(merged.turns[0].source_id.as_deref(), Some("older"));
    }

    #[test]
    fn test_merge_with_new_id_has_all_turns_plus_new() {
        let a = conversation("a", &[1, 5]);
        let b = conversation("b", &[2, 3, 8]);

        let mut merged = merge_turns(&[a.clone(), b.clone()]).into_conversation(
            "combined",
            Tool::Claude,
            None,
            ExecutionMode::Analysis,
            Category::User,
        );
        merged.append_turn(new_turn());

        assert_eq!(merged.turn_count, 6);
        assert!(merged.is_consistent());
        assert_eq!(merged.merged_from, vec!["a", "b"]);
        assert_eq!(merged.total_duration_ms, 750);
        assert_eq!(merged.last_turn().unwrap().prompt, "combined question");
        assert_eq!(merged.created_at, base() + Duration::seconds(1));

        // Sources are untouched.
        assert_eq!(a.turn_count, 2);
        assert_eq!(b.turn_count, 3);
    }

    #[test]
    fn test_append_to_each_numbers_independently() {
        let mut sources = vec![conversation("a", &[1, 5]), conversation("b", &[2, 3, 8])];

        append_to_each(
            &mut sources,
            &new_turn(),
            Tool::Codex,
            Some("o3"),
            ExecutionMode::Write,
        );

        assert_eq!(sources[0].turn_count, 3);
        assert_eq!(sources[1].turn_count, 4);
        assert_eq!(sources[0].last_turn().unwrap().index, 3);
        assert_eq!(sources[1].last_turn().unwrap().index, 4);
        assert!(sources.iter().all(|c| c.is_consistent()));
        assert!(sources.iter().all(|c| c.tool == Tool::Codex));
    }
}
