//! Conversation history commands.

use chrono::{DateTime, Local, Utc};

use cliweave_core::{Conversation, Turn, TurnStatus};
use cliweave_store::{
    ConversationQuery, ConversationStore, ConversationSummary, SqliteConversationStore,
};

use crate::{AppContext, HistoryAction};

/// Characters of a prompt or output shown per turn.
const PREVIEW_CHARS: usize = 80;

/// Format a datetime for display.
fn format_time(dt: &DateTime<Utc>) -> String {
    let local: DateTime<Local> = dt.with_timezone(&Local);
    local.format("%Y-%m-%d %H:%M").to_string()
}

fn format_status(status: Option<TurnStatus>) -> &'static str {
    status.map(|s| s.as_str()).unwrap_or("empty")
}

/// Format a conversation summary for display.
fn format_summary(s: &ConversationSummary, verbose: bool) -> String {
    let model = s.model.as_deref().unwrap_or("default");
    let line = format!(
        "{} {} [{}] {}",
        s.id,
        s.tool,
        format_status(s.latest_status),
        format_time(&s.updated_at)
    );

    if verbose {
        format!(
            "{}\n    {} turns, {:.1}s, model {}, mode {}, {}",
            line,
            s.turn_count,
            s.total_duration_ms as f64 / 1000.0,
            model,
            s.mode,
            s.category
        )
    } else {
        line
    }
}

/// First line of `text`, cut to [`PREVIEW_CHARS`].
fn preview(text: &str) -> String {
    let first = text.lines().next().unwrap_or("").trim();
    if first.chars().count() > PREVIEW_CHARS {
        let cut: String = first.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        first.to_string()
    }
}

fn format_turn(turn: &Turn) -> String {
    let mut out = format!(
        "[{}] {} {} ({} ms)",
        turn.index,
        format_time(&turn.timestamp),
        turn.status,
        turn.duration_ms
    );
    if let Some(ref source) = turn.source_id {
        out.push_str(&format!(" from {}", source));
    }
    out.push_str(&format!("\n    > {}", preview(&turn.prompt)));
    let reply = preview(turn.output.text());
    if !reply.is_empty() {
        out.push_str(&format!("\n    < {}", reply));
    }
    out
}

pub async fn handle(action: HistoryAction, ctx: &AppContext) -> anyhow::Result<()> {
    let store = match SqliteConversationStore::new(ctx.config.data_dir()) {
        Ok(store) => store,
        Err(e) => {
            println!("Failed to open conversation store: {}", e);
            return Ok(());
        }
    };

    match action {
        HistoryAction::List {
            limit,
            tool,
            category,
        } => {
            let mut query = ConversationQuery::new().with_limit(limit);
            if let Some(tool) = tool {
                query = query.with_tool(tool);
            }
            if let Some(category) = category {
                query = query.with_category(category);
            }
            list_conversations(&store, &query).await?;
        }
        HistoryAction::Show { id, json } => {
            show_conversation(&store, &id, json).await?;
        }
        HistoryAction::Delete { id } => {
            delete_conversation(&store, &id).await?;
        }
    }

    Ok(())
}

async fn list_conversations<S: ConversationStore>(
    store: &S,
    query: &ConversationQuery,
) -> anyhow::Result<()> {
    let conversations = store.list(query).await?;

    if conversations.is_empty() {
        println!("No conversations found.");
        return Ok(());
    }

    println!("Conversations ({}):", conversations.len());
    println!();

    for conversation in &conversations {
        println!("{}", format_summary(conversation, true));
    }

    println!();
    println!("Use 'cliweave history show <id>' for details");
    println!("Use 'cliweave exec <tool> <prompt> --resume <id>' to continue one");

    Ok(())
}

/// Resolve a full id or unique prefix, printing why when it cannot.
async fn resolve<S: ConversationStore>(store: &S, id: &str) -> anyhow::Result<Option<Conversation>> {
    if let Some(conversation) = store.get(id).await? {
        return Ok(Some(conversation));
    }

    let matches = store.find_by_prefix(id).await?;
    match matches.as_slice() {
        [] => {
            println!("Conversation not found: {}", id);
            Ok(None)
        }
        [only] => Ok(store.get(&only.id).await?),
        _ => {
            println!("Ambiguous ID '{}' matches {} conversations:", id, matches.len());
            for m in &matches {
                println!("  {}", format_summary(m, false));
            }
            Ok(None)
        }
    }
}

async fn show_conversation<S: ConversationStore>(
    store: &S,
    id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let Some(conversation) = resolve(store, id).await? else {
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&conversation)?);
        return Ok(());
    }

    println!("Conversation: {}", conversation.id);
    println!("================================================================================");
    println!();
    println!("Tool:        {}", conversation.tool);
    println!(
        "Model:       {}",
        conversation.model.as_deref().unwrap_or("default")
    );
    println!("Mode:        {}", conversation.mode);
    println!("Category:    {}", conversation.category);
    println!("Status:      {}", format_status(conversation.latest_status));
    println!();
    println!("Created:     {}", format_time(&conversation.created_at));
    println!("Updated:     {}", format_time(&conversation.updated_at));
    println!("Turns:       {}", conversation.turn_count);
    println!(
        "Duration:    {:.1}s",
        conversation.total_duration_ms as f64 / 1000.0
    );

    if let Some(ref parent) = conversation.parent_id {
        println!("Parent:      {}", parent);
    }
    if !conversation.merged_from.is_empty() {
        println!("Merged from: {}", conversation.merged_from.join(", "));
    }
    if let Some(native) = store.get_native_session_id(&conversation.id).await? {
        println!("Native:      {}", native);
    }

    if !conversation.turns.is_empty() {
        println!();
        println!("Turns:");
        println!("------");
        for turn in &conversation.turns {
            println!("{}", format_turn(turn));
        }
    }

    println!();
    println!(
        "To continue: cliweave exec {} <prompt> --resume {}",
        conversation.tool, conversation.id
    );

    Ok(())
}

async fn delete_conversation<S: ConversationStore>(store: &S, id: &str) -> anyhow::Result<()> {
    let Some(conversation) = resolve(store, id).await? else {
        return Ok(());
    };

    store.delete(&conversation.id).await?;
    println!("Deleted conversation {}", conversation.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliweave_core::{Category, ExecutionMode, OutputCapture, Tool};

    fn summary() -> ConversationSummary {
        ConversationSummary {
            id: "conv-1".into(),
            tool: Tool::Qwen,
            model: None,
            mode: ExecutionMode::Analysis,
            category: Category::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            total_duration_ms: 2500,
            turn_count: 3,
            latest_status: Some(TurnStatus::Success),
            parent_id: None,
        }
    }

    #[test]
    fn test_format_summary() {
        let short = format_summary(&summary(), false);
        assert!(short.starts_with("conv-1 qwen [success]"));

        let long = format_summary(&summary(), true);
        assert!(long.contains("3 turns, 2.5s, model default, mode analysis, user"));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let text = "é".repeat(200);
        let cut = preview(&text);
        assert_eq!(cut.chars().count(), PREVIEW_CHARS);
        assert!(cut.ends_with("..."));
        assert_eq!(preview("first\nsecond"), "first");
    }

    #[test]
    fn test_format_turn_shows_source_and_reply() {
        let turn = Turn::new(
            "summarize",
            Utc::now(),
            120,
            TurnStatus::Success,
            Some(0),
            OutputCapture::capture("done", "", 100, 100, false),
        )
        .with_source("conv-a");

        let text = format_turn(&turn);
        assert!(text.contains("from conv-a"));
        assert!(text.contains("> summarize"));
        assert!(text.contains("< done"));
    }
}
