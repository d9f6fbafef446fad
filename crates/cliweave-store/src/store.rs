//! Conversation storage implementation.
//!
//! Provides SQLite-backed storage for conversations, their turns and the
//! native session mappings that enable tool-side resume.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use cliweave_core::{
    Category, Conversation, ExecutionMode, NativeSessionMapping, OutputCapture, Tool, Turn,
    TurnStatus,
};

/// Errors that can occur during conversation storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store lock poisoned")]
    Lock,

    #[error("Storage path error: {0}")]
    PathError(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for cliweave_core::Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => cliweave_core::Error::NotFound(id),
            other => cliweave_core::Error::Storage(other.to_string()),
        }
    }
}

/// Query parameters for listing conversations.
#[derive(Debug, Clone, Default)]
pub struct ConversationQuery {
    /// Filter by tool
    pub tool: Option<Tool>,
    /// Filter by category
    pub category: Option<Category>,
    /// Maximum results
    pub limit: usize,
    /// Offset for pagination
    pub offset: usize,
}

impl ConversationQuery {
    pub fn new() -> Self {
        Self {
            limit: 50,
            ..Default::default()
        }
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Summary information for conversation listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub tool: Tool,
    pub model: Option<String>,
    pub mode: ExecutionMode,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_duration_ms: u64,
    pub turn_count: u32,
    pub latest_status: Option<TurnStatus>,
    pub parent_id: Option<String>,
}

/// Storage contract consumed by the execution engine.
///
/// Implementations must be durable; the engine assumes a single writer per
/// conversation id.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load a conversation with all of its turns.
    async fn get(&self, id: &str) -> Result<Option<Conversation>>;

    /// Insert or replace a conversation and its turns.
    async fn save(&self, conversation: &Conversation) -> Result<()>;

    /// Tool-side session id of the newest mapping for a conversation.
    async fn get_native_session_id(&self, id: &str) -> Result<Option<String>> {
        Ok(self
            .get_native_mapping(id)
            .await?
            .map(|m| m.native_session_id))
    }

    /// Newest native session mapping for a conversation.
    async fn get_native_mapping(&self, id: &str) -> Result<Option<NativeSessionMapping>>;

    /// Record a native session mapping.
    async fn save_native_mapping(&self, mapping: &NativeSessionMapping) -> Result<()>;

    /// Most recently updated conversation, optionally restricted to one tool.
    async fn most_recent(&self, tool: Option<Tool>) -> Result<Option<ConversationSummary>>;

    /// List conversations matching query, newest first.
    async fn list(&self, query: &ConversationQuery) -> Result<Vec<ConversationSummary>>;

    /// Find conversations by id prefix.
    async fn find_by_prefix(&self, prefix: &str) -> Result<Vec<ConversationSummary>>;

    /// Delete a conversation, its turns and its native mappings.
    async fn delete(&self, id: &str) -> Result<()>;
}

const CONVERSATION_COLUMNS: &str = "id, tool, model, mode, category, created_at, updated_at, \
     total_duration_ms, turn_count, latest_status, parent_id, merged_from";

/// Raw `conversations` row before enum parsing.
struct ConversationRow {
    id: String,
    tool: String,
    model: Option<String>,
    mode: String,
    category: String,
    created_at: String,
    updated_at: String,
    total_duration_ms: i64,
    turn_count: i64,
    latest_status: Option<String>,
    parent_id: Option<String>,
    merged_from: String,
}

impl ConversationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tool: row.get(1)?,
            model: row.get(2)?,
            mode: row.get(3)?,
            category: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            total_duration_ms: row.get(7)?,
            turn_count: row.get(8)?,
            latest_status: row.get(9)?,
            parent_id: row.get(10)?,
            merged_from: row.get(11)?,
        })
    }

    fn into_summary(self) -> Result<ConversationSummary> {
        Ok(ConversationSummary {
            tool: parse_enum::<Tool>(&self.tool)?,
            mode: parse_enum::<ExecutionMode>(&self.mode)?,
            category: parse_enum::<Category>(&self.category)?,
            created_at: parse_datetime(&self.created_at),
            updated_at: parse_datetime(&self.updated_at),
            total_duration_ms: self.total_duration_ms.max(0) as u64,
            turn_count: self.turn_count.max(0) as u32,
            latest_status: self.latest_status.as_deref().map(TurnStatus::from_stored),
            id: self.id,
            model: self.model,
            parent_id: self.parent_id,
        })
    }

    fn into_conversation(self, turns: Vec<Turn>) -> Result<Conversation> {
        let merged_from: Vec<String> = serde_json::from_str(&self.merged_from)?;
        let summary = self.into_summary()?;
        Ok(Conversation {
            id: summary.id,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            tool: summary.tool,
            model: summary.model,
            mode: summary.mode,
            category: summary.category,
            total_duration_ms: summary.total_duration_ms,
            turn_count: summary.turn_count,
            latest_status: summary.latest_status,
            turns,
            parent_id: summary.parent_id,
            merged_from,
        })
    }
}

fn parse_enum<T>(s: &str) -> Result<T>
where
    T: std::str::FromStr<Err = cliweave_core::Error>,
{
    s.parse::<T>().map_err(|e| StoreError::Corrupt(e.to_string()))
}

/// Parse datetime from SQLite string.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Format datetime for SQLite; fixed width so text ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn turn_from_row(row: &Row<'_>) -> rusqlite::Result<Turn> {
    Ok(Turn {
        index: row.get::<_, i64>(0)? as u32,
        timestamp: parse_datetime(&row.get::<_, String>(1)?),
        prompt: row.get(2)?,
        duration_ms: row.get::<_, i64>(3)?.max(0) as u64,
        status: TurnStatus::from_stored(&row.get::<_, String>(4)?),
        exit_code: row.get(5)?,
        output: OutputCapture {
            stdout: row.get(6)?,
            stderr: row.get(7)?,
            truncated: row.get(8)?,
            cached: row.get(9)?,
        },
        source_id: row.get(10)?,
    })
}

/// SQLite-backed conversation storage.
pub struct SqliteConversationStore {
    /// Database connection (wrapped in mutex for thread safety).
    conn: Mutex<Connection>,
    /// Location of the database file.
    db_path: PathBuf,
}

impl SqliteConversationStore {
    /// Create a new SQLite conversation store under `base_dir`.
    ///
    /// Creates the database and runs migrations if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;

        let db_path = base_dir.join("history.db");
        let conn = Connection::open(&db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };
        store.run_migrations()?;

        Ok(store)
    }

    /// Open store at the default data directory.
    pub fn open_default() -> Result<Self> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| StoreError::PathError("Could not find data directory".into()))?
            .join("cliweave");
        Self::new(data_dir)
    }

    /// Path of the underlying database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < 1 {
            debug!(path = %self.db_path.display(), "Applying initial history schema");
            let migration = include_str!("../migrations/001_initial.sql");
            conn.execute_batch(migration)?;
        }

        Ok(())
    }

    fn load_turns(conn: &Connection, id: &str) -> Result<Vec<Turn>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT turn_index, timestamp, prompt, duration_ms, status, exit_code,
                   stdout, stderr, truncated, cached_output, source_id
            FROM turns WHERE conversation_id = ?1
            ORDER BY turn_index ASC
            "#,
        )?;
        let turns = stmt
            .query_map(params![id], turn_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(turns)
    }

    fn query_summaries(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<ConversationSummary>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, ConversationRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ConversationRow::into_summary).collect()
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                &format!("SELECT {} FROM conversations WHERE id = ?1", CONVERSATION_COLUMNS),
                params![id],
                ConversationRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => {
                let turns = Self::load_turns(&conn, id)?;
                Ok(Some(row.into_conversation(turns)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, conversation: &Conversation) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let merged_from = serde_json::to_string(&conversation.merged_from)?;

        tx.execute(
            r#"
            INSERT INTO conversations (
                id, tool, model, mode, category, created_at, updated_at,
                total_duration_ms, turn_count, latest_status, parent_id, merged_from
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                tool = excluded.tool,
                model = excluded.model,
                mode = excluded.mode,
                category = excluded.category,
                updated_at = excluded.updated_at,
                total_duration_ms = excluded.total_duration_ms,
                turn_count = excluded.turn_count,
                latest_status = excluded.latest_status,
                parent_id = excluded.parent_id,
                merged_from = excluded.merged_from
            "#,
            params![
                conversation.id,
                conversation.tool.as_str(),
                conversation.model,
                conversation.mode.as_str(),
                conversation.category.as_str(),
                format_datetime(&conversation.created_at),
                format_datetime(&conversation.updated_at),
                conversation.total_duration_ms as i64,
                conversation.turn_count as i64,
                conversation.latest_status.map(|s| s.as_str()),
                conversation.parent_id,
                merged_from,
            ],
        )?;

        tx.execute(
            "DELETE FROM turns WHERE conversation_id = ?1 AND turn_index > ?2",
            params![conversation.id, conversation.turns.len() as i64],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO turns (
                    conversation_id, turn_index, timestamp, prompt, duration_ms,
                    status, exit_code, stdout, stderr, truncated, cached_output, source_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;

            for turn in &conversation.turns {
                stmt.execute(params![
                    conversation.id,
                    turn.index as i64,
                    format_datetime(&turn.timestamp),
                    turn.prompt,
                    turn.duration_ms as i64,
                    turn.status.as_str(),
                    turn.exit_code,
                    turn.output.stdout,
                    turn.output.stderr,
                    turn.output.truncated,
                    turn.output.cached,
                    turn.source_id,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    async fn get_native_mapping(&self, id: &str) -> Result<Option<NativeSessionMapping>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                r#"
                SELECT conversation_id, tool, native_session_id, native_session_path,
                       project_hash, created_at
                FROM native_sessions
                WHERE conversation_id = ?1
                ORDER BY id DESC
                LIMIT 1
                "#,
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        row.map(
            |(conversation_id, tool, native_session_id, path, project_hash, created_at)| {
                Ok(NativeSessionMapping {
                    conversation_id,
                    tool: parse_enum::<Tool>(&tool)?,
                    native_session_id,
                    native_session_path: path.map(PathBuf::from),
                    project_hash,
                    created_at: parse_datetime(&created_at),
                })
            },
        )
        .transpose()
    }

    async fn save_native_mapping(&self, mapping: &NativeSessionMapping) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO native_sessions (
                conversation_id, tool, native_session_id, native_session_path,
                project_hash, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                mapping.conversation_id,
                mapping.tool.as_str(),
                mapping.native_session_id,
                mapping
                    .native_session_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().to_string()),
                mapping.project_hash,
                format_datetime(&mapping.created_at),
            ],
        )?;

        Ok(())
    }

    async fn most_recent(&self, tool: Option<Tool>) -> Result<Option<ConversationSummary>> {
        let mut query = ConversationQuery::new().with_limit(1);
        query.tool = tool;
        let found = self.list(&query).await?;
        Ok(found.into_iter().next())
    }

    async fn list(&self, query: &ConversationQuery) -> Result<Vec<ConversationSummary>> {
        let conn = self.conn()?;

        let mut sql = format!("SELECT {} FROM conversations", CONVERSATION_COLUMNS);
        let mut conditions = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(tool) = query.tool {
            conditions.push(format!("tool = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(tool.as_str().to_string()));
        }

        if let Some(category) = query.category {
            conditions.push(format!("category = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(category.as_str().to_string()));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        sql.push_str(" ORDER BY updated_at DESC");
        sql.push_str(&format!(" LIMIT {} OFFSET {}", query.limit, query.offset));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        Self::query_summaries(&conn, &sql, params_refs.as_slice())
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Vec<ConversationSummary>> {
        let conn = self.conn()?;
        let pattern = format!("{}%", prefix);
        let sql = format!(
            "SELECT {} FROM conversations WHERE id LIKE ?1 ORDER BY updated_at DESC LIMIT 10",
            CONVERSATION_COLUMNS
        );
        Self::query_summaries(&conn, &sql, &[&pattern as &dyn rusqlite::ToSql])
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let conn = self.conn()?;

        // Turns cascade via the foreign key.
        let rows = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        conn.execute(
            "DELETE FROM native_sessions WHERE conversation_id = ?1",
            params![id],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteConversationStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteConversationStore::new(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    fn conversation(id: &str, tool: Tool, turns: usize) -> Conversation {
        let mut conv = Conversation::new(id, tool, None, ExecutionMode::Analysis, Category::User);
        for i in 0..turns {
            conv.append_turn(Turn::new(
                format!("prompt {}", i + 1),
                Utc::now(),
                10,
                TurnStatus::Success,
                Some(0),
                OutputCapture::capture(&format!("answer {}", i + 1), "", 100, 100, false),
            ));
        }
        conv
    }

    #[tokio::test]
    async fn test_save_and_get_conversation() {
        let (store, _tmp) = create_test_store();

        let mut conv = conversation("c1", Tool::Gemini, 2);
        conv.model = Some("gemini-2.5-pro".to_string());
        store.save(&conv).await.unwrap();

        let loaded = store.get("c1").await.unwrap().unwrap();
        assert_eq!(loaded.tool, Tool::Gemini);
        assert_eq!(loaded.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(loaded.turn_count, 2);
        assert_eq!(loaded.turns[1].prompt, "prompt 2");
        assert_eq!(loaded.turns[1].output.stdout, "answer 2");
        assert!(loaded.is_consistent());
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (store, _tmp) = create_test_store();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_appended_turn_updates_record() {
        let (store, _tmp) = create_test_store();

        let mut conv = conversation("c1", Tool::Codex, 1);
        store.save(&conv).await.unwrap();

        conv.append_turn(Turn::new(
            "follow up",
            Utc::now(),
            25,
            TurnStatus::Timeout,
            None,
            OutputCapture::default(),
        ));
        store.save(&conv).await.unwrap();

        let loaded = store.get("c1").await.unwrap().unwrap();
        assert_eq!(loaded.turn_count, 2);
        assert_eq!(loaded.latest_status, Some(TurnStatus::Timeout));
        assert_eq!(loaded.turns[1].exit_code, None);
        assert_eq!(loaded.total_duration_ms, 35);
    }

    #[tokio::test]
    async fn test_merged_from_and_source_round_trip() {
        let (store, _tmp) = create_test_store();

        let mut conv = Conversation::new(
            "merged",
            Tool::Claude,
            None,
            ExecutionMode::Write,
            Category::Insight,
        );
        conv.merged_from = vec!["a".to_string(), "b".to_string()];
        conv.append_turn(
            Turn::new("q", Utc::now(), 1, TurnStatus::Success, Some(0), OutputCapture::default())
                .with_source("a"),
        );
        store.save(&conv).await.unwrap();

        let loaded = store.get("merged").await.unwrap().unwrap();
        assert_eq!(loaded.merged_from, vec!["a", "b"]);
        assert_eq!(loaded.turns[0].source_id.as_deref(), Some("a"));
        assert_eq!(loaded.category, Category::Insight);
    }

    #[tokio::test]
    async fn test_latest_native_mapping_wins() {
        let (store, _tmp) = create_test_store();

        store
            .save_native_mapping(&NativeSessionMapping::new("c1", Tool::Claude, "first"))
            .await
            .unwrap();
        store
            .save_native_mapping(
                &NativeSessionMapping::new("c1", Tool::Claude, "second")
                    .with_path("/tmp/second.jsonl")
                    .with_project_hash("abc"),
            )
            .await
            .unwrap();

        assert_eq!(
            store.get_native_session_id("c1").await.unwrap().as_deref(),
            Some("second")
        );
        let mapping = store.get_native_mapping("c1").await.unwrap().unwrap();
        assert_eq!(mapping.project_hash.as_deref(), Some("abc"));
        assert!(store.get_native_session_id("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_most_recent_by_tool() {
        let (store, _tmp) = create_test_store();

        let mut older = conversation("older", Tool::Gemini, 1);
        older.updated_at = Utc::now() - Duration::minutes(10);
        let mut newer = conversation("newer", Tool::Codex, 1);
        newer.updated_at = Utc::now();

        store.save(&older).await.unwrap();
        store.save(&newer).await.unwrap();

        assert_eq!(store.most_recent(None).await.unwrap().unwrap().id, "newer");
        assert_eq!(
            store.most_recent(Some(Tool::Gemini)).await.unwrap().unwrap().id,
            "older"
        );
        assert!(store.most_recent(Some(Tool::Qwen)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_prefix() {
        let (store, _tmp) = create_test_store();

        store.save(&conversation("abc-1", Tool::Gemini, 1)).await.unwrap();
        store.save(&conversation("abd-2", Tool::Qwen, 1)).await.unwrap();

        let all = store.list(&ConversationQuery::new()).await.unwrap();
        assert_eq!(all.len(), 2);

        let qwen = store
            .list(&ConversationQuery::new().with_tool(Tool::Qwen))
            .await
            .unwrap();
        assert_eq!(qwen.len(), 1);
        assert_eq!(qwen[0].id, "abd-2");

        let found = store.find_by_prefix("abc").await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_conversation() {
        let (store, _tmp) = create_test_store();

        store.save(&conversation("c1", Tool::Gemini, 2)).await.unwrap();
        store
            .save_native_mapping(&NativeSessionMapping::new("c1", Tool::Gemini, "n1"))
            .await
            .unwrap();

        store.delete("c1").await.unwrap();
        assert!(store.get("c1").await.unwrap().is_none());
        assert!(store.get_native_mapping("c1").await.unwrap().is_none());
        assert!(matches!(
            store.delete("c1").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reopen_keeps_history() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = SqliteConversationStore::new(temp_dir.path()).unwrap();
            store.save(&conversation("c1", Tool::Claude, 3)).await.unwrap();
        }
        let store = SqliteConversationStore::new(temp_dir.path()).unwrap();
        let loaded = store.get("c1").await.unwrap().unwrap();
        assert_eq!(loaded.turn_count, 3);
    }
}
