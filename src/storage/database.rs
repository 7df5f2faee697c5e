//! SQLite persistence for documents, conversations, quizzes, and segment
//! indexing status
//!
//! Every read and write path is scoped by `owner_id`; a row owned by someone
//! else behaves exactly like a missing row.

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::chat::{ChatRole, Conversation, Message};
use crate::types::document::{Document, MediaType, SegmentStatus};
use crate::types::quiz::{NewQuestion, Question, Quiz};

/// SQLite-backed database
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::Database(format!("failed to open database: {}", e)))?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (tests, local experiments)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {}", e)))?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
        "#,
        )
        .map_err(|e| Error::Database(format!("failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                filename TEXT NOT NULL,
                storage_key TEXT NOT NULL UNIQUE,
                media_type TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                content_hash TEXT NOT NULL,
                segment_count INTEGER NOT NULL DEFAULT 0,
                uploaded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner_id);

            -- Per-segment indexing status; also the chunk registry that makes
            -- document deletion enumerable.
            CREATE TABLE IF NOT EXISTS segments (
                storage_key TEXT NOT NULL,
                segment_index INTEGER NOT NULL,
                owner_id TEXT NOT NULL,
                status TEXT NOT NULL,
                error TEXT,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (storage_key, segment_index)
            );

            CREATE INDEX IF NOT EXISTS idx_segments_status ON segments(status);

            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversations_owner ON conversations(owner_id);

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                meta TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);

            CREATE TABLE IF NOT EXISTS quizzes (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_quizzes_owner ON quizzes(owner_id);

            CREATE TABLE IF NOT EXISTS questions (
                id TEXT PRIMARY KEY,
                quiz_id TEXT NOT NULL,
                idx INTEGER NOT NULL,
                question TEXT NOT NULL,
                answers TEXT NOT NULL,
                correct_index INTEGER NOT NULL,
                FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_questions_quiz ON questions(quiz_id);
        "#,
        )
        .map_err(|e| Error::Database(format!("failed to run migrations: {}", e)))?;

        tracing::debug!("database migrations complete");
        Ok(())
    }

    // ==================== Documents ====================

    /// Insert a document row
    pub fn create_document(&self, doc: &Document) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO documents (
                id, owner_id, filename, storage_key, media_type,
                size_bytes, content_hash, segment_count, uploaded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                doc.id.to_string(),
                doc.owner_id,
                doc.filename,
                doc.storage_key,
                doc.media_type.as_mime(),
                doc.size_bytes as i64,
                doc.content_hash,
                doc.segment_count as i64,
                format_time(&doc.uploaded_at),
            ],
        )?;
        Ok(())
    }

    /// Caller's documents, newest first
    pub fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, filename, storage_key, media_type, size_bytes,
                    content_hash, segment_count, uploaded_at
             FROM documents WHERE owner_id = ?1 ORDER BY uploaded_at DESC",
        )?;
        let rows = stmt.query_map(params![owner_id], row_to_document)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Owner-scoped fetch by id
    pub fn get_document(&self, owner_id: &str, id: &Uuid) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, owner_id, filename, storage_key, media_type, size_bytes,
                    content_hash, segment_count, uploaded_at
             FROM documents WHERE id = ?1 AND owner_id = ?2",
            params![id.to_string(), owner_id],
            row_to_document,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Owner-scoped fetch by storage key
    pub fn find_document_by_key(&self, owner_id: &str, storage_key: &str) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, owner_id, filename, storage_key, media_type, size_bytes,
                    content_hash, segment_count, uploaded_at
             FROM documents WHERE storage_key = ?1 AND owner_id = ?2",
            params![storage_key, owner_id],
            row_to_document,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Rename a document. Returns false when no owned row matched.
    pub fn rename_document(&self, owner_id: &str, id: &Uuid, filename: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE documents SET filename = ?1 WHERE id = ?2 AND owner_id = ?3",
            params![filename, id.to_string(), owner_id],
        )?;
        Ok(changed > 0)
    }

    /// Record the number of chunks produced at ingest time
    pub fn set_segment_count(&self, id: &Uuid, count: u32) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE documents SET segment_count = ?1 WHERE id = ?2",
            params![count as i64, id.to_string()],
        )?;
        Ok(())
    }

    /// Delete a document row. Returns false when no owned row matched.
    pub fn delete_document_row(&self, owner_id: &str, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "DELETE FROM documents WHERE id = ?1 AND owner_id = ?2",
            params![id.to_string(), owner_id],
        )?;
        Ok(changed > 0)
    }

    // ==================== Segments ====================

    /// Record segment rows as pending before their upserts are issued
    pub fn record_segments(&self, storage_key: &str, owner_id: &str, indices: &[u32]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for index in indices {
            tx.execute(
                r#"
                INSERT INTO segments (storage_key, segment_index, owner_id, status, error, updated_at)
                VALUES (?1, ?2, ?3, 'pending', NULL, ?4)
                ON CONFLICT(storage_key, segment_index) DO UPDATE SET
                    status = 'pending', error = NULL, updated_at = excluded.updated_at
                "#,
                params![storage_key, index, owner_id, format_time(&Utc::now())],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Update one segment's status
    pub fn set_segment_status(
        &self,
        storage_key: &str,
        index: u32,
        status: SegmentStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE segments SET status = ?1, error = ?2, updated_at = ?3
             WHERE storage_key = ?4 AND segment_index = ?5",
            params![
                status.as_str(),
                error,
                format_time(&Utc::now()),
                storage_key,
                index
            ],
        )?;
        Ok(())
    }

    /// All segment indices for a document, with status
    pub fn segment_statuses(&self, storage_key: &str) -> Result<Vec<(u32, SegmentStatus)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT segment_index, status FROM segments
             WHERE storage_key = ?1 ORDER BY segment_index ASC",
        )?;
        let rows = stmt.query_map(params![storage_key], |row| {
            let index: u32 = row.get(0)?;
            let status: String = row.get(1)?;
            Ok((index, status))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (index, status) = row?;
            let status = SegmentStatus::parse(&status)
                .ok_or_else(|| Error::Database(format!("unknown segment status: {}", status)))?;
            result.push((index, status));
        }
        Ok(result)
    }

    /// Indices of failed segments for a document
    pub fn failed_segments(&self, storage_key: &str) -> Result<Vec<u32>> {
        Ok(self
            .segment_statuses(storage_key)?
            .into_iter()
            .filter(|(_, status)| *status == SegmentStatus::Failed)
            .map(|(index, _)| index)
            .collect())
    }

    /// Flag every segment of a document for background cleanup
    pub fn mark_segments_pending_cleanup(&self, storage_key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE segments SET status = 'pending_cleanup', updated_at = ?1
             WHERE storage_key = ?2",
            params![format_time(&Utc::now()), storage_key],
        )?;
        Ok(())
    }

    /// Segments awaiting vector-entry cleanup
    pub fn pending_cleanup_segments(&self, limit: usize) -> Result<Vec<(String, u32)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT storage_key, segment_index FROM segments
             WHERE status = 'pending_cleanup' ORDER BY updated_at ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Remove all segment rows for a document
    pub fn delete_segment_rows(&self, storage_key: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "DELETE FROM segments WHERE storage_key = ?1",
            params![storage_key],
        )?;
        Ok(changed)
    }

    /// Remove one segment row
    pub fn delete_segment_row(&self, storage_key: &str, index: u32) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM segments WHERE storage_key = ?1 AND segment_index = ?2",
            params![storage_key, index],
        )?;
        Ok(())
    }

    // ==================== Conversations ====================

    /// Create a conversation, optionally seeded with a first user message.
    /// The title falls back to a prefix of the initial message.
    pub fn create_conversation(
        &self,
        owner_id: &str,
        title: Option<String>,
        initial_message: Option<String>,
    ) -> Result<Conversation> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let title = title.unwrap_or_else(|| {
            initial_message
                .as_deref()
                .map(Conversation::derive_title)
                .unwrap_or_else(|| "New conversation".to_string())
        });

        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO conversations (id, owner_id, title, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), owner_id, title, format_time(&created_at)],
            )?;
        }

        let mut messages = Vec::new();
        if let Some(content) = initial_message {
            messages.push(self.append_message(&id, ChatRole::User, &content, None)?);
        }

        Ok(Conversation {
            id,
            owner_id: owner_id.to_string(),
            title,
            created_at,
            messages,
        })
    }

    /// Caller's conversations, newest first, messages in creation order
    pub fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>> {
        let mut conversations = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, title, created_at FROM conversations
                 WHERE owner_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map(params![owner_id], row_to_conversation)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        for conversation in &mut conversations {
            conversation.messages = self.messages(&conversation.id)?;
        }
        Ok(conversations)
    }

    /// Owner-scoped fetch with messages
    pub fn get_conversation(&self, owner_id: &str, id: &Uuid) -> Result<Option<Conversation>> {
        let conversation = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT id, owner_id, title, created_at FROM conversations
                 WHERE id = ?1 AND owner_id = ?2",
                params![id.to_string(), owner_id],
                row_to_conversation,
            )
            .optional()?
        };

        match conversation {
            Some(mut conversation) => {
                conversation.messages = self.messages(&conversation.id)?;
                Ok(Some(conversation))
            }
            None => Ok(None),
        }
    }

    /// Owner of a conversation, if it exists
    pub fn conversation_owner(&self, id: &Uuid) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT owner_id FROM conversations WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    /// Append one message to a conversation
    pub fn append_message(
        &self,
        conversation_id: &Uuid,
        role: ChatRole,
        content: &str,
        meta: Option<&serde_json::Value>,
    ) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: *conversation_id,
            role,
            content: content.to_string(),
            meta: meta.cloned(),
            created_at: Utc::now(),
        };

        let meta_json = message
            .meta
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (id, conversation_id, role, content, meta, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id.to_string(),
                conversation_id.to_string(),
                role.as_str(),
                message.content,
                meta_json,
                format_time(&message.created_at),
            ],
        )?;
        Ok(message)
    }

    /// Messages of a conversation in non-decreasing creation-time order
    pub fn messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, content, meta, created_at
             FROM messages WHERE conversation_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![conversation_id.to_string()], row_to_message)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Delete a conversation and its messages. Returns false when no owned
    /// row matched.
    pub fn delete_conversation(&self, owner_id: &str, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "DELETE FROM conversations WHERE id = ?1 AND owner_id = ?2",
            params![id.to_string(), owner_id],
        )?;
        Ok(changed > 0)
    }

    // ==================== Quizzes ====================

    /// Create a quiz and its questions in one transaction; no partial quiz is
    /// ever visible to readers.
    pub fn create_quiz(
        &self,
        owner_id: &str,
        title: &str,
        questions: &[NewQuestion],
    ) -> Result<Quiz> {
        let quiz_id = Uuid::new_v4();
        let created_at = Utc::now();

        let mut persisted = Vec::with_capacity(questions.len());
        {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO quizzes (id, owner_id, title, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![quiz_id.to_string(), owner_id, title, format_time(&created_at)],
            )?;

            for (idx, question) in questions.iter().enumerate() {
                let question_id = Uuid::new_v4();
                tx.execute(
                    "INSERT INTO questions (id, quiz_id, idx, question, answers, correct_index)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        question_id.to_string(),
                        quiz_id.to_string(),
                        idx as i64,
                        question.question,
                        serde_json::to_string(&question.answers)?,
                        question.correct_index as i64,
                    ],
                )?;
                persisted.push(Question {
                    id: question_id,
                    quiz_id,
                    idx: idx as u32,
                    question: question.question.clone(),
                    answers: question.answers.clone(),
                    correct_index: question.correct_index,
                });
            }

            tx.commit()?;
        }

        Ok(Quiz {
            id: quiz_id,
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            created_at,
            questions: persisted,
        })
    }

    /// Caller's quizzes, newest first, questions in ordinal order
    pub fn list_quizzes(&self, owner_id: &str) -> Result<Vec<Quiz>> {
        let mut quizzes = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, title, created_at FROM quizzes
                 WHERE owner_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map(params![owner_id], row_to_quiz)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        for quiz in &mut quizzes {
            quiz.questions = self.questions(&quiz.id)?;
        }
        Ok(quizzes)
    }

    /// Owner-scoped fetch with questions
    pub fn get_quiz(&self, owner_id: &str, id: &Uuid) -> Result<Option<Quiz>> {
        let quiz = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT id, owner_id, title, created_at FROM quizzes
                 WHERE id = ?1 AND owner_id = ?2",
                params![id.to_string(), owner_id],
                row_to_quiz,
            )
            .optional()?
        };

        match quiz {
            Some(mut quiz) => {
                quiz.questions = self.questions(&quiz.id)?;
                Ok(Some(quiz))
            }
            None => Ok(None),
        }
    }

    fn questions(&self, quiz_id: &Uuid) -> Result<Vec<Question>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, quiz_id, idx, question, answers, correct_index
             FROM questions WHERE quiz_id = ?1 ORDER BY idx ASC",
        )?;
        let rows = stmt.query_map(params![quiz_id.to_string()], row_to_question)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Update the title and/or replace the full question set (transactional).
    /// Returns None when no owned quiz matched.
    pub fn update_quiz(
        &self,
        owner_id: &str,
        id: &Uuid,
        title: Option<&str>,
        questions: Option<&[NewQuestion]>,
    ) -> Result<Option<Quiz>> {
        {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;

            let owned: Option<String> = tx
                .query_row(
                    "SELECT owner_id FROM quizzes WHERE id = ?1",
                    params![id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            match owned {
                Some(owner) if owner == owner_id => {}
                Some(_) => return Err(Error::NotAuthorized),
                None => return Ok(None),
            }

            if let Some(title) = title {
                tx.execute(
                    "UPDATE quizzes SET title = ?1 WHERE id = ?2",
                    params![title, id.to_string()],
                )?;
            }

            if let Some(questions) = questions {
                tx.execute(
                    "DELETE FROM questions WHERE quiz_id = ?1",
                    params![id.to_string()],
                )?;
                for (idx, question) in questions.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO questions (id, quiz_id, idx, question, answers, correct_index)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            Uuid::new_v4().to_string(),
                            id.to_string(),
                            idx as i64,
                            question.question,
                            serde_json::to_string(&question.answers)?,
                            question.correct_index as i64,
                        ],
                    )?;
                }
            }

            tx.commit()?;
        }

        self.get_quiz(owner_id, id)
    }

    /// Delete a quiz and its questions. Returns false when no owned row
    /// matched.
    pub fn delete_quiz(&self, owner_id: &str, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "DELETE FROM quizzes WHERE id = ?1 AND owner_id = ?2",
            params![id.to_string(), owner_id],
        )?;
        Ok(changed > 0)
    }
}

// ==================== Row mapping ====================

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(raw: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn parse_uuid(raw: &str, column: usize) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let id: String = row.get(0)?;
    let media_type: String = row.get(4)?;
    let uploaded_at: String = row.get(8)?;
    Ok(Document {
        id: parse_uuid(&id, 0)?,
        owner_id: row.get(1)?,
        filename: row.get(2)?,
        storage_key: row.get(3)?,
        media_type: MediaType::from_mime(&media_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown media type: {}", media_type).into(),
            )
        })?,
        size_bytes: row.get::<_, i64>(5)? as u64,
        content_hash: row.get(6)?,
        segment_count: row.get::<_, i64>(7)? as u32,
        uploaded_at: parse_time(&uploaded_at, 8)?,
    })
}

fn row_to_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(3)?;
    Ok(Conversation {
        id: parse_uuid(&id, 0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        created_at: parse_time(&created_at, 3)?,
        messages: Vec::new(),
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let id: String = row.get(0)?;
    let conversation_id: String = row.get(1)?;
    let role: String = row.get(2)?;
    let meta: Option<String> = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(Message {
        id: parse_uuid(&id, 0)?,
        conversation_id: parse_uuid(&conversation_id, 1)?,
        role: ChatRole::parse(&role).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown role: {}", role).into(),
            )
        })?,
        content: row.get(3)?,
        meta: meta.and_then(|m| serde_json::from_str(&m).ok()),
        created_at: parse_time(&created_at, 5)?,
    })
}

fn row_to_quiz(row: &Row<'_>) -> rusqlite::Result<Quiz> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(3)?;
    Ok(Quiz {
        id: parse_uuid(&id, 0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        created_at: parse_time(&created_at, 3)?,
        questions: Vec::new(),
    })
}

fn row_to_question(row: &Row<'_>) -> rusqlite::Result<Question> {
    let id: String = row.get(0)?;
    let quiz_id: String = row.get(1)?;
    let answers: String = row.get(4)?;
    Ok(Question {
        id: parse_uuid(&id, 0)?,
        quiz_id: parse_uuid(&quiz_id, 1)?,
        idx: row.get::<_, i64>(2)? as u32,
        question: row.get(3)?,
        answers: serde_json::from_str(&answers).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
        correct_index: row.get::<_, i64>(5)? as u32,
    })
}
