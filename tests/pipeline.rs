//! End-to-end pipeline tests over in-memory providers: upload bytes flow
//! through extraction, chunking, and indexing, then chat and quiz requests
//! retrieve owner-scoped context from the same index.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use kolos::chat::ChatService;
use kolos::config::{ChunkingConfig, ExtractionConfig};
use kolos::error::{Error, Result};
use kolos::extraction::{Extractor, TextChunker};
use kolos::index::Indexer;
use kolos::providers::{
    CompletionClient, CompletionMessage, MemoryVectorIndex, VectorIndex,
};
use kolos::quiz::QuizService;
use kolos::retrieval::Retriever;
use kolos::storage::Database;
use kolos::types::chat::{ChatRole, SendOutcome};
use kolos::types::document::{Document, MediaType};

/// Completion fake that records every request it sees
struct RecordingCompletion {
    reply: String,
    calls: Mutex<Vec<Vec<CompletionMessage>>>,
}

impl RecordingCompletion {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CompletionClient for RecordingCompletion {
    async fn chat(&self, messages: &[CompletionMessage], _max_tokens: u32) -> Result<String> {
        self.calls.lock().push(messages.to_vec());
        Ok(self.reply.clone())
    }

    async fn chat_json(
        &self,
        messages: &[CompletionMessage],
        _max_tokens: u32,
    ) -> Result<serde_json::Value> {
        self.calls.lock().push(messages.to_vec());
        serde_json::from_str(&self.reply)
            .map_err(|e| Error::SchemaValidation(format!("completion output is not valid JSON: {}", e)))
    }

    fn model(&self) -> &str {
        "recording"
    }
}

struct Harness {
    db: Database,
    vector: Arc<MemoryVectorIndex>,
    extractor: Extractor,
    chunker: TextChunker,
}

impl Harness {
    fn new() -> Self {
        Self {
            db: Database::in_memory().unwrap(),
            vector: Arc::new(MemoryVectorIndex::new()),
            extractor: Extractor::new(&ExtractionConfig::default()),
            chunker: TextChunker::new(&ChunkingConfig::default()),
        }
    }

    fn indexer(&self) -> Indexer {
        Indexer::new(self.vector.clone(), self.db.clone(), 4)
    }

    fn retriever(&self) -> Arc<Retriever> {
        Arc::new(Retriever::new(self.vector.clone(), 5))
    }

    /// The upload path: extract, register, chunk, index
    async fn upload_text(&self, owner: &str, filename: &str, bytes: &[u8]) -> Document {
        let extracted = self.extractor.extract(bytes, MediaType::Text).await.unwrap();
        let mut doc = Document {
            id: Uuid::new_v4(),
            owner_id: owner.to_string(),
            filename: filename.to_string(),
            storage_key: Document::storage_key_for(owner, filename),
            media_type: MediaType::Text,
            size_bytes: bytes.len() as u64,
            content_hash: extracted.content_hash(),
            segment_count: 0,
            uploaded_at: chrono::Utc::now(),
        };
        self.db.create_document(&doc).unwrap();

        let chunks = self.chunker.chunk_segments(&extracted.segments);
        let report = self.indexer().index_document(&doc, &chunks).await.unwrap();
        assert!(report.is_complete());
        doc.segment_count = chunks.len() as u32;
        doc
    }
}

#[tokio::test]
async fn one_page_upload_indexes_exactly_one_owned_chunk() {
    let harness = Harness::new();
    harness
        .upload_text(
            "u1",
            "photo.txt",
            b"Photosynthesis converts light to energy.",
        )
        .await;

    assert_eq!(harness.vector.len(), 1);
    let matches = harness
        .vector
        .query("photosynthesis", 5, Some("u1"))
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "u1/photo.txt::0");
    assert_eq!(matches[0].text, "Photosynthesis converts light to energy.");
    assert_eq!(matches[0].metadata.owner_id, "u1");
}

#[tokio::test]
async fn chat_send_is_grounded_in_the_indexed_chunk() {
    let harness = Harness::new();
    harness
        .upload_text(
            "u1",
            "photo.txt",
            b"Photosynthesis converts light to energy.",
        )
        .await;

    let completion = RecordingCompletion::new("It converts light to energy.");
    let chat = ChatService::new(
        harness.db.clone(),
        harness.retriever(),
        completion.clone(),
        1000,
    );

    let conversation = harness.db.create_conversation("u1", None, None).unwrap();
    let outcome = chat
        .send("u1", &conversation.id, "What is photosynthesis?", None)
        .await
        .unwrap();
    assert!(matches!(outcome, SendOutcome::Sent { .. }));

    // The retrieved context reached the completion as a system message
    // before the call was issued.
    let calls = completion.calls.lock();
    let messages = &calls[0];
    assert_eq!(messages[0].role, "system");
    assert!(messages[0]
        .content
        .contains("Photosynthesis converts light to energy."));

    let persisted = harness.db.messages(&conversation.id).unwrap();
    assert_eq!(persisted.len(), 2);
    assert_eq!(persisted[0].role, ChatRole::User);
    assert_eq!(persisted[1].role, ChatRole::Assistant);
}

#[tokio::test]
async fn owner_without_documents_chats_without_context() {
    let harness = Harness::new();
    // u1's document is indexed; u2 asks the same question
    harness
        .upload_text(
            "u1",
            "photo.txt",
            b"Photosynthesis converts light to energy.",
        )
        .await;

    let context = harness
        .retriever()
        .retrieve("What is photosynthesis?", "u2")
        .await
        .unwrap();
    assert_eq!(context, "");

    let completion = RecordingCompletion::new("A general answer.");
    let chat = ChatService::new(
        harness.db.clone(),
        harness.retriever(),
        completion.clone(),
        1000,
    );
    let conversation = harness.db.create_conversation("u2", None, None).unwrap();
    chat.send("u2", &conversation.id, "What is photosynthesis?", None)
        .await
        .unwrap();

    let calls = completion.calls.lock();
    assert!(calls[0].iter().all(|m| m.role != "system"));
}

#[tokio::test]
async fn quiz_generation_schema_failure_persists_no_quiz() {
    let harness = Harness::new();

    // Ten questions, one missing its correct_answer field
    let mut questions: Vec<serde_json::Value> = (0..10)
        .map(|i| {
            serde_json::json!({
                "question": format!("Question {}?", i),
                "answers": [
                    format!("a{}", i), format!("b{}", i),
                    format!("c{}", i), format!("d{}", i)
                ],
                "correct_answer": format!("a{}", i),
            })
        })
        .collect();
    questions[6].as_object_mut().unwrap().remove("correct_answer");
    let body = serde_json::json!({ "title": "Biology", "questions": questions }).to_string();

    let quiz = QuizService::new(
        harness.db.clone(),
        harness.retriever(),
        RecordingCompletion::new(&body),
        4000,
    );

    let err = quiz.generate("u1", "photosynthesis").await.unwrap_err();
    assert!(matches!(err, Error::SchemaValidation(_)));
    assert!(harness.db.list_quizzes("u1").unwrap().is_empty());
}

#[tokio::test]
async fn reupload_replaces_chunks_without_duplicates() {
    let harness = Harness::new();
    harness
        .upload_text("u1", "notes.txt", b"First version about photosynthesis.")
        .await;

    // Replace the registration before re-ingesting the same key
    let existing = harness
        .db
        .find_document_by_key("u1", "u1/notes.txt")
        .unwrap()
        .unwrap();
    harness.db.delete_document_row("u1", &existing.id).unwrap();

    harness
        .upload_text("u1", "notes.txt", b"Second version about photosynthesis.")
        .await;

    assert_eq!(harness.vector.len(), 1);
    let matches = harness
        .vector
        .query("photosynthesis", 5, Some("u1"))
        .await
        .unwrap();
    assert!(matches[0].text.contains("Second version"));
}

#[tokio::test]
async fn two_owners_never_see_each_others_chunks() {
    let harness = Harness::new();
    harness
        .upload_text("u1", "a.txt", b"Photosynthesis converts light to energy.")
        .await;
    harness
        .upload_text("u2", "b.txt", b"Photosynthesis converts light to energy.")
        .await;

    let context_a = harness
        .retriever()
        .retrieve("photosynthesis", "u1")
        .await
        .unwrap();
    assert!(context_a.contains("Photosynthesis"));
    assert!(!context_a.contains("\n---\n"), "only the owner's single chunk");

    let matches = harness
        .vector
        .query("photosynthesis", 5, Some("u1"))
        .await
        .unwrap();
    assert!(matches.iter().all(|m| m.metadata.owner_id == "u1"));
}
