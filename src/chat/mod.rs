//! Conversation assembly and the chat send flow
//!
//! A send persists the user turn first, then best-effort retrieves context
//! and asks the completion API for a reply. A failed reply is reported as a
//! tagged outcome instead of an error so the conversation keeps the
//! unanswered turn.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::completion::{CompletionClient, CompletionMessage};
use crate::retrieval::Retriever;
use crate::storage::Database;
use crate::types::chat::{ChatRole, Message, SendOutcome};
use uuid::Uuid;

const CONTEXT_PREAMBLE: &str = "You are a helpful assistant. Use the following context to answer \
                                the question as accurately as possible:";

/// Build the completion message sequence for a conversation turn.
///
/// A single system message carrying the retrieved context is prepended only
/// when the context is non-empty; with no context the history goes out as-is.
pub fn assemble(history: &[Message], context: &str) -> Vec<CompletionMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if !context.is_empty() {
        messages.push(CompletionMessage::system(format!(
            "{}\n\n{}",
            CONTEXT_PREAMBLE, context
        )));
    }
    for message in history {
        messages.push(match message.role {
            ChatRole::User => CompletionMessage::user(message.content.clone()),
            ChatRole::Assistant => CompletionMessage::assistant(message.content.clone()),
        });
    }
    messages
}

/// Chat service over the injected retriever and completion client
pub struct ChatService {
    db: Database,
    retriever: Arc<Retriever>,
    completion: Arc<dyn CompletionClient>,
    max_tokens: u32,
}

impl ChatService {
    pub fn new(
        db: Database,
        retriever: Arc<Retriever>,
        completion: Arc<dyn CompletionClient>,
        max_tokens: u32,
    ) -> Self {
        Self {
            db,
            retriever,
            completion,
            max_tokens,
        }
    }

    /// Send one user message in a conversation and attempt an assistant
    /// reply. The user message is persisted before any outbound call, so a
    /// completion failure leaves an unanswered turn rather than losing input.
    pub async fn send(
        &self,
        owner_id: &str,
        conversation_id: &Uuid,
        content: &str,
        meta: Option<&serde_json::Value>,
    ) -> Result<SendOutcome> {
        match self.db.conversation_owner(conversation_id)? {
            Some(owner) if owner == owner_id => {}
            Some(_) => return Err(Error::NotAuthorized),
            None => return Err(Error::NotFound("conversation".to_string())),
        }

        let user_message = self
            .db
            .append_message(conversation_id, ChatRole::User, content, meta)?;

        // A retrieval failure degrades to empty context; the send itself
        // must not die on a vector outage.
        let context = match self.retriever.retrieve(content, owner_id).await {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!("retrieval failed, continuing without context: {}", e);
                String::new()
            }
        };
        if !context.is_empty() {
            tracing::debug!("retrieved {} chars of context", context.len());
        }

        let history = self.db.messages(conversation_id)?;
        let messages = assemble(&history, &context);

        match self.completion.chat(&messages, self.max_tokens).await {
            Ok(reply_text) => {
                let reply =
                    self.db
                        .append_message(conversation_id, ChatRole::Assistant, &reply_text, None)?;
                Ok(SendOutcome::Sent {
                    user_message,
                    reply,
                })
            }
            Err(e) => {
                tracing::warn!("assistant reply failed for {}: {}", conversation_id, e);
                Ok(SendOutcome::SentButReplyFailed {
                    user_message,
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory_index::MemoryVectorIndex;
    use crate::providers::vector_index::{VectorIndex, VectorMetadata, VectorRecord};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Completion fake that records the messages it was called with
    struct ScriptedCompletion {
        reply: Result<String>,
        seen: Mutex<Vec<Vec<CompletionMessage>>>,
    }

    impl ScriptedCompletion {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(reason: &str) -> Self {
            Self {
                reply: Err(Error::Completion(reason.to_string())),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletion {
        async fn chat(&self, messages: &[CompletionMessage], _max_tokens: u32) -> Result<String> {
            self.seen.lock().push(messages.to_vec());
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(e) => Err(Error::Completion(e.to_string())),
            }
        }

        async fn chat_json(
            &self,
            messages: &[CompletionMessage],
            max_tokens: u32,
        ) -> Result<serde_json::Value> {
            let content = self.chat(messages, max_tokens).await?;
            serde_json::from_str(&content)
                .map_err(|e| Error::SchemaValidation(format!("not JSON: {}", e)))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    async fn seed_chunk(index: &MemoryVectorIndex, owner: &str, text: &str) {
        index
            .upsert(&VectorRecord {
                id: format!("{}/bio.txt::0", owner),
                text: text.to_string(),
                metadata: VectorMetadata {
                    storage_key: format!("{}/bio.txt", owner),
                    segment_index: 0,
                    owner_id: owner.to_string(),
                },
            })
            .await
            .unwrap();
    }

    fn service(
        db: &Database,
        index: Arc<MemoryVectorIndex>,
        completion: Arc<ScriptedCompletion>,
    ) -> ChatService {
        ChatService::new(
            db.clone(),
            Arc::new(Retriever::new(index, 5)),
            completion,
            1000,
        )
    }

    #[test]
    fn assemble_prepends_system_message_only_with_context() {
        let history = vec![Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            role: ChatRole::User,
            content: "What is photosynthesis?".into(),
            meta: None,
            created_at: chrono::Utc::now(),
        }];

        let with_context = assemble(&history, "Photosynthesis converts light to energy.");
        assert_eq!(with_context.len(), 2);
        assert_eq!(with_context[0].role, "system");
        assert!(with_context[0].content.contains("converts light to energy"));

        let without_context = assemble(&history, "");
        assert_eq!(without_context.len(), 1);
        assert_eq!(without_context[0].role, "user");
    }

    #[tokio::test]
    async fn send_appends_two_messages_on_success() {
        let db = Database::in_memory().unwrap();
        let index = Arc::new(MemoryVectorIndex::new());
        let completion = Arc::new(ScriptedCompletion::ok("It converts light to energy."));
        let service = service(&db, index, completion);

        let conversation = db.create_conversation("u1", None, None).unwrap();
        let outcome = service
            .send("u1", &conversation.id, "What is photosynthesis?", None)
            .await
            .unwrap();

        assert!(matches!(outcome, SendOutcome::Sent { .. }));
        let messages = db.messages(&conversation.id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn context_reaches_completion_before_the_call() {
        let db = Database::in_memory().unwrap();
        let index = Arc::new(MemoryVectorIndex::new());
        seed_chunk(&index, "u1", "Photosynthesis converts light to energy.").await;
        let completion = Arc::new(ScriptedCompletion::ok("Grounded answer."));
        let service = service(&db, index, completion.clone());

        let conversation = db.create_conversation("u1", None, None).unwrap();
        service
            .send("u1", &conversation.id, "What is photosynthesis?", None)
            .await
            .unwrap();

        let seen = completion.seen.lock();
        let messages = &seen[0];
        assert_eq!(messages[0].role, "system");
        assert!(messages[0]
            .content
            .contains("Photosynthesis converts light to energy."));
    }

    #[tokio::test]
    async fn owner_without_documents_gets_no_system_message() {
        let db = Database::in_memory().unwrap();
        let index = Arc::new(MemoryVectorIndex::new());
        // u1 has an indexed chunk, u2 does not
        seed_chunk(&index, "u1", "Photosynthesis converts light to energy.").await;
        let completion = Arc::new(ScriptedCompletion::ok("General answer."));
        let service = service(&db, index, completion.clone());

        let conversation = db.create_conversation("u2", None, None).unwrap();
        service
            .send("u2", &conversation.id, "What is photosynthesis?", None)
            .await
            .unwrap();

        let seen = completion.seen.lock();
        let messages = &seen[0];
        assert!(messages.iter().all(|m| m.role != "system"));
    }

    #[tokio::test]
    async fn failed_reply_keeps_user_message_and_reports_reason() {
        let db = Database::in_memory().unwrap();
        let index = Arc::new(MemoryVectorIndex::new());
        let completion = Arc::new(ScriptedCompletion::failing("upstream down"));
        let service = service(&db, index, completion);

        let conversation = db.create_conversation("u1", None, None).unwrap();
        let outcome = service
            .send("u1", &conversation.id, "Hello?", None)
            .await
            .unwrap();

        match outcome {
            SendOutcome::SentButReplyFailed { reason, .. } => {
                assert!(reason.contains("upstream down"));
            }
            SendOutcome::Sent { .. } => panic!("expected reply failure"),
        }
        // Exactly one message persisted: the unanswered user turn
        let messages = db.messages(&conversation.id).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::User);
    }

    #[tokio::test]
    async fn send_rejects_foreign_conversations() {
        let db = Database::in_memory().unwrap();
        let index = Arc::new(MemoryVectorIndex::new());
        let completion = Arc::new(ScriptedCompletion::ok("reply"));
        let service = service(&db, index, completion);

        let conversation = db.create_conversation("u1", None, None).unwrap();
        let err = service
            .send("u2", &conversation.id, "hi", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotAuthorized));
    }
}
