//! Quiz generation, validation, and grading
//!
//! Generation retrieves context for the topic, requests a JSON-constrained
//! completion, validates the draft strictly, and persists quiz plus
//! questions in one transaction. A validation failure aborts the whole
//! generation with nothing persisted.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::completion::{CompletionClient, CompletionMessage};
use crate::retrieval::Retriever;
use crate::storage::Database;
use crate::types::quiz::{GradeReport, NewQuestion, QuestionDraft, QuestionGrade, Quiz, QuizDraft};
use uuid::Uuid;

/// Minimum number of questions a generated quiz must carry
pub const MIN_QUESTIONS: usize = 10;
/// Exact number of candidate answers per question
pub const ANSWER_COUNT: usize = 4;

/// Quiz service over the injected retriever and completion client
pub struct QuizService {
    db: Database,
    retriever: Arc<Retriever>,
    completion: Arc<dyn CompletionClient>,
    max_tokens: u32,
}

impl QuizService {
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

    /// Generate a quiz on a topic, grounded in the owner's indexed documents
    pub async fn generate(&self, owner_id: &str, topic: &str) -> Result<Quiz> {
        let context = self.retriever.retrieve(topic, owner_id).await?;

        let prompt = build_prompt(topic, &context);
        let value = self
            .completion
            .chat_json(&[CompletionMessage::user(prompt)], self.max_tokens)
            .await?;

        let draft: QuizDraft = serde_json::from_value(value)
            .map_err(|e| Error::SchemaValidation(format!("quiz output does not match schema: {}", e)))?;
        let questions = validate_draft(&draft)?;

        tracing::info!(
            "generated quiz \"{}\" with {} questions for topic \"{}\"",
            draft.title,
            questions.len(),
            topic
        );
        self.db.create_quiz(owner_id, topic, &questions)
    }

    /// Persist a client-supplied quiz after per-question validation
    pub fn create(&self, owner_id: &str, draft: &QuizDraft) -> Result<Quiz> {
        if draft.title.trim().is_empty() {
            return Err(Error::SchemaValidation("quiz title is empty".to_string()));
        }
        let questions = validate_questions(&draft.questions)?;
        self.db.create_quiz(owner_id, &draft.title, &questions)
    }

    /// Grade an answer sheet against a stored quiz. `selected` holds the
    /// chosen answer index per question, `None` for unanswered ones.
    pub fn grade(&self, owner_id: &str, quiz_id: &Uuid, selected: &[Option<u32>]) -> Result<GradeReport> {
        let quiz = self
            .db
            .get_quiz(owner_id, quiz_id)?
            .ok_or_else(|| Error::NotFound("quiz".to_string()))?;

        let results: Vec<QuestionGrade> = quiz
            .questions
            .iter()
            .enumerate()
            .map(|(i, question)| {
                let selected_index = selected.get(i).copied().flatten();
                QuestionGrade {
                    idx: question.idx,
                    selected_index,
                    correct_index: question.correct_index,
                    correct: selected_index == Some(question.correct_index),
                }
            })
            .collect();

        Ok(GradeReport {
            quiz_id: quiz.id,
            total: results.len(),
            correct: results.iter().filter(|r| r.correct).count(),
            results,
        })
    }
}

/// Build the generation prompt. The retrieved context rides along only when
/// it is non-empty.
fn build_prompt(topic: &str, context: &str) -> String {
    let mut prompt = format!(
        "You are a professional quiz maker. Create a quiz about {topic}. \
         Respond with JSON ONLY, matching this shape exactly:\n\
         {{\"title\": string, \"questions\": [{{\"question\": string, \
         \"answers\": [string, string, string, string], \
         \"correct_answer\": string}}]}}\n\
         Produce at least {MIN_QUESTIONS} questions. Each question has exactly \
         {ANSWER_COUNT} distinct answers with exactly one correct, and \
         \"correct_answer\" must repeat one of the answer strings verbatim."
    );
    if !context.is_empty() {
        prompt.push_str("\n\nBase the questions on this material:\n\n");
        prompt.push_str(context);
    }
    prompt
}

/// Validate a generated quiz draft: generation demands at least
/// `MIN_QUESTIONS`, on top of the per-question rules.
pub fn validate_draft(draft: &QuizDraft) -> Result<Vec<NewQuestion>> {
    if draft.title.trim().is_empty() {
        return Err(Error::SchemaValidation("quiz title is empty".to_string()));
    }
    if draft.questions.len() < MIN_QUESTIONS {
        return Err(Error::SchemaValidation(format!(
            "quiz has {} questions, expected at least {}",
            draft.questions.len(),
            MIN_QUESTIONS
        )));
    }
    validate_questions(&draft.questions)
}

/// Validate a question set (client-supplied quizzes accept any non-empty
/// set).
///
/// The correct answer arrives as a string; it is converted to an index here,
/// and duplicate answer strings are rejected so the conversion is
/// unambiguous.
pub fn validate_questions(drafts: &[QuestionDraft]) -> Result<Vec<NewQuestion>> {
    if drafts.is_empty() {
        return Err(Error::SchemaValidation("quiz has no questions".to_string()));
    }

    let mut questions = Vec::with_capacity(drafts.len());
    for (i, question) in drafts.iter().enumerate() {
        if question.question.trim().is_empty() {
            return Err(Error::SchemaValidation(format!("question {} is empty", i)));
        }
        if question.answers.len() != ANSWER_COUNT {
            return Err(Error::SchemaValidation(format!(
                "question {} has {} answers, expected exactly {}",
                i,
                question.answers.len(),
                ANSWER_COUNT
            )));
        }
        for (a, answer) in question.answers.iter().enumerate() {
            if question.answers[..a].contains(answer) {
                return Err(Error::SchemaValidation(format!(
                    "question {} has duplicate answer \"{}\"",
                    i, answer
                )));
            }
        }
        let correct_index = question
            .answers
            .iter()
            .position(|a| a == &question.correct_answer)
            .ok_or_else(|| {
                Error::SchemaValidation(format!(
                    "question {} correct answer \"{}\" is not among its answers",
                    i, question.correct_answer
                ))
            })?;

        questions.push(NewQuestion {
            question: question.question.clone(),
            answers: question.answers.clone(),
            correct_index: correct_index as u32,
        });
    }

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory_index::MemoryVectorIndex;
    use async_trait::async_trait;

    fn draft_question(i: usize, correct: usize) -> QuestionDraft {
        let answers: Vec<String> = (0..4).map(|a| format!("answer {}-{}", i, a)).collect();
        QuestionDraft {
            question: format!("Question {}?", i),
            answers: answers.clone(),
            correct_answer: answers[correct].clone(),
        }
    }

    fn valid_draft(n: usize) -> QuizDraft {
        QuizDraft {
            title: "Biology".to_string(),
            questions: (0..n).map(|i| draft_question(i, i % 4)).collect(),
        }
    }

    #[test]
    fn valid_draft_converts_correct_answers_to_indices() {
        let questions = validate_draft(&valid_draft(10)).unwrap();
        assert_eq!(questions.len(), 10);
        for (i, question) in questions.iter().enumerate() {
            assert_eq!(question.correct_index as usize, i % 4);
        }
    }

    #[test]
    fn too_few_questions_fail_validation() {
        let err = validate_draft(&valid_draft(9)).unwrap_err();
        assert!(matches!(err, Error::SchemaValidation(_)));
    }

    #[test]
    fn wrong_answer_count_fails_validation() {
        let mut draft = valid_draft(10);
        draft.questions[3].answers.pop();
        assert!(matches!(
            validate_draft(&draft),
            Err(Error::SchemaValidation(_))
        ));
    }

    #[test]
    fn duplicate_answers_fail_validation() {
        let mut draft = valid_draft(10);
        draft.questions[2].answers[1] = draft.questions[2].answers[0].clone();
        assert!(matches!(
            validate_draft(&draft),
            Err(Error::SchemaValidation(_))
        ));
    }

    #[test]
    fn correct_answer_outside_answer_set_fails_validation() {
        let mut draft = valid_draft(10);
        draft.questions[5].correct_answer = "not an option".to_string();
        assert!(matches!(
            validate_draft(&draft),
            Err(Error::SchemaValidation(_))
        ));
    }

    struct JsonCompletion {
        body: String,
    }

    #[async_trait]
    impl CompletionClient for JsonCompletion {
        async fn chat(&self, _messages: &[CompletionMessage], _max_tokens: u32) -> Result<String> {
            Ok(self.body.clone())
        }

        async fn chat_json(
            &self,
            _messages: &[CompletionMessage],
            _max_tokens: u32,
        ) -> Result<serde_json::Value> {
            serde_json::from_str(&self.body)
                .map_err(|e| Error::SchemaValidation(format!("not JSON: {}", e)))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn service_with(db: &Database, body: String) -> QuizService {
        QuizService::new(
            db.clone(),
            Arc::new(Retriever::new(Arc::new(MemoryVectorIndex::new()), 5)),
            Arc::new(JsonCompletion { body }),
            4000,
        )
    }

    fn draft_json(n: usize) -> String {
        let questions: Vec<serde_json::Value> = (0..n)
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
        serde_json::json!({ "title": "Biology", "questions": questions }).to_string()
    }

    #[tokio::test]
    async fn generate_persists_a_validated_quiz() {
        let db = Database::in_memory().unwrap();
        let service = service_with(&db, draft_json(11));

        let quiz = service.generate("u1", "photosynthesis").await.unwrap();
        assert_eq!(quiz.owner_id, "u1");
        assert_eq!(quiz.questions.len(), 11);

        let stored = db.get_quiz("u1", &quiz.id).unwrap().unwrap();
        assert_eq!(stored.questions.len(), 11);
    }

    #[tokio::test]
    async fn schema_failure_persists_nothing() {
        let db = Database::in_memory().unwrap();
        // correct_answer field missing on one question
        let mut value: serde_json::Value = serde_json::from_str(&draft_json(10)).unwrap();
        value["questions"][4]
            .as_object_mut()
            .unwrap()
            .remove("correct_answer");
        let service = service_with(&db, value.to_string());

        let err = service.generate("u1", "photosynthesis").await.unwrap_err();
        assert!(matches!(err, Error::SchemaValidation(_)));
        assert!(db.list_quizzes("u1").unwrap().is_empty());
    }

    #[test]
    fn grading_compares_selected_indices() {
        let db = Database::in_memory().unwrap();
        let service = service_with(&db, String::new());
        let questions = validate_draft(&valid_draft(10)).unwrap();
        let quiz = db.create_quiz("u1", "Biology", &questions).unwrap();

        // First answer correct (correct_index 0), second wrong, rest blank
        let mut selected = vec![Some(0), Some(0)];
        selected.extend(std::iter::repeat(None).take(8));

        let report = service.grade("u1", &quiz.id, &selected).unwrap();
        assert_eq!(report.total, 10);
        assert_eq!(report.correct, 1);
        assert!(report.results[0].correct);
        assert!(!report.results[1].correct);
        assert_eq!(report.results[2].selected_index, None);
    }

    #[test]
    fn grading_foreign_quiz_is_not_found() {
        let db = Database::in_memory().unwrap();
        let service = service_with(&db, String::new());
        let questions = validate_draft(&valid_draft(10)).unwrap();
        let quiz = db.create_quiz("u1", "Biology", &questions).unwrap();

        assert!(matches!(
            service.grade("u2", &quiz.id, &[]),
            Err(Error::NotFound(_))
        ));
    }
}
