use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::debug;
use rocket::{http::Status, tokio::sync::RwLock};

use crate::error::{Error, Result};
use crate::model::poll::{
    Choice, ChoiceCore, ChoiceId, NewChoice, NewQuestion, Question, QuestionId,
};

use super::PollStore;

/// A volatile store kept entirely in memory.
///
/// Every write takes the table lock, so vote increments can never be lost.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    questions: BTreeMap<QuestionId, Question>,
    // IDs are handed out in increasing order, so iteration order is creation order.
    choices: BTreeMap<ChoiceId, Choice>,
    last_question_id: QuestionId,
    last_choice_id: ChoiceId,
}

impl Tables {
    fn question(&self, id: QuestionId) -> Result<&Question> {
        self.questions
            .get(&id)
            .ok_or_else(|| Error::not_found(format!("Question {id}")))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl PollStore for MemoryStore {
    async fn recent_questions(
        &self,
        limit: usize,
        published_by: Option<DateTime<Utc>>,
    ) -> Result<Vec<Question>> {
        let tables = self.tables.read().await;
        let mut questions = tables
            .questions
            .values()
            .filter(|q| published_by.map_or(true, |cutoff| q.is_published(cutoff)))
            .cloned()
            .collect::<Vec<_>>();
        questions.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        questions.truncate(limit);
        Ok(questions)
    }

    async fn question(&self, id: QuestionId) -> Result<Question> {
        self.tables.read().await.question(id).cloned()
    }

    async fn choices(&self, question_id: QuestionId) -> Result<Vec<Choice>> {
        let tables = self.tables.read().await;
        Ok(tables
            .choices
            .values()
            .filter(|c| c.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn choice(&self, question_id: QuestionId, choice_id: ChoiceId) -> Result<Choice> {
        let tables = self.tables.read().await;
        tables
            .choices
            .get(&choice_id)
            .filter(|c| c.question_id == question_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Choice {choice_id} of question {question_id}")))
    }

    async fn increment_vote(&self, choice_id: ChoiceId) -> Result<Choice> {
        let mut tables = self.tables.write().await;
        let choice = tables
            .choices
            .get_mut(&choice_id)
            .ok_or_else(|| Error::not_found(format!("Choice {choice_id}")))?;
        choice.votes = choice.votes.checked_add(1).ok_or_else(|| {
            Error::Status(
                Status::InternalServerError,
                format!("Choice {choice_id} cannot hold any more votes"),
            )
        })?;
        debug!("Choice {choice_id} now has {} votes", choice.votes);
        Ok(choice.clone())
    }

    async fn insert_question(&self, question: NewQuestion) -> Result<Question> {
        question.validate()?;
        let mut tables = self.tables.write().await;
        tables.last_question_id += 1;
        let question = Question::new(tables.last_question_id, question);
        tables.questions.insert(question.id, question.clone());
        debug!("Inserted question {}", question.id);
        Ok(question)
    }

    async fn update_question(&self, id: QuestionId, question: NewQuestion) -> Result<Question> {
        question.validate()?;
        let mut tables = self.tables.write().await;
        let stored = tables
            .questions
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("Question {id}")))?;
        stored.question = question;
        Ok(stored.clone())
    }

    async fn delete_question(&self, id: QuestionId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.questions.remove(&id).is_none() {
            return Err(Error::not_found(format!("Question {id}")));
        }
        let before = tables.choices.len();
        tables.choices.retain(|_, c| c.question_id != id);
        debug!(
            "Deleted question {id} and {} choices",
            before - tables.choices.len()
        );
        Ok(())
    }

    async fn insert_choice(&self, question_id: QuestionId, choice: NewChoice) -> Result<Choice> {
        choice.validate()?;
        let mut tables = self.tables.write().await;
        tables.question(question_id)?;
        tables.last_choice_id += 1;
        let choice = Choice::new(tables.last_choice_id, ChoiceCore::new(question_id, choice));
        tables.choices.insert(choice.id, choice.clone());
        debug!("Inserted choice {} for question {question_id}", choice.id);
        Ok(choice)
    }

    async fn delete_choice(&self, choice_id: ChoiceId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .choices
            .remove(&choice_id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("Choice {choice_id}")))
    }
}
