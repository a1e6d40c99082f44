//! The poll store: durable storage and retrieval of questions and choices.
//!
//! Handlers never talk to a database directly; they receive a [`Store`] from
//! managed state, which wraps whichever [`PollStore`] the server was built with.

use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::Result;
use crate::model::poll::{Choice, ChoiceId, NewChoice, NewQuestion, Question, QuestionId};

mod memory;
pub use memory::MemoryStore;

#[rocket::async_trait]
pub trait PollStore: Send + Sync {
    /// Questions by descending publication date, at most `limit` of them.
    ///
    /// If `published_by` is given, questions published after it are left out.
    async fn recent_questions(
        &self,
        limit: usize,
        published_by: Option<DateTime<Utc>>,
    ) -> Result<Vec<Question>>;

    async fn question(&self, id: QuestionId) -> Result<Question>;

    /// All choices of the question, in creation order.
    async fn choices(&self, question_id: QuestionId) -> Result<Vec<Choice>>;

    /// The choice with the given ID, provided it belongs to the given question.
    async fn choice(&self, question_id: QuestionId, choice_id: ChoiceId) -> Result<Choice>;

    /// Atomically add one vote to the choice, returning its new state.
    async fn increment_vote(&self, choice_id: ChoiceId) -> Result<Choice>;

    async fn insert_question(&self, question: NewQuestion) -> Result<Question>;

    /// Replace the text and publication date of an existing question.
    async fn update_question(&self, id: QuestionId, question: NewQuestion) -> Result<Question>;

    /// Delete the question along with all of its choices.
    async fn delete_question(&self, id: QuestionId) -> Result<()>;

    async fn insert_choice(&self, question_id: QuestionId, choice: NewChoice) -> Result<Choice>;

    async fn delete_choice(&self, choice_id: ChoiceId) -> Result<()>;
}

/// A shared handle on the poll store the server was built with.
#[derive(Clone)]
pub struct Store(Arc<dyn PollStore>);

impl Store {
    pub fn new(store: impl PollStore + 'static) -> Self {
        Self(Arc::new(store))
    }
}

impl Deref for Store {
    type Target = dyn PollStore;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Store {
    type Error = ();

    /// Get the store from the managed state.
    ///
    /// Fails with a 500 if no [`Store`] is managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        req.guard::<&State<Store>>()
            .await
            .map(|store| store.inner().clone())
    }
}
