//! Page definitions: which template renders which query.

use chrono::{DateTime, Utc};
use rocket::serde::json::json;
use rocket_dyn_templates::{context, Template};

use crate::error::{Error, Result};
use crate::model::{
    poll::{Question, QuestionId},
    store::PollStore,
};

/// A page listing the most recent questions.
#[derive(Debug, Clone, Copy)]
pub struct ListView {
    pub template: &'static str,
    /// The name the list is given in the template context.
    pub context_name: &'static str,
    /// Shown instead of the list when there is nothing to list.
    pub empty_message: &'static str,
}

/// A page about a single question and its choices.
#[derive(Debug, Clone, Copy)]
pub struct DetailView {
    pub template: &'static str,
    /// Respond as if questions published in the future do not exist.
    pub hide_unpublished: bool,
}

pub const INDEX_VIEW: ListView = ListView {
    template: "polls/index",
    context_name: "latest_question_list",
    empty_message: "No polls are available.",
};

pub const DETAIL_VIEW: DetailView = DetailView {
    template: "polls/detail",
    hide_unpublished: true,
};

pub const RESULTS_VIEW: DetailView = DetailView {
    template: "polls/results",
    hide_unpublished: false,
};

impl ListView {
    /// Render up to `limit` questions published by `now`, newest first.
    pub async fn render(
        &self,
        store: &dyn PollStore,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Template> {
        let questions = store.recent_questions(limit, Some(now)).await?;
        let mut context = json!({ "empty_message": self.empty_message });
        context[self.context_name] = json!(questions);
        Ok(Template::render(self.template, context))
    }
}

impl DetailView {
    /// Look up a question, applying this view's visibility rule.
    pub async fn find(
        &self,
        store: &dyn PollStore,
        id: QuestionId,
        now: DateTime<Utc>,
    ) -> Result<Question> {
        let question = store.question(id).await?;
        if self.hide_unpublished && !question.is_published(now) {
            return Err(Error::not_found(format!("Question {id}")));
        }
        Ok(question)
    }

    /// Render the question with its choices and an optional error message.
    pub async fn render(
        &self,
        store: &dyn PollStore,
        question: Question,
        error_message: Option<&str>,
    ) -> Result<Template> {
        let choices = store.choices(question.id).await?;
        Ok(Template::render(
            self.template,
            context! {
                question: &question,
                choices: &choices,
                error_message,
            },
        ))
    }
}
