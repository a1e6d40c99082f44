use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::{validate_text, QuestionId};

pub type ChoiceId = u32;

/// A new choice as supplied by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChoice {
    pub text: String,
}

impl NewChoice {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let choice = Self { text: text.into() };
        choice.validate()?;
        Ok(choice)
    }

    pub fn validate(&self) -> Result<()> {
        validate_text("Choice", &self.text)
    }
}

/// Core choice data, including the running tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceCore {
    /// The question this choice answers. Choices never outlive their question.
    pub question_id: QuestionId,
    pub text: String,
    pub votes: u32,
}

impl ChoiceCore {
    /// A fresh choice for the given question, with no votes yet.
    pub fn new(question_id: QuestionId, choice: NewChoice) -> Self {
        Self {
            question_id,
            text: choice.text,
            votes: 0,
        }
    }
}

/// A choice from the store, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: ChoiceId,
    #[serde(flatten)]
    pub choice: ChoiceCore,
}

impl Choice {
    pub fn new(id: ChoiceId, choice: ChoiceCore) -> Self {
        Self { id, choice }
    }
}

impl Deref for Choice {
    type Target = ChoiceCore;

    fn deref(&self) -> &Self::Target {
        &self.choice
    }
}

impl DerefMut for Choice {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.choice
    }
}
