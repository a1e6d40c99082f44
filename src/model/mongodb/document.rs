//! DB-compatible forms of the poll types.
//!
//! These differ from the types in [`crate::model::poll`] only in how they are
//! serialised: IDs live in `_id` and timestamps use MongoDB's own datetime
//! format, so that they sort correctly.

use chrono::{DateTime, Utc};
use mongodb::bson::{
    doc, serde_helpers::chrono_datetime_as_bson_datetime, DateTime as BsonDateTime, Document,
};
use serde::{Deserialize, Serialize};

use crate::model::poll::{
    Choice, ChoiceCore, ChoiceId, NewQuestion, Question, QuestionCore, QuestionId,
};

/// A filter matching the document with the given numeric ID.
pub fn id_filter(id: u32) -> Document {
    doc! { "_id": i64::from(id) }
}

/// Truncate a timestamp to the millisecond precision MongoDB stores.
pub fn db_precision(time: DateTime<Utc>) -> DateTime<Utc> {
    BsonDateTime::from_chrono(time).to_chrono()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDocument {
    #[serde(rename = "_id")]
    pub id: QuestionId,
    pub text: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub pub_date: DateTime<Utc>,
}

impl QuestionDocument {
    pub fn new(id: QuestionId, question: NewQuestion) -> Self {
        Self {
            id,
            text: question.text,
            pub_date: db_precision(question.pub_date),
        }
    }
}

impl From<QuestionDocument> for Question {
    fn from(document: QuestionDocument) -> Self {
        Question::new(
            document.id,
            QuestionCore {
                text: document.text,
                pub_date: document.pub_date,
            },
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceDocument {
    #[serde(rename = "_id")]
    pub id: ChoiceId,
    pub question_id: QuestionId,
    pub text: String,
    pub votes: u32,
}

impl ChoiceDocument {
    pub fn new(id: ChoiceId, choice: ChoiceCore) -> Self {
        Self {
            id,
            question_id: choice.question_id,
            text: choice.text,
            votes: choice.votes,
        }
    }
}

impl From<ChoiceDocument> for Choice {
    fn from(document: ChoiceDocument) -> Self {
        Choice::new(
            document.id,
            ChoiceCore {
                question_id: document.question_id,
                text: document.text,
                votes: document.votes,
            },
        )
    }
}
