use mongodb::{
    bson::{doc, Document},
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::Coll;

/// ID of the counter that hands out question IDs.
pub const QUESTION_ID_COUNTER_ID: &str = "question_id";

/// ID of the counter that hands out choice IDs.
pub const CHOICE_ID_COUNTER_ID: &str = "choice_id";

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options: FindOneAndUpdateOptions = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(counter_filter(id), update, options)
            .await?
            .ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    format!("Failed to find counter with ID {id}"),
                )
            })?;
        Ok(counter.next)
    }
}

fn counter_filter(id: &str) -> Document {
    doc! { "_id": id }
}

/// Ensure that the question and choice ID counters exist, creating them
/// starting at 1 if they do not. Existing counters are left untouched.
pub async fn ensure_id_counters_exist(counters: &Coll<Counter>) -> std::result::Result<(), DbError> {
    let upsert = UpdateOptions::builder().upsert(true).build();
    for id in [QUESTION_ID_COUNTER_ID, CHOICE_ID_COUNTER_ID] {
        let update = doc! {
            "$setOnInsert": { "next": 1_i64 }
        };
        counters
            .update_one(counter_filter(id), update, upsert.clone())
            .await?;
    }
    Ok(())
}
