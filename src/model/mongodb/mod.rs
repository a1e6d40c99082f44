//! MongoDB persistence for the poll store.

mod collection;
mod counter;
mod document;
mod store;

pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{
    ensure_id_counters_exist, Counter, CHOICE_ID_COUNTER_ID, QUESTION_ID_COUNTER_ID,
};
pub use document::{ChoiceDocument, QuestionDocument};
pub use store::MongoStore;
