use chrono::{DateTime, Utc};
use log::{debug, info};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::poll::{
    Choice, ChoiceCore, ChoiceId, NewChoice, NewQuestion, Question, QuestionId,
};
use crate::model::store::PollStore;

use super::document::{db_precision, id_filter};
use super::{
    ensure_id_counters_exist, ensure_indexes_exist, ChoiceDocument, Coll, Counter,
    QuestionDocument, CHOICE_ID_COUNTER_ID, QUESTION_ID_COUNTER_ID,
};

/// A poll store backed by a MongoDB database.
///
/// Cascading deletes use multi-document transactions, so the server must be
/// part of a replica set.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    questions: Coll<QuestionDocument>,
    choices: Coll<ChoiceDocument>,
    counters: Coll<Counter>,
}

impl MongoStore {
    /// Connect to the given database and prepare it for use.
    pub async fn connect(db_uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(db_uri).await?;
        let db = client.database(db_name);
        Self::initialise(client, &db).await
    }

    /// Ensure the required indexes and ID counters exist, then wrap the database.
    ///
    /// This operation is idempotent.
    pub async fn initialise(client: Client, db: &Database) -> Result<Self> {
        ensure_indexes_exist(db).await?;
        let counters = Coll::from_db(db);
        ensure_id_counters_exist(&counters).await?;
        info!("Using database {}", db.name());
        Ok(Self {
            client,
            questions: Coll::from_db(db),
            choices: Coll::from_db(db),
            counters,
        })
    }
}

fn choice_filter(question_id: QuestionId, choice_id: ChoiceId) -> mongodb::bson::Document {
    doc! {
        "_id": i64::from(choice_id),
        "question_id": i64::from(question_id),
    }
}

#[rocket::async_trait]
impl PollStore for MongoStore {
    async fn recent_questions(
        &self,
        limit: usize,
        published_by: Option<DateTime<Utc>>,
    ) -> Result<Vec<Question>> {
        // A limit of zero means "no limit" to MongoDB.
        if limit == 0 {
            return Ok(Vec::new());
        }
        let filter = match published_by {
            Some(cutoff) => doc! {
                "pub_date": { "$lte": BsonDateTime::from_chrono(cutoff) }
            },
            None => doc! {},
        };
        let options = FindOptions::builder()
            .sort(doc! { "pub_date": -1, "_id": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .build();
        let questions = self
            .questions
            .find(filter, options)
            .await?
            .map_ok(Question::from)
            .try_collect()
            .await?;
        Ok(questions)
    }

    async fn question(&self, id: QuestionId) -> Result<Question> {
        self.questions
            .find_one(id_filter(id), None)
            .await?
            .map(Question::from)
            .ok_or_else(|| Error::not_found(format!("Question {id}")))
    }

    async fn choices(&self, question_id: QuestionId) -> Result<Vec<Choice>> {
        let filter = doc! { "question_id": i64::from(question_id) };
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let choices = self
            .choices
            .find(filter, options)
            .await?
            .map_ok(Choice::from)
            .try_collect()
            .await?;
        Ok(choices)
    }

    async fn choice(&self, question_id: QuestionId, choice_id: ChoiceId) -> Result<Choice> {
        self.choices
            .find_one(choice_filter(question_id, choice_id), None)
            .await?
            .map(Choice::from)
            .ok_or_else(|| Error::not_found(format!("Choice {choice_id} of question {question_id}")))
    }

    async fn increment_vote(&self, choice_id: ChoiceId) -> Result<Choice> {
        // A single `$inc` is atomic on the document, so concurrent votes are never lost.
        let update = doc! {
            "$inc": { "votes": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let choice = self
            .choices
            .find_one_and_update(id_filter(choice_id), update, options)
            .await?
            .map(Choice::from)
            .ok_or_else(|| Error::not_found(format!("Choice {choice_id}")))?;
        debug!("Choice {choice_id} now has {} votes", choice.votes);
        Ok(choice)
    }

    async fn insert_question(&self, question: NewQuestion) -> Result<Question> {
        question.validate()?;
        let id = Counter::next(&self.counters, QUESTION_ID_COUNTER_ID).await?;
        let document = QuestionDocument::new(id, question);
        self.questions.insert_one(&document, None).await?;
        debug!("Inserted question {id}");
        Ok(document.into())
    }

    async fn update_question(&self, id: QuestionId, question: NewQuestion) -> Result<Question> {
        question.validate()?;
        let update = doc! {
            "$set": {
                "text": question.text,
                "pub_date": BsonDateTime::from_chrono(db_precision(question.pub_date)),
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.questions
            .find_one_and_update(id_filter(id), update, options)
            .await?
            .map(Question::from)
            .ok_or_else(|| Error::not_found(format!("Question {id}")))
    }

    async fn delete_question(&self, id: QuestionId) -> Result<()> {
        // Atomically delete the question and all of its choices.
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = self
            .questions
            .delete_one_with_session(id_filter(id), None, &mut session)
            .await?;
        if result.deleted_count == 0 {
            session.abort_transaction().await?;
            return Err(Error::not_found(format!("Question {id}")));
        }

        let filter = doc! { "question_id": i64::from(id) };
        let result = self
            .choices
            .delete_many_with_session(filter, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        debug!(
            "Deleted question {id} and {} choices",
            result.deleted_count
        );
        Ok(())
    }

    async fn insert_choice(&self, question_id: QuestionId, choice: NewChoice) -> Result<Choice> {
        choice.validate()?;
        let id = Counter::next(&self.counters, CHOICE_ID_COUNTER_ID).await?;
        let document = ChoiceDocument::new(id, ChoiceCore::new(question_id, choice));

        // Writing to the question makes this transaction conflict with a
        // concurrent `delete_question`.
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let update = doc! {
            "$inc": { "revision": 1 }
        };
        let owner = self
            .questions
            .find_one_and_update_with_session(id_filter(question_id), update, None, &mut session)
            .await?;
        if owner.is_none() {
            session.abort_transaction().await?;
            return Err(Error::not_found(format!("Question {question_id}")));
        }

        self.choices
            .insert_one_with_session(&document, None, &mut session)
            .await?;
        session.commit_transaction().await?;
        debug!("Inserted choice {id} for question {question_id}");
        Ok(document.into())
    }

    async fn delete_choice(&self, choice_id: ChoiceId) -> Result<()> {
        let result = self.choices.delete_one(id_filter(choice_id), None).await?;
        if result.deleted_count == 0 {
            return Err(Error::not_found(format!("Choice {choice_id}")));
        }
        Ok(())
    }
}
