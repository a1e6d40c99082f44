use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::validate_text;

pub type QuestionId = u32;

/// Core question data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCore {
    /// The prompt shown to voters.
    pub text: String,
    /// When the question becomes visible. May lie in the future.
    pub pub_date: DateTime<Utc>,
}

impl QuestionCore {
    /// Create a new question, checking that the text is acceptable.
    pub fn new(text: impl Into<String>, pub_date: DateTime<Utc>) -> Result<Self> {
        let question = Self {
            text: text.into(),
            pub_date,
        };
        question.validate()?;
        Ok(question)
    }

    pub fn validate(&self) -> Result<()> {
        validate_text("Question", &self.text)
    }

    /// Was this question published within the day leading up to `now`?
    ///
    /// A question published exactly one day ago still counts, one published
    /// at `now` or later does not.
    pub fn was_published_recently_at(&self, now: DateTime<Utc>) -> bool {
        let age = now - self.pub_date;
        age > Duration::zero() && age <= Duration::days(1)
    }

    pub fn was_published_recently(&self) -> bool {
        self.was_published_recently_at(Utc::now())
    }

    /// Is this question visible to voters at `now`?
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.pub_date <= now
    }
}

/// A question from the store, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    #[serde(flatten)]
    pub question: QuestionCore,
}

impl Question {
    pub fn new(id: QuestionId, question: QuestionCore) -> Self {
        Self { id, question }
    }
}

impl Deref for Question {
    type Target = QuestionCore;

    fn deref(&self) -> &Self::Target {
        &self.question
    }
}

impl DerefMut for Question {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.question
    }
}


#[cfg(test)]
mod tests {
    use crate::error::Error;

    use super::*;

    fn published_at(pub_date: DateTime<Utc>) -> QuestionCore {
        QuestionCore::new("Is this recent?", pub_date).unwrap()
    }

    #[test]
    fn future_question_is_not_recent() {
        let now = Utc::now();
        let question = published_at(now + Duration::days(30));
        assert!(!question.was_published_recently_at(now));
        assert!(!question.is_published(now));

        let question = published_at(now + Duration::seconds(1));
        assert!(!question.was_published_recently_at(now));
        assert!(!question.is_published(now));
    }

    #[test]
    fn old_question_is_not_recent() {
        let now = Utc::now();
        let question = published_at(now - Duration::days(1) - Duration::seconds(1));
        assert!(!question.was_published_recently_at(now));
        assert!(question.is_published(now));

        let question = published_at(now - Duration::days(365));
        assert!(!question.was_published_recently_at(now));
    }

    #[test]
    fn recent_question_is_recent() {
        let now = Utc::now();
        let question =
            published_at(now - Duration::hours(23) - Duration::minutes(59) - Duration::seconds(59));
        assert!(question.was_published_recently_at(now));

        // Exactly one day old is still recent.
        let question = published_at(now - Duration::days(1));
        assert!(question.was_published_recently_at(now));

        let question = published_at(now - Duration::milliseconds(1));
        assert!(question.was_published_recently_at(now));
    }

    #[test]
    fn question_published_now_is_not_recent() {
        let now = Utc::now();
        let question = published_at(now);
        assert!(!question.was_published_recently_at(now));
        assert!(question.is_published(now));
    }

    #[test]
    fn bad_question_text() {
        let now = Utc::now();
        assert!(matches!(
            QuestionCore::new("", now),
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            QuestionCore::new("   ", now),
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            QuestionCore::new("q".repeat(201), now),
            Err(Error::BadRequest(_))
        ));
        assert!(QuestionCore::new("q".repeat(200), now).is_ok());
    }
}
