//! Questions and the choices that answer them.

use crate::error::{Error, Result};

mod choice;
pub use choice::{Choice, ChoiceCore, ChoiceId, NewChoice};

mod question;
pub use question::{Question, QuestionCore, QuestionId};

/// A new question ready for storage is just a [`Question`] without an ID, i.e. a `QuestionCore`.
pub type NewQuestion = QuestionCore;

/// Maximum length of question and choice text, in characters.
pub const MAX_TEXT_LEN: usize = 200;

fn validate_text(what: &str, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::BadRequest(format!("{what} text must not be empty")));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(Error::BadRequest(format!(
            "{what} text must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(())
}
