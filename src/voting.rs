//! Validating and applying a single vote.

use log::info;

use crate::error::{Error, Result};
use crate::model::{
    poll::{Choice, ChoiceId, Question, QuestionId},
    store::PollStore,
};

/// Shown on the detail page when a submission did not name a valid choice.
pub const NO_CHOICE_SELECTED: &str = "You didn't select a choice.";

/// The result of a vote submission for an existing question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote was counted; the choice is returned with its new tally.
    Recorded(Choice),
    /// The submission did not name one of the question's choices. Nothing was changed.
    Rejected(Question),
}

/// Apply a vote for `choice_id` on the given question.
///
/// The question must exist, otherwise this fails with [`Error::NotFound`]
/// before the submission is looked at. A missing choice and one that does not
/// belong to the question are treated the same way.
pub async fn cast_vote(
    store: &dyn PollStore,
    question_id: QuestionId,
    choice_id: Option<ChoiceId>,
) -> Result<VoteOutcome> {
    let question = store.question(question_id).await?;

    let choice_id = match choice_id {
        Some(choice_id) => choice_id,
        None => return Ok(VoteOutcome::Rejected(question)),
    };
    let choice = match store.choice(question_id, choice_id).await {
        Ok(choice) => choice,
        Err(Error::NotFound(_)) => return Ok(VoteOutcome::Rejected(question)),
        Err(err) => return Err(err),
    };

    let choice = store.increment_vote(choice.id).await?;
    info!(
        "Recorded vote for choice {} on question {question_id}",
        choice.id
    );
    Ok(VoteOutcome::Recorded(choice))
}
