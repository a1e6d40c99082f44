use chrono::Utc;
use log::info;
use rocket::{form::Form, response::Redirect, Route, State};
use rocket_dyn_templates::Template;

use crate::config::Config;
use crate::error::Result;
use crate::logging::RequestId;
use crate::model::{
    poll::{ChoiceId, QuestionId},
    store::Store,
};
use crate::voting::{cast_vote, VoteOutcome, NO_CHOICE_SELECTED};

use super::views::{DETAIL_VIEW, INDEX_VIEW, RESULTS_VIEW};

pub fn routes() -> Vec<Route> {
    routes![index, detail, results, vote]
}

#[get("/polls")]
async fn index(store: Store, config: &State<Config>) -> Result<Template> {
    INDEX_VIEW
        .render(&*store, config.recent_questions(), Utc::now())
        .await
}

#[get("/polls/<question_id>")]
async fn detail(question_id: QuestionId, store: Store) -> Result<Template> {
    let question = DETAIL_VIEW.find(&*store, question_id, Utc::now()).await?;
    DETAIL_VIEW.render(&*store, question, None).await
}

#[get("/polls/<question_id>/results")]
async fn results(question_id: QuestionId, store: Store) -> Result<Template> {
    let question = RESULTS_VIEW.find(&*store, question_id, Utc::now()).await?;
    RESULTS_VIEW.render(&*store, question, None).await
}

/// The body of a vote form. A value that does not parse as an ID counts as absent.
#[derive(Debug, FromForm)]
struct VoteSubmission {
    choice: Option<ChoiceId>,
}

#[derive(Responder)]
enum VoteResponse {
    /// See other: the results page.
    Recorded(Redirect),
    /// The detail page again, with an error message.
    Rejected(Template),
}

#[post("/polls/<question_id>/vote", data = "<submission>")]
async fn vote(
    question_id: QuestionId,
    submission: Option<Form<VoteSubmission>>,
    store: Store,
    request_id: &RequestId,
) -> Result<VoteResponse> {
    let choice_id = submission.and_then(|submission| submission.into_inner().choice);

    match cast_vote(&*store, question_id, choice_id).await? {
        VoteOutcome::Recorded(_) => Ok(VoteResponse::Recorded(Redirect::to(uri!(results(
            question_id
        ))))),
        VoteOutcome::Rejected(question) => {
            info!("req{request_id} rejected vote {choice_id:?} on question {question_id}");
            DETAIL_VIEW
                .render(&*store, question, Some(NO_CHOICE_SELECTED))
                .await
                .map(VoteResponse::Rejected)
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::futures::future::join_all;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;

    use chrono::DateTime;

    use crate::error::Error;
    use crate::model::poll::{Choice, NewChoice, NewQuestion, Question, QuestionCore};
    use crate::model::store::{MemoryStore, PollStore};

    use super::*;

    const EMPTY_MESSAGE: &str = "No polls are available.";

    async fn create_question(store: &Store, text: &str, days: i64) -> Question {
        store
            .insert_question(QuestionCore::days_from_now(text, days))
            .await
            .unwrap()
    }

    async fn create_poll(store: &Store, text: &str, days: i64) -> (Question, Choice, Choice) {
        let question = create_question(store, text, days).await;
        let a = store
            .insert_choice(question.id, NewChoice::example1())
            .await
            .unwrap();
        let b = store
            .insert_choice(question.id, NewChoice::example2())
            .await
            .unwrap();
        (question, a, b)
    }

    async fn votes(store: &Store, question_id: QuestionId) -> Vec<u32> {
        store
            .choices(question_id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.votes)
            .collect()
    }

    async fn get_page(client: &Client, uri: &str) -> (Status, String) {
        let response = client.get(uri).dispatch().await;
        let status = response.status();
        (status, response.into_string().await.unwrap_or_default())
    }

    async fn post_vote(
        client: &Client,
        question_id: QuestionId,
        body: String,
    ) -> (Status, String, Option<String>) {
        let response = client
            .post(uri!(vote(question_id)))
            .header(ContentType::Form)
            .body(body)
            .dispatch()
            .await;
        let status = response.status();
        let location = response.headers().get_one("Location").map(str::to_string);
        (status, response.into_string().await.unwrap_or_default(), location)
    }

    #[backend_test]
    async fn index_without_questions(client: Client) {
        let (status, body) = get_page(&client, &uri!(index).to_string()).await;
        assert_eq!(Status::Ok, status);
        assert!(body.contains(EMPTY_MESSAGE));
    }

    #[backend_test]
    async fn index_shows_past_question(client: Client, store: Store) {
        create_question(&store, "Past question.", -30).await;

        let (status, body) = get_page(&client, &uri!(index).to_string()).await;
        assert_eq!(Status::Ok, status);
        assert!(body.contains("Past question."));
        assert!(!body.contains(EMPTY_MESSAGE));
    }

    #[backend_test]
    async fn index_hides_future_question(client: Client, store: Store) {
        create_question(&store, "Future question.", 30).await;

        let (status, body) = get_page(&client, &uri!(index).to_string()).await;
        assert_eq!(Status::Ok, status);
        assert!(body.contains(EMPTY_MESSAGE));
        assert!(!body.contains("Future question."));
    }

    #[backend_test]
    async fn index_with_future_and_past_questions(client: Client, store: Store) {
        create_question(&store, "Past question.", -30).await;
        create_question(&store, "Future question.", 30).await;

        let (_, body) = get_page(&client, &uri!(index).to_string()).await;
        assert!(body.contains("Past question."));
        assert!(!body.contains("Future question."));
    }

    #[backend_test]
    async fn index_lists_newest_first(client: Client, store: Store) {
        create_question(&store, "Past question 1.", -30).await;
        create_question(&store, "Past question 2.", -5).await;

        let (_, body) = get_page(&client, &uri!(index).to_string()).await;
        let first = body.find("Past question 2.").unwrap();
        let second = body.find("Past question 1.").unwrap();
        assert!(first < second);
    }

    #[backend_test]
    async fn index_lists_at_most_five(client: Client, store: Store) {
        for n in 1..=6 {
            create_question(&store, &format!("Question {n}."), -n).await;
        }

        let (_, body) = get_page(&client, &uri!(index).to_string()).await;
        for n in 1..=5 {
            assert!(body.contains(&format!("Question {n}.")));
        }
        assert!(!body.contains("Question 6."));
    }

    #[backend_test]
    async fn detail_of_future_question_is_not_found(client: Client, store: Store) {
        let question = create_question(&store, "Future question.", 5).await;

        let (status, body) = get_page(&client, &uri!(detail(question.id)).to_string()).await;
        assert_eq!(Status::NotFound, status);
        assert!(!body.contains("Future question."));
    }

    #[backend_test]
    async fn detail_of_past_question(client: Client, store: Store) {
        let (question, a, b) = create_poll(&store, "Past Question.", -5).await;

        let (status, body) = get_page(&client, &uri!(detail(question.id)).to_string()).await;
        assert_eq!(Status::Ok, status);
        assert!(body.contains("Past Question."));
        assert!(body.contains(&a.text));
        assert!(body.contains(&b.text));
        assert!(!body.contains(NO_CHOICE_SELECTED));
    }

    #[backend_test]
    async fn detail_of_unknown_question(client: Client) {
        let (status, _) = get_page(&client, &uri!(detail(9999)).to_string()).await;
        assert_eq!(Status::NotFound, status);

        let (status, _) = get_page(&client, "/polls/abc/").await;
        assert_eq!(Status::NotFound, status);
    }

    #[backend_test]
    async fn results_show_tallies(client: Client, store: Store) {
        let (question, a, _) = create_poll(&store, "Tallied question.", -1).await;
        store.increment_vote(a.id).await.unwrap();

        let (status, body) = get_page(&client, &uri!(results(question.id)).to_string()).await;
        assert_eq!(Status::Ok, status);
        assert!(body.contains("Tallied question."));
        assert!(body.contains("1 vote<"));
        assert!(body.contains("0 votes"));
    }

    #[backend_test]
    async fn results_of_unknown_question(client: Client) {
        let (status, _) = get_page(&client, &uri!(results(9999)).to_string()).await;
        assert_eq!(Status::NotFound, status);
    }

    #[backend_test]
    async fn vote_redirects_to_results(client: Client, store: Store) {
        let (question, a, _) = create_poll(&store, "Pick one.", -1).await;

        let (status, _, location) =
            post_vote(&client, question.id, format!("choice={}", a.id)).await;
        assert_eq!(Status::SeeOther, status);
        assert_eq!(location, Some(uri!(results(question.id)).to_string()));
        assert_eq!(votes(&store, question.id).await, vec![1, 0]);

        // Viewing the results does not vote again.
        for _ in 0..2 {
            let (status, _) = get_page(&client, &uri!(results(question.id)).to_string()).await;
            assert_eq!(Status::Ok, status);
        }
        assert_eq!(votes(&store, question.id).await, vec![1, 0]);
    }

    #[backend_test]
    async fn vote_without_choice(client: Client, store: Store) {
        let (question, a, b) = create_poll(&store, "Pick one.", -1).await;

        let (status, body, location) = post_vote(&client, question.id, String::new()).await;
        assert_eq!(Status::Ok, status);
        assert_eq!(location, None);
        assert!(body.contains(NO_CHOICE_SELECTED));
        assert!(body.contains("Pick one."));
        assert!(body.contains(&a.text));
        assert!(body.contains(&b.text));
        assert_eq!(votes(&store, question.id).await, vec![0, 0]);
    }

    #[backend_test]
    async fn vote_for_invalid_choice(client: Client, store: Store) {
        let (question, _, _) = create_poll(&store, "Pick one.", -1).await;
        let (other, other_a, _) = create_poll(&store, "Pick another.", -1).await;

        for body in [
            format!("choice={}", other_a.id),
            "choice=9999".to_string(),
            "choice=abc".to_string(),
        ] {
            let (status, body, _) = post_vote(&client, question.id, body).await;
            assert_eq!(Status::Ok, status);
            assert!(body.contains(NO_CHOICE_SELECTED));
        }
        assert_eq!(votes(&store, question.id).await, vec![0, 0]);
        assert_eq!(votes(&store, other.id).await, vec![0, 0]);
    }

    #[backend_test]
    async fn vote_on_unknown_question(client: Client, store: Store) {
        let (question, a, _) = create_poll(&store, "Pick one.", -1).await;

        let (status, _, _) = post_vote(&client, 9999, format!("choice={}", a.id)).await;
        assert_eq!(Status::NotFound, status);
        assert_eq!(votes(&store, question.id).await, vec![0, 0]);

        let response = client
            .post("/polls/abc/vote/")
            .header(ContentType::Form)
            .body(format!("choice={}", a.id))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn concurrent_votes_are_all_counted(client: Client, store: Store) {
        let (question, a, _) = create_poll(&store, "Pick one.", -1).await;

        let responses = join_all((0..20).map(|_| {
            client
                .post(uri!(vote(question.id)))
                .header(ContentType::Form)
                .body(format!("choice={}", a.id))
                .dispatch()
        }))
        .await;
        assert!(responses.iter().all(|r| r.status() == Status::SeeOther));
        assert_eq!(votes(&store, question.id).await, vec![20, 0]);
    }

    #[backend_test]
    async fn paths_with_trailing_slashes(client: Client, store: Store) {
        let (question, a, _) = create_poll(&store, "Slashed.", -1).await;
        let id = question.id;

        for path in [
            "/polls/".to_string(),
            format!("/polls/{id}/"),
            format!("/polls/{id}/results/"),
        ] {
            let (status, body) = get_page(&client, &path).await;
            assert_eq!(Status::Ok, status, "GET {path}");
            assert!(body.contains("Slashed."), "GET {path}");
        }

        let vote_path = format!("/polls/{id}/vote/");
        let response = client
            .post(vote_path.as_str())
            .header(ContentType::Form)
            .body(format!("choice={}", a.id))
            .dispatch()
            .await;
        assert_eq!(Status::SeeOther, response.status());
        assert_eq!(
            response.headers().get_one("Location").map(str::to_string),
            Some(uri!(results(id)).to_string())
        );
        assert_eq!(votes(&store, id).await, vec![1, 0]);
    }

    /// A store whose vote increments always fail.
    struct BrokenCounterStore(MemoryStore);

    #[rocket::async_trait]
    impl PollStore for BrokenCounterStore {
        async fn recent_questions(
            &self,
            limit: usize,
            published_by: Option<DateTime<Utc>>,
        ) -> Result<Vec<Question>> {
            self.0.recent_questions(limit, published_by).await
        }

        async fn question(&self, id: QuestionId) -> Result<Question> {
            self.0.question(id).await
        }

        async fn choices(&self, question_id: QuestionId) -> Result<Vec<Choice>> {
            self.0.choices(question_id).await
        }

        async fn choice(&self, question_id: QuestionId, choice_id: ChoiceId) -> Result<Choice> {
            self.0.choice(question_id, choice_id).await
        }

        async fn increment_vote(&self, choice_id: ChoiceId) -> Result<Choice> {
            Err(Error::Status(
                Status::InternalServerError,
                format!("Could not count vote for choice {choice_id}"),
            ))
        }

        async fn insert_question(&self, question: NewQuestion) -> Result<Question> {
            self.0.insert_question(question).await
        }

        async fn update_question(&self, id: QuestionId, question: NewQuestion) -> Result<Question> {
            self.0.update_question(id, question).await
        }

        async fn delete_question(&self, id: QuestionId) -> Result<()> {
            self.0.delete_question(id).await
        }

        async fn insert_choice(&self, question_id: QuestionId, choice: NewChoice) -> Result<Choice> {
            self.0.insert_choice(question_id, choice).await
        }

        async fn delete_choice(&self, choice_id: ChoiceId) -> Result<()> {
            self.0.delete_choice(choice_id).await
        }
    }

    #[backend_test]
    async fn failed_increment_is_not_redirected() {
        let store = Store::new(BrokenCounterStore(MemoryStore::new()));
        let client = Client::tracked(crate::rocket_for_tests(store.clone()))
            .await
            .unwrap();
        let (question, a, _) = create_poll(&store, "Pick one.", -1).await;

        let (status, _, location) =
            post_vote(&client, question.id, format!("choice={}", a.id)).await;
        assert_eq!(Status::InternalServerError, status);
        assert_eq!(location, None);
        assert_eq!(votes(&store, question.id).await, vec![0, 0]);
    }

    #[backend_test]
    async fn deleted_question_has_no_results(client: Client, store: Store) {
        let (question, a, _) = create_poll(&store, "Short-lived.", -1).await;
        store.delete_question(question.id).await.unwrap();

        let (status, _) = get_page(&client, &uri!(results(question.id)).to_string()).await;
        assert_eq!(Status::NotFound, status);
        let (status, _, _) = post_vote(&client, question.id, format!("choice={}", a.id)).await;
        assert_eq!(Status::NotFound, status);
    }
}
