//! A command-line tool for managing the questions and choices in a polls database.
//! This uses the same store as the server, so anything it writes is immediately
//! visible to voters.

use chrono::{DateTime, Duration, Utc};
use clap::{error::ErrorKind, value_parser, Arg, ArgAction, ArgMatches, Command};

use polls_backend::error::Result;
use polls_backend::model::{
    mongodb::MongoStore,
    poll::{ChoiceId, NewChoice, QuestionCore, QuestionId},
    store::PollStore,
};

const PROGRAM_NAME: &str = "polls-admin";

const ABOUT_TEXT: &str = "Manage the questions and choices of a polls database.

EXIT CODES:
    0: Success.
    1: Error.";

const DB_URI: &str = "DB_URI";
const DB_NAME: &str = "DB_NAME";
const LIMIT: &str = "LIMIT";
const QUESTION_ID: &str = "QUESTION_ID";
const CHOICE_ID: &str = "CHOICE_ID";
const TEXT: &str = "TEXT";
const PUB_DATE: &str = "PUB_DATE";
const IN_DAYS: &str = "IN_DAYS";

const LIST: &str = "list";
const SHOW: &str = "show";
const CREATE_QUESTION: &str = "create-question";
const EDIT_QUESTION: &str = "edit-question";
const DELETE_QUESTION: &str = "delete-question";
const ADD_CHOICE: &str = "add-choice";
const DELETE_CHOICE: &str = "delete-choice";

fn question_id_arg() -> Arg {
    Arg::new(QUESTION_ID)
        .help("The ID of the question")
        .value_parser(value_parser!(QuestionId))
        .action(ArgAction::Set)
        .required(true)
}

fn text_arg(required: bool) -> Arg {
    Arg::new(TEXT)
        .help("The text shown to voters, at most 200 characters")
        .action(ArgAction::Set)
        .required(required)
}

fn pub_date_args() -> [Arg; 2] {
    [
        Arg::new(PUB_DATE)
            .long("pub-date")
            .help("Publication date as an RFC 3339 timestamp, e.g. 2023-04-01T12:00:00Z")
            .value_parser(parse_pub_date)
            .action(ArgAction::Set),
        Arg::new(IN_DAYS)
            .long("in-days")
            .help("Publish this many days from now; negative values lie in the past")
            .value_parser(value_parser!(i64))
            .allow_negative_numbers(true)
            .action(ArgAction::Set)
            .conflicts_with(PUB_DATE),
    ]
}

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .arg(
            Arg::new(DB_URI)
                .long("db-uri")
                .env("POLLS_DB_URI")
                .help("The MongoDB connection string")
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(DB_NAME)
                .long("db-name")
                .env("POLLS_DB_NAME")
                .help("The database holding the polls")
                .action(ArgAction::Set)
                .default_value("polls"),
        )
        .subcommand(
            Command::new(LIST)
                .about("List questions newest first, including unpublished ones")
                .arg(
                    Arg::new(LIMIT)
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .action(ArgAction::Set)
                        .default_value("20"),
                ),
        )
        .subcommand(
            Command::new(SHOW)
                .about("Show a question with its choices and vote counts")
                .arg(question_id_arg()),
        )
        .subcommand(
            Command::new(CREATE_QUESTION)
                .about("Create a question, published now unless told otherwise")
                .arg(text_arg(true))
                .args(pub_date_args()),
        )
        .subcommand(
            Command::new(EDIT_QUESTION)
                .about("Change the text or publication date of a question")
                .arg(question_id_arg())
                .arg(text_arg(false))
                .args(pub_date_args()),
        )
        .subcommand(
            Command::new(DELETE_QUESTION)
                .about("Delete a question along with its choices")
                .arg(question_id_arg()),
        )
        .subcommand(
            Command::new(ADD_CHOICE)
                .about("Add a choice to a question")
                .arg(question_id_arg())
                .arg(text_arg(true)),
        )
        .subcommand(
            Command::new(DELETE_CHOICE).about("Delete a choice").arg(
                Arg::new(CHOICE_ID)
                    .help("The ID of the choice")
                    .value_parser(value_parser!(ChoiceId))
                    .action(ArgAction::Set)
                    .required(true),
            ),
        )
}

fn parse_pub_date(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp: {e}"))
}

/// The publication date requested on the command line, if any.
///
/// Fails if `--in-days` reaches beyond the representable range of dates.
fn requested_pub_date(
    args: &ArgMatches,
    now: DateTime<Utc>,
) -> std::result::Result<Option<DateTime<Utc>>, clap::Error> {
    if let Some(date) = args.get_one::<DateTime<Utc>>(PUB_DATE) {
        return Ok(Some(*date));
    }
    let days = match args.get_one::<i64>(IN_DAYS) {
        Some(days) => *days,
        None => return Ok(None),
    };
    Duration::try_days(days)
        .and_then(|offset| now.checked_add_signed(offset))
        .map(Some)
        .ok_or_else(|| {
            cli().error(
                ErrorKind::ValueValidation,
                format!("--in-days {days} is out of range"),
            )
        })
}

fn question_id(args: &ArgMatches) -> QuestionId {
    *args.get_one(QUESTION_ID).unwrap() // Required argument is guaranteed to be present.
}

fn text(args: &ArgMatches) -> Option<String> {
    args.get_one::<String>(TEXT).cloned()
}

/// Carry out the chosen subcommand against the store.
async fn run(store: &dyn PollStore, command: &str, args: &ArgMatches) -> Result<()> {
    let now = Utc::now();
    match command {
        LIST => {
            let limit = *args.get_one::<usize>(LIMIT).unwrap(); // Has a default value.
            for question in store.recent_questions(limit, None).await? {
                let status = if question.is_published(now) {
                    "published"
                } else {
                    "scheduled"
                };
                println!(
                    "{}\t{}\t{status}\t{}",
                    question.id,
                    question.pub_date.to_rfc3339(),
                    question.text
                );
            }
        }
        SHOW => {
            let question = store.question(question_id(args)).await?;
            println!("{}: {}", question.id, question.text);
            println!("Published: {}", question.pub_date.to_rfc3339());
            if question.was_published_recently_at(now) {
                println!("Published within the last day");
            }
            for choice in store.choices(question.id).await? {
                let plural = if choice.votes == 1 { "" } else { "s" };
                println!("  {}: {} ({} vote{plural})", choice.id, choice.text, choice.votes);
            }
        }
        CREATE_QUESTION => {
            let text = text(args).unwrap_or_default(); // Required argument is guaranteed to be present.
            let pub_date = requested_pub_date(args, now)
                .unwrap_or_else(|e| e.exit())
                .unwrap_or(now);
            let question = store
                .insert_question(QuestionCore::new(text, pub_date)?)
                .await?;
            println!("Created question {}", question.id);
        }
        EDIT_QUESTION => {
            let id = question_id(args);
            let existing = store.question(id).await?;
            let text = text(args).unwrap_or_else(|| existing.text.clone());
            let pub_date = requested_pub_date(args, now)
                .unwrap_or_else(|e| e.exit())
                .unwrap_or(existing.pub_date);
            let question = store
                .update_question(id, QuestionCore::new(text, pub_date)?)
                .await?;
            println!("Updated question {}", question.id);
        }
        DELETE_QUESTION => {
            let id = question_id(args);
            store.delete_question(id).await?;
            println!("Deleted question {id} and its choices");
        }
        ADD_CHOICE => {
            let text = text(args).unwrap_or_default(); // Required argument is guaranteed to be present.
            let choice = store
                .insert_choice(question_id(args), NewChoice::new(text)?)
                .await?;
            println!("Added choice {} to question {}", choice.id, choice.question_id);
        }
        DELETE_CHOICE => {
            let id: ChoiceId = *args.get_one(CHOICE_ID).unwrap(); // Required argument is guaranteed to be present.
            store.delete_choice(id).await?;
            println!("Deleted choice {id}");
        }
        _ => unreachable!("unknown subcommand {command}"),
    }
    Ok(())
}

#[rocket::main]
async fn main() {
    let args = cli().get_matches();
    let db_uri: &String = args.get_one(DB_URI).unwrap(); // Required argument is guaranteed to be present.
    let db_name: &String = args.get_one(DB_NAME).unwrap(); // Has a default value.
    let (command, sub_args) = args.subcommand().unwrap(); // Subcommand is required.

    let result = match MongoStore::connect(db_uri, db_name).await {
        Ok(store) => run(&store, command, sub_args).await,
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1)
    }
}
