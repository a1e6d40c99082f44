#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod voting;

use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;
use model::store::Store;

/// Build the server, choosing a store from the `db_uri` configuration.
pub fn build() -> Rocket<Build> {
    with_fairings_and_routes(rocket::build()).attach(DatabaseFairing)
}

/// Build the server around an already prepared store.
pub fn rocket_for_store(rocket: Rocket<Build>, store: Store) -> Rocket<Build> {
    with_fairings_and_routes(rocket).manage(store)
}

fn with_fairings_and_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(Template::fairing())
        .mount("/", api::routes())
}

/// The server under test. Templates are found regardless of the working directory.
#[cfg(test)]
fn rocket_for_tests(store: Store) -> Rocket<Build> {
    let figment = rocket::Config::figment().merge((
        "template_dir",
        concat!(env!("CARGO_MANIFEST_DIR"), "/templates"),
    ));
    rocket_for_store(rocket::custom(figment), store)
}

/// A freshly initialised store on a uniquely named test database.
#[cfg(test)]
async fn mongodb_test_store() -> (Store, mongodb::Database) {
    let db_uri = std::env::var("ROCKET_DB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let client = mongodb::Client::with_uri_str(&db_uri).await.unwrap();
    let db = client.database(&config::database_name("polls".to_string()));
    let store = model::mongodb::MongoStore::initialise(client, &db)
        .await
        .unwrap();
    (Store::new(store), db)
}
