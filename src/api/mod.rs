use rocket::Route;

mod polls;
pub mod views;

pub fn routes() -> Vec<Route> {
    polls::routes()
}
