//! HTTP route handlers, grouped by resource.
//!
//! Every handler takes an `Option<Session>` guard and passes it through the
//! authorization gate before touching any data.

mod auth;
mod candidates;
mod public;
mod users;
mod voters;
mod votes;

use rocket::Route;

pub fn routes() -> Vec<Route> {
    auth::routes()
        .into_iter()
        .chain(users::routes())
        .chain(voters::routes())
        .chain(candidates::routes())
        .chain(votes::routes())
        .chain(public::routes())
        .collect()
}
