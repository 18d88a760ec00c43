//! Backend for a small election system: voter, candidate, and user account
//! registries, role-gated behind a single authorization gate, plus
//! one-ballot-per-voter casting and a public results board.

#[macro_use]
extern crate rocket;

pub mod api;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod model;
pub mod voting;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing};
use crate::logging::LoggerFairing;

/// Assemble the server: all routes mounted at the root, with the config,
/// database, and logging fairings attached. Ignition performs the actual
/// database connection and bootstrap.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(LoggerFairing)
}
