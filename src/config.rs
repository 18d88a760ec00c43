use chrono::Duration;
use log::{error, info};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    api::credentials::hash_password,
    db::{NewUser, NewVoter, Role, User},
    mongodb::{ensure_indexes_exist, is_duplicate_key, Coll},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    admin_name: String,
    admin_voter_title: String,
    // secrets
    jwt_secret: String,
    admin_password: String,
}

impl Config {
    /// Valid lifetime of session cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign session JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Display name of the bootstrap Admin account.
    pub fn admin_name(&self) -> &str {
        &self.admin_name
    }

    /// Voter title of the bootstrap Admin account.
    pub fn admin_voter_title(&self) -> &str {
        &self.admin_voter_title
    }

    /// Initial password of the bootstrap Admin account.
    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state. Must be attached after [`ConfigFairing`], since the
/// bootstrap Admin account comes from the application config.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to set up database indexes: {e}");
            return Err(rocket);
        }

        // The app config must already be managed at this point.
        let Some(app_config) = rocket.state::<Config>() else {
            error!("Application config missing; attach ConfigFairing first");
            return Err(rocket);
        };
        if let Err(e) = ensure_admin_exists(&db, app_config).await {
            error!("Failed to ensure the bootstrap Admin exists: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Ensure there is at least one active Admin account, creating the
/// configured bootstrap Admin (and its voter registry entry) if not.
async fn ensure_admin_exists(db: &Database, config: &Config) -> Result<(), mongodb::error::Error> {
    use mongodb::bson::doc;

    let users = Coll::<User>::from_db(db);
    let active_admins = doc! {"role": Role::Admin.as_str(), "active": true};
    if users.count_documents(active_admins, None).await? > 0 {
        return Ok(());
    }

    info!("No active Admin found, creating the bootstrap account");

    // The registry entry may already exist from a previous run.
    let voter = NewVoter::new(
        config.admin_name().to_string(),
        config.admin_voter_title().to_string(),
    );
    match Coll::<NewVoter>::from_db(db).insert_one(&voter, None).await {
        Ok(_) => {}
        Err(err) if is_duplicate_key(&err) => {}
        Err(err) => return Err(err),
    }

    let admin = NewUser {
        name: config.admin_name().to_string(),
        voter_title: config.admin_voter_title().to_string(),
        password_hash: hash_password(config.admin_password()),
        role: Role::Admin,
        active: true,
        created_at: chrono::Utc::now(),
    };
    match Coll::<NewUser>::from_db(db).insert_one(&admin, None).await {
        Ok(_) => Ok(()),
        // An inactive account with this title already holds the slot.
        Err(err) if is_duplicate_key(&err) => Ok(()),
        Err(err) => Err(err),
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "urna".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                auth_ttl: 3600,
                admin_name: "Administrador".to_string(),
                admin_voter_title: "000000000000".to_string(),
                jwt_secret: "this is a test secret, do not deploy".to_string(),
                admin_password: "correct horse battery staple".to_string(),
            }
        }
    }
}
