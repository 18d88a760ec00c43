use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// The three permission levels of the system.
///
/// Roles are matched by exact name against the comma-separated role lists
/// declared on routes, so they serialise as their names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Full control, including user account management.
    Admin,
    /// Candidate and voter registry management; no ballot self-service.
    Manager,
    /// A regular voter: self-service over their own ballot only.
    Common,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Manager => "Manager",
            Self::Common => "Common",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Core user account data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub name: String,
    /// The voter title linking this account to the voter registry.
    pub voter_title: String,
    pub password_hash: String,
    pub role: Role,
    /// Deactivated accounts cannot log in; deletion is a soft deactivation.
    pub active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl UserCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash simply fails verification.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user account from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl UserCore {
        pub fn example() -> Self {
            Self {
                name: "Maria Souza".to_string(),
                voter_title: "123456789012".to_string(),
                password_hash:"$argon2i$v=19$m=4096,t=3,p=1$c2FsdHNhbHRzYWx0c2FsdA$W5VTdE+R4hSTqYDwGMM0lGLQg5BSXwXFaNve2OlyjuY".to_string(),
                role: Role::Common,
                active: true,
                created_at: Utc::now(),
            }
        }
    }

    impl User {
        pub fn example() -> Self {
            Self {
                id: Id::new(),
                user: UserCore::example(),
            }
        }
    }
}
