use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core ballot data, as stored in the database.
///
/// Invariant: at most one ballot per `voter_id`, ever. Enforced by a unique
/// index, not just the pre-insert check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCore {
    /// Foreign key into the voter registry.
    pub voter_id: Id,
    /// Foreign key into the candidate registry.
    pub candidate_id: Id,
    /// When the vote was cast. An edit is a correction, not a re-vote,
    /// so this is never refreshed.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A ballot from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub ballot: BallotCore,
}

impl Ballot {
    /// Create a new ballot for the given voter and candidate.
    /// The ID is generated here so the caller knows it before the insert.
    pub fn new(voter_id: Id, candidate_id: Id) -> Self {
        let now = Utc::now();
        Self {
            id: Id::new(),
            ballot: BallotCore {
                voter_id,
                candidate_id,
                cast_at: now,
                created_at: now,
            },
        }
    }
}

impl Deref for Ballot {
    type Target = BallotCore;

    fn deref(&self) -> &Self::Target {
        &self.ballot
    }
}

impl DerefMut for Ballot {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ballot
    }
}
