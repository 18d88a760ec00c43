//! JSON-facing response types with named, typed fields.
//!
//! Datetimes here serialise as RFC 3339 strings rather than BSON dates,
//! and password hashes never leave the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    db::{Ballot, Candidate, Role, User, Voter},
    mongodb::Id,
};

/// A user account, minus its credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: Id,
    pub name: String,
    pub voter_title: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.user.name,
            voter_title: user.user.voter_title,
            role: user.user.role,
            active: user.user.active,
            created_at: user.user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterView {
    pub id: Id,
    pub name: String,
    pub voter_title: String,
    pub created_at: DateTime<Utc>,
}

impl From<Voter> for VoterView {
    fn from(voter: Voter) -> Self {
        Self {
            id: voter.id,
            name: voter.voter.name,
            voter_title: voter.voter.voter_title,
            created_at: voter.voter.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateView {
    pub id: Id,
    pub name: String,
    pub national_id: String,
    pub voter_title: String,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Candidate> for CandidateView {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.candidate.name,
            national_id: candidate.candidate.national_id,
            voter_title: candidate.candidate.voter_title,
            photo: candidate.candidate.photo,
            created_at: candidate.candidate.created_at,
        }
    }
}

/// A ballot joined against the voter and candidate registries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotView {
    pub ballot_id: Id,
    pub voter_id: Id,
    pub voter_name: String,
    pub voter_title: String,
    pub candidate_id: Id,
    pub candidate_name: String,
    pub cast_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl BallotView {
    pub fn new(ballot: &Ballot, voter: &Voter, candidate: &Candidate) -> Self {
        Self {
            ballot_id: ballot.id,
            voter_id: ballot.voter_id,
            voter_name: voter.name.clone(),
            voter_title: voter.voter_title.clone(),
            candidate_id: ballot.candidate_id,
            candidate_name: candidate.name.clone(),
            cast_at: ballot.cast_at,
            created_at: ballot.created_at,
        }
    }
}
