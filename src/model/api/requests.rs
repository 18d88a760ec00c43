//! Request bodies for the registry and voting endpoints.

use serde::{Deserialize, Serialize};

use crate::model::{
    db::{NewCandidate, NewVoter},
    mongodb::Id,
};

/// Create or update a voter registry entry.
#[derive(Clone, Deserialize, Serialize)]
pub struct VoterRequest {
    pub name: String,
    pub voter_title: String,
}

impl TryFrom<VoterRequest> for NewVoter {
    type Error = ();

    fn try_from(req: VoterRequest) -> Result<Self, Self::Error> {
        if req.name.is_empty() || req.voter_title.is_empty() {
            return Err(());
        }
        Ok(NewVoter::new(req.name, req.voter_title))
    }
}

/// Create or update a candidate.
#[derive(Clone, Deserialize, Serialize)]
pub struct CandidateRequest {
    pub name: String,
    pub national_id: String,
    pub voter_title: String,
    pub photo: Option<String>,
}

impl TryFrom<CandidateRequest> for NewCandidate {
    type Error = ();

    fn try_from(req: CandidateRequest) -> Result<Self, Self::Error> {
        if req.name.is_empty() || req.national_id.is_empty() || req.voter_title.is_empty() {
            return Err(());
        }
        Ok(NewCandidate::new(
            req.name,
            req.national_id,
            req.voter_title,
            req.photo,
        ))
    }
}

/// Cast or redirect a ballot towards the given candidate.
#[derive(Clone, Copy, Deserialize, Serialize)]
pub struct VoteRequest {
    pub candidate_id: Id,
}
