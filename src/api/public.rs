//! Anonymous endpoints: the public results board and the open registries.

use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::Result,
    gate::{self, AccessPolicy},
    model::{
        api::{
            auth::Session,
            views::{CandidateView, VoterView},
        },
        db::{Ballot, Candidate, Voter},
        mongodb::Coll,
    },
    voting::tally::{tally_rows, TallyRow},
};

pub fn routes() -> Vec<Route> {
    routes![results, public_candidates, public_voters]
}

const PUBLIC: AccessPolicy = AccessPolicy::anonymous();

/// Per-candidate vote counts and percentages.
#[get("/public/results")]
async fn results(
    session: Option<Session>,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
) -> Result<Json<Vec<TallyRow>>> {
    gate::check(&PUBLIC, session.as_ref())?;

    let all: Vec<Candidate> = candidates.find(None, None).await?.try_collect().await?;

    let mut counts = Vec::with_capacity(all.len());
    for candidate in all {
        let votes = ballots
            .count_documents(doc! {"candidate_id": candidate.id}, None)
            .await?;
        counts.push((candidate, votes));
    }

    Ok(Json(tally_rows(counts)))
}

#[get("/public/candidates")]
async fn public_candidates(
    session: Option<Session>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateView>>> {
    gate::check(&PUBLIC, session.as_ref())?;

    let all: Vec<Candidate> = candidates.find(None, None).await?.try_collect().await?;
    Ok(Json(all.into_iter().map(CandidateView::from).collect()))
}

#[get("/public/voters")]
async fn public_voters(
    session: Option<Session>,
    voters: Coll<Voter>,
) -> Result<Json<Vec<VoterView>>> {
    gate::check(&PUBLIC, session.as_ref())?;

    let all: Vec<Voter> = voters.find(None, None).await?.try_collect().await?;
    Ok(Json(all.into_iter().map(VoterView::from).collect()))
}
