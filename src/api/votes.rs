//! Ballot casting and self-service.
//!
//! Every route here admits any logged-in user at the gate; the vote engine
//! then enforces ownership, so a staff account probing another voter's
//! ballot gets refused by the same path as a mismatched Common user.

use std::collections::HashMap;

use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    gate::{self, AccessPolicy},
    model::{
        api::{auth::Session, requests::VoteRequest, views::BallotView},
        db::{Ballot, Candidate, Voter},
        mongodb::{Coll, Id},
    },
    voting::{self, MongoBallotStore},
};

pub fn routes() -> Vec<Route> {
    routes![list_votes, my_vote, cast_vote, edit_vote, delete_vote]
}

const AUDIT: AccessPolicy = AccessPolicy::roles("Admin, Manager");
const SELF_SERVICE: AccessPolicy = AccessPolicy::logged_in();

/// The full ballot box, joined against both registries. Staff only.
#[get("/votes")]
async fn list_votes(
    session: Option<Session>,
    ballots: Coll<Ballot>,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<BallotView>>> {
    gate::check(&AUDIT, session.as_ref())?;

    let all_ballots: Vec<Ballot> = ballots.find(None, None).await?.try_collect().await?;
    let voters_by_id: HashMap<Id, Voter> = voters
        .find(None, None)
        .await?
        .map_ok(|voter| (voter.id, voter))
        .try_collect()
        .await?;
    let candidates_by_id: HashMap<Id, Candidate> = candidates
        .find(None, None)
        .await?
        .map_ok(|candidate| (candidate.id, candidate))
        .try_collect()
        .await?;

    let views = all_ballots
        .iter()
        .filter_map(|ballot| {
            let voter = voters_by_id.get(&ballot.voter_id)?;
            let candidate = candidates_by_id.get(&ballot.candidate_id)?;
            Some(BallotView::new(ballot, voter, candidate))
        })
        .collect();
    Ok(Json(views))
}

/// The caller's own ballot, if they have cast one.
#[get("/votes/mine")]
async fn my_vote(
    session: Option<Session>,
    store: MongoBallotStore,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
) -> Result<Json<BallotView>> {
    let session = gate::require(&SELF_SERVICE, session)?;

    let ballot = voting::view_own_ballot(&store, &session.voter_title).await?;
    Ok(Json(joined_view(&ballot, &voters, &candidates).await?))
}

/// Cast the caller's ballot. At most one may ever succeed per voter.
#[post("/votes", data = "<request>", format = "json")]
async fn cast_vote(
    session: Option<Session>,
    request: Json<VoteRequest>,
    store: MongoBallotStore,
    candidates: Coll<Candidate>,
) -> Result<Json<Id>> {
    let session = gate::require(&SELF_SERVICE, session)?;

    require_candidate(&candidates, request.candidate_id).await?;

    let ballot_id =
        voting::cast_ballot(&store, &session.voter_title, request.candidate_id).await?;
    Ok(Json(ballot_id))
}

/// Redirect an existing ballot to another candidate. Owner only.
#[put("/votes/<id>", data = "<request>", format = "json")]
async fn edit_vote(
    session: Option<Session>,
    id: Id,
    request: Json<VoteRequest>,
    store: MongoBallotStore,
    candidates: Coll<Candidate>,
) -> Result<()> {
    let session = gate::require(&SELF_SERVICE, session)?;

    require_candidate(&candidates, request.candidate_id).await?;

    voting::edit_ballot(
        &store,
        id,
        request.candidate_id,
        &session.voter_title,
        session.role,
    )
    .await?;
    Ok(())
}

/// Withdraw an existing ballot. Owner only; the voter may then cast again.
#[delete("/votes/<id>")]
async fn delete_vote(session: Option<Session>, id: Id, store: MongoBallotStore) -> Result<()> {
    let session = gate::require(&SELF_SERVICE, session)?;

    voting::delete_ballot(&store, id, &session.voter_title, session.role).await?;
    Ok(())
}

async fn require_candidate(candidates: &Coll<Candidate>, id: Id) -> Result<()> {
    if candidates.find_one(id.as_doc(), None).await?.is_none() {
        return Err(Error::not_found(format!("Candidate {id}")));
    }
    Ok(())
}

async fn joined_view(
    ballot: &Ballot,
    voters: &Coll<Voter>,
    candidates: &Coll<Candidate>,
) -> Result<BallotView> {
    let voter = voters
        .find_one(ballot.voter_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter {}", ballot.voter_id)))?;
    let candidate = candidates
        .find_one(ballot.candidate_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {}", ballot.candidate_id)))?;
    Ok(BallotView::new(ballot, &voter, &candidate))
}
