//! The candidate registry. Reads need a login; writes need Admin or Manager.

use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    gate::{self, AccessPolicy},
    model::{
        api::{auth::Session, requests::CandidateRequest, views::CandidateView},
        db::{Ballot, Candidate, NewCandidate},
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        list_candidates,
        get_candidate,
        create_candidate,
        update_candidate,
        delete_candidate
    ]
}

const READ: AccessPolicy = AccessPolicy::logged_in();
const WRITE: AccessPolicy = AccessPolicy::roles("Admin, Manager");

#[get("/candidates")]
async fn list_candidates(
    session: Option<Session>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateView>>> {
    gate::check(&READ, session.as_ref())?;

    let all: Vec<Candidate> = candidates.find(None, None).await?.try_collect().await?;
    Ok(Json(all.into_iter().map(CandidateView::from).collect()))
}

#[get("/candidates/<id>")]
async fn get_candidate(
    session: Option<Session>,
    id: Id,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateView>> {
    gate::check(&READ, session.as_ref())?;

    let candidate = candidates
        .find_one(id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {id}")))?;
    Ok(Json(candidate.into()))
}

#[post("/candidates", data = "<request>", format = "json")]
async fn create_candidate(
    session: Option<Session>,
    request: Json<CandidateRequest>,
    new_candidates: Coll<NewCandidate>,
) -> Result<Json<Id>> {
    gate::check(&WRITE, session.as_ref())?;

    let new_candidate = NewCandidate::try_from(request.into_inner()).map_err(|_| {
        Error::bad_request("The name, national ID, and voter title must not be empty")
    })?;

    let id = new_candidates
        .insert_one(&new_candidate, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| {
            Error::Status(
                rocket::http::Status::InternalServerError,
                "Insert did not yield an ObjectId".to_string(),
            )
        })?;
    Ok(Json(id.into()))
}

#[put("/candidates/<id>", data = "<request>", format = "json")]
async fn update_candidate(
    session: Option<Session>,
    id: Id,
    request: Json<CandidateRequest>,
    candidates: Coll<Candidate>,
) -> Result<()> {
    gate::check(&WRITE, session.as_ref())?;

    let request = request.into_inner();
    if request.name.is_empty() || request.national_id.is_empty() || request.voter_title.is_empty() {
        return Err(Error::bad_request(
            "The name, national ID, and voter title must not be empty",
        ));
    }

    if candidates.find_one(id.as_doc(), None).await?.is_none() {
        return Err(Error::not_found(format!("Candidate {id}")));
    }

    let changes = doc! {
        "$set": {
            "name": &request.name,
            "national_id": &request.national_id,
            "voter_title": &request.voter_title,
            "photo": &request.photo,
        }
    };
    candidates.update_one(id.as_doc(), changes, None).await?;
    Ok(())
}

/// Remove a candidate. Refused while ballots point at them, so no vote can
/// become dangling.
#[delete("/candidates/<id>")]
async fn delete_candidate(
    session: Option<Session>,
    id: Id,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
) -> Result<()> {
    gate::check(&WRITE, session.as_ref())?;

    if candidates.find_one(id.as_doc(), None).await?.is_none() {
        return Err(Error::not_found(format!("Candidate {id}")));
    }

    let has_votes = ballots
        .count_documents(doc! {"candidate_id": id}, None)
        .await?
        > 0;
    if has_votes {
        return Err(Error::conflict(
            "This candidate has received votes and cannot be deleted",
        ));
    }

    candidates.delete_one(id.as_doc(), None).await?;
    Ok(())
}
