//! The voter registry. Reads need a login; writes need Admin or Manager.

use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    gate::{self, AccessPolicy},
    model::{
        api::{auth::Session, requests::VoterRequest, views::VoterView},
        db::{Ballot, NewVoter, Voter},
        mongodb::{is_duplicate_key, Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        list_voters,
        get_voter,
        create_voter,
        update_voter,
        delete_voter
    ]
}

const READ: AccessPolicy = AccessPolicy::logged_in();
const WRITE: AccessPolicy = AccessPolicy::roles("Admin, Manager");

#[get("/voters")]
async fn list_voters(
    session: Option<Session>,
    voters: Coll<Voter>,
) -> Result<Json<Vec<VoterView>>> {
    gate::check(&READ, session.as_ref())?;

    let all: Vec<Voter> = voters.find(None, None).await?.try_collect().await?;
    Ok(Json(all.into_iter().map(VoterView::from).collect()))
}

#[get("/voters/<id>")]
async fn get_voter(
    session: Option<Session>,
    id: Id,
    voters: Coll<Voter>,
) -> Result<Json<VoterView>> {
    gate::check(&READ, session.as_ref())?;

    let voter = voters
        .find_one(id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter {id}")))?;
    Ok(Json(voter.into()))
}

#[post("/voters", data = "<request>", format = "json")]
async fn create_voter(
    session: Option<Session>,
    request: Json<VoterRequest>,
    new_voters: Coll<NewVoter>,
) -> Result<Json<Id>> {
    gate::check(&WRITE, session.as_ref())?;

    let new_voter = NewVoter::try_from(request.into_inner())
        .map_err(|_| Error::bad_request("The name and voter title must not be empty"))?;

    match new_voters.insert_one(&new_voter, None).await {
        Ok(result) => {
            let id = result.inserted_id.as_object_id().ok_or_else(|| {
                Error::Status(
                    rocket::http::Status::InternalServerError,
                    "Insert did not yield an ObjectId".to_string(),
                )
            })?;
            Ok(Json(id.into()))
        }
        Err(err) if is_duplicate_key(&err) => {
            Err(Error::conflict("A voter with this title already exists"))
        }
        Err(err) => Err(err.into()),
    }
}

#[put("/voters/<id>", data = "<request>", format = "json")]
async fn update_voter(
    session: Option<Session>,
    id: Id,
    request: Json<VoterRequest>,
    voters: Coll<Voter>,
) -> Result<()> {
    gate::check(&WRITE, session.as_ref())?;

    let request = request.into_inner();
    if request.name.is_empty() || request.voter_title.is_empty() {
        return Err(Error::bad_request(
            "The name and voter title must not be empty",
        ));
    }

    if voters.find_one(id.as_doc(), None).await?.is_none() {
        return Err(Error::not_found(format!("Voter {id}")));
    }

    let changes = doc! {
        "$set": {
            "name": &request.name,
            "voter_title": &request.voter_title,
        }
    };
    match voters.update_one(id.as_doc(), changes, None).await {
        Ok(_) => Ok(()),
        Err(err) if is_duplicate_key(&err) => {
            Err(Error::conflict("A voter with this title already exists"))
        }
        Err(err) => Err(err.into()),
    }
}

/// Remove a voter registry entry. Refused while a ballot of theirs exists,
/// so the results always join cleanly.
#[delete("/voters/<id>")]
async fn delete_voter(
    session: Option<Session>,
    id: Id,
    voters: Coll<Voter>,
    ballots: Coll<Ballot>,
) -> Result<()> {
    gate::check(&WRITE, session.as_ref())?;

    if voters.find_one(id.as_doc(), None).await?.is_none() {
        return Err(Error::not_found(format!("Voter {id}")));
    }

    let has_ballot = ballots
        .count_documents(doc! {"voter_id": id}, None)
        .await?
        > 0;
    if has_ballot {
        return Err(Error::conflict(
            "This voter has cast a ballot; delete the ballot first",
        ));
    }

    voters.delete_one(id.as_doc(), None).await?;
    Ok(())
}
