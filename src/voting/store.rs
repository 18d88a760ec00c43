use mongodb::bson::doc;
use rocket::request::{self, FromRequest, Request};

use crate::error::Error;
use crate::model::{
    db::{Ballot, Voter},
    mongodb::{is_duplicate_key, Coll, Id},
};

use super::{BallotStore, VoteError};

/// The production [`BallotStore`], backed by the voter and ballot
/// collections. The unique index on `ballots.voter_id` is what turns a
/// racing duplicate insert into [`VoteError::AlreadyVoted`].
pub struct MongoBallotStore {
    voters: Coll<Voter>,
    ballots: Coll<Ballot>,
}

#[rocket::async_trait]
impl BallotStore for MongoBallotStore {
    async fn find_voter_id_by_title(&self, title: &str) -> Result<Option<Id>, VoteError> {
        let voter = self
            .voters
            .find_one(doc! {"voter_title": title}, None)
            .await
            .map_err(db_fault)?;
        Ok(voter.map(|v| v.id))
    }

    async fn count_ballots_for_voter(&self, voter_id: Id) -> Result<u64, VoteError> {
        self.ballots
            .count_documents(doc! {"voter_id": voter_id}, None)
            .await
            .map_err(db_fault)
    }

    async fn insert_ballot(&self, voter_id: Id, candidate_id: Id) -> Result<Id, VoteError> {
        let ballot = Ballot::new(voter_id, candidate_id);
        match self.ballots.insert_one(&ballot, None).await {
            Ok(_) => Ok(ballot.id),
            Err(err) if is_duplicate_key(&err) => Err(VoteError::AlreadyVoted),
            Err(err) => Err(db_fault(err)),
        }
    }

    async fn find_ballot(&self, ballot_id: Id) -> Result<Option<Ballot>, VoteError> {
        self.ballots
            .find_one(ballot_id.as_doc(), None)
            .await
            .map_err(db_fault)
    }

    async fn find_ballot_for_voter(&self, voter_id: Id) -> Result<Option<Ballot>, VoteError> {
        self.ballots
            .find_one(doc! {"voter_id": voter_id}, None)
            .await
            .map_err(db_fault)
    }

    async fn update_ballot_candidate(
        &self,
        ballot_id: Id,
        candidate_id: Id,
    ) -> Result<(), VoteError> {
        self.ballots
            .update_one(
                ballot_id.as_doc(),
                doc! {"$set": {"candidate_id": candidate_id}},
                None,
            )
            .await
            .map_err(db_fault)?;
        Ok(())
    }

    async fn delete_ballot(&self, ballot_id: Id) -> Result<(), VoteError> {
        self.ballots
            .delete_one(ballot_id.as_doc(), None)
            .await
            .map_err(db_fault)?;
        Ok(())
    }
}

fn db_fault(err: mongodb::error::Error) -> VoteError {
    VoteError::Store(Error::Db(err))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for MongoBallotStore {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let voters = rocket::outcome::try_outcome!(req.guard::<Coll<Voter>>().await);
        let ballots = rocket::outcome::try_outcome!(req.guard::<Coll<Ballot>>().await);
        request::Outcome::Success(Self { voters, ballots })
    }
}
