//! The vote integrity engine.
//!
//! Per voter the ballot lifecycle is `NoBallot -> BallotCast`; the only way
//! back is an explicit deletion by the owner, and an edit (candidate
//! correction) does not change state. The operations here enforce:
//!
//! - at most one ballot per voter, backed by the store's uniqueness guard
//!   so that racing casts cannot both succeed;
//! - only the Common-role owner may edit or delete a ballot.
//!
//! The engine talks to persistence exclusively through [`BallotStore`], so
//! the rules are testable without a database.

mod store;
pub mod tally;

pub use store::MongoBallotStore;

use rocket::http::Status;
use thiserror::Error;

use crate::error::Error;
use crate::model::{
    db::{Ballot, Role},
    mongodb::Id,
};

/// Business-rule failures of the vote engine. These are expected outcomes
/// surfaced to the user, not system errors; only `Store` is a real fault.
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("No voter found with title {0}")]
    VoterNotFound(String),
    #[error("This voter has already cast a ballot")]
    AlreadyVoted,
    #[error("No ballot has been cast yet")]
    NoBallotYet,
    #[error("No ballot found with ID {0}")]
    BallotNotFound(Id),
    #[error("Only the ballot's owner may modify it")]
    NotOwner,
    #[error(transparent)]
    Store(Error),
}

impl From<VoteError> for Error {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::Store(inner) => inner,
            VoteError::VoterNotFound(title) => Error::not_found(format!("Voter {title}")),
            VoteError::AlreadyVoted => Error::Status(
                Status::Conflict,
                "A ballot has already been cast for this voter; see /votes/mine".to_string(),
            ),
            VoteError::NoBallotYet => Error::Status(
                Status::NotFound,
                "No ballot has been cast yet; cast one via POST /votes".to_string(),
            ),
            VoteError::BallotNotFound(id) => Error::not_found(format!("Ballot {id}")),
            VoteError::NotOwner => {
                Error::forbidden("Only the ballot's owner may modify or delete it")
            }
        }
    }
}

/// The persistence collaborator contract the engine operates against.
///
/// `insert_ballot` must be atomic with respect to the one-ballot-per-voter
/// rule: a duplicate insert fails with [`VoteError::AlreadyVoted`] even if
/// the caller's pre-check raced against another request.
#[rocket::async_trait]
pub trait BallotStore {
    async fn find_voter_id_by_title(&self, title: &str) -> Result<Option<Id>, VoteError>;
    async fn count_ballots_for_voter(&self, voter_id: Id) -> Result<u64, VoteError>;
    async fn insert_ballot(&self, voter_id: Id, candidate_id: Id) -> Result<Id, VoteError>;
    async fn find_ballot(&self, ballot_id: Id) -> Result<Option<Ballot>, VoteError>;
    async fn find_ballot_for_voter(&self, voter_id: Id) -> Result<Option<Ballot>, VoteError>;
    async fn update_ballot_candidate(
        &self,
        ballot_id: Id,
        candidate_id: Id,
    ) -> Result<(), VoteError>;
    async fn delete_ballot(&self, ballot_id: Id) -> Result<(), VoteError>;
}

/// Cast a ballot for the voter identified by `voter_title`.
///
/// Returns the new ballot's ID. Fails with `AlreadyVoted` if the voter has
/// one already, whether detected by the pre-check or by the store's
/// uniqueness guard under a race.
pub async fn cast_ballot<S>(store: &S, voter_title: &str, candidate_id: Id) -> Result<Id, VoteError>
where
    S: BallotStore + Sync,
{
    let voter_id = resolve_voter(store, voter_title).await?;

    if store.count_ballots_for_voter(voter_id).await? > 0 {
        return Err(VoteError::AlreadyVoted);
    }

    store.insert_ballot(voter_id, candidate_id).await
}

/// Look up the (at most one) ballot of the voter identified by `voter_title`.
///
/// Fails with `NoBallotYet` if none exists, so the caller can send the
/// voter off to cast one.
pub async fn view_own_ballot<S>(store: &S, voter_title: &str) -> Result<Ballot, VoteError>
where
    S: BallotStore + Sync,
{
    let voter_id = resolve_voter(store, voter_title).await?;

    store
        .find_ballot_for_voter(voter_id)
        .await?
        .ok_or(VoteError::NoBallotYet)
}

/// Reassign the ballot's candidate. The cast timestamp is left untouched:
/// this is a correction, not a re-vote.
pub async fn edit_ballot<S>(
    store: &S,
    ballot_id: Id,
    new_candidate_id: Id,
    acting_title: &str,
    acting_role: Role,
) -> Result<(), VoteError>
where
    S: BallotStore + Sync,
{
    let ballot = owned_ballot(store, ballot_id, acting_title, acting_role).await?;
    store
        .update_ballot_candidate(ballot.id, new_candidate_id)
        .await
}

/// Delete the ballot, returning its voter to the no-ballot state.
pub async fn delete_ballot<S>(
    store: &S,
    ballot_id: Id,
    acting_title: &str,
    acting_role: Role,
) -> Result<(), VoteError>
where
    S: BallotStore + Sync,
{
    let ballot = owned_ballot(store, ballot_id, acting_title, acting_role).await?;
    store.delete_ballot(ballot.id).await
}

async fn resolve_voter<S>(store: &S, voter_title: &str) -> Result<Id, VoteError>
where
    S: BallotStore + Sync,
{
    store
        .find_voter_id_by_title(voter_title)
        .await?
        .ok_or_else(|| VoteError::VoterNotFound(voter_title.to_string()))
}

/// Fetch the ballot and enforce the mutation policy: only the Common-role
/// owner may touch it. Admin and Manager accounts are refused outright.
async fn owned_ballot<S>(
    store: &S,
    ballot_id: Id,
    acting_title: &str,
    acting_role: Role,
) -> Result<Ballot, VoteError>
where
    S: BallotStore + Sync,
{
    if acting_role != Role::Common {
        return Err(VoteError::NotOwner);
    }

    let voter_id = resolve_voter(store, acting_title).await?;
    let ballot = store
        .find_ballot(ballot_id)
        .await?
        .ok_or(VoteError::BallotNotFound(ballot_id))?;

    if ballot.voter_id != voter_id {
        return Err(VoteError::NotOwner);
    }

    Ok(ballot)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory stand-in for the persistence collaborator. The duplicate
    /// check inside `insert_ballot` plays the role of the database's unique
    /// index on `voter_id`.
    struct MemStore {
        voters: HashMap<String, Id>,
        ballots: Mutex<Vec<Ballot>>,
    }

    impl MemStore {
        fn with_voters(titles: &[&str]) -> Self {
            Self {
                voters: titles
                    .iter()
                    .map(|title| (title.to_string(), Id::new()))
                    .collect(),
                ballots: Mutex::new(Vec::new()),
            }
        }

        fn voter_id(&self, title: &str) -> Id {
            self.voters[title]
        }

        fn snapshot(&self) -> Vec<Ballot> {
            self.ballots.lock().unwrap().clone()
        }
    }

    #[rocket::async_trait]
    impl BallotStore for MemStore {
        async fn find_voter_id_by_title(&self, title: &str) -> Result<Option<Id>, VoteError> {
            Ok(self.voters.get(title).copied())
        }

        async fn count_ballots_for_voter(&self, voter_id: Id) -> Result<u64, VoteError> {
            let ballots = self.ballots.lock().unwrap();
            Ok(ballots.iter().filter(|b| b.voter_id == voter_id).count() as u64)
        }

        async fn insert_ballot(&self, voter_id: Id, candidate_id: Id) -> Result<Id, VoteError> {
            let mut ballots = self.ballots.lock().unwrap();
            // Uniqueness constraint on voter_id.
            if ballots.iter().any(|b| b.voter_id == voter_id) {
                return Err(VoteError::AlreadyVoted);
            }
            let ballot = Ballot::new(voter_id, candidate_id);
            let id = ballot.id;
            ballots.push(ballot);
            Ok(id)
        }

        async fn find_ballot(&self, ballot_id: Id) -> Result<Option<Ballot>, VoteError> {
            let ballots = self.ballots.lock().unwrap();
            Ok(ballots.iter().find(|b| b.id == ballot_id).cloned())
        }

        async fn find_ballot_for_voter(&self, voter_id: Id) -> Result<Option<Ballot>, VoteError> {
            let ballots = self.ballots.lock().unwrap();
            Ok(ballots.iter().find(|b| b.voter_id == voter_id).cloned())
        }

        async fn update_ballot_candidate(
            &self,
            ballot_id: Id,
            candidate_id: Id,
        ) -> Result<(), VoteError> {
            let mut ballots = self.ballots.lock().unwrap();
            let ballot = ballots
                .iter_mut()
                .find(|b| b.id == ballot_id)
                .ok_or(VoteError::BallotNotFound(ballot_id))?;
            ballot.candidate_id = candidate_id;
            Ok(())
        }

        async fn delete_ballot(&self, ballot_id: Id) -> Result<(), VoteError> {
            let mut ballots = self.ballots.lock().unwrap();
            ballots.retain(|b| b.id != ballot_id);
            Ok(())
        }
    }

    #[rocket::async_test]
    async fn cast_once_then_already_voted() {
        let store = MemStore::with_voters(&["123456"]);
        let candidate = Id::new();

        cast_ballot(&store, "123456", candidate).await.unwrap();
        assert_eq!(
            store
                .count_ballots_for_voter(store.voter_id("123456"))
                .await
                .unwrap(),
            1
        );

        let second = cast_ballot(&store, "123456", Id::new()).await;
        assert!(matches!(second, Err(VoteError::AlreadyVoted)));
        // Still exactly one ballot.
        assert_eq!(store.snapshot().len(), 1);
    }

    #[rocket::async_test]
    async fn cast_for_unknown_title_fails() {
        let store = MemStore::with_voters(&["123456"]);

        let result = cast_ballot(&store, "999999", Id::new()).await;
        assert!(matches!(result, Err(VoteError::VoterNotFound(title)) if title == "999999"));
    }

    #[rocket::async_test]
    async fn racing_inserts_have_exactly_one_winner() {
        // Both requests passed the pre-check; the store's uniqueness guard
        // must still reject the loser.
        let store = MemStore::with_voters(&["123456"]);
        let voter_id = store.voter_id("123456");

        let first = store.insert_ballot(voter_id, Id::new()).await;
        let second = store.insert_ballot(voter_id, Id::new()).await;

        assert!(first.is_ok());
        assert!(matches!(second, Err(VoteError::AlreadyVoted)));
    }

    #[rocket::async_test]
    async fn view_own_ballot_roundtrip() {
        let store = MemStore::with_voters(&["123456"]);
        let candidate = Id::new();

        // No ballot yet: the caller is told to go cast one.
        let before = view_own_ballot(&store, "123456").await;
        assert!(matches!(before, Err(VoteError::NoBallotYet)));

        let ballot_id = cast_ballot(&store, "123456", candidate).await.unwrap();

        let ballot = view_own_ballot(&store, "123456").await.unwrap();
        assert_eq!(ballot.id, ballot_id);
        assert_eq!(ballot.candidate_id, candidate);
    }

    #[rocket::async_test]
    async fn edit_changes_candidate_but_not_cast_time() {
        let store = MemStore::with_voters(&["123456"]);
        let ballot_id = cast_ballot(&store, "123456", Id::new()).await.unwrap();
        let before = store.find_ballot(ballot_id).await.unwrap().unwrap();

        let new_candidate = Id::new();
        edit_ballot(&store, ballot_id, new_candidate, "123456", Role::Common)
            .await
            .unwrap();

        let after = store.find_ballot(ballot_id).await.unwrap().unwrap();
        assert_eq!(after.candidate_id, new_candidate);
        assert_eq!(after.cast_at, before.cast_at);
    }

    #[rocket::async_test]
    async fn edit_by_other_voter_fails_and_leaves_ballot_unchanged() {
        let store = MemStore::with_voters(&["123456", "654321"]);
        let ballot_id = cast_ballot(&store, "123456", Id::new()).await.unwrap();
        let before = store.snapshot();

        let result = edit_ballot(&store, ballot_id, Id::new(), "654321", Role::Common).await;

        assert!(matches!(result, Err(VoteError::NotOwner)));
        assert_eq!(store.snapshot(), before);
    }

    #[rocket::async_test]
    async fn staff_roles_may_not_mutate_ballots() {
        let store = MemStore::with_voters(&["123456"]);
        let ballot_id = cast_ballot(&store, "123456", Id::new()).await.unwrap();

        for role in [Role::Admin, Role::Manager] {
            let edit = edit_ballot(&store, ballot_id, Id::new(), "123456", role).await;
            assert!(matches!(edit, Err(VoteError::NotOwner)));

            let delete = delete_ballot(&store, ballot_id, "123456", role).await;
            assert!(matches!(delete, Err(VoteError::NotOwner)));
        }
        assert_eq!(store.snapshot().len(), 1);
    }

    #[rocket::async_test]
    async fn delete_returns_voter_to_no_ballot_state() {
        let store = MemStore::with_voters(&["123456"]);
        let ballot_id = cast_ballot(&store, "123456", Id::new()).await.unwrap();

        delete_ballot(&store, ballot_id, "123456", Role::Common)
            .await
            .unwrap();

        let view = view_own_ballot(&store, "123456").await;
        assert!(matches!(view, Err(VoteError::NoBallotYet)));

        // The voter may now cast again.
        cast_ballot(&store, "123456", Id::new()).await.unwrap();
    }

    #[rocket::async_test]
    async fn edit_of_unknown_ballot_fails() {
        let store = MemStore::with_voters(&["123456"]);
        cast_ballot(&store, "123456", Id::new()).await.unwrap();

        let missing = Id::new();
        let result = edit_ballot(&store, missing, Id::new(), "123456", Role::Common).await;
        assert!(matches!(result, Err(VoteError::BallotNotFound(id)) if id == missing));
    }
}
