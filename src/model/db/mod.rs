//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.
//! IDs and datetimes use MongoDB's own formats. The `api` module holds
//! the JSON-facing counterparts.

mod ballot;
pub use ballot::{Ballot, BallotCore};

mod candidate;
pub use candidate::{Candidate, CandidateCore, NewCandidate};

mod user;
pub use user::{NewUser, Role, User, UserCore};

mod voter;
pub use voter::{NewVoter, Voter, VoterCore};
