mod session;

pub use session::{Session, SESSION_COOKIE};
