use argon2::Config;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::db::{NewUser, Role};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw login credentials, received from a user. Never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub voter_title: String,
    pub password: String,
}

/// Self-registration request. The voter title must already exist in the
/// voter registry; the created account always has the Common role.
#[derive(Clone, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub voter_title: String,
    pub password: String,
    pub confirm_password: String,
}

impl TryFrom<RegisterRequest> for NewUser {
    type Error = ();

    /// Convert a [`RegisterRequest`] into a new Common-role user by hashing
    /// the password. Enforces non-empty name/title and minimum password length.
    fn try_from(req: RegisterRequest) -> Result<Self, Self::Error> {
        new_user(req.name, req.voter_title, &req.password, Role::Common)
    }
}

/// Admin-side user creation request; unlike self-registration, any role
/// may be assigned.
#[derive(Clone, Deserialize, Serialize)]
pub struct NewUserRequest {
    pub name: String,
    pub voter_title: String,
    pub password: String,
    pub role: Role,
}

impl TryFrom<NewUserRequest> for NewUser {
    type Error = ();

    fn try_from(req: NewUserRequest) -> Result<Self, Self::Error> {
        new_user(req.name, req.voter_title, &req.password, req.role)
    }
}

/// Admin-side user edit: name, role, and the active flag.
/// Passwords are not edited by admins.
#[derive(Clone, Deserialize, Serialize)]
pub struct UserUpdate {
    pub name: String,
    pub role: Role,
    pub active: bool,
}

fn new_user(name: String, voter_title: String, password: &str, role: Role) -> Result<NewUser, ()> {
    if name.is_empty() || voter_title.is_empty() || password.len() < MIN_PASSWORD_LENGTH {
        return Err(());
    }

    Ok(NewUser {
        name,
        voter_title,
        password_hash: hash_password(password),
        role,
        active: true,
        created_at: Utc::now(),
    })
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    // 16 bytes is the recommended salt length for Argon2.
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &Config::default()).unwrap() // Safe because the default `Config` is valid.
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl RegisterRequest {
        pub fn example() -> Self {
            Self {
                name: "João Silva".into(),
                voter_title: "123456".into(),
                password: "umasenhasegura".into(),
                confirm_password: "umasenhasegura".into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let user = NewUser::try_from(RegisterRequest::example()).unwrap();

        assert_eq!(user.role, Role::Common);
        assert!(user.active);
        assert!(user.verify_password("umasenhasegura"));
        assert!(!user.verify_password("wrong password"));
    }

    #[test]
    fn short_password_rejected() {
        let mut req = RegisterRequest::example();
        req.password = "short".into();

        assert!(NewUser::try_from(req).is_err());
    }

    #[test]
    fn empty_name_rejected() {
        let mut req = RegisterRequest::example();
        req.name = String::new();

        assert!(NewUser::try_from(req).is_err());
    }

    #[test]
    fn salts_are_unique() {
        assert_ne!(hash_password("hunter22"), hash_password("hunter22"));
    }
}
