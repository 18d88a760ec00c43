use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    db::{Role, User},
    mongodb::Id,
};

pub const SESSION_COOKIE: &str = "session_token";

/// The per-request session context: who is making the request.
///
/// This is carried in a signed JWT cookie set at login, and handed
/// explicitly to the authorization gate and the vote engine. There is no
/// ambient session state anywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Id,
    pub name: String,
    pub role: Role,
    pub voter_title: String,
}

impl Session {
    /// Start a session for the given user account.
    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            role: user.role,
            voter_title: user.voter_title.clone(),
        }
    }

    /// Serialize this session into its cookie.
    #[allow(clippy::missing_panics_doc)]
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            session: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(SESSION_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize a session from its cookie, rejecting expired tokens.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, Error> {
        let session = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Claims>| data.claims.session)?;
        Ok(session)
    }
}

/// Cookie claims: the session itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    session: Session,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Session {
    type Error = Error;

    /// Decode the session from the cookie. Forwards (rather than failing)
    /// when there is no valid session, so routes can take `Option<Session>`
    /// and let the gate decide what absence means.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = try_outcome!(req.cookies().get(SESSION_COOKIE).or_forward(()));
        let session = try_outcome!(Self::from_cookie(cookie, config).or_forward(()));

        Outcome::Success(session)
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Session {
        pub fn example() -> Self {
            Self::example_with_role(Role::Common)
        }

        pub fn example_with_role(role: Role) -> Self {
            Self {
                user_id: Id::new(),
                name: "Maria Souza".to_string(),
                role,
                voter_title: "123456789012".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_roundtrip() {
        let config = Config::example();
        let session = Session::example();

        let cookie = session.clone().into_cookie(&config);
        let decoded = Session::from_cookie(&cookie, &config).unwrap();

        assert_eq!(session, decoded);
    }

    #[test]
    fn tampered_cookie_rejected() {
        let config = Config::example();
        let cookie = Session::example().into_cookie(&config);

        let mut value = cookie.value().to_string();
        value.pop();
        let tampered = Cookie::new(SESSION_COOKIE, value);

        assert!(Session::from_cookie(&tampered, &config).is_err());
    }
}
