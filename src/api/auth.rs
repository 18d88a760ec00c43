use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    gate::{self, AccessPolicy},
    model::{
        api::{
            auth::{Session, SESSION_COOKIE},
            credentials::{LoginRequest, RegisterRequest},
            views::UserView,
        },
        db::{NewUser, User, Voter},
        mongodb::{is_duplicate_key, Coll},
    },
};

pub fn routes() -> Vec<Route> {
    routes![login, login_prompt, register, logout]
}

const LOGIN: AccessPolicy = AccessPolicy::anonymous();
const REGISTER: AccessPolicy = AccessPolicy::anonymous();
// Logging out without a session is a harmless no-op, not an error.
const LOGOUT: AccessPolicy = AccessPolicy::anonymous();

/// Log in with voter title and password, starting a session.
#[post("/auth/login", data = "<credentials>", format = "json")]
async fn login(
    session: Option<Session>,
    credentials: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    users: Coll<User>,
    voters: Coll<Voter>,
    config: &State<Config>,
) -> Result<Json<UserView>> {
    gate::check_at_login(&LOGIN, session.as_ref())?;

    let with_title = doc! {
        "voter_title": &credentials.voter_title,
        "active": true,
    };
    let account = users.find_one(with_title, None).await?;

    // The registry entry may have been deleted since the account was
    // created; such orphaned accounts cannot log in.
    let registry_entry = voters
        .find_one(doc! {"voter_title": &credentials.voter_title}, None)
        .await?;

    let user = verified_login(account, registry_entry, &credentials.password)?;
    cookies.add(Session::for_user(&user).into_cookie(config));

    Ok(Json(user.into()))
}

/// Redirect target for unauthenticated requests to protected routes. An
/// API client landing here is told how to authenticate rather than being
/// bounced to login again.
#[get("/auth/login")]
async fn login_prompt(session: Option<Session>) -> Result<()> {
    gate::check_at_login(&LOGIN, session.as_ref())?;
    Err(Error::unauthorized(
        "Log in by POSTing {voter_title, password} to /auth/login",
    ))
}

/// Accept the login only for an active account whose voter title is still
/// in the voter registry, with a matching password.
fn verified_login(
    account: Option<User>,
    registry_entry: Option<Voter>,
    password: &str,
) -> Result<User> {
    account
        .filter(|_| registry_entry.is_some())
        .filter(|user| user.verify_password(password))
        .ok_or_else(|| {
            Error::unauthorized("No active account matches that voter title and password")
        })
}

/// Self-register a Common-role account against the voter registry.
#[post("/auth/register", data = "<request>", format = "json")]
async fn register(
    session: Option<Session>,
    request: Json<RegisterRequest>,
    cookies: &CookieJar<'_>,
    voters: Coll<Voter>,
    new_users: Coll<NewUser>,
    config: &State<Config>,
) -> Result<Json<UserView>> {
    gate::check(&REGISTER, session.as_ref())?;

    let request = request.into_inner();
    if request.password != request.confirm_password {
        return Err(Error::bad_request("Password confirmation does not match"));
    }

    // Accounts are only open to registered voters.
    let with_title = doc! {"voter_title": &request.voter_title};
    if voters.find_one(with_title, None).await?.is_none() {
        return Err(Error::bad_request(
            "The voter title is not in the voter registry",
        ));
    }

    let new_user = NewUser::try_from(request)
        .map_err(|_| Error::bad_request("Invalid name, voter title, or password"))?;

    let user_id = match new_users.insert_one(&new_user, None).await {
        Ok(result) => result.inserted_id.as_object_id().ok_or_else(|| {
            Error::Status(
                Status::InternalServerError,
                "Insert did not yield an ObjectId".to_string(),
            )
        })?,
        Err(err) if is_duplicate_key(&err) => {
            return Err(Error::conflict(
                "An account already exists for this voter title",
            ))
        }
        Err(err) => return Err(err.into()),
    };

    let user = User {
        id: user_id.into(),
        user: new_user,
    };
    cookies.add(Session::for_user(&user).into_cookie(config));

    Ok(Json(user.into()))
}

/// End the session by clearing its cookie.
#[delete("/auth")]
async fn logout(session: Option<Session>, cookies: &CookieJar<'_>) -> Result<()> {
    gate::check(&LOGOUT, session.as_ref())?;
    cookies.remove(Cookie::named(SESSION_COOKIE));
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::{
        api::credentials::hash_password,
        db::{Role, UserCore},
        mongodb::Id,
    };

    fn account_with_password(password: &str) -> User {
        User {
            id: Id::new(),
            user: UserCore {
                name: "João Silva".to_string(),
                voter_title: "123456".to_string(),
                password_hash: hash_password(password),
                role: Role::Common,
                active: true,
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn login_accepts_account_with_registry_entry() {
        let account = account_with_password("umasenhasegura");
        let id = account.id;

        let user =
            verified_login(Some(account), Some(Voter::example()), "umasenhasegura").unwrap();
        assert_eq!(user.id, id);
    }

    #[test]
    fn login_rejects_account_whose_voter_entry_is_gone() {
        let account = account_with_password("umasenhasegura");

        assert!(verified_login(Some(account), None, "umasenhasegura").is_err());
    }

    #[test]
    fn login_rejects_wrong_password() {
        let account = account_with_password("umasenhasegura");

        assert!(verified_login(Some(account), Some(Voter::example()), "wrong").is_err());
    }

    #[test]
    fn login_rejects_unknown_account() {
        assert!(verified_login(None, Some(Voter::example()), "umasenhasegura").is_err());
    }

    #[rocket::async_test]
    async fn login_prompt_asks_for_credentials() {
        let response = login_prompt(None).await;
        assert!(matches!(
            response,
            Err(Error::Status(status, _)) if status == Status::Unauthorized
        ));
    }
}
