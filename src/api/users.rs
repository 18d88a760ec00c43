//! User account management. Admin only.

use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    gate::{self, AccessPolicy},
    model::{
        api::{
            auth::Session,
            credentials::{NewUserRequest, UserUpdate},
            views::UserView,
        },
        db::{NewUser, Role, User},
        mongodb::{is_duplicate_key, Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![list_users, get_user, create_user, update_user, delete_user]
}

const MANAGE_USERS: AccessPolicy = AccessPolicy::roles("Admin");

#[get("/users")]
async fn list_users(session: Option<Session>, users: Coll<User>) -> Result<Json<Vec<UserView>>> {
    gate::check(&MANAGE_USERS, session.as_ref())?;

    let all: Vec<User> = users.find(None, None).await?.try_collect().await?;
    Ok(Json(all.into_iter().map(UserView::from).collect()))
}

#[get("/users/<id>")]
async fn get_user(session: Option<Session>, id: Id, users: Coll<User>) -> Result<Json<UserView>> {
    gate::check(&MANAGE_USERS, session.as_ref())?;

    let user = users
        .find_one(id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {id}")))?;
    Ok(Json(user.into()))
}

#[post("/users", data = "<request>", format = "json")]
async fn create_user(
    session: Option<Session>,
    request: Json<NewUserRequest>,
    new_users: Coll<NewUser>,
) -> Result<Json<Id>> {
    gate::check(&MANAGE_USERS, session.as_ref())?;

    let new_user = NewUser::try_from(request.into_inner())
        .map_err(|_| Error::bad_request("Invalid name, voter title, or password"))?;

    match new_users.insert_one(&new_user, None).await {
        Ok(result) => {
            let id = result.inserted_id.as_object_id().ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    "Insert did not yield an ObjectId".to_string(),
                )
            })?;
            Ok(Json(id.into()))
        }
        Err(err) if is_duplicate_key(&err) => Err(Error::conflict(
            "An account already exists for this voter title",
        )),
        Err(err) => Err(err.into()),
    }
}

#[put("/users/<id>", data = "<update>", format = "json")]
async fn update_user(
    session: Option<Session>,
    id: Id,
    update: Json<UserUpdate>,
    users: Coll<User>,
) -> Result<()> {
    gate::check(&MANAGE_USERS, session.as_ref())?;

    if update.name.is_empty() {
        return Err(Error::bad_request("The name must not be empty"));
    }

    let user = users
        .find_one(id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {id}")))?;

    // An update that strips this account of active-Admin status must not
    // leave the system without one.
    let loses_admin = user.role == Role::Admin
        && user.active
        && !(update.role == Role::Admin && update.active);
    if loses_admin && count_other_active_admins(&users, id).await? == 0 {
        return Err(Error::conflict("Cannot demote the last active Admin"));
    }

    let changes = doc! {
        "$set": {
            "name": &update.name,
            "role": update.role.as_str(),
            "active": update.active,
        }
    };
    users.update_one(id.as_doc(), changes, None).await?;
    Ok(())
}

/// Deactivate the account. Deletion is soft so that historical actions
/// stay attributable.
#[delete("/users/<id>")]
async fn delete_user(session: Option<Session>, id: Id, users: Coll<User>) -> Result<()> {
    gate::check(&MANAGE_USERS, session.as_ref())?;

    let user = users
        .find_one(id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {id}")))?;

    if user.role == Role::Admin
        && user.active
        && count_other_active_admins(&users, id).await? == 0
    {
        return Err(Error::conflict("Cannot deactivate the last active Admin"));
    }

    users
        .update_one(id.as_doc(), doc! {"$set": {"active": false}}, None)
        .await?;
    Ok(())
}

async fn count_other_active_admins(users: &Coll<User>, excluding: Id) -> Result<u64> {
    let filter = doc! {
        "role": Role::Admin.as_str(),
        "active": true,
        "_id": {"$ne": excluding},
    };
    Ok(users.count_documents(filter, None).await?)
}
