use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use tracing::debug;

use crate::models::{NewUser, UserEntity};
use crate::schema::users::dsl;
use crate::{now_millis, DbError};

pub struct CreateUser<'a> {
    pub firebase_uid: &'a str,
    pub email: &'a str,
    pub full_name: Option<&'a str>,
    pub role: &'a str,
}

pub fn create_user(conn: &mut SqliteConnection, user: CreateUser<'_>) -> Result<UserEntity, DbError> {
    debug!("Persisting user {} ({})", user.email, user.firebase_uid);

    let new_user = NewUser {
        firebase_uid: user.firebase_uid,
        email: user.email,
        full_name: user.full_name,
        role: user.role,
        is_active: true,
        created_at: now_millis(),
    };

    diesel::insert_into(dsl::users)
        .values(&new_user)
        .execute(conn)?;

    dsl::users
        .filter(dsl::firebase_uid.eq(user.firebase_uid))
        .select(UserEntity::as_select())
        .first(conn)
        .map_err(Into::into)
}

pub fn get_user_by_firebase_uid(
    conn: &mut SqliteConnection,
    firebase_uid: &str,
) -> Result<Option<UserEntity>, DbError> {
    dsl::users
        .filter(dsl::firebase_uid.eq(firebase_uid))
        .select(UserEntity::as_select())
        .first(conn)
        .optional()
        .map_err(Into::into)
}

pub fn get_user_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<UserEntity>, DbError> {
    dsl::users
        .filter(dsl::email.eq(email))
        .select(UserEntity::as_select())
        .first(conn)
        .optional()
        .map_err(Into::into)
}

pub fn count_users(conn: &mut SqliteConnection) -> Result<i64, DbError> {
    dsl::users.count().get_result(conn).map_err(Into::into)
}
