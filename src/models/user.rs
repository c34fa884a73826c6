use crate::database::{ContextError, KeyRef, NewEntity, StagedKeys};
use crate::schema::{email_messages, roles, user_roles, users};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::{Deserialize, Serialize};

// Account
#[derive(
    Queryable, Selectable, Identifiable, AsChangeset, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
#[diesel(table_name = users, primary_key(key))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub key: i32,
    pub username: String,
    pub email_address: Option<String>,
    pub unconfirmed_email_address: Option<String>,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub email_allowed: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email_address: Option<String>,
    pub hashed_password: String,
    pub api_key: String,
    pub email_allowed: bool,
    pub created_at: NaiveDateTime,
}

impl NewUser {
    pub fn new(
        username: String,
        email_address: String,
        password: &str,
    ) -> Result<Self, bcrypt::BcryptError> {
        let hashed_password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        Ok(Self::with_password_hash(username, Some(email_address), hashed_password))
    }

    pub fn with_password_hash(
        username: String,
        email_address: Option<String>,
        hashed_password: String,
    ) -> Self {
        Self {
            username,
            email_address,
            hashed_password,
            api_key: uuid::Uuid::new_v4().to_string(),
            email_allowed: true,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

impl NewEntity for NewUser {
    fn insert(&self, conn: &mut SqliteConnection, _: &StagedKeys) -> Result<i32, ContextError> {
        let key = diesel::insert_into(users::table)
            .values((
                users::username.eq(&self.username),
                users::email_address.eq(&self.email_address),
                users::unconfirmed_email_address.eq(None::<String>),
                users::hashed_password.eq(&self.hashed_password),
                users::api_key.eq(&self.api_key),
                users::email_allowed.eq(self.email_allowed),
                users::created_at.eq(self.created_at),
            ))
            .returning(users::key)
            .get_result(conn)?;
        Ok(key)
    }
}

impl User {
    pub fn verify_password(&self, password: &str) -> Result<bool, bcrypt::BcryptError> {
        bcrypt::verify(password, &self.hashed_password)
    }

    /// Generates a fresh API key; the change is written on the next save.
    pub fn regenerate_api_key(&mut self) {
        self.api_key = uuid::Uuid::new_v4().to_string();
    }
}

// Authorization group
#[derive(
    Queryable, Selectable, Identifiable, AsChangeset, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
#[diesel(table_name = roles, primary_key(key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Role {
    pub key: i32,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
}

impl NewRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl NewEntity for NewRole {
    fn insert(&self, conn: &mut SqliteConnection, _: &StagedKeys) -> Result<i32, ContextError> {
        let key = diesel::insert_into(roles::table)
            .values(roles::name.eq(&self.name))
            .returning(roles::key)
            .get_result(conn)?;
        Ok(key)
    }
}

// Row of the UserRoles join table
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = user_roles, primary_key(user_key, role_key))]
#[diesel(belongs_to(User, foreign_key = user_key))]
#[diesel(belongs_to(Role, foreign_key = role_key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRole {
    pub user_key: i32,
    pub role_key: i32,
}

// Notification addressed to a user
#[derive(
    Queryable,
    Selectable,
    Identifiable,
    Associations,
    AsChangeset,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    PartialEq,
)]
#[diesel(table_name = email_messages, primary_key(key))]
#[diesel(belongs_to(User, foreign_key = to_user_key))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EmailMessage {
    pub key: i32,
    pub to_user_key: i32,
    pub from_user_key: Option<i32>,
    pub subject: String,
    pub body: String,
    pub sent: bool,
}

#[derive(Debug, Clone)]
pub struct NewEmailMessage {
    pub to_user: KeyRef,
    pub from_user: Option<KeyRef>,
    pub subject: String,
    pub body: String,
}

impl NewEmailMessage {
    pub fn new(to_user: impl Into<KeyRef>, subject: String, body: String) -> Self {
        Self {
            to_user: to_user.into(),
            from_user: None,
            subject,
            body,
        }
    }

    pub fn from_user(mut self, user: impl Into<KeyRef>) -> Self {
        self.from_user = Some(user.into());
        self
    }
}

impl NewEntity for NewEmailMessage {
    fn insert(&self, conn: &mut SqliteConnection, keys: &StagedKeys) -> Result<i32, ContextError> {
        let to_user_key = keys.resolve(self.to_user)?;
        let from_user_key = self.from_user.map(|k| keys.resolve(k)).transpose()?;

        let key = diesel::insert_into(email_messages::table)
            .values((
                email_messages::to_user_key.eq(to_user_key),
                email_messages::from_user_key.eq(from_user_key),
                email_messages::subject.eq(&self.subject),
                email_messages::body.eq(&self.body),
                email_messages::sent.eq(false),
            ))
            .returning(email_messages::key)
            .get_result(conn)?;
        Ok(key)
    }
}
