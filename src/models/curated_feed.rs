use super::package::PackageRegistration;
use super::user::User;
use crate::database::{ContextError, KeyRef, NewEntity, StagedKeys};
use crate::schema::{curated_feed_managers, curated_feeds, curated_packages};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::{Deserialize, Serialize};

#[derive(
    Queryable, Selectable, Identifiable, AsChangeset, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
#[diesel(table_name = curated_feeds, primary_key(key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CuratedFeed {
    pub key: i32,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewCuratedFeed {
    pub name: String,
}

impl NewCuratedFeed {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl NewEntity for NewCuratedFeed {
    fn insert(&self, conn: &mut SqliteConnection, _: &StagedKeys) -> Result<i32, ContextError> {
        let key = diesel::insert_into(curated_feeds::table)
            .values(curated_feeds::name.eq(&self.name))
            .returning(curated_feeds::key)
            .get_result(conn)?;
        Ok(key)
    }
}

// Row of the CuratedFeedManagers join table
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = curated_feed_managers, primary_key(curated_feed_key, user_key))]
#[diesel(belongs_to(CuratedFeed, foreign_key = curated_feed_key))]
#[diesel(belongs_to(User, foreign_key = user_key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CuratedFeedManager {
    pub curated_feed_key: i32,
    pub user_key: i32,
}

// A registration's membership in a curated feed
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
#[diesel(table_name = curated_packages, primary_key(key))]
#[diesel(belongs_to(CuratedFeed, foreign_key = curated_feed_key))]
#[diesel(belongs_to(PackageRegistration, foreign_key = package_registration_key))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CuratedPackage {
    pub key: i32,
    pub curated_feed_key: i32,
    pub package_registration_key: i32,
    pub automatically_included: bool,
    pub included: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCuratedPackage {
    pub curated_feed: KeyRef,
    pub package_registration: KeyRef,
    pub automatically_included: bool,
    pub included: bool,
    pub notes: Option<String>,
}

impl NewCuratedPackage {
    pub fn new(curated_feed: impl Into<KeyRef>, package_registration: impl Into<KeyRef>) -> Self {
        Self {
            curated_feed: curated_feed.into(),
            package_registration: package_registration.into(),
            automatically_included: false,
            included: true,
            notes: None,
        }
    }
}

impl NewEntity for NewCuratedPackage {
    fn insert(&self, conn: &mut SqliteConnection, keys: &StagedKeys) -> Result<i32, ContextError> {
        let curated_feed_key = keys.resolve(self.curated_feed)?;
        let registration_key = keys.resolve(self.package_registration)?;

        let key = diesel::insert_into(curated_packages::table)
            .values((
                curated_packages::curated_feed_key.eq(curated_feed_key),
                curated_packages::package_registration_key.eq(registration_key),
                curated_packages::automatically_included.eq(self.automatically_included),
                curated_packages::included.eq(self.included),
                curated_packages::notes.eq(&self.notes),
            ))
            .returning(curated_packages::key)
            .get_result(conn)?;
        Ok(key)
    }
}
