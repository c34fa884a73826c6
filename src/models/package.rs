use super::user::User;
use crate::database::{ContextError, KeyRef, NewEntity, StagedKeys};
use crate::schema::{
    package_dependencies, package_edits, package_frameworks, package_histories,
    package_owner_requests, package_registration_owners, package_registrations,
    package_statistics, packages,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::{Deserialize, Serialize};

// Package identity - one row per package id, versions hang off it
#[derive(
    Queryable, Selectable, Identifiable, AsChangeset, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
#[diesel(table_name = package_registrations, primary_key(key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageRegistration {
    pub key: i32,
    pub id: String,
    pub download_count: i32,
}

#[derive(Debug, Clone)]
pub struct NewPackageRegistration {
    pub id: String,
}

impl NewPackageRegistration {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl NewEntity for NewPackageRegistration {
    fn insert(&self, conn: &mut SqliteConnection, _: &StagedKeys) -> Result<i32, ContextError> {
        let key = diesel::insert_into(package_registrations::table)
            .values((
                package_registrations::id.eq(&self.id),
                package_registrations::download_count.eq(0),
            ))
            .returning(package_registrations::key)
            .get_result(conn)?;
        Ok(key)
    }
}

// Row of the PackageRegistrationOwners join table
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = package_registration_owners, primary_key(package_registration_key, user_key))]
#[diesel(belongs_to(PackageRegistration, foreign_key = package_registration_key))]
#[diesel(belongs_to(User, foreign_key = user_key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageRegistrationOwner {
    pub package_registration_key: i32,
    pub user_key: i32,
}

// One version of a registration
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
#[diesel(table_name = packages, primary_key(key))]
#[diesel(belongs_to(PackageRegistration, foreign_key = package_registration_key))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Package {
    pub key: i32,
    pub package_registration_key: i32,
    pub version: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<String>,
    pub listed: bool,
    pub is_latest: bool,
    pub download_count: i32,
    pub hash: String,
    pub package_file_size: i64,
    pub created: NaiveDateTime,
    pub published: NaiveDateTime,
    pub last_updated: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPackage {
    pub package_registration: KeyRef,
    pub version: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<String>,
    pub listed: bool,
    pub is_latest: bool,
    pub hash: String,
    pub package_file_size: i64,
    pub created: NaiveDateTime,
}

impl NewPackage {
    pub fn new(package_registration: impl Into<KeyRef>, version: impl Into<String>) -> Self {
        Self {
            package_registration: package_registration.into(),
            version: version.into(),
            title: None,
            description: None,
            summary: None,
            tags: None,
            listed: true,
            is_latest: false,
            hash: String::new(),
            package_file_size: 0,
            created: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn latest(mut self) -> Self {
        self.is_latest = true;
        self
    }

    pub fn unlisted(mut self) -> Self {
        self.listed = false;
        self
    }
}

impl NewEntity for NewPackage {
    fn insert(&self, conn: &mut SqliteConnection, keys: &StagedKeys) -> Result<i32, ContextError> {
        let registration_key = keys.resolve(self.package_registration)?;

        let key = diesel::insert_into(packages::table)
            .values((
                packages::package_registration_key.eq(registration_key),
                packages::version.eq(&self.version),
                packages::title.eq(&self.title),
                packages::description.eq(&self.description),
                packages::summary.eq(&self.summary),
                packages::tags.eq(&self.tags),
                packages::listed.eq(self.listed),
                packages::is_latest.eq(self.is_latest),
                packages::download_count.eq(0),
                packages::hash.eq(&self.hash),
                packages::package_file_size.eq(self.package_file_size),
                packages::created.eq(self.created),
                packages::published.eq(self.created),
                packages::last_updated.eq(self.created),
            ))
            .returning(packages::key)
            .get_result(conn)?;
        Ok(key)
    }
}

// Download event
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
#[diesel(table_name = package_statistics, primary_key(key))]
#[diesel(belongs_to(Package, foreign_key = package_key))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageStatistics {
    pub key: i32,
    pub package_key: i32,
    pub timestamp: NaiveDateTime,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub operation: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPackageStatistics {
    pub package: KeyRef,
    pub timestamp: NaiveDateTime,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub operation: Option<String>,
}

impl NewPackageStatistics {
    pub fn download(package: impl Into<KeyRef>, user_agent: Option<String>) -> Self {
        Self {
            package: package.into(),
            timestamp: chrono::Utc::now().naive_utc(),
            ip_address: None,
            user_agent,
            operation: Some("Download".to_string()),
        }
    }
}

impl NewEntity for NewPackageStatistics {
    fn insert(&self, conn: &mut SqliteConnection, keys: &StagedKeys) -> Result<i32, ContextError> {
        let package_key = keys.resolve(self.package)?;

        let key = diesel::insert_into(package_statistics::table)
            .values((
                package_statistics::package_key.eq(package_key),
                package_statistics::timestamp.eq(self.timestamp),
                package_statistics::ip_address.eq(&self.ip_address),
                package_statistics::user_agent.eq(&self.user_agent),
                package_statistics::operation.eq(&self.operation),
            ))
            .returning(package_statistics::key)
            .get_result(conn)?;
        Ok(key)
    }
}

// Declared dependency edge
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
#[diesel(table_name = package_dependencies, primary_key(key))]
#[diesel(belongs_to(Package, foreign_key = package_key))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageDependency {
    pub key: i32,
    pub package_key: i32,
    pub id: String,
    pub version_spec: Option<String>,
    pub target_framework: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPackageDependency {
    pub package: KeyRef,
    pub id: String,
    pub version_spec: Option<String>,
    pub target_framework: Option<String>,
}

impl NewPackageDependency {
    pub fn new(package: impl Into<KeyRef>, id: impl Into<String>, version_spec: Option<String>) -> Self {
        Self {
            package: package.into(),
            id: id.into(),
            version_spec,
            target_framework: None,
        }
    }
}

impl NewEntity for NewPackageDependency {
    fn insert(&self, conn: &mut SqliteConnection, keys: &StagedKeys) -> Result<i32, ContextError> {
        let package_key = keys.resolve(self.package)?;

        let key = diesel::insert_into(package_dependencies::table)
            .values((
                package_dependencies::package_key.eq(package_key),
                package_dependencies::id.eq(&self.id),
                package_dependencies::version_spec.eq(&self.version_spec),
                package_dependencies::target_framework.eq(&self.target_framework),
            ))
            .returning(package_dependencies::key)
            .get_result(conn)?;
        Ok(key)
    }
}

// Pending metadata edit; survives deletion attempts of its package
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
#[diesel(table_name = package_edits, primary_key(key))]
#[diesel(belongs_to(Package, foreign_key = package_key))]
#[diesel(belongs_to(User, foreign_key = user_key))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageEdit {
    pub key: i32,
    pub package_key: i32,
    pub user_key: i32,
    pub timestamp: NaiveDateTime,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub tried_count: i32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPackageEdit {
    pub package: KeyRef,
    pub user: KeyRef,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
}

impl NewPackageEdit {
    pub fn new(package: impl Into<KeyRef>, user: impl Into<KeyRef>) -> Self {
        Self {
            package: package.into(),
            user: user.into(),
            title: None,
            description: None,
            tags: None,
        }
    }
}

impl NewEntity for NewPackageEdit {
    fn insert(&self, conn: &mut SqliteConnection, keys: &StagedKeys) -> Result<i32, ContextError> {
        let package_key = keys.resolve(self.package)?;
        let user_key = keys.resolve(self.user)?;

        let key = diesel::insert_into(package_edits::table)
            .values((
                package_edits::package_key.eq(package_key),
                package_edits::user_key.eq(user_key),
                package_edits::timestamp.eq(chrono::Utc::now().naive_utc()),
                package_edits::title.eq(&self.title),
                package_edits::description.eq(&self.description),
                package_edits::tags.eq(&self.tags),
                package_edits::tried_count.eq(0),
            ))
            .returning(package_edits::key)
            .get_result(conn)?;
        Ok(key)
    }
}

// Audit record of an applied edit
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
#[diesel(table_name = package_histories, primary_key(key))]
#[diesel(belongs_to(Package, foreign_key = package_key))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageHistory {
    pub key: i32,
    pub package_key: i32,
    pub user_key: Option<i32>,
    pub timestamp: NaiveDateTime,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub hash: String,
}

#[derive(Debug, Clone)]
pub struct NewPackageHistory {
    pub package: KeyRef,
    pub user: Option<KeyRef>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub hash: String,
}

impl NewPackageHistory {
    /// Snapshots the current metadata of `package` before an edit lands.
    pub fn snapshot(package: &Package, user: Option<KeyRef>) -> Self {
        Self {
            package: KeyRef::Key(package.key),
            user,
            title: package.title.clone(),
            description: package.description.clone(),
            tags: package.tags.clone(),
            hash: package.hash.clone(),
        }
    }
}

impl NewEntity for NewPackageHistory {
    fn insert(&self, conn: &mut SqliteConnection, keys: &StagedKeys) -> Result<i32, ContextError> {
        let package_key = keys.resolve(self.package)?;
        let user_key = self.user.map(|k| keys.resolve(k)).transpose()?;

        let key = diesel::insert_into(package_histories::table)
            .values((
                package_histories::package_key.eq(package_key),
                package_histories::user_key.eq(user_key),
                package_histories::timestamp.eq(chrono::Utc::now().naive_utc()),
                package_histories::title.eq(&self.title),
                package_histories::description.eq(&self.description),
                package_histories::tags.eq(&self.tags),
                package_histories::hash.eq(&self.hash),
            ))
            .returning(package_histories::key)
            .get_result(conn)?;
        Ok(key)
    }
}

// Ownership-transfer invitation
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
#[diesel(table_name = package_owner_requests, primary_key(key))]
#[diesel(belongs_to(PackageRegistration, foreign_key = package_registration_key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageOwnerRequest {
    pub key: i32,
    pub package_registration_key: i32,
    pub new_owner_key: i32,
    pub requesting_owner_key: i32,
    #[serde(skip_serializing)]
    pub confirmation_code: String,
    pub request_date: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPackageOwnerRequest {
    pub package_registration: KeyRef,
    pub new_owner: KeyRef,
    pub requesting_owner: KeyRef,
    pub confirmation_code: String,
}

impl NewPackageOwnerRequest {
    pub fn new(
        package_registration: impl Into<KeyRef>,
        new_owner: impl Into<KeyRef>,
        requesting_owner: impl Into<KeyRef>,
    ) -> Self {
        Self {
            package_registration: package_registration.into(),
            new_owner: new_owner.into(),
            requesting_owner: requesting_owner.into(),
            confirmation_code: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

impl NewEntity for NewPackageOwnerRequest {
    fn insert(&self, conn: &mut SqliteConnection, keys: &StagedKeys) -> Result<i32, ContextError> {
        let registration_key = keys.resolve(self.package_registration)?;
        let new_owner_key = keys.resolve(self.new_owner)?;
        let requesting_owner_key = keys.resolve(self.requesting_owner)?;

        let key = diesel::insert_into(package_owner_requests::table)
            .values((
                package_owner_requests::package_registration_key.eq(registration_key),
                package_owner_requests::new_owner_key.eq(new_owner_key),
                package_owner_requests::requesting_owner_key.eq(requesting_owner_key),
                package_owner_requests::confirmation_code.eq(&self.confirmation_code),
                package_owner_requests::request_date.eq(chrono::Utc::now().naive_utc()),
            ))
            .returning(package_owner_requests::key)
            .get_result(conn)?;
        Ok(key)
    }
}

// Target framework tag
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
#[diesel(table_name = package_frameworks, primary_key(key))]
#[diesel(belongs_to(Package, foreign_key = package_key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageFramework {
    pub key: i32,
    pub package_key: i32,
    pub target_framework: String,
}

#[derive(Debug, Clone)]
pub struct NewPackageFramework {
    pub package: KeyRef,
    pub target_framework: String,
}

impl NewPackageFramework {
    pub fn new(package: impl Into<KeyRef>, target_framework: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            target_framework: target_framework.into(),
        }
    }
}

impl NewEntity for NewPackageFramework {
    fn insert(&self, conn: &mut SqliteConnection, keys: &StagedKeys) -> Result<i32, ContextError> {
        let package_key = keys.resolve(self.package)?;

        let key = diesel::insert_into(package_frameworks::table)
            .values((
                package_frameworks::package_key.eq(package_key),
                package_frameworks::target_framework.eq(&self.target_framework),
            ))
            .returning(package_frameworks::key)
            .get_result(conn)?;
        Ok(key)
    }
}
