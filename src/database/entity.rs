//! The per-type accessor behind `EntitiesContext::set`.

use super::mapping::EntityKind;
use super::staging::NewEntity;
use crate::models::*;
use crate::schema::*;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::fmt::Debug;

/// A mapped row type. Every table in the model has exactly one implementation.
pub trait Entity: Clone + Debug + Send + Sized + 'static {
    const KIND: EntityKind;

    /// The staged-insert form of this entity.
    type New: NewEntity + 'static;

    fn key(&self) -> i32;

    fn load_all(conn: &mut SqliteConnection) -> QueryResult<Vec<Self>>;

    fn find(conn: &mut SqliteConnection, key: i32) -> QueryResult<Option<Self>>;

    /// Writes every column of `self` to its row.
    fn update(&self, conn: &mut SqliteConnection) -> QueryResult<usize>;

    fn delete(conn: &mut SqliteConnection, key: i32) -> QueryResult<usize>;
}

macro_rules! impl_entity {
    ($($entity:ident => $table:ident, $new:ident;)+) => {
        $(
            impl Entity for $entity {
                const KIND: EntityKind = EntityKind::$entity;
                type New = $new;

                fn key(&self) -> i32 {
                    self.key
                }

                fn load_all(conn: &mut SqliteConnection) -> QueryResult<Vec<Self>> {
                    $table::table
                        .order($table::key.asc())
                        .select($entity::as_select())
                        .load(conn)
                }

                fn find(conn: &mut SqliteConnection, key: i32) -> QueryResult<Option<Self>> {
                    $table::table
                        .find(key)
                        .select($entity::as_select())
                        .first(conn)
                        .optional()
                }

                fn update(&self, conn: &mut SqliteConnection) -> QueryResult<usize> {
                    diesel::update($table::table.find(self.key))
                        .set(self)
                        .execute(conn)
                }

                fn delete(conn: &mut SqliteConnection, key: i32) -> QueryResult<usize> {
                    diesel::delete($table::table.find(key)).execute(conn)
                }
            }
        )+
    };
}

impl_entity! {
    User => users, NewUser;
    Role => roles, NewRole;
    EmailMessage => email_messages, NewEmailMessage;
    PackageRegistration => package_registrations, NewPackageRegistration;
    Package => packages, NewPackage;
    PackageStatistics => package_statistics, NewPackageStatistics;
    PackageDependency => package_dependencies, NewPackageDependency;
    PackageEdit => package_edits, NewPackageEdit;
    PackageHistory => package_histories, NewPackageHistory;
    GallerySetting => gallery_settings, NewGallerySetting;
    PackageOwnerRequest => package_owner_requests, NewPackageOwnerRequest;
    PackageFramework => package_frameworks, NewPackageFramework;
    CuratedFeed => curated_feeds, NewCuratedFeed;
    CuratedPackage => curated_packages, NewCuratedPackage;
}
