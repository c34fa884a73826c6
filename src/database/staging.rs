//! Changes staged on a context and written by the next save.

use super::entity::Entity;
use super::error::ContextError;
use super::mapping::{EntityKind, JoinTable};
use crate::schema::{
    curated_feed_managers, package_registration_owners, package_registrations, packages,
    user_roles,
};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Handle to an insert that has been staged but maybe not saved.
pub struct Staged<T> {
    slot: usize,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Staged<T> {
    pub(crate) fn new(slot: usize) -> Self {
        Self {
            slot,
            _entity: PhantomData,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl<T> Clone for Staged<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Staged<T> {}

impl<T> PartialEq for Staged<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<T> Eq for Staged<T> {}

impl<T> fmt::Debug for Staged<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Staged").field(&self.slot).finish()
    }
}

/// A foreign key value: either a row that already exists or an insert
/// staged earlier on the same context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRef {
    Key(i32),
    Staged(usize),
}

impl From<i32> for KeyRef {
    fn from(key: i32) -> Self {
        KeyRef::Key(key)
    }
}

impl<T> From<Staged<T>> for KeyRef {
    fn from(staged: Staged<T>) -> Self {
        KeyRef::Staged(staged.slot)
    }
}

impl<T: Entity> From<&T> for KeyRef {
    fn from(entity: &T) -> Self {
        KeyRef::Key(entity.key())
    }
}

/// Keys generated for staged inserts, by slot.
#[derive(Debug, Default, Clone)]
pub struct StagedKeys {
    keys: HashMap<usize, i32>,
}

impl StagedKeys {
    pub fn resolve(&self, key: KeyRef) -> Result<i32, ContextError> {
        match key {
            KeyRef::Key(key) => Ok(key),
            KeyRef::Staged(slot) => self
                .keys
                .get(&slot)
                .copied()
                .ok_or(ContextError::UnresolvedReference(slot)),
        }
    }

    pub fn get(&self, slot: usize) -> Option<i32> {
        self.keys.get(&slot).copied()
    }

    pub(crate) fn record(&mut self, slot: usize, key: i32) {
        self.keys.insert(slot, key);
    }

    pub(crate) fn extend(&mut self, other: StagedKeys) {
        self.keys.extend(other.keys);
    }
}

/// A not-yet-saved row. Implementations resolve their foreign keys and
/// insert themselves, returning the generated key.
pub trait NewEntity: Send + fmt::Debug {
    fn insert(&self, conn: &mut SqliteConnection, keys: &StagedKeys) -> Result<i32, ContextError>;
}

pub(crate) trait PendingUpdate: Send + fmt::Debug {
    fn apply(&self, conn: &mut SqliteConnection) -> QueryResult<usize>;
}

impl<T: Entity> PendingUpdate for T {
    fn apply(&self, conn: &mut SqliteConnection) -> QueryResult<usize> {
        self.update(conn)
    }
}

pub(crate) enum StagedChange {
    Insert {
        slot: usize,
        kind: EntityKind,
        entity: Box<dyn NewEntity>,
    },
    Update {
        kind: EntityKind,
        key: i32,
        entity: Box<dyn PendingUpdate>,
    },
    Delete {
        kind: EntityKind,
        key: i32,
        delete: fn(&mut SqliteConnection, i32) -> QueryResult<usize>,
    },
    /// In-place +1 on the download counters of a package and its registration.
    CountDownload {
        package: KeyRef,
    },
    Link {
        join: JoinTable,
        left: KeyRef,
        right: KeyRef,
    },
    Unlink {
        join: JoinTable,
        left: KeyRef,
        right: KeyRef,
    },
}

impl fmt::Debug for StagedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagedChange::Insert { slot, kind, entity } => f
                .debug_struct("Insert")
                .field("slot", slot)
                .field("kind", kind)
                .field("entity", entity)
                .finish(),
            StagedChange::Update { kind, key, .. } => {
                f.debug_struct("Update").field("kind", kind).field("key", key).finish()
            }
            StagedChange::Delete { kind, key, .. } => {
                f.debug_struct("Delete").field("kind", kind).field("key", key).finish()
            }
            StagedChange::CountDownload { package } => f
                .debug_struct("CountDownload")
                .field("package", package)
                .finish(),
            StagedChange::Link { join, left, right } => f
                .debug_struct("Link")
                .field("join", join)
                .field("left", left)
                .field("right", right)
                .finish(),
            StagedChange::Unlink { join, left, right } => f
                .debug_struct("Unlink")
                .field("join", join)
                .field("left", left)
                .field("right", right)
                .finish(),
        }
    }
}

fn expect_rows(affected: usize) -> QueryResult<usize> {
    // A row that vanished since it was read is a concurrency conflict.
    if affected == 0 {
        Err(diesel::result::Error::NotFound)
    } else {
        Ok(affected)
    }
}

impl StagedChange {
    pub(crate) fn is_write_to(&self, target: EntityKind) -> bool {
        match self {
            StagedChange::Insert { kind, .. }
            | StagedChange::Update { kind, .. }
            | StagedChange::Delete { kind, .. } => *kind == target,
            StagedChange::CountDownload { .. } => {
                matches!(target, EntityKind::Package | EntityKind::PackageRegistration)
            }
            StagedChange::Link { .. } | StagedChange::Unlink { .. } => false,
        }
    }

    /// Writes this change. Generated keys of inserts go into `keys`.
    pub(crate) fn apply(
        &self,
        conn: &mut SqliteConnection,
        keys: &mut StagedKeys,
    ) -> Result<(), ContextError> {
        match self {
            StagedChange::Insert { slot, entity, .. } => {
                let key = entity.insert(conn, keys)?;
                keys.record(*slot, key);
            }
            StagedChange::Update { entity, .. } => {
                expect_rows(entity.apply(conn)?)?;
            }
            StagedChange::Delete { key, delete, .. } => {
                expect_rows(delete(conn, *key)?)?;
            }
            StagedChange::CountDownload { package } => {
                count_download(conn, keys.resolve(*package)?)?;
            }
            StagedChange::Link { join, left, right } => {
                let (left, right) = (keys.resolve(*left)?, keys.resolve(*right)?);
                link(conn, *join, left, right)?;
            }
            StagedChange::Unlink { join, left, right } => {
                let (left, right) = (keys.resolve(*left)?, keys.resolve(*right)?);
                unlink(conn, *join, left, right)?;
            }
        }
        Ok(())
    }
}

fn count_download(conn: &mut SqliteConnection, package_key: i32) -> QueryResult<()> {
    let registration_key: i32 = packages::table
        .find(package_key)
        .select(packages::package_registration_key)
        .first(conn)?;

    expect_rows(
        diesel::update(packages::table.find(package_key))
            .set(packages::download_count.eq(packages::download_count + 1))
            .execute(conn)?,
    )?;
    expect_rows(
        diesel::update(package_registrations::table.find(registration_key))
            .set(package_registrations::download_count.eq(package_registrations::download_count + 1))
            .execute(conn)?,
    )?;
    Ok(())
}

fn link(conn: &mut SqliteConnection, join: JoinTable, left: i32, right: i32) -> QueryResult<usize> {
    match join {
        JoinTable::UserRoles => diesel::insert_or_ignore_into(user_roles::table)
            .values((user_roles::user_key.eq(left), user_roles::role_key.eq(right)))
            .execute(conn),
        JoinTable::PackageRegistrationOwners => {
            diesel::insert_or_ignore_into(package_registration_owners::table)
                .values((
                    package_registration_owners::package_registration_key.eq(left),
                    package_registration_owners::user_key.eq(right),
                ))
                .execute(conn)
        }
        JoinTable::CuratedFeedManagers => diesel::insert_or_ignore_into(curated_feed_managers::table)
            .values((
                curated_feed_managers::curated_feed_key.eq(left),
                curated_feed_managers::user_key.eq(right),
            ))
            .execute(conn),
    }
}

fn unlink(conn: &mut SqliteConnection, join: JoinTable, left: i32, right: i32) -> QueryResult<usize> {
    match join {
        JoinTable::UserRoles => diesel::delete(
            user_roles::table
                .filter(user_roles::user_key.eq(left))
                .filter(user_roles::role_key.eq(right)),
        )
        .execute(conn),
        JoinTable::PackageRegistrationOwners => diesel::delete(
            package_registration_owners::table
                .filter(package_registration_owners::package_registration_key.eq(left))
                .filter(package_registration_owners::user_key.eq(right)),
        )
        .execute(conn),
        JoinTable::CuratedFeedManagers => diesel::delete(
            curated_feed_managers::table
                .filter(curated_feed_managers::curated_feed_key.eq(left))
                .filter(curated_feed_managers::user_key.eq(right)),
        )
        .execute(conn),
    }
}
