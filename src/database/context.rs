//! The unit of work: typed access to every mapped table, staged writes and an
//! atomic save guarded by the read-only switch.

use super::connection::{DbConnection, DbPool, create_pool, get_connection_with_retry};
use super::entity::Entity;
use super::error::ContextError;
use super::mapping::{EntityKind, JoinTable};
use super::staging::{KeyRef, Staged, StagedChange, StagedKeys};
use crate::config::{AppConfig, DEFAULT_CONNECTION_STRING_NAME};
use crate::models::{CuratedFeed, CuratedPackage, PackageRegistration, User};
use diesel::prelude::*;
use log::{debug, info, warn};
use std::fmt;
use std::marker::PhantomData;

/// One instance per logical operation. Reads go straight to the store;
/// writes are staged and land together on [`EntitiesContext::save_changes`].
pub struct EntitiesContext {
    pool: DbPool,
    read_only: bool,
    pending: Vec<StagedChange>,
    next_slot: usize,
    saved_keys: StagedKeys,
}

impl fmt::Debug for EntitiesContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitiesContext")
            .field("read_only", &self.read_only)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl EntitiesContext {
    /// Opens a context on its own pool.
    pub fn new(connection_string: &str, read_only: bool) -> Result<Self, ContextError> {
        let pool = create_pool(connection_string)?;
        Ok(Self::with_pool(pool, read_only))
    }

    /// Opens a context on a shared pool. This is the per-request path.
    pub fn with_pool(pool: DbPool, read_only: bool) -> Self {
        Self {
            pool,
            read_only,
            pending: Vec::new(),
            next_slot: 0,
            saved_keys: StagedKeys::default(),
        }
    }

    /// Resolves `Gallery.SqlServer` from the environment. Only schema
    /// migration tooling should end up here; the site passes its read-only
    /// flag explicitly.
    pub fn from_default_connection() -> Result<Self, ContextError> {
        warn!(
            "Opening a context from the default connection string. \
             If this is not a migration run, the caller should pass a read-only flag."
        );
        let config = AppConfig::from_env();
        let connection_string = config
            .connection_string(DEFAULT_CONNECTION_STRING_NAME)
            .ok_or_else(|| {
                ContextError::MissingConnectionString(DEFAULT_CONNECTION_STRING_NAME.to_string())
            })?;
        Self::new(connection_string, false)
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub(crate) fn connection(&self) -> Result<DbConnection, ContextError> {
        Ok(get_connection_with_retry(&self.pool)?)
    }

    /// The collection for any mapped entity type.
    pub fn set<T: Entity>(&mut self) -> EntitySet<'_, T> {
        EntitySet {
            context: self,
            _entity: PhantomData,
        }
    }

    pub fn curated_feeds(&mut self) -> EntitySet<'_, CuratedFeed> {
        self.set()
    }

    pub fn curated_packages(&mut self) -> EntitySet<'_, CuratedPackage> {
        self.set()
    }

    pub fn package_registrations(&mut self) -> EntitySet<'_, PackageRegistration> {
        self.set()
    }

    pub fn users(&mut self) -> EntitySet<'_, User> {
        self.set()
    }

    /// Stages `entity` for removal. Nothing is deleted until the next save.
    pub fn delete_on_commit<T: Entity>(&mut self, entity: &T) {
        self.set::<T>().remove(entity);
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of staged inserts, updates and deletes against `kind`.
    pub fn pending_writes_to(&self, kind: EntityKind) -> usize {
        self.pending.iter().filter(|c| c.is_write_to(kind)).count()
    }

    /// Drops everything staged since the last save.
    pub fn discard_changes(&mut self) {
        self.pending.clear();
    }

    /// The generated key of a staged insert, once it has been saved.
    pub fn key_of<T>(&self, staged: Staged<T>) -> Option<i32> {
        self.saved_keys.get(staged.slot())
    }

    /// Stages a +1 on the download counters of `package` and its
    /// registration. The increment runs in SQL at save time.
    pub fn count_download(&mut self, package: impl Into<KeyRef>) {
        self.pending.push(StagedChange::CountDownload {
            package: package.into(),
        });
    }

    pub fn add_user_to_role(&mut self, user: impl Into<KeyRef>, role: impl Into<KeyRef>) {
        self.stage_link(JoinTable::UserRoles, user.into(), role.into());
    }

    pub fn remove_user_from_role(&mut self, user: impl Into<KeyRef>, role: impl Into<KeyRef>) {
        self.stage_unlink(JoinTable::UserRoles, user.into(), role.into());
    }

    pub fn add_package_owner(
        &mut self,
        registration: impl Into<KeyRef>,
        user: impl Into<KeyRef>,
    ) {
        self.stage_link(
            JoinTable::PackageRegistrationOwners,
            registration.into(),
            user.into(),
        );
    }

    pub fn remove_package_owner(
        &mut self,
        registration: impl Into<KeyRef>,
        user: impl Into<KeyRef>,
    ) {
        self.stage_unlink(
            JoinTable::PackageRegistrationOwners,
            registration.into(),
            user.into(),
        );
    }

    pub fn add_curated_feed_manager(&mut self, feed: impl Into<KeyRef>, user: impl Into<KeyRef>) {
        self.stage_link(JoinTable::CuratedFeedManagers, feed.into(), user.into());
    }

    pub fn remove_curated_feed_manager(
        &mut self,
        feed: impl Into<KeyRef>,
        user: impl Into<KeyRef>,
    ) {
        self.stage_unlink(JoinTable::CuratedFeedManagers, feed.into(), user.into());
    }

    fn stage_link(&mut self, join: JoinTable, left: KeyRef, right: KeyRef) {
        self.pending.push(StagedChange::Link { join, left, right });
    }

    fn stage_unlink(&mut self, join: JoinTable, left: KeyRef, right: KeyRef) {
        self.pending.push(StagedChange::Unlink { join, left, right });
    }

    /// Writes every staged change in one transaction and returns how many
    /// were written.
    ///
    /// A read-only context fails before touching the store and keeps its
    /// staged changes. Storage errors roll the transaction back and are
    /// returned as they are; the changes stay staged.
    pub fn save_changes(&mut self) -> Result<usize, ContextError> {
        if self.read_only {
            warn!(
                "Refusing to save {} staged change(s): context is read-only",
                self.pending.len()
            );
            return Err(ContextError::read_only());
        }

        if self.pending.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection()?;
        let mut keys = self.saved_keys.clone();
        let pending = &self.pending;

        // Write lock up front; concurrent savers wait on the busy timeout.
        conn.immediate_transaction::<_, ContextError, _>(|conn| {
            for change in pending {
                debug!("Applying {change:?}");
                change.apply(conn, &mut keys)?;
            }
            Ok(())
        })?;

        let written = self.pending.len();
        self.pending.clear();
        self.saved_keys.extend(keys);

        info!("Saved {written} change(s)");
        Ok(written)
    }
}

/// The collection of one entity type on a context.
pub struct EntitySet<'a, T: Entity> {
    context: &'a mut EntitiesContext,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> EntitySet<'_, T> {
    /// Every row, ordered by key.
    pub fn all(&self) -> Result<Vec<T>, ContextError> {
        let mut conn = self.context.connection()?;
        Ok(T::load_all(&mut conn)?)
    }

    pub fn find(&self, key: i32) -> Result<Option<T>, ContextError> {
        let mut conn = self.context.connection()?;
        Ok(T::find(&mut conn, key)?)
    }

    /// Stages an insert. The returned handle can stand in for the new key in
    /// other staged entities.
    pub fn add(&mut self, entity: T::New) -> Staged<T> {
        let slot = self.context.next_slot;
        self.context.next_slot += 1;
        self.context.pending.push(StagedChange::Insert {
            slot,
            kind: T::KIND,
            entity: Box::new(entity),
        });
        Staged::new(slot)
    }

    /// Stages a full-row update of an entity that was read and changed.
    pub fn update(&mut self, entity: T) {
        self.context.pending.push(StagedChange::Update {
            kind: T::KIND,
            key: entity.key(),
            entity: Box::new(entity),
        });
    }

    /// Stages a delete. Dependents go with it or block it according to the
    /// model mapping.
    pub fn remove(&mut self, entity: &T) {
        self.context.pending.push(StagedChange::Delete {
            kind: T::KIND,
            key: entity.key(),
            delete: T::delete,
        });
    }
}
