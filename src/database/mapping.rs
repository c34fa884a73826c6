//! Model mapping: which entity lives in which table, how the tables reference
//! each other and what a delete does to dependent rows.
//!
//! The mapping is built once per process by [`ModelMapping::gallery`] and is
//! checked against the migrated schema whenever a pool is opened.

use super::error::ContextError;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Nullable, Text};
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Role,
    EmailMessage,
    PackageRegistration,
    Package,
    PackageStatistics,
    PackageDependency,
    PackageEdit,
    PackageHistory,
    GallerySetting,
    PackageOwnerRequest,
    PackageFramework,
    CuratedFeed,
    CuratedPackage,
}

impl EntityKind {
    pub const ALL: [EntityKind; 14] = [
        EntityKind::User,
        EntityKind::Role,
        EntityKind::EmailMessage,
        EntityKind::PackageRegistration,
        EntityKind::Package,
        EntityKind::PackageStatistics,
        EntityKind::PackageDependency,
        EntityKind::PackageEdit,
        EntityKind::PackageHistory,
        EntityKind::GallerySetting,
        EntityKind::PackageOwnerRequest,
        EntityKind::PackageFramework,
        EntityKind::CuratedFeed,
        EntityKind::CuratedPackage,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Role => "roles",
            EntityKind::EmailMessage => "email_messages",
            EntityKind::PackageRegistration => "package_registrations",
            EntityKind::Package => "packages",
            EntityKind::PackageStatistics => "package_statistics",
            EntityKind::PackageDependency => "package_dependencies",
            EntityKind::PackageEdit => "package_edits",
            EntityKind::PackageHistory => "package_histories",
            EntityKind::GallerySetting => "gallery_settings",
            EntityKind::PackageOwnerRequest => "package_owner_requests",
            EntityKind::PackageFramework => "package_frameworks",
            EntityKind::CuratedFeed => "curated_feeds",
            EntityKind::CuratedPackage => "curated_packages",
        }
    }
}

/// The three physical many-to-many tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinTable {
    UserRoles,
    PackageRegistrationOwners,
    CuratedFeedManagers,
}

impl JoinTable {
    pub fn table_name(self) -> &'static str {
        match self {
            JoinTable::UserRoles => "UserRoles",
            JoinTable::PackageRegistrationOwners => "PackageRegistrationOwners",
            JoinTable::CuratedFeedManagers => "CuratedFeedManagers",
        }
    }

    /// (left key column, right key column)
    pub fn key_columns(self) -> (&'static str, &'static str) {
        match self {
            JoinTable::UserRoles => ("UserKey", "RoleKey"),
            JoinTable::PackageRegistrationOwners => ("PackageRegistrationKey", "UserKey"),
            JoinTable::CuratedFeedManagers => ("CuratedFeedKey", "UserKey"),
        }
    }
}

/// What happens to a dependent row when its principal row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteBehavior {
    Cascade,
    /// The delete is refused while dependents exist.
    Restrict,
}

impl DeleteBehavior {
    /// SQLite's spelling, as reported by `pragma_foreign_key_list`.
    pub fn sql_action(self) -> &'static str {
        match self {
            DeleteBehavior::Cascade => "CASCADE",
            DeleteBehavior::Restrict => "NO ACTION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMapping {
    pub kind: EntityKind,
    pub table: &'static str,
    pub key_column: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relationship {
    /// Many dependents point at one principal through `foreign_key`.
    Reference {
        dependent: EntityKind,
        principal: EntityKind,
        foreign_key: &'static str,
        required: bool,
        on_delete: DeleteBehavior,
    },
    ManyToMany {
        left: EntityKind,
        right: EntityKind,
        join_table: JoinTable,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ModelMapping {
    entities: Vec<EntityMapping>,
    relationships: Vec<Relationship>,
}

/// Fluent declaration of the model, one relationship at a time.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    mapping: ModelMapping,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, kind: EntityKind, key_column: &'static str) -> Self {
        self.mapping.entities.push(EntityMapping {
            kind,
            table: kind.table_name(),
            key_column,
        });
        self
    }

    /// Required reference. Deleting the principal cascades unless
    /// [`ModelBuilder::will_cascade_on_delete`] turns it off.
    pub fn has_required(
        mut self,
        dependent: EntityKind,
        principal: EntityKind,
        foreign_key: &'static str,
    ) -> Self {
        self.mapping.relationships.push(Relationship::Reference {
            dependent,
            principal,
            foreign_key,
            required: true,
            on_delete: DeleteBehavior::Cascade,
        });
        self
    }

    /// Optional reference. Never cascades.
    pub fn has_optional(
        mut self,
        dependent: EntityKind,
        principal: EntityKind,
        foreign_key: &'static str,
    ) -> Self {
        self.mapping.relationships.push(Relationship::Reference {
            dependent,
            principal,
            foreign_key,
            required: false,
            on_delete: DeleteBehavior::Restrict,
        });
        self
    }

    /// Overrides the delete behaviour of the last declared reference.
    pub fn will_cascade_on_delete(mut self, cascade: bool) -> Self {
        if let Some(Relationship::Reference { on_delete, .. }) =
            self.mapping.relationships.last_mut()
        {
            *on_delete = if cascade {
                DeleteBehavior::Cascade
            } else {
                DeleteBehavior::Restrict
            };
        }
        self
    }

    pub fn many_to_many(mut self, left: EntityKind, right: EntityKind, join_table: JoinTable) -> Self {
        self.mapping.relationships.push(Relationship::ManyToMany {
            left,
            right,
            join_table,
        });
        self
    }

    pub fn build(self) -> ModelMapping {
        self.mapping
    }
}

fn build_gallery_model() -> ModelMapping {
    use EntityKind::*;

    ModelBuilder::new()
        .entity(User, "key")
        .has_required(EmailMessage, User, "to_user_key")
        .many_to_many(User, Role, JoinTable::UserRoles)
        .entity(Role, "key")
        .entity(EmailMessage, "key")
        .has_optional(EmailMessage, User, "from_user_key")
        .entity(PackageRegistration, "key")
        .has_required(Package, PackageRegistration, "package_registration_key")
        .many_to_many(PackageRegistration, User, JoinTable::PackageRegistrationOwners)
        .entity(Package, "key")
        .has_required(PackageStatistics, Package, "package_key")
        .has_required(PackageDependency, Package, "package_key")
        .has_required(PackageFramework, Package, "package_key")
        .entity(PackageEdit, "key")
        .has_required(PackageEdit, User, "user_key")
        .will_cascade_on_delete(false)
        .has_required(PackageEdit, Package, "package_key")
        .will_cascade_on_delete(false)
        .entity(PackageHistory, "key")
        .has_optional(PackageHistory, User, "user_key")
        .has_required(PackageHistory, Package, "package_key")
        .will_cascade_on_delete(false)
        .entity(PackageStatistics, "key")
        .entity(PackageDependency, "key")
        .entity(GallerySetting, "key")
        .entity(PackageOwnerRequest, "key")
        .has_required(PackageOwnerRequest, PackageRegistration, "package_registration_key")
        .has_required(PackageOwnerRequest, User, "new_owner_key")
        .will_cascade_on_delete(false)
        .has_required(PackageOwnerRequest, User, "requesting_owner_key")
        .will_cascade_on_delete(false)
        .entity(PackageFramework, "key")
        .entity(CuratedFeed, "key")
        .has_required(CuratedPackage, CuratedFeed, "curated_feed_key")
        .many_to_many(CuratedFeed, User, JoinTable::CuratedFeedManagers)
        .entity(CuratedPackage, "key")
        .has_required(CuratedPackage, PackageRegistration, "package_registration_key")
        .build()
}

#[derive(QueryableByName, Debug)]
struct ForeignKeyRow {
    #[diesel(sql_type = Text)]
    table: String,
    #[diesel(sql_type = Text)]
    from: String,
    #[diesel(sql_type = Nullable<Text>)]
    to: Option<String>,
    #[diesel(sql_type = Text)]
    on_delete: String,
}

#[derive(QueryableByName, Debug)]
struct ColumnRow {
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Integer)]
    notnull: i32,
    #[diesel(sql_type = Integer)]
    pk: i32,
}

fn foreign_keys(conn: &mut SqliteConnection, table: &str) -> QueryResult<Vec<ForeignKeyRow>> {
    diesel::sql_query(
        r#"SELECT "table", "from", "to", on_delete FROM pragma_foreign_key_list(?)"#,
    )
    .bind::<Text, _>(table)
    .load(conn)
}

fn columns(conn: &mut SqliteConnection, table: &str) -> QueryResult<Vec<ColumnRow>> {
    diesel::sql_query(r#"SELECT name, "notnull", pk FROM pragma_table_info(?)"#)
        .bind::<Text, _>(table)
        .load(conn)
}

impl ModelMapping {
    /// The gallery model, built on first use.
    pub fn gallery() -> &'static ModelMapping {
        static MODEL: OnceLock<ModelMapping> = OnceLock::new();
        MODEL.get_or_init(build_gallery_model)
    }

    pub fn entities(&self) -> &[EntityMapping] {
        &self.entities
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn entity(&self, kind: EntityKind) -> Option<&EntityMapping> {
        self.entities.iter().find(|e| e.kind == kind)
    }

    /// References whose principal is `kind`, i.e. the rows a delete of
    /// `kind` reaches.
    pub fn dependents_of(&self, kind: EntityKind) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(move |r| {
            matches!(r, Relationship::Reference { principal, .. } if *principal == kind)
        })
    }

    pub fn join_table_for(&self, left: EntityKind, right: EntityKind) -> Option<JoinTable> {
        self.relationships.iter().find_map(|relationship| match relationship {
            Relationship::ManyToMany {
                left: l,
                right: r,
                join_table,
            } if (*l == left && *r == right) || (*l == right && *r == left) => Some(*join_table),
            _ => None,
        })
    }

    /// Checks keys, foreign keys, nullability and delete actions against the
    /// live schema.
    pub fn verify(&self, conn: &mut SqliteConnection) -> Result<(), ContextError> {
        for entity in &self.entities {
            let cols = columns(conn, entity.table)?;
            if cols.is_empty() {
                return Err(ContextError::Mapping(format!(
                    "table '{}' does not exist",
                    entity.table
                )));
            }
            if !cols.iter().any(|c| c.name == entity.key_column && c.pk > 0) {
                return Err(ContextError::Mapping(format!(
                    "'{}.{}' is not the primary key",
                    entity.table, entity.key_column
                )));
            }
        }

        for relationship in &self.relationships {
            match relationship {
                Relationship::Reference {
                    dependent,
                    principal,
                    foreign_key,
                    required,
                    on_delete,
                } => {
                    self.verify_reference(
                        conn,
                        dependent.table_name(),
                        foreign_key,
                        principal.table_name(),
                        *on_delete,
                    )?;

                    let cols = columns(conn, dependent.table_name())?;
                    let column = cols.iter().find(|c| c.name == *foreign_key).ok_or_else(|| {
                        ContextError::Mapping(format!(
                            "column '{}.{}' does not exist",
                            dependent.table_name(),
                            foreign_key
                        ))
                    })?;
                    if (column.notnull != 0) != *required {
                        return Err(ContextError::Mapping(format!(
                            "'{}.{}' nullability does not match a {} reference",
                            dependent.table_name(),
                            foreign_key,
                            if *required { "required" } else { "optional" }
                        )));
                    }
                }
                Relationship::ManyToMany {
                    left,
                    right,
                    join_table,
                } => {
                    let (left_key, right_key) = join_table.key_columns();
                    self.verify_reference(
                        conn,
                        join_table.table_name(),
                        left_key,
                        left.table_name(),
                        DeleteBehavior::Cascade,
                    )?;
                    self.verify_reference(
                        conn,
                        join_table.table_name(),
                        right_key,
                        right.table_name(),
                        DeleteBehavior::Cascade,
                    )?;
                }
            }
        }

        debug!(
            "Model mapping verified: {} entities, {} relationships",
            self.entities.len(),
            self.relationships.len()
        );

        Ok(())
    }

    fn verify_reference(
        &self,
        conn: &mut SqliteConnection,
        table: &str,
        column: &str,
        principal_table: &str,
        on_delete: DeleteBehavior,
    ) -> Result<(), ContextError> {
        let principal_key = self
            .entities
            .iter()
            .find(|e| e.table == principal_table)
            .map(|e| e.key_column)
            .unwrap_or("key");

        let fks = foreign_keys(conn, table)?;
        let fk = fks
            .iter()
            .find(|fk| fk.from == column && fk.table == principal_table)
            .ok_or_else(|| {
                ContextError::Mapping(format!(
                    "no foreign key from '{table}.{column}' to '{principal_table}'"
                ))
            })?;

        if fk.to.as_deref().is_some_and(|to| to != principal_key) {
            return Err(ContextError::Mapping(format!(
                "'{table}.{column}' does not reference '{principal_table}.{principal_key}'"
            )));
        }

        if !fk.on_delete.eq_ignore_ascii_case(on_delete.sql_action()) {
            return Err(ContextError::Mapping(format!(
                "'{table}.{column}' deletes with {} but the model expects {}",
                fk.on_delete,
                on_delete.sql_action()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entity_is_mapped_once() {
        let model = ModelMapping::gallery();
        for kind in EntityKind::ALL {
            assert_eq!(
                model.entities().iter().filter(|e| e.kind == kind).count(),
                1,
                "{kind:?}"
            );
        }
    }

    #[test]
    fn audit_trail_references_do_not_cascade() {
        let model = ModelMapping::gallery();
        let audit: Vec<_> = model
            .dependents_of(EntityKind::Package)
            .filter_map(|r| match r {
                Relationship::Reference {
                    dependent,
                    on_delete,
                    ..
                } if matches!(dependent, EntityKind::PackageEdit | EntityKind::PackageHistory) => {
                    Some(*on_delete)
                }
                _ => None,
            })
            .collect();

        assert_eq!(audit, vec![DeleteBehavior::Restrict, DeleteBehavior::Restrict]);
    }

    #[test]
    fn registrations_cascade_to_packages() {
        let model = ModelMapping::gallery();
        assert!(model.dependents_of(EntityKind::PackageRegistration).any(|r| matches!(
            r,
            Relationship::Reference {
                dependent: EntityKind::Package,
                required: true,
                on_delete: DeleteBehavior::Cascade,
                ..
            }
        )));
    }

    #[test]
    fn join_tables_are_found_from_either_side() {
        let model = ModelMapping::gallery();
        assert_eq!(
            model.join_table_for(EntityKind::Role, EntityKind::User),
            Some(JoinTable::UserRoles)
        );
        assert_eq!(
            model.join_table_for(EntityKind::User, EntityKind::CuratedFeed),
            Some(JoinTable::CuratedFeedManagers)
        );
        assert_eq!(
            JoinTable::PackageRegistrationOwners.key_columns(),
            ("PackageRegistrationKey", "UserKey")
        );
        assert_eq!(model.join_table_for(EntityKind::Role, EntityKind::Package), None);
    }

    #[test]
    fn builder_overrides_last_reference_only() {
        let model = ModelBuilder::new()
            .has_required(EntityKind::Package, EntityKind::PackageRegistration, "a")
            .has_required(EntityKind::PackageEdit, EntityKind::Package, "b")
            .will_cascade_on_delete(false)
            .build();

        let behaviours: Vec<_> = model
            .relationships()
            .iter()
            .filter_map(|r| match r {
                Relationship::Reference { on_delete, .. } => Some(*on_delete),
                _ => None,
            })
            .collect();
        assert_eq!(behaviours, vec![DeleteBehavior::Cascade, DeleteBehavior::Restrict]);
    }
}
