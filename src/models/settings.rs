use crate::database::{ContextError, NewEntity, StagedKeys};
use crate::schema::gallery_settings;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::{Deserialize, Serialize};

// Global configuration row; the gallery only ever reads the first one
#[derive(
    Queryable, Selectable, Identifiable, AsChangeset, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
#[diesel(table_name = gallery_settings, primary_key(key))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GallerySetting {
    pub key: i32,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i32>,
    pub use_smtp: bool,
    pub download_stats_last_aggregated_id: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct NewGallerySetting {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i32>,
    pub use_smtp: bool,
}

impl NewEntity for NewGallerySetting {
    fn insert(&self, conn: &mut SqliteConnection, _: &StagedKeys) -> Result<i32, ContextError> {
        let key = diesel::insert_into(gallery_settings::table)
            .values((
                gallery_settings::smtp_host.eq(&self.smtp_host),
                gallery_settings::smtp_port.eq(self.smtp_port),
                gallery_settings::use_smtp.eq(self.use_smtp),
            ))
            .returning(gallery_settings::key)
            .get_result(conn)?;
        Ok(key)
    }
}
