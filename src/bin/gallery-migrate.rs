//! Brings the `Gallery.SqlServer` database up to the current schema.

use gallery::EntitiesContext;
use gallery::database::ModelMapping;
use log::{error, info};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    // Opening the context migrates the schema and verifies the mapping.
    match EntitiesContext::from_default_connection() {
        Ok(_) => {
            info!(
                "Schema is current: {} entities, {} relationships",
                ModelMapping::gallery().entities().len(),
                ModelMapping::gallery().relationships().len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Migration failed: {e}");
            ExitCode::FAILURE
        }
    }
}
