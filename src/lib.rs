pub mod config;
pub mod database;
pub mod error;
pub mod fairings;
pub mod feed;
pub mod models;
pub mod routes;
pub mod schema;
pub mod state;

use database::ContextError;
use rocket::Config;
use rocket_cors::{AllowedOrigins, CorsOptions};

pub use config::AppConfig;
pub use database::EntitiesContext;
pub use fairings::RequestLogger;
pub use state::AppState;

/// Builds the server around `config`: one pool for the process, migrated and
/// checked against the model mapping before any route is mounted.
pub fn create_rocket(
    config: AppConfig,
) -> Result<rocket::Rocket<rocket::Build>, Box<dyn std::error::Error>> {
    let database_url = config
        .database_url()
        .ok_or_else(|| {
            ContextError::MissingConnectionString(config::DEFAULT_CONNECTION_STRING_NAME.to_string())
        })?
        .to_string();
    let pool = database::create_pool(&database_url)?;

    let rocket_config = Config {
        port: config.port,
        address: config.host.parse::<std::net::IpAddr>()?,
        ..Config::default()
    };

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .to_cors()?;

    let state = AppState { config, pool };

    Ok(rocket::custom(&rocket_config)
        .manage(state)
        .attach(cors)
        .attach(RequestLogger)
        .mount("/", routes::get_routes()))
}
