use gallery::AppConfig;
use log::error;

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let rocket = gallery::create_rocket(AppConfig::from_env()).inspect_err(|e| {
        error!("Failed to start gallery: {e}");
    })?;

    rocket.launch().await.map_err(|e| e.to_string())?;
    Ok(())
}
