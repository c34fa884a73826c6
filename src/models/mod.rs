// Re-export all models from their respective modules
pub mod curated_feed;
pub mod package;
pub mod settings;
pub mod user;

pub use curated_feed::*;
pub use package::*;
pub use settings::*;
pub use user::*;
