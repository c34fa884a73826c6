use log::info;
use std::collections::HashMap;
use std::env;

/// Name of the connection string the default context constructor resolves.
pub const DEFAULT_CONNECTION_STRING_NAME: &str = "Gallery.SqlServer";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub host: String,
    pub site_root: String,
    pub read_only: bool,
    pub connection_strings: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut connection_strings = HashMap::new();
        connection_strings.insert(
            DEFAULT_CONNECTION_STRING_NAME.to_string(),
            "./data/gallery.db".to_string(),
        );

        Self {
            port: 8000,
            host: "127.0.0.1".to_string(),
            site_root: "http://localhost:8000/".to_string(),
            read_only: false,
            connection_strings,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env::var("GALLERY_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .unwrap_or(8000);

        let host = env::var("GALLERY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let site_root = normalize_site_root(
            &env::var("GALLERY_SITE_ROOT").unwrap_or_else(|_| format!("http://localhost:{port}/")),
        );

        let read_only = env::var("GALLERY_READ_ONLY")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let database_url =
            env::var("GALLERY_SQLSERVER").unwrap_or_else(|_| "./data/gallery.db".to_string());

        let mut connection_strings = HashMap::new();
        connection_strings.insert(DEFAULT_CONNECTION_STRING_NAME.to_string(), database_url);

        info!("Configuration loaded:");
        info!("  Host: {host}");
        info!("  Port: {port}");
        info!("  Site Root: {site_root}");
        info!("  Read Only: {read_only}");
        info!(
            "  {DEFAULT_CONNECTION_STRING_NAME}: {}",
            connection_strings[DEFAULT_CONNECTION_STRING_NAME]
        );

        Self {
            port,
            host,
            site_root,
            read_only,
            connection_strings,
        }
    }

    pub fn connection_string(&self, name: &str) -> Option<&str> {
        self.connection_strings.get(name).map(String::as_str)
    }

    pub fn database_url(&self) -> Option<&str> {
        self.connection_string(DEFAULT_CONNECTION_STRING_NAME)
    }
}

/// Site roots always end with a slash so paths can be appended directly.
pub fn normalize_site_root(root: &str) -> String {
    let trimmed = root.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "127.0.0.1");
        assert!(!config.read_only);
        assert_eq!(config.site_root, "http://localhost:8000/");
        assert_eq!(config.database_url(), Some("./data/gallery.db"));
    }

    #[test]
    fn test_unknown_connection_string() {
        let config = AppConfig::default();
        assert_eq!(config.connection_string("Gallery.Other"), None);
    }

    #[test]
    fn test_site_root_gets_trailing_slash() {
        assert_eq!(normalize_site_root("https://nuget.org"), "https://nuget.org/");
        assert_eq!(normalize_site_root("https://nuget.org/ "), "https://nuget.org/");
    }

    #[test]
    fn test_config_parsing() {
        assert_eq!("8080".parse::<u16>().unwrap_or(8000), 8080);
        assert_eq!("invalid".parse::<u16>().unwrap_or(8000), 8000);
        assert!(!"nope".parse::<bool>().unwrap_or(false));
    }
}
