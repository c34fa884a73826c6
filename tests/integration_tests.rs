use gallery::database::create_pool;
use gallery::models::{NewPackage, NewPackageRegistration, Package};
use gallery::{AppConfig, EntitiesContext};
use rocket::http::{Header, Status};
use rocket::local::blocking::Client;
use serial_test::serial;
use std::collections::HashMap;
use tempfile::TempDir;

struct TestRocket {
    rocket: rocket::Rocket<rocket::Build>,
    _temp_dir: TempDir, // Keep alive for cleanup
}

fn test_config(temp_dir: &TempDir, read_only: bool) -> AppConfig {
    let database_url = temp_dir.path().join("gallery.db");
    let mut connection_strings = HashMap::new();
    connection_strings.insert(
        gallery::config::DEFAULT_CONNECTION_STRING_NAME.to_string(),
        database_url.to_string_lossy().into_owned(),
    );

    AppConfig {
        port: 8000,
        host: "127.0.0.1".to_string(),
        site_root: "http://nuget.test/".to_string(),
        read_only,
        connection_strings,
    }
}

/// Seeds `Foo` 1.0.0 (listed) and 2.0.0 (unlisted) plus `Bar` 1.0.0.
fn seed(config: &AppConfig) {
    let url = config.database_url().expect("database url");
    let pool = create_pool(url).expect("Failed to create pool");
    let mut context = EntitiesContext::with_pool(pool, false);

    let foo = context
        .package_registrations()
        .add(NewPackageRegistration::new("Foo"));
    context.set::<Package>().add(
        NewPackage::new(foo, "1.0.0")
            .title("Foo")
            .description("The foo library"),
    );
    context
        .set::<Package>()
        .add(NewPackage::new(foo, "2.0.0").unlisted());

    let bar = context
        .package_registrations()
        .add(NewPackageRegistration::new("Bar"));
    context.set::<Package>().add(
        NewPackage::new(bar, "1.0.0")
            .description("Bar tools")
            .latest(),
    );

    context.save_changes().expect("Failed to seed packages");
}

fn create_test_rocket(read_only: bool) -> TestRocket {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = test_config(&temp_dir, false);
    seed(&config);

    let rocket = gallery::create_rocket(AppConfig {
        read_only,
        ..config
    })
    .expect("Failed to build rocket");

    TestRocket {
        rocket,
        _temp_dir: temp_dir,
    }
}

fn feed(client: &Client, uri: &str) -> Vec<serde_json::Value> {
    let response = client.get(uri.to_string()).dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().expect("Response body");
    serde_json::from_str(&body).expect("Valid JSON")
}

#[test]
#[serial]
fn test_health_check() {
    let test_rocket = create_test_rocket(false);
    let client = Client::tracked(test_rocket.rocket).expect("valid rocket instance");
    let response = client.get("/api/v1/health").dispatch();

    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().expect("Response body");
    let json: serde_json::Value = serde_json::from_str(&body).expect("Valid JSON");
    assert_eq!(json["status"], "ok");
    assert_eq!(json["read_only"], false);
}

#[test]
#[serial]
fn test_health_reports_read_only() {
    let test_rocket = create_test_rocket(true);
    let client = Client::tracked(test_rocket.rocket).expect("valid rocket instance");
    let body = client
        .get("/api/v1/health")
        .dispatch()
        .into_string()
        .expect("Response body");
    let json: serde_json::Value = serde_json::from_str(&body).expect("Valid JSON");
    assert_eq!(json["read_only"], true);
}

#[test]
#[serial]
fn test_packages_feed_skips_unlisted() {
    let test_rocket = create_test_rocket(false);
    let client = Client::tracked(test_rocket.rocket).expect("valid rocket instance");

    let entries = feed(&client, "/api/v2/Packages");
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e["Listed"] == true));
    assert!(!entries.iter().any(|e| e["Version"] == "2.0.0"));
}

#[test]
#[serial]
fn test_packages_feed_paging() {
    let test_rocket = create_test_rocket(false);
    let client = Client::tracked(test_rocket.rocket).expect("valid rocket instance");

    assert_eq!(feed(&client, "/api/v2/Packages?top=1").len(), 1);
    assert_eq!(feed(&client, "/api/v2/Packages?skip=1&top=5").len(), 1);
    assert!(feed(&client, "/api/v2/Packages?skip=10").is_empty());
}

#[test]
#[serial]
fn test_feed_urls_follow_request_scheme() {
    let test_rocket = create_test_rocket(false);
    let client = Client::tracked(test_rocket.rocket).expect("valid rocket instance");

    let entries = feed(&client, "/api/v2/FindPackagesById?id=Bar");
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0]["GalleryDetailsUrl"],
        "http://nuget.test/packages/Bar/1.0.0"
    );
    assert_eq!(
        entries[0]["DownloadUrl"],
        "http://nuget.test/api/v2/package/Bar/1.0.0"
    );

    let response = client
        .get("/api/v2/FindPackagesById?id=Bar")
        .header(Header::new("X-Forwarded-Proto", "https"))
        .dispatch();
    let body = response.into_string().expect("Response body");
    let entries: Vec<serde_json::Value> = serde_json::from_str(&body).expect("Valid JSON");
    assert_eq!(
        entries[0]["DownloadUrl"],
        "https://nuget.test/api/v2/package/Bar/1.0.0"
    );
}

#[test]
#[serial]
fn test_find_packages_by_id_includes_unlisted() {
    let test_rocket = create_test_rocket(false);
    let client = Client::tracked(test_rocket.rocket).expect("valid rocket instance");

    let entries = feed(&client, "/api/v2/FindPackagesById?id=foo");
    let versions: Vec<_> = entries.iter().map(|e| e["Version"].clone()).collect();
    assert_eq!(versions, vec!["1.0.0", "2.0.0"]);
    assert!(entries.iter().all(|e| e["Id"] == "Foo"));

    assert!(feed(&client, "/api/v2/FindPackagesById?id=Missing").is_empty());
}

#[test]
#[serial]
fn test_search_matches_description() {
    let test_rocket = create_test_rocket(false);
    let client = Client::tracked(test_rocket.rocket).expect("valid rocket instance");

    let entries = feed(&client, "/api/v2/Search?q=TOOLS");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["Id"], "Bar");

    assert_eq!(feed(&client, "/api/v2/Search").len(), 2);
}

#[test]
#[serial]
fn test_download_is_recorded() {
    let test_rocket = create_test_rocket(false);
    let client = Client::tracked(test_rocket.rocket).expect("valid rocket instance");

    let response = client
        .post("/api/v2/package/Foo/1.0.0/download")
        .header(Header::new("User-Agent", "NuGet/6.0"))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().expect("Response body");
    let json: serde_json::Value = serde_json::from_str(&body).expect("Valid JSON");
    assert_eq!(json["VersionDownloadCount"], 1);
    assert_eq!(json["DownloadCount"], 1);

    let entries = feed(&client, "/api/v2/FindPackagesById?id=Foo");
    assert_eq!(entries[0]["VersionDownloadCount"], 1);
    assert_eq!(entries[1]["VersionDownloadCount"], 0);
    assert!(entries.iter().all(|e| e["DownloadCount"] == 1));
}

#[test]
#[serial]
fn test_download_of_missing_package() {
    let test_rocket = create_test_rocket(false);
    let client = Client::tracked(test_rocket.rocket).expect("valid rocket instance");

    let response = client.post("/api/v2/package/Foo/9.9.9/download").dispatch();
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
#[serial]
fn test_download_rejected_when_read_only() {
    let test_rocket = create_test_rocket(true);
    let client = Client::tracked(test_rocket.rocket).expect("valid rocket instance");

    let response = client.post("/api/v2/package/Foo/1.0.0/download").dispatch();
    assert_eq!(response.status(), Status::ServiceUnavailable);
    let body = response.into_string().expect("Response body");
    assert!(body.contains("read only mode"));

    // Reads still work and nothing was counted
    let entries = feed(&client, "/api/v2/FindPackagesById?id=Foo");
    assert_eq!(entries[0]["VersionDownloadCount"], 0);
}
