use super::environment::{FeedEnvironment, RequestContext};
use crate::database::{ContextError, EntitiesContext, EntityRepository, Repository};
use crate::models::{NewPackageStatistics, Package, PackageRegistration, PackageStatistics};
use chrono::NaiveDateTime;
use log::{debug, info};
use serde::Serialize;

/// Largest page a feed query returns.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct V2FeedPackage {
    pub id: String,
    pub version: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<String>,
    pub download_count: i32,
    pub version_download_count: i32,
    pub is_latest_version: bool,
    pub listed: bool,
    pub published: NaiveDateTime,
    pub gallery_details_url: String,
    pub download_url: String,
}

impl V2FeedPackage {
    fn new(package: Package, registration: &PackageRegistration, site_root: &str) -> Self {
        let gallery_details_url =
            format!("{site_root}packages/{}/{}", registration.id, package.version);
        let download_url =
            format!("{site_root}api/v2/package/{}/{}", registration.id, package.version);

        Self {
            id: registration.id.clone(),
            version: package.version,
            title: package.title,
            description: package.description,
            summary: package.summary,
            tags: package.tags,
            download_count: registration.download_count,
            version_download_count: package.download_count,
            is_latest_version: package.is_latest,
            listed: package.listed,
            published: package.published,
            gallery_details_url,
            download_url,
        }
    }
}

/// Serves the package feed. Environment probes go through `E`.
pub struct V2FeedController<E: FeedEnvironment> {
    packages: EntityRepository<Package>,
    environment: E,
}

impl<E: FeedEnvironment> V2FeedController<E> {
    pub fn new(context: EntitiesContext, environment: E) -> Self {
        Self {
            packages: EntityRepository::new(context),
            environment,
        }
    }

    pub fn http_context(&self) -> RequestContext {
        self.environment.http_context()
    }

    pub fn site_root(&self) -> String {
        self.environment.site_root()
    }

    /// Listed packages, newest first.
    pub fn packages(
        &mut self,
        skip: usize,
        top: Option<usize>,
    ) -> Result<Vec<V2FeedPackage>, ContextError> {
        let top = top.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let site_root = self.site_root();

        debug!("Feed query skip={skip} top={top}");
        let rows = self.packages.context().packages_with_registrations(
            false,
            None,
            page_offset(skip),
            top as i64,
        )?;

        Ok(rows
            .into_iter()
            .map(|(package, registration)| V2FeedPackage::new(package, &registration, &site_root))
            .collect())
    }

    /// Every version of `id`, listed or not, oldest first.
    pub fn find_packages_by_id(&mut self, id: &str) -> Result<Vec<V2FeedPackage>, ContextError> {
        let context = self.packages.context();
        let Some(registration) = context.find_registration_by_id(id)? else {
            return Ok(Vec::new());
        };

        let site_root = self.site_root();
        Ok(context
            .packages_of(&registration)?
            .into_iter()
            .map(|package| V2FeedPackage::new(package, &registration, &site_root))
            .collect())
    }

    /// Case-insensitive substring match on id, title and description of
    /// listed packages.
    pub fn search(&mut self, term: &str) -> Result<Vec<V2FeedPackage>, ContextError> {
        let term = term.trim();
        let site_root = self.site_root();
        let rows = self.packages.context().packages_with_registrations(
            false,
            (!term.is_empty()).then_some(term),
            0,
            MAX_PAGE_SIZE as i64,
        )?;

        Ok(rows
            .into_iter()
            .map(|(package, registration)| V2FeedPackage::new(package, &registration, &site_root))
            .collect())
    }

    /// Stages a download event plus the counter bumps and saves them.
    /// Returns `None` when the package does not exist.
    pub fn record_download(
        &mut self,
        id: &str,
        version: &str,
        user_agent: Option<String>,
    ) -> Result<Option<V2FeedPackage>, ContextError> {
        let Some(package) = self.packages.context().find_package(id, version)? else {
            return Ok(None);
        };

        let context = self.packages.context_mut();
        context
            .set::<PackageStatistics>()
            .add(NewPackageStatistics::download(&package, user_agent));
        context.count_download(&package);
        self.packages.commit_changes()?;

        // Counters changed in SQL; read back what was written.
        let Some(package) = self.packages.get_entity(package.key)? else {
            return Ok(None);
        };
        let Some(registration) = self
            .packages
            .context_mut()
            .package_registrations()
            .find(package.package_registration_key)?
        else {
            return Ok(None);
        };

        info!("Recorded download of {} {}", registration.id, package.version);

        let site_root = self.site_root();
        Ok(Some(V2FeedPackage::new(package, &registration, &site_root)))
    }
}

fn page_offset(skip: usize) -> i64 {
    i64::try_from(skip).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_pool;
    use crate::feed::FixedEnvironment;
    use crate::models::{NewPackage, NewPackageRegistration};
    use tempfile::TempDir;

    fn seeded_context(temp_dir: &TempDir, read_only: bool) -> EntitiesContext {
        let url = temp_dir.path().join("feed.db");
        let pool = create_pool(&url.to_string_lossy()).unwrap();

        let mut context = EntitiesContext::with_pool(pool.clone(), false);
        let registration = context
            .package_registrations()
            .add(NewPackageRegistration::new("Foo"));
        context
            .set::<Package>()
            .add(NewPackage::new(registration, "1.0.0").latest());
        context.save_changes().unwrap();

        EntitiesContext::with_pool(pool, read_only)
    }

    #[test]
    fn test_entries_use_environment_site_root() {
        let temp_dir = TempDir::new().unwrap();
        let environment = FixedEnvironment::new("http://nuget.test")
            .with_raw_url("https://nuget.test/api/v2/Packages");
        let mut controller = V2FeedController::new(seeded_context(&temp_dir, false), environment);

        assert!(controller.http_context().is_secure);
        let entries = controller.packages(0, None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].download_url, "https://nuget.test/api/v2/package/Foo/1.0.0");
        assert_eq!(entries[0].gallery_details_url, "https://nuget.test/packages/Foo/1.0.0");
        assert!(entries[0].is_latest_version);
    }

    #[test]
    fn test_page_size_is_capped() {
        let temp_dir = TempDir::new().unwrap();
        let mut controller = V2FeedController::new(
            seeded_context(&temp_dir, false),
            FixedEnvironment::new("http://nuget.test/"),
        );
        assert_eq!(controller.packages(0, Some(10_000)).unwrap().len(), 1);
        assert!(controller.packages(1, None).unwrap().is_empty());
    }

    #[test]
    fn test_record_download_counts_both_levels() {
        let temp_dir = TempDir::new().unwrap();
        let mut controller = V2FeedController::new(
            seeded_context(&temp_dir, false),
            FixedEnvironment::new("http://nuget.test/"),
        );

        let entry = controller
            .record_download("foo", "1.0.0", Some("NuGet/6.0".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(entry.download_count, 1);
        assert_eq!(entry.version_download_count, 1);

        assert!(controller.record_download("Foo", "9.9.9", None).unwrap().is_none());
    }

    #[test]
    fn test_record_download_fails_when_read_only() {
        let temp_dir = TempDir::new().unwrap();
        let mut controller = V2FeedController::new(
            seeded_context(&temp_dir, true),
            FixedEnvironment::new("http://nuget.test/"),
        );

        let err = controller.record_download("Foo", "1.0.0", None).unwrap_err();
        assert!(err.is_read_only());
        assert_eq!(controller.find_packages_by_id("Foo").unwrap()[0].version_download_count, 0);
    }

    #[test]
    fn test_search_filters_in_query() {
        let temp_dir = TempDir::new().unwrap();
        let mut controller = V2FeedController::new(
            seeded_context(&temp_dir, false),
            FixedEnvironment::new("http://nuget.test/"),
        );

        assert_eq!(controller.search("FOO").unwrap().len(), 1);
        assert_eq!(controller.search("  ").unwrap().len(), 1);
        // Wildcards in the term are literal
        assert!(controller.search("F_o").unwrap().is_empty());
        assert!(controller.search("%").unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_downloads_keep_counters_in_step() {
        const THREADS: usize = 6;
        const DOWNLOADS: usize = 15;

        let temp_dir = TempDir::new().unwrap();
        let pool = seeded_context(&temp_dir, false).pool().clone();

        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                let pool = pool.clone();
                scope.spawn(move || {
                    let mut controller = V2FeedController::new(
                        EntitiesContext::with_pool(pool, false),
                        FixedEnvironment::new("http://nuget.test/"),
                    );
                    for _ in 0..DOWNLOADS {
                        controller.record_download("Foo", "1.0.0", None).unwrap().unwrap();
                    }
                });
            }
        });

        let mut context = EntitiesContext::with_pool(pool, true);
        let package = context.find_package("Foo", "1.0.0").unwrap().unwrap();
        let registration = context.find_registration_by_id("Foo").unwrap().unwrap();
        let recorded = context.statistics_of(&package).unwrap().len();

        assert_eq!(recorded, THREADS * DOWNLOADS);
        assert_eq!(package.download_count as usize, recorded);
        assert_eq!(registration.download_count as usize, recorded);
        assert_eq!(context.set::<PackageStatistics>().all().unwrap().len(), recorded);
    }
}
