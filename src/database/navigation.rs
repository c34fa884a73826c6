//! Relationship reads: both sides of each join table and the children of
//! each one-to-many reference.

use super::context::EntitiesContext;
use super::error::ContextError;
use crate::models::*;
use crate::schema::{curated_feeds, package_registrations, packages, roles, users};
use diesel::prelude::*;

impl EntitiesContext {
    pub fn roles_of_user(&self, user: &User) -> Result<Vec<Role>, ContextError> {
        let mut conn = self.connection()?;
        Ok(UserRole::belonging_to(user)
            .inner_join(roles::table)
            .select(Role::as_select())
            .order(roles::name.asc())
            .load(&mut conn)?)
    }

    pub fn users_in_role(&self, role: &Role) -> Result<Vec<User>, ContextError> {
        let mut conn = self.connection()?;
        Ok(UserRole::belonging_to(role)
            .inner_join(users::table)
            .select(User::as_select())
            .order(users::username.asc())
            .load(&mut conn)?)
    }

    pub fn owners_of(&self, registration: &PackageRegistration) -> Result<Vec<User>, ContextError> {
        let mut conn = self.connection()?;
        Ok(PackageRegistrationOwner::belonging_to(registration)
            .inner_join(users::table)
            .select(User::as_select())
            .order(users::username.asc())
            .load(&mut conn)?)
    }

    pub fn registrations_owned_by(
        &self,
        user: &User,
    ) -> Result<Vec<PackageRegistration>, ContextError> {
        let mut conn = self.connection()?;
        Ok(PackageRegistrationOwner::belonging_to(user)
            .inner_join(package_registrations::table)
            .select(PackageRegistration::as_select())
            .order(package_registrations::id.asc())
            .load(&mut conn)?)
    }

    pub fn managers_of(&self, feed: &CuratedFeed) -> Result<Vec<User>, ContextError> {
        let mut conn = self.connection()?;
        Ok(CuratedFeedManager::belonging_to(feed)
            .inner_join(users::table)
            .select(User::as_select())
            .order(users::username.asc())
            .load(&mut conn)?)
    }

    pub fn feeds_managed_by(&self, user: &User) -> Result<Vec<CuratedFeed>, ContextError> {
        let mut conn = self.connection()?;
        Ok(CuratedFeedManager::belonging_to(user)
            .inner_join(curated_feeds::table)
            .select(CuratedFeed::as_select())
            .order(curated_feeds::name.asc())
            .load(&mut conn)?)
    }

    /// Versions of a registration, oldest first.
    pub fn packages_of(&self, registration: &PackageRegistration) -> Result<Vec<Package>, ContextError> {
        let mut conn = self.connection()?;
        Ok(Package::belonging_to(registration)
            .select(Package::as_select())
            .order(packages::created.asc())
            .then_order_by(packages::key.asc())
            .load(&mut conn)?)
    }

    pub fn statistics_of(&self, package: &Package) -> Result<Vec<PackageStatistics>, ContextError> {
        let mut conn = self.connection()?;
        Ok(PackageStatistics::belonging_to(package)
            .select(PackageStatistics::as_select())
            .load(&mut conn)?)
    }

    pub fn dependencies_of(&self, package: &Package) -> Result<Vec<PackageDependency>, ContextError> {
        let mut conn = self.connection()?;
        Ok(PackageDependency::belonging_to(package)
            .select(PackageDependency::as_select())
            .load(&mut conn)?)
    }

    pub fn frameworks_of(&self, package: &Package) -> Result<Vec<PackageFramework>, ContextError> {
        let mut conn = self.connection()?;
        Ok(PackageFramework::belonging_to(package)
            .select(PackageFramework::as_select())
            .load(&mut conn)?)
    }

    pub fn edits_of(&self, package: &Package) -> Result<Vec<PackageEdit>, ContextError> {
        let mut conn = self.connection()?;
        Ok(PackageEdit::belonging_to(package)
            .select(PackageEdit::as_select())
            .load(&mut conn)?)
    }

    pub fn histories_of(&self, package: &Package) -> Result<Vec<PackageHistory>, ContextError> {
        let mut conn = self.connection()?;
        Ok(PackageHistory::belonging_to(package)
            .select(PackageHistory::as_select())
            .load(&mut conn)?)
    }

    pub fn messages_to(&self, user: &User) -> Result<Vec<EmailMessage>, ContextError> {
        let mut conn = self.connection()?;
        Ok(EmailMessage::belonging_to(user)
            .select(EmailMessage::as_select())
            .load(&mut conn)?)
    }

    pub fn curated_packages_of(&self, feed: &CuratedFeed) -> Result<Vec<CuratedPackage>, ContextError> {
        let mut conn = self.connection()?;
        Ok(CuratedPackage::belonging_to(feed)
            .select(CuratedPackage::as_select())
            .load(&mut conn)?)
    }

    pub fn owner_requests_for(
        &self,
        registration: &PackageRegistration,
    ) -> Result<Vec<PackageOwnerRequest>, ContextError> {
        let mut conn = self.connection()?;
        Ok(PackageOwnerRequest::belonging_to(registration)
            .select(PackageOwnerRequest::as_select())
            .load(&mut conn)?)
    }

    /// Registration ids compare case-insensitively (the column is NOCASE).
    pub fn find_registration_by_id(
        &self,
        id: &str,
    ) -> Result<Option<PackageRegistration>, ContextError> {
        let mut conn = self.connection()?;
        Ok(package_registrations::table
            .filter(package_registrations::id.eq(id))
            .select(PackageRegistration::as_select())
            .first(&mut conn)
            .optional()?)
    }

    pub fn find_package(&self, id: &str, version: &str) -> Result<Option<Package>, ContextError> {
        let mut conn = self.connection()?;
        Ok(packages::table
            .inner_join(package_registrations::table)
            .filter(package_registrations::id.eq(id))
            .filter(packages::version.eq(version))
            .select(Package::as_select())
            .first(&mut conn)
            .optional()?)
    }

    /// One page of packages joined with their registrations, newest first.
    /// `search` keeps rows whose id, title or description contains it,
    /// ignoring ASCII case.
    pub fn packages_with_registrations(
        &self,
        include_unlisted: bool,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<(Package, PackageRegistration)>, ContextError> {
        let mut conn = self.connection()?;
        let mut query = packages::table
            .inner_join(package_registrations::table)
            .select((Package::as_select(), PackageRegistration::as_select()))
            .order((packages::published.desc(), packages::key.desc()))
            .into_boxed();

        if !include_unlisted {
            query = query.filter(packages::listed.eq(true));
        }

        if let Some(term) = search {
            let pattern = format!("%{}%", escape_like(term));
            query = query.filter(
                package_registrations::id
                    .like(pattern.clone())
                    .escape('\\')
                    .or(packages::title.like(pattern.clone()).escape('\\'))
                    .or(packages::description.like(pattern).escape('\\')),
            );
        }

        Ok(query.offset(offset).limit(limit).load(&mut conn)?)
    }

    /// The singleton settings row, if one has been written.
    pub fn gallery_setting(&self) -> Result<Option<GallerySetting>, ContextError> {
        use crate::schema::gallery_settings;

        let mut conn = self.connection()?;
        Ok(gallery_settings::table
            .order(gallery_settings::key.asc())
            .select(GallerySetting::as_select())
            .first(&mut conn)
            .optional()?)
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(escape_like("json_net"), "json\\_net");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("plain"), "plain");
    }
}
