//! Client-side site collection and its filtered view.
//!
//! The filtered view and category list are derived state: they are rebuilt
//! in full from `(sites, search_term, category_filter)` after every change
//! and never patched incrementally.

use crate::db::Site;

#[derive(Debug, Clone, Default)]
pub struct SiteStore {
    sites: Vec<Site>,
    search_term: String,
    category_filter: Option<String>,
    filtered: Vec<Site>,
    categories: Vec<String>,
    is_loading: bool,
    error: Option<String>,
}

impl SiteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// The derived view currently shown to the user
    pub fn filtered(&self) -> &[Site] {
        &self.filtered
    }

    /// Distinct categories of the collection, in first-seen order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn category_filter(&self) -> Option<&str> {
        self.category_filter.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_sites(&mut self, sites: Vec<Site>) {
        self.sites = sites;
        self.recompute();
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.recompute();
    }

    /// `None` or an empty string clears the filter.
    pub fn set_category_filter(&mut self, category: Option<String>) {
        self.category_filter = category.filter(|c| !c.is_empty());
        self.recompute();
    }

    pub fn clear_filters(&mut self) {
        self.search_term.clear();
        self.category_filter = None;
        self.recompute();
    }

    pub fn apply_created(&mut self, site: Site) {
        self.sites.push(site);
        self.recompute();
    }

    /// Replace the site with the same id. Unknown ids are ignored.
    pub fn apply_updated(&mut self, site: Site) {
        if let Some(existing) = self.sites.iter_mut().find(|s| s.id == site.id) {
            *existing = site;
        }
        self.recompute();
    }

    pub fn apply_removed(&mut self, id: i64) {
        self.sites.retain(|s| s.id != id);
        self.recompute();
    }

    pub fn begin_request(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    pub fn finish_request(&mut self) {
        self.is_loading = false;
    }

    pub fn fail_request(&mut self, message: impl Into<String>) {
        self.is_loading = false;
        self.error = Some(message.into());
    }

    fn recompute(&mut self) {
        self.filtered = filter_sites(
            &self.sites,
            &self.search_term,
            self.category_filter.as_deref(),
        );
        self.categories = derive_categories(&self.sites);
    }
}

/// Sites matching `search_term` (case-insensitive over title, URL, category
/// and description) and `category` (exact). Input order is preserved.
pub fn filter_sites(sites: &[Site], search_term: &str, category: Option<&str>) -> Vec<Site> {
    let needle = search_term.trim().to_lowercase();
    let category = category.filter(|c| !c.is_empty());

    sites
        .iter()
        .filter(|site| needle.is_empty() || matches_text(site, &needle))
        .filter(|site| category.map_or(true, |c| site.category == c))
        .cloned()
        .collect()
}

fn matches_text(site: &Site, needle: &str) -> bool {
    [&site.title, &site.site_url, &site.category, &site.description]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

pub fn derive_categories(sites: &[Site]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for site in sites {
        if !categories.contains(&site.category) {
            categories.push(site.category.clone());
        }
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: i64, title: &str, url: &str, category: &str, description: &str) -> Site {
        Site {
            id,
            site_url: url.to_string(),
            title: title.to_string(),
            cover_image: String::new(),
            description: description.to_string(),
            category: category.to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn collection() -> Vec<Site> {
        vec![
            site(1, "TechCrunch", "https://techcrunch.com", "News", "Startup news"),
            site(2, "Figma", "https://figma.com", "Design", "Collaborative design tech"),
            site(3, "Dribbble", "https://dribbble.com", "Design", "Design inspiration"),
            site(4, "Coursera", "https://coursera.org", "Education", "Online courses"),
            site(5, "GitHub", "https://github.com", "Technology", "Code hosting"),
        ]
    }

    fn ids(sites: &[Site]) -> Vec<i64> {
        sites.iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_search_matches_any_text_field() {
        let sites = collection();
        assert_eq!(ids(&filter_sites(&sites, "tech", None)), vec![1, 2, 5]);
        assert_eq!(ids(&filter_sites(&sites, "COURSERA.ORG", None)), vec![4]);
        assert_eq!(ids(&filter_sites(&sites, "  figma  ", None)), vec![2]);
        assert!(filter_sites(&sites, "nothing-matches", None).is_empty());
    }

    #[test]
    fn test_category_narrows_text_matches() {
        let sites = collection();
        assert_eq!(ids(&filter_sites(&sites, "tech", Some("Design"))), vec![2]);
        assert_eq!(ids(&filter_sites(&sites, "", Some("Design"))), vec![2, 3]);
        // category match is exact
        assert!(filter_sites(&sites, "", Some("design")).is_empty());
    }

    #[test]
    fn test_empty_filters_keep_everything_in_order() {
        let sites = collection();
        assert_eq!(filter_sites(&sites, "", None), sites);
        assert_eq!(filter_sites(&sites, "   ", Some("")), sites);
    }

    #[test]
    fn test_store_recomputes_on_every_change() {
        let mut store = SiteStore::new();
        store.set_sites(collection());
        assert_eq!(store.filtered().len(), 5);
        assert_eq!(
            store.categories(),
            &["News", "Design", "Education", "Technology"]
        );

        store.set_search_term("tech");
        assert_eq!(ids(store.filtered()), vec![1, 2, 5]);

        store.set_category_filter(Some("Design".to_string()));
        assert_eq!(ids(store.filtered()), vec![2]);

        store.clear_filters();
        assert_eq!(store.filtered(), store.sites());
    }

    #[test]
    fn test_mutations_update_collection_and_view() {
        let mut store = SiteStore::new();
        store.set_sites(collection());
        store.set_category_filter(Some("Design".to_string()));

        store.apply_created(site(6, "Behance", "https://behance.net", "Design", "Portfolios"));
        assert_eq!(ids(store.filtered()), vec![2, 3, 6]);

        store.apply_updated(site(3, "Dribbble", "https://dribbble.com", "Business", "Moved"));
        assert_eq!(ids(store.filtered()), vec![2, 6]);
        assert!(store.categories().contains(&"Business".to_string()));

        store.apply_removed(2);
        assert_eq!(ids(store.filtered()), vec![6]);
        assert_eq!(store.sites().len(), 5);

        store.apply_updated(site(99, "Ghost", "https://ghost.org", "Design", "Unknown id"));
        assert_eq!(store.sites().len(), 5);
    }

    #[test]
    fn test_request_state() {
        let mut store = SiteStore::new();
        store.begin_request();
        assert!(store.is_loading());

        store.fail_request("Failed to fetch sites");
        assert!(!store.is_loading());
        assert_eq!(store.error(), Some("Failed to fetch sites"));

        store.begin_request();
        assert!(store.error().is_none());
        store.finish_request();
        assert!(!store.is_loading());
    }
}
