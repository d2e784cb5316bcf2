//! Site models, DTOs and the site repository.
//!
//! Every query here touches exactly one row, so no transactions are used.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CATEGORY_LEN: usize = 50;
pub const MAX_SITE_URL_LEN: usize = 500;
pub const MAX_COVER_IMAGE_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Site {
    pub id: i64,
    pub site_url: String,
    pub title: String,
    /// Hosted image URL, or empty string when the site has no cover
    pub cover_image: String,
    pub description: String,
    pub category: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields of a site about to be inserted. Already validated and truncated.
#[derive(Debug, Clone, Default)]
pub struct NewSite {
    pub site_url: String,
    pub title: String,
    pub cover_image: String,
    pub description: String,
    pub category: String,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct SiteChanges {
    pub site_url: Option<String>,
    pub title: Option<String>,
    pub cover_image: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl SiteChanges {
    pub fn is_empty(&self) -> bool {
        self.site_url.is_none()
            && self.title.is_none()
            && self.cover_image.is_none()
            && self.description.is_none()
            && self.category.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSiteRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub site_url: String,
    #[serde(default)]
    pub category: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSiteRequest {
    pub title: Option<String>,
    pub site_url: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
}

impl Site {
    pub async fn create(db: &SqlitePool, site: &NewSite) -> Result<Site, sqlx::Error> {
        let now = crate::db::now_timestamp();

        sqlx::query_as(
            r#"
            INSERT INTO sites (site_url, title, cover_image, description, category, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&site.site_url)
        .bind(&site.title)
        .bind(&site.cover_image)
        .bind(&site.description)
        .bind(&site.category)
        .bind(&now)
        .bind(&now)
        .fetch_one(db)
        .await
    }

    /// All sites, newest first
    pub async fn list(db: &SqlitePool) -> Result<Vec<Site>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sites ORDER BY created_at DESC, id DESC")
            .fetch_all(db)
            .await
    }

    pub async fn get_by_id(db: &SqlitePool, id: i64) -> Result<Option<Site>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sites WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Apply `changes` and return the updated row, or `None` if `id` does not exist.
    pub async fn update(
        db: &SqlitePool,
        id: i64,
        changes: &SiteChanges,
    ) -> Result<Option<Site>, sqlx::Error> {
        let now = crate::db::now_timestamp();

        sqlx::query_as(
            r#"
            UPDATE sites SET
                site_url = COALESCE(?, site_url),
                title = COALESCE(?, title),
                cover_image = COALESCE(?, cover_image),
                description = COALESCE(?, description),
                category = COALESCE(?, category),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&changes.site_url)
        .bind(&changes.title)
        .bind(&changes.cover_image)
        .bind(&changes.description)
        .bind(&changes.category)
        .bind(&now)
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Delete a site. Returns whether a row was removed.
    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sites WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    fn new_site(title: &str, category: &str) -> NewSite {
        NewSite {
            site_url: format!("https://{}.example.com", title.to_lowercase()),
            title: title.to_string(),
            cover_image: String::new(),
            description: format!("About {title}"),
            category: category.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = init_in_memory().await.unwrap();
        let site = Site::create(&db, &new_site("Google", "Technology")).await.unwrap();

        assert!(site.id > 0);
        assert_eq!(site.created_at, site.updated_at);

        let fetched = Site::get_by_id(&db, site.id).await.unwrap().unwrap();
        assert_eq!(fetched, site);
        assert!(Site::get_by_id(&db, site.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = init_in_memory().await.unwrap();
        let first = Site::create(&db, &new_site("First", "News")).await.unwrap();
        let second = Site::create(&db, &new_site("Second", "News")).await.unwrap();
        let third = Site::create(&db, &new_site("Third", "Design")).await.unwrap();

        let ids: Vec<i64> = Site::list(&db).await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[tokio::test]
    async fn test_partial_update() {
        let db = init_in_memory().await.unwrap();
        let site = Site::create(&db, &new_site("Figma", "Design")).await.unwrap();

        let changes = SiteChanges {
            title: Some("Figma Design".to_string()),
            ..Default::default()
        };
        let updated = Site::update(&db, site.id, &changes).await.unwrap().unwrap();

        assert_eq!(updated.title, "Figma Design");
        assert_eq!(updated.category, "Design");
        assert_eq!(updated.site_url, site.site_url);
        assert_eq!(updated.created_at, site.created_at);
        assert!(updated.updated_at >= site.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_none() {
        let db = init_in_memory().await.unwrap();
        let changes = SiteChanges {
            title: Some("x".to_string()),
            ..Default::default()
        };
        assert!(Site::update(&db, 999, &changes).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let db = init_in_memory().await.unwrap();
        let site = Site::create(&db, &new_site("Gone", "News")).await.unwrap();

        assert!(Site::delete(&db, site.id).await.unwrap());
        assert!(!Site::delete(&db, site.id).await.unwrap());
        assert!(Site::get_by_id(&db, site.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_description_rejected_by_schema() {
        let db = init_in_memory().await.unwrap();
        let mut site = new_site("Blank", "News");
        site.description = "   ".to_string();

        assert!(Site::create(&db, &site).await.is_err());
    }

    #[test]
    fn test_changes_is_empty() {
        assert!(SiteChanges::default().is_empty());
        let changes = SiteChanges {
            category: Some("News".to_string()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
