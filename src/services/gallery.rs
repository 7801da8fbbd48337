use chrono::Utc;
use uuid::Uuid;

use crate::db::Database;
use crate::display::{merge_configs, normalize_override};
use crate::error::{AppError, Result};
use crate::models::{EffectiveConfig, Gallery, GalleryConfig, UpdateGalleryRequest};
use crate::services::SettingsService;
use crate::storage::StorageManager;

pub const DEFAULT_GALLERY_NAME: &str = "Default";

/// Gallery service
pub struct GalleryService;

impl GalleryService {
    /// The user's galleries in creation order. A `Default` gallery is
    /// created on first use and adopts any photos without a gallery.
    pub async fn list(db: &Database, user_id: &str) -> Result<Vec<Gallery>> {
        let galleries = Self::fetch_all(db, user_id).await?;
        if !galleries.is_empty() {
            return Ok(galleries);
        }

        // Check and insert in one statement so concurrent first requests
        // cannot both create a default gallery
        let id = Uuid::new_v4().to_string();
        let created = sqlx::query(
            r#"
            INSERT INTO galleries (id, user_id, name, config, created_at)
            SELECT ?, ?, ?, NULL, ?
            WHERE NOT EXISTS (SELECT 1 FROM galleries WHERE user_id = ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(DEFAULT_GALLERY_NAME)
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(db.pool())
        .await?
        .rows_affected();

        if created > 0 {
            let moved = sqlx::query(
                "UPDATE photos SET gallery_id = ? WHERE user_id = ? AND gallery_id IS NULL",
            )
            .bind(&id)
            .bind(user_id)
            .execute(db.pool())
            .await?
            .rows_affected();
            if moved > 0 {
                tracing::info!("Moved {} photos into default gallery for user {}", moved, user_id);
            }
        }

        Self::fetch_all(db, user_id).await
    }

    async fn fetch_all(db: &Database, user_id: &str) -> Result<Vec<Gallery>> {
        let galleries = sqlx::query_as(
            "SELECT * FROM galleries WHERE user_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(user_id)
        .fetch_all(db.pool())
        .await?;
        Ok(galleries)
    }

    /// First gallery, creating it if needed
    pub async fn default_gallery(db: &Database, user_id: &str) -> Result<Gallery> {
        Self::list(db, user_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("No gallery available".to_string()))
    }

    /// Requested gallery if given, else the default one
    pub async fn resolve(db: &Database, user_id: &str, gallery_id: Option<&str>) -> Result<Gallery> {
        match gallery_id.filter(|id| !id.is_empty()) {
            Some(id) => Self::get_owned(db, user_id, id).await,
            None => Self::default_gallery(db, user_id).await,
        }
    }

    pub async fn get_owned(db: &Database, user_id: &str, gallery_id: &str) -> Result<Gallery> {
        let gallery: Gallery = sqlx::query_as("SELECT * FROM galleries WHERE id = ?")
            .bind(gallery_id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Gallery not found".to_string()))?;

        if gallery.user_id != user_id {
            return Err(AppError::Forbidden("Not authorized".to_string()));
        }
        Ok(gallery)
    }

    pub async fn create(db: &Database, user_id: &str, name: &str) -> Result<Gallery> {
        let name = validate_name(name)?;
        let gallery = Self::insert(db, user_id, &name).await?;
        tracing::debug!("Created gallery {} for user {}", gallery.id, user_id);
        Ok(gallery)
    }

    async fn insert(db: &Database, user_id: &str, name: &str) -> Result<Gallery> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO galleries (id, user_id, name, config, created_at) VALUES (?, ?, ?, NULL, ?)")
            .bind(&id)
            .bind(user_id)
            .bind(name)
            .bind(&now)
            .execute(db.pool())
            .await?;

        Ok(Gallery {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            config: None,
            created_at: now,
        })
    }

    /// Rename and/or replace the config override
    pub async fn update(
        db: &Database,
        user_id: &str,
        gallery_id: &str,
        req: UpdateGalleryRequest,
    ) -> Result<Gallery> {
        let mut gallery = Self::get_owned(db, user_id, gallery_id).await?;

        if let Some(name) = req.name {
            gallery.name = validate_name(&name)?;
        }
        if let Some(config) = req.config {
            gallery.config = Some(serde_json::to_string(&normalize_override(config)?)?);
        }

        sqlx::query("UPDATE galleries SET name = ?, config = ? WHERE id = ?")
            .bind(&gallery.name)
            .bind(&gallery.config)
            .bind(&gallery.id)
            .execute(db.pool())
            .await?;

        Ok(gallery)
    }

    /// Drop the override so the gallery inherits the global config again
    pub async fn clear_config(db: &Database, user_id: &str, gallery_id: &str) -> Result<Gallery> {
        let mut gallery = Self::get_owned(db, user_id, gallery_id).await?;
        sqlx::query("UPDATE galleries SET config = NULL WHERE id = ?")
            .bind(&gallery.id)
            .execute(db.pool())
            .await?;
        gallery.config = None;
        Ok(gallery)
    }

    /// Delete a gallery together with its photos
    pub async fn delete(
        db: &Database,
        storage: &StorageManager,
        user_id: &str,
        gallery_id: &str,
    ) -> Result<()> {
        let gallery = Self::get_owned(db, user_id, gallery_id).await?;

        let mut tx = db.pool().begin().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM galleries WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        if count <= 1 {
            return Err(AppError::BadRequest("Cannot delete the only gallery".to_string()));
        }

        let files: Vec<(String,)> = sqlx::query_as("SELECT filename FROM photos WHERE gallery_id = ?")
            .bind(&gallery.id)
            .fetch_all(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM photos WHERE gallery_id = ?")
            .bind(&gallery.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM galleries WHERE id = ?")
            .bind(&gallery.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        for (filename,) in files {
            if let Err(e) = storage.provider().delete(&filename).await {
                tracing::warn!("Failed to delete photo file {}: {}", filename, e);
            }
        }

        tracing::info!("Deleted gallery {} for user {}", gallery.id, user_id);
        Ok(())
    }

    /// Global settings with the gallery's override applied
    pub async fn effective_config(
        db: &Database,
        user_id: &str,
        gallery: Option<&Gallery>,
    ) -> Result<EffectiveConfig> {
        let global = SettingsService::get(db, user_id).await?;
        let over: Option<GalleryConfig> = gallery.and_then(|g| g.override_config());
        Ok(merge_configs(&global, over.as_ref()))
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Gallery name is required".to_string()));
    }
    if name.chars().count() > 100 {
        return Err(AppError::BadRequest(
            "Gallery name must be at most 100 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;
    use crate::models::{GlobalConfig, UnitSystem};
    use crate::services::UserService;
    use crate::storage::LocalStorage;
    use bytes::Bytes;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn setup() -> (Database, TempDir) {
        let (db, dir) = test_db().await;
        UserService::create(&db, "u1", None).await.unwrap();
        UserService::create(&db, "u2", None).await.unwrap();
        (db, dir)
    }

    async fn insert_photo(db: &Database, id: &str, gallery_id: Option<&str>) {
        sqlx::query(
            "INSERT INTO photos (id, user_id, gallery_id, filename, date) VALUES (?, 'u1', ?, ?, '2024-01-01')",
        )
        .bind(id)
        .bind(gallery_id)
        .bind(format!("{}.jpg", id))
        .execute(db.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_list_creates_default_and_adopts_orphans() {
        let (db, _dir) = setup().await;
        insert_photo(&db, "p1", None).await;

        let galleries = GalleryService::list(&db, "u1").await.unwrap();
        assert_eq!(galleries.len(), 1);
        assert_eq!(galleries[0].name, DEFAULT_GALLERY_NAME);

        let (gid,): (Option<String>,) = sqlx::query_as("SELECT gallery_id FROM photos WHERE id = 'p1'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(gid.as_deref(), Some(galleries[0].id.as_str()));

        // Listing again does not add another default
        assert_eq!(GalleryService::list(&db, "u1").await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_listing_creates_one_default() {
        let (db, _dir) = test_db().await;
        for i in 0..20 {
            let user_id = format!("fresh-{}", i);
            UserService::create(&db, &user_id, None).await.unwrap();

            let (listed, default) = tokio::join!(
                GalleryService::list(&db, &user_id),
                GalleryService::default_gallery(&db, &user_id)
            );
            assert_eq!(listed.unwrap()[0].id, default.unwrap().id);

            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM galleries WHERE user_id = ?")
                    .bind(&user_id)
                    .fetch_one(db.pool())
                    .await
                    .unwrap();
            assert_eq!(count, 1);
        }
    }

    #[tokio::test]
    async fn test_create_rename_and_ownership() {
        let (db, _dir) = setup().await;
        let gallery = GalleryService::create(&db, "u1", "  Cut 2024 ").await.unwrap();
        assert_eq!(gallery.name, "Cut 2024");

        assert!(matches!(
            GalleryService::create(&db, "u1", "   ").await,
            Err(AppError::BadRequest(_))
        ));

        let renamed = GalleryService::update(
            &db,
            "u1",
            &gallery.id,
            UpdateGalleryRequest {
                name: Some("Bulk".to_string()),
                config: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Bulk");

        assert!(matches!(
            GalleryService::get_owned(&db, "u2", &gallery.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            GalleryService::get_owned(&db, "u1", "missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_config_override_and_clear() {
        let (db, _dir) = setup().await;
        let gallery = GalleryService::create(&db, "u1", "Metric").await.unwrap();
        SettingsService::update(&db, "u1", GlobalConfig::default()).await.unwrap();

        let gallery = GalleryService::update(
            &db,
            "u1",
            &gallery.id,
            UpdateGalleryRequest {
                name: None,
                config: Some(GalleryConfig {
                    unit_system: Some(UnitSystem::Metric),
                    ..GalleryConfig::default()
                }),
            },
        )
        .await
        .unwrap();

        let effective = GalleryService::effective_config(&db, "u1", Some(&gallery))
            .await
            .unwrap();
        assert!(!effective.is_inherited);
        assert_eq!(effective.weight_unit, "kg");
        assert_eq!(effective.measurements, vec!["Waist", "Chest", "Arms"]);

        let gallery = GalleryService::clear_config(&db, "u1", &gallery.id).await.unwrap();
        let effective = GalleryService::effective_config(&db, "u1", Some(&gallery))
            .await
            .unwrap();
        assert!(effective.is_inherited);
        assert_eq!(effective.weight_unit, "lbs");
    }

    #[tokio::test]
    async fn test_delete_cascades_and_keeps_last_gallery() {
        let (db, dir) = setup().await;
        let storage = StorageManager::new(Arc::new(LocalStorage::new(dir.path().join("uploads"))));

        let default = GalleryService::default_gallery(&db, "u1").await.unwrap();
        let err = GalleryService::delete(&db, &storage, "u1", &default.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Cannot delete the only gallery"));

        let extra = GalleryService::create(&db, "u1", "Extra").await.unwrap();
        insert_photo(&db, "p1", Some(&extra.id)).await;
        insert_photo(&db, "p2", Some(&default.id)).await;
        storage
            .provider()
            .put("p1.jpg", Bytes::from_static(b"img"))
            .await
            .unwrap();

        GalleryService::delete(&db, &storage, "u1", &extra.id).await.unwrap();

        let left: Vec<(String,)> = sqlx::query_as("SELECT id FROM photos")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert_eq!(left, vec![("p2".to_string(),)]);
        assert!(!storage.provider().exists("p1.jpg").await.unwrap());
        assert_eq!(GalleryService::list(&db, "u1").await.unwrap().len(), 1);
    }
}
