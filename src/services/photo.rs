use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use std::path::Path;
use uuid::Uuid;

use crate::db::Database;
use crate::display::{blank_measurements, compute_ratios, sort_by_date};
use crate::error::{AppError, Result};
use crate::models::{
    EffectiveConfig, Gallery, NewPhoto, Photo, PhotoResponse, UpdatePhotoRequest,
};
use crate::services::GalleryService;
use crate::storage::StorageManager;

const ALLOWED_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/heic",
    "image/heif",
];

/// Photo service
pub struct PhotoService;

impl PhotoService {
    /// Photos in a gallery (default gallery when none given), in display order
    pub async fn list(
        db: &Database,
        user_id: &str,
        gallery_id: Option<&str>,
    ) -> Result<Vec<PhotoResponse>> {
        let gallery = GalleryService::resolve(db, user_id, gallery_id).await?;
        let config = GalleryService::effective_config(db, user_id, Some(&gallery)).await?;

        let mut photos: Vec<Photo> =
            sqlx::query_as("SELECT * FROM photos WHERE user_id = ? AND gallery_id = ?")
                .bind(user_id)
                .bind(&gallery.id)
                .fetch_all(db.pool())
                .await?;
        sort_by_date(&mut photos, config.sort_order, |p| p.date.as_str());

        Ok(photos.iter().map(|p| Self::to_response(p, &config)).collect())
    }

    /// Store an uploaded image and record it
    pub async fn create(
        db: &Database,
        storage: &StorageManager,
        user_id: &str,
        new_photo: NewPhoto,
        data: Bytes,
    ) -> Result<PhotoResponse> {
        let gallery = GalleryService::resolve(db, user_id, new_photo.gallery_id.as_deref()).await?;
        let config = GalleryService::effective_config(db, user_id, Some(&gallery)).await?;

        let date = match new_photo.date {
            Some(date) => validate_date(&date)?,
            None => Utc::now().format("%Y-%m-%d").to_string(),
        };
        let measurements = new_photo
            .measurements
            .unwrap_or_else(|| blank_measurements(&config.measurements));

        let filename = format!("{}{}", Uuid::new_v4(), stored_extension(&new_photo.original_name));
        storage.provider().put(&filename, data).await?;

        let photo = Photo {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            gallery_id: Some(gallery.id.clone()),
            filename,
            date,
            weight: new_photo.weight,
            measurements: serde_json::to_string(&measurements)?,
            created_at: Utc::now().to_rfc3339(),
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO photos (id, user_id, gallery_id, filename, date, weight, measurements, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&photo.id)
        .bind(&photo.user_id)
        .bind(&photo.gallery_id)
        .bind(&photo.filename)
        .bind(&photo.date)
        .bind(photo.weight)
        .bind(&photo.measurements)
        .bind(&photo.created_at)
        .execute(db.pool())
        .await;

        if let Err(e) = inserted {
            if let Err(cleanup) = storage.provider().delete(&photo.filename).await {
                tracing::warn!("Failed to remove orphaned upload {}: {}", photo.filename, cleanup);
            }
            return Err(e.into());
        }

        tracing::info!("Stored photo {} in gallery {}", photo.id, gallery.id);
        Ok(Self::to_response(&photo, &config))
    }

    /// Patch date, weight or measurements
    pub async fn update(
        db: &Database,
        user_id: &str,
        photo_id: &str,
        req: UpdatePhotoRequest,
    ) -> Result<PhotoResponse> {
        let mut photo = Self::get_owned(db, user_id, photo_id).await?;

        if let Some(date) = req.date {
            photo.date = validate_date(&date)?;
        }
        if let Some(weight) = req.weight {
            photo.weight = weight;
        }
        if let Some(measurements) = req.measurements {
            photo.measurements = serde_json::to_string(&measurements)?;
        }

        sqlx::query("UPDATE photos SET date = ?, weight = ?, measurements = ? WHERE id = ? AND user_id = ?")
            .bind(&photo.date)
            .bind(photo.weight)
            .bind(&photo.measurements)
            .bind(&photo.id)
            .bind(user_id)
            .execute(db.pool())
            .await?;

        let config = Self::config_for(db, user_id, &photo).await?;
        Ok(Self::to_response(&photo, &config))
    }

    /// Delete the row and its file. A failed file removal is only logged.
    pub async fn delete(
        db: &Database,
        storage: &StorageManager,
        user_id: &str,
        photo_id: &str,
    ) -> Result<()> {
        let photo = Self::get_owned(db, user_id, photo_id).await?;

        if let Err(e) = storage.provider().delete(&photo.filename).await {
            tracing::error!("Failed to delete file {}: {}", photo.filename, e);
        }

        sqlx::query("DELETE FROM photos WHERE id = ? AND user_id = ?")
            .bind(&photo.id)
            .bind(user_id)
            .execute(db.pool())
            .await?;

        tracing::info!("Deleted photo {}", photo.id);
        Ok(())
    }

    pub async fn get_owned(db: &Database, user_id: &str, photo_id: &str) -> Result<Photo> {
        let photo: Photo = sqlx::query_as("SELECT * FROM photos WHERE id = ?")
            .bind(photo_id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Photo not found".to_string()))?;
        ensure_owner(&photo, user_id)?;
        Ok(photo)
    }

    /// Photo that owns a stored file; used to authorize file serving
    pub async fn find_by_filename(db: &Database, user_id: &str, filename: &str) -> Result<Photo> {
        let photo: Photo = sqlx::query_as("SELECT * FROM photos WHERE filename = ?")
            .bind(filename)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Photo not found".to_string()))?;
        ensure_owner(&photo, user_id)?;
        Ok(photo)
    }

    async fn config_for(db: &Database, user_id: &str, photo: &Photo) -> Result<EffectiveConfig> {
        let gallery: Option<Gallery> = match &photo.gallery_id {
            Some(id) => sqlx::query_as("SELECT * FROM galleries WHERE id = ?")
                .bind(id)
                .fetch_optional(db.pool())
                .await?,
            None => None,
        };
        GalleryService::effective_config(db, user_id, gallery.as_ref()).await
    }

    pub fn to_response(photo: &Photo, config: &EffectiveConfig) -> PhotoResponse {
        let measurements = photo.measurement_list();
        PhotoResponse {
            id: photo.id.clone(),
            gallery_id: photo.gallery_id.clone(),
            src: photo.src(),
            date: photo.date.clone(),
            weight: photo.weight,
            ratios: compute_ratios(&measurements, &config.ratios),
            measurements,
        }
    }
}

fn ensure_owner(photo: &Photo, user_id: &str) -> Result<()> {
    if photo.user_id != user_id {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }
    Ok(())
}

/// Accept common image types, plus HEIC/HEIF by name since browsers often
/// send those without a usable content type
pub fn is_allowed_image(content_type: Option<&str>, filename: &str) -> bool {
    let by_type = content_type
        .map(|ct| ALLOWED_TYPES.contains(&ct.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    let lower = filename.to_ascii_lowercase();
    by_type || lower.ends_with(".heic") || lower.ends_with(".heif")
}

/// Lower-cased extension of the original name, `.jpg` if it has none
fn stored_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_else(|| ".jpg".to_string())
}

pub fn validate_date(date: &str) -> Result<String> {
    let date = date.trim();
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| AppError::BadRequest("Invalid date".to_string()))
}
