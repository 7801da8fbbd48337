use chrono::Utc;

use crate::db::Database;
use crate::display::normalize_global;
use crate::error::Result;
use crate::models::GlobalConfig;

/// Per-user global display settings
pub struct SettingsService;

impl SettingsService {
    /// Stored settings, or defaults when the user never saved any
    pub async fn get(db: &Database, user_id: &str) -> Result<GlobalConfig> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT config FROM user_settings WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(db.pool())
                .await?;

        let Some((raw,)) = row else {
            return Ok(GlobalConfig::default());
        };
        match serde_json::from_str(&raw) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!("Unreadable settings for user {}, using defaults: {}", user_id, e);
                Ok(GlobalConfig::default())
            }
        }
    }

    pub async fn update(db: &Database, user_id: &str, config: GlobalConfig) -> Result<GlobalConfig> {
        let config = normalize_global(config)?;
        sqlx::query(
            r#"
            INSERT INTO user_settings (user_id, config, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET config = excluded.config, updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(serde_json::to_string(&config)?)
        .bind(Utc::now().to_rfc3339())
        .execute(db.pool())
        .await?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;
    use crate::models::{RatioDefinition, SortOrder, UnitSystem};
    use crate::services::UserService;

    #[tokio::test]
    async fn test_defaults_until_saved() {
        let (db, _dir) = test_db().await;
        UserService::create(&db, "u1", None).await.unwrap();
        assert_eq!(SettingsService::get(&db, "u1").await.unwrap(), GlobalConfig::default());

        let saved = SettingsService::update(
            &db,
            "u1",
            GlobalConfig {
                unit_system: UnitSystem::Metric,
                measurements: vec!["Shoulders".into(), "Waist".into()],
                ratios: vec![RatioDefinition {
                    name: "V-taper".into(),
                    numerator: "Shoulders".into(),
                    denominator: "Waist".into(),
                }],
                sort_order: SortOrder::ReverseChronological,
            },
        )
        .await
        .unwrap();

        assert_eq!(SettingsService::get(&db, "u1").await.unwrap(), saved);

        // Second save overwrites
        let saved = SettingsService::update(&db, "u1", GlobalConfig::default())
            .await
            .unwrap();
        assert_eq!(SettingsService::get(&db, "u1").await.unwrap(), saved);
    }
}
