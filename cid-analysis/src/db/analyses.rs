//! Analysis history database operations
//!
//! **[CID-DB-010]** Rows are inserted exactly once per completed analysis
//! and never updated. Row-level scoping by user_id; deletion only via the
//! bulk per-user path.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use cid_common::Result;

use crate::models::AnalysisRecord;

/// Insert one completed analysis into the history
pub async fn insert_analysis(pool: &SqlitePool, record: &AnalysisRecord) -> Result<()> {
    let characteristics = serde_json::to_string(&record.characteristics).map_err(|e| {
        cid_common::Error::Internal(format!("Failed to serialize characteristics: {}", e))
    })?;

    sqlx::query(
        r#"
        INSERT INTO analyses (
            id, user_id, characteristics, culture_medium,
            colony_age, image_url, result, confidence, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.user_id)
    .bind(&characteristics)
    .bind(&record.culture_medium)
    .bind(&record.colony_age)
    .bind(&record.image_url)
    .bind(&record.result)
    .bind(record.confidence)
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// List a user's analyses, newest first
///
/// `result_filter` is a case-insensitive substring match on the result
/// label ("positive"/"negative" history views).
pub async fn list_analyses(
    pool: &SqlitePool,
    user_id: &str,
    result_filter: Option<&str>,
) -> Result<Vec<AnalysisRecord>> {
    let rows = match result_filter {
        Some(filter) => {
            sqlx::query(
                r#"
                SELECT id, user_id, characteristics, culture_medium,
                       colony_age, image_url, result, confidence, created_at
                FROM analyses
                WHERE user_id = ? AND LOWER(result) LIKE '%' || LOWER(?) || '%'
                ORDER BY created_at DESC
                "#,
            )
            .bind(user_id)
            .bind(filter)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, user_id, characteristics, culture_medium,
                       colony_age, image_url, result, confidence, created_at
                FROM analyses
                WHERE user_id = ?
                ORDER BY created_at DESC
                "#,
            )
            .bind(user_id)
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(record_from_row).collect()
}

/// Delete every analysis belonging to a user (bulk account deletion)
///
/// Returns the number of rows removed. This is the only deletion path.
pub async fn delete_analyses_for_user(pool: &SqlitePool, user_id: &str) -> Result<usize> {
    let result = sqlx::query("DELETE FROM analyses WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() as usize)
}

fn record_from_row(row: sqlx::sqlite::SqliteRow) -> Result<AnalysisRecord> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| cid_common::Error::Internal(format!("Failed to parse id: {}", e)))?;

    let characteristics: String = row.get("characteristics");
    let characteristics: Vec<String> = serde_json::from_str(&characteristics).map_err(|e| {
        cid_common::Error::Internal(format!("Failed to deserialize characteristics: {}", e))
    })?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| cid_common::Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    Ok(AnalysisRecord {
        id,
        user_id: row.get("user_id"),
        characteristics,
        culture_medium: row.get("culture_medium"),
        colony_age: row.get("colony_age"),
        image_url: row.get("image_url"),
        result: row.get("result"),
        confidence: row.get("confidence"),
        created_at,
    })
}
