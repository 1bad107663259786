//! Pipeline Service - sales pipeline stages and their display order
//!
//! Stage order is a dense zero-based `posicion` rank. `reorder_stages` takes
//! the full ordered id list from the client and persists index positions in
//! one multi-row statement, so a store failure leaves no half-applied batch.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PipelineStage {
    pub id: Uuid,
    pub nombre: String,
    pub color: Option<String>,
    pub posicion: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row touched by a reorder: the stage id with its new rank.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StagePosition {
    pub id: Uuid,
    pub posicion: i32,
    pub updated_at: DateTime<Utc>,
}

/// Result of a reorder call.
///
/// `updated` can be smaller than `requested`: ids that match no stored stage
/// are skipped rather than failing the batch. Stages absent from the
/// submitted list keep their old rank.
#[derive(Debug, Clone)]
pub struct ReorderOutcome {
    pub requested: usize,
    pub updated: usize,
    pub rows: Vec<StagePosition>,
}

impl ReorderOutcome {
    pub fn is_partial(&self) -> bool {
        self.updated < self.requested
    }
}

#[derive(Clone, Debug)]
pub struct PipelineService {
    pool: PgPool,
}

impl PipelineService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a stage at the end of the pipeline.
    pub async fn create_stage(
        &self,
        nombre: &str,
        color: Option<&str>,
    ) -> Result<PipelineStage, ServiceError> {
        if nombre.trim().is_empty() {
            return Err(ServiceError::validation("stage nombre is required"));
        }

        let stage = sqlx::query_as::<_, PipelineStage>(
            r#"
            INSERT INTO camara.pipeline_stages (id, nombre, color, posicion, created_at, updated_at)
            VALUES ($1, $2, $3,
                    (SELECT COALESCE(MAX(posicion) + 1, 0) FROM camara.pipeline_stages),
                    NOW(), NOW())
            RETURNING id, nombre, color, posicion, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(nombre)
        .bind(color)
        .fetch_one(&self.pool)
        .await?;

        info!("Created pipeline stage {} ({})", stage.nombre, stage.id);
        Ok(stage)
    }

    pub async fn list_stages(&self) -> Result<Vec<PipelineStage>, ServiceError> {
        let stages = sqlx::query_as::<_, PipelineStage>(
            r#"
            SELECT id, nombre, color, posicion, created_at, updated_at
            FROM camara.pipeline_stages
            ORDER BY posicion, created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(stages)
    }

    /// Persist a client-supplied stage order as dense 0-based ranks.
    ///
    /// The whole batch shares one `updated_at` instant and is written in a
    /// single statement. Ids that match no stored stage produce no returned
    /// row; the caller can detect that through
    /// [`ReorderOutcome::is_partial`].
    pub async fn reorder_stages(&self, order: &[String]) -> Result<ReorderOutcome, ServiceError> {
        let ids = normalize_order(order)?;
        let positions: Vec<i32> = (0..ids.len() as i32).collect();
        let now = Utc::now();

        let mut rows = sqlx::query_as::<_, StagePosition>(
            r#"
            UPDATE camara.pipeline_stages AS s
            SET posicion = v.posicion, updated_at = $3
            FROM (SELECT * FROM UNNEST($1::uuid[], $2::int4[])) AS v(id, posicion)
            WHERE s.id = v.id
            RETURNING s.id, s.posicion, s.updated_at
            "#,
        )
        .bind(&ids)
        .bind(&positions)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.sort_by_key(|row| row.posicion);

        let outcome = ReorderOutcome {
            requested: ids.len(),
            updated: rows.len(),
            rows,
        };
        if outcome.is_partial() {
            warn!(
                "Stage reorder touched {} of {} requested stages; unknown ids were skipped",
                outcome.updated, outcome.requested
            );
        } else {
            info!("Reordered {} pipeline stages", outcome.updated);
        }
        Ok(outcome)
    }
}

/// Validate a submitted stage order and parse it into ids.
///
/// Rejections, in order: nothing left after dropping blank entries,
/// duplicates among the trimmed entries, any entry that is not a UUID.
fn normalize_order(order: &[String]) -> Result<Vec<Uuid>, ServiceError> {
    let trimmed: Vec<&str> = order
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if trimmed.is_empty() {
        return Err(ServiceError::validation("stage order list is empty"));
    }

    let unique: HashSet<&str> = trimmed.iter().copied().collect();
    if unique.len() != trimmed.len() {
        return Err(ServiceError::validation(
            "stage order list contains duplicate ids",
        ));
    }

    trimmed
        .iter()
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| ServiceError::validation(format!("malformed stage id: {s}")))
        })
        .collect()
}
