//! Empresa Service - CRUD operations for the business directory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::error::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Empresa {
    pub id: Uuid,
    pub nombre: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub sector: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEmpresaFields {
    pub nombre: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub sector: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EmpresaService {
    pool: PgPool,
}

impl EmpresaService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create_empresa(&self, fields: &NewEmpresaFields) -> Result<Empresa, ServiceError> {
        if fields.nombre.trim().is_empty() {
            return Err(ServiceError::validation("empresa nombre is required"));
        }

        let empresa = sqlx::query_as::<_, Empresa>(
            r#"
            INSERT INTO camara.empresas (id, nombre, email, telefono, sector, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING id, nombre, email, telefono, sector, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&fields.nombre)
        .bind(&fields.email)
        .bind(&fields.telefono)
        .bind(&fields.sector)
        .fetch_one(&self.pool)
        .await?;

        info!("Created empresa {} ({})", empresa.nombre, empresa.id);
        Ok(empresa)
    }

    pub async fn get_empresa(&self, empresa_id: Uuid) -> Result<Option<Empresa>, ServiceError> {
        let empresa = sqlx::query_as::<_, Empresa>(
            r#"
            SELECT id, nombre, email, telefono, sector, created_at, updated_at
            FROM camara.empresas
            WHERE id = $1
            "#,
        )
        .bind(empresa_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(empresa)
    }

    pub async fn list_empresas(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Empresa>, ServiceError> {
        let empresas = sqlx::query_as::<_, Empresa>(
            r#"
            SELECT id, nombre, email, telefono, sector, created_at, updated_at
            FROM camara.empresas
            ORDER BY nombre
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit.unwrap_or(100))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(empresas)
    }
}
