//! Lead Service - sales lead records and the guarded empresa link
//!
//! Leads carry an optional link (`empresa_id`) to an empresa in the
//! directory. Clearing that link loses the association between a lead and
//! the member it came from, so `update_lead` treats `empresa_id` with
//! key-presence semantics: a patch that omits the key leaves the stored
//! value alone, and an explicit null is rejected unless the caller opts in
//! with `force_unlink_empresa`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{FromRow, PgPool, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::empresa_service::Empresa;
use crate::error::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lead {
    pub id: Uuid,
    pub nombre: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub notas: Option<String>,
    pub estado: String,
    pub empresa_id: Option<Uuid>,
    pub etapa_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLeadFields {
    pub nombre: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub notas: Option<String>,
    pub estado: Option<String>,
    pub empresa_id: Option<Uuid>,
    pub etapa_id: Option<Uuid>,
}

/// Partial update for a lead.
///
/// `empresa_id` is tri-state: a missing key deserializes to `None` (leave the
/// stored value untouched), an explicit JSON null to `Some(None)` (request to
/// unlink), and a value to `Some(Some(id))`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadPatch {
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub notas: Option<String>,
    pub estado: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub empresa_id: Option<Option<Uuid>>,
    pub etapa_id: Option<Uuid>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

impl LeadPatch {
    /// True when the patch carries nothing to write.
    pub fn is_empty(&self) -> bool {
        self.nombre.is_none()
            && self.email.is_none()
            && self.telefono.is_none()
            && self.notas.is_none()
            && self.estado.is_none()
            && self.empresa_id.is_none()
            && self.etapa_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateLeadOptions {
    /// Allow an explicit `empresa_id: null` to clear the empresa link.
    pub force_unlink_empresa: bool,
}

#[derive(Clone, Debug)]
pub struct LeadService {
    pool: PgPool,
}

impl LeadService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create_lead(&self, fields: &NewLeadFields) -> Result<Lead, ServiceError> {
        if fields.nombre.trim().is_empty() {
            return Err(ServiceError::validation("lead nombre is required"));
        }

        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO camara.leads (id, nombre, email, telefono, notas, estado, empresa_id, etapa_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'nuevo'), $7, $8, NOW(), NOW())
            RETURNING id, nombre, email, telefono, notas, estado, empresa_id, etapa_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&fields.nombre)
        .bind(&fields.email)
        .bind(&fields.telefono)
        .bind(&fields.notas)
        .bind(&fields.estado)
        .bind(fields.empresa_id)
        .bind(fields.etapa_id)
        .fetch_one(&self.pool)
        .await?;

        info!("Created lead {} ({})", lead.nombre, lead.id);
        Ok(lead)
    }

    pub async fn get_lead(&self, lead_id: Uuid) -> Result<Option<Lead>, ServiceError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            SELECT id, nombre, email, telefono, notas, estado, empresa_id, etapa_id, created_at, updated_at
            FROM camara.leads
            WHERE id = $1
            "#,
        )
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    /// Apply a partial update to a lead, guarding the empresa link.
    ///
    /// Rules for `empresa_id`:
    /// - key absent: the column is not part of the update set at all;
    /// - explicit null without `force_unlink_empresa`: rejected, no write;
    /// - explicit null with the flag: the link is cleared;
    /// - any non-null value: written as-is. No existence check is made
    ///   against `camara.empresas` here.
    ///
    /// Returns the updated row, or `None` when no lead matched the id.
    pub async fn update_lead(
        &self,
        lead_id: Uuid,
        patch: &LeadPatch,
        options: UpdateLeadOptions,
    ) -> Result<Option<Lead>, ServiceError> {
        if patch.is_empty() {
            return Err(ServiceError::validation("lead update payload is empty"));
        }

        if patch.empresa_id == Some(None) && !options.force_unlink_empresa {
            return Err(ServiceError::validation(
                "refusing to clear empresa_id: pass force_unlink_empresa=true to unlink the empresa",
            ));
        }

        let mut query = QueryBuilder::new("UPDATE camara.leads SET updated_at = NOW()");

        if let Some(nombre) = &patch.nombre {
            query.push(", nombre = ").push_bind(nombre);
        }
        if let Some(email) = &patch.email {
            query.push(", email = ").push_bind(email);
        }
        if let Some(telefono) = &patch.telefono {
            query.push(", telefono = ").push_bind(telefono);
        }
        if let Some(notas) = &patch.notas {
            query.push(", notas = ").push_bind(notas);
        }
        if let Some(estado) = &patch.estado {
            query.push(", estado = ").push_bind(estado);
        }
        if let Some(etapa_id) = patch.etapa_id {
            query.push(", etapa_id = ").push_bind(etapa_id);
        }
        match patch.empresa_id {
            None => {}
            Some(None) => {
                query.push(", empresa_id = NULL");
            }
            Some(Some(empresa_id)) => {
                query.push(", empresa_id = ").push_bind(empresa_id);
            }
        }

        query.push(" WHERE id = ").push_bind(lead_id);
        query.push(
            " RETURNING id, nombre, email, telefono, notas, estado, empresa_id, etapa_id, created_at, updated_at",
        );

        let lead = query
            .build_query_as::<Lead>()
            .fetch_optional(&self.pool)
            .await?;

        match &lead {
            Some(lead) => info!("Updated lead {} ({})", lead.nombre, lead.id),
            None => debug!("Lead update matched no row: {}", lead_id),
        }
        Ok(lead)
    }

    /// Convert an empresa from the directory into a sales lead.
    ///
    /// Inserts a lead pre-filled from the empresa's contact fields, then
    /// links it back through the guarded updater without the force flag.
    pub async fn convert_empresa_to_lead(&self, empresa_id: Uuid) -> Result<Lead, ServiceError> {
        let empresa = sqlx::query_as::<_, Empresa>(
            r#"
            SELECT id, nombre, email, telefono, sector, created_at, updated_at
            FROM camara.empresas
            WHERE id = $1
            "#,
        )
        .bind(empresa_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServiceError::NotFound {
            what: "empresa",
            id: empresa_id,
        })?;

        let lead = self
            .create_lead(&NewLeadFields {
                nombre: empresa.nombre.clone(),
                email: empresa.email.clone(),
                telefono: empresa.telefono.clone(),
                ..Default::default()
            })
            .await?;

        let patch = LeadPatch {
            empresa_id: Some(Some(empresa.id)),
            ..Default::default()
        };
        let linked = self
            .update_lead(lead.id, &patch, UpdateLeadOptions::default())
            .await?;

        info!("Converted empresa {} into lead {}", empresa.id, lead.id);
        Ok(linked.unwrap_or(lead))
    }
}
