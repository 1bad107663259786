//! E2E Test: lead update and empresa conversion flow
//!
//! Exercises the guarded empresa link end to end against a real database:
//! plain field updates must not disturb the link, unlinking requires the
//! force flag, and converting an empresa produces a linked lead.

use anyhow::Result;
use camara_admin::database::{
    EmpresaService, LeadPatch, LeadService, NewEmpresaFields, NewLeadFields, UpdateLeadOptions,
};
use sqlx::PgPool;
use uuid::Uuid;

async fn seed_empresa(pool: &PgPool) -> Result<Uuid> {
    let service = EmpresaService::new(pool.clone());
    let empresa = service
        .create_empresa(&NewEmpresaFields {
            nombre: "Hotel Mirador SA".to_string(),
            email: Some("reservas@mirador.mx".to_string()),
            telefono: Some("+52 55 5555 0199".to_string()),
            sector: Some("Turismo".to_string()),
        })
        .await?;
    Ok(empresa.id)
}

#[sqlx::test]
async fn plain_field_update_preserves_empresa_link(pool: PgPool) -> Result<()> {
    let empresa_id = seed_empresa(&pool).await?;
    let leads = LeadService::new(pool);

    let lead = leads
        .create_lead(&NewLeadFields {
            nombre: "Carlos Rivas".to_string(),
            empresa_id: Some(empresa_id),
            ..Default::default()
        })
        .await?;

    // Patch carries nombre only; the empresa_id key is absent.
    let patch: LeadPatch = serde_json::from_str(r#"{"nombre": "Carlos R."}"#)?;
    let updated = leads
        .update_lead(lead.id, &patch, UpdateLeadOptions::default())
        .await?
        .expect("lead exists");

    assert_eq!(updated.nombre, "Carlos R.");
    assert_eq!(updated.empresa_id, Some(empresa_id));
    Ok(())
}

#[sqlx::test]
async fn unlink_without_force_fails_and_preserves_link(pool: PgPool) -> Result<()> {
    let empresa_id = seed_empresa(&pool).await?;
    let leads = LeadService::new(pool);

    let lead = leads
        .create_lead(&NewLeadFields {
            nombre: "Carlos Rivas".to_string(),
            empresa_id: Some(empresa_id),
            ..Default::default()
        })
        .await?;

    let patch: LeadPatch = serde_json::from_str(r#"{"empresa_id": null}"#)?;
    let err = leads
        .update_lead(lead.id, &patch, UpdateLeadOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let stored = leads.get_lead(lead.id).await?.expect("lead exists");
    assert_eq!(stored.empresa_id, Some(empresa_id));
    Ok(())
}

#[sqlx::test]
async fn convert_empresa_creates_linked_lead(pool: PgPool) -> Result<()> {
    let empresa_id = seed_empresa(&pool).await?;
    let leads = LeadService::new(pool);

    let lead = leads.convert_empresa_to_lead(empresa_id).await?;

    assert_eq!(lead.empresa_id, Some(empresa_id));
    assert_eq!(lead.nombre, "Hotel Mirador SA");
    assert_eq!(lead.email.as_deref(), Some("reservas@mirador.mx"));

    let stored = leads.get_lead(lead.id).await?.expect("lead exists");
    assert_eq!(stored.empresa_id, Some(empresa_id));
    Ok(())
}

#[sqlx::test]
async fn convert_unknown_empresa_is_not_found(pool: PgPool) -> Result<()> {
    let leads = LeadService::new(pool);

    let err = leads
        .convert_empresa_to_lead(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("empresa not found"));
    Ok(())
}
