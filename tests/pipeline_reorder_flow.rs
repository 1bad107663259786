//! E2E Test: pipeline stage reordering
//!
//! Runs the reorder operation against a real database: full reorders must
//! leave ranks as a dense 0-based permutation in input order, invalid input
//! must change nothing, and unknown ids are skipped without failing the call.

use anyhow::Result;
use camara_admin::database::{PipelineService, PipelineStage};
use sqlx::PgPool;
use uuid::Uuid;

async fn seed_stages(service: &PipelineService, nombres: &[&str]) -> Result<Vec<PipelineStage>> {
    let mut stages = Vec::with_capacity(nombres.len());
    for nombre in nombres {
        stages.push(service.create_stage(nombre, None).await?);
    }
    Ok(stages)
}

fn ids(stages: &[&PipelineStage]) -> Vec<String> {
    stages.iter().map(|s| s.id.to_string()).collect()
}

#[sqlx::test]
async fn full_reorder_yields_dense_ranks(pool: PgPool) -> Result<()> {
    let service = PipelineService::new(pool);
    let stages = seed_stages(&service, &["Contacto", "Reunion", "Propuesta", "Cierre"]).await?;

    // Reverse the pipeline.
    let reversed: Vec<&PipelineStage> = stages.iter().rev().collect();
    let outcome = service.reorder_stages(&ids(&reversed)).await?;

    assert_eq!(outcome.updated, 4);
    assert!(!outcome.is_partial());

    let listed = service.list_stages().await?;
    let ranks: Vec<(Uuid, i32)> = listed.iter().map(|s| (s.id, s.posicion)).collect();
    let expected: Vec<(Uuid, i32)> = reversed
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id, i as i32))
        .collect();
    assert_eq!(ranks, expected);
    Ok(())
}

#[sqlx::test]
async fn duplicate_id_rejected_without_writes(pool: PgPool) -> Result<()> {
    let service = PipelineService::new(pool);
    let stages = seed_stages(&service, &["Contacto", "Reunion"]).await?;

    let duplicated = vec![
        stages[1].id.to_string(),
        stages[0].id.to_string(),
        stages[1].id.to_string(),
    ];
    let err = service.reorder_stages(&duplicated).await.unwrap_err();
    assert!(err.is_validation());

    // Ranks unchanged.
    let listed = service.list_stages().await?;
    assert_eq!(listed[0].id, stages[0].id);
    assert_eq!(listed[0].posicion, 0);
    assert_eq!(listed[1].id, stages[1].id);
    assert_eq!(listed[1].posicion, 1);
    Ok(())
}

#[sqlx::test]
async fn empty_list_rejected(pool: PgPool) -> Result<()> {
    let service = PipelineService::new(pool);

    let err = service.reorder_stages(&[]).await.unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("empty"));
    Ok(())
}

#[sqlx::test]
async fn unknown_id_is_skipped_not_fatal(pool: PgPool) -> Result<()> {
    let service = PipelineService::new(pool);
    let stages = seed_stages(&service, &["Contacto", "Reunion"]).await?;

    let phantom = Uuid::new_v4();
    let submitted = vec![
        stages[1].id.to_string(),
        phantom.to_string(),
        stages[0].id.to_string(),
    ];
    let outcome = service.reorder_stages(&submitted).await?;

    assert_eq!(outcome.requested, 3);
    assert_eq!(outcome.updated, 2);
    assert!(outcome.is_partial());
    assert!(outcome.rows.iter().all(|r| r.id != phantom));

    // Ranks follow submitted indices, including the gap left by the phantom.
    let by_id: Vec<(Uuid, i32)> = outcome.rows.iter().map(|r| (r.id, r.posicion)).collect();
    assert_eq!(by_id, vec![(stages[1].id, 0), (stages[0].id, 2)]);
    Ok(())
}

#[sqlx::test]
async fn batch_shares_one_updated_at_instant(pool: PgPool) -> Result<()> {
    let service = PipelineService::new(pool);
    let stages = seed_stages(&service, &["Contacto", "Reunion", "Propuesta"]).await?;

    let submitted: Vec<String> = stages.iter().map(|s| s.id.to_string()).collect();
    let outcome = service.reorder_stages(&submitted).await?;

    let first = outcome.rows[0].updated_at;
    assert!(outcome.rows.iter().all(|r| r.updated_at == first));
    Ok(())
}
