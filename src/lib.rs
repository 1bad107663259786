//! Camara Admin - backend core for the Camara membership directory.
//!
//! This crate provides the database services behind the Camara admin console:
//! the empresa directory, sales leads with their guarded empresa link, and the
//! ordered sales pipeline.
//!
//! ## Architecture
//! Each service is a thin struct over a shared `PgPool`, created once at
//! process start from [`DatabaseConfig`] and injected into the services. All
//! operations return structured results; nothing panics in library code.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use camara_admin::{DatabaseConfig, DatabaseManager};
//!
//! # async fn run() -> Result<(), sqlx::Error> {
//! let manager = DatabaseManager::new(DatabaseConfig::from_env()).await?;
//! let leads = manager.lead_service();
//! let pipeline = manager.pipeline_service();
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Database services
pub mod database;

// Common exports
pub use database::{DatabaseConfig, DatabaseManager};
pub use database::{EmpresaService, LeadService, PipelineService};
pub use error::ServiceError;
