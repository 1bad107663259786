use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use camara_admin::{
    database::{
        EmpresaService, LeadPatch, LeadService, NewEmpresaFields, NewLeadFields, PipelineService,
        StagePosition, UpdateLeadOptions,
    },
    DatabaseConfig, DatabaseManager, ServiceError,
};

// Application state
#[derive(Clone)]
pub struct AppState {
    pub empresas: EmpresaService,
    pub leads: LeadService,
    pub pipeline: PipelineService,
}

// API types
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Deserialize)]
pub struct LeadUpdateQuery {
    pub force_unlink_empresa: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct ReorderRequest {
    pub order: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ReorderResponse {
    pub updated: usize,
    pub rows: Vec<StagePosition>,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<T>>)>;

/// Map a service failure onto a transport status plus envelope.
fn map_service_error<T>(err: ServiceError) -> (StatusCode, Json<ApiResponse<T>>) {
    let status = match &err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!("Service failure: {err}");
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

fn not_found<T>(what: &str, id: Uuid) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error(format!("{what} not found: {id}"))),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "camara_admin_web_server=info,tower_http=debug".to_string()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Database connection, configured once and injected from here on
    let config = DatabaseConfig::from_env();
    let manager = DatabaseManager::new(config).await?;
    manager.run_migrations().await?;

    let app_state = AppState {
        empresas: manager.empresa_service(),
        leads: manager.lead_service(),
        pipeline: manager.pipeline_service(),
    };

    // Build our application with routes
    let app = create_router(app_state);

    // Determine port
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);

    let addr = format!("0.0.0.0:{}", port);
    info!("Starting server on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/empresas", get(list_empresas).post(create_empresa))
        .route("/api/empresas/:empresa_id", get(get_empresa))
        .route("/api/empresas/:empresa_id/convert", post(convert_empresa))
        .route("/api/leads", post(create_lead))
        .route("/api/leads/:lead_id", get(get_lead).patch(update_lead))
        .route(
            "/api/pipeline/stages",
            get(list_stages).patch(reorder_stages),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::ok("OK".to_string()))
}

// List directory empresas
async fn list_empresas(
    State(state): State<AppState>,
) -> ApiResult<Vec<camara_admin::database::Empresa>> {
    match state.empresas.list_empresas(None, None).await {
        Ok(empresas) => Ok(Json(ApiResponse::ok(empresas))),
        Err(e) => Err(map_service_error(e)),
    }
}

// Create a directory empresa
async fn create_empresa(
    State(state): State<AppState>,
    Json(fields): Json<NewEmpresaFields>,
) -> ApiResult<camara_admin::database::Empresa> {
    match state.empresas.create_empresa(&fields).await {
        Ok(empresa) => Ok(Json(ApiResponse::ok(empresa))),
        Err(e) => Err(map_service_error(e)),
    }
}

// Fetch one empresa
async fn get_empresa(
    Path(empresa_id): Path<Uuid>,
    State(state): State<AppState>,
) -> ApiResult<camara_admin::database::Empresa> {
    match state.empresas.get_empresa(empresa_id).await {
        Ok(Some(empresa)) => Ok(Json(ApiResponse::ok(empresa))),
        Ok(None) => Err(not_found("empresa", empresa_id)),
        Err(e) => Err(map_service_error(e)),
    }
}

// Convert an empresa into a sales lead
async fn convert_empresa(
    Path(empresa_id): Path<Uuid>,
    State(state): State<AppState>,
) -> ApiResult<camara_admin::database::Lead> {
    match state.leads.convert_empresa_to_lead(empresa_id).await {
        Ok(lead) => Ok(Json(ApiResponse::ok(lead))),
        Err(e) => Err(map_service_error(e)),
    }
}

// Create a lead
async fn create_lead(
    State(state): State<AppState>,
    Json(fields): Json<NewLeadFields>,
) -> ApiResult<camara_admin::database::Lead> {
    match state.leads.create_lead(&fields).await {
        Ok(lead) => Ok(Json(ApiResponse::ok(lead))),
        Err(e) => Err(map_service_error(e)),
    }
}

// Fetch one lead
async fn get_lead(
    Path(lead_id): Path<Uuid>,
    State(state): State<AppState>,
) -> ApiResult<camara_admin::database::Lead> {
    match state.leads.get_lead(lead_id).await {
        Ok(Some(lead)) => Ok(Json(ApiResponse::ok(lead))),
        Ok(None) => Err(not_found("lead", lead_id)),
        Err(e) => Err(map_service_error(e)),
    }
}

// Partial update of a lead; the empresa link is guarded
async fn update_lead(
    Path(lead_id): Path<Uuid>,
    Query(query): Query<LeadUpdateQuery>,
    State(state): State<AppState>,
    Json(patch): Json<LeadPatch>,
) -> ApiResult<camara_admin::database::Lead> {
    let options = UpdateLeadOptions {
        force_unlink_empresa: query.force_unlink_empresa.unwrap_or(false),
    };
    match state.leads.update_lead(lead_id, &patch, options).await {
        Ok(Some(lead)) => Ok(Json(ApiResponse::ok(lead))),
        Ok(None) => Err(not_found("lead", lead_id)),
        Err(e) => Err(map_service_error(e)),
    }
}

// List pipeline stages in display order
async fn list_stages(
    State(state): State<AppState>,
) -> ApiResult<Vec<camara_admin::database::PipelineStage>> {
    match state.pipeline.list_stages().await {
        Ok(stages) => Ok(Json(ApiResponse::ok(stages))),
        Err(e) => Err(map_service_error(e)),
    }
}

// Persist a client-supplied stage order
async fn reorder_stages(
    State(state): State<AppState>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<ReorderResponse> {
    match state.pipeline.reorder_stages(&request.order).await {
        Ok(outcome) => Ok(Json(ApiResponse::ok(ReorderResponse {
            updated: outcome.updated,
            rows: outcome.rows,
        }))),
        Err(e) => Err(map_service_error(e)),
    }
}
