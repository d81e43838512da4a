//! REST API for the placement service.
//!
//! Provides HTTP endpoints for a loading-planner frontend.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::advice::{self, Suggestion};
use crate::config::{ApiConfig, PlannerConfig};
use crate::interaction::{PlacementEngine, SwapOutcome, SwapPolicy};
use crate::model::{BalanceReport, BalanceStatus, CargoBox, Container, ValidationError};
use crate::optimizer::{PlacementConfig, PlacementProgress, PlacementResult, place_all};
use crate::types::Point2;

#[derive(Clone)]
struct ApiState {
    planner: PlannerConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>stowplan API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request for a single box against a loaded container.
///
/// Used by `/placement/find` and `/placement/check`.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": { "name": "Container 1", "length": 11900.0, "width": 2300.0, "boxes": [] },
        "cargo": { "id": "BOX001", "length": 1200.0, "width": 800.0, "weight": 450.0 }
    })
)]
pub struct BoxRequest {
    pub container: Container,
    pub cargo: CargoBox,
}

/// Request for bulk auto-placement.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": { "name": "Container 1", "length": 11900.0, "width": 2300.0, "boxes": [] },
        "boxes": [
            { "id": "BOX001", "length": 1200.0, "width": 800.0, "weight": 450.0 },
            { "id": "BOX002", "length": 1000.0, "width": 1000.0, "weight": 600.0 }
        ],
        "allow_rotation": true
    })
)]
pub struct AutoPlaceRequest {
    pub container: Container,
    pub boxes: Vec<CargoBox>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub allow_rotation: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct BalanceRequest {
    pub container: Container,
}

/// Request to exchange the positions of two boxes.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": {
            "name": "Container 1", "length": 11900.0, "width": 2300.0,
            "boxes": [
                { "id": "A", "length": 1000.0, "width": 1000.0, "weight": 100.0, "x": 0.0, "y": 0.0 },
                { "id": "B", "length": 1000.0, "width": 1000.0, "weight": 200.0, "x": 1020.0, "y": 0.0 }
            ]
        },
        "first": "A",
        "second": "B",
        "policy": "strict"
    })
)]
pub struct SwapRequest {
    pub container: Container,
    pub first: String,
    pub second: String,
    #[serde(default)]
    #[schema(nullable = true)]
    pub policy: Option<SwapPolicy>,
}

#[derive(Serialize, ToSchema)]
pub struct FindResponse {
    /// Free position for the box, `null` if the floor has no room.
    #[schema(nullable = true)]
    pub position: Option<Point2>,
}

#[derive(Serialize, ToSchema)]
pub struct CheckResponse {
    pub valid: bool,
}

/// Response of the bulk auto-placement.
///
/// # Fields
/// * `container` - Loaded container with all placed boxes
/// * `placed` - Ids of the boxes placed by this request, in placement order
/// * `unplaced` - Boxes that did not fit, with reason
#[derive(Serialize, ToSchema)]
pub struct AutoPlaceResponse {
    pub container: Container,
    pub placed: Vec<String>,
    pub unplaced: Vec<UnplacedEntry>,
    pub is_complete: bool,
    pub utilization_percent: f64,
    pub balance: BalanceReport,
}

#[derive(Serialize, ToSchema)]
pub struct UnplacedEntry {
    pub id: String,
    pub weight: f64,
    #[schema(value_type = [f64; 2], example = json!([1200.0, 800.0]))]
    pub dims: (f64, f64),
    pub reason_code: String,
    pub reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct SwapResponse {
    pub result: SwapOutcome,
    pub container: Container,
}

impl AutoPlaceResponse {
    pub fn from_placement_result(result: PlacementResult) -> Self {
        let balance = result.balance();
        let is_complete = result.is_complete();
        let utilization_percent = result.utilization_percent();
        let PlacementResult {
            container,
            placed,
            unplaced,
            ..
        } = result;

        Self {
            container,
            placed,
            unplaced: unplaced
                .into_iter()
                .map(|entry| UnplacedEntry {
                    id: entry.cargo.id,
                    weight: entry.cargo.weight,
                    dims: (entry.cargo.length, entry.cargo.width),
                    reason_code: entry.reason.code().to_string(),
                    reason: entry.reason.to_string(),
                })
                .collect(),
            is_complete,
            utilization_percent,
            balance,
        }
    }
}

#[derive(Debug)]
enum RequestValidationError {
    InvalidContainer(ValidationError),
    InvalidBox(ValidationError),
}

fn validate_boxes<'a>(
    boxes: impl IntoIterator<Item = &'a CargoBox>,
) -> Result<(), RequestValidationError> {
    boxes
        .into_iter()
        .try_for_each(CargoBox::validate)
        .map_err(RequestValidationError::InvalidBox)
}

impl BoxRequest {
    fn validate(&self) -> Result<(), RequestValidationError> {
        self.container
            .validate()
            .map_err(RequestValidationError::InvalidContainer)?;
        validate_boxes([&self.cargo])
    }
}

impl AutoPlaceRequest {
    fn validate(&self) -> Result<(), RequestValidationError> {
        self.container
            .validate()
            .map_err(RequestValidationError::InvalidContainer)?;
        validate_boxes(&self.boxes)
    }

    fn placement_config(&self, planner: &PlannerConfig) -> PlacementConfig {
        let mut config = planner.placement_config();
        if let Some(allow_rotation) = self.allow_rotation {
            config.allow_rotation = allow_rotation;
        }
        config
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn container_config_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid container configuration",
        details,
    )
}

fn request_error(err: RequestValidationError) -> Response {
    match err {
        RequestValidationError::InvalidContainer(err) => container_config_error(err.to_string()),
        RequestValidationError::InvalidBox(err) => validation_error(err.to_string()),
    }
}

fn unwrap_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(payload)) => Ok(payload),
        Err(err) => Err(json_deserialize_error(err)),
    }
}

fn parse_box_request(
    payload: Result<Json<BoxRequest>, JsonRejection>,
) -> Result<BoxRequest, Response> {
    let request = unwrap_payload(payload)?;
    request.validate().map_err(request_error)?;
    Ok(request)
}

fn parse_auto_place_request(
    payload: Result<Json<AutoPlaceRequest>, JsonRejection>,
) -> Result<AutoPlaceRequest, Response> {
    let request = unwrap_payload(payload)?;
    request.validate().map_err(request_error)?;
    Ok(request)
}

fn parse_swap_request(
    payload: Result<Json<SwapRequest>, JsonRejection>,
) -> Result<SwapRequest, Response> {
    let request = unwrap_payload(payload)?;
    request
        .container
        .validate()
        .map_err(|err| container_config_error(err.to_string()))?;
    for id in [&request.first, &request.second] {
        if !request.container.contains(id) {
            return Err(validation_error(format!("Unknown box id: {}", id)));
        }
    }
    Ok(request)
}

/// Runs a swap on a throwaway engine bound to the request container.
///
/// Kept synchronous so the engine never lives across an await point.
fn run_swap(request: SwapRequest, planner: &PlannerConfig) -> Result<SwapResponse, Response> {
    let SwapRequest {
        container,
        first,
        second,
        policy,
    } = request;
    let config = planner.interaction_config();
    let policy = policy.unwrap_or(config.swap_policy);

    let mut engine = PlacementEngine::with_config(container, config);
    let result = engine
        .swap_with_policy(&first, &second, policy)
        .map_err(|err| validation_error(err.to_string()))?;
    Ok(SwapResponse {
        result,
        container: engine.into_container(),
    })
}

/// Balance, status band and loading hints for one container.
#[derive(Serialize, ToSchema)]
pub struct LoadReport {
    pub balance: BalanceReport,
    pub status: BalanceStatus,
    pub utilization_percent: f64,
    pub suggestions: Vec<Suggestion>,
}

impl LoadReport {
    fn for_container(container: &Container, planner: &PlannerConfig) -> Self {
        let balance = container.calculate_weight_balance_with(planner.torque_limits());
        Self {
            status: balance.status(),
            utilization_percent: container.utilization_percent(),
            suggestions: advice::suggestions(container, &balance),
            balance,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_find,
        handle_check,
        handle_auto_place,
        handle_auto_place_stream,
        handle_balance,
        handle_report,
        handle_swap
    ),
    components(
        schemas(
            BoxRequest,
            AutoPlaceRequest,
            BalanceRequest,
            SwapRequest,
            FindResponse,
            CheckResponse,
            AutoPlaceResponse,
            UnplacedEntry,
            SwapResponse,
            SwapOutcome,
            SwapPolicy,
            ErrorResponse,
            CargoBox,
            Container,
            BalanceReport,
            BalanceStatus,
            LoadReport,
            Suggestion,
            PlacementProgress,
            Point2
        )
    ),
    tags(
        (name = "placement", description = "Endpoints for placing boxes on a container floor"),
        (name = "analysis", description = "Balance and rearrangement")
    )
)]
struct ApiDoc;

/// Builds the router with all endpoints and CORS.
fn router(planner: PlannerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { planner };

    Router::new()
        .route("/placement/find", post(handle_find))
        .route("/placement/check", post(handle_check))
        .route("/placement/auto", post(handle_auto_place))
        .route("/placement/auto_stream", post(handle_auto_place_stream))
        .route("/balance", post(handle_balance))
        .route("/report", post(handle_report))
        .route("/swap", post(handle_swap))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server on the configured address.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, planner: PlannerConfig) {
    let app = router(planner);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("❌ Could not bind API server to {}: {}", addr, err);
            return;
        }
    };

    let display_host = config.display_host().to_string();
    println!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() {
        println!("💡 Local access: http://localhost:{}", config.port());
    }
    println!("📦 API Endpoints:");
    println!("   - POST /placement/find");
    println!("   - POST /placement/check");
    println!("   - POST /placement/auto");
    println!("   - POST /placement/auto_stream");
    println!("   - POST /balance");
    println!("   - POST /report");
    println!("   - POST /swap");
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("❌ API server terminated with an error: {err}");
    }
}

/// Handler for POST /placement/find.
///
/// Returns the first free position for the box, scanning the floor in
/// configured steps. The container is not modified.
#[utoipa::path(
    post,
    path = "/placement/find",
    request_body = BoxRequest,
    responses(
        (status = 200, description = "Position found or null", body = FindResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid container or box",
            body = ErrorResponse
        )
    ),
    tag = "placement"
)]
async fn handle_find(
    State(state): State<ApiState>,
    payload: Result<Json<BoxRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_box_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let step = state.planner.placement_config().search_step;
    let position = request
        .container
        .find_placement_position_with_step(&request.cargo, step)
        .map(|(x, y)| Point2::new(x, y));
    (StatusCode::OK, Json(FindResponse { position })).into_response()
}

/// Handler for POST /placement/check.
///
/// Checks the box at its given position against floor bounds and the other boxes.
/// A box with the same id in the container is ignored.
#[utoipa::path(
    post,
    path = "/placement/check",
    request_body = BoxRequest,
    responses(
        (status = 200, description = "Validity of the position", body = CheckResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid container or box",
            body = ErrorResponse
        )
    ),
    tag = "placement"
)]
async fn handle_check(payload: Result<Json<BoxRequest>, JsonRejection>) -> impl IntoResponse {
    let request = match parse_box_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let valid = request.container.can_place_box(&request.cargo, true);
    (StatusCode::OK, Json(CheckResponse { valid })).into_response()
}

/// Handler for POST /placement/auto.
///
/// Places all given boxes greedily, largest footprint first.
#[utoipa::path(
    post,
    path = "/placement/auto",
    request_body = AutoPlaceRequest,
    responses(
        (status = 200, description = "Loaded container and leftovers", body = AutoPlaceResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid container or box",
            body = ErrorResponse
        )
    ),
    tag = "placement"
)]
async fn handle_auto_place(
    State(state): State<ApiState>,
    payload: Result<Json<AutoPlaceRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_auto_place_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let config = request.placement_config(&state.planner);
    println!(
        "📥 New placement request: {} boxes on {}",
        request.boxes.len(),
        request.container.name
    );
    let result = place_all(request.container, request.boxes, config, |_| {});
    println!(
        "📦 Result: {} placed, {} unplaced, {:.1}% floor used",
        result.placed_count(),
        result.unplaced_count(),
        result.utilization_percent()
    );

    let response = AutoPlaceResponse::from_placement_result(result);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /placement/auto_stream (SSE).
///
/// Streams placement events as Server-Sent Events (text/event-stream).
#[utoipa::path(
    post,
    path = "/placement/auto_stream",
    request_body = AutoPlaceRequest,
    responses(
        (
            status = 200,
            description = "Streams placement events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid container or box",
            body = ErrorResponse
        )
    ),
    tag = "placement"
)]
async fn handle_auto_place_stream(
    State(state): State<ApiState>,
    payload: Result<Json<AutoPlaceRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_auto_place_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let config = request.placement_config(&state.planner);
    let AutoPlaceRequest {
        container, boxes, ..
    } = request;

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let _ = place_all(container, boxes, config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver drops the remaining events.
                let _ = tx.blocking_send(json);
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /balance.
#[utoipa::path(
    post,
    path = "/balance",
    request_body = BalanceRequest,
    responses(
        (status = 200, description = "Weight balance of the container", body = BalanceReport),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid container", body = ErrorResponse)
    ),
    tag = "analysis"
)]
async fn handle_balance(
    State(state): State<ApiState>,
    payload: Result<Json<BalanceRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match unwrap_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if let Err(err) = request.container.validate() {
        return container_config_error(err.to_string());
    }

    let report = request
        .container
        .calculate_weight_balance_with(state.planner.torque_limits());
    (StatusCode::OK, Json(report)).into_response()
}

/// Handler for POST /report.
#[utoipa::path(
    post,
    path = "/report",
    request_body = BalanceRequest,
    responses(
        (status = 200, description = "Balance status and loading hints", body = LoadReport),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid container", body = ErrorResponse)
    ),
    tag = "analysis"
)]
async fn handle_report(
    State(state): State<ApiState>,
    payload: Result<Json<BalanceRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match unwrap_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if let Err(err) = request.container.validate() {
        return container_config_error(err.to_string());
    }

    let report = LoadReport::for_container(&request.container, &state.planner);
    (StatusCode::OK, Json(report)).into_response()
}

/// Handler for POST /swap.
///
/// Exchanges two boxes. Without a policy in the request the configured one applies.
#[utoipa::path(
    post,
    path = "/swap",
    request_body = SwapRequest,
    responses(
        (status = 200, description = "Swap outcome and resulting container", body = SwapResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid container or unknown box",
            body = ErrorResponse
        )
    ),
    tag = "analysis"
)]
async fn handle_swap(
    State(state): State<ApiState>,
    payload: Result<Json<SwapRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_swap_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match run_swap(request, &state.planner) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(response) => response,
    }
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
