// REST API with Axum - receiving end of the Mini App

use crate::db::{add_cashback, clear_cashbacks, get_all_cashbacks, get_best_cashback};
use crate::webapp_data::{
    confirmation_message, parse_payload, CashbackEntry, OPEN_APP_BUTTON, START_MESSAGE,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub webapp_url: String,
}

impl AppState {
    pub fn new(conn: Connection, webapp_url: impl Into<String>) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
            webapp_url: webapp_url.into(),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, Response> {
        self.db.lock().map_err(|_| {
            tracing::error!("Database mutex poisoned");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
        })
    }
}

/// API Response wrapper
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
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
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

/// POST /api/webapp-data body
#[derive(Deserialize, Debug)]
pub struct WebAppDataRequest {
    pub user_id: i64,
    /// Raw string produced by the form's `send_data`
    pub data: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WebAppDataResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StartResponse {
    pub message: String,
    pub button: String,
    pub webapp_url: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ClearResponse {
    pub deleted: usize,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/start - Greeting with the Mini App button
pub async fn start(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(StartResponse {
        message: START_MESSAGE.to_string(),
        button: OPEN_APP_BUTTON.to_string(),
        webapp_url: state.webapp_url.clone(),
    }))
}

/// POST /api/webapp-data - Store a Mini App submission
pub async fn submit_webapp_data(
    State(state): State<AppState>,
    Json(request): Json<WebAppDataRequest>,
) -> Response {
    let submission = match parse_payload(&request.data) {
        Ok(submission) => submission,
        Err(e) => {
            tracing::warn!(user_id = request.user_id, "Rejected web app data: {:#}", e);
            return error_response(StatusCode::BAD_REQUEST, format!("{:#}", e));
        }
    };

    let entry = match CashbackEntry::from_submission(&submission) {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!(user_id = request.user_id, "Rejected web app data: {:#}", e);
            return error_response(StatusCode::BAD_REQUEST, format!("{:#}", e));
        }
    };

    let conn = match state.conn() {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match add_cashback(&conn, request.user_id, &entry) {
        Ok(id) => (
            StatusCode::CREATED,
            Json(ApiResponse::ok(WebAppDataResponse {
                id,
                message: confirmation_message(&entry),
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(user_id = request.user_id, "Error storing cashback: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to store cashback")
        }
    }
}

/// GET /api/cashbacks/:user_id - All cashbacks of a user
pub async fn list_cashbacks(State(state): State<AppState>, Path(user_id): Path<i64>) -> Response {
    let conn = match state.conn() {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match get_all_cashbacks(&conn, user_id) {
        Ok(entries) => (StatusCode::OK, Json(ApiResponse::ok(entries))).into_response(),
        Err(e) => {
            tracing::error!("Error getting cashbacks: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to load cashbacks")
        }
    }
}

/// GET /api/cashbacks/:user_id/search/:query - Best cashback for a category
pub async fn search_cashbacks(
    State(state): State<AppState>,
    Path((user_id, query)): Path<(i64, String)>,
) -> Response {
    // `Path` has already percent-decoded the segment
    let conn = match state.conn() {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match get_best_cashback(&conn, user_id, &query) {
        Ok(entries) => (StatusCode::OK, Json(ApiResponse::ok(entries))).into_response(),
        Err(e) => {
            tracing::error!("Error searching cashbacks for '{}': {:#}", query, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to search cashbacks")
        }
    }
}

/// DELETE /api/cashbacks/:user_id - Forget a user's cashbacks
pub async fn delete_cashbacks(State(state): State<AppState>, Path(user_id): Path<i64>) -> Response {
    let conn = match state.conn() {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    match clear_cashbacks(&conn, user_id) {
        Ok(deleted) => (StatusCode::OK, Json(ApiResponse::ok(ClearResponse { deleted }))).into_response(),
        Err(e) => {
            tracing::error!("Error clearing cashbacks: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to clear cashbacks")
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/start", get(start))
        .route("/webapp-data", post(submit_webapp_data))
        .route("/cashbacks/:user_id", get(list_cashbacks).delete(delete_cashbacks))
        .route("/cashbacks/:user_id/search/:query", get(search_cashbacks))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        AppState::new(conn, "https://example.org/webapp/index.html")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_submit_and_list() {
        let state = test_state();

        let response = submit_webapp_data(
            State(state.clone()),
            Json(WebAppDataRequest {
                user_id: 1,
                data: r#"{"bank":"Visa","category":"Groceries","percent":"5"}"#.to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert!(body["data"]["message"].as_str().unwrap().contains("Groceries"));

        let response = list_cashbacks(State(state), Path(1)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let entries: Vec<CashbackEntry> = serde_json::from_value(body["data"].clone()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].bank, "Visa");
        assert_eq!(entries[0].percent, 5.0);
    }

    #[tokio::test]
    async fn test_submit_rejects_missing_category() {
        let state = test_state();

        let response = submit_webapp_data(
            State(state.clone()),
            Json(WebAppDataRequest {
                user_id: 1,
                data: r#"{"bank":"","category":"","percent":"10"}"#.to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("category"));

        let conn = state.db.lock().unwrap();
        assert_eq!(crate::db::count_cashbacks(&conn, 1).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_unparseable_percent() {
        let state = test_state();

        let response = submit_webapp_data(
            State(state.clone()),
            Json(WebAppDataRequest {
                user_id: 1,
                data: r#"{"bank":"Visa","category":"Fuel","percent":"lots"}"#.to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("Invalid percent"));

        let conn = state.db.lock().unwrap();
        assert_eq!(crate::db::count_cashbacks(&conn, 1).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_submit_storage_failure_is_server_error() {
        let state = test_state();
        state
            .db
            .lock()
            .unwrap()
            .execute("DROP TABLE cashbacks", [])
            .unwrap();

        let response = submit_webapp_data(
            State(state),
            Json(WebAppDataRequest {
                user_id: 1,
                data: r#"{"bank":"Visa","category":"Fuel","percent":"2"}"#.to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "failed to store cashback");
    }

    #[tokio::test]
    async fn test_submit_reply_shows_parsed_percent() {
        let state = test_state();

        let response = submit_webapp_data(
            State(state),
            Json(WebAppDataRequest {
                user_id: 1,
                data: r#"{"bank":"Visa","category":"Fuel","percent":"5%"}"#.to_string(),
            }),
        )
        .await;

        let body = body_json(response).await;
        let message = body["data"]["message"].as_str().unwrap();
        assert!(message.ends_with("📉 Процент: 5%"));
        assert!(!message.contains("%%"));
    }

    async fn search(state: AppState, uri: &str) -> serde_json::Value {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }

    #[tokio::test]
    async fn test_search_route_decodes_query_once() {
        let state = test_state();
        {
            let conn = state.db.lock().unwrap();
            for (bank, category) in [("Amex", "Fast Food"), ("Mir", "A%41"), ("Ozon", "AA")] {
                let entry = CashbackEntry {
                    bank: bank.to_string(),
                    category: category.to_string(),
                    percent: 7.0,
                };
                crate::db::add_cashback(&conn, 3, &entry).unwrap();
            }
        }

        let body = search(state.clone(), "/api/cashbacks/3/search/fast%20food").await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["bank"], "Amex");

        // %25 is a literal percent sign, so the query is "A%41", not "AA"
        let body = search(state, "/api/cashbacks/3/search/A%2541").await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["category"], "A%41");
    }

    #[tokio::test]
    async fn test_delete_and_start() {
        let state = test_state();

        let response = delete_cashbacks(State(state.clone()), Path(9)).await;
        let body = body_json(response).await;
        assert_eq!(body["data"]["deleted"], 0);

        let response = start(State(state)).await.into_response();
        let body = body_json(response).await;
        assert_eq!(body["data"]["webapp_url"], "https://example.org/webapp/index.html");
    }
}
