//! HTTP surface: a single `GET /` endpoint

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use sluice_web::AdmissionController;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::dispatcher::Dispatcher;

/// Shared state handed to every request
#[derive(Debug, Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Admit and dispatch one request.
///
/// The work runs in its own task so it completes, and is accounted for, even
/// when the client disconnects and this future is dropped. Dropping the
/// future cancels `cancel`, which admission and the dispatcher observe.
async fn serve_request(State(state): State<AppState>) -> Response {
    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let response = match state.admission.admit(&cancel).await {
            Ok(permit) => {
                let answer = state.dispatcher.dispatch(&cancel).await;
                permit.release();
                answer.map(IntoResponse::into_response)
            }
            Err(rejection) => Some(rejection.into_response()),
        };

        if let Some(response) = response {
            // the receiver is gone if the caller disconnected meanwhile
            let _ = tx.send(response);
        }
    });

    match rx.await {
        Ok(response) => response,
        Err(_) => {
            error!("Request task ended without a response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
