use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tokio::signal::unix::{signal, SignalKind};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Config;
use crate::constructors::App;
use crate::handlers::Error;

mod catalog;
mod community;
mod courses;
mod extract;
mod users;

pub struct ApiState {
    pub app: App,
    pub jwt_secret: String,
}

pub type SharedState = Arc<ApiState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .nest("/api/users", users::router())
        .nest("/api/courses", courses::router())
        .nest("/api/categories", catalog::categories_router())
        .nest("/api/universities", catalog::universities_router())
        .nest("/api/community", community::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(app: App, config: Config) -> ::anyhow::Result<()> {
    let state = Arc::new(ApiState {
        app,
        jwt_secret: config.jwt_secret,
    });

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address).await?;
    info!("server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("failed to install Ctrl+C handler");

        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;

        info!("received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) | Error::AlreadyDone(_) | Error::NotDone(_) => {
                StatusCode::BAD_REQUEST
            },
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Internal(e) => {
                tracing::error!("internal error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            },
        };

        let message = match &self {
            Error::Internal(_) => "internal server error".to_owned(),
            e => e.to_string(),
        };

        (status, Json(::serde_json::json!({ "message": message }))).into_response()
    }
}

fn parse_id<T: ::core::str::FromStr>(raw: &str, what: &str) -> Result<T, Error> {
    raw.parse()
        .map_err(|_| Error::Validation(format!("malformed {} id", what)))
}
