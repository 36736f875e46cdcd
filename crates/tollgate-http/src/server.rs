use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use tollgate_domain::{Distance, DomainError, InvoiceAggregator};

use crate::types::{AggregateBody, InvoiceBody};

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Build the aggregator's HTTP surface.
pub fn build_router(aggregator: Arc<dyn InvoiceAggregator>) -> Router {
    Router::new()
        .route("/aggregate", post(aggregate))
        .route("/invoice/:unit_id", get(get_invoice))
        .route("/health", get(|| async { "ok" }))
        .with_state(aggregator)
}

async fn aggregate(
    State(aggregator): State<Arc<dyn InvoiceAggregator>>,
    Json(body): Json<AggregateBody>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    debug!(
        obu_id = body.obu_id,
        value = body.value,
        "received aggregate request"
    );

    let distance = Distance {
        unit_id: body.obu_id,
        value: body.value,
        unix: body.unix,
    };

    aggregator
        .aggregate_distance(distance)
        .await
        .map_err(domain_error_to_response)?;

    Ok(Json(serde_json::json!({})))
}

async fn get_invoice(
    State(aggregator): State<Arc<dyn InvoiceAggregator>>,
    Path(unit_id): Path<i64>,
) -> Result<Json<InvoiceBody>, (StatusCode, String)> {
    debug!(obu_id = unit_id, "received invoice request");

    let invoice = aggregator
        .get_invoice(unit_id)
        .await
        .map_err(domain_error_to_response)?;

    Ok(Json(InvoiceBody {
        obu_id: invoice.unit_id,
        total_distance: invoice.total_distance,
        amount: invoice.amount,
    }))
}

fn domain_error_to_response(error: DomainError) -> (StatusCode, String) {
    match error {
        DomainError::InvalidSample(msg) | DomainError::DecodeError(msg) => {
            (StatusCode::BAD_REQUEST, msg)
        }
        DomainError::InvoiceNotFound(unit_id) => (
            StatusCode::NOT_FOUND,
            format!("no invoice for unit {unit_id}"),
        ),
        DomainError::StoreError(err) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("store error: {err}"))
        }
    }
}

/// Run the HTTP server with graceful shutdown.
pub async fn run_http_server(
    config: HttpServerConfig,
    aggregator: Arc<dyn InvoiceAggregator>,
    cancellation_token: CancellationToken,
) -> Result<(), anyhow::Error> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid HTTP server address")?;

    info!(address = %addr, "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind HTTP listener")?;

    let serve = axum::serve(listener, build_router(aggregator)).with_graceful_shutdown(
        async move {
            cancellation_token.cancelled().await;
            info!("HTTP server shutdown signal received");
        },
    );

    match serve.await {
        Ok(_) => {
            info!("HTTP server stopped gracefully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "HTTP server error");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tollgate_domain::{InMemoryInvoiceStore, InvoiceService, PricingModel};
    use tower::ServiceExt;

    fn router() -> Router {
        let store = Arc::new(InMemoryInvoiceStore::new());
        let service = Arc::new(InvoiceService::new(store, PricingModel::new(2.0)));
        build_router(service)
    }

    fn aggregate_request(obu_id: i64, value: f64, unix: i64) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/aggregate")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"obu_id": obu_id, "value": value, "unix": unix}).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn aggregate_then_get_invoice() {
        let app = router();

        let response = app
            .clone()
            .oneshot(aggregate_request(42, 10.0, 100))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(aggregate_request(42, 5.5, 101))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/invoice/42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let invoice: InvoiceBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(invoice.obu_id, 42);
        assert_eq!(invoice.total_distance, 15.5);
        assert_eq!(invoice.amount, 31.0);
    }

    #[tokio::test]
    async fn unknown_unit_is_404() {
        let app = router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/invoice/7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_distance_is_400() {
        let app = router();

        let response = app.oneshot(aggregate_request(1, -1.0, 100)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_body_is_a_client_error() {
        let app = router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/aggregate")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }
}
