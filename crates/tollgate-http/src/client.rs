use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use tollgate_domain::{AggregatorClient, ClientError, ClientResult, Distance, Invoice};

use crate::types::{AggregateBody, InvoiceBody};

/// HTTP adapter for the [`AggregatorClient`] contract.
///
/// Connections are pooled inside the reqwest client and released when it
/// drops; each call is bounded by the configured timeout.
pub struct HttpAggregatorClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAggregatorClient {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.into()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AggregatorClient for HttpAggregatorClient {
    async fn aggregate(&self, distance: Distance) -> ClientResult<()> {
        let body = AggregateBody {
            obu_id: distance.unit_id,
            value: distance.value,
            unix: distance.unix,
        };

        let response = self
            .client
            .post(format!("{}/aggregate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.into()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        Err(error_for_status(status, distance.unit_id, response).await)
    }

    async fn get_invoice(&self, unit_id: i64) -> ClientResult<Invoice> {
        let response = self
            .client
            .get(format!("{}/invoice/{}", self.base_url, unit_id))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_for_status(status, unit_id, response).await);
        }

        let body: InvoiceBody = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(e.into()))?;

        Ok(Invoice {
            unit_id: body.obu_id,
            total_distance: body.total_distance,
            amount: body.amount,
        })
    }
}

async fn error_for_status(
    status: StatusCode,
    unit_id: i64,
    response: reqwest::Response,
) -> ClientError {
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| status.to_string());

    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(unit_id),
        // Gateway-class failures mean the aggregator itself never answered.
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ClientError::Transport(anyhow::anyhow!("HTTP {status}: {message}"))
        }
        _ => ClientError::Rejected(format!("HTTP {status}: {message}")),
    }
}
