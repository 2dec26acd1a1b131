//! Mudrex futures REST client.
//!
//! One [`MudrexClient`] is bound to one subscriber's API secret, sent as the
//! `X-Authentication` header on every request. [`MudrexConnector`] shares a
//! single connection pool across all of them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::dto::{
    AssetData, Envelope, FundsData, LeverageBody, OrderBody, OrderData, PartialCloseBody,
    PositionData, RiskOrderBody,
};
use super::settings::MudrexConfig;
use crate::domain::quantity::format_quantity;
use crate::domain::signal::Side;
use crate::domain::subscriber::ApiCredentials;
use crate::error::ExchangeError;
use crate::port::outbound::exchange::{
    Asset, ExchangeConnector, FuturesExchange, MarginType, OrderRequest, PlacedOrder, Position,
};

const AUTH_HEADER: &str = "X-Authentication";

/// HTTP client for one Mudrex account.
pub struct MudrexClient {
    http: HttpClient,
    base_url: String,
    api_secret: String,
    retry_max_attempts: u32,
    retry_backoff_ms: u64,
}

impl MudrexClient {
    /// Create a client with default HTTP settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_secret: api_secret.into(),
            retry_max_attempts: 1,
            retry_backoff_ms: 0,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, ExchangeError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        let max_attempts = if method == Method::GET {
            self.retry_max_attempts.max(1)
        } else {
            1
        };
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut builder = self
                .http
                .request(method.clone(), &url)
                .header(AUTH_HEADER, &self.api_secret);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            match builder.send().await {
                Ok(response) => return Self::decode(response).await,
                Err(err) => {
                    if attempt >= max_attempts || !Self::should_retry(&err) {
                        return Err(err.into());
                    }
                    self.backoff(attempt, max_attempts, &err).await;
                }
            }
        }
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Option<T>, ExchangeError> {
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ExchangeError::AuthFailed(error_text(&text, status)));
        }
        if !status.is_success() {
            return Err(ExchangeError::Api {
                code: Some(i64::from(status.as_u16())),
                message: error_text(&text, status),
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&text).map_err(|e| ExchangeError::Decode(e.to_string()))?;
        if !envelope.success {
            let (code, message) = envelope.error_summary();
            let message = if message.is_empty() {
                "request rejected".to_string()
            } else {
                message
            };
            return Err(ExchangeError::Api { code, message });
        }
        Ok(envelope.data)
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ExchangeError> {
        self.request::<T, ()>(Method::GET, path, None)
            .await?
            .ok_or_else(|| ExchangeError::Decode(format!("missing data in response to {path}")))
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<serde_json::Value>, ExchangeError> {
        self.request(Method::POST, path, body).await
    }

    fn should_retry(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }

    async fn backoff(&self, attempt: u32, max_attempts: u32, err: &reqwest::Error) {
        warn!(
            attempt,
            max_attempts,
            error = %err,
            "Mudrex request failed, retrying"
        );
        if self.retry_backoff_ms > 0 {
            sleep(Duration::from_millis(self.retry_backoff_ms)).await;
        }
    }
}

#[async_trait]
impl FuturesExchange for MudrexClient {
    async fn futures_balance(&self) -> Result<Decimal, ExchangeError> {
        let funds: FundsData = self.get_data("/futures/funds").await?;
        Ok(funds.balance)
    }

    async fn asset(&self, symbol: &str) -> Result<Option<Asset>, ExchangeError> {
        let path = format!("/futures/{symbol}?is_symbol");
        match self.request::<AssetData, ()>(Method::GET, &path, None).await {
            Ok(Some(data)) => Ok(Some(Asset {
                symbol: data.symbol,
                quantity_step: data.quantity_step,
                min_quantity: data.min_quantity,
                max_quantity: data.max_quantity,
                last_price: data.last_price,
            })),
            Ok(None) | Err(ExchangeError::Api { code: Some(404), .. }) => {
                debug!(symbol, "Asset not listed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn set_leverage(
        &self,
        symbol: &str,
        leverage: u32,
        margin: MarginType,
    ) -> Result<(), ExchangeError> {
        let body = LeverageBody {
            margin_type: margin.as_str(),
            leverage: leverage.to_string(),
        };
        self.post(&format!("/futures/{symbol}/leverage?is_symbol"), Some(&body))
            .await?;
        Ok(())
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<PlacedOrder, ExchangeError> {
        let body = OrderBody {
            leverage: request.leverage.to_string(),
            quantity: format_quantity(request.quantity),
            order_type: request.side.as_str(),
            trigger_type: request.order_type.as_str(),
            order_price: request.price.map(|p| p.normalize().to_string()),
            reduce_only: false,
        };
        let path = format!("/futures/{}/order?is_symbol", request.symbol);
        let data: OrderData = self
            .request(Method::POST, &path, Some(&body))
            .await?
            .ok_or_else(|| ExchangeError::Decode("order response carried no order id".into()))?;

        Ok(PlacedOrder {
            order_id: data.order_id,
        })
    }

    async fn open_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        let positions: Vec<PositionData> = self
            .request::<Vec<PositionData>, ()>(Method::GET, "/futures/positions", None)
            .await?
            .unwrap_or_default();

        Ok(positions
            .into_iter()
            .map(|p| Position {
                position_id: p.position_id,
                symbol: p.symbol,
                side: p.side.and_then(|s| s.parse::<Side>().ok()),
                quantity: p.quantity,
            })
            .collect())
    }

    async fn set_risk_order(
        &self,
        position_id: &str,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Result<(), ExchangeError> {
        let body = RiskOrderBody {
            is_stoploss: stop_loss.is_some(),
            is_takeprofit: take_profit.is_some(),
            stoploss_price: stop_loss.map(|p| p.normalize().to_string()),
            takeprofit_price: take_profit.map(|p| p.normalize().to_string()),
        };
        self.post(
            &format!("/futures/positions/{position_id}/riskorder"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn close_position(&self, position_id: &str) -> Result<(), ExchangeError> {
        self.post::<()>(&format!("/futures/positions/{position_id}/close"), None)
            .await?;
        Ok(())
    }

    async fn close_partial(
        &self,
        position_id: &str,
        quantity: Decimal,
    ) -> Result<(), ExchangeError> {
        let body = PartialCloseBody {
            quantity: format_quantity(quantity),
        };
        self.post(
            &format!("/futures/positions/{position_id}/close/partial"),
            Some(&body),
        )
        .await?;
        Ok(())
    }
}

/// Builds [`MudrexClient`]s that share one HTTP connection pool.
pub struct MudrexConnector {
    http: HttpClient,
    config: MudrexConfig,
}

impl MudrexConnector {
    #[must_use]
    pub fn from_config(config: &MudrexConfig) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(config.http.timeout_ms))
            .connect_timeout(Duration::from_millis(config.http.connect_timeout_ms))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });

        Self {
            http,
            config: config.clone(),
        }
    }
}

impl ExchangeConnector for MudrexConnector {
    fn connect(&self, credentials: &ApiCredentials) -> Arc<dyn FuturesExchange> {
        Arc::new(MudrexClient {
            http: self.http.clone(),
            base_url: self.config.base_url.trim_end_matches('/').to_string(),
            api_secret: credentials.api_secret.clone(),
            retry_max_attempts: self.config.http.retry_max_attempts,
            retry_backoff_ms: self.config.http.retry_backoff_ms,
        })
    }

    fn exchange_name(&self) -> &'static str {
        "Mudrex"
    }
}

fn error_text(body: &str, status: StatusCode) -> String {
    if let Ok(envelope) = serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        let (_, text) = envelope.error_summary();
        if !text.is_empty() {
            return text;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
