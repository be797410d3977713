use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use common::{
    Bar, CandleSource, Error, Fill, Granularity, Order, OrderOutcome, OrderSink, RejectionReason,
    Result, TradingMode,
};

pub const LIVE_URL: &str = "https://api-fxtrade.oanda.com";
pub const PRACTICE_URL: &str = "https://api-fxpractice.oanda.com";

/// REST client for the OANDA v20 API. Serves candles and places market orders.
pub struct OandaClient {
    base_url: String,
    account_id: String,
    token: String,
    http: Client,
}

impl OandaClient {
    /// Client for the host matching `mode`. Paper mode reads practice data.
    pub fn new(
        mode: TradingMode,
        account_id: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = match mode {
            TradingMode::Live => LIVE_URL,
            TradingMode::Practice | TradingMode::Paper => PRACTICE_URL,
        };
        Self::with_base_url(base_url, account_id, token, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        account_id: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_id: account_id.into(),
            token: token.into(),
            http,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Broker(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }

    async fn post_json(&self, path: &str, payload: &serde_json::Value) -> Result<(StatusCode, String)> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        Ok((status, text))
    }
}

#[async_trait]
impl CandleSource for OandaClient {
    async fn fetch_candles(
        &self,
        instrument: &str,
        granularity: Granularity,
        count: usize,
    ) -> Result<Vec<Bar>> {
        debug!(instrument, %granularity, count, "Fetching candles from OANDA");
        let path = format!("/v3/instruments/{instrument}/candles");
        let body = self
            .get(
                &path,
                &[
                    ("count", count.to_string()),
                    ("granularity", granularity.code().to_string()),
                    ("price", "M".to_string()),
                ],
            )
            .await?;
        parse_candles(&body)
    }
}

#[async_trait]
impl OrderSink for OandaClient {
    async fn submit_market_order(&self, order: &Order) -> Result<OrderOutcome> {
        let payload = order_payload(order);
        debug!(instrument = %order.instrument, units = order.units, "Submitting order to OANDA");

        let path = format!("/v3/accounts/{}/orders", self.account_id);
        let (status, body) = self.post_json(&path, &payload).await?;

        match status {
            s if s.is_success() => {
                let resp: OrderResponse =
                    serde_json::from_str(&body).map_err(|e| Error::Broker(e.to_string()))?;
                Ok(outcome_from_response(order, resp))
            }
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
                let resp: OrderResponse = serde_json::from_str(&body).unwrap_or_default();
                Ok(OrderOutcome::Rejected(rejection_from_response(status, resp)))
            }
            _ => Err(Error::Broker(format!("HTTP {status}: {body}"))),
        }
    }
}

fn order_payload(order: &Order) -> serde_json::Value {
    let mut body = json!({
        "type": "MARKET",
        "instrument": order.instrument,
        "units": order.units.to_string(),
        "timeInForce": "FOK",
        "positionFill": "DEFAULT",
        "clientExtensions": { "id": order.id },
    });
    if let Some(price) = order.stop_loss {
        body["stopLossOnFill"] = json!({ "price": format!("{price:.5}") });
    }
    if let Some(price) = order.take_profit {
        body["takeProfitOnFill"] = json!({ "price": format!("{price:.5}") });
    }
    json!({ "order": body })
}

fn outcome_from_response(order: &Order, resp: OrderResponse) -> OrderOutcome {
    if let Some(fill) = resp.order_fill_transaction {
        let trade_id = fill
            .trade_opened
            .map(|t| t.trade_id)
            .or_else(|| fill.trades_closed.into_iter().next().map(|t| t.trade_id));
        return OrderOutcome::Filled(Fill {
            order_id: order.id.clone(),
            trade_id,
            instrument: order.instrument.clone(),
            units: order.units,
            fill_price: fill.price.and_then(|p| p.parse().ok()),
            timestamp: Utc::now(),
        });
    }
    if let Some(cancel) = resp.order_cancel_transaction {
        return OrderOutcome::Rejected(RejectionReason::Cancelled(cancel.reason));
    }
    OrderOutcome::Rejected(RejectionReason::Cancelled(
        "order accepted without a fill".to_string(),
    ))
}

fn rejection_from_response(status: StatusCode, resp: OrderResponse) -> RejectionReason {
    let code = resp
        .order_reject_transaction
        .map(|r| r.reject_reason)
        .or(resp.error_code)
        .unwrap_or_else(|| status.as_u16().to_string());
    RejectionReason::Broker {
        code,
        message: resp.error_message.unwrap_or_default(),
    }
}

/// Parse a candles response into bars, oldest first, indexed from zero.
fn parse_candles(body: &str) -> Result<Vec<Bar>> {
    let resp: CandlesResponse = serde_json::from_str(body)?;
    resp.candles
        .into_iter()
        .enumerate()
        .map(|(index, candle)| candle.into_bar(index))
        .collect()
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CandlesResponse {
    candles: Vec<CandleDto>,
}

#[derive(Deserialize)]
struct CandleDto {
    time: String,
    mid: Option<MidPrices>,
}

#[derive(Deserialize)]
struct MidPrices {
    o: Option<String>,
    h: Option<String>,
    l: Option<String>,
    c: Option<String>,
}

impl CandleDto {
    fn into_bar(self, index: usize) -> Result<Bar> {
        let invalid = |reason: String| Error::InvalidCandle { index, reason };

        let time = DateTime::parse_from_rfc3339(&self.time)
            .map_err(|e| invalid(format!("bad time '{}': {e}", self.time)))?
            .with_timezone(&Utc);
        let mid = self.mid.ok_or_else(|| invalid("missing mid prices".into()))?;

        let price = |field: &str, raw: Option<String>| -> Result<f64> {
            let raw = raw.ok_or_else(|| invalid(format!("missing '{field}' price")))?;
            raw.parse::<f64>()
                .map_err(|_| invalid(format!("unparsable '{field}' price '{raw}'")))
        };

        Ok(Bar::new(
            index,
            time,
            price("o", mid.o)?,
            price("h", mid.h)?,
            price("l", mid.l)?,
            price("c", mid.c)?,
        ))
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_fill_transaction: Option<FillTransaction>,
    order_cancel_transaction: Option<CancelTransaction>,
    order_reject_transaction: Option<RejectTransaction>,
    error_code: Option<String>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FillTransaction {
    price: Option<String>,
    trade_opened: Option<TradeRef>,
    #[serde(default)]
    trades_closed: Vec<TradeRef>,
}

#[derive(Deserialize)]
struct TradeRef {
    #[serde(rename = "tradeID")]
    trade_id: String,
}

#[derive(Deserialize)]
struct CancelTransaction {
    reason: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RejectTransaction {
    reject_reason: String,
}
