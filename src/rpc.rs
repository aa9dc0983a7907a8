// src/rpc.rs
use alloy::primitives::U256;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Native balances use 18 decimals on every supported chain
pub const NATIVE_DECIMALS: u32 = 18;

/// Why a single RPC attempt failed
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    #[error("HTTP {0}")]
    Http(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request permits closed")]
    GovernorClosed,
}

/// Raw HTTP reply, uninterpreted
#[derive(Debug, Clone)]
pub struct RpcReply {
    pub status: u16,
    pub body: String,
}

impl RpcReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Anything that can POST a JSON-RPC payload to an endpoint
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn post(&self, url: &str, payload: &Value) -> Result<RpcReply, RpcError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> eyre::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post(&self, url: &str, payload: &Value) -> Result<RpcReply, RpcError> {
        let resp = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(map_reqwest_error)?;
        Ok(RpcReply::new(status, body))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> RpcError {
    if e.is_timeout() {
        RpcError::Timeout
    } else {
        RpcError::Transport(e.to_string())
    }
}

/// `eth_getBalance` at the latest block
pub fn balance_request(address: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "eth_getBalance",
        "params": [address, "latest"],
        "id": 1
    })
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

/// What one attempt against one endpoint produced
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(Decimal),
    RateLimited(String),
    Failed(RpcError),
}

/// Classify a raw `eth_getBalance` reply.
///
/// A 429 status or a body mentioning "rate limit" is a rate limit regardless of
/// status. On a 2xx reply, a JSON-RPC error whose text mentions "rate" is also a
/// rate limit; any other error payload is a failure.
pub fn classify(reply: &RpcReply) -> AttemptOutcome {
    if reply.status == StatusCode::TOO_MANY_REQUESTS.as_u16() {
        return AttemptOutcome::RateLimited(format!("HTTP {}", reply.status));
    }
    if reply.body.to_lowercase().contains("rate limit") {
        return AttemptOutcome::RateLimited("rate limit in response body".to_string());
    }

    let success = StatusCode::from_u16(reply.status)
        .map(|s| s.is_success())
        .unwrap_or(false);
    if !success {
        return AttemptOutcome::Failed(RpcError::Http(reply.status));
    }

    let parsed: RpcResponse = match serde_json::from_str(&reply.body) {
        Ok(p) => p,
        Err(e) => return AttemptOutcome::Failed(RpcError::Malformed(e.to_string())),
    };

    if let Some(error) = parsed.error {
        let text = error.to_string();
        if text.to_lowercase().contains("rate") {
            return AttemptOutcome::RateLimited(text);
        }
        return AttemptOutcome::Failed(RpcError::Rpc(text));
    }

    match parsed.result {
        Some(hex) => match parse_native_amount(&hex) {
            Ok(amount) => AttemptOutcome::Success(amount),
            Err(e) => AttemptOutcome::Failed(e),
        },
        None => AttemptOutcome::Failed(RpcError::Malformed("missing result".to_string())),
    }
}

/// Significant digits kept when a quantity is too wide for an exact scale-18 amount
pub const SIGNIFICANT_DIGITS: usize = 28;

/// Convert a `0x`-prefixed base-unit quantity into whole tokens (18 decimals).
///
/// Quantities of up to 28 decimal digits convert exactly. Wider ones are rounded
/// half-to-even to 28 significant digits and the scale drops accordingly. Only
/// amounts beyond `Decimal::MAX` whole tokens are rejected.
pub fn parse_native_amount(hex: &str) -> Result<Decimal, RpcError> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RpcError::Malformed(format!("bad quantity {:?}", hex)));
    }

    let base_units = U256::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Malformed(format!("bad quantity {:?}: {}", hex, e)))?;

    let (mantissa, dropped) = round_significant(base_units);
    let out_of_range = || RpcError::Malformed(format!("quantity {} out of range", hex));
    // at most 10^28, always fits
    let mantissa = u128::try_from(mantissa).map_err(|_| out_of_range())? as i128;

    if dropped <= NATIVE_DECIMALS {
        return Decimal::try_from_i128_with_scale(mantissa, NATIVE_DECIMALS - dropped)
            .map_err(|_| out_of_range());
    }

    let factor = 10i128
        .checked_pow(dropped - NATIVE_DECIMALS)
        .ok_or_else(out_of_range)?;
    let factor = Decimal::try_from_i128_with_scale(factor, 0).map_err(|_| out_of_range())?;
    Decimal::try_from_i128_with_scale(mantissa, 0)
        .map_err(|_| out_of_range())?
        .checked_mul(factor)
        .ok_or_else(out_of_range)
}

/// Round to `SIGNIFICANT_DIGITS` digits, half to even. Returns the kept digits and
/// how many trailing decimal digits were dropped.
fn round_significant(value: U256) -> (U256, u32) {
    let width = value.to_string().len();
    if width <= SIGNIFICANT_DIGITS {
        return (value, 0);
    }

    let dropped = width - SIGNIFICANT_DIGITS;
    let divisor = U256::from(10u64).pow(U256::from(dropped as u64));
    let mut kept = value / divisor;
    let remainder = value % divisor;
    let half = divisor / U256::from(2u64);
    if remainder > half || (remainder == half && kept.bit(0)) {
        kept += U256::from(1u64);
    }
    (kept, dropped as u32)
}

#[cfg(test)]
pub mod mock {
    //! Scripted transport for tests. Replies are keyed by endpoint URL.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, Clone)]
    pub enum Script {
        Reply(RpcReply),
        Fail(RpcError),
        Hang,
        Panic,
    }

    #[derive(Debug, Clone)]
    struct Route {
        script: Script,
        latency: Duration,
    }

    /// One recorded request
    #[derive(Debug, Clone)]
    pub struct Call {
        pub url: String,
        pub address: String,
        pub at: Instant,
    }

    #[derive(Debug, Default)]
    pub struct MockTransport {
        routes: Mutex<HashMap<String, Route>>,
        calls: Mutex<Vec<Call>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        fn route(self, url: &str, script: Script) -> Self {
            self.routes.lock().unwrap().insert(
                url.to_string(),
                Route {
                    script,
                    latency: Duration::ZERO,
                },
            );
            self
        }

        pub fn with_reply(self, url: &str, status: u16, body: &str) -> Self {
            self.route(url, Script::Reply(RpcReply::new(status, body)))
        }

        /// 200 reply carrying `result`
        pub fn with_balance(self, url: &str, hex: &str) -> Self {
            let body = json!({"jsonrpc": "2.0", "id": 1, "result": hex}).to_string();
            self.with_reply(url, 200, &body)
        }

        /// 200 reply carrying a JSON-RPC error
        pub fn with_rpc_error(self, url: &str, code: i64, message: &str) -> Self {
            let body = json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": code, "message": message}
            })
            .to_string();
            self.with_reply(url, 200, &body)
        }

        pub fn with_failure(self, url: &str, err: RpcError) -> Self {
            self.route(url, Script::Fail(err))
        }

        pub fn hanging(self, url: &str) -> Self {
            self.route(url, Script::Hang)
        }

        pub fn panicking(self, url: &str) -> Self {
            self.route(url, Script::Panic)
        }

        /// Delay every reply from `url`; call after the route is set
        pub fn with_latency(self, url: &str, latency: Duration) -> Self {
            if let Some(route) = self.routes.lock().unwrap().get_mut(url) {
                route.latency = latency;
            }
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, url: &str) -> usize {
            self.calls().iter().filter(|c| c.url == url).count()
        }

        pub fn peak_in_flight(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl RpcTransport for MockTransport {
        async fn post(&self, url: &str, payload: &Value) -> Result<RpcReply, RpcError> {
            let address = payload["params"][0].as_str().unwrap_or_default().to_string();
            self.calls.lock().unwrap().push(Call {
                url: url.to_string(),
                address,
                at: Instant::now(),
            });

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlight(&self.in_flight);

            let route = self.routes.lock().unwrap().get(url).cloned();
            let Some(route) = route else {
                return Err(RpcError::Transport(format!("no route for {}", url)));
            };

            if !route.latency.is_zero() {
                tokio::time::sleep(route.latency).await;
            }

            match route.script {
                Script::Reply(reply) => Ok(reply),
                Script::Fail(err) => Err(err),
                Script::Hang => std::future::pending().await,
                Script::Panic => panic!("scripted panic for {}", url),
            }
        }
    }
}
