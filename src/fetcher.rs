// src/fetcher.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::governor::ConcurrencyGovernor;
use crate::models::{token_symbol, Balance};
use crate::rate_limiter::RateLimiter;
use crate::rotator::EndpointRotator;
use crate::rpc::{balance_request, classify, AttemptOutcome, RpcError, RpcTransport};

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches one native balance with failover across a network's endpoints.
///
/// The retry budget is one attempt per configured endpoint. Every fetch walks the
/// list from the primary endpoint, and every failed attempt (rate limit or any
/// other error) advances the network's shared rotation cursor before moving on.
/// A fetch never fails: when the budget runs out it returns a zero balance and
/// the cause only shows up in the logs.
#[derive(Clone)]
pub struct BalanceFetcher {
    transport: Arc<dyn RpcTransport>,
    rotator: Arc<EndpointRotator>,
    limiter: Arc<RateLimiter>,
    governor: ConcurrencyGovernor,
    request_timeout: Duration,
}

impl BalanceFetcher {
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        rotator: Arc<EndpointRotator>,
        limiter: Arc<RateLimiter>,
        governor: ConcurrencyGovernor,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            rotator,
            limiter,
            governor,
            request_timeout,
        }
    }

    pub async fn fetch(&self, address: &str, network: &str) -> Balance {
        let endpoints = self.rotator.endpoints(network);
        if endpoints.is_empty() {
            error!("No RPC endpoints configured for {}", network);
            return Balance::zero(network);
        }

        let mut last_error: Option<String> = None;

        for (attempt, rpc_url) in endpoints.iter().enumerate() {
            match self.attempt(address, network, rpc_url).await {
                AttemptOutcome::Success(amount) => {
                    return Balance::new(network, amount, token_symbol(network));
                }
                AttemptOutcome::RateLimited(reason) => {
                    warn!("Rate limit reached for {} at {}: {}", network, rpc_url, reason);
                    last_error = Some(format!("rate limited: {}", reason));
                }
                AttemptOutcome::Failed(err) => {
                    error!("Error getting balance for {} ({}): {}", network, rpc_url, err);
                    last_error = Some(err.to_string());
                }
            }

            if let Some(previous) = self.rotator.advance(network) {
                debug!("{} rotation cursor moved past {}", network, previous);
            }
            if let Some(next) = endpoints.get(attempt + 1) {
                info!("Switching to next RPC for {}: {}", network, next);
            }
        }

        error!(
            "All {} RPCs failed for {} ({}). Last error: {}. Cursor at {} after {} rotations",
            endpoints.len(),
            network,
            address,
            last_error.as_deref().unwrap_or("none"),
            self.rotator.current(network).unwrap_or_default(),
            self.rotator.rotations(network),
        );
        Balance::zero(network)
    }

    /// One permit-gated, rate-limited, time-bounded request
    async fn attempt(&self, address: &str, network: &str, rpc_url: &str) -> AttemptOutcome {
        let _permit = match self.governor.acquire().await {
            Ok(permit) => permit,
            Err(_) => return AttemptOutcome::Failed(RpcError::GovernorClosed),
        };

        self.limiter.wait(network).await;

        debug!("📡 Sending eth_getBalance → {} ({}, {})", rpc_url, network, address);
        let payload = balance_request(address);

        match timeout(self.request_timeout, self.transport.post(rpc_url, &payload)).await {
            Ok(Ok(reply)) => classify(&reply),
            Ok(Err(e)) => AttemptOutcome::Failed(e),
            Err(_) => AttemptOutcome::Failed(RpcError::Timeout),
        }
    }
}
