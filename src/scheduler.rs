// src/scheduler.rs
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::Config;
use crate::fetcher::BalanceFetcher;
use crate::governor::ConcurrencyGovernor;
use crate::models::{Balance, BalanceReport, WalletBalances};
use crate::rate_limiter::RateLimiter;
use crate::resolver::WalletResolver;
use crate::rotator::EndpointRotator;
use crate::rpc::RpcTransport;

/// Number of chunks the address list is split into
pub const CHUNK_COUNT: usize = 5;

/// Sizes of the contiguous chunks for `total` addresses split `chunks` ways.
///
/// Chunk size is `ceil(total / chunks)`; the last chunk takes the remainder and
/// empty chunks are dropped, so fewer than `chunks` may come back
/// (12 addresses -> [3, 3, 3, 3]).
pub fn chunk_sizes(total: usize, chunks: usize) -> Vec<usize> {
    if total == 0 || chunks == 0 {
        return Vec::new();
    }
    let size = total.div_ceil(chunks);
    (0..total)
        .step_by(size)
        .map(|start| size.min(total - start))
        .collect()
}

/// Runs a whole batch: chunks in parallel, wallets one after another inside a chunk.
pub struct BatchScheduler {
    resolver: WalletResolver,
    chunk_count: usize,
}

impl BatchScheduler {
    pub fn new(resolver: WalletResolver, chunk_count: usize) -> Self {
        Self {
            resolver,
            chunk_count,
        }
    }

    /// Wire the full engine (rotator, rate limiter, governor, fetcher, resolver)
    pub fn from_config(cfg: &Config, transport: Arc<dyn RpcTransport>) -> Self {
        let rotator = EndpointRotator::new(
            cfg.networks
                .iter()
                .map(|n| (n.name.clone(), n.rpcs.clone())),
        );
        let fetcher = BalanceFetcher::new(
            transport,
            Arc::new(rotator),
            Arc::new(RateLimiter::new(cfg.engine.min_request_interval())),
            ConcurrencyGovernor::new(cfg.engine.max_concurrent_requests),
            cfg.engine.request_timeout(),
        );
        let resolver = WalletResolver::new(fetcher, cfg.network_names());
        Self::new(resolver, cfg.engine.chunk_count)
    }

    /// Resolve every address. The report has one entry per input address; wallets
    /// are merged as chunks finish, so report order need not match input order.
    pub async fn run(&self, addresses: Vec<String>) -> BalanceReport {
        let mut report = BalanceReport::new();
        let sizes = chunk_sizes(addresses.len(), self.chunk_count);
        info!(
            "Processing {} wallets in {} chunks across {} networks",
            addresses.len(),
            sizes.len(),
            self.resolver.networks().len()
        );

        let mut chunks = JoinSet::new();
        let mut pending = BTreeMap::new();
        let mut remaining = addresses.into_iter();
        for (index, size) in sizes.into_iter().enumerate() {
            let chunk: Vec<String> = remaining.by_ref().take(size).collect();
            pending.insert(index, chunk.clone());
            let resolver = self.resolver.clone();
            chunks.spawn(async move { (index, process_chunk(&resolver, chunk).await) });
        }

        merge_chunks(chunks, pending, &mut report).await;

        info!("Successfully processed {} wallets", report.len());
        report
    }
}

/// Drain finished chunks into the report. A chunk whose task died still gets one
/// `ERROR` wallet per address, so the report always covers the whole input.
async fn merge_chunks(
    mut chunks: JoinSet<(usize, Vec<WalletBalances>)>,
    mut pending: BTreeMap<usize, Vec<String>>,
    report: &mut BalanceReport,
) {
    while let Some(joined) = chunks.join_next().await {
        match joined {
            Ok((index, wallets)) => {
                pending.remove(&index);
                info!("Chunk {} finished with {} wallets", index, wallets.len());
                for wallet in wallets {
                    report.add_wallet(wallet);
                }
            }
            Err(e) => error!("Chunk task failed: {:?}", e),
        }
    }

    for (index, addresses) in pending {
        error!("Chunk {} lost, marking {} wallets as failed", index, addresses.len());
        for address in addresses {
            let mut wallet = WalletBalances::new(address.trim());
            wallet.add_balance(Balance::wallet_error("chunk task failed"));
            report.add_wallet(wallet);
        }
    }
}

async fn process_chunk(resolver: &WalletResolver, wallets: Vec<String>) -> Vec<WalletBalances> {
    let mut results = Vec::with_capacity(wallets.len());
    for wallet in &wallets {
        results.push(resolver.resolve(wallet).await);
    }
    results
}
