// src/resolver.rs
use futures_util::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};

use crate::fetcher::BalanceFetcher;
use crate::models::{Balance, WalletBalances};

/// Resolves one wallet across every configured network
#[derive(Clone)]
pub struct WalletResolver {
    fetcher: BalanceFetcher,
    networks: Arc<Vec<String>>, // configured order
}

impl WalletResolver {
    pub fn new(fetcher: BalanceFetcher, networks: Vec<String>) -> Self {
        Self {
            fetcher,
            networks: Arc::new(networks),
        }
    }

    pub fn networks(&self) -> &[String] {
        &self.networks
    }

    /// Fetch every network concurrently, one task each, and keep configured order.
    ///
    /// If any network task dies the wallet gets a single `ERROR` entry instead, so
    /// one bad wallet never takes the batch down with it.
    pub async fn resolve(&self, raw_address: &str) -> WalletBalances {
        let address = raw_address.trim().to_string();

        let tasks = self.networks.iter().map(|network| {
            let fetcher = self.fetcher.clone();
            let address = address.clone();
            let network = network.clone();
            tokio::spawn(async move { fetcher.fetch(&address, &network).await })
        });
        let results = join_all(tasks).await;

        let mut balances = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(balance) => balances.push(balance),
                Err(e) => {
                    error!("Error processing wallet {}: {}", address, e);
                    let mut failed = WalletBalances::new(address);
                    failed.add_balance(Balance::wallet_error(&e.to_string()));
                    return failed;
                }
            }
        }

        let mut wallet = WalletBalances::new(address);
        for balance in balances {
            if balance.amount > Decimal::ZERO {
                info!(
                    "Found balance in {}: {} = {} {}",
                    balance.network, wallet.address, balance.amount, balance.token
                );
            }
            wallet.add_balance(balance);
        }
        wallet
    }
}
