// src/models.rs
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Network name used for the synthetic entry of a wallet that failed as a whole
pub const ERROR_NETWORK: &str = "ERROR";

/// Native token symbol for a network
pub fn token_symbol(network: &str) -> &'static str {
    match network {
        "BSC" => "BNB",
        "Polygon" => "POL",
        _ => "ETH",
    }
}

/// Native balance of one address on one network
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    pub network: String,
    pub amount: Decimal, // whole tokens, converted from base units
    pub token: String,
}

impl Balance {
    pub fn new(network: &str, amount: Decimal, token: &str) -> Self {
        Self {
            network: network.to_string(),
            amount,
            token: token.to_string(),
        }
    }

    /// Zero balance with the network's native symbol (also used after all RPCs failed)
    pub fn zero(network: &str) -> Self {
        Self::new(network, Decimal::ZERO, token_symbol(network))
    }

    /// Placeholder recorded when resolving a whole wallet failed
    pub fn wallet_error(cause: &str) -> Self {
        Self::new(ERROR_NETWORK, Decimal::ZERO, &format!("Error: {}", cause))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.6} {}", self.network, self.amount, self.token)
    }
}

/// All per-network balances of one address, in configured network order
#[derive(Debug, Clone, Serialize)]
pub struct WalletBalances {
    pub address: String,
    pub balances: Vec<Balance>,
}

impl WalletBalances {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            balances: Vec::new(),
        }
    }

    pub fn add_balance(&mut self, balance: Balance) {
        self.balances.push(balance);
    }
}

/// Result of one batch run. Wallet order is not guaranteed to match input order.
#[derive(Debug, Default, Serialize)]
pub struct BalanceReport {
    wallets: Vec<WalletBalances>,
}

impl BalanceReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_wallet(&mut self, wallet: WalletBalances) {
        self.wallets.push(wallet);
    }

    pub fn wallets(&self) -> &[WalletBalances] {
        &self.wallets
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    #[cfg(test)]
    pub fn find(&self, address: &str) -> Option<&WalletBalances> {
        self.wallets.iter().find(|w| w.address == address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_token_symbol_mapping() {
        assert_eq!(token_symbol("BSC"), "BNB");
        assert_eq!(token_symbol("Polygon"), "POL");
        assert_eq!(token_symbol("Ethereum"), "ETH");
        assert_eq!(token_symbol("Arbitrum"), "ETH");
        // exact match only
        assert_eq!(token_symbol("bsc"), "ETH");
    }

    #[test]
    fn test_zero_balance_uses_native_symbol() {
        let b = Balance::zero("Polygon");
        assert_eq!(b.network, "Polygon");
        assert_eq!(b.amount, Decimal::ZERO);
        assert_eq!(b.token, "POL");
    }

    #[test]
    fn test_wallet_error_entry() {
        let b = Balance::wallet_error("task panicked");
        assert_eq!(b.network, ERROR_NETWORK);
        assert!(b.amount.is_zero());
        assert_eq!(b.token, "Error: task panicked");
    }

    #[test]
    fn test_display_rounds_to_six_places() {
        let b = Balance::new("BSC", Decimal::from_str("0.123456789").unwrap(), "BNB");
        assert_eq!(b.to_string(), "BSC: 0.123457 BNB");
    }

    #[test]
    fn test_report_keeps_every_wallet() {
        let mut report = BalanceReport::new();
        assert!(report.is_empty());

        let mut w = WalletBalances::new("0xabc");
        w.add_balance(Balance::zero("Ethereum"));
        report.add_wallet(w);
        report.add_wallet(WalletBalances::new("0xabc"));

        assert_eq!(report.len(), 2);
        assert_eq!(report.find("0xabc").unwrap().balances.len(), 1);
    }
}
