// src/output.rs
use chrono::{DateTime, Local};
use eyre::{Result, WrapErr};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::models::{Balance, BalanceReport};

#[derive(Debug, Serialize)]
pub struct RenderedBalance<'a> {
    pub network: &'a str,
    pub amount: String, // full precision
    pub token: &'a str,
    pub above_threshold: bool,
}

#[derive(Debug, Serialize)]
pub struct RenderedWallet<'a> {
    pub address: &'a str,
    pub balances: Vec<RenderedBalance<'a>>,
}

#[derive(Debug, Serialize)]
pub struct RenderedReport<'a> {
    pub generated_at: String,
    pub wallets: Vec<RenderedWallet<'a>>,
}

/// `amount >= threshold` for the network's lowercase name; no threshold means no highlight
pub fn above_threshold(balance: &Balance, thresholds: &HashMap<String, f64>) -> bool {
    thresholds
        .get(&balance.network.to_lowercase())
        .and_then(|t| Decimal::from_f64(*t))
        .map(|t| balance.amount >= t)
        .unwrap_or(false)
}

pub fn render<'a>(
    report: &'a BalanceReport,
    thresholds: &HashMap<String, f64>,
    generated_at: DateTime<Local>,
) -> RenderedReport<'a> {
    let wallets = report
        .wallets()
        .iter()
        .map(|wallet| RenderedWallet {
            address: &wallet.address,
            balances: wallet
                .balances
                .iter()
                .map(|b| RenderedBalance {
                    network: &b.network,
                    amount: b.amount.to_string(),
                    token: &b.token,
                    above_threshold: above_threshold(b, thresholds),
                })
                .collect(),
        })
        .collect();

    RenderedReport {
        generated_at: generated_at.to_rfc3339(),
        wallets,
    }
}

/// Write `EVM_report_<timestamp>.json` into `dir` and return its path
pub fn write_report(
    report: &BalanceReport,
    thresholds: &HashMap<String, f64>,
    dir: &Path,
) -> Result<PathBuf> {
    let now = Local::now();
    let path = dir.join(format!("EVM_report_{}.json", now.format("%Y-%m-%d_%H-%M-%S")));

    for wallet in report.wallets() {
        let line: Vec<String> = wallet.balances.iter().map(|b| b.to_string()).collect();
        info!("{} | {}", wallet.address, line.join(" | "));
    }

    let rendered = render(report, thresholds, now);
    let json = serde_json::to_string_pretty(&rendered)?;
    std::fs::write(&path, json)
        .wrap_err_with(|| format!("Failed to write report {}", path.display()))?;

    Ok(path)
}
