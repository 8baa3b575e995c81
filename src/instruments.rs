use crate::candle_utils::normalize_trading_symbol;
use anyhow::{anyhow, Result};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum OptionType {
    #[value(name = "CE", alias = "ce", alias = "call")]
    Ce,
    #[value(name = "PE", alias = "pe", alias = "put")]
    Pe,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Ce => "CE",
            OptionType::Pe => "PE",
        }
    }
}

/// Everything needed to name one option contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrikeSelection {
    pub underlying: String,
    /// Expiry tag as used in trading symbols, e.g. `25JUL`.
    pub expiry: String,
    /// At-the-money price estimate.
    pub atm_price: i64,
    /// Offset from the ATM estimate, in index points.
    pub strike_gap: i64,
    pub option_type: OptionType,
}

impl StrikeSelection {
    pub fn strike(&self) -> i64 {
        self.atm_price + self.strike_gap
    }

    pub fn symbol(&self) -> Result<String> {
        resolve_symbol(
            &self.underlying,
            &self.expiry,
            self.strike(),
            self.option_type,
        )
    }
}

/// Builds a trading symbol such as `NIFTY25JUL25500CE`.
pub fn resolve_symbol(
    underlying: &str,
    expiry: &str,
    strike: i64,
    option_type: OptionType,
) -> Result<String> {
    let underlying = normalize_trading_symbol(underlying)
        .ok_or_else(|| anyhow!("Underlying symbol must not be empty"))?;
    let expiry =
        normalize_trading_symbol(expiry).ok_or_else(|| anyhow!("Expiry tag must not be empty"))?;
    if strike <= 0 {
        return Err(anyhow!("Strike must be positive (value: {})", strike));
    }
    Ok(format!(
        "{}{}{}{}",
        underlying,
        expiry,
        strike,
        option_type.as_str()
    ))
}

/// Strikes around `atm_price` rounded to `increment`, `count` steps on each side, ascending.
pub fn strike_ladder(atm_price: f64, increment: i64, count: usize) -> Result<Vec<i64>> {
    if increment <= 0 {
        return Err(anyhow!(
            "Strike increment must be positive (value: {})",
            increment
        ));
    }
    if !atm_price.is_finite() || atm_price <= 0.0 {
        return Err(anyhow!("ATM price must be positive (value: {})", atm_price));
    }

    let step = increment as f64;
    let atm_strike = ((atm_price / step).round() * step) as i64;
    let count = count as i64;
    Ok((-count..=count)
        .map(|offset| atm_strike + offset * increment)
        .filter(|strike| *strike > 0)
        .collect())
}
