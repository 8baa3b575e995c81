use crate::instruments::{resolve_symbol, strike_ladder, OptionType};
use anyhow::Result;
use log::info;

/// Lists trading symbols for strikes around an ATM estimate.
pub fn run(
    underlying: &str,
    expiry: &str,
    atm_price: f64,
    increment: i64,
    count: usize,
    option_type: OptionType,
) -> Result<Vec<String>> {
    let symbols = strike_ladder(atm_price, increment, count)?
        .into_iter()
        .map(|strike| resolve_symbol(underlying, expiry, strike, option_type))
        .collect::<Result<Vec<_>>>()?;

    info!(
        "{} {} strikes around {:.2} (step {})",
        symbols.len(),
        option_type.as_str(),
        atm_price,
        increment
    );
    for symbol in &symbols {
        println!("{}", symbol);
    }
    Ok(symbols)
}
