use crate::error::EngineError;
use anyhow::{anyhow, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_LOT_SIZE: u32 = 75;
pub const DEFAULT_COMMISSION: f64 = 70.0;
pub const DEFAULT_MAX_DRAWDOWN_RATIO: f64 = 0.20;

/// Which column drives entries and exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum SignalMode {
    /// Heikin-Ashi trend flips: enter on turned-up, exit on turned-down.
    SmoothedTrend,
    /// BUY/SELL values supplied alongside each candle.
    ExternalSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum PositionSizing {
    /// As many whole lots as current capital buys at the entry price.
    Dynamic,
    FixedOneLot,
}

/// What to do with candles that carry no signal value in external-signal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum MissingSignalPolicy {
    TreatAsNoSignal,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub lot_size: u32,
    /// Charged once per round-trip trade.
    pub commission: f64,
    /// Open positions are stopped out once capital falls below `peak * (1 - ratio)`.
    pub max_drawdown_ratio: f64,
    pub signal_mode: SignalMode,
    pub position_sizing: PositionSizing,
    pub missing_signal_policy: MissingSignalPolicy,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            lot_size: DEFAULT_LOT_SIZE,
            commission: DEFAULT_COMMISSION,
            max_drawdown_ratio: DEFAULT_MAX_DRAWDOWN_RATIO,
            signal_mode: SignalMode::SmoothedTrend,
            position_sizing: PositionSizing::Dynamic,
            missing_signal_policy: MissingSignalPolicy::TreatAsNoSignal,
        }
    }
}

impl BacktestConfig {
    /// Builds a configuration from string settings (usually the process environment).
    /// Absent keys keep their defaults; present keys must be valid.
    pub fn from_settings_map(settings: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();

        let initial_capital =
            optional_setting_f64(settings, "INITIAL_CAPITAL", Some(0.0), None)?
                .unwrap_or(defaults.initial_capital);
        let lot_size = optional_setting_u32(settings, "LOT_SIZE", 1)?.unwrap_or(defaults.lot_size);
        let commission = optional_setting_f64(settings, "COMMISSION_PER_TRADE", Some(0.0), None)?
            .unwrap_or(defaults.commission);
        let max_drawdown_ratio =
            optional_setting_f64(settings, "MAX_DRAWDOWN_RATIO", Some(0.0), Some(1.0))?
                .unwrap_or(defaults.max_drawdown_ratio);
        let signal_mode = optional_setting_enum(settings, "SIGNAL_MODE")?
            .unwrap_or(defaults.signal_mode);
        let position_sizing = optional_setting_enum(settings, "POSITION_SIZING")?
            .unwrap_or(defaults.position_sizing);
        let missing_signal_policy = optional_setting_enum(settings, "MISSING_SIGNAL_POLICY")?
            .unwrap_or(defaults.missing_signal_policy);

        let config = Self {
            initial_capital,
            lot_size,
            commission,
            max_drawdown_ratio,
            signal_mode,
            position_sizing,
            missing_signal_policy,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "initial capital must be positive (value: {})",
                self.initial_capital
            )));
        }
        if self.lot_size == 0 {
            return Err(EngineError::InvalidConfig(
                "lot size must be at least 1".to_string(),
            ));
        }
        if !self.commission.is_finite() || self.commission < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "commission must be >= 0 (value: {})",
                self.commission
            )));
        }
        if !(0.0..1.0).contains(&self.max_drawdown_ratio) {
            return Err(EngineError::InvalidConfig(format!(
                "max drawdown ratio must be in [0, 1) (value: {})",
                self.max_drawdown_ratio
            )));
        }
        Ok(())
    }

    /// Capital level below which an open position is force-closed.
    pub fn drawdown_floor(&self, peak_capital: f64) -> f64 {
        peak_capital * (1.0 - self.max_drawdown_ratio)
    }
}

fn optional_setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn optional_setting_f64(
    settings: &HashMap<String, String>,
    key: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<Option<f64>> {
    let Some(raw) = optional_setting(settings, key) else {
        return Ok(None);
    };
    let value = raw
        .parse::<f64>()
        .map_err(|_| anyhow!("Setting {} must be a number (value: {})", key, raw))?;
    if !value.is_finite() {
        return Err(anyhow!("Setting {} must be finite (value: {})", key, raw));
    }
    if let Some(min_value) = min {
        if value < min_value {
            return Err(anyhow!(
                "Setting {} must be >= {} (value: {})",
                key,
                min_value,
                raw
            ));
        }
    }
    if let Some(max_value) = max {
        if value > max_value {
            return Err(anyhow!(
                "Setting {} must be <= {} (value: {})",
                key,
                max_value,
                raw
            ));
        }
    }
    Ok(Some(value))
}

fn optional_setting_u32(
    settings: &HashMap<String, String>,
    key: &str,
    min: u32,
) -> Result<Option<u32>> {
    let Some(raw) = optional_setting(settings, key) else {
        return Ok(None);
    };
    let value = raw
        .parse::<u32>()
        .map_err(|_| anyhow!("Setting {} must be a whole number (value: {})", key, raw))?;
    if value < min {
        return Err(anyhow!(
            "Setting {} must be >= {} (value: {})",
            key,
            min,
            raw
        ));
    }
    Ok(Some(value))
}

fn optional_setting_enum<T: ValueEnum>(
    settings: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = optional_setting(settings, key) else {
        return Ok(None);
    };
    let normalized = raw.to_ascii_lowercase().replace('_', "-");
    T::from_str(&normalized, true)
        .map(Some)
        .map_err(|_| anyhow!("Setting {} has an unsupported value: {}", key, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_settings_fall_back_to_defaults() {
        let config = BacktestConfig::from_settings_map(&HashMap::new()).unwrap();
        assert_eq!(config, BacktestConfig::default());
    }

    #[test]
    fn reads_overrides_and_enum_values() {
        let config = BacktestConfig::from_settings_map(&settings(&[
            ("INITIAL_CAPITAL", "250000"),
            ("LOT_SIZE", "50"),
            ("COMMISSION_PER_TRADE", " 40 "),
            ("MAX_DRAWDOWN_RATIO", "0.1"),
            ("SIGNAL_MODE", "EXTERNAL_SIGNAL"),
            ("POSITION_SIZING", "fixed-one-lot"),
            ("MISSING_SIGNAL_POLICY", "reject"),
        ]))
        .unwrap();

        assert_eq!(config.initial_capital, 250_000.0);
        assert_eq!(config.lot_size, 50);
        assert_eq!(config.commission, 40.0);
        assert_eq!(config.max_drawdown_ratio, 0.1);
        assert_eq!(config.signal_mode, SignalMode::ExternalSignal);
        assert_eq!(config.position_sizing, PositionSizing::FixedOneLot);
        assert_eq!(config.missing_signal_policy, MissingSignalPolicy::Reject);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(BacktestConfig::from_settings_map(&settings(&[("LOT_SIZE", "0")])).is_err());
        assert!(
            BacktestConfig::from_settings_map(&settings(&[("MAX_DRAWDOWN_RATIO", "1.5")])).is_err()
        );
        assert!(
            BacktestConfig::from_settings_map(&settings(&[("MAX_DRAWDOWN_RATIO", "1")])).is_err()
        );
        assert!(BacktestConfig::from_settings_map(&settings(&[("INITIAL_CAPITAL", "0")])).is_err());
        assert!(BacktestConfig::from_settings_map(&settings(&[("SIGNAL_MODE", "rsi")])).is_err());
    }

    #[test]
    fn drawdown_floor_scales_peak() {
        let config = BacktestConfig::default();
        assert!((config.drawdown_floor(100_000.0) - 80_000.0).abs() < 1e-9);
    }
}
