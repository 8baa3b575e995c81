use crate::config::BacktestConfig;
use crate::kite::KiteClient;
use anyhow::Result;
use log::debug;
use std::collections::HashMap;

/// Settings shared by every command, collected once at startup.
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    settings: HashMap<String, String>,
}

impl AppContext {
    /// Reads settings from the process environment, after loading `.env` if one exists.
    pub fn initialize() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(err) => debug!("No .env file loaded: {}", err),
        }
        Self::with_settings(std::env::vars().collect())
    }

    pub fn with_settings(settings: HashMap<String, String>) -> Self {
        Self { settings }
    }

    pub fn backtest_config(&self) -> Result<BacktestConfig> {
        BacktestConfig::from_settings_map(&self.settings)
    }

    pub fn kite_client(&self) -> Result<KiteClient> {
        KiteClient::from_settings(&self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_collects_process_environment() {
        std::env::set_var("HA_ENGINE_CONTEXT_MARKER", "present");
        let app = AppContext::initialize();
        assert_eq!(
            app.settings.get("HA_ENGINE_CONTEXT_MARKER").map(String::as_str),
            Some("present")
        );
    }
}
