pub mod api;
pub mod cli;
pub mod converter;
pub mod core;
pub mod providers;
pub mod resolver;
pub mod store;

#[cfg(test)]
mod testing;

use crate::converter::CurrencyConverter;
use crate::core::cache::RateStore;
use crate::core::config::AppConfig;
use crate::providers::ExchangeRateApiProvider;
use crate::resolver::RateResolver;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub enum AppCommand {
    /// Run the HTTP API until a shutdown signal.
    Serve,
    /// Convert once into each target and print a table.
    Convert {
        from: String,
        targets: Vec<String>,
        amount: f64,
    },
}

/// Wires the configured store and the exchange rate API into a converter.
pub async fn build_service(
    config: &AppConfig,
) -> Result<(Arc<CurrencyConverter>, Arc<dyn RateStore>)> {
    let store = store::connect(&config.cache).await;

    if config.api.api_key.is_empty() {
        warn!("No API key configured (CURRENCY_KEY_API); origin requests will be rejected");
    }
    let provider = ExchangeRateApiProvider::from_config(&config.api)?;

    let resolver = RateResolver::new(Arc::clone(&store), Arc::new(provider));
    Ok((Arc::new(CurrencyConverter::new(resolver)), store))
}

pub async fn run_command(command: AppCommand, config: &AppConfig) -> Result<()> {
    debug!("Loaded config: {config:#?}");
    let (service, store) = build_service(config).await?;

    let result = match command {
        AppCommand::Serve => {
            info!(
                version = env!("CARGO_PKG_VERSION"),
                cache = store.name(),
                "Currency converter starting"
            );
            let state = api::AppState::new(
                service.clone(),
                store,
                config.server.request_timeout(),
            );
            api::serve(&config.server, state).await
        }
        AppCommand::Convert {
            from,
            targets,
            amount,
        } => {
            cli::convert::run(
                service.as_ref(),
                &from,
                &targets,
                amount,
                config.server.request_timeout(),
            )
            .await
        }
    };

    service.resolver().flush_writes().await;
    result
}
