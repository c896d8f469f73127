use crate::core::{Conversion, ConversionError, ConversionService, RequestContext};
use crate::resolver::RateResolver;
use async_trait::async_trait;
use tracing::info;

/// Converts amounts at the rate chosen by a [`RateResolver`].
pub struct CurrencyConverter {
    resolver: RateResolver,
}

impl CurrencyConverter {
    pub fn new(resolver: RateResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &RateResolver {
        &self.resolver
    }
}

#[async_trait]
impl ConversionService for CurrencyConverter {
    async fn convert(
        &self,
        ctx: &RequestContext,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<Conversion, ConversionError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ConversionError::InvalidAmount(amount));
        }

        let rate = self.resolver.resolve_rate(ctx, from, to).await?;
        let result = amount * rate;

        info!(from, to, amount, rate, result, "Currency conversion completed");

        Ok(Conversion {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            rate,
            result,
        })
    }

    async fn resolve_rate(
        &self,
        ctx: &RequestContext,
        from: &str,
        to: &str,
    ) -> Result<f64, ConversionError> {
        self.resolver.resolve_rate(ctx, from, to).await
    }
}
