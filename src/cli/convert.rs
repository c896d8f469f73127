use super::ui;
use crate::core::{Conversion, ConversionError, ConversionService, RequestContext};
use anyhow::Result;
use comfy_table::Cell;
use futures::future::join_all;
use std::time::Duration;
use tracing::warn;

/// Outcome of converting one amount into several target currencies.
pub struct ConversionReport {
    pub from: String,
    pub amount: f64,
    pub rows: Vec<(String, Result<Conversion, ConversionError>)>,
}

impl ConversionReport {
    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell("Rate"),
            ui::header_cell("Amount"),
            ui::header_cell("Note"),
        ]);

        for (target, outcome) in &self.rows {
            match outcome {
                Ok(conversion) => table.add_row(vec![
                    Cell::new(&conversion.to),
                    ui::number_cell(conversion.rate, 6),
                    ui::total_cell(conversion.result),
                    Cell::new(""),
                ]),
                Err(e) => table.add_row(vec![
                    Cell::new(target),
                    ui::na_cell(true),
                    ui::na_cell(true),
                    Cell::new(ui::style_text(&failure_note(e), ui::StyleType::Error)),
                ]),
            };
        }

        let mut output = format!(
            "Converting {} {}\n\n",
            self.amount,
            ui::style_text(&self.from, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(
                &format!("{}/{} succeeded", self.succeeded(), self.rows.len()),
                ui::StyleType::Subtle
            )
        ));
        output
    }
}

// Upstream detail is only logged.
fn failure_note(err: &ConversionError) -> String {
    if err.is_validation() {
        err.to_string()
    } else {
        "rate unavailable".to_string()
    }
}

/// Converts `amount` of `from` into every target concurrently.
pub async fn convert_all(
    service: &dyn ConversionService,
    ctx: &RequestContext,
    from: &str,
    targets: &[String],
    amount: f64,
) -> ConversionReport {
    let futures = targets.iter().map(|to| async move {
        let outcome = service.convert(ctx, from, to, amount).await;
        if let Err(e) = &outcome {
            warn!(from, to = %to, error = %e, "Conversion failed");
        }
        (to.clone(), outcome)
    });

    ConversionReport {
        from: from.to_string(),
        amount,
        rows: join_all(futures).await,
    }
}

pub async fn run(
    service: &dyn ConversionService,
    from: &str,
    targets: &[String],
    amount: f64,
    timeout: Duration,
) -> Result<()> {
    let ctx = RequestContext::with_timeout(timeout);
    let report = convert_all(service, &ctx, from, targets, amount).await;

    println!("{}", report.display_as_table());

    if report.succeeded() == 0 {
        anyhow::bail!("No conversion succeeded for {from}");
    }
    Ok(())
}
