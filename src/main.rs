// SPDX-License-Identifier: GPL-3.0-only
//! ddcci-detect: list the displays reachable over DDC/CI

use std::io::{self, Write};

use anyhow::Context;
use ddcci_control::settings::{self, OutputLevel};
use ddcci_control::{Config, DisplayRegistry};

#[macro_use]
extern crate tracing;

fn setup_logs() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = fmt::layer().with_target(false).with_writer(io::stderr);
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new(format!(
        "warn,{}=warn",
        env!("CARGO_CRATE_NAME")
    )));

    if let Ok(journal_layer) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(journal_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    }
}

/// Capabilities of every working display, for verbose output
fn report_capabilities(registry: &DisplayRegistry, w: &mut dyn Write) -> anyhow::Result<()> {
    for dref in registry.display_refs(false)? {
        let mut handle = match dref.open() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot open {}: {}", dref.location(), e);
                continue;
            }
        };
        writeln!(w, "Capabilities of {}:", dref.location())?;
        match handle.get_capabilities() {
            Ok(caps) => caps.report(w, 1)?,
            Err(e) => writeln!(w, "   {}", e)?,
        }
        handle.close()?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    setup_logs();

    let config = Config::load().context("failed to load config")?;
    config.apply().context("invalid config")?;

    let registry = DisplayRegistry::global();
    let count = registry.detect_system().context("display detection failed")?;
    info!("{} display(s) with working DDC/CI", count);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let reported = registry
        .report_active_displays(&mut out, true, 0)
        .context("failed to write report")?;
    if reported == 0 {
        writeln!(out, "No displays found")?;
    }
    if settings::output_level() >= OutputLevel::Verbose {
        report_capabilities(&registry, &mut out)?;
    }
    Ok(())
}
