//! Dashboard command - bridge the metrics UI and time-series DB.

use anyhow::{Context as _, Result};
use brokerctl_core::Establishment;
use tokio_util::sync::CancellationToken;

use super::connect::print_transport;
use super::{hold, print_json, Context};

pub async fn run(ctx: &Context, name: &str, cancel: &CancellationToken) -> Result<()> {
    let spec = ctx.config.dashboard_spec(&ctx.config.namespace, name);
    let (coordinator, mut failures) = ctx.coordinator();

    let result = match coordinator
        .establish(&spec, cancel)
        .await
        .with_context(|| format!("failed to connect to dashboard {}", spec.id()))?
    {
        Establishment::Ready(result) => result,
        Establishment::Cancelled => {
            eprintln!("Cancelled.");
            return Ok(());
        }
    };

    if ctx.json {
        print_json(&result)?;
    } else {
        print_transport(&result);
        println!();
        if let Some(port) = result.local_port("metrics-ui") {
            println!("Dashboard: http://localhost:{}", port);
        }
        if let Some(port) = result.local_port("tsdb") {
            println!("Metrics:   http://localhost:{}", port);
        }
        println!();
        println!("Press Ctrl-C to disconnect.");
    }

    hold(cancel, &mut failures).await
}
