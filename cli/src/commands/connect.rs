//! Connect command - bridge the broker ports and hold them open.

use anyhow::{Context as _, Result};
use brokerctl_core::{BrokerEndpoints, Establishment, TransportResult};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::{hold, print_json, Context};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectOutput<'a> {
    transport: &'a TransportResult,
    endpoints: &'a BrokerEndpoints,
    connection_type: &'static str,
}

pub async fn run(ctx: &Context, cancel: &CancellationToken) -> Result<()> {
    let spec = ctx.config.broker_spec();
    let (coordinator, mut failures) = ctx.coordinator();

    let result = match coordinator
        .establish(&spec, cancel)
        .await
        .with_context(|| format!("failed to connect to broker {}", spec.id()))?
    {
        Establishment::Ready(result) => result,
        Establishment::Cancelled => {
            eprintln!("Cancelled.");
            return Ok(());
        }
    };

    let endpoints = BrokerEndpoints::from_result(&result)
        .context("broker transport is missing one of its ports")?;

    if ctx.json {
        print_json(&ConnectOutput {
            transport: &result,
            endpoints: &endpoints,
            connection_type: ctx.config.connection_type.as_str(),
        })?;
    } else {
        print_transport(&result);
        println!();
        println!("gRPC:     {}", endpoints.grpc_address);
        println!("REST:     {}", endpoints.rest_uri);
        println!("API:      {}", endpoints.api_http_uri);
        println!("API (ws): {}", endpoints.api_ws_uri);
        println!();
        println!("Press Ctrl-C to disconnect.");
    }

    hold(cancel, &mut failures).await
}

/// Prints the bindings of an established transport as a table.
pub(crate) fn print_transport(result: &TransportResult) {
    match result.pod() {
        Some(pod) => println!("Connected to {} ({})", pod, result.name()),
        None => println!("Using direct ports ({})", result.name()),
    }
    println!();
    println!("{:<12} {:<8} REMOTE", "PORT", "LOCAL");
    println!("{}", "-".repeat(30));
    for binding in result.bindings() {
        println!("{:<12} {:<8} {}", binding.name, binding.local, binding.remote);
    }
}
