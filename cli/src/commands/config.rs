//! Config command - show and edit `~/.brokerctl/config.json`.

use anyhow::{Context as _, Result};

use super::{print_json, Context};

pub fn show(ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    if ctx.json {
        return print_json(config);
    }

    println!("Configuration ({})", ctx.store.config_path().display());
    println!();
    println!("Auto integrated:   {}", config.auto_integrated);
    println!(
        "Kubeconfig:        {}",
        config
            .kube_config_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(default)".to_string())
    );
    println!(
        "Context:           {}",
        config.kube_context.as_deref().unwrap_or("(current)")
    );
    println!("Namespace:         {}", config.namespace);
    println!("Workload:          {}", config.workload);
    println!("gRPC port:         {}", config.grpc_port);
    println!("REST port:         {}", config.rest_port);
    println!("API port:          {}", config.api_port);
    println!("Connection type:   {}", config.connection_type.as_str());
    println!(
        "Startup timeout:   {}s",
        config.transport.startup_timeout.as_secs()
    );
    println!("Max ordinals:      {}", config.transport.max_ordinals);
    Ok(())
}

pub async fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    ctx.store
        .update(key, value)
        .await
        .with_context(|| format!("failed to set {}", key))?;
    println!("Set {} = {}", key, value);
    Ok(())
}

pub fn path(ctx: &Context) {
    println!("{}", ctx.store.config_path().display());
}
