//! Pods command - list broker replicas and their eligibility.

use anyhow::{Context as _, Result};
use brokerctl_core::transport::PodSelector;
use brokerctl_core::{ClusterHandle, PodPhase};
use serde::Serialize;

use super::{print_json, Context};

#[derive(Serialize)]
struct PodRow {
    namespace: String,
    name: String,
    phase: PodPhase,
    eligible: bool,
}

pub async fn run(ctx: &Context) -> Result<()> {
    let cluster = ctx.cluster()?;
    let namespace = &ctx.config.namespace;
    let workload = &ctx.config.workload;

    let pods = cluster
        .list_pods(namespace, workload)
        .await
        .with_context(|| format!("failed to list pods in {}", namespace))?;

    let replicas = PodSelector::new(ctx.config.transport.max_ordinals).candidate_names(workload);
    let rows: Vec<PodRow> = pods
        .into_iter()
        .map(|pod| PodRow {
            eligible: pod.is_running() && replicas.contains(&pod.name),
            namespace: pod.namespace,
            name: pod.name,
            phase: pod.phase,
        })
        .collect();

    if ctx.json {
        return print_json(&rows);
    }

    if rows.is_empty() {
        println!("No pods found for {}/{}.", namespace, workload);
        return Ok(());
    }

    println!("{:<32} {:<10} ELIGIBLE", "NAME", "PHASE");
    println!("{}", "-".repeat(52));
    for row in &rows {
        println!(
            "{:<32} {:<10} {}",
            truncate(&row.name, 32),
            row.phase,
            if row.eligible { "yes" } else { "no" }
        );
    }

    let eligible = rows.iter().filter(|r| r.eligible).count();
    println!("\nTotal: {} pods, {} eligible", rows.len(), eligible);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 1).collect();
        format!("{}…", head)
    }
}
