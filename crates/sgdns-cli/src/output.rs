use sgdns_config::ScalingGroupConfig;
use sgdns_pipeline::LifecycleOutcome;

/// Render one pipeline outcome as human-readable text.
pub fn render_outcome(outcome: &LifecycleOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {}\n",
        if outcome.handled { "ok:" } else { "failed:" },
        outcome.message
    ));
    for change in &outcome.changes {
        out.push_str(&format!("  ~ {}\n", change));
    }
    for error in &outcome.plan_errors {
        out.push_str(&format!("  ! {}\n", error));
    }
    out
}

/// Render a validated configuration list.
pub fn render_configs(items: &[ScalingGroupConfig]) -> String {
    let mut out = format!("{} configuration item(s) valid\n", items.len());
    for item in items {
        out.push_str(&format!(
            "  {} [{} {} mode={} empty={}]\n",
            item,
            item.dns_config.provider,
            item.dns_config.record_type,
            item.dns_config.mode,
            item.dns_config.empty_mode,
        ));
    }
    out
}
