use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use base64::Engine;
use tracing::info;

use sgdns_api::{build_app, AppState};
use sgdns_config::{decode_config_items, EnvironmentConfig, SgConfigService};
use sgdns_dns::{ChangePlanner, DnsProvider, MockProvider, ProviderRegistry};
use sgdns_domain::{Instance, LifecycleEvent, LifecycleTransition};
use sgdns_pipeline::{BufferingMetricsSink, LifecyclePipeline};
use sgdns_probe::{
    AwaitingReadinessProbe, InMemoryDiscovery, NetworkHealthChecker, TagReadinessProbe,
};
use sgdns_store::{GcMarkerStore, InMemoryKvStore, KvLockStore, KvStore, RetryingLockStore};

use crate::cli::TransitionArg;
use crate::output;

struct Stack {
    pipeline: Arc<LifecyclePipeline>,
    config_service: Arc<SgConfigService>,
    kv: Arc<dyn KvStore>,
    provider: Arc<MockProvider>,
}

fn require_memory_provider(env: &EnvironmentConfig) -> Result<()> {
    if env.db.provider != "memory" {
        bail!(
            "db provider '{}' requires an external repository adapter; \
             this build links the in-memory repository only (db_provider=memory)",
            env.db.provider
        );
    }
    Ok(())
}

fn mock_provider_with_zones(zones: &[String]) -> Result<MockProvider> {
    let mut provider = MockProvider::new();
    for mapping in zones {
        let Some((zone_id, zone_name)) = mapping.split_once('=') else {
            bail!("invalid --zone mapping '{}', expected <zone_id>=<zone_name>", mapping);
        };
        provider = provider.with_zone(zone_id, zone_name);
    }
    Ok(provider)
}

/// Wire the pipeline over the adapters this build links.
///
/// Cloud repositories, discovery backends, and zone providers connect
/// through the ports; the binary itself ships the in-memory repository and
/// the mock zone provider, which is what `simulate` and local serving need.
fn build_stack_with(
    env: &EnvironmentConfig,
    kv: Arc<InMemoryKvStore>,
    discovery: Arc<InMemoryDiscovery>,
    provider: Arc<MockProvider>,
) -> Result<Stack> {
    let config_service = Arc::new(SgConfigService::new(kv.clone(), &env.db));
    let mut registry = ProviderRegistry::new();
    registry.register(provider.clone());
    let registry = Arc::new(registry);
    let planner = Arc::new(ChangePlanner::new(
        registry.clone(),
        GcMarkerStore::new(kv.clone()),
    ));
    let lock = Arc::new(RetryingLockStore::new(KvLockStore::new(kv.clone())));
    let pipeline = Arc::new(LifecyclePipeline::new(
        config_service.clone(),
        discovery.clone(),
        Arc::new(AwaitingReadinessProbe::new(TagReadinessProbe::new(discovery.clone()))),
        Arc::new(NetworkHealthChecker::new()),
        planner,
        registry,
        lock,
        Arc::new(BufferingMetricsSink::new()),
        env,
    ));
    Ok(Stack { pipeline, config_service, kv, provider })
}

// ── serve ─────────────────────────────────────────────────────────────────────

pub async fn serve(
    bind: String,
    port: u16,
    token: Option<String>,
    config: Option<PathBuf>,
    zones: Vec<String>,
) -> Result<()> {
    let mut env = EnvironmentConfig::from_env()?;
    require_memory_provider(&env)?;
    if env.db.iac_config_item_key_id.is_empty() {
        env.db.iac_config_item_key_id = "sgdns-config-iac".to_string();
    }

    let kv = Arc::new(InMemoryKvStore::new());
    match config {
        Some(file) => {
            let payload = read_config_payload(&file)?;
            kv.seed(
                env.db.iac_config_item_key_id.clone(),
                serde_json::json!({ "config": payload }),
            )
            .await;
        }
        None => bail!("--config is required when serving over the in-memory repository"),
    }

    let provider = Arc::new(mock_provider_with_zones(&zones)?);
    let stack = build_stack_with(&env, kv, Arc::new(InMemoryDiscovery::new()), provider)?;

    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => {
            let t = uuid::Uuid::new_v4().simple().to_string();
            println!("Generated bearer token: {}", t);
            t
        }
    };

    let state = AppState {
        pipeline: stack.pipeline,
        config_service: stack.config_service,
        kv: stack.kv,
        auth_token: Arc::new(token),
        reconcile_max_concurrency: env.reconciliation.max_concurrency,
    };
    let app = build_app(state);

    let addr = format!("{}:{}", bind, port);
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

// ── reconcile ─────────────────────────────────────────────────────────────────

pub async fn reconcile(
    remote: String,
    token: Option<String>,
    scaling_group: Option<String>,
) -> Result<()> {
    let url = format!("{}/reconcile", remote.trim_end_matches('/'));
    let mut request = reqwest::Client::new()
        .post(&url)
        .json(&serde_json::json!({ "scaling_group_name": scaling_group }));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.with_context(|| format!("request to {} failed", url))?;
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or_default();
    if !status.is_success() {
        bail!("reconcile failed ({}): {}", status, body);
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

// ── validate-config ───────────────────────────────────────────────────────────

pub fn validate_config(file: PathBuf) -> Result<()> {
    let payload = read_config_payload(&file)?;
    let items = decode_config_items(&file.display().to_string(), &payload)?;
    print!("{}", output::render_configs(&items));
    Ok(())
}

/// Accept either the at-rest base64 form or plain JSON.
fn read_config_payload(file: &PathBuf) -> Result<String> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let trimmed = content.trim();
    if trimmed.starts_with('[') {
        Ok(base64::engine::general_purpose::STANDARD.encode(trimmed))
    } else {
        Ok(trimmed.to_string())
    }
}

// ── simulate ──────────────────────────────────────────────────────────────────

pub async fn simulate(
    config: PathBuf,
    instances: PathBuf,
    zones: Vec<String>,
    transition: TransitionArg,
    scaling_group: String,
    instance_id: String,
) -> Result<()> {
    let mut env = EnvironmentConfig::from_env()?;
    env.db.provider = "memory".to_string();
    env.db.iac_config_item_key_id = "simulated-config".to_string();
    env.db.external_config_item_key_id = String::new();
    env.readiness_defaults.enabled = false;

    let provider = Arc::new(mock_provider_with_zones(&zones)?);

    let kv = Arc::new(InMemoryKvStore::new());
    let payload = read_config_payload(&config)?;
    kv.seed(
        "simulated-config",
        serde_json::json!({ "config": payload }),
    )
    .await;

    let discovery = Arc::new(InMemoryDiscovery::new());
    let fixtures = std::fs::read_to_string(&instances)
        .with_context(|| format!("failed to read {}", instances.display()))?;
    let fixtures: Vec<Instance> =
        serde_json::from_str(&fixtures).context("instance fixtures are not a JSON list")?;
    for instance in fixtures {
        discovery.upsert_instance(instance).await;
    }

    let stack = build_stack_with(&env, kv, discovery, provider)?;

    let transition = match transition {
        TransitionArg::Launching => LifecycleTransition::Launching,
        TransitionArg::Draining => LifecycleTransition::Draining,
        TransitionArg::Reconciling => LifecycleTransition::Reconciling,
    };
    let event = LifecycleEvent::new(transition, scaling_group, instance_id)?;
    let outcome = stack.pipeline.handle(event).await;
    print!("{}", output::render_outcome(&outcome));

    // show where each configured record ended up
    let configs = stack.config_service.get_configs().await?;
    for item in &configs.items {
        let name = stack
            .provider
            .normalize_name(&item.dns_config.record_name, &item.dns_config.zone_id)
            .await?;
        let values = stack
            .provider
            .record_values(&item.dns_config.zone_id, &name, item.dns_config.record_type)
            .await;
        println!(
            "{} {} -> {}",
            name,
            item.dns_config.record_type,
            match values {
                Some(values) => values.join(", "),
                None => "(absent)".to_string(),
            }
        );
    }
    if !outcome.handled {
        bail!("simulation failed: {}", outcome.message);
    }
    Ok(())
}
