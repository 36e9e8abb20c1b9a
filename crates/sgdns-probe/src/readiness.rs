use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;
use tracing::debug;

use sgdns_config::ReadinessConfig;
use sgdns_domain::ReadinessResult;

use crate::discovery::InstanceDiscovery;
use crate::error::ProbeError;

/// One-shot readiness decision for an instance against a readiness
/// configuration.
#[async_trait]
pub trait ReadinessProbe: Send + Sync + 'static {
    async fn is_ready(
        &self,
        instance_id: &str,
        config: &ReadinessConfig,
    ) -> Result<ReadinessResult, ProbeError>;
}

/// Readiness by tag match: the instance is ready once it carries
/// `config.tag_key == config.tag_value`. A disabled configuration always
/// passes.
pub struct TagReadinessProbe {
    discovery: Arc<dyn InstanceDiscovery>,
}

impl TagReadinessProbe {
    pub fn new(discovery: Arc<dyn InstanceDiscovery>) -> Self {
        TagReadinessProbe { discovery }
    }
}

#[async_trait]
impl ReadinessProbe for TagReadinessProbe {
    async fn is_ready(
        &self,
        instance_id: &str,
        config: &ReadinessConfig,
    ) -> Result<ReadinessResult, ProbeError> {
        if !config.enabled {
            return Ok(ReadinessResult::passed(instance_id, config.hash()));
        }
        let instances = self
            .discovery
            .describe_instances(&[instance_id.to_string()])
            .await?;
        let ready = instances
            .first()
            .map(|i| i.has_tag(&config.tag_key, &config.tag_value))
            .unwrap_or(false);
        Ok(ReadinessResult {
            ready,
            instance_id: instance_id.to_string(),
            config_hash: config.hash(),
            time_taken_ms: 0,
            timestamp: Utc::now(),
        })
    }
}

/// Decorator that polls the underlying probe until it passes or the
/// configured deadline expires. The initial probe counts; the wait between
/// probes is `interval_secs`, the deadline `timeout_secs`, both on a
/// monotonic clock.
pub struct AwaitingReadinessProbe<P: ReadinessProbe> {
    inner: P,
}

impl<P: ReadinessProbe> AwaitingReadinessProbe<P> {
    pub fn new(inner: P) -> Self {
        AwaitingReadinessProbe { inner }
    }
}

#[async_trait]
impl<P: ReadinessProbe> ReadinessProbe for AwaitingReadinessProbe<P> {
    async fn is_ready(
        &self,
        instance_id: &str,
        config: &ReadinessConfig,
    ) -> Result<ReadinessResult, ProbeError> {
        let started = Instant::now();
        let timeout = Duration::from_secs(config.timeout_secs);
        let interval = Duration::from_secs(config.interval_secs);
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let mut result = self.inner.is_ready(instance_id, config).await?;
            result.time_taken_ms = started.elapsed().as_millis() as u64;
            if result.ready {
                debug!(instance_id, attempts, "instance ready");
                return Ok(result);
            }
            if started.elapsed() >= timeout {
                debug!(instance_id, attempts, "readiness deadline expired");
                return Ok(result);
            }
            debug!(
                instance_id,
                elapsed_s = started.elapsed().as_secs(),
                timeout_s = config.timeout_secs,
                "waiting for instance to become ready"
            );
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use sgdns_domain::Instance;

    use crate::discovery::InMemoryDiscovery;

    use super::*;

    fn config(enabled: bool, interval_secs: u64, timeout_secs: u64) -> ReadinessConfig {
        ReadinessConfig {
            enabled,
            tag_key: "app:readiness:status".to_string(),
            tag_value: "ready".to_string(),
            interval_secs,
            timeout_secs,
        }
    }

    async fn discovery_with(instance_id: &str) -> InMemoryDiscovery {
        let discovery = InMemoryDiscovery::new();
        discovery
            .upsert_instance(Instance {
                instance_id: instance_id.to_string(),
                scaling_group_name: "web".to_string(),
                ..Instance::default()
            })
            .await;
        discovery
    }

    #[tokio::test]
    async fn disabled_config_passes_without_discovery() {
        let probe = TagReadinessProbe::new(Arc::new(InMemoryDiscovery::new()));
        let result = probe.is_ready("i-1", &config(false, 1, 1)).await.unwrap();
        assert!(result.ready);
    }

    #[tokio::test]
    async fn matching_tag_passes() {
        let discovery = discovery_with("i-1").await;
        discovery.set_tag("i-1", "app:readiness:status", "ready").await;
        let probe = TagReadinessProbe::new(Arc::new(discovery));
        assert!(probe.is_ready("i-1", &config(true, 1, 1)).await.unwrap().ready);
    }

    #[tokio::test]
    async fn wrong_tag_value_fails() {
        let discovery = discovery_with("i-1").await;
        discovery.set_tag("i-1", "app:readiness:status", "booting").await;
        let probe = TagReadinessProbe::new(Arc::new(discovery));
        assert!(!probe.is_ready("i-1", &config(true, 1, 1)).await.unwrap().ready);
    }

    #[tokio::test]
    async fn unknown_instance_is_not_ready() {
        let probe = TagReadinessProbe::new(Arc::new(InMemoryDiscovery::new()));
        assert!(!probe.is_ready("i-ghost", &config(true, 1, 1)).await.unwrap().ready);
    }

    /// Inner probe that becomes ready after a fixed number of attempts.
    struct CountingProbe {
        calls: AtomicU32,
        ready_after: u32,
    }

    #[async_trait]
    impl ReadinessProbe for CountingProbe {
        async fn is_ready(
            &self,
            instance_id: &str,
            config: &ReadinessConfig,
        ) -> Result<ReadinessResult, ProbeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let mut result = ReadinessResult::passed(instance_id, config.hash());
            result.ready = call >= self.ready_after;
            Ok(result)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn awaiting_probe_polls_until_ready() {
        let probe = AwaitingReadinessProbe::new(CountingProbe {
            calls: AtomicU32::new(0),
            ready_after: 3,
        });
        let result = probe.is_ready("i-1", &config(true, 5, 60)).await.unwrap();
        assert!(result.ready);
        assert!(probe.inner.calls.load(Ordering::SeqCst) == 3);
    }

    #[tokio::test(start_paused = true)]
    async fn awaiting_probe_issues_enough_probes_before_giving_up() {
        let probe = AwaitingReadinessProbe::new(CountingProbe {
            calls: AtomicU32::new(0),
            ready_after: u32::MAX,
        });
        let result = probe.is_ready("i-1", &config(true, 5, 60)).await.unwrap();
        assert!(!result.ready);
        // deadline 60s at 5s intervals: at least ceil(60/5) = 12 probes
        assert!(probe.inner.calls.load(Ordering::SeqCst) >= 12);
    }
}
