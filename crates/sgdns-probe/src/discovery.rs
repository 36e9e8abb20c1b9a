use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use sgdns_domain::{Instance, InstanceTag, ScalingGroup};

use crate::error::ProbeError;

/// Looks up instances and scaling-group membership in the target environment.
#[async_trait]
pub trait InstanceDiscovery: Send + Sync + 'static {
    /// Describe the given instances. Unknown ids are simply absent from the
    /// result; callers decide whether that is fatal.
    async fn describe_instances(&self, instance_ids: &[String])
        -> Result<Vec<Instance>, ProbeError>;

    /// Describe scaling groups with their current member instances.
    async fn describe_scaling_groups(
        &self,
        names: &[String],
    ) -> Result<Vec<ScalingGroup>, ProbeError>;
}

/// In-memory implementation of [`InstanceDiscovery`].
///
/// Instances are mutable after registration (tags in particular), so
/// readiness polling can observe an instance converging.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDiscovery {
    inner: Arc<RwLock<HashMap<String, Instance>>>,
}

impl InMemoryDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_instance(&self, instance: Instance) {
        self.inner
            .write()
            .await
            .insert(instance.instance_id.clone(), instance);
    }

    pub async fn remove_instance(&self, instance_id: &str) {
        self.inner.write().await.remove(instance_id);
    }

    /// Set (or replace) one tag on a registered instance.
    pub async fn set_tag(&self, instance_id: &str, key: &str, value: &str) {
        let mut guard = self.inner.write().await;
        if let Some(instance) = guard.get_mut(instance_id) {
            if let Some(tag) = instance.tags.iter_mut().find(|t| t.key == key) {
                tag.value = value.to_string();
            } else {
                instance.tags.push(InstanceTag::new(key, value));
            }
        }
    }
}

#[async_trait]
impl InstanceDiscovery for InMemoryDiscovery {
    async fn describe_instances(
        &self,
        instance_ids: &[String],
    ) -> Result<Vec<Instance>, ProbeError> {
        let guard = self.inner.read().await;
        Ok(instance_ids
            .iter()
            .filter_map(|id| guard.get(id).cloned())
            .collect())
    }

    async fn describe_scaling_groups(
        &self,
        names: &[String],
    ) -> Result<Vec<ScalingGroup>, ProbeError> {
        let guard = self.inner.read().await;
        Ok(names
            .iter()
            .map(|name| ScalingGroup {
                name: name.clone(),
                instances: guard
                    .values()
                    .filter(|i| i.scaling_group_name == *name)
                    .cloned()
                    .collect(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: &str, sg: &str) -> Instance {
        Instance {
            instance_id: id.to_string(),
            scaling_group_name: sg.to_string(),
            ..Instance::default()
        }
    }

    #[tokio::test]
    async fn unknown_ids_are_absent_from_results() {
        let discovery = InMemoryDiscovery::new();
        discovery.upsert_instance(instance("i-1", "web")).await;
        let found = discovery
            .describe_instances(&["i-1".to_string(), "i-missing".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].instance_id, "i-1");
    }

    #[tokio::test]
    async fn scaling_groups_collect_their_members() {
        let discovery = InMemoryDiscovery::new();
        discovery.upsert_instance(instance("i-1", "web")).await;
        discovery.upsert_instance(instance("i-2", "web")).await;
        discovery.upsert_instance(instance("i-3", "workers")).await;
        let groups = discovery
            .describe_scaling_groups(&["web".to_string()])
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].instances.len(), 2);
    }

    #[tokio::test]
    async fn set_tag_replaces_existing_value() {
        let discovery = InMemoryDiscovery::new();
        discovery.upsert_instance(instance("i-1", "web")).await;
        discovery.set_tag("i-1", "status", "booting").await;
        discovery.set_tag("i-1", "status", "ready").await;
        let found = discovery.describe_instances(&["i-1".to_string()]).await.unwrap();
        assert_eq!(found[0].tag_value("status", true), Some("ready"));
    }
}
