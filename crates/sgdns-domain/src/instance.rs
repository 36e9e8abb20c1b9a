use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// NFKD-normalized lowercase form, used for case-insensitive comparisons.
pub fn case_fold(s: &str) -> String {
    s.nfkd().collect::<String>().to_lowercase()
}

// ── Instance ──────────────────────────────────────────────────────────────────

/// Addressing attributes of an instance, as reported by discovery.
/// Absent attributes are empty strings, matching what cloud APIs return for
/// e.g. an instance with no public address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    #[serde(default)]
    pub public_ip_v4: String,
    #[serde(default)]
    pub private_ip_v4: String,
    #[serde(default)]
    pub public_ip_v6: String,
    #[serde(default)]
    pub private_ip_v6: String,
    #[serde(default)]
    pub public_dns: String,
    #[serde(default)]
    pub private_dns: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceTag {
    pub key: String,
    pub value: String,
}

impl InstanceTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        InstanceTag { key: key.into(), value: value.into() }
    }
}

/// A compute instance as discovered in the target environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub instance_id: String,
    pub scaling_group_name: String,
    /// Machine state as reported by the platform (running, stopped, ..).
    #[serde(default)]
    pub instance_state: String,
    /// Membership state within the scaling group (Pending, InService, ..).
    #[serde(default)]
    pub lifecycle_state: String,
    /// Launch time, epoch seconds.
    #[serde(default)]
    pub launch_timestamp: i64,
    #[serde(default)]
    pub metadata: InstanceMetadata,
    #[serde(default)]
    pub tags: Vec<InstanceTag>,
}

impl Instance {
    /// Look up a tag value by key. Case-insensitive lookups fold both sides
    /// through NFKD before comparing.
    pub fn tag_value(&self, key: &str, case_sensitive: bool) -> Option<&str> {
        let folded = if case_sensitive { None } else { Some(case_fold(key)) };
        self.tags
            .iter()
            .find(|t| match &folded {
                None => t.key == key,
                Some(folded_key) => case_fold(&t.key) == *folded_key,
            })
            .map(|t| t.value.as_str())
    }

    pub fn has_tag(&self, key: &str, value: &str) -> bool {
        self.tags.iter().any(|t| t.key == key && t.value == value)
    }
}

// ── ScalingGroup ──────────────────────────────────────────────────────────────

/// A scaling group snapshot: its name and current member instances.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScalingGroup {
    pub name: String,
    pub instances: Vec<Instance>,
}
