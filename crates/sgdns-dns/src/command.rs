use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use sgdns_config::{DnsRecordConfig, RecordMappingMode};

/// What the lifecycle transition means for the record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DnsChangeAction {
    /// Add the given values (instance launching).
    Append,
    /// Remove the given values (instance draining).
    Remove,
    /// Make the record equal to the given values (reconciliation).
    Replace,
}

impl std::fmt::Display for DnsChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DnsChangeAction::Append => write!(f, "APPEND"),
            DnsChangeAction::Remove => write!(f, "REMOVE"),
            DnsChangeAction::Replace => write!(f, "REPLACE"),
        }
    }
}

/// One resolved record value, tagged with the instance it came from so the
/// SINGLE_LATEST mapping can pick the freshest one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsValue {
    pub value: String,
    /// Launch time of the owning instance, epoch seconds.
    pub launch_timestamp: i64,
    pub instance_id: String,
}

/// Provider-neutral instruction to mutate one record.
#[derive(Debug, Clone)]
pub struct DnsChangeCommand {
    pub action: DnsChangeAction,
    pub dns_config: DnsRecordConfig,
    pub values: Vec<DnsValue>,
}

impl DnsChangeCommand {
    pub fn new(action: DnsChangeAction, dns_config: DnsRecordConfig, values: Vec<DnsValue>) -> Self {
        DnsChangeCommand { action, dns_config, values }
    }

    /// The record values this command stands for, per the mapping mode:
    /// MULTIVALUE takes the sorted set of all provided values; SINGLE_LATEST
    /// takes the one value from the most recently launched instance, ties
    /// broken by the lexicographically greatest instance id.
    pub fn command_values(&self) -> Vec<String> {
        match self.dns_config.mode {
            RecordMappingMode::Multivalue => {
                let set: BTreeSet<&str> = self.values.iter().map(|v| v.value.as_str()).collect();
                set.into_iter().map(str::to_string).collect()
            }
            RecordMappingMode::SingleLatest => self
                .values
                .iter()
                .max_by(|a, b| {
                    a.launch_timestamp
                        .cmp(&b.launch_timestamp)
                        .then_with(|| a.instance_id.cmp(&b.instance_id))
                })
                .map(|latest| vec![latest.value.clone()])
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use sgdns_config::{DnsProviderKind, DnsRecordType, EmptyRecordMode};

    use super::*;

    fn config(mode: RecordMappingMode) -> DnsRecordConfig {
        DnsRecordConfig {
            provider: DnsProviderKind::Mock,
            zone_id: "Z1".to_string(),
            record_name: "svc".to_string(),
            record_type: DnsRecordType::A,
            record_ttl: 60,
            mode,
            empty_mode: EmptyRecordMode::Keep,
            empty_mode_value: String::new(),
            value_source: "ip:v4:private".to_string(),
            srv_priority: 0,
            srv_weight: 0,
            srv_port: 0,
        }
    }

    fn value(v: &str, launch: i64, id: &str) -> DnsValue {
        DnsValue { value: v.to_string(), launch_timestamp: launch, instance_id: id.to_string() }
    }

    #[test]
    fn multivalue_sorts_and_dedups() {
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Append,
            config(RecordMappingMode::Multivalue),
            vec![value("10.0.0.2", 1, "i-a"), value("10.0.0.1", 2, "i-b"), value("10.0.0.2", 3, "i-c")],
        );
        assert_eq!(cmd.command_values(), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn single_latest_picks_greatest_launch_time() {
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Replace,
            config(RecordMappingMode::SingleLatest),
            vec![value("10.0.0.1", 100, "i-a"), value("10.0.0.2", 200, "i-b")],
        );
        assert_eq!(cmd.command_values(), vec!["10.0.0.2"]);
    }

    #[test]
    fn single_latest_ties_break_by_greatest_instance_id() {
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Replace,
            config(RecordMappingMode::SingleLatest),
            vec![value("value-of-a", 100, "i-a"), value("value-of-b", 100, "i-b")],
        );
        assert_eq!(cmd.command_values(), vec!["value-of-b"]);
    }

    #[test]
    fn single_latest_with_no_values_is_empty() {
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Replace,
            config(RecordMappingMode::SingleLatest),
            vec![],
        );
        assert!(cmd.command_values().is_empty());
    }
}
