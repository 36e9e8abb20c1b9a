use serde::{Deserialize, Serialize};
use serde_json::Value;

use sgdns_config::DnsRecordType;

use crate::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DnsChangeRequestAction {
    Create,
    Update,
    Delete,
    /// Sentinel for "nothing to do"; the applier skips these.
    Ignore,
}

impl std::fmt::Display for DnsChangeRequestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DnsChangeRequestAction::Create => "CREATE",
            DnsChangeRequestAction::Update => "UPDATE",
            DnsChangeRequestAction::Delete => "DELETE",
            DnsChangeRequestAction::Ignore => "IGNORE",
        };
        write!(f, "{}", s)
    }
}

/// A planned mutation of one record, ready for a provider to serialize and
/// apply. Equality is by canonical string form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsChangeRequest {
    pub action: DnsChangeRequestAction,
    pub zone_id: String,
    pub record_name: String,
    pub record_type: DnsRecordType,
    pub ttl: u32,
    pub srv_priority: u16,
    pub srv_weight: u16,
    pub srv_port: u16,
    /// Record values, ordered. For DELETE these are the values being removed,
    /// which some providers require to target the deletion.
    pub values: Vec<String>,
}

impl DnsChangeRequest {
    pub fn ignore() -> Self {
        DnsChangeRequest {
            action: DnsChangeRequestAction::Ignore,
            zone_id: String::new(),
            record_name: String::new(),
            record_type: DnsRecordType::A,
            ttl: 0,
            srv_priority: 0,
            srv_weight: 0,
            srv_port: 0,
            values: Vec::new(),
        }
    }

    pub fn is_ignore(&self) -> bool {
        self.action == DnsChangeRequestAction::Ignore
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.action == DnsChangeRequestAction::Ignore {
            return Ok(());
        }
        if self.record_name.is_empty() {
            return Err(ProviderError::InvalidRequest(format!(
                "record name is required for {} request",
                self.action
            )));
        }
        if self.zone_id.is_empty() {
            return Err(ProviderError::InvalidRequest(format!(
                "zone id is required for {} request",
                self.action
            )));
        }
        Ok(())
    }

    pub fn canonical(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.record_name,
            self.record_type,
            self.action,
            self.values.join(", ")
        )
    }
}

impl PartialEq for DnsChangeRequest {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for DnsChangeRequest {}

impl std::fmt::Display for DnsChangeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Provider acknowledgement of an applied change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsChangeResponse {
    pub success: bool,
    pub message: Option<String>,
    pub metadata: Option<Value>,
}

impl DnsChangeResponse {
    pub fn ok() -> Self {
        DnsChangeResponse { success: true, message: None, metadata: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        DnsChangeResponse { success: false, message: Some(message.into()), metadata: None }
    }
}

/// Provider-neutral view of an existing record, as read back for planning.
/// Values are decoded to their plain form (TXT unquoted, SRV reduced to the
/// target) so they compare against instance-resolved values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecordSet {
    pub name: String,
    pub record_type: DnsRecordType,
    pub ttl: u32,
    pub values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_canonical() {
        let mut a = DnsChangeRequest::ignore();
        a.action = DnsChangeRequestAction::Update;
        a.zone_id = "Z1".to_string();
        a.record_name = "svc.example.com".to_string();
        a.values = vec!["10.0.0.1".to_string()];

        let mut b = a.clone();
        b.ttl = 999; // ttl does not participate in identity
        assert_eq!(a, b);

        b.values = vec!["10.0.0.2".to_string()];
        assert_ne!(a, b);
    }

    #[test]
    fn non_ignore_requires_name_and_zone() {
        let mut req = DnsChangeRequest::ignore();
        assert!(req.validate().is_ok());
        req.action = DnsChangeRequestAction::Update;
        assert!(req.validate().is_err());
        req.record_name = "svc".to_string();
        assert!(req.validate().is_err());
        req.zone_id = "Z1".to_string();
        assert!(req.validate().is_ok());
    }
}
