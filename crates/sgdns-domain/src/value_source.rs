use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::instance::Instance;
use crate::result::MetadataResult;

// ── Value sources ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    V4,
    V6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// Which attribute of an instance to read, parsed from the compact
/// `type[:subtype][:attribute]` form used throughout configuration.
///
/// Recognized forms:
///   `ip:v4:public`, `ip:v4:private`, `ip:v6:public`, `ip:v6:private`,
///   `ip:public`, `ip:private` (v4 implied),
///   `dns:public`, `dns:private`,
///   `tag:<key>`, `tag:<key>:ci`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueSource {
    Ip { version: IpVersion, visibility: Visibility },
    Dns { visibility: Visibility },
    Tag { key: String, case_insensitive: bool },
}

impl ValueSource {
    pub fn parse(source: &str) -> Result<Self, DomainError> {
        let parts: Vec<&str> = source.split(':').collect();
        match parts.as_slice() {
            ["ip", attr] => Ok(ValueSource::Ip {
                version: IpVersion::V4,
                visibility: parse_visibility(source, attr)?,
            }),
            ["ip", sub, attr] => Ok(ValueSource::Ip {
                version: parse_ip_version(source, sub)?,
                visibility: parse_visibility(source, attr)?,
            }),
            ["dns", attr] => Ok(ValueSource::Dns { visibility: parse_visibility(source, attr)? }),
            ["tag", key] if !key.is_empty() => {
                Ok(ValueSource::Tag { key: (*key).to_string(), case_insensitive: false })
            }
            ["tag", key, "ci"] if !key.is_empty() => {
                Ok(ValueSource::Tag { key: (*key).to_string(), case_insensitive: true })
            }
            _ => Err(DomainError::value_source(source, "unrecognized form")),
        }
    }

    /// Read this source's attribute from a discovered instance.
    ///
    /// An attribute the instance genuinely lacks (e.g. no public address) is an
    /// error: a DNS record must never be planned around an empty value.
    pub fn resolve(&self, instance: &Instance) -> Result<MetadataResult, DomainError> {
        let value = match self {
            ValueSource::Ip { version: IpVersion::V4, visibility: Visibility::Public } => {
                instance.metadata.public_ip_v4.clone()
            }
            ValueSource::Ip { version: IpVersion::V4, visibility: Visibility::Private } => {
                instance.metadata.private_ip_v4.clone()
            }
            ValueSource::Ip { version: IpVersion::V6, visibility: Visibility::Public } => {
                instance.metadata.public_ip_v6.clone()
            }
            ValueSource::Ip { version: IpVersion::V6, visibility: Visibility::Private } => {
                instance.metadata.private_ip_v6.clone()
            }
            ValueSource::Dns { visibility: Visibility::Public } => {
                instance.metadata.public_dns.clone()
            }
            ValueSource::Dns { visibility: Visibility::Private } => {
                instance.metadata.private_dns.clone()
            }
            ValueSource::Tag { key, case_insensitive } => instance
                .tag_value(key, !case_insensitive)
                .unwrap_or_default()
                .to_string(),
        };
        if value.is_empty() {
            return Err(DomainError::UnresolvableValue {
                value_source: self.to_string(),
                instance_id: instance.instance_id.clone(),
            });
        }
        Ok(MetadataResult {
            instance_id: instance.instance_id.clone(),
            value,
            source: self.to_string(),
            launch_timestamp: instance.launch_timestamp,
        })
    }
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Ip { version, visibility } => {
                let v = match version {
                    IpVersion::V4 => "v4",
                    IpVersion::V6 => "v6",
                };
                write!(f, "ip:{}:{}", v, visibility_str(*visibility))
            }
            ValueSource::Dns { visibility } => write!(f, "dns:{}", visibility_str(*visibility)),
            ValueSource::Tag { key, case_insensitive } => {
                if *case_insensitive {
                    write!(f, "tag:{}:ci", key)
                } else {
                    write!(f, "tag:{}", key)
                }
            }
        }
    }
}

fn visibility_str(v: Visibility) -> &'static str {
    match v {
        Visibility::Public => "public",
        Visibility::Private => "private",
    }
}

fn parse_visibility(source: &str, attr: &str) -> Result<Visibility, DomainError> {
    match attr.to_ascii_lowercase().as_str() {
        "public" => Ok(Visibility::Public),
        "private" => Ok(Visibility::Private),
        other => Err(DomainError::value_source(
            source,
            format!("unknown attribute '{}'", other),
        )),
    }
}

fn parse_ip_version(source: &str, sub: &str) -> Result<IpVersion, DomainError> {
    match sub.to_ascii_lowercase().as_str() {
        "v4" => Ok(IpVersion::V4),
        "v6" => Ok(IpVersion::V6),
        other => Err(DomainError::value_source(
            source,
            format!("unknown ip sub-type '{}'", other),
        )),
    }
}
