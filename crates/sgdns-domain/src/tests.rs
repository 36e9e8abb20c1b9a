#[cfg(test)]
mod tests {
    use crate::event::{LifecycleEvent, LifecycleTransition};
    use crate::instance::{Instance, InstanceMetadata, InstanceTag};
    use crate::value_source::{IpVersion, ValueSource, Visibility};

    fn sample_instance() -> Instance {
        Instance {
            instance_id: "i-0abc".to_string(),
            scaling_group_name: "web".to_string(),
            instance_state: "running".to_string(),
            lifecycle_state: "InService".to_string(),
            launch_timestamp: 1_700_000_000,
            metadata: InstanceMetadata {
                public_ip_v4: "203.0.113.7".to_string(),
                private_ip_v4: "10.0.0.7".to_string(),
                public_ip_v6: String::new(),
                private_ip_v6: "fd00::7".to_string(),
                public_dns: "ec2-203-0-113-7.example.com".to_string(),
                private_dns: "ip-10-0-0-7.internal".to_string(),
            },
            tags: vec![
                InstanceTag::new("Name", "web-7"),
                InstanceTag::new("app:readiness:status", "ready"),
            ],
        }
    }

    #[test]
    fn launching_requires_instance_id() {
        let err = LifecycleEvent::new(LifecycleTransition::Launching, "web", "");
        assert!(err.is_err());
    }

    #[test]
    fn draining_requires_scaling_group() {
        let err = LifecycleEvent::new(LifecycleTransition::Draining, "", "i-1");
        assert!(err.is_err());
    }

    #[test]
    fn unrelated_needs_nothing() {
        let ev = LifecycleEvent::new(LifecycleTransition::Unrelated, "", "").unwrap();
        assert_eq!(ev.transition, LifecycleTransition::Unrelated);
    }

    #[test]
    fn reconciling_requires_group_only() {
        assert!(LifecycleEvent::new(LifecycleTransition::Reconciling, "web", "").is_ok());
        assert!(LifecycleEvent::new(LifecycleTransition::Reconciling, "", "").is_err());
    }

    #[test]
    fn parse_full_ip_form() {
        let vs = ValueSource::parse("ip:v6:private").unwrap();
        assert_eq!(
            vs,
            ValueSource::Ip { version: IpVersion::V6, visibility: Visibility::Private }
        );
    }

    #[test]
    fn parse_short_ip_form_defaults_to_v4() {
        let vs = ValueSource::parse("ip:private").unwrap();
        assert_eq!(
            vs,
            ValueSource::Ip { version: IpVersion::V4, visibility: Visibility::Private }
        );
    }

    #[test]
    fn parse_tag_forms() {
        assert_eq!(
            ValueSource::parse("tag:Name").unwrap(),
            ValueSource::Tag { key: "Name".to_string(), case_insensitive: false }
        );
        assert_eq!(
            ValueSource::parse("tag:Name:ci").unwrap(),
            ValueSource::Tag { key: "Name".to_string(), case_insensitive: true }
        );
    }

    #[test]
    fn parse_rejects_unknown_forms() {
        assert!(ValueSource::parse("").is_err());
        assert!(ValueSource::parse("ip").is_err());
        assert!(ValueSource::parse("ip:v5:private").is_err());
        assert!(ValueSource::parse("mac:address").is_err());
        assert!(ValueSource::parse("tag:").is_err());
        assert!(ValueSource::parse("ip:v4:private:extra").is_err());
    }

    #[test]
    fn display_round_trips_canonical_form() {
        for s in ["ip:v4:private", "ip:v6:public", "dns:public", "tag:Name", "tag:Name:ci"] {
            assert_eq!(ValueSource::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn resolve_private_ip() {
        let res = ValueSource::parse("ip:v4:private")
            .unwrap()
            .resolve(&sample_instance())
            .unwrap();
        assert_eq!(res.value, "10.0.0.7");
        assert_eq!(res.launch_timestamp, 1_700_000_000);
    }

    #[test]
    fn resolve_missing_attribute_is_an_error() {
        let err = ValueSource::parse("ip:v6:public")
            .unwrap()
            .resolve(&sample_instance());
        assert!(err.is_err());
    }

    #[test]
    fn tag_lookup_is_case_sensitive_by_default() {
        let instance = sample_instance();
        assert_eq!(instance.tag_value("Name", true), Some("web-7"));
        assert_eq!(instance.tag_value("name", true), None);
        assert_eq!(instance.tag_value("name", false), Some("web-7"));
    }

    #[test]
    fn ci_tag_lookup_folds_unicode() {
        let mut instance = sample_instance();
        instance.tags.push(InstanceTag::new("Ωmega", "unit"));
        // NFKD fold: Ω (U+2126 OHM SIGN) and ω compare equal case-insensitively
        let vs = ValueSource::Tag { key: "\u{2126}mega".to_string(), case_insensitive: true };
        assert_eq!(vs.resolve(&instance).unwrap().value, "unit");
    }
}
