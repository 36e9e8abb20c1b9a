use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer_token;
use crate::handlers;
use crate::state::AppState;

pub fn build_app(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        // Lifecycle events
        .route("/events", post(handlers::post_event))
        // Reconciliation sweep
        .route("/reconcile", post(handlers::post_reconcile))
        // Auth middleware applies to all routes above
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use base64::Engine;
    use serde_json::json;
    use tower::util::ServiceExt;

    use sgdns_config::{
        BrokerConfig, DbConfig, EnvironmentConfig, MetricsConfig, ReadinessConfig,
        ReconciliationConfig, SgConfigService,
    };
    use sgdns_dns::{ChangePlanner, MockProvider, ProviderRegistry};
    use sgdns_pipeline::{BufferingMetricsSink, LifecyclePipeline};
    use sgdns_probe::{
        AwaitingReadinessProbe, InMemoryDiscovery, NetworkHealthChecker, TagReadinessProbe,
    };
    use sgdns_store::{GcMarkerStore, InMemoryKvStore, KvLockStore, RetryingLockStore};

    use super::*;

    const TOKEN: &str = "test-token";
    const IAC_KEY: &str = "sgdns-config-iac";

    async fn test_state() -> (AppState, Arc<InMemoryDiscovery>, Arc<MockProvider>) {
        let kv = Arc::new(InMemoryKvStore::new());
        let items = json!([{
            "scaling_group_name": "web",
            "dns_config": {
                "provider": "mock",
                "dns_zone_id": "Z1",
                "record_name": "svc",
                "value_source": "ip:v4:private"
            }
        }]);
        let payload = base64::engine::general_purpose::STANDARD.encode(items.to_string());
        kv.seed(IAC_KEY, json!({ "config": payload })).await;

        let env = EnvironmentConfig {
            cloud_provider: "aws".to_string(),
            db: DbConfig {
                provider: "dynamodb".to_string(),
                table_name: "sgdns".to_string(),
                iac_config_item_key_id: IAC_KEY.to_string(),
                external_config_item_key_id: String::new(),
            },
            readiness_defaults: ReadinessConfig { enabled: false, ..ReadinessConfig::default() },
            reconciliation: ReconciliationConfig {
                what_if: false,
                max_concurrency: 2,
                valid_states: vec!["InService".to_string()],
            },
            metrics: MetricsConfig {
                enabled: false,
                provider: "cloudwatch".to_string(),
                namespace: String::new(),
                alarms_enabled: false,
                alarms_notification_destination: String::new(),
            },
            broker: BrokerConfig { broker: String::new(), url: String::new() },
            thread_pool_size: 8,
        };

        let config_service = Arc::new(SgConfigService::new(kv.clone(), &env.db));
        let discovery = Arc::new(InMemoryDiscovery::new());
        let provider = Arc::new(MockProvider::new().with_zone("Z1", "example.com"));
        let mut registry = ProviderRegistry::new();
        registry.register(provider.clone());
        let registry = Arc::new(registry);
        let planner = Arc::new(ChangePlanner::new(
            registry.clone(),
            GcMarkerStore::new(kv.clone()),
        ));
        let lock = Arc::new(
            RetryingLockStore::new(KvLockStore::new(kv.clone()))
                .with_max_attempts(2)
                .with_backoff_unit(Duration::from_millis(1)),
        );
        let pipeline = Arc::new(LifecyclePipeline::new(
            config_service.clone(),
            discovery.clone(),
            Arc::new(AwaitingReadinessProbe::new(TagReadinessProbe::new(discovery.clone()))),
            Arc::new(NetworkHealthChecker::new()),
            planner,
            registry,
            lock,
            Arc::new(BufferingMetricsSink::new()),
            &env,
        ));

        let state = AppState {
            pipeline,
            config_service,
            kv,
            auth_token: Arc::new(TOKEN.to_string()),
            reconcile_max_concurrency: 2,
        };
        (state, discovery, provider)
    }

    fn authed(request: Request<Body>) -> Request<Body> {
        let (mut parts, body) = request.into_parts();
        parts.headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", TOKEN).parse().unwrap(),
        );
        Request::from_parts(parts, body)
    }

    #[tokio::test]
    async fn requests_without_a_token_are_unauthorized() {
        let (state, _, _) = test_state().await;
        let app = build_app(state);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_and_ready_respond_ok() {
        let (state, _, _) = test_state().await;
        let app = build_app(state);
        for uri in ["/health", "/ready"] {
            let response = app
                .clone()
                .oneshot(authed(Request::builder().uri(uri).body(Body::empty()).unwrap()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn invalid_events_are_rejected_up_front() {
        let (state, _, _) = test_state().await;
        let app = build_app(state);
        let body = json!({
            "transition": "LAUNCHING",
            "scaling_group_name": "web",
            "instance_id": ""
        });
        let response = app
            .oneshot(authed(
                Request::builder()
                    .method("POST")
                    .uri("/events")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn a_launch_event_lands_in_the_zone() {
        let (state, discovery, provider) = test_state().await;
        discovery
            .upsert_instance(sgdns_domain::Instance {
                instance_id: "i-1".to_string(),
                scaling_group_name: "web".to_string(),
                lifecycle_state: "InService".to_string(),
                launch_timestamp: 100,
                metadata: sgdns_domain::InstanceMetadata {
                    private_ip_v4: "10.0.0.1".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await;

        let app = build_app(state);
        let body = json!({
            "transition": "LAUNCHING",
            "scaling_group_name": "web",
            "instance_id": "i-1"
        });
        let response = app
            .oneshot(authed(
                Request::builder()
                    .method("POST")
                    .uri("/events")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            provider
                .record_values("Z1", "svc.example.com", sgdns_config::DnsRecordType::A)
                .await
                .unwrap(),
            vec!["10.0.0.1"]
        );
    }
}
