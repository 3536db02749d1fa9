//! Liveness endpoint for hosting platforms that expect an open port.

use std::sync::Arc;

use {
    axum::{Json, Router, extract::State, response::IntoResponse, routing::get},
    hushwatch_tracker::TrackerRegistry,
    tracing::{info, warn},
};

pub fn router(registry: Arc<TrackerRegistry>) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .with_state(registry)
}

/// Bind `addr` and serve until the process exits. A bind failure is logged
/// and the bot keeps running without the endpoint.
pub async fn serve(addr: String, registry: Arc<TrackerRegistry>) {
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            warn!(addr = %addr, error = %e, "health endpoint failed to bind");
            return;
        },
    };
    info!(addr = %addr, "health endpoint listening");
    if let Err(e) = axum::serve(listener, router(registry)).await {
        warn!(error = %e, "health endpoint stopped");
    }
}

async fn health_handler(State(registry): State<Arc<TrackerRegistry>>) -> impl IntoResponse {
    let status = registry.status().await;
    Json(serde_json::json!({
        "status": "ok",
        "trackers": status.tracker_count,
    }))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        axum::{
            body::Body,
            http::{Request, StatusCode},
        },
        hushwatch_channels::{ChannelHandle, ChannelId, ChannelOutbound},
        hushwatch_tracker::{TrackerSpec, store_memory::InMemoryStore},
        tower::ServiceExt,
    };

    struct NullOutbound;

    #[async_trait]
    impl ChannelOutbound for NullOutbound {
        async fn resolve_channel(
            &self,
            channel_id: ChannelId,
        ) -> hushwatch_channels::Result<ChannelHandle> {
            Ok(ChannelHandle::text(channel_id))
        }

        async fn send_text(&self, _: &ChannelHandle, _: &str) -> hushwatch_channels::Result<()> {
            Ok(())
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn reports_ok_and_tracker_count() {
        let registry = TrackerRegistry::new(Arc::new(InMemoryStore::new()), Arc::new(NullOutbound));

        let (status, body) = get_json(router(Arc::clone(&registry)), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "status": "ok", "trackers": 0 }));

        registry
            .start(ChannelHandle::text(1), TrackerSpec::new("ping", 1, 1))
            .await
            .unwrap();
        let (status, body) = get_json(router(Arc::clone(&registry)), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["trackers"], 1);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn bind_failure_is_not_fatal() {
        let registry = TrackerRegistry::new(Arc::new(InMemoryStore::new()), Arc::new(NullOutbound));
        serve("not-an-address".to_string(), registry).await;
    }
}
