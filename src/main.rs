use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ratequota_proxy::config::Settings;
use ratequota_proxy::middleware::{rate_limit_quota_layer, request_id_middleware};
use ratequota_proxy::store::RespStoreClient;
use ratequota_proxy::ProxyState;

async fn downstream() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ratequota_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;

    tracing::info!("connecting to backing store at {}", settings.store.address);
    let store = RespStoreClient::connect(settings.store.clone()).await?;
    tracing::info!("backing store connection established");

    let state = Arc::new(ProxyState::new(
        &settings.rules,
        Arc::new(store),
        &settings.store,
    ));

    let app = Router::new().route("/", get(downstream));
    let app = rate_limit_quota_layer(app, state)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http());

    let addr = std::env::var("RATEQUOTA_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
