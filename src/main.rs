use std::net::SocketAddr;

use foresee_gateway::common::config::AppCfg;
use foresee_gateway::common::log as gateway_log;
use foresee_gateway::inference::domain::FEATURE_COUNT;
use foresee_gateway::model::{service as model_service, FsModelRepo};
use foresee_gateway::{build_app, AppState, Gateway, RouteLimits};

#[tokio::main]
async fn main() {
    let cfg = match AppCfg::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(2);
        }
    };
    gateway_log::init(cfg.debug);

    let repo = FsModelRepo::new(&cfg.model_path, FEATURE_COUNT);
    let gateway = Gateway::new(model_service::load_or_none(&repo));
    let state = AppState::new(gateway, RouteLimits::from_cfg(&cfg));
    let app = build_app(state, &cfg);

    let addr = cfg.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("cannot bind {addr}: {err}");
            std::process::exit(1);
        }
    };
    log::info!("foresee-gateway listening on http://{addr}");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    if let Err(err) = served {
        log::error!("server error: {err}");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        log::info!("shutdown requested");
    }
}
