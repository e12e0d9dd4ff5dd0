// Main entry point for the helper scheduling process + Mutation API boundary.

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::kernel::scheduling::{
    helpers, Catalogue, CatalogueGc, Dispatcher, Executor, ExecutionQueue, HelperRegistry,
    QueuePlanner, RedisSchedulingStore, RemoteUserDirectory, SchedulingProcess,
    SchedulingProcessConfig, SchedulingStore, UserDirectory, replan_channel,
};
use server_core::kernel::server_kernel::SchedulingKernel;
use server_core::server::middleware::JwtVerifier;
use server_core::server::build_app;
use server_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting helper scheduling process");

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!("configuration loaded");

    let store: Arc<dyn SchedulingStore> = Arc::new(
        RedisSchedulingStore::from_url(&config.scheduling_store_url)
            .context("failed to connect to Scheduling Store")?,
    );
    tracing::info!("Scheduling Store connected");

    let user_directory: Arc<dyn UserDirectory> = Arc::new(RemoteUserDirectory::new(
        config.user_directory_url.clone(),
    ));

    let catalogue = Arc::new(Catalogue::new(store.clone()));
    catalogue
        .clear()
        .await
        .context("failed to clear catalogue before bootstrapping")?;
    for definition in helpers::builtin_definitions() {
        catalogue
            .register(&definition)
            .await
            .context("failed to register built-in helper definition")?;
    }
    tracing::info!("catalogue bootstrapped with built-in helper definitions");

    let heartbeat_url = std::env::var("HEARTBEAT_URL").ok();
    let registry = Arc::new(helpers::builtin_helpers(heartbeat_url));

    let queue = Arc::new(ExecutionQueue::new(store.clone()));
    let gc = Arc::new(CatalogueGc::new(store.clone()));
    let planner = Arc::new(QueuePlanner::new(
        catalogue.clone(),
        queue.clone(),
        user_directory.clone(),
        config.planning_window,
    ));
    let executor = Arc::new(Executor::new(queue.clone(), config.executor_max_concurrency));
    let dispatcher = Arc::new(Dispatcher::new(
        queue.clone(),
        registry.clone(),
        user_directory.clone(),
        executor.clone(),
    ));

    let (replan_tx, replan_rx) = replan_channel();

    let kernel = SchedulingKernel::new(
        store.clone(),
        catalogue.clone(),
        queue.clone(),
        user_directory.clone(),
        registry.clone(),
        replan_tx,
    );

    let jwt_verifier = Arc::new(JwtVerifier::new(&config.jwt_secret, config.jwt_issuer.clone()));
    let allowed_origins: Vec<String> = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();
    let app = build_app(kernel, jwt_verifier, allowed_origins);

    let process = SchedulingProcess::new(
        dispatcher,
        planner,
        gc,
        SchedulingProcessConfig {
            dispatch_tick: config.dispatch_tick,
            expansion_interval: config.expansion_interval,
            execution_history_retention: config.execution_history_retention,
            shutdown_grace: config.shutdown_grace,
        },
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let process_task = tokio::spawn(async move {
        process.run(replan_rx, shutdown_rx).await;
    });

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, "starting Mutation API boundary");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind to address")?;

    let serve = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    );

    tokio::select! {
        result = serve => {
            result.context("HTTP server error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = process_task.await;

    Ok(())
}
