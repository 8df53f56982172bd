//! `stepscaled run`: the controller loop.

use stepscale_autoscale::client_for;
use stepscale_recommend::RecommendationController;
use tokio::sync::watch;
use tracing::info;

use crate::config::StepscaleConfig;

pub async fn run(config: &StepscaleConfig) -> anyhow::Result<()> {
    info!("stepscale daemon starting");

    let state = crate::open_store(config)?;
    let settings = &config.controller;

    let client = client_for(settings.autoscaler, state.clone());
    let mut controller =
        RecommendationController::new(state, client).with_labels(settings.labels.clone());
    if let Some(timeout) = settings.op_timeout() {
        controller = controller.with_op_timeout(timeout);
    }
    info!(
        autoscaler = %settings.autoscaler,
        interval = settings.interval_secs,
        "recommendation controller initialized"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let interval = settings.interval();
    let controller_handle = tokio::spawn(async move {
        controller.run(interval, shutdown_rx).await;
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    controller_handle.await?;
    info!("stepscale daemon stopped");
    Ok(())
}
