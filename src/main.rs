mod config;

use clap::Parser as _;
use config::{Command, Config, PreviewArgs, ServeArgs};
use dashgen::{
    AppState, build_metrics_layer_and_handle, build_metrics_router, build_router,
    client::create_hyper_client,
    preview::{PreviewOutcome, PreviewTrigger, StaticPage},
};
use tokio::net::TcpListener;
use tracing::{info, instrument};

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Config::parse().command {
        Command::Serve(args) => serve(args.validate()?).await,
        Command::Preview(args) => preview(args.validate()?).await,
    }
}

#[instrument]
async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    info!("Starting dashgen server with config: {:?}", args);

    let app_state = AppState::new(args.upstream()).wrap_output(args.wrap_output);
    let mut router = build_router(app_state);

    if args.metrics {
        let (prometheus_layer, handle) = build_metrics_layer_and_handle(args.metrics_prefix.clone());
        router = router.layer(prometheus_layer);

        let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
        let metrics_listener = TcpListener::bind(&metrics_addr).await?;
        info!("Metrics endpoint listening on {}", metrics_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, build_metrics_router(handle)).await {
                tracing::error!("Metrics server failed: {}", e);
            }
        });
    }

    let bind_addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("dashgen listening on {}", bind_addr);

    axum::serve(listener, router).await?;

    Ok(())
}

#[instrument]
async fn preview(args: PreviewArgs) -> anyhow::Result<()> {
    let (json, prompt) = args.read_inputs().await?;
    let mut page = StaticPage::new(json, prompt);

    let trigger = PreviewTrigger::new(create_hyper_client(), args.server.clone());
    match trigger.generate_dashboard(&mut page).await? {
        PreviewOutcome::Rendered => {
            let html = page.preview().unwrap_or_default();
            tokio::fs::write(&args.output, html).await?;
            info!("Dashboard written to {}", args.output.display());
            Ok(())
        }
        PreviewOutcome::Rejected(error) => Err(anyhow::anyhow!("Server rejected request: {}", error)),
    }
}
