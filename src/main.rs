use anyhow::Result;
use tracing::{error, info};

use ec2_policy_dashboard::config::{Command, Config};
use ec2_policy_dashboard::health::HealthServer;
use ec2_policy_dashboard::{logging, server};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args();

    // Handle version subcommand
    if let Some(Command::Version) = &config.command {
        println!(
            "ec2-policy-dashboard {}, commit: {}, build_date: {}",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_COMMIT"),
            env!("BUILD_DATE"),
        );
        return Ok(());
    }

    // Initialize logging
    logging::init(&config.log_format, &config.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT"),
        build_date = env!("BUILD_DATE"),
        opa_url = %config.get_opa_url(),
        checks = ?config.checks,
        "ec2-policy-dashboard starting"
    );

    // Validate configuration
    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration validation failed");
        std::process::exit(1);
    }

    // Start health check server
    let health_port = config.health_port;
    let health_server = HealthServer::new();
    let health_server_clone = health_server.clone();

    let (health_ready_tx, health_ready_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = health_server_clone
            .serve(health_port, health_ready_tx)
            .await
        {
            error!(error = %e, "Health check server failed");
        }
    });

    // Wait for health server to be ready
    health_ready_rx.await.ok();
    info!(port = health_port, "Health check server started");

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let result = tokio::select! {
        result = server::run(config, health_server, shutdown_rx) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
            Ok(())
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Application error");
        std::process::exit(1);
    }

    info!("Shutdown complete");
    Ok(())
}
