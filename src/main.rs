use bridge_deployer::{BridgeAdmin, ChainRole, Config, PrivateKey};
use tokio_util::sync::CancellationToken;

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    tracing::info!("Starting bridge deployer");

    let config = Config::load()?;
    tracing::info!(
        home_rpc = %config.home.rpc_url,
        foreign_rpc = %config.foreign.rpc_url,
        gas_limit_extra = config.gas_limit_extra,
        "Configuration loaded"
    );

    // In-flight waits stop on SIGINT/SIGTERM
    let cancel = CancellationToken::new();
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        cancel_signal.cancel();
    });

    let key = PrivateKey::from_hex(&config.private_key)?;
    let admin = BridgeAdmin::connect(&config, cancel).await?;

    for role in ChainRole::ALL {
        let report = admin.preflight(role, &key).await?;
        tracing::info!(
            chain = %report.role,
            chain_id = report.chain_id,
            address = %report.address,
            balance = %report.balance,
            nonce = report.nonce,
            "Deployment account ready"
        );
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridge_deployer=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, cancelling");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, cancelling");
        }
    }
}
