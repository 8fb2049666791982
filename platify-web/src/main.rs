use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use platify_web::{router, templates::Templates, AppState, Config};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// JSON logs to stdout, or to a daily-rotated `access.log` when a log dir is set.
/// The returned guard must live as long as the process to flush the file writer.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match &config.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "access.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .json()
                .with_writer(non_blocking)
                .with_env_filter(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().json().with_env_filter(filter).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();
    let _guard = init_tracing(&config);

    tracing::info!(
        api_base_url = %config.api_base_url,
        listen = %config.listen_addr(),
        upload_dir = %config.upload_dir.display(),
        release_mode = config.release_mode,
        "configuration loaded"
    );

    // A template set that does not compile is a deployment error, not a request error
    let templates = Templates::load(&config.templates_dir)
        .with_context(|| format!("Loading templates from {}", config.templates_dir.display()))?;
    let state = AppState::new(config.clone(), templates)?;
    let app = router(state);

    if let Some((cert, key)) = config.tls_paths() {
        rustls::crypto::ring::default_provider()
            .install_default()
            .map_err(|_| anyhow!("Installing rustls crypto provider"))?;
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
            .await
            .context("Loading TLS certificate")?;

        let addr: SocketAddr = config
            .listen_addr()
            .parse()
            .with_context(|| format!("Parsing listen address {}", config.listen_addr()))?;
        tracing::info!("Listening on https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .context("Starting TLS server")?;
    } else {
        let listener = tokio::net::TcpListener::bind(config.listen_addr())
            .await
            .with_context(|| format!("Binding {}", config.listen_addr()))?;
        tracing::info!("Listening on http://{}", config.listen_addr());
        axum::serve(listener, app).await.context("Serving HTTP")?;
    }
    Ok(())
}
