use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use classroom_gateway::{
    auth::{CredentialManager, FileCredentialStore, InstalledAppFlow, OAuthRefresher},
    config::Config,
    gateway::ClassroomGateway,
    http_client::ClassroomHttpClient,
    routes,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    config.validate()?;

    tracing::info!("🚀 Classroom Gateway starting...");
    tracing::info!(
        "Server configured: {}:{}",
        config.server_host,
        config.server_port
    );

    // Credential handling: file store, token refresh, interactive consent
    let oauth_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.http_connect_timeout))
        .timeout(Duration::from_secs(config.http_request_timeout))
        .build()
        .context("Failed to create OAuth HTTP client")?;

    let store = Arc::new(FileCredentialStore::new(config.token_file.clone()));
    if !store.path().exists() {
        tracing::info!(
            "No credential file yet; the first request will start the OAuth flow"
        );
    }

    let credentials = Arc::new(CredentialManager::new(
        store,
        Arc::new(OAuthRefresher::new(oauth_client.clone())),
        Arc::new(InstalledAppFlow::new(
            config.client_secrets_file.clone(),
            oauth_client,
            config.auth_callback_timeout.map(Duration::from_secs),
        )),
        config.scopes.clone(),
        config.token_refresh_threshold,
    ));
    tracing::info!("✅ Credential manager initialized");

    let classroom = Arc::new(ClassroomHttpClient::new(
        &config.api_base_url,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?);
    let gateway = Arc::new(ClassroomGateway::new(classroom));
    tracing::info!("✅ Classroom client initialized ({})", config.api_base_url);

    let app_state = routes::AppState {
        credentials,
        gateway,
    };

    // Build the application with routes and middleware
    let app = routes::build_app(app_state, &config.cors_origins);

    // Bind to configured host and port
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    print_startup_banner(&config);

    tracing::info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server shutdown complete");

    Ok(())
}

/// Print startup banner
fn print_startup_banner(config: &Config) {
    let banner = r#"
╔═══════════════════════════════════════════════════════════╗
║                                                           ║
║                 📚 Classroom Gateway                      ║
║                                                           ║
║  Courses and assignments proxy for Google Classroom       ║
║                                                           ║
╚═══════════════════════════════════════════════════════════╝
"#;

    println!("{}", banner);
    println!("  Version:        {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Server:         http://{}:{}",
        config.server_host, config.server_port
    );
    println!("  Token file:     {}", config.token_file.display());
    println!("  Client secrets: {}", config.client_secrets_file.display());
    println!("  Log Level:      {}", config.log_level);
    println!();
}

/// Handle graceful shutdown signal
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
