//! API server entry point.

use std::sync::Arc;

use api::config::{Config, ConfigError, CrmAuth};
use api::error::StartupError;
use crm::{
    HttpCrmClient, HttpFileFetcher, NoopNotifier, Notifier, RefreshCredentials,
    RefreshTokenProvider, SlackNotifier, StaticToken, TokenProvider,
};
use order_store::PostgresOrderStore;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn token_provider(config: &Config) -> Result<Arc<dyn TokenProvider>, StartupError> {
    match config.crm_auth.clone() {
        Some(CrmAuth::Static(token)) => Ok(Arc::new(StaticToken::new(token))),
        Some(CrmAuth::Refresh {
            client_id,
            client_secret,
            refresh_token,
        }) => {
            let credentials = RefreshCredentials {
                client_id,
                client_secret,
                refresh_token,
            };
            let provider = RefreshTokenProvider::new(
                &config.crm_accounts_url()?,
                credentials,
                config.crm_timeout(),
            )?;
            Ok(Arc::new(provider))
        }
        None => Err(ConfigError::MissingCrmCredentials.into()),
    }
}

fn notifier(config: &Config) -> Result<Arc<dyn Notifier>, StartupError> {
    let Some(notify) = &config.notify else {
        tracing::warn!("notifier credentials missing, order announcements disabled");
        return Ok(Arc::new(NoopNotifier));
    };

    let base_url = Url::parse(&notify.base_url).map_err(|source| ConfigError::InvalidUrl {
        var: "NOTIFY_BASE_URL",
        source,
    })?;
    let slack = SlackNotifier::new(
        &base_url,
        notify.bot_token.clone(),
        notify.channel_id.clone(),
        config.crm_timeout(),
    )?;
    Ok(Arc::new(slack))
}

async fn run(config: Config) -> Result<(), StartupError> {
    // 1. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 2. Connect to the database and apply migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    let store = PostgresOrderStore::new(pool);
    store.run_migrations().await?;

    // 3. Build the remote adapters
    let crm = HttpCrmClient::new(
        config.crm_base_url()?,
        token_provider(&config)?,
        config.crm_timeout(),
    )?;
    let fetcher = HttpFileFetcher::new(config.crm_timeout())?;
    let settings = config.saga_settings()?;
    tokio::fs::create_dir_all(&settings.scratch_dir).await?;

    // 4. Build the application
    let state = api::create_state(
        store,
        Arc::new(crm),
        Arc::new(fetcher),
        notifier(&config)?,
        settings,
    );
    let app = api::create_app(state, metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "server failed");
        std::process::exit(1);
    }
}
