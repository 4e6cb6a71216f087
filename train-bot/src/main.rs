use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use train_bot::bot::{self, AppContext, BotSettings};
use train_bot::cache::CachedTimetable;
use train_bot::config::{CONFIG_ENV, Config, ConfigError, Secrets, config_path};
use train_bot::publish::{
    Dispatcher, DryRunPublisher, MastodonConfig, MastodonPublisher, Publisher,
};
use train_bot::rtt::{RttClient, RttConfig};
use train_bot::scheduler::JobScheduler;
use train_bot::web::{AppState, create_router};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,train_bot=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal startup error");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("RTT client: {0}")]
    Rtt(#[from] train_bot::rtt::RttError),
    #[error("publisher: {0}")]
    Publish(#[from] train_bot::publish::PublishError),
    #[error("status server: {0}")]
    Status(#[from] std::io::Error),
    #[error("invalid status bind address {0:?}")]
    Bind(String),
}

async fn start() -> Result<(), StartupError> {
    let path = config_path(std::env::args().nth(1), std::env::var(CONFIG_ENV).ok());
    info!(path = %path.display(), "loading config");
    let config = Config::load(&path)?;
    let secrets = Secrets::from_env()?;

    let rtt = RttClient::new(
        RttConfig::new(&secrets.rtt_username, &secrets.rtt_password)
            .with_base_url(&config.rtt.base_url)
            .with_max_concurrent(config.rtt.max_concurrent)
            .with_timeout(config.rtt.timeout_secs),
    )?;
    let timetable = CachedTimetable::new(rtt, &config.poll.cache_config());

    let publishers = build_publishers(&config, &secrets)?;
    info!(
        platforms = ?publishers.iter().map(Publisher::name).collect::<Vec<_>>(),
        "publishers ready"
    );

    let ctx = Arc::new(AppContext::new(
        timetable,
        config.watch_list(),
        config.town_registry(),
        config.message_templates()?,
        JobScheduler::new(Dispatcher::new(publishers)),
        BotSettings::from(&config),
    ));

    if let Some(bind) = &config.status.bind {
        let addr: SocketAddr = bind.parse().map_err(|_| StartupError::Bind(bind.clone()))?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let app = create_router(AppState::new(Arc::clone(&ctx)));
        info!(%addr, "status endpoint listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "status server stopped");
            }
        });
    }

    info!(
        routes = config.routes.len(),
        towns = config.towns.len(),
        interval_secs = config.poll.interval_secs,
        "train bot starting"
    );

    bot::run(&ctx, shutdown_signal()).await;
    info!("train bot stopped");
    Ok(())
}

fn build_publishers(config: &Config, secrets: &Secrets) -> Result<Vec<Publisher>, StartupError> {
    if config.publish.dry_run {
        return Ok(vec![Publisher::DryRun(DryRunPublisher::new(true))]);
    }

    let mut publishers = Vec::new();
    if let Some(mastodon) = &config.publish.mastodon {
        let token = secrets
            .mastodon_token
            .clone()
            .ok_or(ConfigError::MissingEnv("MASTODON_ACCESS_TOKEN"))?;
        publishers.push(Publisher::Mastodon(MastodonPublisher::new(
            MastodonConfig::new(&mastodon.base_url, token),
        )?));
    }
    Ok(publishers)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
}
