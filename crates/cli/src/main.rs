use clap::Parser;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uwsgi_dns::server::{DnsServer, QueryHandler};
use uwsgi_dns::{bootstrap, di};
use uwsgi_dns_domain::CliOverrides;
use uwsgi_dns_infrastructure::subscription::SubscriptionListener;
use uwsgi_dns_jobs::SubscriptionSyncJob;

#[derive(Parser)]
#[command(name = "uwsgi-dns")]
#[command(version)]
#[command(about = "Local DNS responder for domains subscribed to a uWSGI fastrouter")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// DNS server port
    #[arg(short = 'd', long)]
    dns_port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Proxy queries for unsubscribed domains to the upstream server
    #[arg(short = 'p', long)]
    proxy: bool,

    /// Upstream DNS server, host[:port]
    #[arg(long)]
    upstream: Option<String>,

    /// uWSGI fastrouter stats endpoint, host[:port]
    #[arg(long)]
    stats: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        dns_port: cli.dns_port,
        bind_address: cli.bind.clone(),
        proxy: cli.proxy,
        upstream: cli.upstream.clone(),
        stats: cli.stats.clone(),
        log_level: cli.log_level.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config);

    info!("Starting uwsgi-dns v{}", env!("CARGO_PKG_VERSION"));

    let dns_services = di::DnsServices::new(&config)?;
    let subscription = di::SubscriptionServices::new(&config)?;

    let shutdown = CancellationToken::new();

    // Passive ingestion: one subscription packet per datagram.
    let listener = SubscriptionListener::bind(
        &config.subscription.listen_addr,
        Arc::clone(&dns_services.registry),
    )
    .await?;
    tokio::spawn(listener.run(shutdown.clone()));

    // Active ingestion: periodic stats snapshots.
    let sync_job = Arc::new(
        SubscriptionSyncJob::new(
            Arc::clone(&dns_services.registry),
            subscription.stats.clone(),
        )
        .with_interval(config.subscription.poll_interval_secs)
        .with_cancellation(shutdown.clone()),
    );
    let refresh = sync_job.refresh_handle();
    sync_job.start().await;

    let handler = QueryHandler::new(
        Arc::clone(&dns_services.use_case),
        Arc::clone(&dns_services.template),
    );
    let dns_addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let server = DnsServer::bind(&dns_addr, handler)?;
    let server_task = tokio::spawn(server.run(shutdown.clone()));

    wait_for_signals(&refresh).await?;

    info!("Shutting down");
    shutdown.cancel();
    server_task.await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Block until a terminating signal arrives. SIGHUP forces an immediate
/// subscription refresh instead of exiting.
async fn wait_for_signals(refresh: &Arc<Notify>) -> anyhow::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = sigint.recv() => {
                info!("SIGINT received");
                return Ok(());
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received");
                return Ok(());
            }
            _ = sighup.recv() => {
                info!("SIGHUP received, refreshing subscription snapshot");
                refresh.notify_one();
            }
        }
    }
}
