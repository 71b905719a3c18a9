use clap::Parser;
use smtp2graph::{ChannelDelivery, DeliveryClient, GraphClient, GraphCredentials, RelayConfig, SmtpServer};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Relay SMTP mail through the Microsoft Graph sendMail API
#[derive(Parser, Debug)]
#[command(name = "smtp2graph", version)]
struct Args {
    /// Address to listen on (overrides SMTP2GRAPH_LISTEN)
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Log received messages instead of sending them through Graph
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    tracing::info!("Initializing...");
    let config = RelayConfig::from_env()?;
    let listen = args.listen.unwrap_or(config.listen);

    let delivery: Arc<dyn DeliveryClient> = if args.dry_run {
        tracing::info!("Dry run, received messages will only be logged");
        let (delivery, mut rx) = ChannelDelivery::channel();

        tokio::spawn(async move {
            let mut count = 0;
            while let Some(message) = rx.recv().await {
                count += 1;
                tracing::info!(
                    count,
                    from = %message.from,
                    to = ?message.to,
                    subject = %message.subject,
                    html = message.is_html(),
                    bytes = message.body_size(),
                    "Received message"
                );
            }
        });

        Arc::new(delivery)
    } else {
        let credentials = GraphCredentials::from_env()?;
        tracing::info!(tenant = %credentials.tenant_id, "Setting up Graph client...");
        Arc::new(GraphClient::new(credentials)?)
    };

    tracing::info!(%listen, "Starting SMTP listener loop...");
    SmtpServer::new(delivery).start(listen).await?;

    Ok(())
}
