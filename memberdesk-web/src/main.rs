//! Memberdesk web server binary

use clap::Parser;

use memberdesk_web::MemberdeskServer;

#[derive(Parser)]
#[command(
    name = "memberdesk-web",
    about = "Backing API for the membership admin dashboard",
    version
)]
struct Args {
    /// Bind address (overrides MEMBERDESK_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides MEMBERDESK_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Permissive CORS for local dashboard development
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    memberdesk_web::init_logging();

    let args = Args::parse();

    let mut builder = MemberdeskServer::builder();
    if let Some(host) = args.host {
        builder = builder.host(host);
    }
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if let Some(url) = args.database_url {
        builder = builder.database_url(url);
    }
    if args.dev {
        builder = builder.dev_mode(true);
    }

    let server = builder.build().await?;

    tracing::info!("💾 Memberdesk {} starting", env!("CARGO_PKG_VERSION"));
    server.run().await?;

    Ok(())
}
