mod error;

use clap::Parser;
use client::{DialerConfig, ProxyDialer, UdpConn};
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

//ALL_PROXY=socks5://127.0.0.1:1080 RUST_LOG=debug cargo run -p probe -- --target 1.1.1.1:53

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let args = Args::parse();

    if let Err(err) = run(args).await {
        eprintln!("probe failed: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> error::Result<()> {
    let config = match &args.config {
        Some(path) => DialerConfig::load(path)?,
        None => DialerConfig::default(),
    };
    let dialer = ProxyDialer::from_config(&config);

    match dialer.proxy_config() {
        Some(proxy) => info!("using {} proxy {}", proxy.scheme, proxy.server_addr()),
        None => info!("no proxy in {:?}, sending directly", config.env_names),
    }

    let conn = dialer.dial_or_direct(args.target).await?;
    let reply = exchange(&conn, args.payload.as_bytes(), Duration::from_millis(args.wait_ms)).await?;

    info!(
        "{} bytes from {} ({})",
        reply.len(),
        args.target,
        if conn.is_proxied() { "proxied" } else { "direct" }
    );
    println!("{}", String::from_utf8_lossy(&reply));
    Ok(())
}

async fn exchange(conn: &UdpConn, payload: &[u8], wait: Duration) -> error::Result<Vec<u8>> {
    conn.send(payload).await?;

    let mut buf = vec![0u8; 65535];
    let n = tokio::time::timeout(wait, conn.recv(&mut buf))
        .await
        .map_err(|_| error::Error::NoReply(wait))??;
    buf.truncate(n);
    Ok(buf)
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// UDP destination
    #[arg(short, long)]
    target: SocketAddr,

    /// Datagram to send
    #[arg(short, long, default_value = "ping")]
    payload: String,

    /// TOML dialer config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long to wait for a reply, in milliseconds
    #[arg(short, long, default_value_t = 2000)]
    wait_ms: u64,
}
