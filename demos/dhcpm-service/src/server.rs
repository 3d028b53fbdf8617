//! DHCP Management Server
//!
//! Serves the `dhcpsrv` management interface over DCE RPC / TCP, backed by
//! an in-memory scope database.
//!
//! USAGE:
//!   dhcpm-server [OPTIONS]
//!
//! EXAMPLES:
//!   dhcpm-server                          # Listen on 127.0.0.1:6700
//!   dhcpm-server --port 8000              # Custom port
//!   dhcpm-server --host 0.0.0.0 -v        # All interfaces, debug logging

mod common;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use common::*;
use dcerpc::DceRpcServer;
use dhcpm::{create_dhcpsrv_interface, DHCPSRV_UUID, DHCPSRV_VERSION};
use store::MemoryDhcpServer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "dhcpm-server")]
#[command(version)]
#[command(about = "DHCP management server - scopes, options and leases over DCE RPC")]
#[command(
    long_about = "A demonstration server for the DHCP Server Management Protocol (MS-DHCPM).\n\n\
Every operation of the dhcpsrv interface (v1.0) is served from an in-memory\n\
database that starts empty and is lost on exit.\n\n\
Run the corresponding dhcpm-client to manage it."
)]
struct Args {
    /// Host address to bind to
    ///
    /// Use 127.0.0.1 for localhost only, 0.0.0.0 for all interfaces.
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Log every call
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let (major, minor) = DHCPSRV_VERSION;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          DHCP Management Server (DCE RPC / TCP)              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Protocol:  MS-DHCPM over DCE RPC (MS-RPCE)                  ║");
    println!(
        "║  Interface: {} (v{}.{})  ║",
        DHCPSRV_UUID, major, minor
    );
    println!("║  Listening: {:47} ║", addr);
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Press Ctrl+C to stop                                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let server = DceRpcServer::new();
    server
        .register_interface(create_dhcpsrv_interface(Arc::new(MemoryDhcpServer::new())))
        .await;

    server
        .run_until(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
