use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::exit;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use overlay_routes::{Cidr, RouteState, Settings, TreeBuildOptions};
use tracing_subscriber::EnvFilter;

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Settings file (JSON) holding `tun.routes` and `tun.unsafe_routes`.
    #[clap(long)]
    pub config: PathBuf,
    /// Network attached to the node's certificate, e.g. 10.0.0.0/24.
    #[clap(long)]
    pub network: Cidr,
    /// Don't log unsafe routes shadowed by other unsafe routes.
    #[clap(long)]
    pub no_shadow_report: bool,
    /// Log routes that configure an MTU, for platforms without per-route MTU support.
    #[clap(long)]
    pub no_route_mtu: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the validated routes as JSON.
    Validate,
    /// Print the gateway each address is relayed through.
    Lookup { addresses: Vec<Ipv4Addr> },
}

#[derive(Parser)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run(Cli::parse()) {
        eprintln!("{error:#}");
        exit(1)
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let GlobalArgs { config, network, no_shadow_report, no_route_mtu } = cli.global;
    let settings = Settings::load(&config).with_context(|| format!("failed to load {}", config.display()))?;
    let options = TreeBuildOptions { report_shadowed: !no_shadow_report, mtu_supported: !no_route_mtu };
    let state = RouteState::new(&settings, network, options)?;

    match cli.command {
        Command::Validate => {
            let snapshot = state.snapshot();
            let output = serde_json::json!({
                "network": network,
                "routes": snapshot.routes,
                "unsafeRoutes": snapshot.unsafe_routes,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Lookup { addresses } => {
            for addr in addresses {
                match state.lookup(addr) {
                    Some(via) => println!("{addr} via {via}"),
                    None if network.contains_addr(addr) => println!("{addr} is inside {network}"),
                    None => println!("{addr} no route"),
                }
            }
        }
    }
    Ok(())
}
