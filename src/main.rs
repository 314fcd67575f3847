// This is the entry point of the node binary
use clap::Parser;
use log::{error, info, LevelFilter};
use peer_chain::{Command, Config, Opt, Server, Wallet};
use std::process;

#[tokio::main]
async fn main() {
    let opt = Opt::parse();

    // Info is enough to follow mining and gossip; --verbose shows every request
    let level = if opt.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::builder().filter_level(level).init();

    if let Err(e) = run_command(opt.command).await {
        error!("Error: {e}");
        process::exit(1);
    }
}

async fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::StartNode {
            port,
            hostname,
            name,
            config,
        } => {
            let mut settings = Config::load(config.as_deref())?;
            // flags win over the file and the environment
            if let Some(port) = port {
                settings.node.port = port;
            }
            if let Some(hostname) = hostname {
                settings.node.hostname = hostname;
            }
            if let Some(name) = name {
                settings.node.name = name;
            }

            if settings.is_bootstrap() {
                info!("Port {} is the bootstrap port, starting a new network", settings.node.port);
            } else {
                info!("Joining the network through {}", settings.bootstrap_address());
            }

            let server = Server::bootstrap(settings).await?;
            server.run().await?;
        }
        Command::Createwallet => {
            let wallet = Wallet::new()?;
            println!("Your new wallet hash: {}", wallet.get_hash())
        }
    }
    Ok(())
}
