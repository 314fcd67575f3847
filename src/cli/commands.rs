use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "peer-chain")]
pub struct Opt {
    #[arg(long, global = true, help = "Log at debug level")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startnode", about = "Start a node and join the network")]
    StartNode {
        #[arg(long, help = "Port to listen on (the bootstrap port starts a new network)")]
        port: Option<u16>,
        #[arg(long, help = "Hostname peers use to reach this node")]
        hostname: Option<String>,
        #[arg(long, help = "Human readable node name")]
        name: Option<String>,
        #[arg(long, help = "Path to a TOML configuration file")]
        config: Option<PathBuf>,
    },
    #[command(name = "createwallet", about = "Print a fresh wallet hash")]
    Createwallet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_startnode() {
        let opt = Opt::parse_from(["peer-chain", "startnode", "--port", "8001", "--verbose"]);
        assert!(opt.verbose);
        match opt.command {
            Command::StartNode { port, hostname, .. } => {
                assert_eq!(port, Some(8001));
                assert!(hostname.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_createwallet() {
        let opt = Opt::parse_from(["peer-chain", "createwallet"]);
        assert!(!opt.verbose);
        assert!(matches!(opt.command, Command::Createwallet));
    }
}
