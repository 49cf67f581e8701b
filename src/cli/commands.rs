use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

/// Startup options for a node
#[derive(Debug, Parser)]
#[command(name = "ledger-node", version, about = "Proof-of-work ledger node")]
pub struct Opt {
    #[arg(long, help = "Accept peers on this port at startup")]
    pub port: Option<u16>,
    #[arg(long, help = "Required leading zero hex digits in block hashes")]
    pub difficulty: Option<usize>,
    #[arg(long = "peer", help = "Peer to connect to at startup (host:port), repeatable")]
    pub peers: Vec<String>,
    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
}

/// One line typed at the node console
#[derive(Debug, Parser)]
#[command(no_binary_name = true, name = "console")]
pub struct ConsoleLine {
    #[command(subcommand)]
    pub command: Command,
}

impl ConsoleLine {
    pub fn parse_line(line: &str) -> Result<Command, clap::Error> {
        ConsoleLine::try_parse_from(line.split_whitespace()).map(|parsed| parsed.command)
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    #[command(name = "mine", visible_alias = "m", about = "Mine a new block, e.g. mine Hello World")]
    Mine {
        #[arg(
            required = true,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            help = "Block payload"
        )]
        data: Vec<String>,
    },
    #[command(name = "connect", visible_alias = "c", about = "Connect to a new peer, e.g. connect localhost 2727")]
    Connect {
        #[arg(help = "Peer host")]
        host: String,
        #[arg(help = "Peer port")]
        port: u16,
    },
    #[command(name = "open", visible_alias = "o", about = "Open a port for peer connections, e.g. open 2727")]
    Open {
        #[arg(help = "Port to listen on")]
        port: u16,
    },
    #[command(name = "blockchain", visible_alias = "bc", about = "Print the current chain")]
    Blockchain,
    #[command(name = "peers", visible_alias = "p", about = "List connected peers")]
    Peers,
    #[command(name = "close", about = "Close every peer connection")]
    Close,
    #[command(name = "exit", visible_alias = "quit", about = "Stop the node")]
    Exit,
}

impl Command {
    /// Payload for `mine`: the words joined back together, surrounding quotes removed
    pub fn payload(data: &[String]) -> Value {
        let joined = data.join(" ");
        Value::String(joined.trim_matches('"').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mine_with_spaces() {
        let command = ConsoleLine::parse_line("mine \"Hello World\"").unwrap();
        match command {
            Command::Mine { data } => {
                assert_eq!(Command::payload(&data), Value::String("Hello World".into()))
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(
            ConsoleLine::parse_line("c localhost 2727").unwrap(),
            Command::Connect {
                host: "localhost".into(),
                port: 2727
            }
        );
        assert_eq!(
            ConsoleLine::parse_line("o 3000").unwrap(),
            Command::Open { port: 3000 }
        );
        assert_eq!(ConsoleLine::parse_line("bc").unwrap(), Command::Blockchain);
        assert_eq!(ConsoleLine::parse_line("p").unwrap(), Command::Peers);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ConsoleLine::parse_line("mine").is_err());
        assert!(ConsoleLine::parse_line("open port").is_err());
        assert!(ConsoleLine::parse_line("dance").is_err());
    }

    #[test]
    fn test_startup_options() {
        let opt = Opt::try_parse_from([
            "ledger-node",
            "--port",
            "2727",
            "--peer",
            "a:1",
            "--peer",
            "b:2",
        ])
        .unwrap();
        assert_eq!(opt.port, Some(2727));
        assert_eq!(opt.peers, vec!["a:1".to_string(), "b:2".to_string()]);
        assert_eq!(opt.difficulty, None);
    }
}
