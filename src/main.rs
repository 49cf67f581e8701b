// This is my entry point for the ledger node
// I build the node from config and flags, then hand control to the line console
use clap::Parser;
use ledger_node::{Blockchain, Command, Config, ConsoleLine, Opt, Server};
use log::{error, info, LevelFilter};
use std::io::{self, BufRead, Write};
use std::process;

fn main() {
    // I initialize logging at Info level, RUST_LOG can still override it
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    // I parse the startup flags with clap
    let opt = Opt::parse();

    // If startup or the console fails, I log the error and exit with code 1
    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    // Flags win over the config file and the environment
    let mut config = Config::load(opt.config.as_deref())?;
    if let Some(port) = opt.port {
        config.p2p_port = Some(port);
    }
    if let Some(difficulty) = opt.difficulty {
        config.difficulty = difficulty;
    }
    config.peers.extend(opt.peers);

    // My node always starts from genesis, nothing is persisted
    let server = Server::new(Blockchain::new(config.difficulty));
    info!("Node started with difficulty {}", config.difficulty);

    if let Some(port) = config.p2p_port {
        server.listen(port)?;
    }
    for (host, port) in config.peer_addresses()? {
        // A peer that is down is reported here and I keep starting without it
        if let Err(e) = server.connect(&host, port) {
            error!("{e}");
        }
    }

    console(&server)
}

// I read one command per line until exit or end of input
fn console(server: &Server) -> Result<(), Box<dyn std::error::Error>> {
    println!("welcome to the ledger node console, type 'help' for commands");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("ledger> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match ConsoleLine::parse_line(&line) {
            Ok(command) => command,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };
        match run_command(server, command) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("{e}"),
        }
    }
    server.close_all()?;
    Ok(())
}

// This is where I handle each console command, it returns false when I should stop
fn run_command(server: &Server, command: Command) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        Command::Mine { data } => {
            let block = server.mine(Command::payload(&data))?;
            println!(
                "Mined block {} with hash {}",
                block.get_index(),
                block.get_hash()
            );
        }
        Command::Connect { host, port } => {
            let key = server.connect(&host, port)?;
            println!("Connected to {key}");
        }
        Command::Open { port } => {
            let addr = server.listen(port)?;
            println!("Listening on port {}", addr.port());
        }
        Command::Blockchain => {
            let chain = server.get_chain()?;
            println!("{}", serde_json::to_string_pretty(&chain)?);
        }
        Command::Peers => {
            let peers = server.get_peers()?;
            if peers.is_empty() {
                println!("No connected peers");
            } else {
                println!("Connected peers: {}", peers.len());
                for (i, peer) in peers.iter().enumerate() {
                    println!("[{}] {peer}", i + 1);
                }
            }
        }
        Command::Close => {
            server.close_all()?;
            println!("All connections closed.");
        }
        Command::Exit => return Ok(false),
    }
    Ok(true)
}
