use anyhow::{anyhow, Context};
use colored::Colorize;
use hashline_server::{LedgerServer, NodeConfig};
use hashline_sync::{scan, ClientOptions, PeerClient};
use hashline_types::{LedgerHeader, Record};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = NodeConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Command::Serve => cmd_serve(&config).await,
        Command::Scan => cmd_scan(&config).await,
        Command::Header(args) => cmd_header(&config, args).await,
        Command::Get(args) => cmd_get(&config, args).await,
        Command::Submit(args) => cmd_submit(&config, args).await,
        Command::Download(args) => cmd_download(&config, args).await,
    }
}

fn options(config: &NodeConfig) -> ClientOptions {
    ClientOptions {
        connect_timeout: config.connect_timeout(),
        read_timeout: config.watchdog(),
    }
}

fn client(config: &NodeConfig, index: usize) -> anyhow::Result<PeerClient> {
    let addr = config
        .peers
        .get(index)
        .copied()
        .ok_or_else(|| anyhow!("no peer at index {index} ({} configured)", config.peers.len()))?;
    Ok(PeerClient::new(addr, config.digest.build(), options(config)))
}

fn print_header(header: &LedgerHeader) {
    println!("  Number: {}", header.num.to_string().bold());
    println!("  Hash:   {}", header.hash.to_hex().cyan());
}

fn print_record(record: &Record) {
    println!("{} {}", "record".yellow(), record.num.to_string().yellow().bold());
    println!("  Hash:          {}", record.hash.to_hex().cyan());
    println!("  Previous hash: {}", record.prev_hash.to_hex().dimmed());
    println!("  Data:          {}", String::from_utf8_lossy(&record.data));
}

async fn cmd_serve(config: &NodeConfig) -> anyhow::Result<()> {
    let server = LedgerServer::from_config(config).await?;
    println!(
        "{} node {} listening on {} ({} peers, {})",
        "✓".green().bold(),
        config.local_index,
        server.local_addr()?.to_string().bold(),
        config.peers.len(),
        config.digest
    );
    server.serve().await?;
    Ok(())
}

async fn cmd_scan(config: &NodeConfig) -> anyhow::Result<()> {
    for (index, entry) in scan(&config.peers, config.digest.build(), options(config))
        .await
        .into_iter()
        .enumerate()
    {
        match entry.header {
            Ok(header) => {
                println!("[{index}] {} {}", entry.addr.to_string().bold(), "ok".green());
                print_header(&header);
            }
            Err(e) => println!("[{index}] {} {}", entry.addr.to_string().bold(), e.to_string().red()),
        }
    }
    Ok(())
}

async fn cmd_header(config: &NodeConfig, args: PeerArgs) -> anyhow::Result<()> {
    let client = client(config, args.peer)?;
    let header = client.fetch_header().await?;
    println!("{} {}", "header from".dimmed(), client.addr().to_string().bold());
    print_header(&header);
    Ok(())
}

async fn cmd_get(config: &NodeConfig, args: GetArgs) -> anyhow::Result<()> {
    let record = client(config, args.peer)?.fetch_record(args.num).await?;
    print_record(&record);
    Ok(())
}

async fn cmd_submit(config: &NodeConfig, args: SubmitArgs) -> anyhow::Result<()> {
    let client = client(config, args.peer)?;
    let record = client.submit(args.data.into_bytes()).await?;
    println!(
        "{} {} accepted record {}",
        "✓".green().bold(),
        client.addr(),
        record.num.to_string().bold()
    );
    println!("  Hash: {}", record.hash.to_hex().cyan());
    Ok(())
}

async fn cmd_download(config: &NodeConfig, args: DownloadArgs) -> anyhow::Result<()> {
    let client = client(config, args.peer)?;
    let ledger = client.download().await?;
    println!(
        "{} downloaded and verified {} records from {}",
        "✓".green().bold(),
        ledger.num,
        client.addr()
    );
    print_header(&ledger.header());
    if args.records {
        for record in &ledger.records {
            print_record(record);
        }
    }
    Ok(())
}
