use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hashline", about = "Hash-linked ledger node and client", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Node configuration file.
    #[arg(short, long, global = true, default_value = "hashline.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run this node's server
    Serve,
    /// Ask every trusted peer for its ledger header
    Scan,
    /// Show one peer's ledger header
    Header(PeerArgs),
    /// Fetch a single record from a peer
    Get(GetArgs),
    /// Submit data as the next record of a peer's ledger
    Submit(SubmitArgs),
    /// Download and verify a peer's whole ledger
    Download(DownloadArgs),
}

#[derive(Args)]
pub struct PeerArgs {
    /// Index of the peer in the configured list
    pub peer: usize,
}

#[derive(Args)]
pub struct GetArgs {
    pub peer: usize,
    /// Record number, starting at 1
    pub num: u16,
}

#[derive(Args)]
pub struct SubmitArgs {
    pub peer: usize,
    /// Record payload, taken as UTF-8 text
    pub data: String,
}

#[derive(Args)]
pub struct DownloadArgs {
    pub peer: usize,
    /// Print every record, not just the summary
    #[arg(long)]
    pub records: bool,
}
