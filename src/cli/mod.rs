pub mod admin;
pub mod output;

use clap::{Parser, Subcommand};

use crate::domain::MatchKind;

#[derive(Parser, Debug)]
#[command(name = "matchbook")]
#[command(version)]
#[command(about = "Match confirmation and rating ledger for a ranked community bot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding default.toml and environment overrides
    #[arg(short, long, default_value = "config", env = "MATCHBOOK_CONFIG_DIR")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the coordinator, event pump and HTTP API (default)
    Serve {
        /// Skip recovery of pending proposals at startup
        #[arg(long)]
        no_recover: bool,
    },
    /// Apply database migrations and exit
    Migrate,
    /// Show the leaderboard for one match kind
    Leaderboard {
        #[arg(short, long, default_value = "duel", value_parser = parse_kind)]
        kind: MatchKind,
        #[arg(short, long, default_value = "10")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Show the tier of a participant
    Tier { participant: i64 },
    /// Show the house account
    House {
        #[arg(long)]
        json: bool,
    },
    /// Show the most recent ledger entries
    Ledger {
        #[arg(short, long, default_value = "20")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Register a participant or refresh their display name
    Register { id: i64, name: String },
    /// Retire a participant from the standings
    Retire {
        id: i64,
        /// Reinstate instead of retiring
        #[arg(long)]
        undo: bool,
    },
    /// Team management
    #[command(subcommand)]
    Team(TeamCommands),
}

#[derive(Subcommand, Debug)]
pub enum TeamCommands {
    /// Create a duo or LTS team
    Create {
        #[arg(short, long, value_parser = parse_kind)]
        kind: MatchKind,
        name: String,
        #[arg(long)]
        owner: i64,
        /// Roster member; repeat for each, the owner included
        #[arg(short, long = "member", required = true)]
        members: Vec<i64>,
    },
    /// Show a team and its roster
    Show { id: i64 },
}

fn parse_kind(s: &str) -> Result<MatchKind, String> {
    MatchKind::try_from(s)
}
