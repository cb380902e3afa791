use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use twitter::endpoint::relation::RelationKind;

mod creds;
mod fetch;
mod hydrate;
mod input;
mod merge;
mod outcome;
mod partition;
mod relations;
mod timelines;
mod worker;
mod writer;

/// Batch-pull follower, friend, timeline, and account data for a panel of
/// Twitter targets, one worker per credential
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    op: Op,
}

/// Flags shared by every operation.
#[derive(clap::Args, Debug)]
pub struct CommonArgs {
    /// Input file, one target ID per line (or a CSV when --csv-column is set)
    #[clap(short, long, value_parser)]
    pub input: PathBuf,

    /// TOML credential store, one table per account alias
    #[clap(short, long, value_parser)]
    pub creds: PathBuf,

    /// Read target IDs from this column of a CSV input file
    #[clap(long, value_parser)]
    pub csv_column: Option<String>,

    /// Prefix for output file names
    #[clap(short, long, default_value = "")]
    pub prefix: String,

    /// Index to start at, for resuming a partial run
    #[clap(short, long, default_value_t = 0)]
    pub start_idx: usize,

    /// Index to end at, -1 for the end of the input
    #[clap(short, long, default_value_t = -1)]
    pub end_idx: i64,

    /// Restrict the run to a single target
    #[clap(short, long)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
enum Op {
    /// Pull the follower or friend edge set for each target
    Relations {
        #[clap(flatten)]
        common: CommonArgs,

        /// Relation to pull
        #[clap(short, long, value_enum)]
        relation: RelationArg,

        /// Stop after this many related accounts per target, -1 for no limit
        #[clap(long, default_value_t = 50_000)]
        max_pull: i64,

        /// Use the ids-only endpoint: larger pages, no per-account fields
        #[clap(short, long)]
        minimal: bool,
    },
    /// Pull each target's most recent tweets with referenced-tweet context
    Timelines {
        #[clap(flatten)]
        common: CommonArgs,

        /// Tweets to request per target
        #[clap(short = 'n', long, default_value_t = 10)]
        per_target: usize,
    },
    /// Hydrate target IDs into full account rows
    Hydrate {
        #[clap(flatten)]
        common: CommonArgs,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RelationArg {
    Followers,
    Friends,
}

impl From<RelationArg> for RelationKind {
    fn from(arg: RelationArg) -> Self {
        match arg {
            RelationArg::Followers => RelationKind::Followers,
            RelationArg::Friends => RelationKind::Friends,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    match run().await {
        Ok(_) => process::exit(0),
        Err(err) => {
            eprintln!("{err:#}");
            process::exit(1);
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    match args.op {
        Op::Relations {
            common,
            relation,
            max_pull,
            minimal,
        } => relations::run(&common, relation.into(), minimal, max_pull).await,
        Op::Timelines { common, per_target } => timelines::run(&common, per_target).await,
        Op::Hydrate { common } => hydrate::run(&common).await,
    }
}
