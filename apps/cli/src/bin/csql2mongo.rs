//! Convert a SQL dump to a MongoDB JSON dump.

use clap::Parser;
use color_eyre::eyre::Result;

use dbtools_cli::CommonArgs;
use dbtools_shared::Tool;

#[derive(Parser, Debug)]
#[command(name = "csql2mongo", version, about = Tool::Sql2Mongo.about(), disable_version_flag = true)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Write timestamps with a `Z` suffix instead of `+0000`.
    #[arg(short = 't', long)]
    tz: bool,

    /// Write plain JSON values instead of `$oid`/`$date` wrappers.
    #[arg(short = 'n', long = "no-mongo-types")]
    no_mongo_types: bool,

    /// Write a JSON array instead of one document per line.
    #[arg(short = 'a', long)]
    array: bool,

    /// Table to convert (defaults to the first one in the dump).
    #[arg(long)]
    table: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    dbtools_cli::run(Tool::Sql2Mongo, &cli.common, |o| {
        o.tz |= cli.tz;
        o.mongo_types &= !cli.no_mongo_types;
        o.array |= cli.array;
        o.table = cli.table;
    })
    .await
}
