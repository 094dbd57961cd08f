//! Convert a CSV file to a MongoDB JSON dump.

use clap::Parser;
use color_eyre::eyre::Result;

use dbtools_cli::CommonArgs;
use dbtools_shared::Tool;

#[derive(Parser, Debug)]
#[command(name = "ccsv2mongo", version, about = Tool::Csv2Mongo.about(), disable_version_flag = true)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// CSV field separator.
    #[arg(short = 's', long)]
    separator: Option<String>,

    /// Write timestamps with a `Z` suffix instead of `+0000`.
    #[arg(short = 't', long)]
    tz: bool,

    /// Write plain JSON values instead of `$oid`/`$date` wrappers.
    #[arg(short = 'n', long = "no-mongo-types")]
    no_mongo_types: bool,

    /// Write a JSON array instead of one document per line.
    #[arg(short = 'a', long)]
    array: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    dbtools_cli::run(Tool::Csv2Mongo, &cli.common, |o| {
        if let Some(separator) = cli.separator {
            o.separator = separator;
        }
        o.tz |= cli.tz;
        o.mongo_types &= !cli.no_mongo_types;
        o.array |= cli.array;
    })
    .await
}
