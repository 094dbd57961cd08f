//! Convert a MongoDB JSON dump to a CSV file.

use clap::Parser;
use color_eyre::eyre::Result;

use dbtools_cli::CommonArgs;
use dbtools_shared::Tool;

#[derive(Parser, Debug)]
#[command(name = "cmongo2csv", version, about = Tool::Mongo2Csv.about(), disable_version_flag = true)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// CSV field separator.
    #[arg(short = 's', long)]
    separator: Option<String>,

    /// Write timestamps with a `Z` suffix instead of `+0000`.
    #[arg(short = 't', long)]
    tz: bool,

    /// Write plain cells instead of `ObjectId(...)` and Go-style booleans.
    #[arg(short = 'n', long = "no-mongo-types")]
    no_mongo_types: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    dbtools_cli::run(Tool::Mongo2Csv, &cli.common, |o| {
        if let Some(separator) = cli.separator {
            o.separator = separator;
        }
        o.tz |= cli.tz;
        o.mongo_types &= !cli.no_mongo_types;
    })
    .await
}
