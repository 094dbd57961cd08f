//! Convert a SQL dump to a CSV file.

use clap::Parser;
use color_eyre::eyre::Result;

use dbtools_cli::CommonArgs;
use dbtools_shared::Tool;

#[derive(Parser, Debug)]
#[command(name = "csql2csv", version, about = Tool::Sql2Csv.about(), disable_version_flag = true)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// CSV field separator.
    #[arg(short = 's', long)]
    separator: Option<String>,

    /// Write timestamps with a `Z` suffix instead of `+0000`.
    #[arg(short = 't', long)]
    tz: bool,

    /// Table to convert (defaults to the first one in the dump).
    #[arg(long)]
    table: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    dbtools_cli::run(Tool::Sql2Csv, &cli.common, |o| {
        if let Some(separator) = cli.separator {
            o.separator = separator;
        }
        o.tz |= cli.tz;
        // SQL has no ObjectId or Go-style booleans to preserve.
        o.mongo_types = false;
        o.table = cli.table;
    })
    .await
}
