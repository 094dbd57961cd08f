//! Convert a CSV file to a SQL dump.

use clap::Parser;
use color_eyre::eyre::Result;

use dbtools_cli::CommonArgs;
use dbtools_shared::Tool;

#[derive(Parser, Debug)]
#[command(name = "ccsv2sql", version, about = Tool::Csv2Sql.about(), disable_version_flag = true)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// CSV field separator.
    #[arg(short = 's', long)]
    separator: Option<String>,

    /// Database to `USE` before the table statements.
    #[arg(short = 'd', long)]
    db: Option<String>,

    /// Leave out the comment header.
    #[arg(short = 'n', long = "no-comments")]
    no_comments: bool,

    /// Table name (defaults to the input file name).
    #[arg(long)]
    table: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    dbtools_cli::run(Tool::Csv2Sql, &cli.common, |o| {
        if let Some(separator) = cli.separator {
            o.separator = separator;
        }
        if cli.db.is_some() {
            o.db = cli.db;
        }
        o.comments &= !cli.no_comments;
        o.table = cli.table;
    })
    .await
}
