use std::io::{self, BufWriter, Write};
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use sheets_connector::{
    Connection, DEFAULT_SHEET_ID, PASSWORD_ENV_VAR, Row, RowQuery, Sheet, Spreadsheet,
    USER_ENV_VAR,
};
use tracing::info;

#[derive(Parser)]
#[clap(name = "sheets")]
struct Arguments {
    /// Account name.
    #[clap(short, long, env = USER_ENV_VAR)]
    user: Option<String>,
    /// Account password.
    #[clap(short, long, env = PASSWORD_ENV_VAR, hide_env_values = true)]
    password: Option<String>,
    /// Title of the spreadsheet, or its key when `--by-id` is given.
    #[clap(short, long)]
    spreadsheet: String,
    /// Treat `--spreadsheet` as a key instead of a title.
    #[clap(long)]
    by_id: bool,
    /// Create the spreadsheet or sheet if it doesn't exist.
    #[clap(long)]
    create: bool,
    /// Id or title of the sheet to operate on.
    #[clap(long, default_value = DEFAULT_SHEET_ID)]
    sheet: String,
    #[clap(long, value_enum, default_value_t = LogFormatArg::Text)]
    log_format: LogFormatArg,
    /// Increase log verbosity, may be repeated.
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for logutil::LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => logutil::LogFormat::HumanReadable,
            LogFormatArg::Json => logutil::LogFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List the sheets of the spreadsheet.
    Sheets,
    /// Print the normalized header names of the sheet.
    Headers,
    /// Print matching rows as JSON lines.
    Find {
        /// Structured query sent to the service as is.
        #[clap(long, conflicts_with = "filters")]
        query: Option<String>,
        /// Only print the first matching row.
        #[clap(long)]
        one: bool,
        /// Exact matches, as `field=value`.
        #[clap(value_parser = parse_field)]
        filters: Vec<(String, String)>,
    },
    /// Append a row.
    Insert {
        #[clap(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Update the rows matching the key fields, inserting if none match.
    Upsert {
        /// Field identifying the row, may be repeated.
        #[clap(short, long = "key", required = true)]
        keys: Vec<String>,
        #[clap(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Delete matching rows.
    Remove {
        #[clap(long, conflicts_with = "filters")]
        query: Option<String>,
        /// Delete every row when no filter is given.
        #[clap(long)]
        all: bool,
        #[clap(value_parser = parse_field)]
        filters: Vec<(String, String)>,
    },
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected `field=value`, got `{s}`")),
    }
}

fn row_query(query: Option<String>, filters: Vec<(String, String)>) -> RowQuery {
    match query {
        Some(sq) => RowQuery::structured(sq),
        None if filters.is_empty() => RowQuery::All,
        None => RowQuery::Fields(filters),
    }
}

fn main() {
    let args = Arguments::parse();
    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    logutil::configure_global_logger(level, args.log_format.into(), io::stderr);

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| runtime.block_on(inner(args)));

    if let Err(err) = result {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

async fn inner(args: Arguments) -> Result<()> {
    if let Command::Remove {
        query: None,
        all: false,
        filters,
    } = &args.command
    {
        if filters.is_empty() {
            bail!("refusing to remove every row without --all");
        }
    }

    let mut builder = Connection::builder();
    if let Some(user) = args.user {
        builder = builder.user(user);
    }
    if let Some(password) = args.password {
        builder = builder.password(password);
    }
    let conn = Arc::new(builder.build()?);

    let mut spreadsheet = if args.by_id {
        Spreadsheet::by_id(args.spreadsheet, conn)
    } else if args.create {
        Spreadsheet::open(&args.spreadsheet, conn).await?
    } else {
        Spreadsheet::by_title(&args.spreadsheet, conn)
            .await?
            .ok_or_else(|| anyhow!("no spreadsheet titled '{}'", args.spreadsheet))?
    };
    info!(id = %spreadsheet.id(), "opened spreadsheet");

    let mut stdout = BufWriter::new(io::stdout());

    if let Command::Sheets = args.command {
        for sheet in spreadsheet.sheets().await? {
            writeln!(stdout, "{}\t{}\t{}", sheet.id(), sheet.title(), sheet.len())?;
        }
        stdout.flush()?;
        return Ok(());
    }

    let mut sheet: Sheet = spreadsheet
        .get(&args.sheet, args.create)
        .await?
        .ok_or_else(|| anyhow!("no sheet with id or title '{}'", args.sheet))?;

    match args.command {
        Command::Sheets => (),
        Command::Headers => {
            for header in sheet.headers().await? {
                writeln!(stdout, "{header}")?;
            }
        }
        Command::Find {
            query,
            one,
            filters,
        } => {
            let query = row_query(query, filters);
            if one {
                if let Some(row) = sheet.find_one(&query).await? {
                    write_row(&mut stdout, &row)?;
                }
            } else {
                for row in sheet.find(&query).await? {
                    write_row(&mut stdout, &row)?;
                }
            }
        }
        Command::Insert { fields } => {
            sheet.insert(fields).await?;
        }
        Command::Upsert { keys, fields } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let inserted = sheet.upsert(fields, &keys).await?;
            writeln!(stdout, "{}", if inserted { "inserted" } else { "updated" })?;
        }
        Command::Remove { query, filters, .. } => {
            let removed = sheet.remove(&row_query(query, filters)).await?;
            writeln!(stdout, "{removed}")?;
        }
    }

    stdout.flush()?;
    Ok(())
}

fn write_row(out: &mut impl Write, row: &Row) -> Result<()> {
    serde_json::to_writer(&mut *out, row)?;
    writeln!(out)?;
    Ok(())
}
