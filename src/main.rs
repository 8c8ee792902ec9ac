//! heapstore - interactive shell over the page-based table store

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use heapstore::access::{Row, ScanSummary};
use heapstore::config::DatabaseConfig;
use heapstore::database::Database;
use heapstore::sql::{self, Statement};
use heapstore::storage::{DEFAULT_CACHE_PAGES, DEFAULT_PAGE_SIZE};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Default number of WAL lines shown by `.wal`
const DEFAULT_WAL_TAIL: usize = 50;

const HELP: &str = "Commands: .help .quit .tables .dump <table> .truncate <table> .drop <table> .wal [n]";

/// heapstore - a tiny page-based table store with a write-ahead log
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data directory
    #[arg(short = 'D', long = "data", default_value = "./data")]
    data_dir: PathBuf,

    /// Page size of table files, in bytes
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Maximum number of cached pages per table
    #[arg(long, default_value_t = DEFAULT_CACHE_PAGES)]
    cache_pages: usize,

    /// Do not fsync the WAL after catalog operations
    #[arg(long)]
    no_sync_wal: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = DatabaseConfig {
        data_dir: args.data_dir,
        page_size: args.page_size,
        cache_pages: args.cache_pages,
        sync_wal: !args.no_sync_wal,
    };
    let db = Database::open(config).context("Failed to open database")?;

    let result = repl(&db, io::stdin().lock());
    db.close()?;
    result
}

fn repl(db: &Database, input: impl BufRead) -> Result<()> {
    println!("heapstore v{} ({})", env!("CARGO_PKG_VERSION"), HELP);

    let mut buffer = String::new();
    let mut lines = input.lines();
    loop {
        print!("db> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('.') {
            buffer.clear();
            if !meta_command(db, line)? {
                break;
            }
            continue;
        }

        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(line);

        let (statements, rest) = sql::split_statements(&buffer);
        buffer = rest;
        for statement in statements {
            if let Err(e) = execute(db, &statement) {
                println!("Error: {:#}", e);
            }
        }
    }

    Ok(())
}

/// Run a `.command`; returns false when the loop should stop
fn meta_command(db: &Database, line: &str) -> Result<bool> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let arg = parts.next();

    let outcome = match (command, arg) {
        (".help", _) => {
            println!("{}", HELP);
            Ok(())
        }
        (".quit", _) => return Ok(false),
        (".tables", _) => {
            print!("{}", db.catalog().describe());
            Ok(())
        }
        (".dump", Some(table)) => db.dump(table).map(|(rows, summary)| {
            print!("{}", rows);
            warn_if_ended_early(&summary);
        }),
        (".truncate", Some(table)) => db
            .truncate_table(table)
            .map(|_| println!("OK: truncated")),
        (".drop", Some(table)) => db.drop_table(table).map(|_| println!("OK: dropped")),
        (".dump" | ".truncate" | ".drop", None) => {
            println!("Usage: {} <table>", command);
            Ok(())
        }
        (".wal", n) => {
            let n = n
                .and_then(|n| n.parse().ok())
                .unwrap_or(DEFAULT_WAL_TAIL);
            db.wal_tail(n).map(|lines| {
                for line in lines {
                    println!("{}", line);
                }
            })
        }
        _ => {
            println!("Unknown command");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        println!("Error: {:#}", e);
    }
    Ok(true)
}

fn execute(db: &Database, sql: &str) -> Result<()> {
    match sql::parse(sql)? {
        Statement::CreateTable(create) => {
            if create.if_not_exists && db.catalog().get_table(&create.name).is_some() {
                println!("Notice: table {} already exists", create.name);
                return Ok(());
            }
            db.create_table(&create.name, create.columns)?;
            println!("OK: created table {}", create.name);
        }
        Statement::InsertInto(insert) => {
            let row: Row = insert.columns.into_iter().zip(insert.values).collect();
            db.insert_row(&insert.table, &row)?;
            println!("OK: 1 row inserted");
        }
        Statement::Select(select) => {
            let result = db.select(&select)?;
            for row in &result.rows {
                println!("{}", row);
            }
            warn_if_ended_early(&result.summary);
        }
    }
    Ok(())
}

fn warn_if_ended_early(summary: &ScanSummary) {
    if summary.ended_early() {
        let pages: Vec<String> = summary
            .truncated_pages
            .iter()
            .map(|page| page.to_string())
            .collect();
        println!("Warning: scan ended early on pages [{}]", pages.join(", "));
    }
}
