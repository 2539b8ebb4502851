use mysql_utils::config::{default_config_path, load_config};
use mysql_utils::{Config, Connection, DbError, MySqlConfig, Result, StatementType};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: mysql-utils [--config FILE] [--sqlite PATH] [--json] SQL...

Runs each SQL statement in order against one connection.

Options:
  --config FILE   read connection settings from a TOML file
  --sqlite PATH   use a SQLite database file (or :memory:) instead of MySQL
  --json          print result rows as JSON lines
  -h, --help      show this help

Without --sqlite or --config, settings come from the default config file if
it exists, otherwise from MYSQL_HOST, MYSQL_PORT, MYSQL_USER, MYSQL_PASSWORD
and MYSQL_DATABASE.";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    sqlite: Option<String>,
    json: bool,
    help: bool,
    statements: Vec<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> std::result::Result<Args, String> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().ok_or("--config needs a file argument")?;
                parsed.config = Some(PathBuf::from(value));
            }
            "--sqlite" => {
                parsed.sqlite = Some(args.next().ok_or("--sqlite needs a path argument")?);
            }
            "--json" => parsed.json = true,
            "-h" | "--help" => parsed.help = true,
            "--" => parsed.statements.extend(args.by_ref()),
            flag if flag.starts_with("--") => return Err(format!("unknown option: {}", flag)),
            _ => parsed.statements.push(arg),
        }
    }

    if !parsed.help && parsed.statements.is_empty() {
        return Err("no SQL statement given".to_string());
    }
    Ok(parsed)
}

/// Initialize tracing subscriber with stderr output; stdout carries results.
fn init_logging(config: Option<&Config>) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| config.and_then(Config::log_filter).map(String::from))
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn read_config(args: &Args) -> Result<Option<Config>> {
    if let Some(path) = &args.config {
        return load_config(path).map(Some);
    }
    match default_config_path() {
        Some(path) if args.sqlite.is_none() && path.is_file() => load_config(path).map(Some),
        _ => Ok(None),
    }
}

fn open_connection(args: &Args, config: Option<&Config>) -> Result<Connection> {
    if let Some(path) = &args.sqlite {
        return if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open_sqlite(path)
        };
    }
    match config {
        Some(config) => Connection::from_config(config),
        None => Connection::connect_mysql(&MySqlConfig::from_env()?),
    }
}

fn run_statement(conn: &mut Connection, sql: &str, json: bool, out: &mut impl Write) -> Result<()> {
    let kind = StatementType::from_sql(sql);
    debug!(?kind, "running statement");

    if !kind.returns_rows() {
        let affected = conn.execute(sql)?;
        writeln!(out, "{} row(s) affected", affected)?;
        return Ok(());
    }

    let mut rows = conn.query(sql)?;
    let columns = rows.columns().to_vec();
    if !json {
        writeln!(out, "{}", columns.join("\t"))?;
    }

    for row in &mut rows {
        let row = row?;
        if json {
            let object: serde_json::Map<String, serde_json::Value> = columns
                .iter()
                .cloned()
                .zip(row.iter().map(|v| v.to_json()))
                .collect();
            writeln!(out, "{}", serde_json::to_string(&object)?)?;
        } else {
            let fields: Vec<String> = row.iter().map(ToString::to_string).collect();
            writeln!(out, "{}", fields.join("\t"))?;
        }
    }
    info!(rows = rows.rows_fetched(), "query finished");
    Ok(())
}

fn run(args: &Args, config: Option<&Config>) -> Result<()> {
    let mut conn = open_connection(args, config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for sql in &args.statements {
        run_statement(&mut conn, sql, args.json, &mut out)?;
        if let Some(report) = conn.last_warnings()? {
            eprintln!("{}", report);
        }
    }
    out.flush()?;
    conn.close()
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("mysql-utils: {}\n\n{}", message, USAGE);
            return ExitCode::from(2);
        }
    };
    if args.help {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    let config = match read_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mysql-utils: {}", e);
            return ExitCode::from(1);
        }
    };
    init_logging(config.as_ref());

    match run(&args, config.as_ref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mysql-utils: {}", e);
            if let DbError::Query { code: Some(code), .. } = &e {
                debug!(code, "statement failed");
            }
            ExitCode::from(1)
        }
    }
}
