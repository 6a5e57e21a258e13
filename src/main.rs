//! cookiekv - command-line access to a file-backed cookie jar
//!
//! Every invocation opens the jar, runs one operation and exits. Expired
//! entries are purged by whichever command reads them first.

use anyhow::Context;
use cookiekv::{EntryStore, FileStore, StoreConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Directory used when neither `--dir` nor `COOKIEKV_DIR` is given
const DEFAULT_DIR: &str = ".cookiekv";

/// A single operation requested on the command line
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Set {
        name: String,
        value: String,
        ttl: Option<i64>,
    },
    Get(String),
    Del(String),
    List { json: bool },
    Clear,
    Dump,
}

/// CLI configuration
#[derive(Debug)]
struct Config {
    /// Directory holding the blob files
    dir: PathBuf,
    /// Storage key of the collection
    key: String,
    /// Log mutations at debug level
    verbose: bool,
    command: Command,
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        match Self::parse(&args) {
            Ok(config) => config,
            Err(message) => {
                eprintln!("Error: {message}");
                print_help();
                std::process::exit(1);
            }
        }
    }

    fn parse(args: &[String]) -> Result<Self, String> {
        let mut dir = std::env::var_os("COOKIEKV_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR));
        let mut key = StoreConfig::default().storage_key;
        let mut verbose = false;
        let mut ttl = None;
        let mut json = false;
        let mut positional = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--dir" | "-d" => {
                    dir = PathBuf::from(value_of(args, i, "--dir")?);
                    i += 2;
                }
                "--key" | "-k" => {
                    key = value_of(args, i, "--key")?.to_string();
                    i += 2;
                }
                "--ttl" | "-t" => {
                    let raw = value_of(args, i, "--ttl")?;
                    ttl = Some(raw.parse().map_err(|_| format!("invalid TTL: {raw}"))?);
                    i += 2;
                }
                "--json" => {
                    json = true;
                    i += 1;
                }
                "--verbose" | "-v" => {
                    verbose = true;
                    i += 1;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-V" => {
                    println!("cookiekv version {}", cookiekv::VERSION);
                    std::process::exit(0);
                }
                other => {
                    positional.push(other.to_string());
                    i += 1;
                }
            }
        }

        let command = match positional.as_slice() {
            [cmd, name, value] if cmd == "set" => Command::Set {
                name: name.clone(),
                value: value.clone(),
                ttl,
            },
            [cmd, name] if cmd == "get" => Command::Get(name.clone()),
            [cmd, name] if cmd == "del" => Command::Del(name.clone()),
            [cmd] if cmd == "list" => Command::List { json },
            [cmd] if cmd == "clear" => Command::Clear,
            [cmd] if cmd == "dump" => Command::Dump,
            [] => return Err("missing command".to_string()),
            [cmd, ..] => return Err(format!("unknown command or wrong arguments: {cmd}")),
        };

        Ok(Self {
            dir,
            key,
            verbose,
            command,
        })
    }
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn print_help() {
    println!(
        r#"
cookiekv - Cookie-like values with TTL, stored as one blob

USAGE:
    cookiekv [OPTIONS] <COMMAND>

COMMANDS:
    set NAME VALUE       Store VALUE under NAME (default TTL: 60s)
    get NAME             Print the value of NAME, exit 1 if absent or expired
    del NAME             Remove NAME
    list                 Print every live entry
    clear                Remove every entry
    dump                 Print the raw stored blob

OPTIONS:
    -d, --dir <DIR>      Directory holding the jar (default: $COOKIEKV_DIR or .cookiekv)
    -k, --key <KEY>      Storage key of the collection (default: AllLocals)
    -t, --ttl <SECS>     TTL for `set`
        --json           JSON output for `list`
    -v, --verbose        Log operations to stderr
    -V, --version        Print version information
    -h, --help           Print this help message

EXAMPLES:
    cookiekv set session abc123 --ttl 3600
    cookiekv get session
    cookiekv list --json
"#
    );
}

fn main() -> anyhow::Result<ExitCode> {
    let config = Config::from_args();

    // Set up logging; RUST_LOG wins over --verbose
    let default_level = if config.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let backend = FileStore::open(&config.dir)
        .with_context(|| format!("cannot open jar directory {}", config.dir.display()))?;
    let store = EntryStore::with_config(
        Arc::new(backend),
        StoreConfig::default().with_storage_key(config.key.clone()),
    );
    debug!(dir = %config.dir.display(), key = %config.key, "Opened jar");

    if run(&store, config.command)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Executes one command. `Ok(false)` means "nothing found" or rejected input.
fn run(store: &EntryStore, command: Command) -> anyhow::Result<bool> {
    match command {
        Command::Set { name, value, ttl } => {
            match ttl {
                Some(ttl) => store.write_with_ttl(&name, &value, ttl),
                None => store.write(&name, &value),
            }
            if store.stats().rejected > 0 {
                eprintln!("Error: name and value must not be empty");
                return Ok(false);
            }
        }
        Command::Get(name) => match store.read(&name) {
            Some(value) => println!("{value}"),
            None => return Ok(false),
        },
        Command::Del(name) => store.delete(&name),
        Command::List { json } => {
            let entries = store.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in entries {
                    println!("{}\t{}\t{}", entry.name, entry.value, entry.ttl_seconds);
                }
            }
        }
        Command::Clear => store.clear(),
        Command::Dump => println!("{}", store.snapshot().encode()?),
    }
    Ok(true)
}
