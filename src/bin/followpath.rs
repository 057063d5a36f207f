use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    process,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use followpath::{
    FollowPathError, PathFinder, SearchAlgorithm, SearchConfig, StoreConnector,
    batch::{BatchOrchestrator, read_rows, write_outcomes},
    schema::{ensure_schema, graph_counts, insert_follow, upsert_profile},
    store::SqliteConnector,
};
use rusqlite::Connection;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "followpath", version)]
#[command(about = "Find follow chains between accounts", long_about = None)]
struct Cli {
    /// SQLite follow-graph database
    #[arg(long, env = "FOLLOWPATH_DB", default_value = "followpath.db", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the follow-graph tables
    Init,
    /// Load `follower,followed` username pairs from a CSV file
    Import {
        #[arg(long)]
        input: PathBuf,
    },
    /// Shortest follow chains from ORIGIN to TARGET
    Shortest(QueryArgs),
    /// Every follow chain from ORIGIN to TARGET within the depth bound
    All(QueryArgs),
    /// Enrich a CSV of accounts with their chains to one target
    Batch(BatchArgs),
    /// Profile and follow counts
    Status,
}

#[derive(Args)]
struct QueryArgs {
    origin: String,
    target: String,
    /// Maximum accounts per chain, both ends included
    #[arg(long, env = "MAX_SEARCH_DEPTH", default_value_t = followpath::config::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    /// Expand each layer concurrently (may omit some shortest chains)
    #[arg(long)]
    parallel: bool,
    /// Concurrent neighbor fetches per layer
    #[arg(long, env = "FAN_OUT")]
    fan_out: Option<usize>,
    /// Stop expanding a chain once it reaches the target
    #[arg(long)]
    stop_at_target: bool,
}

#[derive(Args)]
struct BatchArgs {
    #[arg(long)]
    input: PathBuf,
    /// Output CSV, stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, env = "TARGET_USERNAME")]
    target: String,
    #[arg(long, default_value = followpath::batch::DEFAULT_USERNAME_COLUMN)]
    username_column: String,
    #[arg(long, default_value_t = followpath::config::DEFAULT_BATCH_MAX_DEPTH)]
    max_depth: usize,
    #[arg(long, env = "SEARCH_TIMEOUT_SECONDS", default_value_t = followpath::config::DEFAULT_TASK_TIMEOUT_SECS)]
    timeout_secs: u64,
    #[arg(long, env = "BATCH_CONCURRENCY", default_value_t = followpath::config::DEFAULT_BATCH_CONCURRENCY)]
    concurrency: usize,
    #[arg(long, default_value = "shortest")]
    algorithm: SearchAlgorithm,
    /// Concurrent neighbor fetches per layer for `level_parallel`
    #[arg(long, env = "FAN_OUT")]
    fan_out: Option<usize>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("followpath=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let result = match cli.command {
        Command::Init => init(&cli.db),
        Command::Import { input } => import(&cli.db, &input),
        Command::Status => status(&cli.db),
        Command::Shortest(args) => query(&cli.db, args, false).await,
        Command::All(args) => query(&cli.db, args, true).await,
        Command::Batch(args) => batch(&cli.db, args).await,
    };
    if let Err(err) = result {
        match err {
            FollowPathError::InvalidInput(_) | FollowPathError::StoreUnavailable(_) => {
                eprintln!("error: {err}");
                process::exit(2);
            }
            other => {
                eprintln!("command failed: {other}");
                process::exit(1);
            }
        }
    }
}

fn open_writable(db: &Path) -> Result<Connection, FollowPathError> {
    let conn = Connection::open(db).map_err(|e| FollowPathError::store_unavailable(e.to_string()))?;
    ensure_schema(&conn)?;
    Ok(conn)
}

fn init(db: &Path) -> Result<(), FollowPathError> {
    open_writable(db)?;
    println!("initialized {}", db.display());
    Ok(())
}

fn import(db: &Path, input: &Path) -> Result<(), FollowPathError> {
    let conn = open_writable(db)?;
    let file = File::open(input)
        .map_err(|e| FollowPathError::invalid_input(format!("{}: {e}", input.display())))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| FollowPathError::query(e.to_string()))?;
    let mut imported = 0usize;
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| FollowPathError::invalid_input(format!("csv row: {e}")))?;
        let (Some(follower), Some(followed)) = (record.get(0), record.get(1)) else {
            skipped += 1;
            continue;
        };
        if follower.is_empty() || followed.is_empty() || follower == followed {
            warn!(follower, followed, "skipping follow row");
            skipped += 1;
            continue;
        }
        let follower_id = upsert_profile(&tx, follower)?;
        let followed_id = upsert_profile(&tx, followed)?;
        insert_follow(&tx, follower_id, followed_id)?;
        imported += 1;
    }
    tx.commit()
        .map_err(|e| FollowPathError::query(e.to_string()))?;
    info!(imported, skipped, "import finished");
    println!("imported={imported} skipped={skipped}");
    Ok(())
}

fn status(db: &Path) -> Result<(), FollowPathError> {
    if !db.exists() {
        return Err(FollowPathError::store_unavailable(format!(
            "database {} does not exist",
            db.display()
        )));
    }
    let conn = Connection::open(db).map_err(|e| FollowPathError::store_unavailable(e.to_string()))?;
    let counts = graph_counts(&conn)?;
    println!("profiles={} follows={}", counts.profiles, counts.follows);
    Ok(())
}

/// Opening the store once up front turns an unusable database into a fatal
/// error instead of an empty answer.
async fn probe(db: &Path) -> Result<SqliteConnector, FollowPathError> {
    let connector = SqliteConnector::new(db);
    connector.connect().await?;
    Ok(connector)
}

async fn query(db: &Path, args: QueryArgs, exhaustive: bool) -> Result<(), FollowPathError> {
    let mut config = SearchConfig::default()
        .with_max_depth(args.max_depth)
        .with_expand_past_target(!args.stop_at_target);
    if args.parallel {
        config = config.with_algorithm(SearchAlgorithm::LevelParallel);
    }
    if let Some(fan_out) = args.fan_out {
        config = config.with_fan_out(fan_out);
    }
    config.validate()?;
    let finder = PathFinder::new(probe(db).await?, config);
    let response = if exhaustive {
        finder
            .find_all_paths(&args.origin, &args.target, args.max_depth)
            .await
    } else {
        finder
            .find_shortest_paths(&args.origin, &args.target, args.max_depth)
            .await
    };
    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| FollowPathError::internal(e.to_string()))?;
    println!("{json}");
    Ok(())
}

async fn batch(db: &Path, args: BatchArgs) -> Result<(), FollowPathError> {
    let mut config = SearchConfig::default()
        .with_batch_max_depth(args.max_depth)
        .with_task_timeout(Duration::from_secs(args.timeout_secs))
        .with_batch_concurrency(args.concurrency)
        .with_algorithm(args.algorithm);
    if let Some(fan_out) = args.fan_out {
        config = config.with_fan_out(fan_out);
    }
    config.validate()?;
    let file = File::open(&args.input)
        .map_err(|e| FollowPathError::invalid_input(format!("{}: {e}", args.input.display())))?;
    let input = read_rows(file)?;
    let orchestrator = BatchOrchestrator::new(probe(db).await?, config)
        .with_username_column(args.username_column);
    let report = orchestrator.run(input.rows, &args.target).await;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| FollowPathError::internal(format!("{}: {e}", path.display())))?;
            write_outcomes(file, &input.headers, &report.outcomes)?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_outcomes(&mut handle, &input.headers, &report.outcomes)?;
            handle
                .flush()
                .map_err(|e| FollowPathError::internal(e.to_string()))?;
        }
    }
    let summary = report.summary;
    eprintln!(
        "rows={} with_paths={} empty={} failed={} timed_out={}",
        summary.total, summary.with_paths, summary.empty, summary.failed, summary.timed_out
    );
    Ok(())
}
