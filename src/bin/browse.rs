//! Browser binary entry point.
//!
//! Loads the backend's paper list, optionally runs one ingest and/or
//! recommendation request, and then either prints the filtered list once or
//! drops into an interactive REPL.
//!
//! # Examples
//!
//! Print the stored papers, newest first:
//! ```bash
//! browse --api-base http://127.0.0.1:8000
//! ```
//!
//! Ingest and filter in one go, as JSON:
//! ```bash
//! browse --ingest "graph neural networks" --max-results 10 --year-min 2019 --format json
//! ```
//!
//! Interactive mode:
//! ```bash
//! browse --interactive
//! ```

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paper_browser::{
    api::{
        http::{BackendConfig, HttpBackend},
        BackendApi, IngestRequest, RecommendRequest,
    },
    query::{Criteria, SortKey, YearBounds},
    session::{Notice, Session},
    view::{self, Command, OutputFormat},
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Terminal client for the paper recommender backend
#[derive(Parser, Debug)]
#[command(
    name = "browse",
    version,
    about = "Ingest, recommend and browse research papers",
    long_about = "Browse the papers held by the recommender backend. Papers can be pulled in \
                  by ingestion or recommendation, then filtered, sorted and inspected.

EXAMPLES:
  List stored papers:
    browse

  Ingest, then show only recent papers as JSON:
    browse --ingest \"graph neural networks\" --year-min 2019 --format json

  Recommendations by an author, sorted by title:
    browse --recommend \"protein folding\" --author jumper --sort title

  Interactive mode:
    browse --interactive"
)]
struct Args {
    /// Backend base URL
    #[arg(long, value_name = "URL", env = "PAPER_API_BASE", default_value = paper_browser::DEFAULT_API_BASE)]
    api_base: String,

    /// Number of papers fetched by the list endpoint
    #[arg(long, value_name = "N", default_value_t = paper_browser::DEFAULT_LIST_LIMIT)]
    list_limit: usize,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Ingest papers matching this query before browsing
    #[arg(long, value_name = "QUERY")]
    ingest: Option<String>,

    /// Maximum number of papers to ingest
    #[arg(long, value_name = "N")]
    max_results: Option<usize>,

    /// Fetch recommendations for this query before browsing
    #[arg(long, value_name = "QUERY")]
    recommend: Option<String>,

    /// Number of recommendations to fetch
    #[arg(long, value_name = "K")]
    k: Option<usize>,

    /// Only show papers whose title contains this text
    #[arg(long, value_name = "TEXT")]
    title: Option<String>,

    /// Only show papers whose authors contain this text
    #[arg(long, value_name = "TEXT")]
    author: Option<String>,

    /// Hide papers published before this year (inclusive)
    #[arg(long, value_name = "YEAR")]
    year_min: Option<i32>,

    /// Hide papers published after this year (inclusive)
    #[arg(long, value_name = "YEAR")]
    year_max: Option<i32>,

    /// Sort order: newest, oldest or title
    #[arg(long, value_name = "KEY", default_value = "newest")]
    sort: String,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Enable interactive REPL mode
    #[arg(long, short = 'i')]
    interactive: bool,

    /// Logging verbosity level
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

impl Args {
    fn criteria(&self) -> Criteria {
        Criteria {
            title_search: self.title.clone().unwrap_or_default(),
            author_search: self.author.clone().unwrap_or_default(),
            year_bounds: YearBounds::new(self.year_min, self.year_max),
            sort_key: SortKey::from(self.sort.as_str()),
        }
    }
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

/// Await `fut` while showing a spinner on stderr.
async fn with_spinner<F: Future>(message: &str, fut: F) -> F::Output {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));

    let output = fut.await;
    spinner.finish_and_clear();
    output
}

/// Print a notice; failures go to stderr, and so does everything in JSON mode
/// so stdout stays parseable.
fn report(notice: &Notice, format: OutputFormat) {
    if notice.is_failure() || format == OutputFormat::Json {
        eprintln!("{}", notice);
    } else {
        println!("{}", notice);
    }
}

/// Render the current projection
fn render_list<B: BackendApi>(session: &Session<B>, format: OutputFormat) -> Result<String> {
    let visible = session.visible();
    match format {
        OutputFormat::Table => Ok(format!(
            "{}\n{}",
            view::format_table(&visible, session.store(), session.criteria()),
            view::format_status(session.store(), session.criteria(), visible.len())
        )),
        OutputFormat::Json => view::format_json(&visible).with_context(|| "Failed to serialize papers to JSON"),
    }
}

fn print_list<B: BackendApi>(session: &Session<B>, format: OutputFormat) {
    match render_list(session, format) {
        Ok(out) => println!("{}", out),
        Err(e) => eprintln!("Error rendering papers: {:#}", e),
    }
}

fn recommend_request<B: BackendApi>(session: &Session<B>, query: String, k: Option<usize>) -> RecommendRequest {
    let criteria = session.criteria();
    RecommendRequest::new(query, k)
        .with_years(criteria.year_bounds.min, criteria.year_bounds.max)
        .with_author(Some(criteria.author_search.clone()))
}

/// Re-render the detail panel after a store change, or say it closed.
fn refresh_detail<B: BackendApi>(session: &mut Session<B>, was_open: bool) {
    if !was_open {
        return;
    }
    let criteria = session.criteria().clone();
    match session.current() {
        Some(paper) => println!("{}", view::format_detail(paper, &criteria)),
        None => println!("Detail view closed: the paper is no longer in the list."),
    }
}

/// Run interactive REPL mode
async fn run_interactive<B: BackendApi>(mut session: Session<B>, mut format: OutputFormat) -> Result<()> {
    println!("Interactive Paper Browser");
    println!("{}", view::HELP);
    println!();
    print_list(&session, format);

    let mut rl = DefaultEditor::new().with_context(|| "Failed to create readline editor")?;

    loop {
        let readline = rl.readline("Papers> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line).ok(); // Ignore errors from adding to history

                let command = match Command::parse(line) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };
                debug!("Command: {:?}", command);

                let was_open = session.selection().is_open();
                match command {
                    Command::Ingest { query, max_results } => {
                        let request = IngestRequest::new(query, max_results);
                        let notice = with_spinner("Ingesting...", session.submit_ingest(request)).await;
                        report(&notice, format);
                        print_list(&session, format);
                        refresh_detail(&mut session, was_open);
                    }
                    Command::Recommend { query, k } => {
                        let request = recommend_request(&session, query, k);
                        let notice = with_spinner("Searching...", session.submit_recommend(request)).await;
                        report(&notice, format);
                        print_list(&session, format);
                        refresh_detail(&mut session, was_open);
                    }
                    Command::Refresh => {
                        let notice = with_spinner("Loading papers...", session.load_initial()).await;
                        report(&notice, format);
                        print_list(&session, format);
                        refresh_detail(&mut session, was_open);
                    }
                    Command::Title(term) => {
                        session.set_title_search(term);
                        print_list(&session, format);
                    }
                    Command::Author(term) => {
                        session.set_author_search(term);
                        print_list(&session, format);
                    }
                    Command::Years(bounds) => {
                        session.set_year_bounds(bounds);
                        print_list(&session, format);
                    }
                    Command::Sort(sort_key) => {
                        session.set_sort_key(sort_key);
                        print_list(&session, format);
                    }
                    Command::Reset => {
                        session.reset_criteria();
                        print_list(&session, format);
                    }
                    Command::Open(id) => {
                        if session.select(id.clone()) {
                            refresh_detail(&mut session, true);
                        } else {
                            eprintln!("No paper with ID {} in the list", id);
                        }
                    }
                    Command::Close => {
                        session.close_detail();
                        println!("Detail view closed");
                    }
                    Command::List => print_list(&session, format),
                    Command::Format(new_format) => {
                        format = new_format;
                        println!("Set output format to {:?}", format);
                    }
                    Command::Help => println!("{}", view::HELP),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                error!("Error reading input: {}", err);
                break;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level);

    // Validate arguments
    if let (Some(min), Some(max)) = (args.year_min, args.year_max) {
        if min > max {
            anyhow::bail!(
                "Invalid year range: --year-min ({}) cannot be greater than --year-max ({})",
                min,
                max
            );
        }
    }
    if args.list_limit == 0 {
        anyhow::bail!("--list-limit must be a positive integer");
    }

    let backend = HttpBackend::new(BackendConfig {
        base_url: args.api_base.clone(),
        timeout_secs: args.timeout_secs,
        ..BackendConfig::default()
    })
    .with_context(|| format!("Failed to set up backend client for {}", args.api_base))?;

    info!("Using {}", backend.name());

    let mut session = Session::new(backend, args.list_limit);
    session.set_criteria(args.criteria());

    let notice = with_spinner("Loading papers...", session.load_initial()).await;
    report(&notice, args.format);

    if let Some(query) = &args.ingest {
        let request = IngestRequest::new(query.clone(), args.max_results);
        let notice = with_spinner("Ingesting...", session.submit_ingest(request)).await;
        report(&notice, args.format);
    }

    if let Some(query) = &args.recommend {
        let request = recommend_request(&session, query.clone(), args.k);
        let notice = with_spinner("Searching...", session.submit_recommend(request)).await;
        report(&notice, args.format);
    }

    if args.interactive {
        run_interactive(session, args.format).await?;
    } else {
        let out = render_list(&session, args.format)?;
        println!("{}", out);
    }

    Ok(())
}
