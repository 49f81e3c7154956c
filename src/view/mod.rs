//! Terminal rendering and the interactive command grammar.
//!
//! Rendering turns a projection into a table (or JSON) and a single paper
//! into a detail panel. Title and author cells are emphasized where they match
//! the active search terms, using the highlight engine.

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use thiserror::Error;

use crate::highlight::{highlight, Segment};
use crate::models::{Paper, PaperId};
use crate::query::{Criteria, SortKey, YearBounds};
use crate::store::{Partition, RecordStore};

const TITLE_WIDTH: usize = 60;
const AUTHORS_WIDTH: usize = 40;

const EMPHASIS_ON: &str = "\x1b[1;33m";
const EMPHASIS_OFF: &str = "\x1b[0m";

/// Output format for paper lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-friendly table with highlighted matches
    Table,
    /// Machine-readable JSON
    Json,
}

/// Errors from parsing an interactive command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("Unknown command: {0}. Type /help for available commands.")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Invalid year range: {0} is after {1}")]
    InvalidYearRange(i32, i32),
}

/// Result type for command parsing.
pub type ViewResult<T> = Result<T, ViewError>;

/// A parsed interactive command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ingest { query: String, max_results: Option<usize> },
    Recommend { query: String, k: Option<usize> },
    Title(String),
    Author(String),
    Years(YearBounds),
    Sort(SortKey),
    Reset,
    Open(PaperId),
    Close,
    List,
    Refresh,
    Format(OutputFormat),
    Help,
}

pub const HELP: &str = "\
Commands:
  <text>              - Filter titles by <text> (same as /title <text>)
  /ingest QUERY [N]   - Ingest up to N papers matching QUERY
  /recommend QUERY [K]- Get K recommendations for QUERY
  /title [TEXT]       - Filter by title (no TEXT clears)
  /author [TEXT]      - Filter by author (no TEXT clears)
  /year MIN MAX       - Filter by publication year (use - for an open side)
  /year clear         - Clear year filter
  /sort KEY           - Sort by newest, oldest or title
  /reset              - Clear all filters and sorting
  /open ID            - Show details for paper ID
  /close              - Close the detail view
  /list               - Show the current list
  /refresh            - Reload the paper list from the backend
  /format table|json  - Choose output format
  /help               - Show this help
  Ctrl+D or Ctrl+C    - Exit";

impl Command {
    /// Parse one line of REPL input. The caller strips blank lines.
    pub fn parse(line: &str) -> ViewResult<Self> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Title(line.to_string()));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        match name {
            "ingest" => {
                let (query, max_results) = split_trailing_number(args)?;
                if query.is_empty() {
                    return Err(ViewError::Usage("/ingest QUERY [N]"));
                }
                Ok(Command::Ingest { query, max_results })
            }
            "recommend" => {
                let (query, k) = split_trailing_number(args)?;
                if query.is_empty() {
                    return Err(ViewError::Usage("/recommend QUERY [K]"));
                }
                Ok(Command::Recommend { query, k })
            }
            "title" => Ok(Command::Title(args.to_string())),
            "author" => Ok(Command::Author(args.to_string())),
            "year" => parse_years(args).map(Command::Years),
            "sort" => {
                if args.is_empty() {
                    return Err(ViewError::Usage("/sort newest|oldest|title"));
                }
                Ok(Command::Sort(SortKey::from(args)))
            }
            "reset" => Ok(Command::Reset),
            "open" => {
                if args.is_empty() || args.contains(char::is_whitespace) {
                    return Err(ViewError::Usage("/open ID"));
                }
                Ok(Command::Open(PaperId::new(args)))
            }
            "close" => Ok(Command::Close),
            "list" => Ok(Command::List),
            "refresh" => Ok(Command::Refresh),
            "format" => match args {
                "table" => Ok(Command::Format(OutputFormat::Table)),
                "json" => Ok(Command::Format(OutputFormat::Json)),
                _ => Err(ViewError::Usage("/format table|json")),
            },
            "help" => Ok(Command::Help),
            _ => Err(ViewError::UnknownCommand(format!("/{}", name))),
        }
    }
}

/// Split `"some query 10"` into the query and a trailing positive count.
fn split_trailing_number(args: &str) -> ViewResult<(String, Option<usize>)> {
    if let Some((head, last)) = args.rsplit_once(char::is_whitespace) {
        if last.chars().all(|c| c.is_ascii_digit()) {
            return match last.parse::<usize>() {
                Ok(n) if n > 0 => Ok((head.trim().to_string(), Some(n))),
                _ => Err(ViewError::InvalidNumber(last.to_string())),
            };
        }
    }
    Ok((args.to_string(), None))
}

fn parse_years(args: &str) -> ViewResult<YearBounds> {
    const USAGE: &str = "/year MIN MAX  or  /year clear";
    let parts: Vec<&str> = args.split_whitespace().collect();
    match parts.as_slice() {
        ["clear"] => Ok(YearBounds::default()),
        [min, max] => {
            let min = parse_year_side(min)?;
            let max = parse_year_side(max)?;
            if let (Some(lo), Some(hi)) = (min, max) {
                if lo > hi {
                    return Err(ViewError::InvalidYearRange(lo, hi));
                }
            }
            Ok(YearBounds::new(min, max))
        }
        _ => Err(ViewError::Usage(USAGE)),
    }
}

fn parse_year_side(raw: &str) -> ViewResult<Option<i32>> {
    if raw == "-" {
        return Ok(None);
    }
    raw.parse::<i32>()
        .map(Some)
        .map_err(|_| ViewError::InvalidNumber(raw.to_string()))
}

/// Render segments with ANSI emphasis on matches.
pub fn emphasize(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        if segment.matched {
            out.push_str(EMPHASIS_ON);
            out.push_str(&segment.text);
            out.push_str(EMPHASIS_OFF);
        } else {
            out.push_str(&segment.text);
        }
    }
    out
}

/// Cut `text` to at most `max` characters, marking the cut with "...".
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Which partition(s) a record came from, for the table's source column.
fn source_label(store: &RecordStore, paper: &Paper) -> &'static str {
    let in_ingested = store.partition(Partition::Ingested).iter().any(|p| p.id == paper.id);
    let in_recommended = store.partition(Partition::Recommended).iter().any(|p| p.id == paper.id);
    match (in_ingested, in_recommended) {
        (true, true) => "both",
        (true, false) => "ingested",
        (false, true) => "recommended",
        (false, false) => "",
    }
}

/// Format a projection as a table.
pub fn format_table(papers: &[&Paper], store: &RecordStore, criteria: &Criteria) -> String {
    if papers.is_empty() {
        return if store.any_loading() {
            "Loading papers...".to_string()
        } else {
            "No papers to display.".to_string()
        };
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Authors").add_attribute(Attribute::Bold),
        Cell::new("Year").add_attribute(Attribute::Bold),
        Cell::new("Source").add_attribute(Attribute::Bold),
    ]);

    for (idx, paper) in papers.iter().enumerate() {
        let title = truncate(&paper.title, TITLE_WIDTH);
        let authors = truncate(paper.authors.as_deref().unwrap_or_default(), AUTHORS_WIDTH);

        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&paper.id),
            Cell::new(emphasize(&highlight(&title, &criteria.title_search))),
            Cell::new(emphasize(&highlight(&authors, &criteria.author_search))),
            Cell::new(paper.display_year()),
            Cell::new(source_label(store, paper)),
        ]);
    }

    table.to_string()
}

/// Format a projection as pretty JSON.
pub fn format_json(papers: &[&Paper]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(papers)
}

/// Format the detail panel for one paper.
pub fn format_detail(paper: &Paper, criteria: &Criteria) -> String {
    let rule = "═".repeat(80);
    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("ID: {}\n", paper.id));
    out.push_str(&format!(
        "Title: {}\n",
        emphasize(&highlight(&paper.title, &criteria.title_search))
    ));
    out.push_str(&format!(
        "Authors: {}\n",
        emphasize(&highlight(paper.display_authors(), &criteria.author_search))
    ));
    out.push_str(&format!("Published: {}\n", paper.display_year()));
    if let Some(arxiv_id) = &paper.arxiv_id {
        out.push_str(&format!("arXiv: {}\n", arxiv_id));
    }
    if let Some(abstract_text) = &paper.abstract_text {
        out.push_str(&format!("\nAbstract:\n{}\n", abstract_text));
    }
    if let Some(url) = &paper.source_url {
        out.push_str(&format!("\nView full paper: {}\n", url));
    }
    out.push_str(&rule);
    out
}

/// One-line summary of the store and active criteria.
pub fn format_status(store: &RecordStore, criteria: &Criteria, shown: usize) -> String {
    let mut parts = vec![format!(
        "Showing {} of {} papers ({} ingested, {} recommended)",
        shown,
        store.len(),
        store.partition(Partition::Ingested).len(),
        store.partition(Partition::Recommended).len()
    )];
    parts.push(format!("sort: {}", criteria.sort_key));
    if !criteria.title_search.is_empty() {
        parts.push(format!("title~{:?}", criteria.title_search));
    }
    if !criteria.author_search.is_empty() {
        parts.push(format!("author~{:?}", criteria.author_search));
    }
    let bounds = criteria.year_bounds;
    if !bounds.is_unbounded() {
        let side = |y: Option<i32>| y.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        parts.push(format!("years: {}..{}", side(bounds.min), side(bounds.max)));
    }
    parts.join(" | ")
}
