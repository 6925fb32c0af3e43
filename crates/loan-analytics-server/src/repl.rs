//! Interactive REPL over the loan warehouse.
//!
//! Launch with `loan-analytics repl`. Lines starting with `/` are commands;
//! anything else is run as SQL. Tab completes commands, query names, views
//! and tables.

use std::path::Path;
use std::sync::Arc;

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};

use loan_analytics::catalog::all_names;
use loan_analytics::{CollectingSink, QueryExecutor, QueryResult, Table};

use crate::config::history_path;
use crate::render;
use crate::views::{ViewName, ViewRegistry};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/queries", "List predefined queries"),
    ("/sql", "Show the SQL of a predefined query"),
    ("/run", "Run a predefined query"),
    ("/view", "Render a dashboard view"),
    ("/describe", "Describe a table's columns"),
    ("/validate", "Check every table against the expected columns"),
    ("/ping", "Test the warehouse connection"),
    ("/export", "Write the last SQL result to a CSV file"),
    ("/clear-cache", "Drop cached results and reconnect"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion.
#[derive(Default)]
struct AnalyticsHelper;

fn argument_candidates(cmd: &str) -> Vec<String> {
    match cmd {
        "/run" | "/sql" => all_names().into_iter().map(str::to_string).collect(),
        "/view" => ViewName::ALL.iter().map(|v| v.as_str().to_string()).collect(),
        "/describe" => Table::ALL.iter().map(|t| t.as_str().to_string()).collect(),
        _ => Vec::new(),
    }
}

impl Completer for AnalyticsHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.starts_with('/') {
            return Ok((pos, Vec::new()));
        }

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
        let prefix_start = input.len() - args.len();
        let matches: Vec<Pair> = argument_candidates(cmd)
            .into_iter()
            .filter(|c| c.starts_with(args.trim()))
            .map(|c| Pair {
                display: c.clone(),
                replacement: format!("{c} "),
            })
            .collect();
        Ok((prefix_start, matches))
    }
}

impl Hinter for AnalyticsHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for AnalyticsHelper {}
impl Validator for AnalyticsHelper {}
impl Helper for AnalyticsHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Session state.
struct ReplState {
    executor: QueryExecutor,
    sink: CollectingSink,
    last_result: Option<Arc<QueryResult>>,
}

impl ReplState {
    fn flush_statuses(&self) {
        for status in self.sink.drain() {
            eprintln!("  {}", render::render_status(&status));
        }
    }
}

/// Run the interactive REPL.
pub async fn run(executor: QueryExecutor) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mloan-analytics v{}\x1b[0m \x1b[90m\u{2014} Loan and accounting analytics\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Type SQL to run it, \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(30)
        .build();

    let mut rl: Editor<AnalyticsHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(AnalyticsHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let hist_path = history_path();
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let sink = CollectingSink::new();
    let mut state = ReplState {
        executor: executor.with_reporter(Arc::new(sink.clone())),
        sink,
        last_result: None,
    };
    let prompt = " \x1b[36mloans>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let Some(input) = line.strip_prefix('/') else {
                    cmd_query(line, &mut state).await;
                    state.flush_statuses();
                    continue;
                };
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
                let args = args.trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "queries" => cmd_queries(&state),
                    "sql" => cmd_show_sql(args, &state),
                    "run" => cmd_run(args, &state).await,
                    "view" => cmd_view(args, &state).await,
                    "describe" => cmd_describe(args, &state).await,
                    "validate" => cmd_validate(&state).await,
                    "ping" => {
                        state.executor.test_connection().await;
                    }
                    "export" => cmd_export(args, &state),
                    "clear-cache" => {
                        state.executor.clear_all().await;
                        state.last_result = None;
                    }
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
                state.flush_statuses();
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = std::fs::create_dir_all(hist_path.parent().unwrap_or(Path::new(".")));
    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Anything not starting with '/' is executed as SQL.");
    eprintln!("  Tip: Tab completion works for commands, query names, views and tables.");
    eprintln!();
}

fn cmd_queries(state: &ReplState) {
    let queries = state.executor.available_queries();
    eprintln!();
    eprintln!("  {} predefined queries:", queries.len());
    eprintln!();
    for line in render::render_pairs(&queries).lines() {
        eprintln!("    {line}");
    }
    eprintln!();
}

fn cmd_show_sql(args: &str, state: &ReplState) {
    if args.is_empty() {
        eprintln!("  Usage: /sql <query-name>");
        return;
    }
    match state.executor.sql_for(args) {
        Ok(sql) => println!("{}", sql.trim()),
        Err(e) => eprintln!("  {e}"),
    }
}

async fn cmd_run(args: &str, state: &ReplState) {
    if args.is_empty() {
        eprintln!("  Usage: /run <query-name>");
        return;
    }
    if let Some(result) = state.executor.execute_named(args).await {
        print!("{}", render::render_table(&result.column_names(), &result.rows, result.row_count()));
    }
}

async fn cmd_query(sql: &str, state: &mut ReplState) {
    if let Some(result) = state.executor.execute_literal(sql).await {
        print!("{}", render::render_table(&result.column_names(), &result.rows, result.row_count()));
        state.last_result = Some(result);
    }
}

async fn cmd_view(args: &str, state: &ReplState) {
    let name = if args.is_empty() { "overview" } else { args };
    match ViewRegistry::render_by_name(name, &state.executor).await {
        Ok(view) => print!("{}", render::render_view(&view)),
        Err(e) => eprintln!("  {e}"),
    }
}

async fn cmd_describe(args: &str, state: &ReplState) {
    let Some(table) = Table::from_name(args) else {
        eprintln!("  Usage: /describe <historical_loans|raw_transactions|ref_accounting>");
        return;
    };
    let full_name = state.executor.catalog().namespace().qualify(table);
    match state.executor.describe_table(&full_name).await {
        Ok(columns) => {
            eprintln!();
            eprintln!("  {full_name}: {} columns", columns.len());
            for col in columns {
                eprintln!(
                    "    {:<32} {:<12} {}",
                    col.name,
                    col.data_type.as_deref().unwrap_or(""),
                    col.comment.as_deref().unwrap_or("")
                );
            }
            eprintln!();
        }
        Err(e) => eprintln!("  Could not describe {full_name}: {e}"),
    }
}

async fn cmd_validate(state: &ReplState) {
    let reports = state.executor.inspector().validate_all().await;
    eprintln!();
    for (name, report) in &reports {
        for line in render::render_table_report(name, report).lines() {
            eprintln!("  {line}");
        }
        eprintln!();
    }
}

fn cmd_export(args: &str, state: &ReplState) {
    let Some(result) = &state.last_result else {
        eprintln!("  Nothing to export. Run a SQL query first.");
        return;
    };
    let path = if args.is_empty() { "query_results.csv" } else { args };
    match loan_analytics::write_csv_file(Path::new(path), result) {
        Ok(()) => eprintln!("  Wrote {} rows to {path}", result.row_count()),
        Err(e) => eprintln!("  Export failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_completes_query_names() {
        let candidates = argument_candidates("/run");
        assert!(candidates.iter().any(|c| c == "loan_summary"));
        assert!(candidates.iter().any(|c| c == "overview"));
    }

    #[test]
    fn test_view_and_describe_candidates() {
        assert_eq!(argument_candidates("/view"), vec!["overview", "loans", "transactions"]);
        assert_eq!(argument_candidates("/describe").len(), 3);
        assert!(argument_candidates("/ping").is_empty());
    }
}
