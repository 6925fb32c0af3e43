//! Loan Analytics entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use loan_analytics::{CollectingSink, QueryResult, StatusLevel, Table};
use loan_analytics_server::config::build_executor;
use loan_analytics_server::render;
use loan_analytics_server::views::ViewRegistry;

#[derive(Parser)]
#[command(
    name = "loan-analytics",
    about = "Loan and accounting analytics over a Databricks SQL warehouse",
    version
)]
struct Cli {
    /// Catalog holding the loan tables (default: efeld_cuj).
    /// Also reads LOAN_ANALYTICS_CATALOG.
    #[arg(long, global = true)]
    catalog: Option<String>,

    /// Schema holding the loan tables (default: loan_io).
    /// Also reads LOAN_ANALYTICS_SCHEMA.
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List predefined queries.
    Queries,

    /// Print the SQL a predefined query runs.
    ShowSql {
        /// Query name or legacy alias.
        name: String,
    },

    /// Run a predefined query.
    Run {
        /// Query name or legacy alias.
        name: String,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,

        /// Also write the result to a CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Run arbitrary SQL. The statement is sent to the warehouse unmodified.
    Sql {
        /// SQL text. Omit when using --file.
        sql: Option<String>,

        /// Read the SQL from a file.
        #[arg(long, conflicts_with = "sql")]
        file: Option<PathBuf>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,

        /// Write the result to a CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Render a dashboard view (overview, loans, transactions).
    View {
        #[arg(default_value = "overview")]
        name: String,

        /// Print the view as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Describe a table's columns.
    Describe {
        /// historical_loans, raw_transactions or ref_accounting.
        table: String,
    },

    /// Check every table against the columns the queries expect.
    Validate {
        /// Print the reports as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Test the warehouse connection.
    Ping,

    /// Serve the JSON API over HTTP.
    #[cfg(feature = "http")]
    ServeHttp {
        /// Listen address (host:port).
        #[arg(long, default_value = "127.0.0.1:3200")]
        addr: String,

        /// Bearer token for authentication.
        /// Also reads from LOAN_ANALYTICS_TOKEN env var.
        #[arg(long)]
        token: Option<String>,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   loan-analytics completions bash > ~/.local/share/bash-completion/completions/loan-analytics
    ///   loan-analytics completions zsh > ~/.zfunc/_loan-analytics
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode (default).
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let base = build_executor(cli.catalog.as_deref(), cli.schema.as_deref());
    let sink = CollectingSink::new();
    let executor = base.with_reporter(Arc::new(sink.clone()));

    let ok = match cli.command.unwrap_or(Commands::Repl) {
        Commands::Queries => {
            print!("{}", render::render_pairs(&executor.available_queries()));
            true
        }

        Commands::ShowSql { name } => {
            let sql = executor.sql_for(&name)?;
            println!("{}", sql.trim());
            true
        }

        Commands::Run { name, json, csv } => {
            let result = executor.execute_named(&name).await;
            emit_result(result.as_deref(), json, csv.as_deref())?;
            true
        }

        Commands::Sql {
            sql,
            file,
            json,
            csv,
        } => {
            let statement = match (sql, file) {
                (Some(sql), _) => sql,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("Provide SQL text or --file <path>"),
            };
            let result = executor.execute_literal(&statement).await;
            emit_result(result.as_deref(), json, csv.as_deref())?;
            true
        }

        Commands::View { name, json } => {
            let view = ViewRegistry::render_by_name(&name, &executor).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", render::render_view(&view));
            }
            true
        }

        Commands::Describe { table } => {
            let table = Table::from_name(&table).with_context(|| {
                format!("Unknown table '{table}'. Expected historical_loans, raw_transactions or ref_accounting")
            })?;
            let full_name = executor.catalog().namespace().qualify(table);
            let columns = executor.describe_table(&full_name).await?;
            println!("{full_name}: {} columns", columns.len());
            for col in columns {
                println!(
                    "  {:<32} {:<12} {}",
                    col.name,
                    col.data_type.as_deref().unwrap_or(""),
                    col.comment.as_deref().unwrap_or("")
                );
            }
            true
        }

        Commands::Validate { json } => {
            let reports = executor.inspector().validate_all().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for (name, report) in &reports {
                    println!("{}", render::render_table_report(name, report));
                }
            }
            reports.values().all(|r| r.columns.is_some())
        }

        Commands::Ping => executor.test_connection().await,

        #[cfg(feature = "http")]
        Commands::ServeHttp { addr, token } => {
            use loan_analytics_server::config::resolve_http_token;
            use loan_analytics_server::transport::HttpTransport;

            // Resolve token: CLI flag > env var
            let effective_token = resolve_http_token(token);

            tracing::info!("Loan Analytics HTTP server");
            if effective_token.is_some() {
                tracing::info!("Auth: bearer token required");
            }

            let transport = HttpTransport::new(base, effective_token);
            transport.run(&addr).await?;
            true
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "loan-analytics", &mut std::io::stdout());
            true
        }

        Commands::Repl => {
            loan_analytics_server::repl::run(base).await?;
            true
        }
    };

    let statuses = sink.drain();
    for status in &statuses {
        eprintln!("{}", render::render_status(status));
    }

    if !ok || statuses.iter().any(|s| s.level == StatusLevel::Error) {
        std::process::exit(1);
    }

    Ok(())
}

/// Print a result and optionally export it. Missing results were already reported.
fn emit_result(
    result: Option<&QueryResult>,
    json: bool,
    csv: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let Some(result) = result else {
        return Ok(());
    };

    if json {
        let body = serde_json::json!({
            "metadata": result.metadata(),
            "data": result.records(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print!(
            "{}",
            render::render_table(&result.column_names(), &result.rows, result.row_count())
        );
    }

    if let Some(path) = csv {
        loan_analytics::write_csv_file(path, result)?;
        eprintln!("Wrote {} rows to {}", result.row_count(), path.display());
    }
    Ok(())
}
