//! xsent - daily sentiment of posts matching a search query
//!
//! Main entry point for the xsent command-line tool.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

use xsent::chart::{self, ChartStyle};
use xsent::cli::{self, Cli, Commands, OutputFormat};
use xsent::logging::{LogConfig, init_logging};
use xsent::report::{format_daily_table, volume_sparkline};
use xsent::storage::read_csv;
use xsent::{
    CONTENT_DIVIDER_WIDTH, CompoundScorer, Config, CsvCheckpoint, EXIT_USAGE, FetchLoop,
    FetchPlan, PolarityScorer, SentimentReport, TwitterClient, XsError, format_count,
    format_error, format_number, format_score,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    init_logging(&LogConfig::from_verbosity(
        cli.quiet,
        cli.verbose,
        !cli.no_color,
    ));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(&err);
            exit_code(&err)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<XsError>() {
        Some(xs) if xs.is_recoverable() => ExitCode::from(EXIT_USAGE),
        _ => ExitCode::FAILURE,
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Fetch(args) => cmd_fetch(cli, args),
        Commands::Report(args) => cmd_report(cli, args),
        Commands::Config(args) => cmd_config(cli, args),
        Commands::Completions(args) => cmd_completions(args.clone()),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = Config::load(cli.config.as_deref())?;
    if !config.output.colors {
        colored::control::set_override(false);
    }
    Ok(config)
}

fn print_error(err: &anyhow::Error) {
    if let Some(xs) = err.downcast_ref::<XsError>() {
        let hints: Vec<&str> = xs.suggestion().into_iter().collect();
        let explanation = err
            .chain()
            .skip(1)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(": ");
        eprintln!("{}", format_error(&err.to_string(), &explanation, &hints));
    } else {
        eprintln!("{} {err:#}", "✗".red().bold());
    }
}

fn progress_spinner(cli: &Cli) -> ProgressBar {
    if cli.quiet || cli.format == OutputFormat::Json {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Authenticating...");
    pb
}

fn cmd_fetch(cli: &Cli, args: &cli::FetchArgs) -> Result<()> {
    let mut config = load_config(cli)?;
    args.apply_to(&mut config)?;
    config.validate_for_fetch()?;

    let csv_path = config.csv_path();
    let plan = FetchPlan::from_config(&config);
    let client = TwitterClient::new(&config.api)?;

    if cli.format == OutputFormat::Text && !cli.quiet {
        println!("{}", "Fetching posts...".bold().cyan());
        println!("  Query: {}", plan.query);
        println!("  Per day: {}", plan.quota);
        println!("  Output: {}", csv_path.display());
        println!();
    }

    let pb = progress_spinner(cli);
    let fetch = FetchLoop::new(
        client,
        CompoundScorer::new(),
        PolarityScorer::new(),
        CsvCheckpoint::new(&csv_path),
        plan,
    );
    let outcome = fetch.run_with_progress(|event| {
        let rollover = if event.rolled_over { " (next day)" } else { "" };
        pb.set_message(format!(
            "page {} | {} posts | until {}{rollover}",
            event.page,
            format_count(event.total_records),
            event.cursor.until_day,
        ));
    });
    pb.finish_and_clear();
    let (records, summary) = outcome.with_context(|| {
        format!(
            "fetch aborted; last checkpoint is at {}",
            csv_path.display()
        )
    })?;

    info!(
        records = summary.records,
        pages = summary.pages,
        checkpoints = summary.checkpoints,
        "Fetch complete"
    );

    if records.is_empty() {
        warn!("No matching posts, nothing to report");
        match cli.format {
            OutputFormat::Json => {
                let out = serde_json::json!({
                    "summary": summary,
                    "csv": csv_path,
                    "report": null,
                    "chart": null,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    println!("{} No matching posts found.", "!".yellow().bold());
                }
            }
        }
        return Ok(());
    }

    let report = SentimentReport::compute(&records)?;
    let chart_path = if args.no_chart {
        None
    } else {
        Some(write_chart(&config, &report)?)
    };

    match cli.format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "summary": summary,
                "csv": csv_path,
                "report": report,
                "chart": chart_path,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!(
                    "  {} Fetched {} posts over {} pages ({} reshares skipped, {} checkpoints)",
                    "✓".green(),
                    format_count(summary.records).bold(),
                    format_count(summary.pages),
                    format_count(summary.reshares_skipped),
                    summary.checkpoints,
                );
                println!("  {} Saved {}", "✓".green(), csv_path.display());
                println!();
                print_report(&report, chart_path.as_deref());
            }
        }
    }
    Ok(())
}

fn cmd_report(cli: &Cli, args: &cli::ReportArgs) -> Result<()> {
    let mut config = load_config(cli)?;
    args.apply_to(&mut config);
    config.validate_output()?;

    let csv_path: PathBuf = args.csv.clone().unwrap_or_else(|| config.csv_path());
    let records = read_csv(&csv_path)?;
    let report = SentimentReport::compute(&records)
        .with_context(|| format!("{} has no rows", csv_path.display()))?;

    let chart_path = if args.no_chart {
        None
    } else {
        Some(write_chart(&config, &report)?)
    };

    match cli.format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "csv": csv_path,
                "report": report,
                "chart": chart_path,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                print_report(&report, chart_path.as_deref());
            }
        }
    }
    Ok(())
}

fn write_chart(config: &Config, report: &SentimentReport) -> Result<PathBuf> {
    let path = chart::save_chart(
        report,
        &config.output.chart_title,
        &config.output.figures_dir,
        &ChartStyle::default(),
    )
    .context("failed to write chart")?;
    Ok(path)
}

fn print_report(report: &SentimentReport, chart_path: Option<&Path>) {
    println!(
        "{} ({} posts over {} days)",
        "Daily sentiment".bold().cyan(),
        format_number(report.total),
        report.days.len()
    );
    println!("{}", "─".repeat(CONTENT_DIVIDER_WIDTH).dimmed());
    print!("{}", format_daily_table(report));
    println!("{}", "─".repeat(CONTENT_DIVIDER_WIDTH).dimmed());

    let mean = format_score(report.overall_mean);
    let mean = if report.overall_mean > 0.0 {
        mean.green()
    } else if report.overall_mean < 0.0 {
        mean.red()
    } else {
        mean.normal()
    };
    println!("Overall mean: {}", mean.bold());
    println!(
        "Volume:       {}",
        volume_sparkline(report, CONTENT_DIVIDER_WIDTH).cyan()
    );
    if let Some(path) = chart_path {
        println!("Chart:        {}", path.display());
    }
}

fn cmd_config(cli: &Cli, args: &cli::ConfigArgs) -> Result<()> {
    if args.init {
        let path = cli
            .config
            .clone()
            .or_else(Config::user_config_path)
            .context("could not determine a config directory")?;
        if path.exists() && !args.force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
        Config::save_template(&path)?;
        println!("{} Wrote {}", "✓".green(), path.display());
        if !args.show {
            return Ok(());
        }
    }

    let config = load_config(cli)?;
    let user_path = Config::user_config_path();
    match cli.format {
        OutputFormat::Json => {
            let mut out = serde_json::json!({
                "user_config": user_path,
                "explicit_config": cli.config,
                "csv": config.csv_path(),
                "chart": config.chart_path(),
            });
            if args.show {
                out["config"] = serde_json::to_value(config.redacted())?;
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("{}", "Configuration".bold().cyan());
            if let Some(path) = &user_path {
                let state = if path.exists() { "" } else { " (not present)" };
                println!("  User config: {}{state}", path.display());
            }
            if let Some(path) = &cli.config {
                println!("  Explicit config: {}", path.display());
            }
            println!("  CSV: {}", config.csv_path().display());
            println!("  Chart: {}", config.chart_path().display());
            if args.show {
                println!();
                print!("{}", config.redacted_toml());
            }
        }
    }
    Ok(())
}

fn cmd_completions(args: cli::CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "xsent", &mut io::stdout());
    Ok(())
}
