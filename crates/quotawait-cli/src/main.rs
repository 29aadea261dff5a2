//! quotawait - quota-aware runner for a coding assistant

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use clap::Parser;
use colored::Colorize;
use quotawait_cli::commands::{Cli, Commands, ConfigCommands, ResumeCommands};
use quotawait_cli::context::AppContext;
use quotawait_cli::display::{colorize, display_resume_list, display_schedule, display_task, TerminalSink};
use quotawait_features::quota::{detect_notice, parse_quota_notice, QuotaParse};
use quotawait_features::resume::{run_waiter, AvailabilityCheck, WaiterOutcome};
use quotawait_features::session::{ActivityLog, RunOutcome, SessionRunner, TaskSource};
use quotawait_features::stream::{read_capped_line, LineRead, StreamClassifier, MAX_LINE_BYTES};
use quotawait_protocol::{ProbeOutcome, EXIT_FAILURE, EXIT_QUOTA_EXHAUSTED, EXIT_SUCCESS};
use quotawait_telemetry::{init_subscriber, TelemetryConfig};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, BufReader};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            EXIT_FAILURE
        }
    };

    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> Result<i32> {
    let app = AppContext::load(cli.config.as_deref())?;

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        app.config.logging.level.clone()
    };
    let mut telemetry = TelemetryConfig::new(level, app.config.logging.json_output);
    if matches!(
        cli.command,
        Some(Commands::Resume {
            command: ResumeCommands::Wait { .. }
        })
    ) {
        telemetry = telemetry.for_log_file();
    }
    init_subscriber(&telemetry);

    if !app.config.display.colors {
        colored::control::set_override(false);
    }

    match cli.command {
        Some(Commands::Run {
            prompt,
            prompt_file,
            continue_with,
            no_schedule,
        }) => {
            let source = task_source(Commands::prompt_text(&prompt), prompt_file, continue_with)?;
            run_session(&app, source, !no_schedule).await
        }
        Some(Commands::Classify { file }) => run_classify(&app, file.as_deref()).await,
        Some(Commands::When { notice, now }) => run_when(&app, &notice, now.as_deref()),
        Some(Commands::Probe) => run_probe(&app).await,
        Some(Commands::Resume { command }) => run_resume(&app, command).await,
        Some(Commands::Config { command }) => run_config(&app, command),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            Ok(EXIT_FAILURE)
        }
    }
}

fn task_source(
    prompt: Option<String>,
    prompt_file: Option<PathBuf>,
    continue_with: Option<String>,
) -> Result<TaskSource> {
    match (prompt, prompt_file, continue_with) {
        (_, _, Some(context)) => Ok(TaskSource::Continuation(context)),
        (_, Some(path), None) => Ok(TaskSource::File(path)),
        (Some(prompt), None, None) => Ok(TaskSource::Inline(prompt)),
        (None, None, None) => bail!("No prompt given; pass it as arguments or with --prompt-file"),
    }
}

async fn run_session(app: &AppContext, source: TaskSource, schedule_resume: bool) -> Result<i32> {
    let log = if app.config.display.activity_log {
        match ActivityLog::create(&app.config.activity_dir(), Local::now()) {
            Ok(log) => Some(log),
            Err(e) => {
                tracing::warn!(error = %e, "Activity log disabled");
                None
            }
        }
    } else {
        None
    };
    let mut sink = TerminalSink::new(log);

    println!("{} {}", "Running:".cyan().bold(), source.to_string().dimmed());
    if let Some(log) = sink.log() {
        println!("{} {}", "Activity log:".cyan(), log.path().display().to_string().dimmed());
    }

    let runner = SessionRunner::new(app.runner_context(schedule_resume));
    let outcome = runner.run(&source, &mut sink).await?;

    println!();
    match &outcome {
        RunOutcome::Completed => {
            println!("{} {}", "✓".green().bold(), "Assistant run completed".green());
        }
        RunOutcome::QuotaExhausted { schedule, task, .. } => {
            println!("{}", "Assistant quota exhausted".magenta().bold());
            display_schedule(schedule);
            match task {
                Some(task) => {
                    println!();
                    println!("{} {}", "Resume task:".cyan().bold(), task.id.yellow());
                    println!(
                        "{}",
                        format!("Follow it with 'quotawait resume show {}'", task.id).dimmed()
                    );
                }
                None => println!("{}", "Resume scheduling disabled (--no-schedule)".dimmed()),
            }
        }
        RunOutcome::Failed { reason, .. } => {
            eprintln!("{}: {}", "Failed".red().bold(), reason);
        }
    }

    Ok(outcome.exit_code())
}

async fn run_classify(app: &AppContext, file: Option<&Path>) -> Result<i32> {
    let input: Box<dyn AsyncRead + Unpin> = match file {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let classifier = StreamClassifier::new(app.config.display.preview_chars);
    let calculator = app.calculator();
    let mut reader = BufReader::new(input);
    let mut buf = Vec::new();
    let (mut lines, mut notices) = (0usize, 0usize);

    loop {
        let read = read_capped_line(&mut reader, &mut buf, MAX_LINE_BYTES).await?;
        if read == LineRead::Eof {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        lines += 1;

        let (event, record) = classifier.process_read(&line, read);
        println!("{}", colorize(&record));

        if let Some(notice) = event.notice_candidate().and_then(detect_notice) {
            notices += 1;
            let schedule = calculator.calculate(&notice, Utc::now());
            println!(
                "{}",
                format!(
                    "  ⏳ quota notice on line {}: resets at {} ({})",
                    lines, schedule.reset_instant, schedule.zone
                )
                .magenta()
                .bold()
            );
        }
    }

    println!();
    println!(
        "{} lines, {} quota {}",
        lines,
        notices,
        if notices == 1 { "notice" } else { "notices" }
    );
    Ok(EXIT_SUCCESS)
}

fn parse_now(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(epoch) = value.trim().parse::<i64>() {
        return Utc
            .timestamp_opt(epoch, 0)
            .single()
            .ok_or_else(|| anyhow!("Timestamp out of range: {}", value));
    }
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid --now value '{}' (expected RFC 3339 or unix seconds)", value))
}

fn run_when(app: &AppContext, notice: &str, now: Option<&str>) -> Result<i32> {
    let now = match now {
        Some(value) => parse_now(value)?,
        None => Utc::now(),
    };

    let notice = match parse_quota_notice(notice) {
        QuotaParse::Notice(notice) => notice,
        QuotaParse::NotAQuotaMessage => {
            eprintln!("{}", "Not a quota notice".yellow());
            return Ok(EXIT_FAILURE);
        }
    };

    let schedule = app.calculator().calculate(&notice, now);
    display_schedule(&schedule);
    println!("  {:<14} {}", "Wait seconds", schedule.wait_seconds);
    Ok(EXIT_SUCCESS)
}

async fn run_probe(app: &AppContext) -> Result<i32> {
    println!("{}", "Probing assistant availability...".cyan().bold());

    match app.probe().check().await {
        ProbeOutcome::Available => {
            println!("{} {}", "✓".green().bold(), "Assistant is available".green());
            Ok(EXIT_SUCCESS)
        }
        ProbeOutcome::StillExhausted { notice } => {
            println!("{}", "Quota still exhausted".magenta().bold());
            display_schedule(&app.calculator().calculate(&notice, Utc::now()));
            Ok(EXIT_QUOTA_EXHAUSTED)
        }
        ProbeOutcome::UnknownFailure { reason } => {
            eprintln!("{}: {}", "Probe failed".red().bold(), reason);
            Ok(EXIT_FAILURE)
        }
    }
}

async fn run_resume(app: &AppContext, command: ResumeCommands) -> Result<i32> {
    let scheduler = app.scheduler();

    match command {
        ResumeCommands::List => {
            display_resume_list(&scheduler.list()?);
        }
        ResumeCommands::Show { task_id, lines } => {
            let summary = scheduler.get(&task_id)?;
            let tail = scheduler.read_log_tail(&task_id, lines)?;
            display_task(&summary, &tail);
        }
        ResumeCommands::Cancel { task_id } => {
            let task = scheduler.cancel(&task_id)?;
            println!("{} {}", "Cancelled:".green().bold(), task.id.yellow());
        }
        ResumeCommands::Prune => {
            let removed = scheduler.prune()?;
            if removed.is_empty() {
                println!("{}", "Nothing to prune.".dimmed());
            } else {
                for id in &removed {
                    println!("{} {}", "Removed:".green(), id);
                }
            }
        }
        ResumeCommands::Run { task_id } => {
            let settings = app.waiter_settings().with_echo(true);
            return waiter_exit(run_waiter(&scheduler, &task_id, &settings, &app.probe()).await?);
        }
        ResumeCommands::Wait { task_id } => {
            let settings = app.waiter_settings();
            return waiter_exit(run_waiter(&scheduler, &task_id, &settings, &app.probe()).await?);
        }
    }
    Ok(EXIT_SUCCESS)
}

fn waiter_exit(outcome: WaiterOutcome) -> Result<i32> {
    match outcome {
        WaiterOutcome::Resumed { .. } => Ok(EXIT_SUCCESS),
        WaiterOutcome::Unavailable { outcome } => {
            eprintln!("{}: {}", "Assistant still unavailable".red().bold(), outcome);
            Ok(EXIT_FAILURE)
        }
    }
}

fn run_config(app: &AppContext, command: ConfigCommands) -> Result<i32> {
    match command {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(&app.config)?);
        }
        ConfigCommands::Path => match &app.config_path {
            Some(path) => println!("{}", path.display()),
            None => println!("{}", "No configuration file found; using defaults".dimmed()),
        },
    }
    Ok(EXIT_SUCCESS)
}
