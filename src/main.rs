use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use clap::{ArgAction, Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use crossterm::event::KeyEventKind;

use memtrend::app::App;
use memtrend::config::{Config, LiveConfig, load_config, load_config_from_path};
use memtrend::event::{Event, EventHandler};
use memtrend::format::format_bytes;
use memtrend::investigate::{self, Schedule, Stop};
use memtrend::output::report_text::session_summary;
use memtrend::output::{OutputDir, RunSettings};
use memtrend::system::{Collector, Profile, SnapshotStore};
use memtrend::{logging, ui};

#[derive(Parser)]
#[command(
    name = "memtrend",
    version,
    about = "Track unevictable memory growth on Linux and chart it live"
)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample memory on an interval, persist every snapshot and write reports.
    Investigate {
        /// Seconds between snapshots
        #[arg(short, long)]
        interval: Option<u64>,

        /// Total minutes to run
        #[arg(short, long)]
        duration: Option<u64>,

        /// Directory the investigation folder is created in
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the per-snapshot text summaries
        #[arg(long, default_value_t = false)]
        no_summaries: bool,
    },
    /// Live terminal chart of unevictable memory.
    Chart {
        /// Seconds between samples
        #[arg(short, long)]
        interval: Option<u64>,

        /// Seconds between redraws
        #[arg(long)]
        refresh: Option<u64>,

        /// Data points kept in the chart
        #[arg(long)]
        history: Option<usize>,

        /// Write JSON logs here (the terminal is taken by the chart)
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Re-run the analysis over a previous investigation directory.
    Report {
        /// A `memory_investigation_*` directory
        dir: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match &cli.command {
        Command::Chart { log_file, .. } => {
            if let Some(path) = log_file {
                logging::init_json_file(path, cli.verbose)?;
            }
        }
        _ => logging::init_stderr(cli.verbose)?,
    }

    let config = load_config_for_cli(&cli);
    config.validate().wrap_err("invalid configuration")?;

    match cli.command {
        Command::Investigate { .. } => run_investigation(&config).await,
        Command::Chart { .. } => run_chart(&config).await,
        Command::Report { dir } => run_report(&config, &dir),
    }
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    match &cli.command {
        Command::Investigate {
            interval,
            duration,
            output,
            no_summaries,
        } => {
            if let Some(secs) = interval {
                config.general.interval_secs = *secs;
            }
            if let Some(minutes) = duration {
                config.general.duration_minutes = *minutes;
            }
            if let Some(dir) = output {
                config.general.output_dir = dir.clone();
            }
            if *no_summaries {
                config.general.write_summaries = false;
            }
        }
        Command::Chart {
            interval,
            refresh,
            history,
            ..
        } => {
            if let Some(secs) = interval {
                config.live.interval_secs = *secs;
            }
            if let Some(secs) = refresh {
                config.live.refresh_secs = *secs;
            }
            if let Some(points) = history {
                config.live.history = *points;
            }
        }
        Command::Report { .. } => {}
    }

    config
}

fn print_files(out: &OutputDir) -> Result<()> {
    println!("\nFiles in {}:", out.root().display());
    for (path, size) in out.list_files()? {
        let shown = path.strip_prefix(out.root()).unwrap_or(&path);
        println!("  {:<50} {:>10}", shown.display(), format_bytes(size));
    }
    Ok(())
}

async fn run_investigation(config: &Config) -> Result<()> {
    let schedule = Schedule {
        interval: Duration::from_secs(config.general.interval_secs),
        duration: Duration::from_secs(config.general.duration_minutes * 60),
        write_summaries: config.general.write_summaries,
    };
    let out = OutputDir::create(&config.general.output_dir, Local::now())
        .wrap_err("failed to create output directory")?;
    let mut collector = Collector::new(config.limits.collect_options(Profile::Full));

    tracing::info!(
        duration_minutes = config.general.duration_minutes,
        interval_secs = config.general.interval_secs,
        dir = %out.root().display(),
        "starting memory investigation"
    );
    if !collector.is_privileged() {
        tracing::warn!("not running as root, some detailed information will be unavailable");
    }

    let (store, stop) = investigate::collect_series(&mut collector, &out, schedule).await;
    if stop == Stop::Interrupted {
        println!("Investigation interrupted after {} snapshots", store.len());
    }

    let (report, _) = investigate::write_reports(
        &out,
        &store,
        &config.thresholds,
        config.limits.report_limits(),
        schedule.run_settings(),
    )
    .wrap_err("failed to write reports")?;

    println!("{}", session_summary(&report));
    print_files(&out)
}

fn run_report(config: &Config, dir: &std::path::Path) -> Result<()> {
    let out = OutputDir::open(dir)
        .wrap_err_with(|| format!("{} is not an investigation directory", dir.display()))?;
    let store: SnapshotStore = out.load_snapshots()?.into_iter().collect();

    let (report, _) = investigate::write_reports(
        &out,
        &store,
        &config.thresholds,
        config.limits.report_limits(),
        RunSettings::default(),
    )
    .wrap_err("failed to write reports")?;

    println!("{}", session_summary(&report));
    print_files(&out)
}

async fn run_chart(config: &Config) -> Result<()> {
    let mut app = App::new(config);

    let mut terminal = ratatui::init();
    let result = chart_loop(&mut terminal, &mut app, &config.live).await;
    ratatui::restore();
    result?;

    println!("{}", session_summary(&app.analyze()));
    Ok(())
}

async fn chart_loop(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App,
    live: &LiveConfig,
) -> Result<()> {
    let mut events = EventHandler::new(
        Duration::from_secs(live.interval_secs),
        Duration::from_secs(live.refresh_secs),
    );

    terminal.draw(|frame| ui::draw(frame, app))?;

    while app.running {
        let Some(event) = events.next().await else {
            break;
        };
        let should_draw = match event {
            Event::Key(key) => {
                if key.kind == KeyEventKind::Press {
                    let action = app.map_key(key);
                    app.dispatch(action);
                    true
                } else {
                    false
                }
            }
            Event::Collect => {
                app.collect();
                true
            }
            Event::Redraw => {
                app.expire_status();
                true
            }
            Event::Resize => true,
        };
        if should_draw && app.running {
            terminal.draw(|frame| ui::draw(frame, app))?;
        }
    }

    Ok(())
}
