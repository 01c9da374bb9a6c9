use std::io::{Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use proctop::action::Action;
use proctop::app::App;
use proctop::config::{self, Config, load_config, load_config_from_path};
use proctop::event::{Event, EventHandler};
use proctop::format::{elapsed_time, percent};
use proctop::logging;
use proctop::system::collector::{Collector, CpuConvention};
use proctop::system::snapshot::SystemSnapshot;
use proctop::ui;
use proctop::ui::process_table::{COLUMNS, row_cells};

#[derive(Parser)]
#[command(name = "proctop", about = "TUI process monitor reading Linux procfs")]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refresh rate in milliseconds
    #[arg(long)]
    refresh_rate: Option<u64>,

    /// Procfs mount point
    #[arg(long)]
    proc_root: Option<PathBuf>,

    /// Cpu utilization convention: interval, cumulative
    #[arg(long)]
    cpu_convention: Option<String>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long)]
    log_level: Option<String>,

    /// Print one snapshot and exit instead of starting the TUI.
    #[arg(long, default_value_t = false)]
    once: bool,

    /// With --once, print JSON instead of a text table.
    #[arg(long, default_value_t = false, requires = "once")]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);

    if !config.logging.file.is_empty() {
        logging::init_file_logging(Path::new(&config.logging.file), &config.logging.level)?;
    }

    let collector = Collector::new(config.sources.paths(), config.general.cpu_convention())?;
    tracing::info!(
        proc_root = %config.sources.proc_root.display(),
        convention = collector.convention().label(),
        "starting"
    );

    if cli.once {
        return run_once(collector, &config, cli.json).await;
    }

    let mut app = App::new(collector, &config)?;
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let result = run(&mut terminal, &mut app, &config).await;

    ratatui::restore();

    result
}

async fn run(terminal: &mut ratatui::DefaultTerminal, app: &mut App, config: &Config) -> Result<()> {
    let tick_rate = Duration::from_millis(config.general.refresh_rate_ms.max(1));
    let mut events = EventHandler::new(tick_rate);

    terminal.draw(|frame| ui::draw(frame, app))?;

    while app.running {
        let Some(event) = events.next().await else {
            break;
        };
        match event {
            Event::Key(key) => {
                if key.kind == crossterm::event::KeyEventKind::Press {
                    let action = app.map_key(key);
                    if action == Action::None {
                        continue;
                    }
                    app.dispatch(action)?;
                }
            }
            Event::Tick => app.refresh_data()?,
            Event::Resize => {}
        }
        terminal.draw(|frame| ui::draw(frame, app))?;
    }

    Ok(())
}

async fn run_once(mut collector: Collector, config: &Config, json: bool) -> Result<()> {
    let mut snapshot = collector.refresh()?;
    if collector.convention() == CpuConvention::Interval {
        tokio::time::sleep(Duration::from_millis(config.general.refresh_rate_ms.max(1))).await;
        snapshot = collector.refresh()?;
    }
    if config.general.max_processes > 0 {
        snapshot.processes.truncate(config.general.max_processes);
    }

    let mut out = stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &snapshot)?;
        writeln!(out)?;
    } else {
        write_text(&mut out, &snapshot)?;
    }
    Ok(())
}

fn write_text(out: &mut impl Write, snapshot: &SystemSnapshot) -> std::io::Result<()> {
    writeln!(out, "OS:      {}", snapshot.os_name)?;
    writeln!(out, "Kernel:  {}", snapshot.kernel)?;
    writeln!(out, "CPU:     {}%", percent(snapshot.cpu_utilization))?;
    writeln!(out, "Memory:  {}%", percent(snapshot.memory_utilization))?;
    writeln!(
        out,
        "Procs:   {} total, {} running",
        snapshot.total_processes, snapshot.running_processes
    )?;
    writeln!(out, "Up:      {}", elapsed_time(snapshot.uptime_seconds))?;
    writeln!(out)?;

    let [pid, user, cpu, ram, time, command] = COLUMNS;
    writeln!(out, "{pid:>7} {user:<10} {cpu:>7} {ram:>8} {time:>10} {command}")?;
    for process in &snapshot.processes {
        let [pid, user, cpu, ram, time, command] = row_cells(process);
        writeln!(out, "{pid:>7} {user:<10} {cpu:>7} {ram:>8} {time:>10} {command}")?;
    }
    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> config::Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(rate) = cli.refresh_rate {
        config.general.refresh_rate_ms = rate;
    }
    if let Some(ref root) = cli.proc_root {
        config.sources.proc_root = root.clone();
    }
    if let Some(ref convention) = cli.cpu_convention {
        config.general.cpu_convention = convention.clone();
    }
    if let Some(ref path) = cli.log_file {
        config.logging.file = path.display().to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    config
}
