use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    thread,
};

use clap::{Parser, Subcommand};
use cupstack_core::{
    competitor_names, format_time, parse_competitor_ids, AppConfig, CompetitorStore, EventType,
    FileStore, Leaderboard, RecordStore, RunResult, Selection, TimingSession, TouchOutcome,
};
use tracing_subscriber::EnvFilter;

const GUEST_LABEL: &str = "Guest";

fn main() -> cupstack_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let backend = FileStore::open(&config.storage.data_dir)?;

    match cli.command {
        Commands::Players { action } => run_players(backend, action),
        Commands::Events => {
            list_events();
            Ok(())
        }
        Commands::Time { event, players } => run_timer(&config, backend, event, &players),
        Commands::Records { action } => run_records(backend, action),
        Commands::Ranking { event, top } => {
            run_ranking(backend, event, top.unwrap_or(config.ranking.top))
        }
    }
}

fn load_config(cli: &Cli) -> cupstack_core::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    tracing::debug!(data_dir = %config.storage.data_dir.display(), "resolved configuration");
    Ok(config)
}

fn run_players(backend: FileStore, action: PlayerCommand) -> cupstack_core::Result<()> {
    let mut competitors = CompetitorStore::open(backend)?;

    match action {
        PlayerCommand::Add { name } => match competitors.add(&name)? {
            Some(competitor) => println!("{}\t{}", competitor.id, competitor.name),
            None => tracing::warn!("competitor name is empty, nothing added"),
        },
        PlayerCommand::Remove { id } => competitors.remove(&id)?,
        PlayerCommand::List => {
            if competitors.is_empty() {
                println!("No competitors registered");
            }
            for competitor in competitors.list() {
                println!("{}\t{}", competitor.id, competitor.name);
            }
        }
    }
    Ok(())
}

fn list_events() {
    for event in EventType::ALL {
        let kind = if event.is_team() { "team" } else { "individual" };
        println!(
            "{:<12}{:<12}{:<12}min {}",
            event.key(),
            event.display_name(),
            kind,
            event.min_competitors()
        );
    }
}

fn run_timer(
    config: &AppConfig,
    backend: FileStore,
    event: EventType,
    players: &str,
) -> cupstack_core::Result<()> {
    let competitors = CompetitorStore::open(backend.clone())?;
    let mut records = RecordStore::open(backend)?;
    let selection = Selection::new(event, parse_competitor_ids(players), competitors.list())?;
    let label = if selection.is_guest() {
        GUEST_LABEL.to_string()
    } else {
        competitor_names(competitors.list(), &selection.competitor_ids)
    };

    println!("{} | {}", event.display_name(), label);
    println!("Enter: start/stop   r: retry   u: undo last save   q: quit");

    let mut session = TimingSession::new(selection, config.timer.clone()).on_frame(|elapsed| {
        print!("\r{}", format_time(elapsed));
        let _ = io::stdout().flush();
    });
    let mut last_saved: Option<String> = None;

    for line in io::stdin().lock().lines() {
        match line?.trim() {
            "q" => break,
            "r" => {
                session.reset()?;
                println!("Ready");
            }
            "u" => match last_saved.take() {
                Some(id) => {
                    records.delete(&id)?;
                    println!("Last run discarded");
                }
                None => println!("Nothing to undo"),
            },
            _ => match session.touch(&mut records)? {
                TouchOutcome::Started => println!("Running"),
                TouchOutcome::Ignored => {}
                TouchOutcome::Finished(result) => {
                    println!("\r{}  saved", format_time(result.record.time));
                    last_saved = Some(result.record.id.clone());
                    thread::sleep(config.timer.result_delay());
                    print_result(&result, &label);
                }
            },
        }
    }
    Ok(())
}

fn print_result(result: &RunResult, label: &str) {
    println!();
    println!("{} | {}", result.record.event_type.display_name(), label);
    if result.is_new_best {
        println!("New best!");
    }
    println!("{}", format_time(result.record.time));
    if let Some(best) = result.best.as_ref().filter(|_| !result.is_new_best) {
        println!("Best: {}", format_time(best.time));
    }
    println!("r: retry   q: quit");
}

fn run_records(backend: FileStore, action: RecordCommand) -> cupstack_core::Result<()> {
    let competitors = CompetitorStore::open(backend.clone())?;
    let mut records = RecordStore::open(backend)?;

    match action {
        RecordCommand::List { event } => {
            let listed: Vec<_> = match event {
                Some(event) => records.list_by_event(event),
                None => records.list().iter().collect(),
            };
            if listed.is_empty() {
                println!("No records");
            }
            for record in listed {
                println!(
                    "{}\t{:<12}{:>10}\t{}",
                    record.id,
                    record.event_type.key(),
                    format_time(record.time),
                    participants(competitors.list(), &record.competitor_ids)
                );
            }
        }
        RecordCommand::Delete { id } => records.delete(&id)?,
        RecordCommand::Clear { event } => match event {
            Some(event) => records.clear_by_event(event)?,
            None => records.clear_all()?,
        },
    }
    Ok(())
}

fn run_ranking(
    backend: FileStore,
    only: Option<EventType>,
    top: usize,
) -> cupstack_core::Result<()> {
    let competitors = CompetitorStore::open(backend.clone())?;
    let records = RecordStore::open(backend)?;
    let board = Leaderboard::new(records.list(), competitors.list());

    if only.is_none() {
        println!("Overall (first places)");
        let standings = board.overall_standings();
        if standings.is_empty() {
            println!("  No records");
        }
        for (rank, standing) in standings.iter().enumerate() {
            println!("  {:>2}. {:<20}{}", rank + 1, standing.name, standing.first_places);
        }
        println!();
    }

    let events = only.map_or_else(|| EventType::ALL.to_vec(), |event| vec![event]);
    for event in events {
        println!("{}", event.display_name());
        let entries = board.best_by_competitor_set(event);
        if entries.is_empty() {
            println!("  No records");
        }
        for (rank, entry) in entries.iter().take(top).enumerate() {
            println!(
                "  {:>2}. {:<30}{:>10}",
                rank + 1,
                board.competitor_names(entry.competitor_ids.as_slice()),
                format_time(entry.time)
            );
        }
        println!();
    }
    Ok(())
}

fn participants(competitors: &[cupstack_core::Competitor], ids: &[String]) -> String {
    if ids.is_empty() {
        GUEST_LABEL.to_string()
    } else {
        competitor_names(competitors, ids)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Cup stacking stopwatch and leaderboard", long_about = None)]
struct Cli {
    /// Directory holding the competitor and record files.
    #[arg(long, env = "CUPSTACK_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,
    /// JSON configuration file.
    #[arg(long, env = "CUPSTACK_CONFIG", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage registered competitors.
    Players {
        #[command(subcommand)]
        action: PlayerCommand,
    },
    /// List the event types.
    Events,
    /// Time runs for an event. Press Enter to start and stop.
    Time {
        /// Event key, e.g. `3-3-3` or `doubles`.
        event: EventType,
        /// Comma separated competitor ids. Leave empty for a guest run.
        #[arg(short, long, default_value = "")]
        players: String,
    },
    /// Inspect or delete stored runs.
    Records {
        #[command(subcommand)]
        action: RecordCommand,
    },
    /// Show the overall and per-event leaderboards.
    Ranking {
        /// Only show this event.
        #[arg(short, long)]
        event: Option<EventType>,
        /// Entries per event leaderboard.
        #[arg(long)]
        top: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum PlayerCommand {
    /// Register a competitor.
    Add { name: String },
    /// Remove a competitor by id.
    Remove { id: String },
    /// List competitors in registration order.
    List,
}

#[derive(Subcommand, Debug)]
enum RecordCommand {
    /// List stored runs.
    List {
        #[arg(short, long)]
        event: Option<EventType>,
    },
    /// Delete one run by id.
    Delete { id: String },
    /// Delete every run, or only those of one event.
    Clear {
        #[arg(short, long)]
        event: Option<EventType>,
    },
}
