use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use beastmode::app::{self, App, Mode};
use beastmode::config::Config;
use beastmode::event::{AppEvent, EventHandler};
use beastmode::session::battle::ReflectionPolicy;
use beastmode::session::question::PracticeSupply;
use beastmode::store::json_store::JsonStore;
use beastmode::store::report_store::ReportStore;

#[derive(Parser)]
#[command(name = "beastmode", version, about = "Gamified study sessions: attack, defense and war")]
struct Cli {
    #[arg(long, help = "Directory holding the battle store")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Timed MCQ battle with confidence ratings
    Attack {
        #[arg(short, long, help = "Time limit in minutes")]
        minutes: Option<u32>,

        #[arg(short, long, help = "Number of questions")]
        questions: Option<usize>,

        #[arg(long, help = "Refuse to leave a missed question without a reflection")]
        require_reflection: bool,
    },
    /// Guided deep-study session
    Defense,
    /// Full-length mock exam
    War {
        #[arg(short, long, help = "Exam duration in minutes")]
        minutes: Option<u32>,
    },
    /// Aggregate stats and achievements
    Stats,
    /// Past reports, newest first
    History {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Write all reports to a JSON file
    Export { path: PathBuf },
    /// Replace the history with a previously exported file
    Import { path: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("could not read config, using defaults: {e}");
        Config::default()
    });
    if !Config::config_path().exists()
        && let Err(e) = config.save()
    {
        warn!("could not write default config: {e}");
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.display().to_string();
    }

    let backend = JsonStore::with_base_dir(config.data_path())?;
    let mut store = ReportStore::open(backend);

    let mode = match cli.command {
        Command::Attack {
            minutes,
            questions,
            require_reflection,
        } => {
            if let Some(minutes) = minutes {
                config.time_limit_minutes = minutes;
            }
            if let Some(questions) = questions {
                config.target_questions = questions;
            }
            if require_reflection {
                config.reflection_policy = ReflectionPolicy::Required;
            }
            Mode::Attack
        }
        Command::Defense => Mode::Defense,
        Command::War { minutes } => {
            if let Some(minutes) = minutes {
                config.war_duration_minutes = minutes;
            }
            Mode::War
        }
        Command::Stats => {
            print_lines(&app::render_stats(&store));
            return Ok(());
        }
        Command::History { limit } => {
            print_lines(&app::render_history(&store, limit));
            return Ok(());
        }
        Command::Export { path } => {
            store.export(&path)?;
            println!("Exported {} reports to {}", store.all().len(), path.display());
            return Ok(());
        }
        Command::Import { path } => {
            let count = store.import(&path)?;
            println!("Imported {count} reports from {}", path.display());
            return Ok(());
        }
    };
    config.validate();

    let mut app = App::new(config, store, mode, Box::new(PracticeSupply::new()));
    run(&mut app)
}

fn run(app: &mut App) -> Result<()> {
    let events = EventHandler::new(Duration::from_secs(1));
    info!(step = app.current_step(), "session started");
    print_lines(&app.screen());
    prompt()?;

    while !app.should_quit {
        match events.next()? {
            AppEvent::Input(line) => {
                print_lines(&app.handle_line(&line));
                if !app.should_quit {
                    prompt()?;
                }
            }
            AppEvent::Tick => {
                let lines = app.tick();
                if !lines.is_empty() {
                    println!();
                    print_lines(&lines);
                    prompt()?;
                }
            }
            AppEvent::Eof => {
                app.shutdown();
                break;
            }
        }
    }
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}
