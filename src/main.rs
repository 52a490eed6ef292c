use git_version::git_version;

mod comm;
mod comm_fs;

mod config;
mod error;
mod host;
mod naming;
mod orchestrator;
mod prompt;
mod series;
mod settings;

use {
    crate::{
        comm::SnRst,
        config::Config,
        host::{GivenRecording, HostEvent},
        orchestrator::{EventOutcome, NamerContext, StopOutcome},
        prompt::ConsolePrompt,
        series::{display, SeriesStore},
        settings::SessionSettings,
    },
    anyhow::{bail, Context, Result},
    chrono::TimeZone,
    clap::{Parser, Subcommand},
    log::LevelFilter,
    log4rs::{
        append::console::{ConsoleAppender, Target},
        config::{Appender, Root},
        encode::pattern::PatternEncoder,
    },
    std::path::{Path, PathBuf},
};

const GIT_VERSION: &str = git_version!(fallback = "unknown");

#[derive(Parser)]
#[command(
    name = "series-namer",
    version,
    long_version = GIT_VERSION,
    about = "Names finished recordings after a series and a persistent part number"
)]
struct Cli {
    /// Extra config file (toml/yaml/json/ini), overrides ./series-namer.*
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Session settings ini, overrides `settings_path` from the config
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write default settings and an empty series table where missing
    Init,

    /// List series in display order
    List {
        /// Most recently used first (default: from settings)
        #[arg(long, conflicts_with = "by_key")]
        latest: bool,

        /// Alphabetical (default: from settings)
        #[arg(long)]
        by_key: bool,
    },

    /// Print the latest part number of a series, seeding it with 0 if new
    Latest { series: String },

    /// Overwrite the latest part number of a series
    Set { series: String, number: u64 },

    /// Print the file name a recording would get, without touching anything
    Name { series: String, number: Option<u64> },

    /// Handle a recording-stopped notification for FILE (asks on stdin)
    Stop { file: PathBuf },

    /// Show or change session settings
    Settings {
        #[command(subcommand)]
        cmd: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    Show,
    Set {
        #[arg(long)]
        is_series: Option<bool>,
        #[arg(long)]
        series_path: Option<String>,
        #[arg(long)]
        datetime_format: Option<String>,
        #[arg(long)]
        datetime_first: Option<bool>,
        #[arg(long)]
        sort_latest: Option<bool>,
    },
}

fn init_log(log4rs_file: &str) -> Result<()> {
    if Path::new(log4rs_file).is_file() {
        log4rs::init_file(log4rs_file, Default::default())
            .with_context(|| format!("log4rs config, path={}", log4rs_file))?;
        return Ok(());
    }

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {l} {m}{n}")))
        .build();

    let log_config = log4rs::config::Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Warn))?;

    log4rs::init_config(log_config)?;

    Ok(())
}

fn print_series(ctx: &NamerContext, sort_latest: bool) -> SnRst<()> {
    let entries = display::sort_for_display(ctx.store().get_series()?, sort_latest);

    for (key, entry) in entries {
        let secs = entry.timestamp.trunc() as i64;
        let nanos = (entry.timestamp.fract() * 1_000_000_000.0) as u32;
        let when = chrono::Local
            .timestamp_opt(secs, nanos)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!("{}\t{}\t{}", key, entry.number, when);
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    init_log(&config.log4rs_file)?;

    log::info!("[main] version={}, config= {:?}", GIT_VERSION, config);

    let settings_path = cli.settings.clone().unwrap_or_else(|| config.settings_path());

    let mut ctx = NamerContext::init(&settings_path, config.rename_retry()?)?;

    match cli.cmd {
        Commands::Init => {
            let (store, created) = SeriesStore::create(ctx.store().path().to_path_buf())?;
            let entries = store.get_series()?;
            println!(
                "settings: {}\nseries:   {} ({}, {} entries)",
                settings_path.display(),
                store.path().display(),
                if created { "created" } else { "exists" },
                entries.len()
            );
        }

        Commands::List { latest, by_key } => {
            let sort_latest = if latest {
                true
            } else if by_key {
                false
            } else {
                ctx.settings().sort_latest
            };
            print_series(&ctx, sort_latest)?;
        }

        Commands::Latest { series } => {
            let key = naming::normalize_series_key(&series);
            let number = ctx.store_mut().ensure(&key)?;
            println!("{}\t{}", key, number);
        }

        Commands::Set { series, number } => {
            let key = naming::normalize_series_key(&series);
            ctx.store_mut()
                .set_latest(&key, number, comm::get_sn_now_epoch_f64())?;
            println!("{}\t{}", key, number);
        }

        Commands::Name { series, number } => {
            let settings = ctx.settings();
            let key = naming::normalize_series_key(&series);
            let part_number = if settings.is_series {
                match number {
                    Some(n) => Some(n),
                    None => Some(
                        ctx.store()
                            .lookup(&key)?
                            .map(|e| e.number)
                            .unwrap_or(0)
                            .saturating_add(1),
                    ),
                }
            } else {
                None
            };

            let name = naming::gen_file_name(
                &key,
                part_number,
                &chrono::Local::now(),
                &settings.datetime_format,
                settings.datetime_first,
            )?;
            println!("{}", name);
        }

        Commands::Stop { file } => {
            let source = GivenRecording::new(file);
            let stdin = std::io::stdin();
            let mut prompt = ConsolePrompt::new(stdin.lock(), std::io::stderr());

            ctx.handle_event(HostEvent::Load, &source, &mut prompt)?;
            let outcome = ctx.handle_event(HostEvent::RecordingStopped, &source, &mut prompt)?;
            ctx.handle_event(HostEvent::Unload, &source, &mut prompt)?;

            match outcome {
                EventOutcome::Stopped(StopOutcome::Renamed { to, .. }) => {
                    println!("{}", to.display());
                }
                EventOutcome::Stopped(StopOutcome::Cancelled) => {
                    eprintln!("cancelled, recording left as is");
                }
                other => bail!("unexpected outcome: {}", other),
            }
        }

        Commands::Settings { cmd } => match cmd {
            SettingsCommands::Show => {
                print!("{}", ctx.settings().to_ini());
            }
            SettingsCommands::Set {
                is_series,
                series_path,
                datetime_format,
                datetime_first,
                sort_latest,
            } => {
                let current = ctx.settings().clone();
                let changed = SessionSettings {
                    is_series: is_series.unwrap_or(current.is_series),
                    series_path: series_path.unwrap_or(current.series_path),
                    datetime_format: datetime_format.unwrap_or(current.datetime_format),
                    datetime_first: datetime_first.unwrap_or(current.datetime_first),
                    sort_latest: sort_latest.unwrap_or(current.sort_latest),
                };

                // reject a broken format before it is persisted
                naming::format_datetime(&chrono::Local::now(), &changed.datetime_format)?;

                ctx.update(changed)?;
                print!("{}", ctx.settings().to_ini());
            }
        },
    }

    Ok(())
}
