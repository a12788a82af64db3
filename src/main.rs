//! Perk Sentry CLI
//!
//! Runs the monitor against the host desktop, or checks keyword ranking and
//! purple classification offline.

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use image::Rgb;

use perk_sentry::config::Settings;
use perk_sentry::desktop::{AbortFlag, Desktop};
use perk_sentry::journal::DecisionJournal;
use perk_sentry::PerkSentry;

fn cli() -> Command {
    Command::new("perk-sentry")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Automatic perk selection for idle tower-defense emulator windows")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .global(true)
                .help("JSON settings file; defaults are used when omitted"),
        )
        .subcommand(
            Command::new("run")
                .about("Watch the target windows and pick perks")
                .arg(
                    Arg::new("targets")
                        .long("targets")
                        .value_name("NAMES")
                        .value_delimiter(',')
                        .help("Comma-separated window titles to monitor"),
                )
                .arg(
                    Arg::new("once")
                        .long("once")
                        .action(ArgAction::SetTrue)
                        .help("Poll every target a single time and exit"),
                ),
        )
        .subcommand(
            Command::new("rank")
                .about("Show the priority of a perk text")
                .arg(Arg::new("text").required(true).value_name("TEXT"))
                .arg(
                    Arg::new("target")
                        .long("target")
                        .value_name("NAME")
                        .help("Window title whose priority list is used"),
                ),
        )
        .subcommand(
            Command::new("classify")
                .about("Check whether a background color counts as purple")
                .arg(Arg::new("r").required(true).value_parser(clap::value_parser!(u8)))
                .arg(Arg::new("g").required(true).value_parser(clap::value_parser!(u8)))
                .arg(Arg::new("b").required(true).value_parser(clap::value_parser!(u8))),
        )
        .subcommand(Command::new("config").about("Print the default settings as JSON"))
}

fn load_settings(matches: &ArgMatches) -> Result<Settings> {
    match matches.get_one::<String>("config") {
        Some(path) => Settings::load(path).with_context(|| format!("Failed to load settings from {}", path)),
        None => Ok(Settings::default()),
    }
}

fn run(sub: &ArgMatches) -> Result<()> {
    let mut settings = load_settings(sub)?;
    let targets: Vec<String> = sub
        .get_many::<String>("targets")
        .map(|names| names.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()).collect())
        .unwrap_or_default();
    settings.select_targets(&targets);

    let journal = DecisionJournal::open(&settings.journal).context("Failed to create journal files")?;
    log::info!("Log file: {}", settings.journal.verbose_path.display());

    let sentry = PerkSentry::new(settings).context("Invalid settings")?;
    let mut monitor = sentry
        .into_monitor(Desktop::detect(), journal, AbortFlag::new())
        .context("Failed to start monitor")?;
    monitor.announce();

    if sub.get_flag("once") {
        let summaries = monitor.poll_once().context("Poll failed")?;
        for summary in summaries {
            println!(
                "{}: {} selected, {} unrecognized, all purple skipped: {}",
                summary.target, summary.selections, summary.unrecognized, summary.skipped_all_purple
            );
        }
        return Ok(());
    }

    let reason = monitor.run();
    println!("Stopped: {}", reason);
    Ok(())
}

fn rank(sub: &ArgMatches) -> Result<()> {
    let settings = load_settings(sub)?;
    let sentry = PerkSentry::new(settings).context("Invalid settings")?;

    let Some(text) = sub.get_one::<String>("text") else {
        bail!("TEXT is required");
    };
    let window = match sub.get_one::<String>("target") {
        Some(name) => name.clone(),
        None => sentry
            .settings
            .targets
            .first()
            .map(|t| t.name.clone())
            .unwrap_or_default(),
    };

    let (rank, list) = sentry.rank(text, &window);
    println!("'{}' -> priority {} (list '{}', window '{}')", text, rank, list, window);
    Ok(())
}

fn classify(sub: &ArgMatches) -> Result<()> {
    let settings = load_settings(sub)?;
    let sentry = PerkSentry::new(settings).context("Invalid settings")?;

    let channel = |name: &str| sub.get_one::<u8>(name).copied().unwrap_or_default();
    let color = Rgb([channel("r"), channel("g"), channel("b")]);

    let matches = sentry.classify(color);
    if matches.is_empty() {
        println!("RGB{:?} is not purple", color.0);
    } else {
        println!("RGB{:?} is purple:", color.0);
        for m in matches {
            println!("  {:?}", m);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("run", sub)) => run(sub),
        Some(("rank", sub)) => rank(sub),
        Some(("classify", sub)) => classify(sub),
        Some(("config", _)) => {
            println!("{}", Settings::default().to_json()?);
            Ok(())
        }
        _ => bail!("Unknown command"),
    }
}
