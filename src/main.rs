use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use infermon::commands;
use infermon::core::config::MonitorConfig;

fn main() -> Result<()> {
    infermon::init_logging();

    let matches = Command::new("infermon")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Find local inference backends and watch their resource usage")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("detect")
                .about("List running inference backends with memory and CPU usage")
                .arg(json_flag()),
        )
        .subcommand(
            Command::new("port")
                .about("Identify the process listening on a TCP port")
                .arg(
                    Arg::new("port")
                        .help("Port number to look up")
                        .required(true)
                        .value_parser(clap::value_parser!(u16))
                        .index(1),
                )
                .arg(json_flag()),
        )
        .subcommand(
            Command::new("candidates")
                .about("List processes that could be monitored as a custom backend")
                .arg(
                    Arg::new("min-mb")
                        .long("min-mb")
                        .value_name("MB")
                        .help("Minimum memory footprint in MiB")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(json_flag()),
        )
        .subcommand(
            Command::new("watch")
                .about("Poll metrics continuously until Ctrl-C")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("MS")
                        .help("Base poll interval in milliseconds")
                        .value_parser(clap::value_parser!(u64).range(1..)),
                )
                .arg(
                    Arg::new("backend")
                        .short('b')
                        .long("backend")
                        .value_name("TYPE")
                        .help("Preferred backend type when several are running (e.g. ollama, vllm)"),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Monitor whatever is listening on this port")
                        .value_parser(clap::value_parser!(u16))
                        .conflicts_with("pid"),
                )
                .arg(
                    Arg::new("pid")
                        .long("pid")
                        .value_name("PID")
                        .help("Monitor a specific process")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .value_name("NAME")
                        .help("Display name for --pid")
                        .requires("pid"),
                )
                .arg(
                    Arg::new("single")
                        .long("single")
                        .help("Count only the given pid, not its bundle or children")
                        .action(ArgAction::SetTrue)
                        .requires("pid"),
                )
                .arg(json_flag()),
        )
        .subcommand(
            Command::new("once")
                .about("Collect a single metrics snapshot")
                .arg(json_flag()),
        )
        .get_matches();

    if matches.get_flag("version") {
        println!("infermon version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = MonitorConfig::load()?;

    match matches.subcommand() {
        Some(("detect", sub_matches)) => commands::detect::execute(sub_matches, &config)?,
        Some(("port", sub_matches)) => commands::port::execute(sub_matches, &config)?,
        Some(("candidates", sub_matches)) => commands::candidates::execute(sub_matches, &config)?,
        Some(("watch", sub_matches)) => commands::watch::execute(sub_matches, &config)?,
        Some(("once", sub_matches)) => commands::once::execute(sub_matches, &config)?,
        _ => {
            println!("Welcome to infermon!");
            println!("Use 'infermon --help' for more information.");
        }
    }

    Ok(())
}

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .help("Print machine-readable JSON")
        .action(ArgAction::SetTrue)
}
