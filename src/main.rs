use clap::{Arg, ArgAction, Command};

mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn cli() -> Command {
    Command::new("bugs")
        .version(VERSION)
        .about("Bugs - concurrent turtle graphics interpreter")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("check")
                .about("Parse a Bugs program and report syntax errors")
                .arg(
                    Arg::new("file")
                        .short('f')
                        .long("file")
                        .value_name("FILE")
                        .help("Bugs program to check")
                        .required(true),
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .action(ArgAction::SetTrue)
                        .help("Only report errors"),
                ),
        )
        .subcommand(
            Command::new("run")
                .about("Load a Bugs program and run its bugs to completion")
                .arg(
                    Arg::new("file")
                        .short('f')
                        .long("file")
                        .value_name("FILE")
                        .help("Bugs program to run")
                        .required(true),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("CONFIG")
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("delay")
                        .short('d')
                        .long("delay")
                        .value_name("MILLIS")
                        .value_parser(clap::value_parser!(u64))
                        .help("Delay between rounds in milliseconds"),
                )
                .arg(
                    Arg::new("steps")
                        .short('s')
                        .long("steps")
                        .value_name("ROUNDS")
                        .value_parser(clap::value_parser!(u64))
                        .help("Release at most this many rounds, then stop"),
                )
                .arg(
                    Arg::new("paused")
                        .long("paused")
                        .action(ArgAction::SetTrue)
                        .help("Start paused and step rounds from standard input"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the final world snapshot as JSON"),
                ),
        )
}

fn main() {
    let matches = cli().get_matches();

    let outcome = match matches.subcommand() {
        Some(("check", sub_matches)) => commands::check::run(sub_matches),
        Some(("run", sub_matches)) => commands::run::run(sub_matches),
        _ => {
            println!("Bugs v{}", VERSION);
            println!("Use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
