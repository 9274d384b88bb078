mod commands;
mod error;

use std::path::PathBuf;

use structopt::clap::AppSettings::*;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(name = "l", visible_alias = "list", about = "List entries of an archive")]
    List {
        #[structopt(short, long, help = "Print the listing as JSON")]
        json: bool,

        #[structopt(name = "pakfile", parse(from_os_str), help = "Path to the .pak archive")]
        path: PathBuf,
    },

    #[structopt(name = "i", visible_alias = "info", about = "Show the archive header")]
    Info {
        #[structopt(name = "pakfile", parse(from_os_str), help = "Path to the .pak archive")]
        path: PathBuf,
    },

    #[structopt(
        name = "v",
        visible_alias = "validate",
        about = "Check entry ranges and decode every entry"
    )]
    Validate {
        #[structopt(name = "pakfile", parse(from_os_str), help = "Path to the .pak archive")]
        path: PathBuf,
    },

    #[structopt(
        name = "x",
        visible_alias = "extract",
        about = "Extract entries from an archive"
    )]
    Extract {
        #[structopt(
            short = "C",
            long,
            parse(from_os_str),
            default_value = ".",
            help = "Directory to extract into"
        )]
        output: PathBuf,

        #[structopt(name = "pakfile", parse(from_os_str), help = "Path to the .pak archive")]
        path: PathBuf,

        #[structopt(
            name = "names",
            help = "Entries or folders to extract [default: everything]"
        )]
        names: Vec<String>,
    },

    #[structopt(name = "cat", about = "Write one entry to standard output")]
    Cat {
        #[structopt(name = "pakfile", parse(from_os_str), help = "Path to the .pak archive")]
        path: PathBuf,

        #[structopt(name = "name", help = "Entry to print")]
        name: String,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "pak",
    about = "Inspect and extract .pak archives.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands],
)]
struct CliOpts {
    #[structopt(short, long, help = "Show verbose output", global = true)]
    verbose: bool,

    #[structopt(subcommand)]
    cmd: Commands,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "pak=debug,pak_format=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let opts = CliOpts::from_iter(wild::args_os());
    init_tracing(opts.verbose);

    let result = match opts.cmd {
        Commands::List { json, path } => commands::list(path, json),
        Commands::Info { path } => commands::info(path),
        Commands::Validate { path } => commands::validate(path, opts.verbose),
        Commands::Extract {
            output,
            path,
            names,
        } => commands::extract(path, output, names, opts.verbose),
        Commands::Cat { path, name } => commands::cat(path, name),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}
