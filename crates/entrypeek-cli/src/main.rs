#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]

mod commands;
mod logging;

use clap::Parser;
use commands::fetch::FetchArgs;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "entrypeek")]
#[command(author, version, about = "Print the entry file of an npm package", long_about = None)]
struct Cli {
    /// Package to fetch (`name`, `name@range`, `@scope/name@range`)
    package: String,

    /// Distribution tag selecting among exported entry points (e.g. dist-mjs)
    #[arg(long, value_name = "TAG")]
    tag: Option<String>,

    /// Extra attempts per strategy and per race
    #[arg(long, default_value_t = entrypeek_core::DEFAULT_MAX_RETRIES, value_name = "N")]
    retries: u32,

    /// Registry to race (repeatable; replaces the defaults)
    #[arg(long = "registry", value_name = "URL")]
    registries: Vec<String>,

    /// npm executable used by the package-manager strategies
    #[arg(long, value_name = "PATH")]
    npm: Option<PathBuf>,

    /// Only use the registry strategies
    #[arg(long)]
    no_package_manager: bool,

    /// Deadline for each strategy attempt
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Directory under which the temporary working directory is created
    #[arg(long, value_name = "PATH")]
    work_root: Option<PathBuf>,

    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.json);

    let args = FetchArgs {
        package: cli.package,
        tag: cli.tag,
        retries: cli.retries,
        registries: cli.registries,
        npm: cli.npm,
        no_package_manager: cli.no_package_manager,
        timeout_secs: cli.timeout,
        work_root: cli.work_root,
    };

    commands::fetch::run(args, cli.json)
}
