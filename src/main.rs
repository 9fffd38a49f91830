mod cli;
mod dates;
mod dispatcher;
mod error;
mod fmt;
mod importer;
mod models;
mod notion;
mod reports;
mod resolver;
mod settings;
mod sync;

use clap::Parser;

use cli::Cli;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    if let Err(e) = cli::sync::run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
