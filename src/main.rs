mod app;
mod auth;
mod cli;
mod config;
mod consts;
mod core;
mod error;
mod logging;
mod output;
mod remote;
mod store;
mod utils;

use clap::Parser;

use app::CommandContext;
use cli::Cli;
use config::{AppPaths, Config};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let config = Config::load();
    let cli = cli.with_config(&config);

    let result = CommandContext::new(&cli, &config, AppPaths::resolve())
        .and_then(|ctx| app::run(&ctx));
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
