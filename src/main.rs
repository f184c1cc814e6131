mod app;
mod cli;
mod fs_walk;
mod output;
mod search;

use std::process;

use clap::Parser;

use crate::cli::Config;

fn main() {
    env_logger::init();
    let cfg = Config::parse();
    let code = match app::run(cfg) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("phonex-grep: {err:#}");
            app::EXIT_ERROR
        }
    };
    process::exit(code);
}
