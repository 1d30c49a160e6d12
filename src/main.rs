use std::path::PathBuf;
use std::process;
use clap::Parser;
use lang_graph_trainer::{Config, Error, Pipeline};
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;

/// Learn which language a word belongs to from labeled examples.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON run file, defaults are used for every missing key
    config: Option<PathBuf>,

    /// Log reinforcement and normalization details
    #[arg(short, long)]
    verbose: bool,
}

fn main() {

    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO })
        .with_target(false)
        .init();

    let params = match Config::new(args.config.as_deref()) {
        Ok(config) => config.get_params(),
        Err(e) => fail(e),
    };
    info!("{}", params);

    match Pipeline::run(&params) {
        Ok(report) => print!("{}", report),
        Err(e) => fail(e),
    }
}

fn fail(e: Error) -> ! {
    match std::error::Error::source(&e) {
        Some(source) => error!("{}: {}", e, source),
        None => error!("{}", e),
    }
    process::exit(1);
}
