//! kafka-subscribe - print the messages of a kafka topic

use clap::{CommandFactory, Parser};
use colored::Colorize;
use kafka07_cli::{commands, init_logging, SubscribeArgs};

#[tokio::main]
async fn main() {
    init_logging();

    let args = SubscribeArgs::parse();
    eprintln!("{}", "Press Ctrl+C to stop...".dimmed());
    if let Err(e) = commands::subscribe(args).await {
        eprintln!("{}: {}", "Error".red(), e);
        if e.wants_help() {
            eprintln!("{}", SubscribeArgs::command().render_help());
        }
        std::process::exit(1);
    }
}
