//! kafka-publish - publish messages to a kafka topic

use clap::{CommandFactory, Parser};
use colored::Colorize;
use kafka07_cli::{commands, init_logging, PublishArgs};

#[tokio::main]
async fn main() {
    init_logging();

    let args = PublishArgs::parse();
    if let Err(e) = commands::publish(args).await {
        eprintln!("{}: {}", "Error".red(), e);
        if e.wants_help() {
            eprintln!("{}", PublishArgs::command().render_help());
        }
        std::process::exit(1);
    }
}
