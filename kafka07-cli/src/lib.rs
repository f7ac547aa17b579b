//! kafka07-cli - command-line tools for the 0.7-era Kafka broker
//!
//! - `kafka-publish` sends one message, or every line read from stdin
//! - `kafka-subscribe` prints every message of a topic partition as it arrives
//!
//! Host, port, topic and compression can also be set with `KAFKA_HOST`,
//! `KAFKA_PORT`, `KAFKA_TOPIC` and `KAFKA_COMPRESSION`. Command-line arguments
//! take precedence.

pub mod commands;
pub mod config;
pub mod error;

pub use config::{ConnectionArgs, PublishArgs, SubscribeArgs};
pub use error::CliError;

use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber, `warn` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
