//! Command-line and environment configuration.

use crate::error::CliError;
use clap::{ArgAction, Args, Parser};
use kafka07_client::consumer::{DEFAULT_MAX_SIZE, DEFAULT_POLLING_INTERVAL};
use kafka07_client::{ConnectionConfig, ConsumerConfig, ProducerConfig};
use kafka07_protocol::{Compression, DEFAULT_HOST, DEFAULT_PORT};
use std::time::Duration;

const ENV_HELP: &str = "You can set the host, port, topic and compression from the environment \
variables: KAFKA_HOST, KAFKA_PORT, KAFKA_TOPIC and KAFKA_COMPRESSION";

/// Broker and topic settings shared by both tools.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Set the kafka hostname
    #[arg(short = 'h', long, env = "KAFKA_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Set the kafka port
    #[arg(short, long, env = "KAFKA_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Set the kafka topic
    #[arg(short, long, env = "KAFKA_TOPIC")]
    pub topic: Option<String>,

    /// Set the partition
    #[arg(long, default_value_t = 0)]
    pub partition: i32,
}

impl ConnectionArgs {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.host.clone(), self.port)
    }

    /// Returns the topic, which has no default.
    pub fn topic(&self) -> Result<&str, CliError> {
        self.topic
            .as_deref()
            .ok_or_else(|| CliError::Config("Missing topic".to_string()))
    }
}

#[derive(Debug, Parser)]
#[command(name = "kafka-publish")]
#[command(about = "Publish messages to a kafka topic")]
#[command(version, disable_help_flag = true, after_help = ENV_HELP)]
pub struct PublishArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Set the compression method (no, gzip or snappy)
    #[arg(short, long, env = "KAFKA_COMPRESSION", default_value = "no")]
    pub compression: Compression,

    /// Message to send; without it, every line of stdin is sent
    #[arg(short, long)]
    pub message: Option<String>,

    /// Show the help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl PublishArgs {
    pub fn producer_config(&self) -> Result<ProducerConfig, CliError> {
        if !self.compression.is_available() {
            return Err(CliError::Config(format!(
                "{} compression is not available in this build",
                self.compression
            )));
        }
        Ok(ProducerConfig::new(self.connection.topic()?)
            .with_partition(self.connection.partition)
            .with_compression(self.compression))
    }
}

#[derive(Debug, Parser)]
#[command(name = "kafka-subscribe")]
#[command(about = "Print the messages of a kafka topic as they arrive")]
#[command(version, disable_help_flag = true, after_help = ENV_HELP)]
pub struct SubscribeArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Start at this byte offset instead of the earliest available
    #[arg(long)]
    pub offset: Option<i64>,

    /// Maximum bytes per fetch
    #[arg(long, default_value_t = DEFAULT_MAX_SIZE)]
    pub max_size: u32,

    /// Seconds to wait between fetches
    #[arg(long, default_value_t = DEFAULT_POLLING_INTERVAL.as_secs())]
    pub polling: u64,

    /// Show the help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl SubscribeArgs {
    pub fn consumer_config(&self) -> Result<ConsumerConfig, CliError> {
        let mut config = ConsumerConfig::new(self.connection.topic()?)
            .with_partition(self.connection.partition)
            .with_max_size(self.max_size)
            .with_polling_interval(Duration::from_secs(self.polling));
        if let Some(offset) = self.offset {
            config = config.with_offset(offset);
        }
        Ok(config)
    }
}
