//! Command execution.

use crate::config::{PublishArgs, SubscribeArgs};
use crate::error::CliError;
use kafka07_client::{Connector, Consumer, Message, Producer};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Runs `kafka-publish`.
pub async fn publish(args: PublishArgs) -> Result<(), CliError> {
    let config = args.producer_config()?;
    let mut producer = Producer::new(args.connection.connection_config(), config);

    if let Some(message) = args.message {
        producer.push(message).await?;
        return producer.close().await.map_err(CliError::from);
    }

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = publish_lines(&mut producer, stdin) => {
            let sent = result?;
            tracing::debug!("published {} messages", sent);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("interrupted");
        }
    }

    producer.close().await?;
    Ok(())
}

/// Publishes each line of `input`, trimmed, until end of input.
///
/// Returns the number of messages sent.
pub async fn publish_lines<C, R>(producer: &mut Producer<C>, input: R) -> Result<usize, CliError>
where
    C: Connector,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut sent = 0;
    while let Some(line) = lines.next_line().await? {
        producer.push(line.trim().to_string()).await?;
        sent += 1;
    }
    Ok(sent)
}

/// Runs `kafka-subscribe`.
pub async fn subscribe(args: SubscribeArgs) -> Result<(), CliError> {
    let config = args.consumer_config()?;
    let mut consumer = Consumer::new(args.connection.connection_config(), config);

    let result = tokio::select! {
        result = consumer.poll_loop(print_messages) => result.map_err(CliError::from),
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("interrupted");
            Ok(())
        }
    };

    consumer.close().await?;
    result
}

fn print_messages(messages: Vec<Message>) {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    // a closed stdout is not worth stopping the consumer for
    let _ = write_messages(&mut out, &messages);
}

/// Writes each payload on its own line.
pub fn write_messages<W: Write>(out: &mut W, messages: &[Message]) -> std::io::Result<()> {
    for message in messages {
        out.write_all(&message.payload)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}
