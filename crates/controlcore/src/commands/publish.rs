//! Raw publish.

use controlcore_core::Client;

use crate::cli::{GlobalOpts, PublishArgs};
use crate::error::CliError;

use super::util;

pub async fn handle(client: &Client, args: PublishArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if args.topic.is_empty() || args.topic.contains(['+', '#']) {
        return Err(CliError::Validation {
            field: "topic".into(),
            reason: format!("'{}' is not a publishable topic", args.topic),
        });
    }

    util::connect(client, args.wait).await?;
    client.publish(&args.topic, args.payload.into_bytes());
    client.flush(args.wait).await?;

    if !global.quiet {
        eprintln!("Published to {}", args.topic);
    }
    Ok(())
}
