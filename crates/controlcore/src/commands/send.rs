//! Command submission.

use controlcore_core::{ActionKind, Client, Command, CommandParams};

use crate::cli::{GlobalOpts, SendArgs};
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(cmd: &Command) -> String {
    [
        format!("Sent:      {} -> {}", cmd.action, cmd.sensor_id),
        format!("Station:   {} / {}", cmd.station, cmd.controller),
        format!("Value:     {} {}", cmd.value, cmd.unit),
        format!("Requestor: {}", cmd.requestor_id),
    ]
    .join("\n")
}

pub async fn handle(client: &Client, args: SendArgs, global: &GlobalOpts) -> Result<(), CliError> {
    // Reject bad input before touching the network.
    // `set-value` reads better on a command line; the wire name is `set_value`.
    let action = ActionKind::parse(&args.action.replace('-', "_"))?;
    let params = CommandParams {
        duration_seconds: args.duration,
        value: args.value,
        unit: args.unit,
    };
    params.resolve(action, "")?;

    util::connect(client, args.wait).await?;
    let reading = client.wait_for_reading(&args.sensor_id, args.wait).await?;
    tracing::debug!(
        sensor_id = %reading.sensor_id,
        station = %reading.station,
        controller = %reading.controller,
        "target located"
    );

    let command = client.send_command(&reading, action, &params)?;
    client.flush(args.wait).await?;

    let out = output::render_single(&global.output, &command, detail, |c| {
        client.command_builder().destination_topic(&reading) + " " + c.action.as_ref()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
