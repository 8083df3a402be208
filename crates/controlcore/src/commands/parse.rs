//! Offline sensor id decomposition.

use controlcore_core::SensorIdentifier;

use crate::cli::{GlobalOpts, ParseArgs};
use crate::error::CliError;
use crate::output;

fn detail(id: &SensorIdentifier) -> String {
    let show = |s: &str| if s.is_empty() { "-".to_owned() } else { s.to_owned() };
    [
        format!("Location:   {}", show(&id.location_nickname)),
        format!("Station:    {}", show(&id.station_location)),
        format!("Controller: {}", show(&id.controller_name)),
        format!("Type:       {}", show(&id.sensor_type_parsed)),
        format!("Name:       {}", show(&id.display_name)),
    ]
    .join("\n")
}

pub fn handle(args: &ParseArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let parsed = SensorIdentifier::parse(&args.sensor_id);
    if !parsed.is_complete() {
        tracing::info!(sensor_id = %args.sensor_id, "sensor id has fewer than five segments");
    }

    let out = output::render_single(&global.output, &parsed, detail, |id| {
        id.label().to_owned()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
