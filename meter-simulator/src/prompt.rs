//! Interactive collection of the generation inputs.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};

use crate::generator::{parse_meter_count, SimulationRequest};

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("failed to read from stdin")?;
    if read == 0 {
        bail!("input closed before answering '{}'", question.trim_end());
    }
    Ok(line.trim().to_string())
}

/// Ask for meter count, range and interval, in that order.
pub fn prompt_request<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<SimulationRequest> {
    let num_meters = parse_meter_count(&ask(input, output, "Enter number of smart meters: ")?)?;
    let start = ask(input, output, "Enter start date (dd:mm:yyyy HH:MM): ")?;
    let end = ask(input, output, "Enter end date (dd:mm:yyyy HH:MM): ")?;
    let interval_raw = ask(input, output, "Enter interval in minutes (15 or 30): ")?;
    let interval: i64 = interval_raw
        .parse()
        .with_context(|| format!("interval '{interval_raw}' is not a whole number of minutes"))?;

    let request = SimulationRequest::parse(num_meters, &start, &end, interval)?;
    if interval != 15 && interval != 30 {
        tracing::warn!(interval_minutes = interval, "unusual interval, expected 15 or 30 minutes");
    }
    Ok(request)
}
