use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RowOutcome, RunSummary};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        let green = "\x1b[32m";
        let yellow = "\x1b[33m";
        let red = "\x1b[31m";
        let reset = "\x1b[0m";

        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{green}Downloaded: {}{reset}", summary.success)?;
        writeln!(stdout, "{red}Failed: {}{reset}", summary.failed)?;
        if summary.skipped > 0 {
            writeln!(stdout, "{yellow}Skipped rows: {}{reset}", summary.skipped)?;
        }
        for row in &summary.rows {
            if let RowOutcome::Failed {
                line,
                accession,
                reason,
            } = row
            {
                writeln!(
                    stdout,
                    "{red}  row {line} {}: {reason}{reset}",
                    accession.as_deref().unwrap_or("-")
                )?;
            }
        }
        Ok(())
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => println!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => println!("{}", event.message),
        }
    }
}
