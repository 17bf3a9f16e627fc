use std::io::{self, Write};

use serde::Serialize;

use crate::app::{
    FetchChannelsResult, GenerateOptionsResult, ProgressEvent, ProgressSink, StubDataResult,
};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

/// Prints progress lines as they happen; the summary is printed by the
/// binary once the operation finishes.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        println!("{}", event.message);
    }
}

/// Machine-readable mode: progress is discarded, only the final summary is
/// written, as one JSON document.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(result: &FetchChannelsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_options(result: &GenerateOptionsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_stub(result: &StubDataResult) -> io::Result<()> {
        Self::print_json(result)
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
