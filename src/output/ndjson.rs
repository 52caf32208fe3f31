use crate::normalize::NormalizedEvent;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn write_events<W: Write>(out: &mut W, events: &[NormalizedEvent]) -> Result<usize> {
    for ev in events {
        let line = serde_json::to_string(ev)
            .with_context(|| format!("serialize event {}", ev.action_id))?;
        writeln!(out, "{line}")?;
    }
    Ok(events.len())
}

/// Opens `path` for one run's output, replacing whatever a previous run left.
pub fn create_output(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("open output {}", path.display()))?;
    Ok(BufWriter::new(f))
}
