//! Reading snapshots and rule tables from disk.
//!
//! The entry snapshot is JSON Lines, one entry per line; blank lines are
//! skipped. The rule table is a single JSON object keyed by inflection class.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;
use salex_inflect::RuleTable;
use salex_types::Entry;
use tracing::info;

/// Strategy for loading input files.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map the file.
    #[default]
    Mmap,
    /// Read the file into an owned buffer.
    Owned,
}

impl LoadMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "mmap" => Some(LoadMode::Mmap),
            "owned" => Some(LoadMode::Owned),
            _ => None,
        }
    }
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

fn load_file(path: &Path, mode: LoadMode) -> Result<Buffer> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    match mode {
        // Zero-length maps are rejected on some platforms.
        LoadMode::Mmap if len > 0 => {
            let map = unsafe { Mmap::map(&file) };
            map.map(Buffer::Mmap)
                .with_context(|| format!("mmap {}", path.display()))
        }
        _ => {
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            Ok(Buffer::Owned(buf))
        }
    }
}

/// Load a JSON Lines entry snapshot.
pub fn load_entries(path: impl AsRef<Path>, mode: LoadMode) -> Result<Vec<Entry>> {
    let path = path.as_ref();
    let buffer = load_file(path, mode)?;
    let entries = parse_entries(buffer.as_slice())
        .with_context(|| format!("parse entries {}", path.display()))?;
    info!("loaded {} entries from {} ({mode:?})", entries.len(), path.display());
    Ok(entries)
}

/// Load an inflection rule table.
pub fn load_rules(path: impl AsRef<Path>, mode: LoadMode) -> Result<RuleTable> {
    let path = path.as_ref();
    let buffer = load_file(path, mode)?;
    RuleTable::from_slice(buffer.as_slice())
        .with_context(|| format!("parse rule table {}", path.display()))
}

fn parse_entries(bytes: &[u8]) -> Result<Vec<Entry>> {
    let text = std::str::from_utf8(bytes).context("snapshot is not UTF-8")?;
    let mut entries = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: Entry =
            serde_json::from_str(line).with_context(|| format!("line {}", lineno + 1))?;
        entries.push(entry);
    }
    Ok(entries)
}
