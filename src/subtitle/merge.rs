//! Merging of per-segment subtitle files into task-level files.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::parse_srt;
use crate::error::Result;

/// Concatenate timed SRT files in order, renumbering blocks globally 1..M.
/// Inputs that do not exist are treated as empty (a segment with no speech
/// writes no file).
pub fn merge_srt_files(output: &Path, inputs: &[PathBuf]) -> Result<()> {
    let mut merged = String::new();
    let mut next_index = 1usize;

    for input in inputs {
        if !input.exists() {
            debug!("merge input missing, treated as empty: {}", input.display());
            continue;
        }
        let content = fs::read_to_string(input)?;
        for mut block in parse_srt(&content) {
            block.index = next_index;
            next_index += 1;
            merged.push_str(&block.render());
        }
    }

    fs::write(output, merged)?;
    Ok(())
}

/// Concatenate plain text files in order, skipping missing inputs.
pub fn merge_plain_files(output: &Path, inputs: &[PathBuf]) -> Result<()> {
    let mut merged = String::new();
    for input in inputs {
        if !input.exists() {
            continue;
        }
        merged.push_str(&fs::read_to_string(input)?);
    }
    fs::write(output, merged)?;
    Ok(())
}
