//! Publish stage: apply word replacements, attach download URLs and mark
//! the task successful.

use std::collections::HashMap;
use std::fs;
use tracing::info;

use super::{files, Pipeline, PipelineContext};
use crate::error::Result;
use crate::task::TaskStatus;

impl Pipeline {
    pub(crate) fn stage_publish(&self, ctx: &mut PipelineContext) -> Result<()> {
        for subtitle in &mut ctx.subtitles {
            if !ctx.replace_map.is_empty() {
                let replaced_path = files::add_suffix_to_file_name(&subtitle.path, "_replaced");
                let content = fs::read_to_string(&subtitle.path)?;
                fs::write(&replaced_path, apply_replacements(&content, &ctx.replace_map))?;
                subtitle.path = replaced_path;
            }
            subtitle.download_url = Some(format!("/api/file/{}", subtitle.path.display()));
        }

        let speech_url = ctx
            .speech_path
            .as_ref()
            .map(|path| format!("/api/file/{}", path.display()));

        let subtitles = ctx.subtitles.clone();
        let speech_path = ctx.speech_path.clone();
        self.registry.update(&ctx.task_id, |task| {
            task.subtitles = subtitles;
            task.speech_path = speech_path;
            task.speech_url = speech_url;
            task.status = TaskStatus::Success;
            task.progress = 100;
        });

        info!(task_id = %ctx.task_id, "task published");
        Ok(())
    }
}

/// Plain-text substitution of every `from` with its `to`. Applying the map
/// twice equals applying it once as long as replacements do not reintroduce
/// their own sources.
pub fn apply_replacements(content: &str, map: &HashMap<String, String>) -> String {
    let mut result = content.to_string();
    for (from, to) in map {
        result = result.replace(from, to);
    }
    result
}
