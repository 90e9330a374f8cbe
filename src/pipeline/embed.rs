//! Burn-in stage: render the bilingual subtitles into the video pixels.
//!
//! Horizontal burn-in requires a landscape source and is skipped otherwise.
//! Vertical burn-in converts landscape sources to a titled 720x1280
//! portrait frame first.

use std::path::Path;
use tracing::info;

use super::{files, Pipeline, PipelineContext};
use crate::error::{DubflowError, Result};
use crate::subtitle::ass::srt_to_ass;

impl Pipeline {
    pub(crate) async fn stage_embed(&self, ctx: &mut PipelineContext) -> Result<()> {
        if !ctx.embed.enabled() {
            return Ok(());
        }
        let video = ctx.input_video_path.clone().ok_or_else(|| {
            DubflowError::InvalidInput("burn-in requested but no source video available".to_string())
        })?;

        let (width, height) = self.media.resolution(&video).await?;
        info!(task_id = %ctx.task_id, width, height, "burning in subtitles");

        if ctx.embed.wants_horizontal() {
            if width < height {
                info!(task_id = %ctx.task_id, "portrait source, skipping horizontal burn-in");
            } else {
                self.burn(ctx, true, &video).await?;
            }
        }

        if ctx.embed.wants_vertical() {
            let mut vertical_source = video.clone();
            if width > height {
                let converted = ctx.base_dir.join(files::CONVERTED_VERTICAL_VIDEO);
                self.media
                    .convert_to_vertical(
                        &video,
                        &converted,
                        &ctx.vertical_major_title,
                        &ctx.vertical_minor_title,
                    )
                    .await?;
                vertical_source = converted;
            }
            self.burn(ctx, false, &vertical_source).await?;
        }

        Ok(())
    }

    async fn burn(&self, ctx: &PipelineContext, horizontal: bool, video: &Path) -> Result<()> {
        let bilingual = ctx.bilingual_srt.clone().ok_or_else(|| {
            DubflowError::Internal("burn-in ran before the bilingual subtitle".to_string())
        })?;

        let srt = tokio::fs::read_to_string(&bilingual).await?;
        let ass = srt_to_ass(&srt, &self.ass_layout(ctx, horizontal));
        let ass_path = ctx.base_dir.join(files::ASS_FILE);
        tokio::fs::write(&ass_path, ass).await?;

        let output = ctx.base_dir.join(if horizontal {
            files::HORIZONTAL_EMBED
        } else {
            files::VERTICAL_EMBED
        });
        self.media.burn_subtitles(video, &ass_path, &output).await
    }
}
