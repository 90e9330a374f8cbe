//! Acquire stage: materialize a local audio file (and optionally the source
//! video) from a `local:` reference or a supported video-site URL.

use regex::Regex;
use tracing::info;

use super::{files, Pipeline, PipelineContext};
use crate::error::{DubflowError, Result};

impl Pipeline {
    pub(crate) async fn stage_acquire(&self, ctx: &mut PipelineContext) -> Result<()> {
        info!(task_id = %ctx.task_id, "acquiring {}", ctx.source);
        self.registry.set_progress(&ctx.task_id, 3);

        let audio_path = ctx.base_dir.join(files::AUDIO_FILE);
        let video_path = ctx.base_dir.join(files::VIDEO_FILE);
        let source = ctx.source.clone();
        let mut canonical_url = None;

        if let Some(local) = source.strip_prefix("local:") {
            ctx.input_video_path = Some(local.into());
            self.media
                .extract_audio(std::path::Path::new(local), &audio_path)
                .await?;
        } else if source.contains("youtube.com") {
            let video_id = youtube_video_id(&source)
                .ok_or_else(|| DubflowError::InvalidInput("invalid link".to_string()))?;
            let url = format!("https://www.youtube.com/watch?v={}", video_id);
            self.grabber.fetch_audio(&url, &audio_path, "bestaudio").await?;
            canonical_url = Some(url);
        } else if source.contains("bilibili.com") {
            let video_id = bilibili_video_id(&source)
                .ok_or_else(|| DubflowError::InvalidInput("invalid link".to_string()))?;
            let url = format!("https://www.bilibili.com/video/{}", video_id);
            self.grabber
                .fetch_audio(&url, &audio_path, "bestaudio[ext=m4a]")
                .await?;
            canonical_url = Some(url);
        } else {
            return Err(DubflowError::InvalidInput(
                "unsupported link, only YouTube, Bilibili and local files".to_string(),
            ));
        }

        self.registry.set_progress(&ctx.task_id, 6);
        ctx.audio_path = audio_path;

        // Burn-in needs the source video; remote sources fetch it separately.
        if let Some(url) = canonical_url {
            if ctx.embed.enabled() {
                self.grabber.fetch_video(&url, &video_path).await?;
                ctx.input_video_path = Some(video_path);
            }
        }

        self.registry.set_progress(&ctx.task_id, 10);
        Ok(())
    }
}

/// Extract the video id from a YouTube URL: the `v` query parameter on
/// watch URLs, the trailing path segment otherwise (short links).
pub fn youtube_video_id(link: &str) -> Option<String> {
    let rest = link.split("://").nth(1)?;
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    if path.contains("watch") {
        query?
            .split('&')
            .find_map(|kv| kv.strip_prefix("v="))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    } else {
        path.rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Extract the BV id from a Bilibili video URL.
pub fn bilibili_video_id(link: &str) -> Option<String> {
    let re = Regex::new(r"https://(?:www\.)?bilibili\.com/(?:video/|video/av\d+/)(BV[a-zA-Z0-9]+)")
        .expect("bilibili id regex");
    re.captures(link).map(|caps| caps[1].to_string())
}
