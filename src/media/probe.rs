use std::path::Path;

use super::{MediaCommand, MediaGateway};
use crate::error::{DubflowError, Result};

impl MediaGateway {
    /// Video resolution as `(width, height)`.
    pub async fn resolution(&self, video: &Path) -> Result<(u32, u32)> {
        let output = MediaCommand::new(self.ffprobe_path(), "resolution probe")
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height"])
            .args(["-of", "csv=s=x:p=0"])
            .arg(video.to_string_lossy().to_string())
            .run_capturing()
            .await?;

        parse_resolution(output.trim())
    }

    /// Duration of a media file in seconds.
    pub async fn media_duration(&self, path: &Path) -> Result<f64> {
        let output = MediaCommand::new(self.ffprobe_path(), "duration probe")
            .args(["-v", "error"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path.to_string_lossy().to_string())
            .run_capturing()
            .await?;

        output
            .trim()
            .parse::<f64>()
            .map_err(|_| DubflowError::Format(format!("unreadable duration: {:?}", output.trim())))
    }
}

fn parse_resolution(output: &str) -> Result<(u32, u32)> {
    let mut parts = output.split('x');
    let width = parts.next().and_then(|p| p.trim().parse().ok());
    let height = parts.next().and_then(|p| p.trim().parse().ok());
    match (width, height, parts.next()) {
        (Some(w), Some(h), None) => Ok((w, h)),
        _ => Err(DubflowError::Format(format!("invalid resolution output: {:?}", output))),
    }
}
