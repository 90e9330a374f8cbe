// Subprocess gateway for the three external media tools:
// the transcoder (ffmpeg), the prober (ffprobe) and the URL grabber (yt-dlp).
//
// Every invocation goes through `MediaCommand`, which captures stderr and
// folds it into the error so task failure reasons carry the tool's own
// diagnostics.

pub mod fetch;
pub mod probe;

use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::config::MediaConfig;
use crate::error::{DubflowError, Result};

/// A single external tool invocation.
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Run the tool and fail with its stderr on a non-zero exit.
    pub async fn run(&self) -> Result<()> {
        self.run_capturing().await.map(|_| ())
    }

    /// Run the tool and return its stdout on success.
    pub async fn run_capturing(&self) -> Result<String> {
        debug!("running {}: {} {:?}", self.description, self.binary_path, self.args);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| {
                DubflowError::Process(format!("{}: failed to start {}: {}", self.description, self.binary_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubflowError::Process(format!(
                "{} exited with {}: {}",
                self.description,
                output.status,
                stderr_excerpt(&stderr)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Last few lines of stderr, where the tools put the actual failure.
fn stderr_excerpt(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let tail = lines.len().saturating_sub(6);
    lines[tail..].join("\n")
}

/// Transcoder and prober operations used by the pipeline.
pub struct MediaGateway {
    config: MediaConfig,
}

impl MediaGateway {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.config.ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.config.ffprobe_path
    }

    pub fn ytdlp_path(&self) -> &str {
        &self.config.ytdlp_path
    }

    fn ffmpeg<S: Into<String>>(&self, description: S) -> MediaCommand {
        MediaCommand::new(&self.config.ffmpeg_path, description)
    }

    /// Extract the audio track as 44.1 kHz stereo 192 kbit/s MP3.
    pub async fn extract_audio(&self, video: &Path, audio_out: &Path) -> Result<()> {
        self.ffmpeg("audio extraction")
            .input(video)
            .arg("-vn")
            .args(["-ar", "44100", "-ac", "2", "-ab", "192k", "-f", "mp3"])
            .overwrite()
            .output(audio_out)
            .run()
            .await
    }

    /// Split audio into equal slices with per-slice timestamp reset.
    /// `pattern` is an ffmpeg segment pattern such as `split_audio_%03d.mp3`.
    pub async fn segment_audio(&self, audio: &Path, pattern: &Path, seconds: u64) -> Result<()> {
        self.ffmpeg("audio segmentation")
            .input(audio)
            .args(["-f", "segment"])
            .arg("-segment_time")
            .arg(seconds.to_string())
            .args(["-reset_timestamps", "1"])
            .overwrite()
            .output(pattern)
            .run()
            .await
    }

    /// Concatenate files listed in a concat-demuxer manifest. Entries are
    /// resolved relative to the manifest's directory.
    pub async fn concat(&self, list_file: &Path, out: &Path) -> Result<()> {
        self.ffmpeg("audio concatenation")
            .overwrite()
            .args(["-f", "concat", "-safe", "0"])
            .input(list_file)
            .args(["-c", "copy"])
            .output(out)
            .run()
            .await
    }

    /// Generate PCM-16 mono 44.1 kHz silence of the given length.
    pub async fn generate_silence(&self, out: &Path, duration_secs: f64) -> Result<()> {
        self.ffmpeg("silence generation")
            .overwrite()
            .args(["-f", "lavfi", "-i", "anullsrc=channel_layout=mono:sample_rate=44100"])
            .arg("-t")
            .arg(format!("{:.3}", duration_secs))
            .args(["-ar", "44100", "-ac", "1", "-c:a", "pcm_s16le"])
            .output(out)
            .run()
            .await
    }

    /// Speed audio up or down without pitch change. Ratios outside ffmpeg's
    /// per-stage atempo range are decomposed into a filter chain.
    pub async fn change_tempo(&self, input: &Path, out: &Path, ratio: f64) -> Result<()> {
        let filter = atempo_chain(ratio)
            .iter()
            .map(|r| format!("atempo={:.4}", r))
            .collect::<Vec<_>>()
            .join(",");
        self.ffmpeg("audio tempo change")
            .overwrite()
            .input(input)
            .arg("-filter:a")
            .arg(filter)
            .output(out)
            .run()
            .await
    }

    /// Burn an ASS subtitle file into the video, re-encoding audio at 192k.
    pub async fn burn_subtitles(&self, video: &Path, ass: &Path, out: &Path) -> Result<()> {
        let ass_path = ass.to_string_lossy().replace('\\', "/");
        self.ffmpeg("subtitle burn-in")
            .overwrite()
            .input(video)
            .arg("-vf")
            .arg(format!("ass={}", ass_path))
            .args(["-c:a", "aac", "-b:a", "192k"])
            .output(out)
            .run()
            .await
    }

    /// Convert a landscape video into a 720x1280 portrait frame with a black
    /// title bar and two centered drawtext layers.
    pub async fn convert_to_vertical(
        &self,
        input: &Path,
        out: &Path,
        major_title: &str,
        minor_title: &str,
    ) -> Result<()> {
        if out.exists() {
            debug!("vertical conversion target already exists: {}", out.display());
            return Ok(());
        }

        let (font_bold, font_regular) = os_font_paths()?;
        let filter = format!(
            "scale=720:1280:force_original_aspect_ratio=decrease,\
             pad=720:1280:(ow-iw)/2:(oh-ih)*2/5,\
             drawbox=y=0:h=100:c=black@1:t=fill,\
             drawtext=text='{}':x=(w-text_w)/2:y=210:fontsize=55:fontcolor=yellow:box=1:boxcolor=black@0.5:fontfile='{}',\
             drawtext=text='{}':x=(w-text_w)/2:y=280:fontsize=40:fontcolor=yellow:box=1:boxcolor=black@0.5:fontfile='{}'",
            major_title, font_bold, minor_title, font_regular
        );

        self.ffmpeg("vertical conversion")
            .input(input)
            .arg("-vf")
            .arg(filter)
            .args(["-r", "30", "-b:v", "7587k", "-c:a", "aac", "-b:a", "192k"])
            .args(["-c:v", "libx264", "-preset", "fast"])
            .overwrite()
            .output(out)
            .run()
            .await
    }
}

/// Decompose a tempo ratio into stages that each stay within ffmpeg's
/// supported atempo range of [0.5, 2.0].
pub fn atempo_chain(ratio: f64) -> Vec<f64> {
    let mut stages = Vec::new();
    let mut remaining = ratio;

    while remaining > 2.0 {
        stages.push(2.0);
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        stages.push(0.5);
        remaining /= 0.5;
    }
    stages.push(remaining);
    stages
}

/// Bundled font paths used by the vertical-conversion drawtext layers.
fn os_font_paths() -> Result<(&'static str, &'static str)> {
    if cfg!(target_os = "windows") {
        Ok(("C\\:/Windows/Fonts/msyhbd.ttc", "C\\:/Windows/Fonts/msyh.ttc"))
    } else if cfg!(target_os = "macos") {
        Ok((
            "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
        ))
    } else if cfg!(target_os = "linux") {
        Ok((
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        ))
    } else {
        Err(DubflowError::Internal("unsupported operating system".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_builder_collects_args() {
        let cmd = MediaCommand::new("ffmpeg", "test")
            .overwrite()
            .input("/tmp/in.mp3")
            .args(["-c", "copy"])
            .output("/tmp/out.mp3");
        assert_eq!(cmd.args, vec!["-y", "-i", "/tmp/in.mp3", "-c", "copy", "/tmp/out.mp3"]);
    }

    #[test]
    fn atempo_within_range_is_single_stage() {
        assert_eq!(atempo_chain(1.5), vec![1.5]);
        assert_eq!(atempo_chain(0.7), vec![0.7]);
    }

    #[test]
    fn atempo_fast_ratio_is_chained() {
        let stages = atempo_chain(4.5);
        assert!(stages.iter().all(|&r| (0.5..=2.0).contains(&r)));
        let product: f64 = stages.iter().product();
        assert!((product - 4.5).abs() < 1e-9);
    }

    #[test]
    fn atempo_slow_ratio_is_chained() {
        let stages = atempo_chain(0.2);
        assert!(stages.iter().all(|&r| (0.5..=2.0).contains(&r)));
        let product: f64 = stages.iter().product();
        assert!((product - 0.2).abs() < 1e-9);
    }

    #[test]
    fn stderr_excerpt_keeps_tail() {
        let stderr = (1..=10).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let excerpt = stderr_excerpt(&stderr);
        assert!(excerpt.starts_with("line 5"));
        assert!(excerpt.ends_with("line 10"));
    }
}
