use std::path::Path;

use super::MediaCommand;
use crate::config::Config;
use crate::error::Result;

/// Wrapper around the URL grabber (yt-dlp) for remote audio/video fetch.
pub struct UrlGrabber {
    ytdlp_path: String,
    ffmpeg_path: String,
    proxy: String,
    cookies_file: String,
}

const VIDEO_FORMAT_CHAIN: &str = "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/\
                                  bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/\
                                  bestvideo[height<=480][ext=mp4]+bestaudio[ext=m4a]";

impl UrlGrabber {
    pub fn new(config: &Config) -> Self {
        Self {
            ytdlp_path: config.media.ytdlp_path.clone(),
            ffmpeg_path: config.media.ffmpeg_path.clone(),
            proxy: config.app.proxy.clone(),
            cookies_file: config.app.cookies_file.clone(),
        }
    }

    /// Fetch the best available audio and transcode to 192K MP3.
    /// `format_selector` is the site-specific `-f` value.
    pub async fn fetch_audio(&self, url: &str, out: &Path, format_selector: &str) -> Result<()> {
        let cmd = MediaCommand::new(&self.ytdlp_path, "audio download")
            .args(["-f", format_selector])
            .args(["--extract-audio", "--audio-format", "mp3", "--audio-quality", "192K"])
            .arg("-o")
            .arg(out.to_string_lossy().to_string())
            .arg(url);
        self.with_network_options(cmd, true).run().await
    }

    /// Fetch the best MP4+M4A video stream no larger than 1080p.
    pub async fn fetch_video(&self, url: &str, out: &Path) -> Result<()> {
        let cmd = MediaCommand::new(&self.ytdlp_path, "video download")
            .args(["-f", VIDEO_FORMAT_CHAIN])
            .arg("-o")
            .arg(out.to_string_lossy().to_string())
            .arg(url);
        self.with_network_options(cmd, false).run().await
    }

    fn with_network_options(&self, mut cmd: MediaCommand, with_cookies: bool) -> MediaCommand {
        if !self.proxy.is_empty() {
            cmd = cmd.arg("--proxy").arg(&self.proxy);
        }
        if with_cookies && !self.cookies_file.is_empty() {
            cmd = cmd.arg("--cookies").arg(&self.cookies_file);
        }
        if self.ffmpeg_path != "ffmpeg" {
            cmd = cmd.arg("--ffmpeg-location").arg(&self.ffmpeg_path);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::PathBuf;

    fn grabber(proxy: &str, cookies: &str, ffmpeg: &str) -> UrlGrabber {
        let mut config = Config::default();
        config.app.proxy = proxy.to_string();
        config.app.cookies_file = cookies.to_string();
        config.media.ffmpeg_path = ffmpeg.to_string();
        UrlGrabber::new(&config)
    }

    #[test]
    fn audio_command_carries_proxy_and_cookies() {
        let grabber = grabber("socks5://127.0.0.1:1080", "./cookies.txt", "/opt/ffmpeg");
        let cmd = MediaCommand::new(&grabber.ytdlp_path, "audio download")
            .args(["-f", "bestaudio"])
            .arg("-o")
            .arg(PathBuf::from("/tmp/a.mp3").to_string_lossy().to_string())
            .arg("https://example.com");
        let cmd = grabber.with_network_options(cmd, true);
        assert!(cmd.args.contains(&"--proxy".to_string()));
        assert!(cmd.args.contains(&"socks5://127.0.0.1:1080".to_string()));
        assert!(cmd.args.contains(&"--cookies".to_string()));
        assert!(cmd.args.contains(&"--ffmpeg-location".to_string()));
    }

    #[test]
    fn default_ffmpeg_path_is_not_forwarded() {
        let grabber = grabber("", "", "ffmpeg");
        let cmd = MediaCommand::new(&grabber.ytdlp_path, "video download");
        let cmd = grabber.with_network_options(cmd, false);
        assert!(cmd.args.is_empty());
    }
}
