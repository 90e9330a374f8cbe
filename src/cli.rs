use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full subtitle pipeline on a video source
    Process {
        /// Source: `local:<path>` or a YouTube/Bilibili URL
        #[arg(short, long)]
        source: String,

        /// Spoken language of the source audio
        #[arg(long, default_value = "en")]
        origin_lang: String,

        /// Translation target language, or `none` for origin-only subtitles
        #[arg(long, default_value = "zh_cn")]
        target_lang: String,

        /// UI language for subtitle display names (en or zh_cn)
        #[arg(long, default_value = "en")]
        ui_lang: String,

        /// Produce a combined bilingual subtitle
        #[arg(long)]
        bilingual: bool,

        /// Put the translation on the top line of bilingual blocks
        #[arg(long)]
        translation_top: bool,

        /// Ask the model to drop filler words from the transcript
        #[arg(long)]
        modal_filter: bool,

        /// Synthesize a dubbed audio track
        #[arg(long)]
        tts: bool,

        /// TTS voice code (defaults to the configured voice)
        #[arg(long)]
        voice: Option<String>,

        /// Local audio sample to register as a cloned voice
        #[arg(long)]
        voice_clone_file: Option<PathBuf>,

        /// Replacement rule `from|to` applied to final subtitles (repeatable)
        #[arg(long)]
        replace: Vec<String>,

        /// Burn-in type: none, horizontal, vertical or all
        #[arg(long, default_value = "none")]
        embed: String,

        /// Major title drawn on converted vertical video
        #[arg(long, default_value = "")]
        vertical_major_title: String,

        /// Minor title drawn on converted vertical video
        #[arg(long, default_value = "")]
        vertical_minor_title: String,

        /// Maximum words (or characters) per subtitle line
        #[arg(long)]
        max_words: Option<usize>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "config.toml")]
        path: PathBuf,
    },
}
