// Pipeline orchestrator.
//
// Drives one task through six stages: acquire, slice+ASR+translate+retime,
// assemble, dub, burn-in, publish. Stage boundaries publish increasing
// progress values; the first stage error marks the task Failed and stops
// the run. Stages never retry themselves; retries live inside the stages
// where they are meaningful.

pub mod acquire;
pub mod assemble;
pub mod embed;
pub mod files;
pub mod publish;
pub mod retime;
pub mod subtitle_stage;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{DubflowError, Result};
use crate::lang::Language;
use crate::media::{fetch::UrlGrabber, MediaGateway};
use crate::speech::{self, SpeechFactory, TextToSpeech, VoiceCloner};
use crate::store::{HttpObjectStore, ObjectStore};
use crate::subtitle::ass::AssLayout;
use crate::task::{SubtitleFile, TaskRegistry};
use crate::transcribe::{Transcriber, TranscriberFactory, TranscriptionResult};
use crate::translate::{ChatCompleter, ChatCompleterFactory};

/// Which subtitle variants the task produces and how bilingual blocks are
/// stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleLayout {
    OriginOnly,
    TargetOnly,
    BilingualTranslationOnTop,
    BilingualTranslationOnBottom,
}

impl SubtitleLayout {
    pub fn is_bilingual(self) -> bool {
        matches!(
            self,
            Self::BilingualTranslationOnTop | Self::BilingualTranslationOnBottom
        )
    }

    pub fn translation_on_top(self) -> bool {
        matches!(self, Self::BilingualTranslationOnTop)
    }
}

/// Requested burn-in orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedType {
    #[default]
    None,
    Horizontal,
    Vertical,
    All,
}

impl EmbedType {
    pub fn enabled(self) -> bool {
        self != Self::None
    }

    pub fn wants_horizontal(self) -> bool {
        matches!(self, Self::Horizontal | Self::All)
    }

    pub fn wants_vertical(self) -> bool {
        matches!(self, Self::Vertical | Self::All)
    }
}

/// UI language for subtitle display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiLanguage {
    English,
    SimplifiedChinese,
}

/// Everything a caller specifies when submitting a task.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    /// `local:<path>` or a supported video-site URL.
    pub source: String,
    pub origin_language: String,
    /// Target language tag, or `none` for origin-only subtitles.
    pub target_language: String,
    pub ui_language: String,
    pub bilingual: bool,
    pub translation_on_top: bool,
    pub modal_filter: bool,
    pub tts: bool,
    pub voice: Option<String>,
    pub voice_clone_file: Option<PathBuf>,
    /// `from|to` plain-text replacement rules applied to final subtitles.
    pub replace: Vec<String>,
    pub embed: EmbedType,
    pub vertical_major_title: String,
    pub vertical_minor_title: String,
    pub max_word_one_line: Option<usize>,
}

/// One slice of the source audio, processed independently in the fan-out
/// stage.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// 1-based ordinal; global times add `(num - 1) * segment_duration`.
    pub num: usize,
    pub path: PathBuf,
    pub transcription: Option<TranscriptionResult>,
}

/// Per-task mutable state owned by the orchestrator.
pub(crate) struct PipelineContext {
    pub task_id: String,
    pub base_dir: PathBuf,
    pub source: String,
    pub origin_language: &'static Language,
    pub target_language: &'static Language,
    pub ui_language: UiLanguage,
    pub layout: SubtitleLayout,
    pub modal_filter: bool,
    pub enable_tts: bool,
    pub voice: String,
    pub voice_clone_file: Option<PathBuf>,
    pub replace_map: HashMap<String, String>,
    pub embed: EmbedType,
    pub vertical_major_title: String,
    pub vertical_minor_title: String,
    pub max_word_one_line: usize,

    // Cross-stage outputs.
    pub audio_path: PathBuf,
    pub input_video_path: Option<PathBuf>,
    pub segments: Vec<AudioSegment>,
    pub bilingual_srt: Option<PathBuf>,
    pub tts_source: Option<PathBuf>,
    pub subtitles: Vec<SubtitleFile>,
    pub speech_path: Option<PathBuf>,
}

/// The pipeline service: configuration, registry and capability ports.
pub struct Pipeline {
    pub(crate) config: Config,
    pub(crate) registry: Arc<TaskRegistry>,
    pub(crate) media: Arc<MediaGateway>,
    pub(crate) grabber: Arc<UrlGrabber>,
    pub(crate) transcriber: Arc<dyn Transcriber>,
    pub(crate) completer: Arc<dyn ChatCompleter>,
    pub(crate) tts: Arc<dyn TextToSpeech>,
    pub(crate) cloner: Arc<dyn VoiceCloner>,
    pub(crate) store: Arc<dyn ObjectStore>,
}

impl Pipeline {
    /// Build a pipeline with providers selected from configuration.
    pub fn new(config: Config, registry: Arc<TaskRegistry>) -> Self {
        let media = Arc::new(MediaGateway::new(config.media.clone()));
        let grabber = Arc::new(UrlGrabber::new(&config));
        let transcriber: Arc<dyn Transcriber> =
            Arc::from(TranscriberFactory::create(config.transcribe.clone()));
        let completer: Arc<dyn ChatCompleter> =
            Arc::from(ChatCompleterFactory::create(config.llm.clone()));
        let tts: Arc<dyn TextToSpeech> = Arc::from(SpeechFactory::create_tts(config.tts.clone()));
        let cloner: Arc<dyn VoiceCloner> =
            Arc::from(SpeechFactory::create_cloner(config.tts.clone()));
        let store: Arc<dyn ObjectStore> = Arc::new(HttpObjectStore::new(config.store.clone()));

        Self {
            config,
            registry,
            media,
            grabber,
            transcriber,
            completer,
            tts,
            cloner,
            store,
        }
    }

    /// Build a pipeline around explicit port implementations.
    #[allow(clippy::too_many_arguments)]
    pub fn with_ports(
        config: Config,
        registry: Arc<TaskRegistry>,
        transcriber: Arc<dyn Transcriber>,
        completer: Arc<dyn ChatCompleter>,
        tts: Arc<dyn TextToSpeech>,
        cloner: Arc<dyn VoiceCloner>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let media = Arc::new(MediaGateway::new(config.media.clone()));
        let grabber = Arc::new(UrlGrabber::new(&config));
        Self {
            config,
            registry,
            media,
            grabber,
            transcriber,
            completer,
            tts,
            cloner,
            store,
        }
    }

    /// Validate the request, register the task and spawn its pipeline.
    /// Returns the task id immediately.
    pub fn start_task(self: Arc<Self>, request: TaskRequest) -> Result<String> {
        validate_source(&request.source)?;

        let origin_language = Language::from_tag(&request.origin_language).ok_or_else(|| {
            DubflowError::InvalidInput(format!("unknown origin language: {}", request.origin_language))
        })?;

        let layout = resolve_layout(&request);
        let target_language = if request.target_language == "none" {
            origin_language
        } else {
            Language::from_tag(&request.target_language).ok_or_else(|| {
                DubflowError::InvalidInput(format!(
                    "unknown target language: {}",
                    request.target_language
                ))
            })?
        };

        let ui_language = match request.ui_language.as_str() {
            "zh_cn" => UiLanguage::SimplifiedChinese,
            _ => UiLanguage::English,
        };

        let task_id = self.registry.create(&request.source);
        let base_dir = PathBuf::from(&self.config.app.task_dir).join(&task_id);
        std::fs::create_dir_all(base_dir.join("output"))?;

        let context = PipelineContext {
            task_id: task_id.clone(),
            base_dir: base_dir.clone(),
            source: request.source,
            origin_language,
            target_language,
            ui_language,
            layout,
            modal_filter: request.modal_filter,
            enable_tts: request.tts,
            voice: request
                .voice
                .unwrap_or_else(|| self.config.tts.voice.clone()),
            voice_clone_file: request.voice_clone_file,
            replace_map: parse_replace_rules(&request.replace),
            embed: request.embed,
            vertical_major_title: request.vertical_major_title,
            vertical_minor_title: request.vertical_minor_title,
            max_word_one_line: request
                .max_word_one_line
                .unwrap_or(self.config.app.max_word_one_line),
            audio_path: base_dir.join(files::AUDIO_FILE),
            input_video_path: None,
            segments: Vec::new(),
            bilingual_srt: None,
            tts_source: None,
            subtitles: Vec::new(),
            speech_path: None,
        };

        let pipeline = self.clone();
        let registry = self.registry.clone();
        let watch_id = task_id.clone();
        let handle = tokio::spawn(async move { pipeline.run(context).await });
        tokio::spawn(async move {
            if let Err(join_err) = handle.await {
                if join_err.is_panic() {
                    error!(task_id = %watch_id, "pipeline panicked");
                    registry.fail(&watch_id, "internal error: pipeline panicked");
                }
            }
        });

        Ok(task_id)
    }

    async fn run(self: Arc<Self>, mut ctx: PipelineContext) {
        info!(task_id = %ctx.task_id, "subtitle task started");
        match self.execute(&mut ctx).await {
            Ok(()) => info!(task_id = %ctx.task_id, "subtitle task finished"),
            Err(e) => {
                error!(task_id = %ctx.task_id, error = %e, "subtitle task failed");
                self.registry.fail(&ctx.task_id, &e.to_string());
            }
        }
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<()> {
        self.stage_acquire(ctx).await?;
        self.stage_subtitles(ctx).await?;
        self.stage_assemble(ctx)?;
        self.registry.set_progress(&ctx.task_id, 95);
        self.stage_dub(ctx).await?;
        self.stage_embed(ctx).await?;
        self.stage_publish(ctx)?;
        Ok(())
    }

    async fn stage_dub(&self, ctx: &mut PipelineContext) -> Result<()> {
        if !ctx.enable_tts {
            return Ok(());
        }
        let source = ctx.tts_source.clone().ok_or_else(|| {
            DubflowError::Internal("dubbing requested but no subtitle source produced".to_string())
        })?;

        info!(task_id = %ctx.task_id, "dubbing from {}", source.display());
        let result = speech::dub::synthesize_dub(
            &self.media,
            self.tts.as_ref(),
            self.cloner.as_ref(),
            self.store.as_ref(),
            &self.config.store.bucket,
            &ctx.base_dir,
            &source,
            &ctx.voice,
            ctx.voice_clone_file.as_deref(),
        )
        .await?;

        ctx.speech_path = Some(result);
        self.registry.set_progress(&ctx.task_id, 98);
        Ok(())
    }

    pub(crate) fn ass_layout<'a>(&self, ctx: &'a PipelineContext, horizontal: bool) -> AssLayout<'a> {
        let major_language = if ctx.layout.translation_on_top() {
            ctx.target_language
        } else {
            ctx.origin_language
        };
        AssLayout {
            horizontal,
            major_language,
            max_word_one_line: ctx.max_word_one_line,
        }
    }
}

/// Reject sources the acquire stage cannot handle, before a task record is
/// created.
fn validate_source(source: &str) -> Result<()> {
    if source.starts_with("local:") {
        return Ok(());
    }
    if source.contains("youtube.com") {
        return match acquire::youtube_video_id(source) {
            Some(_) => Ok(()),
            None => Err(DubflowError::InvalidInput("invalid link".to_string())),
        };
    }
    if source.contains("bilibili.com") {
        return match acquire::bilibili_video_id(source) {
            Some(_) => Ok(()),
            None => Err(DubflowError::InvalidInput("invalid link".to_string())),
        };
    }
    Err(DubflowError::InvalidInput(
        "unsupported link, only YouTube, Bilibili and local files".to_string(),
    ))
}

fn resolve_layout(request: &TaskRequest) -> SubtitleLayout {
    if request.target_language == "none" {
        SubtitleLayout::OriginOnly
    } else if request.bilingual {
        if request.translation_on_top {
            SubtitleLayout::BilingualTranslationOnTop
        } else {
            SubtitleLayout::BilingualTranslationOnBottom
        }
    } else {
        SubtitleLayout::TargetOnly
    }
}

/// Parse `from|to` rules into the replacement map; malformed rules are
/// ignored.
fn parse_replace_rules(rules: &[String]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for rule in rules {
        match rule.split_once('|') {
            Some((from, to)) if !from.is_empty() => {
                map.insert(from.to_string(), to.to_string());
            }
            _ => {
                info!(rule = %rule, "ignoring malformed replace rule");
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(target: &str, bilingual: bool, on_top: bool) -> TaskRequest {
        TaskRequest {
            source: "local:/tmp/v.mp4".to_string(),
            origin_language: "en".to_string(),
            target_language: target.to_string(),
            ui_language: "en".to_string(),
            bilingual,
            translation_on_top: on_top,
            modal_filter: false,
            tts: false,
            voice: None,
            voice_clone_file: None,
            replace: Vec::new(),
            embed: EmbedType::None,
            vertical_major_title: String::new(),
            vertical_minor_title: String::new(),
            max_word_one_line: None,
        }
    }

    #[test]
    fn layout_resolution_matches_request_shape() {
        assert_eq!(resolve_layout(&request("none", true, true)), SubtitleLayout::OriginOnly);
        assert_eq!(resolve_layout(&request("zh_cn", false, false)), SubtitleLayout::TargetOnly);
        assert_eq!(
            resolve_layout(&request("zh_cn", true, true)),
            SubtitleLayout::BilingualTranslationOnTop
        );
        assert_eq!(
            resolve_layout(&request("zh_cn", true, false)),
            SubtitleLayout::BilingualTranslationOnBottom
        );
    }

    #[test]
    fn replace_rules_parse_and_skip_malformed() {
        let map = parse_replace_rules(&[
            "AI|artificial intelligence".to_string(),
            "broken-rule".to_string(),
            "|empty".to_string(),
        ]);
        assert_eq!(map.len(), 1);
        assert_eq!(map["AI"], "artificial intelligence");
    }

    #[test]
    fn source_validation_rejects_unknown_hosts() {
        assert!(validate_source("local:/tmp/x.mp4").is_ok());
        assert!(validate_source("https://www.youtube.com/watch?v=abc123").is_ok());
        assert!(validate_source("https://www.bilibili.com/video/BV1GJ411x7h7").is_ok());
        assert!(validate_source("https://example.com/video").is_err());
        assert!(validate_source("https://www.youtube.com/watch?x=1").is_err());
    }

    #[test]
    fn embed_type_orientation_flags() {
        assert!(!EmbedType::None.enabled());
        assert!(EmbedType::All.wants_horizontal());
        assert!(EmbedType::All.wants_vertical());
        assert!(EmbedType::Horizontal.wants_horizontal());
        assert!(!EmbedType::Horizontal.wants_vertical());
    }
}
