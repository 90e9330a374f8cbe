//! The compute-heavy stage: slice the audio, then fan out per-segment
//! workers that run ASR, LLM segmentation + translation, and timestamp
//! recovery. Segment results are merged in ordinal order afterwards.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{files, retime, AudioSegment, Pipeline, PipelineContext};
use crate::error::{DubflowError, Result};
use crate::lang::Language;
use crate::subtitle::merge::{merge_plain_files, merge_srt_files};
use crate::task::TaskRegistry;
use crate::transcribe::{Transcriber, TranscriptionResult};
use crate::translate::{self, ChatCompleter, NO_TEXT_SENTINEL};

const ASR_ATTEMPTS: usize = 3;

impl Pipeline {
    pub(crate) async fn stage_subtitles(&self, ctx: &mut PipelineContext) -> Result<()> {
        self.slice_audio(ctx).await?;
        self.fan_out(ctx).await?;
        self.merge_segment_files(ctx)?;
        self.registry.set_progress(&ctx.task_id, 90);
        Ok(())
    }

    /// Split the acquired audio into fixed-length MP3 segments and assign
    /// 1-based ordinals in name order.
    async fn slice_audio(&self, ctx: &mut PipelineContext) -> Result<()> {
        info!(task_id = %ctx.task_id, "slicing audio");
        let pattern = ctx.base_dir.join(files::SPLIT_AUDIO_PATTERN);
        self.media
            .segment_audio(&ctx.audio_path, &pattern, self.config.segment_duration_secs())
            .await?;

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&ctx.base_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .map(|name| {
                        let name = name.to_string_lossy();
                        name.starts_with(files::SPLIT_AUDIO_PREFIX) && name.ends_with(".mp3")
                    })
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(DubflowError::Process(
                "audio segmentation produced no files".to_string(),
            ));
        }

        ctx.segments = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| AudioSegment {
                num: i + 1,
                path,
                transcription: None,
            })
            .collect();

        self.registry.set_progress(&ctx.task_id, 20);
        Ok(())
    }

    /// Run at most P segment workers concurrently; the first worker error
    /// cancels its peers and fails the stage.
    async fn fan_out(&self, ctx: &mut PipelineContext) -> Result<()> {
        let total = ctx.segments.len();
        let parallel = if self.transcriber.is_local() {
            1
        } else {
            self.config.app.translate_parallel_num.max(1)
        };
        info!(task_id = %ctx.task_id, segments = total, parallel, "fan-out started");

        let semaphore = Arc::new(Semaphore::new(parallel));
        let token = CancellationToken::new();
        let step = Arc::new(AtomicUsize::new(0));
        let mut workers: JoinSet<Result<(usize, TranscriptionResult)>> = JoinSet::new();

        for segment in &ctx.segments {
            let job = SegmentJob {
                num: segment.num,
                audio_path: segment.path.clone(),
                base_dir: ctx.base_dir.clone(),
                origin_language: ctx.origin_language,
                target_language: ctx.target_language,
                asr_code: ctx.origin_language.asr_code().to_string(),
                translation_on_top: ctx.layout.translation_on_top(),
                modal_filter: ctx.modal_filter,
                max_word_one_line: ctx.max_word_one_line,
                segment_duration_secs: self.config.segment_duration_secs(),
                task_id: ctx.task_id.clone(),
                total_segments: total,
            };
            let transcriber = self.transcriber.clone();
            let completer = self.completer.clone();
            let registry = self.registry.clone();
            let semaphore = semaphore.clone();
            let token = token.clone();
            let step = step.clone();

            workers.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| DubflowError::Internal("worker semaphore closed".to_string()))?;
                let result =
                    process_segment(job, transcriber, completer, registry, token.clone(), step)
                        .await;
                if result.is_err() {
                    token.cancel();
                }
                result
            });
        }

        let mut first_error: Option<DubflowError> = None;
        let mut completed: Vec<(usize, TranscriptionResult)> = Vec::new();
        while let Some(joined) = workers.join_next().await {
            let outcome = match joined {
                Ok(result) => result,
                Err(join_err) => {
                    Err(DubflowError::Internal(format!("segment worker panicked: {}", join_err)))
                }
            };
            match outcome {
                Ok(done) => completed.push(done),
                Err(e) => {
                    token.cancel();
                    let replace = match &first_error {
                        None => true,
                        Some(DubflowError::Cancelled) => !matches!(e, DubflowError::Cancelled),
                        Some(_) => false,
                    };
                    if replace {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        for (num, transcription) in completed {
            ctx.segments[num - 1].transcription = Some(transcription);
        }
        Ok(())
    }

    /// Concatenate per-segment outputs into the four task-level files.
    fn merge_segment_files(&self, ctx: &mut PipelineContext) -> Result<()> {
        let nums = 1..=ctx.segments.len();
        let join = |name: fn(usize) -> String| -> Vec<PathBuf> {
            nums.clone().map(|n| ctx.base_dir.join(name(n))).collect()
        };

        merge_plain_files(
            &ctx.base_dir.join(files::ORIGIN_NO_TS_SRT),
            &join(files::split_no_ts_srt),
        )?;

        let bilingual = ctx.base_dir.join(files::BILINGUAL_SRT);
        merge_srt_files(&bilingual, &join(files::split_bilingual_srt))?;

        merge_srt_files(
            &ctx.base_dir.join(files::SHORT_ORIGIN_MIXED_SRT),
            &join(files::split_short_origin_mixed_srt),
        )?;
        merge_srt_files(
            &ctx.base_dir.join(files::SHORT_ORIGIN_SRT),
            &join(files::split_short_origin_srt),
        )?;

        ctx.bilingual_srt = Some(bilingual);
        Ok(())
    }
}

/// Everything one fan-out worker needs; each worker exclusively owns its
/// segment until the join point.
struct SegmentJob {
    num: usize,
    audio_path: PathBuf,
    base_dir: PathBuf,
    origin_language: &'static Language,
    target_language: &'static Language,
    asr_code: String,
    translation_on_top: bool,
    modal_filter: bool,
    max_word_one_line: usize,
    segment_duration_secs: u64,
    task_id: String,
    total_segments: usize,
}

async fn process_segment(
    job: SegmentJob,
    transcriber: Arc<dyn Transcriber>,
    completer: Arc<dyn ChatCompleter>,
    registry: Arc<TaskRegistry>,
    token: CancellationToken,
    step: Arc<AtomicUsize>,
) -> Result<(usize, TranscriptionResult)> {
    if token.is_cancelled() {
        return Err(DubflowError::Cancelled);
    }

    // ASR with bounded retries.
    let mut transcription = None;
    let mut last_err = DubflowError::Transcribe("no transcription attempt made".to_string());
    for attempt in 1..=ASR_ATTEMPTS {
        match transcriber
            .transcribe(&job.audio_path, &job.asr_code, &job.base_dir)
            .await
        {
            Ok(t) => {
                transcription = Some(t);
                break;
            }
            Err(e) => {
                warn!(segment = job.num, attempt, error = %e, "transcription failed");
                last_err = e;
            }
        }
    }
    let Some(transcription) = transcription else {
        return Err(last_err);
    };
    publish_step(&registry, &job, &step);

    let no_ts_path = job.base_dir.join(files::split_no_ts_srt(job.num));

    // A silent segment produces no blocks but does not fail the task.
    if transcription.text.trim().is_empty() {
        info!(segment = job.num, "segment carries no speech");
        tokio::fs::write(&no_ts_path, NO_TEXT_SENTINEL).await?;
        publish_step(&registry, &job, &step);
        return Ok((job.num, transcription));
    }

    if token.is_cancelled() {
        return Err(DubflowError::Cancelled);
    }

    let payload = translate::split_and_translate(
        completer.as_ref(),
        job.target_language,
        job.modal_filter,
        &transcription.text,
    )
    .await?;
    tokio::fs::write(&no_ts_path, &payload).await?;
    publish_step(&registry, &job, &step);

    if token.is_cancelled() {
        return Err(DubflowError::Cancelled);
    }

    retime::retime_segment(
        &job.base_dir,
        job.num,
        job.origin_language,
        job.translation_on_top,
        job.max_word_one_line,
        ((job.num - 1) as u64 * job.segment_duration_secs) as f64,
        &transcription,
    )?;

    Ok((job.num, transcription))
}

/// Fan-out progress walks from 20 to 90 over two sub-steps per segment.
fn publish_step(registry: &TaskRegistry, job: &SegmentJob, step: &AtomicUsize) {
    let step = step.fetch_add(1, Ordering::SeqCst) + 1;
    let pct = 20 + (70 * step) / (2 * job.total_segments);
    registry.set_progress(&job.task_id, pct.min(90) as u8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::Word;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::AtomicBool;
    use tempfile::tempdir;

    struct StubTranscriber {
        text: String,
        fail: AtomicBool,
    }

    #[async_trait]
    impl Transcriber for StubTranscriber {
        async fn transcribe(
            &self,
            _audio: &Path,
            _language: &str,
            _work_dir: &Path,
        ) -> crate::error::Result<TranscriptionResult> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(DubflowError::Transcribe("stub failure".to_string()));
            }
            let words = self
                .text
                .split_whitespace()
                .enumerate()
                .map(|(i, t)| Word {
                    num: i + 1,
                    text: t.to_string(),
                    start: i as f64 * 0.1,
                    end: (i + 1) as f64 * 0.1,
                })
                .collect();
            Ok(TranscriptionResult {
                text: self.text.clone(),
                words,
            })
        }
    }

    struct StubCompleter {
        payload: String,
    }

    #[async_trait]
    impl ChatCompleter for StubCompleter {
        async fn complete(&self, _prompt: &str) -> crate::error::Result<String> {
            Ok(self.payload.clone())
        }
    }

    fn job(base_dir: &Path, num: usize, total: usize, task_id: &str) -> SegmentJob {
        SegmentJob {
            num,
            audio_path: base_dir.join(format!("split_audio_{:03}.mp3", num - 1)),
            base_dir: base_dir.to_path_buf(),
            origin_language: Language::from_tag("en").unwrap(),
            target_language: Language::from_tag("zh_cn").unwrap(),
            asr_code: "en".to_string(),
            translation_on_top: false,
            modal_filter: false,
            max_word_one_line: 12,
            segment_duration_secs: 300,
            task_id: task_id.to_string(),
            total_segments: total,
        }
    }

    #[tokio::test]
    async fn worker_produces_segment_files_and_progress() {
        let dir = tempdir().unwrap();
        let registry = Arc::new(TaskRegistry::new());
        let task_id = registry.create("local:x");
        registry.set_progress(&task_id, 20);

        let text = "the quick brown fox jumps over the lazy dog";
        let transcriber = Arc::new(StubTranscriber {
            text: text.to_string(),
            fail: AtomicBool::new(false),
        });
        let completer = Arc::new(StubCompleter {
            payload: format!("1\n你好\n[{}]\n", text),
        });

        let result = process_segment(
            job(dir.path(), 1, 1, &task_id),
            transcriber,
            completer,
            registry.clone(),
            CancellationToken::new(),
            Arc::new(AtomicUsize::new(0)),
        )
        .await;

        let (num, transcription) = result.unwrap();
        assert_eq!(num, 1);
        assert_eq!(transcription.words.len(), 9);
        assert!(dir.path().join(files::split_no_ts_srt(1)).exists());
        assert!(dir.path().join(files::split_bilingual_srt(1)).exists());
        // Both sub-steps completed: 20 + 70 * 2 / 2 = 90.
        assert_eq!(registry.get(&task_id).unwrap().progress, 90);
    }

    #[tokio::test]
    async fn worker_fails_after_asr_retries() {
        let dir = tempdir().unwrap();
        let registry = Arc::new(TaskRegistry::new());
        let task_id = registry.create("local:x");

        let transcriber = Arc::new(StubTranscriber {
            text: String::new(),
            fail: AtomicBool::new(true),
        });
        let completer = Arc::new(StubCompleter {
            payload: String::new(),
        });

        let result = process_segment(
            job(dir.path(), 1, 1, &task_id),
            transcriber,
            completer,
            registry,
            CancellationToken::new(),
            Arc::new(AtomicUsize::new(0)),
        )
        .await;

        assert!(matches!(result, Err(DubflowError::Transcribe(_))));
    }

    #[tokio::test]
    async fn silent_segment_succeeds_without_blocks() {
        let dir = tempdir().unwrap();
        let registry = Arc::new(TaskRegistry::new());
        let task_id = registry.create("local:x");

        let transcriber = Arc::new(StubTranscriber {
            text: "   ".to_string(),
            fail: AtomicBool::new(false),
        });
        let completer = Arc::new(StubCompleter {
            payload: String::new(),
        });

        let result = process_segment(
            job(dir.path(), 1, 2, &task_id),
            transcriber,
            completer,
            registry,
            CancellationToken::new(),
            Arc::new(AtomicUsize::new(0)),
        )
        .await;

        assert!(result.is_ok());
        let no_ts = std::fs::read_to_string(dir.path().join(files::split_no_ts_srt(1))).unwrap();
        assert!(no_ts.contains(NO_TEXT_SENTINEL));
        assert!(!dir.path().join(files::split_bilingual_srt(1)).exists());
    }

    #[tokio::test]
    async fn cancelled_worker_returns_promptly() {
        let dir = tempdir().unwrap();
        let registry = Arc::new(TaskRegistry::new());
        let task_id = registry.create("local:x");
        let token = CancellationToken::new();
        token.cancel();

        let transcriber = Arc::new(StubTranscriber {
            text: "hello".to_string(),
            fail: AtomicBool::new(false),
        });
        let completer = Arc::new(StubCompleter {
            payload: String::new(),
        });

        let result = process_segment(
            job(dir.path(), 1, 1, &task_id),
            transcriber,
            completer,
            registry,
            token,
            Arc::new(AtomicUsize::new(0)),
        )
        .await;

        assert!(matches!(result, Err(DubflowError::Cancelled)));
    }

    #[test]
    fn progress_formula_walks_from_20_to_90() {
        let registry = TaskRegistry::new();
        let task_id = registry.create("local:x");
        let step = AtomicUsize::new(0);
        let dir = std::env::temp_dir();
        let job = job(&dir, 1, 3, &task_id);

        let mut seen = Vec::new();
        for _ in 0..6 {
            publish_step(&registry, &job, &step);
            seen.push(registry.get(&task_id).unwrap().progress);
        }
        assert_eq!(*seen.last().unwrap(), 90);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen.iter().all(|&p| (20..=90).contains(&p)));
    }
}
