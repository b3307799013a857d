//! The async front door: one call per incoming event.
//!
//! ## Why release the lock before running a job?
//!
//! Transforms can take minutes (pdfium rendering every page, ffmpeg
//! re-encoding a video). [`step`] finishes its state change and resets the
//! mode before returning the [`Job`], so the session lock is dropped while the
//! handler runs and the operator's next event is never blocked behind it.
//! Handlers only see the snapshot the job carries.
//!
//! ## Why spawn_blocking for documents?
//!
//! pdfium is synchronous and CPU-bound. Document jobs move to tokio's blocking
//! pool; video jobs stay on the runtime because they only await child
//! processes.

use crate::codec::{DocumentCodec, PdfiumCodec};
use crate::config::EngineConfig;
use crate::error::{DocflowError, HandlerError};
use crate::handlers::{self, HandlerOutput};
use crate::media::{FfmpegMuxer, VideoMuxer};
use crate::session::{DocumentItem, SessionStore, UserId};
use crate::transport::{deliver, Event, Reply, Transport};
use crate::workflow::words::word_frequencies;
use crate::workflow::{step, suggestions_ready, DocumentJob, Job, VideoJob};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns the session table and the backends every handler runs against.
pub struct Engine {
    config: Arc<EngineConfig>,
    sessions: SessionStore,
    codec: Arc<dyn DocumentCodec>,
    muxer: Arc<dyn VideoMuxer>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        codec: Arc<dyn DocumentCodec>,
        muxer: Arc<dyn VideoMuxer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions: SessionStore::new(),
            codec,
            muxer,
        }
    }

    /// pdfium located through `PDFIUM_LIB_PATH` (or the system library) and
    /// `ffmpeg` from `PATH`.
    pub fn with_default_backends(config: EngineConfig) -> Self {
        Self::new(
            config,
            Arc::new(PdfiumCodec::from_env()),
            Arc::new(FfmpegMuxer::default()),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Process one event for `user` and deliver every reply it produces.
    ///
    /// Handler failures are reported to the operator, not returned. `Err`
    /// means the transport could not deliver or a worker task died.
    pub async fn handle(
        &self,
        user: UserId,
        event: Event,
        transport: &dyn Transport,
    ) -> Result<(), DocflowError> {
        let outcome = self
            .sessions
            .with_session(user, |session| step(session, event, &self.config))
            .await;
        send_all(transport, &outcome.replies).await?;

        let Some(job) = outcome.job else {
            return Ok(());
        };
        let operation = job.operation();
        info!(user = %user, operation, "Running job");
        let replies = self.run(user, job).await?;
        send_all(transport, &replies).await
    }

    async fn run(&self, user: UserId, job: Job) -> Result<Vec<Reply>, DocflowError> {
        let operation = job.operation();
        let result = match job {
            Job::Suggest { documents } => {
                let words = self.suggest(documents).await?;
                debug!(user = %user, "{} word suggestions", words.len());
                let replies = self
                    .sessions
                    .with_session(user, |session| suggestions_ready(session, words))
                    .await;
                return Ok(replies);
            }
            Job::Document(job) => self.run_document(job).await?,
            Job::Video(job) => self.run_video(job).await,
        };

        match result {
            Ok(output) => {
                match serde_json::to_string(&output.report(operation)) {
                    Ok(report) => debug!(operation, "Batch report: {}", report),
                    Err(e) => warn!(operation, "Batch report not serialisable: {}", e),
                }
                Ok(output.into_replies())
            }
            Err(e) => {
                warn!(operation, "Job rejected its input: {}", e);
                Ok(vec![Reply::text(format!("❌ {e}"))])
            }
        }
    }

    /// Count words over every page of every document. Unreadable documents
    /// are skipped.
    async fn suggest(&self, documents: Vec<DocumentItem>) -> Result<Vec<(String, usize)>, DocflowError> {
        let codec = Arc::clone(&self.codec);
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || {
            let mut texts = Vec::new();
            for doc in &documents {
                match codec.page_texts(&doc.bytes) {
                    Ok(pages) => texts.extend(pages),
                    Err(e) => warn!("Skipping {} for suggestions: {}", doc.name, e),
                }
            }
            word_frequencies(&texts, config.min_word_len, config.suggestion_limit)
        })
        .await
        .map_err(|e| DocflowError::WorkerFailed(format!("Suggestion task panicked: {}", e)))
    }

    async fn run_document(
        &self,
        job: DocumentJob,
    ) -> Result<Result<HandlerOutput, HandlerError>, DocflowError> {
        let codec = Arc::clone(&self.codec);
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || run_document_blocking(codec.as_ref(), &config, job))
            .await
            .map_err(|e| DocflowError::WorkerFailed(format!("Document task panicked: {}", e)))
    }

    async fn run_video(&self, job: VideoJob) -> Result<HandlerOutput, HandlerError> {
        let muxer = self.muxer.as_ref();
        match job {
            VideoJob::Cover { videos, cover } => {
                handlers::video::set_cover(muxer, &self.config, &videos, &cover).await
            }
            VideoJob::Caption {
                videos,
                cover,
                caption,
            } => {
                handlers::video::caption_and_cover(muxer, &self.config, &videos, &cover, &caption)
                    .await
            }
        }
    }
}

fn run_document_blocking(
    codec: &dyn DocumentCodec,
    config: &EngineConfig,
    job: DocumentJob,
) -> Result<HandlerOutput, HandlerError> {
    match job {
        DocumentJob::Watermark {
            documents,
            text,
            opacity,
        } => Ok(handlers::watermark::watermark(codec, config, &documents, &text, opacity)),
        DocumentJob::DeletePages { documents, target } => {
            handlers::delete::delete_matching_pages(codec, config, &documents, &target)
        }
        DocumentJob::InsertPage {
            documents,
            position,
            image,
        } => handlers::insert::insert_page(codec, config, &documents, position, &image),
        DocumentJob::FindReplace {
            documents,
            find,
            replace,
        } => Ok(handlers::replace::find_replace(codec, config, &documents, &find, &replace)),
        DocumentJob::Rename { documents, pattern } => {
            Ok(handlers::rename::rename(config, &documents, &pattern))
        }
        DocumentJob::SetThumbnail { documents, image } => {
            handlers::thumbnail::set_thumbnail(codec, config, &documents, &image)
        }
        DocumentJob::RemoveThumbnail { documents } => {
            Ok(handlers::thumbnail::remove_thumbnail(codec, config, &documents))
        }
    }
}

async fn send_all(transport: &dyn Transport, replies: &[Reply]) -> Result<(), DocflowError> {
    for reply in replies {
        deliver(transport, reply).await?;
    }
    Ok(())
}
