//! Editor image insertion
//!
//! Inserting an image into the rich-text widget right after it regains focus
//! races with the widget's own selection handling. The default
//! [`InsertStrategy::FixedDelay`] works around this with timed steps:
//!
//! 1. enable the widget
//! 2. after 100 ms, insert a line break at the selection (or the given offset)
//! 3. after another 50 ms, embed the image there and move the cursor past it
//!
//! The delays are guesses, not guarantees: a slow widget can still lose the
//! race. Widgets that report readiness should use
//! [`InsertStrategy::WaitForReady`], which polls [`EditorWidget::is_ready`]
//! instead of sleeping a fixed time.
//!
//! Every step logs its own failure and stops the sequence. Nothing already
//! applied is rolled back and nothing is retried.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::error::ClientResult;

/// Wait before the line break is inserted
pub const ENABLE_DELAY: Duration = Duration::from_millis(100);

/// Wait between the line break and the image embed
pub const EMBED_DELAY: Duration = Duration::from_millis(50);

/// Errors reported by an editor widget
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("editor is read-only")]
    Disabled,

    #[error("index {index} is outside the document (length {length})")]
    OutOfRange { index: usize, length: usize },

    #[error("editor widget error: {0}")]
    Widget(String),
}

/// The operations the insertion helper needs from a rich-text widget
pub trait EditorWidget: Send + Sync {
    fn enable(&self) -> Result<(), EditorError>;

    /// Cursor index, `None` when the widget has no focus
    fn selection(&self) -> Option<usize>;

    /// Document length
    fn length(&self) -> usize;

    fn insert_text(&self, index: usize, text: &str) -> Result<(), EditorError>;

    fn insert_embed(&self, index: usize, kind: &str, value: &str) -> Result<(), EditorError>;

    fn set_selection(&self, index: usize) -> Result<(), EditorError>;

    /// Whether the widget can take edits now. Widgets without such a signal
    /// report `true` and should be driven with the fixed-delay strategy.
    fn is_ready(&self) -> bool {
        true
    }
}

/// A pasted or dropped file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PastedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl PastedFile {
    pub fn is_image(&self) -> bool {
        self.mime.contains("image")
    }
}

/// Uploads a file and returns the URL to embed
#[async_trait]
pub trait UploadHandler: Send + Sync {
    async fn upload(&self, file: &PastedFile) -> ClientResult<String>;
}

/// How the helper waits between steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertStrategy {
    /// Sleep [`ENABLE_DELAY`] then [`EMBED_DELAY`]
    #[default]
    FixedDelay,
    /// Poll `is_ready` before each step, giving up after `timeout`
    WaitForReady {
        timeout: Duration,
        poll_interval: Duration,
    },
}

impl InsertStrategy {
    pub fn wait_for_ready() -> Self {
        InsertStrategy::WaitForReady {
            timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(10),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Anchor {
    /// Read the selection when the line break goes in
    Selection { fallback: usize },
    /// Index fixed before the sequence started
    At(usize),
}

/// Inserts uploaded images into one widget
pub struct ImageInserter {
    widget: Arc<dyn EditorWidget>,
    uploader: Arc<dyn UploadHandler>,
    strategy: InsertStrategy,
}

impl ImageInserter {
    pub fn new(widget: Arc<dyn EditorWidget>, uploader: Arc<dyn UploadHandler>) -> Self {
        Self {
            widget,
            uploader,
            strategy: InsertStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: InsertStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Insert `url` at the selection, or at `offset` when there is none
    pub async fn insert_image(&self, offset: usize, url: &str) {
        run_sequence(
            self.widget.as_ref(),
            Anchor::Selection { fallback: offset },
            url,
            self.strategy,
        )
        .await;
    }

    /// Upload and insert the first image among the clipboard items.
    ///
    /// Returns `None` when there is no image, so the widget's default paste
    /// should proceed. The returned task completes once the sequence ends.
    pub fn handle_paste(&self, items: &[PastedFile]) -> Option<JoinHandle<()>> {
        let file = items.iter().find(|item| item.is_image())?.clone();
        Some(self.spawn_upload(file, "paste"))
    }

    /// Same as [`handle_paste`](Self::handle_paste) for dropped files
    pub fn handle_drop(&self, files: &[PastedFile]) -> Option<JoinHandle<()>> {
        let file = files.iter().find(|f| f.is_image())?.clone();
        Some(self.spawn_upload(file, "drop"))
    }

    fn spawn_upload(&self, file: PastedFile, source: &'static str) -> JoinHandle<()> {
        let widget = Arc::clone(&self.widget);
        let uploader = Arc::clone(&self.uploader);
        let strategy = self.strategy;

        tokio::spawn(async move {
            let url = match uploader.upload(&file).await {
                Ok(url) => url,
                Err(e) => {
                    tracing::error!(source, file = %file.name, error = %e, "Image upload failed");
                    return;
                }
            };
            let index = widget.selection().unwrap_or_else(|| widget.length());
            run_sequence(widget.as_ref(), Anchor::At(index), &url, strategy).await;
        })
    }
}

impl std::fmt::Debug for ImageInserter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageInserter")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

async fn settle(widget: &dyn EditorWidget, strategy: InsertStrategy, fixed: Duration) {
    match strategy {
        InsertStrategy::FixedDelay => tokio::time::sleep(fixed).await,
        InsertStrategy::WaitForReady {
            timeout,
            poll_interval,
        } => {
            let deadline = Instant::now() + timeout;
            while !widget.is_ready() {
                if Instant::now() >= deadline {
                    tracing::warn!(?timeout, "Editor not ready, continuing anyway");
                    return;
                }
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}

async fn run_sequence(widget: &dyn EditorWidget, anchor: Anchor, url: &str, strategy: InsertStrategy) {
    if let Err(e) = widget.enable() {
        tracing::error!(error = %e, "Could not enable editor for image insert");
        return;
    }

    settle(widget, strategy, ENABLE_DELAY).await;

    let index = match anchor {
        Anchor::Selection { fallback } => widget.selection().unwrap_or(fallback),
        Anchor::At(index) => index,
    };
    if let Err(e) = widget.insert_text(index, "\n") {
        tracing::error!(index, error = %e, "Line break before image failed");
        return;
    }

    settle(widget, strategy, EMBED_DELAY).await;

    if let Err(e) = widget.insert_embed(index, "image", url) {
        tracing::error!(index, url, error = %e, "Image embed failed");
        return;
    }
    if let Err(e) = widget.set_selection(index + 1) {
        tracing::error!(index, error = %e, "Moving cursor after image failed");
    }
}
