use std::cell::OnceCell;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use crate::engine::{EngineError, EngineResult};
use crate::models::Image;
use crate::repo::AnnotationStore;

/// Per-request execution state.
///
/// Carries the cancellation token and optional deadline checked before
/// every store query, plus a cache of the full image catalog so that one
/// request (e.g. a dashboard covering every task) lists images at most once.
/// A context belongs to exactly one request and is not `Sync`.
#[derive(Debug, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    catalog: OnceCell<Vec<Image>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tie this request to an externally owned token, e.g. a child of a
    /// server-wide shutdown token
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail fast if the request was cancelled or ran out of time
    pub fn checkpoint(&self) -> EngineResult<()> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(EngineError::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Full image catalog, fetched on first use within this request
    pub fn images<S: AnnotationStore>(&self, store: &S) -> EngineResult<&[Image]> {
        if let Some(images) = self.catalog.get() {
            return Ok(images);
        }
        self.checkpoint()?;
        let images = store.list_images()?;
        log::debug!("Cached image catalog ({} images)", images.len());
        Ok(self.catalog.get_or_init(|| images))
    }
}
