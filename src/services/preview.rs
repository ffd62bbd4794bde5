//! Hover preview — debounced start, abort on leave.
//!
//! DESIGN
//! ======
//! Hovering a sound schedules a tokio task that sleeps for the configured
//! delay and then publishes the preview URL on a watch channel. Leaving, or
//! hovering something else, aborts the pending task. Only one preview is
//! ever pending or active.
//!
//! The scheduler does not play audio. Whatever renders the browser watches
//! `previewing()` and starts or stops its own player.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::SoundpadConfig;
use crate::services::soundpad::{SoundpadBrowser, SoundpadError};

pub struct PreviewScheduler {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    active: Arc<watch::Sender<Option<String>>>,
}

impl PreviewScheduler {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        let (active, _) = watch::channel(None);
        Self { delay, pending: Mutex::new(None), active: Arc::new(active) }
    }

    #[must_use]
    pub fn from_config(config: &SoundpadConfig) -> Self {
        Self::new(config.preview_delay)
    }

    /// URL currently previewing, `None` when idle.
    #[must_use]
    pub fn previewing(&self) -> watch::Receiver<Option<String>> {
        self.active.subscribe()
    }

    /// Schedule a preview of `url`, replacing any pending or active one.
    pub async fn hover(&self, url: String) {
        let mut pending = self.pending.lock().await;
        if let Some(task) = pending.take() {
            task.abort();
        }
        self.active.send_replace(None);

        let delay = self.delay;
        let active = Arc::clone(&self.active);
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(url = %url, "preview started");
            active.send_replace(Some(url));
        }));
    }

    /// Schedule a preview of a browser sound.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSound` for a bad handle.
    pub async fn hover_sound(&self, browser: &SoundpadBrowser, idx: usize) -> Result<(), SoundpadError> {
        let url = browser.preview_url(idx)?;
        self.hover(url).await;
        Ok(())
    }

    /// Cancel a pending preview and stop an active one.
    pub async fn leave(&self) {
        if let Some(task) = self.pending.lock().await.take() {
            task.abort();
        }
        if self.active.send_replace(None).is_some() {
            debug!("preview stopped");
        }
    }
}

impl Drop for PreviewScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.pending.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::soundpad;
    use crate::state::test_helpers::test_context;

    const DELAY: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn preview_starts_after_delay() {
        let scheduler = PreviewScheduler::new(DELAY);
        let rx = scheduler.previewing();

        scheduler.hover("a.ogg".into()).await;
        assert!(rx.borrow().is_none());

        tokio::time::sleep(DELAY * 4).await;
        assert_eq!(rx.borrow().as_deref(), Some("a.ogg"));

        scheduler.leave().await;
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn leaving_early_cancels() {
        let scheduler = PreviewScheduler::new(DELAY);
        let rx = scheduler.previewing();

        scheduler.hover("a.ogg".into()).await;
        scheduler.leave().await;
        tokio::time::sleep(DELAY * 4).await;
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn hovering_another_sound_replaces() {
        let scheduler = PreviewScheduler::new(DELAY);
        let rx = scheduler.previewing();

        scheduler.hover("a.ogg".into()).await;
        scheduler.hover("b.ogg".into()).await;
        tokio::time::sleep(DELAY * 4).await;
        assert_eq!(rx.borrow().as_deref(), Some("b.ogg"));
    }

    #[tokio::test]
    async fn hover_sound_uses_signed_url() {
        let ctx = test_context();
        let browser = soundpad::open(&ctx).await.unwrap();
        let scheduler = PreviewScheduler::from_config(&ctx.config.soundpad);
        let rx = scheduler.previewing();

        scheduler.hover_sound(&browser, 3).await.unwrap();
        tokio::time::sleep(ctx.config.soundpad.preview_delay * 4).await;
        assert_eq!(rx.borrow().as_deref(), Some("https://cdn.test/tta/Forest/owl_hoot.ogg?sig=tta"));

        assert!(scheduler.hover_sound(&browser, 42).await.is_err());
    }
}
