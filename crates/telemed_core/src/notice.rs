use std::time::Duration;

use telemed_logging::{telemed_debug, telemed_info};

use crate::{Effect, Notice, NoticeKind};

/// Default lifetime of a notice before it clears itself.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Holder of the transient error and success banners.
///
/// Every raise bumps `generation`; an expiry only clears the notice it was
/// armed for, so a superseded timer that still fires is harmless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NoticeChannel {
    error: Option<Notice>,
    success: Option<Notice>,
    generation: u64,
    ttl: Duration,
}

impl Default for NoticeChannel {
    fn default() -> Self {
        Self::new(NOTICE_TTL)
    }
}

impl NoticeChannel {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            error: None,
            success: None,
            generation: 0,
            ttl,
        }
    }

    pub(crate) fn get(&self, kind: NoticeKind) -> Option<&Notice> {
        match kind {
            NoticeKind::Error => self.error.as_ref(),
            NoticeKind::Success => self.success.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: NoticeKind) -> &mut Option<Notice> {
        match kind {
            NoticeKind::Error => &mut self.error,
            NoticeKind::Success => &mut self.success,
        }
    }

    /// Shows `text` as the notice of `kind`, replacing the previous one and
    /// dismissing the opposite kind.
    pub(crate) fn raise(&mut self, kind: NoticeKind, text: impl Into<String>) -> Vec<Effect> {
        let text = text.into();
        self.generation += 1;
        let generation = self.generation;

        let notice = Notice {
            kind,
            text,
            generation,
        };
        if let Some(previous) = self.slot_mut(kind).replace(notice) {
            telemed_info!(
                "{:?} notice superseded before expiry: {}",
                kind,
                previous.text
            );
        }

        let mut effects = Vec::with_capacity(2);
        let other = match kind {
            NoticeKind::Error => NoticeKind::Success,
            NoticeKind::Success => NoticeKind::Error,
        };
        effects.extend(self.clear(other));
        effects.push(Effect::ArmNoticeTimer {
            kind,
            generation,
            after: self.ttl,
        });
        effects
    }

    /// Removes the notice of `kind` right away; yields the timer cancel if one was live.
    pub(crate) fn clear(&mut self, kind: NoticeKind) -> Option<Effect> {
        self.slot_mut(kind)
            .take()
            .map(|_| Effect::DisarmNoticeTimer { kind })
    }

    /// Applies a timer firing. Returns `true` when a notice was removed.
    pub(crate) fn expire(&mut self, kind: NoticeKind, generation: u64) -> bool {
        let slot = self.slot_mut(kind);
        if slot
            .as_ref()
            .is_some_and(|notice| notice.generation == generation)
        {
            *slot = None;
            return true;
        }
        telemed_debug!(
            "Ignoring stale {:?} expiry for generation {}",
            kind,
            generation
        );
        false
    }
}
