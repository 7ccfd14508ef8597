//! Activation state machine and scheduling
//!
//! The engine is a single owned value driven by three inputs from the host:
//! activation toggles, mutation batches, and wakeups (`run_due`) once the
//! deadline reported by [`AnnotationEngine::next_deadline`] has passed. Time is
//! injected in milliseconds, so the debounce and settle delays can be tested
//! by feeding synthetic timestamps.
//!
//! Deferred work is only ever executed from `run_due`, which re-checks the
//! state first. A host timer that fires after deactivation therefore finds
//! nothing to do, whether or not the host managed to cancel it.

use crate::annotate::{self, conversation_title, PassReport};
use crate::classify::{classify, Direction};
use crate::config::EngineConfig;
use crate::dom::{selectors, HostDom, MutationBatch, NodeId};
use crate::extract::extract;
use crate::locale::Locale;
use crate::marks::NodeMarks;
use crate::notify::NotificationSink;
use crate::rate_limit::{AnnouncementLimiter, RateLimitConfig, RateLimitResult};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingAnnouncement {
    node: NodeId,
    direction: Direction,
    due: u64,
}

/// What one wakeup did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub announced: usize,
    /// Announcements suppressed by the rate limiter
    pub muted: usize,
    pub pass: Option<PassReport>,
}

pub struct AnnotationEngine {
    config: EngineConfig,
    state: EngineState,
    locale: Locale,
    marks: NodeMarks,
    limiter: AnnouncementLimiter,
    announcements: Vec<PendingAnnouncement>,
    pass_due: Option<u64>,
}

impl AnnotationEngine {
    pub fn new(config: EngineConfig) -> Self {
        let limiter = AnnouncementLimiter::new(RateLimitConfig::from(&config));
        Self {
            locale: config.locale.unwrap_or_default(),
            config,
            state: EngineState::Inactive,
            marks: NodeMarks::new(),
            limiter,
            announcements: Vec::new(),
            pass_due: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == EngineState::Active
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn marks(&self) -> &NodeMarks {
        &self.marks
    }

    /// Earliest moment `run_due` has work to do
    pub fn next_deadline(&self) -> Option<u64> {
        self.announcements
            .iter()
            .map(|a| a.due)
            .chain(self.pass_due)
            .min()
    }

    /// Inactive → Active, if the host page has finished loading
    ///
    /// Success or failure is reported to the user through `sink`; the returned
    /// state is informational.
    pub fn activate<D, S>(&mut self, dom: &mut D, sink: &mut S, now: u64) -> EngineState
    where
        D: HostDom + ?Sized,
        S: NotificationSink + ?Sized,
    {
        if self.is_active() {
            return self.state;
        }
        let strings = self.locale.strings();

        if dom.query(None, selectors::SIDE_PANEL).is_none() {
            info!("Activation rejected: side panel not found");
            sink.notify(strings.loading);
            return self.state;
        }

        self.state = EngineState::Active;
        self.run_pass(dom);

        let root = dom
            .query(None, selectors::APP_ROOT)
            .or_else(|| dom.query(None, selectors::BODY));
        let observed = match root {
            Some(root) => dom.observe(root).map_err(|e| e.to_string()),
            None => Err("no observation root".to_string()),
        };
        if let Err(e) = observed {
            error!("Failed to start observing: {}", e);
            self.state = EngineState::Inactive;
            sink.notify(strings.loading);
            return self.state;
        }

        debug!("Observer started at t={}", now);
        sink.notify(strings.activated);
        self.state
    }

    /// Active → Inactive; stops observation synchronously
    pub fn deactivate<D, S>(&mut self, dom: &mut D, sink: &mut S)
    where
        D: HostDom + ?Sized,
        S: NotificationSink + ?Sized,
    {
        if !self.is_active() {
            return;
        }
        dom.disconnect();
        self.state = EngineState::Inactive;
        self.drop_scheduled();
        debug!("Observer stopped");
        sink.notify(self.locale.strings().deactivated);
    }

    pub fn toggle<D, S>(&mut self, dom: &mut D, sink: &mut S, now: u64) -> EngineState
    where
        D: HostDom + ?Sized,
        S: NotificationSink + ?Sized,
    {
        if self.is_active() {
            self.deactivate(dom, sink);
            self.state
        } else {
            self.activate(dom, sink, now)
        }
    }

    /// Switch to the next interface language and relabel the page
    pub fn cycle_locale<D, S>(&mut self, dom: &mut D, sink: &mut S) -> Locale
    where
        D: HostDom + ?Sized,
        S: NotificationSink + ?Sized,
    {
        self.set_locale(self.locale.next());
        sink.notify(self.locale.strings().language_changed);
        self.refresh(dom);
        self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    /// Forget processed markers and relabel everything now
    pub fn refresh<D: HostDom + ?Sized>(&mut self, dom: &mut D) -> Option<PassReport> {
        if !self.is_active() {
            return None;
        }
        self.marks.clear_processed();
        Some(self.run_pass(dom))
    }

    /// React to one batch from the observation subscription
    pub fn on_mutations<D: HostDom + ?Sized>(&mut self, dom: &mut D, batch: &MutationBatch, now: u64) {
        if !self.is_active() || batch.is_empty() {
            return;
        }

        self.marks.evict_if_detached(dom, batch.removed_nodes());

        for candidate in classify(dom, batch, &self.config) {
            if self.marks.is_announced(candidate.node) || self.marks.is_pending(candidate.node) {
                continue;
            }
            self.marks.set_pending(candidate.node, true);
            self.announcements.push(PendingAnnouncement {
                node: candidate.node,
                direction: candidate.direction,
                due: now.saturating_add(self.config.settle_delay_ms),
            });
        }

        // trailing debounce: every burst pushes the pass back
        self.pass_due = Some(now.saturating_add(self.config.debounce_ms));
    }

    /// Execute every deferred action whose time has come
    pub fn run_due<D, S>(&mut self, dom: &mut D, sink: &mut S, now: u64) -> TickReport
    where
        D: HostDom + ?Sized,
        S: NotificationSink + ?Sized,
    {
        let mut report = TickReport::default();
        if !self.is_active() {
            self.drop_scheduled();
            return report;
        }
        self.limiter.cleanup(now);

        let (due, later): (Vec<_>, Vec<_>) = self
            .announcements
            .drain(..)
            .partition(|a| a.due <= now);
        self.announcements = later;

        for pending in due {
            match self.fire_announcement(dom, sink, pending, now) {
                Some(true) => report.announced += 1,
                Some(false) => report.muted += 1,
                None => {}
            }
        }

        if self.pass_due.is_some_and(|due| due <= now) {
            self.pass_due = None;
            report.pass = Some(self.run_pass(dom));
        }

        report
    }

    fn run_pass<D: HostDom + ?Sized>(&mut self, dom: &mut D) -> PassReport {
        self.marks.evict_detached(dom);
        annotate::run(dom, &mut self.marks, self.locale.strings())
    }

    /// `Some(true)` announced, `Some(false)` muted, `None` nothing to say
    fn fire_announcement<D, S>(
        &mut self,
        dom: &mut D,
        sink: &mut S,
        pending: PendingAnnouncement,
        now: u64,
    ) -> Option<bool>
    where
        D: HostDom + ?Sized,
        S: NotificationSink + ?Sized,
    {
        let node = pending.node;
        self.marks.set_pending(node, false);
        if self.marks.is_announced(node) {
            return None;
        }
        if !dom.is_connected(node) {
            debug!("Message {} detached before it could be announced", node);
            return None;
        }

        let strings = self.locale.strings();
        let Some(text) = extract(dom, node, strings) else {
            debug!("Message {} has nothing to announce yet", node);
            return None;
        };

        if self.marks.is_processed(node) && self.marks.label(node) != Some(text.as_str()) {
            annotate::apply_label(dom, node, &text);
            self.marks.mark_processed(node, Some(text.clone()));
        }

        let conversation = conversation_title(dom).unwrap_or_default();
        if let RateLimitResult::Blocked { blocked_for_ms } = self.limiter.check(&conversation, now) {
            info!(
                "Announcement muted for {} more ms in '{}'",
                blocked_for_ms, conversation
            );
            self.marks.mark_announced(node);
            return Some(false);
        }

        if let Err(e) = sink.play_cue() {
            warn!("{}", e);
        }
        let prefix = match pending.direction {
            Direction::Incoming => strings.received,
            Direction::Outgoing => strings.sent,
        };
        sink.announce(&format!("{}{}", prefix, text));
        self.marks.mark_announced(node);
        Some(true)
    }

    fn drop_scheduled(&mut self) {
        self.announcements.clear();
        self.pass_due = None;
        self.marks.clear_pending();
    }
}
