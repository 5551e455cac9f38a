//! Step tracker: the progress strip shown while the pipeline runs.
//!
//! The tracker is a synchronous state machine. Time is passed in explicitly,
//! and delayed work (auto-advance, text animation frames) is recorded as a
//! deadline that the owner applies through [`StepTracker::poll`].

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::{
    ADVANCE_DELAY, CENTERED_TRACK_MAX, THINKING_DOT_INTERVAL, TYPING_MAX_EXTRA_MS,
    TYPING_MIN_STEP_MS, TYPING_START_DELAY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Processing => "processing",
            StepStatus::Completed => "completed",
            StepStatus::Error => "error",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Pending => "Pending",
            StepStatus::Processing => "Processing",
            StepStatus::Completed => "Completed",
            StepStatus::Error => "Error",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initial state of a step when it is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStart {
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepHandle(usize);

impl StepHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailSection {
    pub label: String,
    pub body: String,
}

/// Extra content a step can expose in the detail overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepDetail {
    sections: Vec<DetailSection>,
}

impl StepDetail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(mut self, label: impl Into<String>, body: impl Into<String>) -> Self {
        self.sections.push(DetailSection {
            label: label.into(),
            body: body.into(),
        });
        self
    }

    pub fn sections(&self) -> &[DetailSection] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| format!("{}:\n{}", s.label, s.body))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Idle text animation bound to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAnimation {
    Static,
    /// Typewriter: `shown` characters visible, next one at `next_at`.
    Typing {
        shown: usize,
        next_at: Instant,
        step: u64,
    },
    /// Trailing dots cycling through "", ".", "..", "...".
    Thinking { dots: usize, next_at: Instant },
}

impl StepAnimation {
    fn typing(now: Instant) -> Self {
        StepAnimation::Typing {
            shown: 0,
            next_at: now + TYPING_START_DELAY,
            step: 0,
        }
    }

    fn thinking(now: Instant) -> Self {
        StepAnimation::Thinking {
            dots: 0,
            next_at: now + THINKING_DOT_INTERVAL,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self {
            StepAnimation::Static => None,
            StepAnimation::Typing { next_at, .. } | StepAnimation::Thinking { next_at, .. } => {
                Some(*next_at)
            }
        }
    }

    /// The text as currently displayed.
    pub fn frame(&self, text: &str) -> String {
        match self {
            StepAnimation::Static => text.to_string(),
            StepAnimation::Typing { shown, .. } => text.chars().take(*shown).collect(),
            StepAnimation::Thinking { dots, .. } => {
                let base = text.trim_end_matches('.');
                format!("{base}{}", ".".repeat(*dots))
            }
        }
    }

    /// Apply every frame due by `now`. Returns whether the frame changed.
    fn tick(&mut self, text: &str, now: Instant) -> bool {
        let mut changed = false;
        loop {
            match self {
                StepAnimation::Static => return changed,
                StepAnimation::Typing {
                    shown,
                    next_at,
                    step,
                } => {
                    if *next_at > now {
                        return changed;
                    }
                    *shown += 1;
                    changed = true;
                    if *shown >= text.chars().count() {
                        *self = StepAnimation::Static;
                        return changed;
                    }
                    *next_at += typing_delay(*step);
                    *step += 1;
                }
                StepAnimation::Thinking { dots, next_at } => {
                    if *next_at > now {
                        return changed;
                    }
                    *dots = (*dots + 1) % 4;
                    *next_at += THINKING_DOT_INTERVAL;
                    changed = true;
                }
            }
        }
    }
}

/// Per-character typing delay, cycling through 45..=135 ms.
fn typing_delay(step: u64) -> Duration {
    Duration::from_millis(TYPING_MIN_STEP_MS + (step * 37) % (TYPING_MAX_EXTRA_MS + 1))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStep {
    pub index: usize,
    pub status: StepStatus,
    pub text: String,
    pub detail: Option<StepDetail>,
    pub animation: StepAnimation,
}

impl PipelineStep {
    pub fn frame(&self) -> String {
        self.animation.frame(&self.text)
    }

    pub fn has_detail(&self) -> bool {
        self.detail.as_ref().is_some_and(|d| !d.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorDot {
    pub index: usize,
    pub state: StepStatus,
    pub active: bool,
    pub title: String,
}

/// Rendering side of the tracker. Every hook defaults to a no-op.
pub trait StepView: Send {
    fn step_added(&mut self, _step: &PipelineStep) {}
    fn step_changed(&mut self, _step: &PipelineStep) {}
    fn text_frame(&mut self, _index: usize, _frame: &str) {}
    fn indicators_changed(&mut self, _dots: &[IndicatorDot]) {}
    fn scrolled_to(&mut self, _index: usize, _centered: bool) {}
    fn detail_shown(&mut self, _title: &str, _detail: &StepDetail) {}
    fn detail_hidden(&mut self) {}
}

/// A mounted view that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessView;

impl StepView for HeadlessView {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledAdvance {
    target: usize,
    at: Instant,
}

pub struct StepTracker {
    view: Option<Box<dyn StepView>>,
    steps: Vec<PipelineStep>,
    focus: Option<usize>,
    scheduled: Vec<ScheduledAdvance>,
    open_detail: Option<usize>,
    advance_delay: Duration,
}

impl StepTracker {
    pub fn new(view: Box<dyn StepView>) -> Self {
        Self {
            view: Some(view),
            steps: Vec::new(),
            focus: None,
            scheduled: Vec::new(),
            open_detail: None,
            advance_delay: ADVANCE_DELAY,
        }
    }

    /// A tracker with nowhere to render; every operation is a no-op.
    pub fn unmounted() -> Self {
        log::warn!("step tracker has no view mounted; progress will not be shown");
        Self {
            view: None,
            ..Self::new(Box::new(HeadlessView))
        }
    }

    pub fn with_advance_delay(mut self, delay: Duration) -> Self {
        self.advance_delay = delay;
        self
    }

    pub fn is_mounted(&self) -> bool {
        self.view.is_some()
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&PipelineStep> {
        self.steps.get(index)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.focus
    }

    pub fn open_detail(&self) -> Option<usize> {
        self.open_detail
    }

    pub fn is_centered(&self) -> bool {
        self.steps.len() <= CENTERED_TRACK_MAX
    }

    pub fn add_step(
        &mut self,
        text: impl Into<String>,
        start: StepStart,
        detail: Option<StepDetail>,
        now: Instant,
    ) -> Option<StepHandle> {
        self.view.as_ref()?;

        let index = self.steps.len();
        let (status, animation) = match start {
            StepStart::Active => (StepStatus::Processing, StepAnimation::typing(now)),
            StepStart::Pending => (StepStatus::Pending, StepAnimation::thinking(now)),
            StepStart::Completed => (StepStatus::Completed, StepAnimation::Static),
        };
        let step = PipelineStep {
            index,
            status,
            text: text.into(),
            detail,
            animation,
        };
        log::debug!("step {index} added as {status}: {}", step.text);
        self.steps.push(step);
        self.notify(|view, steps| view.step_added(&steps[index]));

        if start == StepStart::Active {
            self.demote_others(index, now);
            self.focus = Some(index);
            self.refresh_indicators();
            self.scroll_to(index);
        } else {
            self.refresh_indicators();
        }

        Some(StepHandle(index))
    }

    /// Make `index` the processing step, as when the user picks its indicator dot.
    ///
    /// Cancels any pending auto-advance.
    pub fn activate_step(&mut self, index: usize, now: Instant) {
        if index >= self.steps.len() {
            return;
        }
        if self.steps[index].status == StepStatus::Error {
            return;
        }
        self.scheduled.clear();
        self.focus_step(index, now);
    }

    pub fn complete_step(
        &mut self,
        handle: StepHandle,
        text: impl Into<String>,
        detail: Option<StepDetail>,
        now: Instant,
    ) {
        let index = handle.index();
        let Some(step) = self.steps.get_mut(index) else {
            return;
        };
        if step.status == StepStatus::Error {
            log::debug!("ignoring completion of failed step {index}");
            return;
        }
        let was_completed = step.status == StepStatus::Completed;
        step.status = StepStatus::Completed;
        step.text = text.into();
        if detail.is_some() {
            step.detail = detail;
        }
        step.animation = StepAnimation::Static;

        self.notify(|view, steps| {
            view.step_changed(&steps[index]);
            view.text_frame(index, &steps[index].text);
        });
        self.refresh_indicators();

        if !was_completed && index + 1 < self.steps.len() {
            self.scheduled.push(ScheduledAdvance {
                target: index + 1,
                at: now + self.advance_delay,
            });
        }
    }

    /// Mark the step failed. No auto-advance follows an error.
    pub fn fail_step(&mut self, handle: StepHandle, message: &str) {
        let index = handle.index();
        let Some(step) = self.steps.get_mut(index) else {
            return;
        };
        step.status = StepStatus::Error;
        step.text = format!("Error: {message}");
        step.animation = StepAnimation::Static;
        self.scheduled.clear();

        self.notify(|view, steps| {
            view.step_changed(&steps[index]);
            view.text_frame(index, &steps[index].text);
        });
        self.refresh_indicators();
    }

    pub fn show_detail(&mut self, handle: StepHandle) {
        let index = handle.index();
        let Some(step) = self.steps.get(index) else {
            return;
        };
        if !step.has_detail() {
            return;
        }
        self.open_detail = Some(index);
        self.notify(|view, steps| {
            if let Some(detail) = &steps[index].detail {
                view.detail_shown(&steps[index].text, detail);
            }
        });
    }

    pub fn hide_detail(&mut self) {
        if self.open_detail.take().is_some() {
            self.notify(|view, _| view.detail_hidden());
        }
    }

    /// Apply auto-advances and animation frames due by `now`.
    pub fn poll(&mut self, now: Instant) {
        while let Some(pos) = self.next_due_advance(now) {
            let advance = self.scheduled.remove(pos);
            let target = &self.steps[advance.target];
            if matches!(target.status, StepStatus::Pending | StepStatus::Processing) {
                log::debug!("auto-advancing to step {}", advance.target);
                self.focus_step(advance.target, now);
            }
        }

        for index in 0..self.steps.len() {
            let step = &mut self.steps[index];
            if step.animation.tick(&step.text, now) {
                self.notify(|view, steps| view.text_frame(index, &steps[index].frame()));
            }
        }
    }

    /// The earliest instant at which `poll` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let advances = self.scheduled.iter().map(|a| a.at);
        let frames = self.steps.iter().filter_map(|s| s.animation.deadline());
        advances.chain(frames).min()
    }

    pub fn has_pending_advance(&self) -> bool {
        !self.scheduled.is_empty()
    }

    pub fn indicator_dots(&self) -> Vec<IndicatorDot> {
        self.steps
            .iter()
            .map(|step| IndicatorDot {
                index: step.index,
                state: step.status,
                active: step.status == StepStatus::Processing,
                title: format!("Step {} ({})", step.index + 1, step.status.label()),
            })
            .collect()
    }

    fn next_due_advance(&self, now: Instant) -> Option<usize> {
        self.scheduled
            .iter()
            .enumerate()
            .filter(|(_, a)| a.at <= now)
            .min_by_key(|(_, a)| a.at)
            .map(|(pos, _)| pos)
    }

    fn focus_step(&mut self, index: usize, now: Instant) {
        let step = &mut self.steps[index];
        match step.status {
            StepStatus::Error => return,
            StepStatus::Processing if self.focus == Some(index) => return,
            StepStatus::Completed => {}
            StepStatus::Pending | StepStatus::Processing => {
                step.status = StepStatus::Processing;
                step.animation = StepAnimation::typing(now);
                self.notify(|view, steps| view.step_changed(&steps[index]));
                self.demote_others(index, now);
            }
        }
        self.focus = Some(index);
        self.refresh_indicators();
        self.scroll_to(index);
    }

    fn demote_others(&mut self, keep: usize, now: Instant) {
        for i in 0..self.steps.len() {
            if i != keep && self.steps[i].status == StepStatus::Processing {
                self.steps[i].status = StepStatus::Pending;
                self.steps[i].animation = StepAnimation::thinking(now);
                self.notify(|view, steps| view.step_changed(&steps[i]));
            }
        }
    }

    fn refresh_indicators(&mut self) {
        let dots = self.indicator_dots();
        self.notify(|view, _| view.indicators_changed(&dots));
    }

    fn scroll_to(&mut self, index: usize) {
        let centered = self.is_centered();
        self.notify(|view, _| view.scrolled_to(index, centered));
    }

    fn notify(&mut self, f: impl FnOnce(&mut dyn StepView, &[PipelineStep])) {
        if let Some(view) = self.view.as_deref_mut() {
            f(view, &self.steps);
        }
    }
}
