//! The think page: describe the media, find similar poems, generate a new
//! poem, then hand off to the guessing page.
//!
//! Stages run strictly in sequence. While a request, reveal or dwell is in
//! flight the tracker keeps being polled at its deadlines so auto-advance
//! and step animations stay live on the same task.

use std::future::Future;

use tokio::time::{Instant, sleep, sleep_until};

use crate::api::{BilingualText, SimilarPoems};
use crate::backend::PoemBackend;
use crate::errors::{PipelineError, StageError};
use crate::events::{EventContext, EventManager, PipelineEvent};
use crate::handoff::{GuessParams, ThinkParams};
use crate::poem::{format_chinese_poem, poem_columns, split_description};
use crate::reveal::{RevealSpeeds, RevealTarget, TextBuffer, reveal_pair};
use crate::tracker::{StepDetail, StepHandle, StepStart, StepTracker};
use crate::types::RunId;

pub mod logging;
pub mod pacing;
pub mod types;

pub use logging::PipelineLogger;
pub use pacing::Pacing;
pub use types::{PipelinePhase, StageKind, StageOutcome, StageRecord, ThinkOutcome};

/// Which bilingual pair a reveal writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSection {
    Description,
    Poem,
}

/// The content area beside the tracker.
pub trait ContentView: Send {
    /// Primary and secondary targets for a bilingual reveal.
    fn reveal_targets(
        &mut self,
        section: ContentSection,
    ) -> (&mut dyn RevealTarget, &mut dyn RevealTarget);

    fn reveal_finished(&mut self, _section: ContentSection) {}

    /// Formatted poems with their translations, shown all at once.
    fn show_similar_poems(&mut self, _poems: &[BilingualText]) {}

    fn show_poem_columns(&mut self, _columns: &[Vec<String>], _translation: &str) {}

    fn show_error(&mut self, _message: &str) {}
}

/// Content area that keeps everything in memory.
#[derive(Debug, Default)]
pub struct BufferedContent {
    pub primary: TextBuffer,
    pub secondary: TextBuffer,
    /// Each finished reveal, in order.
    pub revealed: Vec<(ContentSection, String, String)>,
    pub similar_poems: Vec<BilingualText>,
    pub poem_columns: Vec<Vec<String>>,
    pub error: Option<String>,
}

impl ContentView for BufferedContent {
    fn reveal_targets(
        &mut self,
        _section: ContentSection,
    ) -> (&mut dyn RevealTarget, &mut dyn RevealTarget) {
        (&mut self.primary, &mut self.secondary)
    }

    fn reveal_finished(&mut self, section: ContentSection) {
        self.revealed.push((
            section,
            self.primary.as_str().to_string(),
            self.secondary.as_str().to_string(),
        ));
    }

    fn show_similar_poems(&mut self, poems: &[BilingualText]) {
        self.similar_poems = poems.to_vec();
    }

    fn show_poem_columns(&mut self, columns: &[Vec<String>], _translation: &str) {
        self.poem_columns = columns.to_vec();
    }

    fn show_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }
}

/// Everything the run has accumulated so far.
#[derive(Debug)]
pub struct PipelineState {
    pub phase: PipelinePhase,
    pub handles: Vec<StepHandle>,
    pub description: Option<BilingualText>,
    pub similar: Option<SimilarPoems>,
    pub poem: Option<BilingualText>,
    pub records: Vec<StageRecord>,
    run_started: Option<Instant>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            phase: PipelinePhase::Idle,
            handles: Vec::new(),
            description: None,
            similar: None,
            poem: None,
            records: Vec::new(),
            run_started: None,
        }
    }
}

pub struct ThinkPipeline<C: ContentView> {
    backend: Box<dyn PoemBackend>,
    tracker: StepTracker,
    content: C,
    pacing: Pacing,
    speeds: RevealSpeeds,
    events: EventManager,
    logger: Option<PipelineLogger>,
    run_id: RunId,
    show_details: bool,
    state: PipelineState,
}

impl<C: ContentView> ThinkPipeline<C> {
    pub fn new(backend: Box<dyn PoemBackend>, tracker: StepTracker, content: C) -> Self {
        Self {
            backend,
            tracker,
            content,
            pacing: Pacing::default(),
            speeds: RevealSpeeds::default(),
            events: EventManager::new(),
            logger: None,
            run_id: RunId::generate(),
            show_details: false,
            state: PipelineState::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_speeds(mut self, speeds: RevealSpeeds) -> Self {
        self.speeds = speeds;
        self
    }

    pub fn with_logger(mut self, logger: PipelineLogger) -> Self {
        self.logger = Some(logger.with_run_id(self.run_id.clone()));
        self
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    /// Open each step's detail overlay as soon as the step completes.
    pub fn with_details(mut self, show: bool) -> Self {
        self.show_details = show;
        self
    }

    pub fn events_mut(&mut self) -> &mut EventManager {
        &mut self.events
    }

    pub fn phase(&self) -> PipelinePhase {
        self.state.phase
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn tracker(&self) -> &StepTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut StepTracker {
        &mut self.tracker
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Run every stage in order. The first failure halts the run.
    pub async fn run(&mut self, params: &ThinkParams) -> Result<ThinkOutcome, PipelineError> {
        let now = Instant::now();
        self.state = PipelineState {
            run_started: Some(now),
            ..PipelineState::default()
        };
        self.register_steps(now);
        let media = params.media();
        self.fire(
            PipelineEvent::RunStarted,
            EventContext::new()
                .with_message(params.describe_url())
                .with_metadata("media_url", media.url.as_str())
                .with_metadata("media_type", media.kind.as_str()),
        );

        // 1. describe
        let started = self.begin_stage(StageKind::Describe);
        let response = pump_during(
            &mut self.tracker,
            self.backend.describe_media(params.describe_url()),
        )
        .await;
        let description = self.settle(StageKind::Describe, started, response)?;
        self.complete(
            StageKind::Describe,
            StepDetail::new()
                .section("Chinese Description", &description.primary)
                .section("English Description", &description.secondary),
        );
        self.reveal_description(&description).await;
        self.dwell(StageKind::Describe, started).await;
        self.state.description = Some(description.clone());

        // 2. similar poems
        let started = self.begin_stage(StageKind::FindSimilar);
        let response = pump_during(
            &mut self.tracker,
            self.backend.find_similar_poems(&description.primary),
        )
        .await;
        let similar = self.settle(StageKind::FindSimilar, started, response)?;
        self.complete(
            StageKind::FindSimilar,
            StepDetail::new()
                .section("Chinese Poems", join_poems(similar.poems.iter().map(|p| &p.primary)))
                .section(
                    "English Translations",
                    join_poems(similar.poems.iter().map(|p| &p.secondary)),
                ),
        );
        self.show_similar(&similar);
        self.dwell(StageKind::FindSimilar, started).await;
        let similar_texts = similar.primary_texts();
        self.state.similar = Some(similar);

        // 3. generate
        let started = self.begin_stage(StageKind::Generate);
        let response = pump_during(
            &mut self.tracker,
            self.backend
                .generate_poem(&description.primary, &similar_texts),
        )
        .await;
        let poem = self.settle(StageKind::Generate, started, response)?;
        self.complete(
            StageKind::Generate,
            StepDetail::new()
                .section("Generated Chinese Poem", &poem.primary)
                .section("English Translation", &poem.secondary),
        );
        self.reveal_poem(&poem).await;
        self.dwell(StageKind::Generate, started).await;
        self.state.poem = Some(poem.clone());

        // 4. hand off
        let guess_link = GuessParams::new(poem.primary.clone()).to_link();
        self.state.phase = PipelinePhase::Finished;
        self.fire(
            PipelineEvent::HandedOff,
            EventContext::new().with_message(&guess_link),
        );
        self.log_event("handoff", serde_json::json!({ "link": guess_link }));

        let similar_poems = self
            .state
            .similar
            .as_ref()
            .map(|s| s.poems.clone())
            .unwrap_or_default();
        Ok(ThinkOutcome {
            description,
            similar_poems,
            poem,
            guess_link,
        })
    }

    fn register_steps(&mut self, now: Instant) {
        for kind in StageKind::ALL {
            let start = if kind == StageKind::Describe {
                StepStart::Active
            } else {
                StepStart::Pending
            };
            if let Some(handle) = self.tracker.add_step(kind.label(), start, None, now) {
                self.state.handles.push(handle);
            }
        }
    }

    fn handle(&self, kind: StageKind) -> Option<StepHandle> {
        self.state.handles.get(kind.index()).copied()
    }

    fn begin_stage(&mut self, kind: StageKind) -> Instant {
        let now = Instant::now();
        if let Some(handle) = self.handle(kind) {
            self.tracker.activate_step(handle.index(), now);
        }
        self.state.phase = PipelinePhase::Requesting(kind);
        log::info!("stage {kind} started");
        self.fire(
            PipelineEvent::StageStarted,
            EventContext::new().with_stage(kind.name()),
        );
        now
    }

    /// Record the stage response; a failure marks the step and ends the run.
    fn settle<T>(
        &mut self,
        kind: StageKind,
        started: Instant,
        response: Result<T, StageError>,
    ) -> Result<T, PipelineError> {
        let record = |outcome| StageRecord {
            stage: kind,
            started_ms: self.offset_ms(started),
            response_ms: started.elapsed().as_millis() as u64,
            outcome,
        };

        match response {
            Ok(value) => {
                let record = record(StageOutcome::Completed);
                self.push_record(record);
                Ok(value)
            }
            Err(source) => {
                let message = source.to_string();
                let record = record(StageOutcome::Failed {
                    error: message.clone(),
                });
                self.push_record(record);

                log::warn!("stage {kind} failed: {message}");
                if let Some(handle) = self.handle(kind) {
                    self.tracker.fail_step(handle, &message);
                }
                self.content
                    .show_error(&format!("{}: {message}", kind.failure_prefix()));
                self.state.phase = PipelinePhase::Error(kind);
                self.fire(
                    PipelineEvent::StageFailed,
                    EventContext::new()
                        .with_stage(kind.name())
                        .with_error(&message)
                        .with_elapsed_ms(started.elapsed().as_millis() as u64),
                );
                Err(PipelineError::Stage {
                    stage: kind.name(),
                    source,
                })
            }
        }
    }

    fn complete(&mut self, kind: StageKind, detail: StepDetail) {
        if let Some(handle) = self.handle(kind) {
            self.tracker
                .complete_step(handle, kind.completion_text(), Some(detail), Instant::now());
            if self.show_details {
                self.tracker.show_detail(handle);
            }
        }
        self.fire(
            PipelineEvent::StageCompleted,
            EventContext::new()
                .with_stage(kind.name())
                .with_message(kind.completion_text()),
        );
    }

    async fn reveal_description(&mut self, description: &BilingualText) {
        self.state.phase = PipelinePhase::Revealing(StageKind::Describe);
        for (zh, en) in split_description(description) {
            let (a, b) = self.content.reveal_targets(ContentSection::Description);
            pump_during(&mut self.tracker, reveal_pair(a, b, &zh, &en, self.speeds)).await;
            self.content.reveal_finished(ContentSection::Description);
        }
        self.fire(
            PipelineEvent::RevealFinished,
            EventContext::new().with_stage(StageKind::Describe.name()),
        );
    }

    fn show_similar(&mut self, similar: &SimilarPoems) {
        self.state.phase = PipelinePhase::Revealing(StageKind::FindSimilar);
        let poems: Vec<BilingualText> = similar
            .poems
            .iter()
            .map(|p| BilingualText::new(format_chinese_poem(&p.primary), p.secondary.clone()))
            .filter(|p| !p.primary.is_empty() || !p.secondary.is_empty())
            .collect();
        self.content.show_similar_poems(&poems);
        self.fire(
            PipelineEvent::RevealFinished,
            EventContext::new().with_stage(StageKind::FindSimilar.name()),
        );
    }

    async fn reveal_poem(&mut self, poem: &BilingualText) {
        self.state.phase = PipelinePhase::Revealing(StageKind::Generate);
        let formatted = format_chinese_poem(&poem.primary);
        let (a, b) = self.content.reveal_targets(ContentSection::Poem);
        pump_during(
            &mut self.tracker,
            reveal_pair(a, b, &formatted, &poem.secondary, self.speeds),
        )
        .await;
        self.content.reveal_finished(ContentSection::Poem);
        self.content
            .show_poem_columns(&poem_columns(&formatted), &poem.secondary);
        self.fire(
            PipelineEvent::RevealFinished,
            EventContext::new().with_stage(StageKind::Generate.name()),
        );
    }

    async fn dwell(&mut self, kind: StageKind, started: Instant) {
        self.state.phase = PipelinePhase::Dwelling(kind);
        let elapsed = started.elapsed();
        let delay = if kind.next().is_none() {
            self.pacing.final_delay(elapsed)
        } else {
            self.pacing.remaining(elapsed)
        };
        log::debug!("stage {kind} dwelling for {}ms", delay.as_millis());
        pump_during(&mut self.tracker, sleep(delay)).await;
        if kind.next().is_some() {
            self.state.phase = PipelinePhase::Advancing;
        }
    }

    fn offset_ms(&self, at: Instant) -> u64 {
        self.state
            .run_started
            .map(|start| at.saturating_duration_since(start).as_millis() as u64)
            .unwrap_or(0)
    }

    fn push_record(&mut self, record: StageRecord) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log_stage(&record) {
                log::warn!("failed to write stage log: {e}");
            }
        }
        self.state.records.push(record);
    }

    fn log_event(&self, kind: &str, data: serde_json::Value) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log_event(kind, data) {
                log::warn!("failed to write pipeline log: {e}");
            }
        }
    }

    fn fire(&self, event: PipelineEvent, context: EventContext) {
        let context = context.with_run_id(self.run_id.as_str());
        self.events.fire(event, &context);
    }
}

fn join_poems<'a>(poems: impl Iterator<Item = &'a String>) -> String {
    poems.map(String::as_str).collect::<Vec<_>>().join("\n\n")
}

/// Drive `fut` to completion, polling the tracker whenever it has a deadline due.
pub async fn pump_during<F: Future>(tracker: &mut StepTracker, fut: F) -> F::Output {
    tokio::pin!(fut);
    loop {
        let deadline = tracker.next_deadline();
        tokio::select! {
            biased;
            out = &mut fut => return out,
            _ = sleep_until_deadline(deadline) => tracker.poll(Instant::now()),
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
