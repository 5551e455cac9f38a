use std::collections::HashMap;

/// Lifecycle events of a think-page run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineEvent {
    /// Steps registered, first request about to go out
    RunStarted,
    /// A stage request was sent
    StageStarted,
    /// A stage response was accepted
    StageCompleted,
    /// A stage failed; the run halts
    StageFailed,
    /// Content for a stage finished revealing
    RevealFinished,
    /// The guess-page link is ready
    HandedOff,
}

impl PipelineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::RunStarted => "RunStarted",
            PipelineEvent::StageStarted => "StageStarted",
            PipelineEvent::StageCompleted => "StageCompleted",
            PipelineEvent::StageFailed => "StageFailed",
            PipelineEvent::RevealFinished => "RevealFinished",
            PipelineEvent::HandedOff => "HandedOff",
        }
    }
}

/// Context data that flows through events
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    pub run_id: Option<String>,
    pub stage: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
    /// Time spent in the stage so far
    pub elapsed_ms: Option<u64>,
    pub metadata: HashMap<String, String>,
}

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id,
            "stage": self.stage,
            "message": self.message,
            "error": self.error,
            "elapsed_ms": self.elapsed_ms,
            "metadata": self.metadata,
        })
    }
}

pub type EventHandler = Box<dyn Fn(PipelineEvent, &EventContext) + Send + Sync>;

#[derive(Default)]
pub struct EventManager {
    handlers: HashMap<PipelineEvent, Vec<EventHandler>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, event: PipelineEvent, handler: F)
    where
        F: Fn(PipelineEvent, &EventContext) + Send + Sync + 'static,
    {
        self.handlers
            .entry(event)
            .or_default()
            .push(Box::new(handler));
    }

    /// Register one handler for every event.
    pub fn on_all<F>(&mut self, handler: F)
    where
        F: Fn(PipelineEvent, &EventContext) + Send + Sync + Clone + 'static,
    {
        for event in [
            PipelineEvent::RunStarted,
            PipelineEvent::StageStarted,
            PipelineEvent::StageCompleted,
            PipelineEvent::StageFailed,
            PipelineEvent::RevealFinished,
            PipelineEvent::HandedOff,
        ] {
            self.on(event, handler.clone());
        }
    }

    pub fn fire(&self, event: PipelineEvent, context: &EventContext) {
        if let Some(handlers) = self.handlers.get(&event) {
            for handler in handlers {
                handler(event, context);
            }
        }
    }
}
