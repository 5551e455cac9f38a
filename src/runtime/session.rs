use std::path::PathBuf;

use crate::app_config::AppConfig;
use crate::backend::PoemBackend;
use crate::pipeline::{ContentView, Pacing, PipelineLogger, ThinkPipeline};
use crate::reveal::RevealSpeeds;
use crate::runtime::events::attach_console_handlers;
use crate::tracker::{StepTracker, StepView};
use crate::types::RunId;

/// Assemble a think pipeline from config, wiring logging and event handlers.
pub fn build_think_pipeline<C: ContentView>(
    config: &AppConfig,
    backend: Box<dyn PoemBackend>,
    view: Box<dyn StepView>,
    content: C,
) -> ThinkPipeline<C> {
    let tracker = StepTracker::new(view).with_advance_delay(config.pacing.advance_delay());
    let mut pipeline = ThinkPipeline::new(backend, tracker, content)
        .with_run_id(RunId::generate())
        .with_pacing(Pacing::from(&config.pacing))
        .with_speeds(RevealSpeeds::from(&config.reveal));

    if config.pipeline.enabled {
        match PipelineLogger::new(PathBuf::from(&config.pipeline.log_dir)) {
            Ok(logger) => pipeline = pipeline.with_logger(logger),
            Err(e) => log::warn!("pipeline log disabled: {e}"),
        }
    }

    attach_console_handlers(pipeline.events_mut());
    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HttpBackend;
    use crate::pipeline::{BufferedContent, PipelinePhase};
    use crate::tracker::HeadlessView;

    #[test]
    fn builds_idle_pipeline_with_logger() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.pipeline.enabled = true;
        config.pipeline.log_dir = tmp.path().display().to_string();

        let backend = HttpBackend::new("http://127.0.0.1:9", 1).unwrap();
        let pipeline = build_think_pipeline(
            &config,
            Box::new(backend),
            Box::new(HeadlessView),
            BufferedContent::default(),
        );

        assert_eq!(pipeline.phase(), PipelinePhase::Idle);
        assert!(pipeline.tracker().is_mounted());
        assert!(pipeline.tracker().steps().is_empty());
    }
}
