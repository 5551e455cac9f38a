use colored::*;

use crate::api::BilingualText;
use crate::events::{EventContext, PipelineEvent};
use crate::glyphs::RenderUnit;
use crate::pipeline::{ContentSection, ContentView};
use crate::reveal::{RevealTarget, TextBuffer};
use crate::sanitize;
use crate::tracker::{PipelineStep, StepDetail, StepStatus, StepView};

/// Environment variable that enables machine-readable JSON logs when set to "1" or "true".
const MACHINE_LOG_ENV: &str = "NVSHU_MACHINE_LOG";

pub fn init_logging() {
    // Internal logs are opt-in via RUST_LOG. Console output stays separate.
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var("RUST_LOG").is_err() {
        builder.filter_level(log::LevelFilter::Warn);
    }
    let _ = builder.try_init();
}

fn machine_log_enabled() -> bool {
    matches!(
        std::env::var(MACHINE_LOG_ENV)
            .ok()
            .as_deref()
            .map(str::to_ascii_lowercase)
            .as_deref(),
        Some("1") | Some("true")
    )
}

pub fn emit_machine_event(kind: &str, data: serde_json::Value) {
    if !machine_log_enabled() {
        return;
    }

    let event = serde_json::json!({
        "kind": kind,
        "data": data,
    });

    if let Ok(line) = serde_json::to_string(&event) {
        eprintln!("{line}");
    }
}

/// Forward a pipeline event to the machine log.
pub fn pipeline_event(event: PipelineEvent, ctx: &EventContext) {
    emit_machine_event(event.name(), ctx.to_json());
}

pub fn info(msg: impl AsRef<str>) {
    let raw = msg.as_ref();
    println!("{}", sanitize::sanitize_preview_for_console(raw));
    emit_machine_event("info", serde_json::json!({ "message": raw }));
}

pub fn warn(msg: impl AsRef<str>) {
    let raw = msg.as_ref();
    eprintln!("{}", sanitize::sanitize_preview_for_console(raw).yellow());
    emit_machine_event("warn", serde_json::json!({ "message": raw }));
}

pub fn error(msg: impl AsRef<str>) {
    let raw = msg.as_ref();
    eprintln!(
        "{} {}",
        "✗".red().bold(),
        sanitize::sanitize_preview_for_console(raw).red()
    );
    emit_machine_event("error", serde_json::json!({ "message": raw }));
}

pub fn header(backend: &str, media: &str) {
    let b = sanitize::sanitize_preview_for_console(backend);
    let m = sanitize::sanitize_preview_for_console(media);

    println!("{} {} | {} | {}", ">>".bold(), "nvshu".bold(), b.cyan(), m.dimmed());
    emit_machine_event(
        "header",
        serde_json::json!({
            "backend": backend,
            "media": media,
        }),
    );
}

pub fn section_title(title: &str) {
    let safe = sanitize::sanitize_preview_for_console(title);
    println!("\n{}", safe.dimmed());
}

pub fn bilingual(text: &BilingualText) {
    let primary = sanitize::sanitize_for_console(&text.primary);
    let secondary = sanitize::sanitize_for_console(&text.secondary);
    if !primary.is_empty() {
        println!("  {}", primary.bold());
    }
    if !secondary.is_empty() {
        println!("  {}", secondary.dimmed());
    }
}

pub fn link(label: &str, url: &str) {
    let safe = sanitize::sanitize_for_console(url);
    println!("{} {} {}", "→".green().bold(), label, safe.green());
    emit_machine_event("link", serde_json::json!({ "label": label, "url": url }));
}

/// Render glyph units for a terminal, marking the highlighted slot.
pub fn render_units_plain(units: &[RenderUnit], highlight: Option<usize>) -> String {
    let mut out = String::new();
    for (slot, unit) in units.iter().enumerate() {
        let piece = match unit {
            RenderUnit::Char(ch) => ch.to_string(),
            RenderUnit::Glyph(indices) => {
                let parts: Vec<String> = indices.iter().map(u32::to_string).collect();
                format!("〔{}〕", parts.join("-"))
            }
            RenderUnit::LineBreak => "\n".to_string(),
        };
        if highlight == Some(slot) {
            out.push_str(&format!("【{piece}】"));
        } else {
            out.push_str(&piece);
        }
    }
    out
}

fn status_icon(status: StepStatus) -> ColoredString {
    match status {
        StepStatus::Pending => "○".dimmed(),
        StepStatus::Processing => "◐".yellow().bold(),
        StepStatus::Completed => "✓".green().bold(),
        StepStatus::Error => "✗".red().bold(),
    }
}

/// Prints step transitions as one line each.
pub struct ConsoleStepView {
    quiet: bool,
    total: usize,
}

impl ConsoleStepView {
    pub fn new(quiet: bool) -> Self {
        Self { quiet, total: 0 }
    }

    fn print_step(&self, step: &PipelineStep) {
        if self.quiet {
            return;
        }
        let text = sanitize::sanitize_preview_for_console(&step.text);
        let styled = match step.status {
            StepStatus::Pending => text.dimmed(),
            StepStatus::Processing => text.normal(),
            StepStatus::Completed => text.green(),
            StepStatus::Error => text.red(),
        };
        println!(
            "{} {} {}",
            format!("[{:02}/{:02}]", step.index + 1, self.total).dimmed(),
            status_icon(step.status),
            styled
        );
    }
}

impl StepView for ConsoleStepView {
    fn step_added(&mut self, _step: &PipelineStep) {
        self.total += 1;
    }

    fn step_changed(&mut self, step: &PipelineStep) {
        self.print_step(step);
        emit_machine_event(
            "step",
            serde_json::json!({
                "index": step.index,
                "status": step.status.as_str(),
                "text": step.text,
            }),
        );
    }

    fn detail_shown(&mut self, title: &str, detail: &StepDetail) {
        if self.quiet {
            return;
        }
        section_title(title);
        for section in detail.sections() {
            println!("  {}", section.label.cyan());
            println!("  {}", sanitize::sanitize_for_console(&section.body));
        }
    }
}

/// Content area on stdout. Reveals are typed into buffers and printed once complete.
pub struct ConsoleContent {
    quiet: bool,
    primary: TextBuffer,
    secondary: TextBuffer,
}

impl ConsoleContent {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            primary: TextBuffer::new(),
            secondary: TextBuffer::new(),
        }
    }
}

impl ContentView for ConsoleContent {
    fn reveal_targets(
        &mut self,
        _section: ContentSection,
    ) -> (&mut dyn RevealTarget, &mut dyn RevealTarget) {
        (&mut self.primary, &mut self.secondary)
    }

    fn reveal_finished(&mut self, section: ContentSection) {
        if self.quiet || section == ContentSection::Poem {
            return;
        }
        bilingual(&BilingualText::new(
            self.primary.as_str(),
            self.secondary.as_str(),
        ));
    }

    fn show_similar_poems(&mut self, poems: &[BilingualText]) {
        if self.quiet {
            return;
        }
        section_title("Similar poems");
        for poem in poems {
            bilingual(poem);
            println!();
        }
    }

    fn show_poem_columns(&mut self, columns: &[Vec<String>], translation: &str) {
        if self.quiet {
            return;
        }
        section_title("New poem");
        for column in columns {
            for line in column {
                println!("  {}", sanitize::sanitize_for_console(line).bold());
            }
            println!();
        }
        for line in translation.lines() {
            println!("  {}", sanitize::sanitize_for_console(line).dimmed());
        }
    }

    fn show_error(&mut self, message: &str) {
        error(message);
    }
}
