use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use nvshu::PipelineError;
use nvshu::glyphs::glyph_image_path;
use nvshu::guess::{GuessBoard, prepare_guess};
use nvshu::handoff::ThinkParams;
use nvshu::keep::{StoragePreference, keep_character, lookup};
use nvshu::runtime::{BootstrappedRuntime, RuntimeOverrides, bootstrap_runtime, build_think_pipeline};
use nvshu::ui::{self, ConsoleContent, ConsoleStepView};
use nvshu::upload::{LocalFile, UploadFlow, confirm};

mod args;
use args::{CliArgs, Command, usage};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    ui::init_logging();

    if let Err(e) = run().await {
        if !already_reported(&e) {
            ui::error(format!("{e:#}"));
        }
        std::process::exit(1);
    }
}

/// Stage failures are printed by the content view as they happen.
fn already_reported(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Stage { .. })
    )
}

async fn run() -> Result<()> {
    let cli_args = CliArgs::parse()?;
    let Some(command) = cli_args.command.clone() else {
        println!("{}", usage());
        return Ok(());
    };

    let mut rt = bootstrap_runtime(RuntimeOverrides {
        backend_url: cli_args.backend.clone(),
    })?;
    if cli_args.agree {
        rt.session.agree_to_privacy();
    }

    match command {
        Command::Upload { path } => run_upload(&rt, &cli_args, &path).await,
        Command::Record { effect, original } => {
            run_record(&rt, &cli_args, &effect, &original).await
        }
        Command::Think { target } => run_think(rt, &cli_args, &target).await,
        Command::Guess { poem } => run_guess(&mut rt, &cli_args, &poem).await,
        Command::Keep { name, poem } => run_keep(&mut rt, &cli_args, &name, &poem).await,
        Command::Dictionary { term } => run_dictionary(&rt, &cli_args, term.as_deref()).await,
    }
}

async fn run_upload(rt: &BootstrappedRuntime, args: &CliArgs, path: &str) -> Result<()> {
    let file = LocalFile::from_path(Path::new(path))
        .with_context(|| format!("Failed to read {path}"))?;
    let flow = UploadFlow::new(rt.backend.as_ref(), &rt.app_config.upload);
    let params = flow.upload_file(&rt.session, file).await?;
    hand_off(rt, args, &params)
}

async fn run_record(
    rt: &BootstrappedRuntime,
    args: &CliArgs,
    effect: &str,
    original: &str,
) -> Result<()> {
    let effect = std::fs::read(effect).with_context(|| format!("Failed to read {effect}"))?;
    let original =
        std::fs::read(original).with_context(|| format!("Failed to read {original}"))?;
    let flow = UploadFlow::new(rt.backend.as_ref(), &rt.app_config.upload);
    let params = flow.upload_recording(&rt.session, effect, original).await?;
    hand_off(rt, args, &params)
}

fn hand_off(rt: &BootstrappedRuntime, args: &CliArgs, params: &ThinkParams) -> Result<()> {
    let link = confirm(&rt.session, params)
        .context("Re-run with --agree to accept the privacy policy")?;
    if args.json_output {
        println!("{}", serde_json::json!({ "think_link": link }));
    } else {
        ui::link("think", &link);
    }
    Ok(())
}

fn think_params(target: &str) -> Result<ThinkParams> {
    if target.contains("media_url=") {
        Ok(ThinkParams::parse(target)?)
    } else {
        Ok(ThinkParams::new(target))
    }
}

async fn run_think(rt: BootstrappedRuntime, args: &CliArgs, target: &str) -> Result<()> {
    let params = think_params(target)?;
    let quiet = args.quiet || args.json_output;
    if !quiet {
        ui::header(&rt.backend_name, params.describe_url());
    }

    let mut pipeline = build_think_pipeline(
        &rt.app_config,
        rt.backend,
        Box::new(ConsoleStepView::new(quiet)),
        ConsoleContent::new(quiet),
    )
    .with_details(args.details);
    let outcome = pipeline.run(&params).await?;

    if args.json_output {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        ui::link("guess", &outcome.guess_link);
    }
    Ok(())
}

async fn run_guess(rt: &mut BootstrappedRuntime, args: &CliArgs, poem: &str) -> Result<()> {
    let board = prepare_guess(rt.backend.as_ref(), &mut rt.session, poem).await?;

    if args.json_output {
        println!("{}", character_json(&board));
        return Ok(());
    }
    play_guess(&board, args.quiet).await;
    Ok(())
}

async fn run_keep(
    rt: &mut BootstrappedRuntime,
    args: &CliArgs,
    name: &str,
    poem: &str,
) -> Result<()> {
    // The service keeps the character generated here in its session.
    let board = prepare_guess(rt.backend.as_ref(), &mut rt.session, poem).await?;
    if !args.json_output {
        play_guess(&board, args.quiet).await;
    }

    let receipt = keep_character(
        rt.backend.as_ref(),
        name,
        StoragePreference::from_flag(args.store),
    )
    .await?;

    if args.json_output {
        println!(
            "{}",
            serde_json::json!({ "character": character_json(&board), "keep": receipt })
        );
    } else if receipt.stored {
        ui::info(format!(
            "{} kept {} in the dictionary",
            receipt.user_name, board.character.char_cn
        ));
    } else {
        ui::info(format!("{} kept {}", receipt.user_name, board.character.char_cn));
    }
    Ok(())
}

async fn run_dictionary(rt: &BootstrappedRuntime, args: &CliArgs, term: Option<&str>) -> Result<()> {
    let dictionary = lookup(rt.backend.as_ref(), term).await?;

    if args.json_output {
        let entries: serde_json::Map<String, serde_json::Value> = dictionary
            .iter()
            .map(|(character, entry)| {
                (
                    character.clone(),
                    serde_json::json!({
                        "char_translate": entry.translation(character),
                        "char_3dim": entry.components(),
                        "char_img_path": glyph_image_path(entry.components()),
                    }),
                )
            })
            .collect();
        println!("{}", serde_json::Value::Object(entries));
        return Ok(());
    }

    if dictionary.is_empty() {
        ui::warn(match term {
            Some(term) => format!("No kept characters match '{term}'"),
            None => "The dictionary is empty".to_string(),
        });
        return Ok(());
    }
    for (character, entry) in &dictionary {
        println!(
            "  {}  {}  {}",
            character.bold(),
            entry.translation(character),
            glyph_image_path(entry.components()).dimmed()
        );
    }
    Ok(())
}

fn character_json(board: &GuessBoard) -> serde_json::Value {
    let character = &board.character;
    let image = character
        .char_img_path
        .clone()
        .unwrap_or_else(|| glyph_image_path(&character.simple_el));
    serde_json::json!({
        "char_cn": character.char_cn,
        "char_translate": character.char_translate,
        "char_pos": character.char_pos,
        "simple_el": character.simple_el,
        "guesses": character.guess_char,
        "char_img_path": image,
    })
}

async fn play_guess(board: &GuessBoard, quiet: bool) {
    if !quiet {
        ui::section_title("Poem");
        println!("{}", ui::render_units_plain(&board.original, board.original_highlight));
        for frame in board.frames.iter().filter(|f| !f.is_answer) {
            tokio::time::sleep(frame.hold).await;
            ui::section_title(&format!("Guess: {}", frame.translation));
            println!("{}", ui::render_units_plain(&frame.units, frame.highlight));
        }
    }

    if let Some(answer) = board.answer() {
        println!("\n{} {}", "Answer:".green().bold(), board.character.char_cn.bold());
        println!("{}", ui::render_units_plain(&answer.units, answer.highlight));
        ui::info(&answer.translation);
    }
}
