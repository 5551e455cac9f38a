//! Guess page: show the poem with glyphs swapped in, then cycle through the
//! model's guesses for one character before revealing the answer.

use std::time::Duration;

use crate::api::{GeneratedCharacter, GlyphPoem};
use crate::backend::PoemBackend;
use crate::config::{GUESS_FINAL_HOLD, GUESS_FRAME_DELAY};
use crate::errors::{GlyphParseError, GuessError};
use crate::glyphs::{
    GlyphToken, RenderUnit, highlight_slot, parse_glyph_markup, render_units, to_markup,
    visible_index,
};
use crate::poem::format_chinese_poem;
use crate::session::SessionStorage;

/// One screen of the guessing animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessFrame {
    pub units: Vec<RenderUnit>,
    /// Slot in `units` holding the character being guessed.
    pub highlight: Option<usize>,
    pub translation: String,
    pub hold: Duration,
    pub is_answer: bool,
}

#[derive(Debug, Clone)]
pub struct GuessBoard {
    pub glyph_poem: GlyphPoem,
    pub character: GeneratedCharacter,
    /// The poem as first shown, glyphs in place.
    pub original: Vec<RenderUnit>,
    pub original_highlight: Option<usize>,
    pub frames: Vec<GuessFrame>,
}

impl GuessBoard {
    pub fn answer(&self) -> Option<&GuessFrame> {
        self.frames.iter().find(|frame| frame.is_answer)
    }
}

/// Fetch the glyph version of `poem` and the generated character, and lay out
/// every frame of the guessing sequence. The highlight is stored in `session`.
pub async fn prepare_guess(
    backend: &dyn PoemBackend,
    session: &mut SessionStorage,
    poem: &str,
) -> Result<GuessBoard, GuessError> {
    if poem.trim().is_empty() {
        return Err(GuessError::MissingPoem);
    }

    let glyph_poem = backend.replace_with_glyphs(poem).await?;
    let formatted = format_chinese_poem(&glyph_poem.poem_in_simple_el);
    let original = render_units(&parse_glyph_markup(&formatted)?);

    let character = backend.generate_character(poem).await?;
    let pos = character.char_pos;
    let len = glyph_poem.poem_in_list.len();
    if pos >= len {
        return Err(GuessError::PositionOutOfRange { pos, len });
    }

    let visible = visible_index(&glyph_poem.poem_in_list, pos);
    let original_highlight = highlight_slot(&original, visible);
    session.set_highlight(character.char_cn.clone(), visible);
    log::debug!(
        "guessing '{}' at item {pos} (visible {visible}) with {} guesses",
        character.char_cn,
        character.guess_char.len()
    );

    let frames = guess_frames(&glyph_poem.poem_in_list, &character)?;
    Ok(GuessBoard {
        glyph_poem,
        character,
        original,
        original_highlight,
        frames,
    })
}

/// Frames for each guess in order, then the answer glyph.
pub fn guess_frames(
    items: &[GlyphToken],
    character: &GeneratedCharacter,
) -> Result<Vec<GuessFrame>, GlyphParseError> {
    let pos = character.char_pos;
    let visible = visible_index(items, pos);
    let mut list = items.to_vec();
    let mut frames = Vec::with_capacity(character.guess_char.len() + 1);

    for (i, guess) in character.guess_char.iter().enumerate() {
        if let Some(slot) = list.get_mut(pos) {
            *slot = GlyphToken::Text(guess.clone());
        }
        let units = frame_units(&list)?;
        let last = i + 1 == character.guess_char.len();
        frames.push(GuessFrame {
            highlight: highlight_slot(&units, visible),
            units,
            translation: character
                .guess_char_eng
                .get(i)
                .map(|t| t.to_lowercase())
                .unwrap_or_default(),
            hold: if last {
                GUESS_FRAME_DELAY + GUESS_FINAL_HOLD
            } else {
                GUESS_FRAME_DELAY
            },
            is_answer: false,
        });
    }

    if let Some(slot) = list.get_mut(pos) {
        *slot = GlyphToken::Glyph(character.simple_el.clone());
    }
    let units = frame_units(&list)?;
    frames.push(GuessFrame {
        highlight: highlight_slot(&units, visible),
        units,
        translation: character.char_translate.to_lowercase(),
        hold: GUESS_FRAME_DELAY,
        is_answer: true,
    });

    Ok(frames)
}

fn frame_units(list: &[GlyphToken]) -> Result<Vec<RenderUnit>, GlyphParseError> {
    let cleaned = to_markup(list).replace(['，', '。'], "\n");
    Ok(render_units(&parse_glyph_markup(&cleaned)?))
}
