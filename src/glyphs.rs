//! Glyph markup: poems where some characters are replaced by Nüshu glyphs.
//!
//! Markup is literal text interleaved with bracketed component lists,
//! e.g. `江永[14,0,16]书奇`. Grammar: `(literal-run | '[' int (',' int)* ']')*`.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::config::GLYPH_IMAGE_DIR;
use crate::errors::GlyphParseError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GlyphToken {
    Text(String),
    Glyph(Vec<u32>),
}

/// One visible slot in rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderUnit {
    Char(char),
    Glyph(Vec<u32>),
    LineBreak,
}

impl RenderUnit {
    pub fn is_visible(&self) -> bool {
        !matches!(self, RenderUnit::LineBreak)
    }
}

pub fn parse_glyph_markup(input: &str) -> Result<Vec<GlyphToken>, GlyphParseError> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut open: Option<(usize, String)> = None;

    for (offset, ch) in input.char_indices() {
        match ch {
            '[' => {
                if open.is_some() {
                    return Err(GlyphParseError::NestedBracket { offset });
                }
                if !text.is_empty() {
                    tokens.push(GlyphToken::Text(std::mem::take(&mut text)));
                }
                open = Some((offset, String::new()));
            }
            ']' => {
                let Some((start, body)) = open.take() else {
                    return Err(GlyphParseError::UnexpectedClose { offset });
                };
                tokens.push(GlyphToken::Glyph(parse_indices(start, &body)?));
            }
            _ => match open.as_mut() {
                Some((_, body)) => body.push(ch),
                None => text.push(ch),
            },
        }
    }

    if let Some((offset, _)) = open {
        return Err(GlyphParseError::UnclosedBracket { offset });
    }
    if !text.is_empty() {
        tokens.push(GlyphToken::Text(text));
    }
    Ok(tokens)
}

fn parse_indices(start: usize, body: &str) -> Result<Vec<u32>, GlyphParseError> {
    if body.trim().is_empty() {
        return Err(GlyphParseError::EmptyList { offset: start });
    }
    body.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<u32>()
                .map_err(|_| GlyphParseError::InvalidNumber {
                    offset: start,
                    text: part.to_string(),
                })
        })
        .collect()
}

/// Inverse of [`parse_glyph_markup`].
pub fn to_markup(tokens: &[GlyphToken]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            GlyphToken::Text(text) => out.push_str(text),
            GlyphToken::Glyph(indices) => {
                out.push('[');
                out.push_str(&join_indices(indices, ","));
                out.push(']');
            }
        }
    }
    out
}

fn join_indices(indices: &[u32], sep: &str) -> String {
    let mut out = String::new();
    for (i, n) in indices.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        let _ = write!(out, "{n}");
    }
    out
}

/// File name of the pre-rendered glyph image, e.g. `combined_14-0-16_vertical_black_trim.png`.
pub fn glyph_image_name(indices: &[u32]) -> String {
    format!("combined_{}_vertical_black_trim.png", join_indices(indices, "-"))
}

pub fn glyph_image_path(indices: &[u32]) -> String {
    format!("{GLYPH_IMAGE_DIR}/{}", glyph_image_name(indices))
}

pub fn render_units(tokens: &[GlyphToken]) -> Vec<RenderUnit> {
    let mut units = Vec::new();
    for token in tokens {
        match token {
            GlyphToken::Text(text) => units.extend(text.chars().map(|ch| {
                if ch == '\n' {
                    RenderUnit::LineBreak
                } else {
                    RenderUnit::Char(ch)
                }
            })),
            GlyphToken::Glyph(indices) => units.push(RenderUnit::Glyph(indices.clone())),
        }
    }
    units
}

/// Position in `units` of the `visible`-th visible unit. Line breaks are not counted.
pub fn highlight_slot(units: &[RenderUnit], visible: usize) -> Option<usize> {
    units
        .iter()
        .enumerate()
        .filter(|(_, unit)| unit.is_visible())
        .nth(visible)
        .map(|(slot, _)| slot)
}

fn is_break_punctuation(ch: char) -> bool {
    matches!(ch, '，' | '。' | '\n')
}

/// Visible-unit index of item `pos` of a per-character poem list, once
/// clause punctuation has become line breaks.
pub fn visible_index(items: &[GlyphToken], pos: usize) -> usize {
    items
        .iter()
        .take(pos)
        .map(|item| match item {
            GlyphToken::Text(text) => text.chars().filter(|c| !is_break_punctuation(*c)).count(),
            GlyphToken::Glyph(_) => 1,
        })
        .sum()
}
