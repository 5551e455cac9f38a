//! Text shaping for descriptions and poems.

use regex::Regex;
use std::sync::OnceLock;

use crate::api::BilingualText;

fn newline_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n+").expect("valid regex"))
}

/// Lay a Chinese poem out one clause per line: existing line breaks are
/// dropped, each full-width comma starts a new line and full stops vanish.
pub fn format_chinese_poem(text: &str) -> String {
    let joined = newline_runs().replace_all(text.trim(), "");
    joined.replace('，', "\n").replace('。', "")
}

/// Pair up the sentences of a bilingual description for line-by-line reveal.
///
/// Chinese splits on `。`, English on `.`. The shorter side is padded with
/// empty lines and pairs that are empty on both sides are dropped.
pub fn split_description(description: &BilingualText) -> Vec<(String, String)> {
    let zh: Vec<&str> = description.primary.split('。').collect();
    let en: Vec<&str> = description.secondary.split('.').collect();
    let rows = zh.len().max(en.len());

    (0..rows)
        .map(|i| {
            (
                zh.get(i).map(|s| s.trim()).unwrap_or_default().to_string(),
                en.get(i).map(|s| s.trim()).unwrap_or_default().to_string(),
            )
        })
        .filter(|(a, b)| !a.is_empty() || !b.is_empty())
        .collect()
}

/// Split a formatted poem into at most two columns of non-empty lines.
pub fn poem_columns(formatted: &str) -> Vec<Vec<String>> {
    let lines: Vec<String> = formatted
        .trim()
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let columns = lines.len().min(2);
    let per_column = lines.len().div_ceil(columns);
    lines.chunks(per_column).map(<[String]>::to_vec).collect()
}
