use regex::Regex;
use std::sync::OnceLock;

const DEFAULT_PREVIEW_LEN: usize = 2000;
const PREVIEW_LEN_ENV: &str = "NVSHU_PREVIEW_LEN";

pub fn preview_len() -> usize {
    std::env::var(PREVIEW_LEN_ENV)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_PREVIEW_LEN)
}

pub fn strip_ansi(input: &str) -> String {
    // Remove ANSI CSI sequences (e.g., ESC[...m)
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == 0x1b && i + 1 < bytes.len() && bytes[i + 1] == b'[' {
            i += 2;
            while i < bytes.len() {
                let b = bytes[i];
                i += 1;
                if (0x40..=0x7e).contains(&b) {
                    break;
                }
            }
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).to_string()
}

/// Drop control characters other than newline and tab.
pub fn strip_controls(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Make server-provided text safe to print: escape sequences, control
/// characters and credentials embedded in URLs are removed.
pub fn sanitize_for_console(input: &str) -> String {
    let cleaned = strip_controls(&strip_ansi(input));
    redact_url_credentials(&cleaned)
}

pub fn sanitize_preview_for_console(input: &str) -> String {
    preview(&sanitize_for_console(input), preview_len())
}

/// First `max_chars` characters, with a marker when text was cut.
pub fn preview(s: &str, max_chars: usize) -> String {
    let total = s.chars().count();
    if total <= max_chars {
        return s.to_string();
    }

    let truncated: String = s.chars().take(max_chars).collect();
    format!("{truncated}... [truncated {} chars]", total - max_chars)
}

fn redact_url_credentials(input: &str) -> String {
    static URL_CREDS_RE: OnceLock<Regex> = OnceLock::new();
    let re = URL_CREDS_RE.get_or_init(|| {
        Regex::new(r"(https?://)([^/\s:@]+):([^/\s@]+)@").expect("url creds regex")
    });
    re.replace_all(input, "$1$2:[REDACTED]@").to_string()
}
