//! Plain-language reasons for raw assertion failures

use once_cell::sync::Lazy;
use regex::Regex;

const MAX_REASON_CHARS: usize = 150;

static LOCATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Locator: (.+)").expect("valid locator pattern"));

// Real escape sequences plus the bare colour codes the engine leaves behind
// once the escape byte has been stripped upstream.
static ANSI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;]*[A-Za-z]|\[(?:2|22|31|39)m").expect("valid ansi pattern")
});

/// Turn a raw engine error into a short reason a non-developer can read.
///
/// Rules are checked in a fixed order and the first match wins. When none
/// match, the first line of the error is cleaned up and truncated.
pub fn failure_reason(raw: &str) -> String {
    if raw.contains("toBeVisible") && raw.contains("not found") {
        let element = LOCATOR
            .captures(raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| "an element".to_string());
        return format!("Expected element was not visible on the page: {}", element);
    }
    if raw.contains("toHaveURL") {
        return "Page did not navigate to the expected URL".to_string();
    }
    if raw.contains("Timeout") {
        return "Page or element took too long to load (timeout)".to_string();
    }
    if raw.contains("toContainText") || raw.contains("toHaveText") {
        return "Text content on the page did not match expected value".to_string();
    }
    if raw.contains("toBeEnabled") {
        return "A button or input was disabled when it should have been enabled".to_string();
    }
    if raw.contains("net::ERR") || raw.contains("Navigation") {
        return "Network error — page failed to load".to_string();
    }

    let first_line = raw.lines().next().unwrap_or_default();
    let cleaned = ANSI.replace_all(first_line, "");
    truncate_chars(cleaned.trim(), MAX_REASON_CHARS, "...")
}

/// Keep at most `max` characters, appending `marker` when something was cut.
pub fn truncate_chars(text: &str, max: usize, marker: &str) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}{}", &text[..idx], marker),
        None => text.to_string(),
    }
}
