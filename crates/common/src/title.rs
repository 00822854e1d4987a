//! Test title and spec file naming conventions

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// Title of the sign-in bootstrap test that only produces a session snapshot
pub const AUTH_SETUP_TITLE: &str = "authenticate";

/// File name fragment of the sign-in bootstrap spec
pub const AUTH_SETUP_FILE: &str = "auth.setup";

static TITLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(TC_\w+_\d+)\s*-\s*(.+)$").expect("valid title pattern"));

static MODULE_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("api-keys", "API Keys"),
        ("billing", "Billing"),
        ("contact-us", "Contact Us"),
        ("dashboard", "Dashboard"),
        ("onboarding", "Onboarding"),
        ("settings", "Settings"),
        ("usage", "Usage"),
        ("z-logout", "Logout"),
    ])
});

const SPEC_SUFFIXES: &[&str] = &[".spec.ts", ".spec.js", ".test.ts", ".test.js"];

/// Split `TC_DASH_01 - Verify heading` into its identifier and name.
///
/// Returns `None` when the title carries no identifier prefix.
pub fn split_title(title: &str) -> Option<(&str, &str)> {
    let caps = TITLE_PATTERN.captures(title)?;
    let id = caps.get(1)?.as_str();
    let name = caps.get(2)?.as_str().trim();
    Some((id, name))
}

/// Identifier and name, using the whole title for both when unprefixed
pub fn id_and_name(title: &str) -> (String, String) {
    match split_title(title) {
        Some((id, name)) => (id.to_string(), name.to_string()),
        None => (title.to_string(), title.to_string()),
    }
}

/// Module key for a spec file: its base name without the spec suffix.
pub fn module_key(file: &str) -> String {
    let base = Path::new(file)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    SPEC_SUFFIXES
        .iter()
        .find_map(|suffix| base.strip_suffix(suffix))
        .map(str::to_string)
        .unwrap_or(base)
}

/// Display name for a module key, falling back to the key itself
pub fn module_label(key: &str) -> String {
    MODULE_LABELS.get(key).copied().unwrap_or(key).to_string()
}

/// Whether a spec file is the sign-in bootstrap
pub fn is_auth_setup_file(file: &str) -> bool {
    file.contains(AUTH_SETUP_FILE)
}
