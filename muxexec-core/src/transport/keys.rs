//! Human-readable key names to tmux `send-keys` key names
//!
//! Accepts the names agents tend to produce (`Ctrl+C`, `ArrowUp`, `Esc`)
//! and maps them onto what tmux understands (`C-c`, `Up`, `Escape`).
//! Anything unrecognised is passed through, so native tmux names still work.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Mapping from key names to tmux key names
static KEY_NAMES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    // Escape key
    m.insert("Escape", "Escape");
    m.insert("Esc", "Escape");

    // Arrow keys
    m.insert("ArrowUp", "Up");
    m.insert("ArrowDown", "Down");
    m.insert("ArrowRight", "Right");
    m.insert("ArrowLeft", "Left");

    // Navigation keys
    m.insert("Insert", "IC");
    m.insert("Delete", "DC");
    m.insert("PageUp", "PPage");
    m.insert("PageDown", "NPage");

    // Common aliases
    m.insert("Return", "Enter");
    m.insert("Backspace", "BSpace");

    m
});

/// Translate one key name to its tmux spelling
pub fn tmux_key_name(key: &str) -> String {
    if let Some(name) = KEY_NAMES.get(key) {
        return (*name).to_string();
    }

    if let Some(rest) = strip_modifier(key, "Ctrl+") {
        // tmux treats C-C and C-c alike, but lowercase is canonical
        return format!("C-{}", rest.to_ascii_lowercase());
    }

    if let Some(rest) = strip_modifier(key, "Alt+") {
        return format!("M-{}", rest);
    }

    key.to_string()
}

/// Translate a sequence of key names
pub fn tmux_key_names(keys: &[String]) -> Vec<String> {
    keys.iter().map(|k| tmux_key_name(k)).collect()
}

/// `Ctrl+x` / `ctrl+x` → `x`, only for a single trailing character
fn strip_modifier<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let head = key.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &key[prefix.len()..];
    (rest.chars().count() == 1).then_some(rest)
}
