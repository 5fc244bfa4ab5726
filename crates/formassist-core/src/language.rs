pub const DEFAULT_LANGUAGE: &str = "english";

/// Languages offered by the quick selector. Any other value can still be
/// typed in by hand.
pub const PRESETS: &[&str] = &["english", "french"];

/// The preset after `current`, wrapping around. Unknown values start over
/// at the first preset.
pub fn next_preset(current: &str) -> &'static str {
    let position = PRESETS
        .iter()
        .position(|p| p.eq_ignore_ascii_case(current.trim()));

    match position {
        Some(i) => PRESETS[(i + 1) % PRESETS.len()],
        None => PRESETS[0],
    }
}

pub fn display_name(language: &str) -> String {
    let mut chars = language.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
