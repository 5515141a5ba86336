//! Best-effort language detection for a rendered patch.

use std::collections::BTreeMap;

/// Classifies the dominant language of a patch by counting the extensions of
/// changed files. Returns `"unknown"` when nothing is recognized; ties break
/// toward the alphabetically first language so results are deterministic.
pub fn detect_language(patch: &str) -> String {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();

    for line in patch.lines() {
        if let Some(file) = changed_file(line) {
            *counts.entry(language_of(extension_of(file))).or_insert(0) += 1;
        }
    }

    let mut best = ("unknown", 0usize);
    for (language, count) in counts {
        if count > best.1 {
            best = (language, count);
        }
    }
    best.0.to_string()
}

/// Pulls the post-image path out of a `diff --git a/... b/...` header.
fn changed_file(line: &str) -> Option<&str> {
    if !line.starts_with("diff --git") {
        return None;
    }
    line.split(' ').nth(3)?.strip_prefix("b/")
}

/// The extension after the last dot, if the dot is not the first character.
fn extension_of(file: &str) -> &str {
    match file.rfind('.') {
        Some(dot) if dot > 0 => &file[dot + 1..],
        _ => "",
    }
}

fn language_of(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "java" => "Java",
        "js" => "JavaScript",
        "ts" => "TypeScript",
        "py" => "Python",
        "rs" => "Rust",
        "cpp" => "C++",
        "c" => "C",
        "cs" => "C#",
        "go" => "Go",
        "rb" => "Ruby",
        "php" => "PHP",
        _ => "unknown",
    }
}
