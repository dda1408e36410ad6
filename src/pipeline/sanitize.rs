// Pull a plausible JSON object out of noisy model output. Models routinely
// wrap valid JSON in prose or fenced code blocks; full syntactic validation
// is the caller's job.

/// Extract the brace-bounded candidate JSON object from free-form model text.
///
/// Strips fenced code-block markers, then returns the substring from the
/// first `{` to the last `}` inclusive. Returns `None` when no opening brace
/// exists, no closing brace exists, or the last `}` precedes the first `{`.
pub fn extract_json_candidate(raw: &str) -> Option<String> {
    let stripped = strip_code_fences(raw);

    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end < start {
        return None;
    }

    Some(stripped[start..=end].to_string())
}

/// Remove ``` fence markers (with or without a language tag) so braces inside
/// fences are visible to the brace scan.
fn strip_code_fences(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}
