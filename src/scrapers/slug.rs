use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE should compile"));
static DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("DISALLOWED_RE should compile"));
static HYPHEN_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("HYPHEN_RUN_RE should compile"));

/// Turn a human-entered agent name into the profile path segment used by the site.
///
/// Order matters: lowercase, trim, whitespace runs to `-`, drop anything outside
/// `[a-z0-9-]`, collapse hyphen runs, then strip edge hyphens. Input made only of
/// disallowed characters yields an empty slug.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let hyphenated = WHITESPACE_RE.replace_all(lowered.trim(), "-");
    let cleaned = DISALLOWED_RE.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUN_RE.replace_all(&cleaned, "-");
    collapsed.trim_matches('-').to_string()
}
