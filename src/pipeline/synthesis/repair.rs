// Textual repairs for JSON-like model output, applied in a fixed order:
//   1. strip C0/C1 control characters
//   2. quote bare object keys
//   3. drop trailing commas before `]` / `}`
// Steps 2 and 3 only rewrite text outside string literals, so valid JSON
// passes through unchanged apart from insignificant whitespace.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static CONTROL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{0000}-\x{001F}\x{007F}-\x{009F}]").unwrap());

static BARE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([{,])(\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*):").unwrap());

static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",(\s*[\]}])").unwrap());

/// Run every repair step in order.
pub fn repair_json(raw: &str) -> String {
    let stripped = strip_control_chars(raw);
    let quoted = quote_bare_keys(&stripped);
    remove_trailing_commas(&quoted)
}

/// Remove characters in U+0000–U+001F and U+007F–U+009F.
pub fn strip_control_chars(text: &str) -> String {
    CONTROL_CHARS.replace_all(text, "").into_owned()
}

/// Quote identifier keys written without quotes: `{title: "x"}` → `{"title": "x"}`.
pub fn quote_bare_keys(text: &str) -> String {
    rewrite_outside_strings(text, |segment| {
        BARE_KEY.replace_all(segment, r#"$1$2"$3"$4:"#)
    })
}

/// Remove a comma that directly precedes a closing bracket or brace.
pub fn remove_trailing_commas(text: &str) -> String {
    rewrite_outside_strings(text, |segment| TRAILING_COMMA.replace_all(segment, "$1"))
}

/// Apply `rewrite` to every stretch of `text` that lies outside a double-quoted
/// string literal. String literals (escapes included) are copied verbatim; an
/// unterminated literal runs to the end of the text.
fn rewrite_outside_strings<F>(text: &str, rewrite: F) -> String
where
    F: for<'a> Fn(&'a str) -> Cow<'a, str>,
{
    let mut out = String::with_capacity(text.len());
    let mut segment_start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                out.push_str(&text[segment_start..=idx]);
                segment_start = idx + 1;
            }
        } else if c == '"' {
            out.push_str(&rewrite(&text[segment_start..idx]));
            segment_start = idx;
            in_string = true;
        }
    }

    let tail = &text[segment_start..];
    if in_string {
        out.push_str(tail);
    } else {
        out.push_str(&rewrite(tail));
    }
    out
}
