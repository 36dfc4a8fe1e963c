//! Markdown / LaTeX cleanup so model answers read naturally when spoken.
//!
//! [`needs_cleaning`] is a cheap marker scan; plain answers skip the regex
//! passes entirely.  [`clean_text_for_tts`] is a pure function.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Substrings whose presence means the text may carry markup.
const MARKUP_MARKERS: &[&str] = &["$", "**", "*", "__", "_", "#", "```", "`", "[", "!["];

/// LaTeX commands with a spoken equivalent, applied in order.
const LATEX_WORDS: &[(&str, &str)] = &[
    ("\\times", " times "),
    ("\\div", " divided by "),
    ("\\cdot", " dot "),
    ("\\frac", " fraction "),
    ("{", " "),
    ("}", " "),
    ("\\sqrt", " square root of "),
    ("^", " to the power of "),
    ("_", " sub "),
    ("\\pi", " pi "),
    ("\\infty", " infinity "),
    ("\\sum", " sum "),
    ("\\int", " integral "),
];

static BLOCK_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$\$(.*?)\$\$").expect("valid regex"));
static INLINE_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(.*?)\$").expect("valid regex"));
static LATEX_COMMAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[a-zA-Z]+").expect("valid regex"));
static HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+(.*?)$").expect("valid regex"));
static BOLD_STARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));
static ITALIC_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("valid regex"));
static BOLD_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.*?)__").expect("valid regex"));
static ITALIC_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(.*?)_").expect("valid regex"));
static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[*+-][ \t]+(.*?)$").expect("valid regex"));
static NUMBERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]+(.*?)$").expect("valid regex"));
static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[^\n]*\n(.*?)```").expect("valid regex"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`(.*?)`").expect("valid regex"));
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[(.*?)\]\(.*?\)").expect("valid regex"));
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]\(.*?\)").expect("valid regex"));
static RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^-{3,}$").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static QUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*>[ \t]+(.*?)$").expect("valid regex"));

/// `true` when `text` contains any markup marker worth cleaning.
pub fn needs_cleaning(text: &str) -> bool {
    MARKUP_MARKERS.iter().any(|m| text.contains(m))
}

/// Turn a LaTeX expression into words a speech engine can read.
fn speak_math(caps: &Captures<'_>) -> String {
    let mut expr = caps[1].trim().to_string();
    for (latex, spoken) in LATEX_WORDS {
        expr = expr.replace(latex, spoken);
    }
    let expr = LATEX_COMMAND.replace_all(&expr, " ");
    format!(" {expr} ")
}

/// Strip markdown and LaTeX formatting from `text`.
///
/// ```rust
/// use multimodal_assistant::tts::clean_text_for_tts;
///
/// let spoken = clean_text_for_tts("**Note:** area is $x^2$");
/// assert!(spoken.contains("x to the power of 2"));
/// assert!(!spoken.contains('*'));
/// ```
pub fn clean_text_for_tts(text: &str) -> String {
    let text = BLOCK_MATH.replace_all(text, speak_math);
    let text = INLINE_MATH.replace_all(&text, speak_math);

    let text = HEADER.replace_all(&text, "${1}.");

    // Code and links go before emphasis so their contents survive intact.
    let text = CODE_BLOCK.replace_all(&text, "${1}");
    let text = INLINE_CODE.replace_all(&text, "${1}");
    let text = IMAGE.replace_all(&text, "Image: ${1}");
    let text = LINK.replace_all(&text, "${1}");

    let text = BULLET.replace_all(&text, "${1}");
    let text = NUMBERED.replace_all(&text, "${1}");

    let text = BOLD_STARS.replace_all(&text, "${1}");
    let text = ITALIC_STAR.replace_all(&text, "${1}");
    let text = BOLD_UNDERSCORES.replace_all(&text, "${1}");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "${1}");

    let text = RULE.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    let text = QUOTE.replace_all(&text, "${1}");

    text.chars()
        .filter(|c| !matches!(c, '\\' | '*' | '_' | '#' | '`'))
        .collect()
}
