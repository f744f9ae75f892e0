//! Input sanitization for free-text dialog input.
//!
//! User text ends up in two places: Markdown-formatted Telegram replies and
//! LLM prompts. Names are stripped of anything Telegram's Markdown parser
//! treats as markup; questions only lose control characters.

use crate::error::HandlerError;

/// Upper bound on the whole roots submission line.
pub const MAX_ROOTS_INPUT_CHARS: usize = 200;

/// Names are truncated to this many characters after sanitization.
pub const MAX_NAME_CHARS: usize = 64;

/// Upper bound on a question forwarded to the completion provider.
pub const MAX_QUESTION_CHARS: usize = 1000;

/// Characters with meaning to Telegram Markdown (or HTML, if a reply is ever
/// switched over) that never belong in a person's name.
const MARKUP_CHARS: &[char] = &[
    '*', '_', '`', '[', ']', '(', ')', '~', '>', '#', '+', '=', '|', '{', '}', '!', '\\', '<',
];

/// A roots submission split into its two candidates, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootsCandidate {
    pub name: String,
    pub phone: String,
}

/// Split raw roots input into name and phone candidates.
///
/// The last whitespace-delimited token is the phone; everything before it,
/// joined by single spaces, is the name.
pub fn split_roots_input(raw: &str) -> Result<RootsCandidate, HandlerError> {
    let length = raw.chars().count();
    if length > MAX_ROOTS_INPUT_CHARS {
        return Err(HandlerError::Format(format!(
            "input is {length} chars, limit is {MAX_ROOTS_INPUT_CHARS}"
        )));
    }

    let parts: Vec<&str> = raw.split_whitespace().collect();
    let Some((phone, name_parts)) = parts.split_last() else {
        return Err(HandlerError::Format("no tokens".into()));
    };
    if name_parts.is_empty() {
        return Err(HandlerError::Format("expected a name and a phone number".into()));
    }

    Ok(RootsCandidate {
        name: name_parts.join(" "),
        phone: (*phone).to_string(),
    })
}

/// Strip control and markup characters from a name and cap its length.
pub fn sanitize_name(raw: &str) -> Result<String, HandlerError> {
    let stripped: String = raw
        .chars()
        .filter(|c| !c.is_control() && !MARKUP_CHARS.contains(c))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(MAX_NAME_CHARS).collect();
    let name = truncated.trim_end().to_string();

    if name.is_empty() {
        return Err(HandlerError::InvalidName);
    }
    Ok(name)
}

/// Bound and clean a free-text question before it is embedded in a prompt.
pub fn sanitize_question(raw: &str) -> Result<String, HandlerError> {
    let length = raw.chars().count();
    if length > MAX_QUESTION_CHARS {
        return Err(HandlerError::InvalidLength {
            length,
            max: MAX_QUESTION_CHARS,
        });
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| *c == '\n' || !c.is_control())
        .collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned.is_empty() {
        return Err(HandlerError::InvalidLength {
            length: 0,
            max: MAX_QUESTION_CHARS,
        });
    }
    Ok(cleaned)
}
