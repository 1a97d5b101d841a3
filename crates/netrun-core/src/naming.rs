//! Naming rules for fields, aliases, models and actions.

use crate::error::DefinitionError;

/// Words that can never be used as a declared name.
pub const RESERVED_WORDS: &[&str] = &[
    "and", "as", "assert", "break", "class", "continue", "def", "del", "elif", "else", "except",
    "exec", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda", "not", "or",
    "pass", "print", "raise", "return", "try", "while", "with", "yield",
];

/// Returns true if `name` is in [`RESERVED_WORDS`].
pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Check `name` against the reserved-word set and the leading-character rule.
pub fn validate_name(name: &str) -> Result<(), DefinitionError> {
    if is_reserved(name) {
        return Err(DefinitionError::ReservedName {
            name: name.to_string(),
        });
    }
    match name.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => Ok(()),
        _ => Err(DefinitionError::InvalidName {
            name: name.to_string(),
        }),
    }
}
