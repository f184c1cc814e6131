//! Error types for pattern compilation and transcript reading.

use thiserror::Error;

/// Broad classification of a [`PatternError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed pattern text or an invalid group/backreference.
    Syntax,
    /// A named predicate is not registered.
    NoSuchPredicate,
}

/// Errors raised while compiling a phonex pattern.
///
/// Positions are character offsets into the pattern source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("unexpected '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unexpected end of pattern, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    /// A `(` was never closed.
    #[error("unclosed group opened at position {pos}")]
    UnclosedGroup { pos: usize },

    /// A `)` without a matching `(`.
    #[error("unmatched ')' at position {pos}")]
    UnmatchedClose { pos: usize },

    /// A quantifier with nothing to repeat, or a second quantifier.
    #[error("quantifier at position {pos} does not follow a repeatable element")]
    DanglingQuantifier { pos: usize },

    #[error("invalid quantifier bounds at position {pos}: {reason}")]
    InvalidQuantifier { pos: usize, reason: String },

    #[error("unknown feature '{name}'")]
    UnknownFeature { name: String },

    #[error("unknown syllable constituent '{ident}'")]
    UnknownConstituent { ident: String },

    #[error("invalid syllable range '{range}'")]
    InvalidSyllableRange { range: String },

    #[error("unknown escape '\\{ch}' at position {pos}")]
    UnknownEscape { ch: char, pos: usize },

    /// Raised by the predicate registry; see [`ErrorKind::NoSuchPredicate`].
    #[error("no such predicate '{name}'")]
    NoSuchPredicate { name: String },

    #[error("invalid argument for predicate '{name}': {reason}")]
    InvalidPredicateArgument { name: String, reason: String },

    #[error("invalid text pattern '{pattern}': {reason}")]
    InvalidTextPattern { pattern: String, reason: String },

    /// The same name was given to two different groups.
    #[error("duplicate group name '{name}'")]
    DuplicateGroupName { name: String },

    /// Two alternation branches gave the same group index different names.
    #[error("group {index} is named both '{first}' and '{second}'")]
    ConflictingGroupName {
        index: usize,
        first: String,
        second: String,
    },

    #[error("invalid back reference '{reference}' at position {pos}")]
    InvalidBackReference { reference: String, pos: usize },

    /// Nested repetition bounds expand past the instruction limit.
    #[error("pattern needs about {size} instructions, the limit is {limit}")]
    ProgramTooLarge { size: usize, limit: usize },
}

impl PatternError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PatternError::NoSuchPredicate { .. } => ErrorKind::NoSuchPredicate,
            _ => ErrorKind::Syntax,
        }
    }
}

/// Errors raised by the compact transcript reader.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("unexpected '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("missing constituent type after ':' at position {pos}")]
    MissingConstituent { pos: usize },

    #[error("unknown constituent type '{ch}' at position {pos}")]
    UnknownConstituent { ch: char, pos: usize },

    #[error("tie bar at position {pos} is not between two phones")]
    DanglingTie { pos: usize },

    #[error("unterminated pause starting at position {pos}")]
    UnterminatedPause { pos: usize },
}

pub type Result<T> = std::result::Result<T, PatternError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_errors_are_classified_separately() {
        let err = PatternError::NoSuchPredicate {
            name: "noplugin".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NoSuchPredicate);

        let err = PatternError::UnclosedGroup { pos: 0 };
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn messages_name_the_offending_item() {
        let err = PatternError::DuplicateGroupName { name: "C".into() };
        assert_eq!(err.to_string(), "duplicate group name 'C'");
    }
}
