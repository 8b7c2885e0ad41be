use thiserror::Error;

/// Errors produced while turning a pattern string into a `Part` tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unmatched ')' at offset {0}")]
    UnmatchedClose(usize),
    #[error("missing ')' for group opened at offset {0}")]
    UnclosedGroup(usize),
    #[error("nothing to repeat at offset {0}")]
    NothingToRepeat(usize),
    #[error("unterminated character class starting at offset {0}")]
    UnterminatedClass(usize),
    #[error("invalid range {from:?}-{to:?} in character class")]
    BadClassRange { from: char, to: char },
    #[error("invalid escape sequence at offset {0}")]
    BadEscape(usize),
    #[error("unknown unicode property {0:?}")]
    UnknownProperty(String),
    #[error("missing {expected:?} at offset {offset}")]
    Missing { expected: char, offset: usize },
    #[error("invalid group syntax at offset {0}")]
    BadGroup(usize),
    #[error("invalid repetition bounds at offset {0}")]
    BadRepetition(usize),
}

/// Errors surfaced by compilation. "No match" is never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid pattern: {0}")]
    Parse(#[from] ParseError),
    #[error("repetition minimum {min} exceeds maximum {max}")]
    InvalidRepetition { min: usize, max: usize },
    #[error("pattern needs backtracking and cannot be compiled to a DFA")]
    NotRegular,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
