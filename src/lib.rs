pub mod analysis;
pub mod ast;
pub mod backtrack;
pub mod charset;
pub mod dfa;
pub mod error;
pub mod look;
pub mod matcher;
pub mod nfa;
pub mod parser;

pub use ast::{GroupKey, Options, Part, Repetition};
pub use charset::CharSet;
pub use dfa::Dfa;
pub use error::{Error, ParseError, Result};
pub use matcher::{Captures, Matcher};

pub fn is_match(input: &str, pattern: &str) -> Result<bool> {
    Ok(Matcher::new(pattern, Options::default())?.is_match(input))
}
