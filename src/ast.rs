use crate::charset::CharSet;

/// A node of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// A literal run of characters.
    Text(String),
    Concat(Vec<Part>),
    /// Alternatives in priority order.
    Alt(Vec<Part>),
    Quantified {
        part: Box<Part>,
        min: usize,
        /// `None` is unbounded.
        max: Option<usize>,
        mode: Repetition,
    },
    Class(CharSet),
    WordBoundary,
    NonWordBoundary,
    /// `^`
    InputStart,
    /// `$`
    InputEnd,
    NonCapture {
        part: Box<Part>,
        kind: GroupKind,
    },
    Capture {
        part: Box<Part>,
        name: Option<String>,
    },
    Reference(GroupKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
    Greedy,
    Lazy,
    Possessive,
}

/// What a non-capturing group does with its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    /// `(?:...)`, optionally with scoped flags `(?i-s:...)`.
    Flags(FlagOverride),
    LookAhead,
    NegLookAhead,
    LookBehind,
    NegLookBehind,
    /// `(?>...)`
    Atomic,
}

/// How a capture group is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Index(usize),
    Name(String),
}

impl From<usize> for GroupKey {
    fn from(index: usize) -> Self {
        GroupKey::Index(index)
    }
}

impl From<&str> for GroupKey {
    fn from(name: &str) -> Self {
        GroupKey::Name(name.to_string())
    }
}

/// Compile-time matching options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// `i`
    pub case_insensitive: bool,
    /// `m`: `^` and `$` also match at line terminators.
    pub multiline: bool,
    /// `s`: `.` also matches line terminators.
    pub dot_all: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    pub fn multiline(mut self, yes: bool) -> Self {
        self.multiline = yes;
        self
    }

    pub fn dot_all(mut self, yes: bool) -> Self {
        self.dot_all = yes;
        self
    }

    /// The options in effect inside a flags group.
    pub fn overlay(self, flags: &FlagOverride) -> Options {
        Options {
            case_insensitive: flags.case_insensitive.unwrap_or(self.case_insensitive),
            multiline: flags.multiline.unwrap_or(self.multiline),
            dot_all: flags.dot_all.unwrap_or(self.dot_all),
        }
    }
}

/// Flags set (`Some(true)`), cleared (`Some(false)`) or inherited (`None`)
/// by a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagOverride {
    pub case_insensitive: Option<bool>,
    pub multiline: Option<bool>,
    pub dot_all: Option<bool>,
}

impl Part {
    pub fn text(s: &str) -> Part {
        Part::Text(s.to_string())
    }

    pub fn class(set: CharSet) -> Part {
        Part::Class(set)
    }

    /// `.`
    pub fn any() -> Part {
        Part::Class(CharSet::any())
    }

    /// Collapses a single-element sequence to the element itself.
    pub fn concat(mut parts: Vec<Part>) -> Part {
        if parts.len() == 1 {
            parts.pop().unwrap_or_else(|| Part::Concat(Vec::new()))
        } else {
            Part::Concat(parts)
        }
    }

    pub fn alt(mut parts: Vec<Part>) -> Part {
        if parts.len() == 1 {
            parts.pop().unwrap_or_else(|| Part::Alt(Vec::new()))
        } else {
            Part::Alt(parts)
        }
    }

    pub fn repeat(part: Part, min: usize, max: Option<usize>, mode: Repetition) -> Part {
        Part::Quantified {
            part: Box::new(part),
            min,
            max,
            mode,
        }
    }

    pub fn zero_or_more(part: Part, mode: Repetition) -> Part {
        Part::repeat(part, 0, None, mode)
    }

    pub fn one_or_more(part: Part, mode: Repetition) -> Part {
        Part::repeat(part, 1, None, mode)
    }

    pub fn optional(part: Part, mode: Repetition) -> Part {
        Part::repeat(part, 0, Some(1), mode)
    }

    pub fn capture(part: Part) -> Part {
        Part::Capture {
            part: Box::new(part),
            name: None,
        }
    }

    pub fn named(name: &str, part: Part) -> Part {
        Part::Capture {
            part: Box::new(part),
            name: Some(name.to_string()),
        }
    }

    pub fn group(part: Part, kind: GroupKind) -> Part {
        Part::NonCapture {
            part: Box::new(part),
            kind,
        }
    }

    pub fn look_ahead(part: Part) -> Part {
        Part::group(part, GroupKind::LookAhead)
    }

    pub fn look_behind(part: Part) -> Part {
        Part::group(part, GroupKind::LookBehind)
    }

    pub fn reference<K: Into<GroupKey>>(key: K) -> Part {
        Part::Reference(key.into())
    }

    /// `^part$`
    pub fn anchored(part: Part) -> Part {
        Part::Concat(vec![Part::InputStart, part, Part::InputEnd])
    }
}
