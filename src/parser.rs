use regex_syntax::hir::{Class, HirKind};

use crate::ast::{FlagOverride, GroupKey, GroupKind, Part, Repetition};
use crate::charset::{self, CharSet};
use crate::error::ParseError;

/// Parse a pattern string into a `Part` tree.
pub fn parse(pattern: &str) -> Result<Part, ParseError> {
    Parser::new(pattern).parse()
}

/// Parser for regular expressions.
///
/// The `Parser` struct holds the pattern and the current byte offset.
pub struct Parser<'a> {
    pub pattern: &'a str,
    pub pos: usize,
}

/// One element of a character class or escape: a single code point or a set.
enum ClassAtom {
    Char(char),
    Set(CharSet),
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given pattern.
    pub fn new(pattern: &'a str) -> Self {
        Self { pattern, pos: 0 }
    }

    /// Peek at the next character in the pattern without advancing.
    fn peek(&self) -> Option<char> {
        self.pattern[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.pattern[self.pos..].chars().nth(1)
    }

    /// Advance the parser by one character and return it.
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Advance past `expected` if it is next.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        if self.pattern[self.pos..].starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    /// Expect a specific character and advance if it matches.
    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(ParseError::Missing {
                expected,
                offset: self.pos,
            })
        }
    }

    /// Entry point for parsing a regex pattern.
    ///
    /// Example:
    /// - Pattern: `a|b` → Alt([Text("a"), Text("b")])
    pub fn parse(&mut self) -> Result<Part, ParseError> {
        let node = self.parse_alt()?;
        if self.pos < self.pattern.len() {
            return Err(ParseError::UnmatchedClose(self.pos));
        }
        Ok(node)
    }

    /// Parse alternation (`|`) in the pattern.
    ///
    /// Example:
    /// - Pattern: `ab|c` → Alt([Text("ab"), Text("c")])
    /// - Pattern: `abc`  → Text("abc")
    fn parse_alt(&mut self) -> Result<Part, ParseError> {
        let mut branches = vec![self.parse_seq()?];
        while self.eat('|') {
            branches.push(self.parse_seq()?);
        }
        Ok(Part::alt(branches))
    }

    /// Parse a sequence of atoms, merging adjacent literals into one `Text`.
    ///
    /// Example:
    /// - Pattern: `ab\.c` → Text("ab.c")
    /// - Pattern: `a(b)c` → Concat([Text("a"), Capture(Text("b")), Text("c")])
    fn parse_seq(&mut self) -> Result<Part, ParseError> {
        let mut nodes: Vec<Part> = Vec::new();
        while let Some(ch) = self.peek() {
            if ch == ')' || ch == '|' {
                break;
            }
            let node = self.parse_repeat()?;
            if let (Some(Part::Text(prev)), Part::Text(next)) = (nodes.last_mut(), &node) {
                prev.push_str(next);
                continue;
            }
            nodes.push(node);
        }
        Ok(Part::concat(nodes))
    }

    /// Parse an atom and any quantifier that follows it.
    ///
    /// Example:
    /// - Pattern: `a*`     → Quantified { Text("a"), 0, None, Greedy }
    /// - Pattern: `b{2,3}?` → Quantified { Text("b"), 2, Some(3), Lazy }
    /// - Pattern: `c++`    → Quantified { Text("c"), 1, None, Possessive }
    fn parse_repeat(&mut self) -> Result<Part, ParseError> {
        let atom = self.parse_atom()?;
        let (min, max) = match self.peek() {
            Some('*') => (0, None),
            Some('+') => (1, None),
            Some('?') => (0, Some(1)),
            Some('{') => match self.brace_bounds()? {
                Some(bounds) => {
                    let mode = self.repetition_mode();
                    return self.finish_repeat(atom, bounds, mode);
                }
                None => return Ok(atom),
            },
            _ => return Ok(atom),
        };
        self.advance();
        let mode = self.repetition_mode();
        self.finish_repeat(atom, (min, max), mode)
    }

    fn finish_repeat(
        &mut self,
        atom: Part,
        (min, max): (usize, Option<usize>),
        mode: Repetition,
    ) -> Result<Part, ParseError> {
        if matches!(self.peek(), Some('*' | '+' | '?')) {
            return Err(ParseError::NothingToRepeat(self.pos));
        }
        Ok(Part::repeat(atom, min, max, mode))
    }

    fn repetition_mode(&mut self) -> Repetition {
        if self.eat('?') {
            Repetition::Lazy
        } else if self.eat('+') {
            Repetition::Possessive
        } else {
            Repetition::Greedy
        }
    }

    /// Parse `{n}`, `{n,}` or `{n,m}`. A brace that does not start a valid
    /// quantifier is left in place and read as a literal.
    fn brace_bounds(&mut self) -> Result<Option<(usize, Option<usize>)>, ParseError> {
        let open = self.pos;
        self.advance();
        let Some(min) = self.number() else {
            self.pos = open;
            return Ok(None);
        };
        let max = if self.eat(',') {
            if self.peek() == Some('}') {
                None
            } else {
                match self.number() {
                    Some(max) => Some(max),
                    None => {
                        self.pos = open;
                        return Ok(None);
                    }
                }
            }
        } else {
            Some(min)
        };
        if !self.eat('}') {
            self.pos = open;
            return Ok(None);
        }
        if max.is_some_and(|max| max < min) {
            return Err(ParseError::BadRepetition(open));
        }
        Ok(Some((min, max)))
    }

    fn number(&mut self) -> Option<usize> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        self.pattern[start..self.pos].parse().ok()
    }

    /// Parse a single atom: group, class, escape, dot, anchor or literal.
    ///
    /// Examples:
    /// - Pattern: `(abc)` → Capture { Text("abc"), name: None }
    /// - Pattern: `[a-c]` → Class([a-c])
    /// - Pattern: `\d`    → Class([0-9])
    /// - Pattern: `\1`    → Reference(Index(1))
    /// - Pattern: `.`     → Class(any)
    /// - Pattern: `^`     → InputStart
    fn parse_atom(&mut self) -> Result<Part, ParseError> {
        let start = self.pos;
        match self.advance() {
            Some('(') => self.parse_group(start),
            Some('[') => self.parse_class(start).map(Part::Class),
            Some('\\') => self.parse_escape(),
            Some('.') => Ok(Part::any()),
            Some('^') => Ok(Part::InputStart),
            Some('$') => Ok(Part::InputEnd),
            Some('*' | '+' | '?') => Err(ParseError::NothingToRepeat(start)),
            Some('{') => {
                self.pos = start;
                if self.brace_bounds()?.is_some() {
                    return Err(ParseError::NothingToRepeat(start));
                }
                self.advance();
                Ok(Part::text("{"))
            }
            Some(c) => Ok(Part::Text(c.to_string())),
            None => Ok(Part::Concat(Vec::new())),
        }
    }

    /// Parse a group after its `(`.
    ///
    /// Examples:
    /// - `(?:x)`      → NonCapture { x, Flags(default) }
    /// - `(?i-s:x)`   → NonCapture { x, Flags(i on, s off) }
    /// - `(?=x)` `(?!x)` `(?<=x)` `(?<!x)` → lookaround
    /// - `(?>x)`      → NonCapture { x, Atomic }
    /// - `(?<name>x)` → Capture { x, name }
    fn parse_group(&mut self, open: usize) -> Result<Part, ParseError> {
        let mut name = None;
        let kind = if self.eat('?') {
            if self.eat(':') {
                Some(GroupKind::Flags(FlagOverride::default()))
            } else if self.eat('=') {
                Some(GroupKind::LookAhead)
            } else if self.eat('!') {
                Some(GroupKind::NegLookAhead)
            } else if self.eat_str("<=") {
                Some(GroupKind::LookBehind)
            } else if self.eat_str("<!") {
                Some(GroupKind::NegLookBehind)
            } else if self.eat('>') {
                Some(GroupKind::Atomic)
            } else if self.eat('<') {
                name = Some(self.group_name()?);
                None
            } else {
                Some(GroupKind::Flags(self.flag_override()?))
            }
        } else {
            None
        };

        let part = self.parse_alt()?;
        if !self.eat(')') {
            return Err(ParseError::UnclosedGroup(open));
        }
        Ok(match kind {
            Some(kind) => Part::group(part, kind),
            None => Part::Capture {
                part: Box::new(part),
                name,
            },
        })
    }

    fn group_name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.advance();
        }
        let name = &self.pattern[start..self.pos];
        if name.is_empty() {
            return Err(ParseError::BadGroup(start));
        }
        self.expect('>')?;
        Ok(name.to_string())
    }

    /// Parse the `ims-ims:` part of a flags group.
    fn flag_override(&mut self) -> Result<FlagOverride, ParseError> {
        let mut flags = FlagOverride::default();
        let mut on = true;
        loop {
            let at = self.pos;
            match self.advance() {
                Some(':') => return Ok(flags),
                Some('-') if on => on = false,
                Some('i') => flags.case_insensitive = Some(on),
                Some('m') => flags.multiline = Some(on),
                Some('s') => flags.dot_all = Some(on),
                _ => return Err(ParseError::BadGroup(at)),
            }
        }
    }

    /// Parse an escape after its `\` outside a class.
    ///
    /// Examples:
    /// - `\b` → WordBoundary, `\B` → NonWordBoundary
    /// - `\12` → Reference(Index(12)), `\k<x>` → Reference(Name("x"))
    /// - `\w` → Class(word), `\n` → Text("\n")
    fn parse_escape(&mut self) -> Result<Part, ParseError> {
        match self.peek() {
            Some('b') => {
                self.advance();
                Ok(Part::WordBoundary)
            }
            Some('B') => {
                self.advance();
                Ok(Part::NonWordBoundary)
            }
            Some('1'..='9') => {
                let start = self.pos;
                let index = self.number().ok_or(ParseError::BadEscape(start))?;
                Ok(Part::Reference(GroupKey::Index(index)))
            }
            Some('k') if self.peek_second() == Some('<') => {
                self.pos += 2;
                Ok(Part::Reference(GroupKey::Name(self.group_name()?)))
            }
            _ => Ok(match self.class_escape(false)? {
                ClassAtom::Char(c) => Part::Text(c.to_string()),
                ClassAtom::Set(set) => Part::Class(set),
            }),
        }
    }

    /// Escapes shared by classes and the top level. Inside a class `\b` is a
    /// backspace.
    fn class_escape(&mut self, in_class: bool) -> Result<ClassAtom, ParseError> {
        let at = self.pos;
        let c = self.advance().ok_or(ParseError::BadEscape(at))?;
        let atom = match c {
            'd' => ClassAtom::Set(charset::digit().clone()),
            'D' => ClassAtom::Set(charset::digit().complement()),
            'w' => ClassAtom::Set(charset::word().clone()),
            'W' => ClassAtom::Set(charset::word().complement()),
            's' => ClassAtom::Set(charset::whitespace().clone()),
            'S' => ClassAtom::Set(charset::whitespace().complement()),
            'b' if in_class => ClassAtom::Char('\u{8}'),
            't' => ClassAtom::Char('\t'),
            'n' => ClassAtom::Char('\n'),
            'v' => ClassAtom::Char('\u{b}'),
            'f' => ClassAtom::Char('\u{c}'),
            'r' => ClassAtom::Char('\r'),
            '0' => {
                let mut value = 0u32;
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.advance();
                        }
                        None => break,
                    }
                }
                ClassAtom::Char(char::from_u32(value).ok_or(ParseError::BadEscape(at))?)
            }
            'c' => match self.advance() {
                Some(l) if l.is_ascii_alphabetic() => {
                    ClassAtom::Char(char::from(l as u8 & 0x1f))
                }
                _ => return Err(ParseError::BadEscape(at)),
            },
            'x' => ClassAtom::Char(self.hex_char(2, at)?),
            'u' => {
                if self.eat('{') {
                    let start = self.pos;
                    while self.peek().is_some_and(|c| c != '}') {
                        self.advance();
                    }
                    let digits = &self.pattern[start..self.pos];
                    self.expect('}')?;
                    let code = u32::from_str_radix(digits, 16).map_err(|_| ParseError::BadEscape(at))?;
                    ClassAtom::Char(char::from_u32(code).ok_or(ParseError::BadEscape(at))?)
                } else {
                    ClassAtom::Char(self.utf16_escape(at)?)
                }
            }
            'p' | 'P' => ClassAtom::Set(self.unicode_property(c == 'P')?),
            c => ClassAtom::Char(c),
        };
        Ok(atom)
    }

    fn hex_digits(&mut self, count: usize, at: usize) -> Result<u32, ParseError> {
        let start = self.pos;
        for _ in 0..count {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    self.advance();
                }
                _ => return Err(ParseError::BadEscape(at)),
            }
        }
        u32::from_str_radix(&self.pattern[start..self.pos], 16).map_err(|_| ParseError::BadEscape(at))
    }

    fn hex_char(&mut self, count: usize, at: usize) -> Result<char, ParseError> {
        let code = self.hex_digits(count, at)?;
        char::from_u32(code).ok_or(ParseError::BadEscape(at))
    }

    /// `\uhhhh`, joining a surrogate pair written as two escapes.
    fn utf16_escape(&mut self, at: usize) -> Result<char, ParseError> {
        let high = self.hex_digits(4, at)?;
        if (0xD800..0xDC00).contains(&high) {
            let resume = self.pos;
            if self.eat_str("\\u") {
                if let Ok(low) = self.hex_digits(4, at) {
                    if (0xDC00..0xE000).contains(&low) {
                        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                        return char::from_u32(code).ok_or(ParseError::BadEscape(at));
                    }
                }
            }
            self.pos = resume;
        }
        char::from_u32(high).ok_or(ParseError::BadEscape(at))
    }

    /// `\p{Greek}`, `\P{Lu}`, `\p{Script=Latin}`; tables come from
    /// `regex_syntax`.
    fn unicode_property(&mut self, negated: bool) -> Result<CharSet, ParseError> {
        self.expect('{')?;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != '}') {
            self.advance();
        }
        let name = self.pattern[start..self.pos].to_string();
        self.expect('}')?;

        let hir = regex_syntax::ParserBuilder::new()
            .build()
            .parse(&format!("\\p{{{}}}", name))
            .map_err(|_| ParseError::UnknownProperty(name.clone()))?;
        let set = match hir.kind() {
            HirKind::Class(Class::Unicode(class)) => CharSet::from_class(class.clone()),
            _ => return Err(ParseError::UnknownProperty(name)),
        };
        Ok(if negated { set.complement() } else { set })
    }

    /// Parse a character class after its `[`.
    ///
    /// Examples:
    /// - `[abc]`   → {a, b, c}
    /// - `[^a-z]`  → complement of a-z
    /// - `[\w-]`   → word characters and `-`
    fn parse_class(&mut self, open: usize) -> Result<CharSet, ParseError> {
        let negated = self.eat('^');
        let mut set = CharSet::empty();
        if let Some(c @ (']' | '-')) = self.peek() {
            self.advance();
            set = set.union(&CharSet::from_char(c));
        }
        loop {
            match self.peek() {
                None => return Err(ParseError::UnterminatedClass(open)),
                Some(']') => {
                    self.advance();
                    break;
                }
                Some(_) => {}
            }
            match self.class_atom()? {
                ClassAtom::Set(s) => set = set.union(&s),
                ClassAtom::Char(from) => {
                    let is_range = self.peek() == Some('-')
                        && !matches!(self.peek_second(), Some(']') | None);
                    if is_range {
                        self.advance();
                        match self.class_atom()? {
                            ClassAtom::Char(to) if from <= to => {
                                set = set.union(&CharSet::range(from, to));
                            }
                            ClassAtom::Char(to) => {
                                return Err(ParseError::BadClassRange { from, to })
                            }
                            ClassAtom::Set(_) => {
                                return Err(ParseError::BadClassRange { from, to: '-' })
                            }
                        }
                    } else {
                        set = set.union(&CharSet::from_char(from));
                    }
                }
            }
        }
        Ok(if negated { set.complement() } else { set })
    }

    fn class_atom(&mut self) -> Result<ClassAtom, ParseError> {
        let at = self.pos;
        match self.advance() {
            Some('\\') => self.class_escape(true),
            Some(c) => Ok(ClassAtom::Char(c)),
            None => Err(ParseError::UnterminatedClass(at)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantified(part: Part, min: usize, max: Option<usize>, mode: Repetition) -> Part {
        Part::repeat(part, min, max, mode)
    }

    #[test]
    fn test_literals_merge() {
        assert_eq!(parse("abc").unwrap(), Part::text("abc"));
        assert_eq!(parse(r"a\.b").unwrap(), Part::text("a.b"));
    }

    #[test]
    fn test_quantifier_applies_to_last_char() {
        assert_eq!(
            parse("ab+").unwrap(),
            Part::Concat(vec![
                Part::text("a"),
                quantified(Part::text("b"), 1, None, Repetition::Greedy),
            ])
        );
    }

    #[test]
    fn test_quantifier_modes() {
        assert_eq!(
            parse("a*?").unwrap(),
            quantified(Part::text("a"), 0, None, Repetition::Lazy)
        );
        assert_eq!(
            parse("a++").unwrap(),
            quantified(Part::text("a"), 1, None, Repetition::Possessive)
        );
        assert_eq!(
            parse("a{2,5}").unwrap(),
            quantified(Part::text("a"), 2, Some(5), Repetition::Greedy)
        );
        assert_eq!(
            parse("a{3,}?").unwrap(),
            quantified(Part::text("a"), 3, None, Repetition::Lazy)
        );
    }

    #[test]
    fn test_brace_without_quantifier_is_literal() {
        assert_eq!(parse("a{x}").unwrap(), Part::text("a{x}"));
    }

    #[test]
    fn test_alternation_and_groups() {
        assert_eq!(
            parse("(a)|(?<n>b)").unwrap(),
            Part::Alt(vec![Part::capture(Part::text("a")), Part::named("n", Part::text("b"))])
        );
        assert_eq!(
            parse("(?=a)(?<!b)").unwrap(),
            Part::Concat(vec![
                Part::group(Part::text("a"), GroupKind::LookAhead),
                Part::group(Part::text("b"), GroupKind::NegLookBehind),
            ])
        );
    }

    #[test]
    fn test_flags_group() {
        let expected = FlagOverride {
            case_insensitive: Some(true),
            multiline: None,
            dot_all: Some(false),
        };
        assert_eq!(
            parse("(?i-s:a)").unwrap(),
            Part::group(Part::text("a"), GroupKind::Flags(expected))
        );
    }

    #[test]
    fn test_references() {
        assert_eq!(
            parse(r"(a)\1").unwrap(),
            Part::Concat(vec![Part::capture(Part::text("a")), Part::reference(1usize)])
        );
        assert_eq!(
            parse(r"\k<word>").unwrap(),
            Part::reference("word")
        );
    }

    #[test]
    fn test_classes() {
        let Part::Class(set) = parse("[a-c_]").unwrap() else {
            panic!("expected a class");
        };
        assert!(set.test('b') && set.test('_') && !set.test('d'));

        let Part::Class(set) = parse("[^0-9]").unwrap() else {
            panic!("expected a class");
        };
        assert!(!set.test('5') && set.test('x'));

        let Part::Class(set) = parse(r"[\d-]").unwrap() else {
            panic!("expected a class");
        };
        assert!(set.test('-') && set.test('3'));
    }

    #[test]
    fn test_supplementary_range() {
        let Part::Class(set) = parse("[😀-😂]").unwrap() else {
            panic!("expected a class");
        };
        assert!(set.test('😁'));
        assert!(!set.test('😃'));
    }

    #[test]
    fn test_escapes() {
        assert_eq!(parse(r"\x41B\u{43}").unwrap(), Part::text("ABC"));
        assert_eq!(parse(r"😀").unwrap(), Part::text("😀"));
        assert_eq!(parse(r"\cJ").unwrap(), Part::text("\n"));
        assert_eq!(parse(r"\b").unwrap(), Part::WordBoundary);
    }

    #[test]
    fn test_unicode_property() {
        let Part::Class(set) = parse(r"\p{Greek}").unwrap() else {
            panic!("expected a class");
        };
        assert!(set.test('λ'));
        assert!(!set.test('l'));
        assert_eq!(
            parse(r"\p{NotAProperty}"),
            Err(ParseError::UnknownProperty("NotAProperty".to_string()))
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("(ab"), Err(ParseError::UnclosedGroup(0)));
        assert_eq!(parse("ab)"), Err(ParseError::UnmatchedClose(2)));
        assert_eq!(parse("*a"), Err(ParseError::NothingToRepeat(0)));
        assert_eq!(parse("[ab"), Err(ParseError::UnterminatedClass(0)));
        assert_eq!(
            parse("[z-a]"),
            Err(ParseError::BadClassRange { from: 'z', to: 'a' })
        );
        assert_eq!(parse("a{3,1}"), Err(ParseError::BadRepetition(1)));
        assert_eq!(parse("(?x:a)"), Err(ParseError::BadGroup(2)));
    }

    #[test]
    fn test_empty_alternatives() {
        assert_eq!(
            parse("a|").unwrap(),
            Part::Alt(vec![Part::text("a"), Part::Concat(vec![])])
        );
    }
}
