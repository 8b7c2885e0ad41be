//! Sets of code points.
//!
//! `CharSet` is an immutable value type backed by the sorted, non-overlapping
//! range list of `regex_syntax`'s `ClassUnicode`. Every operation returns a
//! new set; the NFA and DFA keep sets as transition masks.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex_syntax::hir::{ClassUnicode, ClassUnicodeRange};

#[derive(Clone, PartialEq, Eq)]
pub struct CharSet(ClassUnicode);

impl CharSet {
    pub fn empty() -> Self {
        CharSet(ClassUnicode::empty())
    }

    /// The set of every code point.
    pub fn any() -> Self {
        CharSet::range('\0', char::MAX)
    }

    pub fn from_char(c: char) -> Self {
        CharSet::range(c, c)
    }

    /// Inclusive range. Reversed bounds are swapped.
    pub fn range(from: char, to: char) -> Self {
        CharSet(ClassUnicode::new([ClassUnicodeRange::new(from, to)]))
    }

    pub fn from_chars(chars: &str) -> Self {
        CharSet(ClassUnicode::new(
            chars.chars().map(|c| ClassUnicodeRange::new(c, c)),
        ))
    }

    pub fn from_ranges<I: IntoIterator<Item = (char, char)>>(ranges: I) -> Self {
        CharSet(ClassUnicode::new(
            ranges
                .into_iter()
                .map(|(from, to)| ClassUnicodeRange::new(from, to)),
        ))
    }

    pub(crate) fn from_class(class: ClassUnicode) -> Self {
        CharSet(class)
    }

    /// Membership test by binary search over the range list.
    pub fn test(&self, c: char) -> bool {
        self.0
            .ranges()
            .binary_search_by(|r| {
                if r.end() < c {
                    Ordering::Less
                } else if r.start() > c {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.ranges().is_empty()
    }

    pub fn union(&self, other: &CharSet) -> CharSet {
        let mut class = self.0.clone();
        class.union(&other.0);
        CharSet(class)
    }

    pub fn intersect(&self, other: &CharSet) -> CharSet {
        let mut class = self.0.clone();
        class.intersect(&other.0);
        CharSet(class)
    }

    pub fn difference(&self, other: &CharSet) -> CharSet {
        let mut class = self.0.clone();
        class.difference(&other.0);
        CharSet(class)
    }

    pub fn complement(&self) -> CharSet {
        let mut class = self.0.clone();
        class.negate();
        CharSet(class)
    }

    /// True when every member of `other` is also a member of `self`.
    pub fn contains(&self, other: &CharSet) -> bool {
        other.difference(self).is_empty()
    }

    pub fn overlaps(&self, other: &CharSet) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Adds the simple case foldings of every member.
    pub fn case_folded(&self) -> CharSet {
        let mut class = self.0.clone();
        class.case_fold_simple();
        CharSet(class)
    }

    /// Inclusive `(first, last)` ranges in ascending order.
    pub fn ranges(&self) -> impl Iterator<Item = (char, char)> + '_ {
        self.0.iter().map(|r| (r.start(), r.end()))
    }

    /// The only member, if the set holds exactly one code point.
    pub fn single(&self) -> Option<char> {
        match self.0.ranges() {
            [r] if r.start() == r.end() => Some(r.start()),
            _ => None,
        }
    }
}

impl Default for CharSet {
    fn default() -> Self {
        CharSet::empty()
    }
}

impl fmt::Debug for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (from, to) in self.ranges() {
            if from == to {
                write!(f, "{}", from.escape_debug())?;
            } else {
                write!(f, "{}-{}", from.escape_debug(), to.escape_debug())?;
            }
        }
        write!(f, "]")
    }
}

macro_rules! shared_set {
    ($(#[$meta:meta])* $name:ident => $init:expr) => {
        $(#[$meta])*
        pub fn $name() -> &'static CharSet {
            static SET: OnceLock<CharSet> = OnceLock::new();
            SET.get_or_init(|| $init)
        }
    };
}

shared_set!(
    /// `\n`, `\r`, U+2028 and U+2029.
    line_terminators => CharSet::from_chars("\n\r\u{2028}\u{2029}")
);
shared_set!(any_but_line_terminators => line_terminators().complement());
shared_set!(digit => CharSet::range('0', '9'));
shared_set!(
    /// `[A-Za-z0-9_]`, the set `\w` and `\b` are defined over.
    word => CharSet::from_ranges([('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_')])
);
shared_set!(whitespace => CharSet::from_chars(" \t\r\n\u{c}\u{b}"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let set = CharSet::from_ranges([('a', 'f'), ('x', 'z')]);
        assert!(set.test('a'));
        assert!(set.test('f'));
        assert!(set.test('y'));
        assert!(!set.test('g'));
        assert!(!set.test('A'));
    }

    #[test]
    fn test_algebra() {
        let lower = CharSet::range('a', 'z');
        let vowels = CharSet::from_chars("aeiou");
        assert!(lower.contains(&vowels));
        assert!(!vowels.contains(&lower));

        let consonants = lower.difference(&vowels);
        assert!(!consonants.test('e'));
        assert!(consonants.test('b'));
        assert!(!consonants.overlaps(&vowels));
        assert_eq!(consonants.union(&vowels), lower);
        assert_eq!(lower.intersect(&vowels), vowels);
    }

    #[test]
    fn test_complement_covers_everything() {
        let set = CharSet::from_chars("abc");
        let rest = set.complement();
        assert!(!rest.test('b'));
        assert!(rest.test('\u{1F600}'));
        assert_eq!(set.union(&rest), CharSet::any());
        assert!(set.intersect(&rest).is_empty());
    }

    #[test]
    fn test_case_folding() {
        let folded = CharSet::from_char('k').case_folded();
        assert!(folded.test('k'));
        assert!(folded.test('K'));
        // KELVIN SIGN folds to k
        assert!(folded.test('\u{212A}'));
    }

    #[test]
    fn test_single_and_ranges() {
        assert_eq!(CharSet::from_char('q').single(), Some('q'));
        assert_eq!(CharSet::range('a', 'b').single(), None);
        let ranges: Vec<_> = CharSet::from_chars("cab").ranges().collect();
        assert_eq!(ranges, vec![('a', 'c')]);
    }

    #[test]
    fn test_shared_sets() {
        assert!(word().test('_'));
        assert!(!word().test('-'));
        assert!(line_terminators().test('\u{2028}'));
        assert!(!any_but_line_terminators().test('\n'));
        assert!(any_but_line_terminators().test('x'));
        assert!(whitespace().test('\t'));
        assert!(digit().test('7'));
    }
}
