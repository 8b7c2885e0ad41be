use std::collections::HashMap;

use crate::ast::{Options, Part};
use crate::backtrack::{self, Registers};
use crate::error::Result;
use crate::nfa::Nfa;
use crate::parser::parse;

/// A compiled pattern. Regular fragments run on DFAs, the rest on the
/// backtracking runner.
#[derive(Debug, Clone)]
pub struct Matcher {
    nfa: Nfa,
}

/// Groups of one successful match. Offsets are byte offsets into the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures<'s> {
    subject: &'s str,
    /// Group 0 is the whole match.
    spans: Vec<Option<(usize, usize)>>,
    named: HashMap<String, Option<(usize, usize)>>,
}

impl<'s> Captures<'s> {
    /// Text of numbered group `index`, `None` if it did not participate.
    pub fn get(&self, index: usize) -> Option<&'s str> {
        self.span(index).map(|(start, end)| &self.subject[start..end])
    }

    pub fn span(&self, index: usize) -> Option<(usize, usize)> {
        self.spans.get(index).copied().flatten()
    }

    pub fn name(&self, name: &str) -> Option<&'s str> {
        self.name_span(name)
            .map(|(start, end)| &self.subject[start..end])
    }

    pub fn name_span(&self, name: &str) -> Option<(usize, usize)> {
        self.named.get(name).copied().flatten()
    }

    /// Number of numbered groups, including group 0.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The whole match.
    pub fn as_str(&self) -> &'s str {
        self.get(0).unwrap_or_default()
    }

    pub fn start(&self) -> usize {
        self.span(0).map_or(0, |(start, _)| start)
    }

    pub fn end(&self) -> usize {
        self.span(0).map_or(0, |(_, end)| end)
    }
}

impl Matcher {
    pub fn new(pattern: &str, options: Options) -> Result<Matcher> {
        Matcher::from_ast(&parse(pattern)?, options)
    }

    pub fn from_ast(part: &Part, options: Options) -> Result<Matcher> {
        Ok(Matcher {
            nfa: Nfa::new(part, options)?,
        })
    }

    /// Compiles without promoting any fragment to a DFA.
    pub fn backtracking(pattern: &str, options: Options) -> Result<Matcher> {
        Ok(Matcher {
            nfa: Nfa::without_promotion(&parse(pattern)?, options)?,
        })
    }

    pub fn nfa(&self) -> &Nfa {
        &self.nfa
    }

    /// Match starting exactly at byte offset `pos`.
    pub fn match_at<'s>(&self, subject: &'s str, pos: usize) -> Option<Captures<'s>> {
        if !subject.is_char_boundary(pos) {
            return None;
        }
        let mut registers = Registers::new(&self.nfa);
        let end = backtrack::run(&self.nfa, self.nfa.entry(), subject, pos, &mut registers)?;

        let closed = |slot: usize| registers.slots[slot].and_then(|s| s.span());
        let mut spans = vec![Some((pos, end))];
        spans.extend((1..=self.nfa.group_count()).map(|n| {
            self.nfa
                .group_slot(&n.into())
                .and_then(closed)
        }));
        let named = self
            .nfa
            .group_names()
            .map(|(name, slot)| (name.to_string(), closed(slot)))
            .collect();
        Some(Captures {
            subject,
            spans,
            named,
        })
    }

    /// Leftmost match at or after byte offset `from`.
    /// A `from` inside a code point starts at the next one.
    pub fn find_at<'s>(&self, subject: &'s str, from: usize) -> Option<Captures<'s>> {
        let from = (from..=subject.len()).find(|&i| subject.is_char_boundary(i))?;
        subject[from..]
            .char_indices()
            .map(|(i, _)| from + i)
            .chain(std::iter::once(subject.len()))
            .find_map(|start| self.match_at(subject, start))
    }

    pub fn find<'s>(&self, subject: &'s str) -> Option<Captures<'s>> {
        self.find_at(subject, 0)
    }

    pub fn is_match(&self, subject: &str) -> bool {
        self.find(subject).is_some()
    }

    /// Successive non-overlapping matches.
    pub fn find_iter<'m, 's>(&'m self, subject: &'s str) -> Matches<'m, 's> {
        Matches {
            matcher: self,
            subject,
            pos: Some(0),
        }
    }
}

pub struct Matches<'m, 's> {
    matcher: &'m Matcher,
    subject: &'s str,
    pos: Option<usize>,
}

impl<'s> Iterator for Matches<'_, 's> {
    type Item = Captures<'s>;

    fn next(&mut self) -> Option<Self::Item> {
        let found = self.matcher.find_at(self.subject, self.pos?)?;
        let end = found.end();
        // An empty match moves the search on by one character.
        self.pos = if end == found.start() {
            self.subject[end..]
                .chars()
                .next()
                .map(|c| end + c.len_utf8())
        } else {
            Some(end)
        };
        Some(found)
    }
}
