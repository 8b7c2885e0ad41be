//! Subset construction and the DFA runner.
//!
//! A DFA state stands for a set of NFA states. Zero-width `Look` transitions
//! are resolved while building: a state whose set contains look transitions
//! remembers the category of the character that led into it, and the
//! category of the next character is known when the state's outgoing
//! transitions and its acceptance are computed. Acceptance is therefore a set
//! of next-character categories rather than a flag.

use std::collections::{BTreeSet, HashMap};

use crate::analysis::can_dfa;
use crate::ast::{Options, Part};
use crate::charset::CharSet;
use crate::error::{Error, Result};
use crate::look::{Categories, Category};
use crate::nfa::{Guard, Nfa, StateId};
use crate::parser::parse;

pub type DfaStateId = usize;

#[derive(Debug, Clone)]
pub struct DfaState {
    /// Pairwise disjoint masks.
    transitions: Vec<(CharSet, DfaStateId)>,
    /// Next-character categories at which this state accepts.
    accepting: Categories,
}

impl DfaState {
    pub fn transitions(&self) -> &[(CharSet, DfaStateId)] {
        &self.transitions
    }

    pub fn accepting(&self) -> Categories {
        self.accepting
    }

    fn step(&self, c: char) -> Option<DfaStateId> {
        self.transitions
            .iter()
            .find(|(mask, _)| mask.test(c))
            .map(|&(_, target)| target)
    }
}

#[derive(Debug, Clone)]
pub struct Dfa {
    states: Vec<DfaState>,
    /// Start state per category of the character before the start position.
    roots: [DfaStateId; 4],
}

impl Dfa {
    /// Builds a DFA for a pattern tree, failing when the pattern needs the
    /// backtracking runner.
    pub fn from_ast(part: &Part, options: Options) -> Result<Dfa> {
        let nfa = Nfa::without_promotion(part, options)?;
        if !can_dfa(&nfa, nfa.start(), nfa.accept()) {
            return Err(Error::NotRegular);
        }
        Ok(Dfa::build(&nfa, nfa.start(), nfa.accept()))
    }

    pub fn from_pattern(pattern: &str, options: Options) -> Result<Dfa> {
        Dfa::from_ast(&parse(pattern)?, options)
    }

    /// Subset construction for the fragment from `start` to `goal`. The DFA
    /// accepts wherever the NFA can reach `goal`; nothing past `goal` is
    /// explored.
    pub(crate) fn build(nfa: &Nfa, start: StateId, goal: StateId) -> Dfa {
        let mut builder = SubsetBuilder {
            nfa,
            goal,
            states: Vec::new(),
            ids: HashMap::new(),
            pending: Vec::new(),
        };
        let seed = builder.closure([start]);
        let roots = Category::ALL.map(|prev| builder.intern(seed.clone(), prev));
        while let Some((id, set, prev)) = builder.pending.pop() {
            let state = builder.expand(&set, prev);
            builder.states[id] = state;
        }
        Dfa {
            states: builder.states,
            roots,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, id: DfaStateId) -> &DfaState {
        &self.states[id]
    }

    pub fn root(&self, prev: Category) -> DfaStateId {
        self.roots[prev.index()]
    }

    /// Longest match starting at `start`: the end of the last accepting
    /// position seen before the scan dies or the subject runs out.
    pub fn run(&self, subject: &str, start: usize) -> Option<usize> {
        self.run_bounded(subject, start, subject.len())
    }

    /// Like `run`, but never consumes past `limit`. Assertions still see the
    /// characters beyond it.
    pub fn run_bounded(&self, subject: &str, start: usize, limit: usize) -> Option<usize> {
        let mut state = self.root(Category::before(subject, start));
        let mut pos = start;
        let mut last = None;
        loop {
            let current = &self.states[state];
            if current.accepting.includes(Category::after(subject, pos)) {
                last = Some(pos);
            }
            if pos >= limit {
                break;
            }
            let Some(c) = subject[pos..].chars().next() else {
                break;
            };
            match current.step(c) {
                Some(next) => {
                    state = next;
                    pos += c.len_utf8();
                }
                None => break,
            }
        }
        last
    }

    /// Leftmost match as a byte range.
    pub fn find(&self, subject: &str) -> Option<(usize, usize)> {
        subject
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(subject.len()))
            .find_map(|start| self.run(subject, start).map(|end| (start, end)))
    }

    pub fn is_match(&self, subject: &str) -> bool {
        self.find(subject).is_some()
    }
}

type Key = (Vec<StateId>, Option<Category>);

struct SubsetBuilder<'a> {
    nfa: &'a Nfa,
    goal: StateId,
    states: Vec<DfaState>,
    ids: HashMap<Key, DfaStateId>,
    pending: Vec<(DfaStateId, Vec<StateId>, Option<Category>)>,
}

impl SubsetBuilder<'_> {
    /// Epsilon closure, sorted. Look transitions are not followed.
    fn closure<I: IntoIterator<Item = StateId>>(&self, seeds: I) -> Vec<StateId> {
        let mut set = BTreeSet::new();
        let mut stack: Vec<StateId> = seeds.into_iter().collect();
        while let Some(id) = stack.pop() {
            if !set.insert(id) || id == self.goal {
                continue;
            }
            stack.extend(self.nfa.state(id).epsilons.iter().copied());
        }
        set.into_iter().collect()
    }

    fn has_looks(&self, set: &[StateId]) -> bool {
        set.iter().any(|&id| {
            id != self.goal
                && self
                    .nfa
                    .state(id)
                    .transition
                    .as_ref()
                    .is_some_and(|t| matches!(t.guard, Guard::Look(_)))
        })
    }

    /// Grows `set` through every look transition that holds between `prev`
    /// and `next`.
    fn resolve_looks(&self, set: &[StateId], prev: Category, next: Category) -> Vec<StateId> {
        let mut set: BTreeSet<StateId> = set.iter().copied().collect();
        let mut stack: Vec<StateId> = set.iter().copied().collect();
        while let Some(id) = stack.pop() {
            if id == self.goal {
                continue;
            }
            let Some(transition) = &self.nfa.state(id).transition else {
                continue;
            };
            if let Guard::Look(look) = transition.guard {
                if look.holds(prev, next) {
                    for reached in self.closure([transition.target]) {
                        if set.insert(reached) {
                            stack.push(reached);
                        }
                    }
                }
            }
        }
        set.into_iter().collect()
    }

    /// The DFA state for `set` entered after a character of category `prev`.
    /// `prev` only distinguishes states whose set has look transitions.
    fn intern(&mut self, set: Vec<StateId>, prev: Category) -> DfaStateId {
        let prev = self.has_looks(&set).then_some(prev);
        let key = (set, prev);
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = self.states.len();
        self.states.push(DfaState {
            transitions: Vec::new(),
            accepting: Categories::empty(),
        });
        self.pending.push((id, key.0.clone(), prev));
        self.ids.insert(key, id);
        id
    }

    fn expand(&mut self, set: &[StateId], prev: Option<Category>) -> DfaState {
        let mut accepting = Categories::empty();
        let mut transitions: Vec<(CharSet, DfaStateId)> = Vec::new();
        match prev {
            None => {
                if set.contains(&self.goal) {
                    accepting = Categories::all();
                }
                for (mask, targets) in self.partition(set, None) {
                    let next = self.closure(targets);
                    if self.has_looks(&next) {
                        for category in Category::CHARS {
                            let piece = mask.intersect(&category.members());
                            if !piece.is_empty() {
                                let id = self.intern(next.clone(), category);
                                transitions.push((piece, id));
                            }
                        }
                    } else {
                        let id = self.intern(next, Category::Other);
                        transitions.push((mask, id));
                    }
                }
            }
            Some(prev) => {
                for category in Category::ALL {
                    let resolved = self.resolve_looks(set, prev, category);
                    if resolved.contains(&self.goal) {
                        accepting |= category.set();
                    }
                    if category == Category::Edge {
                        continue;
                    }
                    let members = category.members();
                    for (mask, targets) in self.partition(&resolved, Some(&members)) {
                        let next = self.closure(targets);
                        let id = self.intern(next, category);
                        transitions.push((mask, id));
                    }
                }
            }
        }
        DfaState {
            transitions: merge_targets(transitions),
            accepting,
        }
    }

    /// Splits the class transitions of `set` into disjoint masks, each with
    /// every NFA state it leads to.
    fn partition(
        &self,
        set: &[StateId],
        within: Option<&CharSet>,
    ) -> Vec<(CharSet, BTreeSet<StateId>)> {
        let mut pieces: Vec<(CharSet, BTreeSet<StateId>)> = Vec::new();
        for &id in set {
            if id == self.goal {
                continue;
            }
            let Some(transition) = &self.nfa.state(id).transition else {
                continue;
            };
            let Guard::Class(mask) = &transition.guard else {
                continue;
            };
            let mut rest = match within {
                Some(within) => mask.intersect(within),
                None => mask.clone(),
            };
            if rest.is_empty() {
                continue;
            }
            let mut split = Vec::with_capacity(pieces.len() + 1);
            for (piece, targets) in pieces {
                let common = piece.intersect(&rest);
                if common.is_empty() {
                    split.push((piece, targets));
                    continue;
                }
                let outside = piece.difference(&rest);
                if !outside.is_empty() {
                    split.push((outside, targets.clone()));
                }
                rest = rest.difference(&piece);
                let mut targets = targets;
                targets.insert(transition.target);
                split.push((common, targets));
            }
            if !rest.is_empty() {
                split.push((rest, BTreeSet::from([transition.target])));
            }
            pieces = split;
        }
        pieces
    }
}

/// Joins masks leading to the same state.
fn merge_targets(transitions: Vec<(CharSet, DfaStateId)>) -> Vec<(CharSet, DfaStateId)> {
    let mut merged: Vec<(CharSet, DfaStateId)> = Vec::new();
    for (mask, target) in transitions {
        match merged.iter_mut().find(|(_, t)| *t == target) {
            Some((existing, _)) => *existing = existing.union(&mask),
            None => merged.push((mask, target)),
        }
    }
    merged
}
