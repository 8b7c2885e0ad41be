//! Arena NFA built from a `Part` tree.
//!
//! Building happens in two phases. Phase 1 walks the tree and lays out states
//! (Thompson construction) while collecting every fragment that could run on a
//! DFA: capture bodies, lookaround/atomic/possessive bodies and the pattern as
//! a whole. Phase 2 resolves backreferences, then runs the determinism
//! analysis on each collected fragment, innermost first, and compiles the
//! ones that pass.

use std::collections::HashMap;

use log::debug;

use crate::analysis::can_dfa;
use crate::ast::{GroupKey, GroupKind, Options, Part, Repetition};
use crate::charset::{self, CharSet};
use crate::dfa::Dfa;
use crate::error::{Error, Result};
use crate::look::Look;

pub type StateId = usize;
pub type SubId = usize;
pub type DfaId = usize;
pub type LoopId = usize;

/// What a state checks before it moves on.
#[derive(Debug, Clone)]
pub enum Guard {
    /// Consume one code point from the set.
    Class(CharSet),
    /// Zero-width assertion.
    Look(Look),
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub guard: Guard,
    pub target: StateId,
}

/// Instruction carried by a state, interpreted by the backtracking runner.
///
/// `Inst::None` states move through their `transition`. Every other
/// instruction decides the next state itself.
#[derive(Debug, Clone)]
pub enum Inst {
    None,
    /// A case-sensitive literal compared in one step. The state also carries
    /// the one-code-point transition chain used by subset construction.
    Text { text: String, next: StateId },
    /// Opens `slot` and enters `body`, or runs `dfa` over the body and jumps
    /// straight to `close`.
    Capture {
        slot: usize,
        body: StateId,
        close: StateId,
        dfa: Option<DfaId>,
    },
    CaptureClose { slot: usize, next: StateId },
    /// `slot` is filled in phase 2; `None` means the group does not exist.
    Backref {
        key: GroupKey,
        slot: Option<usize>,
        fold: bool,
        next: StateId,
    },
    LookAround {
        behind: bool,
        negated: bool,
        sub: SubId,
        next: StateId,
    },
    Atomic { sub: SubId, next: StateId },
    Possessive {
        sub: SubId,
        min: usize,
        max: Option<usize>,
        next: StateId,
    },
    /// Runs a compiled DFA and continues at its end position.
    Dfa { dfa: DfaId, next: StateId },
}

#[derive(Debug, Clone)]
pub struct State {
    pub inst: Inst,
    pub transition: Option<Transition>,
    /// Tried in order by greedy states and in reverse by lazy ones.
    pub epsilons: Vec<StateId>,
    pub accepting: bool,
    pub lazy: bool,
    /// Set on the head of an unbounded loop; taking the first epsilon starts
    /// an iteration.
    pub looping: Option<LoopId>,
    /// Set on the state closing an iteration. An iteration that consumed
    /// nothing fails here.
    pub loop_back: Option<LoopId>,
}

impl State {
    fn new() -> Self {
        State {
            inst: Inst::None,
            transition: None,
            epsilons: Vec::new(),
            accepting: false,
            lazy: false,
            looping: None,
            loop_back: None,
        }
    }
}

/// An isolated fragment run as a unit: a lookaround, atomic or possessive body.
#[derive(Debug, Clone)]
pub struct Sub {
    pub start: StateId,
    pub accept: StateId,
    pub dfa: Option<DfaId>,
    /// Whether the body opens capture groups.
    pub captures: bool,
}

#[derive(Debug, Clone)]
pub struct Nfa {
    states: Vec<State>,
    subs: Vec<Sub>,
    dfas: Vec<Dfa>,
    slots: usize,
    /// `numbers[n]` is the slot of group `n`; group 0 is the whole match.
    numbers: Vec<usize>,
    names: HashMap<String, usize>,
    loops: usize,
    start: StateId,
    accept: StateId,
    entry: StateId,
}

enum Candidate {
    Capture(StateId),
    Sub(SubId),
}

impl Nfa {
    /// Compiles `part`, promoting every fragment the analyzer accepts.
    pub fn new(part: &Part, options: Options) -> Result<Nfa> {
        Nfa::build(part, options, true)
    }

    /// Compiles `part` for the backtracking runner only.
    pub fn without_promotion(part: &Part, options: Options) -> Result<Nfa> {
        Nfa::build(part, options, false)
    }

    fn build(part: &Part, options: Options, promote: bool) -> Result<Nfa> {
        let mut builder = Builder {
            nfa: Nfa {
                states: Vec::new(),
                subs: Vec::new(),
                dfas: Vec::new(),
                slots: 1,
                numbers: vec![0],
                names: HashMap::new(),
                loops: 0,
                start: 0,
                accept: 0,
                entry: 0,
            },
            options,
            next_index: 0,
            captures_built: 0,
            deferred: Vec::new(),
        };
        let start = builder.add();
        let accept = builder.build(part, start, None)?;
        builder.nfa.states[accept].accepting = true;
        builder.nfa.start = start;
        builder.nfa.accept = accept;
        builder.nfa.entry = start;
        builder.finish(promote);
        Ok(builder.nfa)
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn sub(&self, id: SubId) -> &Sub {
        &self.subs[id]
    }

    pub fn dfa(&self, id: DfaId) -> &Dfa {
        &self.dfas[id]
    }

    /// Number of DFAs compiled for promoted fragments.
    pub fn dfa_count(&self) -> usize {
        self.dfas.len()
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn accept(&self) -> StateId {
        self.accept
    }

    /// Where matching begins: `start`, or a state running the DFA compiled for
    /// the whole pattern.
    pub fn entry(&self) -> StateId {
        self.entry
    }

    /// True when the whole pattern was compiled to one DFA.
    pub fn is_promoted(&self) -> bool {
        self.entry != self.start
    }

    pub fn slot_count(&self) -> usize {
        self.slots
    }

    pub fn loop_count(&self) -> usize {
        self.loops
    }

    /// Number of numbered groups, not counting group 0.
    pub fn group_count(&self) -> usize {
        self.numbers.len() - 1
    }

    pub fn group_slot(&self, key: &GroupKey) -> Option<usize> {
        match key {
            GroupKey::Index(n) => self.numbers.get(*n).copied(),
            GroupKey::Name(name) => self.names.get(name).copied(),
        }
    }

    pub fn group_names(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.names.iter().map(|(name, slot)| (name.as_str(), *slot))
    }
}

struct Builder {
    nfa: Nfa,
    options: Options,
    /// Last numbered group handed out.
    next_index: usize,
    captures_built: usize,
    deferred: Vec<Candidate>,
}

impl Builder {
    fn add(&mut self) -> StateId {
        self.nfa.states.push(State::new());
        self.nfa.states.len() - 1
    }

    fn target(&mut self, accept: Option<StateId>) -> StateId {
        match accept {
            Some(id) => id,
            None => self.add(),
        }
    }

    fn guard(&mut self, from: StateId, guard: Guard, target: StateId) {
        self.nfa.states[from].transition = Some(Transition { guard, target });
    }

    /// Compiles `part` starting at the bare state `start`, ending in `accept`
    /// (or a fresh state), and returns the accept.
    fn build(&mut self, part: &Part, start: StateId, accept: Option<StateId>) -> Result<StateId> {
        match part {
            Part::Text(text) => self.text(text, start, accept),
            Part::Concat(parts) => {
                let Some((last, init)) = parts.split_last() else {
                    return Ok(match accept {
                        Some(accept) => {
                            self.nfa.states[start].epsilons.push(accept);
                            accept
                        }
                        None => start,
                    });
                };
                let mut cur = start;
                for part in init {
                    cur = self.build(part, cur, None)?;
                }
                self.build(last, cur, accept)
            }
            Part::Alt(parts) => {
                let exit = self.target(accept);
                for part in parts {
                    let branch = self.add();
                    self.nfa.states[start].epsilons.push(branch);
                    self.build(part, branch, Some(exit))?;
                }
                Ok(exit)
            }
            Part::Quantified {
                part,
                min,
                max,
                mode,
            } => self.quantified(part, *min, *max, *mode, start, accept),
            Part::Class(set) => {
                let mut set = if !self.options.dot_all && *set == CharSet::any() {
                    charset::any_but_line_terminators().clone()
                } else {
                    set.clone()
                };
                if self.options.case_insensitive {
                    set = set.case_folded();
                }
                let exit = self.target(accept);
                self.guard(start, Guard::Class(set), exit);
                Ok(exit)
            }
            Part::WordBoundary => self.look(Look::WordBoundary, start, accept),
            Part::NonWordBoundary => self.look(Look::NotWordBoundary, start, accept),
            Part::InputStart => {
                let look = if self.options.multiline {
                    Look::LineStart
                } else {
                    Look::TextStart
                };
                self.look(look, start, accept)
            }
            Part::InputEnd => {
                let look = if self.options.multiline {
                    Look::LineEnd
                } else {
                    Look::TextEnd
                };
                self.look(look, start, accept)
            }
            Part::NonCapture { part, kind } => self.group(part, kind, start, accept),
            Part::Capture { part, name } => {
                let slot = self.slot(name.as_deref());
                self.captures_built += 1;
                let body = self.add();
                let close = self.add();
                self.build(part, body, Some(close))?;
                let exit = self.target(accept);
                self.nfa.states[close].inst = Inst::CaptureClose { slot, next: exit };
                self.nfa.states[start].inst = Inst::Capture {
                    slot,
                    body,
                    close,
                    dfa: None,
                };
                self.deferred.push(Candidate::Capture(start));
                Ok(exit)
            }
            Part::Reference(key) => {
                let exit = self.target(accept);
                self.nfa.states[start].inst = Inst::Backref {
                    key: key.clone(),
                    slot: None,
                    fold: self.options.case_insensitive,
                    next: exit,
                };
                Ok(exit)
            }
        }
    }

    fn text(&mut self, text: &str, start: StateId, accept: Option<StateId>) -> Result<StateId> {
        let chars: Vec<char> = text.chars().collect();
        let Some((last, init)) = chars.split_last() else {
            return self.build(&Part::Concat(Vec::new()), start, accept);
        };
        let fold = self.options.case_insensitive;
        let mask = |c: char| {
            let set = CharSet::from_char(c);
            if fold {
                set.case_folded()
            } else {
                set
            }
        };
        let mut cur = start;
        for &c in init {
            let next = self.add();
            self.guard(cur, Guard::Class(mask(c)), next);
            cur = next;
        }
        let exit = self.target(accept);
        self.guard(cur, Guard::Class(mask(*last)), exit);
        if !fold {
            self.nfa.states[start].inst = Inst::Text {
                text: text.to_string(),
                next: exit,
            };
        }
        Ok(exit)
    }

    fn look(&mut self, look: Look, start: StateId, accept: Option<StateId>) -> Result<StateId> {
        let exit = self.target(accept);
        self.guard(start, Guard::Look(look), exit);
        Ok(exit)
    }

    fn quantified(
        &mut self,
        part: &Part,
        min: usize,
        max: Option<usize>,
        mode: Repetition,
        start: StateId,
        accept: Option<StateId>,
    ) -> Result<StateId> {
        if let Some(max) = max {
            if min > max {
                return Err(Error::InvalidRepetition { min, max });
            }
        }
        if mode == Repetition::Possessive {
            let sub = self.sub(part)?;
            let exit = self.target(accept);
            self.nfa.states[start].inst = Inst::Possessive {
                sub,
                min,
                max,
                next: exit,
            };
            return Ok(exit);
        }

        let lazy = mode == Repetition::Lazy;
        // Every copy of the body reuses the group numbers of the first one.
        let base = self.next_index;
        let mut cur = start;
        for i in 0..min {
            self.next_index = base;
            if i + 1 == min && max == Some(min) {
                return self.build(part, cur, accept);
            }
            cur = self.build(part, cur, None)?;
        }

        let exit = self.target(accept);
        match max {
            None => {
                let id = self.nfa.loops;
                self.nfa.loops += 1;
                let body = self.add();
                let back = self.add();
                self.next_index = base;
                self.build(part, body, Some(back))?;
                self.nfa.states[back].epsilons.push(cur);
                self.nfa.states[back].loop_back = Some(id);
                let head = &mut self.nfa.states[cur];
                head.epsilons = vec![body, exit];
                head.lazy = lazy;
                head.looping = Some(id);
            }
            Some(max) => {
                if min == max {
                    self.nfa.states[cur].epsilons.push(exit);
                }
                for i in min..max {
                    let body = self.add();
                    self.next_index = base;
                    let next = if i + 1 == max {
                        self.build(part, body, Some(exit))?
                    } else {
                        self.build(part, body, None)?
                    };
                    let fan_out = &mut self.nfa.states[cur];
                    fan_out.epsilons = vec![body, exit];
                    fan_out.lazy = lazy;
                    cur = next;
                }
            }
        }
        Ok(exit)
    }

    fn group(
        &mut self,
        part: &Part,
        kind: &GroupKind,
        start: StateId,
        accept: Option<StateId>,
    ) -> Result<StateId> {
        let (behind, negated) = match kind {
            GroupKind::Flags(flags) => {
                let saved = self.options;
                self.options = saved.overlay(flags);
                let result = self.build(part, start, accept);
                self.options = saved;
                return result;
            }
            GroupKind::Atomic => {
                let sub = self.sub(part)?;
                let exit = self.target(accept);
                self.nfa.states[start].inst = Inst::Atomic { sub, next: exit };
                return Ok(exit);
            }
            GroupKind::LookAhead => (false, false),
            GroupKind::NegLookAhead => (false, true),
            GroupKind::LookBehind => (true, false),
            GroupKind::NegLookBehind => (true, true),
        };
        let sub = self.sub(part)?;
        let exit = self.target(accept);
        self.nfa.states[start].inst = Inst::LookAround {
            behind,
            negated,
            sub,
            next: exit,
        };
        Ok(exit)
    }

    /// Compiles `part` as an isolated fragment with an accepting accept.
    fn sub(&mut self, part: &Part) -> Result<SubId> {
        let before = self.captures_built;
        let start = self.add();
        let accept = self.add();
        self.nfa.states[accept].accepting = true;
        self.build(part, start, Some(accept))?;
        self.nfa.subs.push(Sub {
            start,
            accept,
            dfa: None,
            captures: self.captures_built > before,
        });
        let id = self.nfa.subs.len() - 1;
        self.deferred.push(Candidate::Sub(id));
        Ok(id)
    }

    fn slot(&mut self, name: Option<&str>) -> usize {
        match name {
            Some(name) => {
                if let Some(&slot) = self.nfa.names.get(name) {
                    return slot;
                }
                let slot = self.new_slot();
                self.nfa.names.insert(name.to_string(), slot);
                slot
            }
            None => {
                self.next_index += 1;
                if let Some(&slot) = self.nfa.numbers.get(self.next_index) {
                    return slot;
                }
                let slot = self.new_slot();
                self.nfa.numbers.push(slot);
                slot
            }
        }
    }

    fn new_slot(&mut self) -> usize {
        self.nfa.slots += 1;
        self.nfa.slots - 1
    }

    /// Phase 2.
    fn finish(&mut self, promote: bool) {
        let nfa = &mut self.nfa;
        for state in &mut nfa.states {
            if let Inst::Backref { key, slot, .. } = &mut state.inst {
                *slot = match key {
                    GroupKey::Index(n) => nfa.numbers.get(*n).copied(),
                    GroupKey::Name(name) => nfa.names.get(name).copied(),
                };
            }
        }
        if !promote {
            return;
        }

        for candidate in std::mem::take(&mut self.deferred) {
            match candidate {
                Candidate::Capture(id) => {
                    let Inst::Capture {
                        slot, body, close, ..
                    } = self.nfa.states[id].inst
                    else {
                        continue;
                    };
                    if !can_dfa(&self.nfa, body, close) {
                        continue;
                    }
                    let dfa = self.promote(body, close);
                    debug!(
                        "capture slot {} runs on DFA {} ({} states)",
                        slot,
                        dfa,
                        self.nfa.dfas[dfa].len()
                    );
                    if let Inst::Capture { dfa: target, .. } = &mut self.nfa.states[id].inst {
                        *target = Some(dfa);
                    }
                }
                Candidate::Sub(id) => {
                    let Sub { start, accept, .. } = self.nfa.subs[id];
                    if !can_dfa(&self.nfa, start, accept) {
                        continue;
                    }
                    let dfa = self.promote(start, accept);
                    debug!(
                        "sub-pattern {} runs on DFA {} ({} states)",
                        id,
                        dfa,
                        self.nfa.dfas[dfa].len()
                    );
                    self.nfa.subs[id].dfa = Some(dfa);
                }
            }
        }

        let (start, accept) = (self.nfa.start, self.nfa.accept);
        if can_dfa(&self.nfa, start, accept) {
            let dfa = self.promote(start, accept);
            let entry = self.add();
            self.nfa.states[entry].inst = Inst::Dfa { dfa, next: accept };
            self.nfa.entry = entry;
            debug!(
                "pattern runs on a DFA with {} states (NFA has {})",
                self.nfa.dfas[dfa].len(),
                self.nfa.states.len()
            );
        } else {
            debug!(
                "pattern needs backtracking over {} states, {} fragments promoted",
                self.nfa.states.len(),
                self.nfa.dfas.len()
            );
        }
    }

    fn promote(&mut self, start: StateId, goal: StateId) -> DfaId {
        let dfa = Dfa::build(&self.nfa, start, goal);
        self.nfa.dfas.push(dfa);
        self.nfa.dfas.len() - 1
    }
}
