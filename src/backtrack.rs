//! Backtracking interpreter over the NFA arena.
//!
//! States without a choice are chased in a loop. At a branch point the
//! remaining options go on an explicit stack together with a snapshot of the
//! capture slots, and a failed option restores it, so captures only ever
//! reflect the path that won. Sub-patterns (lookaround, atomic, possessive)
//! get their own stack, so call depth follows pattern nesting only.

use crate::charset::CharSet;
use crate::look::Look;
use crate::nfa::{Guard, Inst, LoopId, Nfa, State, StateId, SubId};

/// A capture slot: opened at `start`, closed at `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: usize,
    pub end: Option<usize>,
}

impl Slot {
    /// The byte range, once the group has closed.
    pub fn span(&self) -> Option<(usize, usize)> {
        self.end.map(|end| (self.start, end))
    }
}

/// Per-run mutable state.
#[derive(Debug, Clone, Default)]
pub struct Registers {
    pub slots: Vec<Option<Slot>>,
    /// Position at which the current iteration of each unbounded loop began.
    loops: Vec<Option<usize>>,
}

impl Registers {
    pub fn new(nfa: &Nfa) -> Self {
        Registers {
            slots: vec![None; nfa.slot_count()],
            loops: vec![None; nfa.loop_count()],
        }
    }
}

/// Runs the NFA from `state` at `pos`. Returns the end position of the first
/// path that reaches an accepting state, in priority order.
pub fn run(
    nfa: &Nfa,
    state: StateId,
    subject: &str,
    pos: usize,
    registers: &mut Registers,
) -> Option<usize> {
    let mut runner = Backtracker {
        nfa,
        subject,
        regs: std::mem::take(registers),
        track: nfa.slot_count() > 1,
        limit: subject.len(),
        must_end: None,
    };
    let result = runner.walk(state, pos);
    *registers = runner.regs;
    result
}

/// Pending work and undo records of one `walk`.
enum Frame {
    Visit { state: StateId, pos: usize },
    /// Run the state's instruction or transition.
    Step { state: StateId, pos: usize },
    /// Start an iteration of a loop body.
    Enter { id: LoopId, state: StateId, pos: usize },
    Accept(usize),
    Slots(Vec<Option<Slot>>),
    /// Puts back the iteration start an `Enter` replaced.
    Loop { id: LoopId, start: Option<usize> },
}

/// The frame following one epsilon of a branch point. Taking the first
/// epsilon of a loop head starts an iteration.
fn epsilon(s: &State, next: StateId, pos: usize) -> Frame {
    match s.looping {
        Some(id) if s.epsilons.first() == Some(&next) => Frame::Enter {
            id,
            state: next,
            pos,
        },
        _ => Frame::Visit { state: next, pos },
    }
}

struct Backtracker<'n, 's> {
    nfa: &'n Nfa,
    subject: &'s str,
    regs: Registers,
    /// Whether there are capture slots worth snapshotting.
    track: bool,
    /// Nothing is consumed past this position.
    limit: usize,
    /// Set while running a lookbehind body: only this end is accepted.
    must_end: Option<usize>,
}

impl Backtracker<'_, '_> {
    /// Runs from `state` to the first accepting state in priority order.
    /// Pending alternatives live on a heap stack, so the depth of the
    /// subject never turns into call depth.
    fn walk(&mut self, state: StateId, pos: usize) -> Option<usize> {
        let mut stack = vec![Frame::Visit { state, pos }];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Visit { state, pos } => {
                    if let Some(end) = self.visit(state, pos, &mut stack) {
                        return Some(end);
                    }
                }
                Frame::Step { state, pos } => {
                    if let Some((state, pos)) = self.step(state, pos) {
                        stack.push(Frame::Visit { state, pos });
                    }
                }
                Frame::Enter { id, state, pos } => {
                    let start = std::mem::replace(&mut self.regs.loops[id], Some(pos));
                    stack.push(Frame::Loop { id, start });
                    stack.push(Frame::Visit { state, pos });
                }
                Frame::Accept(end) => return Some(end),
                Frame::Slots(slots) => self.regs.slots = slots,
                Frame::Loop { id, start } => self.regs.loops[id] = start,
            }
        }
        None
    }

    /// Chases states without a choice. At a branch point the options are
    /// pushed in reverse priority, each but the first behind a restore of the
    /// capture slots.
    fn visit(&mut self, mut state: StateId, mut pos: usize, stack: &mut Vec<Frame>) -> Option<usize> {
        let nfa = self.nfa;
        loop {
            let s = nfa.state(state);
            if let Some(id) = s.loop_back {
                if self.regs.loops[id] == Some(pos) {
                    return None;
                }
            }

            let steps = s.transition.is_some() || !matches!(s.inst, Inst::None);
            let accepts = s.accepting && self.must_end.map_or(true, |end| end == pos);
            if usize::from(steps) + usize::from(accepts) + s.epsilons.len() <= 1 {
                if steps {
                    (state, pos) = self.step(state, pos)?;
                    continue;
                }
                if accepts {
                    return Some(pos);
                }
                state = *s.epsilons.first()?;
                continue;
            }

            let mut options = Vec::with_capacity(s.epsilons.len() + 2);
            if s.lazy {
                options.extend(s.epsilons.iter().rev().map(|&next| epsilon(s, next, pos)));
            }
            if steps {
                options.push(Frame::Step { state, pos });
            }
            if accepts {
                options.push(Frame::Accept(pos));
            }
            if !s.lazy {
                options.extend(s.epsilons.iter().map(|&next| epsilon(s, next, pos)));
            }

            let saved = self.snapshot(self.track);
            let mut options = options.into_iter().rev().peekable();
            while let Some(option) = options.next() {
                stack.push(option);
                if let (Some(_), Some(slots)) = (options.peek(), &saved) {
                    stack.push(Frame::Slots(slots.clone()));
                }
            }
            return None;
        }
    }

    fn snapshot(&self, needed: bool) -> Option<Vec<Option<Slot>>> {
        needed.then(|| self.regs.slots.clone())
    }

    fn restore(&mut self, saved: Option<Vec<Option<Slot>>>) {
        if let Some(slots) = saved {
            self.regs.slots = slots;
        }
    }

    /// Executes the state's instruction or transition.
    fn step(&mut self, state: StateId, pos: usize) -> Option<(StateId, usize)> {
        let nfa = self.nfa;
        match &nfa.state(state).inst {
            Inst::None => {
                let transition = nfa.state(state).transition.as_ref()?;
                match &transition.guard {
                    Guard::Class(set) => {
                        let c = self.next_char(pos)?;
                        set.test(c)
                            .then(|| (transition.target, pos + c.len_utf8()))
                    }
                    Guard::Look(look) => self.holds(*look, pos).then_some((transition.target, pos)),
                }
            }
            Inst::Text { text, next } => {
                let end = pos + text.len();
                (end <= self.limit && self.subject[pos..].starts_with(text.as_str()))
                    .then_some((*next, end))
            }
            Inst::Capture {
                slot,
                body,
                close,
                dfa,
            } => {
                self.regs.slots[*slot] = Some(Slot {
                    start: pos,
                    end: None,
                });
                match dfa {
                    Some(dfa) => {
                        let end = nfa.dfa(*dfa).run_bounded(self.subject, pos, self.limit)?;
                        Some((*close, end))
                    }
                    None => Some((*body, pos)),
                }
            }
            Inst::CaptureClose { slot, next } => {
                if let Some(open) = self.regs.slots[*slot].as_mut() {
                    open.end = Some(pos);
                }
                Some((*next, pos))
            }
            Inst::Backref {
                slot, fold, next, ..
            } => {
                let (start, end) = self.regs.slots[(*slot)?]?.span()?;
                let end = self.backref(start, end, pos, *fold)?;
                Some((*next, end))
            }
            Inst::LookAround {
                behind,
                negated,
                sub,
                next,
            } => {
                let saved = self.snapshot(nfa.sub(*sub).captures);
                let found = if *behind {
                    self.look_behind(*sub, pos)
                } else {
                    let limit = std::mem::replace(&mut self.limit, self.subject.len());
                    let found = self.run_sub(*sub, pos, None).is_some();
                    self.limit = limit;
                    found
                };
                if !found || *negated {
                    self.restore(saved);
                }
                (found != *negated).then_some((*next, pos))
            }
            Inst::Atomic { sub, next } => {
                let end = self.run_sub(*sub, pos, None)?;
                Some((*next, end))
            }
            Inst::Possessive {
                sub,
                min,
                max,
                next,
            } => {
                let mut count = 0;
                let mut at = pos;
                let captures = nfa.sub(*sub).captures;
                while max.map_or(true, |max| count < max) {
                    let saved = self.snapshot(captures);
                    match self.run_sub(*sub, at, None) {
                        Some(end) => {
                            count += 1;
                            if end == at {
                                break;
                            }
                            at = end;
                        }
                        None => {
                            self.restore(saved);
                            break;
                        }
                    }
                }
                (count >= *min).then_some((*next, at))
            }
            Inst::Dfa { dfa, next } => {
                let end = nfa.dfa(*dfa).run_bounded(self.subject, pos, self.limit)?;
                Some((*next, end))
            }
        }
    }

    fn next_char(&self, pos: usize) -> Option<char> {
        if pos >= self.limit {
            return None;
        }
        self.subject[pos..].chars().next()
    }

    fn holds(&self, look: Look, pos: usize) -> bool {
        look.holds_at(self.subject, pos)
    }

    /// Matches the text of a closed group at `pos`.
    fn backref(&self, start: usize, end: usize, pos: usize, fold: bool) -> Option<usize> {
        let captured = &self.subject[start..end];
        if !fold {
            let end = pos + captured.len();
            return (end <= self.limit && self.subject[pos..].starts_with(captured))
                .then_some(end);
        }
        let mut at = pos;
        for expected in captured.chars() {
            let c = self.next_char(at)?;
            if c != expected && !CharSet::from_char(expected).case_folded().test(c) {
                return None;
            }
            at += c.len_utf8();
        }
        Some(at)
    }

    /// Runs a sub-pattern to its first success. The registers are left as the
    /// successful run set them.
    fn run_sub(&mut self, id: SubId, pos: usize, must_end: Option<usize>) -> Option<usize> {
        let sub = self.nfa.sub(id);
        if let Some(dfa) = sub.dfa {
            let end = self.nfa.dfa(dfa).run_bounded(self.subject, pos, self.limit)?;
            return match must_end {
                Some(required) if required != end => None,
                _ => Some(end),
            };
        }
        let outer = std::mem::replace(&mut self.must_end, must_end);
        let result = self.walk(sub.start, pos);
        self.must_end = outer;
        result
    }

    /// Tries every start from `pos` back to the beginning of the subject for a
    /// match of the body ending exactly at `pos`.
    fn look_behind(&mut self, id: SubId, pos: usize) -> bool {
        let limit = std::mem::replace(&mut self.limit, pos);
        let starts: Vec<usize> = self.subject[..pos]
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(pos))
            .collect();
        let captures = self.nfa.sub(id).captures;
        let mut found = false;
        for &start in starts.iter().rev() {
            let saved = self.snapshot(captures);
            if self.run_sub(id, start, Some(pos)).is_some() {
                found = true;
                break;
            }
            self.restore(saved);
        }
        self.limit = limit;
        found
    }
}
