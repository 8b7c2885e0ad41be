//! Decides whether an NFA fragment can run on a DFA.
//!
//! A DFA reports the longest match; the backtracking runner reports the first
//! one its priority order finds. The two agree when every choice inside the
//! fragment is settled by the next character, looking through the fragment's
//! exit into whatever follows it. Anything the analysis cannot see through
//! counts as "could be any character, could end here".

use log::trace;

use crate::charset::CharSet;
use crate::nfa::{Guard, Inst, Nfa, StateId};

/// True when the fragment from `start` to `goal` may be executed by the DFA
/// runner with the same result as the backtracking runner.
pub fn can_dfa(nfa: &Nfa, start: StateId, goal: StateId) -> bool {
    let mut seen = vec![false; nfa.len()];
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        if std::mem::replace(&mut seen[id], true) || id == goal {
            continue;
        }
        let state = nfa.state(id);
        if state.lazy {
            trace!("state {} is lazy", id);
            return false;
        }
        match state.inst {
            Inst::None | Inst::Text { .. } => {}
            _ => {
                trace!("state {} needs the backtracking runner", id);
                return false;
            }
        }
        let options = alternatives(nfa, id, goal);
        if options.len() > 1 && !settled_by_next_char(&options) {
            trace!("choice at state {} is not settled by the next character", id);
            return false;
        }
        if let Some(transition) = &state.transition {
            stack.push(transition.target);
        }
        stack.extend(state.epsilons.iter().copied());
    }
    true
}

/// What can come next after picking one way out of a state.
struct First {
    chars: CharSet,
    can_end: bool,
}

impl First {
    /// Anything the analysis cannot see through.
    fn opaque() -> First {
        First {
            chars: CharSet::any(),
            can_end: true,
        }
    }
}

/// The ways out of a state, in the order a greedy state tries them.
fn alternatives(nfa: &Nfa, id: StateId, goal: StateId) -> Vec<First> {
    let state = nfa.state(id);
    let mut options = Vec::new();
    if let Some(transition) = &state.transition {
        options.push(match &transition.guard {
            Guard::Class(set) => First {
                chars: set.clone(),
                can_end: false,
            },
            Guard::Look(_) => first(nfa, transition.target, goal),
        });
    }
    if state.accepting {
        options.push(First {
            chars: CharSet::empty(),
            can_end: true,
        });
    }
    options.extend(state.epsilons.iter().map(|&e| first(nfa, e, goal)));
    options
}

fn settled_by_next_char(options: &[First]) -> bool {
    let mut taken = CharSet::empty();
    for (i, option) in options.iter().enumerate() {
        if option.can_end && i + 1 != options.len() {
            return false;
        }
        if option.chars.overlaps(&taken) {
            return false;
        }
        taken = taken.union(&option.chars);
    }
    true
}

/// Characters that can be consumed first from `from`, and whether the whole
/// pattern can end without consuming any.
///
/// Past `goal` the fragment's DFA has already committed to its end, so an
/// assertion there cannot steer it and counts as opaque.
fn first(nfa: &Nfa, from: StateId, goal: StateId) -> First {
    let mut result = First {
        chars: CharSet::empty(),
        can_end: false,
    };
    // Indexed by state and by whether the walk has left the fragment.
    let mut seen = [vec![false; nfa.len()], vec![false; nfa.len()]];
    let mut stack = vec![(from, false)];
    while let Some((id, outside)) = stack.pop() {
        let outside = outside || id == goal;
        if std::mem::replace(&mut seen[usize::from(outside)][id], true) {
            continue;
        }
        let state = nfa.state(id);
        match state.inst {
            Inst::None | Inst::Text { .. } => {}
            Inst::Capture { body, .. } => {
                stack.push((body, outside));
                continue;
            }
            Inst::CaptureClose { next, .. } => {
                stack.push((next, outside));
                continue;
            }
            _ => return First::opaque(),
        }
        if state.accepting {
            result.can_end = true;
        }
        if let Some(transition) = &state.transition {
            match &transition.guard {
                Guard::Class(set) => result.chars = result.chars.union(set),
                Guard::Look(_) if outside => return First::opaque(),
                Guard::Look(_) => stack.push((transition.target, outside)),
            }
        }
        stack.extend(state.epsilons.iter().map(|&e| (e, outside)));
    }
    result
}
