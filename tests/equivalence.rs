use hybrid_regex::{Dfa, Matcher, Options};
use proptest::prelude::*;

fn pattern() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        "[abc]",
        Just("[ab]".to_string()),
        Just(".".to_string()),
        Just(r"\w".to_string()),
        Just(r"\b".to_string()),
        Just(r"\B".to_string()),
        Just("^".to_string()),
        Just("$".to_string()),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(|parts| parts.concat()),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("(?:{}|{})", a, b)),
            (inner.clone(), prop_oneof![Just("*"), Just("+"), Just("?"), Just("{1,2}")])
                .prop_map(|(a, q)| format!("(?:{}){}", a, q)),
            (
                inner,
                prop_oneof![Just("({})"), Just("(?>{})"), Just("(?={})"), Just("(?:{})++")]
            )
                .prop_map(|(a, wrapper)| wrapper.replace("{}", &a)),
        ]
    })
}

fn spans(m: &Matcher, subject: &str) -> Option<Vec<Option<(usize, usize)>>> {
    m.find(subject)
        .map(|caps| (0..caps.len()).map(|i| caps.span(i)).collect())
}

proptest! {
    #[test]
    fn dfa_agrees_with_backtracking(pattern in pattern(), subject in "[abc ]{0,8}") {
        // Patterns the analyzer rejects have nothing to compare.
        let Ok(dfa) = Dfa::from_pattern(&pattern, Options::default()) else {
            return Ok(());
        };
        let nfa = Matcher::backtracking(&pattern, Options::default()).unwrap();
        for start in 0..=subject.len() {
            prop_assert_eq!(
                dfa.run(&subject, start),
                nfa.match_at(&subject, start).map(|c| c.end()),
                "{:?} on {:?} at {}", pattern, subject, start
            );
        }
    }

    #[test]
    fn promotion_does_not_change_matches(pattern in pattern(), subject in "[abc ]{0,8}") {
        let hybrid = Matcher::new(&pattern, Options::default()).unwrap();
        let plain = Matcher::backtracking(&pattern, Options::default()).unwrap();
        prop_assert_eq!(spans(&hybrid, &subject), spans(&plain, &subject), "{:?} on {:?}", pattern, subject);
    }
}
