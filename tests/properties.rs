use hybrid_regex::{Dfa, Error, Matcher, Options, ParseError, Part, Repetition};

fn matcher(pattern: &str) -> Matcher {
    Matcher::new(pattern, Options::default()).unwrap()
}

fn whole(pattern: &str, subject: &str) -> Option<String> {
    matcher(pattern).find(subject).map(|c| c.as_str().to_string())
}

#[test]
fn dfa_and_backtracking_agree_on_regular_patterns() {
    let patterns = [
        "[a-z]+@[a-z]+",
        "cat|dog",
        r"\bfoo\b",
        "(?:ab)*c?",
        "^x{2,3}$",
        r"\d+(?:\.\d+)?",
    ];
    let subjects = ["", "a@b", "me@host.org", "cat", "dogma", "foo bar", "foobar", "ababc", "xx", "xxxx", "3.14", "10."];
    for pattern in patterns {
        let dfa = Dfa::from_pattern(pattern, Options::default()).unwrap();
        let nfa = Matcher::backtracking(pattern, Options::default()).unwrap();
        for subject in subjects {
            for start in 0..=subject.len() {
                assert_eq!(
                    dfa.run(subject, start),
                    nfa.match_at(subject, start).map(|c| c.end()),
                    "{:?} on {:?} at {}",
                    pattern,
                    subject,
                    start
                );
            }
        }
    }
}

fn all_spans(m: &Matcher, subject: &str) -> Option<Vec<Option<(usize, usize)>>> {
    m.find(subject)
        .map(|caps| (0..caps.len()).map(|i| caps.span(i)).collect())
}

#[test]
fn boundary_after_capture_matches_like_backtracking() {
    let cases = [
        (r"([ab]+)\B", "aa"),
        (r"(a*)\b", "aab"),
        (r"a(a*)\B", "aaa b"),
    ];
    for (pattern, subject) in cases {
        let hybrid = Matcher::new(pattern, Options::default()).unwrap();
        let plain = Matcher::backtracking(pattern, Options::default()).unwrap();
        assert_eq!(
            all_spans(&hybrid, subject),
            all_spans(&plain, subject),
            "{:?} on {:?}",
            pattern,
            subject
        );
    }
    let caps = matcher(r"([ab]+)\B").find("aa").unwrap();
    assert_eq!(caps.span(0), Some((0, 1)));
    assert_eq!(caps.get(1), Some("a"));
    assert_eq!(matcher(r"(a*)\b").find("aab").unwrap().span(1), Some((0, 0)));
    assert_eq!(matcher(r"a(a*)\B").find("aaa b").unwrap().span(1), Some((1, 2)));
}

#[test]
fn long_subjects_do_not_overflow() {
    let subject = format!("{}x", "a".repeat(20_000));
    let caps = matcher("(.*)x").find(&subject).unwrap();
    assert_eq!(caps.get(1).map(str::len), Some(20_000));
    assert!(matcher(r"(\w)+?x").is_match(&subject));
}

#[test]
fn captures_are_identical_across_runs() {
    let m = matcher(r"(\w+)-(\d+)?(x)?");
    let first = m.find("item-42").unwrap();
    let second = m.find("item-42").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.get(1), Some("item"));
    assert_eq!(first.get(2), Some("42"));
    assert_eq!(first.get(3), None);
}

#[test]
fn failed_alternatives_leave_no_captures() {
    let caps = matcher("(a)(b)|(c)").find("c").unwrap();
    assert_eq!(caps.get(1), None);
    assert_eq!(caps.get(2), None);
    assert_eq!(caps.get(3), Some("c"));
}

#[test]
fn greedy_and_lazy_repetition() {
    assert_eq!(whole("a+", "aaa").as_deref(), Some("aaa"));
    assert_eq!(whole("a+?", "aaa").as_deref(), Some("a"));
    assert_eq!(whole("<.+?>", "<a><b>").as_deref(), Some("<a>"));
    assert_eq!(whole("<.+>", "<a><b>").as_deref(), Some("<a><b>"));
}

#[test]
fn possessive_repetition_never_gives_back() {
    assert_eq!(whole("a++a", "aaa"), None);
    assert_eq!(whole("a+a", "aaa").as_deref(), Some("aaa"));
    assert_eq!(whole("a*+b", "aab").as_deref(), Some("aab"));
}

#[test]
fn lookaround_consumes_nothing() {
    assert_eq!(whole("foo(?=bar)", "foobar").as_deref(), Some("foo"));
    assert_eq!(whole("foo(?!bar)", "foobar"), None);
    assert_eq!(whole("foo(?!bar)", "foobaz").as_deref(), Some("foo"));
    assert_eq!(whole("(?<=\\$)\\d+", "cost: $42").as_deref(), Some("42"));
    assert_eq!(whole("(?<!\\$)\\b\\d+", "$42 17").as_deref(), Some("17"));
}

#[test]
fn positive_lookahead_captures_stay_visible() {
    let caps = matcher(r"(?=(\w+))\w").find("abc").unwrap();
    assert_eq!(caps.as_str(), "a");
    assert_eq!(caps.get(1), Some("abc"));

    let caps = matcher(r"(?!(\d))\w").find("abc").unwrap();
    assert_eq!(caps.get(1), None);
}

#[test]
fn backreferences_compare_captured_text() {
    assert_eq!(whole(r"(\w+)\s+\1", "hello hello").as_deref(), Some("hello hello"));
    assert_eq!(whole(r"(\w+)\s+\1", "hello world"), None);
    assert_eq!(
        whole(r"(?<q>['\x22]).*?\k<q>", r#"say "hi" now"#).as_deref(),
        Some("\"hi\"")
    );
    let ci = Matcher::new(r"(\w+) \1", Options::new().case_insensitive(true)).unwrap();
    assert!(ci.is_match("Hey hEY"));
}

#[test]
fn word_boundaries() {
    let caps = matcher(r"\btest\b").find(" test ").unwrap();
    assert_eq!(caps.span(0), Some((1, 5)));
    assert!(!matcher(r"\btest\b").is_match("testing"));
    assert!(matcher(r"\Btest").is_match("attest"));
}

#[test]
fn supplementary_plane_characters_are_one_step() {
    let caps = matcher("[😀-😂]").find("😀").unwrap();
    assert_eq!(caps.span(0), Some((0, 4)));
    assert_eq!(whole("^.$", "😀").as_deref(), Some("😀"));
    assert_eq!(whole("a.{2}b", "a😀😂b").as_deref(), Some("a😀😂b"));
}

#[test]
fn flags_and_scoped_overrides() {
    let ci = Options::new().case_insensitive(true);
    assert!(Matcher::new("hello", ci).unwrap().is_match("HeLLo"));
    assert!(Matcher::new("[a-c]+", ci).unwrap().is_match("ABC"));
    assert!(matcher("(?i:hello) world").is_match("HELLO world"));
    assert!(!matcher("(?i:hello) world").is_match("HELLO WORLD"));

    assert!(!matcher("a.b").is_match("a\nb"));
    assert!(Matcher::new("a.b", Options::new().dot_all(true)).unwrap().is_match("a\nb"));
    assert!(matcher("(?s:a.b)").is_match("a\nb"));

    assert!(!matcher("^b").is_match("a\nb"));
    assert!(Matcher::new("^b$", Options::new().multiline(true)).unwrap().is_match("a\nb\nc"));
}

#[test]
fn atomic_groups_commit() {
    assert!(!matcher("(?>a|ab)c").is_match("abc"));
    assert!(matcher("(?:a|ab)c").is_match("abc"));
}

#[test]
fn unicode_properties() {
    assert_eq!(whole(r"\p{Greek}+", "abc αβγ").as_deref(), Some("αβγ"));
    assert_eq!(whole(r"\P{L}+", "ab12cd").as_deref(), Some("12"));
}

#[test]
fn building_from_a_tree() {
    let part = Part::concat(vec![
        Part::capture(Part::one_or_more(Part::class(hybrid_regex::charset::digit().clone()), Repetition::Greedy)),
        Part::text("px"),
    ]);
    let m = Matcher::from_ast(&part, Options::default()).unwrap();
    assert_eq!(m.find("width: 120px").unwrap().get(1), Some("120"));
}

#[test]
fn errors() {
    assert!(matches!(
        Matcher::new("(a", Options::default()),
        Err(Error::Parse(ParseError::UnclosedGroup(0)))
    ));
    let bad = Part::repeat(Part::text("a"), 2, Some(1), Repetition::Greedy);
    assert!(matches!(
        Matcher::from_ast(&bad, Options::default()),
        Err(Error::InvalidRepetition { min: 2, max: 1 })
    ));
    assert!(matches!(
        Dfa::from_pattern(r"(a)\1", Options::default()),
        Err(Error::NotRegular)
    ));
    assert!(hybrid_regex::is_match("abc", "b").unwrap());
    assert!(hybrid_regex::is_match("abc", "[").is_err());
}
