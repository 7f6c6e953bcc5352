//! Table-driven match tests, in the same spirit as the crate's own in-tree
//! test tables: one pattern, one input, the expected non-overlapping
//! `search` windows.
use red::{Budget, CompilerBuilder, Flags};

#[derive(Debug)]
struct TestData {
    pattern: &'static str,
    input: &'static str,
    expected: &'static [(&'static str, usize, usize)],
}

macro_rules! td {
    ($pattern:expr, $input:expr, $expected:expr) => {
        TestData {
            pattern: $pattern,
            input: $input,
            expected: $expected,
        }
    };
}

const TEST_DATA: &[TestData] = &[
    td!(r#"a"#, "a", &[("a", 0, 1)]),
    td!(r#"aa"#, "aa", &[("aa", 0, 2)]),
    td!(r#"ab"#, "ab", &[("ab", 0, 2)]),
    td!(r#"b"#, "ab", &[("b", 1, 2)]),
    td!(r#"bc"#, "abc", &[("bc", 1, 3)]),
    td!(r#"."#, "a", &[("a", 0, 1)]),
    td!(r#".."#, "ab", &[("ab", 0, 2)]),
    td!(r#"\w"#, "e", &[("e", 0, 1)]),
    td!(r#"\s"#, " ", &[(" ", 0, 1)]),
    td!(r#"\S"#, "b", &[("b", 0, 1)]),
    td!(r#"\d"#, "4", &[("4", 0, 1)]),
    td!(r#"[ab]"#, "b", &[("b", 0, 1)]),
    td!(r#"[a-z]"#, "t", &[("t", 0, 1)]),
    td!(r#"[^a]"#, "x", &[("x", 0, 1)]),
    td!(r#"a?"#, "a", &[("a", 0, 1)]),
    td!(r#"a*"#, "aaa", &[("aaa", 0, 3)]),
    td!(r#"a+"#, "aaaa", &[("aaaa", 0, 4)]),
    td!(r#"a|b"#, "a", &[("a", 0, 1)]),
    td!(r#"a|b"#, "b", &[("b", 0, 1)]),
    td!(r#"ab|bc"#, "bc", &[("bc", 0, 2)]),
    td!(r#"(ab)+"#, "ababab", &[("ababab", 0, 6)]),
    td!(r#"h{0,}"#, "hhhh", &[("hhhh", 0, 4)]),
    td!(r#"(ab){2,4}"#, "ababab", &[("ababab", 0, 6)]),
    td!(r#"[0-9]+"#, "a123b45", &[("123", 1, 4), ("45", 5, 7)]),
];

#[test]
fn table_driven_matches() {
    for case in TEST_DATA {
        let program = CompilerBuilder::new()
            .budget(Budget::unlimited())
            .add(case.pattern, 1, Flags::empty())
            .compile()
            .unwrap_or_else(|e| panic!("failed to compile {:?}: {e}", case.pattern));

        let mut got = Vec::new();
        let mut pos = 0usize;
        let bytes = case.input.as_bytes();
        while pos < bytes.len() {
            let outcome = program.search(&bytes[pos..], red::Style::Last, false);
            if outcome.is_match() && outcome.end > outcome.start {
                let abs_start = pos + outcome.start;
                let abs_end = pos + outcome.end;
                got.push((&case.input[abs_start..abs_end], abs_start, abs_end));
                pos = abs_end.max(pos + 1);
            } else {
                break;
            }
        }
        assert_eq!(got, case.expected, "pattern {:?} over {:?}", case.pattern, case.input);
    }
}

#[test]
fn multiple_patterns_share_one_program() {
    let program = CompilerBuilder::new()
        .add("[a-z]+", 1, Flags::empty())
        .add("[0-9]+", 2, Flags::empty())
        .compile()
        .unwrap();
    assert_eq!(program.check(b"hello"), 1);
    assert_eq!(program.check(b"123"), 2);
    assert_eq!(program.check(b""), 0);
}

#[test]
fn flags_escape_folds_case_wherever_it_appears() {
    let program = CompilerBuilder::new()
        .add(r"(meyer\i)+", 2, Flags::empty())
        .compile()
        .unwrap();
    assert_eq!(program.check(b"meyer"), 2);
    assert_eq!(program.check(b"MEYER"), 2);
    assert_eq!(program.check(b"MeyerMEYER"), 2);
}

#[test]
fn ignore_case_flag_folds_ascii_letters() {
    let program = CompilerBuilder::new()
        .add("cat", 1, Flags::IGNORE_CASE)
        .compile()
        .unwrap();
    assert_eq!(program.check(b"cat"), 1);
    assert_eq!(program.check(b"CAT"), 1);
    assert_eq!(program.check(b"CaT"), 1);
}

#[test]
fn loose_start_and_loose_end_allow_surrounding_bytes() {
    let program = CompilerBuilder::new()
        .add("cat", 1, Flags::LOOSE_START | Flags::LOOSE_END)
        .compile()
        .unwrap();
    assert_eq!(program.match_at(b"a cat sat", red::Style::Last).result, 1);
}

#[test]
fn glob_pattern_matches_wildcards() {
    let program = CompilerBuilder::new()
        .add_glob("*.txt", 1, Flags::empty())
        .compile()
        .unwrap();
    assert_eq!(program.check(b"report.txt"), 1);
    assert_eq!(program.check(b"report.csv"), 0);
}

#[test]
fn exact_pattern_matches_only_the_literal_text() {
    let program = CompilerBuilder::new()
        .add_exact("exact.match", 1, Flags::empty())
        .compile()
        .unwrap();
    assert_eq!(program.check(b"exact.match"), 1);
    assert_eq!(program.check(b"exactXmatch"), 0);
}

#[test]
fn add_auto_infers_anchors_from_caret_and_dollar() {
    let program = CompilerBuilder::new()
        .add_auto("^cat", 1)
        .compile()
        .unwrap();
    assert_eq!(program.check(b"cat"), 1);
    assert_eq!(program.check(b"dog"), 0);
}
