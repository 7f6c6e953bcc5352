//! End-to-end tests against the public API: serialization round-trips,
//! tamper rejection, budgets, and compile statistics.
use std::sync::Arc;

use red::{Budget, CompileStats, CompilerBuilder, Flags, Format, Program, Style};

#[test]
fn serialized_bytes_round_trip_through_from_shared() {
    let program = CompilerBuilder::new()
        .add("[a-z]+", 1, Flags::empty())
        .add("[0-9]+", 2, Flags::empty())
        .compile()
        .unwrap();

    let bytes: Arc<[u8]> = Arc::from(program.as_bytes());
    let reloaded = Program::from_shared(bytes).unwrap();

    assert_eq!(reloaded.check(b"hello"), 1);
    assert_eq!(reloaded.check(b"123"), 2);
    assert_eq!(reloaded.state_count(), program.state_count());
}

#[test]
fn tampered_checksum_is_rejected() {
    let program = CompilerBuilder::new()
        .add("abc", 1, Flags::empty())
        .compile()
        .unwrap();

    let mut bytes = program.as_bytes().to_vec();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;

    let err = Program::from_shared(Arc::from(bytes)).unwrap_err();
    assert!(err.to_string().contains("checksum"));
}

#[test]
fn truncated_image_is_rejected() {
    let program = CompilerBuilder::new()
        .add("abc", 1, Flags::empty())
        .compile()
        .unwrap();

    let bytes = &program.as_bytes()[..10];
    assert!(Program::from_shared(Arc::from(bytes)).is_err());
}

#[test]
fn explicit_formats_all_compile_and_match_the_same() {
    for format in [Format::Width1, Format::Width2, Format::Width4] {
        let program = CompilerBuilder::new()
            .format(format)
            .add("[a-z]+", 1, Flags::empty())
            .compile()
            .unwrap_or_else(|e| panic!("format {:?} failed: {e}", format));
        assert_eq!(program.check(b"hello"), 1);
        assert_eq!(program.check(b"123"), 0);
    }
}

#[test]
fn state_budget_is_enforced() {
    let budget = Budget {
        max_states: Some(2),
        max_paren_depth: None,
    };
    let result = CompilerBuilder::new()
        .budget(budget)
        .add("[a-z]{1,50}[0-9]{1,50}", 1, Flags::empty())
        .compile();
    assert!(result.is_err());
}

#[test]
fn paren_depth_budget_is_enforced() {
    let budget = Budget {
        max_states: None,
        max_paren_depth: Some(2),
    };
    let result = CompilerBuilder::new()
        .budget(budget)
        .add("(((a)))", 1, Flags::empty())
        .compile();
    assert!(result.is_err());
}

#[test]
fn compile_stats_are_filled_in() {
    let mut stats = CompileStats::default();
    let program = CompilerBuilder::new()
        .add("[a-z]+", 1, Flags::empty())
        .add("[0-9]+", 2, Flags::empty())
        .compile_with_stats(&mut stats)
        .unwrap();

    assert_eq!(stats.num_patterns, 2);
    assert!(stats.num_tokens > 0);
    assert!(stats.orig_nfa_states >= stats.useful_nfa_states);
    assert!(stats.useful_nfa_states > 0);
    assert!(stats.minimized_dfa_states > 0);
    assert!(stats.serialized_bytes > 0);
    assert!(stats.num_distinguished_symbols > 0);
    assert_eq!(stats.serialized_bytes, program.as_bytes().len() as u64);
}

#[test]
fn invalid_pattern_surfaces_a_parse_error() {
    let err = CompilerBuilder::new()
        .add("(unclosed", 1, Flags::empty())
        .compile()
        .unwrap_err();
    assert!(err.to_string().len() > 0);
}

#[test]
fn every_match_style_end_to_end() {
    let program = CompilerBuilder::new()
        .add("new", 1, Flags::empty())
        .add("new york", 2, Flags::empty())
        .compile()
        .unwrap();

    assert_eq!(program.match_at(b"new york", Style::Instant).end, 3);
    assert_eq!(program.match_at(b"new york", Style::Last).result, 2);
    assert_eq!(program.match_at(b"new york", Style::Last).end, 8);
}
