//! Property-based tests for pattern serialisation.
//!
//! A compiled program renders back to pattern text. Compiling that text
//! again must give a program that renders identically and finds the same
//! matches as the first one.

use phonex::{Transcript, compile};
use proptest::prelude::*;

// ============================================================================
// Pattern Generators
// ============================================================================

fn atom_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(r"\c"),
        Just(r"\v"),
        Just(r"\w"),
        Just("."),
        Just("a"),
        Just("b"),
        Just("σ"),
        Just("σ/O..N/"),
        Just("{c,-voiced}"),
        Just("'t.+'"),
        Just("._."),
        Just(r#"\c:sctype("O|LA")"#),
        Just(r#"\w:sctype("-O")"#),
        Just(r"\S"),
        Just(r"\b"),
    ]
    .prop_map(String::from)
}

fn quantifier_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => Just(""),
        1 => Just("*"),
        1 => Just("+"),
        1 => Just("?"),
        1 => Just("*?"),
        1 => Just("+?"),
        1 => Just("++"),
        1 => Just("{2}"),
        1 => Just("{1,3}"),
        1 => Just("<0,2>"),
    ]
    .prop_map(String::from)
}

fn pattern_strategy() -> impl Strategy<Value = String> {
    let leaf = (atom_strategy(), quantifier_strategy()).prop_map(|(a, q)| format!("{a}{q}"));
    leaf.prop_recursive(2, 12, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(|items| items.concat()),
            prop::collection::vec(inner.clone(), 2..4)
                .prop_map(|branches| format!("({})", branches.join("|"))),
            (inner.clone(), quantifier_strategy()).prop_map(|(p, q)| format!("({p}){q}")),
            (inner.clone(), quantifier_strategy()).prop_map(|(p, q)| format!("(N={p}){q}")),
            inner.clone().prop_map(|p| format!("(?={p})")),
            inner.clone().prop_map(|p| format!("(?>{p})")),
            inner.prop_map(|p| format!("(?<{p})")),
        ]
    })
}

// ============================================================================
// Helper Functions
// ============================================================================

fn transcripts() -> Vec<Transcript> {
    ["ˈkʀət͡jə", "ba da", "b:Oa:Nn:C", "st\u{361}\u{283}aad\u{35c}\u{292}"]
        .iter()
        .map(|text| text.parse().unwrap())
        .collect()
}

type Found = Vec<Vec<Option<std::ops::Range<usize>>>>;

fn all_groups(program: &phonex::Program, transcript: &Transcript) -> Found {
    program
        .find_iter(transcript)
        .map(|m| (0..=m.group_count()).map(|g| m.group(g)).collect())
        .collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Rendering is a fixed point after one compile.
    #[test]
    fn display_is_stable(pattern in pattern_strategy()) {
        let Ok(first) = compile(&pattern) else {
            // names may repeat across generated groups
            return Ok(());
        };
        let rendered = first.to_string();
        let second = compile(&rendered).unwrap();
        prop_assert_eq!(second.to_string(), rendered);
        prop_assert_eq!(second.group_count(), first.group_count());
    }

    /// The rendered pattern finds the same matches and captures.
    #[test]
    fn rendered_pattern_matches_alike(pattern in pattern_strategy()) {
        let Ok(first) = compile(&pattern) else {
            return Ok(());
        };
        let second = compile(&first.to_string()).unwrap();
        for transcript in transcripts() {
            prop_assert_eq!(all_groups(&first, &transcript), all_groups(&second, &transcript));
        }
    }

    /// Arbitrary pattern-like text either compiles or reports an error.
    #[test]
    fn compile_never_panics(text in r"[\\cvwbaσSO.(){}|*+?<>=:'_, 0-9-]{0,16}") {
        let _ = compile(&text);
    }
}
