//! End-to-end behaviour of compiled patterns over transcripts.

use std::ops::Range;
use std::sync::Arc;

use phonex::{
    Compiler, ErrorKind, PatternError, PredicateRegistry, Program, Token, TokenPredicate, Transcript,
    compile,
};

fn transcript(text: &str) -> Transcript {
    text.parse().unwrap()
}

/// Group spans of every match, groups 1.. only.
fn groups(pattern: &str, text: &str) -> Vec<Vec<Option<Range<usize>>>> {
    let program = compile(pattern).unwrap();
    let t = transcript(text);
    program
        .find_iter(&t)
        .map(|m| m.groups().map(|(_, span)| span).collect())
        .collect()
}

fn spans(pattern: &str, text: &str) -> Vec<Range<usize>> {
    let program = compile(pattern).unwrap();
    let t = transcript(text);
    program.find_iter(&t).map(|m| m.span()).collect()
}

// ============================================================================
// Compilation
// ============================================================================

#[test]
fn rejects_duplicate_group_names() {
    assert!(compile(r"(C=\c)(C=\c)\v").is_err());
    assert!(compile(r"((C1=\c)(C2=\c)|(C2=\c))\v").is_err());
}

#[test]
fn rejects_unbalanced_parentheses() {
    for pattern in [r"((C1=\c)(C2=\c)))\v", r"((C1=\c)(C2=\c)\v", r"((C1=\c(C2=\c))\v"] {
        let err = compile(pattern).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax, "{pattern}");
    }
}

#[test]
fn rejects_invalid_backreferences() {
    assert!(matches!(
        compile(r"(\c)\2"),
        Err(PatternError::InvalidBackReference { .. })
    ));
    assert!(matches!(
        compile(r"(\c)\-2"),
        Err(PatternError::InvalidBackReference { .. })
    ));
}

#[test]
fn unknown_plugins_and_features() {
    assert_eq!(
        compile(r"\v:noplugin()").unwrap_err().kind(),
        ErrorKind::NoSuchPredicate
    );
    assert_eq!(compile("{invalid}").unwrap_err().kind(), ErrorKind::Syntax);
}

#[test]
fn named_groups_share_an_index_across_branches() {
    let program = compile(r"((C1=\c)(C2=\c)|(C1=\c))\v").unwrap();
    assert_eq!(program.group_count(), 3);
    assert_eq!(program.group_index("C1"), Some(2));
    assert_eq!(program.group_index("C2"), Some(3));
}

// ============================================================================
// Grouping
// ============================================================================

#[test]
fn grouping_after_syllable_boundaries() {
    assert_eq!(
        groups(r"\S(\c)(\v)", "zuˈkini"),
        vec![
            vec![Some(0..1), Some(1..2)],
            vec![Some(3..4), Some(4..5)],
            vec![Some(5..6), Some(6..7)],
        ]
    );
    assert_eq!(
        groups(r"(\S(\c)(\v))", "zuˈkini"),
        vec![
            vec![Some(0..2), Some(0..1), Some(1..2)],
            vec![Some(2..5), Some(3..4), Some(4..5)],
            vec![Some(5..7), Some(5..6), Some(6..7)],
        ]
    );
}

#[test]
fn named_grouping() {
    let program = compile(r"(syll=\S((C=\c)(V=\v)))").unwrap();
    let t = transcript("zuˈkini");
    let found: Vec<_> = program.find_iter(&t).collect();
    assert_eq!(found.len(), 3);
    assert_eq!(found[1].named("syll"), Some(2..5));
    assert_eq!(found[1].group(2), Some(3..5));
    assert_eq!(found[1].named("C"), Some(3..4));
    assert_eq!(found[1].named("V"), Some(4..5));
}

#[test]
fn group_indices_follow_opening_delimiters() {
    let program = compile(r"((C1=\c)(C2=\c))(V=\v)").unwrap();
    let t = transcript("ˈkʀət͡jə");
    let mut matcher = program.matcher(&t);
    assert!(matcher.find().is_some());
    assert_eq!(matcher.group(1), Some(1..3));
    assert_eq!(matcher.named_group("C1"), Some(1..2));
    assert_eq!(matcher.named_group("C2"), Some(2..3));
    assert_eq!(matcher.named_group("V"), Some(3..4));
}

#[test]
fn alternation_groups() {
    assert_eq!(
        groups(r"((C1=\c)(C2=\c)|(C1=\c))\v", "ˈkʀət͡jə"),
        vec![
            vec![Some(1..3), Some(1..2), Some(2..3)],
            vec![Some(4..5), Some(4..5), None],
        ]
    );
}

#[test]
fn alternation_groups_with_constituents() {
    let pattern = r#"((C1=\c:sctype("O|LA"))(C2=\c:sctype("O|LA"))(C3=\c:O)|(C1=\c:sctype("O|LA"))(C2=\c:O)|(C1=\c:O)).:N"#;
    assert_eq!(
        groups(pattern, "ˈk:On:Oɛ:Di:Dp:Oə:Nɹ:C"),
        vec![
            vec![Some(1..3), Some(1..2), Some(2..3), None],
            vec![Some(5..6), Some(5..6), None, None],
        ]
    );

    let pattern = r"((C1=\c:L:O)(C2=\c:L:O)(C3=\c:L:O)|(C1=\c:L:O)(C2=\c:L:O)|(C1=\c:L:O))";
    assert_eq!(
        groups(pattern, "k:Oə:Nn:Cˈs:Lt:Oɹ:Oe:Dɪ:Dn:Ct:Cs:R"),
        vec![
            vec![Some(0..1), Some(0..1), None, None],
            vec![Some(4..7), Some(4..5), Some(5..6), Some(6..7)],
        ]
    );
}

#[test]
fn non_capturing_groups() {
    assert_eq!(
        groups(r"(\S\c+\v)(?=\S\c+\v)", "ˈkʀət͡jə"),
        vec![vec![Some(0..4)]]
    );
    assert_eq!(
        groups(r"((?=\S\c+\v)(\c+\v))", "ˈkʀət͡jə"),
        vec![vec![Some(0..6), Some(4..6)]]
    );
    assert_eq!(spans(r"(?=(\S\c+\v)(\S\c+\v))", "ˈkʀət͡jə"), vec![0..6]);
}

// ============================================================================
// Backreferences
// ============================================================================

#[test]
fn absolute_and_relative_backreferences() {
    let expected = vec![vec![Some(2..4), Some(2..3)]];
    assert_eq!(groups(r"((\c)\2)", "hello"), expected);
    assert_eq!(groups(r"((\c)\-1)", "hello"), expected);
}

#[test]
fn backreference_to_unset_group_fails_the_branch() {
    assert!(spans(r"((\c)|\v)\2", "ab").is_empty());
    assert_eq!(spans(r"((\c)|\v)\2", "abb"), vec![1..3]);
}

#[test]
fn backreference_with_secondary_matchers() {
    assert_eq!(spans(r"(\c)\1:O", "a:Nb:Cb:Oa:N"), vec![1..3]);
    assert!(spans(r"(\c)\1:C", "a:Nb:Cb:Oa:N").is_empty());
    assert_eq!(spans(r#"(\c)\1:sctype("-C")"#, "a:Nb:Cb:Oa:N"), vec![1..3]);
}

#[test]
fn shortcut_followed_by_a_group() {
    assert_eq!(groups(r"\c:O(\v)", "b:Oa:Nn:Cd:Oa:N"), vec![vec![Some(1..2)], vec![Some(4..5)]]);
}

#[test]
fn nested_repetition_is_bounded() {
    let err = compile(r"((\c{1000}){1000}){1000}").unwrap_err();
    assert!(matches!(err, PatternError::ProgramTooLarge { .. }));
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

// ============================================================================
// Lookaround
// ============================================================================

#[test]
fn look_ahead_and_behind() {
    let program = compile(r"(?<\w)\c(?>\w)").unwrap();
    let t = transcript("ˈkʀət͡jə");
    assert_eq!(program.index_of(&t), Some(2));

    assert_eq!(groups(r"(?<\s\c\v)(\c\v)", "zuˈkini"), vec![vec![Some(5..7)]]);
    assert_eq!(groups(r"(?<(\s?\c\v)+)(\c\v)", "zuˈkini"), vec![vec![Some(5..7)]]);
}

#[test]
fn look_behind_with_boundary() {
    assert_eq!(
        spans(r#"(?<\S\c:L*)\c:O(?>\w:sctype("-O"))"#, "ˈk:oʀ:oi:di:dt͡j:oi:n"),
        vec![5..6]
    );
}

#[test]
fn reluctant_quantifier_inside_lookarounds() {
    assert_eq!(
        groups(r"(?<\p)(.+?)(?>\S)", "ˈh:Oæ:N^p:Oiː:Nb:Oʌ:Nɹ:Cθ:Cˌd:Oe͜ɪ:N"),
        vec![vec![Some(4..6)]]
    );
}

// ============================================================================
// Search and full matches
// ============================================================================

#[test]
fn find_makes_progress_on_empty_repetitions() {
    assert_eq!(spans(r"(\c*\v+\c*)*", "bbaab aba"), vec![0..5, 6..9]);
}

#[test]
fn empty_query() {
    let program = compile("^$").unwrap();
    assert!(program.is_match(&Transcript::default()));
    assert!(!program.is_match(&transcript("ba")));
}

#[test]
fn alignment_marker() {
    let program = compile(r"(\w+)\b↔\b(\w+)").unwrap();
    let t = transcript("ba ↔ ab");
    let mut matcher = program.matcher(&t);
    assert!(matcher.matches());
    assert_eq!(matcher.group(1), Some(0..2));
    assert_eq!(matcher.group(2), Some(5..7));
}

#[test]
fn compound_and_text_matchers() {
    assert_eq!(spans("._.", "st\u{361}\u{283}aad\u{35c}\u{292}").len(), 2);
    assert!(compile("'t.+'").unwrap().contains(&transcript("st\u{361}\u{283}aad\u{35c}\u{292}")));
}

#[test]
fn syllable_matchers() {
    assert_eq!(spans(r"(σ/O..N/+)", "b:oa:Nn:Cd:Oa:Nk:Oa:N"), vec![0..2, 3..7]);
    assert_eq!(spans(r"(σ/N/)", "b:oa:Nn:Cd:Oa:Nk:Oa:N"), vec![1..2, 4..5, 6..7]);
    assert_eq!(spans(r"(σ+(?=' 'σ+)*)", "b:oa:N d:Oa:Nk:Oa:N"), vec![0..7]);
}

#[test]
fn tone_predicate() {
    let t = transcript("b:Oa²:Nd:Oa¹:Nk:Oa:N");
    assert_eq!(compile(r#"\v:tone("2")"#).unwrap().index_of(&t), Some(1));
    assert_eq!(compile(r#"\c:tone("-2")"#).unwrap().index_of(&t), Some(2));
    assert_eq!(spans(r#"\w:tone("1|2")+"#, "b:Oa²:Nd:Oa¹:Nk:Oa:N"), vec![0..4]);
}

#[test]
fn split_between_matches() {
    let program = compile(r"\b").unwrap();
    let t = transcript("ba da ka");
    assert_eq!(program.split(&t), vec![0..2, 3..5, 6..8]);
}

// ============================================================================
// Registry injection and sharing
// ============================================================================

#[derive(Debug)]
struct Long;

impl TokenPredicate for Long {
    fn matches(&self, token: &Token) -> bool {
        token.text().ends_with('ː')
    }
}

impl std::fmt::Display for Long {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("long()")
    }
}

#[test]
fn compiler_uses_injected_predicates() {
    let mut registry = PredicateRegistry::default();
    registry.register("long", |_| Ok(Arc::new(Long) as Arc<dyn TokenPredicate>));
    let compiler = Compiler::new(registry);

    let program = compiler.compile(r"\v:long()").unwrap();
    assert_eq!(program.index_of(&transcript("piːpa")), Some(1));
    assert_eq!(program.index_of(&transcript("pipa")), None);
    assert!(compile(r"\v:long()").is_err());
}

#[test]
fn programs_are_shared_across_threads() {
    let program: Program = compile(r"(C=\c)\v").unwrap();
    let inputs = ["bada", "kiki", "aaa"];
    let counts: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|text| {
                let program = &program;
                scope.spawn(move || program.find_iter(&transcript(text)).count())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(counts, vec![2, 2, 0]);
}
