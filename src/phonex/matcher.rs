//! Backtracking execution of a [`Program`] over a [`Transcript`].
//!
//! Choice points live on an explicit stack. Each one records the length of
//! the capture undo log, so popping a choice point restores every capture
//! and loop register written after it was pushed.

use std::cmp::max;
use std::collections::BTreeMap;
use std::fmt;
use std::iter::FusedIterator;
use std::ops::Range;
use std::sync::Arc;

use super::ast::{Anchor, ConstituentRange, Direction};
use super::predicate::TokenPredicate;
use super::program::{Inst, Program};
use super::token::{Token, TokenKind, Transcript};

/// Group lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Index(usize),
    Name(String),
}

impl From<usize> for GroupKey {
    fn from(index: usize) -> Self {
        GroupKey::Index(index)
    }
}

impl From<&str> for GroupKey {
    fn from(name: &str) -> Self {
        GroupKey::Name(name.to_string())
    }
}

impl From<String> for GroupKey {
    fn from(name: String) -> Self {
        GroupKey::Name(name)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Index(i) => write!(f, "{i}"),
            GroupKey::Name(name) => f.write_str(name),
        }
    }
}

/// One successful match: the overall span plus the span of every capturing
/// group that took part in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    groups: Vec<Option<Range<usize>>>,
    names: Arc<BTreeMap<String, usize>>,
}

impl Match {
    pub fn start(&self) -> usize {
        self.span().start
    }

    pub fn end(&self) -> usize {
        self.span().end
    }

    pub fn span(&self) -> Range<usize> {
        self.groups[0].clone().unwrap_or(0..0)
    }

    pub fn len(&self) -> usize {
        self.span().len()
    }

    pub fn is_empty(&self) -> bool {
        self.span().is_empty()
    }

    /// Group `0` is the whole match. `None` if the group did not participate.
    pub fn group(&self, index: usize) -> Option<Range<usize>> {
        self.groups.get(index).cloned().flatten()
    }

    pub fn named(&self, name: &str) -> Option<Range<usize>> {
        self.group(*self.names.get(name)?)
    }

    pub fn get(&self, key: impl Into<GroupKey>) -> Option<Range<usize>> {
        match key.into() {
            GroupKey::Index(i) => self.group(i),
            GroupKey::Name(name) => self.named(&name),
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len() - 1
    }

    /// Every capturing group with its span, in index order.
    pub fn groups(&self) -> impl Iterator<Item = (usize, Option<Range<usize>>)> + '_ {
        self.groups.iter().cloned().enumerate().skip(1)
    }

    pub fn named_groups(&self) -> impl Iterator<Item = (&str, Option<Range<usize>>)> + '_ {
        self.names
            .iter()
            .map(|(name, &index)| (name.as_str(), self.group(index)))
    }
}

/// Search state for one (program, transcript) pair.
pub struct Matcher<'p, 't> {
    program: &'p Program,
    transcript: &'t Transcript,
    /// Where the next `find` resumes; `None` once the input is exhausted.
    next: Option<usize>,
    current: Option<Match>,
}

impl<'p, 't> Matcher<'p, 't> {
    pub fn new(program: &'p Program, transcript: &'t Transcript) -> Self {
        Matcher {
            program,
            transcript,
            next: Some(0),
            current: None,
        }
    }

    /// Next non-empty match, resuming after the previous one.
    pub fn find(&mut self) -> Option<Match> {
        let from = self.next?;
        self.search(from)
    }

    /// Reset and search from `start`.
    pub fn find_at(&mut self, start: usize) -> Option<Match> {
        self.reset();
        self.search(start)
    }

    /// Does the pattern match the entire transcript?
    pub fn matches(&mut self) -> bool {
        let goal = Goal {
            end: Some(self.transcript.len()),
            not_empty_from: None,
        };
        let mut vm = Vm::new(self.program, self.transcript);
        self.current = vm.attempt(0, goal);
        self.current.is_some()
    }

    pub fn reset(&mut self) {
        self.next = Some(0);
        self.current = None;
    }

    pub fn current(&self) -> Option<&Match> {
        self.current.as_ref()
    }

    pub fn group(&self, index: usize) -> Option<Range<usize>> {
        self.current.as_ref()?.group(index)
    }

    pub fn named_group(&self, name: &str) -> Option<Range<usize>> {
        self.current.as_ref()?.named(name)
    }

    pub fn start(&self) -> Option<usize> {
        self.current.as_ref().map(Match::start)
    }

    pub fn end(&self) -> Option<usize> {
        self.current.as_ref().map(Match::end)
    }

    pub fn group_count(&self) -> usize {
        self.program.group_count()
    }

    fn search(&mut self, from: usize) -> Option<Match> {
        let mut vm = Vm::new(self.program, self.transcript);
        let found = (from..=self.transcript.len()).find_map(|start| {
            vm.attempt(
                start,
                Goal {
                    end: None,
                    not_empty_from: Some(start),
                },
            )
        });

        match &found {
            Some(m) => {
                log::trace!("{:?} matched tokens {:?}", self.program.source(), m.span());
                self.next = Some(max(m.end(), m.start() + 1));
            }
            None => self.next = None,
        }
        self.current = found.clone();
        found
    }
}

/// Iterator over successive matches; see [`Program::find_iter`].
pub struct Matches<'p, 't> {
    matcher: Matcher<'p, 't>,
}

impl<'p, 't> Matches<'p, 't> {
    pub(crate) fn new(matcher: Matcher<'p, 't>) -> Self {
        Matches { matcher }
    }
}

impl Iterator for Matches<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        self.matcher.find()
    }
}

impl FusedIterator for Matches<'_, '_> {}

#[derive(Debug, Clone, Copy)]
struct Goal {
    /// Required end position.
    end: Option<usize>,
    /// Reject an empty match starting here.
    not_empty_from: Option<usize>,
}

const ANYWHERE: Goal = Goal {
    end: None,
    not_empty_from: None,
};

#[derive(Debug, Clone, Copy)]
struct Choice {
    pc: usize,
    pos: usize,
    undo: usize,
}

struct Vm<'a> {
    program: &'a Program,
    code: &'a [Inst],
    transcript: &'a Transcript,
    slots: Vec<Option<usize>>,
    undo: Vec<(usize, Option<usize>)>,
}

impl<'a> Vm<'a> {
    fn new(program: &'a Program, transcript: &'a Transcript) -> Self {
        Vm {
            program,
            code: program.code(),
            transcript,
            slots: vec![None; program.slot_count()],
            undo: Vec::new(),
        }
    }

    fn attempt(&mut self, start: usize, goal: Goal) -> Option<Match> {
        let end = self.run(0, start, goal)?;
        let mut groups = Vec::with_capacity(self.program.group_count() + 1);
        groups.push(Some(start..end));
        for g in 1..=self.program.group_count() {
            groups.push(match (self.slots[2 * g], self.slots[2 * g + 1]) {
                (Some(s), Some(e)) if s <= e => Some(s..e),
                _ => None,
            });
        }
        // leave the slots clean for the next attempt
        self.rollback(0);
        Some(Match {
            groups,
            names: Arc::clone(self.program.shared_names()),
        })
    }

    fn set(&mut self, slot: usize, value: Option<usize>) {
        self.undo.push((slot, self.slots[slot]));
        self.slots[slot] = value;
    }

    fn rollback(&mut self, len: usize) {
        while self.undo.len() > len {
            if let Some((slot, old)) = self.undo.pop() {
                self.slots[slot] = old;
            }
        }
    }

    /// Run from `pc` at `pos` until a `Match` satisfying `goal`. On success
    /// the writes of the accepted path stay in place; on failure everything
    /// is rolled back.
    fn run(&mut self, mut pc: usize, mut pos: usize, goal: Goal) -> Option<usize> {
        let code = self.code;
        let tokens = self.transcript.tokens();
        let base = self.undo.len();
        let mut stack: Vec<Choice> = Vec::new();

        loop {
            let advanced = match &code[pc] {
                Inst::Token(m) => {
                    if tokens.get(pos).is_some_and(|t| m.matches(t)) {
                        pos += 1;
                        pc += 1;
                        true
                    } else {
                        false
                    }
                }
                Inst::Syllable(range) => match self.syllable_end(pos, *range) {
                    Some(end) => {
                        pos = end;
                        pc += 1;
                        true
                    }
                    None => false,
                },
                Inst::Assert(anchor) => {
                    let holds = match anchor {
                        Anchor::Start => pos == 0,
                        _ => pos == tokens.len(),
                    };
                    pc += 1;
                    holds
                }
                Inst::Boundary(kind) => {
                    let consumes = tokens.get(pos).is_some_and(|t| is_boundary_token(*kind, t));
                    let zero_width = self.at_boundary(*kind, pos);
                    if consumes && zero_width {
                        stack.push(Choice {
                            pc: pc + 1,
                            pos,
                            undo: self.undo.len(),
                        });
                    }
                    if consumes {
                        pos += 1;
                    }
                    pc += 1;
                    consumes || zero_width
                }
                Inst::Split { primary, secondary } => {
                    stack.push(Choice {
                        pc: *secondary,
                        pos,
                        undo: self.undo.len(),
                    });
                    pc = *primary;
                    true
                }
                Inst::Jump(target) => {
                    pc = *target;
                    true
                }
                Inst::Save(slot) | Inst::Mark(slot) => {
                    self.set(*slot, Some(pos));
                    pc += 1;
                    true
                }
                Inst::Check(register) => {
                    pc += 1;
                    self.slots[*register] != Some(pos)
                }
                Inst::BackRef { group, secondary } => {
                    match self.backref_end(*group, secondary, pos) {
                        Some(end) => {
                            pos = end;
                            pc += 1;
                            true
                        }
                        None => false,
                    }
                }
                Inst::Look { direction, next } => {
                    let mark = self.undo.len();
                    let body = pc + 1;
                    let found = match direction {
                        Direction::Ahead => self.run(body, pos, ANYWHERE).is_some(),
                        Direction::Behind => (0..=pos).rev().any(|start| {
                            let goal = Goal {
                                end: Some(pos),
                                not_empty_from: None,
                            };
                            self.run(body, start, goal).is_some()
                        }),
                    };
                    // nothing a lookaround writes survives it
                    self.rollback(mark);
                    pc = *next;
                    found
                }
                Inst::Atomic { next } => match self.run(pc + 1, pos, ANYWHERE) {
                    Some(end) => {
                        pos = end;
                        pc = *next;
                        true
                    }
                    None => false,
                },
                Inst::Match => {
                    if goal.end.is_none_or(|end| end == pos) && goal.not_empty_from != Some(pos) {
                        return Some(pos);
                    }
                    false
                }
            };

            if !advanced {
                let Some(choice) = stack.pop() else {
                    self.rollback(base);
                    return None;
                };
                self.rollback(choice.undo);
                pc = choice.pc;
                pos = choice.pos;
            }
        }
    }

    fn at_boundary(&self, kind: Anchor, pos: usize) -> bool {
        match kind {
            Anchor::SyllableBoundary => self.transcript.is_syllable_boundary(pos),
            _ => pos == 0 || pos == self.transcript.len(),
        }
    }

    /// End of the syllable (or constituent range of it) starting at `pos`.
    fn syllable_end(&self, pos: usize, range: Option<ConstituentRange>) -> Option<usize> {
        let index = self.transcript.syllable_of(pos)?;
        let syllable = self.transcript.syllables().get(index)?.clone();
        let tokens = self.transcript.tokens();
        match range {
            None => (syllable.start == pos).then_some(syllable.end),
            Some(range) => {
                let in_range = |t: &Token| range.contains(t.sctype());
                // the range must begin here, not part way through
                if tokens[syllable.start..pos].iter().any(in_range) {
                    return None;
                }
                let taken = tokens[pos..syllable.end]
                    .iter()
                    .take_while(|t| in_range(*t))
                    .count();
                (taken > 0).then_some(pos + taken)
            }
        }
    }

    fn backref_end(
        &self,
        group: usize,
        secondary: &[Arc<dyn TokenPredicate>],
        pos: usize,
    ) -> Option<usize> {
        let (start, end) = (self.slots[2 * group]?, self.slots[2 * group + 1]?);
        let tokens = self.transcript.tokens();
        let len = end.checked_sub(start)?;
        let candidate = tokens.get(pos..pos + len)?;
        let same = tokens[start..end]
            .iter()
            .zip(candidate)
            .all(|(a, b)| a.text() == b.text() && secondary.iter().all(|p| p.matches(b)));
        same.then_some(pos + len)
    }
}

fn is_boundary_token(kind: Anchor, token: &Token) -> bool {
    match kind {
        Anchor::SyllableBoundary => matches!(
            token.kind(),
            TokenKind::StressMarker(_) | TokenKind::SyllableBoundary | TokenKind::WordBoundary
        ),
        _ => matches!(token.kind(), TokenKind::WordBoundary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phonex::parser::compile;

    // Helper: matched text of the first match.
    fn m(pattern: &str, transcript: &str) -> Option<String> {
        let program = compile(pattern).unwrap();
        let t: Transcript = transcript.parse().unwrap();
        let found = program.matcher(&t).find()?;
        Some(t.text_of(found.span()))
    }

    fn spans(pattern: &str, transcript: &str) -> Vec<Range<usize>> {
        let program = compile(pattern).unwrap();
        let t: Transcript = transcript.parse().unwrap();
        program.find_iter(&t).map(|m| m.span()).collect()
    }

    #[test]
    fn matches_classes() {
        assert_eq!(m("\\c\\v", "ˈstrɪŋ"), Some("rɪ".into()));
        assert_eq!(m("\\v\\v", "ba"), None);
        assert_eq!(m(".", "ˈa"), Some("a".into()));
        assert_eq!(m("\\s", "ˈa"), Some("ˈ".into()));
    }

    #[test]
    fn matches_glyphs_and_features() {
        assert_eq!(m("n", "ana"), Some("n".into()));
        assert_eq!(m("{c,-voiced}", "abpa"), Some("p".into()));
    }

    #[test]
    fn greedy_then_backtracks_when_needed() {
        assert_eq!(m("\\c*\\c\\v", "strɪŋ"), Some("strɪ".into()));
    }

    #[test]
    fn reluctant_prefers_fewer() {
        assert_eq!(m("\\c+?", "str"), Some("s".into()));
        assert_eq!(m("\\c+?\\v", "stra"), Some("stra".into()));
    }

    #[test]
    fn possessive_never_gives_back() {
        assert_eq!(m("\\c*+\\c\\v", "stra"), None);
        assert_eq!(m("\\c*+\\v", "stra"), Some("stra".into()));
    }

    #[test]
    fn bounded_quantifiers() {
        assert_eq!(m("\\c{2}", "strap"), Some("st".into()));
        assert_eq!(m("\\c{2,}", "strap"), Some("str".into()));
        assert_eq!(m("\\c{1,2}?\\v", "strap"), Some("tra".into()));
        assert_eq!(m("\\c<2,3>", "strap"), Some("str".into()));
    }

    #[test]
    fn alternation_is_ordered() {
        assert_eq!(m("(\\c|\\c\\v)\\v", "ba"), Some("ba".into()));
        assert_eq!(m("(\\v|\\c\\v)", "ba"), Some("ba".into()));
    }

    #[test]
    fn failed_branches_roll_back_captures() {
        let program = compile("((\\c)\\v|\\c(\\c))").unwrap();
        let t: Transcript = "bd".parse().unwrap();
        let found = program.matcher(&t).find().unwrap();
        assert_eq!(found.span(), 0..2);
        assert_eq!(found.group(2), Some(1..2));
    }

    #[test]
    fn find_skips_empty_matches() {
        assert_eq!(spans("\\c*", "abba"), vec![1..3]);
        assert!(spans("\\b", "ab").is_empty());
    }

    #[test]
    fn syllables() {
        assert_eq!(spans("σ", "zuˈkini"), vec![0..2, 2..5, 5..7]);
        assert_eq!(spans("(σ/O..N/+)", "b:oa:Nn:Cd:Oa:Nk:Oa:N"), vec![0..2, 3..7]);
        assert_eq!(spans("(σ/N/)", "b:oa:Nn:Cd:Oa:Nk:Oa:N"), vec![1..2, 4..5, 6..7]);
    }

    #[test]
    fn syllable_boundaries() {
        let program = compile("\\S(\\c)(\\v)").unwrap();
        let t: Transcript = "zuˈkini".parse().unwrap();
        let groups: Vec<_> = program
            .find_iter(&t)
            .map(|m| (m.group(1), m.group(2)))
            .collect();
        assert_eq!(
            groups,
            vec![
                (Some(0..1), Some(1..2)),
                (Some(3..4), Some(4..5)),
                (Some(5..6), Some(6..7)),
            ]
        );
    }

    #[test]
    fn word_boundaries() {
        assert_eq!(spans("\\v\\b\\c", "ba da"), vec![1..4]);
        assert_eq!(spans("\\b\\c", "ba da"), vec![0..1, 2..4]);
    }

    #[test]
    fn lookarounds_do_not_consume() {
        assert_eq!(m("\\c(?>\\v)", "sta"), Some("t".into()));
        assert_eq!(m("(?<\\v)\\c", "atb"), Some("t".into()));
        assert_eq!(m("(?<\\v\\c)\\c", "atb"), Some("b".into()));
    }

    #[test]
    fn compound_phones() {
        assert_eq!(spans("._.", "st͡ʃaad͜ʒ"), vec![1..2, 4..5]);
        assert_eq!(spans("'t.+'", "st͡ʃat"), vec![1..2]);
    }

    #[test]
    fn matcher_state() {
        let program = compile("(C=\\c)\\v").unwrap();
        let t: Transcript = "bada".parse().unwrap();
        let mut matcher = program.matcher(&t);
        assert!(matcher.find().is_some());
        assert_eq!(matcher.named_group("C"), Some(0..1));
        assert_eq!((matcher.start(), matcher.end()), (Some(0), Some(2)));
        assert!(matcher.find().is_some());
        assert_eq!(matcher.group(1), Some(2..3));
        assert!(matcher.find().is_none());
        assert!(matcher.find().is_none());
        assert_eq!(matcher.find_at(1).map(|m| m.start()), Some(2));
        assert_eq!(matcher.group_count(), 1);
    }

    #[test]
    fn match_lookup_by_key() {
        let program = compile("(C=\\c)(\\v)?").unwrap();
        let t: Transcript = "b".parse().unwrap();
        let found = program.matcher(&t).find().unwrap();
        assert_eq!(found.get("C"), Some(0..1));
        assert_eq!(found.get(2), None);
        assert_eq!(found.group_count(), 2);
        let named: Vec<_> = found.named_groups().collect();
        assert_eq!(named, vec![("C", Some(0..1))]);
    }
}
