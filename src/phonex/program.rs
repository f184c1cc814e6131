//! The compiled, immutable form of a pattern.
//!
//! Besides the resolved AST a [`Program`] holds a flat instruction list
//! executed by the backtracking machine in [`super::matcher`]. Capture slots
//! `2g` and `2g + 1` hold the bounds of group `g`; slots after the groups are
//! loop registers used by the same-position repetition guard.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use super::ast::{Anchor, ConstituentRange, Direction, Node, QuantifierMode};
use super::error::{PatternError, Result};
use super::groups::{self, GroupTable};
use super::matcher::{Match, Matcher, Matches};
use super::predicate::{TokenMatcher, TokenPredicate};
use super::token::Transcript;

#[derive(Debug, Clone)]
pub(crate) enum Inst {
    Token(Arc<TokenMatcher>),
    Syllable(Option<ConstituentRange>),
    /// `^` or `$`.
    Assert(Anchor),
    /// `\b` or `\S`: consume a boundary token, else match zero-width.
    Boundary(Anchor),
    Split { primary: usize, secondary: usize },
    Jump(usize),
    Save(usize),
    Mark(usize),
    /// Fails when the position equals the register set by `Mark`.
    Check(usize),
    /// Tokens equal to those captured by a group, each also satisfying
    /// `secondary`.
    BackRef {
        group: usize,
        secondary: Vec<Arc<dyn TokenPredicate>>,
    },
    /// Sub-program from `pc + 1` up to its `Match`; execution resumes at `next`.
    Look { direction: Direction, next: usize },
    Atomic { next: usize },
    Match,
}

#[derive(Debug, Clone)]
pub struct Program {
    source: String,
    root: Node,
    groups: GroupTable,
    names: Arc<BTreeMap<String, usize>>,
    code: Vec<Inst>,
    slots: usize,
}

impl Program {
    pub(crate) fn new(source: &str, mut root: Node) -> Result<Program> {
        let groups = groups::resolve(&mut root)?;
        let size = code_size(&root).saturating_add(1);
        if size > MAX_INSTRUCTIONS {
            return Err(PatternError::ProgramTooLarge {
                size,
                limit: MAX_INSTRUCTIONS,
            });
        }
        let first_register = 2 * (groups.count() + 1);
        let mut codegen = Codegen {
            code: Vec::new(),
            next_register: first_register,
        };
        codegen.node(&root);
        codegen.emit(Inst::Match);

        log::debug!(
            "compiled {:?}: {} groups, {} instructions",
            source,
            groups.count(),
            codegen.code.len()
        );

        Ok(Program {
            source: source.to_string(),
            names: Arc::new(groups.names().clone()),
            root,
            groups,
            slots: codegen.next_register,
            code: codegen.code,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Number of capturing groups, not counting the whole match.
    pub fn group_count(&self) -> usize {
        self.groups.count()
    }

    pub fn group_names(&self) -> &BTreeMap<String, usize> {
        &self.names
    }

    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.index_of(name)
    }

    pub fn group_name(&self, index: usize) -> Option<&str> {
        self.groups.name_of(index)
    }

    pub(crate) fn code(&self) -> &[Inst] {
        &self.code
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots
    }

    pub(crate) fn shared_names(&self) -> &Arc<BTreeMap<String, usize>> {
        &self.names
    }

    pub fn matcher<'p, 't>(&'p self, transcript: &'t Transcript) -> Matcher<'p, 't> {
        Matcher::new(self, transcript)
    }

    /// All non-overlapping matches, left to right.
    pub fn find_iter<'p, 't>(&'p self, transcript: &'t Transcript) -> Matches<'p, 't> {
        Matches::new(self.matcher(transcript))
    }

    /// Does the pattern match the whole transcript?
    pub fn is_match(&self, transcript: &Transcript) -> bool {
        self.matcher(transcript).matches()
    }

    /// Does the pattern match anywhere in the transcript?
    pub fn contains(&self, transcript: &Transcript) -> bool {
        self.matcher(transcript).find().is_some()
    }

    pub fn index_of(&self, transcript: &Transcript) -> Option<usize> {
        self.matcher(transcript).find().map(|m| m.start())
    }

    /// Token ranges between matches.
    pub fn split(&self, transcript: &Transcript) -> Vec<Range<usize>> {
        let mut pieces = Vec::new();
        let mut start = 0;
        for m in self.find_iter(transcript) {
            pieces.push(start..m.start());
            start = m.end();
        }
        pieces.push(start..transcript.len());
        pieces
    }

    pub fn first_match(&self, transcript: &Transcript) -> Option<Match> {
        self.matcher(transcript).find()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

/// Upper bound on the instructions of one compiled pattern.
pub const MAX_INSTRUCTIONS: usize = 1 << 21;

/// Instructions `Codegen` emits for `node`, saturating.
fn code_size(node: &Node) -> usize {
    match node {
        Node::Empty => 0,
        Node::Literal(_)
        | Node::Syllable(_)
        | Node::BackReference { .. }
        | Node::Anchor(_) => 1,
        Node::Sequence(items) => items
            .iter()
            .fold(0usize, |acc, n| acc.saturating_add(code_size(n))),
        Node::Alternation(branches) => branches.iter().fold(
            2 * branches.len().saturating_sub(1),
            |acc: usize, n| acc.saturating_add(code_size(n)),
        ),
        Node::Group { index, body, .. } => {
            code_size(body).saturating_add(if index.is_some() { 2 } else { 0 })
        }
        Node::Quantifier {
            body,
            min,
            max,
            mode,
        } => {
            let body = code_size(body);
            let optional = match max {
                None => body.saturating_add(4),
                Some(max) => (max - min).saturating_mul(body.saturating_add(1)),
            };
            let atomic = if *mode == QuantifierMode::Possessive { 2 } else { 0 };
            body.saturating_mul(*min)
                .saturating_add(optional)
                .saturating_add(atomic)
        }
        Node::LookAround { body, .. } => code_size(body).saturating_add(2),
    }
}

struct Codegen {
    code: Vec<Inst>,
    next_register: usize,
}

impl Codegen {
    fn emit(&mut self, inst: Inst) -> usize {
        self.code.push(inst);
        self.code.len() - 1
    }

    fn here(&self) -> usize {
        self.code.len()
    }

    fn patch_split(&mut self, at: usize, target: usize, prefer_target: bool) {
        self.code[at] = if prefer_target {
            Inst::Split {
                primary: target,
                secondary: at + 1,
            }
        } else {
            Inst::Split {
                primary: at + 1,
                secondary: target,
            }
        };
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Empty => {}
            Node::Literal(m) => {
                self.emit(Inst::Token(Arc::clone(m)));
            }
            Node::Syllable(range) => {
                self.emit(Inst::Syllable(*range));
            }
            Node::Sequence(items) => items.iter().for_each(|n| self.node(n)),
            Node::Alternation(branches) => {
                let mut exits = Vec::new();
                for (i, branch) in branches.iter().enumerate() {
                    if i + 1 == branches.len() {
                        self.node(branch);
                        break;
                    }
                    let split = self.emit(Inst::Jump(0));
                    self.node(branch);
                    exits.push(self.emit(Inst::Jump(0)));
                    let next = self.here();
                    self.patch_split(split, next, false);
                }
                let exit = self.here();
                for at in exits {
                    self.code[at] = Inst::Jump(exit);
                }
            }
            Node::Group { index, body, .. } => match index {
                Some(g) => {
                    self.emit(Inst::Save(2 * g));
                    self.node(body);
                    self.emit(Inst::Save(2 * g + 1));
                }
                None => self.node(body),
            },
            Node::Quantifier {
                body,
                min,
                max,
                mode: QuantifierMode::Possessive,
            } => {
                let at = self.emit(Inst::Atomic { next: 0 });
                self.repeat(body, *min, *max, false);
                self.emit(Inst::Match);
                let next = self.here();
                self.code[at] = Inst::Atomic { next };
            }
            Node::Quantifier {
                body,
                min,
                max,
                mode,
            } => self.repeat(body, *min, *max, *mode == QuantifierMode::Reluctant),
            Node::BackReference {
                resolved,
                secondary,
                ..
            } => {
                self.emit(Inst::BackRef {
                    group: *resolved,
                    secondary: secondary.clone(),
                });
            }
            Node::LookAround { direction, body } => {
                let at = self.emit(Inst::Look {
                    direction: *direction,
                    next: 0,
                });
                self.node(body);
                self.emit(Inst::Match);
                let next = self.here();
                self.code[at] = Inst::Look {
                    direction: *direction,
                    next,
                };
            }
            Node::Anchor(anchor @ (Anchor::Start | Anchor::End)) => {
                self.emit(Inst::Assert(*anchor));
            }
            Node::Anchor(anchor) => {
                self.emit(Inst::Boundary(*anchor));
            }
        }
    }

    /// Required copies first, then either a guarded loop or nested optional
    /// copies that all exit to the same place.
    fn repeat(&mut self, body: &Node, min: usize, max: Option<usize>, reluctant: bool) {
        for _ in 0..min {
            self.node(body);
        }
        match max {
            None => {
                let register = self.next_register;
                self.next_register += 1;
                let split = self.emit(Inst::Jump(0));
                self.emit(Inst::Mark(register));
                self.node(body);
                self.emit(Inst::Check(register));
                self.emit(Inst::Jump(split));
                let exit = self.here();
                self.patch_split(split, exit, reluctant);
            }
            Some(max) => {
                let mut splits = Vec::new();
                for _ in min..max {
                    splits.push(self.emit(Inst::Jump(0)));
                    self.node(body);
                }
                let exit = self.here();
                for at in splits {
                    self.patch_split(at, exit, reluctant);
                }
            }
        }
    }
}
