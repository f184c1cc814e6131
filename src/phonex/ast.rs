use std::fmt;
use std::sync::Arc;

use super::predicate::{TokenMatcher, TokenPredicate};
use super::token::ScType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Capturing,
    NonCapturing, // (?=...)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierMode {
    Greedy,
    Reluctant,  // +?
    Possessive, // ++
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ahead,  // (?>...)
    Behind, // (?<...)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,            // ^
    End,              // $
    WordBoundary,     // \b
    SyllableBoundary, // \S
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Absolute(usize), // \N
    Relative(usize), // \-N
}

/// Inclusive constituent range of a `σ/X..Y/` matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstituentRange {
    pub first: ScType,
    pub last: ScType,
}

impl ConstituentRange {
    pub fn contains(&self, sctype: ScType) -> bool {
        match (
            self.first.template_rank(),
            self.last.template_rank(),
            sctype.template_rank(),
        ) {
            (Some(lo), Some(hi), Some(r)) => lo <= r && r <= hi,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Empty,
    Literal(Arc<TokenMatcher>),
    /// `σ`, or `σ/X..Y/` when a range is given.
    Syllable(Option<ConstituentRange>),
    Sequence(Vec<Node>),
    Alternation(Vec<Node>),
    Group {
        kind: GroupKind,
        /// Assigned by the group pass; `None` for non-capturing groups and
        /// for groups inside a lookaround.
        index: Option<usize>,
        name: Option<String>,
        body: Box<Node>,
    },
    Quantifier {
        body: Box<Node>,
        min: usize,
        max: Option<usize>,
        mode: QuantifierMode,
    },
    BackReference {
        reference: Reference,
        /// Absolute group index, filled in by the group pass.
        resolved: usize,
        /// Every referenced token must also satisfy these (`\1:O`).
        secondary: Vec<Arc<dyn TokenPredicate>>,
        pos: usize,
    },
    LookAround {
        direction: Direction,
        body: Box<Node>,
    },
    Anchor(Anchor),
}

impl Node {
    /// Build a sequence, collapsing the trivial cases.
    pub fn sequence(mut items: Vec<Node>) -> Node {
        match items.len() {
            0 => Node::Empty,
            1 => items.remove(0),
            _ => Node::Sequence(items),
        }
    }

    pub fn alternation(mut branches: Vec<Node>) -> Node {
        if branches.len() == 1 {
            branches.remove(0)
        } else {
            Node::Alternation(branches)
        }
    }

    fn is_atomic(&self) -> bool {
        !matches!(
            self,
            Node::Empty | Node::Sequence(_) | Node::Alternation(_) | Node::Quantifier { .. }
        )
    }
}

fn write_wrapped(f: &mut fmt::Formatter<'_>, node: &Node) -> fmt::Result {
    if node.is_atomic() {
        write!(f, "{node}")
    } else {
        write!(f, "(?={node})")
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Empty => Ok(()),
            Node::Literal(m) => write!(f, "{m}"),
            Node::Syllable(None) => f.write_str("σ"),
            Node::Syllable(Some(range)) if range.first == range.last => {
                write!(f, "σ/{}/", range.first)
            }
            Node::Syllable(Some(range)) => write!(f, "σ/{}..{}/", range.first, range.last),
            Node::Sequence(items) => {
                let mut prev_backref = false;
                for item in items {
                    if prev_backref {
                        f.write_str(" ")?;
                    }
                    match item {
                        Node::Alternation(_) => write!(f, "(?={item})")?,
                        _ => write!(f, "{item}")?,
                    }
                    prev_backref = matches!(item, Node::BackReference { .. });
                }
                Ok(())
            }
            Node::Alternation(branches) => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{branch}")?;
                }
                Ok(())
            }
            Node::Group {
                kind, name, body, ..
            } => {
                f.write_str("(")?;
                if *kind == GroupKind::NonCapturing {
                    f.write_str("?=")?;
                }
                if let Some(name) = name {
                    write!(f, "{name}=")?;
                }
                write!(f, "{body})")
            }
            Node::Quantifier {
                body,
                min,
                max,
                mode,
            } => {
                write_wrapped(f, body)?;
                match (min, max) {
                    (0, None) => f.write_str("*")?,
                    (1, None) => f.write_str("+")?,
                    (0, Some(1)) => f.write_str("?")?,
                    (m, None) => write!(f, "{{{m},}}")?,
                    (m, Some(n)) if m == n => write!(f, "{{{m}}}")?,
                    (m, Some(n)) => write!(f, "{{{m},{n}}}")?,
                }
                match mode {
                    QuantifierMode::Greedy => Ok(()),
                    QuantifierMode::Reluctant => f.write_str("?"),
                    QuantifierMode::Possessive => f.write_str("+"),
                }
            }
            Node::BackReference {
                reference,
                secondary,
                ..
            } => {
                match reference {
                    Reference::Absolute(n) => write!(f, "\\{n}")?,
                    Reference::Relative(n) => write!(f, "\\-{n}")?,
                }
                for p in secondary {
                    write!(f, ":{p}")?;
                }
                Ok(())
            }
            Node::LookAround { direction, body } => match direction {
                Direction::Ahead => write!(f, "(?>{body})"),
                Direction::Behind => write!(f, "(?<{body})"),
            },
            Node::Anchor(anchor) => f.write_str(match anchor {
                Anchor::Start => "^",
                Anchor::End => "$",
                Anchor::WordBoundary => "\\b",
                Anchor::SyllableBoundary => "\\S",
            }),
        }
    }
}
