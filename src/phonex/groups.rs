//! Group numbering, the name table and backreference resolution.
//!
//! Groups are numbered from 1 in order of their opening parenthesis. Each
//! branch of an alternation restarts numbering at the same index, so
//! `((a)|(b))` has two groups and both inner groups are group 2. Groups
//! inside a lookaround are not numbered.

use std::collections::BTreeMap;

use super::ast::{GroupKind, Node, Reference};
use super::error::{PatternError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupTable {
    count: usize,
    names: BTreeMap<String, usize>,
    /// Indexed by group number; slot 0 is the whole match.
    index_names: Vec<Option<String>>,
}

impl GroupTable {
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn names(&self) -> &BTreeMap<String, usize> {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.index_names.get(index)?.as_deref()
    }

    fn bind(&mut self, index: usize, name: &str) -> Result<()> {
        if let Some(&bound) = self.names.get(name) {
            if bound != index {
                return Err(PatternError::DuplicateGroupName {
                    name: name.to_string(),
                });
            }
        }
        if self.index_names.len() <= index {
            self.index_names.resize(index + 1, None);
        }
        match &self.index_names[index] {
            Some(first) if first != name => {
                return Err(PatternError::ConflictingGroupName {
                    index,
                    first: first.clone(),
                    second: name.to_string(),
                });
            }
            _ => {}
        }
        self.index_names[index] = Some(name.to_string());
        self.names.insert(name.to_string(), index);
        Ok(())
    }
}

/// Number the groups of `root` in place and resolve its backreferences.
pub fn resolve(root: &mut Node) -> Result<GroupTable> {
    let mut pass = Pass::default();
    pass.visit(root)?;
    let mut table = pass.table;
    table.count = pass.opened;
    table.index_names.resize(table.count + 1, None);
    Ok(table)
}

#[derive(Default)]
struct Pass {
    table: GroupTable,
    opened: usize,
    closed: Vec<bool>,
    lookaround_depth: usize,
}

impl Pass {
    fn visit(&mut self, node: &mut Node) -> Result<()> {
        match node {
            Node::Empty | Node::Literal(_) | Node::Syllable(_) | Node::Anchor(_) => Ok(()),
            Node::Sequence(items) => items.iter_mut().try_for_each(|n| self.visit(n)),
            Node::Alternation(branches) => {
                let base = self.opened;
                let mut widest = base;
                for branch in branches {
                    self.opened = base;
                    self.visit(branch)?;
                    widest = widest.max(self.opened);
                }
                self.opened = widest;
                Ok(())
            }
            Node::Group {
                kind,
                index,
                name,
                body,
            } => {
                if *kind == GroupKind::NonCapturing || self.lookaround_depth > 0 {
                    *index = None;
                    return self.visit(body);
                }
                self.opened += 1;
                let current = self.opened;
                *index = Some(current);
                if let Some(name) = name {
                    self.table.bind(current, name)?;
                }
                self.visit(body)?;
                if self.closed.len() <= current {
                    self.closed.resize(current + 1, false);
                }
                self.closed[current] = true;
                Ok(())
            }
            Node::Quantifier { body, .. } => self.visit(body),
            Node::LookAround { body, .. } => {
                self.lookaround_depth += 1;
                let result = self.visit(body);
                self.lookaround_depth -= 1;
                result
            }
            Node::BackReference {
                reference,
                resolved,
                pos,
                ..
            } => {
                let target = match *reference {
                    Reference::Absolute(n) => Some(n),
                    Reference::Relative(n) => (self.opened + 1).checked_sub(n),
                };
                match target {
                    Some(t) if t > 0 && self.closed.get(t).copied().unwrap_or(false) => {
                        *resolved = t;
                        Ok(())
                    }
                    _ => Err(PatternError::InvalidBackReference {
                        reference: node_text(reference),
                        pos: *pos,
                    }),
                }
            }
        }
    }
}

fn node_text(reference: &Reference) -> String {
    match reference {
        Reference::Absolute(n) => format!("\\{n}"),
        Reference::Relative(n) => format!("\\-{n}"),
    }
}
