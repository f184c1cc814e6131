//! Pattern text to AST.
//!
//! Whitespace outside quoted text is insignificant and `/* ... */` or
//! `// ...` comments may appear between elements. Group numbering and
//! backreference resolution happen afterwards in [`super::groups`].

use std::iter::{Enumerate, Peekable};
use std::str::Chars;
use std::sync::Arc;

use super::ast::{Anchor, ConstituentRange, Direction, GroupKind, Node, QuantifierMode, Reference};
use super::error::{PatternError, Result};
use super::predicate::{
    BaseMatcher, PhoneClass, PredicateRegistry, ScTypePredicate, TextMatcher, TokenMatcher,
    TokenPredicate, is_special_glyph,
};
use super::program::Program;
use super::token::ScType;

/// Largest repetition count accepted in `{m,n}` and `<m,n>` bounds.
pub const MAX_REPEAT: usize = 1000;

/// Compiles pattern text using an injected predicate registry.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    registry: PredicateRegistry,
}

impl Compiler {
    pub fn new(registry: PredicateRegistry) -> Self {
        Compiler { registry }
    }

    pub fn registry(&self) -> &PredicateRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PredicateRegistry {
        &mut self.registry
    }

    /// Parse without resolving groups.
    pub fn parse(&self, source: &str) -> Result<Node> {
        let mut parser = Parser {
            chars: source.chars().enumerate().peekable(),
            end: source.chars().count(),
            registry: &self.registry,
        };
        parser.parse_alternation(0)
    }

    pub fn compile(&self, source: &str) -> Result<Program> {
        let root = self.parse(source)?;
        Program::new(source, root)
    }
}

/// Compile with the built-in predicates.
pub fn compile(source: &str) -> Result<Program> {
    Compiler::default().compile(source)
}

struct Parser<'a> {
    chars: Peekable<Enumerate<Chars<'a>>>,
    end: usize,
    registry: &'a PredicateRegistry,
}

impl Parser<'_> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, c)| c)
    }

    fn pos(&mut self) -> usize {
        self.chars.peek().map_or(self.end, |&(pos, _)| pos)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn eat(&mut self, c: char) -> bool {
        self.chars.next_if(|&(_, x)| x == c).is_some()
    }

    fn unexpected(&mut self, expected: &'static str) -> PatternError {
        match self.chars.peek() {
            Some(&(pos, ch)) => PatternError::UnexpectedChar { ch, pos },
            None => PatternError::UnexpectedEnd { expected },
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_second() == Some('*') => {
                    self.bump();
                    self.bump();
                    let mut prev = '\0';
                    while let Some((_, c)) = self.bump() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        prev = c;
                    }
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some((_, c)) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    /// Raw text up to (and consuming) `close`.
    fn read_until(&mut self, close: char) -> Option<String> {
        let mut text = String::new();
        while let Some((_, c)) = self.bump() {
            if c == close {
                return Some(text);
            }
            text.push(c);
        }
        None
    }

    /// Quoted text after the opening quote; `\<quote>` is an escaped quote.
    fn read_quoted(&mut self, quote: char) -> Result<String> {
        let mut text = String::new();
        while let Some((_, c)) = self.bump() {
            match c {
                '\\' if self.peek() == Some(quote) => {
                    self.bump();
                    text.push(quote);
                }
                c if c == quote => return Ok(text),
                c => text.push(c),
            }
        }
        Err(PatternError::UnexpectedEnd {
            expected: "closing quote",
        })
    }

    fn read_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some((_, c)) = self
            .chars
            .next_if(|&(_, c)| c.is_ascii_alphanumeric() || c == '_')
        {
            ident.push(c);
        }
        ident
    }

    fn read_number(&mut self, pos: usize, form: &str) -> Result<usize> {
        let mut digits = String::new();
        while let Some((_, c)) = self.chars.next_if(|&(_, c)| c.is_ascii_digit()) {
            digits.push(c);
        }
        digits
            .parse()
            .map_err(|_| PatternError::InvalidBackReference {
                reference: format!("{form}{digits}"),
                pos,
            })
    }

    fn parse_alternation(&mut self, depth: usize) -> Result<Node> {
        let mut branches = vec![self.parse_sequence(depth)?];
        while self.eat('|') {
            branches.push(self.parse_sequence(depth)?);
        }
        Ok(Node::alternation(branches))
    }

    fn parse_sequence(&mut self, depth: usize) -> Result<Node> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            let pos = self.pos();
            match self.peek() {
                None | Some('|') => break,
                Some(')') if depth > 0 => break,
                Some(')') => return Err(PatternError::UnmatchedClose { pos }),
                Some('*' | '+' | '?') => return Err(PatternError::DanglingQuantifier { pos }),
                Some(_) => {
                    let atom = self.parse_atom(depth)?;
                    items.push(self.parse_quantifier(atom)?);
                }
            }
        }
        Ok(Node::sequence(items))
    }

    fn parse_quantifier(&mut self, atom: Node) -> Result<Node> {
        self.skip_trivia();
        let pos = self.pos();
        let (min, max) = match self.peek() {
            Some('*') => {
                self.bump();
                (0, None)
            }
            Some('+') => {
                self.bump();
                (1, None)
            }
            Some('?') => {
                self.bump();
                (0, Some(1))
            }
            // `{` followed by a digit or comma is a bound, otherwise a feature set
            Some('{') if matches!(self.peek_second(), Some(c) if c.is_ascii_digit() || c == ',') => {
                self.bump();
                self.read_bounds(pos, '}')?
            }
            Some('<') => {
                self.bump();
                self.read_bounds(pos, '>')?
            }
            _ => return Ok(atom),
        };

        let mode = if self.eat('?') {
            QuantifierMode::Reluctant
        } else if self.eat('+') {
            QuantifierMode::Possessive
        } else {
            QuantifierMode::Greedy
        };

        self.skip_trivia();
        if let Some('*' | '+' | '?') = self.peek() {
            return Err(PatternError::DanglingQuantifier { pos: self.pos() });
        }

        Ok(Node::Quantifier {
            body: Box::new(atom),
            min,
            max,
            mode,
        })
    }

    fn read_bounds(&mut self, pos: usize, close: char) -> Result<(usize, Option<usize>)> {
        let text = self.read_until(close).ok_or(PatternError::UnexpectedEnd {
            expected: "end of quantifier bounds",
        })?;
        let count = |s: &str| {
            s.trim()
                .parse::<usize>()
                .map_err(|_| PatternError::InvalidQuantifier {
                    pos,
                    reason: format!("'{}' is not a repetition count", s.trim()),
                })
        };
        let (min, max) = match text.split_once(',') {
            None => {
                let n = count(&text)?;
                (n, Some(n))
            }
            Some((lo, hi)) => {
                let max = if hi.trim().is_empty() {
                    None
                } else {
                    Some(count(hi)?)
                };
                (count(lo)?, max)
            }
        };
        if max.is_some_and(|max| max < min) {
            return Err(PatternError::InvalidQuantifier {
                pos,
                reason: format!("minimum {min} exceeds maximum"),
            });
        }
        if min.max(max.unwrap_or(0)) > MAX_REPEAT {
            return Err(PatternError::InvalidQuantifier {
                pos,
                reason: format!("repetition count above {MAX_REPEAT}"),
            });
        }
        Ok((min, max))
    }

    fn parse_atom(&mut self, depth: usize) -> Result<Node> {
        let pos = self.pos();
        match self.peek() {
            Some('(') => self.parse_group(depth),
            Some('^') => {
                self.bump();
                Ok(Node::Anchor(Anchor::Start))
            }
            Some('$') => {
                self.bump();
                Ok(Node::Anchor(Anchor::End))
            }
            Some('σ') => {
                self.bump();
                self.parse_syllable()
            }
            Some('\\') => match self.peek_second() {
                Some('b') => {
                    self.bump();
                    self.bump();
                    Ok(Node::Anchor(Anchor::WordBoundary))
                }
                Some('S') => {
                    self.bump();
                    self.bump();
                    Ok(Node::Anchor(Anchor::SyllableBoundary))
                }
                Some('-') => {
                    self.bump();
                    self.bump();
                    let n = self.read_number(pos, "\\-")?;
                    Ok(Node::BackReference {
                        reference: Reference::Relative(n),
                        resolved: 0,
                        secondary: self.parse_secondaries()?,
                        pos,
                    })
                }
                Some(d) if d.is_ascii_digit() => {
                    self.bump();
                    let n = self.read_number(pos, "\\")?;
                    Ok(Node::BackReference {
                        reference: Reference::Absolute(n),
                        resolved: 0,
                        secondary: self.parse_secondaries()?,
                        pos,
                    })
                }
                _ => self.parse_matcher(),
            },
            _ => self.parse_matcher(),
        }
    }

    fn parse_group(&mut self, depth: usize) -> Result<Node> {
        let open = self.pos();
        self.bump();
        self.skip_trivia();

        let node = if self.eat('?') {
            match self.bump() {
                Some((_, '=')) => Node::Group {
                    kind: GroupKind::NonCapturing,
                    index: None,
                    name: None,
                    body: Box::new(self.parse_alternation(depth + 1)?),
                },
                Some((_, '<')) => Node::LookAround {
                    direction: Direction::Behind,
                    body: Box::new(self.parse_alternation(depth + 1)?),
                },
                Some((_, '>')) => Node::LookAround {
                    direction: Direction::Ahead,
                    body: Box::new(self.parse_alternation(depth + 1)?),
                },
                Some((pos, ch)) => return Err(PatternError::UnexpectedChar { ch, pos }),
                None => return Err(PatternError::UnclosedGroup { pos: open }),
            }
        } else {
            let name = self.group_name();
            Node::Group {
                kind: GroupKind::Capturing,
                index: None,
                name,
                body: Box::new(self.parse_alternation(depth + 1)?),
            }
        };

        self.skip_trivia();
        if !self.eat(')') {
            return Err(PatternError::UnclosedGroup { pos: open });
        }
        Ok(node)
    }

    /// `name=` at the start of a capturing group.
    fn group_name(&mut self) -> Option<String> {
        let mut ahead = self.chars.clone();
        let mut name = String::new();
        while let Some((_, c)) = ahead.next_if(|&(_, c)| c.is_ascii_alphanumeric() || c == '_') {
            name.push(c);
        }
        while ahead.next_if(|&(_, c)| c.is_whitespace()).is_some() {}
        let starts_ok = name.chars().next().is_some_and(|c| !c.is_ascii_digit());
        if starts_ok && ahead.next_if(|&(_, c)| c == '=').is_some() {
            self.chars = ahead;
            Some(name)
        } else {
            None
        }
    }

    fn parse_syllable(&mut self) -> Result<Node> {
        if !self.eat('/') {
            return Ok(Node::Syllable(None));
        }
        let text = self.read_until('/').ok_or(PatternError::UnexpectedEnd {
            expected: "'/' closing the syllable range",
        })?;
        Ok(Node::Syllable(Some(constituent_range(&text)?)))
    }

    fn parse_matcher(&mut self) -> Result<Node> {
        let mut base = self.parse_base()?;
        self.skip_trivia();
        if self.eat('_') {
            self.skip_trivia();
            let second = self.parse_base()?;
            base = BaseMatcher::Compound(Box::new(base), Box::new(second));
        }

        let matcher = self
            .parse_secondaries()?
            .into_iter()
            .fold(TokenMatcher::new(base), TokenMatcher::with);
        Ok(Node::Literal(Arc::new(matcher)))
    }

    /// `:`-prefixed predicate calls and constituent shortcuts. Shortcuts are
    /// unioned into one trailing `sctype` predicate.
    fn parse_secondaries(&mut self) -> Result<Vec<Arc<dyn TokenPredicate>>> {
        let mut predicates = Vec::new();
        let mut shortcuts: Option<ScTypePredicate> = None;
        loop {
            self.skip_trivia();
            if !self.eat(':') {
                break;
            }
            self.skip_trivia();
            let negated = self.eat('-');
            let ident = self.read_ident();
            if ident.is_empty() {
                return Err(self.unexpected("a predicate after ':'"));
            }
            if !negated && self.at_call(&ident) {
                self.bump();
                let arg = self.read_predicate_arg()?;
                predicates.push(self.registry.create(&ident, &arg)?);
            } else {
                let id = if negated { format!("-{ident}") } else { ident };
                shortcuts.get_or_insert_with(ScTypePredicate::default).add(&id)?;
            }
        }
        if let Some(shortcuts) = shortcuts {
            predicates.push(Arc::new(shortcuts));
        }
        Ok(predicates)
    }

    /// Is `ident` followed by an argument list rather than a group? In
    /// `\c:O(\v)` the `(` opens a group.
    fn at_call(&mut self, ident: &str) -> bool {
        self.peek() == Some('(')
            && (self.registry.contains(ident) || matches!(self.peek_second(), Some('"' | ')')))
    }

    fn read_predicate_arg(&mut self) -> Result<String> {
        self.skip_trivia();
        let arg = if self.eat('"') {
            self.read_quoted('"')?
        } else {
            String::new()
        };
        self.skip_trivia();
        if !self.eat(')') {
            return Err(self.unexpected("')' closing the predicate arguments"));
        }
        Ok(arg)
    }

    fn parse_base(&mut self) -> Result<BaseMatcher> {
        let Some((pos, c)) = self.bump() else {
            return Err(PatternError::UnexpectedEnd {
                expected: "a matcher",
            });
        };
        match c {
            '.' => Ok(BaseMatcher::Any),
            '\\' => match self.bump() {
                Some((_, e)) if e.is_ascii_alphanumeric() => PhoneClass::from_escape(e)
                    .map(BaseMatcher::Class)
                    .ok_or(PatternError::UnknownEscape { ch: e, pos }),
                Some((_, e)) => Ok(BaseMatcher::Glyph(e)),
                None => Err(PatternError::UnexpectedEnd {
                    expected: "an escaped character",
                }),
            },
            '{' => {
                let list = self.read_until('}').ok_or(PatternError::UnexpectedEnd {
                    expected: "'}' closing the feature set",
                })?;
                BaseMatcher::features(&list)
            }
            '\'' => {
                let text = self.read_quoted('\'')?;
                Ok(BaseMatcher::Text(TextMatcher::new(&text)?))
            }
            c if is_special_glyph(c) => Err(PatternError::UnexpectedChar { ch: c, pos }),
            c => Ok(BaseMatcher::Glyph(c)),
        }
    }
}

fn constituent_range(text: &str) -> Result<ConstituentRange> {
    let ranked = |id: &str, default: ScType| -> Result<ScType> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(default);
        }
        ScType::from_identifier(id)
            .filter(|t| t.template_rank().is_some())
            .ok_or_else(|| PatternError::UnknownConstituent {
                ident: id.to_string(),
            })
    };

    let range = match text.split_once("..") {
        Some((first, last)) => ConstituentRange {
            first: ranked(first, ScType::LeftAppendix)?,
            last: ranked(last, ScType::RightAppendix)?,
        },
        None if text.trim().is_empty() => {
            return Err(PatternError::InvalidSyllableRange {
                range: text.to_string(),
            });
        }
        None => {
            let only = ranked(text, ScType::Unknown)?;
            ConstituentRange {
                first: only,
                last: only,
            }
        }
    };
    if range.first.template_rank() > range.last.template_rank() {
        return Err(PatternError::InvalidSyllableRange {
            range: text.to_string(),
        });
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phonex::error::ErrorKind;

    fn parse(src: &str) -> Result<Node> {
        Compiler::default().parse(src)
    }

    fn round(src: &str) -> String {
        parse(src).unwrap().to_string()
    }

    #[test]
    fn parses_literals_and_classes() {
        assert_eq!(round("\\c\\v.b"), "\\c\\v.b");
        assert_eq!(round("{c, -voiced}"), "{c,-voiced}");
        assert_eq!(round("'t.+'"), "'t.+'");
        assert_eq!(round("._."), "._.");
        assert_eq!(round("\\."), "\\.");
    }

    #[test]
    fn ignores_whitespace_and_comments() {
        assert_eq!(round(" \\c /* onset */ \\v // nucleus\n \\c"), "\\c\\v\\c");
        assert_eq!(round("' '"), "' '");
    }

    #[test]
    fn parses_groups_and_lookarounds() {
        assert_eq!(round("(C=\\c)(?=\\v)(?<\\p)(?>\\S)"), "(C=\\c)(?=\\v)(?<\\p)(?>\\S)");
        assert_eq!(round("(\\c|\\v|)"), "(\\c|\\v|)");
    }

    #[test]
    fn parses_quantifiers() {
        assert_eq!(round("\\c*\\v+?.?+"), "\\c*\\v+?.?+");
        assert_eq!(round("\\c{2}\\v{1,3}.<2,>"), "\\c{2}\\v{1,3}.{2,}");
        assert_eq!(round("\\c{0,1}"), "\\c?");
    }

    #[test]
    fn feature_set_after_atom_is_not_a_quantifier() {
        let node = parse("\\c{v}").unwrap();
        assert!(matches!(node, Node::Sequence(ref items) if items.len() == 2));
    }

    #[test]
    fn parses_secondary_matchers() {
        assert_eq!(round("\\c:O"), "\\c:sctype(\"O\")");
        assert_eq!(round("\\c:L:O"), "\\c:sctype(\"LA|O\")");
        assert_eq!(round("\\w:-O"), "\\w:sctype(\"-O\")");
        assert_eq!(round("\\c:sctype(\"O|LA\")"), "\\c:sctype(\"O|LA\")");
        assert_eq!(round("\\v:stress(\"1\")"), "\\v:stress(\"1\")");
        assert_eq!(round("\\v:tone(\"-3\")"), "\\v:tone(\"-3\")");
    }

    #[test]
    fn shortcut_before_a_group_is_not_a_call() {
        assert_eq!(round("\\c:O(\\v)"), "\\c:sctype(\"O\")(\\v)");
        assert_eq!(round("\\c:O(?>\\v)"), "\\c:sctype(\"O\")(?>\\v)");
        assert_eq!(round("\\c:L:O(\\v)+"), "\\c:sctype(\"LA|O\")(\\v)+");
        assert!(matches!(
            parse("\\c:O(\\v"),
            Err(PatternError::UnclosedGroup { .. })
        ));
    }

    #[test]
    fn parses_syllables() {
        assert_eq!(round("σ"), "σ");
        assert_eq!(round("σ/O..N/+"), "σ/O..N/+");
        assert_eq!(round("σ/N/"), "σ/N/");
        assert_eq!(round("σ/..N/"), "σ/LA..N/");
        assert!(matches!(parse("σ/N..O/"), Err(PatternError::InvalidSyllableRange { .. })));
        assert!(matches!(parse("σ/X/"), Err(PatternError::UnknownConstituent { .. })));
    }

    #[test]
    fn parses_backreferences() {
        assert_eq!(round("(\\c)\\1"), "(\\c)\\1");
        assert_eq!(round("(\\c)\\-1"), "(\\c)\\-1");
        assert_eq!(round("(\\c)\\1:O"), "(\\c)\\1:sctype(\"O\")");
        assert_eq!(
            round("(\\c)\\-1:sctype(\"O\"):stress(\"1\")"),
            "(\\c)\\-1:sctype(\"O\"):stress(\"1\")"
        );
    }

    #[test]
    fn registry_can_be_extended_in_place() {
        let mut compiler = Compiler::default();
        assert!(compiler.parse("\\v:long()").is_err());
        compiler.registry_mut().register("long", |_| {
            Ok(Arc::new(ScTypePredicate::parse("N")?) as Arc<dyn TokenPredicate>)
        });
        assert_eq!(compiler.parse("\\v:long()").unwrap().to_string(), "\\v:sctype(\"N\")");
        assert!(compiler.registry().contains("long"));
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert!(matches!(parse("((\\c)"), Err(PatternError::UnclosedGroup { pos: 0 })));
        assert!(matches!(parse("\\c)"), Err(PatternError::UnmatchedClose { pos: 2 })));
        assert!(matches!(parse("*\\c"), Err(PatternError::DanglingQuantifier { .. })));
        assert!(matches!(parse("\\c**"), Err(PatternError::DanglingQuantifier { .. })));
        assert!(matches!(parse("\\c{3,1}"), Err(PatternError::InvalidQuantifier { .. })));
        assert!(matches!(parse("\\c{,1}"), Err(PatternError::InvalidQuantifier { .. })));
        assert!(matches!(parse("\\c{1001}"), Err(PatternError::InvalidQuantifier { .. })));
        assert!(parse("\\c<0,1000>").is_ok());
        assert!(matches!(parse("{invalid}"), Err(PatternError::UnknownFeature { .. })));
        assert!(matches!(parse("\\q"), Err(PatternError::UnknownEscape { ch: 'q', .. })));
        assert!(matches!(parse("'t"), Err(PatternError::UnexpectedEnd { .. })));
        assert!(matches!(parse("(?x)"), Err(PatternError::UnexpectedChar { ch: 'x', .. })));
    }

    #[test]
    fn unknown_predicate_is_reported_separately() {
        let err = parse("\\v:noplugin()").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuchPredicate);
        assert_eq!(parse("{invalid}").unwrap_err().kind(), ErrorKind::Syntax);
    }
}
