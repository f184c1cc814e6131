//! Single-token predicates and the registry of named predicates.
//!
//! A [`TokenMatcher`] is a base matcher (`.`, `\c`, `{labial}`, `'t.+'`, a
//! glyph, `x_y` compound) followed by any number of secondary predicates
//! written `:name("arg")` or as constituent shortcuts (`:O`, `:L:O`).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::error::{PatternError, Result};
use super::features::FeatureSet;
use super::token::{ScType, Stress, Token, TokenKind};

/// A named predicate over one token.
///
/// `Display` must render the predicate the way it is written in a pattern,
/// without the leading `:`.
pub trait TokenPredicate: fmt::Debug + fmt::Display + Send + Sync {
    fn matches(&self, token: &Token) -> bool;
}

/// Builds a predicate from its (possibly empty) argument string.
pub type PredicateFactory =
    Arc<dyn Fn(&str) -> Result<Arc<dyn TokenPredicate>> + Send + Sync>;

/// Predefined escape classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneClass {
    Consonant,
    Vowel,
    Glide,
    AnyPhone,
    NonPhone,
    Pause,
    Stress,
}

impl PhoneClass {
    pub fn from_escape(c: char) -> Option<PhoneClass> {
        match c {
            'c' => Some(PhoneClass::Consonant),
            'v' => Some(PhoneClass::Vowel),
            'g' => Some(PhoneClass::Glide),
            'w' => Some(PhoneClass::AnyPhone),
            'W' => Some(PhoneClass::NonPhone),
            'p' => Some(PhoneClass::Pause),
            's' => Some(PhoneClass::Stress),
            _ => None,
        }
    }

    fn escape(self) -> char {
        match self {
            PhoneClass::Consonant => 'c',
            PhoneClass::Vowel => 'v',
            PhoneClass::Glide => 'g',
            PhoneClass::AnyPhone => 'w',
            PhoneClass::NonPhone => 'W',
            PhoneClass::Pause => 'p',
            PhoneClass::Stress => 's',
        }
    }

    fn matches(self, token: &Token) -> bool {
        match self {
            PhoneClass::Consonant => {
                token.is_phone() && token.features().contains(FeatureSet::CONSONANT)
            }
            PhoneClass::Vowel => token.is_phone() && token.features().contains(FeatureSet::VOWEL),
            PhoneClass::Glide => token.is_phone() && token.features().contains(FeatureSet::GLIDE),
            PhoneClass::AnyPhone => token.is_phone(),
            PhoneClass::NonPhone => !token.is_phone(),
            PhoneClass::Pause => matches!(token.kind(), TokenKind::Pause(_)),
            PhoneClass::Stress => matches!(token.kind(), TokenKind::StressMarker(_)),
        }
    }
}

/// Regular expression applied to the full rendered text of a token.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    source: String,
    regex: Regex,
}

impl TextMatcher {
    pub fn new(source: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|e| {
            PatternError::InvalidTextPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(TextMatcher {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone)]
pub enum BaseMatcher {
    /// `.`: any phone.
    Any,
    Class(PhoneClass),
    /// A bare glyph: phone base or marker text.
    Glyph(char),
    Features {
        required: FeatureSet,
        excluded: FeatureSet,
        names: Vec<String>,
    },
    Text(TextMatcher),
    /// `x_y`: a compound phone whose components match each side.
    Compound(Box<BaseMatcher>, Box<BaseMatcher>),
}

impl BaseMatcher {
    /// Parse the comma separated contents of a `{...}` feature set.
    pub fn features(list: &str) -> Result<BaseMatcher> {
        let mut required = FeatureSet::empty();
        let mut excluded = FeatureSet::empty();
        let mut names = Vec::new();
        for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (negated, name) = match item.strip_prefix('-') {
                Some(rest) => (true, rest.trim()),
                None => (false, item),
            };
            let feature = FeatureSet::lookup(name).ok_or_else(|| PatternError::UnknownFeature {
                name: name.to_string(),
            })?;
            if negated {
                excluded |= feature;
            } else {
                required |= feature;
            }
            names.push(item.to_string());
        }
        Ok(BaseMatcher::Features {
            required,
            excluded,
            names,
        })
    }

    pub fn matches(&self, token: &Token) -> bool {
        match self {
            BaseMatcher::Any => token.is_phone(),
            BaseMatcher::Class(class) => class.matches(token),
            BaseMatcher::Glyph(c) => match token.kind() {
                TokenKind::Phone(p) => p.base == *c,
                TokenKind::CompoundPhone { .. } => false,
                _ => token.text().chars().eq(std::iter::once(*c)),
            },
            BaseMatcher::Features {
                required, excluded, ..
            } => {
                let features = token.features();
                token.is_phone() && features.contains(*required) && !features.intersects(*excluded)
            }
            BaseMatcher::Text(text) => text.regex.is_match(token.text()),
            BaseMatcher::Compound(first, second) => match token.kind() {
                TokenKind::CompoundPhone {
                    first: a,
                    second: b,
                    ..
                } => first.matches(a) && second.matches(b),
                _ => false,
            },
        }
    }
}

impl fmt::Display for BaseMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseMatcher::Any => f.write_str("."),
            BaseMatcher::Class(class) => write!(f, "\\{}", class.escape()),
            BaseMatcher::Glyph(c) if is_special_glyph(*c) => write!(f, "\\{c}"),
            BaseMatcher::Glyph(c) => write!(f, "{c}"),
            BaseMatcher::Features { names, .. } => write!(f, "{{{}}}", names.join(",")),
            BaseMatcher::Text(text) => write!(f, "'{}'", text.source.replace('\'', "\\'")),
            BaseMatcher::Compound(a, b) => write!(f, "{a}_{b}"),
        }
    }
}

/// Characters with a meaning of their own in pattern text.
pub(crate) fn is_special_glyph(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '(' | ')' | '|' | '*' | '+' | '?' | '{' | '}' | '<' | '>' | '^' | '$' | '\\' | '.'
                | '\'' | ':' | '_' | 'σ' | '/' | '='
        )
}

/// Base matcher plus secondary predicates, all of which must hold.
#[derive(Debug, Clone)]
pub struct TokenMatcher {
    base: BaseMatcher,
    secondary: Vec<Arc<dyn TokenPredicate>>,
}

impl TokenMatcher {
    pub fn new(base: BaseMatcher) -> Self {
        TokenMatcher {
            base,
            secondary: Vec::new(),
        }
    }

    pub fn with(mut self, predicate: Arc<dyn TokenPredicate>) -> Self {
        self.secondary.push(predicate);
        self
    }

    pub fn base(&self) -> &BaseMatcher {
        &self.base
    }

    pub fn matches(&self, token: &Token) -> bool {
        self.base.matches(token) && self.secondary.iter().all(|p| p.matches(token))
    }
}

impl fmt::Display for TokenMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for p in &self.secondary {
            write!(f, ":{p}")?;
        }
        Ok(())
    }
}

/// `sctype("O|LA")`, `sctype("-O")`, or chained shortcuts such as `:L:O`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScTypePredicate {
    allowed: Vec<ScType>,
    disallowed: Vec<ScType>,
    diphthong: bool,
}

impl ScTypePredicate {
    pub fn parse(arg: &str) -> Result<Self> {
        let mut pred = ScTypePredicate::default();
        for item in arg.split('|').map(str::trim).filter(|s| !s.is_empty()) {
            pred.add(item)?;
        }
        if pred.allowed.is_empty() && pred.disallowed.is_empty() && !pred.diphthong {
            return Err(PatternError::InvalidPredicateArgument {
                name: "sctype".into(),
                reason: "expected at least one constituent type".into(),
            });
        }
        Ok(pred)
    }

    /// Add one identifier, `-` prefixed to disallow it.
    pub fn add(&mut self, ident: &str) -> Result<()> {
        let (negated, id) = match ident.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, ident),
        };
        if !negated && id.eq_ignore_ascii_case("D") {
            self.diphthong = true;
            return Ok(());
        }
        let sctype = ScType::from_identifier(id).ok_or_else(|| PatternError::UnknownConstituent {
            ident: id.to_string(),
        })?;
        let list = if negated {
            &mut self.disallowed
        } else {
            &mut self.allowed
        };
        if !list.contains(&sctype) {
            list.push(sctype);
        }
        Ok(())
    }
}

impl TokenPredicate for ScTypePredicate {
    fn matches(&self, token: &Token) -> bool {
        let t = token.sctype();
        let allowed = if self.allowed.is_empty() && !self.diphthong {
            true
        } else {
            self.allowed.contains(&t) || (self.diphthong && token.is_diphthong_member())
        };
        allowed && !self.disallowed.contains(&t)
    }
}

impl fmt::Display for ScTypePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut items: Vec<String> = self.allowed.iter().map(|t| t.identifier().to_string()).collect();
        if self.diphthong {
            items.push("D".into());
        }
        items.extend(self.disallowed.iter().map(|t| format!("-{}", t.identifier())));
        write!(f, "sctype(\"{}\")", items.join("|"))
    }
}

/// `stress("1|2|U")`: stress of the containing syllable.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StressPredicate {
    accepted: Vec<Option<Stress>>,
    source: String,
}

impl StressPredicate {
    fn parse(arg: &str) -> Result<Self> {
        let mut accepted = Vec::new();
        for item in arg.split('|').map(str::trim).filter(|s| !s.is_empty()) {
            match item {
                "1" | "P" | "p" => accepted.push(Some(Stress::Primary)),
                "2" | "S" | "s" => accepted.push(Some(Stress::Secondary)),
                "U" | "u" => accepted.push(None),
                "A" | "a" => {
                    accepted.push(Some(Stress::Primary));
                    accepted.push(Some(Stress::Secondary));
                }
                other => {
                    return Err(PatternError::InvalidPredicateArgument {
                        name: "stress".into(),
                        reason: format!("unknown stress type '{other}'"),
                    });
                }
            }
        }
        if accepted.is_empty() {
            return Err(PatternError::InvalidPredicateArgument {
                name: "stress".into(),
                reason: "expected at least one stress type".into(),
            });
        }
        Ok(StressPredicate {
            accepted,
            source: arg.to_string(),
        })
    }
}

impl TokenPredicate for StressPredicate {
    fn matches(&self, token: &Token) -> bool {
        token.syllable().is_some() && self.accepted.contains(&token.stress())
    }
}

impl fmt::Display for StressPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stress(\"{}\")", self.source)
    }
}

/// `tone("1|2")` or `tone("-3")`: tone number of the containing syllable.
/// A leading `-` negates the whole list.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TonePredicate {
    tones: Vec<String>,
    negated: bool,
    source: String,
}

impl TonePredicate {
    fn parse(arg: &str) -> Result<Self> {
        let trimmed = arg.trim();
        let (negated, list) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let tones: Vec<String> = list
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if tones.is_empty() {
            return Err(PatternError::InvalidPredicateArgument {
                name: "tone".into(),
                reason: "expected at least one tone number".into(),
            });
        }
        if let Some(bad) = tones.iter().find(|t| !t.chars().all(|c| c.is_ascii_digit())) {
            return Err(PatternError::InvalidPredicateArgument {
                name: "tone".into(),
                reason: format!("'{bad}' is not a tone number"),
            });
        }
        Ok(TonePredicate {
            tones,
            negated,
            source: arg.to_string(),
        })
    }
}

impl TokenPredicate for TonePredicate {
    fn matches(&self, token: &Token) -> bool {
        if token.syllable().is_none() {
            return false;
        }
        let listed = token
            .tone()
            .is_some_and(|tone| self.tones.iter().any(|t| t == tone));
        listed != self.negated
    }
}

impl fmt::Display for TonePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tone(\"{}\")", self.source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiacriticPosition {
    Prefix,
    Suffix,
    Combining,
    Any,
}

impl DiacriticPosition {
    fn name(self) -> &'static str {
        match self {
            DiacriticPosition::Prefix => "prefix",
            DiacriticPosition::Suffix => "suffix",
            DiacriticPosition::Combining => "comb",
            DiacriticPosition::Any => "diacritic",
        }
    }
}

/// `prefix("ʰ")`, `suffix("ː")`, `comb("̃")`, `diacritic("ʰ|ː")`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DiacriticPredicate {
    position: DiacriticPosition,
    diacritics: Vec<char>,
    source: String,
}

impl DiacriticPredicate {
    fn parse(position: DiacriticPosition, arg: &str) -> Result<Self> {
        let diacritics: Vec<char> = arg.chars().filter(|c| *c != '|' && !c.is_whitespace()).collect();
        if diacritics.is_empty() {
            return Err(PatternError::InvalidPredicateArgument {
                name: position.name().into(),
                reason: "expected at least one diacritic".into(),
            });
        }
        Ok(DiacriticPredicate {
            position,
            diacritics,
            source: arg.to_string(),
        })
    }
}

impl TokenPredicate for DiacriticPredicate {
    fn matches(&self, token: &Token) -> bool {
        token.phones().iter().any(|p| {
            let haystack: &[&str] = match self.position {
                DiacriticPosition::Prefix => &[&p.prefix],
                DiacriticPosition::Suffix => &[&p.suffix],
                DiacriticPosition::Combining => &[&p.combining],
                DiacriticPosition::Any => &[&p.prefix, &p.combining, &p.suffix],
            };
            haystack
                .iter()
                .any(|s| s.chars().any(|c| self.diacritics.contains(&c)))
        })
    }
}

impl fmt::Display for DiacriticPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(\"{}\")", self.position.name(), self.source)
    }
}

/// Named predicates available to the compiler.
#[derive(Clone)]
pub struct PredicateRegistry {
    factories: HashMap<String, PredicateFactory>,
}

impl PredicateRegistry {
    /// A registry with no predicates at all.
    pub fn empty() -> Self {
        PredicateRegistry {
            factories: HashMap::new(),
        }
    }

    /// A registry holding the built-in predicates.
    pub fn with_builtins() -> Self {
        let mut registry = PredicateRegistry::empty();
        registry.register("sctype", |arg| {
            Ok(Arc::new(ScTypePredicate::parse(arg)?) as Arc<dyn TokenPredicate>)
        });
        registry.register("stress", |arg| {
            Ok(Arc::new(StressPredicate::parse(arg)?) as Arc<dyn TokenPredicate>)
        });
        registry.register("tone", |arg| {
            Ok(Arc::new(TonePredicate::parse(arg)?) as Arc<dyn TokenPredicate>)
        });
        for position in [
            DiacriticPosition::Prefix,
            DiacriticPosition::Suffix,
            DiacriticPosition::Combining,
            DiacriticPosition::Any,
        ] {
            registry.register(position.name(), move |arg| {
                Ok(Arc::new(DiacriticPredicate::parse(position, arg)?) as Arc<dyn TokenPredicate>)
            });
        }
        registry
    }

    /// Register (or replace) a named predicate.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&str) -> Result<Arc<dyn TokenPredicate>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, name: &str, arg: &str) -> Result<Arc<dyn TokenPredicate>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PatternError::NoSuchPredicate {
                name: name.to_string(),
            })?;
        factory(arg)
    }

    /// One-off evaluation of a named predicate against a token.
    pub fn evaluate(&self, name: &str, token: &Token, arg: &str) -> Result<bool> {
        Ok(self.create(name, arg)?.matches(token))
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        PredicateRegistry::with_builtins()
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("PredicateRegistry").field("names", &names).finish()
    }
}
