//! The element alphabet phonex patterns match over.
//!
//! A [`Transcript`] owns an immutable list of [`Token`]s. Building one
//! computes the syllable segmentation that `σ`, `\S` and the syllable
//! predicates rely on.

use std::fmt;
use std::ops::Range;

use super::features::FeatureSet;

/// Syllable constituent types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScType {
    LeftAppendix,
    Onset,
    Nucleus,
    Coda,
    RightAppendix,
    Oehs,
    Ambisyllabic,
    Unknown,
    SyllableBoundaryMarker,
    SyllableStressMarker,
    WordBoundaryMarker,
}

const SCTYPE_IDS: &[(ScType, &str, char)] = &[
    (ScType::LeftAppendix, "LA", 'L'),
    (ScType::Onset, "O", 'O'),
    (ScType::Nucleus, "N", 'N'),
    (ScType::Coda, "C", 'C'),
    (ScType::RightAppendix, "RA", 'R'),
    (ScType::Oehs, "OEHS", 'E'),
    (ScType::Ambisyllabic, "AS", 'A'),
    (ScType::Unknown, "UK", 'U'),
    (ScType::SyllableBoundaryMarker, "SB", 'B'),
    (ScType::SyllableStressMarker, "SS", 'S'),
    (ScType::WordBoundaryMarker, "WB", 'W'),
];

impl ScType {
    /// Short identifier, e.g. `LA` or `O`.
    pub fn identifier(self) -> &'static str {
        SCTYPE_IDS
            .iter()
            .find(|(t, _, _)| *t == self)
            .map(|(_, id, _)| *id)
            .unwrap_or("UK")
    }

    /// Single character mnemonic, e.g. `L` or `O`.
    pub fn mnemonic(self) -> char {
        SCTYPE_IDS
            .iter()
            .find(|(t, _, _)| *t == self)
            .map(|(_, _, m)| *m)
            .unwrap_or('U')
    }

    /// Resolve an identifier or mnemonic, ignoring case. `D` (diphthong
    /// member) resolves to [`ScType::Nucleus`].
    pub fn from_identifier(ident: &str) -> Option<ScType> {
        if ident.eq_ignore_ascii_case("D") {
            return Some(ScType::Nucleus);
        }
        SCTYPE_IDS
            .iter()
            .find(|(_, id, m)| {
                id.eq_ignore_ascii_case(ident)
                    || (ident.chars().count() == 1
                        && ident.chars().all(|c| c.eq_ignore_ascii_case(m)))
            })
            .map(|(t, _, _)| *t)
    }

    /// Position in the LA < O < N < C < RA syllable template.
    pub fn template_rank(self) -> Option<u8> {
        match self {
            ScType::LeftAppendix => Some(0),
            ScType::Onset => Some(1),
            ScType::Nucleus => Some(2),
            ScType::Coda => Some(3),
            ScType::RightAppendix => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for ScType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stress {
    Primary,
    Secondary,
}

impl Stress {
    pub fn glyph(self) -> char {
        match self {
            Stress::Primary => 'ˈ',
            Stress::Secondary => 'ˌ',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PauseLength {
    IntraWord,
    Short,
    Medium,
    Long,
}

impl PauseLength {
    pub fn text(self) -> &'static str {
        match self {
            PauseLength::IntraWord => "^",
            PauseLength::Short => "(.)",
            PauseLength::Medium => "(..)",
            PauseLength::Long => "(...)",
        }
    }
}

/// A single phone: base glyph plus diacritics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Phone {
    pub prefix: String,
    pub base: char,
    pub combining: String,
    pub suffix: String,
}

impl Phone {
    pub fn new(base: char) -> Self {
        Phone {
            prefix: String::new(),
            base,
            combining: String::new(),
            suffix: String::new(),
        }
    }

    /// Tone number spelled by superscript digits in the suffix (`a²³⁴` is
    /// `"234"`).
    pub fn tone_number(&self) -> Option<String> {
        let digits: String = self.suffix.chars().filter_map(tone_digit).collect();
        (!digits.is_empty()).then_some(digits)
    }

    pub fn text(&self) -> String {
        let mut s = String::with_capacity(self.prefix.len() + self.suffix.len() + 8);
        s.push_str(&self.prefix);
        s.push(self.base);
        s.push_str(&self.combining);
        s.push_str(&self.suffix);
        s
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Phone(Phone),
    CompoundPhone {
        first: Box<Token>,
        tie: char,
        second: Box<Token>,
    },
    Pause(PauseLength),
    StressMarker(Stress),
    SyllableBoundary,
    WordBoundary,
    AlignmentMarker,
}

/// One phonological element of a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    text: String,
    sctype: ScType,
    diphthong: bool,
    syllable: Option<usize>,
    stress: Option<Stress>,
    tone: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind) -> Self {
        let (text, sctype) = match &kind {
            TokenKind::Phone(p) => (p.text(), ScType::Unknown),
            TokenKind::CompoundPhone { first, tie, second } => {
                (format!("{}{}{}", first.text, tie, second.text), ScType::Unknown)
            }
            TokenKind::Pause(len) => (len.text().to_string(), ScType::Unknown),
            TokenKind::StressMarker(s) => (s.glyph().to_string(), ScType::SyllableStressMarker),
            TokenKind::SyllableBoundary => (".".to_string(), ScType::SyllableBoundaryMarker),
            TokenKind::WordBoundary => (" ".to_string(), ScType::WordBoundaryMarker),
            TokenKind::AlignmentMarker => ("↔".to_string(), ScType::Unknown),
        };
        Token {
            kind,
            text,
            sctype,
            diphthong: false,
            syllable: None,
            stress: None,
            tone: None,
        }
    }

    pub fn phone(base: char) -> Self {
        Token::new(TokenKind::Phone(Phone::new(base)))
    }

    pub fn compound(first: Token, tie: char, second: Token) -> Self {
        Token::new(TokenKind::CompoundPhone {
            first: Box::new(first),
            tie,
            second: Box::new(second),
        })
    }

    pub fn with_sctype(mut self, sctype: ScType) -> Self {
        self.sctype = sctype;
        self
    }

    /// Mark this token as a member of a diphthong nucleus.
    pub fn diphthong(mut self) -> Self {
        self.sctype = ScType::Nucleus;
        self.diphthong = true;
        self
    }

    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sctype(&self) -> ScType {
        self.sctype
    }

    pub fn is_diphthong_member(&self) -> bool {
        self.diphthong
    }

    /// Index of the containing syllable, once part of a [`Transcript`].
    pub fn syllable(&self) -> Option<usize> {
        self.syllable
    }

    /// Stress of the containing syllable.
    pub fn stress(&self) -> Option<Stress> {
        self.stress
    }

    /// Tone number of the containing syllable.
    pub fn tone(&self) -> Option<&str> {
        self.tone.as_deref()
    }

    pub fn is_phone(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Phone(_) | TokenKind::CompoundPhone { .. }
        )
    }

    /// Component phones; a basic phone yields itself.
    pub fn phones(&self) -> Vec<&Phone> {
        match &self.kind {
            TokenKind::Phone(p) => vec![p],
            TokenKind::CompoundPhone { first, second, .. } => {
                let mut v = first.phones();
                v.extend(second.phones());
                v
            }
            _ => Vec::new(),
        }
    }

    pub fn features(&self) -> FeatureSet {
        self.phones()
            .iter()
            .fold(FeatureSet::empty(), |acc, p| acc | FeatureSet::for_glyph(p.base))
    }

    fn is_vowel(&self) -> bool {
        self.is_phone() && self.features().contains(FeatureSet::VOWEL)
    }
}

/// An immutable, syllabified sequence of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    tokens: Vec<Token>,
    syllables: Vec<Range<usize>>,
}

impl Transcript {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !has_syllable_information(&tokens) {
            assign_default_constituents(&mut tokens);
        }
        let syllables = segment_syllables(&tokens);
        for (index, range) in syllables.iter().enumerate() {
            let stress = match tokens[range.start].kind {
                TokenKind::StressMarker(s) => Some(s),
                _ => None,
            };
            let tone = tokens[range.clone()]
                .iter()
                .flat_map(Token::phones)
                .find_map(Phone::tone_number);
            for token in &mut tokens[range.clone()] {
                token.syllable = Some(index);
                token.stress = stress;
                token.tone = tone.clone();
            }
        }
        Transcript { tokens, syllables }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn syllables(&self) -> &[Range<usize>] {
        &self.syllables
    }

    pub fn syllable_of(&self, index: usize) -> Option<usize> {
        self.tokens.get(index).and_then(|t| t.syllable)
    }

    /// Zero-width syllable boundary test for the position before `pos`.
    pub fn is_syllable_boundary(&self, pos: usize) -> bool {
        if pos == 0 || pos == self.len() {
            return true;
        }
        pos < self.len() && self.syllable_of(pos - 1) != self.syllable_of(pos)
    }

    /// Rendered text of a token range.
    pub fn text_of(&self, range: Range<usize>) -> String {
        self.tokens[range].iter().map(Token::text).collect()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            f.write_str(token.text())?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

fn has_syllable_information(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .any(|t| t.is_phone() && t.sctype != ScType::Unknown)
}

/// Vowels become nuclei; within a word, consonants before a vowel are onsets
/// unless a boundary marker separates them from it, the rest are codas.
fn assign_default_constituents(tokens: &mut [Token]) {
    let mut word_start = 0;
    while word_start < tokens.len() {
        let word_end = tokens[word_start..]
            .iter()
            .position(|t| {
                matches!(
                    t.kind,
                    TokenKind::WordBoundary | TokenKind::Pause(_) | TokenKind::AlignmentMarker
                )
            })
            .map_or(tokens.len(), |p| word_start + p);
        syllabify_word(&mut tokens[word_start..word_end]);
        word_start = word_end + 1;
    }
}

fn syllabify_word(word: &mut [Token]) {
    let vowels: Vec<usize> = (0..word.len()).filter(|&i| word[i].is_vowel()).collect();
    if vowels.is_empty() {
        return;
    }
    for i in 0..word.len() {
        if !word[i].is_phone() {
            continue;
        }
        word[i].sctype = if word[i].is_vowel() {
            ScType::Nucleus
        } else {
            match vowels.iter().find(|&&v| v > i) {
                Some(&next) if !word[i + 1..next].iter().any(is_syllable_marker) => ScType::Onset,
                _ => ScType::Coda,
            }
        };
    }
}

fn is_syllable_marker(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::StressMarker(_) | TokenKind::SyllableBoundary
    )
}

fn segment_syllables(tokens: &[Token]) -> Vec<Range<usize>> {
    let mut syllables = Vec::new();
    let mut open: Option<usize> = None;
    let mut prev: Option<(ScType, bool)> = None;

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::StressMarker(_) => {
                if let Some(start) = open.replace(i) {
                    syllables.push(start..i);
                }
                prev = None;
            }
            TokenKind::SyllableBoundary
            | TokenKind::WordBoundary
            | TokenKind::Pause(_)
            | TokenKind::AlignmentMarker => {
                if let Some(start) = open.take() {
                    syllables.push(start..i);
                }
                prev = None;
            }
            TokenKind::Phone(_) | TokenKind::CompoundPhone { .. } => {
                let current = (token.sctype, token.diphthong);
                match open {
                    Some(start) if starts_new_syllable(prev, current) => {
                        syllables.push(start..i);
                        open = Some(i);
                    }
                    Some(_) => {}
                    None => open = Some(i),
                }
                if token.sctype.template_rank().is_some() {
                    prev = Some(current);
                }
            }
        }
    }
    if let Some(start) = open {
        syllables.push(start..tokens.len());
    }
    syllables
}

fn starts_new_syllable(prev: Option<(ScType, bool)>, current: (ScType, bool)) -> bool {
    let Some((prev_type, prev_diphthong)) = prev else {
        return false;
    };
    let (cur_type, cur_diphthong) = current;
    match (prev_type.template_rank(), cur_type.template_rank()) {
        (Some(p), Some(c)) => {
            c < p || (p == 2 && c == 2 && !(prev_diphthong && cur_diphthong))
        }
        _ => false,
    }
}

/// ASCII digit for a superscript tone digit.
pub fn tone_digit(c: char) -> Option<char> {
    match c {
        '⁰' => Some('0'),
        '¹' => Some('1'),
        '²' => Some('2'),
        '³' => Some('3'),
        '⁴'..='⁹' => char::from_digit(c as u32 - '⁰' as u32, 10),
        _ => None,
    }
}
