//! Reader for the compact transcript notation used by the CLI and tests.
//!
//! Each phone may carry a `:X` constituent suffix (`b:Oa:N`), `D` marking a
//! diphthong member. Superscript digits after a phone are its tone number.
//! Tie bars join compound phones, `ˈ`/`ˌ` are stress markers, `.` is a
//! syllable boundary, whitespace a word boundary, `^` and `(.)`/`(..)`/`(...)`
//! are pauses and `↔` is an alignment marker.

use std::iter::{Enumerate, Peekable};
use std::str::{Chars, FromStr};

use super::error::TranscriptError;
use super::token::{PauseLength, Phone, ScType, Stress, Token, TokenKind, Transcript, tone_digit};

type CharStream<'a> = Peekable<Enumerate<Chars<'a>>>;

pub fn parse_transcript(input: &str) -> Result<Transcript, TranscriptError> {
    let mut tokens = Vec::new();
    let mut chars = input.trim().chars().enumerate().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
                tokens.push(Token::new(TokenKind::WordBoundary));
            }
            'ˈ' => {
                chars.next();
                tokens.push(Token::new(TokenKind::StressMarker(Stress::Primary)));
            }
            'ˌ' => {
                chars.next();
                tokens.push(Token::new(TokenKind::StressMarker(Stress::Secondary)));
            }
            '.' => {
                chars.next();
                tokens.push(Token::new(TokenKind::SyllableBoundary));
            }
            '^' => {
                chars.next();
                tokens.push(Token::new(TokenKind::Pause(PauseLength::IntraWord)));
            }
            '↔' => {
                chars.next();
                tokens.push(Token::new(TokenKind::AlignmentMarker));
            }
            '(' => {
                chars.next();
                tokens.push(Token::new(TokenKind::Pause(read_pause(&mut chars, pos)?)));
            }
            _ => tokens.push(read_phone_token(&mut chars)?),
        }
    }

    Ok(Transcript::new(tokens))
}

impl FromStr for Transcript {
    type Err = TranscriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_transcript(s)
    }
}

fn read_pause(chars: &mut CharStream<'_>, start: usize) -> Result<PauseLength, TranscriptError> {
    let mut dots = 0;
    while chars.next_if(|(_, c)| *c == '.').is_some() {
        dots += 1;
    }
    match (chars.next(), dots) {
        (Some((_, ')')), 1) => Ok(PauseLength::Short),
        (Some((_, ')')), 2) => Ok(PauseLength::Medium),
        (Some((_, ')')), 3) => Ok(PauseLength::Long),
        _ => Err(TranscriptError::UnterminatedPause { pos: start }),
    }
}

fn read_phone_token(chars: &mut CharStream<'_>) -> Result<Token, TranscriptError> {
    let mut token = Token::new(TokenKind::Phone(read_phone(chars)?));

    while let Some((pos, tie)) = chars.next_if(|(_, c)| is_tie(*c)) {
        if chars.peek().is_none_or(|(_, c)| !is_base(*c)) {
            return Err(TranscriptError::DanglingTie { pos });
        }
        let second = Token::new(TokenKind::Phone(read_phone(chars)?));
        token = Token::compound(token, tie, second);
    }

    if let Some((pos, _)) = chars.next_if(|(_, c)| *c == ':') {
        let Some((id_pos, id)) = chars.next() else {
            return Err(TranscriptError::MissingConstituent { pos });
        };
        token = if id.eq_ignore_ascii_case(&'d') {
            token.diphthong()
        } else {
            let sctype = ScType::from_identifier(&id.to_string())
                .filter(|t| t.template_rank().is_some() || *t == ScType::Ambisyllabic || *t == ScType::Oehs)
                .ok_or(TranscriptError::UnknownConstituent { ch: id, pos: id_pos })?;
            token.with_sctype(sctype)
        };
    }

    Ok(token)
}

fn read_phone(chars: &mut CharStream<'_>) -> Result<Phone, TranscriptError> {
    let mut prefix = String::new();
    while let Some((_, c)) = chars.next_if(|(_, c)| is_prefix_diacritic(*c)) {
        prefix.push(c);
    }

    let base = match chars.next() {
        Some((_, c)) if is_base(c) => c,
        Some((pos, ch)) => return Err(TranscriptError::UnexpectedChar { ch, pos }),
        None => {
            // a lone modifier letter is a phone of its own
            let mut it = prefix.chars();
            match (it.next_back(), it.as_str()) {
                (Some(base), rest) => {
                    let mut phone = Phone::new(base);
                    phone.prefix = rest.to_string();
                    return Ok(phone);
                }
                (None, _) => return Err(TranscriptError::UnexpectedChar { ch: ' ', pos: 0 }),
            }
        }
    };

    let mut phone = Phone::new(base);
    phone.prefix = prefix;
    while let Some((_, c)) = chars.next_if(|(_, c)| is_combining(*c)) {
        phone.combining.push(c);
    }
    while let Some((_, c)) = chars.next_if(|(_, c)| is_suffix_diacritic(*c)) {
        phone.suffix.push(c);
    }
    Ok(phone)
}

fn is_tie(c: char) -> bool {
    matches!(c, '\u{0361}' | '\u{035C}')
}

fn is_combining(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c) && !is_tie(c)
}

fn is_prefix_diacritic(c: char) -> bool {
    matches!(c, 'ⁿ' | 'ᵐ' | 'ᵑ' | 'ʰ' | 'ʱ' | 'ˀ')
}

fn is_suffix_diacritic(c: char) -> bool {
    matches!(
        c,
        'ʰ' | 'ʱ' | 'ʷ' | 'ʲ' | 'ˠ' | 'ˤ' | 'ː' | 'ˑ' | 'ⁿ' | 'ˡ' | 'ʼ' | '˞'
    ) || tone_digit(c).is_some()
}

fn is_base(c: char) -> bool {
    !(c.is_whitespace()
        || is_tie(c)
        || is_combining(c)
        || is_suffix_diacritic(c)
        || is_prefix_diacritic(c)
        || matches!(c, 'ˈ' | 'ˌ' | '.' | '^' | '↔' | '(' | ')' | ':'))
}
