//! Phonex: regular-expression-like patterns over phonological transcripts.
//!
//! ```
//! let program = phonex::compile(r"(C=\c)\v").unwrap();
//! let transcript: phonex::Transcript = "ˈkʀət͡jə".parse().unwrap();
//! let found = program.matcher(&transcript).find().unwrap();
//! assert_eq!(found.named("C"), Some(2..3));
//! ```

pub mod phonex;

pub use phonex::{
    Compiler, ErrorKind, GroupKey, Match, Matcher, PatternError, PredicateRegistry, Program,
    ScType, Token, TokenPredicate, Transcript, TranscriptError, compile,
};
