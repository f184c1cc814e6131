pub mod ast;
pub mod error;
pub mod features;
pub mod groups;
pub mod matcher;
pub mod parser;
pub mod predicate;
pub mod program;
pub mod token;
pub mod transcript;

pub use error::{ErrorKind, PatternError, TranscriptError};
pub use features::FeatureSet;
pub use matcher::{GroupKey, Match, Matcher, Matches};
pub use parser::{Compiler, compile};
pub use predicate::{PredicateRegistry, TokenPredicate};
pub use program::Program;
pub use token::{ScType, Token, TokenKind, Transcript};
pub use transcript::parse_transcript;
