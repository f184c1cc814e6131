use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorWhen {
    Always,
    Never,
    Auto,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "phonex-grep")]
#[command(about = "Search phonological transcripts with phonex patterns")]
#[command(version)]
pub struct Config {
    /// Phonex pattern
    pub pattern: String,

    /// Files or directories holding one transcript per line (stdin when empty)
    pub paths: Vec<PathBuf>,

    /// Print only the matched tokens
    #[arg(short = 'o', long)]
    pub only_matching: bool,

    /// Only select transcripts matched as a whole
    #[arg(short = 'x', long)]
    pub whole: bool,

    /// Print the number of matching transcripts per input
    #[arg(short = 'c', long)]
    pub count: bool,

    /// Print the span of every capturing group
    #[arg(short = 'g', long)]
    pub groups: bool,

    /// Search directories recursively
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Highlight matches
    #[arg(long, value_enum, default_value_t = ColorWhen::Never)]
    pub color: ColorWhen,
}

pub fn resolve_use_color(color: ColorWhen) -> bool {
    match color {
        ColorWhen::Always => true,
        ColorWhen::Never => false,
        ColorWhen::Auto => io::stdout().is_terminal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_paths() {
        let cfg = Config::try_parse_from(["phonex-grep", "-o", "-g", "--color=always", r"\c\v", "a.txt"])
            .unwrap();
        assert_eq!(cfg.pattern, r"\c\v");
        assert!(cfg.only_matching && cfg.groups);
        assert!(!cfg.whole && !cfg.count && !cfg.recursive);
        assert_eq!(cfg.color, ColorWhen::Always);
        assert_eq!(cfg.paths, vec![PathBuf::from("a.txt")]);
    }

    #[test]
    fn colour_defaults_to_never() {
        let cfg = Config::try_parse_from(["phonex-grep", "σ"]).unwrap();
        assert_eq!(cfg.color, ColorWhen::Never);
        assert!(!resolve_use_color(cfg.color));
        assert!(cfg.paths.is_empty());
    }

    #[test]
    fn pattern_is_required() {
        assert!(Config::try_parse_from(["phonex-grep"]).is_err());
    }
}
