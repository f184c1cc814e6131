use std::ops::Range;

use phonex::{Match, Program, Transcript};

const COLOR_START: &str = "\x1b[01;31m";
const COLOR_RESET: &str = "\x1b[m";

pub fn maybe_colorize(s: &str, use_color: bool) -> String {
    if use_color {
        format!("{COLOR_START}{s}{COLOR_RESET}")
    } else {
        s.to_string()
    }
}

/// Render a transcript with the given (sorted, disjoint) token spans highlighted.
pub fn highlight(transcript: &Transcript, spans: &[Range<usize>], use_color: bool) -> String {
    let mut out = String::new();
    let mut last = 0;
    for span in spans {
        out.push_str(&transcript.text_of(last..span.start));
        out.push_str(&maybe_colorize(&transcript.text_of(span.clone()), use_color));
        last = span.end;
    }
    out.push_str(&transcript.text_of(last..transcript.len()));
    out
}

/// `[start..end) 1=kʀ C=k 3=-` for one match.
pub fn describe_groups(program: &Program, found: &Match, transcript: &Transcript) -> String {
    let mut out = format!("[{}..{})", found.start(), found.end());
    for (index, span) in found.groups() {
        let key = program
            .group_name(index)
            .map_or_else(|| index.to_string(), str::to_string);
        let text = match span {
            Some(span) => transcript.text_of(span),
            None => "-".to_string(),
        };
        out.push_str(&format!(" {key}={text}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_spans() {
        let t: Transcript = "bada".parse().unwrap();
        assert_eq!(highlight(&t, &[1..2, 3..4], false), "bada");
        assert_eq!(
            highlight(&t, &[1..2], true),
            format!("b{COLOR_START}a{COLOR_RESET}da")
        );
    }

    #[test]
    fn describes_named_and_missing_groups() {
        let program = phonex::compile(r"(C=\c)(\v)?").unwrap();
        let t: Transcript = "b".parse().unwrap();
        let found = program.matcher(&t).find().unwrap();
        assert_eq!(describe_groups(&program, &found, &t), "[0..1) C=b 2=-");
    }
}
