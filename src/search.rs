use std::io::{self, Write};

use phonex::{Program, Transcript};

use crate::output::{describe_groups, highlight, maybe_colorize};

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub only_matching: bool,
    pub whole: bool,
    pub count: bool,
    pub groups: bool,
    pub use_color: bool,
}

/// Search every line of `content` as a transcript and print the results.
/// Returns the number of matching transcripts.
pub fn process_input<W: Write>(
    content: &str,
    program: &Program,
    source: &str,
    prefix: &str,
    opts: &SearchOptions,
    out: &mut W,
) -> io::Result<usize> {
    let mut matched_lines = 0;

    for (lineno, line) in content.lines().enumerate() {
        let transcript: Transcript = match line.parse() {
            Ok(t) => t,
            Err(err) => {
                log::warn!("{source}:{}: skipping transcript: {err}", lineno + 1);
                continue;
            }
        };

        let found = if opts.whole {
            let mut matcher = program.matcher(&transcript);
            if matcher.matches() {
                matcher.current().cloned().into_iter().collect()
            } else {
                Vec::new()
            }
        } else {
            program.find_iter(&transcript).collect::<Vec<_>>()
        };
        if found.is_empty() {
            continue;
        }
        matched_lines += 1;
        if opts.count {
            continue;
        }

        if opts.only_matching {
            for m in &found {
                let text = maybe_colorize(&transcript.text_of(m.span()), opts.use_color);
                writeln!(out, "{prefix}{text}")?;
                if opts.groups {
                    writeln!(out, "\t{}", describe_groups(program, m, &transcript))?;
                }
            }
        } else {
            let spans: Vec<_> = found.iter().map(|m| m.span()).collect();
            writeln!(out, "{prefix}{}", highlight(&transcript, &spans, opts.use_color))?;
            if opts.groups {
                for m in &found {
                    writeln!(out, "\t{}", describe_groups(program, m, &transcript))?;
                }
            }
        }
    }

    if opts.count {
        writeln!(out, "{prefix}{matched_lines}")?;
    }
    Ok(matched_lines)
}
