use std::fs;
use std::io::{self, Read, Write};

use anyhow::Context;
use phonex::Program;

use crate::cli::{Config, resolve_use_color};
use crate::fs_walk::collect_files;
use crate::search::{SearchOptions, process_input};

/// Exit status for an invalid pattern or an I/O failure.
pub const EXIT_ERROR: i32 = 2;

pub fn run(cfg: Config) -> anyhow::Result<i32> {
    let program: Program = match phonex::compile(&cfg.pattern) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("phonex-grep: invalid pattern: {err}");
            return Ok(EXIT_ERROR);
        }
    };
    log::debug!("pattern {program} has {} groups", program.group_count());

    let opts = SearchOptions {
        only_matching: cfg.only_matching,
        whole: cfg.whole,
        count: cfg.count,
        groups: cfg.groups,
        use_color: resolve_use_color(cfg.color),
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut matched = 0;

    if cfg.paths.is_empty() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("reading standard input")?;
        matched += process_input(&buffer, &program, "(standard input)", "", &opts, &mut out)?;
    } else {
        let mut files = Vec::new();
        for p in &cfg.paths {
            files.extend(collect_files(p, cfg.recursive));
        }
        let show_filename = cfg.recursive || files.len() > 1;

        for path in files {
            let name = path.to_string_lossy();
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    log::warn!("{name}: {err}");
                    continue;
                }
            };
            let prefix = if show_filename {
                format!("{name}:")
            } else {
                String::new()
            };
            matched += process_input(&content, &program, &name, &prefix, &opts, &mut out)
                .with_context(|| format!("writing results for {name}"))?;
        }
    }

    out.flush().context("flushing output")?;
    Ok(if matched > 0 { 0 } else { 1 })
}
