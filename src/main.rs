use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use anyhow::{bail, Context, Result};
use hybrid_regex::{Matcher, Options};

struct Args {
    pattern: String,
    options: Options,
    only_matching: bool,
}

// Usage: hybrid-grep [-i] [-m] [-s] [-o] -E <pattern>
fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut pattern = None;
    let mut options = Options::default();
    let mut only_matching = false;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-E" => pattern = Some(args.next().context("expected a pattern after '-E'")?),
            "-i" => options = options.case_insensitive(true),
            "-m" => options = options.multiline(true),
            "-s" => options = options.dot_all(true),
            "-o" => only_matching = true,
            other => bail!("unexpected argument {:?}", other),
        }
    }
    let Some(pattern) = pattern else {
        bail!("expected '-E <pattern>'");
    };
    Ok(Args {
        pattern,
        options,
        only_matching,
    })
}

// Prints matching lines (or only the matched parts) and reports whether any
// line matched.
fn run() -> Result<bool> {
    let args = parse_args(env::args().skip(1))?;
    let matcher = Matcher::new(&args.pattern, args.options)
        .with_context(|| format!("cannot compile pattern {:?}", args.pattern))?;

    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    let mut matched = false;
    for line in stdin.lock().lines() {
        let line = line.context("failed to read input")?;
        if args.only_matching {
            for found in matcher.find_iter(&line).filter(|c| !c.as_str().is_empty()) {
                matched = true;
                writeln!(out, "{}", found.as_str())?;
            }
        } else if matcher.is_match(&line) {
            matched = true;
            writeln!(out, "{}", line)?;
        }
    }
    Ok(matched)
}

fn main() {
    env_logger::init();
    match run() {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("error: {:#}", err);
            process::exit(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_flags_map_to_options() {
        let parsed = args(&["-i", "-s", "-o", "-E", "a.b"]).unwrap();
        assert_eq!(parsed.pattern, "a.b");
        assert!(parsed.options.case_insensitive);
        assert!(parsed.options.dot_all);
        assert!(!parsed.options.multiline);
        assert!(parsed.only_matching);
    }

    #[test]
    fn test_missing_pattern() {
        assert!(args(&["-i"]).is_err());
        assert!(args(&["-E"]).is_err());
        assert!(args(&["-x", "-E", "a"]).is_err());
    }
}
