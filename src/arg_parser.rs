//! Argument classification for the restricted command-line grammar.
//!
//! Every token is one of: a long flag (`--name` or `--name=value`), a cluster
//! of short flags (`-abc`), or a positional noun. There is no terminator: a
//! lone `--` is rejected outright, and nothing after it would be treated
//! differently anyway.

use crate::error::Violation;

/// Classification of a single command-line token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType<'a> {
    /// `--name` or `--name=value`. A missing `=value` is the empty value.
    Long { name: &'a str, value: &'a str },
    /// `-abc`: each character is its own value-less flag.
    Short(&'a str),
    /// Anything not starting with `-`, plus the lone `-` and the empty string.
    Noun(&'a str),
}

/// Classify a single token.
///
/// # Rules
///
/// - `-`, the empty string, and anything not starting with `-` are nouns
/// - `--` alone is rejected
/// - `---x` and `--=x` are rejected as malformed
/// - `-x...` containing `=` anywhere is rejected (short flags take no value)
pub fn classify_arg(arg: &str) -> Result<ArgType<'_>, Violation> {
    if arg.len() < 2 || !arg.starts_with('-') {
        return Ok(ArgType::Noun(arg));
    }

    if let Some(body) = arg.strip_prefix("--") {
        if body.is_empty() {
            return Err(Violation::BareDoubleDash);
        }
        if body.starts_with('-') || body.starts_with('=') {
            return Err(Violation::MalformedFlag {
                arg: arg.to_string(),
            });
        }
        let (name, value) = body.split_once('=').unwrap_or((body, ""));
        return Ok(ArgType::Long { name, value });
    }

    let cluster = &arg[1..];
    if cluster.contains('=') {
        return Err(Violation::ShortFlagValue {
            arg: arg.to_string(),
        });
    }
    Ok(ArgType::Short(cluster))
}

/// Classify an argv left to right.
///
/// The iterator yields each token's classification in order; callers stop at
/// the first `Err` so that the earliest bad token decides the outcome.
pub fn parse_argv(argv: &[String]) -> impl Iterator<Item = Result<ArgType<'_>, Violation>> {
    argv.iter().map(|arg| classify_arg(arg))
}
