// src/process/command.rs

use std::fmt;

/// A command line split into an executable and its arguments.
///
/// Splitting is on whitespace only. There is no quoting or escaping, so an
/// argument can never contain a space, and no shell is involved: `a | b`
/// passes `|` and `b` as literal arguments to `a`. Anything that needs a
/// shell belongs in a script file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Returns `None` if `line` contains no token at all.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let program = tokens.next()?.to_string();
        Some(Self {
            program,
            args: tokens.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_any_whitespace() {
        let cmd = CommandLine::parse("  cargo   run\t--release  ").unwrap();
        assert_eq!(cmd.program, "cargo");
        assert_eq!(cmd.args, vec!["run", "--release"]);
        assert_eq!(cmd.to_string(), "cargo run --release");
    }

    #[test]
    fn keeps_the_last_argument() {
        let cmd = CommandLine::parse("sleep 10").unwrap();
        assert_eq!(cmd.args, vec!["10"]);
    }

    #[test]
    fn quotes_are_not_interpreted() {
        let cmd = CommandLine::parse(r#"echo "hello world""#).unwrap();
        assert_eq!(cmd.args, vec![r#""hello"#, r#"world""#]);
    }

    #[test]
    fn blank_is_none() {
        assert_eq!(CommandLine::parse(""), None);
        assert_eq!(CommandLine::parse("   \t"), None);
    }
}
