//! Raw switch scripts for `replay`.
//!
//! One action per line, times in milliseconds (one scan cycle per ms):
//!
//! ```text
//! # comment
//! 10 press 1 2      close the switch at row 1, col 2
//! 40 bounce 1 2     flip it for a single scan
//! 60 release 1 2
//! end 200           stop after the scan at 200ms
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press,
    Release,
    Bounce,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub line: usize,
    pub at_ms: u32,
    pub action: Action,
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub steps: Vec<Step>,
    pub end_ms: u32,
}

/// Scans run this long past the last step when no `end` is given.
const DEFAULT_TAIL_MS: u32 = 100;

pub fn load(path: &Path) -> Result<Script> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse(&text).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse(input: &str) -> Result<Script> {
    let mut steps: Vec<Step> = Vec::new();
    let mut end_ms = None;

    for (line_num, line) in input.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if end_ms.is_some() {
            bail!("line {}: nothing may follow 'end'", line_num);
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if let ["end", ms] = fields[..] {
            end_ms = Some(parse_field(ms, "time", line_num)?);
            continue;
        }

        let [at, action, row, col] = fields[..] else {
            bail!("line {}: expected '<ms> <action> <row> <col>'", line_num);
        };
        let action = match action {
            "press" => Action::Press,
            "release" => Action::Release,
            "bounce" => Action::Bounce,
            other => bail!("line {}: unknown action '{}'", line_num, other),
        };
        let step = Step {
            line: line_num,
            at_ms: parse_field(at, "time", line_num)?,
            action,
            row: parse_field(row, "row", line_num)?,
            col: parse_field(col, "col", line_num)?,
        };

        if let Some(last) = steps.last() {
            if step.at_ms < last.at_ms {
                bail!(
                    "line {}: time {} goes backwards (previous step at {})",
                    line_num,
                    step.at_ms,
                    last.at_ms
                );
            }
        }
        steps.push(step);
    }

    let last_ms = steps.last().map_or(0, |s| s.at_ms);
    let end_ms = end_ms.unwrap_or(last_ms.saturating_add(DEFAULT_TAIL_MS));
    if end_ms < last_ms {
        bail!("end {} is before the last step at {}", end_ms, last_ms);
    }

    Ok(Script { steps, end_ms })
}

fn parse_field<T: std::str::FromStr>(text: &str, what: &str, line_num: usize) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.parse()
        .with_context(|| format!("line {}: invalid {} '{}'", line_num, what, text))
}

impl Script {
    /// Make sure every step addresses a key inside a `rows` x `cols` matrix.
    pub fn check_bounds(&self, rows: usize, cols: usize) -> Result<()> {
        for step in &self.steps {
            if step.row >= rows || step.col >= cols {
                bail!(
                    "line {}: key ({}, {}) is outside the {}x{} matrix",
                    step.line,
                    step.row,
                    step.col,
                    rows,
                    cols
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = parse(
            "# hold one key\n\
             10 press 1 2\n\
             \n\
             40 bounce 1 2   # single glitch\n\
             60 release 1 2\n\
             end 200\n",
        )
        .unwrap();
        assert_eq!(script.end_ms, 200);
        assert_eq!(script.steps.len(), 3);
        assert_eq!(
            script.steps[1],
            Step { line: 4, at_ms: 40, action: Action::Bounce, row: 1, col: 2 }
        );
    }

    #[test]
    fn test_default_end() {
        let script = parse("5 press 0 0\n").unwrap();
        assert_eq!(script.end_ms, 5 + DEFAULT_TAIL_MS);
        assert_eq!(parse("").unwrap().end_ms, DEFAULT_TAIL_MS);
    }

    #[test]
    fn test_unknown_action() {
        let err = parse("1 press 0 0\n2 tap 0 0\n").unwrap_err();
        assert_eq!(err.to_string(), "line 2: unknown action 'tap'");
    }

    #[test]
    fn test_bad_number() {
        let err = parse("1 press x 0\n").unwrap_err();
        assert!(err.to_string().starts_with("line 1: invalid row"));
    }

    #[test]
    fn test_time_goes_backwards() {
        assert!(parse("10 press 0 0\n5 release 0 0\n").is_err());
        assert!(parse("10 press 0 0\nend 5\n").is_err());
        assert!(parse("end 5\n1 press 0 0\n").is_err());
    }

    #[test]
    fn test_check_bounds() {
        let script = parse("1 press 3 0\n").unwrap();
        assert!(script.check_bounds(4, 4).is_ok());
        let err = script.check_bounds(3, 4).unwrap_err();
        assert!(err.to_string().contains("outside the 3x4 matrix"));
    }
}
