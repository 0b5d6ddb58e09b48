//! Molecular-dynamics parameter (`.mdp`) blocks.
//!
//! An `.mdp` file is a flat list of `key = value` lines with optional `;` comments.
//! [`MdpBlock`] keeps lines in order so that a rendered block reads exactly like a
//! hand-written file, comments included.

pub mod presets;
pub mod writer;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KEY_WIDTH: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MdpLine {
    Parameter { key: String, value: String },
    Comment(String),
    Blank,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MdpBlock {
    lines: Vec<MdpLine>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MdpParseError {
    #[error("Line {line}: expected 'key = value', found '{content}'")]
    MissingSeparator { line: usize, content: String },
    #[error("Line {line}: parameter name is empty")]
    EmptyKey { line: usize },
}

impl MdpBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter line without checking for an existing key.
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.lines.push(MdpLine::Parameter {
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn comment(mut self, text: &str) -> Self {
        self.lines.push(MdpLine::Comment(text.to_string()));
        self
    }

    pub fn blank(mut self) -> Self {
        self.lines.push(MdpLine::Blank);
        self
    }

    /// Sets `key` to `value`, replacing the existing line in place or appending a
    /// new one. Keys are matched with `-` and `_` treated as equivalent, the same
    /// way the engine's preprocessor reads them.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        let wanted = normalize_key(key);
        for line in &mut self.lines {
            if let MdpLine::Parameter { key: k, value: v } = line {
                if normalize_key(k) == wanted {
                    *v = value;
                    return;
                }
            }
        }
        self.lines.push(MdpLine::Parameter {
            key: key.to_string(),
            value,
        });
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let wanted = normalize_key(key);
        self.parameters()
            .find(|(k, _)| normalize_key(k) == wanted)
            .map(|(_, v)| v)
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            MdpLine::Parameter { key, value } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
    }

    pub fn lines(&self) -> &[MdpLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.parameters().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MdpBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            match line {
                MdpLine::Parameter { key, value } => {
                    writeln!(f, "{:<width$} = {}", key, value, width = KEY_WIDTH)?
                }
                MdpLine::Comment(text) => writeln!(f, "; {}", text)?,
                MdpLine::Blank => writeln!(f)?,
            }
        }
        Ok(())
    }
}

impl FromStr for MdpBlock {
    type Err = MdpParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = Vec::new();
        for (idx, raw) in s.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                lines.push(MdpLine::Blank);
                continue;
            }
            if let Some(text) = trimmed.strip_prefix(';') {
                lines.push(MdpLine::Comment(text.trim_start().to_string()));
                continue;
            }
            let (key, value) =
                trimmed
                    .split_once('=')
                    .ok_or_else(|| MdpParseError::MissingSeparator {
                        line: idx + 1,
                        content: trimmed.to_string(),
                    })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(MdpParseError::EmptyKey { line: idx + 1 });
            }
            lines.push(MdpLine::Parameter {
                key: key.to_string(),
                value: value.trim().to_string(),
            });
        }
        Ok(Self { lines })
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().replace('_', "-").to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_aligns_values_in_a_fixed_column() {
        let block = MdpBlock::new()
            .param("integrator", "steep")
            .param("nsteps", 500);

        assert_eq!(
            block.render(),
            "integrator               = steep\nnsteps                   = 500\n"
        );
    }

    #[test]
    fn render_keeps_comments_and_blank_lines_in_order() {
        let block = MdpBlock::new()
            .comment("cut-offs at 1.0nm")
            .param("rlist", "1.0")
            .blank()
            .param("free-energy", "yes");

        let rendered = block.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "; cut-offs at 1.0nm");
        assert!(lines[1].starts_with("rlist"));
        assert_eq!(lines[2], "");
        assert!(lines[3].starts_with("free-energy"));
    }

    #[test]
    fn set_replaces_existing_key_in_place() {
        let mut block = MdpBlock::new()
            .param("integrator", "md")
            .param("nsteps", 20000)
            .param("dt", 0.002);

        block.set("nsteps", 500);

        let keys: Vec<&str> = block.parameters().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["integrator", "nsteps", "dt"]);
        assert_eq!(block.get("nsteps"), Some("500"));
    }

    #[test]
    fn set_treats_dashes_and_underscores_as_equivalent() {
        let mut block = MdpBlock::new().param("init-lambda-state", 0);

        block.set("init_lambda_state", 3);

        assert_eq!(block.len(), 1);
        assert_eq!(block.get("init-lambda-state"), Some("3"));
    }

    #[test]
    fn set_appends_unknown_key() {
        let mut block = MdpBlock::new().param("integrator", "sd");

        block.set("nstxout-compressed", 5000);

        assert_eq!(block.len(), 2);
        assert_eq!(block.get("nstxout-compressed"), Some("5000"));
    }

    #[test]
    fn parse_reads_back_a_rendered_block() {
        let block = MdpBlock::new()
            .comment("we'll use the sd integrator")
            .param("integrator", "sd")
            .blank()
            .param("fep-lambdas", "0.0 0.2 1.0");

        let parsed: MdpBlock = block.render().parse().unwrap();

        assert_eq!(parsed, block);
    }

    #[test]
    fn parse_rejects_line_without_separator() {
        let result = "integrator = md\nnsteps 100\n".parse::<MdpBlock>();

        assert_eq!(
            result,
            Err(MdpParseError::MissingSeparator {
                line: 2,
                content: "nsteps 100".to_string()
            })
        );
    }

    #[test]
    fn parse_rejects_empty_key() {
        let result = "  = md\n".parse::<MdpBlock>();

        assert_eq!(result, Err(MdpParseError::EmptyKey { line: 1 }));
    }

    #[test]
    fn empty_block_renders_to_empty_string() {
        let block = MdpBlock::new();
        assert!(block.is_empty());
        assert_eq!(block.render(), "");
    }
}
