use crate::error::SqlBridgeError;
use crate::params::DriverParams;
use crate::types::DriverValue;

use super::parsers::{is_block_comment_end, is_block_comment_start, is_cast, is_line_comment_start};
use super::scanner::{State, scan_name};

/// A statement with its `:name` parameters rewritten to numbered placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSql {
    sql: String,
    param_names: Vec<String>,
}

impl CompiledSql {
    /// Rewrite `:name` parameters to `?1`, `?2`, ... in order of first appearance.
    ///
    /// A name used more than once keeps its first number. Quoted strings, quoted identifiers,
    /// comments and `::` casts are copied through untouched.
    #[must_use]
    pub fn compile(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut sql = String::with_capacity(source.len());
        let mut param_names: Vec<String> = Vec::new();
        let mut state = State::Normal;
        let mut copied = 0;
        let mut idx = 0;

        while idx < bytes.len() {
            let b = bytes[idx];
            match state {
                State::Normal => match b {
                    b'\'' => state = State::SingleQuoted,
                    b'"' => state = State::DoubleQuoted,
                    b'[' => state = State::BracketQuoted,
                    _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                    _ if is_block_comment_start(bytes, idx) => {
                        state = State::BlockComment(1);
                        idx += 1;
                    }
                    _ if is_cast(bytes, idx) => idx += 1,
                    b':' => {
                        if let Some((name_end, name)) = scan_name(bytes, idx + 1) {
                            let number = match param_names.iter().position(|n| n == name) {
                                Some(pos) => pos + 1,
                                None => {
                                    param_names.push(name.to_owned());
                                    param_names.len()
                                }
                            };
                            sql.push_str(&source[copied..idx]);
                            sql.push('?');
                            sql.push_str(&number.to_string());
                            copied = name_end;
                            idx = name_end;
                            continue;
                        }
                    }
                    _ => {}
                },
                State::SingleQuoted => {
                    if b == b'\'' {
                        if bytes.get(idx + 1) == Some(&b'\'') {
                            idx += 1; // skip escaped quote
                        } else {
                            state = State::Normal;
                        }
                    }
                }
                State::DoubleQuoted => {
                    if b == b'"' {
                        if bytes.get(idx + 1) == Some(&b'"') {
                            idx += 1; // skip escaped quote
                        } else {
                            state = State::Normal;
                        }
                    }
                }
                State::BracketQuoted => {
                    if b == b']' {
                        state = State::Normal;
                    }
                }
                State::LineComment => {
                    if b == b'\n' {
                        state = State::Normal;
                    }
                }
                State::BlockComment(depth) => {
                    if is_block_comment_start(bytes, idx) {
                        state = State::BlockComment(depth + 1);
                        idx += 1;
                    } else if is_block_comment_end(bytes, idx) {
                        state = if depth == 1 {
                            State::Normal
                        } else {
                            State::BlockComment(depth - 1)
                        };
                        idx += 1;
                    }
                }
            }
            idx += 1;
        }

        sql.push_str(&source[copied..]);
        Self { sql, param_names }
    }

    /// SQL text with numbered placeholders.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter names, indexed by placeholder number minus one.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Arrange driver parameters in placeholder order.
    ///
    /// Parameters the statement does not reference are ignored.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ParameterError` naming the first referenced parameter missing
    /// from `params`.
    pub fn bind(&self, params: &DriverParams) -> Result<Vec<DriverValue>, SqlBridgeError> {
        self.param_names
            .iter()
            .map(|name| {
                params.get(name).cloned().ok_or_else(|| {
                    SqlBridgeError::ParameterError(format!(
                        "parameter `{name}` is referenced by the statement but was not supplied"
                    ))
                })
            })
            .collect()
    }
}
