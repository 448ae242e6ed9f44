//! Line editor helper for the Steel REPL
//!
//! Colours tokens, completes known names and holds back unbalanced input.

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Helper};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::Arc;
use steel_parser::lexer::TokenStream;
use steel_parser::parser::SourceId;
use steel_parser::tokens::TokenType;

/// rustyline helper with completion, validation and highlighting
#[derive(Helper)]
pub struct ReplHelper {
    /// Names offered for completion and shown in blue
    known: Arc<BTreeSet<String>>,
}

impl ReplHelper {
    /// Create a helper that knows `names`
    pub fn new(known: Arc<BTreeSet<String>>) -> Self {
        Self { known }
    }

    fn is_known(&self, ident: &str) -> bool {
        self.known.contains(ident)
    }
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let found = TokenStream::new(line, true, SourceId::none()).find_map(|token| {
            let span = token.span();
            match token.ty {
                TokenType::Identifier(ref symbol) if (span.start()..=span.end()).contains(&pos) => {
                    Some((span.start(), symbol.to_string()))
                }
                _ => None,
            }
        });

        let Some((start, prefix)) = found else {
            return Ok((0, Vec::new()));
        };

        // Prefix matches first, then names that merely contain the input
        let (starting, containing): (Vec<&String>, Vec<&String>) = self
            .known
            .iter()
            .filter(|name| name.contains(prefix.as_str()))
            .partition(|name| name.starts_with(prefix.as_str()));

        let completions = starting
            .into_iter()
            .chain(containing)
            .map(|name| Pair {
                display: name.clone(),
                replacement: name.clone(),
            })
            .collect();

        Ok((start, completions))
    }
}

impl Validator for ReplHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut balance = 0i32;
        let mut has_error = false;

        for token in TokenStream::new(ctx.input(), true, SourceId::none()) {
            match token.ty {
                TokenType::OpenParen(..) => balance += 1,
                TokenType::CloseParen(_) => balance -= 1,
                // Usually an unterminated string
                TokenType::Error => has_error = true,
                _ => {}
            }
            if balance < 0 {
                return Ok(ValidationResult::Invalid(Some(
                    "  <- unbalanced closing paren".to_string(),
                )));
            }
        }

        if balance > 0 || has_error {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context) -> Option<String> {
        None
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let mut replacements: Vec<(std::ops::Range<usize>, String)> = Vec::new();

        for token in TokenStream::new(line, true, SourceId::none()) {
            let source = token.source();
            let colored = match &token.ty {
                TokenType::Lambda
                | TokenType::If
                | TokenType::Define
                | TokenType::Let
                | TokenType::Require => source.bright_purple(),
                TokenType::BooleanLiteral(_) => source.bright_magenta(),
                TokenType::Number(_) => source.bright_yellow(),
                TokenType::StringLiteral(_) => source.bright_green(),
                TokenType::Identifier(ident) if self.is_known(ident.as_ref()) => {
                    source.bright_blue()
                }
                _ => continue,
            };
            replacements.push((token.span().range(), colored.to_string()));
        }

        if replacements.is_empty() {
            return Cow::Borrowed(line);
        }

        // Back to front so earlier ranges stay valid
        let mut highlighted = line.to_owned();
        for (range, replacement) in replacements.into_iter().rev() {
            highlighted.replace_range(range, &replacement);
        }
        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, line: &str, _pos: usize, _forced: bool) -> bool {
        !line.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper() -> ReplHelper {
        let known = ["spi-open", "spi-xfer", "spi-xfer2", "bytes->hex"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        ReplHelper::new(Arc::new(known))
    }

    #[test]
    fn test_highlight_leaves_plain_text() {
        let helper = helper();
        assert_eq!(helper.highlight("(foo bar)", 0), "(foo bar)");
    }

    #[test]
    fn test_highlight_known_name() {
        colored::control::set_override(true);
        let helper = helper();
        let out = helper.highlight("(spi-open 0 0)", 0);
        assert!(out.contains("\x1b["));
        assert!(out.contains("spi-open"));
    }
}
