//! Permission rule patterns
//!
//! Rule strings take the form `Tool(pattern)` or a bare `Tool` name:
//!
//! - `Bash(git status)` - exact command
//! - `Bash(git *)` - wildcard; matches at token boundaries only
//! - `Edit(src/**/*.rs)` - path glob
//! - `Edit` - any argument in the category
//!
//! Wildcards are plain glob tokens, never regex; the matcher cannot execute
//! anything it is given.

use glob::{MatchOptions, Pattern};

use crate::core::{BrokerError, BrokerResult, MatchStyle, ToolCategory};

/// The argument-constraining part of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgPattern {
    /// Bare category; matches all arguments
    Any,
    /// Matches only the identical string
    Exact(String),
    /// Contains `*`/`?` wildcards
    Glob(String),
}

/// A parsed permission pattern: category name plus argument constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePattern {
    category: String,
    args: ArgPattern,
}

/// Ranking used to break ties between rules that both match
///
/// Exact beats wildcard; wildcards order by the length of their literal
/// prefix; bare categories rank last. Longest match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    rank: u8,
    literal_len: usize,
}

impl RulePattern {
    /// Parse a rule string like `Bash(git *)` or `Edit`
    pub fn parse(rule: &str) -> BrokerResult<Self> {
        let rule = rule.trim();
        if rule.is_empty() {
            return Err(BrokerError::InvalidRule("empty rule".into()));
        }

        let (category, args) = match rule.find('(') {
            Some(open) => {
                if !rule.ends_with(')') {
                    return Err(BrokerError::InvalidRule(format!(
                        "unbalanced parentheses in '{}'",
                        rule
                    )));
                }
                let category = &rule[..open];
                let pattern = &rule[open + 1..rule.len() - 1];
                (category, Some(pattern))
            }
            None => (rule, None),
        };

        if category.is_empty() || category.chars().any(|c| c.is_whitespace() || c == ')') {
            return Err(BrokerError::InvalidRule(format!(
                "invalid category in '{}'",
                rule
            )));
        }

        let args = match args {
            None => ArgPattern::Any,
            Some(p) if p.trim().is_empty() => ArgPattern::Any,
            Some(p) if p.contains('*') || p.contains('?') => ArgPattern::Glob(p.to_string()),
            Some(p) => ArgPattern::Exact(p.to_string()),
        };

        Ok(Self {
            category: category.to_string(),
            args,
        })
    }

    /// Build the exact pattern covering one concrete request
    ///
    /// Used when an interactive "always allow"/"always deny" answer is
    /// recorded for the request that triggered the prompt.
    pub fn exact_for(category: &ToolCategory, arguments: &str) -> Self {
        Self {
            category: category.rule_name().to_string(),
            args: ArgPattern::Exact(arguments.to_string()),
        }
    }

    /// The category name this pattern applies to
    pub fn category(&self) -> &str {
        &self.category
    }

    /// The argument constraint
    pub fn args(&self) -> &ArgPattern {
        &self.args
    }

    /// Check this pattern against a concrete invocation
    ///
    /// Category comparison is case-sensitive. Command-style arguments are
    /// whitespace-normalized at token boundaries before matching, so
    /// `Bash(git *)` matches `git  status` but never `gitstatus`.
    pub fn matches(&self, category: &str, arguments: &str, style: MatchStyle) -> bool {
        if self.category != category {
            return false;
        }

        match (&self.args, style) {
            (ArgPattern::Any, _) => true,
            (ArgPattern::Exact(p), MatchStyle::Command) => {
                normalize_command(p) == normalize_command(arguments)
            }
            (ArgPattern::Exact(p), MatchStyle::Path) => p == arguments,
            (ArgPattern::Glob(p), MatchStyle::Command) => {
                let pattern_tokens: Vec<&str> = p.split_whitespace().collect();
                let arg_tokens: Vec<&str> = arguments.split_whitespace().collect();
                match_tokens(&pattern_tokens, &arg_tokens)
            }
            (ArgPattern::Glob(p), MatchStyle::Path) => {
                // Invalid path globs match nothing (fail closed)
                let options = MatchOptions {
                    // `*` stops at `/`; only `**` crosses directories
                    require_literal_separator: true,
                    ..MatchOptions::new()
                };
                Pattern::new(p)
                    .map(|g| g.matches_with(arguments, options))
                    .unwrap_or(false)
            }
        }
    }

    /// Specificity for tie-breaking among matching rules
    pub fn specificity(&self) -> Specificity {
        match &self.args {
            ArgPattern::Exact(p) => Specificity {
                rank: 2,
                literal_len: p.chars().count(),
            },
            ArgPattern::Glob(p) => Specificity {
                rank: 1,
                literal_len: p
                    .chars()
                    .take_while(|c| *c != '*' && *c != '?')
                    .count(),
            },
            ArgPattern::Any => Specificity {
                rank: 0,
                literal_len: 0,
            },
        }
    }
}

impl std::fmt::Display for RulePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.args {
            ArgPattern::Any => write!(f, "{}", self.category),
            ArgPattern::Exact(p) | ArgPattern::Glob(p) => {
                write!(f, "{}({})", self.category, p)
            }
        }
    }
}

/// Collapse runs of whitespace so token boundaries compare equal
fn normalize_command(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Token-wise glob match for command strings
///
/// A standalone `*` token matches zero or more remaining tokens; a `*`
/// embedded in a token matches within that token only.
fn match_tokens(pattern: &[&str], args: &[&str]) -> bool {
    match pattern.split_first() {
        None => args.is_empty(),
        Some((&"*", rest)) => (0..=args.len()).any(|skip| match_tokens(rest, &args[skip..])),
        Some((p, rest)) => match args.split_first() {
            Some((a, arg_rest)) => glob_token(p, a) && match_tokens(rest, arg_rest),
            None => false,
        },
    }
}

/// Char-level glob within a single token: `*` any run, `?` one char
fn glob_token(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star_pi, star_ti)) = backtrack {
            pi = star_pi + 1;
            ti = star_ti + 1;
            backtrack = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
