//! Transition rules between steps.

use crate::core::ExitStatus;
use crate::errors::JobValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The exit statuses a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum StatusPattern {
    /// Exactly this exit status.
    Exact(ExitStatus),
    /// Any exit status (`*`).
    Any,
}

impl StatusPattern {
    /// Parses `*` as the wildcard and anything else as an exact code.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            Self::Any
        } else {
            Self::Exact(ExitStatus::from(pattern))
        }
    }

    /// Returns true if `status` satisfies the pattern.
    #[must_use]
    pub fn matches(&self, status: &ExitStatus) -> bool {
        match self {
            Self::Exact(expected) => expected == status,
            Self::Any => true,
        }
    }

    /// Returns true for `*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl fmt::Display for StatusPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(status) => write!(f, "{status}"),
            Self::Any => f.write_str("*"),
        }
    }
}

impl From<&str> for StatusPattern {
    fn from(pattern: &str) -> Self {
        Self::parse(pattern)
    }
}

impl From<String> for StatusPattern {
    fn from(pattern: String) -> Self {
        Self::parse(&pattern)
    }
}

impl From<ExitStatus> for StatusPattern {
    fn from(status: ExitStatus) -> Self {
        Self::Exact(status)
    }
}

impl From<StatusPattern> for String {
    fn from(pattern: StatusPattern) -> Self {
        pattern.to_string()
    }
}

/// Where a rule leads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionTarget {
    /// Run the named step next.
    Step(String),
    /// End the flow successfully.
    End,
}

impl TransitionTarget {
    /// Targets a step.
    #[must_use]
    pub fn step(name: impl Into<String>) -> Self {
        Self::Step(name.into())
    }

    /// Returns the step name, if the target is a step.
    #[must_use]
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Self::Step(name) => Some(name),
            Self::End => None,
        }
    }
}

impl fmt::Display for TransitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step(name) => f.write_str(name),
            Self::End => f.write_str("END"),
        }
    }
}

/// One `(from, on) -> to` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    /// The step the rule leaves from.
    pub from: String,
    /// The exit statuses it applies to.
    pub on: StatusPattern,
    /// Where it leads.
    pub to: TransitionTarget,
}

impl TransitionRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(from: impl Into<String>, on: impl Into<StatusPattern>, to: TransitionTarget) -> Self {
        Self {
            from: from.into(),
            on: on.into(),
            to,
        }
    }
}

impl fmt::Display for TransitionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --[{}]--> {}", self.from, self.on, self.to)
    }
}

/// Ordered set of transition rules.
///
/// At most one rule exists per `(from, pattern)`. Lookup prefers an exact
/// status match over the wildcard regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTable {
    rules: Vec<TransitionRule>,
}

impl TransitionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    ///
    /// Re-adding an identical rule is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule for the same `(from, pattern)` already
    /// leads somewhere else.
    pub fn add(&mut self, rule: TransitionRule) -> Result<(), JobValidationError> {
        if let Some(existing) = self
            .rules
            .iter()
            .find(|r| r.from == rule.from && r.on == rule.on)
        {
            if existing.to == rule.to {
                return Ok(());
            }
            return Err(JobValidationError::new(
                "FLOW-CONFLICTING-RULE",
                format!(
                    "Step '{}' already transitions to '{}' on {}, cannot also go to '{}'",
                    rule.from, existing.to, rule.on, rule.to
                ),
            )
            .with_steps(vec![rule.from.clone()])
            .with_fix_hint("Remove one of the rules or match a different exit status."));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Finds where `from` goes after exiting with `status`.
    #[must_use]
    pub fn resolve(&self, from: &str, status: &ExitStatus) -> Option<&TransitionTarget> {
        let mut wildcard = None;
        for rule in self.rules.iter().filter(|r| r.from == from) {
            match &rule.on {
                StatusPattern::Exact(expected) if expected == status => return Some(&rule.to),
                StatusPattern::Any => wildcard = Some(&rule.to),
                StatusPattern::Exact(_) => {}
            }
        }
        wildcard
    }

    /// Returns all rules in insertion order.
    #[must_use]
    pub fn rules(&self) -> &[TransitionRule] {
        &self.rules
    }

    /// Returns the rules leaving `from`.
    pub fn rules_from<'a>(&'a self, from: &'a str) -> impl Iterator<Item = &'a TransitionRule> + 'a {
        self.rules.iter().filter(move |r| r.from == from)
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
