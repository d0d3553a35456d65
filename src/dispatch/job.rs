//! Batch Jobs
//!
//! A batch job is the normalized target list plus the command to run for each
//! target and the rate the commands may be issued at.

use std::collections::HashSet;

use crate::rate_limit::RateLimitConfig;

/// Chat command rendered once per target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    channel: String,
    command: String,
    arguments: String,
}

impl CommandTemplate {
    /// Create a template
    ///
    /// A leading `#` on the channel and a leading `/` on the command are
    /// accepted and stripped.
    pub fn new(
        channel: impl Into<String>,
        command: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        let channel = channel.into();
        let command = command.into();
        Self {
            channel: channel.trim().trim_start_matches('#').to_lowercase(),
            command: command.trim().trim_start_matches('/').to_string(),
            arguments: arguments.into().trim().to_string(),
        }
    }

    /// Channel name without the leading `#`
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn arguments(&self) -> &str {
        &self.arguments
    }

    /// Command line for one target, e.g. `/ban someone spam`
    pub fn render(&self, target: &str) -> String {
        format!("/{} {} {}", self.command, target, self.arguments)
            .trim_end()
            .to_string()
    }

    /// Command line with a `{user}` placeholder, for confirmation prompts
    pub fn preview(&self) -> String {
        self.render("{user}")
    }
}

/// Normalized set of targets and the command to run on each
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    targets: Vec<String>,
    template: CommandTemplate,
    limits: RateLimitConfig,
}

impl BatchJob {
    /// Build a job; targets are normalized with [`normalize_targets`]
    pub fn new<I, S>(targets: I, template: CommandTemplate, limits: RateLimitConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            targets: normalize_targets(targets),
            template,
            limits,
        }
    }

    /// Build a job from free-form text such as stdin contents
    pub fn from_input(input: &str, template: CommandTemplate, limits: RateLimitConfig) -> Self {
        Self::new(split_targets(input), template, limits)
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    pub fn limits(&self) -> RateLimitConfig {
        self.limits
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Split free-form text on anything that is not a word character
pub fn split_targets(input: &str) -> impl Iterator<Item = &str> {
    input
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|s| !s.is_empty())
}

/// Lowercase, drop blanks and keep the first occurrence of each target
pub fn normalize_targets<I, S>(targets: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
