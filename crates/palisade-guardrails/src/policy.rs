//! Guardrail policy model and path matching.
//!
//! A [`GuardrailPolicy`] bundles an ordered list of [`GuardrailRule`]s under a
//! shared severity. Rule patterns are glob-or-regex strings: a pattern
//! containing `*` or `?` compiles as a glob, anything else as a regular
//! expression. A pattern that compiles as neither never matches — the failure
//! is logged and confined to that single rule.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Classification of a guardrail policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Rules forbidding mutations to matching paths.
    ForbiddenPath,
}

/// How severe a matched rule is.
///
/// Only [`Severity::Block`] can abort validation, and only under fail-closed
/// configuration; [`Severity::Warn`] matches are always advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Advisory: collected and reported, never aborts.
    Warn,
    /// Blocking: aborts validation under fail-closed configuration.
    Block,
}

/// Action taken when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Refuse the mutation.
    Block,
}

// ---------------------------------------------------------------------------
// Rules and policies
// ---------------------------------------------------------------------------

/// A single forbidden-path rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailRule {
    /// Rule identifier, unique within its policy.
    pub id: String,
    /// Glob-or-regex pattern tested against candidate paths.
    pub pattern: String,
    /// What the rule protects.
    pub description: String,
    /// Action taken on a match.
    pub action: RuleAction,
    /// Message reported to the caller when the rule matches.
    pub message: String,
}

impl GuardrailRule {
    /// Creates a blocking rule.
    pub fn new(
        id: impl Into<String>,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            description: String::new(),
            action: RuleAction::Block,
            message: message.into(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether `path` matches this rule's pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        pattern_matches(&self.pattern, path)
    }
}

/// A named, ordered set of forbidden-path rules sharing one severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailPolicy {
    /// Policy identifier, unique within a store.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What the policy is for.
    pub description: String,
    /// Policy classification.
    pub kind: PolicyKind,
    /// Severity applied to every rule match.
    pub severity: Severity,
    /// Disabled policies never produce violations.
    pub enabled: bool,
    /// Rules, evaluated in order.
    pub rules: Vec<GuardrailRule>,
}

impl GuardrailPolicy {
    /// Creates an enabled forbidden-path policy with no rules.
    pub fn new(id: impl Into<String>, name: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            kind: PolicyKind::ForbiddenPath,
            severity,
            enabled: true,
            rules: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: GuardrailRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Sets the enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The bootstrapped forbidden-path policy: package manifests and
    /// lockfiles, dependency directories, secret-bearing and binary
    /// extensions, temp/cache directories, and the internal protocol file.
    #[must_use]
    pub fn builtin_forbidden_paths() -> Self {
        // All builtin patterns are regexes and must stay free of `*`/`?`,
        // which would reclassify them as globs.
        Self::new("forbidden-paths", "Forbidden Paths", Severity::Block)
            .with_description("Paths that automated mutations may never touch")
            .with_rule(
                GuardrailRule::new("go-mod", "go\\.mod", "Modifying go.mod is forbidden")
                    .with_description("Go module manifest"),
            )
            .with_rule(
                GuardrailRule::new(
                    "package-json",
                    "package\\.json|package-lock\\.json",
                    "Modifying package.json is forbidden",
                )
                .with_description("Node manifest and lockfile"),
            )
            .with_rule(
                GuardrailRule::new(
                    "node-modules",
                    "node_modules/",
                    "Modifying node_modules is forbidden",
                )
                .with_description("Installed dependency tree"),
            )
            .with_rule(
                GuardrailRule::new(
                    "secrets",
                    "\\.(key|pem|p12|pfx|env|secret)$",
                    "Modifying secret-bearing files is forbidden",
                )
                .with_description("Key material and environment files"),
            )
            .with_rule(
                GuardrailRule::new(
                    "binary-files",
                    "\\.(exe|dll|so|dylib|bin|jar|war|ear)$",
                    "Modifying binary files is forbidden",
                )
                .with_description("Compiled artifacts"),
            )
            .with_rule(
                GuardrailRule::new(
                    "temp-dirs",
                    "(tmp|temp|cache)/",
                    "Modifying temporary directories is forbidden",
                )
                .with_description("Scratch and cache space"),
            )
            .with_rule(
                GuardrailRule::new(
                    "cursor-rules",
                    "\\.cursor/rules/cutc\\.mdc",
                    "Modifying the internal protocol file is forbidden",
                )
                .with_description("Internal protocol definition"),
            )
    }
}

// ---------------------------------------------------------------------------
// Pattern matching
// ---------------------------------------------------------------------------

/// Tests `path` against a glob-or-regex pattern.
///
/// Patterns containing `*` or `?` are globs, everything else is a regex.
/// Invalid patterns never match.
pub(crate) fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern.contains('*') || pattern.contains('?') {
        match globset::Glob::new(pattern) {
            Ok(glob) => glob.compile_matcher().is_match(path),
            Err(e) => {
                tracing::warn!("invalid glob pattern {pattern:?}: {e}");
                false
            }
        }
    } else {
        match regex::Regex::new(pattern) {
            Ok(re) => re.is_match(path),
            Err(e) => {
                tracing::warn!("invalid regex pattern {pattern:?}: {e}");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
