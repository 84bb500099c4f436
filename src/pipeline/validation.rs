//! Validation engine for extraction specifications.
//!
//! The engine runs all registered [`ValidationRule`]s against an
//! [`ExtractionSpec`] and collects every diagnostic into a
//! [`ValidationReport`]. It never short-circuits on the first error, so users
//! see all problems at once.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use dendrocut::pipeline::validation::ValidationEngine;
//!
//! let engine = ValidationEngine::with_defaults();
//! let report = engine.validate(&spec);
//! if report.has_errors() {
//!     for err in report.errors() {
//!         eprintln!("{err}");
//!     }
//! }
//! ```

use std::collections::HashMap;

use serde::Serialize;

use super::error_code::ErrorCode;
use super::errors::SpecError;
use super::spec::{ExtractionSpec, PolicySpec, SUPPORTED_VERSION};

// ─── Severity ───────────────────────────────────────────────────────────────

/// Whether a diagnostic is a hard error or a soft warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

// ─── Diagnostic ─────────────────────────────────────────────────────────────

/// A single validation finding attached to a [`SpecError`].
#[derive(Debug, Clone, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: Severity,
    #[serde(flatten)]
    pub error: SpecError,
}

impl ValidationDiagnostic {
    pub fn error(err: SpecError) -> Self {
        Self {
            severity: Severity::Error,
            error: err,
        }
    }

    pub fn warning(err: SpecError) -> Self {
        Self {
            severity: Severity::Warning,
            error: err,
        }
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// Collected diagnostics from running all validation rules.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    /// Iterate over error-severity diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &SpecError> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| &d.error)
    }

    /// Iterate over warning-severity diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &SpecError> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| &d.error)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Returns `true` if there are no errors (warnings are acceptable).
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

// ─── Rule trait ─────────────────────────────────────────────────────────────

/// A single validation rule that inspects an [`ExtractionSpec`] and returns
/// zero or more diagnostics.
pub trait ValidationRule: Send + Sync {
    /// Short, stable identifier for this rule (e.g., `"policy_ranges"`).
    fn name(&self) -> &str;

    fn validate(&self, spec: &ExtractionSpec) -> Vec<ValidationDiagnostic>;
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Runs a set of [`ValidationRule`]s against an [`ExtractionSpec`].
pub struct ValidationEngine {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl ValidationEngine {
    /// Create an empty engine with no rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create an engine with all built-in rules.
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.add_rule(Box::new(VersionRule));
        engine.add_rule(Box::new(PolicyPresentRule));
        engine.add_rule(Box::new(PolicyRangesRule));
        engine.add_rule(Box::new(OptionCompatRule));
        engine.add_rule(Box::new(UnknownFieldsRule));
        engine
    }

    /// Register an additional rule.
    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    /// Names of the registered rules, in execution order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run all rules against `spec` and return the collected report.
    pub fn validate(&self, spec: &ExtractionSpec) -> ValidationReport {
        let mut report = ValidationReport::default();
        for rule in &self.rules {
            report.diagnostics.extend(rule.validate(spec));
        }
        report
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Concrete rules
// ═══════════════════════════════════════════════════════════════════════════

// ─── 1. supported version ───────────────────────────────────────────────────

struct VersionRule;

impl ValidationRule for VersionRule {
    fn name(&self) -> &str {
        "version"
    }

    fn validate(&self, spec: &ExtractionSpec) -> Vec<ValidationDiagnostic> {
        if spec.v == SUPPORTED_VERSION {
            return vec![];
        }
        vec![ValidationDiagnostic::error(
            SpecError::new(
                ErrorCode::UnsupportedVersion,
                "/v",
                format!("unsupported spec version {}", spec.v),
            )
            .with_hint(format!("Set \"v\": {SUPPORTED_VERSION}")),
        )]
    }
}

// ─── 2. a policy is selected ────────────────────────────────────────────────

struct PolicyPresentRule;

impl ValidationRule for PolicyPresentRule {
    fn name(&self) -> &str {
        "policy_present"
    }

    fn validate(&self, spec: &ExtractionSpec) -> Vec<ValidationDiagnostic> {
        if spec.policy.is_some() {
            return vec![];
        }
        vec![ValidationDiagnostic::error(
            SpecError::new(ErrorCode::MissingPolicy, "/policy", "no extraction policy selected")
                .with_hint(
                    "Add a policy: cut_by_height, cut_by_count, full_hierarchy, \
                     clusters_with_noise, hdbscan, or simplified",
                ),
        )]
    }
}

// ─── 3. numeric parameters in range ─────────────────────────────────────────

struct PolicyRangesRule;

impl PolicyRangesRule {
    fn at_least_one(field: &str, value: usize) -> Option<ValidationDiagnostic> {
        (value == 0).then(|| {
            ValidationDiagnostic::error(SpecError::new(
                ErrorCode::InvalidValue,
                format!("/policy/{field}"),
                format!("{field} must be >= 1"),
            ))
        })
    }
}

impl ValidationRule for PolicyRangesRule {
    fn name(&self) -> &str {
        "policy_ranges"
    }

    fn validate(&self, spec: &ExtractionSpec) -> Vec<ValidationDiagnostic> {
        let Some(policy) = &spec.policy else {
            return vec![];
        };
        match policy {
            PolicySpec::CutByHeight { threshold } if !threshold.is_finite() => {
                vec![ValidationDiagnostic::error(
                    SpecError::new(
                        ErrorCode::InvalidValue,
                        "/policy/threshold",
                        format!("threshold must be finite, got {threshold}"),
                    )
                    .with_hint("Use full_hierarchy to keep every merge"),
                )]
            }
            PolicySpec::CutByCount { min_clusters } => {
                Self::at_least_one("min_clusters", *min_clusters)
                    .into_iter()
                    .collect()
            }
            PolicySpec::ClustersWithNoise {
                num_clusters,
                min_cluster_size,
            } => Self::at_least_one("num_clusters", *num_clusters)
                .into_iter()
                .chain(Self::at_least_one("min_cluster_size", *min_cluster_size))
                .collect(),
            PolicySpec::Hdbscan { min_cluster_size }
            | PolicySpec::Simplified { min_cluster_size } => {
                Self::at_least_one("min_cluster_size", *min_cluster_size)
                    .into_iter()
                    .collect()
            }
            _ => vec![],
        }
    }
}

// ─── 4. options that the policy ignores ─────────────────────────────────────

struct OptionCompatRule;

impl OptionCompatRule {
    fn ignored(path: &str, option: &str, policy: &PolicySpec) -> ValidationDiagnostic {
        ValidationDiagnostic::warning(
            SpecError::new(
                ErrorCode::InvalidCombo,
                path,
                format!("{option} has no effect with policy {}", policy.as_str()),
            )
            .with_hint(format!("Remove \"{option}\"")),
        )
    }
}

impl ValidationRule for OptionCompatRule {
    fn name(&self) -> &str {
        "option_compat"
    }

    fn validate(&self, spec: &ExtractionSpec) -> Vec<ValidationDiagnostic> {
        let Some(policy) = &spec.policy else {
            return vec![];
        };
        let mut diags = Vec::new();

        if spec.singletons && !policy.is_cut() {
            diags.push(Self::ignored("/singletons", "singletons", policy));
        }
        if spec.output.is_some() && !policy.is_cut() {
            diags.push(Self::ignored("/output", "output", policy));
        }
        if spec.hierarchical.is_some() && !policy.is_density() {
            diags.push(Self::ignored("/hierarchical", "hierarchical", policy));
        }

        // Singleton clusters only exist in hierarchical cut output.
        let flat_cut = policy.is_cut()
            && !matches!(policy, PolicySpec::FullHierarchy)
            && !spec.output.is_some_and(|o| o.is_hierarchical());
        if spec.singletons && flat_cut {
            diags.push(ValidationDiagnostic::warning(
                SpecError::new(
                    ErrorCode::InvalidCombo,
                    "/singletons",
                    "singletons has no effect with flat output",
                )
                .with_hint("Set \"output\": \"hierarchical\""),
            ));
        }
        diags
    }
}

// ─── 5. unknown fields ──────────────────────────────────────────────────────

struct UnknownFieldsRule;

impl UnknownFieldsRule {
    /// Collect unknown-field diagnostics at the given JSON pointer `path`
    /// from the extra fields captured by `#[serde(flatten)]`.
    fn check_unknowns(
        path: &str,
        unknowns: &HashMap<String, serde_json::Value>,
        strict: bool,
    ) -> Vec<ValidationDiagnostic> {
        let mut keys: Vec<&String> = unknowns.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                let diag_fn = if strict {
                    ValidationDiagnostic::error
                } else {
                    ValidationDiagnostic::warning
                };
                diag_fn(
                    SpecError::new(
                        ErrorCode::UnknownField,
                        format!("{path}/{key}"),
                        format!("unrecognized field \"{key}\""),
                    )
                    .with_hint("Check spelling or remove this field"),
                )
            })
            .collect()
    }
}

impl ValidationRule for UnknownFieldsRule {
    fn name(&self) -> &str {
        "unknown_fields"
    }

    fn validate(&self, spec: &ExtractionSpec) -> Vec<ValidationDiagnostic> {
        Self::check_unknowns("", &spec.unknown_fields, spec.strict)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(json: &str) -> ExtractionSpec {
        ExtractionSpec::from_json(json).unwrap()
    }

    fn engine() -> ValidationEngine {
        ValidationEngine::with_defaults()
    }

    #[test]
    fn test_valid_specs_have_no_diagnostics() {
        for json in [
            r#"{"v": 1, "policy": {"type": "cut_by_height", "threshold": 1.5}}"#,
            r#"{"v": 1, "policy": {"type": "cut_by_count", "min_clusters": 2}, "output": "hierarchical", "singletons": true}"#,
            r#"{"v": 1, "policy": {"type": "full_hierarchy"}, "singletons": true}"#,
            r#"{"v": 1, "policy": {"type": "clusters_with_noise", "num_clusters": 3, "min_cluster_size": 2}}"#,
            r#"{"v": 1, "policy": {"type": "hdbscan", "min_cluster_size": 5}, "hierarchical": false}"#,
            r#"{"v": 1, "policy": {"type": "simplified", "min_cluster_size": 5}}"#,
        ] {
            let report = engine().validate(&spec(json));
            assert!(report.is_empty(), "{json}: {:?}", report.diagnostics);
        }
    }

    #[test]
    fn test_unsupported_version() {
        let report = engine().validate(&spec(r#"{"v": 2, "policy": {"type": "full_hierarchy"}}"#));
        let errors: Vec<_> = report.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::UnsupportedVersion);
        assert_eq!(errors[0].path, "/v");
    }

    #[test]
    fn test_missing_policy() {
        let report = engine().validate(&spec(r#"{"v": 1}"#));
        assert!(report.has_errors());
        let err = report.errors().next().unwrap();
        assert_eq!(err.code, ErrorCode::MissingPolicy);
        assert!(err.hint.as_ref().unwrap().contains("hdbscan"));
    }

    #[test]
    fn test_zero_counts_rejected() {
        let report = engine().validate(&spec(
            r#"{"v": 1, "policy": {"type": "clusters_with_noise", "num_clusters": 0, "min_cluster_size": 0}}"#,
        ));
        let paths: Vec<&str> = report.errors().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/policy/num_clusters", "/policy/min_cluster_size"]);

        let report = engine().validate(&spec(
            r#"{"v": 1, "policy": {"type": "cut_by_count", "min_clusters": 0}}"#,
        ));
        assert_eq!(report.errors().count(), 1);
    }

    #[test]
    fn test_non_finite_threshold_rejected() {
        let s = ExtractionSpec::new(PolicySpec::CutByHeight {
            threshold: f64::NAN,
        });
        let report = engine().validate(&s);
        let err = report.errors().next().unwrap();
        assert_eq!(err.code, ErrorCode::InvalidValue);
        assert_eq!(err.path, "/policy/threshold");
    }

    #[test]
    fn test_singletons_ignored_by_density_policy() {
        let report = engine().validate(&spec(
            r#"{"v": 1, "policy": {"type": "hdbscan", "min_cluster_size": 3}, "singletons": true}"#,
        ));
        assert!(report.is_valid());
        let warnings: Vec<_> = report.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, ErrorCode::InvalidCombo);
        assert_eq!(warnings[0].path, "/singletons");
    }

    #[test]
    fn test_singletons_with_flat_cut_warns() {
        let report = engine().validate(&spec(
            r#"{"v": 1, "policy": {"type": "cut_by_height", "threshold": 2.0}, "singletons": true}"#,
        ));
        assert!(report.is_valid());
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn test_hierarchical_ignored_by_cut_policy() {
        let report = engine().validate(&spec(
            r#"{"v": 1, "policy": {"type": "full_hierarchy"}, "hierarchical": true}"#,
        ));
        let warning = report.warnings().next().unwrap();
        assert_eq!(warning.path, "/hierarchical");
    }

    #[test]
    fn test_unknown_field_warning_when_not_strict() {
        let report = engine().validate(&spec(
            r#"{"v": 1, "policy": {"type": "full_hierarchy"}, "colour": "red"}"#,
        ));
        assert!(report.is_valid());
        let warning = report.warnings().next().unwrap();
        assert_eq!(warning.code, ErrorCode::UnknownField);
        assert_eq!(warning.path, "/colour");
    }

    #[test]
    fn test_unknown_field_error_when_strict() {
        let report = engine().validate(&spec(
            r#"{"v": 1, "policy": {"type": "full_hierarchy"}, "strict": true, "zeta": 1, "alpha": 2}"#,
        ));
        let paths: Vec<&str> = report.errors().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/alpha", "/zeta"]);
    }

    #[test]
    fn test_all_problems_reported_at_once() {
        let report = engine().validate(&spec(
            r#"{"v": 9, "policy": {"type": "simplified", "min_cluster_size": 0}, "strict": true, "x": 1}"#,
        ));
        assert_eq!(report.errors().count(), 3);
        assert_eq!(report.len(), 3);
    }

    #[test]
    fn test_empty_engine_accepts_anything() {
        let report = ValidationEngine::new().validate(&spec(r#"{"v": 7}"#));
        assert!(report.is_empty());
    }

    #[test]
    fn test_default_rule_names() {
        assert_eq!(
            ValidationEngine::default().rule_names(),
            vec!["version", "policy_present", "policy_ranges", "option_compat", "unknown_fields"]
        );
    }

    #[test]
    fn test_diagnostic_serialization_is_flat() {
        let report = engine().validate(&spec(r#"{"v": 1}"#));
        let value = serde_json::to_value(&report).unwrap();
        let diag = &value["diagnostics"][0];
        assert_eq!(diag["severity"], "error");
        assert_eq!(diag["code"], "missing_policy");
        assert_eq!(diag["path"], "/policy");
    }
}
