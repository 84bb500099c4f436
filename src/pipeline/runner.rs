//! Extraction runner: builds an extractor from a spec and executes it.
//!
//! A [`Runner`] wraps exactly one of the extraction engines. It is built from
//! a validated [`ExtractionSpec`] (or directly from an engine) and every run
//! executes inside an `extraction` tracing span carrying the extractor name
//! and the number of objects.

use tracing::{debug, info_span};

use crate::clustering::Clustering;
use crate::extraction::{
    ClustersWithNoise, CutDendrogram, Extractor, HdbscanExtraction, SimplifiedExtraction,
};
use crate::hierarchy::PointerHierarchy;
use crate::pipeline::error_code::ErrorCode;
use crate::pipeline::errors::{RunError, SpecError};
use crate::pipeline::observer::{ExtractionObserver, NoopObserver};
use crate::pipeline::spec::{ExtractionSpec, PolicySpec};
use crate::pipeline::validation::ValidationEngine;

// ============================================================================
// Engine selection
// ============================================================================

/// The extraction engine a [`Runner`] dispatches to.
#[derive(Debug, Clone)]
pub enum Engine {
    Cut(CutDendrogram),
    Noise(ClustersWithNoise),
    Hdbscan(HdbscanExtraction),
    Simplified(SimplifiedExtraction),
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::Cut(e) => e.name(),
            Engine::Noise(e) => e.name(),
            Engine::Hdbscan(e) => e.name(),
            Engine::Simplified(e) => e.name(),
        }
    }

    /// Build the engine selected by `spec`. The spec is not validated here.
    fn from_spec(spec: &ExtractionSpec) -> Result<Self, SpecError> {
        let policy = spec.policy.as_ref().ok_or_else(|| {
            SpecError::new(ErrorCode::MissingPolicy, "/policy", "no extraction policy selected")
        })?;
        let engine = match policy {
            PolicySpec::CutByHeight { .. }
            | PolicySpec::CutByCount { .. }
            | PolicySpec::FullHierarchy => {
                spec.cut_config().map(|c| Engine::Cut(CutDendrogram::new(c)))
            }
            PolicySpec::ClustersWithNoise { .. } => spec
                .noise_config()
                .map(|c| Engine::Noise(ClustersWithNoise::new(c))),
            PolicySpec::Hdbscan { .. } => spec
                .density_config()
                .map(|c| Engine::Hdbscan(HdbscanExtraction::new(c))),
            PolicySpec::Simplified { .. } => spec
                .density_config()
                .map(|c| Engine::Simplified(SimplifiedExtraction::new(c))),
        };
        engine.ok_or_else(|| {
            SpecError::new(
                ErrorCode::InvalidCombo,
                "/policy",
                format!("no engine for policy {}", policy.as_str()),
            )
        })
    }
}

// ============================================================================
// Runner
// ============================================================================

/// A ready-to-run extraction.
#[derive(Debug, Clone)]
pub struct Runner {
    engine: Engine,
    warnings: Vec<SpecError>,
}

impl Runner {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            warnings: Vec::new(),
        }
    }

    /// Validate `spec` with the default rules and build its engine.
    ///
    /// On rejection the first error is returned; run a
    /// [`ValidationEngine`] directly to see every diagnostic.
    pub fn from_spec(spec: &ExtractionSpec) -> Result<Self, SpecError> {
        Self::from_spec_with(&ValidationEngine::with_defaults(), spec)
    }

    /// Like [`Runner::from_spec`], validating with a custom engine.
    pub fn from_spec_with(
        validator: &ValidationEngine,
        spec: &ExtractionSpec,
    ) -> Result<Self, SpecError> {
        let report = validator.validate(spec);
        if let Some(first) = report.errors().next() {
            return Err(first.clone());
        }
        let engine = Engine::from_spec(spec)?;
        Ok(Self {
            engine,
            warnings: report.warnings().cloned().collect(),
        })
    }

    /// Parse, validate and build in one step.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        Self::from_spec(&ExtractionSpec::from_json(json)?)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn name(&self) -> &'static str {
        self.engine.name()
    }

    /// Validation warnings the spec was accepted with.
    pub fn warnings(&self) -> &[SpecError] {
        &self.warnings
    }

    pub fn run<H: PointerHierarchy + ?Sized>(&self, hierarchy: &H) -> Result<Clustering, RunError> {
        self.run_observed(hierarchy, &mut NoopObserver)
    }

    /// Run the extraction, reporting progress to `observer`.
    pub fn run_observed<H, O>(&self, hierarchy: &H, observer: &mut O) -> Result<Clustering, RunError>
    where
        H: PointerHierarchy + ?Sized,
        O: ExtractionObserver + ?Sized,
    {
        let name = self.name();
        let _span = info_span!("extraction", extractor = name, objects = hierarchy.len()).entered();

        let result = match &self.engine {
            Engine::Cut(e) => e.extract_observed(hierarchy, observer),
            Engine::Noise(e) => e.extract_observed(hierarchy, observer),
            Engine::Hdbscan(e) => e.extract_observed(hierarchy, observer),
            Engine::Simplified(e) => e.extract_observed(hierarchy, observer),
        };
        let clustering = result.map_err(|e| RunError::from_extraction(name, e))?;
        debug!(
            clusters = clustering.len(),
            toplevel = clustering.toplevel().len(),
            warnings = clustering.warnings().len(),
            "extraction finished"
        );
        Ok(clustering)
    }
}

impl From<Engine> for Runner {
    fn from(engine: Engine) -> Self {
        Self::new(engine)
    }
}
