pub mod custom_types;
pub mod error;
pub mod generator;
pub mod jsonschema;
pub mod kotlin;
pub mod materialize;
pub mod naming;
pub mod plan;
pub mod provider;
pub mod template;
pub mod writer;

use std::path::{Path, PathBuf};

use tracing::info;

pub use error::{ResultExt, TyperError};
pub use generator::{
    available_options, generator_for_platform, parse_option_pairs, GenerateOptions,
    GeneratedFile, Generator,
};
pub use plan::TrackingPlan;
pub use provider::{
    build_tracking_plan, FileTrackingPlanSource, JsonSchemaPlanProvider, PlanProvider,
    TrackingPlanSource, TrackingPlanWithSchemas,
};
pub use writer::FileManager;

/// Runs the pipeline: options, plan, generator, and optionally the file manager.
pub struct RudderTyper<P> {
    provider: P,
}

impl<P: PlanProvider> RudderTyper<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Generates every file for the configured platform.
    ///
    /// Options are validated before the plan is loaded.
    pub fn generate(&self, options: &GenerateOptions) -> Result<Vec<GeneratedFile>, TyperError> {
        let generator = generator_for_platform(&options.platform, &options.platform_options)?;
        let plan = self.provider.tracking_plan()?;
        info!(
            plan = %plan.metadata.tracking_plan_id,
            platform = generator.platform(),
            rules = plan.rules.len(),
            "generating"
        );
        generator.generate(&plan, options)
    }

    /// Generates and writes into `output_dir`; nothing is written on failure.
    pub fn generate_and_write(
        &self,
        options: &GenerateOptions,
        output_dir: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>, TyperError> {
        let files = self.generate(options)?;
        let written = FileManager::new(output_dir.as_ref()).write_files(&files)?;
        info!(
            files = written.len(),
            output = %output_dir.as_ref().display(),
            "wrote generated files"
        );
        Ok(written)
    }
}

/// Generates code from a tracking plan payload saved as JSON.
pub fn generate_from_path(
    plan_path: impl AsRef<Path>,
    options: &GenerateOptions,
) -> Result<Vec<GeneratedFile>, TyperError> {
    let provider = JsonSchemaPlanProvider::new(FileTrackingPlanSource::new(plan_path));
    RudderTyper::new(provider).generate(options)
}

/// Loads and parses a tracking plan payload saved as JSON.
pub fn load_tracking_plan(plan_path: impl AsRef<Path>) -> Result<TrackingPlan, TyperError> {
    JsonSchemaPlanProvider::new(FileTrackingPlanSource::new(plan_path)).tracking_plan()
}
