//! Static site builder.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use rayon::prelude::*;

use crate::assets::{AssetError, AssetMirror, MirrorReport};
use crate::context::{ContextError, DataContext};
use crate::discovery::{discover, Discovered, DiscoveryError};
use crate::render::render_page;
use crate::templates::{compose_page, ComposeOptions, ComposedPage, PageError};

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Page templates, one output file per direct child
    pub pages_dir: PathBuf,

    /// Partial templates shared by every page
    pub partials_dir: PathBuf,

    /// Static assets mirrored verbatim
    pub assets_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Structured data bound into every render
    pub data_file: PathBuf,

    /// File extensions treated as templates
    pub extensions: Vec<String>,

    /// Fail a page when it uses an undefined value
    pub strict_undefined: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            pages_dir: PathBuf::from("htmldocs"),
            partials_dir: PathBuf::from("htmldocs/common"),
            assets_dir: PathBuf::from("htmldocs/static"),
            output_dir: PathBuf::from("public"),
            data_file: PathBuf::from("htmldocs/data.json"),
            extensions: vec!["html".to_string()],
            strict_undefined: true,
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    LoadContext,
    DiscoverTemplates,
    ComposePages,
    RenderPages,
    MirrorAssets,
    Done,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::LoadContext => "load context",
            BuildStage::DiscoverTemplates => "discover templates",
            BuildStage::ComposePages => "compose pages",
            BuildStage::RenderPages => "render pages",
            BuildStage::MirrorAssets => "mirror assets",
            BuildStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Errors that stop the build before it can produce output.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    DataFormat(#[from] ContextError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Stage at which the build stopped.
    pub fn stage(&self) -> BuildStage {
        match self {
            BuildError::DataFormat(_) => BuildStage::LoadContext,
            BuildError::Discovery(_) => BuildStage::DiscoverTemplates,
            BuildError::OutputDir { .. } => BuildStage::RenderPages,
        }
    }
}

/// Outcome for one page.
#[derive(Debug)]
pub struct PageRecord {
    /// Page base filename
    pub name: String,

    /// Source template
    pub source: PathBuf,

    /// Written output file, or why the page failed
    pub outcome: Result<PathBuf, PageError>,
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// One record per discovered page, in discovery order
    pub pages: Vec<PageRecord>,

    /// Asset mirror outcome
    pub assets: MirrorReport,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

impl BuildResult {
    /// Number of pages written.
    pub fn pages_rendered(&self) -> usize {
        self.pages.iter().filter(|p| p.outcome.is_ok()).count()
    }

    pub fn page_errors(&self) -> impl Iterator<Item = &PageError> {
        self.pages.iter().filter_map(|p| p.outcome.as_ref().err())
    }

    pub fn asset_errors(&self) -> &[AssetError] {
        &self.assets.errors
    }

    /// Number of failed pages and assets.
    pub fn failure_count(&self) -> usize {
        self.page_errors().count() + self.assets.errors.len()
    }

    pub fn is_success(&self) -> bool {
        self.page_errors().next().is_none() && self.assets.is_success()
    }
}

/// Static site builder.
pub struct SiteBuilder {
    config: BuildConfig,
}

impl SiteBuilder {
    /// Create a new site builder.
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Build the static site.
    ///
    /// Missing data or unreadable template roots abort the build. Individual
    /// page and asset failures are recorded in the result and do not stop the
    /// remaining work.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        enter(BuildStage::LoadContext);
        let context = DataContext::load(&self.config.data_file).inspect_err(|e| fail(e))?;
        if context.is_empty() {
            tracing::warn!(
                "{} has no top-level keys",
                self.config.data_file.display()
            );
        } else {
            tracing::debug!("Loaded {} top-level data keys", context.len());
        }
        let context = context.to_template_value();

        enter(BuildStage::DiscoverTemplates);
        let Discovered { pages, partials } = discover(
            &self.config.pages_dir,
            &self.config.partials_dir,
            &self.config.extensions,
        )
        .inspect_err(|e| fail(e))?;
        tracing::info!("Found {} pages and {} partials", pages.len(), partials.len());

        enter(BuildStage::ComposePages);
        let options = ComposeOptions {
            strict_undefined: self.config.strict_undefined,
        };
        let composed: Vec<(String, PathBuf, Result<ComposedPage, PageError>)> = pages
            .into_par_iter()
            .map(|page| match page {
                Ok(page) => {
                    let unit = compose_page(&page, &partials, &options);
                    (page.name, page.path, unit)
                }
                Err(e) => {
                    let source = match &e {
                        PageError::Read { path, .. } => path.clone(),
                        _ => PathBuf::new(),
                    };
                    (e.page().to_string(), source, Err(e))
                }
            })
            .collect();

        enter(BuildStage::RenderPages);
        fs::create_dir_all(&self.config.output_dir)
            .map_err(|source| BuildError::OutputDir {
                path: self.config.output_dir.clone(),
                source,
            })
            .inspect_err(|e| fail(e))?;

        let records: Vec<PageRecord> = composed
            .into_par_iter()
            .map(|(name, source, unit)| {
                let outcome =
                    unit.and_then(|unit| render_page(&unit, &context, &self.config.output_dir));
                if let Err(e) = &outcome {
                    tracing::warn!("{}", e);
                }
                PageRecord {
                    name,
                    source,
                    outcome,
                }
            })
            .collect();

        enter(BuildStage::MirrorAssets);
        let assets = AssetMirror::new(&self.config.assets_dir, &self.config.output_dir).mirror();

        let result = BuildResult {
            pages: records,
            assets,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        };

        enter(BuildStage::Done);
        if !result.is_success() {
            tracing::warn!("Build finished with {} failures", result.failure_count());
        }

        Ok(result)
    }
}

fn enter(stage: BuildStage) {
    tracing::info!("Stage: {}", stage);
}

fn fail(err: &dyn std::error::Error) {
    tracing::error!("{}", err);
}
