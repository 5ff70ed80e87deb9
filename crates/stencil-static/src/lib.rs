//! Static site build pipeline for stencil.
//!
//! Loads a shared data context, composes every page template with the shared
//! partials, renders one output file per page and mirrors the static assets
//! tree into the build root.

pub mod assets;
pub mod builder;
pub mod context;
pub mod discovery;
pub mod render;
pub mod templates;

pub use assets::{AssetError, AssetKind, AssetMirror, AssetNode, MirrorReport};
pub use builder::{BuildConfig, BuildError, BuildResult, BuildStage, PageRecord, SiteBuilder};
pub use context::{ContextError, DataContext, DataFormat};
pub use discovery::{discover, Discovered, DiscoveryError, PartialSet, TemplateSource};
pub use templates::{compose_page, ComposeOptions, ComposedPage, PageError};
