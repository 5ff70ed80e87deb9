//! Static site build command.

use std::path::PathBuf;

use anyhow::Result;
use stencil_static::SiteBuilder;

use crate::config::ConfigFile;

/// Run the build command.
pub fn run(config: &ConfigFile, output: Option<PathBuf>) -> Result<()> {
    tracing::info!("Building static site...");

    let result = SiteBuilder::new(config.build_config(output)).build()?;

    tracing::info!(
        "Rendered {} of {} pages and copied {} assets ({} bytes) in {}ms",
        result.pages_rendered(),
        result.pages.len(),
        result.assets.files.len(),
        result.assets.bytes,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    if !result.is_success() {
        for err in result.page_errors() {
            tracing::error!("{}", err);
        }
        let uncomposed = result.page_errors().filter(|e| e.is_composition()).count();
        if uncomposed > 0 {
            tracing::error!("{} pages could not be composed from their templates", uncomposed);
        }
        for err in result.asset_errors() {
            tracing::error!("{}", err);
        }
        anyhow::bail!("Build failed: {} errors", result.failure_count());
    }

    Ok(())
}
