//! Page rendering.

use std::fs;
use std::path::{Path, PathBuf};

use minijinja::Value;

use crate::templates::{ComposedPage, PageError};

/// Output location for a page: its base filename directly under `output_dir`.
pub fn output_path(output_dir: &Path, page: &ComposedPage) -> PathBuf {
    output_dir.join(page.name())
}

/// Render `page` against `context` and write it to the build root.
///
/// The page is rendered fully in memory first, so a failed render leaves any
/// previous output untouched. Writes truncate an existing file.
pub fn render_page(
    page: &ComposedPage,
    context: &Value,
    output_dir: &Path,
) -> Result<PathBuf, PageError> {
    let html = page.render(context)?;
    let path = output_path(output_dir, page);

    fs::write(&path, html).map_err(|source| PageError::Write {
        page: page.name().to_string(),
        path: path.clone(),
        source,
    })?;

    tracing::debug!(
        "Rendered {} ({} templates in scope) -> {}",
        page.name(),
        page.template_names().len(),
        path.display()
    );

    Ok(path)
}
