//! Page and partial template discovery.
//!
//! Both roots are scanned one level deep. Results are sorted by file name so
//! that repeated builds compose templates in the same order.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::templates::PageError;

/// A template file loaded into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    /// Source file path
    pub path: PathBuf,

    /// Base filename, used as the template's registered name
    pub name: String,

    /// Raw template text
    pub content: String,
}

impl TemplateSource {
    /// Read a template file from disk.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::new(path, content))
    }

    /// Wrap in-memory template text.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        let name = file_name(&path);

        Self {
            path,
            name,
            content: content.into(),
        }
    }
}

/// Partial templates shared by every page, in deterministic order.
#[derive(Debug, Clone, Default)]
pub struct PartialSet {
    sources: Vec<TemplateSource>,
}

impl PartialSet {
    pub fn new(sources: Vec<TemplateSource>) -> Self {
        Self { sources }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TemplateSource> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Output of the discovery stage.
#[derive(Debug, Default)]
pub struct Discovered {
    /// One entry per page, each becomes exactly one output file. A page that
    /// could not be read keeps its slot as an error.
    pub pages: Vec<Result<TemplateSource, PageError>>,

    /// Partials composed into every page
    pub partials: PartialSet,
}

/// Errors that abort discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Failed to scan template directory {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read template {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Discover and load every page and partial template.
///
/// Only an unreadable root or partial is fatal; an unreadable page is
/// reported in its own slot of [`Discovered::pages`].
pub fn discover(
    pages_dir: &Path,
    partials_dir: &Path,
    extensions: &[String],
) -> Result<Discovered, DiscoveryError> {
    let pages: Vec<_> = scan_dir(pages_dir, extensions)?
        .into_iter()
        .map(load_page)
        .collect();
    for page in &pages {
        match page {
            Ok(page) => tracing::debug!("Found page {}", page.path.display()),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    let partials = scan_dir(partials_dir, extensions)?
        .into_iter()
        .map(|entry| {
            let path = entry?;
            TemplateSource::read(&path).map_err(|source| DiscoveryError::Read { path, source })
        })
        .collect::<Result<Vec<_>, _>>()?;
    for partial in &partials {
        tracing::debug!("Found partial {}", partial.path.display());
    }

    Ok(Discovered {
        pages,
        partials: PartialSet::new(partials),
    })
}

/// List the template files directly inside `dir`, sorted by name.
///
/// Failing to open `dir` itself is an error. Entries that cannot be
/// inspected, such as dangling symlinks, are returned in place as
/// [`DiscoveryError::Read`] when their name carries a template extension.
pub fn scan_dir(
    dir: &Path,
    extensions: &[String],
) -> Result<Vec<Result<PathBuf, DiscoveryError>>, DiscoveryError> {
    let mut files = Vec::new();
    let wanted = |path: &Path| {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        extensions.iter().any(|allowed| allowed == ext)
    };

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(DiscoveryError::Scan {
                    path: e.path().unwrap_or(dir).to_path_buf(),
                    source: e.into(),
                });
            }
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                if wanted(&path) {
                    files.push(Err(DiscoveryError::Read {
                        path,
                        source: e.into(),
                    }));
                }
                continue;
            }
        };

        if entry.file_type().is_file() && wanted(entry.path()) {
            files.push(Ok(entry.into_path()));
        }
    }

    Ok(files)
}

fn load_page(entry: Result<PathBuf, DiscoveryError>) -> Result<TemplateSource, PageError> {
    let read_error = |path: PathBuf, source| PageError::Read {
        page: file_name(&path),
        path,
        source,
    };

    match entry {
        Ok(path) => TemplateSource::read(&path).map_err(|source| read_error(path, source)),
        Err(DiscoveryError::Read { path, source } | DiscoveryError::Scan { path, source }) => {
            Err(read_error(path, source))
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn html() -> Vec<String> {
        vec!["html".to_string()]
    }

    fn paths(entries: Vec<Result<PathBuf, DiscoveryError>>) -> Vec<PathBuf> {
        entries.into_iter().map(Result::unwrap).collect()
    }

    #[test]
    fn scans_direct_children_only() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("common")).unwrap();
        fs::write(root.join("index.html"), "index").unwrap();
        fs::write(root.join("about.html"), "about").unwrap();
        fs::write(root.join("data.json"), "{}").unwrap();
        fs::write(root.join("common/meta.html"), "meta").unwrap();

        let files = paths(scan_dir(root, &html()).unwrap());

        assert_eq!(files, vec![root.join("about.html"), root.join("index.html")]);
    }

    #[test]
    fn loads_pages_and_partials_in_name_order() {
        let temp = tempdir().unwrap();
        let pages = temp.path().join("pages");
        let partials = temp.path().join("partials");
        fs::create_dir_all(&pages).unwrap();
        fs::create_dir_all(&partials).unwrap();
        fs::write(pages.join("b.html"), "B").unwrap();
        fs::write(pages.join("a.html"), "A").unwrap();
        fs::write(partials.join("z.html"), "Z").unwrap();
        fs::write(partials.join("m.html"), "M").unwrap();

        let found = discover(&pages, &partials, &html()).unwrap();

        let pages: Vec<_> = found.pages.into_iter().map(Result::unwrap).collect();
        let page_names: Vec<_> = pages.iter().map(|p| p.name.as_str()).collect();
        let partial_names: Vec<_> = found.partials.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(page_names, vec!["a.html", "b.html"]);
        assert_eq!(partial_names, vec!["m.html", "z.html"]);
        assert_eq!(pages[0].content, "A");
    }

    #[test]
    fn unreadable_page_keeps_its_slot() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.html"), "A").unwrap();
        fs::write(temp.path().join("b.html"), [0xff, 0xfe, 0x00]).unwrap();
        fs::write(temp.path().join("c.html"), "C").unwrap();
        let partials = temp.path().join("common");
        fs::create_dir_all(&partials).unwrap();

        let found = discover(temp.path(), &partials, &html()).unwrap();

        assert_eq!(found.pages.len(), 3);
        assert_eq!(found.pages[0].as_ref().unwrap().content, "A");
        assert!(matches!(
            &found.pages[1],
            Err(PageError::Read { page, .. }) if page == "b.html"
        ));
        assert_eq!(found.pages[2].as_ref().unwrap().content, "C");
    }

    #[test]
    fn unreadable_partial_is_fatal() {
        let temp = tempdir().unwrap();
        let partials = temp.path().join("common");
        fs::create_dir_all(&partials).unwrap();
        fs::write(partials.join("bad.html"), [0xff, 0xfe]).unwrap();

        let result = discover(temp.path(), &partials, &html());

        assert!(matches!(result, Err(DiscoveryError::Read { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_page_is_reported_in_place() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.html"), "A").unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone.html"), temp.path().join("b.html"))
            .unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone.txt"), temp.path().join("c.txt"))
            .unwrap();

        let entries = scan_dir(temp.path(), &html()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].as_ref().unwrap(), &temp.path().join("a.html"));
        assert!(matches!(
            &entries[1],
            Err(DiscoveryError::Read { path, .. }) if path == &temp.path().join("b.html")
        ));
    }

    #[test]
    fn honours_configured_extensions() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.html"), "").unwrap();
        fs::write(temp.path().join("b.htm"), "").unwrap();
        fs::write(temp.path().join("c.txt"), "").unwrap();

        let files = paths(scan_dir(temp.path(), &["htm".to_string(), "txt".to_string()]).unwrap());

        assert_eq!(
            files,
            vec![temp.path().join("b.htm"), temp.path().join("c.txt")]
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("pages")).unwrap();

        let result = discover(
            &temp.path().join("pages"),
            &temp.path().join("missing"),
            &html(),
        );

        assert!(matches!(result, Err(DiscoveryError::Scan { .. })));
    }

    #[test]
    fn empty_roots_yield_nothing() {
        let temp = tempdir().unwrap();

        let found = discover(temp.path(), temp.path(), &html()).unwrap();

        assert!(found.pages.is_empty());
        assert!(found.partials.is_empty());
    }
}
