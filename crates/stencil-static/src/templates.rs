//! Template composition.
//!
//! Every page is composed into its own minijinja environment holding the page
//! and all partials. Sources may declare named sub-templates with
//! `{% define "name" %}...{% enddefine %}`; each block is registered under its
//! declared name and the rest of the file under the file's base name. Any
//! member can then `include`, `import` or `extend` any other member by name.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use minijinja::{default_auto_escape_callback, Environment, UndefinedBehavior, Value};
use regex::{Captures, Regex};

use crate::discovery::{PartialSet, TemplateSource};

static DEFINE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)\{%([-+]?)\s*define\s+(?:"([^"]+)"|'([^']+)')\s*([-+]?)%\}(.*?)\{%([-+]?)\s*enddefine\s*([-+]?)%\}"#,
    )
    .expect("define pattern is valid")
});

static DEFINE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{%[-+]?\s*(?:define|enddefine)\b").expect("define tag pattern is valid")
});

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{%[-+]?\s*(?:include|import|extends|from)\s+(?:"([^"]*)"|'([^']*)')([^%]*)%\}"#,
    )
    .expect("reference pattern is valid")
});

/// Comments and raw blocks, whose contents are never tags.
static OPAQUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{#.*?#\}|\{%[-+]?\s*raw\s*[-+]?%\}.*?\{%[-+]?\s*endraw\s*[-+]?%\}")
        .expect("opaque span pattern is valid")
});

/// Errors for a single page. None of them stop other pages from building.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("{page}: failed to read {}: {source}", .path.display())]
    Read {
        page: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{page}: sub-template \"{name}\" is defined by both {} and {}", .first.display(), .second.display())]
    Ambiguous {
        page: String,
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{page}: {} references undefined sub-template \"{name}\"", .referrer.display())]
    Undefined {
        page: String,
        name: String,
        referrer: PathBuf,
    },

    #[error("{page}: failed to compose template: {message}")]
    Composition { page: String, message: String },

    #[error("{page}: failed to render: {message}")]
    Render { page: String, message: String },

    #[error("{page}: failed to write {}: {source}", .path.display())]
    Write {
        page: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PageError {
    /// Name of the page that failed.
    pub fn page(&self) -> &str {
        match self {
            PageError::Read { page, .. }
            | PageError::Ambiguous { page, .. }
            | PageError::Undefined { page, .. }
            | PageError::Composition { page, .. }
            | PageError::Render { page, .. }
            | PageError::Write { page, .. } => page,
        }
    }

    /// Whether the page's templates could not be composed.
    pub fn is_composition(&self) -> bool {
        matches!(
            self,
            PageError::Ambiguous { .. } | PageError::Undefined { .. } | PageError::Composition { .. }
        )
    }
}

/// A named sub-template declared with a `define` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub name: String,
    pub body: String,
}

/// A source split into its `define` blocks and the remaining markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definitions {
    pub remainder: String,
    pub fragments: Vec<Fragment>,
}

/// Blank out comments and raw blocks. Byte offsets are preserved, so spans
/// found in the masked text index the original.
fn mask(source: &str) -> Cow<'_, str> {
    OPAQUE.replace_all(source, |caps: &Captures| " ".repeat(caps[0].len()))
}

fn trims(caps: &Captures, group: usize) -> bool {
    caps.get(group).is_some_and(|m| m.as_str() == "-")
}

/// Extract `define` blocks from a template source.
///
/// `-` markers on the tags strip whitespace the way minijinja does for any
/// other block. Nested or unbalanced `define` tags are rejected.
pub fn split_definitions(source: &str) -> Result<Definitions, String> {
    let masked = mask(source);
    let mut fragments = Vec::new();
    let mut remainder = String::with_capacity(source.len());
    let mut last = 0;
    let mut trim_next = false;

    for caps in DEFINE_BLOCK.captures_iter(&masked) {
        let whole = caps.get(0).expect("group 0 always matches");
        let name = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let body = caps.get(5).expect("body group always matches");

        if DEFINE_TAG.is_match(body.as_str()) {
            return Err(format!("nested define inside \"{name}\""));
        }

        let mut before = &source[last..whole.start()];
        if trim_next {
            before = before.trim_start();
        }
        if trims(&caps, 1) {
            before = before.trim_end();
        }
        remainder.push_str(before);

        let mut text = &source[body.range()];
        if trims(&caps, 4) {
            text = text.trim_start();
        }
        if trims(&caps, 6) {
            text = text.trim_end();
        }
        fragments.push(Fragment {
            name,
            body: text.to_string(),
        });

        trim_next = trims(&caps, 7);
        last = whole.end();
    }

    let rest = &source[last..];
    remainder.push_str(if trim_next { rest.trim_start() } else { rest });

    if DEFINE_TAG.is_match(&mask(&remainder)) {
        return Err("unbalanced define/enddefine tag".to_string());
    }

    Ok(Definitions {
        remainder,
        fragments,
    })
}

/// Literal template names referenced from `source`.
///
/// `include ... ignore missing`, computed names, and anything inside comments
/// or raw blocks are skipped.
pub fn referenced_names(source: &str) -> Vec<String> {
    REFERENCE
        .captures_iter(&mask(source))
        .filter(|caps| {
            let rest = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
            let computed = rest.trim_start().starts_with(['~', '+', '|']);
            !computed && !rest.contains("ignore missing")
        })
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Debug, Clone)]
struct Symbol {
    origin: PathBuf,
    source: String,
}

/// Name to source mapping for one composed page.
#[derive(Debug, Default)]
pub struct SymbolTable {
    page: String,
    entries: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    /// Create an empty table for the given page.
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Register every name a template source declares.
    pub fn register_source(&mut self, source: &TemplateSource) -> Result<(), PageError> {
        let definitions =
            split_definitions(&source.content).map_err(|message| PageError::Composition {
                page: self.page.clone(),
                message: format!("{}: {}", source.path.display(), message),
            })?;

        self.register(&source.name, &source.path, definitions.remainder)?;
        for fragment in definitions.fragments {
            self.register(&fragment.name, &source.path, fragment.body)?;
        }

        Ok(())
    }

    fn register(&mut self, name: &str, origin: &Path, source: String) -> Result<(), PageError> {
        if let Some(existing) = self.entries.get(name) {
            return Err(PageError::Ambiguous {
                page: self.page.clone(),
                name: name.to_string(),
                first: existing.origin.clone(),
                second: origin.to_path_buf(),
            });
        }

        self.entries.insert(
            name.to_string(),
            Symbol {
                origin: origin.to_path_buf(),
                source,
            },
        );
        Ok(())
    }

    /// Names reachable from `root` through literal references.
    ///
    /// Fails on the first reference along the way to a name that is not
    /// registered. Members the root never reaches are not checked.
    pub fn reachable_from(&self, root: &str) -> Result<BTreeSet<String>, PageError> {
        let mut reached = BTreeSet::new();
        let mut pending = vec![root.to_string()];

        while let Some(name) = pending.pop() {
            let Some(symbol) = self.entries.get(&name) else {
                continue;
            };
            if !reached.insert(name) {
                continue;
            }
            for target in referenced_names(&symbol.source) {
                if !self.entries.contains_key(&target) {
                    return Err(PageError::Undefined {
                        page: self.page.clone(),
                        name: target,
                        referrer: symbol.origin.clone(),
                    });
                }
                if !reached.contains(&target) {
                    pending.push(target);
                }
            }
        }

        Ok(reached)
    }
}

/// Options applied to every composed page.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Fail rendering when a template uses an undefined value
    pub strict_undefined: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            strict_undefined: true,
        }
    }
}

/// A page composed with all partials, ready to render.
pub struct ComposedPage {
    name: String,
    names: Vec<String>,
    env: Environment<'static>,
}

impl std::fmt::Debug for ComposedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedPage")
            .field("name", &self.name)
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl ComposedPage {
    /// Root template name, equal to the page's base filename.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names registered in this page's scope, sorted.
    pub fn template_names(&self) -> &[String] {
        &self.names
    }

    /// Render the root template with `context` as its only argument.
    pub fn render(&self, context: &Value) -> Result<String, PageError> {
        let render_error = |e: minijinja::Error| PageError::Render {
            page: self.name.clone(),
            message: e.to_string(),
        };

        self.env
            .get_template(&self.name)
            .map_err(render_error)?
            .render(context)
            .map_err(render_error)
    }
}

/// Compose `page` with every partial into a single named-template scope.
///
/// Names must be unique across the whole unit. Templates reachable from the
/// page must compile and may only reference registered names; the rest are
/// kept for computed includes when they compile and dropped otherwise.
pub fn compose_page(
    page: &TemplateSource,
    partials: &PartialSet,
    options: &ComposeOptions,
) -> Result<ComposedPage, PageError> {
    let mut table = SymbolTable::new(&page.name);
    for partial in partials.iter() {
        table.register_source(partial)?;
    }
    table.register_source(page)?;
    let reachable = table.reachable_from(&page.name)?;

    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    if options.strict_undefined {
        env.set_undefined_behavior(UndefinedBehavior::Strict);
    }

    // The page's extension decides escaping for the whole unit, since
    // fragments registered by declared name carry no extension.
    let escape = default_auto_escape_callback(&page.name);
    env.set_auto_escape_callback(move |_| escape.clone());

    let mut names = Vec::with_capacity(reachable.len());
    for (name, symbol) in table.entries {
        match env.add_template_owned(name.clone(), symbol.source) {
            Ok(()) => names.push(name),
            Err(e) if reachable.contains(&name) => {
                return Err(PageError::Composition {
                    page: page.name.clone(),
                    message: format!("{}: {}", symbol.origin.display(), e),
                });
            }
            Err(e) => {
                tracing::debug!(
                    "{}: skipping unused sub-template \"{}\" from {}: {}",
                    page.name,
                    name,
                    symbol.origin.display(),
                    e
                );
            }
        }
    }

    tracing::debug!(
        "Composed {} with {} partials ({} templates reachable)",
        page.name,
        partials.len(),
        reachable.len()
    );

    Ok(ComposedPage {
        name: page.name.clone(),
        names,
        env,
    })
}
