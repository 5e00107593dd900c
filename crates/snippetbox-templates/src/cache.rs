//! The build-once template cache.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::ast::{walk_includes, Body};
use crate::error::{RenderError, TemplateError};
use crate::parser::{parse_file, ParsedFile};
use crate::render::Exec;

/// Suffix of page templates. Each page gets its own set.
pub const PAGE_SUFFIX: &str = ".page.tmpl";
/// Suffix of layout templates, added to every set.
pub const LAYOUT_SUFFIX: &str = ".layout.tmpl";
/// Suffix of partial templates, added to every set.
pub const PARTIAL_SUFFIX: &str = ".partial.tmpl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Page,
    Shared,
}

fn classify(file_name: &str) -> Option<Kind> {
    if file_name.ends_with(PAGE_SUFFIX) {
        Some(Kind::Page)
    } else if file_name.ends_with(LAYOUT_SUFFIX) || file_name.ends_with(PARTIAL_SUFFIX) {
        Some(Kind::Shared)
    } else {
        None
    }
}

/// One page composed with every layout and partial.
///
/// Executing a set runs the page file's top-level content, which normally
/// just includes a layout.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    page: String,
    templates: HashMap<String, Body>,
}

impl TemplateSet {
    fn compose(page: &ParsedFile, shared: &[ParsedFile]) -> Result<Self, TemplateError> {
        let mut templates = HashMap::new();
        let mut origin: HashMap<&str, &str> = HashMap::new();

        for file in std::iter::once(page).chain(shared) {
            for definition in &file.definitions {
                if let Some(first) = origin.insert(&definition.name, &file.name) {
                    return Err(TemplateError::DuplicateDefinition {
                        name: definition.name.clone(),
                        first: first.to_string(),
                        second: file.name.clone(),
                    });
                }
                templates.insert(definition.name.clone(), Arc::clone(&definition.body));
            }
        }

        let mut missing = BTreeSet::new();
        for body in templates.values() {
            walk_includes(body, &mut |name| {
                if !templates.contains_key(name) {
                    missing.insert(name.to_string());
                }
            });
        }
        if let Some(name) = missing.into_iter().next() {
            return Err(TemplateError::UndefinedTemplate {
                page: page.name.clone(),
                name,
            });
        }

        Ok(Self {
            page: page.name.clone(),
            templates,
        })
    }

    /// Page file name this set was built for.
    pub fn page(&self) -> &str {
        &self.page
    }

    /// Returns true if the set contains a template called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Renders the page with `data` into a fresh buffer.
    ///
    /// Nothing is returned unless rendering completes.
    pub fn execute(&self, data: &Value) -> Result<String, RenderError> {
        let exec = Exec {
            templates: &self.templates,
            root: data,
        };
        let mut out = String::with_capacity(4096);
        exec.run_template(&self.page, data, 0, &mut out)?;
        Ok(out)
    }
}

/// Page name to composed [`TemplateSet`], built once at startup.
///
/// The cache is immutable after construction, so it can be shared between
/// requests behind an `Arc` without locking.
#[derive(Debug, Clone, Default)]
pub struct TemplateCache {
    sets: HashMap<String, TemplateSet>,
}

impl TemplateCache {
    /// Builds the cache from every template file directly inside `dir`.
    ///
    /// Any unreadable or malformed file fails the whole build.
    pub fn build(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        let io_err = |source| TemplateError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut sources = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if classify(name).is_none() || !path.is_file() {
                continue;
            }
            let contents = fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;
            sources.push((name.to_string(), contents));
        }

        let cache = Self::from_sources(sources.iter().map(|(n, c)| (n.as_str(), c.as_str())))?;
        tracing::info!(dir = %dir.display(), pages = cache.len(), "template cache built");
        Ok(cache)
    }

    /// Builds the cache from `(file name, contents)` pairs. Names that are
    /// not page, layout or partial templates are ignored.
    pub fn from_sources<'a>(
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, TemplateError> {
        let mut pages = Vec::new();
        let mut shared = Vec::new();
        for (name, contents) in sources {
            match classify(name) {
                Some(Kind::Page) => pages.push(parse_file(name, contents)?),
                Some(Kind::Shared) => shared.push(parse_file(name, contents)?),
                None => {}
            }
        }
        shared.sort_by(|a, b| a.name.cmp(&b.name));

        let mut sets = HashMap::with_capacity(pages.len());
        for page in &pages {
            let set = TemplateSet::compose(page, &shared)?;
            tracing::debug!(page = %page.name, templates = set.templates.len(), "composed template set");
            sets.insert(page.name.clone(), set);
        }
        Ok(Self { sets })
    }

    /// Looks up the set for `page`.
    pub fn get(&self, page: &str) -> Option<&TemplateSet> {
        self.sets.get(page)
    }

    /// Renders `page` with `data`.
    pub fn render<T: Serialize + ?Sized>(&self, page: &str, data: &T) -> Result<String, RenderError> {
        let set = self
            .get(page)
            .ok_or_else(|| RenderError::PageNotFound(page.to_string()))?;
        set.execute(&serde_json::to_value(data)?)
    }

    /// Page names, sorted.
    pub fn pages(&self) -> Vec<&str> {
        let mut pages: Vec<_> = self.sets.keys().map(String::as_str).collect();
        pages.sort_unstable();
        pages
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns true if no pages were found.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
