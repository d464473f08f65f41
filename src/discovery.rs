// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Test discovery.
//!
//! Test classes and methods register themselves at startup through
//! `inventory` (see `#[sweetcomb_class]` and `#[sweetcomb_test]`). Discovery
//! walks the given source roots, and for every `test_*.rs` file it finds,
//! looks up the classes registered from that file. Nothing is loaded or
//! introspected at runtime; a file with no registrations yields no suites.
//!
//! Suites come out in walk order (directory listings sorted by name), and
//! methods within a suite in declaration order.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::framework::{TestContext, TestFn, BASE_CLASS, RESERVED_PREFIX};
use crate::log_debug;
use crate::logging::{Facility, Logger};

/// A registered test class
#[derive(Clone, Copy)]
pub struct ClassEntry {
    pub name: &'static str,
    /// Source path as seen by the compiler (`file!()`)
    pub file: &'static str,
    pub line: u32,
    pub set_up: fn(&mut TestContext) -> anyhow::Result<()>,
    pub tear_down: fn(&mut TestContext),
}

/// A registered test method
#[derive(Clone, Copy)]
pub struct MethodEntry {
    pub class: &'static str,
    pub name: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub func: TestFn,
    /// Reason the method is registered but never run
    pub skip: Option<&'static str>,
}

impl fmt::Debug for ClassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassEntry")
            .field("name", &self.name)
            .field("file", &self.file)
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("class", &self.class)
            .field("name", &self.name)
            .field("line", &self.line)
            .field("skip", &self.skip)
            .finish_non_exhaustive()
    }
}

inventory::collect!(ClassEntry);
inventory::collect!(MethodEntry);

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("search root {} does not exist", .0.display())]
    MissingRoot(PathBuf),

    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Classes and methods discovery can choose from
#[derive(Debug, Clone, Default)]
pub struct Registry {
    classes: Vec<ClassEntry>,
    methods: Vec<MethodEntry>,
}

impl Registry {
    pub fn new(classes: Vec<ClassEntry>, methods: Vec<MethodEntry>) -> Self {
        Self { classes, methods }
    }

    /// Everything registered in this binary.
    pub fn global() -> Self {
        Self {
            classes: inventory::iter::<ClassEntry>.into_iter().copied().collect(),
            methods: inventory::iter::<MethodEntry>.into_iter().copied().collect(),
        }
    }

    pub fn classes(&self) -> &[ClassEntry] {
        &self.classes
    }

    /// Classes registered from `path`, ordered by declaration.
    fn classes_in(&self, path: &Path, canonical: &Path) -> Vec<ClassEntry> {
        let mut classes: Vec<ClassEntry> = self
            .classes
            .iter()
            .filter(|class| same_source(path, canonical, Path::new(class.file)))
            .copied()
            .collect();
        classes.sort_by_key(|class| class.line);
        classes
    }

    /// `test*` methods of `class`, ordered by declaration.
    fn methods_of(&self, class: &ClassEntry) -> Vec<MethodEntry> {
        let mut methods: Vec<MethodEntry> = self
            .methods
            .iter()
            .filter(|method| method.class == class.name && method.file == class.file)
            .filter(|method| method.name.starts_with("test"))
            .copied()
            .collect();
        methods.sort_by_key(|method| method.line);
        methods
    }
}

/// One test method bound to its class hooks
#[derive(Debug, Clone, Copy)]
pub struct TestCase {
    pub class: ClassEntry,
    pub method: MethodEntry,
}

impl TestCase {
    /// `Class.method`, as shown in results.
    pub fn id(&self) -> String {
        format!("{}.{}", self.class.name, self.method.name)
    }
}

/// Test cases of one class in one file
#[derive(Debug, Clone)]
pub struct DiscoveredSuite {
    /// Source file name followed directly by the class name
    pub name: String,
    pub path: PathBuf,
    pub cases: Vec<TestCase>,
}

/// True for classes that are never collected as suites.
pub fn is_excluded(class: &str) -> bool {
    class == BASE_CLASS || class.starts_with(RESERVED_PREFIX)
}

fn is_test_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("test_") && name.ends_with(".rs"))
}

/// Whether a walked file is the file a registration came from.
///
/// `file!()` is relative to the workspace root of the crate that was
/// compiled. When that path exists under this crate the walked file must be
/// exactly it; otherwise the walked path (as given or canonical) has to end
/// with the whole registered path, so a same-named file elsewhere never
/// binds the registration.
fn same_source(walked: &Path, canonical: &Path, source: &Path) -> bool {
    match Path::new(env!("CARGO_MANIFEST_DIR")).join(source).canonicalize() {
        Ok(anchored) => anchored == canonical,
        Err(_) => walked.ends_with(source) || canonical.ends_with(source),
    }
}

/// Collect suites from every root.
///
/// Directories whose path starts with `ignored_prefix` (taken relative to
/// the root being walked) are not entered. A file reached from two roots
/// is collected once.
pub fn discover(
    registry: &Registry,
    roots: &[PathBuf],
    ignored_prefix: Option<&Path>,
    logger: &Logger,
) -> Result<Vec<DiscoveredSuite>, DiscoveryError> {
    let mut suites = Vec::new();
    let mut seen = HashSet::new();

    for root in roots {
        if !root.exists() {
            return Err(DiscoveryError::MissingRoot(root.clone()));
        }
        let ignored = ignored_prefix.map(|prefix| root.join(prefix));

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && entry.depth() > 0
                    && ignored.as_ref().is_some_and(|i| entry.path().starts_with(i)))
            });

        for entry in walker {
            let entry = entry.map_err(|source| DiscoveryError::Walk {
                root: root.clone(),
                source,
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_test_file(path) {
                continue;
            }
            let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            if !seen.insert(canonical.clone()) {
                continue;
            }

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            for class in registry.classes_in(path, &canonical) {
                if is_excluded(class.name) {
                    continue;
                }
                let cases: Vec<TestCase> = registry
                    .methods_of(&class)
                    .into_iter()
                    .map(|method| TestCase { class, method })
                    .collect();
                if cases.is_empty() {
                    continue;
                }
                log_debug!(
                    logger,
                    Facility::Discovery,
                    "{}: {} with {} test(s)",
                    path.display(),
                    class.name,
                    cases.len()
                );
                suites.push(DiscoveredSuite {
                    name: format!("{}{}", file_name, class.name),
                    path: path.to_path_buf(),
                    cases,
                });
            }
        }
    }
    Ok(suites)
}
