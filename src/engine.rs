//! Parsing engine boundary
//!
//! The tracker never looks inside an analyzed unit. It hands an
//! [`UpdateInput`] to a [`ParsingEngine`] and gets back an owned
//! [`TranslationUnit`] plus the set of files the unit was found to read.
//!
//! [`TreeSitterEngine`] is the bundled engine. It parses C and C++ sources
//! with tree-sitter and follows `#include` directives transitively to build
//! the dependency set:
//!
//! ```text
//! main.cpp ──#include "util.h"──> util.h ──#include <detail/impl.h>──> impl.h
//!    │                                            (resolved via -I dirs)
//!    └─ depended_on_file_paths = {main.cpp, util.h, impl.h}
//! ```

use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

use crate::fs_utils::normalize_path;
use crate::lang::Lang;
use crate::unsaved_files::UnsavedFilesSnapshot;
use crate::updater::UpdateInput;

/// Failure reported by a parsing engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The main file of the unit could not be found.
    #[error("File is missing: {}", path.display())]
    FileMissing { path: PathBuf },

    #[error("{message}")]
    Failed { message: String },
}

/// What a successful analysis produces.
#[derive(Debug)]
pub struct EngineOutput {
    pub translation_unit: TranslationUnit,
    pub depended_on_file_paths: HashSet<PathBuf>,
}

/// An engine that turns an update input into an analyzed unit.
///
/// Implementations run on worker threads, outside every tracker lock.
pub trait ParsingEngine: Send + Sync {
    fn analyze(&self, input: &UpdateInput) -> Result<EngineOutput, EngineError>;
}

/// Exclusively owned handle to an engine's analysis result.
///
/// The payload is released when the unit is dropped, which happens when a
/// document gets a newer unit or the document itself goes away.
pub struct TranslationUnit {
    file_path: PathBuf,
    payload: Box<dyn Any + Send + Sync>,
}

impl TranslationUnit {
    pub fn new(file_path: impl Into<PathBuf>, payload: impl Any + Send + Sync) -> Self {
        Self {
            file_path: file_path.into(),
            payload: Box::new(payload),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Typed access to the engine payload.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for TranslationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationUnit")
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl Drop for TranslationUnit {
    fn drop(&mut self) {
        tracing::trace!("[ENGINE] Released translation unit for {:?}", self.file_path);
    }
}

// ============================================================================
// Include resolution
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    /// `#include "file.h"`
    Quoted,
    /// `#include <file.h>`
    Angled,
}

/// One `#include` directive found in a scanned file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    /// File containing the directive
    pub including_file: PathBuf,
    /// Text between the delimiters
    pub spelling: String,
    pub kind: IncludeKind,
    /// Where the directive resolved to, if anywhere
    pub resolved: Option<PathBuf>,
}

/// Include directories derived from a command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeSearchPaths {
    /// Searched for quoted includes only (`-iquote`)
    pub quote: Vec<PathBuf>,
    /// Searched for every include (`-I`, `/I` on Windows, and `-isystem` when enabled)
    pub angled: Vec<PathBuf>,
}

impl IncludeSearchPaths {
    /// Collect include directories from compiler arguments, in order.
    pub fn from_arguments(arguments: &[String], include_system_headers: bool) -> Self {
        let mut paths = Self::default();
        let mut iter = arguments.iter();

        while let Some(argument) = iter.next() {
            if takes_separate_operand(argument) {
                iter.next();
                continue;
            }
            let (flag, inline) = split_include_flag(argument);
            let Some(flag) = flag else { continue };
            let dir = if inline.is_empty() {
                match iter.next() {
                    Some(next) => next.as_str(),
                    None => break,
                }
            } else {
                inline
            };
            let dir = normalize_path(Path::new(dir));

            match flag {
                IncludeFlag::Quote => paths.quote.push(dir),
                IncludeFlag::Directory => paths.angled.push(dir),
                IncludeFlag::System if include_system_headers => paths.angled.push(dir),
                IncludeFlag::System => {}
            }
        }

        paths
    }

    /// Resolve an include the way a preprocessor would, returning the first
    /// candidate that exists in the overlay or on disk.
    pub fn resolve(
        &self,
        spelling: &str,
        kind: IncludeKind,
        including_file: &Path,
        unsaved_files: &UnsavedFilesSnapshot,
    ) -> Option<PathBuf> {
        let exists = |candidate: &Path| {
            unsaved_files.content(candidate).is_some() || candidate.is_file()
        };

        if Path::new(spelling).is_absolute() {
            let candidate = normalize_path(Path::new(spelling));
            return exists(candidate.as_path()).then_some(candidate);
        }

        let including_dir = including_file.parent().map(Path::to_path_buf);
        let quoted_dirs = including_dir.iter().chain(self.quote.iter());
        let dirs: Vec<&PathBuf> = match kind {
            IncludeKind::Quoted => quoted_dirs.chain(self.angled.iter()).collect(),
            IncludeKind::Angled => self.angled.iter().collect(),
        };

        dirs.into_iter()
            .map(|dir| normalize_path(&dir.join(spelling)))
            .find(|candidate| exists(candidate.as_path()))
    }
}

#[derive(Debug, Clone, Copy)]
enum IncludeFlag {
    Quote,
    Directory,
    System,
}

fn split_include_flag(argument: &str) -> (Option<IncludeFlag>, &str) {
    // Longer prefixes first: "-isystem" and "-iquote" also start with "-i".
    if let Some(rest) = argument.strip_prefix("-isystem") {
        (Some(IncludeFlag::System), rest)
    } else if let Some(rest) = argument.strip_prefix("-iquote") {
        (Some(IncludeFlag::Quote), rest)
    } else if let Some(rest) = argument.strip_prefix("-I") {
        (Some(IncludeFlag::Directory), rest)
    } else if let Some(rest) = argument.strip_prefix("/I").filter(|_| cfg!(windows)) {
        // MSVC spelling; on Unix this is an absolute path.
        (Some(IncludeFlag::Directory), rest)
    } else {
        (None, argument)
    }
}

/// Flags whose operand is the next argument and may look like a path.
fn takes_separate_operand(argument: &str) -> bool {
    matches!(
        argument,
        "-include" | "-imacros" | "-o" | "-x" | "-MF" | "-MT" | "-MQ" | "-Xclang"
    )
}

// ============================================================================
// Tree-sitter engine
// ============================================================================

/// The analyzed unit produced by [`TreeSitterEngine`].
#[derive(Debug)]
pub struct SyntaxUnit {
    pub lang: Lang,
    pub source: Arc<[u8]>,
    pub tree: Tree,
    /// Every include directive of every scanned file, in scan order
    pub includes: Vec<IncludeDirective>,
}

/// Include-scanning engine built on tree-sitter.
#[derive(Debug, Clone, Default)]
pub struct TreeSitterEngine {
    include_system_headers: bool,
}

impl TreeSitterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also follow includes found through `-isystem` directories.
    pub fn with_system_headers(mut self, include_system_headers: bool) -> Self {
        self.include_system_headers = include_system_headers;
        self
    }
}

impl ParsingEngine for TreeSitterEngine {
    fn analyze(&self, input: &UpdateInput) -> Result<EngineOutput, EngineError> {
        let main_file = input.file_path.clone();
        let unsaved_files = &input.unsaved_files;
        let search_paths =
            IncludeSearchPaths::from_arguments(input.configuration_arguments(), self.include_system_headers);

        let main_source = read_source(&main_file, unsaved_files).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                EngineError::FileMissing {
                    path: main_file.clone(),
                }
            } else {
                EngineError::Failed {
                    message: format!("Failed to read {}: {}", main_file.display(), e),
                }
            }
        })?;

        let mut parser = Parser::new();
        let main_lang = Lang::from_path(&main_file);
        let main_tree = parse_source(&mut parser, main_lang, &main_source)?;

        let mut depended_on_file_paths = HashSet::from([main_file.clone()]);
        let mut includes = Vec::new();
        let mut queue = VecDeque::new();

        collect_includes(
            &main_tree,
            &main_source,
            &main_file,
            &search_paths,
            unsaved_files,
            &mut includes,
        );
        enqueue_new(&includes, &mut depended_on_file_paths, &mut queue);

        while let Some(header) = queue.pop_front() {
            let source = match read_source(&header, unsaved_files) {
                Ok(source) => source,
                Err(e) => {
                    // Resolved a moment ago; it may have been removed since.
                    tracing::debug!("[ENGINE] Skipping unreadable header {:?}: {}", header, e);
                    continue;
                }
            };
            let tree = parse_source(&mut parser, Lang::from_path(&header), &source)?;

            let first_new = includes.len();
            collect_includes(&tree, &source, &header, &search_paths, unsaved_files, &mut includes);
            enqueue_new(&includes[first_new..], &mut depended_on_file_paths, &mut queue);
        }

        tracing::debug!(
            "[ENGINE] Scanned {:?}: {} include directives, {} dependencies",
            main_file,
            includes.len(),
            depended_on_file_paths.len()
        );

        let unit = SyntaxUnit {
            lang: main_lang,
            source: main_source,
            tree: main_tree,
            includes,
        };

        Ok(EngineOutput {
            translation_unit: TranslationUnit::new(main_file, unit),
            depended_on_file_paths,
        })
    }
}

fn read_source(path: &Path, unsaved_files: &UnsavedFilesSnapshot) -> io::Result<Arc<[u8]>> {
    match unsaved_files.shared_content(path) {
        Some(content) => Ok(content),
        None => std::fs::read(path).map(Arc::from),
    }
}

fn parse_source(parser: &mut Parser, lang: Lang, source: &[u8]) -> Result<Tree, EngineError> {
    parser
        .set_language(&lang.tree_sitter_language())
        .map_err(|e| EngineError::Failed {
            message: format!("Failed to set language: {}", e),
        })?;
    parser.parse(source, None).ok_or_else(|| EngineError::Failed {
        message: "Parse failed".to_string(),
    })
}

/// Find every include directive in `tree`, including those nested in
/// conditional blocks, in source order.
fn collect_includes(
    tree: &Tree,
    source: &[u8],
    including_file: &Path,
    search_paths: &IncludeSearchPaths,
    unsaved_files: &UnsavedFilesSnapshot,
    out: &mut Vec<IncludeDirective>,
) {
    let mut stack: Vec<Node> = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        if node.kind() == "preproc_include" {
            if let Some((spelling, kind)) = include_spelling(&node, source) {
                let resolved = search_paths.resolve(&spelling, kind, including_file, unsaved_files);
                out.push(IncludeDirective {
                    including_file: including_file.to_path_buf(),
                    spelling,
                    kind,
                    resolved,
                });
            }
            continue;
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}

fn include_spelling(node: &Node, source: &[u8]) -> Option<(String, IncludeKind)> {
    let path = node.child_by_field_name("path")?;
    let text = path.utf8_text(source).ok()?;

    match path.kind() {
        "string_literal" => Some((text.trim_matches('"').to_string(), IncludeKind::Quoted)),
        "system_lib_string" => Some((
            text.trim_start_matches('<').trim_end_matches('>').to_string(),
            IncludeKind::Angled,
        )),
        // Macro-expanded includes cannot be resolved without a preprocessor.
        _ => None,
    }
}

fn enqueue_new(
    includes: &[IncludeDirective],
    seen: &mut HashSet<PathBuf>,
    queue: &mut VecDeque<PathBuf>,
) {
    for resolved in includes.iter().filter_map(|include| include.resolved.as_ref()) {
        if seen.insert(resolved.clone()) {
            queue.push_back(resolved.clone());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
