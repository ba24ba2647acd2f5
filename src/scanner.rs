use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Files above this size are assumed to be generated
const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Per-repository ignore file, one glob per line
pub const IGNORE_FILE: &str = ".debtbombignore";

/// Directory names that are never descended into
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    // version control
    ".git", ".svn", ".hg",
    // dependencies
    "node_modules", "vendor", "bower_components", "third_party", "third-party", "external",
    "deps", ".venv", "venv", "env",
    // build output
    "dist", "build", "out", "target", "coverage", "bin", "pkg", "obj", ".next", ".nuxt",
    ".cdk.out", ".terraform", ".terragrunt-cache", "pulumi", ".storybook",
    // caches
    ".tmp", ".temp", ".cache", ".turbo", ".parcel-cache", ".esbuild", ".gradle", ".mvn",
    "__pycache__", ".mypy_cache", ".pytest_cache", ".vite",
    // IDEs
    ".idea", ".vscode",
];

const IGNORED_EXTENSIONS: &[&str] = &[
    // images and media
    "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "bmp", "tiff", "mp4", "mov", "avi", "mkv",
    "mp3", "wav", "flac", "ogg",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    // archives
    "zip", "tar", "gz", "7z", "rar", "jar", "war",
    // binaries and objects
    "exe", "dll", "so", "dylib", "bin", "o", "a", "test", "class", "pyc",
    // fonts
    "eot", "ttf", "woff", "woff2",
    // logs and lockfiles
    "log", "lock",
];

const IGNORED_SUFFIXES: &[&str] = &[".min.js", ".min.css"];

/// Walks a scan root and yields candidate source files.
///
/// Construction fails if the root cannot be read; everything after that is
/// best effort. Each call to [`Traverser::paths`] starts a fresh walk.
#[derive(Debug, Clone)]
pub struct Traverser {
    root: PathBuf,
    excluded_dirs: Vec<String>,
    ignore_patterns: Option<GlobSet>,
}

impl Traverser {
    /// Traverser with the default directory denylist and the root's ignore file
    pub fn new(root: &Path) -> Result<Self> {
        let excluded = DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect();
        Self::with_excluded_dirs(root, excluded)
    }

    pub fn with_excluded_dirs(root: &Path, excluded_dirs: Vec<String>) -> Result<Self> {
        fs::read_dir(root)
            .with_context(|| format!("Failed to read scan root: {}", root.display()))?;

        let patterns = load_ignore_patterns(root);
        let ignore_patterns = build_globset(&patterns);

        Ok(Self {
            root: root.to_path_buf(),
            excluded_dirs,
            ignore_patterns,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily walk the tree, yielding paths of files worth scanning
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> {
        let root = self.root.clone();
        let excluded_dirs = self.excluded_dirs.clone();
        let ignore_patterns = self.ignore_patterns.clone();

        let mut walker = WalkBuilder::new(&self.root);
        walker.standard_filters(false);

        walker.filter_entry(move |entry| {
            // Never filter out the root itself
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
            let name = entry.file_name().to_str().unwrap_or("");

            if is_dir && excluded_dirs.iter().any(|excluded| excluded == name) {
                return false;
            }
            match ignore_patterns {
                Some(ref globs) => !is_ignored_by_patterns(globs, &root, entry),
                None => true,
            }
        });

        walker
            .build()
            .filter_map(|result| match result {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!("Skipping unreadable path: {}", err);
                    None
                }
            })
            .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .filter(|entry| !is_ignored_extension(entry.path()))
            .filter(|entry| match entry.metadata() {
                Ok(metadata) => metadata.len() <= MAX_FILE_SIZE,
                Err(_) => false,
            })
            .map(DirEntry::into_path)
    }
}

/// Read the root-level ignore file; missing or unreadable yields no patterns
pub fn load_ignore_patterns(root: &Path) -> Vec<String> {
    let path = root.join(IGNORE_FILE);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(_) => return Vec::new(),
    };

    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_end_matches('/').to_string())
        .collect()
}

/// Compile ignore globs so that `*` does not cross directory separators
fn build_globset(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => warn!("Ignoring invalid pattern '{}' in {}: {}", pattern, IGNORE_FILE, err),
        }
    }

    match builder.build() {
        Ok(set) => Some(set),
        Err(err) => {
            warn!("Failed to compile {} patterns: {}", IGNORE_FILE, err);
            None
        }
    }
}

/// Patterns are tried against the bare name and the root-relative path
fn is_ignored_by_patterns(globs: &GlobSet, root: &Path, entry: &DirEntry) -> bool {
    if globs.is_match(entry.file_name()) {
        return true;
    }
    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    globs.is_match(relative)
}

/// Check if a file is binary, media, an archive or a lockfile by name
pub fn is_ignored_extension(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_lowercase(),
        None => return false,
    };

    if name == ".ds_store" || IGNORED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        return true;
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => IGNORED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}
