//! Static asset mirroring.
//!
//! The assets root is walked depth-first with directories ahead of their
//! children. All destination directories are created in a sequential first
//! pass, then files are copied in parallel.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

/// Kind of node in the assets tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Directory,
    File,
}

/// A node in the assets tree and where it is mirrored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetNode {
    /// Path under the assets root
    pub source: PathBuf,

    /// Same relative path under the build root
    pub dest: PathBuf,

    pub kind: AssetKind,
}

/// Errors for a single asset node.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to read asset tree at {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of a mirror pass.
#[derive(Debug, Default)]
pub struct MirrorReport {
    /// Directories created or already present
    pub directories: Vec<AssetNode>,

    /// Files copied
    pub files: Vec<AssetNode>,

    /// Bytes written across all files
    pub bytes: u64,

    /// Failed nodes
    pub errors: Vec<AssetError>,
}

impl MirrorReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Mirrors an assets tree into the build root.
#[derive(Debug, Clone)]
pub struct AssetMirror {
    source_root: PathBuf,
    dest_root: PathBuf,
}

impl AssetMirror {
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
        }
    }

    /// Destination for a path under the assets root.
    pub fn dest_for(&self, source: &Path) -> Option<PathBuf> {
        source
            .strip_prefix(&self.source_root)
            .ok()
            .map(|relative| self.dest_root.join(relative))
    }

    /// Lazily walk the assets tree, depth-first, directories before their contents.
    pub fn nodes(&self) -> impl Iterator<Item = Result<AssetNode, AssetError>> + '_ {
        WalkDir::new(&self.source_root)
            .follow_links(true)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .map(move |entry| {
                let entry = entry.map_err(|e| AssetError::Walk {
                    path: e.path().unwrap_or(&self.source_root).to_path_buf(),
                    source: e.into(),
                })?;

                let kind = if entry.file_type().is_dir() {
                    AssetKind::Directory
                } else {
                    AssetKind::File
                };
                let source = entry.into_path();
                let dest = self.dest_for(&source).ok_or_else(|| AssetError::Walk {
                    path: source.clone(),
                    source: io::Error::other("path escapes the assets root"),
                })?;

                Ok(AssetNode { source, dest, kind })
            })
    }

    /// Mirror the whole tree. Failures are collected per node; siblings still proceed.
    pub fn mirror(&self) -> MirrorReport {
        let mut report = MirrorReport::default();

        if !self.source_root.exists() {
            tracing::warn!(
                "Assets directory not found: {}",
                self.source_root.display()
            );
            return report;
        }

        let mut pending = Vec::new();
        for node in self.nodes() {
            match node {
                Ok(node) if node.kind == AssetKind::Directory => {
                    match fs::create_dir_all(&node.dest) {
                        Ok(()) => {
                            tracing::debug!("Created directory {}", node.dest.display());
                            report.directories.push(node);
                        }
                        Err(source) => {
                            let err = AssetError::CreateDir {
                                path: node.source,
                                source,
                            };
                            tracing::warn!("{}", err);
                            report.errors.push(err);
                        }
                    }
                }
                Ok(node) => pending.push(node),
                Err(err) => {
                    tracing::warn!("{}", err);
                    report.errors.push(err);
                }
            }
        }

        let copied: Vec<Result<(AssetNode, u64), AssetError>> = pending
            .into_par_iter()
            .map(|node| {
                let bytes = copy_file(&node.source, &node.dest).map_err(|source| {
                    AssetError::Copy {
                        from: node.source.clone(),
                        to: node.dest.clone(),
                        source,
                    }
                })?;
                tracing::debug!(
                    "Copied {} to {}",
                    node.source.display(),
                    node.dest.display()
                );
                Ok((node, bytes))
            })
            .collect();

        for result in copied {
            match result {
                Ok((node, bytes)) => {
                    report.bytes += bytes;
                    report.files.push(node);
                }
                Err(err) => {
                    tracing::warn!("{}", err);
                    report.errors.push(err);
                }
            }
        }

        report
    }
}

/// Copy the exact byte stream of `source` into `dest`, truncating `dest`.
pub fn copy_file(source: &Path, dest: &Path) -> io::Result<u64> {
    let mut reader = File::open(source)?;
    let mut writer = File::create(dest)?;
    io::copy(&mut reader, &mut writer)
}
