//! Sketch naming and on-disk layout.
//!
//! Follows the Arduino IDE convention of one sketch per directory: sketch
//! `blink` lives at `sketches/blink/blink.ino` unless an explicit directory
//! is given.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::SketchError;
use crate::redefine::{self, MacroOverride};

/// Source file extension recognized by the toolchain.
pub const SKETCH_EXTENSION: &str = "ino";

/// Collection directory holding one subdirectory per sketch.
pub const SKETCH_ROOT: &str = "sketches";

/// Everything the command layer hands over for one build.
#[derive(Debug, Clone, Default)]
pub struct SketchRequest {
    pub name: String,
    pub dir: Option<PathBuf>,
    pub board: Option<String>,
    pub port: Option<String>,
    pub check_only: bool,
    pub verbose: bool,
    pub quiet: bool,
    pub redefines: Vec<MacroOverride>,
}

/// Where a sketch lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSketch {
    pub path: PathBuf,
    pub project_dir: String,
}

/// Result of writing a sketch file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Overwritten,
}

/// Split a logical sketch name into `(project_dir, file_name)`.
pub fn split_name(name: &str) -> (String, String) {
    let suffix = format!(".{SKETCH_EXTENSION}");
    match name.strip_suffix(&suffix) {
        Some(stem) if !stem.is_empty() => (stem.to_string(), name.to_string()),
        _ => (name.to_string(), format!("{name}{suffix}")),
    }
}

/// Resolves sketch names relative to a base (working) directory.
#[derive(Debug, Clone)]
pub struct SketchResolver {
    base: PathBuf,
}

impl SketchResolver {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Resolver rooted at the process working directory.
    pub fn from_current_dir() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// The collection directory, `<base>/sketches`.
    pub fn root(&self) -> PathBuf {
        self.base.join(SKETCH_ROOT)
    }

    /// Resolve a logical name and optional directory override.
    ///
    /// Creates the containing directory if it is missing. Never touches the
    /// sketch file itself.
    pub fn resolve(&self, name: &str, dir: Option<&Path>) -> Result<ResolvedSketch, SketchError> {
        let (project_dir, file_name) = split_name(name);

        let containing = match dir {
            None => {
                let root = self.root();
                if !root.is_dir() {
                    info!("Creating sketches directory {}", root.display());
                }
                let project = root.join(&project_dir);
                ensure_dir(&root)?;
                ensure_dir(&project)?;
                project
            }
            Some(d) if d.is_absolute() => d.to_path_buf(),
            Some(d) => self.base.join(d),
        };
        if dir.is_some() {
            ensure_dir(&containing)?;
        }

        Ok(ResolvedSketch {
            path: containing.join(file_name),
            project_dir,
        })
    }

    /// File names inside `sketches/<name>`, sorted.
    pub fn list_dir(&self, name: &str) -> Result<Vec<String>, SketchError> {
        let path = self.root().join(name);
        let entries = fs::read_dir(&path).map_err(|source| SketchError::ListDir {
            path: path.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SketchError::ListDir {
                path: path.clone(),
                source,
            })?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

fn ensure_dir(path: &Path) -> Result<(), SketchError> {
    fs::create_dir_all(path).map_err(|source| SketchError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the text a sketch should be written from.
///
/// `source` wins when given; otherwise the existing sketch is re-read, and a
/// sketch that does not exist yet starts empty.
pub fn load_source(sketch: &ResolvedSketch, source: Option<&Path>) -> Result<String, SketchError> {
    let path = source.unwrap_or(&sketch.path);
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if source.is_none() && e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(SketchError::ReadSketch {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write `text` to the sketch path after applying `overrides`.
pub fn write_sketch(
    sketch: &ResolvedSketch,
    text: &str,
    overrides: &[MacroOverride],
) -> Result<WriteOutcome, SketchError> {
    let outcome = if sketch.path.exists() {
        WriteOutcome::Overwritten
    } else {
        WriteOutcome::Created
    };

    fs::write(&sketch.path, redefine::rewrite(text, overrides)).map_err(|source| {
        SketchError::WriteSketch {
            path: sketch.path.clone(),
            source,
        }
    })?;

    Ok(outcome)
}
