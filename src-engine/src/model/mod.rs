//! Model asset resolution and provisioning.
//!
//! Model binaries are resolved from a priority-ordered candidate list
//! (most capable first), cached on disk, and placed where the inference
//! module can read them: its virtual filesystem when the loaded variant
//! exposes one, host memory otherwise.

pub mod provision;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};

/// Minimum plausible size for a model binary. Downloads below this are
/// treated as truncated and rejected.
pub const MIN_MODEL_BYTES: u64 = 10 * 1024 * 1024;

/// Built-in model candidates, most capable first.
pub const DEFAULT_MODEL_NAMES: &[&str] =
    &["ggml-medium.en.bin", "ggml-base.en.bin", "ggml-tiny.en.bin"];

/// Base URL for fetching the built-in models.
const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Where a model candidate can be obtained.
#[derive(Debug, Clone)]
pub enum ModelOrigin {
    /// A file already on the local filesystem
    CachePath(PathBuf),
    /// A remote origin, fetched once and cached by name
    Remote { url: String },
}

/// A named model binary candidate.
#[derive(Debug, Clone)]
pub struct ModelAsset {
    /// Cache/VFS name for the binary (e.g. "ggml-base.en.bin")
    pub name: String,
    /// Where to obtain the bytes
    pub origin: ModelOrigin,
}

/// Placement of provisioned model bytes.
#[derive(Clone)]
pub enum ModelPlacement {
    /// Staged into the module's virtual filesystem under this name
    VirtualFs(String),
    /// Held in host memory for buffer-based session initialization
    InMemory(Arc<Vec<u8>>),
}

impl fmt::Debug for ModelPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelPlacement::VirtualFs(name) => write!(f, "VirtualFs({})", name),
            ModelPlacement::InMemory(bytes) => write!(f, "InMemory({} bytes)", bytes.len()),
        }
    }
}

/// A successfully provisioned model, bound to the module that received it.
#[derive(Debug, Clone)]
pub struct ActiveModel {
    /// Candidate name the provisioning settled on
    pub name: String,
    /// Size of the model binary
    pub byte_len: u64,
    /// Where the bytes ended up
    pub placement: ModelPlacement,
}

/// Default model cache directory under the platform cache dir.
pub fn default_model_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.cache_dir().join("sotto").join("models"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Remote URL for a built-in model name.
pub fn remote_url(name: &str) -> String {
    format!("{}/{}", MODEL_BASE_URL, name)
}

/// Build the candidate list for a requested model.
///
/// `spec` may be a filesystem path (used verbatim), a model name (cached
/// by name, fetched on miss), or None for the built-in candidate table.
pub fn candidates_for(spec: Option<&str>, _model_dir: &Path) -> Vec<ModelAsset> {
    match spec {
        Some(s) if looks_like_path(s) => vec![ModelAsset {
            name: file_name_of(s),
            origin: ModelOrigin::CachePath(PathBuf::from(s)),
        }],
        Some(name) => vec![ModelAsset {
            name: name.to_string(),
            origin: ModelOrigin::Remote {
                url: remote_url(name),
            },
        }],
        None => DEFAULT_MODEL_NAMES
            .iter()
            .map(|name| ModelAsset {
                name: (*name).to_string(),
                origin: ModelOrigin::Remote {
                    url: remote_url(name),
                },
            })
            .collect(),
    }
}

fn looks_like_path(s: &str) -> bool {
    s.contains('/') || s.contains('\\') || Path::new(s).exists()
}

fn file_name_of(s: &str) -> String {
    Path::new(s)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| s.to_string())
}

/// A model binary present in the local cache.
#[derive(Debug, Clone)]
pub struct InstalledModel {
    /// File name
    pub name: String,
    /// Size on disk
    pub size_bytes: u64,
    /// Last modification time
    pub modified: DateTime<Local>,
}

/// List model binaries in the cache directory, newest first.
pub fn installed_models(model_dir: &Path) -> std::io::Result<Vec<InstalledModel>> {
    let mut models = Vec::new();
    if !model_dir.exists() {
        return Ok(models);
    }

    for entry in std::fs::read_dir(model_dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta
            .modified()
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());
        models.push(InstalledModel {
            name: entry.file_name().to_string_lossy().into_owned(),
            size_bytes: meta.len(),
            modified,
        });
    }

    models.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_default_order_most_capable_first() {
        let candidates = candidates_for(None, Path::new("/tmp"));
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].name, "ggml-medium.en.bin");
        assert_eq!(candidates[2].name, "ggml-tiny.en.bin");
        assert!(matches!(candidates[0].origin, ModelOrigin::Remote { .. }));
    }

    #[test]
    fn test_candidates_for_explicit_path() {
        let candidates = candidates_for(Some("/models/custom.bin"), Path::new("/tmp"));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "custom.bin");
        assert!(matches!(candidates[0].origin, ModelOrigin::CachePath(_)));
    }

    #[test]
    fn test_candidates_for_name_resolves_remote() {
        let candidates = candidates_for(Some("ggml-small.en.bin"), Path::new("/tmp"));
        assert_eq!(candidates.len(), 1);
        match &candidates[0].origin {
            ModelOrigin::Remote { url } => assert!(url.ends_with("/ggml-small.en.bin")),
            other => panic!("expected remote origin, got {:?}", other),
        }
    }

    #[test]
    fn test_installed_models_missing_dir_is_empty() {
        let models = installed_models(Path::new("/nonexistent/sotto-models")).unwrap();
        assert!(models.is_empty());
    }

    #[test]
    fn test_placement_debug_hides_bytes() {
        let placement = ModelPlacement::InMemory(Arc::new(vec![0u8; 128]));
        assert_eq!(format!("{:?}", placement), "InMemory(128 bytes)");
    }
}
