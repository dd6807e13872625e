use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::program::ProgramDescriptor;
use crate::source_code::ShaderStage;

/// Asset library failures. Discriminants mirror the engine's numeric IO error codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("file already exists: {0}")]
    FileAlreadyExists(PathBuf),
    #[error("cannot read {path}: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("cannot write {path}: {reason}")]
    Write { path: PathBuf, reason: String },
    #[error("cannot parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("unknown asset type for {0}")]
    UnknownType(PathBuf),
    #[error("path escapes the asset root: {0}")]
    OutsideRoot(PathBuf),
}

impl IoError {
    pub fn code(&self) -> i32 {
        match self {
            IoError::FileNotFound(_) => 1,
            IoError::FileAlreadyExists(_) => 2,
            IoError::Read { .. } => 3,
            IoError::Write { .. } => 4,
            IoError::Parse { .. } => 5,
            IoError::UnknownType(_) => 6,
            IoError::OutsideRoot(_) => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Shader(ShaderStage),
    TimelineScript,
    ScriptHeader,
    Program,
    Texture,
    Mesh,
}

impl AssetType {
    pub const ALL: [AssetType; 11] = [
        AssetType::Shader(ShaderStage::Vertex),
        AssetType::Shader(ShaderStage::TessControl),
        AssetType::Shader(ShaderStage::TessEvaluation),
        AssetType::Shader(ShaderStage::Geometry),
        AssetType::Shader(ShaderStage::Pixel),
        AssetType::Shader(ShaderStage::Compute),
        AssetType::TimelineScript,
        AssetType::ScriptHeader,
        AssetType::Program,
        AssetType::Texture,
        AssetType::Mesh,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            AssetType::Shader(stage) => stage.extension(),
            AssetType::TimelineScript => "bs",
            AssetType::ScriptHeader => "bsh",
            AssetType::Program => "pas",
            AssetType::Texture => "tex",
            AssetType::Mesh => "mesh",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|ty| ty.extension() == ext)
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetType::Shader(_) => "Shaders",
            AssetType::TimelineScript => "Timeline Scripts",
            AssetType::ScriptHeader => "Script Headers",
            AssetType::Program => "Programs",
            AssetType::Texture => "Textures",
            AssetType::Mesh => "Meshes",
        }
    }

    /// Whether the editor can open this type as a runtime object.
    pub fn is_openable(self) -> bool {
        !matches!(self, AssetType::Texture | AssetType::Mesh)
    }

    pub fn is_source_code(self) -> bool {
        matches!(self, AssetType::Shader(_) | AssetType::TimelineScript | AssetType::ScriptHeader)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetContents {
    Text(String),
    Program(ProgramDescriptor),
}

/// An asset file read into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub path: PathBuf,
    pub asset_type: AssetType,
    pub contents: AssetContents,
}

/// File-backed asset library rooted at a directory. Paths given to it are relative to the root.
#[derive(Debug, Clone)]
pub struct AssetLibrary {
    root: PathBuf,
}

impl AssetLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical spelling of a path inside the library: `.` components dropped. Paths leaving
    /// the root are rejected.
    pub fn normalize(relative: &Path) -> Result<PathBuf, IoError> {
        let mut normal = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::CurDir => {}
                Component::Normal(part) => normal.push(part),
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(IoError::OutsideRoot(relative.to_path_buf()));
                }
            }
        }
        Ok(normal)
    }

    pub fn resolve(&self, relative: &Path) -> Result<PathBuf, IoError> {
        Ok(self.root.join(Self::normalize(relative)?))
    }

    pub fn load_asset(&self, relative: &Path) -> Result<Asset, IoError> {
        let asset_type = AssetType::from_path(relative).ok_or_else(|| IoError::UnknownType(relative.into()))?;
        let normal = Self::normalize(relative)?;
        let relative = normal.as_path();
        let full = self.root.join(relative);
        let text = fs::read_to_string(&full).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => IoError::FileNotFound(relative.into()),
            _ => IoError::Read { path: relative.into(), reason: err.to_string() },
        })?;
        let contents = match asset_type {
            AssetType::Program => {
                let descriptor = serde_json::from_str(&text)
                    .map_err(|err| IoError::Parse { path: relative.into(), reason: err.to_string() })?;
                AssetContents::Program(descriptor)
            }
            _ => AssetContents::Text(text),
        };
        Ok(Asset { path: relative.to_path_buf(), asset_type, contents })
    }

    /// Creates an empty asset on disk. Fails if the file already exists.
    pub fn create_blank_asset(&self, relative: &Path) -> Result<Asset, IoError> {
        let asset_type = AssetType::from_path(relative).ok_or_else(|| IoError::UnknownType(relative.into()))?;
        let full = self.resolve(relative)?;
        if full.exists() {
            return Err(IoError::FileAlreadyExists(relative.into()));
        }
        let contents = match asset_type {
            AssetType::Program => AssetContents::Program(ProgramDescriptor::named(program_name_from_path(relative))),
            _ => AssetContents::Text(String::new()),
        };
        let asset = Asset { path: relative.to_path_buf(), asset_type, contents };
        self.save_asset(&asset)?;
        Ok(asset)
    }

    pub fn save_asset(&self, asset: &Asset) -> Result<(), IoError> {
        let full = self.resolve(&asset.path)?;
        let write_err = |err: io::Error| IoError::Write { path: asset.path.clone(), reason: err.to_string() };
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let bytes = match &asset.contents {
            AssetContents::Text(text) => text.clone().into_bytes(),
            AssetContents::Program(descriptor) => serde_json::to_vec_pretty(descriptor)
                .map_err(|err| IoError::Write { path: asset.path.clone(), reason: err.to_string() })?,
        };
        fs::write(&full, bytes).map_err(write_err)
    }

    /// All known asset files below the root, as sorted relative paths.
    pub fn list_assets(&self) -> Result<Vec<(PathBuf, AssetType)>, IoError> {
        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let entries = fs::read_dir(&dir)
                .map_err(|err| IoError::Read { path: dir.clone(), reason: err.to_string() })?;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Some(asset_type) = AssetType::from_path(&path) else {
                    continue;
                };
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    found.push((relative.to_path_buf(), asset_type));
                }
            }
        }
        found.sort();
        Ok(found)
    }
}

/// Program name derived from the file stem, `unnamed` when there is none.
pub fn program_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("unnamed")
        .to_string()
}
