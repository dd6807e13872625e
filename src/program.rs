use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::source_code::{compile, ShaderStage, SourceCode};

/// On-disk program description (`.pas`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgramDescriptor {
    pub name: String,
    #[serde(default)]
    pub shaders: Vec<ProgramShaderRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramShaderRef {
    pub stage: ShaderStage,
    pub path: PathBuf,
}

impl ProgramDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), shaders: Vec::new() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkingEventKind {
    LinkingSuccess,
    IncompleteStages,
    ShaderCompilationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutput {
    pub kind: LinkingEventKind,
    pub log: String,
}

/// Engine-side program object: an ordered set of shader stages, at most one per stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub path: PathBuf,
    pub name: String,
    shaders: Vec<SourceCode>,
    pub valid: bool,
}

impl Program {
    pub fn new(path: PathBuf, name: String) -> Self {
        Self { path, name, shaders: Vec::new(), valid: false }
    }

    pub fn shaders(&self) -> &[SourceCode] {
        &self.shaders
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn stage_of(shader: &SourceCode) -> Option<ShaderStage> {
        match shader.kind {
            crate::source_code::SourceKind::Shader(stage) => Some(stage),
            _ => None,
        }
    }

    /// Installs a shader, replacing whatever occupied its stage.
    pub fn set_shader(&mut self, shader: SourceCode) {
        let stage = Self::stage_of(&shader);
        self.shaders.retain(|existing| Self::stage_of(existing) != stage);
        self.shaders.push(shader);
        self.shaders.sort_by_key(|shader| Self::stage_of(shader));
    }

    /// Removes the shader bound to `stage`. Returns whether one was present.
    pub fn remove_shader(&mut self, stage: ShaderStage) -> bool {
        let before = self.shaders.len();
        self.shaders.retain(|existing| Self::stage_of(existing) != Some(stage));
        before != self.shaders.len()
    }

    pub fn descriptor(&self) -> ProgramDescriptor {
        ProgramDescriptor {
            name: self.name.clone(),
            shaders: self
                .shaders
                .iter()
                .filter_map(|shader| {
                    Self::stage_of(shader).map(|stage| ProgramShaderRef { stage, path: shader.path.clone() })
                })
                .collect(),
        }
    }

    pub fn link(&mut self) -> LinkOutput {
        let stages: Vec<ShaderStage> = self.shaders.iter().filter_map(Self::stage_of).collect();
        let is_compute = stages == [ShaderStage::Compute];
        let has_raster = stages.contains(&ShaderStage::Vertex) && stages.contains(&ShaderStage::Pixel);
        if !is_compute && !has_raster {
            self.valid = false;
            return LinkOutput {
                kind: LinkingEventKind::IncompleteStages,
                log: format!("{}: a program needs vertex and pixel stages, or a single compute stage", self.name),
            };
        }
        let mut failures = Vec::new();
        for shader in &self.shaders {
            let output = compile(&shader.display_name(), &shader.source);
            if !output.success() {
                failures.push(output.log);
            }
        }
        if failures.is_empty() {
            self.valid = true;
            LinkOutput { kind: LinkingEventKind::LinkingSuccess, log: String::new() }
        } else {
            self.valid = false;
            LinkOutput { kind: LinkingEventKind::ShaderCompilationFailed, log: failures.join("\n") }
        }
    }

    pub fn display_name(&self) -> String {
        self.path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_else(|| self.name.clone())
    }
}
