use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderStage {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Pixel,
    Compute,
}

impl ShaderStage {
    pub fn extension(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs",
            ShaderStage::TessControl => "tcs",
            ShaderStage::TessEvaluation => "tes",
            ShaderStage::Geometry => "gs",
            ShaderStage::Pixel => "ps",
            ShaderStage::Compute => "cs",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::TessControl => "tess control",
            ShaderStage::TessEvaluation => "tess evaluation",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Pixel => "pixel",
            ShaderStage::Compute => "compute",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "vertex" | "vs" => Some(ShaderStage::Vertex),
            "tess_control" | "tcs" => Some(ShaderStage::TessControl),
            "tess_evaluation" | "tes" => Some(ShaderStage::TessEvaluation),
            "geometry" | "gs" => Some(ShaderStage::Geometry),
            "pixel" | "ps" => Some(ShaderStage::Pixel),
            "compute" | "cs" => Some(ShaderStage::Compute),
            _ => None,
        }
    }
}

/// Controls when edits reach the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilationPolicy {
    /// Every edit is pushed to the engine and compiled.
    #[default]
    UserDefined,
    /// Edits stay in the editor until the document is saved.
    ForceOnSave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Shader(ShaderStage),
    TimelineScript,
    ScriptHeader,
}

impl SourceKind {
    pub fn log_channel(self) -> crate::console::LogChannel {
        match self {
            SourceKind::Shader(_) => crate::console::LogChannel::Shader,
            SourceKind::TimelineScript | SourceKind::ScriptHeader => crate::console::LogChannel::Timeline,
        }
    }
}

/// Engine-side source object (shader stage or timeline script).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCode {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub source: String,
    pub policy: CompilationPolicy,
    pub valid: bool,
}

impl SourceCode {
    pub fn new(path: PathBuf, kind: SourceKind, source: String) -> Self {
        let policy = match kind {
            SourceKind::Shader(_) => CompilationPolicy::UserDefined,
            SourceKind::TimelineScript | SourceKind::ScriptHeader => CompilationPolicy::ForceOnSave,
        };
        Self { path, kind, source, policy, valid: true }
    }

    pub fn display_name(&self) -> String {
        self.path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line.
    pub row: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    pub diagnostics: Vec<Diagnostic>,
    pub log: String,
}

impl CompileOutput {
    pub fn success(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Front-end check run by the engine before a source reaches the GPU driver: delimiter
/// balance and explicit `#error` directives.
pub fn compile(name: &str, source: &str) -> CompileOutput {
    let mut diagnostics = Vec::new();
    let mut open: Vec<(char, u32)> = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let row = index as u32 + 1;
        let code = line.split("//").next().unwrap_or_default();
        if let Some(rest) = code.trim_start().strip_prefix("#error") {
            let text = rest.trim();
            let message = if text.is_empty() { "#error".to_string() } else { format!("#error {text}") };
            diagnostics.push(Diagnostic { row, message });
            continue;
        }
        for ch in code.chars() {
            match ch {
                '{' | '(' | '[' => open.push((ch, row)),
                '}' | ')' | ']' => {
                    let expected = match ch {
                        '}' => '{',
                        ')' => '(',
                        _ => '[',
                    };
                    match open.last() {
                        Some((top, _)) if *top == expected => {
                            open.pop();
                        }
                        _ => diagnostics.push(Diagnostic { row, message: format!("unexpected '{ch}'") }),
                    }
                }
                _ => {}
            }
        }
    }
    for (ch, row) in open {
        diagnostics.push(Diagnostic { row, message: format!("unclosed '{ch}'") });
    }
    diagnostics.sort_by_key(|diag| diag.row);
    let log = if diagnostics.is_empty() {
        format!("{name}: compiled successfully")
    } else {
        let lines: Vec<String> =
            diagnostics.iter().map(|diag| format!("{name}({}): error: {}", diag.row, diag.message)).collect();
        lines.join("\n")
    };
    CompileOutput { diagnostics, log }
}
