use std::collections::BTreeMap;

use crate::source_code::{CompilationPolicy, SourceKind};

/// UI-side copy of an open source object, kept so edits never wait on the engine thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowDocumentState {
    pub text: String,
    pub kind: SourceKind,
    pub policy: CompilationPolicy,
    invalid_lines: BTreeMap<u32, String>,
    needs_flush: bool,
}

impl ShadowDocumentState {
    pub fn new(text: String, kind: SourceKind, policy: CompilationPolicy) -> Self {
        Self { text, kind, policy, invalid_lines: BTreeMap::new(), needs_flush: false }
    }

    pub fn invalid_lines(&self) -> &BTreeMap<u32, String> {
        &self.invalid_lines
    }

    pub fn is_line_invalid(&self, row: u32) -> bool {
        self.invalid_lines.contains_key(&row)
    }

    pub fn clear_diagnostics(&mut self) {
        self.invalid_lines.clear();
    }

    /// Several errors on one row are joined in arrival order.
    pub fn add_diagnostic(&mut self, row: u32, message: &str) {
        self.invalid_lines
            .entry(row)
            .and_modify(|existing| {
                existing.push('\n');
                existing.push_str(message);
            })
            .or_insert_with(|| message.to_string());
    }

    pub fn needs_flush(&self) -> bool {
        self.needs_flush
    }

    pub fn mark_needs_flush(&mut self) {
        self.needs_flush = true;
    }

    pub fn take_flush(&mut self) -> bool {
        std::mem::take(&mut self.needs_flush)
    }

    /// Replaces the text with the engine's copy, dropping pending edits and diagnostics.
    pub fn reset(&mut self, text: String) {
        self.text = text;
        self.invalid_lines.clear();
        self.needs_flush = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_code::ShaderStage;

    #[test]
    fn diagnostics_group_by_row() {
        let mut doc =
            ShadowDocumentState::new("x".into(), SourceKind::Shader(ShaderStage::Pixel), CompilationPolicy::UserDefined);
        doc.add_diagnostic(3, "unexpected '}'");
        doc.add_diagnostic(3, "#error stop");
        doc.add_diagnostic(1, "unclosed '{'");
        assert!(doc.is_line_invalid(3));
        assert_eq!(doc.invalid_lines().get(&3).map(String::as_str), Some("unexpected '}'\n#error stop"));
        assert_eq!(doc.invalid_lines().keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        doc.mark_needs_flush();
        doc.reset("y".into());
        assert!(doc.invalid_lines().is_empty());
        assert!(!doc.take_flush());
    }
}
