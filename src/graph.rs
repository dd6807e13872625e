use crate::program::Program;

/// Node of a read-only graph view. Leaves and subtrees are distinct variants, so a consumer can
/// never read children off a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    Leaf { label: String },
    SubTree { label: String, children: Vec<GraphNode> },
}

impl GraphNode {
    pub fn label(&self) -> &str {
        match self {
            GraphNode::Leaf { label } | GraphNode::SubTree { label, .. } => label,
        }
    }

    pub fn children(&self) -> &[GraphNode] {
        match self {
            GraphNode::Leaf { .. } => &[],
            GraphNode::SubTree { children, .. } => children,
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            GraphNode::Leaf { .. } => 1,
            GraphNode::SubTree { children, .. } => children.iter().map(GraphNode::leaf_count).sum(),
        }
    }

    /// Program at the root, one subtree per stage holding its source file.
    pub fn from_program(program: &Program) -> Self {
        let children = program
            .shaders()
            .iter()
            .map(|shader| {
                let stage = Program::stage_of(shader).map(|stage| stage.label()).unwrap_or("unknown");
                GraphNode::SubTree {
                    label: format!("{stage} stage"),
                    children: vec![GraphNode::Leaf { label: shader.path.display().to_string() }],
                }
            })
            .collect();
        let status = if program.valid { "linked" } else { "not linked" };
        GraphNode::SubTree { label: format!("{} ({status})", program.name), children }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_code::{ShaderStage, SourceCode, SourceKind};

    #[test]
    fn program_graph_has_one_branch_per_stage() {
        let mut program = Program::new("p.pas".into(), "blur".into());
        program.set_shader(SourceCode::new("a.vs".into(), SourceKind::Shader(ShaderStage::Vertex), String::new()));
        program.set_shader(SourceCode::new("a.ps".into(), SourceKind::Shader(ShaderStage::Pixel), String::new()));
        let root = GraphNode::from_program(&program);
        assert_eq!(root.label(), "blur (not linked)");
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.children()[0].label(), "vertex stage");
        assert_eq!(root.leaf_count(), 2);
        assert!(root.children()[0].children()[0].children().is_empty());
    }
}
