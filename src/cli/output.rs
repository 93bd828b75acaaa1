//! CLI output formatting

use crate::core::Spec;
use crate::tree::Node;
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");

/// Render the execution tree as an indented outline, one node per line
pub fn format_tree(spec: &Spec) -> String {
    let mut out = String::new();
    write_node(spec, &spec.program, 0, &mut out);
    out
}

fn write_node(spec: &Spec, node: &Node, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let label = match node {
        Node::Run(run) => {
            let image = spec.lookup(&run.name).map(|c| c.image.as_str()).unwrap_or("?");
            let mut flags = Vec::new();
            if run.detach {
                flags.push("detach");
            }
            if run.silent {
                flags.push("silent");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            format!("run {} ({}){}", style(&run.name).cyan(), style(image).dim(), flags)
        }
        Node::Parallel(p) if p.limit > 0 => format!("parallel (limit {})", p.limit),
        Node::Error(_) => format!("{} {}", node.type_name(), style("on failure:").dim()),
        other => other.type_name().to_string(),
    };
    out.push_str(&indent);
    out.push_str(&label);
    out.push('\n');
    for child in node.children() {
        write_node(spec, child, depth + 1, out);
    }
}
