//! Module: plan::explain
//! Responsibility: render plan trees as indented text.
//! Does not own: deciding what each stage reports.
//! Boundary: the rendered text also feeds the plan fingerprint.

const INDENT: &str = "    ";

///
/// ExplainNode
///
/// One pipeline stage: its operator name, scalar properties, and argument
/// stages rendered one level deeper.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExplainNode {
    operator: String,
    properties: Vec<(String, String)>,
    arguments: Vec<(String, Self)>,
}

impl ExplainNode {
    #[must_use]
    pub fn new(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            properties: Vec::new(),
            arguments: Vec::new(),
        }
    }

    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn argument(mut self, stage: impl Into<String>, node: Self) -> Self {
        self.arguments.push((stage.into(), node));
        self
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into("", &mut out);
        out
    }

    fn render_into(&self, prefix: &str, out: &mut String) {
        push_line(out, prefix, "Inner-Segment Plan Node :");
        push_line(out, prefix, &format!("Operator: {}", self.operator));
        for (name, value) in &self.properties {
            push_line(out, prefix, &format!("{name}: {value}"));
        }

        let child_prefix = format!("{prefix}{INDENT}");
        for (index, (stage, node)) in self.arguments.iter().enumerate() {
            push_line(out, prefix, &format!("Argument {index}: {stage} - "));
            node.render_into(&child_prefix, out);
        }
    }
}

fn push_line(out: &mut String, prefix: &str, line: &str) {
    out.push_str(prefix);
    out.push_str(line);
    out.push('\n');
}

///
/// TESTS
///
