use crate::shell::{EncodingConstraint, Mark, ShellDefinition, ShellFamily};
use plotgraph_core::SemanticType::*;

pub fn definition() -> ShellDefinition {
    ShellDefinition::new("line_ordered", "Line Chart", ShellFamily::Trend, Mark::Line)
        .signature(&[Ordinal, Quantitative])
        .signature(&[Quantitative, Quantitative])
        .require("x", EncodingConstraint::new(Ordinal))
        .require("y", EncodingConstraint::new(Quantitative))
        .allow("color", Nominal)
        .allow_any("tooltip")
}
