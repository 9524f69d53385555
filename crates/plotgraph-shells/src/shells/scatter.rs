use crate::shell::{EncodingConstraint, Mark, ShellDefinition, ShellFamily};
use plotgraph_core::SemanticType::*;

pub fn definition() -> ShellDefinition {
    ShellDefinition::new("scatter", "Scatter Plot", ShellFamily::Correlation, Mark::Point)
        .signature(&[Quantitative, Quantitative])
        .require("x", EncodingConstraint::new(Quantitative))
        .require("y", EncodingConstraint::new(Quantitative))
        .allow("color", Nominal)
        .allow_any("tooltip")
}
