use crate::shell::{EncodingConstraint, Mark, ShellDefinition, ShellFamily};
use plotgraph_core::SemanticType::*;

pub fn definition() -> ShellDefinition {
    ShellDefinition::new("boxplot", "Box Plot", ShellFamily::Distribution, Mark::Boxplot)
        .signature(&[Nominal, Quantitative])
        .signature(&[Ordinal, Quantitative])
        .require("x", EncodingConstraint::new(Nominal))
        .require("y", EncodingConstraint::new(Quantitative))
        .allow("color", Nominal)
        .allow_any("tooltip")
}
