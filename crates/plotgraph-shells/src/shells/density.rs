//! Kernel density estimate of one quantitative column, drawn as an area.

use crate::shell::{EncodingConstraint, Mark, ShellDefinition, ShellFamily};
use plotgraph_core::SemanticType::*;

pub fn definition() -> ShellDefinition {
    ShellDefinition::new("density", "Density Plot", ShellFamily::Density, Mark::Area)
        .signature(&[Quantitative])
        .require("x", EncodingConstraint::new(Quantitative))
        .allow("color", Nominal)
        .allow_any("tooltip")
}
