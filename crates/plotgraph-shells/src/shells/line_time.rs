//! Measure over time. Numeric timestamps are accepted on `x`.

use crate::shell::{EncodingConstraint, Mark, ShellDefinition, ShellFamily};
use plotgraph_core::SemanticType::*;

pub fn definition() -> ShellDefinition {
    ShellDefinition::new("line_time", "Trend Line", ShellFamily::Trend, Mark::Line)
        .signature(&[Temporal, Quantitative])
        .require("x", EncodingConstraint::new(Temporal))
        .require("y", EncodingConstraint::new(Quantitative))
        .allow("color", Nominal)
        .allow_any("tooltip")
}
