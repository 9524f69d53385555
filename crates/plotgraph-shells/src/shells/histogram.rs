use crate::shell::{AggregateOp, EncodingConstraint, Mark, ShellDefinition, ShellFamily};
use plotgraph_core::SemanticType::*;

pub fn definition() -> ShellDefinition {
    ShellDefinition::new("histogram", "Histogram", ShellFamily::Distribution, Mark::Bar)
        .signature(&[Quantitative])
        .require("x", EncodingConstraint::new(Quantitative).binned())
        .require("y", EncodingConstraint::new(Quantitative).fixed_aggregate(AggregateOp::Count))
        .allow_any("tooltip")
}
