//! Bar chart of an aggregated measure per category.

use crate::shell::{EncodingConstraint, Mark, ShellDefinition, ShellFamily};
use plotgraph_core::SemanticType::*;

pub fn definition() -> ShellDefinition {
    ShellDefinition::new("bar_aggregate", "Bar Diagram", ShellFamily::CategoricalAggregate, Mark::Bar)
        .signature(&[Nominal, Quantitative])
        .signature(&[Ordinal, Quantitative])
        .require("x", EncodingConstraint::new(Nominal))
        .require("y", EncodingConstraint::new(Quantitative).aggregated())
        .allow("color", Nominal)
        .allow_any("tooltip")
        .aggregate_required()
}
