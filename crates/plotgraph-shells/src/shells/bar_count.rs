//! Bar chart of record counts per category.

use crate::shell::{AggregateOp, EncodingConstraint, Mark, ShellDefinition, ShellFamily};
use plotgraph_core::SemanticType::*;

pub fn definition() -> ShellDefinition {
    ShellDefinition::new("bar_count", "Count Bars", ShellFamily::CategoricalAggregate, Mark::Bar)
        .signature(&[Nominal])
        .signature(&[Ordinal])
        .require("x", EncodingConstraint::new(Nominal))
        .require("y", EncodingConstraint::new(Quantitative).fixed_aggregate(AggregateOp::Count))
        .allow("color", Nominal)
        .allow_any("tooltip")
        .aggregate_required()
}
