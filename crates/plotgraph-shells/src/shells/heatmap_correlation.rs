//! Pairwise correlation heatmap. Rows come from the `correlation_matrix`
//! analysis, so the shell binds no columns itself.

use crate::shell::{Mark, ShellDefinition, ShellFamily};
use plotgraph_core::SemanticType::*;

pub fn definition() -> ShellDefinition {
    ShellDefinition::new(
        "heatmap_correlation",
        "Correlation Heatmap",
        ShellFamily::CorrelationMatrix,
        Mark::Rect,
    )
    .signature(&[Quantitative, Quantitative])
    .analysis("python", "correlation_matrix")
}
