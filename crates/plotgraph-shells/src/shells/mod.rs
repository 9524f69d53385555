//! Builtin shells, one per module.

pub mod bar_aggregate;
pub mod bar_count;
pub mod boxplot;
pub mod density;
pub mod heatmap_correlation;
pub mod histogram;
pub mod line_ordered;
pub mod line_time;
pub mod scatter;

use crate::shell::ShellDefinition;

pub fn all() -> Vec<ShellDefinition> {
    vec![
        bar_aggregate::definition(),
        bar_count::definition(),
        boxplot::definition(),
        density::definition(),
        heatmap_correlation::definition(),
        histogram::definition(),
        line_ordered::definition(),
        line_time::definition(),
        scatter::definition(),
    ]
}
