//! plotgraph Shells - chart shell catalog, dataset profiling, validation and Vega-Lite compilation
//!
//! Each builtin shell is a self-contained module under shells/. To add one:
//! create the file, return its definition, and list it in `shells::all()`.

pub mod compiler;
pub mod dataset;
pub mod profiler;
pub mod registry;
pub mod schema;
pub mod shell;
pub mod shells;
pub mod validator;

pub use compiler::{compile, ChartSpec, VEGA_LITE_SCHEMA};
pub use dataset::Dataset;
pub use profiler::{profile, profile_csv};
pub use registry::ShellRegistry;
pub use schema::{choose_shell_parameters, fill_params_parameters, CHOOSE_SHELL, FILL_SHELL_PARAMS};
pub use shell::*;
pub use validator::{Issue, IssueCode, ValidationResult, ValidationThresholds, Validator};
