//! Terminal output
//!
//! Uses `cliclack` for styled steps and spinners, falling back to plain
//! prefixed lines when stdout is not an interactive terminal (CI, pipes).
//! Structured output (`--format json`) bypasses this module entirely.

mod context;
mod output;
mod progress;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, outro_error, outro_success, remark, step_error_detail, step_info, step_ok,
    step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{format_bytes, MeasureProgress, TaskSpinner};
pub use theme::{init_theme, BundleCostTheme};
