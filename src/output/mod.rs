pub mod export;
pub mod formatter;

pub use export::write_export;
pub use formatter::{
    format_bar, format_breakdown, format_explanation, format_export, format_json, format_percent,
    format_report, format_summary_table, format_tally, should_use_colors,
};
