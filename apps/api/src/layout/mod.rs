// Layout engine used by the structured PDF exporter.
// Implements: font metrics, greedy line breaking, flow pagination onto fixed-size pages.
// CPU-bound; callers run it inside tokio::task::spawn_blocking.

pub mod flow;
pub mod font_metrics;

// Re-export the public API consumed by the exporters.
pub use flow::{paginate, Align, DrawOp, FlowItem, LaidOutPage, Paragraph, Rgb, SplitLine, TextStyle};
pub use font_metrics::{default_page_config, FontFamily, FontWeight, PageConfig};
