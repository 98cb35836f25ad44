// Layout engine: base-14 font metrics, greedy line breaking, block flow and
// pagination. Pure computation; nothing here touches the filesystem.

pub mod flow;
pub mod font_metrics;
pub mod linebreak;

// Re-export the API consumed by the PDF engines.
pub use flow::{layout_document, DrawItem, Layout, LinkArea, RuleItem, TextItem};
pub use font_metrics::FontFace;
