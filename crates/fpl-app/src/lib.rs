// Library root: everything around the pure analysis core. Configuration, the
// FPL data source, best-effort history collection, the analysis pipeline and
// CSV export.

pub mod collect;
pub mod config;
pub mod export;
pub mod pipeline;
pub mod source;
