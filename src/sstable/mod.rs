pub mod builder;
pub mod format;
pub mod index;
pub mod reader;

pub use builder::SSTableBuilder;
pub use format::SSTableMeta;
pub use index::SparseIndex;
pub use reader::{SSTable, SSTableIterator};
