pub mod merge;

pub use merge::MergeIterator;
