pub mod ds;

pub use ds::error::{SkipListError, SkipListResult};
pub use ds::skiplist::{NodeId, ScoreRange, SkipList, SkipListBuilder, SkipListConfig, SkipListItem};
pub use ds::zset::SortedSet;
