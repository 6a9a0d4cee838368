//! 带排名（span）的跳表，是有序集合 [`SortedSet`](crate::ds::zset::SortedSet) 的底层结构。
//!
//! 节点存放在 arena 中，用 [`NodeId`] 访问，节点被删除后旧句柄自动失效。

mod arena;
pub mod config;
mod node;
mod range;
#[allow(clippy::module_inception)]
mod skiplist;

use std::hash::Hash;

pub use arena::NodeId;
pub use config::{SkipListBuilder, SkipListConfig, DEFAULT_MAX_LEVEL, MAX_LEVEL, MIN_LEVEL};
pub use node::Node;
pub use range::ScoreRange;
pub use skiplist::{Comparator, Iter, SkipList, UpdateList};

/// 能放进有序集合的元素：有一个稳定的 key，和一个用来排序的分数。
pub trait SkipListItem {
    type Key: Eq + Hash + Clone;

    fn key(&self) -> &Self::Key;

    fn score(&self) -> f64;
}
