/// 跳表。
pub mod skiplist;
/// 有序集合
pub mod zset;
pub mod error;
