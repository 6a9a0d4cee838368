use std::cmp::Ordering;

use crate::ds::error::{SkipListError, SkipListResult};

use super::skiplist::{Comparator, SkipList};

/// 默认最大层数
pub const DEFAULT_MAX_LEVEL: usize = 32;
/// 自定义层数时允许的最小值，小于它会被调整成它
pub const MIN_LEVEL: usize = 16;
/// 层数上限，p=0.25 时 64 层已远超任何实际的节点数
pub const MAX_LEVEL: usize = 64;
/// 节点多一层的概率，取值在 0~100 之间
pub const DEFAULT_SKIP_PERCENTAGE: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipListConfig {
    /// 最大层数，会被限制在 [`MIN_LEVEL`]..=[`MAX_LEVEL`] 之间
    pub max_level: usize,
    /// 随机层数的种子，为空时从系统熵源取
    pub seed: Option<u64>,
}

impl Default for SkipListConfig {
    fn default() -> Self {
        Self { max_level: DEFAULT_MAX_LEVEL, seed: None }
    }
}

impl SkipListConfig {
    pub(crate) fn effective_max_level(&self) -> usize {
        self.max_level.clamp(MIN_LEVEL, MAX_LEVEL)
    }
}

/// 构造 [`SkipList`]。比较函数必须设置，否则 [`build`](Self::build) 返回
/// [`SkipListError::MissingComparator`]。
///
/// ```
/// use toyzset::SkipListBuilder;
///
/// let list = SkipListBuilder::<u32>::new()
///     .max_level(20)
///     .seed(7)
///     .compare(|a, b| a.cmp(b))
///     .build()
///     .unwrap();
/// assert_eq!(list.max_level(), 20);
/// ```
pub struct SkipListBuilder<V> {
    config: SkipListConfig,
    compare: Option<Comparator<V>>,
}

impl<V> Default for SkipListBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SkipListBuilder<V> {
    pub fn new() -> Self {
        Self { config: SkipListConfig::default(), compare: None }
    }

    pub fn config(mut self, config: SkipListConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_level(mut self, max_level: usize) -> Self {
        self.config.max_level = max_level;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// 分数相同时两个值的比较函数，必须是严格全序
    pub fn compare<F>(mut self, compare: F) -> Self
    where F: Fn(&V, &V) -> Ordering + 'static
    {
        self.compare = Some(Box::new(compare));
        self
    }

    pub fn build(self) -> SkipListResult<SkipList<V>> {
        let compare = self.compare.ok_or(SkipListError::MissingComparator)?;
        Ok(SkipList::with_config(&self.config, compare))
    }
}
