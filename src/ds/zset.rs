//! 有序集合（对应 redis 的 zset）。
//!
//! 在跳表之上加一个 key 到节点的索引：跳表负责按分数排序和排名，索引负责按 key 找到节点。
//! 跳表里每次增删或替换节点，索引都要同步更新，所以索引里不会留下失效的句柄。
//!
//! ```
//! use toyzset::{SkipListItem, SortedSet};
//!
//! struct Player {
//!     name: String,
//!     points: f64,
//! }
//!
//! impl SkipListItem for Player {
//!     type Key = String;
//!     fn key(&self) -> &String { &self.name }
//!     fn score(&self) -> f64 { self.points }
//! }
//!
//! let mut set = SortedSet::new(|a: &Player, b: &Player| a.name.cmp(&b.name));
//! set.add(vec![
//!     Player { name: "alice".into(), points: 30f64 },
//!     Player { name: "bob".into(), points: 10f64 },
//! ]);
//! assert_eq!(set.rank(&"alice".to_string()), Some(1));
//! assert_eq!(set.range(0, -1)[0].name, "bob");
//! ```

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    fmt::Debug,
};

use tracing::debug;

use super::error::SkipListResult;
use super::skiplist::{Iter, NodeId, ScoreRange, SkipList, SkipListBuilder, SkipListItem};

pub struct SortedSet<V: SkipListItem> {
    /// 当前集合中所有的元素
    members: HashMap<V::Key, NodeId>,
    /// 底层的跳表
    list: SkipList<V>,
}

impl<V: SkipListItem + Debug> Debug for SortedSet<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortedSet")
            .field("list", &self.list)
            .finish()
    }
}

impl<V: SkipListItem> SortedSet<V> {
    /// 默认配置的有序集合，`compare` 用于分数相同时排序。
    pub fn new<F>(compare: F) -> Self
    where F: Fn(&V, &V) -> Ordering + 'static
    {
        Self { members: HashMap::new(), list: SkipList::new(compare) }
    }

    /// 自定义底层跳表的配置。没有特殊情况，不建议改层数。
    pub fn from_builder(builder: SkipListBuilder<V>) -> SkipListResult<Self> {
        Ok(Self { members: HashMap::new(), list: builder.build()? })
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// 同 [`len`](Self::len)
    pub fn count(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn contains(&self, key: &V::Key) -> bool {
        self.members.contains_key(key)
    }

    pub fn get(&self, key: &V::Key) -> Option<&V> {
        let id = *self.members.get(key)?;
        self.list.get(id).map(|node| node.value())
    }

    /// 按分数从低到高遍历 `(score, value)`
    pub fn iter(&self) -> Iter<'_, V> {
        self.list.iter()
    }

    /// 添加或更新元素，返回本次涉及的不同 key 的数量。
    ///
    /// 同一批里 key 重复时，以最后一次出现的为准。
    pub fn add<I>(&mut self, items: I) -> usize
    where I: IntoIterator<Item = V>
    {
        let items: Vec<V> = items.into_iter().collect();
        let mut touched: HashSet<V::Key> = HashSet::with_capacity(items.len());
        // 从后往前处理，后出现的先占住 key
        for item in items.into_iter().rev() {
            if touched.contains(item.key()) {
                continue;
            }
            let key = item.key().clone();
            let score = item.score();
            let id = match self.members.get(&key) {
                None => Some(self.list.insert_by_score(score, item)),
                // 可能换了节点，要用返回的句柄重新建索引
                Some(&id) => self.list.update(id, score, item),
            };
            if let Some(id) = id {
                self.members.insert(key.clone(), id);
            }
            touched.insert(key);
        }
        touched.len()
    }

    /// 按 key 删除，返回实际删除的个数
    pub fn remove<'a, I>(&mut self, keys: I) -> usize
    where I: IntoIterator<Item = &'a V::Key>,
        V::Key: 'a,
    {
        let mut removed = 0;
        for key in keys {
            if let Some(id) = self.members.remove(key) {
                if self.list.delete_node(id).is_some() {
                    removed += 1;
                }
            }
        }
        removed
    }

    /// 删除排名在 `[start, stop]` 内的元素，下标规则同 [`range`](Self::range)。
    pub fn remove_range_by_rank(&mut self, start: i64, stop: i64) -> usize {
        let Some((start, stop)) = self.normalize(start, stop) else {
            return 0;
        };
        let nodes = self.list.nodes_by_rank(start + 1, stop + 1);
        self.remove_nodes(&nodes)
    }

    /// 删除分数在范围内的元素
    pub fn remove_range_by_score(&mut self, range: &ScoreRange) -> usize {
        let nodes = self.list.nodes_by_score(range);
        self.remove_nodes(&nodes)
    }

    /// nodes 来自范围查询，排名连续，可以共用一条删除路径
    fn remove_nodes(&mut self, nodes: &[NodeId]) -> usize {
        if nodes.is_empty() {
            return 0;
        }
        let removed = self.list.delete_contiguous(nodes);
        for value in &removed {
            self.members.remove(value.key());
        }
        debug!(count = removed.len(), "zset: range removed");
        removed.len()
    }

    /// 删除并返回分数最低的元素
    pub fn pop_min(&mut self) -> Option<V> {
        let id = self.list.first()?;
        self.pop_node(id)
    }

    /// 删除并返回分数最高的元素
    pub fn pop_max(&mut self) -> Option<V> {
        let id = self.list.last()?;
        self.pop_node(id)
    }

    fn pop_node(&mut self, id: NodeId) -> Option<V> {
        let value = self.list.delete_node(id)?;
        self.members.remove(value.key());
        Some(value)
    }

    /// 元素的排名（从 0 开始，分数从低到高），不存在时返回 `None`
    pub fn rank(&self, key: &V::Key) -> Option<usize> {
        let id = *self.members.get(key)?;
        self.list.node_rank(id).map(|rank| rank - 1)
    }

    /// 元素的排名（从 0 开始，分数从高到低），不存在时返回 `None`
    pub fn rev_rank(&self, key: &V::Key) -> Option<usize> {
        let id = *self.members.get(key)?;
        self.list.node_rank(id).map(|rank| self.list.len() - rank)
    }

    pub fn score(&self, key: &V::Key) -> Option<f64> {
        let id = *self.members.get(key)?;
        self.list.get(id).map(|node| node.score())
    }

    /// 把 `[start, stop]` 转成合法的 0 起始下标，负数从尾部倒数（-1 为最后一个）。
    fn normalize(&self, start: i64, stop: i64) -> Option<(usize, usize)> {
        let len = self.list.len() as i64;
        if len == 0 {
            return None;
        }
        let start = if start < 0 { (start + len).max(0) } else { start };
        let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
        if start > stop || start >= len {
            return None;
        }
        Some((start as usize, stop as usize))
    }

    /// 按下标区间返回元素，分数从低到高。下标从 0 开始，两端都包含。
    pub fn range(&self, start: i64, stop: i64) -> Vec<&V> {
        match self.normalize(start, stop) {
            Some((start, stop)) => self.list.values_by_rank(start + 1, stop + 1),
            None => vec![],
        }
    }

    /// 按下标区间返回元素，分数从高到低。
    ///
    /// 反向下标 j 对应正向下标 len-1-j，所以反向的 `[start, stop]` 就是正向的
    /// `[len-1-stop, len-1-start]`，查出来再翻转。
    pub fn rev_range(&self, start: i64, stop: i64) -> Vec<&V> {
        let Some((start, stop)) = self.normalize(start, stop) else {
            return vec![];
        };
        let len = self.list.len();
        let mut result = self.list.values_by_rank(len - stop, len - start);
        result.reverse();
        result
    }

    fn score_range(&self, range: &ScoreRange, reversed: bool) -> Vec<&V> {
        let mut result = self.list.values_by_score(range);
        if reversed {
            result.reverse();
        }
        result
    }

    /// 分数在范围内的元素，分数从低到高
    pub fn range_by_score(&self, range: &ScoreRange) -> Vec<&V> {
        self.score_range(range, false)
    }

    /// 分数在范围内的元素，分数从高到低。`range` 仍按 (下界, 上界) 给出。
    pub fn rev_range_by_score(&self, range: &ScoreRange) -> Vec<&V> {
        self.score_range(range, true)
    }

    /// 同 [`range_by_score`](Self::range_by_score)，但跳过前 `offset` 个，最多取 `limit` 个（0 表示不限）
    pub fn range_by_score_limit(&self, range: &ScoreRange, offset: usize, limit: usize) -> Vec<&V> {
        self.list
            .nodes_by_score_limit(range, offset, limit)
            .into_iter()
            .filter_map(|id| self.list.get(id))
            .map(|node| node.value())
            .collect()
    }

    /// 分数在范围内的元素个数
    pub fn count_by_score(&self, range: &ScoreRange) -> usize {
        self.list.count_by_score(range)
    }
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::SortedSet;
    use crate::ds::skiplist::{ScoreRange, SkipListBuilder, SkipListItem};

    #[derive(Debug, Clone, PartialEq)]
    struct Player {
        name: String,
        points: f64,
    }

    impl SkipListItem for Player {
        type Key = String;

        fn key(&self) -> &String {
            &self.name
        }

        fn score(&self) -> f64 {
            self.points
        }
    }

    fn player(name: &str, points: f64) -> Player {
        Player { name: name.to_string(), points }
    }

    fn key(name: &str) -> String {
        name.to_string()
    }

    fn new_set() -> SortedSet<Player> {
        SortedSet::from_builder(
            SkipListBuilder::new()
                .seed(1)
                .compare(|a: &Player, b: &Player| a.name.cmp(&b.name)),
        )
        .unwrap()
    }

    /// a..e，分数 1..5
    fn five() -> SortedSet<Player> {
        let mut set = new_set();
        set.add(["a", "b", "c", "d", "e"].iter().enumerate().map(|(i, n)| player(n, (i + 1) as f64)));
        set
    }

    fn names(players: Vec<&Player>) -> Vec<&str> {
        players.into_iter().map(|p| p.name.as_str()).collect()
    }

    impl SortedSet<Player> {
        fn assert_consistent(&self) {
            self.list.assert_consistent();
            assert_eq!(self.members.len(), self.list.len());
            for (k, id) in &self.members {
                let node = self.list.get(*id).expect("stale id in index");
                assert_eq!(node.value().key(), k);
            }
        }
    }

    #[test]
    fn basis() {
        let mut set = new_set();
        assert_eq!(set.add(vec![player("a", 1f64), player("b", 2f64), player("c", 3f64)]), 3);
        set.assert_consistent();
        assert_eq!(set.count(), 3);
        assert_eq!(set.rank(&key("a")), Some(0));
        assert_eq!(set.rank(&key("c")), Some(2));
        assert_eq!(set.rev_rank(&key("a")), Some(2));
        assert_eq!(set.rev_rank(&key("c")), Some(0));
        assert_eq!(set.score(&key("b")), Some(2f64));
        assert!(set.contains(&key("b")));
        assert_eq!(set.get(&key("b")), Some(&player("b", 2f64)));
        assert_eq!(set.rank(&key("missing")), None);
        assert_eq!(set.rev_rank(&key("missing")), None);
        assert_eq!(set.score(&key("missing")), None);
    }

    #[test]
    fn empty_set() {
        let mut set = new_set();
        assert!(set.is_empty());
        assert!(set.range(0, -1).is_empty());
        assert!(set.rev_range(0, -1).is_empty());
        assert!(set.range_by_score(&ScoreRange::all()).is_empty());
        assert_eq!(set.rank(&key("missing")), None);
        assert_eq!(set.remove_range_by_rank(0, -1), 0);
        assert_eq!(set.remove_range_by_score(&ScoreRange::all()), 0);
        assert_eq!(set.pop_min(), None);
        assert_eq!(set.add(vec![]), 0);
    }

    #[test]
    fn add_last_occurrence_wins() {
        let mut set = new_set();
        assert_eq!(set.add(vec![player("a", 1f64), player("b", 2f64), player("a", 5f64)]), 2);
        set.assert_consistent();
        assert_eq!(set.len(), 2);
        assert_eq!(set.score(&key("a")), Some(5f64));
        assert_eq!(names(set.range(0, -1)), vec!["b", "a"]);
    }

    #[test]
    fn add_updates_existing() {
        let mut set = five();
        // 原地更新
        assert_eq!(set.add(vec![player("c", 3.5)]), 1);
        assert_eq!(set.rank(&key("c")), Some(2));
        // 越过邻居，节点会被替换
        assert_eq!(set.add(vec![player("a", 10f64)]), 1);
        set.assert_consistent();
        assert_eq!(set.len(), 5);
        assert_eq!(set.rank(&key("a")), Some(4));
        assert_eq!(set.score(&key("a")), Some(10f64));
        assert_eq!(names(set.range(0, -1)), vec!["b", "c", "d", "e", "a"]);
        // 和邻居分数相同，按名字排
        set.add(vec![player("e", 10f64)]);
        set.assert_consistent();
        assert_eq!(names(set.rev_range(0, 1)), vec!["e", "a"]);
    }

    #[test]
    fn range_indexes() {
        let set = five();
        assert_eq!(names(set.range(0, -1)), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(names(set.range(1, 3)), vec!["b", "c", "d"]);
        assert_eq!(names(set.range(-2, -1)), vec!["d", "e"]);
        assert_eq!(names(set.range(3, 100)), vec!["d", "e"]);
        assert_eq!(names(set.range(-100, 0)), vec!["a"]);
        assert!(set.range(4, 2).is_empty());
        assert!(set.range(5, 10).is_empty());
        assert!(set.range(0, -6).is_empty());

        assert_eq!(names(set.rev_range(0, -1)), vec!["e", "d", "c", "b", "a"]);
        assert_eq!(names(set.rev_range(0, 0)), vec!["e"]);
        assert_eq!(names(set.rev_range(1, 3)), vec!["d", "c", "b"]);
        assert_eq!(names(set.rev_range(-2, -1)), vec!["b", "a"]);
        assert_eq!(names(set.rev_range(3, 100)), vec!["b", "a"]);
        assert!(set.rev_range(5, 10).is_empty());
    }

    #[test]
    fn range_single_element() {
        let mut set = new_set();
        set.add(vec![player("only", 1f64)]);
        assert_eq!(names(set.range(0, -1)), vec!["only"]);
        assert_eq!(names(set.rev_range(0, -1)), vec!["only"]);
        assert_eq!(names(set.rev_range(-1, -1)), vec!["only"]);
        assert!(set.rev_range(1, 1).is_empty());
    }

    #[test]
    fn range_by_score() {
        let set = five();
        let range = ScoreRange::closed(2f64, 4f64);
        assert_eq!(names(set.range_by_score(&range)), vec!["b", "c", "d"]);
        assert_eq!(names(set.rev_range_by_score(&range)), vec!["d", "c", "b"]);
        // 反向查询不会改动传入的区间
        assert_eq!(range, ScoreRange::closed(2f64, 4f64));
        assert_eq!(names(set.range_by_score(&range)), vec!["b", "c", "d"]);

        assert_eq!(names(set.range_by_score(&ScoreRange::at_most(2f64))), vec!["a", "b"]);
        assert_eq!(names(set.rev_range_by_score(&ScoreRange::at_least(4f64))), vec!["e", "d"]);
        assert_eq!(set.range_by_score(&ScoreRange::all()).len(), 5);
        assert!(set.range_by_score(&ScoreRange::closed(6f64, 7f64)).is_empty());

        assert_eq!(names(set.range_by_score_limit(&ScoreRange::all(), 1, 2)), vec!["b", "c"]);
        assert_eq!(names(set.range_by_score_limit(&ScoreRange::all(), 3, 0)), vec!["d", "e"]);
        assert_eq!(set.count_by_score(&range), 3);
        assert_eq!(set.count_by_score(&ScoreRange::at_least(4.5)), 1);
    }

    #[test]
    fn infinite_points() {
        let mut set = new_set();
        set.add(vec![
            player("a", 1f64),
            player("b", f64::INFINITY),
            player("c", f64::NEG_INFINITY),
            player("d", f64::INFINITY),
        ]);
        set.assert_consistent();
        assert_eq!(names(set.range(0, -1)), vec!["c", "a", "b", "d"]);
        assert_eq!(names(set.rev_range_by_score(&ScoreRange::at_least(f64::INFINITY))), vec!["d", "b"]);
        assert_eq!(names(set.range_by_score(&ScoreRange::closed(f64::MIN, f64::MAX))), vec!["a"]);
        assert_eq!(set.rev_rank(&key("d")), Some(0));

        // +inf 移到 -inf
        set.add(vec![player("b", f64::NEG_INFINITY)]);
        set.assert_consistent();
        assert_eq!(names(set.range(0, -1)), vec!["b", "c", "a", "d"]);
        assert_eq!(set.score(&key("b")), Some(f64::NEG_INFINITY));

        assert_eq!(set.remove_range_by_score(&ScoreRange::at_most(f64::NEG_INFINITY)), 2);
        set.assert_consistent();
        assert_eq!(names(set.range(0, -1)), vec!["a", "d"]);
    }

    #[test]
    fn remove_by_key() {
        let mut set = five();
        assert_eq!(set.remove(&[key("a"), key("zz"), key("c")]), 2);
        set.assert_consistent();
        assert!(!set.contains(&key("a")));
        assert_eq!(set.rank(&key("b")), Some(0));
        assert_eq!(set.rank(&key("d")), Some(1));
        assert_eq!(set.remove(&[key("a")]), 0);
    }

    #[test]
    fn remove_range_by_rank() {
        // 删掉第 2~4 名
        let mut set = five();
        assert_eq!(set.remove_range_by_rank(1, 3), 3);
        set.assert_consistent();
        assert_eq!(names(set.range(0, -1)), vec!["a", "e"]);
        assert_eq!(set.rank(&key("e")), Some(1));
        assert!(!set.contains(&key("c")));

        let mut set = five();
        assert_eq!(set.remove_range_by_rank(2, 4), 3);
        set.assert_consistent();
        assert_eq!(names(set.range(0, -1)), vec!["a", "b"]);

        let mut set = five();
        assert_eq!(set.remove_range_by_rank(-2, -1), 2);
        assert_eq!(set.remove_range_by_rank(3, 1), 0);
        assert_eq!(set.remove_range_by_rank(0, -1), 3);
        set.assert_consistent();
        assert!(set.is_empty());
    }

    #[test]
    fn remove_range_by_score() {
        let mut set = five();
        assert_eq!(set.remove_range_by_score(&ScoreRange::closed(2f64, 4f64)), 3);
        set.assert_consistent();
        assert_eq!(names(set.range(0, -1)), vec!["a", "e"]);
        assert_eq!(set.remove_range_by_score(&ScoreRange::closed(2f64, 4f64)), 0);
        assert_eq!(set.remove_range_by_score(&ScoreRange::at_least(5f64)), 1);
        assert_eq!(names(set.range(0, -1)), vec!["a"]);
    }

    #[test]
    fn pop() {
        let mut set = five();
        assert_eq!(set.pop_min().map(|p| p.name), Some(key("a")));
        assert_eq!(set.pop_max().map(|p| p.name), Some(key("e")));
        set.assert_consistent();
        assert_eq!(names(set.range(0, -1)), vec!["b", "c", "d"]);
        assert!(!set.contains(&key("a")));
    }

    #[test]
    fn random_against_sorted_vec() {
        let mut rng = StdRng::seed_from_u64(100);
        let mut set = new_set();
        let mut arr: Vec<Player> = (0..100)
            .map(|i| player(&format!("p{}", i), rng.gen_range(0..40) as f64))
            .collect();
        set.add(arr.clone());
        arr.sort_by(|a, b| a.points.partial_cmp(&b.points).unwrap().then(a.name.cmp(&b.name)));
        set.assert_consistent();

        let all: Vec<Player> = set.range(0, -1).into_iter().cloned().collect();
        assert_eq!(all, arr);
        for (i, p) in arr.iter().enumerate() {
            assert_eq!(set.rank(&p.name), Some(i));
            assert_eq!(set.rev_range(0, -1)[arr.len() - 1 - i], p);
        }
        for _ in 0..10 {
            let l = rng.gen_range(0..arr.len());
            let r = rng.gen_range(l..arr.len());
            let got: Vec<&Player> = set.range(l as i64, r as i64);
            assert_eq!(got, arr[l..=r].iter().collect::<Vec<_>>());
        }

        // 每次随机删掉一个排名
        while !arr.is_empty() {
            let n = rng.gen_range(0..arr.len());
            assert_eq!(set.remove_range_by_rank(n as i64, n as i64), 1);
            arr.remove(n);
            assert_eq!(set.len(), arr.len());
            assert_eq!(set.range(0, -1), arr.iter().collect::<Vec<_>>());
        }
        set.assert_consistent();
    }

    #[test]
    fn random_remove_by_score() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut set = new_set();
        let mut arr: Vec<Player> = (0..60).map(|i| player(&format!("p{}", i), rng.gen::<f64>())).collect();
        set.add(arr.clone());
        arr.sort_by(|a, b| a.points.partial_cmp(&b.points).unwrap());
        while !arr.is_empty() {
            let n = rng.gen_range(0..arr.len());
            let score = arr[n].points;
            assert_eq!(set.remove_range_by_score(&ScoreRange::closed(score, score)), 1);
            arr.remove(n);
            set.assert_consistent();
            assert_eq!(set.range(0, -1), arr.iter().collect::<Vec<_>>());
        }
    }
}
