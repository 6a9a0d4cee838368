use core::cmp::Ordering;
use std::fmt::Debug;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, trace, warn};

use super::arena::{Arena, NodeId};
use super::config::{SkipListBuilder, SkipListConfig, DEFAULT_SKIP_PERCENTAGE};
use super::node::{Level, Node};
use super::range::ScoreRange;

/// 两个值分数相同时的比较函数
pub type Comparator<V> = Box<dyn Fn(&V, &V) -> Ordering>;

/// 查找路径：每一层最后停留的节点，`None` 表示停在表头。
/// 插入和删除时都要靠它修改各层的链接和 span。
pub type UpdateList = Vec<Option<NodeId>>;

/// 带排名的跳表。按 (score, compare) 排序，每层链接上记录 span，
/// 这样沿查找路径把 span 加起来就是节点的排名（从 1 开始）。
pub struct SkipList<V> {
    /// 所有真实节点
    arena: Arena<V>,
    /// 表头各层的链接，长度固定为 max_level
    head: Vec<Level>,
    /// 指向 level-0 的最后一个节点
    tail: Option<NodeId>,
    /// level-0 中的节点数，不含表头
    length: usize,
    /// 当前使用中的最高层数
    level: usize,
    max_level: usize,
    /// 随机跳跃的概率，取值在 0~100 之间
    skip_percentage: usize,
    compare: Comparator<V>,
    rng: StdRng,
}

impl<V: Debug> Debug for SkipList<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkipList")
            .field("length", &self.length)
            .field("level", &self.level)
            .field("max_level", &self.max_level)
            .field("items", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<V> SkipList<V> {
    /// 默认配置的跳表
    pub fn new<F>(compare: F) -> Self
    where F: Fn(&V, &V) -> Ordering + 'static
    {
        Self::with_config(&SkipListConfig::default(), Box::new(compare))
    }

    pub fn builder() -> SkipListBuilder<V> {
        SkipListBuilder::new()
    }

    pub(crate) fn with_config(config: &SkipListConfig, compare: Comparator<V>) -> Self {
        let max_level = config.effective_max_level();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            arena: Arena::new(),
            head: vec![Level::default(); max_level],
            tail: None,
            length: 0,
            level: 1,
            max_level,
            skip_percentage: DEFAULT_SKIP_PERCENTAGE,
            compare,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<V>> {
        self.arena.get(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id)
    }

    /// 排名第一的节点
    pub fn first(&self) -> Option<NodeId> {
        self.head[0].forward
    }

    /// 排名最后的节点
    pub fn last(&self) -> Option<NodeId> {
        self.tail
    }

    /// 按排名从低到高遍历 `(score, value)`，反向遍历走 backward 指针。
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            list: self,
            front: self.head[0].forward,
            back: self.tail,
            remaining: self.length,
        }
    }

    pub fn compare_values(&self, left: &V, right: &V) -> Ordering {
        (self.compare)(left, right)
    }

    fn level_at(&self, at: Option<NodeId>, i: usize) -> &Level {
        match at {
            None => &self.head[i],
            Some(id) => &self.arena[id].levels[i],
        }
    }

    fn level_at_mut(&mut self, at: Option<NodeId>, i: usize) -> &mut Level {
        match at {
            None => &mut self.head[i],
            Some(id) => &mut self.arena[id].levels[i],
        }
    }

    /// node 是否排在 (score, value) 之前
    fn precedes(&self, node: &Node<V>, score: f64, value: &V) -> bool {
        node.score() < score
            || (node.score() == score && (self.compare)(node.value(), value) == Ordering::Less)
    }

    /// 随机当前结点的层数
    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < self.max_level && self.rng.gen_ratio(self.skip_percentage as u32, 100) {
            level += 1;
        }
        level
    }

    /// 插入一个节点，返回新节点的句柄。
    pub fn insert_by_score(&mut self, score: f64, value: V) -> NodeId {
        let level = self.random_level();
        self.do_insert(score, value, level)
    }

    fn do_insert(&mut self, score: f64, value: V, level: usize) -> NodeId {
        let mut update: UpdateList = vec![None; self.max_level];
        // rank[i]: 第 i 层停留节点的排名
        let mut rank = vec![0usize; self.max_level];
        let mut cursor: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            while let Some(next) = self.level_at(cursor, i).forward {
                if !self.precedes(&self.arena[next], score, &value) {
                    break;
                }
                rank[i] += self.level_at(cursor, i).span;
                cursor = Some(next);
            }
            update[i] = cursor;
        }

        if level > self.level {
            // 新增的层直接从表头指过来
            for i in self.level..level {
                rank[i] = 0;
                update[i] = None;
                self.head[i].span = self.length;
            }
            trace!(from = self.level, to = level, "skiplist: level grows");
            self.level = level;
        }

        let id = self.arena.insert(Node::new(value, score, level));
        for i in 0..level {
            let prev = *self.level_at(update[i], i);
            let gap = rank[0] - rank[i];
            self.arena[id].levels[i] = Level { forward: prev.forward, span: prev.span - gap };
            *self.level_at_mut(update[i], i) = Level { forward: Some(id), span: gap + 1 };
        }
        // 更高的层跨过了新节点
        for i in level..self.level {
            self.level_at_mut(update[i], i).span += 1;
        }

        self.arena[id].backward = update[0];
        match self.arena[id].levels[0].forward {
            Some(next) => self.arena[next].backward = Some(id),
            None => self.tail = Some(id),
        }
        self.length += 1;
        id
    }

    /// 更新节点分数，返回更新后节点的句柄。
    ///
    /// 新分数仍夹在前后两个节点之间时直接原地修改；否则删掉再重新插入，
    /// 此时原句柄失效，必须改用返回值。句柄已失效时返回 `None`。
    pub fn update_score(&mut self, id: NodeId, score: f64) -> Option<NodeId> {
        let node = self.arena.get(id)?;
        let old = node.score();
        if score == old {
            return Some(id);
        }
        // 与邻居分数相等时不走原地修改，交给重新插入按 compare 决定位置
        let in_place = if score > old {
            node.next(0).map_or(true, |next| self.arena[next].score() > score)
        } else {
            node.prev().map_or(true, |prev| self.arena[prev].score() < score)
        };
        if in_place {
            self.arena[id].set_score(score);
            return Some(id);
        }
        debug!(from = old, to = score, "skiplist: score crosses a neighbour, reinsert");
        let update = self.update_list(id);
        let value = self.delete(id, &update)?;
        Some(self.insert_by_score(score, value))
    }

    /// 同时替换分数和值。
    ///
    /// 新旧值在 compare 下相等时位置只由分数决定，复用 [`update_score`](Self::update_score)；
    /// 否则删掉重新插入。
    pub fn update(&mut self, id: NodeId, score: f64, value: V) -> Option<NodeId> {
        let node = self.arena.get(id)?;
        if (self.compare)(node.value(), &value) == Ordering::Equal {
            let id = self.update_score(id, score)?;
            self.arena[id].replace_value(value);
            return Some(id);
        }
        self.delete_node(id)?;
        Some(self.insert_by_score(score, value))
    }

    /// 按节点当前的 (score, value) 重新查出删除它所需的路径。
    /// 节点分数在上次插入或更新之后不能再改过。
    pub fn update_list(&self, id: NodeId) -> UpdateList {
        let mut update: UpdateList = vec![None; self.max_level];
        let Some(target) = self.arena.get(id) else {
            return update;
        };
        let mut cursor: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.level_at(cursor, i).forward {
                if !self.precedes(&self.arena[next], target.score(), target.value()) {
                    break;
                }
                cursor = Some(next);
            }
            update[i] = cursor;
        }
        update
    }

    /// 按给定路径删除节点，返回节点中的值。句柄已失效时什么都不做。
    ///
    /// `update` 必须是该节点当前有效的查找路径，通常来自 [`update_list`](Self::update_list)。
    pub fn delete(&mut self, id: NodeId, update: &[Option<NodeId>]) -> Option<V> {
        if !self.arena.contains(id) {
            return None;
        }
        for i in 0..self.level {
            let removed = self.arena[id].levels.get(i).copied();
            let prev = self.level_at_mut(update[i], i);
            match removed {
                Some(l) if prev.forward == Some(id) => {
                    prev.span = prev.span + l.span - 1;
                    prev.forward = l.forward;
                },
                // 高出节点的层，只是少跨过了一个节点
                _ => prev.span -= 1,
            }
        }
        let node = self.arena.remove(id)?;
        match node.levels[0].forward {
            Some(next) => self.arena[next].backward = update[0],
            None => self.tail = update[0],
        }
        let before = self.level;
        while self.level > 1 && self.head[self.level - 1].forward.is_none() {
            self.level -= 1;
        }
        if before != self.level {
            trace!(from = before, to = self.level, "skiplist: level shrinks");
        }
        self.length -= 1;
        Some(node.into_value())
    }

    /// 重新查路径后删除节点
    pub fn delete_node(&mut self, id: NodeId) -> Option<V> {
        if !self.arena.contains(id) {
            return None;
        }
        let update = self.update_list(id);
        self.delete(id, &update)
    }

    /// 批量删除一段排名连续的节点，返回被删除的值。
    ///
    /// `ids` 必须按排名升序且前后相邻（例如 [`nodes_by_rank`](Self::nodes_by_rank) 或
    /// [`nodes_by_score`](Self::nodes_by_score) 的结果）。只在第一个节点处查一次路径，
    /// 删掉一个节点后，路径上的前驱已经直接指向下一个目标，可以继续复用。
    /// 如果发现某个节点不紧跟在路径之后，就为它重新查路径。
    pub fn delete_contiguous(&mut self, ids: &[NodeId]) -> Vec<V> {
        let mut removed = Vec::with_capacity(ids.len());
        let mut path: Option<UpdateList> = None;
        for &id in ids {
            if !self.arena.contains(id) {
                continue;
            }
            let update = match path.take() {
                Some(update) if self.level_at(update[0], 0).forward == Some(id) => update,
                Some(_) => {
                    warn!(?id, "skiplist: batch delete target is not contiguous, search again");
                    self.update_list(id)
                },
                None => self.update_list(id),
            };
            if let Some(value) = self.delete(id, &update) {
                removed.push(value);
            }
            path = Some(update);
        }
        removed
    }

    /// 跳表中的分数范围和查找范围是否有交集
    pub fn score_in_range(&self, range: &ScoreRange) -> bool {
        let (Some(first), Some(last)) = (self.head[0].forward, self.tail) else {
            return false;
        };
        if !range.max_inf && self.arena[first].score() > range.max {
            return false;
        }
        if !range.min_inf && self.arena[last].score() < range.min {
            return false;
        }
        true
    }

    /// 第一个分数不小于下界的节点
    fn first_in_range(&self, range: &ScoreRange) -> Option<NodeId> {
        if range.min_inf {
            return self.head[0].forward;
        }
        let mut cursor: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.level_at(cursor, i).forward {
                if self.arena[next].score() >= range.min {
                    break;
                }
                cursor = Some(next);
            }
        }
        self.level_at(cursor, 0).forward
    }

    /// 按分数范围查找节点
    pub fn nodes_by_score(&self, range: &ScoreRange) -> Vec<NodeId> {
        self.nodes_by_score_limit(range, 0, 0)
    }

    /// 按分数范围查找节点，跳过前 `offset` 个，最多返回 `limit` 个（0 表示不限）。
    pub fn nodes_by_score_limit(&self, range: &ScoreRange, mut offset: usize, limit: usize) -> Vec<NodeId> {
        let mut result = vec![];
        if !self.score_in_range(range) {
            return result;
        }
        let mut limit = if limit == 0 { usize::MAX } else { limit };
        let mut cursor = self.first_in_range(range);
        while let Some(id) = cursor {
            if limit == 0 {
                break;
            }
            let node = &self.arena[id];
            if !range.below_max(node.score()) {
                break;
            }
            cursor = node.next(0);
            if offset > 0 {
                offset -= 1;
                continue;
            }
            result.push(id);
            limit -= 1;
        }
        result
    }

    pub fn values_by_score(&self, range: &ScoreRange) -> Vec<&V> {
        self.nodes_by_score(range)
            .into_iter()
            .map(|id| self.arena[id].value())
            .collect()
    }

    /// 分数在范围内的节点数，只需两次自顶向下的查找。
    pub fn count_by_score(&self, range: &ScoreRange) -> usize {
        if !self.score_in_range(range) {
            return 0;
        }
        let below = if range.min_inf { 0 } else { self.count_while(|s| s < range.min) };
        let upto = if range.max_inf { self.length } else { self.count_while(|s| s <= range.max) };
        upto.saturating_sub(below)
    }

    /// 从头开始满足 pred 的节点个数，pred 对有序的分数必须是单调的
    fn count_while<P: Fn(f64) -> bool>(&self, pred: P) -> usize {
        let mut rank = 0;
        let mut cursor: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.level_at(cursor, i).forward {
                if !pred(self.arena[next].score()) {
                    break;
                }
                rank += self.level_at(cursor, i).span;
                cursor = Some(next);
            }
        }
        rank
    }

    /// 按排名范围查找节点，排名从 1 开始，两端都包含。
    pub fn nodes_by_rank(&self, left: usize, right: usize) -> Vec<NodeId> {
        if self.length == 0 || left == 0 || right == 0 || right < left || left > self.length {
            return vec![];
        }
        let mut result = Vec::with_capacity(right.min(self.length) - left + 1);
        let mut traversed = 0;
        let mut cursor: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.level_at(cursor, i).forward {
                let span = self.level_at(cursor, i).span;
                if traversed + span > left {
                    break;
                }
                traversed += span;
                cursor = Some(next);
            }
            if traversed == left {
                // 找到了排名最小的节点，再沿 level-0 往后取
                while let Some(id) = cursor {
                    if traversed > right {
                        break;
                    }
                    result.push(id);
                    traversed += 1;
                    cursor = self.arena[id].next(0);
                }
                return result;
            }
        }
        result
    }

    pub fn values_by_rank(&self, left: usize, right: usize) -> Vec<&V> {
        self.nodes_by_rank(left, right)
            .into_iter()
            .map(|id| self.arena[id].value())
            .collect()
    }

    /// 节点的排名（从 1 开始），节点不存在时返回 `None`。
    pub fn node_rank(&self, id: NodeId) -> Option<usize> {
        let target = self.arena.get(id)?;
        let mut rank = 0;
        let mut cursor: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.level_at(cursor, i).forward {
                if next != id && !self.precedes(&self.arena[next], target.score(), target.value()) {
                    break;
                }
                rank += self.level_at(cursor, i).span;
                cursor = Some(next);
            }
            if cursor == Some(id) {
                return Some(rank);
            }
        }
        None
    }
}

/// [`SkipList::iter`] 返回的迭代器
pub struct Iter<'a, V> {
    list: &'a SkipList<V>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (f64, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let list = self.list;
        let node = &list.arena[self.front?];
        self.front = node.next(0);
        self.remaining -= 1;
        Some((node.score(), node.value()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> DoubleEndedIterator for Iter<'a, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let list = self.list;
        let node = &list.arena[self.back?];
        self.back = node.prev();
        self.remaining -= 1;
        Some((node.score(), node.value()))
    }
}

impl<'a, V> ExactSizeIterator for Iter<'a, V> {}

#[cfg(test)]
impl<V> SkipList<V> {
    /// 逐层检查顺序、span、反向指针、tail、length 和 level
    pub(crate) fn assert_consistent(&self) {
        use std::collections::HashMap;

        let mut ranks: HashMap<NodeId, usize> = HashMap::new();
        let mut prev: Option<NodeId> = None;
        let mut cursor = self.head[0].forward;
        while let Some(id) = cursor {
            let node = &self.arena[id];
            assert_eq!(node.prev(), prev, "backward of rank {}", ranks.len() + 1);
            if let Some(p) = prev {
                assert!(self.precedes(&self.arena[p], node.score(), node.value()), "order broken");
            }
            ranks.insert(id, ranks.len() + 1);
            prev = Some(id);
            cursor = node.next(0);
        }
        assert_eq!(ranks.len(), self.length);
        assert_eq!(self.arena.len(), self.length);
        assert_eq!(self.tail, prev);

        for i in 0..self.level {
            let mut cursor: Option<NodeId> = None;
            let mut rank = 0;
            let mut linked = 0;
            loop {
                let l = *self.level_at(cursor, i);
                match l.forward {
                    Some(next) => {
                        let next_rank = ranks[&next];
                        assert_eq!(l.span, next_rank - rank, "span at level {}", i);
                        rank = next_rank;
                        cursor = Some(next);
                        linked += 1;
                    },
                    None => {
                        assert_eq!(l.span, self.length - rank, "tail span at level {}", i);
                        break;
                    },
                }
            }
            let tall = ranks.keys().filter(|id| self.arena[**id].height() > i).count();
            assert_eq!(linked, tall, "nodes missing at level {}", i);
        }
        assert!(self.level == 1 || self.head[self.level - 1].forward.is_some());
        for i in self.level..self.max_level {
            assert!(self.head[i].forward.is_none());
        }
    }
}
