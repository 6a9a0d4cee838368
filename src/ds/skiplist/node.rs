use std::fmt::Debug;

use super::arena::NodeId;

/// 节点某一层的链接。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Level {
    /// 本层的下一个节点
    pub(crate) forward: Option<NodeId>,
    /// 从当前节点走到 forward 在 level-0 上要走的步数。
    /// forward 为空时，记录的是到表尾还剩多少个节点。
    pub(crate) span: usize,
}

/// 跳表节点。层数在创建时确定，之后不会改变。
pub struct Node<V> {
    score: f64,
    /// 存入数据
    value: V,
    /// 各层链表，下标越大索引级别越高
    pub(crate) levels: Vec<Level>,
    /// level-0 上的前一个节点，为空表示前面就是表头
    pub(crate) backward: Option<NodeId>,
}

impl<V> Node<V> {
    pub(crate) fn new(value: V, score: f64, height: usize) -> Self {
        Self {
            score,
            value,
            levels: vec![Level::default(); height],
            backward: None,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub(crate) fn set_score(&mut self, score: f64) {
        self.score = score;
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub(crate) fn replace_value(&mut self, value: V) -> V {
        std::mem::replace(&mut self.value, value)
    }

    pub(crate) fn into_value(self) -> V {
        self.value
    }

    pub fn height(&self) -> usize {
        self.levels.len()
    }

    /// 第 i 层的下一个节点
    pub fn next(&self, i: usize) -> Option<NodeId> {
        self.levels.get(i).and_then(|l| l.forward)
    }

    /// 第 i 层的 span
    pub fn span(&self, i: usize) -> usize {
        self.levels.get(i).map_or(0, |l| l.span)
    }

    /// 前一个节点。只有 level-0 维护反向指针。
    pub fn prev(&self) -> Option<NodeId> {
        self.backward
    }
}

impl<V: Debug> Debug for Node<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("score", &self.score)
            .field("value", &self.value)
            .field("level", &self.levels.len())
            .finish()
    }
}
