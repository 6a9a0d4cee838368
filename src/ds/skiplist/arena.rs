//! 跳表节点的存储区。
//!
//! 节点之间不再用裸指针互相引用，而是统一存放在一个 `Vec` 里，用 [`NodeId`] 下标访问。
//! 删除后的槽位会被复用，每次复用都会让槽位的 generation 加一，所以旧的 `NodeId`
//! 不会指向后来插入的节点。

use std::ops::{Index, IndexMut};

use super::node::Node;

/// 节点句柄。只在创建它的跳表内有效，节点被删除后即失效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

struct Slot<V> {
    generation: u32,
    node: Option<Node<V>>,
}

pub(crate) struct Arena<V> {
    slots: Vec<Slot<V>>,
    /// 空闲槽位下标
    free: Vec<usize>,
    len: usize,
}

impl<V> Arena<V> {
    pub fn new() -> Self {
        Self { slots: vec![], free: vec![], len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn insert(&mut self, node: Node<V>) -> NodeId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId { index, generation: slot.generation };
        }
        let index = self.slots.len();
        self.slots.push(Slot { generation: 0, node: Some(node) });
        NodeId { index, generation: 0 }
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node<V>> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<V>> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<V>> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }
}

/// 跳表内部遍历时使用，句柄失效属于内部逻辑错误，直接 panic（与 slice 越界一致）。
impl<V> Index<NodeId> for Arena<V> {
    type Output = Node<V>;

    fn index(&self, id: NodeId) -> &Self::Output {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node id {:?}", id),
        }
    }
}

impl<V> IndexMut<NodeId> for Arena<V> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale node id {:?}", id),
        }
    }
}
