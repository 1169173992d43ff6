use super::node::NodeId;
use super::node::VNode;

/// pooled storage for decision nodes. thousands of trees are built
/// and torn down per episode, so freed slots go on a free list and
/// get recycled instead of reallocated. Q nodes live inline inside
/// their V node's action table and need no pooling of their own.
#[derive(Debug)]
pub struct Arena<S> {
    actions: usize,
    observations: usize,
    objectives: usize,
    slots: Vec<VNode<S>>,
    in_use: Vec<bool>,
    free: Vec<NodeId>,
}

impl<S: Clone> Arena<S> {
    pub fn new(actions: usize, observations: usize, objectives: usize) -> Self {
        Self {
            actions,
            observations,
            objectives,
            slots: vec![],
            in_use: vec![],
            free: vec![],
        }
    }

    /// a cleared node with full-size action and observation tables
    pub fn alloc(&mut self) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id].clear(self.objectives);
                self.in_use[id] = true;
                id
            }
            None => {
                let id = self.slots.len();
                self.slots
                    .push(VNode::new(self.objectives, self.actions, self.observations));
                self.in_use.push(true);
                id
            }
        }
    }

    /// return a subtree to the free list, depth first. belief samples
    /// drop with their node. freeing a slot twice is a no-op.
    pub fn free(&mut self, id: NodeId) {
        if !self.in_use[id] {
            return;
        }
        let children: Vec<NodeId> = self.slots[id]
            .children()
            .iter()
            .flat_map(|q| q.children().iter().flatten().copied())
            .collect();
        for child in children {
            self.free(child);
        }
        self.slots[id].clear(self.objectives);
        self.in_use[id] = false;
        self.free.push(id);
    }

    /// drain everything at episode teardown
    pub fn free_all(&mut self) {
        self.slots.clear();
        self.in_use.clear();
        self.free.clear();
    }

    pub fn node(&self, id: NodeId) -> &VNode<S> {
        assert!(self.in_use[id], "stale node handle");
        &self.slots[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut VNode<S> {
        assert!(self.in_use[id], "stale node handle");
        &mut self.slots[id]
    }

    /// number of nodes currently reachable from some root
    pub fn live(&self) -> usize {
        self.in_use.iter().filter(|u| **u).count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn live_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.in_use
            .iter()
            .enumerate()
            .filter(|(_, u)| **u)
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arena<u8> {
        Arena::new(2, 2, 2)
    }

    #[test]
    fn recycles_slots() {
        let mut arena = arena();
        let a = arena.alloc();
        arena.free(a);
        let b = arena.alloc();
        assert_eq!(a, b);
        assert_eq!(arena.capacity(), 1);
    }

    #[test]
    fn free_is_recursive_and_idempotent() {
        let mut arena = arena();
        let root = arena.alloc();
        let child = arena.alloc();
        let grandchild = arena.alloc();
        arena.node_mut(root).child_mut(0).set_child(1, child);
        arena.node_mut(child).child_mut(1).set_child(0, grandchild);
        assert_eq!(arena.live(), 3);
        arena.free(root);
        assert_eq!(arena.live(), 0);
        arena.free(root);
        assert_eq!(arena.live(), 0);
        assert_eq!(arena.capacity(), 3);
    }

    #[test]
    fn freed_nodes_come_back_cleared() {
        let mut arena = arena();
        let a = arena.alloc();
        arena.node_mut(a).value.add(&[1.0, 1.0]);
        arena.node_mut(a).belief.add(42);
        arena.free(a);
        let b = arena.alloc();
        assert_eq!(arena.node(b).value.count(), 0.0);
        assert!(arena.node(b).belief.is_empty());
    }

    #[test]
    fn free_all_drains() {
        let mut arena = arena();
        for _ in 0..4 {
            arena.alloc();
        }
        arena.free_all();
        assert_eq!(arena.live(), 0);
        assert_eq!(arena.capacity(), 0);
    }
}
