use super::belief::Belief;
use super::value::Value;
use crate::Observation;

/// arena slot handle. plain index, cheap to copy, never dangles as
/// long as it came from the planner's own arena.
pub type NodeId = usize;

/// alpha-vector accumulator, used only by explicit-model environments
#[derive(Debug, Clone, Default)]
pub struct Alpha {
    pub alpha_sum: Vec<f64>,
    pub max_value: f64,
}

/// action node: the value of having taken one action from a belief,
/// with lazily filled per-observation children.
#[derive(Debug, Clone)]
pub struct QNode {
    pub value: Value,
    pub alpha: Alpha,
    children: Vec<Option<NodeId>>,
}

impl QNode {
    pub fn new(objectives: usize, observations: usize) -> Self {
        Self {
            value: Value::new(objectives),
            alpha: Alpha::default(),
            children: vec![None; observations],
        }
    }

    pub fn child(&self, observation: Observation) -> Option<NodeId> {
        self.children[observation]
    }

    pub fn set_child(&mut self, observation: Observation, child: NodeId) {
        assert!(self.children[observation].is_none(), "child already expanded");
        self.children[observation] = Some(child);
    }

    pub fn children(&self) -> &[Option<NodeId>] {
        &self.children
    }

    pub fn clear(&mut self, objectives: usize) {
        self.value = Value::new(objectives);
        self.alpha = Alpha::default();
        self.children.iter_mut().for_each(|c| *c = None);
    }
}

/// decision node: the belief reachable by one specific history, with
/// one inline Q child per action.
#[derive(Debug, Clone)]
pub struct VNode<S> {
    pub value: Value,
    pub belief: Belief<S>,
    children: Vec<QNode>,
}

impl<S: Clone> VNode<S> {
    pub fn new(objectives: usize, actions: usize, observations: usize) -> Self {
        Self {
            value: Value::new(objectives),
            belief: Belief::new(),
            children: (0..actions)
                .map(|_| QNode::new(objectives, observations))
                .collect(),
        }
    }

    pub fn child(&self, action: crate::Action) -> &QNode {
        &self.children[action]
    }

    pub fn child_mut(&mut self, action: crate::Action) -> &mut QNode {
        &mut self.children[action]
    }

    pub fn children(&self) -> &[QNode] {
        &self.children
    }

    pub fn clear(&mut self, objectives: usize) {
        self.value = Value::new(objectives);
        self.belief.clear();
        self.children.iter_mut().for_each(|q| q.clear(objectives));
    }
}
