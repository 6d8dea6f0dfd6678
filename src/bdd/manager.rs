#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! A reduced ordered BDD kernel.
//!
//! Nodes live in a single table owned by [`BddManager`] and are shared between
//! every function built through it. A node is identified by its index, and the
//! unique table guarantees that two structurally equal nodes never coexist, so
//! comparing two [`NodeId`]s is comparing the functions they denote. There are
//! no complement edges: negation is never needed by the analysis, and plain
//! edges let the threshold decoder compare children directly.
//!
//! The variable order is fixed when the manager is created. Variables are
//! mapped to levels `1..=n` (level 1 is the root-most); terminals sit below
//! every level.
//!
//! Memory is reclaimed explicitly with [`BddManager::collect_garbage`], which
//! keeps everything reachable from the given roots and recycles the rest.

use crate::knf::literal::{Lit, Var, var_of};
use bit_vec::BitVec;
use rustc_hash::FxHashMap;
use tracing::trace;

/// Index of a node in the manager's table.
pub type NodeId = usize;

/// The constant-false terminal.
pub const FALSE: NodeId = 0;

/// The constant-true terminal.
pub const TRUE: NodeId = 1;

/// Level assigned to terminals: below every variable.
const LEAF_LEVEL: u32 = u32::MAX;

/// Level marking a recycled slot.
const FREE_LEVEL: u32 = u32::MAX - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Node {
    level: u32,
    low: NodeId,
    high: NodeId,
}

impl Node {
    const fn terminal() -> Self {
        Self {
            level: LEAF_LEVEL,
            low: FALSE,
            high: FALSE,
        }
    }

    const fn freed() -> Self {
        Self {
            level: FREE_LEVEL,
            low: FALSE,
            high: FALSE,
        }
    }
}

/// Shared node storage, unique table and operation caches.
#[derive(Debug, Clone)]
pub struct BddManager {
    nodes: Vec<Node>,
    unique: FxHashMap<Node, NodeId>,
    free: Vec<NodeId>,
    and_cache: FxHashMap<(NodeId, NodeId), NodeId>,
    or_cache: FxHashMap<(NodeId, NodeId), NodeId>,
    exists_cache: FxHashMap<(NodeId, u32), NodeId>,
    level_of_var: Vec<u32>,
    var_at_level: Vec<Var>,
    produced: usize,
}

impl BddManager {
    /// Creates a manager whose variable order is `order`, root-most first.
    ///
    /// # Panics
    ///
    /// If `order` contains variable 0 or the same variable twice.
    #[must_use]
    pub fn new(order: &[Var]) -> Self {
        let max_var = order.iter().copied().max().unwrap_or(0) as usize;
        let mut level_of_var = vec![0; max_var + 1];
        let mut var_at_level = vec![0; order.len() + 1];
        for (position, &var) in order.iter().enumerate() {
            assert_ne!(var, 0, "Variable index should not be zero");
            assert_eq!(level_of_var[var as usize], 0, "variable {var} ordered twice");
            let level = u32::try_from(position + 1)
                .unwrap_or_else(|_| panic!("variable order too long: {}", order.len()));
            level_of_var[var as usize] = level;
            var_at_level[position + 1] = var;
        }

        Self {
            nodes: vec![Node::terminal(), Node::terminal()],
            unique: FxHashMap::default(),
            free: Vec::new(),
            and_cache: FxHashMap::default(),
            or_cache: FxHashMap::default(),
            exists_cache: FxHashMap::default(),
            level_of_var,
            var_at_level,
            produced: 0,
        }
    }

    /// Number of variables in the order.
    #[must_use]
    pub const fn num_vars(&self) -> usize {
        self.var_at_level.len() - 1
    }

    /// Level of `var` in the order.
    ///
    /// # Panics
    ///
    /// If `var` is not part of the order.
    #[must_use]
    pub fn level_of(&self, var: Var) -> u32 {
        let level = self.level_of_var.get(var as usize).copied().unwrap_or(0);
        assert_ne!(level, 0, "variable {var} is not in the BDD order");
        level
    }

    /// Variable placed at `level`.
    #[must_use]
    pub fn var_at(&self, level: u32) -> Var {
        self.var_at_level[level as usize]
    }

    /// Whether `f` is a terminal.
    #[must_use]
    pub const fn is_constant(f: NodeId) -> bool {
        f == FALSE || f == TRUE
    }

    /// Level of the node's decision variable, or `u32::MAX` for terminals.
    #[must_use]
    pub fn level(&self, f: NodeId) -> u32 {
        self.nodes[f].level
    }

    /// Decision variable of the node, `None` for terminals.
    #[must_use]
    pub fn top_var(&self, f: NodeId) -> Option<Var> {
        if Self::is_constant(f) {
            None
        } else {
            Some(self.var_at(self.nodes[f].level))
        }
    }

    /// Child taken when the decision variable is false.
    #[must_use]
    pub fn low(&self, f: NodeId) -> NodeId {
        self.nodes[f].low
    }

    /// Child taken when the decision variable is true.
    #[must_use]
    pub fn high(&self, f: NodeId) -> NodeId {
        self.nodes[f].high
    }

    /// Nodes currently allocated, terminals excluded.
    #[must_use]
    pub fn live_nodes(&self) -> usize {
        self.nodes.len() - 2 - self.free.len()
    }

    /// Nodes created over the manager's lifetime.
    #[must_use]
    pub const fn produced(&self) -> usize {
        self.produced
    }

    fn mk_node(&mut self, level: u32, low: NodeId, high: NodeId) -> NodeId {
        if low == high {
            return low;
        }
        let node = Node { level, low, high };
        if let Some(&id) = self.unique.get(&node) {
            return id;
        }
        let id = if let Some(id) = self.free.pop() {
            self.nodes[id] = node;
            id
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        };
        self.unique.insert(node, id);
        self.produced += 1;
        id
    }

    /// The function `var`.
    pub fn var(&mut self, var: Var) -> NodeId {
        let level = self.level_of(var);
        self.mk_node(level, FALSE, TRUE)
    }

    /// The disjunction of `literals`, built bottom-up.
    ///
    /// Repeated literals are merged; a clause containing both polarities of a
    /// variable is `TRUE`, and the empty clause is `FALSE`.
    pub fn clause(&mut self, literals: &[Lit]) -> NodeId {
        let mut keyed: Vec<(u32, Lit)> = literals
            .iter()
            .map(|&l| (self.level_of(var_of(l)), l))
            .collect();
        keyed.sort_unstable();
        keyed.dedup();
        if keyed.windows(2).any(|w| w[0].0 == w[1].0) {
            return TRUE;
        }

        let mut current = FALSE;
        for &(level, lit) in keyed.iter().rev() {
            current = if lit > 0 {
                self.mk_node(level, current, TRUE)
            } else {
                self.mk_node(level, TRUE, current)
            };
        }
        current
    }

    fn cofactors(&self, f: NodeId, level: u32) -> (NodeId, NodeId) {
        let node = self.nodes[f];
        if node.level == level {
            (node.low, node.high)
        } else {
            (f, f)
        }
    }

    /// Conjunction.
    pub fn and(&mut self, f: NodeId, g: NodeId) -> NodeId {
        if f == FALSE || g == FALSE {
            return FALSE;
        }
        if f == TRUE {
            return g;
        }
        if g == TRUE || f == g {
            return f;
        }
        let key = if f < g { (f, g) } else { (g, f) };
        if let Some(&r) = self.and_cache.get(&key) {
            return r;
        }

        let top = self.level(f).min(self.level(g));
        let (f0, f1) = self.cofactors(f, top);
        let (g0, g1) = self.cofactors(g, top);
        let low = self.and(f0, g0);
        let high = self.and(f1, g1);
        let r = self.mk_node(top, low, high);
        self.and_cache.insert(key, r);
        r
    }

    /// Disjunction.
    pub fn or(&mut self, f: NodeId, g: NodeId) -> NodeId {
        if f == TRUE || g == TRUE {
            return TRUE;
        }
        if f == FALSE {
            return g;
        }
        if g == FALSE || f == g {
            return f;
        }
        let key = if f < g { (f, g) } else { (g, f) };
        if let Some(&r) = self.or_cache.get(&key) {
            return r;
        }

        let top = self.level(f).min(self.level(g));
        let (f0, f1) = self.cofactors(f, top);
        let (g0, g1) = self.cofactors(g, top);
        let low = self.or(f0, g0);
        let high = self.or(f1, g1);
        let r = self.mk_node(top, low, high);
        self.or_cache.insert(key, r);
        r
    }

    /// Existential quantification of a single variable.
    pub fn exists(&mut self, f: NodeId, var: Var) -> NodeId {
        let level = self.level_of(var);
        self.exists_level(f, level)
    }

    fn exists_level(&mut self, f: NodeId, level: u32) -> NodeId {
        let node = self.nodes[f];
        if node.level > level {
            return f;
        }
        if let Some(&r) = self.exists_cache.get(&(f, level)) {
            return r;
        }

        let r = if node.level == level {
            self.or(node.low, node.high)
        } else {
            let low = self.exists_level(node.low, level);
            let high = self.exists_level(node.high, level);
            self.mk_node(node.level, low, high)
        };
        self.exists_cache.insert((f, level), r);
        r
    }

    fn reachable(&self, roots: impl IntoIterator<Item = NodeId>) -> BitVec {
        let mut marked = BitVec::from_elem(self.nodes.len(), false);
        marked.set(FALSE, true);
        marked.set(TRUE, true);
        let mut stack: Vec<NodeId> = roots.into_iter().collect();
        while let Some(f) = stack.pop() {
            if marked[f] {
                continue;
            }
            marked.set(f, true);
            let node = self.nodes[f];
            stack.push(node.low);
            stack.push(node.high);
        }
        marked
    }

    /// Number of internal nodes reachable from `f`.
    #[must_use]
    pub fn node_count(&self, f: NodeId) -> usize {
        self.reachable([f]).iter().filter(|&m| m).count() - 2
    }

    /// Variables `f` depends on, root-most first.
    #[must_use]
    pub fn support(&self, f: NodeId) -> Vec<Var> {
        let marked = self.reachable([f]);
        let mut levels = BitVec::from_elem(self.var_at_level.len(), false);
        for (id, m) in marked.iter().enumerate() {
            if m && !Self::is_constant(id) {
                levels.set(self.nodes[id].level as usize, true);
            }
        }
        levels
            .iter()
            .enumerate()
            .filter(|&(_, set)| set)
            .map(|(level, _)| self.var_at_level[level])
            .collect()
    }

    /// Evaluates `f` under an assignment of its variables.
    pub fn evaluate(&self, f: NodeId, value: impl Fn(Var) -> bool) -> bool {
        let mut current = f;
        while !Self::is_constant(current) {
            let node = self.nodes[current];
            current = if value(self.var_at(node.level)) {
                node.high
            } else {
                node.low
            };
        }
        current == TRUE
    }

    /// Recycles every node not reachable from `roots` and clears the caches.
    ///
    /// Returns the number of nodes reclaimed. Ids of reclaimed nodes may be
    /// handed out again by later operations.
    pub fn collect_garbage(&mut self, roots: &[NodeId]) -> usize {
        self.and_cache.clear();
        self.or_cache.clear();
        self.exists_cache.clear();

        let alive = self.reachable(roots.iter().copied());
        let mut reclaimed = 0;
        for id in 2..self.nodes.len() {
            let node = self.nodes[id];
            if alive[id] || node.level == FREE_LEVEL {
                continue;
            }
            self.unique.remove(&node);
            self.nodes[id] = Node::freed();
            self.free.push(id);
            reclaimed += 1;
        }
        trace!(reclaimed, live = self.live_nodes(), "garbage collected");
        reclaimed
    }
}
