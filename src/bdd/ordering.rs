#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! BDD variable ordering for a normalized cluster.
//!
//! Variables `1..=ndata` are data variables and `ndata+1..=nvar` are encoding
//! variables. The heuristic tries to place encoding variables that interact
//! next to each other, and each data variable right after the first encoding
//! variable it shares a clause with.
//!
//! Encoding variables form a weighted graph: weight `1.0` between two encoding
//! variables occurring in the same clause, and (for larger clusters) weight
//! `0.75` between two encoding variables sharing a data neighbour. A few
//! seeded random starts each hop towards the farthest vertex to find a
//! "corner" of the graph; a final shortest-path sweep from the best corner
//! gives the encoding order.
//!
//! The ordering only influences BDD sizes, never the result of the analysis.

use crate::knf::literal::{Lit, Var, var_of};
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Number of random starting points.
const START_COUNT: usize = 6;
/// Maximum number of hops per starting point.
const MAX_HOP: usize = 3;
/// Below this many encoding variables the natural order is used.
const NODE_THRESHOLD: usize = 5;

const DIRECT_WEIGHT: f64 = 1.0;
const SHARED_DATA_WEIGHT: f64 = 0.75;

#[derive(Debug, Clone, Copy)]
struct Edge {
    a: Var,
    b: Var,
    weight: f64,
}

impl Edge {
    const fn other(&self, v: Var) -> Var {
        if self.a == v { self.b } else { self.a }
    }
}

/// Result of one shortest-path sweep.
#[derive(Debug, Clone, Default)]
struct Sweep {
    visited: Vec<Var>,
    lengths: Vec<f64>,
    sum: f64,
}

impl Sweep {
    fn farthest(&self) -> (Var, f64) {
        let v = self.visited.last().copied().expect("a sweep visits its source");
        let d = self.lengths.last().copied().expect("a sweep visits its source");
        (v, d)
    }
}

/// Collects clause structure and produces a variable order.
#[derive(Debug, Clone)]
pub struct Ordering {
    nvar: usize,
    ndata: usize,
    edges: Vec<Edge>,
    unique_edges: FxHashMap<(Var, Var), usize>,
    encoded_edges: Vec<BTreeSet<usize>>,
    data_neighbors: Vec<BTreeSet<Var>>,
    encoding_neighbors: Vec<BTreeSet<Var>>,
}

impl Ordering {
    /// # Panics
    ///
    /// If `ndata > nvar`.
    #[must_use]
    pub fn new(nvar: usize, ndata: usize) -> Self {
        assert!(ndata <= nvar, "more data variables ({ndata}) than variables ({nvar})");
        let nencode = nvar - ndata;
        Self {
            nvar,
            ndata,
            edges: Vec::new(),
            unique_edges: FxHashMap::default(),
            encoded_edges: vec![BTreeSet::new(); nencode],
            data_neighbors: vec![BTreeSet::new(); nencode],
            encoding_neighbors: vec![BTreeSet::new(); ndata],
        }
    }

    const fn nencode(&self) -> usize {
        self.nvar - self.ndata
    }

    fn is_data(&self, v: Var) -> bool {
        (v as usize) <= self.ndata
    }

    fn encoding_index(&self, v: Var) -> usize {
        v as usize - self.ndata - 1
    }

    fn first_encoding(&self) -> Var {
        Var::try_from(self.ndata + 1).expect("variable count fits in Var")
    }

    fn add_edge(&mut self, v1: Var, v2: Var, weight: f64) {
        let key = (v1.min(v2), v1.max(v2));
        if self.unique_edges.contains_key(&key) {
            return;
        }
        let index = self.edges.len();
        self.edges.push(Edge {
            a: key.0,
            b: key.1,
            weight,
        });
        self.unique_edges.insert(key, index);
        let (ia, ib) = (self.encoding_index(key.0), self.encoding_index(key.1));
        self.encoded_edges[ia].insert(index);
        self.encoded_edges[ib].insert(index);
    }

    /// Records the variable interactions of one clause.
    pub fn add_clause(&mut self, literals: &[Lit]) {
        for (i, &l1) in literals.iter().enumerate() {
            let v1 = var_of(l1);
            for &l2 in &literals[i + 1..] {
                let v2 = var_of(l2);
                match (self.is_data(v1), self.is_data(v2)) {
                    (true, true) => {}
                    (true, false) => self.link_data(v1, v2),
                    (false, true) => self.link_data(v2, v1),
                    (false, false) if v1 != v2 => self.add_edge(v1, v2, DIRECT_WEIGHT),
                    (false, false) => {}
                }
            }
        }
    }

    fn link_data(&mut self, data: Var, encoding: Var) {
        let index = self.encoding_index(encoding);
        self.data_neighbors[index].insert(data);
        self.encoding_neighbors[data as usize - 1].insert(encoding);
    }

    fn add_shared_data_weights(&mut self) {
        let shared = std::mem::take(&mut self.encoding_neighbors);
        for neighbors in &shared {
            for &low in neighbors {
                for &high in neighbors.range(low + 1..) {
                    self.add_edge(low, high, SHARED_DATA_WEIGHT);
                }
            }
        }
        self.unique_edges.clear();
    }

    /// Dijkstra over the encoding graph from `source`.
    ///
    /// With `all_nodes`, vertices not reachable from `source` are appended
    /// with length `nencode`.
    fn shortest_paths(&self, source: Var, all_nodes: bool) -> Sweep {
        #[allow(clippy::cast_precision_loss)]
        let infinity = self.nencode() as f64;
        let mut sofar = vec![infinity; self.nencode()];
        let mut done = vec![false; self.nencode()];
        let mut queue: BTreeMap<OrderedFloat<f64>, BTreeSet<Var>> = BTreeMap::new();
        let mut sweep = Sweep::default();

        sofar[self.encoding_index(source)] = 0.0;
        queue.entry(OrderedFloat(0.0)).or_default().insert(source);

        while let Some((OrderedFloat(dist), nodes)) = queue.pop_first() {
            for ev in nodes {
                let index = self.encoding_index(ev);
                if done[index] || dist > sofar[index] {
                    continue;
                }
                done[index] = true;
                sweep.visited.push(ev);
                sweep.lengths.push(dist);
                sweep.sum += dist;

                for &edge_index in &self.encoded_edges[index] {
                    let edge = self.edges[edge_index];
                    let other = edge.other(ev);
                    let new_dist = dist + edge.weight;
                    let other_index = self.encoding_index(other);
                    if new_dist < sofar[other_index] {
                        sofar[other_index] = new_dist;
                        queue.entry(OrderedFloat(new_dist)).or_default().insert(other);
                    }
                }
            }
        }

        if all_nodes && sweep.visited.len() < self.nencode() {
            for (index, reached) in done.iter().enumerate() {
                if !reached {
                    let offset = Var::try_from(index).expect("encoding index fits in Var");
                    let ev = self.first_encoding() + offset;
                    sweep.visited.push(ev);
                    sweep.lengths.push(infinity);
                }
            }
        }
        sweep
    }

    fn order_encoded(&mut self, rng: &mut fastrand::Rng) -> Vec<Var> {
        let first = self.first_encoding();
        let nencode = self.nencode();
        if nencode < NODE_THRESHOLD {
            return (0..nencode)
                .map(|i| first + Var::try_from(i).expect("encoding index fits in Var"))
                .collect();
        }
        self.add_shared_data_weights();

        let mut best = (first, OrderedFloat(0.0), OrderedFloat(0.0));
        for attempt in 0..nencode.min(START_COUNT) {
            let offset =
                Var::try_from(rng.usize(0..nencode)).expect("encoding index fits in Var");
            let mut source = first + offset;
            let mut reach = (OrderedFloat(0.0), OrderedFloat(0.0));
            let mut hops = 0;
            while hops < MAX_HOP {
                let sweep = self.shortest_paths(source, false);
                let (far, dist) = sweep.farthest();
                let candidate = (OrderedFloat(dist), OrderedFloat(sweep.sum));
                if candidate <= reach {
                    break;
                }
                source = far;
                reach = candidate;
                hops += 1;
            }
            trace!(attempt, hops, source, distance = reach.0.0, sum = reach.1.0, "ordering start");
            if reach > (best.1, best.2) {
                best = (source, reach.0, reach.1);
            }
        }

        self.shortest_paths(best.0, true).visited
    }

    /// Produces a total order of `1..=nvar`, root-most first.
    ///
    /// The same clauses and seed always give the same order.
    #[must_use]
    pub fn generate_ordering(mut self, seed: u64) -> Vec<Var> {
        let mut rng = fastrand::Rng::with_seed(seed);
        let encoded = self.order_encoded(&mut rng);

        let mut placed = vec![false; self.ndata + 1];
        let mut order = Vec::with_capacity(self.nvar);
        for ev in encoded {
            order.push(ev);
            for &dv in &self.data_neighbors[self.encoding_index(ev)] {
                if !placed[dv as usize] {
                    placed[dv as usize] = true;
                    order.push(dv);
                }
            }
        }
        for dv in 1..=self.ndata {
            if !placed[dv] {
                order.push(Var::try_from(dv).expect("data variable fits in Var"));
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    fn is_permutation(order: &[Var], nvar: usize) -> bool {
        order.len() == nvar && order.iter().sorted().copied().eq(1..=Var::try_from(nvar).unwrap())
    }

    #[test]
    fn test_small_cluster_keeps_natural_encoding_order() {
        let mut ordering = Ordering::new(6, 4);
        ordering.add_clause(&[-1, 5]);
        ordering.add_clause(&[-2, 5]);
        ordering.add_clause(&[-3, -6]);
        ordering.add_clause(&[5, 6]);
        let order = ordering.generate_ordering(123_456);
        assert_eq!(order, vec![5, 1, 2, 6, 3, 4]);
    }

    #[test]
    fn test_no_encoding_variables() {
        let ordering = Ordering::new(3, 3);
        assert_eq!(ordering.generate_ordering(1), vec![1, 2, 3]);
    }

    #[test]
    fn test_ladder_order_is_deterministic_permutation() {
        // Sequential-counter style chain: encoding variables 9..=16 linked in a path.
        let ndata = 8;
        let nvar = 16;
        let build = || {
            let mut ordering = Ordering::new(nvar, ndata);
            for i in 1..=8 {
                let e = i + 8;
                ordering.add_clause(&[-i, e]);
                if i < 8 {
                    ordering.add_clause(&[-e, e + 1]);
                    ordering.add_clause(&[-e, -(i + 1)]);
                }
            }
            ordering
        };
        let first = build().generate_ordering(123_456);
        let second = build().generate_ordering(123_456);
        assert_eq!(first, second);
        assert!(is_permutation(&first, nvar));
    }

    #[test]
    fn test_path_sweep_starts_at_an_end() {
        // A path 6-7-8-9-10: the best corner is one of its ends.
        let mut ordering = Ordering::new(10, 5);
        for e in 6..10 {
            ordering.add_clause(&[e, -(e + 1)]);
        }
        let order = ordering.generate_ordering(7);
        let encoded = order.iter().copied().filter(|&v| v > 5).collect_vec();
        assert!(encoded == vec![6, 7, 8, 9, 10] || encoded == vec![10, 9, 8, 7, 6]);
    }

    #[test]
    fn test_disconnected_vertices_are_appended() {
        let mut ordering = Ordering::new(7, 1);
        ordering.add_clause(&[2, 3]);
        ordering.add_clause(&[3, 4]);
        ordering.add_clause(&[5, 6]);
        let order = ordering.generate_ordering(99);
        assert!(is_permutation(&order, 7));
    }
}
