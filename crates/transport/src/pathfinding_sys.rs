//! A* over the pathway grid with congestion- and decay-aware edge costs.
//!
//! Queries between tiles of different networks are rejected in O(1) using
//! the network ids written by the last topology rebuild, so a doomed search
//! never floods a large disconnected map.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::NO_NETWORK;
use crate::edge_cost::EdgeCost;
use crate::grid::{neighbors4, PathwayGrid, TilePos};

/// An ordered tile route and its total edge cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Path {
    pub tiles: Vec<TilePos>,
    pub cost: u64,
}

impl Path {
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn start(&self) -> Option<TilePos> {
        self.tiles.first().copied()
    }

    pub fn end(&self) -> Option<TilePos> {
        self.tiles.last().copied()
    }
}

/// Why a query was answered without searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotPathway,
    Unconnected,
    DifferentNetworks,
}

/// O(1) pre-check. `Some` means the search cannot succeed.
pub fn reject_query(grid: &PathwayGrid, start: TilePos, goal: TilePos) -> Option<Rejection> {
    let a = grid.get(start.0, start.1);
    let b = grid.get(goal.0, goal.1);
    if !a.present || !b.present {
        return Some(Rejection::NotPathway);
    }
    if a.network_id == NO_NETWORK || b.network_id == NO_NETWORK {
        return Some(Rejection::Unconnected);
    }
    if a.network_id != b.network_id {
        return Some(Rejection::DifferentNetworks);
    }
    None
}

#[derive(Debug, PartialEq, Eq)]
struct OpenEntry {
    estimate: u64,
    seq: u64,
    cost: u64,
    idx: usize,
}

impl Ord for OpenEntry {
    // BinaryHeap pops the maximum; invert so the lowest estimate wins and
    // equal estimates come out in insertion order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Plain A* between two pathway tiles. Does not apply [`reject_query`].
pub fn astar_search(
    grid: &PathwayGrid,
    edge_cost: &EdgeCost,
    start: TilePos,
    goal: TilePos,
) -> Option<Path> {
    if !grid.is_pathway(start.0, start.1) || !grid.is_pathway(goal.0, goal.1) {
        return None;
    }
    if start == goal {
        return Some(Path {
            tiles: vec![start],
            cost: 0,
        });
    }

    let (w, h) = (grid.width(), grid.height());
    let tiles = grid.tiles();
    let start_idx = grid.index(start.0, start.1);
    let goal_idx = grid.index(goal.0, goal.1);

    let mut best = vec![u64::MAX; tiles.len()];
    let mut parent = vec![usize::MAX; tiles.len()];
    let mut closed = vec![false; tiles.len()];
    let mut open = BinaryHeap::new();
    let mut seq = 0u64;

    best[start_idx] = 0;
    open.push(OpenEntry {
        estimate: edge_cost.heuristic(start.manhattan(goal)),
        seq,
        cost: 0,
        idx: start_idx,
    });

    while let Some(OpenEntry { cost, idx, .. }) = open.pop() {
        if closed[idx] {
            continue;
        }
        if idx == goal_idx {
            let mut route = vec![TilePos(idx % w, idx / w)];
            let mut cur = idx;
            while parent[cur] != usize::MAX {
                cur = parent[cur];
                route.push(TilePos(cur % w, cur / w));
            }
            route.reverse();
            return Some(Path { tiles: route, cost });
        }
        closed[idx] = true;

        let (neighbors, ncount) = neighbors4(w, h, idx % w, idx / w);
        for &(nx, ny) in &neighbors[..ncount] {
            let nidx = ny * w + nx;
            let tile = &tiles[nidx];
            if !tile.present || closed[nidx] {
                continue;
            }
            let next_cost = cost + edge_cost.cost_into(tile) as u64;
            if next_cost < best[nidx] {
                best[nidx] = next_cost;
                parent[nidx] = idx;
                seq += 1;
                open.push(OpenEntry {
                    estimate: next_cost + edge_cost.heuristic(TilePos(nx, ny).manhattan(goal)),
                    seq,
                    cost: next_cost,
                    idx: nidx,
                });
            }
        }
    }

    None
}

/// Counters describing how queries were answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct PathSearchStats {
    /// Full A* searches executed.
    pub searches: u64,
    /// Queries rejected by the network-id pre-check.
    pub short_circuits: u64,
    /// Searches that ran to exhaustion without reaching the goal.
    pub failed_searches: u64,
}

/// Pathfinding entry point that applies the pre-check and keeps counters.
#[derive(Debug, Clone, Default)]
pub struct Pathfinder {
    stats: PathSearchStats,
}

impl Pathfinder {
    pub fn find_path(
        &mut self,
        grid: &PathwayGrid,
        edge_cost: &EdgeCost,
        start: TilePos,
        goal: TilePos,
    ) -> Option<Path> {
        if reject_query(grid, start, goal).is_some() {
            self.stats.short_circuits += 1;
            return None;
        }
        self.stats.searches += 1;
        let path = astar_search(grid, edge_cost, start, goal);
        if path.is_none() {
            self.stats.failed_searches += 1;
        }
        path
    }

    pub fn stats(&self) -> PathSearchStats {
        self.stats
    }
}
