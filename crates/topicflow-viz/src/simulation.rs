//! Force simulation for free nodes.
//!
//! Pinned nodes take part in the forces acting on free nodes (they repel
//! and anchor springs) but are never integrated: their coordinates only
//! change through explicit repositioning. Stepping is cooperative; callers
//! drive it with [`Simulation::tick`], [`Simulation::run`] or
//! [`Simulation::run_until`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use topicflow_types::{EdgeKind, NodeLevel};
use tracing::debug;

use crate::config::SimulationConfig;

/// Minimum squared distance used by the many-body force.
const MIN_DISTANCE_SQ: f64 = 1.0;

/// How a node is positioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Placed by the force simulation
    Free,
    /// Placed by the layout function
    Pinned,
}

/// Simulation state of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct SimNode {
    pub id: String,
    pub level: NodeLevel,
    pub kind: NodeKind,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
    /// Temporary fix of a free node (drag gesture)
    pub fixed: Option<(f64, f64)>,
}

impl SimNode {
    pub fn pinned(id: impl Into<String>, level: NodeLevel, position: (f64, f64), radius: f64) -> Self {
        Self::new(id.into(), level, NodeKind::Pinned, position, radius)
    }

    pub fn free(id: impl Into<String>, level: NodeLevel, position: (f64, f64), radius: f64) -> Self {
        Self::new(id.into(), level, NodeKind::Free, position, radius)
    }

    fn new(id: String, level: NodeLevel, kind: NodeKind, (x, y): (f64, f64), radius: f64) -> Self {
        Self {
            id,
            level,
            kind,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius,
            fixed: None,
        }
    }

    /// True when forces may move this node.
    pub fn is_movable(&self) -> bool {
        self.kind == NodeKind::Free && self.fixed.is_none()
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// A spring between two nodes (indices into the node list).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimLink {
    pub source: usize,
    pub target: usize,
    pub kind: EdgeKind,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Alpha fell below `alpha_min`
    Settled,
    /// Tick budget used up first
    Exhausted,
    /// Cancelled by the caller; the layout should be discarded
    Cancelled,
}

/// A cooperative, deterministic force simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    nodes: Vec<SimNode>,
    links: Vec<SimLink>,
    index: HashMap<String, usize>,
    config: SimulationConfig,
    alpha: f64,
    ticks: usize,
}

impl Simulation {
    pub fn new(nodes: Vec<SimNode>, links: Vec<SimLink>, config: SimulationConfig) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let links = links
            .into_iter()
            .filter(|l| l.source < nodes.len() && l.target < nodes.len() && l.source != l.target)
            .collect();
        Self {
            nodes,
            links,
            index,
            config,
            alpha: 1.0,
            ticks: 0,
        }
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[SimLink] {
        &self.links
    }

    pub fn node(&self, id: &str) -> Option<&SimNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < self.config.alpha_min
    }

    /// Raise alpha to at least `alpha` so the layout moves again.
    pub fn reheat(&mut self, alpha: f64) {
        self.alpha = self.alpha.max(alpha.clamp(0.0, 1.0));
    }

    /// Reheat with the configured drag alpha.
    pub fn reheat_default(&mut self) {
        self.reheat(self.config.reheat_alpha);
    }

    /// Hold a free node at a position until [`Simulation::release`].
    pub fn fix(&mut self, i: usize, x: f64, y: f64) {
        if let Some(node) = self.nodes.get_mut(i) {
            node.fixed = Some((x, y));
            node.x = x;
            node.y = y;
            node.vx = 0.0;
            node.vy = 0.0;
        }
    }

    pub fn release(&mut self, i: usize) {
        if let Some(node) = self.nodes.get_mut(i) {
            node.fixed = None;
        }
    }

    /// Move any node directly, bypassing the forces.
    pub fn place(&mut self, i: usize, x: f64, y: f64) {
        if let Some(node) = self.nodes.get_mut(i) {
            node.x = x;
            node.y = y;
            node.vx = 0.0;
            node.vy = 0.0;
        }
    }

    /// Advance one step.
    pub fn tick(&mut self) {
        self.alpha *= 1.0 - self.config.alpha_decay;
        self.apply_links();
        self.apply_many_body();
        self.apply_collision();
        self.integrate();
        self.ticks += 1;
    }

    /// Step until settled or `max_ticks` steps were taken.
    pub fn run(&mut self, max_ticks: usize) -> RunStatus {
        let never = AtomicBool::new(false);
        self.run_until(max_ticks, &never)
    }

    /// Like [`Simulation::run`], checking `cancel` before every step.
    pub fn run_until(&mut self, max_ticks: usize, cancel: &AtomicBool) -> RunStatus {
        for _ in 0..max_ticks {
            if cancel.load(Ordering::Relaxed) {
                debug!(ticks = self.ticks, "Simulation cancelled");
                return RunStatus::Cancelled;
            }
            if self.is_settled() {
                return RunStatus::Settled;
            }
            self.tick();
        }
        if self.is_settled() {
            RunStatus::Settled
        } else {
            RunStatus::Exhausted
        }
    }

    fn spring(&self, kind: EdgeKind) -> (f64, f64) {
        match kind {
            EdgeKind::Hierarchy => (self.config.hierarchy_distance, self.config.hierarchy_strength),
            EdgeKind::Cooccurrence => (
                self.config.cooccurrence_distance,
                self.config.cooccurrence_strength,
            ),
        }
    }

    /// Share of a correction taken by `a` when pushing `a` and `b` apart or
    /// together; immovable nodes take none.
    fn shares(&self, a: usize, b: usize) -> (f64, f64) {
        match (self.nodes[a].is_movable(), self.nodes[b].is_movable()) {
            (true, true) => (0.5, 0.5),
            (true, false) => (1.0, 0.0),
            (false, true) => (0.0, 1.0),
            (false, false) => (0.0, 0.0),
        }
    }

    fn apply_links(&mut self) {
        for k in 0..self.links.len() {
            let link = self.links[k];
            let (distance, strength) = self.spring(link.kind);
            let (s, t) = (link.source, link.target);
            let (dx, dy) = separation(&self.nodes[s], &self.nodes[t], s, t);
            let dist = (dx * dx + dy * dy).sqrt();
            let l = (dist - distance) / dist * self.alpha * strength;
            let (fx, fy) = (dx * l, dy * l);
            let (share_s, share_t) = self.shares(s, t);
            self.nodes[t].vx -= fx * share_t;
            self.nodes[t].vy -= fy * share_t;
            self.nodes[s].vx += fx * share_s;
            self.nodes[s].vy += fy * share_s;
        }
    }

    fn apply_many_body(&mut self) {
        let n = self.nodes.len();
        for i in 0..n {
            if !self.nodes[i].is_movable() {
                continue;
            }
            let (mut ax, mut ay) = (0.0, 0.0);
            for j in 0..n {
                if i == j {
                    continue;
                }
                let (dx, dy) = separation(&self.nodes[i], &self.nodes[j], i, j);
                let d2 = (dx * dx + dy * dy).max(MIN_DISTANCE_SQ);
                let strength = self.config.charge_for(self.nodes[j].level);
                ax += dx * strength * self.alpha / d2;
                ay += dy * strength * self.alpha / d2;
            }
            self.nodes[i].vx += ax;
            self.nodes[i].vy += ay;
        }
    }

    fn apply_collision(&mut self) {
        let n = self.nodes.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (share_i, share_j) = self.shares(i, j);
                if share_i == 0.0 && share_j == 0.0 {
                    continue;
                }
                let reach = self.nodes[i].radius + self.nodes[j].radius + self.config.collision_padding;
                let (dx, dy) = separation(&self.nodes[i], &self.nodes[j], i, j);
                let dist = (dx * dx + dy * dy).sqrt();
                if dist >= reach {
                    continue;
                }
                let push = (reach - dist) / dist * self.config.collision_strength;
                let (px, py) = (dx * push, dy * push);
                self.nodes[i].vx -= px * share_i;
                self.nodes[i].vy -= py * share_i;
                self.nodes[j].vx += px * share_j;
                self.nodes[j].vy += py * share_j;
            }
        }
    }

    fn integrate(&mut self) {
        let keep = 1.0 - self.config.velocity_decay;
        for node in &mut self.nodes {
            match (node.kind, node.fixed) {
                (NodeKind::Pinned, _) => {}
                (NodeKind::Free, Some((x, y))) => {
                    node.x = x;
                    node.y = y;
                    node.vx = 0.0;
                    node.vy = 0.0;
                }
                (NodeKind::Free, None) => {
                    node.vx *= keep;
                    node.vy *= keep;
                    node.x += node.vx;
                    node.y += node.vy;
                }
            }
        }
    }
}

/// Vector from `a` to `b`. Coincident nodes get a small deterministic
/// offset so forces stay defined.
fn separation(a: &SimNode, b: &SimNode, ia: usize, ib: usize) -> (f64, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if dx == 0.0 && dy == 0.0 {
        let sign = if ib > ia { 1.0 } else { -1.0 };
        return (sign * 1e-3, sign * 1e-3);
    }
    (dx, dy)
}
