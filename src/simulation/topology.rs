//! Grid topology and lane geometry
//!
//! Intersections sit on an N x N grid and every pair of grid-adjacent
//! intersections is joined by one two-way road segment. The segment graph is
//! kept in a petgraph map so adjacency questions (is this a real segment?
//! what joins these two junctions?) go through one place.

use petgraph::graphmap::UnGraphMap;

use super::config::SimConfig;
use super::types::{Heading, IntersectionId, Position, SegmentId, POSITION_EPSILON};

/// Static description of the intersection grid
#[derive(Debug, Clone)]
pub struct Topology {
    grid_size: u32,
    block_size: f64,
    lane_offset: f64,
    stop_line_offset: f64,
    /// Road segments between grid-adjacent intersections
    graph: UnGraphMap<IntersectionId, SegmentId>,
}

impl Topology {
    pub fn new(config: &SimConfig) -> Self {
        let n = config.grid_size;
        let mut graph = UnGraphMap::new();

        for y in 0..n {
            for x in 0..n {
                graph.add_node(IntersectionId::from_coords(x, y, n));
            }
        }

        // Connect grid horizontally
        for y in 0..n {
            for x in 0..n.saturating_sub(1) {
                let a = IntersectionId::from_coords(x, y, n);
                let b = IntersectionId::from_coords(x + 1, y, n);
                graph.add_edge(a, b, SegmentId::new(a, b));
            }
        }

        // Connect grid vertically
        for y in 0..n.saturating_sub(1) {
            for x in 0..n {
                let a = IntersectionId::from_coords(x, y, n);
                let b = IntersectionId::from_coords(x, y + 1, n);
                graph.add_edge(a, b, SegmentId::new(a, b));
            }
        }

        Self {
            grid_size: n,
            block_size: config.block_size,
            lane_offset: config.lane_offset(),
            stop_line_offset: config.stop_line_offset(),
            graph,
        }
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub fn intersection_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn segment_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether `id` names an intersection of this grid.
    pub fn contains(&self, id: IntersectionId) -> bool {
        self.graph.contains_node(id)
    }

    /// Grid coordinates of an intersection.
    pub fn coords(&self, id: IntersectionId) -> (u32, u32) {
        (id.0 % self.grid_size, id.0 / self.grid_size)
    }

    /// Intersection at the given grid coordinates, if inside the grid.
    pub fn at(&self, x: i64, y: i64) -> Option<IntersectionId> {
        let n = self.grid_size as i64;
        if (0..n).contains(&x) && (0..n).contains(&y) {
            Some(IntersectionId::from_coords(x as u32, y as u32, self.grid_size))
        } else {
            None
        }
    }

    /// The intersection one block away from `id` along `heading`.
    pub fn neighbor(&self, id: IntersectionId, heading: Heading) -> Option<IntersectionId> {
        let (x, y) = self.coords(id);
        let (dx, dy) = heading.grid_step();
        self.at(x as i64 + dx, y as i64 + dy)
    }

    /// The segment joining two intersections, if they are grid-adjacent.
    pub fn segment_between(&self, a: IntersectionId, b: IntersectionId) -> Option<SegmentId> {
        self.graph.edge_weight(a, b).copied()
    }

    /// Whether `segment` is a real road of this grid.
    pub fn has_segment(&self, segment: SegmentId) -> bool {
        self.graph.contains_edge(segment.a, segment.b)
    }

    pub fn intersection_ids(&self) -> impl Iterator<Item = IntersectionId> + '_ {
        self.graph.nodes()
    }

    /// Manhattan distance between two intersections in blocks.
    pub fn manhattan(&self, a: IntersectionId, b: IntersectionId) -> u32 {
        let (ax, ay) = self.coords(a);
        let (bx, by) = self.coords(b);
        ax.abs_diff(bx) + ay.abs_diff(by)
    }

    /// World position of an intersection centre.
    pub fn center(&self, id: IntersectionId) -> Position {
        let (x, y) = self.coords(id);
        Position::new(self.road_center(x), self.road_center(y))
    }

    /// Centreline coordinate of the road through grid column/row `index`.
    pub fn road_center(&self, index: u32) -> f64 {
        (index as f64 + 0.5) * self.block_size
    }

    /// Lateral coordinate of the lane for `heading` on road `index`.
    pub fn lane_center(&self, index: u32, heading: Heading) -> f64 {
        self.road_center(index) + heading.keep_left_sign() * self.lane_offset
    }

    /// Point in the lane for `heading` that sits `distance` units before
    /// reaching the centre of `id`.
    pub fn approach_position(&self, id: IntersectionId, heading: Heading, distance: f64) -> Position {
        let (x, y) = self.coords(id);
        let center = self.center(id);
        let lateral_index = if heading.is_vertical() { x } else { y };
        let lane = self.lane_center(lateral_index, heading);
        let on_axis = center.advanced(heading, -distance);
        if heading.is_vertical() {
            Position::new(lane, on_axis.y)
        } else {
            Position::new(on_axis.x, lane)
        }
    }

    /// Signed distance from `position` to the stop line guarding `id` for
    /// traffic travelling along `heading`. Negative once past the line.
    pub fn distance_to_stop_line(&self, id: IntersectionId, position: &Position, heading: Heading) -> f64 {
        position.along_to(&self.center(id), heading) - self.stop_line_offset
    }

    /// Next intersection strictly ahead of `position` along `heading`,
    /// or `None` when the lane leaves the grid first.
    pub fn next_intersection(&self, position: &Position, heading: Heading) -> Option<IntersectionId> {
        let b = self.block_size;
        // Road the vehicle is travelling on.
        let lane_index = (position.lateral(heading) / b).floor() as i64;
        // Coordinate along the direction of travel.
        let along = if heading.is_vertical() { position.y } else { position.x };
        let next = match heading {
            Heading::South | Heading::East => ((along + POSITION_EPSILON) / b - 0.5).floor() as i64 + 1,
            Heading::North | Heading::West => ((along - POSITION_EPSILON) / b - 0.5).ceil() as i64 - 1,
        };
        if heading.is_vertical() {
            self.at(lane_index, next)
        } else {
            self.at(next, lane_index)
        }
    }

    /// Whether `position` lies inside the grid extent grown by `margin`.
    pub fn in_bounds(&self, position: &Position, margin: f64) -> bool {
        let extent = self.grid_size as f64 * self.block_size;
        (-margin..=extent + margin).contains(&position.x) && (-margin..=extent + margin).contains(&position.y)
    }
}
