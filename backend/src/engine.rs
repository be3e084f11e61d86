use std::{
    collections::{HashMap, HashSet},
    io::{self, Read},
    path::Path,
};

use async_trait::async_trait;
use kdtree::distance::squared_euclidean;
use kdtree::KdTree;
use petgraph::{
    algo::astar,
    graph::{NodeIndex, UnGraph},
    visit::EdgeRef,
};

use crate::{
    geo::{bearing, compass_point, haversine_km, heading_change},
    graph::{GraphFile, SurfaceType},
    models::{Coordinate, RouteCandidate, TravelProfile, TurnInstruction},
    oracle::{OracleError, RouteOracle},
};

const MAX_SNAP_DISTANCE_KM: f64 = 20.0;
const REUSED_EDGE_PENALTY: f64 = 10.0;
const FOOT_SPEED_KMH: f64 = 5.0;
const HIKE_SPEED_KMH: f64 = 4.0;

const STRAIGHT_LIMIT_DEG: f64 = 20.0;
const KEEP_LIMIT_DEG: f64 = 45.0;
const TURN_LIMIT_DEG: f64 = 150.0;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to read graph file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid graph definition: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("graph is empty")]
    EmptyGraph,
    #[error("edge references unknown node {0}")]
    MissingNode(u64),
}

/// In-process routing oracle over a walkable graph.
///
/// # Algorithm
/// Every waypoint is snapped to its nearest graph node through a KD-tree,
/// then consecutive waypoints are joined with A*. Edges already walked by an
/// earlier leg cost ×10 so a loop's return leg prefers fresh ground; edges
/// touching the first waypoint stay cheap so the loop can still close.
///
/// ## Edge cost
/// ```text
/// cost = length_km × surface_preference(profile, surface)
/// ```
/// `Foot` prefers paved surfaces, `Hike` prefers trails. Preferences are
/// ≥ 1 so the haversine heuristic stays admissible.
#[derive(Clone)]
pub struct RouteEngine {
    graph: UnGraph<NodeData, EdgeData>,
    nodes: Vec<NodeData>,
    /// Spatial index for O(log N) nearest node lookup
    spatial_index: KdTree<f64, usize, [f64; 2]>,
}

#[derive(Clone, Debug)]
struct NodeData {
    coord: Coordinate,
}

#[derive(Clone, Debug)]
struct EdgeData {
    length_km: f64,
    surface: SurfaceType,
    name: Option<String>,
}

/// One edge of a planned route, in walking direction.
struct Segment<'a> {
    bearing_deg: f64,
    length_m: f64,
    name: Option<&'a str>,
}

impl RouteEngine {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let graph_file = GraphFile::read_from_path(path)?;
        Self::from_graph_file(graph_file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, EngineError> {
        let graph_file: GraphFile = serde_json::from_reader(reader)?;
        Self::from_graph_file(graph_file)
    }

    pub fn from_graph_file(graph_file: GraphFile) -> Result<Self, EngineError> {
        if graph_file.nodes.is_empty() {
            return Err(EngineError::EmptyGraph);
        }
        let mut graph = UnGraph::new_undirected();
        let mut id_to_index = HashMap::new();
        let mut nodes = Vec::with_capacity(graph_file.nodes.len());

        for node in graph_file.nodes {
            let node_data = NodeData {
                coord: Coordinate::new(node.lat, node.lon),
            };
            let idx = graph.add_node(node_data.clone());
            id_to_index.insert(node.id, idx);
            nodes.push(node_data);
        }

        for edge in graph_file.edges {
            let from = *id_to_index
                .get(&edge.from)
                .ok_or(EngineError::MissingNode(edge.from))?;
            let to = *id_to_index
                .get(&edge.to)
                .ok_or(EngineError::MissingNode(edge.to))?;
            let data = EdgeData {
                length_km: edge.length_m / 1000.0,
                surface: edge.surface,
                name: edge.name,
            };
            graph.update_edge(from, to, data);
        }

        let spatial_index = Self::build_spatial_index(&nodes);
        tracing::debug!(
            "routing graph ready: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(Self {
            graph,
            nodes,
            spatial_index,
        })
    }

    fn build_spatial_index(nodes: &[NodeData]) -> KdTree<f64, usize, [f64; 2]> {
        let mut tree = KdTree::new(2);
        for (idx, node) in nodes.iter().enumerate() {
            // Store as [lon, lat] for geographic coordinates
            let _ = tree.add([node.coord.lon, node.coord.lat], idx);
        }
        tree
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nearest graph node, or `None` when nothing lies within 20 km.
    pub fn closest_node(&self, target: Coordinate) -> Option<NodeIndex> {
        let nearest = self
            .spatial_index
            .nearest(&[target.lon, target.lat], 1, &squared_euclidean)
            .ok()?;

        let (_, &idx) = nearest.first()?;
        let distance_km = haversine_km(target, self.nodes[idx].coord);
        (distance_km <= MAX_SNAP_DISTANCE_KM).then(|| NodeIndex::new(idx))
    }

    /// Plan a route visiting `waypoints` in order.
    pub fn plan(
        &self,
        waypoints: &[Coordinate],
        profile: TravelProfile,
    ) -> Result<RouteCandidate, OracleError> {
        if waypoints.len() < 2 {
            return Err(OracleError::Malformed(format!(
                "at least two waypoints are required, got {}",
                waypoints.len()
            )));
        }

        let snapped = waypoints
            .iter()
            .map(|waypoint| {
                self.closest_node(*waypoint).ok_or_else(|| {
                    OracleError::Unavailable(format!(
                        "no walkable node within {MAX_SNAP_DISTANCE_KM} km of ({:.5}, {:.5})",
                        waypoint.lat, waypoint.lon
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let origin = snapped[0];
        let mut route = vec![origin];
        let mut walked = HashSet::new();
        for leg in snapped.windows(2) {
            if leg[0] == leg[1] {
                continue;
            }
            let path = self
                .find_leg(leg[0], leg[1], profile, &walked, origin)
                .ok_or_else(|| {
                    OracleError::Unavailable("no walkable path between waypoints".to_string())
                })?;
            walked.extend(path.windows(2).map(|pair| (pair[0], pair[1])));
            route.extend_from_slice(&path[1..]);
        }

        if route.len() < 2 {
            return Err(OracleError::Malformed(
                "all waypoints snapped to the same node".to_string(),
            ));
        }

        let segments = self.segments(&route);
        let distance_km = segments.iter().map(|s| s.length_m).sum::<f64>() / 1000.0;
        if distance_km <= 0.0 {
            return Err(OracleError::Malformed("route has zero length".to_string()));
        }

        let speed_kmh = match profile {
            TravelProfile::Foot => FOOT_SPEED_KMH,
            TravelProfile::Hike => HIKE_SPEED_KMH,
        };
        tracing::debug!(
            "planned {:.2}km through {} nodes for {} waypoints",
            distance_km,
            route.len(),
            waypoints.len()
        );

        Ok(RouteCandidate {
            coordinates: route
                .iter()
                .map(|idx| self.nodes[idx.index()].coord)
                .collect(),
            distance_km,
            duration_sec: distance_km / speed_kmh * 3600.0,
            instructions: build_instructions(&segments),
        })
    }

    fn find_leg(
        &self,
        start: NodeIndex,
        end: NodeIndex,
        profile: TravelProfile,
        walked: &HashSet<(NodeIndex, NodeIndex)>,
        origin: NodeIndex,
    ) -> Option<Vec<NodeIndex>> {
        let goal = self.nodes[end.index()].coord;
        let heuristic = |idx: NodeIndex| {
            if idx == end {
                0.0
            } else {
                haversine_km(self.nodes[idx.index()].coord, goal)
            }
        };

        let edge_cost = |edge: petgraph::graph::EdgeReference<EdgeData>| {
            let data = edge.weight();
            let base_cost = data.length_km * surface_preference(profile, data.surface);
            let (from, to) = (edge.source(), edge.target());
            let reused = walked.contains(&(from, to)) || walked.contains(&(to, from));
            let touches_origin = from == origin || to == origin;

            if reused && !touches_origin {
                base_cost * REUSED_EDGE_PENALTY
            } else {
                base_cost
            }
        };

        let (_cost, path) = astar(&self.graph, start, |n| n == end, edge_cost, heuristic)?;
        Some(path)
    }

    fn segments(&self, route: &[NodeIndex]) -> Vec<Segment<'_>> {
        route
            .windows(2)
            .filter_map(|pair| {
                let edge = self.graph.find_edge(pair[0], pair[1])?;
                let data = &self.graph[edge];
                Some(Segment {
                    bearing_deg: bearing(
                        self.nodes[pair[0].index()].coord,
                        self.nodes[pair[1].index()].coord,
                    ),
                    length_m: data.length_km * 1000.0,
                    name: data.name.as_deref(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl RouteOracle for RouteEngine {
    async fn route(
        &self,
        waypoints: &[Coordinate],
        profile: TravelProfile,
    ) -> Result<RouteCandidate, OracleError> {
        self.plan(waypoints, profile)
    }
}

fn surface_preference(profile: TravelProfile, surface: SurfaceType) -> f64 {
    match (profile, surface) {
        (TravelProfile::Foot, SurfaceType::Paved) => 1.0,
        (TravelProfile::Foot, SurfaceType::Trail) => 1.3,
        (TravelProfile::Foot, SurfaceType::Dirt) => 1.5,
        (TravelProfile::Hike, SurfaceType::Paved) => 1.6,
        (TravelProfile::Hike, SurfaceType::Trail) => 1.0,
        (TravelProfile::Hike, SurfaceType::Dirt) => 1.1,
    }
}

/// Maneuver text for a heading change, `None` when the walker goes straight on.
fn maneuver(delta_deg: f64) -> Option<&'static str> {
    let magnitude = delta_deg.abs();
    let right = delta_deg > 0.0;
    if magnitude < STRAIGHT_LIMIT_DEG {
        None
    } else if magnitude < KEEP_LIMIT_DEG {
        Some(if right { "Keep right" } else { "Keep left" })
    } else if magnitude < TURN_LIMIT_DEG {
        Some(if right { "Turn right" } else { "Turn left" })
    } else {
        Some("Make a U-turn")
    }
}

fn build_instructions(segments: &[Segment<'_>]) -> Vec<TurnInstruction> {
    let Some(first) = segments.first() else {
        return Vec::new();
    };

    let mut instructions = Vec::new();
    let mut current = instruction(
        format!("Head {}", compass_point(first.bearing_deg)),
        " on ",
        first.name,
    );
    current.distance_meters = first.length_m;

    for pair in segments.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        let turn = maneuver(heading_change(previous.bearing_deg, next.bearing_deg));
        let renamed = next.name.is_some() && next.name != previous.name;

        if turn.is_some() || renamed {
            let text = turn.unwrap_or("Continue").to_string();
            instructions.push(current);
            current = instruction(text, " onto ", next.name);
        }
        current.distance_meters += next.length_m;
    }

    instructions.push(current);
    instructions.push(TurnInstruction {
        text: "Arrive at destination".to_string(),
        distance_meters: 0.0,
        street_name: None,
    });
    instructions
}

fn instruction(verb: String, joiner: &str, name: Option<&str>) -> TurnInstruction {
    let text = match name {
        Some(name) => format!("{verb}{joiner}{name}"),
        None => verb,
    };
    TurnInstruction {
        text,
        distance_meters: 0.0,
        street_name: name.map(str::to_string),
    }
}
