//! Read-only graph input for the layout.

use std::collections::HashSet;

use petgraph::stable_graph::{IndexType, StableGraph};
use petgraph::EdgeType;
use serde::{Deserialize, Serialize};

/// A directed link between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A node as seen by the layout: an id and an optional mass weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    /// Body mass; `None` means unit mass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            weight: None,
        }
    }
}

/// Anything the layout can read nodes and links from.
///
/// The engine reads a source exactly once, in [`LayoutEngine::init`]. Node order
/// determines the seed positions, so a source should yield nodes in a stable
/// order.
///
/// [`LayoutEngine::init`]: crate::LayoutEngine::init
pub trait GraphSource {
    fn nodes(&self) -> Vec<GraphNode>;

    fn links(&self) -> Vec<Link>;
}

/// In-memory graph document, also the JSON input format of the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: impl Into<String>) -> &mut Self {
        self.nodes.push(GraphNode::new(id));
        self
    }

    pub fn add_weighted_node(&mut self, id: impl Into<String>, weight: f64) -> &mut Self {
        self.nodes.push(GraphNode {
            id: id.into(),
            weight: Some(weight),
        });
        self
    }

    pub fn add_link(&mut self, source: impl Into<String>, target: impl Into<String>) -> &mut Self {
        self.links.push(Link::new(source, target));
        self
    }

    /// Builds a graph from an edge list; nodes are created in first-seen order.
    pub fn from_edges<I, S>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut graph = Self::new();
        let mut seen = HashSet::new();
        for (source, target) in edges {
            let (source, target) = (source.into(), target.into());
            for id in [&source, &target] {
                if seen.insert(id.clone()) {
                    graph.nodes.push(GraphNode::new(id.clone()));
                }
            }
            graph.links.push(Link { source, target });
        }
        graph
    }
}

impl GraphSource for Graph {
    fn nodes(&self) -> Vec<GraphNode> {
        self.nodes.clone()
    }

    fn links(&self) -> Vec<Link> {
        self.links.clone()
    }
}

/// Node indices become ids; node and edge weights are ignored.
impl<N, E, Ty: EdgeType, Ix: IndexType> GraphSource for StableGraph<N, E, Ty, Ix> {
    fn nodes(&self) -> Vec<GraphNode> {
        self.node_indices()
            .map(|idx| GraphNode::new(idx.index().to_string()))
            .collect()
    }

    fn links(&self) -> Vec<Link> {
        self.edge_indices()
            .filter_map(|edge| self.edge_endpoints(edge))
            .map(|(a, b)| Link::new(a.index().to_string(), b.index().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::stable_graph::StableDiGraph;

    #[test]
    fn test_from_edges_first_seen_order() {
        let graph = Graph::from_edges([("b", "a"), ("a", "c")]);
        let ids: Vec<_> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(graph.links.len(), 2);
    }

    #[test]
    fn test_json_document() {
        let json = r#"{
            "nodes": [{"id": "x"}, {"id": "y", "weight": 2.5}],
            "links": [{"source": "x", "target": "y"}]
        }"#;
        let graph: Graph = serde_json::from_str(json).unwrap();
        assert_eq!(graph.nodes[1].weight, Some(2.5));
        assert_eq!(graph.links[0], Link::new("x", "y"));
    }

    #[test]
    fn test_stable_graph_source() {
        let mut g: StableDiGraph<&str, ()> = StableDiGraph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        let c = g.add_node("c");
        g.add_edge(a, b, ());
        g.add_edge(b, c, ());
        g.remove_node(a);

        let ids: Vec<_> = GraphSource::nodes(&g).into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(GraphSource::links(&g), vec![Link::new("1", "2")]);
    }
}
