// Result graph construction.
//
// Built exactly once, after enumeration finishes or is canceled, from
// whatever findings exist at that point. The target host is the root;
// every unique path prefix becomes a directory node, every finding a leaf.
// Synthesized intermediate directories carry no status.

use dirgraph_scanner::Finding;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSummary {
    pub total_findings: usize,
    pub ok_200: usize,
    pub auth_401: usize,
    pub forbidden_403: usize,
    pub redirects_30x: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub summary: GraphSummary,
}

const ROOT_ID: &str = "/";

/// Project the finding set into a site graph rooted at the target host.
pub fn build_graph(findings: &[Finding], target: &Url) -> SiteGraph {
    let mut graph: DiGraph<GraphNode, ()> = DiGraph::new();
    let mut by_id: HashMap<String, NodeIndex> = HashMap::new();

    let root = graph.add_node(GraphNode {
        id: ROOT_ID.to_string(),
        label: target.host_str().unwrap_or("target").to_string(),
        url: Some(target.to_string()),
        status: None,
        note: None,
        issues: Vec::new(),
    });
    by_id.insert(ROOT_ID.to_string(), root);

    // Sorted pass keeps node and edge order deterministic regardless of
    // completion order during enumeration.
    let mut ordered: Vec<&Finding> = findings.iter().collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));

    for finding in ordered {
        let segments: Vec<&str> = finding
            .path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            continue;
        }

        let mut parent = root;
        let mut prefix = String::new();
        for (depth, segment) in segments.iter().enumerate() {
            prefix.push('/');
            prefix.push_str(segment);
            let is_leaf = depth == segments.len() - 1;

            let node = match by_id.get(&prefix) {
                Some(&idx) => idx,
                None => {
                    let idx = graph.add_node(GraphNode {
                        id: prefix.clone(),
                        label: segment.to_string(),
                        url: None,
                        status: None,
                        note: None,
                        issues: Vec::new(),
                    });
                    by_id.insert(prefix.clone(), idx);
                    graph.add_edge(parent, idx, ());
                    idx
                }
            };

            if is_leaf && let Some(weight) = graph.node_weight_mut(node) {
                weight.url = Some(finding.url.clone());
                weight.status = Some(finding.status);
                weight.note = finding.note.clone();
                weight.issues = finding.issues.clone();
            }

            parent = node;
        }
    }

    let nodes: Vec<GraphNode> = graph.node_weights().cloned().collect();
    let edges: Vec<GraphEdge> = graph
        .edge_indices()
        .filter_map(|e| graph.edge_endpoints(e))
        .map(|(source, target)| {
            let source = graph[source].id.clone();
            let target = graph[target].id.clone();
            GraphEdge {
                id: format!("{}->{}", source, target),
                source,
                target,
            }
        })
        .collect();

    SiteGraph {
        nodes,
        edges,
        summary: summarize(findings),
    }
}

fn summarize(findings: &[Finding]) -> GraphSummary {
    GraphSummary {
        total_findings: findings.len(),
        ok_200: findings.iter().filter(|f| f.status == 200).count(),
        auth_401: findings.iter().filter(|f| f.status == 401).count(),
        forbidden_403: findings.iter().filter(|f| f.status == 403).count(),
        redirects_30x: findings
            .iter()
            .filter(|f| (300..400).contains(&f.status))
            .count(),
    }
}
