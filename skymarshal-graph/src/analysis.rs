use crate::types::{ClusterSummary, GraphMetrics, NetworkEdge, NetworkNode, SpiralPosition};
use std::collections::{BTreeMap, HashMap, VecDeque};

const DEFAULT_CLUSTER_PALETTE: [&str; 10] = [
    "#00A8E8", "#10B981", "#F59E0B", "#EC4899", "#6366F1", "#F97316", "#14B8A6", "#8B5CF6",
    "#F43F5E", "#22D3EE",
];

const PAGERANK_DAMPING: f64 = 0.85;
const PAGERANK_MAX_ITER: usize = 100;
const PAGERANK_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Default)]
pub struct NodeMetrics {
    pub cluster_id: Option<String>,
    pub degree_centrality: f64,
    pub betweenness_centrality: f64,
    pub pagerank: f64,
    pub spiral: SpiralPosition,
}

#[derive(Debug, Default)]
pub struct AnalyticsResult {
    pub node_metrics: HashMap<String, NodeMetrics>,
    pub edge_weights: HashMap<(String, String), f64>,
    pub clusters: Vec<ClusterSummary>,
    pub graph_metrics: GraphMetrics,
}

/// Undirected weighted graph over node indexes. All analytics operate on
/// this adjacency form; handles are mapped back at the end.
struct Graph {
    ids: Vec<String>,
    adjacency: Vec<BTreeMap<usize, f64>>,
}

impl Graph {
    fn build(nodes: &[NetworkNode], edges: &[NetworkEdge]) -> Graph {
        let ids: Vec<String> = nodes.iter().map(|node| node.id.clone()).collect();
        let index: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let mut adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); ids.len()];
        for edge in edges {
            let (Some(&u), Some(&v)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) else {
                continue;
            };
            if u == v {
                continue;
            }
            let weight = edge.weight.unwrap_or(1.0);
            adjacency[u].insert(v, weight);
            adjacency[v].insert(u, weight);
        }
        Graph { ids, adjacency }
    }

    fn node_count(&self) -> usize {
        self.ids.len()
    }

    fn degree(&self, u: usize) -> usize {
        self.adjacency[u].len()
    }

    fn edges(&self) -> Vec<(usize, usize, f64)> {
        let mut list = Vec::new();
        for (u, neighbors) in self.adjacency.iter().enumerate() {
            for (&v, &w) in neighbors {
                if u < v {
                    list.push((u, v, w));
                }
            }
        }
        list
    }

    fn total_weight(&self) -> f64 {
        self.edges().iter().map(|(_, _, w)| w).sum()
    }

    fn weighted_degree(&self, u: usize) -> f64 {
        self.adjacency[u].values().sum()
    }
}

/// Community detection, centrality, and layout for a fetched network.
/// Every pass is deterministic: nodes are visited in index order and ties
/// break on node id.
pub struct GraphAnalytics {
    palette: Vec<String>,
}

impl Default for GraphAnalytics {
    fn default() -> Self {
        GraphAnalytics {
            palette: DEFAULT_CLUSTER_PALETTE
                .iter()
                .map(|color| color.to_string())
                .collect(),
        }
    }
}

impl GraphAnalytics {
    pub fn new(palette: Vec<String>) -> Self {
        GraphAnalytics { palette }
    }

    pub fn analyse(&self, nodes: &[NetworkNode], edges: &[NetworkEdge]) -> AnalyticsResult {
        let mut graph = Graph::build(nodes, edges);
        let n = graph.node_count();
        if n == 0 {
            return AnalyticsResult::default();
        }

        let degree_centrality: Vec<f64> = (0..n)
            .map(|u| {
                if n > 1 {
                    graph.degree(u) as f64 / (n - 1) as f64
                } else {
                    0.0
                }
            })
            .collect();

        // Edge weights are written back into the graph before PageRank so
        // centrality sees the common-neighbor structure.
        let mut edge_weights: HashMap<(String, String), f64> = HashMap::new();
        for (u, v, _) in graph.edges() {
            let common = common_neighbor_count(&graph, u, v);
            let (du, dv) = (graph.degree(u) as f64, graph.degree(v) as f64);
            let mut weight = 1.0 + common as f64;
            if du.max(dv) > 0.0 {
                weight += du.min(dv) / du.max(dv);
            }
            graph.adjacency[u].insert(v, weight);
            graph.adjacency[v].insert(u, weight);
            edge_weights.insert((graph.ids[u].clone(), graph.ids[v].clone()), weight);
        }

        let pagerank = pagerank(&graph);
        let betweenness = betweenness_centrality(&graph);

        let clusters = if n < 3 {
            (0..n).map(|u| vec![u]).collect::<Vec<_>>()
        } else {
            let communities = louvain_communities(&graph);
            let q = modularity(&graph, &communities);
            if q.is_finite() {
                communities
            } else {
                greedy_modularity_communities(&graph)
            }
        };
        let clusters = normalize_clusters(&graph, clusters);

        let mut cluster_assignment: HashMap<usize, String> = HashMap::new();
        for (index, cluster) in clusters.iter().enumerate() {
            for &node in cluster {
                cluster_assignment.insert(node, format!("cluster-{index}"));
            }
        }

        let spiral = spiral_positions(&graph, &clusters, &pagerank);

        let mut node_metrics: HashMap<String, NodeMetrics> = HashMap::new();
        for u in 0..n {
            node_metrics.insert(
                graph.ids[u].clone(),
                NodeMetrics {
                    cluster_id: cluster_assignment.get(&u).cloned(),
                    degree_centrality: degree_centrality[u],
                    betweenness_centrality: betweenness[u],
                    pagerank: pagerank[u],
                    spiral: spiral.get(&u).cloned().unwrap_or_default(),
                },
            );
        }

        let graph_metrics = self.summarise_graph(&graph, &clusters, &degree_centrality, &pagerank);
        let cluster_summaries = self.summarise_clusters(&graph, &clusters, &node_metrics);

        AnalyticsResult {
            node_metrics,
            edge_weights,
            clusters: cluster_summaries,
            graph_metrics,
        }
    }

    fn summarise_graph(
        &self,
        graph: &Graph,
        clusters: &[Vec<usize>],
        degree_centrality: &[f64],
        pagerank: &[f64],
    ) -> GraphMetrics {
        let n = graph.node_count();
        let m = graph.edges().len();
        let density = if n > 1 {
            2.0 * m as f64 / (n as f64 * (n - 1) as f64)
        } else {
            0.0
        };

        let mut top_degree: Vec<(String, f64)> = graph
            .ids
            .iter()
            .cloned()
            .zip(degree_centrality.iter().copied())
            .collect();
        top_degree.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_degree.truncate(5);

        let mut top_pagerank: Vec<(String, f64)> = graph
            .ids
            .iter()
            .cloned()
            .zip(pagerank.iter().copied())
            .collect();
        top_pagerank.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_pagerank.truncate(5);

        let q = modularity(graph, clusters);
        GraphMetrics {
            density,
            average_clustering: average_clustering(graph),
            modularity: q.is_finite().then_some(q),
            top_degree,
            top_pagerank,
            cluster_count: clusters.len(),
        }
    }

    fn summarise_clusters(
        &self,
        graph: &Graph,
        clusters: &[Vec<usize>],
        node_metrics: &HashMap<String, NodeMetrics>,
    ) -> Vec<ClusterSummary> {
        let palette_size = self.palette.len();
        clusters
            .iter()
            .enumerate()
            .filter(|(_, cluster)| !cluster.is_empty())
            .map(|(index, cluster)| {
                let metrics: Vec<&NodeMetrics> = cluster
                    .iter()
                    .filter_map(|&node| node_metrics.get(&graph.ids[node]))
                    .collect();
                let centrality_sum: f64 = metrics.iter().map(|m| m.degree_centrality).sum();
                let radius = metrics
                    .iter()
                    .map(|m| m.spiral.spiral_radius)
                    .fold(0.0, f64::max);
                ClusterSummary {
                    id: format!("cluster-{index}"),
                    size: cluster.len(),
                    color: if palette_size > 0 {
                        self.palette[index % palette_size].clone()
                    } else {
                        "#94a3b8".to_string()
                    },
                    approximate_radius: radius,
                    average_degree_centrality: if metrics.is_empty() {
                        0.0
                    } else {
                        centrality_sum / metrics.len() as f64
                    },
                }
            })
            .collect()
    }
}

fn common_neighbor_count(graph: &Graph, u: usize, v: usize) -> usize {
    graph.adjacency[u]
        .keys()
        .filter(|candidate| **candidate != v && graph.adjacency[v].contains_key(candidate))
        .count()
}

/// Power-iteration PageRank over the weighted graph. Isolated nodes behave
/// as dangling mass spread uniformly.
fn pagerank(graph: &Graph) -> Vec<f64> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }
    let mut rank = vec![1.0 / n as f64; n];
    let weighted_degrees: Vec<f64> = (0..n).map(|u| graph.weighted_degree(u)).collect();

    for _ in 0..PAGERANK_MAX_ITER {
        let dangling: f64 = (0..n)
            .filter(|&u| weighted_degrees[u] == 0.0)
            .map(|u| rank[u])
            .sum();
        let mut next = vec![(1.0 - PAGERANK_DAMPING) / n as f64; n];
        let shared = PAGERANK_DAMPING * dangling / n as f64;
        for value in next.iter_mut() {
            *value += shared;
        }
        for u in 0..n {
            if weighted_degrees[u] == 0.0 {
                continue;
            }
            let share = PAGERANK_DAMPING * rank[u] / weighted_degrees[u];
            for (&v, &w) in &graph.adjacency[u] {
                next[v] += share * w;
            }
        }
        let delta: f64 = rank
            .iter()
            .zip(next.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        rank = next;
        if delta < PAGERANK_TOLERANCE {
            break;
        }
    }
    rank
}

/// Brandes betweenness centrality (unweighted shortest paths), normalized
/// for an undirected graph.
fn betweenness_centrality(graph: &Graph) -> Vec<f64> {
    let n = graph.node_count();
    let mut centrality = vec![0.0; n];
    for source in 0..n {
        let mut stack: Vec<usize> = Vec::new();
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut distance = vec![-1i64; n];
        sigma[source] = 1.0;
        distance[source] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(source);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in graph.adjacency[v].keys() {
                if distance[w] < 0 {
                    distance[w] = distance[v] + 1;
                    queue.push_back(w);
                }
                if distance[w] == distance[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                centrality[w] += delta[w];
            }
        }
    }
    if n > 2 {
        // Each pair counted twice in an undirected traversal.
        let scale = 1.0 / ((n - 1) as f64 * (n - 2) as f64);
        for value in centrality.iter_mut() {
            *value *= scale;
        }
    }
    centrality
}

/// Onnela-style weighted clustering coefficient, averaged over all nodes.
fn average_clustering(graph: &Graph) -> f64 {
    let n = graph.node_count();
    if n == 0 {
        return 0.0;
    }
    let max_weight = graph
        .edges()
        .iter()
        .map(|(_, _, w)| *w)
        .fold(0.0, f64::max);
    if max_weight == 0.0 {
        return 0.0;
    }
    let mut total = 0.0;
    for u in 0..n {
        let neighbors: Vec<usize> = graph.adjacency[u].keys().copied().collect();
        let degree = neighbors.len();
        if degree < 2 {
            continue;
        }
        let mut triangles = 0.0;
        for (a, &v) in neighbors.iter().enumerate() {
            for &w in neighbors.iter().skip(a + 1) {
                if let Some(&vw) = graph.adjacency[v].get(&w) {
                    let uv = graph.adjacency[u][&v] / max_weight;
                    let uw = graph.adjacency[u][&w] / max_weight;
                    triangles += (uv * uw * (vw / max_weight)).cbrt();
                }
            }
        }
        total += 2.0 * triangles / (degree as f64 * (degree - 1) as f64);
    }
    total / n as f64
}

/// Weighted modularity of a partition.
fn modularity(graph: &Graph, clusters: &[Vec<usize>]) -> f64 {
    let m = graph.total_weight();
    if m == 0.0 {
        return f64::NAN;
    }
    let mut assignment = vec![usize::MAX; graph.node_count()];
    for (index, cluster) in clusters.iter().enumerate() {
        for &node in cluster {
            assignment[node] = index;
        }
    }
    let mut internal = vec![0.0; clusters.len()];
    let mut totals = vec![0.0; clusters.len()];
    for (u, v, w) in graph.edges() {
        if assignment[u] == assignment[v] {
            internal[assignment[u]] += w;
        }
    }
    for u in 0..graph.node_count() {
        if assignment[u] != usize::MAX {
            totals[assignment[u]] += graph.weighted_degree(u);
        }
    }
    (0..clusters.len())
        .map(|c| internal[c] / m - (totals[c] / (2.0 * m)).powi(2))
        .sum()
}

/// Deterministic Louvain: local moving in node-index order, then graph
/// aggregation, repeated until modularity stops improving.
fn louvain_communities(graph: &Graph) -> Vec<Vec<usize>> {
    let n = graph.node_count();
    // membership[i] = community of original node i
    let mut membership: Vec<usize> = (0..n).collect();
    let mut adjacency: Vec<BTreeMap<usize, f64>> = graph.adjacency.clone();
    let mut node_to_original: Vec<Vec<usize>> = (0..n).map(|u| vec![u]).collect();

    loop {
        let level_n = adjacency.len();
        let m2: f64 = adjacency
            .iter()
            .enumerate()
            .map(|(u, neighbors)| {
                neighbors
                    .iter()
                    .map(|(&v, &w)| if u == v { 2.0 * w } else { w })
                    .sum::<f64>()
            })
            .sum();
        if m2 == 0.0 {
            break;
        }

        let mut community: Vec<usize> = (0..level_n).collect();
        let weighted_degree: Vec<f64> = (0..level_n)
            .map(|u| {
                adjacency[u]
                    .iter()
                    .map(|(&v, &w)| if u == v { 2.0 * w } else { w })
                    .sum()
            })
            .collect();
        let mut community_total: Vec<f64> = weighted_degree.clone();

        let mut moved_any = false;
        loop {
            let mut moved = false;
            for u in 0..level_n {
                let current = community[u];
                community_total[current] -= weighted_degree[u];

                // Weight from u into each neighboring community.
                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for (&v, &w) in &adjacency[u] {
                    if v != u {
                        *links.entry(community[v]).or_default() += w;
                    }
                }

                let mut best = current;
                let mut best_gain = links.get(&current).copied().unwrap_or(0.0)
                    - community_total[current] * weighted_degree[u] / m2;
                for (&candidate, &link) in &links {
                    let gain = link - community_total[candidate] * weighted_degree[u] / m2;
                    if gain > best_gain + 1e-12 {
                        best = candidate;
                        best_gain = gain;
                    }
                }

                community_total[best] += weighted_degree[u];
                if best != current {
                    community[u] = best;
                    moved = true;
                    moved_any = true;
                }
            }
            if !moved {
                break;
            }
        }

        if !moved_any {
            break;
        }

        // Renumber communities densely.
        let mut renumber: HashMap<usize, usize> = HashMap::new();
        for &c in &community {
            let next = renumber.len();
            renumber.entry(c).or_insert(next);
        }
        let community: Vec<usize> = community.iter().map(|c| renumber[c]).collect();
        let new_n = renumber.len();
        if new_n == level_n {
            break;
        }

        // Update membership of original nodes and aggregate the graph.
        let mut new_node_to_original: Vec<Vec<usize>> = vec![Vec::new(); new_n];
        for (node, originals) in node_to_original.iter().enumerate() {
            new_node_to_original[community[node]].extend(originals.iter().copied());
        }
        for (new_community, originals) in new_node_to_original.iter().enumerate() {
            for &original in originals {
                membership[original] = new_community;
            }
        }

        let mut new_adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); new_n];
        for (u, neighbors) in adjacency.iter().enumerate() {
            for (&v, &w) in neighbors {
                if u <= v {
                    let (cu, cv) = (community[u], community[v]);
                    let entry = new_adjacency[cu].entry(cv).or_default();
                    *entry += w;
                    if cu != cv {
                        *new_adjacency[cv].entry(cu).or_default() += w;
                    }
                }
            }
        }
        adjacency = new_adjacency;
        node_to_original = new_node_to_original;
    }

    let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (node, &community) in membership.iter().enumerate() {
        clusters.entry(community).or_default().push(node);
    }
    clusters.into_values().collect()
}

/// Greedy modularity maximization: merge connected community pairs while a
/// positive gain exists. Fallback when Louvain degenerates.
fn greedy_modularity_communities(graph: &Graph) -> Vec<Vec<usize>> {
    let n = graph.node_count();
    let mut clusters: Vec<Vec<usize>> = (0..n).map(|u| vec![u]).collect();
    loop {
        let current = modularity(graph, &clusters);
        if !current.is_finite() {
            break;
        }
        let mut best: Option<(f64, usize, usize)> = None;
        for a in 0..clusters.len() {
            for b in (a + 1)..clusters.len() {
                let connected = clusters[a].iter().any(|&u| {
                    clusters[b]
                        .iter()
                        .any(|&v| graph.adjacency[u].contains_key(&v))
                });
                if !connected {
                    continue;
                }
                let mut merged = clusters.clone();
                let mut moved = merged.remove(b);
                merged[a].append(&mut moved);
                let gain = modularity(graph, &merged) - current;
                if gain > best.map(|(g, _, _)| g).unwrap_or(1e-12) {
                    best = Some((gain, a, b));
                }
            }
        }
        match best {
            Some((_, a, b)) => {
                let mut moved = clusters.remove(b);
                clusters[a].append(&mut moved);
            }
            None => break,
        }
    }
    clusters
}

/// Stable cluster ordering: size descending, then smallest member id.
fn normalize_clusters(graph: &Graph, mut clusters: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    for cluster in clusters.iter_mut() {
        cluster.sort_by(|a, b| graph.ids[*a].cmp(&graph.ids[*b]));
    }
    clusters.retain(|cluster| !cluster.is_empty());
    clusters.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| graph.ids[a[0]].cmp(&graph.ids[b[0]]))
    });
    clusters
}

/// Clusters on a global circle, members spiraling outwards in PageRank
/// order.
fn spiral_positions(
    graph: &Graph,
    clusters: &[Vec<usize>],
    pagerank: &[f64],
) -> HashMap<usize, SpiralPosition> {
    let mut positions = HashMap::new();
    if clusters.is_empty() {
        return positions;
    }
    let total = clusters.len().max(1) as f64;
    let base_radius = 120.0;
    let radial_increment = 14.0;
    let angular_step = 0.45;

    for (index, cluster) in clusters.iter().enumerate() {
        let offset = 2.0 * std::f64::consts::PI * index as f64 / total;
        let mut ranked: Vec<usize> = cluster.clone();
        ranked.sort_by(|a, b| {
            pagerank[*b]
                .total_cmp(&pagerank[*a])
                .then_with(|| graph.ids[*a].cmp(&graph.ids[*b]))
        });
        for (rank, node) in ranked.into_iter().enumerate() {
            let radius = base_radius + index as f64 * 40.0 + rank as f64 * radial_increment;
            let theta = offset + rank as f64 * angular_step;
            positions.insert(
                node,
                SpiralPosition {
                    spiral_radius: radius,
                    spiral_theta: theta,
                    spiral_x: radius * theta.cos(),
                    spiral_y: radius * theta.sin(),
                },
            );
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeType, Relationship};

    fn node(id: &str) -> NetworkNode {
        NetworkNode {
            id: id.to_string(),
            handle: id.to_string(),
            name: id.to_string(),
            avatar: None,
            followers_count: 0,
            follows_count: 0,
            is_target: false,
            relationship: Relationship::Indirect,
            you_follow: false,
            follows_you: false,
            mutual_connections: 0,
            orbit_connections: 0,
            tier: 2,
            x: 0.0,
            y: 0.0,
            cluster_id: None,
            pagerank: 0.0,
            degree_centrality: 0.0,
            betweenness_centrality: 0.0,
            spiral: None,
        }
    }

    fn edge(source: &str, target: &str) -> NetworkEdge {
        NetworkEdge {
            source: source.to_string(),
            target: target.to_string(),
            edge_type: EdgeType::Follows,
            weight: None,
        }
    }

    /// Two triangles joined by a single bridge edge.
    fn two_triangles() -> (Vec<NetworkNode>, Vec<NetworkEdge>) {
        let nodes = ["a", "b", "c", "x", "y", "z"].map(node).to_vec();
        let edges = vec![
            edge("a", "b"),
            edge("b", "c"),
            edge("c", "a"),
            edge("x", "y"),
            edge("y", "z"),
            edge("z", "x"),
            edge("c", "x"),
        ];
        (nodes, edges)
    }

    #[test]
    fn test_empty_graph() {
        let result = GraphAnalytics::default().analyse(&[], &[]);
        assert!(result.node_metrics.is_empty());
        assert_eq!(result.graph_metrics.cluster_count, 0);
    }

    #[test]
    fn test_two_triangles_form_two_clusters() {
        let (nodes, edges) = two_triangles();
        let result = GraphAnalytics::default().analyse(&nodes, &edges);
        assert_eq!(result.graph_metrics.cluster_count, 2);
        let a = result.node_metrics["a"].cluster_id.clone();
        let b = result.node_metrics["b"].cluster_id.clone();
        let x = result.node_metrics["x"].cluster_id.clone();
        assert_eq!(a, b);
        assert_ne!(a, x);
        let q = result.graph_metrics.modularity.unwrap();
        assert!(q > 0.2, "expected positive modularity, got {q}");
    }

    #[test]
    fn test_bridge_nodes_have_highest_betweenness() {
        let (nodes, edges) = two_triangles();
        let result = GraphAnalytics::default().analyse(&nodes, &edges);
        let bridge_c = result.node_metrics["c"].betweenness_centrality;
        let bridge_x = result.node_metrics["x"].betweenness_centrality;
        let leaf_a = result.node_metrics["a"].betweenness_centrality;
        assert!(bridge_c > leaf_a);
        assert!(bridge_x > leaf_a);
    }

    #[test]
    fn test_edge_weight_formula() {
        // a-b, b-c, c-a triangle: every pair shares one common neighbor and
        // equal degrees, so each edge weighs 1 + 1 + 1 = 3.
        let nodes = ["a", "b", "c"].map(node).to_vec();
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "a")];
        let result = GraphAnalytics::default().analyse(&nodes, &edges);
        for weight in result.edge_weights.values() {
            assert!((weight - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_pagerank_sums_to_one_and_favors_hub() {
        let nodes = ["hub", "s1", "s2", "s3"].map(node).to_vec();
        let edges = vec![edge("hub", "s1"), edge("hub", "s2"), edge("hub", "s3")];
        let result = GraphAnalytics::default().analyse(&nodes, &edges);
        let total: f64 = result.node_metrics.values().map(|m| m.pagerank).sum();
        assert!((total - 1.0).abs() < 1e-3);
        assert!(
            result.node_metrics["hub"].pagerank > result.node_metrics["s1"].pagerank,
            "hub should outrank its spokes"
        );
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let (nodes, edges) = two_triangles();
        let analytics = GraphAnalytics::default();
        let first = analytics.analyse(&nodes, &edges);
        let second = analytics.analyse(&nodes, &edges);
        for (id, metrics) in &first.node_metrics {
            let other = &second.node_metrics[id];
            assert_eq!(metrics.cluster_id, other.cluster_id);
            assert_eq!(metrics.pagerank, other.pagerank);
            assert_eq!(metrics.spiral.spiral_x, other.spiral.spiral_x);
        }
    }

    #[test]
    fn test_small_graph_uses_singletons() {
        let nodes = ["a", "b"].map(node).to_vec();
        let edges = vec![edge("a", "b")];
        let result = GraphAnalytics::default().analyse(&nodes, &edges);
        assert_eq!(result.graph_metrics.cluster_count, 2);
    }

    #[test]
    fn test_density() {
        let nodes = ["a", "b", "c"].map(node).to_vec();
        let edges = vec![edge("a", "b")];
        let result = GraphAnalytics::default().analyse(&nodes, &edges);
        assert!((result.graph_metrics.density - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_cluster_summaries_have_palette_colors() {
        let (nodes, edges) = two_triangles();
        let result = GraphAnalytics::default().analyse(&nodes, &edges);
        assert_eq!(result.clusters.len(), 2);
        assert_eq!(result.clusters[0].color, "#00A8E8");
        assert_eq!(result.clusters[1].color, "#10B981");
        assert_eq!(result.clusters[0].size, 3);
    }
}
