use skymarshal_lexicon::app::bsky::actor::{ProfileView, ProfileViewDetailed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    Fast,
    Balanced,
    Detailed,
}

impl std::str::FromStr for FetchMode {
    type Err = skymarshal_common::error::SkymarshalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "fast" => Ok(FetchMode::Fast),
            "balanced" => Ok(FetchMode::Balanced),
            "detailed" => Ok(FetchMode::Detailed),
            other => Err(skymarshal_common::error::SkymarshalError::Validation(
                format!("'{other}' is not a fetch mode (fast|balanced|detailed)"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Target,
    Mutual,
    Following,
    Follower,
    Indirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Follows,
    OrbitConnection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpiralPosition {
    pub spiral_radius: f64,
    pub spiral_theta: f64,
    pub spiral_x: f64,
    pub spiral_y: f64,
}

/// One actor in the fetched network, identified by handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    pub handle: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub followers_count: i64,
    pub follows_count: i64,
    pub is_target: bool,
    pub relationship: Relationship,
    pub you_follow: bool,
    pub follows_you: bool,
    pub mutual_connections: usize,
    pub orbit_connections: usize,
    pub tier: u8,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    pub pagerank: f64,
    pub degree_centrality: f64,
    pub betweenness_centrality: f64,
    #[serde(flatten)]
    pub spiral: Option<SpiralPosition>,
}

impl NetworkNode {
    pub fn from_profile_view(view: &ProfileView, is_target: bool) -> Self {
        NetworkNode {
            id: view.handle.clone(),
            handle: view.handle.clone(),
            name: view
                .display_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| view.handle.clone()),
            avatar: view.avatar.clone(),
            followers_count: 0,
            follows_count: 0,
            is_target,
            relationship: if is_target {
                Relationship::Target
            } else {
                Relationship::Indirect
            },
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

    pub fn from_detailed(view: &ProfileViewDetailed, is_target: bool) -> Self {
        let mut node = NetworkNode::from_profile_view(
            &ProfileView {
                did: view.did.clone(),
                handle: view.handle.clone(),
                display_name: view.display_name.clone(),
                description: view.description.clone(),
                avatar: view.avatar.clone(),
            },
            is_target,
        );
        node.followers_count = view.followers_count.unwrap_or(0) as i64;
        node.follows_count = view.follows_count.unwrap_or(0) as i64;
        node
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrengthDistribution {
    pub strong: f64,
    pub medium: f64,
    pub weak: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopInterconnected {
    pub handle: String,
    pub name: String,
    pub mutual_connections: usize,
    pub orbit_connections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub id: String,
    pub size: usize,
    pub color: String,
    pub approximate_radius: f64,
    pub average_degree_centrality: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub density: f64,
    pub average_clustering: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modularity: Option<f64>,
    pub top_degree: Vec<(String, f64)>,
    pub top_pagerank: Vec<(String, f64)>,
    pub cluster_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetadata {
    pub target_handle: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub orbit_edge_count: usize,
    pub follow_edge_count: usize,
    pub orbit_strength_distribution: StrengthDistribution,
    pub top_interconnected: Vec<TopInterconnected>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clusters: Vec<ClusterSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_metrics: Option<GraphMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
    pub metadata: NetworkMetadata,
}
