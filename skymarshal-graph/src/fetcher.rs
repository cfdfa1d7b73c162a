use crate::analysis::GraphAnalytics;
use crate::cache::{ttl_days, ProfileCache};
use crate::types::{
    EdgeType, FetchMode, NetworkEdge, NetworkMetadata, NetworkNode, NetworkSnapshot, Relationship,
    StrengthDistribution, TopInterconnected,
};
use skymarshal_client::XrpcClient;
use skymarshal_common::error::SkymarshalError;
use skymarshal_common::progress::ProgressReporter;
use skymarshal_core::models::Profile;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

pub const DEFAULT_MAX_RELATIONS: usize = 500;
/// Orbit sources considered in balanced mode.
const BALANCED_ORBIT_CAP: usize = 150;
/// Follow pages pulled per orbit source.
const ORBIT_FOLLOWS_LIMIT: usize = 200;
const RING_RADII: [f64; 3] = [200.0, 400.0, 600.0];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOptions {
    pub include_followers: bool,
    pub include_following: bool,
    pub max_followers: Option<usize>,
    pub max_following: Option<usize>,
    pub mode: FetchMode,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            include_followers: true,
            include_following: true,
            max_followers: Some(DEFAULT_MAX_RELATIONS),
            max_following: Some(DEFAULT_MAX_RELATIONS),
            mode: FetchMode::Balanced,
        }
    }
}

struct OrbitState {
    edges: Vec<NetworkEdge>,
    orbit_counts: HashMap<String, usize>,
    completed: usize,
}

/// Multi-stage follower/following/profile fetch producing a
/// [`NetworkSnapshot`]. Profile hydration and orbit expansion run on a
/// bounded worker pool; every worker is joined before the snapshot returns.
pub struct NetworkFetcher {
    client: Arc<XrpcClient>,
    cache: Option<Arc<ProfileCache>>,
    analytics: Option<GraphAnalytics>,
    max_workers: usize,
    profile_ttl_days: i64,
}

impl NetworkFetcher {
    pub fn new(client: Arc<XrpcClient>) -> Self {
        NetworkFetcher {
            client,
            cache: None,
            analytics: None,
            max_workers: 8,
            profile_ttl_days: 14,
        }
    }

    pub fn with_cache(mut self, cache: Arc<ProfileCache>, ttl_days: i64) -> Self {
        self.cache = Some(cache);
        self.profile_ttl_days = ttl_days;
        self
    }

    pub fn with_analytics(mut self, analytics: GraphAnalytics) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn with_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub async fn fetch_network(
        &self,
        handle: &str,
        options: &FetchOptions,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<NetworkSnapshot, SkymarshalError> {
        if !options.include_followers && !options.include_following {
            return Err(SkymarshalError::Validation(
                "at least one of followers or following must be requested".to_string(),
            ));
        }

        // Stage 1: target profile. A missing handle is terminal.
        progress.report("Fetching target profile", 0, 1);
        let target = self.client.get_profile(handle).await?;
        progress.report("Fetching target profile", 1, 1);

        let mut nodes: BTreeMap<String, NetworkNode> = BTreeMap::new();
        nodes.insert(
            handle.to_string(),
            NetworkNode::from_detailed(&target, true),
        );
        let mut edges: Vec<NetworkEdge> = Vec::new();

        // Stage 2: primary relations, followers and follows concurrently.
        progress.report("Fetching followers and following", 0, 1);
        let follows_future = async {
            if options.include_following {
                self.client.get_all_follows(handle, options.max_following).await
            } else {
                Ok(Vec::new())
            }
        };
        let followers_future = async {
            if options.include_followers {
                self.client
                    .get_all_followers(handle, options.max_followers)
                    .await
            } else {
                Ok(Vec::new())
            }
        };
        let (follows_result, followers_result) = tokio::join!(follows_future, followers_future);
        let follows = unwrap_relation(follows_result, "following", handle)?;
        let followers = unwrap_relation(followers_result, "followers", handle)?;
        let total_primary = follows.len() + followers.len();
        progress.report("Fetching followers and following", total_primary, total_primary);

        for profile in &follows {
            if profile.handle == handle {
                continue;
            }
            nodes
                .entry(profile.handle.clone())
                .or_insert_with(|| NetworkNode::from_profile_view(profile, false));
            edges.push(NetworkEdge {
                source: handle.to_string(),
                target: profile.handle.clone(),
                edge_type: EdgeType::Follows,
                weight: None,
            });
        }
        for profile in &followers {
            if profile.handle == handle {
                continue;
            }
            nodes
                .entry(profile.handle.clone())
                .or_insert_with(|| NetworkNode::from_profile_view(profile, false));
            edges.push(NetworkEdge {
                source: profile.handle.clone(),
                target: handle.to_string(),
                edge_type: EdgeType::Follows,
                weight: None,
            });
        }

        // Stage 3: profile hydration through the cache and batched lookups.
        let network_handles: Vec<String> = nodes
            .keys()
            .filter(|node_handle| node_handle.as_str() != handle)
            .cloned()
            .collect();
        self.hydrate_profiles(&mut nodes, &network_handles, progress.as_ref())
            .await?;

        // Stage 4: mutual detection.
        progress.report("Analyzing mutual connections", 0, 1);
        detect_mutuals(&mut nodes, &edges, handle);
        progress.report("Analyzing mutual connections", 1, 1);

        // Stage 5: orbit interconnections.
        if options.mode != FetchMode::Fast {
            self.augment_interconnections(
                &mut nodes,
                &mut edges,
                &network_handles,
                options.mode,
                Arc::clone(&progress),
            )
            .await?;
        }

        // Stages 6 + 7: tiers and ring layout.
        classify_orbit_tiers(&mut nodes);
        compute_grid_positions(&mut nodes);

        let orbit_edge_count = edges
            .iter()
            .filter(|edge| edge.edge_type == EdgeType::OrbitConnection)
            .count();
        let follow_edge_count = edges.len() - orbit_edge_count;

        let mut top_interconnected: Vec<&NetworkNode> =
            nodes.values().filter(|node| !node.is_target).collect();
        top_interconnected.sort_by(|a, b| {
            (b.orbit_connections, b.mutual_connections)
                .cmp(&(a.orbit_connections, a.mutual_connections))
                .then_with(|| a.handle.cmp(&b.handle))
        });
        let top_interconnected: Vec<TopInterconnected> = top_interconnected
            .into_iter()
            .take(20)
            .map(|node| TopInterconnected {
                handle: node.handle.clone(),
                name: node.name.clone(),
                mutual_connections: node.mutual_connections,
                orbit_connections: node.orbit_connections,
            })
            .collect();

        let mut metadata = NetworkMetadata {
            target_handle: handle.to_string(),
            node_count: nodes.len(),
            edge_count: edges.len(),
            orbit_edge_count,
            follow_edge_count,
            orbit_strength_distribution: strength_distribution(&nodes),
            top_interconnected,
            clusters: Vec::new(),
            graph_metrics: None,
        };

        let mut node_list: Vec<NetworkNode> = nodes.into_values().collect();

        // Stage 8: optional analytics merge.
        if let Some(analytics) = &self.analytics {
            let result = analytics.analyse(&node_list, &edges);
            for node in node_list.iter_mut() {
                if let Some(metrics) = result.node_metrics.get(&node.id) {
                    node.cluster_id = metrics.cluster_id.clone();
                    node.degree_centrality = metrics.degree_centrality;
                    node.betweenness_centrality = metrics.betweenness_centrality;
                    node.pagerank = metrics.pagerank;
                    node.spiral = Some(metrics.spiral.clone());
                }
            }
            for edge in edges.iter_mut() {
                let weight = result
                    .edge_weights
                    .get(&(edge.source.clone(), edge.target.clone()))
                    .or_else(|| {
                        result
                            .edge_weights
                            .get(&(edge.target.clone(), edge.source.clone()))
                    });
                edge.weight = weight.copied();
            }
            metadata.clusters = result.clusters;
            metadata.graph_metrics = Some(result.graph_metrics);
        }

        Ok(NetworkSnapshot {
            nodes: node_list,
            edges,
            metadata,
        })
    }

    /// Fill follower/following/post counts for every node, preferring cache
    /// entries within the TTL and batching the rest through getProfiles on a
    /// worker pool. Missing profiles simply stay minimal.
    async fn hydrate_profiles(
        &self,
        nodes: &mut BTreeMap<String, NetworkNode>,
        network_handles: &[String],
        progress: &dyn ProgressReporter,
    ) -> Result<(), SkymarshalError> {
        let total = network_handles.len();
        progress.report("Hydrating profiles", 0, total);
        if network_handles.is_empty() {
            return Ok(());
        }

        let ttl = ttl_days(self.profile_ttl_days);
        let mut cached: HashMap<String, Profile> = HashMap::new();
        let mut missing: Vec<String> = network_handles.to_vec();
        if let Some(cache) = &self.cache {
            match cache.get_profiles_by_handle(network_handles, ttl) {
                Ok(found) => {
                    missing.retain(|handle| !found.contains_key(handle));
                    cached = found;
                }
                Err(error) => tracing::warn!("profile cache read failed: {error}"),
            }
        }
        for (handle, profile) in &cached {
            if let Some(node) = nodes.get_mut(handle) {
                apply_profile(node, profile);
            }
        }
        let mut hydrated = cached.len();
        progress.report("Hydrating profiles", hydrated, total);

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks: JoinSet<Result<Vec<Profile>, SkymarshalError>> = JoinSet::new();
        for batch in missing.chunks(25) {
            let batch: Vec<String> = batch.to_vec();
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| SkymarshalError::Internal(e.to_string()))?;
                let profiles = client.get_profiles(&batch).await?;
                Ok(profiles.iter().map(Profile::from).collect())
            });
        }

        let mut fetched: Vec<Profile> = Vec::new();
        let mut auth_error: Option<SkymarshalError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(profiles)) => {
                    hydrated += profiles.len();
                    fetched.extend(profiles);
                    progress.report("Hydrating profiles", hydrated.min(total), total);
                }
                Ok(Err(error)) if error.is_auth() => {
                    auth_error.get_or_insert(error);
                }
                Ok(Err(error)) => tracing::warn!("profile hydration batch failed: {error}"),
                Err(error) => tracing::warn!("profile hydration task failed: {error}"),
            }
        }
        if let Some(error) = auth_error {
            return Err(error);
        }

        for profile in &fetched {
            if let Some(node) = nodes.get_mut(&profile.handle) {
                apply_profile(node, profile);
            }
        }
        if let Some(cache) = &self.cache {
            if let Err(error) = cache.upsert_profiles(&fetched) {
                tracing::warn!("profile cache write failed: {error}");
            }
        }
        progress.report("Hydrating profiles", total, total);
        Ok(())
    }

    /// Discover how network members connect to each other. Sources are
    /// ranked by existing mutual/follower counts; balanced mode caps the
    /// scan, detailed mode walks everyone. Per-source failures never abort
    /// the stage.
    async fn augment_interconnections(
        &self,
        nodes: &mut BTreeMap<String, NetworkNode>,
        edges: &mut Vec<NetworkEdge>,
        network_handles: &[String],
        mode: FetchMode,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<(), SkymarshalError> {
        let mut ranked: Vec<String> = network_handles.to_vec();
        ranked.sort_by(|a, b| {
            let score = |handle: &String| {
                nodes
                    .get(handle)
                    .map(|node| (node.mutual_connections, node.followers_count))
                    .unwrap_or((0, 0))
            };
            score(b).cmp(&score(a)).then_with(|| a.cmp(b))
        });
        if mode == FetchMode::Balanced {
            ranked.truncate(BALANCED_ORBIT_CAP);
        }

        let total = ranked.len();
        progress.report("Computing orbit interconnections", 0, total);
        let node_set: Arc<HashSet<String>> = Arc::new(nodes.keys().cloned().collect());
        let state = Arc::new(Mutex::new(OrbitState {
            edges: Vec::new(),
            orbit_counts: HashMap::new(),
            completed: 0,
        }));

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks: JoinSet<Result<(), SkymarshalError>> = JoinSet::new();
        for source in ranked {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let node_set = Arc::clone(&node_set);
            let state = Arc::clone(&state);
            let progress = Arc::clone(&progress);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| SkymarshalError::Internal(e.to_string()))?;
                let result = client
                    .get_all_follows(&source, Some(ORBIT_FOLLOWS_LIMIT))
                    .await;
                let mut state = state.lock().await;
                state.completed += 1;
                match result {
                    Ok(follows) => {
                        let mut orbit_connections = 0;
                        for follow in follows {
                            if follow.handle != source && node_set.contains(&follow.handle) {
                                state.edges.push(NetworkEdge {
                                    source: source.clone(),
                                    target: follow.handle,
                                    edge_type: EdgeType::OrbitConnection,
                                    weight: None,
                                });
                                orbit_connections += 1;
                            }
                        }
                        state.orbit_counts.insert(source, orbit_connections);
                    }
                    Err(error) if error.is_auth() => return Err(error),
                    Err(error) => {
                        tracing::warn!("orbit fetch failed for {source}: {error}");
                    }
                }
                if state.completed % 10 == 0 {
                    progress.report("Computing orbit interconnections", state.completed, total);
                }
                Ok(())
            });
        }

        let mut auth_error: Option<SkymarshalError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    auth_error.get_or_insert(error);
                }
                Err(error) => tracing::warn!("orbit task failed: {error}"),
            }
        }
        if let Some(error) = auth_error {
            return Err(error);
        }

        let state = Arc::try_unwrap(state)
            .map_err(|_| SkymarshalError::Internal("orbit workers still running".to_string()))?
            .into_inner();
        edges.extend(state.edges);
        for (handle, count) in state.orbit_counts {
            if let Some(node) = nodes.get_mut(&handle) {
                node.orbit_connections = count;
            }
        }
        progress.report("Computing orbit interconnections", total, total);
        Ok(())
    }
}

fn unwrap_relation(
    result: Result<Vec<skymarshal_lexicon::app::bsky::actor::ProfileView>, SkymarshalError>,
    kind: &str,
    handle: &str,
) -> Result<Vec<skymarshal_lexicon::app::bsky::actor::ProfileView>, SkymarshalError> {
    match result {
        Ok(profiles) => {
            tracing::info!("fetched {} {kind} for {handle}", profiles.len());
            Ok(profiles)
        }
        Err(error) if error.is_auth() => Err(error),
        Err(error) => {
            tracing::warn!("error fetching {kind} for {handle}: {error}");
            Ok(Vec::new())
        }
    }
}

fn apply_profile(node: &mut NetworkNode, profile: &Profile) {
    if let Some(name) = &profile.display_name {
        if !name.is_empty() {
            node.name = name.clone();
        }
    }
    node.avatar = profile.avatar.clone().or(node.avatar.take());
    node.followers_count = profile.followers_count;
    node.follows_count = profile.following_count;
}

/// Derive reciprocal-follow flags, mutual counts, and relationship labels
/// from the follow edges.
pub fn detect_mutuals(
    nodes: &mut BTreeMap<String, NetworkNode>,
    edges: &[NetworkEdge],
    target_handle: &str,
) {
    let mut following: HashMap<&str, HashSet<&str>> = HashMap::new();
    for edge in edges {
        if edge.edge_type == EdgeType::Follows {
            following
                .entry(edge.source.as_str())
                .or_default()
                .insert(edge.target.as_str());
        }
    }

    let mut mutual_count: HashMap<&str, usize> = HashMap::new();
    for (source, targets) in &following {
        for target in targets {
            if following
                .get(target)
                .map(|back| back.contains(source))
                .unwrap_or(false)
            {
                *mutual_count.entry(*source).or_default() += 1;
                *mutual_count.entry(*target).or_default() += 1;
            }
        }
    }

    let followed_by_target: HashSet<&str> = following
        .get(target_handle)
        .cloned()
        .unwrap_or_default();
    let follows_target: HashSet<&str> = following
        .iter()
        .filter(|(_, targets)| targets.contains(target_handle))
        .map(|(source, _)| *source)
        .collect();

    for (handle, node) in nodes.iter_mut() {
        node.mutual_connections = mutual_count.get(handle.as_str()).copied().unwrap_or(0) / 2;
        node.you_follow = followed_by_target.contains(handle.as_str());
        node.follows_you = follows_target.contains(handle.as_str());
        node.relationship = if node.is_target {
            Relationship::Target
        } else if node.you_follow && node.follows_you {
            Relationship::Mutual
        } else if node.you_follow {
            Relationship::Following
        } else if node.follows_you {
            Relationship::Follower
        } else {
            Relationship::Indirect
        };
    }
}

/// Tier 0: more than 20 orbit connections (or the target). Tier 1: 5-20.
/// Tier 2: the rest.
pub fn classify_orbit_tiers(nodes: &mut BTreeMap<String, NetworkNode>) {
    for node in nodes.values_mut() {
        node.tier = if node.is_target || node.orbit_connections > 20 {
            0
        } else if node.orbit_connections >= 5 {
            1
        } else {
            2
        };
    }
}

/// Target at the origin; each tier on its own ring with equal angular
/// steps.
pub fn compute_grid_positions(nodes: &mut BTreeMap<String, NetworkNode>) {
    for tier in 0..3u8 {
        let ring: Vec<String> = nodes
            .values()
            .filter(|node| node.tier == tier && !node.is_target)
            .map(|node| node.handle.clone())
            .collect();
        if ring.is_empty() {
            continue;
        }
        let step = 2.0 * std::f64::consts::PI / ring.len() as f64;
        for (index, handle) in ring.iter().enumerate() {
            if let Some(node) = nodes.get_mut(handle) {
                let angle = index as f64 * step;
                node.x = RING_RADII[tier as usize] * angle.cos();
                node.y = RING_RADII[tier as usize] * angle.sin();
            }
        }
    }
    for node in nodes.values_mut() {
        if node.is_target {
            node.x = 0.0;
            node.y = 0.0;
        }
    }
}

fn strength_distribution(nodes: &BTreeMap<String, NetworkNode>) -> StrengthDistribution {
    let total = nodes.len();
    if total == 0 {
        return StrengthDistribution::default();
    }
    let mut counts = [0usize; 3];
    for node in nodes.values() {
        counts[node.tier.min(2) as usize] += 1;
    }
    StrengthDistribution {
        strong: counts[0] as f64 / total as f64,
        medium: counts[1] as f64 / total as f64,
        weak: counts[2] as f64 / total as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skymarshal_common::progress::NoProgress;

    fn bare_node(handle: &str, is_target: bool) -> NetworkNode {
        NetworkNode::from_profile_view(
            &skymarshal_lexicon::app::bsky::actor::ProfileView {
                did: format!("did:plc:{handle}"),
                handle: handle.to_string(),
                display_name: None,
                description: None,
                avatar: None,
            },
            is_target,
        )
    }

    fn follows(source: &str, target: &str) -> NetworkEdge {
        NetworkEdge {
            source: source.to_string(),
            target: target.to_string(),
            edge_type: EdgeType::Follows,
            weight: None,
        }
    }

    #[test]
    fn test_detect_mutuals_relationships() {
        // Target follows A and B; B and C follow target back.
        let target = "t.bsky.social";
        let mut nodes = BTreeMap::new();
        for (handle, is_target) in [
            (target, true),
            ("a.bsky.social", false),
            ("b.bsky.social", false),
            ("c.bsky.social", false),
        ] {
            nodes.insert(handle.to_string(), bare_node(handle, is_target));
        }
        let edges = vec![
            follows(target, "a.bsky.social"),
            follows(target, "b.bsky.social"),
            follows("b.bsky.social", target),
            follows("c.bsky.social", target),
        ];
        detect_mutuals(&mut nodes, &edges, target);

        assert_eq!(nodes[target].relationship, Relationship::Target);
        assert_eq!(nodes["a.bsky.social"].relationship, Relationship::Following);
        assert_eq!(nodes["b.bsky.social"].relationship, Relationship::Mutual);
        assert_eq!(nodes["c.bsky.social"].relationship, Relationship::Follower);
        assert!(nodes["b.bsky.social"].mutual_connections >= 1);
        // The mutual flags and the relationship label agree.
        for node in nodes.values().filter(|node| !node.is_target) {
            assert_eq!(
                node.you_follow && node.follows_you,
                node.relationship == Relationship::Mutual
            );
        }
    }

    #[test]
    fn test_classify_orbit_tiers_bounds() {
        let mut nodes = BTreeMap::new();
        for (handle, orbit) in [("strong", 21), ("mid-high", 20), ("mid-low", 5), ("weak", 4)] {
            let mut node = bare_node(handle, false);
            node.orbit_connections = orbit;
            nodes.insert(handle.to_string(), node);
        }
        let mut target = bare_node("target", true);
        target.orbit_connections = 0;
        nodes.insert("target".to_string(), target);

        classify_orbit_tiers(&mut nodes);
        assert_eq!(nodes["strong"].tier, 0);
        assert_eq!(nodes["mid-high"].tier, 1);
        assert_eq!(nodes["mid-low"].tier, 1);
        assert_eq!(nodes["weak"].tier, 2);
        assert_eq!(nodes["target"].tier, 0);
    }

    #[test]
    fn test_grid_positions_rings() {
        let mut nodes = BTreeMap::new();
        let mut target = bare_node("target", true);
        target.tier = 0;
        nodes.insert("target".to_string(), target);
        for i in 0..4 {
            let mut node = bare_node(&format!("weak{i}"), false);
            node.tier = 2;
            nodes.insert(node.handle.clone(), node);
        }
        compute_grid_positions(&mut nodes);

        assert_eq!(nodes["target"].x, 0.0);
        assert_eq!(nodes["target"].y, 0.0);
        for i in 0..4 {
            let node = &nodes[&format!("weak{i}")];
            let radius = (node.x * node.x + node.y * node.y).sqrt();
            assert!((radius - 600.0).abs() < 1e-6);
        }
    }

    fn profile_body(handle: &str, followers: usize) -> String {
        format!(
            "{{\"did\":\"did:plc:{}\",\"handle\":\"{handle}\",\"displayName\":\"{handle}\",\"followersCount\":{followers},\"followsCount\":10,\"postsCount\":3}}",
            handle.replace('.', "-")
        )
    }

    #[tokio::test]
    async fn test_fetch_network_fast_mode_end_to_end() {
        let target = "t.bsky.social";
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/xrpc/app.bsky.actor.getProfile")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(profile_body(target, 2))
            .create_async()
            .await;
        server
            .mock("GET", "/xrpc/app.bsky.graph.getFollows")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(format!(
                "{{\"cursor\":null,\"subject\":{{\"did\":\"did:plc:t\",\"handle\":\"{target}\"}},\"follows\":[{{\"did\":\"did:plc:a\",\"handle\":\"a.bsky.social\"}},{{\"did\":\"did:plc:b\",\"handle\":\"b.bsky.social\"}}]}}"
            ))
            .create_async()
            .await;
        server
            .mock("GET", "/xrpc/app.bsky.graph.getFollowers")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(format!(
                "{{\"cursor\":null,\"subject\":{{\"did\":\"did:plc:t\",\"handle\":\"{target}\"}},\"followers\":[{{\"did\":\"did:plc:b\",\"handle\":\"b.bsky.social\"}},{{\"did\":\"did:plc:c\",\"handle\":\"c.bsky.social\"}}]}}"
            ))
            .create_async()
            .await;
        server
            .mock("GET", "/xrpc/app.bsky.actor.getProfiles")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(format!(
                "{{\"profiles\":[{},{},{}]}}",
                profile_body("a.bsky.social", 11),
                profile_body("b.bsky.social", 22),
                profile_body("c.bsky.social", 33)
            ))
            .create_async()
            .await;

        let fetcher = NetworkFetcher::new(Arc::new(XrpcClient::new(&server.url())));
        let options = FetchOptions {
            mode: FetchMode::Fast,
            ..FetchOptions::default()
        };
        let snapshot = fetcher
            .fetch_network(target, &options, Arc::new(NoProgress))
            .await
            .unwrap();

        assert_eq!(snapshot.nodes.len(), 4);
        assert_eq!(
            snapshot.nodes.iter().filter(|node| node.is_target).count(),
            1
        );
        let by_handle: HashMap<&str, &NetworkNode> = snapshot
            .nodes
            .iter()
            .map(|node| (node.handle.as_str(), node))
            .collect();
        assert_eq!(by_handle["a.bsky.social"].relationship, Relationship::Following);
        assert_eq!(by_handle["b.bsky.social"].relationship, Relationship::Mutual);
        assert_eq!(by_handle["c.bsky.social"].relationship, Relationship::Follower);
        assert_eq!(by_handle["b.bsky.social"].followers_count, 22);

        // Every edge endpoint resolves to a node, every node has a tier.
        let handles: HashSet<&str> = by_handle.keys().copied().collect();
        for edge in &snapshot.edges {
            assert!(handles.contains(edge.source.as_str()));
            assert!(handles.contains(edge.target.as_str()));
        }
        assert!(snapshot.nodes.iter().all(|node| node.tier <= 2));
        // Fast mode skips orbit expansion.
        assert_eq!(snapshot.metadata.orbit_edge_count, 0);
        assert_eq!(snapshot.metadata.node_count, 4);
    }

    #[tokio::test]
    async fn test_fetch_network_missing_target_is_terminal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/xrpc/app.bsky.actor.getProfile")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .with_body("{\"error\":\"NotFound\",\"message\":\"actor not found\"}")
            .create_async()
            .await;

        let fetcher = NetworkFetcher::new(Arc::new(XrpcClient::new(&server.url())));
        let error = fetcher
            .fetch_network(
                "ghost.bsky.social",
                &FetchOptions::default(),
                Arc::new(NoProgress),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, SkymarshalError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_network_requires_a_relation_kind() {
        let fetcher = NetworkFetcher::new(Arc::new(XrpcClient::new("http://localhost:1")));
        let options = FetchOptions {
            include_followers: false,
            include_following: false,
            ..FetchOptions::default()
        };
        let error = fetcher
            .fetch_network("t.bsky.social", &options, Arc::new(NoProgress))
            .await
            .unwrap_err();
        assert!(matches!(error, SkymarshalError::Validation(_)));
    }
}
