//! Context resolution over a static infrastructure graph
//!
//! The graph is a hierarchy of regions, projects, VPCs, subnets and clusters.
//! Nodes and pods are kept as raw JSON objects so their attributes reach the
//! prompts unchanged.

use std::path::Path;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::domain::{Alert, ContextResolver, DomainError, InfraContext};

static POD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"Pod\s+(\S+)\s+in\s+(\S+)").unwrap());
static NODE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"Node\s+(\S+)\s+").unwrap());

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfrastructureGraph {
    #[serde(default)]
    regions: Vec<Region>,
}

#[derive(Debug, Clone, Deserialize)]
struct Region {
    name: String,
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Debug, Clone, Deserialize)]
struct Project {
    name: String,
    #[serde(default)]
    vpcs: Vec<Vpc>,
}

#[derive(Debug, Clone, Deserialize)]
struct Vpc {
    id: String,
    #[serde(default)]
    subnets: Vec<Subnet>,
}

#[derive(Debug, Clone, Deserialize)]
struct Subnet {
    id: String,
    #[serde(default)]
    clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, Deserialize)]
struct Cluster {
    name: String,
    #[serde(default)]
    nodes: Vec<Map<String, Value>>,
}

/// Resource an alert refers to
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target<'a> {
    Pod { name: &'a str, cluster: &'a str },
    Node { name: &'a str },
}

impl<'a> Target<'a> {
    fn from_alert(alert: &'a Alert) -> Option<Self> {
        match alert.alert_type.as_str() {
            "PodCrashLoop" => POD_PATTERN.captures(&alert.summary).map(|cap| Target::Pod {
                name: cap.get(1).map_or("", |m| m.as_str()),
                cluster: cap.get(2).map_or("", |m| m.as_str()),
            }),
            "HighCPU" => NODE_PATTERN.captures(&alert.summary).map(|cap| Target::Node {
                name: cap.get(1).map_or("", |m| m.as_str()),
            }),
            _ => None,
        }
    }

    fn cluster(&self) -> Option<&str> {
        match self {
            Self::Pod { cluster, .. } => Some(cluster),
            Self::Node { .. } => None,
        }
    }
}

fn name_of(object: &Map<String, Value>) -> Option<&str> {
    object.get("name").and_then(Value::as_str)
}

fn pods_of(node: &Map<String, Value>) -> Vec<Value> {
    node.get("pods")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Location of a cluster inside the hierarchy
struct Placement<'g> {
    region: &'g Region,
    project: &'g Project,
    vpc: &'g Vpc,
    subnet: &'g Subnet,
    cluster: &'g Cluster,
}

impl Placement<'_> {
    fn context(&self, node_name: &str) -> InfraContext {
        let mut context = InfraContext::new();
        context.insert("region".to_string(), json!(self.region.name));
        context.insert("project".to_string(), json!(self.project.name));
        context.insert("vpc_id".to_string(), json!(self.vpc.id));
        context.insert("subnet_id".to_string(), json!(self.subnet.id));
        context.insert("cluster".to_string(), json!(self.cluster.name));
        context.insert("node".to_string(), json!(node_name));
        context
    }
}

impl InfrastructureGraph {
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        serde_json::from_str(json)
            .map_err(|e| DomainError::configuration(format!("Invalid infrastructure graph: {}", e)))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read infrastructure graph {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&contents)
    }

    fn placements(&self) -> impl Iterator<Item = Placement<'_>> {
        self.regions.iter().flat_map(|region| {
            region.projects.iter().flat_map(move |project| {
                project.vpcs.iter().flat_map(move |vpc| {
                    vpc.subnets.iter().flat_map(move |subnet| {
                        subnet.clusters.iter().map(move |cluster| Placement {
                            region,
                            project,
                            vpc,
                            subnet,
                            cluster,
                        })
                    })
                })
            })
        })
    }

    fn find(&self, target: &Target<'_>) -> Option<InfraContext> {
        self.placements()
            .filter(|p| target.cluster().is_none_or(|c| p.cluster.name == c))
            .find_map(|placement| match target {
                Target::Pod { name, .. } => placement.cluster.nodes.iter().find_map(|node| {
                    let pod = pods_of(node)
                        .into_iter()
                        .find(|pod| pod.get("name").and_then(Value::as_str) == Some(*name))?;

                    let mut context = placement.context(name_of(node).unwrap_or_default());
                    let containers = pod.get("containers").cloned().unwrap_or(json!([]));
                    context.insert("pod".to_string(), pod);
                    context.insert("containers".to_string(), containers);
                    Some(context)
                }),
                Target::Node { name } => placement
                    .cluster
                    .nodes
                    .iter()
                    .find(|node| name_of(node) == Some(*name))
                    .map(|node| {
                        let mut context = placement.context(name);
                        context.insert("node".to_string(), Value::Object(node.clone()));
                        context.insert("pods".to_string(), Value::Array(pods_of(node)));
                        context
                    }),
            })
    }
}

/// Resolves alert context by locating the named pod or node in the graph
#[derive(Debug, Clone)]
pub struct InfrastructureGraphResolver {
    graph: InfrastructureGraph,
}

impl InfrastructureGraphResolver {
    pub fn new(graph: InfrastructureGraph) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl ContextResolver for InfrastructureGraphResolver {
    async fn resolve_context(&self, alert: &Alert) -> Result<InfraContext, DomainError> {
        let Some(target) = Target::from_alert(alert) else {
            debug!(
                alert_id = %alert.id,
                alert_type = %alert.alert_type,
                "No resource named in alert"
            );
            return Ok(InfraContext::new());
        };

        let context = self.graph.find(&target).unwrap_or_default();
        debug!(
            alert_id = %alert.id,
            resource = ?target,
            found = !context.is_empty(),
            "Infrastructure context resolved"
        );

        Ok(context)
    }
}
