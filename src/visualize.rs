//! Boundary towards the presentation layer.
//!
//! Renderers consume normalized [`ConnectivityRow`]s and a species
//! [`CoordinateMap`]; pixel layout is theirs. [`ConnectionListAdapter`] only
//! assembles the node and edge lists such a renderer draws.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::assets::CoordinateMap;
use crate::error::SckanError;
use crate::table::ConnectivityRow;

pub trait VisualizationAdapter {
    type Scene;

    fn render(
        &self,
        rows: &[ConnectivityRow],
        coordinates: &CoordinateMap,
    ) -> Result<Self::Scene, SckanError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneNode {
    pub label: String,
    pub position: Option<(i64, i64)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneEdge {
    pub source: String,
    pub target: String,
    pub neuron: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionScene {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    /// Neuron ids of rows lacking a soma or terminal label.
    pub skipped: Vec<String>,
}

/// Draws `A → C → B`, or `A → B` when the intermediate region is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionListAdapter;

impl VisualizationAdapter for ConnectionListAdapter {
    type Scene = ConnectionScene;

    fn render(
        &self,
        rows: &[ConnectivityRow],
        coordinates: &CoordinateMap,
    ) -> Result<Self::Scene, SckanError> {
        let mut scene = ConnectionScene::default();
        let mut nodes = BTreeMap::new();
        for row in rows {
            let (Some(start), Some(end)) = (&row.region_a_label, &row.region_b_label) else {
                scene.skipped.push(row.neuron_id.clone());
                continue;
            };
            let mut path = vec![start.as_str()];
            if let Some(via) = &row.region_c_label {
                path.push(via.as_str());
            }
            path.push(end.as_str());

            for label in &path {
                nodes
                    .entry(label.to_string())
                    .or_insert_with(|| coordinates.get(*label).copied());
            }
            for pair in path.windows(2) {
                let edge = SceneEdge {
                    source: pair[0].to_string(),
                    target: pair[1].to_string(),
                    neuron: row.neuron_label.clone(),
                };
                if !scene.edges.contains(&edge) {
                    scene.edges.push(edge);
                }
            }
        }
        scene.nodes = nodes
            .into_iter()
            .map(|(label, position)| SceneNode { label, position })
            .collect();
        Ok(scene)
    }
}
