//! Interchange model layout and conversions

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::model::{Estimator, LinearModel, ModelBundle, Node, Objective, Tree, TreeEnsemble};

pub const FORMAT_VERSION: u32 = 1;

/// Link function applied to raw scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostTransform {
    None,
    Logistic,
    Softmax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeMode {
    BranchLeq,
    Leaf,
}

/// Parallel-array description of a tree ensemble
///
/// Node `i` of the flattened graph belongs to tree `nodes_treeids[i]`; leaf
/// outputs live in the `target_*` arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsembleGraph {
    pub post_transform: PostTransform,
    pub n_targets: usize,
    pub base_values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classlabels: Option<Vec<String>>,
    pub nodes_treeids: Vec<usize>,
    pub nodes_nodeids: Vec<usize>,
    pub nodes_modes: Vec<NodeMode>,
    pub nodes_featureids: Vec<usize>,
    pub nodes_values: Vec<f64>,
    pub nodes_truenodeids: Vec<usize>,
    pub nodes_falsenodeids: Vec<usize>,
    pub nodes_missing_value_tracks_true: Vec<bool>,
    pub target_treeids: Vec<usize>,
    pub target_nodeids: Vec<usize>,
    pub target_ids: Vec<usize>,
    pub target_weights: Vec<f64>,
}

/// Row-major linear model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGraph {
    pub post_transform: PostTransform,
    pub n_targets: usize,
    pub coefficients: Vec<f64>,
    pub intercepts: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classlabels: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Graph {
    TreeEnsemble(TreeEnsembleGraph),
    Linear(LinearGraph),
}

/// Top-level interchange document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeModel {
    pub format_version: u32,
    pub producer: String,
    pub n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub graph: Graph,
}

impl InterchangeModel {
    pub fn from_bundle(bundle: &ModelBundle) -> Self {
        let estimator = bundle.estimator();
        let graph = match estimator {
            Estimator::GradientBoosting(m) => Graph::TreeEnsemble(flatten_ensemble(m)),
            Estimator::LogisticRegression(m) => Graph::Linear(flatten_linear(
                m,
                if m.coef.len() == 1 {
                    PostTransform::Logistic
                } else {
                    PostTransform::Softmax
                },
            )),
            Estimator::LinearRegression(m) => Graph::Linear(flatten_linear(m, PostTransform::None)),
        };

        Self {
            format_version: FORMAT_VERSION,
            producer: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            n_features: estimator.num_features(),
            feature_names: bundle.feature_names().map(<[String]>::to_vec),
            graph,
        }
    }

    /// Rebuild the estimator and feature schema
    pub fn into_parts(self) -> Result<(Estimator, Option<Vec<String>>), LoadError> {
        if self.format_version != FORMAT_VERSION {
            return Err(LoadError::Invalid(format!(
                "unsupported interchange version {} (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }

        let estimator = match self.graph {
            Graph::TreeEnsemble(g) => rebuild_ensemble(g, self.n_features)?,
            Graph::Linear(g) => rebuild_linear(g, self.n_features)?,
        };
        Ok((estimator, self.feature_names))
    }
}

fn flatten_ensemble(m: &TreeEnsemble) -> TreeEnsembleGraph {
    let n_targets = m.objective.num_outputs();
    let post_transform = match m.objective {
        Objective::Regression => PostTransform::None,
        Objective::Binary => PostTransform::Logistic,
        Objective::Multiclass { .. } => PostTransform::Softmax,
    };

    let mut g = TreeEnsembleGraph {
        post_transform,
        n_targets,
        base_values: if m.base_score.is_empty() {
            vec![0.0; n_targets]
        } else {
            m.base_score.clone()
        },
        classlabels: m.classes.clone(),
        nodes_treeids: Vec::new(),
        nodes_nodeids: Vec::new(),
        nodes_modes: Vec::new(),
        nodes_featureids: Vec::new(),
        nodes_values: Vec::new(),
        nodes_truenodeids: Vec::new(),
        nodes_falsenodeids: Vec::new(),
        nodes_missing_value_tracks_true: Vec::new(),
        target_treeids: Vec::new(),
        target_nodeids: Vec::new(),
        target_ids: Vec::new(),
        target_weights: Vec::new(),
    };

    for (tree_id, tree) in m.trees.iter().enumerate() {
        for (node_id, node) in tree.nodes.iter().enumerate() {
            g.nodes_treeids.push(tree_id);
            g.nodes_nodeids.push(node_id);
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    g.nodes_modes.push(NodeMode::BranchLeq);
                    g.nodes_featureids.push(*feature);
                    g.nodes_values.push(*threshold);
                    g.nodes_truenodeids.push(*left);
                    g.nodes_falsenodeids.push(*right);
                    g.nodes_missing_value_tracks_true.push(*default_left);
                }
                Node::Leaf { value } => {
                    g.nodes_modes.push(NodeMode::Leaf);
                    g.nodes_featureids.push(0);
                    g.nodes_values.push(0.0);
                    g.nodes_truenodeids.push(0);
                    g.nodes_falsenodeids.push(0);
                    g.nodes_missing_value_tracks_true.push(false);

                    g.target_treeids.push(tree_id);
                    g.target_nodeids.push(node_id);
                    g.target_ids.push(tree_id % n_targets);
                    g.target_weights.push(*value);
                }
            }
        }
    }

    g
}

fn rebuild_ensemble(g: TreeEnsembleGraph, n_features: usize) -> Result<Estimator, LoadError> {
    let objective = match (g.post_transform, g.n_targets) {
        (PostTransform::None, 1) => Objective::Regression,
        (PostTransform::Logistic, 1) => Objective::Binary,
        (PostTransform::Softmax, n) if n > 1 => Objective::Multiclass { num_class: n },
        (transform, n) => {
            return Err(LoadError::Invalid(format!(
                "tree ensemble with {:?} post-transform and {} targets",
                transform, n
            )))
        }
    };

    let n = g.nodes_nodeids.len();
    let node_columns = [
        g.nodes_treeids.len(),
        g.nodes_modes.len(),
        g.nodes_featureids.len(),
        g.nodes_values.len(),
        g.nodes_truenodeids.len(),
        g.nodes_falsenodeids.len(),
        g.nodes_missing_value_tracks_true.len(),
    ];
    if node_columns.iter().any(|len| *len != n) {
        return Err(LoadError::Invalid("node arrays differ in length".to_string()));
    }

    let t = g.target_weights.len();
    if [g.target_treeids.len(), g.target_nodeids.len(), g.target_ids.len()]
        .iter()
        .any(|len| *len != t)
    {
        return Err(LoadError::Invalid("target arrays differ in length".to_string()));
    }

    let mut leaf_values = HashMap::with_capacity(t);
    for i in 0..t {
        let tree_id = g.target_treeids[i];
        if g.target_ids[i] != tree_id % g.n_targets {
            return Err(LoadError::Invalid(format!(
                "tree {} writes to target {}, expected {}",
                tree_id,
                g.target_ids[i],
                tree_id % g.n_targets
            )));
        }
        leaf_values.insert((tree_id, g.target_nodeids[i]), g.target_weights[i]);
    }

    let mut trees: Vec<Tree> = Vec::new();
    for i in 0..n {
        let tree_id = g.nodes_treeids[i];
        if tree_id == trees.len() {
            trees.push(Tree { nodes: Vec::new() });
        } else if tree_id + 1 != trees.len() {
            return Err(LoadError::Invalid(
                "nodes must be grouped by ascending tree id".to_string(),
            ));
        }
        let Some(tree) = trees.last_mut() else {
            return Err(LoadError::Invalid("node without a tree".to_string()));
        };

        let node_id = g.nodes_nodeids[i];
        if node_id != tree.nodes.len() {
            return Err(LoadError::Invalid(format!(
                "tree {} has non-contiguous node id {}",
                tree_id, node_id
            )));
        }

        let node = match g.nodes_modes[i] {
            NodeMode::BranchLeq => Node::Split {
                feature: g.nodes_featureids[i],
                threshold: g.nodes_values[i],
                left: g.nodes_truenodeids[i],
                right: g.nodes_falsenodeids[i],
                default_left: g.nodes_missing_value_tracks_true[i],
            },
            NodeMode::Leaf => {
                let value = leaf_values.get(&(tree_id, node_id)).copied().ok_or_else(|| {
                    LoadError::Invalid(format!("leaf {}/{} has no target weight", tree_id, node_id))
                })?;
                Node::Leaf { value }
            }
        };
        tree.nodes.push(node);
    }

    Ok(Estimator::GradientBoosting(TreeEnsemble {
        objective,
        num_features: n_features,
        base_score: g.base_values,
        trees,
        classes: g.classlabels,
        feature_name: None,
    }))
}

fn flatten_linear(m: &LinearModel, post_transform: PostTransform) -> LinearGraph {
    LinearGraph {
        post_transform,
        n_targets: m.coef.len(),
        coefficients: m.coef.iter().flatten().copied().collect(),
        intercepts: m.intercept.clone(),
        classlabels: m.classes.clone(),
    }
}

fn rebuild_linear(g: LinearGraph, n_features: usize) -> Result<Estimator, LoadError> {
    let expected = g.n_targets.checked_mul(n_features).ok_or_else(|| {
        LoadError::Invalid(format!(
            "{} targets x {} features overflows",
            g.n_targets, n_features
        ))
    })?;
    if g.coefficients.len() != expected {
        return Err(LoadError::Invalid(format!(
            "{} coefficients for {} targets x {} features",
            g.coefficients.len(),
            g.n_targets,
            n_features
        )));
    }

    let coef = if n_features == 0 {
        vec![Vec::new(); g.n_targets]
    } else {
        g.coefficients
            .chunks(n_features)
            .map(<[f64]>::to_vec)
            .collect()
    };
    let model = LinearModel {
        coef,
        intercept: g.intercepts,
        classes: g.classlabels,
        feature_name: None,
    };

    match (g.post_transform, g.n_targets) {
        (PostTransform::None, 1) => Ok(Estimator::LinearRegression(model)),
        (PostTransform::Logistic, 1) => Ok(Estimator::LogisticRegression(model)),
        (PostTransform::Softmax, n) if n > 1 => Ok(Estimator::LogisticRegression(model)),
        (transform, n) => Err(LoadError::Invalid(format!(
            "linear model with {:?} post-transform and {} targets",
            transform, n
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ArtifactFormat;
    use crate::model::fixtures;

    fn bundle(estimator: Estimator) -> ModelBundle {
        ModelBundle::new(estimator, None, ArtifactFormat::Native).unwrap()
    }

    #[test]
    fn test_flatten_binary_gbdt() {
        let model = InterchangeModel::from_bundle(&bundle(fixtures::binary_gbdt()));
        let Graph::TreeEnsemble(g) = model.graph else {
            panic!("expected tree ensemble graph");
        };
        assert_eq!(g.post_transform, PostTransform::Logistic);
        assert_eq!(g.nodes_modes, vec![NodeMode::BranchLeq, NodeMode::Leaf, NodeMode::Leaf]);
        assert_eq!(g.target_nodeids, vec![1, 2]);
        assert_eq!(g.target_weights, vec![-2.0, 2.0]);
        assert_eq!(g.base_values, vec![0.0]);
    }

    #[test]
    fn test_yaml_uses_screaming_modes() {
        let model = InterchangeModel::from_bundle(&bundle(fixtures::binary_gbdt()));
        let yaml = serde_yaml::to_string(&model).unwrap();
        assert!(yaml.contains("op: tree_ensemble"));
        assert!(yaml.contains("BRANCH_LEQ"));
        assert!(yaml.contains("post_transform: LOGISTIC"));
    }

    #[test]
    fn test_rejects_mismatched_targets() {
        let mut model = InterchangeModel::from_bundle(&bundle(fixtures::multiclass_gbdt()));
        if let Graph::TreeEnsemble(ref mut g) = model.graph {
            g.target_ids[0] = 2;
        }
        assert!(matches!(model.into_parts(), Err(LoadError::Invalid(_))));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut model = InterchangeModel::from_bundle(&bundle(fixtures::linear_regressor()));
        model.format_version = 99;
        assert!(matches!(model.into_parts(), Err(LoadError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_coefficient_count() {
        let mut model = InterchangeModel::from_bundle(&bundle(fixtures::multiclass_logistic()));
        if let Graph::Linear(ref mut g) = model.graph {
            g.coefficients.pop();
        }
        assert!(matches!(model.into_parts(), Err(LoadError::Invalid(_))));
    }

    #[test]
    fn test_rejects_overflowing_linear_shape() {
        let mut model = InterchangeModel::from_bundle(&bundle(fixtures::linear_regressor()));
        model.n_features = usize::MAX;
        if let Graph::Linear(ref mut g) = model.graph {
            g.n_targets = 2;
        }
        assert!(matches!(model.into_parts(), Err(LoadError::Invalid(_))));
    }
}
