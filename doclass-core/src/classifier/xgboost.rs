//! Gradient-boosted tree ensembles saved in XGBoost's JSON model format.
//!
//! Only the parts needed for multi-class inference are read: feature names,
//! class count, base score, the `gbtree` booster's trees with their class
//! assignment, and the recorded `best_iteration` from early stopping. Trees
//! are validated on load so that evaluation can neither index out of bounds
//! nor revisit a node.

use super::Classifier;
use crate::errors::{ClassifierError, Result};
use crate::matrix::FeatureMatrix;
use crate::schema::{self, ModelSchema};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

// ===== ON-DISK FORMAT =====

#[derive(Debug, Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    #[serde(default)]
    attributes: HashMap<String, String>,
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    objective: Objective,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    name: String,
    model: Option<GbTreeModel>,
}

#[derive(Debug, Deserialize)]
struct GbTreeModel {
    #[serde(default)]
    gbtree_model_param: Option<GbTreeModelParam>,
    #[serde(default)]
    iteration_indptr: Option<Vec<usize>>,
    tree_info: Vec<usize>,
    trees: Vec<RawTree>,
}

#[derive(Debug, Deserialize)]
struct GbTreeModelParam {
    #[serde(default)]
    num_parallel_tree: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    #[serde(default)]
    base_score: Option<String>,
    num_class: String,
    num_feature: String,
}

#[derive(Debug, Deserialize)]
struct Objective {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<usize>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<u8>,
}

/// Older writers emit booleans, newer ones 0/1 integers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

// ===== VALIDATED MODEL =====

const LEAF: i64 = -1;

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf(f32),
}

impl Tree {
    fn from_raw(raw: RawTree, num_feature: usize) -> std::result::Result<Self, String> {
        let n = raw.left_children.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        let lengths = [
            raw.right_children.len(),
            raw.split_indices.len(),
            raw.split_conditions.len(),
            raw.default_left.len(),
        ];
        if lengths.iter().any(|len| *len != n) {
            return Err(format!("tree arrays disagree on node count {n}"));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (raw.left_children[i], raw.right_children[i]);
            if left == LEAF {
                if right != LEAF {
                    return Err(format!("node {i} has only one child"));
                }
                nodes.push(Node::Leaf(raw.split_conditions[i]));
                continue;
            }

            if raw.split_type.get(i).copied().unwrap_or(0) != 0 {
                return Err(format!("node {i} uses a categorical split, which is not supported"));
            }
            // Children always come after their parent, so traversal terminates
            let child = |c: i64| -> std::result::Result<usize, String> {
                usize::try_from(c)
                    .ok()
                    .filter(|c| *c > i && *c < n)
                    .ok_or_else(|| format!("node {i} has invalid child {c}"))
            };
            let feature = raw.split_indices[i];
            if feature >= num_feature {
                return Err(format!("node {i} splits on feature {feature} of {num_feature}"));
            }
            nodes.push(Node::Split {
                feature,
                threshold: raw.split_conditions[i],
                left: child(left)?,
                right: child(right)?,
                default_left: raw.default_left[i].is_set(),
            });
        }

        Ok(Self { nodes })
    }

    /// Leaf value reached by `value_of(feature)`; NaN follows the default branch.
    fn leaf_value(&self, value_of: impl Fn(usize) -> f32) -> f32 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let value = value_of(feature);
                    index = if value.is_nan() {
                        if default_left {
                            left
                        } else {
                            right
                        }
                    } else if value < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// A loaded multi-class XGBoost ensemble.
#[derive(Debug, Clone)]
pub struct XGBoostModel {
    schema: ModelSchema,
    /// Model feature index → feature name
    feature_names: Vec<String>,
    num_class: usize,
    base_margin: Vec<f32>,
    trees: Vec<Tree>,
    tree_class: Vec<usize>,
}

impl XGBoostModel {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClassifierError::artifact(path, e))?;
        let model = Self::from_json(&content).map_err(|reason| ClassifierError::artifact(path, reason))?;
        info!(
            "Loaded XGBoost model from {}: {} classes, {} features, {} trees",
            path.display(),
            model.num_class,
            model.feature_names.len(),
            model.trees.len()
        );
        Ok(model)
    }

    pub fn from_json(content: &str) -> std::result::Result<Self, String> {
        let file: ModelFile =
            serde_json::from_str(content).map_err(|e| format!("invalid model JSON: {e}"))?;
        let learner = file.learner;

        if !learner.objective.name.starts_with("multi:") {
            return Err(format!(
                "objective '{}' is not a multi-class objective",
                learner.objective.name
            ));
        }
        if learner.gradient_booster.name != "gbtree" {
            return Err(format!(
                "booster '{}' is not supported (expected gbtree)",
                learner.gradient_booster.name
            ));
        }

        let num_class = parse_count("num_class", &learner.learner_model_param.num_class)?;
        if num_class < 2 {
            return Err(format!("num_class {num_class} is not multi-class"));
        }
        let num_feature = parse_count("num_feature", &learner.learner_model_param.num_feature)?;
        if learner.feature_names.len() != num_feature {
            return Err(format!(
                "model declares {} feature names for {num_feature} features",
                learner.feature_names.len()
            ));
        }
        let schema = ModelSchema::new(learner.feature_names.iter().cloned())?;
        let base_margin = parse_base_score(learner.learner_model_param.base_score.as_deref(), num_class)?;

        let booster = learner
            .gradient_booster
            .model
            .ok_or_else(|| "gbtree booster has no model".to_string())?;
        if booster.tree_info.len() != booster.trees.len() {
            return Err(format!(
                "{} tree_info entries for {} trees",
                booster.tree_info.len(),
                booster.trees.len()
            ));
        }
        if let Some(class) = booster.tree_info.iter().find(|c| **c >= num_class) {
            return Err(format!("tree assigned to class {class} of {num_class}"));
        }

        let tree_limit = tree_limit(
            learner.attributes.get("best_iteration").map(String::as_str),
            &booster,
            num_class,
        )?;

        let trees = booster
            .trees
            .into_iter()
            .take(tree_limit)
            .enumerate()
            .map(|(i, raw)| Tree::from_raw(raw, num_feature).map_err(|e| format!("tree {i}: {e}")))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let tree_class = booster.tree_info[..trees.len()].to_vec();

        Ok(Self {
            schema,
            feature_names: learner.feature_names,
            num_class,
            base_margin,
            trees,
            tree_class,
        })
    }

    pub fn num_class(&self) -> usize {
        self.num_class
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for XGBoostModel {
    fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<Vec<f32>>> {
        schema::verify(matrix, &self.schema)?;

        // Columns in the model's own feature order
        let columns = self
            .feature_names
            .iter()
            .map(|name| {
                matrix.column(name).ok_or_else(|| {
                    ClassifierError::Invariant(format!("verified matrix lacks column '{name}'"))
                })
            })
            .collect::<Result<Vec<&[f32]>>>()?;

        let probabilities = (0..matrix.n_rows())
            .map(|row| {
                let mut margins = self.base_margin.clone();
                for (tree, class) in self.trees.iter().zip(&self.tree_class) {
                    margins[*class] += tree.leaf_value(|feature| columns[feature][row]);
                }
                softmax(&margins)
            })
            .collect();

        Ok(probabilities)
    }

    fn name(&self) -> &str {
        "xgboost"
    }
}

fn parse_count(field: &str, raw: &str) -> std::result::Result<usize, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("{field} {raw:?} is not a count"))
}

/// `"5E-1"`, `"[5E-1]"` or one value per class.
fn parse_base_score(raw: Option<&str>, num_class: usize) -> std::result::Result<Vec<f32>, String> {
    let Some(raw) = raw else {
        return Ok(vec![0.5; num_class]);
    };
    let values = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<f32>, _>>()
        .map_err(|_| format!("base_score {raw:?} is not numeric"))?;

    match values.len() {
        1 => Ok(vec![values[0]; num_class]),
        n if n == num_class => Ok(values),
        n => Err(format!("base_score has {n} values for {num_class} classes")),
    }
}

/// Number of leading trees to evaluate, honoring `best_iteration`.
fn tree_limit(
    best_iteration: Option<&str>,
    booster: &GbTreeModel,
    num_class: usize,
) -> std::result::Result<usize, String> {
    let total = booster.trees.len();
    let Some(raw) = best_iteration else {
        return Ok(total);
    };
    let iterations = parse_count("best_iteration", raw)? + 1;

    let limit = match &booster.iteration_indptr {
        Some(indptr) if indptr.len() > 1 => indptr
            .get(iterations)
            .copied()
            .unwrap_or(*indptr.last().unwrap_or(&total)),
        _ => {
            let parallel = booster
                .gbtree_model_param
                .as_ref()
                .and_then(|p| p.num_parallel_tree.as_deref())
                .map(|p| parse_count("num_parallel_tree", p))
                .transpose()?
                .unwrap_or(1)
                .max(1);
            iterations.saturating_mul(num_class * parallel)
        }
    };
    Ok(limit.min(total))
}

fn softmax(margins: &[f32]) -> Vec<f32> {
    let max = margins.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = margins.iter().map(|m| (m - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
