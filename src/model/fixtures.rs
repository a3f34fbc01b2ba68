//! Small hand-built estimators shared by unit tests

use super::{Estimator, LinearModel, Node, Objective, Tree, TreeEnsemble};

/// One stump over `a`, three inputs
pub fn binary_gbdt() -> Estimator {
    Estimator::GradientBoosting(TreeEnsemble {
        objective: Objective::Binary,
        num_features: 3,
        base_score: Vec::new(),
        trees: vec![Tree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                    default_left: true,
                },
                Node::Leaf { value: -2.0 },
                Node::Leaf { value: 2.0 },
            ],
        }],
        classes: Some(vec!["FALSE POSITIVE".into(), "CONFIRMED".into()]),
        feature_name: None,
    })
}

pub fn multiclass_gbdt() -> Estimator {
    Estimator::GradientBoosting(TreeEnsemble {
        objective: Objective::Multiclass { num_class: 3 },
        num_features: 2,
        base_score: Vec::new(),
        trees: vec![
            Tree::leaf(0.1),
            Tree::leaf(0.2),
            Tree {
                nodes: vec![
                    Node::Split {
                        feature: 0,
                        threshold: 1.0,
                        left: 1,
                        right: 2,
                        default_left: false,
                    },
                    Node::Leaf { value: 0.0 },
                    Node::Leaf { value: 1.0 },
                ],
            },
        ],
        classes: None,
        feature_name: None,
    })
}

pub fn regression_gbdt() -> Estimator {
    Estimator::GradientBoosting(TreeEnsemble {
        objective: Objective::Regression,
        num_features: 1,
        base_score: vec![0.5],
        trees: vec![Tree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 2.0,
                    left: 1,
                    right: 2,
                    default_left: true,
                },
                Node::Leaf { value: 0.0 },
                Node::Leaf { value: 1.0 },
            ],
        }],
        classes: None,
        feature_name: None,
    })
}

pub fn binary_logistic() -> Estimator {
    Estimator::LogisticRegression(LinearModel {
        coef: vec![vec![1.0, 1.0]],
        intercept: vec![-1.0],
        classes: None,
        feature_name: None,
    })
}

pub fn multiclass_logistic() -> Estimator {
    Estimator::LogisticRegression(LinearModel {
        coef: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]],
        intercept: vec![0.0, 0.0, 0.0],
        classes: Some(vec!["low".into(), "mid".into(), "high".into()]),
        feature_name: None,
    })
}

pub fn linear_regressor() -> Estimator {
    Estimator::LinearRegression(LinearModel {
        coef: vec![vec![2.0, -1.0]],
        intercept: vec![0.5],
        classes: None,
        feature_name: None,
    })
}
