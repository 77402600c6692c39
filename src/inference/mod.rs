//! Inference over trained artifacts.

pub mod predictor;

pub use predictor::{ClassScore, Prediction, Predictor};
