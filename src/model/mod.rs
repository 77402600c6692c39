//! CNN model for flower classification.

pub mod cnn;

pub use cnn::{Backbone, ConvBlock, FlowerNet, FlowerNetConfig};
