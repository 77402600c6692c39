//! CNN architecture for flower classification.
//!
//! The network is split into a convolutional `Backbone` and a small linear
//! head. The backbone can be initialized from a record of pretrained
//! weights and frozen during training, leaving only the head trainable
//! (transfer learning). Freezing works by detaching the backbone output
//! from the autodiff graph, so no backbone gradients are computed.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the flower classifier
#[derive(Config, Debug)]
pub struct FlowerNetConfig {
    /// Number of output classes
    #[config(default = 8)]
    pub num_classes: usize,

    /// Input image size (assumes square images)
    #[config(default = 180)]
    pub input_size: usize,

    /// Dropout rate before the classification head
    #[config(default = 0.2)]
    pub dropout: f64,

    /// Number of input channels (3 for RGB)
    #[config(default = 3)]
    pub in_channels: usize,

    /// Base number of convolutional filters
    #[config(default = 32)]
    pub base_filters: usize,
}

/// A CNN block with Conv2d, ReLU, and optional MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub relu: Relu,
    pub pool: Option<MaxPool2d>,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        with_pool: bool,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        let pool = if with_pool {
            Some(MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init())
        } else {
            None
        };

        Self {
            conv,
            relu: Relu::new(),
            pool,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.relu.forward(x);

        match &self.pool {
            Some(pool) => pool.forward(x),
            None => x,
        }
    }
}

/// Convolutional feature extractor.
///
/// Four blocks with doubling widths followed by global average pooling,
/// producing a flat feature vector per image. Kept as its own module so
/// pretrained weights can be loaded into it independently of the head.
#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub conv4: ConvBlock<B>,
    pub global_pool: AdaptiveAvgPool2d,
}

impl<B: Backend> Backbone<B> {
    pub fn new(config: &FlowerNetConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        // Widths: 3 -> 32 -> 64 -> 128 -> 256 at the default base
        let conv1 = ConvBlock::new(config.in_channels, base, 3, true, device);
        let conv2 = ConvBlock::new(base, base * 2, 3, true, device);
        let conv3 = ConvBlock::new(base * 2, base * 4, 3, true, device);
        let conv4 = ConvBlock::new(base * 4, base * 8, 3, true, device);

        let global_pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();

        Self {
            conv1,
            conv2,
            conv3,
            conv4,
            global_pool,
        }
    }

    /// Feature dimension produced for a given configuration
    pub fn feature_dim(config: &FlowerNetConfig) -> usize {
        config.base_filters * 8
    }

    /// Extract features: [B, 3, H, W] -> [B, feature_dim]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);

        // [B, C, H, W] -> [B, C, 1, 1] -> [B, C]
        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        x.reshape([batch_size, channels])
    }
}

/// Flower classifier: backbone features, dropout, linear head.
#[derive(Module, Debug)]
pub struct FlowerNet<B: Backend> {
    pub backbone: Backbone<B>,
    pub dropout: Dropout,
    pub head: Linear<B>,
}

impl<B: Backend> FlowerNet<B> {
    /// Create a new classifier from configuration
    pub fn new(config: &FlowerNetConfig, device: &B::Device) -> Self {
        let backbone = Backbone::new(config, device);
        let dropout = DropoutConfig::new(config.dropout).init();
        let head = LinearConfig::new(Backbone::<B>::feature_dim(config), config.num_classes)
            .init(device);

        Self {
            backbone,
            dropout,
            head,
        }
    }

    /// Replace the backbone, keeping the head. Used when loading
    /// pretrained feature-extractor weights.
    pub fn with_backbone(mut self, backbone: Backbone<B>) -> Self {
        self.backbone = backbone;
        self
    }

    /// Forward pass: [B, 3, H, W] -> logits [B, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.backbone.forward(x);
        self.forward_head(features)
    }

    /// Forward pass with the backbone detached from the autodiff graph.
    ///
    /// Gradients flow into the head only, so an optimizer step leaves the
    /// backbone weights untouched.
    pub fn forward_frozen(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.backbone.forward(x).detach();
        self.forward_head(features)
    }

    /// Classification head over extracted features
    pub fn forward_head(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.dropout.forward(features);
        self.head.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;

    #[test]
    fn test_flower_net_output_shape() {
        let device = Default::default();
        let config = FlowerNetConfig::new();
        let model = FlowerNet::<DefaultBackend>::new(&config, &device);

        // Small spatial size keeps the test fast; the architecture is
        // size-agnostic thanks to global pooling.
        let input = Tensor::<DefaultBackend, 4>::zeros([2, 3, 32, 32], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 8]);
    }

    #[test]
    fn test_custom_class_count() {
        let device = Default::default();
        let config = FlowerNetConfig::new().with_num_classes(5).with_base_filters(8);
        let model = FlowerNet::<DefaultBackend>::new(&config, &device);

        let input = Tensor::<DefaultBackend, 4>::zeros([1, 3, 32, 32], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [1, 5]);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let device = Default::default();
        let config = FlowerNetConfig::new().with_base_filters(4);
        let model = FlowerNet::<DefaultBackend>::new(&config, &device);

        let input = Tensor::<DefaultBackend, 4>::ones([1, 3, 32, 32], &device);
        let probs: Vec<f32> = model
            .forward_softmax(input)
            .into_data()
            .to_vec()
            .unwrap();

        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(probs.iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn test_backbone_feature_dim() {
        let config = FlowerNetConfig::new().with_base_filters(16);
        assert_eq!(Backbone::<DefaultBackend>::feature_dim(&config), 128);
    }
}
