//! CIFAR-10 residual network architectures.
//!
//! Three models share the residual building block here:
//!
//! - `ResNet32`: the CIFAR-style ResNet (3 stages of 5 basic blocks,
//!   16/32/64 channels)
//! - `ResNet32` with squeeze-and-excitation enabled on every block
//! - `MultiScaleResNet34`: an ImageNet-style ResNet-34 trunk whose head
//!   pools and concatenates the last three stage outputs before the
//!   final linear layer

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};

/// Anything the training loop can fit: takes a `[batch, 3, 32, 32]`
/// image tensor, produces `[batch, num_classes]` logits.
pub trait Classifier<B: Backend> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;
}

fn conv3x3<B: Backend>(
    in_channels: usize,
    out_channels: usize,
    stride: usize,
    device: &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [3, 3])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .with_bias(false)
        .init(device)
}

/// Squeeze-and-excitation gate: global pool, bottleneck MLP, sigmoid,
/// channel-wise rescale.
#[derive(Module, Debug)]
pub struct SeBlock<B: Backend> {
    pool: AdaptiveAvgPool2d,
    fc1: Linear<B>,
    fc2: Linear<B>,
}

impl<B: Backend> SeBlock<B> {
    const REDUCTION: usize = 16;

    pub fn new(channels: usize, device: &B::Device) -> Self {
        let hidden = (channels / Self::REDUCTION).max(1);
        Self {
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc1: LinearConfig::new(channels, hidden).init(device),
            fc2: LinearConfig::new(hidden, channels).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch, channels, _, _] = x.dims();

        let scale = self.pool.forward(x.clone()).reshape([batch, channels]);
        let scale = Relu::new().forward(self.fc1.forward(scale));
        let scale = sigmoid(self.fc2.forward(scale));

        x * scale.reshape([batch, channels, 1, 1])
    }
}

/// 1x1 projection used on shortcuts that change resolution or channel
/// count.
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
}

impl<B: Backend> Downsample<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([in_channels, out_channels], [1, 1])
                .with_stride([stride, stride])
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(out_channels).init(device),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// Two 3x3 convolutions with a shortcut. The shortcut is a projection
/// whenever the block changes resolution or channel count.
#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    downsample: Option<Downsample<B>>,
    se: Option<SeBlock<B>>,
}

impl<B: Backend> BasicBlock<B> {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        se: bool,
        device: &B::Device,
    ) -> Self {
        let downsample = (stride != 1 || in_channels != out_channels)
            .then(|| Downsample::new(in_channels, out_channels, stride, device));

        Self {
            conv1: conv3x3(in_channels, out_channels, stride, device),
            bn1: BatchNormConfig::new(out_channels).init(device),
            conv2: conv3x3(out_channels, out_channels, 1, device),
            bn2: BatchNormConfig::new(out_channels).init(device),
            downsample,
            se: se.then(|| SeBlock::new(out_channels, device)),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let shortcut = match &self.downsample {
            Some(downsample) => downsample.forward(x.clone()),
            None => x.clone(),
        };

        let out = Relu::new().forward(self.bn1.forward(self.conv1.forward(x)));
        let out = self.bn2.forward(self.conv2.forward(out));

        let out = match &self.se {
            Some(se) => se.forward(out),
            None => out,
        };

        Relu::new().forward(out + shortcut)
    }
}

fn make_stage<B: Backend>(
    in_channels: usize,
    out_channels: usize,
    blocks: usize,
    stride: usize,
    se: bool,
    device: &B::Device,
) -> Vec<BasicBlock<B>> {
    let mut stage = Vec::with_capacity(blocks);
    stage.push(BasicBlock::new(in_channels, out_channels, stride, se, device));
    for _ in 1..blocks {
        stage.push(BasicBlock::new(out_channels, out_channels, 1, se, device));
    }
    stage
}

fn forward_stage<B: Backend>(stage: &[BasicBlock<B>], x: Tensor<B, 4>) -> Tensor<B, 4> {
    stage.iter().fold(x, |x, block| block.forward(x))
}

#[derive(Config, Debug)]
pub struct ResNet32Config {
    #[config(default = "10")]
    pub num_classes: usize,

    /// Enable squeeze-and-excitation on every residual block.
    #[config(default = "false")]
    pub se: bool,
}

/// CIFAR-style ResNet-32: a 16-channel stem followed by three stages of
/// five basic blocks at 16, 32, and 64 channels.
#[derive(Module, Debug)]
pub struct ResNet32<B: Backend> {
    stem_conv: Conv2d<B>,
    stem_bn: BatchNorm<B, 2>,
    stage1: Vec<BasicBlock<B>>,
    stage2: Vec<BasicBlock<B>>,
    stage3: Vec<BasicBlock<B>>,
    pool: AdaptiveAvgPool2d,
    head: Linear<B>,
}

impl ResNet32Config {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet32<B> {
        ResNet32 {
            stem_conv: conv3x3(3, 16, 1, device),
            stem_bn: BatchNormConfig::new(16).init(device),
            stage1: make_stage(16, 16, 5, 1, self.se, device),
            stage2: make_stage(16, 32, 5, 2, self.se, device),
            stage3: make_stage(32, 64, 5, 2, self.se, device),
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            head: LinearConfig::new(64, self.num_classes).init(device),
        }
    }
}

impl<B: Backend> Classifier<B> for ResNet32<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = Relu::new().forward(self.stem_bn.forward(self.stem_conv.forward(images)));

        let x = forward_stage(&self.stage1, x);
        let x = forward_stage(&self.stage2, x);
        let x = forward_stage(&self.stage3, x);

        let x = self.pool.forward(x);
        let [batch, channels, _, _] = x.dims();
        self.head.forward(x.reshape([batch, channels]))
    }
}

#[derive(Config, Debug)]
pub struct MultiScaleResNet34Config {
    #[config(default = "10")]
    pub num_classes: usize,
}

/// ResNet-34 trunk with a multi-scale head: the outputs of the last
/// three stages are each globally pooled, concatenated, and fed to a
/// single linear layer.
#[derive(Module, Debug)]
pub struct MultiScaleResNet34<B: Backend> {
    stem_conv: Conv2d<B>,
    stem_bn: BatchNorm<B, 2>,
    stage1: Vec<BasicBlock<B>>,
    stage2: Vec<BasicBlock<B>>,
    stage3: Vec<BasicBlock<B>>,
    stage4: Vec<BasicBlock<B>>,
    pool: AdaptiveAvgPool2d,
    head: Linear<B>,
}

impl MultiScaleResNet34Config {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MultiScaleResNet34<B> {
        MultiScaleResNet34 {
            stem_conv: conv3x3(3, 64, 1, device),
            stem_bn: BatchNormConfig::new(64).init(device),
            stage1: make_stage(64, 64, 3, 1, false, device),
            stage2: make_stage(64, 128, 4, 2, false, device),
            stage3: make_stage(128, 256, 6, 2, false, device),
            stage4: make_stage(256, 512, 3, 2, false, device),
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            // 128 + 256 + 512 pooled features
            head: LinearConfig::new(896, self.num_classes).init(device),
        }
    }
}

impl<B: Backend> MultiScaleResNet34<B> {
    fn pool_flat(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(x);
        let [batch, channels, _, _] = x.dims();
        x.reshape([batch, channels])
    }
}

impl<B: Backend> Classifier<B> for MultiScaleResNet34<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = Relu::new().forward(self.stem_bn.forward(self.stem_conv.forward(images)));

        let x = forward_stage(&self.stage1, x);
        let s2 = forward_stage(&self.stage2, x);
        let s3 = forward_stage(&self.stage3, s2.clone());
        let s4 = forward_stage(&self.stage4, s3.clone());

        let features = Tensor::cat(
            vec![self.pool_flat(s2), self.pool_flat(s3), self.pool_flat(s4)],
            1,
        );
        self.head.forward(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_resnet32_output_shape() {
        let device = Default::default();
        let model = ResNet32Config::new().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        assert_eq!(model.forward(input).dims(), [2, 10]);
    }

    #[test]
    fn test_se_resnet32_output_shape() {
        let device = Default::default();
        let model = ResNet32Config::new()
            .with_se(true)
            .init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 32], &device);
        assert_eq!(model.forward(input).dims(), [1, 10]);
    }

    #[test]
    fn test_multiscale_resnet34_output_shape() {
        let device = Default::default();
        let model = MultiScaleResNet34Config::new().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 32], &device);
        assert_eq!(model.forward(input).dims(), [1, 10]);
    }

    #[test]
    fn test_se_block_keeps_shape() {
        let device = Default::default();
        let se = SeBlock::<TestBackend>::new(32, &device);

        let input = Tensor::<TestBackend, 4>::ones([2, 32, 8, 8], &device);
        assert_eq!(se.forward(input).dims(), [2, 32, 8, 8]);
    }
}
