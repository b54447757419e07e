//! 物理骨架构建
//!
//! 按定义顺序逐组追加输入、输出、粒子到平铺数组，
//! 每组的起始索引取追加前的累计数量；全部追加后统一初始化静止位置。

use glam::Vec2;

use crate::model::ParameterId;
use crate::{PhysicsError, Result};

use super::config::{DEFAULT_GRAVITY, DEFAULT_WIND, MAXIMUM_WEIGHT, MAX_DELTA_TIME};
use super::math::normalize_gravity;
use super::normalize::ValueRange;
use super::rig::{
    Normalization, PhysicsGroup, PhysicsInput, PhysicsKind, PhysicsOutput, PhysicsParticle,
    PhysicsRig,
};
use super::strategy::{input_strategy, output_strategy};

// ============================================================================
// 格式无关的定义
// ============================================================================

/// 整个模型的物理定义
#[derive(Clone, Debug, PartialEq)]
pub struct RigDefinition {
    pub gravity: Vec2,
    pub wind: Vec2,
    /// 固定模拟频率，None 表示跟随渲染帧
    pub fps: Option<f32>,
    pub groups: Vec<GroupDefinition>,
}

impl Default for RigDefinition {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            wind: DEFAULT_WIND,
            fps: None,
            groups: Vec::new(),
        }
    }
}

/// 单个物理组的定义
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupDefinition {
    pub id: String,
    pub name: Option<String>,
    pub normalization: Normalization,
    pub inputs: Vec<InputDefinition>,
    pub outputs: Vec<OutputDefinition>,
    pub particles: Vec<ParticleDefinition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputDefinition {
    pub source: String,
    /// 类型标签："X" / "Y" / "Angle"
    pub kind: String,
    pub weight: f32,
    pub reflect: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutputDefinition {
    pub destination: String,
    /// 类型标签："X" / "Y" / "Angle"
    pub kind: String,
    /// 组内粒子索引，负数在运行时视为无效
    pub particle_index: i64,
    pub scale: f32,
    pub weight: f32,
    pub reflect: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleDefinition {
    pub mobility: f32,
    pub delay: f32,
    pub acceleration: f32,
    pub radius: f32,
}

// ============================================================================
// 构建器
// ============================================================================

/// 物理骨架构建器
#[derive(Debug)]
pub struct RigBuilder {
    groups: Vec<PhysicsGroup>,
    inputs: Vec<PhysicsInput>,
    outputs: Vec<PhysicsOutput>,
    particles: Vec<PhysicsParticle>,
    gravity: Vec2,
    wind: Vec2,
    fps: Option<f32>,
}

impl Default for RigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RigBuilder {
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            particles: Vec::new(),
            gravity: DEFAULT_GRAVITY,
            wind: DEFAULT_WIND,
            fps: None,
        }
    }

    /// 设置外力（重力归一化为单位方向）
    pub fn forces(mut self, gravity: Vec2, wind: Vec2) -> Self {
        self.gravity = normalize_gravity(gravity);
        self.wind = wind;
        self
    }

    /// 设置固定模拟频率，非正值或非有限值视为未设置
    ///
    /// 步长在最大追帧时间处无法用 f32 分辨的频率也视为未设置（退回按渲染帧推进）。
    pub fn tick_rate(mut self, fps: Option<f32>) -> Self {
        self.fps = fps.filter(|f| f.is_finite() && *f > 0.0);
        if let Some(fps) = self.fps {
            if MAX_DELTA_TIME - 1.0 / fps >= MAX_DELTA_TIME {
                log::warn!("[Physics] FPS={} 过高，步长无法分辨，忽略固定频率", fps);
                self.fps = None;
            }
        }
        self
    }

    /// 追加一个组，返回组索引
    ///
    /// 先校验整组再追加，失败时构建器保持原状。
    pub fn add_group(&mut self, definition: &GroupDefinition) -> Result<usize> {
        let context = definition.id.as_str();
        check_range(context, "Normalization.Position", &definition.normalization.position)?;
        check_range(context, "Normalization.Angle", &definition.normalization.angle)?;

        let mut inputs = Vec::with_capacity(definition.inputs.len());
        for input in &definition.inputs {
            let kind = PhysicsKind::from_tag(&input.kind)?;
            check_finite(context, "Input.Weight", input.weight)?;
            warn_weight(context, &input.source, input.weight);
            inputs.push(PhysicsInput {
                source: ParameterId::new(&input.source),
                source_handle: None,
                kind,
                weight: input.weight,
                reflect: input.reflect,
                accumulate: input_strategy(kind),
            });
        }

        let mut outputs = Vec::with_capacity(definition.outputs.len());
        for output in &definition.outputs {
            let kind = PhysicsKind::from_tag(&output.kind)?;
            check_finite(context, "Output.Scale", output.scale)?;
            check_finite(context, "Output.Weight", output.weight)?;
            warn_weight(context, &output.destination, output.weight);

            let particle_index = usize::try_from(output.particle_index).unwrap_or(0);
            if particle_index < 1 || particle_index >= definition.particles.len() {
                log::warn!(
                    "[Physics] 组 '{}' 的输出 '{}' 粒子索引 {} 超出范围 [1, {})，运行时将跳过",
                    context,
                    output.destination,
                    output.particle_index,
                    definition.particles.len()
                );
            }

            outputs.push(PhysicsOutput {
                destination: ParameterId::new(&output.destination),
                destination_handle: None,
                kind,
                particle_index,
                scale: output.scale,
                weight: output.weight,
                reflect: output.reflect,
                value_below_minimum: 0.0,
                value_exceeded_maximum: 0.0,
                strategy: output_strategy(kind),
            });
        }

        let mut particles = Vec::with_capacity(definition.particles.len());
        for particle in &definition.particles {
            check_finite(context, "Vertex.Mobility", particle.mobility)?;
            check_finite(context, "Vertex.Delay", particle.delay)?;
            check_finite(context, "Vertex.Acceleration", particle.acceleration)?;
            check_finite(context, "Vertex.Radius", particle.radius)?;
            if particle.radius < 0.0 {
                return Err(PhysicsError::InvalidDefinition(format!(
                    "组 '{}' 的粒子半径为负数: {}",
                    context, particle.radius
                )));
            }
            particles.push(PhysicsParticle::new(
                particle.mobility,
                particle.delay,
                particle.acceleration,
                particle.radius,
            ));
        }

        if particles.is_empty() {
            log::warn!("[Physics] 组 '{}' 没有粒子，将不参与模拟", context);
        }

        let group = PhysicsGroup {
            id: definition.id.clone(),
            name: definition.name.clone(),
            normalization: definition.normalization,
            base_input_index: self.inputs.len(),
            input_count: inputs.len(),
            base_output_index: self.outputs.len(),
            output_count: outputs.len(),
            base_particle_index: self.particles.len(),
            particle_count: particles.len(),
        };

        self.inputs.extend(inputs);
        self.outputs.extend(outputs);
        self.particles.extend(particles);
        self.groups.push(group);
        Ok(self.groups.len() - 1)
    }

    /// 完成构建并初始化静止位置
    pub fn build(self) -> PhysicsRig {
        let mut rig = PhysicsRig {
            groups: self.groups,
            inputs: self.inputs,
            outputs: self.outputs,
            particles: self.particles,
            gravity: self.gravity,
            wind: self.wind,
            fps: self.fps,
        };
        rig.initialize();
        debug_assert!(rig.ranges_are_contiguous());

        log::info!(
            "[Physics] 物理骨架构建完成: {} 组, {} 输入, {} 输出, {} 粒子, FPS={:?}",
            rig.groups.len(),
            rig.inputs.len(),
            rig.outputs.len(),
            rig.particles.len(),
            rig.fps
        );
        rig
    }
}

impl PhysicsRig {
    /// 从格式无关的定义构建
    pub fn from_definition(definition: &RigDefinition) -> Result<Self> {
        let mut builder = RigBuilder::new()
            .forces(definition.gravity, definition.wind)
            .tick_rate(definition.fps);
        for group in &definition.groups {
            builder.add_group(group)?;
        }
        Ok(builder.build())
    }
}

fn check_finite(context: &str, field: &str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidDefinition(format!(
            "组 '{}' 的 {} 不是有限数值: {}",
            context, field, value
        )))
    }
}

fn check_range(context: &str, field: &str, range: &ValueRange) -> Result<()> {
    check_finite(context, field, range.minimum)?;
    check_finite(context, field, range.maximum)?;
    check_finite(context, field, range.default)
}

fn warn_weight(context: &str, parameter: &str, weight: f32) {
    if !(0.0..=MAXIMUM_WEIGHT).contains(&weight) {
        log::warn!(
            "[Physics] 组 '{}' 中参数 '{}' 的权重 {} 超出 [0, {}]",
            context,
            parameter,
            weight,
            MAXIMUM_WEIGHT
        );
    }
}
