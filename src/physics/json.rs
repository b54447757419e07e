//! physics3.json 加载器
//!
//! 解析为格式无关的 `RigDefinition`，再交给构建器。
//! 顶点的 Position 字段被忽略，静止位置总是由半径重新计算。

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::Deserialize;

use crate::{PhysicsError, Result};

use super::builder::{
    GroupDefinition, InputDefinition, OutputDefinition, ParticleDefinition, RigDefinition,
};
use super::normalize::ValueRange;
use super::rig::{Normalization, PhysicsRig};
use super::puppet_physics::PuppetPhysics;

/// 唯一支持的输入源/输出目标类型
const TARGET_PARAMETER: &str = "Parameter";

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PhysicsJson {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    meta: MetaJson,
    #[serde(default)]
    physics_settings: Vec<SettingJson>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct MetaJson {
    physics_setting_count: Option<usize>,
    total_input_count: Option<usize>,
    total_output_count: Option<usize>,
    vertex_count: Option<usize>,
    #[serde(default)]
    effective_forces: Option<EffectiveForcesJson>,
    fps: Option<f32>,
    #[serde(default)]
    physics_dictionary: Vec<DictionaryEntryJson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EffectiveForcesJson {
    gravity: Option<VectorJson>,
    wind: Option<VectorJson>,
}

#[derive(Deserialize, Clone, Copy)]
#[serde(rename_all = "PascalCase")]
struct VectorJson {
    x: f32,
    y: f32,
}

impl From<VectorJson> for Vec2 {
    fn from(v: VectorJson) -> Self {
        Vec2::new(v.x, v.y)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DictionaryEntryJson {
    id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SettingJson {
    id: String,
    #[serde(default)]
    input: Vec<InputJson>,
    #[serde(default)]
    output: Vec<OutputJson>,
    #[serde(default)]
    vertices: Vec<VertexJson>,
    normalization: NormalizationJson,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TargetJson {
    target: String,
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InputJson {
    source: TargetJson,
    weight: f32,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(default)]
    reflect: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OutputJson {
    destination: TargetJson,
    vertex_index: i64,
    scale: f32,
    weight: f32,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(default)]
    reflect: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VertexJson {
    mobility: f32,
    delay: f32,
    acceleration: f32,
    radius: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NormalizationJson {
    position: RangeJson,
    angle: RangeJson,
}

#[derive(Deserialize, Clone, Copy)]
#[serde(rename_all = "PascalCase")]
struct RangeJson {
    minimum: f32,
    default: f32,
    maximum: f32,
}

impl From<RangeJson> for ValueRange {
    fn from(r: RangeJson) -> Self {
        ValueRange::new(r.minimum, r.maximum, r.default)
    }
}

fn parameter_target(target: TargetJson) -> Result<String> {
    if target.target == TARGET_PARAMETER {
        Ok(target.id)
    } else {
        Err(PhysicsError::UnsupportedTarget { target: target.target })
    }
}

/// 解析 physics3.json 文本
pub fn parse_rig_definition(json: &str) -> Result<RigDefinition> {
    let file: PhysicsJson = serde_json::from_str(json)?;
    convert(file)
}

/// 解析 physics3.json 字节
pub fn parse_rig_definition_bytes(bytes: &[u8]) -> Result<RigDefinition> {
    let file: PhysicsJson = serde_json::from_slice(bytes)?;
    convert(file)
}

fn convert(file: PhysicsJson) -> Result<RigDefinition> {
    let meta = file.meta;
    let forces = meta.effective_forces.as_ref();

    let mut definition = RigDefinition {
        fps: meta.fps,
        ..Default::default()
    };
    if let Some(gravity) = forces.and_then(|f| f.gravity) {
        definition.gravity = gravity.into();
    }
    if let Some(wind) = forces.and_then(|f| f.wind) {
        definition.wind = wind.into();
    }

    definition.groups.reserve(file.physics_settings.len());
    for setting in file.physics_settings {
        let name = meta
            .physics_dictionary
            .iter()
            .find(|entry| entry.id == setting.id)
            .map(|entry| entry.name.clone());

        let inputs = setting
            .input
            .into_iter()
            .map(|input| {
                Ok(InputDefinition {
                    source: parameter_target(input.source)?,
                    kind: input.kind,
                    weight: input.weight,
                    reflect: input.reflect,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let outputs = setting
            .output
            .into_iter()
            .map(|output| {
                Ok(OutputDefinition {
                    destination: parameter_target(output.destination)?,
                    kind: output.kind,
                    particle_index: output.vertex_index,
                    scale: output.scale,
                    weight: output.weight,
                    reflect: output.reflect,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let particles = setting
            .vertices
            .into_iter()
            .map(|v| ParticleDefinition {
                mobility: v.mobility,
                delay: v.delay,
                acceleration: v.acceleration,
                radius: v.radius,
            })
            .collect();

        definition.groups.push(GroupDefinition {
            id: setting.id,
            name,
            normalization: Normalization {
                position: setting.normalization.position.into(),
                angle: setting.normalization.angle.into(),
            },
            inputs,
            outputs,
            particles,
        });
    }

    check_meta_counts(&meta, &definition);
    if let Some(version) = file.version {
        log::debug!("[Physics] physics3.json 版本 {}", version);
    }
    Ok(definition)
}

/// Meta 中的计数只用于核对，不一致只警告
fn check_meta_counts(meta: &MetaJson, definition: &RigDefinition) {
    let groups = &definition.groups;
    let actual = [
        ("PhysicsSettingCount", meta.physics_setting_count, groups.len()),
        (
            "TotalInputCount",
            meta.total_input_count,
            groups.iter().map(|g| g.inputs.len()).sum(),
        ),
        (
            "TotalOutputCount",
            meta.total_output_count,
            groups.iter().map(|g| g.outputs.len()).sum(),
        ),
        (
            "VertexCount",
            meta.vertex_count,
            groups.iter().map(|g| g.particles.len()).sum(),
        ),
    ];
    for (field, declared, counted) in actual {
        if let Some(declared) = declared {
            if declared != counted {
                log::warn!(
                    "[Physics] Meta.{} 声明 {}，实际 {}",
                    field,
                    declared,
                    counted
                );
            }
        }
    }
}

impl PhysicsRig {
    /// 从 physics3.json 文本构建
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_definition(&parse_rig_definition(json)?)
    }

    /// 从 physics3.json 字节构建
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_definition(&parse_rig_definition_bytes(bytes)?)
    }

    /// 从文件路径加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        Self::from_json_bytes(&bytes)
    }
}

impl PuppetPhysics {
    /// 从 physics3.json 文本创建物理引擎
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(PhysicsRig::from_json(json)?))
    }
}
