//! 2D 摆链物理引擎
//!
//! 用粒子摆链模拟头发、衣物、饰品等二次运动。
//! 由模型的主动画参数（头部角度、身体角度等）驱动，模拟结果每帧写回模型参数。
//!
//! 流程：physics3.json → RigDefinition → PhysicsRig → PuppetPhysics
//! 每帧 [advance: 采样输入 → 固定步长积分 → 提取输出 → 插值写回]

pub mod model;
pub mod physics;

pub use model::{Parameter, ParameterHandle, ParameterId, ParameterModel, ParameterTable};
pub use physics::{
    PhysicsConfig, PhysicsKind, PhysicsOptions, PhysicsRig, PuppetPhysics, RigDefinition,
};

/// 物理引擎错误类型
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("物理定义 JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 输入/输出类型标签不是 X / Y / Angle
    #[error("未知的物理类型标签: '{tag}'")]
    UnknownKind { tag: String },

    /// 输入源/输出目标不是 Parameter
    #[error("不支持的目标类型: '{target}'")]
    UnsupportedTarget { target: String },

    #[error("无效的物理定义: {0}")]
    InvalidDefinition(String),

    /// 模型中找不到引用的参数
    #[error("模型中不存在参数 '{0}'")]
    UnknownParameter(ParameterId),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;
