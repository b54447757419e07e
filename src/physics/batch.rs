//! 多模型批量推进
//!
//! 每个实例独占自己的物理引擎与模型，实例之间没有共享状态，
//! 开启 `parallel` 特性时用 rayon 并行推进。

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::model::ParameterModel;
use crate::Result;

use super::puppet_physics::PuppetPhysics;

/// 一个模型及其物理引擎
#[derive(Clone, Debug)]
pub struct PhysicsInstance<M> {
    pub physics: PuppetPhysics,
    pub model: M,
}

impl<M: ParameterModel> PhysicsInstance<M> {
    pub fn new(physics: PuppetPhysics, model: M) -> Self {
        Self { physics, model }
    }

    /// 推进本实例一帧，返回执行的固定步数
    pub fn advance(&mut self, delta_time: f32) -> Result<u32> {
        self.physics.advance(&mut self.model, delta_time)
    }
}

/// 推进所有实例一帧，结果按实例顺序返回
///
/// 某个实例出错不影响其他实例。
pub fn advance_all<M>(instances: &mut [PhysicsInstance<M>], delta_time: f32) -> Vec<Result<u32>>
where
    M: ParameterModel + Send,
{
    #[cfg(feature = "parallel")]
    {
        instances
            .par_iter_mut()
            .map(|instance| instance.advance(delta_time))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        instances
            .iter_mut()
            .map(|instance| instance.advance(delta_time))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParameterTable;
    use crate::physics::json::tests::HAIR_JSON;
    use crate::PhysicsError;

    fn hair_instance(with_back: bool) -> PhysicsInstance<ParameterTable> {
        let mut model = ParameterTable::new();
        model.add_parameter("ParamAngleX", -30.0, 30.0, 0.0);
        model.add_parameter("ParamAngleZ", -30.0, 30.0, 0.0);
        model.add_parameter("ParamHairFront", -1.0, 1.0, 0.0);
        if with_back {
            model.add_parameter("ParamHairBack", -1.0, 1.0, 0.0);
        }
        PhysicsInstance::new(PuppetPhysics::from_json(HAIR_JSON).unwrap(), model)
    }

    #[test]
    fn test_instances_advance_independently() {
        let mut instances = vec![hair_instance(true), hair_instance(false), hair_instance(true)];

        let results = advance_all(&mut instances, 1.0 / 30.0);
        assert_eq!(results.len(), 3);
        assert_eq!(*results[0].as_ref().unwrap(), 1);
        assert!(matches!(&results[1], Err(PhysicsError::UnknownParameter(id)) if id.as_str() == "ParamHairBack"));
        assert_eq!(*results[2].as_ref().unwrap(), 1);

        // 只移动第三个模型的头部，前髪随之摆动，其他模型不受影响
        instances[2].model.set_value("ParamAngleX", 25.0);
        for _ in 0..5 {
            let results = advance_all(&mut instances, 1.0 / 30.0);
            assert!(results[0].is_ok() && results[2].is_ok());
        }
        assert_eq!(instances[0].model.value_of("ParamHairFront"), Some(0.0));
        assert_ne!(instances[2].model.value_of("ParamHairFront"), Some(0.0));
    }

    #[test]
    fn test_empty_batch() {
        let mut instances: Vec<PhysicsInstance<ParameterTable>> = Vec::new();
        assert!(advance_all(&mut instances, 1.0 / 60.0).is_empty());
    }
}
