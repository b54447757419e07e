//! 模型参数访问
//!
//! 物理只通过 `ParameterModel` 读写模型参数，不创建也不删除参数。
//! `ParameterTable` 是一个简单的内存实现，供没有自己模型类型的宿主和测试使用。

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 参数标识符（如 "ParamAngleX"）
///
/// 内部为 `Arc<str>`，克隆代价很低，可直接作为缓存键。
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId(Arc<str>);

impl ParameterId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParameterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParameterId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl Borrow<str> for ParameterId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// 已解析的参数句柄（由模型分配，物理只缓存不解释）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParameterHandle(usize);

impl ParameterHandle {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// 模型参数访问接口
pub trait ParameterModel {
    /// 按标识符解析参数句柄，不存在返回 None
    fn resolve_parameter(&self, id: &ParameterId) -> Option<ParameterHandle>;

    fn parameter_value(&self, handle: ParameterHandle) -> f32;

    fn parameter_minimum(&self, handle: ParameterHandle) -> f32;

    fn parameter_maximum(&self, handle: ParameterHandle) -> f32;

    fn parameter_default(&self, handle: ParameterHandle) -> f32;

    fn set_parameter_value(&mut self, handle: ParameterHandle, value: f32);
}

/// 单个参数记录
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub id: ParameterId,
    pub value: f32,
    pub minimum: f32,
    pub maximum: f32,
    pub default: f32,
}

/// 参数表（内存模型）
#[derive(Clone, Debug, Default)]
pub struct ParameterTable {
    parameters: Vec<Parameter>,
    id_to_index: HashMap<ParameterId, usize>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加参数，初始值为默认值
    ///
    /// 同名参数已存在时覆盖其范围并重置为默认值。
    pub fn add_parameter(
        &mut self,
        id: impl Into<ParameterId>,
        minimum: f32,
        maximum: f32,
        default: f32,
    ) -> ParameterHandle {
        let id = id.into();
        let parameter = Parameter {
            id: id.clone(),
            value: default,
            minimum,
            maximum,
            default,
        };
        if let Some(&index) = self.id_to_index.get(&id) {
            self.parameters[index] = parameter;
            return ParameterHandle(index);
        }
        let index = self.parameters.len();
        self.id_to_index.insert(id, index);
        self.parameters.push(parameter);
        ParameterHandle(index)
    }

    /// 通过标识符查找参数
    pub fn find_parameter(&self, id: &str) -> Option<ParameterHandle> {
        self.id_to_index.get(id).copied().map(ParameterHandle)
    }

    pub fn get(&self, handle: ParameterHandle) -> Option<&Parameter> {
        self.parameters.get(handle.0)
    }

    /// 按标识符读取当前值
    pub fn value_of(&self, id: &str) -> Option<f32> {
        self.find_parameter(id)
            .and_then(|h| self.get(h))
            .map(|p| p.value)
    }

    /// 按标识符设置当前值，参数不存在返回 false
    pub fn set_value(&mut self, id: &str, value: f32) -> bool {
        match self.find_parameter(id) {
            Some(handle) => {
                self.parameters[handle.0].value = value;
                true
            }
            None => false,
        }
    }

    /// 所有参数恢复默认值
    pub fn reset_all_values(&mut self) {
        for parameter in &mut self.parameters {
            parameter.value = parameter.default;
        }
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }
}

impl ParameterModel for ParameterTable {
    fn resolve_parameter(&self, id: &ParameterId) -> Option<ParameterHandle> {
        self.id_to_index.get(id).copied().map(ParameterHandle)
    }

    fn parameter_value(&self, handle: ParameterHandle) -> f32 {
        self.get(handle).map(|p| p.value).unwrap_or(0.0)
    }

    fn parameter_minimum(&self, handle: ParameterHandle) -> f32 {
        self.get(handle).map(|p| p.minimum).unwrap_or(0.0)
    }

    fn parameter_maximum(&self, handle: ParameterHandle) -> f32 {
        self.get(handle).map(|p| p.maximum).unwrap_or(0.0)
    }

    fn parameter_default(&self, handle: ParameterHandle) -> f32 {
        self.get(handle).map(|p| p.default).unwrap_or(0.0)
    }

    fn set_parameter_value(&mut self, handle: ParameterHandle, value: f32) {
        if let Some(parameter) = self.parameters.get_mut(handle.0) {
            parameter.value = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut table = ParameterTable::new();
        let angle = table.add_parameter("ParamAngleX", -30.0, 30.0, 0.0);
        let hair = table.add_parameter("ParamHairFront", -1.0, 1.0, 0.0);

        assert_ne!(angle, hair);
        assert_eq!(table.len(), 2);
        assert_eq!(table.find_parameter("ParamHairFront"), Some(hair));
        assert_eq!(table.resolve_parameter(&ParameterId::new("ParamAngleX")), Some(angle));
        assert_eq!(table.find_parameter("ParamMissing"), None);
        assert_eq!(table.parameter_maximum(angle), 30.0);
    }

    #[test]
    fn test_readd_overwrites_range() {
        let mut table = ParameterTable::new();
        let first = table.add_parameter("ParamBodyAngleX", -10.0, 10.0, 0.0);
        table.set_value("ParamBodyAngleX", 5.0);
        let second = table.add_parameter("ParamBodyAngleX", -20.0, 20.0, 1.0);

        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
        assert_eq!(table.value_of("ParamBodyAngleX"), Some(1.0));
        assert_eq!(table.parameter_minimum(second), -20.0);
    }

    #[test]
    fn test_set_and_reset_values() {
        let mut table = ParameterTable::new();
        let handle = table.add_parameter("ParamAngleZ", -30.0, 30.0, 0.0);

        assert!(table.set_value("ParamAngleZ", 12.5));
        assert!(!table.set_value("ParamUnknown", 1.0));
        assert_eq!(table.parameter_value(handle), 12.5);

        table.set_parameter_value(handle, -3.0);
        assert_eq!(table.value_of("ParamAngleZ"), Some(-3.0));

        table.reset_all_values();
        assert_eq!(table.value_of("ParamAngleZ"), Some(0.0));
    }

    #[test]
    fn test_stale_handle_is_harmless() {
        let mut table = ParameterTable::new();
        let stale = ParameterHandle::new(7);

        table.set_parameter_value(stale, 1.0);
        assert_eq!(table.parameter_value(stale), 0.0);
        assert!(table.is_empty());
    }
}
