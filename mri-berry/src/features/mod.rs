//! 单个受试者的特征提取.
//!
//! 四组特征分别由 [`SpatialExtractor`], [`TumorExtractor`], [`StatisticalExtractor`]
//! 和 [`TextureExtractor`] 计算, 最终由 [`assemble`] 合并成一条 [`FeatureRecord`].
//!
//! 所有提取器都是无状态的值对象, 不修改输入, 且从不返回错误:
//! 输入体数据缺失时, 通过 [`VolumeExtractor::extract_or_missing`] 得到形状完整,
//! 取值全为 NaN 的结果.

use log::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod assemble;
pub mod spatial;
pub mod statistical;
pub mod texture;
pub mod tumor;

pub use assemble::{assemble, FeatureRecord};
pub use spatial::{brain_centre_of_mass, SpatialExtractor};
pub use statistical::{IntensityStats, StatisticalExtractor};
pub use texture::{Glcm, TextureExtractor, TextureProp};
pub use tumor::TumorExtractor;

/// 有序的 `特征名 -> 值` 映射. 插入顺序即输出列顺序.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FeatureMap(Vec<(String, f64)>);

impl FeatureMap {
    /// 空映射.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 预留 `n` 个条目的空映射.
    #[inline]
    pub fn with_capacity(n: usize) -> Self {
        Self(Vec::with_capacity(n))
    }

    /// 插入条目. 键已存在时覆盖旧值 (位置不变).
    pub fn insert<S: Into<String>>(&mut self, key: S, value: f64) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key, value)),
        }
    }

    /// 合并另一个映射, 后者覆盖前者.
    pub fn merge(&mut self, other: FeatureMap) {
        for (k, v) in other.0 {
            self.insert(k, v);
        }
    }

    /// 按键取值.
    #[inline]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    /// 按插入顺序迭代.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, f64)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// 按插入顺序迭代键.
    #[inline]
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// 条目个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 取值为 NaN 的条目个数.
    #[inline]
    pub fn nan_count(&self) -> usize {
        self.0.iter().filter(|(_, v)| v.is_nan()).count()
    }

    /// 给每个键加上 `{prefix}_` 前缀.
    pub fn prefixed(self, prefix: &str) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|(k, v)| (format!("{prefix}_{k}"), v))
                .collect(),
        )
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureMap {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        let mut ans = Self::new();
        for (k, v) in iter {
            ans.insert(k, v);
        }
        ans
    }
}

impl IntoIterator for FeatureMap {
    type Item = (String, f64);
    type IntoIter = std::vec::IntoIter<(String, f64)>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// 从单个体数据 (序列或分割) 提取一组特征.
pub trait VolumeExtractor {
    /// 输入体数据类型.
    type Input: ?Sized;

    /// 提取器名称, 用于日志.
    fn name(&self) -> &str;

    /// 提取特征. 不修改输入, 不失败.
    fn extract(&self, input: &Self::Input) -> FeatureMap;

    /// 输入缺失时的结果: 与 `extract` 键相同, 值全为 NaN.
    fn missing(&self) -> FeatureMap;

    /// 输入存在则提取, 否则打印警告并返回 [`Self::missing`].
    fn extract_or_missing(&self, input: Option<&Self::Input>) -> FeatureMap {
        match input {
            Some(v) => self.extract(v),
            None => {
                warn!("Volume absent, `{}` features are reported as NaN", self.name());
                self.missing()
            }
        }
    }
}

/// 三个分量全为 NaN 的坐标.
pub(crate) const NAN3: [f64; 3] = [f64::NAN; 3];

#[cfg(test)]
pub(crate) mod test_util {
    /// 浮点数近似相等. 两者同为 NaN 时也视为相等.
    pub fn f64_eq(a: f64, b: f64) -> bool {
        (a.is_nan() && b.is_nan()) || (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_map_order() {
        let mut m: FeatureMap = [("b", 1.0), ("a", 2.0)].into_iter().collect();
        m.insert("b", 3.0);
        m.insert("c", f64::NAN);
        assert_eq!(m.keys().collect::<Vec<_>>(), ["b", "a", "c"]);
        assert_eq!(m.get("b"), Some(3.0));
        assert_eq!(m.nan_count(), 1);

        let p = m.prefixed("t1");
        assert_eq!(p.get("t1_a"), Some(2.0));
        assert_eq!(p.get("a"), None);
    }
}
