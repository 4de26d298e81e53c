//! 显式配置结构. 所有提取器都从参数获得配置, 不依赖全局状态.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use once_cell::sync::Lazy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::label::{BACKGROUND, EDEMA, ENHANCING, NECROSIS};
use crate::{Error, MriLabel, Result};

/// BraTS 缺省标签表: `0 -> BKG, 1 -> EDE, 2 -> ENH, 3 -> NEC`.
pub static BRATS_LABELS: Lazy<LabelMap> = Lazy::new(|| {
    LabelMap::new([
        (BACKGROUND, "BKG"),
        (EDEMA, "EDE"),
        (ENHANCING, "ENH"),
        (NECROSIS, "NEC"),
    ])
});

/// 标签值到区域名的有序映射. 顺序即输出特征与 one-hot 通道的顺序.
///
/// 重复的标签值只保留第一次出现的条目.
///
/// JSON 中既可以写成有序的 `[[0, "BKG"], [1, "EDE"]]`, 也可以写成对象
/// `{"0": "BKG", "1": "EDE"}`. 后者按标签值升序排列.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "LabelMapRepr", into = "Vec<(u8, String)>"))]
pub struct LabelMap {
    entries: Vec<(u8, String)>,
}

impl From<LabelMap> for Vec<(u8, String)> {
    fn from(m: LabelMap) -> Self {
        m.entries
    }
}

/// [`LabelMap`] 的两种 JSON 写法.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelMapRepr {
    Pairs(Vec<(u8, String)>),
    // untagged 缓冲后的对象键总是字符串, 需要自行解析.
    Object(std::collections::BTreeMap<String, String>),
}

#[cfg(feature = "serde")]
impl TryFrom<LabelMapRepr> for LabelMap {
    type Error = std::num::ParseIntError;

    fn try_from(r: LabelMapRepr) -> std::result::Result<Self, Self::Error> {
        match r {
            LabelMapRepr::Pairs(v) => Ok(Self::new(v)),
            LabelMapRepr::Object(m) => {
                let mut v = m
                    .into_iter()
                    .map(|(k, name)| Ok((k.trim().parse::<u8>()?, name)))
                    .collect::<std::result::Result<Vec<_>, Self::Error>>()?;
                v.sort_by_key(|(id, _)| *id);
                Ok(Self::new(v))
            }
        }
    }
}

impl Default for LabelMap {
    #[inline]
    fn default() -> Self {
        BRATS_LABELS.clone()
    }
}

impl LabelMap {
    /// 由 `(标签值, 名称)` 序列构建.
    pub fn new<I, S>(it: I) -> Self
    where
        I: IntoIterator<Item = (u8, S)>,
        S: Into<String>,
    {
        let mut seen = [false; 256];
        let mut entries = Vec::new();
        for (id, name) in it {
            if std::mem::replace(&mut seen[id as usize], true) {
                warn!("Duplicate label id {id} ignored");
                continue;
            }
            entries.push((id, name.into()));
        }
        Self { entries }
    }

    /// 条目个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按顺序迭代 `(标签值, 名称)`.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (u8, &str)> + '_ {
        self.entries.iter().map(|(id, name)| (*id, name.as_str()))
    }

    /// 按顺序迭代标签值.
    #[inline]
    pub fn ids(&self) -> impl ExactSizeIterator<Item = u8> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// 查找标签名.
    pub fn name_of(&self, id: u8) -> Option<&str> {
        self.iter().find(|(i, _)| *i == id).map(|(_, n)| n)
    }

    /// 用于生成特征键的小写标签名.
    #[inline]
    pub fn key_of(&self, id: u8) -> Option<String> {
        self.name_of(id).map(str::to_lowercase)
    }

    /// 以每个标签为一个区域. `skip_background` 为真时去掉背景, 保持名称与通道对齐.
    pub fn regions(&self, skip_background: bool) -> Vec<Region> {
        self.iter()
            .filter(|(id, _)| !(skip_background && *id == BACKGROUND))
            .map(|(id, name)| Region::single(name, id))
            .collect()
    }
}

/// 一个 one-hot 通道所覆盖的标签.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum LabelSpec {
    /// 单个标签.
    Single(u8),
    /// 若干标签合并为一个区域, 例如肿瘤核心 = 增强 ∪ 坏死.
    Group(Vec<u8>),
}

impl LabelSpec {
    /// 标签 `p` 是否属于该区域?
    #[inline]
    pub fn contains(&self, p: u8) -> bool {
        match self {
            Self::Single(v) => *v == p,
            Self::Group(vs) => vs.contains(&p),
        }
    }

    /// 该区域是否就是背景本身? 包含背景的组合区域不算.
    #[inline]
    pub fn is_background(&self) -> bool {
        matches!(self, Self::Single(BACKGROUND))
    }

    /// 256 项查找表, 属于该区域的标签处为 1.
    pub fn lut(&self) -> [u8; 256] {
        let mut lut = [0u8; 256];
        match self {
            Self::Single(v) => lut[*v as usize] = 1,
            Self::Group(vs) => vs.iter().for_each(|v| lut[*v as usize] = 1),
        }
        lut
    }
}

/// 带名称的评估区域.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    /// 区域名.
    pub name: String,
    /// 区域覆盖的标签.
    pub spec: LabelSpec,
}

impl Region {
    /// 单标签区域.
    #[inline]
    pub fn single<S: Into<String>>(name: S, label: u8) -> Self {
        Self {
            name: name.into(),
            spec: LabelSpec::Single(label),
        }
    }

    /// 组合区域.
    #[inline]
    pub fn group<S: Into<String>>(name: S, labels: &[u8]) -> Self {
        Self {
            name: name.into(),
            spec: LabelSpec::Group(labels.to_vec()),
        }
    }
}

/// 特征组.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeatureGroup {
    /// 全脑尺寸与质心.
    Spatial,
    /// 肿瘤形态.
    Tumor,
    /// 一阶强度统计.
    Statistical,
    /// GLCM 纹理.
    Texture,
}

impl FromStr for FeatureGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "spatial" => Ok(Self::Spatial),
            "tumor" => Ok(Self::Tumor),
            "statistical" => Ok(Self::Statistical),
            "texture" => Ok(Self::Texture),
            _ => Err(Error::UnknownFeatureGroup(s.to_string())),
        }
    }
}

/// 需要计算的特征组. 纹理计算开销最大, 缺省关闭.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeatureSelection {
    /// 全脑尺寸与质心.
    pub spatial: bool,
    /// 肿瘤形态.
    pub tumor: bool,
    /// 一阶强度统计.
    pub statistical: bool,
    /// GLCM 纹理.
    pub texture: bool,
}

impl Default for FeatureSelection {
    fn default() -> Self {
        Self {
            spatial: true,
            tumor: true,
            statistical: true,
            texture: false,
        }
    }
}

impl FeatureSelection {
    /// 不选任何特征组.
    pub const NONE: Self = Self {
        spatial: false,
        tumor: false,
        statistical: false,
        texture: false,
    };

    /// 选择全部特征组.
    pub const ALL: Self = Self {
        spatial: true,
        tumor: true,
        statistical: true,
        texture: true,
    };

    /// 由 `(组名, 是否启用)` 构建. 无法识别的组名返回错误.
    pub fn from_flags<'a, I>(flags: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut ans = Self::NONE;
        for (name, on) in flags {
            ans.set(name.parse()?, on);
        }
        Ok(ans)
    }

    /// 开启或关闭某一组.
    pub fn set(&mut self, group: FeatureGroup, on: bool) {
        match group {
            FeatureGroup::Spatial => self.spatial = on,
            FeatureGroup::Tumor => self.tumor = on,
            FeatureGroup::Statistical => self.statistical = on,
            FeatureGroup::Texture => self.texture = on,
        }
    }

    /// 某一组是否开启?
    pub fn contains(&self, group: FeatureGroup) -> bool {
        match group {
            FeatureGroup::Spatial => self.spatial,
            FeatureGroup::Tumor => self.tumor,
            FeatureGroup::Statistical => self.statistical,
            FeatureGroup::Texture => self.texture,
        }
    }
}

/// 重叠指标.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MetricKind {
    /// Dice 系数.
    Dice,
    /// 有向 Hausdorff 距离.
    Haus,
    /// Jaccard 指数.
    Jacc,
    /// 准确率.
    Accu,
    /// 敏感度 (召回率).
    Sens,
    /// 特异度.
    Spec,
    /// 精确率.
    Prec,
    /// 预测区域的物理体积.
    Size,
}

impl MetricKind {
    /// 全部指标, 按固定顺序.
    pub const ALL: [Self; 8] = [
        Self::Dice,
        Self::Haus,
        Self::Jacc,
        Self::Accu,
        Self::Sens,
        Self::Spec,
        Self::Prec,
        Self::Size,
    ];

    /// 配置中使用的小写标识.
    pub const fn ident(&self) -> &'static str {
        match self {
            Self::Dice => "dice",
            Self::Haus => "haus",
            Self::Jacc => "jacc",
            Self::Accu => "accu",
            Self::Sens => "sens",
            Self::Spec => "spec",
            Self::Prec => "prec",
            Self::Size => "size",
        }
    }

    /// 输出记录中使用的大写键.
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Dice => "DICE",
            Self::Haus => "HAUS",
            Self::Jacc => "JACC",
            Self::Accu => "ACCU",
            Self::Sens => "SENS",
            Self::Spec => "SPEC",
            Self::Prec => "PREC",
            Self::Size => "SIZE",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MetricKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.ident() == lower)
            .ok_or_else(|| Error::UnknownMetric(s.to_string()))
    }
}

/// 有序, 无重复的指标列表.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MetricSelection(Vec<MetricKind>);

impl Default for MetricSelection {
    #[inline]
    fn default() -> Self {
        Self::all()
    }
}

impl MetricSelection {
    /// 全部指标.
    #[inline]
    pub fn all() -> Self {
        Self(MetricKind::ALL.to_vec())
    }

    /// 由指标列表构建, 去掉重复项.
    pub fn new<I: IntoIterator<Item = MetricKind>>(it: I) -> Self {
        let mut v = Vec::new();
        for m in it {
            if !v.contains(&m) {
                v.push(m);
            }
        }
        Self(v)
    }

    /// 由 `(指标名, 是否启用)` 构建, 保持启用项的顺序. 无法识别的指标名打印警告并跳过.
    pub fn from_flags<'a, I>(flags: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        Self::new(flags.into_iter().filter(|(_, on)| *on).filter_map(
            |(name, _)| match name.parse::<MetricKind>() {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!("{e}, skipped");
                    None
                }
            },
        ))
    }

    /// 是否包含指标 `m`?
    #[inline]
    pub fn contains(&self, m: MetricKind) -> bool {
        self.0.contains(&m)
    }

    /// 按顺序迭代.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = MetricKind> + '_ {
        self.0.iter().copied()
    }

    /// 指标个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 从受试者编号中拆分纵向编号和时间点, 例如 `P012_3` 以 `_` 拆分为 `("P012", 3)`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LongitudinalSpec {
    /// 分隔符.
    pub separator: String,
    /// 纵向编号所在的分量下标.
    pub longitudinal_id: usize,
    /// 时间点所在的分量下标.
    pub time_point: usize,
}

impl LongitudinalSpec {
    /// 拆分 `subject`. 失败时返回 `None`.
    pub fn split(&self, subject: &str) -> Option<(String, u32)> {
        if self.separator.is_empty() {
            return None;
        }
        let parts: Vec<&str> = subject.split(self.separator.as_str()).collect();
        let id = parts.get(self.longitudinal_id)?;
        let tp = parts.get(self.time_point)?.trim().parse().ok()?;
        Some((id.to_string(), tp))
    }

    /// 拆分 `subject`. 没有配置或拆分失败时回退为 `("", 0)`, 后者打印警告.
    pub fn resolve(spec: Option<&Self>, subject: &str) -> (String, u32) {
        let Some(spec) = spec else {
            return (String::new(), 0);
        };
        spec.split(subject).unwrap_or_else(|| {
            warn!("Cannot split longitudinal id out of `{subject}` with {spec:?}");
            (String::new(), 0)
        })
    }
}

/// 特征与指标提取的全部配置.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExtractorConfig {
    /// 标签表.
    pub labels: LabelMap,
    /// 需要计算的特征组.
    pub features: FeatureSelection,
    /// 需要计算的指标.
    pub metrics: MetricSelection,
    /// 额外的组合区域, 例如肿瘤核心, 全肿瘤.
    pub extra_regions: Vec<Region>,
    /// 评估时是否跳过背景区域.
    pub skip_background: bool,
    /// 纹理特征计算前是否裁剪到非零包围盒.
    pub crop_texture: bool,
    /// 纵向编号拆分规则.
    pub longitudinal: Option<LongitudinalSpec>,
    /// 载入真值与预测后立即执行的标签替换 `(原标签, 新标签)`,
    /// 例如 BraTS 2021 的增强肿瘤 `4` 需要改写为标签表中的值.
    pub label_remap: Vec<(u8, u8)>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            labels: LabelMap::default(),
            features: FeatureSelection::default(),
            metrics: MetricSelection::default(),
            extra_regions: Vec::new(),
            skip_background: true,
            crop_texture: true,
            longitudinal: None,
            label_remap: Vec::new(),
        }
    }
}

impl ExtractorConfig {
    /// 评估所用的全部区域: 标签表中的区域在前, 组合区域在后.
    pub fn regions(&self) -> Vec<Region> {
        let mut ans = self.labels.regions(self.skip_background);
        ans.extend(self.extra_regions.iter().cloned());
        ans
    }

    /// 按 [`Self::label_remap`] 就地改写标签. 没有规则时什么也不做.
    pub fn remap_label(&self, label: &mut MriLabel) {
        if self.label_remap.is_empty() {
            return;
        }
        let n = label.remap(&self.label_remap);
        debug!("Remapped {n} voxels with {:?}", self.label_remap);
    }

    /// 从 JSON 文本解析.
    #[cfg(feature = "serde")]
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_map() {
        crate::init_test_logger();
        let m = LabelMap::default();
        assert_eq!(m.len(), 4);
        assert_eq!(m.name_of(2), Some("ENH"));
        assert_eq!(m.key_of(3).as_deref(), Some("nec"));
        assert_eq!(m.name_of(9), None);
        let names: Vec<_> = m.regions(true).into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["EDE", "ENH", "NEC"]);
        assert_eq!(m.regions(false).len(), 4);

        let dup = LabelMap::new([(0, "a"), (1, "b"), (0, "c")]);
        assert_eq!(dup.len(), 2);
        assert_eq!(dup.name_of(0), Some("a"));
    }

    #[test]
    fn test_label_spec() {
        let core = LabelSpec::Group(vec![ENHANCING, NECROSIS]);
        assert!(core.contains(2) && core.contains(3) && !core.contains(1));
        assert!(!core.is_background());
        let lut = core.lut();
        assert_eq!(lut[2] + lut[3], 2);
        assert_eq!(lut.iter().map(|v| *v as usize).sum::<usize>(), 2);
        assert!(LabelSpec::Single(0).is_background());
        // 只有单独的背景标签才算背景.
        assert!(!LabelSpec::Group(vec![BACKGROUND, EDEMA]).is_background());
        assert!(!LabelSpec::Group(vec![BACKGROUND]).is_background());
    }

    #[test]
    fn test_metric_parse() {
        crate::init_test_logger();
        assert_eq!("dice".parse::<MetricKind>().unwrap(), MetricKind::Dice);
        assert_eq!("HAUS".parse::<MetricKind>().unwrap(), MetricKind::Haus);
        assert!(matches!(
            "foo".parse::<MetricKind>(),
            Err(Error::UnknownMetric(_))
        ));
        assert_eq!(MetricKind::Prec.to_string(), "PREC");

        let sel = MetricSelection::from_flags([
            ("jacc", true),
            ("dice", true),
            ("haus", false),
            ("bogus", true),
            ("dice", true),
        ]);
        assert_eq!(sel.iter().collect::<Vec<_>>(), [MetricKind::Jacc, MetricKind::Dice]);
        assert!(!sel.contains(MetricKind::Haus));
    }

    #[test]
    fn test_feature_selection() {
        let sel = FeatureSelection::from_flags([("spatial", true), ("Texture", true)]).unwrap();
        assert!(sel.contains(FeatureGroup::Spatial));
        assert!(sel.contains(FeatureGroup::Texture));
        assert!(!sel.contains(FeatureGroup::Tumor));
        assert!(matches!(
            FeatureSelection::from_flags([("shape", true)]),
            Err(Error::UnknownFeatureGroup(_))
        ));
    }

    #[test]
    fn test_longitudinal() {
        crate::init_test_logger();
        let spec = LongitudinalSpec {
            separator: "_".into(),
            longitudinal_id: 0,
            time_point: 1,
        };
        assert_eq!(spec.split("P012_3"), Some(("P012".to_string(), 3)));
        assert_eq!(spec.split("P012"), None);
        assert_eq!(spec.split("P012_x"), None);
        assert_eq!(
            LongitudinalSpec::resolve(Some(&spec), "P012_x"),
            (String::new(), 0)
        );
        assert_eq!(LongitudinalSpec::resolve(None, "P012_3"), (String::new(), 0));
    }

    #[test]
    fn test_config_regions() {
        let mut cfg = ExtractorConfig::default();
        cfg.extra_regions.push(Region::group("TC", &[ENHANCING, NECROSIS]));
        let names: Vec<_> = cfg.regions().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["EDE", "ENH", "NEC", "TC"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_json() {
        let cfg = ExtractorConfig::from_json(
            r#"{
                "labels": [[0, "BKG"], [1, "EDE"], [4, "ENH"]],
                "metrics": ["dice", "haus"],
                "extra_regions": [{"name": "WT", "spec": [1, 4]}],
                "longitudinal": {"separator": "-", "longitudinal_id": 0, "time_point": 2}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.labels.name_of(4), Some("ENH"));
        assert_eq!(cfg.metrics.len(), 2);
        assert_eq!(cfg.extra_regions[0].spec, LabelSpec::Group(vec![1, 4]));
        assert!(cfg.skip_background);
        assert_eq!(cfg.features, FeatureSelection::default());
        assert_eq!(cfg.longitudinal.unwrap().time_point, 2);
        assert!(cfg.label_remap.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_label_map_object_form() {
        let cfg = ExtractorConfig::from_json(
            r#"{"labels": {"4": "ENH", "0": "BKG", "1": "EDE"}, "label_remap": [[4, 2]]}"#,
        )
        .unwrap();
        let ids: Vec<u8> = cfg.labels.ids().collect();
        assert_eq!(ids, [0, 1, 4]);
        assert_eq!(cfg.labels.name_of(4), Some("ENH"));
        assert_eq!(cfg.label_remap, [(4, 2)]);

        assert!(ExtractorConfig::from_json(r#"{"labels": {"x": "BKG"}}"#).is_err());
        assert!(ExtractorConfig::from_json(r#"{"labels": {"300": "BKG"}}"#).is_err());

        // 序列化为有序的二元组形式.
        let text = serde_json::to_string(&cfg.labels).unwrap();
        assert_eq!(text, r#"[[0,"BKG"],[1,"EDE"],[4,"ENH"]]"#);
    }

    #[test]
    fn test_remap_label() {
        let mut data = ndarray::Array3::<u8>::zeros((1, 2, 2));
        data[(0, 0, 0)] = 4;
        data[(0, 1, 1)] = 1;
        let mut label = MriLabel::from_array(data, crate::Spacing::default());

        let mut cfg = ExtractorConfig::default();
        cfg.remap_label(&mut label);
        assert_eq!(label.count(4), 1);

        cfg.label_remap = vec![(4, ENHANCING)];
        cfg.remap_label(&mut label);
        assert_eq!(label.count(4), 0);
        assert_eq!(label.count(ENHANCING), 1);
        assert_eq!(label.count(EDEMA), 1);
    }
}
