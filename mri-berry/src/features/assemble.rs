//! 合并单个受试者的全部特征.

use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{
    FeatureMap, SpatialExtractor, StatisticalExtractor, TextureExtractor, TumorExtractor,
    VolumeExtractor,
};
use crate::config::{ExtractorConfig, LongitudinalSpec};
use crate::dataset::{Sequence, SubjectVolumes};

/// 单个受试者的完整特征记录. 创建后不再修改.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureRecord {
    /// 受试者编号.
    pub id: String,
    /// 纵向编号. 未配置时为空串.
    pub longitudinal_id: String,
    /// 时间点. 未配置时为 0.
    pub time_point: u32,
    /// 依次为空间, 肿瘤, 各序列统计, 各序列纹理特征.
    pub features: FeatureMap,
}

impl FeatureRecord {
    /// 按键取值.
    #[inline]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.features.get(key)
    }
}

/// 按 `config` 计算一个受试者的特征.
///
/// 空间特征和脑部质心取自 T1ce 序列. 任何缺失的体数据只会让相应的特征变为 NaN.
pub fn assemble(id: &str, volumes: &SubjectVolumes, config: &ExtractorConfig) -> FeatureRecord {
    let sel = config.features;
    let t1ce = volumes.scan(Sequence::T1ce);
    let mut features = FeatureMap::new();

    if sel.spatial {
        features.merge(SpatialExtractor.extract_or_missing(t1ce));
    }

    if sel.tumor {
        let centre = SpatialExtractor::centre_of_mass(t1ce);
        features.merge(TumorExtractor::new(&config.labels, centre).extract_or_missing(volumes.seg()));
    }

    if sel.statistical {
        for seq in Sequence::ALL {
            let ex = StatisticalExtractor::new(seq.suffix());
            features.merge(ex.extract_or_missing(volumes.scan(seq)));
        }
    }

    if sel.texture {
        for seq in Sequence::ALL {
            let ex = TextureExtractor::new(seq.suffix(), config.crop_texture);
            features.merge(ex.extract_or_missing(volumes.scan(seq)));
        }
    }

    let (longitudinal_id, time_point) =
        LongitudinalSpec::resolve(config.longitudinal.as_ref(), id);
    debug!("{id}: {} features, {} NaN", features.len(), features.nan_count());

    FeatureRecord {
        id: id.to_string(),
        longitudinal_id,
        time_point,
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureSelection;
    use crate::{MriLabel, MriScan, Spacing};
    use ndarray::Array3;

    fn subject() -> SubjectVolumes {
        let mut brain = Array3::<f32>::zeros((4, 4, 4));
        brain.slice_mut(ndarray::s![1..3, 1..3, 1..3]).fill(10.0);
        brain[(1, 1, 1)] = 30.0;
        let mut seg = Array3::<u8>::zeros((4, 4, 4));
        seg[(1, 1, 1)] = 2;
        seg[(2, 2, 2)] = 1;

        let mut v = SubjectVolumes::default();
        v.set_scan(
            Sequence::T1ce,
            Some(MriScan::from_array(brain.clone(), Spacing::default())),
        );
        v.set_scan(Sequence::Flair, Some(MriScan::from_array(brain, Spacing::default())));
        v.seg = Some(MriLabel::from_array(seg, Spacing::default()));
        v
    }

    #[test]
    fn test_record_layout() {
        let mut cfg = ExtractorConfig::default();
        cfg.features = FeatureSelection::ALL;
        cfg.longitudinal = Some(LongitudinalSpec {
            separator: "_".into(),
            longitudinal_id: 0,
            time_point: 1,
        });
        let r = assemble("P7_2", &subject(), &cfg);

        assert_eq!(r.id, "P7_2");
        assert_eq!((r.longitudinal_id.as_str(), r.time_point), ("P7", 2));
        // 6 spatial + 23 tumor + 4 * 10 statistical + 4 * 12 texture.
        assert_eq!(r.features.len(), 6 + 23 + 40 + 48);
        assert_eq!(r.features.keys().next(), Some("axial_dim"));
        assert_eq!(r.get("t1ce_max_intensity"), Some(30.0));
        assert!(r.get("t1_max_intensity").unwrap().is_nan());
        assert!(r.get("t2_mean_contrast").unwrap().is_nan());
        assert!(!r.get("flair_mean_contrast").unwrap().is_nan());
        assert_eq!(r.get("lesion_size"), Some(2.0));
        assert_eq!(r.get("axial_brain_centre_mass"), Some(1.5));
    }

    #[test]
    fn test_missing_everything_is_complete() {
        let cfg = ExtractorConfig::default();
        let full = assemble("a", &subject(), &cfg);
        let empty = assemble("a", &SubjectVolumes::default(), &cfg);
        assert_eq!(
            full.features.keys().collect::<Vec<_>>(),
            empty.features.keys().collect::<Vec<_>>()
        );
        assert_eq!(empty.features.nan_count(), empty.features.len());
        assert_eq!((empty.longitudinal_id.as_str(), empty.time_point), ("", 0));
    }
}
