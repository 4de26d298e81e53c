//! 预测分割与真值分割之间的重叠指标.
//!
//! 先用 [`one_hot_encode`] 将两个标签体数据按区域编码成通道栈,
//! 再由 [`compute_metrics`] 逐通道计算 [`MetricKind`] 中选定的指标.
//! 指标数学上无定义时 (如 `TP == 0` 的敏感度) 只影响该区域的该指标, 取值为 NaN.

use log::debug;
use ndarray::{ArrayView3, ArrayView4, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{MetricKind, MetricSelection, Region};
use crate::{Error, MriLabel, NiftiHeaderAttr, Result, Spacing};

pub mod confusion;
pub mod hausdorff;
pub mod one_hot;
pub mod overlap;

pub use confusion::{normalize_rows, CohortErrorMatrix, ErrorMatrix};
pub use hausdorff::{directed_hausdorff, squared_edt};
pub use one_hot::{argmax_decode, one_hot_encode, one_hot_regions};
pub use overlap::Cardinalities;

/// 单个受试者单个区域的指标.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricRecord {
    /// 受试者编号.
    pub subject: String,
    /// 区域名.
    pub region: String,
    /// 模型名. 由调用方通过 [`MetricRecord::with_model`] 附加, 缺省为空.
    pub model: String,
    /// 按选定顺序排列的指标值.
    pub values: Vec<(MetricKind, f64)>,
}

impl MetricRecord {
    /// 取指标 `m` 的值. 未计算该指标时返回 `None`.
    pub fn get(&self, m: MetricKind) -> Option<f64> {
        self.values.iter().find(|(k, _)| *k == m).map(|(_, v)| *v)
    }

    /// 附加模型名.
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }
}

/// 计算单个通道的单个指标.
fn metric_value(
    m: MetricKind,
    c: &Cardinalities,
    gt: ArrayView3<'_, u8>,
    pred: ArrayView3<'_, u8>,
    voxel_volume: f64,
) -> f64 {
    match m {
        MetricKind::Dice => c.dice(),
        MetricKind::Jacc => c.jaccard(),
        MetricKind::Accu => c.accuracy(),
        MetricKind::Sens => c.sensitivity(),
        MetricKind::Spec => c.specificity(),
        MetricKind::Prec => c.precision(),
        MetricKind::Haus => directed_hausdorff(gt, pred),
        MetricKind::Size => match c.pred_positive() {
            0 => f64::NAN,
            n => n as f64 * voxel_volume,
        },
    }
}

/// 逐通道比较两个 one-hot 栈, 每个通道产生一条 [`MetricRecord`].
///
/// `regions[c]` 为第 `c` 个通道的区域名. 两个栈形状不一致时返回
/// [`Error::ShapeMismatch`], 区域名个数与通道个数不一致时返回
/// [`Error::RegionCountMismatch`].
pub fn compute_metrics(
    gt: ArrayView4<'_, u8>,
    pred: ArrayView4<'_, u8>,
    subject: &str,
    regions: &[String],
    metrics: &MetricSelection,
    spacing: Spacing,
) -> Result<Vec<MetricRecord>> {
    if gt.shape() != pred.shape() {
        return Err(Error::ShapeMismatch {
            gt: gt.shape().to_vec(),
            pred: pred.shape().to_vec(),
        });
    }
    let channels = gt.len_of(Axis(0));
    if regions.len() != channels {
        return Err(Error::RegionCountMismatch {
            names: regions.len(),
            channels,
        });
    }

    let voxel_volume = spacing.voxel_volume();
    let ans = regions
        .iter()
        .zip(gt.axis_iter(Axis(0)).zip(pred.axis_iter(Axis(0))))
        .map(|(region, (g, p))| {
            let c = Cardinalities::of(g, p);
            debug!("{subject} / {region}: {c:?}");
            let values = metrics
                .iter()
                .map(|m| (m, metric_value(m, &c, g, p, voxel_volume)))
                .collect();
            MetricRecord {
                subject: subject.to_string(),
                region: region.clone(),
                model: String::new(),
                values,
            }
        })
        .collect();
    Ok(ans)
}

/// 对一个受试者的真值与预测标签按 `regions` 编码, 并计算指标.
///
/// 体素尺寸取自预测. `regions` 中的背景区域照常保留, 是否跳过背景由调用方在构建
/// 区域列表时决定 (见 [`crate::config::ExtractorConfig::regions`]).
pub fn evaluate_subject(
    gt: &MriLabel,
    pred: &MriLabel,
    subject: &str,
    regions: &[Region],
    metrics: &MetricSelection,
) -> Result<Vec<MetricRecord>> {
    if gt.data().shape() != pred.data().shape() {
        return Err(Error::ShapeMismatch {
            gt: gt.data().shape().to_vec(),
            pred: pred.data().shape().to_vec(),
        });
    }
    let (names, gt_stack) = one_hot_regions(gt.data(), regions, false);
    let (_, pred_stack) = one_hot_regions(pred.data(), regions, false);
    compute_metrics(
        gt_stack.view(),
        pred_stack.view(),
        subject,
        &names,
        metrics,
        pred.spacing(),
    )
}
