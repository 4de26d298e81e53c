//! 二值掩膜之间的混淆计数与重叠指标.

use ndarray::{ArrayView3, Zip};

/// 两个二值掩膜之间的 TP/TN/FP/FN 计数. 非零即为阳性.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Cardinalities {
    /// 真阳性.
    pub tp: usize,
    /// 真阴性.
    pub tn: usize,
    /// 假阳性.
    pub fp: usize,
    /// 假阴性.
    pub fn_: usize,
}

impl Cardinalities {
    /// 逐体素比较 `gt` 与 `pred`. 两者形状不一致时 panic.
    pub fn of(gt: ArrayView3<'_, u8>, pred: ArrayView3<'_, u8>) -> Self {
        Zip::from(&gt)
            .and(&pred)
            .fold(Self::default(), |mut acc, g, p| {
                match (*g != 0, *p != 0) {
                    (true, true) => acc.tp += 1,
                    (false, false) => acc.tn += 1,
                    (false, true) => acc.fp += 1,
                    (true, false) => acc.fn_ += 1,
                }
                acc
            })
    }

    /// 体素总数.
    #[inline]
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// 真值阳性个数.
    #[inline]
    pub fn gt_positive(&self) -> usize {
        self.tp + self.fn_
    }

    /// 预测阳性个数.
    #[inline]
    pub fn pred_positive(&self) -> usize {
        self.tp + self.fp
    }

    /// `2TP / (2TP + FP + FN)`. 真值为空时: 预测也为空得 1, 否则得 0.
    pub fn dice(&self) -> f64 {
        if self.gt_positive() == 0 {
            return if self.pred_positive() == 0 { 1.0 } else { 0.0 };
        }
        let tp2 = 2.0 * self.tp as f64;
        tp2 / (tp2 + self.fp as f64 + self.fn_ as f64)
    }

    /// `TP / (TP + FP + FN)`. 空真值的约定与 [`Self::dice`] 相同.
    pub fn jaccard(&self) -> f64 {
        if self.gt_positive() == 0 {
            return if self.pred_positive() == 0 { 1.0 } else { 0.0 };
        }
        self.tp as f64 / (self.tp + self.fp + self.fn_) as f64
    }

    /// `(TP + TN) / total`. 空体数据为 NaN.
    pub fn accuracy(&self) -> f64 {
        (self.tp + self.tn) as f64 / self.total() as f64
    }

    /// `TP / (TP + FN)`. `TP == 0` 时为 NaN.
    pub fn sensitivity(&self) -> f64 {
        if self.tp == 0 {
            return f64::NAN;
        }
        self.tp as f64 / self.gt_positive() as f64
    }

    /// `TN / (TN + FP)`.
    pub fn specificity(&self) -> f64 {
        self.tn as f64 / (self.tn + self.fp) as f64
    }

    /// `TP / (TP + FP)`. `TP == 0` 时为 NaN.
    pub fn precision(&self) -> f64 {
        if self.tp == 0 {
            return f64::NAN;
        }
        self.tp as f64 / self.pred_positive() as f64
    }
}
