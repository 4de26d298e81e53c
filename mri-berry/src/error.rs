//! crate 级错误类型.
//!
//! 特征提取不会返回错误 (缺失数据一律以 NaN 表示).
//! 只有预处理流程本身存在缺陷时 (形状不一致, 配置非法, 文件损坏) 才会产生 `Error`.

/// 本 crate 所有可失败操作的错误类型.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 真值与预测的形状不一致. 这意味着上游流程存在缺陷, 不可恢复.
    #[error("shape mismatch: ground truth {gt:?} vs prediction {pred:?}")]
    ShapeMismatch {
        /// 真值形状.
        gt: Vec<usize>,
        /// 预测形状.
        pred: Vec<usize>,
    },

    /// 区域名个数与 one-hot 通道个数不一致.
    #[error("{names} region names given for {channels} one-hot channels")]
    RegionCountMismatch {
        /// 区域名个数.
        names: usize,
        /// 通道个数.
        channels: usize,
    },

    /// 两个误分类矩阵的标签列表不一致.
    #[error("label list mismatch: {expected:?} vs {found:?}")]
    LabelMismatch {
        /// 累加器的标签列表.
        expected: Vec<u8>,
        /// 加入者的标签列表.
        found: Vec<u8>,
    },

    /// 无法识别的指标名.
    #[error("unknown metric `{0}`")]
    UnknownMetric(String),

    /// 无法识别的特征组名.
    #[error("unknown feature group `{0}`")]
    UnknownFeatureGroup(String),

    /// nifti 读取失败.
    #[error(transparent)]
    Nifti(#[from] nifti::NiftiError),

    /// ndarray 形状转换失败.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// `Result<T, Error>` 的简写.
pub type Result<T> = std::result::Result<T, Error>;
