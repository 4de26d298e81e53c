#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供脑部 MRI (BraTS 组织方式) 体数据与肿瘤分割的结构化信息,
//! 单个受试者的定量特征提取, 以及预测分割相对真值分割的重叠指标.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 体数据一律按照 (axial, coronal, sagittal) 即 `(z, H, W)` 的轴序访问,
//!   体素尺寸也按同一轴序给出.
//! 2. 特征提取从不失败: 体数据缺失或区域为空时, 对应特征取 NaN.
//!   只有流程本身的缺陷 (形状不一致, 配置非法, 文件损坏) 才会返回 [`Error`].
//! 3. 启用 `rayon` feature 时, 纹理特征与距离变换会并行计算, 结果与串行一致.
//!
//! # 功能
//!
//! ### 体数据读取 ✅
//!
//! nii 格式的序列 ([`MriScan`]) 与分割 ([`MriLabel`]), 以及按受试者目录组织的数据集访问.
//!
//! 实现位于 `mri-berry/src/data` 和 `mri-berry/src/dataset`.
//!
//! ### 特征提取 ✅
//!
//! 1. 空间特征: 体数据尺寸, 脑部质心.
//! 2. 肿瘤特征: 各标签质心, 肿瘤相对脑部质心的位置, 病灶体积, 含肿瘤的切片个数.
//! 3. 统计特征: 各序列正强度值的分布统计量.
//! 4. 纹理特征: 逐 axial 切片的灰度共生矩阵属性, 跨切片的均值与标准差.
//!
//! 实现位于 `mri-berry/src/features`.
//!
//! ### 重叠指标 ✅
//!
//! Dice, Jaccard, Hausdorff, 准确率, 敏感度, 特异度, 精确率, 区域体积.
//! 误分类矩阵及其队列级汇总.
//!
//! 实现位于 `mri-berry/src/metrics`.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 3D MRI nii 文件基础数据结构.
mod data;

pub use data::{BoundingBox, IntensityWindow, MriLabel, MriScan, NiftiHeaderAttr, Spacing};

pub mod config;
pub mod consts;
pub mod dataset;
pub mod error;
pub mod features;
pub mod metrics;
pub mod prelude;

pub use error::{Error, Result};

/// 测试中输出警告日志. 全局 logger 只能设置一次, 重复调用是安全的.
#[cfg(test)]
pub(crate) fn init_test_logger() {
    let _ = simple_logger::init_with_level(log::Level::Warn);
}
