//! 通用常量.

/// BraTS 分割标签值.
pub mod label {
    /// 背景.
    pub const BACKGROUND: u8 = 0;

    /// 水肿 (edema).
    pub const EDEMA: u8 = 1;

    /// 增强肿瘤 (enhancing tumor).
    pub const ENHANCING: u8 = 2;

    /// 坏死 / 非增强肿瘤核心 (necrosis).
    pub const NECROSIS: u8 = 3;
}

/// 三个解剖平面的名称, 顺序与体数据轴序一致.
pub const PLANES: [&str; 3] = ["axial", "coronal", "sagittal"];

/// 背景标签在肿瘤特征中使用的名称, 代表全部非背景标签的合集.
pub const WHOLE: &str = "whole";

/// 体数据文件的扩展名.
pub const NII_EXT: &str = ".nii.gz";

