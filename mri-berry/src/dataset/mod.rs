//! 数据集操作.
//!
//! 数据集按受试者组织: `{root}/{id}/{id}_{suffix}.nii.gz`,
//! 其中 `suffix` 为 `t1`, `t1ce`, `t2`, `flair`, `seg` 或 `pred`.
//! 文件缺失不是错误, 对应的体数据视为缺失.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod subject;

pub use subject::{subject_loader, SubjectDir, SubjectLoader, SubjectVolumes};

/// MRI 序列.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Sequence {
    /// T1 加权.
    T1,
    /// 增强 T1.
    T1ce,
    /// T2 加权.
    T2,
    /// T2-FLAIR.
    Flair,
}

impl Sequence {
    /// 全部序列, 按输出顺序.
    pub const ALL: [Self; 4] = [Self::T1, Self::T1ce, Self::T2, Self::Flair];

    /// 文件名后缀, 同时也是特征键前缀.
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::T1 => "t1",
            Self::T1ce => "t1ce",
            Self::T2 => "t2",
            Self::Flair => "flair",
        }
    }

    /// 在 [`Self::ALL`] 中的下标.
    #[inline]
    pub const fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// 受试者目录下的文件种类.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VolumeKind {
    /// 强度序列.
    Scan(Sequence),
    /// 真值分割.
    Seg,
    /// 模型预测的分割.
    Pred,
}

impl VolumeKind {
    /// 文件名后缀.
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Scan(s) => s.suffix(),
            Self::Seg => "seg",
            Self::Pred => "pred",
        }
    }
}

impl From<Sequence> for VolumeKind {
    #[inline]
    fn from(s: Sequence) -> Self {
        Self::Scan(s)
    }
}

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 列出 `root` 下所有子目录名 (即受试者编号), 按字典序排列. 非 UTF-8 名称被忽略.
pub fn list_subjects<P: AsRef<Path>>(root: P) -> io::Result<Vec<String>> {
    let mut ans = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            ans.push(name.to_string());
        }
    }
    ans.sort_unstable();
    Ok(ans)
}
