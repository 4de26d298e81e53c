//! 单个受试者目录的访问与批量加载.
//!
//! 提供迭代器风格的数据集获取模式.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::{Sequence, VolumeKind};
use crate::consts::NII_EXT;
use crate::{MriLabel, MriScan, Result};

/// 受试者目录 `{root}/{id}`.
#[derive(Clone, Debug)]
pub struct SubjectDir {
    dir: PathBuf,
    id: String,
}

impl SubjectDir {
    /// 不检查目录是否存在.
    pub fn new<P: AsRef<Path>, S: Into<String>>(root: P, id: S) -> Self {
        let id = id.into();
        let dir = root.as_ref().join(&id);
        Self { dir, id }
    }

    /// 受试者编号.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 受试者目录.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 某种体数据的文件路径: `{root}/{id}/{id}_{suffix}.nii.gz`.
    pub fn path_of<K: Into<VolumeKind>>(&self, kind: K) -> PathBuf {
        let kind = kind.into();
        self.dir
            .join(format!("{}_{}{NII_EXT}", self.id, kind.suffix()))
    }

    /// 读取序列. 失败时返回 `Err`.
    pub fn try_scan(&self, seq: Sequence) -> Result<MriScan> {
        MriScan::open(self.path_of(seq))
    }

    /// 读取标签 (`Seg` 或 `Pred`). 失败时返回 `Err`.
    pub fn try_label(&self, kind: VolumeKind) -> Result<MriLabel> {
        MriLabel::open(self.path_of(kind))
    }

    /// 读取序列. 文件缺失或无法读取时打印警告并返回 `None`.
    pub fn scan(&self, seq: Sequence) -> Option<MriScan> {
        self.tolerant(seq.into(), || self.try_scan(seq))
    }

    /// 读取标签. 文件缺失或无法读取时打印警告并返回 `None`.
    pub fn label(&self, kind: VolumeKind) -> Option<MriLabel> {
        self.tolerant(kind, || self.try_label(kind))
    }

    fn tolerant<T, F: FnOnce() -> Result<T>>(&self, kind: VolumeKind, load: F) -> Option<T> {
        let path = self.path_of(kind);
        if !path.is_file() {
            warn!("{}: missing `{}` volume at {}", self.id, kind.suffix(), path.display());
            return None;
        }
        match load() {
            Ok(v) => {
                debug!("{}: loaded {}", self.id, path.display());
                Some(v)
            }
            Err(e) => {
                warn!("{}: cannot read {}: {e}", self.id, path.display());
                None
            }
        }
    }

    /// 读取四个序列和真值分割.
    pub fn load(&self) -> SubjectVolumes {
        SubjectVolumes {
            scans: Sequence::ALL.map(|s| self.scan(s)),
            seg: self.label(VolumeKind::Seg),
        }
    }
}

/// 单个受试者的全部体数据. 任何一项都可能缺失.
#[derive(Clone, Debug, Default)]
pub struct SubjectVolumes {
    /// 按 [`Sequence::ALL`] 顺序排列的序列.
    pub scans: [Option<MriScan>; 4],
    /// 真值分割.
    pub seg: Option<MriLabel>,
}

impl SubjectVolumes {
    /// 获取某个序列.
    #[inline]
    pub fn scan(&self, seq: Sequence) -> Option<&MriScan> {
        self.scans[seq.index()].as_ref()
    }

    /// 设置某个序列.
    #[inline]
    pub fn set_scan(&mut self, seq: Sequence, scan: Option<MriScan>) {
        self.scans[seq.index()] = scan;
    }

    /// 获取分割.
    #[inline]
    pub fn seg(&self) -> Option<&MriLabel> {
        self.seg.as_ref()
    }

    /// 已读取的序列个数.
    pub fn scan_count(&self) -> usize {
        self.scans.iter().filter(|s| s.is_some()).count()
    }
}

/// 从 `root` 和受试者编号列表创建加载器. 每次迭代读取一个受试者的全部体数据.
pub fn subject_loader<I, P>(root: P, ids: I) -> SubjectLoader
where
    I: IntoIterator,
    I::Item: Into<String>,
    P: AsRef<Path>,
{
    let mut ids: Vec<String> = ids.into_iter().map(Into::into).collect();
    ids.reverse();
    SubjectLoader {
        root: root.as_ref().to_owned(),
        ids_rev: ids,
    }
}

/// 按受试者顺序加载体数据的迭代器.
#[derive(Debug)]
pub struct SubjectLoader {
    root: PathBuf,
    ids_rev: Vec<String>,
}

impl Iterator for SubjectLoader {
    type Item = (String, SubjectVolumes);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids_rev.pop()?;
        let volumes = SubjectDir::new(&self.root, id.as_str()).load();
        Some((id, volumes))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.ids_rev.len(), Some(self.ids_rev.len()))
    }
}

impl ExactSizeIterator for SubjectLoader {
    #[inline]
    fn len(&self) -> usize {
        self.ids_rev.len()
    }
}
