//! 对 `mri-berry::dataset` 的更一层封装. 提供运行配置与数据集路径的加载.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use mri_berry::config::ExtractorConfig;
use mri_berry::dataset::{self, SubjectDir, VolumeKind};
use mri_berry::MriLabel;
use serde::Deserialize;

/// 运行配置文件路径所在的环境变量.
pub const CONFIG_ENV: &str = "EXTRACT_CONFIG";

/// 数据集根目录所在的环境变量.
pub const DATASET_ENV: &str = "BRATS_DIR";

/// 流程级错误.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 找不到数据集根目录.
    #[error("dataset root not found (set $BRATS_DIR or create $HOME/dataset/brats)")]
    MissingDataset,

    /// 配置文件格式错误.
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),

    /// 核心库错误.
    #[error(transparent)]
    Berry(#[from] mri_berry::Error),

    /// 文件系统错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 一个待评估模型: 其预测以 `{root}/{id}/{id}_pred.nii.gz` 保存.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ModelSpec {
    /// 模型名.
    pub name: String,
    /// 预测根目录.
    pub root: PathBuf,
}

impl ModelSpec {
    /// 读取受试者 `id` 的预测. 缺失时打印警告并返回 `None`.
    pub fn prediction(&self, id: &str) -> Option<MriLabel> {
        SubjectDir::new(&self.root, id).label(VolumeKind::Pred)
    }
}

/// 一次批处理的全部配置.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// 数据集根目录. 缺省时见 [`dataset_dir_from_env_or_home`].
    pub dataset: Option<PathBuf>,
    /// 待评估的模型.
    pub models: Vec<ModelSpec>,
    /// 特征与指标配置.
    pub extractor: ExtractorConfig,
}

impl RunConfig {
    /// 从 JSON 文本解析.
    pub fn from_json(s: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(s)?)
    }

    /// 确定数据集根目录: 配置优先, 否则见 [`dataset_dir_from_env_or_home`].
    pub fn dataset_dir(&self) -> Result<PathBuf, Error> {
        self.dataset
            .clone()
            .or_else(dataset_dir_from_env_or_home)
            .filter(|p| p.is_dir())
            .ok_or(Error::MissingDataset)
    }
}

/// 获取数据集根目录.
///
/// 1. 若环境变量 `$BRATS_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/brats`.
pub fn dataset_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var(DATASET_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => dataset::home_dataset_dir_with(["brats"]),
    }
}

/// 读取 `path` 处的运行配置.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig, Error> {
    let text = fs::read_to_string(path.as_ref())?;
    RunConfig::from_json(&text)
}

/// 若设置了 `$EXTRACT_CONFIG` 则从中读取运行配置, 否则使用缺省配置 (BraTS 标签, 无模型).
pub fn config_from_env_or_default() -> Result<RunConfig, Error> {
    match env::var(CONFIG_ENV) {
        Ok(p) if !p.is_empty() => {
            info!("Loading config from `{p}`");
            load_config(p)
        }
        _ => {
            warn!("${CONFIG_ENV} not set, using default BraTS config");
            Ok(RunConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mri_berry::config::MetricKind;

    #[test]
    fn test_parse_run_config() {
        let cfg = RunConfig::from_json(
            r#"{
                "dataset": "/data/brats",
                "models": [{"name": "unet", "root": "/data/unet"}],
                "extractor": {"metrics": ["dice", "haus"], "skip_background": false}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.dataset, Some(PathBuf::from("/data/brats")));
        assert_eq!(cfg.models[0].name, "unet");
        assert!(!cfg.extractor.skip_background);
        assert!(cfg.extractor.metrics.contains(MetricKind::Haus));
        assert!(!cfg.extractor.metrics.contains(MetricKind::Size));
        assert_eq!(cfg.extractor.labels.len(), 4);
    }

    #[test]
    fn test_empty_config() {
        let cfg = RunConfig::from_json("{}").unwrap();
        assert_eq!(cfg, RunConfig::default());
        assert!(matches!(RunConfig::from_json("[1"), Err(Error::Json(_))));
    }

    #[test]
    fn test_missing_dataset() {
        let cfg = RunConfig {
            dataset: Some(PathBuf::from("/definitely/not/a/dir")),
            ..Default::default()
        };
        assert!(matches!(cfg.dataset_dir(), Err(Error::MissingDataset)));
    }
}
