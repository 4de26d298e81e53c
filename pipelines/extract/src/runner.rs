//! 程序运行函数.

use log::{debug, error, info};
use mri_berry::config::{ExtractorConfig, Region};
use mri_berry::dataset::{self, SubjectDir};
use mri_berry::features::{assemble, FeatureRecord};
use mri_berry::metrics::{evaluate_subject, CohortErrorMatrix, ErrorMatrix, MetricRecord};
use mri_berry::MriLabel;
use rayon::prelude::*;
use std::path::Path;
use utils::{Error, ModelSpec};

use crate::result::ExtractResult;

/// 单个受试者的全部产出.
struct SubjectOutcome {
    features: FeatureRecord,
    metrics: Vec<MetricRecord>,
    /// 与模型列表一一对应. 真值或预测缺失时为 `None`.
    errors: Vec<Option<ErrorMatrix>>,
}

/// 比较一个受试者的真值与某个模型的预测.
fn compare(
    id: &str,
    gt: &MriLabel,
    pred: &MriLabel,
    regions: &[Region],
    labels: &[u8],
    cfg: &ExtractorConfig,
) -> mri_berry::Result<(Vec<MetricRecord>, ErrorMatrix)> {
    let records = evaluate_subject(gt, pred, id, regions, &cfg.metrics)?;
    let errors = ErrorMatrix::compute(gt.data(), pred.data(), labels)?;
    Ok((records, errors))
}

/// 处理单个受试者. 只读共享 `cfg`, 不修改任何外部状态.
///
/// 某个模型的比较失败 (如形状不一致) 时只放弃这一对比较, 其余结果照常保留.
fn process(root: &Path, id: &str, models: &[ModelSpec], cfg: &ExtractorConfig) -> SubjectOutcome {
    let mut volumes = SubjectDir::new(root, id).load();
    if let Some(seg) = volumes.seg.as_mut() {
        cfg.remap_label(seg);
    }
    let features = assemble(id, &volumes, cfg);
    debug!("{id}: {} features, {} NaN", features.features.len(), features.features.nan_count());

    let regions = cfg.regions();
    let labels: Vec<u8> = cfg.labels.ids().collect();
    let mut metrics = Vec::new();
    let mut errors = Vec::with_capacity(models.len());
    for model in models {
        let (Some(gt), Some(mut pred)) = (volumes.seg(), model.prediction(id)) else {
            errors.push(None);
            continue;
        };
        cfg.remap_label(&mut pred);
        match compare(id, gt, &pred, &regions, &labels, cfg) {
            Ok((records, m)) => {
                metrics.extend(records.into_iter().map(|r| r.with_model(&model.name)));
                errors.push(Some(m));
            }
            Err(e) => {
                error!("{id}: comparison with `{}` skipped: {e}", model.name);
                errors.push(None);
            }
        }
    }

    info!("Subject `{id}` done");
    SubjectOutcome {
        features,
        metrics,
        errors,
    }
}

/// 以模型为单位并行归约误分类矩阵.
fn cohort_of(outcomes: &[SubjectOutcome], k: usize, labels: &[u8]) -> Result<CohortErrorMatrix, Error> {
    let ans = outcomes
        .par_iter()
        .filter_map(|o| o.errors[k].as_ref())
        .try_fold(
            || CohortErrorMatrix::new(labels),
            |mut acc, m| acc.add(m).map(|_| acc),
        )
        .try_reduce(|| CohortErrorMatrix::new(labels), CohortErrorMatrix::merge)?;
    Ok(ans)
}

/// 实际运行.
pub fn run() -> Result<ExtractResult, Error> {
    let cfg = utils::loader::config_from_env_or_default()?;
    let root = cfg.dataset_dir()?;
    run_with(&root, &cfg.models, &cfg.extractor)
}

/// 在 `root` 下对全部受试者运行.
pub fn run_with(root: &Path, models: &[ModelSpec], cfg: &ExtractorConfig) -> Result<ExtractResult, Error> {
    let ids = dataset::list_subjects(root)?;
    println!("Extracting {} subjects on {} threads...", ids.len(), utils::cpus());

    // 各受试者相互独立. `collect` 之后再顺序汇总.
    let outcomes: Vec<_> = ids
        .par_iter()
        .map(|id| process(root, id, models, cfg))
        .collect();

    let labels: Vec<u8> = cfg.labels.ids().collect();
    let cohorts = models
        .iter()
        .enumerate()
        .map(|(k, m)| Ok((m.name.clone(), cohort_of(&outcomes, k, &labels)?)))
        .collect::<Result<Vec<_>, Error>>()?;

    let mut features = Vec::with_capacity(outcomes.len());
    let mut metrics = Vec::new();
    for o in outcomes {
        features.push(o.features);
        metrics.extend(o.metrics);
    }
    Ok(ExtractResult::new(cfg, features, metrics, cohorts))
}
