//! 提取结果.

use log::info;
use mri_berry::config::{ExtractorConfig, MetricKind, MetricSelection};
use mri_berry::features::FeatureRecord;
use mri_berry::metrics::{CohortErrorMatrix, MetricRecord};
use std::io::{self, Write};
use utils::f64_to_display;

const S4: &str = "    ";

/// 忽略 NaN 的均值. 没有有效值时为 NaN.
fn nan_mean<I: IntoIterator<Item = f64>>(it: I) -> f64 {
    let (sum, n) = it
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// 将特征提取概况写进 `w` 中.
fn describe_features<W: Write>(records: &[FeatureRecord], w: &mut W) -> io::Result<()> {
    writeln!(w, "Features of {} subjects:", records.len())?;
    for r in records {
        write!(w, "{S4}{}: {} features, {} NaN", r.id, r.features.len(), r.features.nan_count())?;
        if !r.longitudinal_id.is_empty() {
            write!(w, " (longitudinal `{}`, t = {})", r.longitudinal_id, r.time_point)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// 提取的最终结果.
pub struct ExtractResult {
    kinds: MetricSelection,
    labels: Vec<String>,
    regions: Vec<String>,
    features: Vec<FeatureRecord>,
    metrics: Vec<MetricRecord>,
    cohorts: Vec<(String, CohortErrorMatrix)>,
}

impl ExtractResult {
    /// 汇总各部分结果.
    pub fn new(
        cfg: &ExtractorConfig,
        features: Vec<FeatureRecord>,
        metrics: Vec<MetricRecord>,
        cohorts: Vec<(String, CohortErrorMatrix)>,
    ) -> Self {
        Self {
            kinds: cfg.metrics.clone(),
            labels: cfg.labels.iter().map(|(_, n)| n.to_string()).collect(),
            regions: cfg.regions().into_iter().map(|r| r.name).collect(),
            features,
            metrics,
            cohorts,
        }
    }

    /// 提取了特征的受试者个数.
    #[inline]
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// 模型 `model` 参与误分类矩阵统计的受试者个数. 没有该模型时返回 `None`.
    pub fn cohort_subjects(&self, model: &str) -> Option<usize> {
        self.cohorts
            .iter()
            .find(|(m, _)| m == model)
            .map(|(_, c)| c.subjects())
    }

    /// 模型 `model` 在区域 `region` 上指标 `kind` 的队列均值 (忽略 NaN).
    pub fn mean(&self, model: &str, region: &str, kind: MetricKind) -> f64 {
        nan_mean(
            self.metrics
                .iter()
                .filter(|r| r.model == model && r.region == region)
                .filter_map(|r| r.get(kind)),
        )
    }

    /// 将指标均值与误分类矩阵写进 `w` 中.
    fn describe_model<W: Write>(&self, model: &str, cohort: &CohortErrorMatrix, w: &mut W) -> io::Result<()> {
        let n = self.cohort_subjects(model).unwrap_or_default();
        writeln!(w, "Model `{model}` ({n} subjects evaluated):")?;
        write!(w, "{S4}{:<8}", "region")?;
        for kind in self.kinds.iter() {
            write!(w, "{:>12}", kind.key())?;
        }
        writeln!(w)?;
        for region in self.regions.iter() {
            write!(w, "{S4}{region:<8}")?;
            for kind in self.kinds.iter() {
                write!(w, "{:>12}", f64_to_display(self.mean(model, region, kind)))?;
            }
            writeln!(w)?;
        }

        writeln!(w, "{S4}Averaged error matrix (row %):")?;
        let m = cohort.finish(true, true);
        for (name, row) in self.labels.iter().zip(m.rows()) {
            write!(w, "{S4}{S4}{name:<8}")?;
            for v in row {
                write!(w, "{v:>10.2}")?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    /// 写出完整报告.
    pub fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        describe_features(&self.features, w)?;
        for (model, cohort) in self.cohorts.iter() {
            utils::sep_to(&mut *w)?;
            self.describe_model(model, cohort, w)?;
        }
        Ok(())
    }

    /// 打印运行结果.
    pub fn analyze(&self) -> io::Result<()> {
        info!("Reporting {} subjects", self.feature_count());
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        utils::sep_to(&mut lock)?;
        self.describe_into(&mut lock)?;
        utils::sep_to(&mut lock)
    }
}
