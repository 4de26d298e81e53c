//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::{BoundingBox, IntensityWindow, MriLabel, MriScan, NiftiHeaderAttr, Spacing};
pub use crate::{Error, Result};

pub use crate::consts::label::{BACKGROUND, EDEMA, ENHANCING, NECROSIS};
pub use crate::consts::{PLANES, WHOLE};

pub use crate::config::{
    ExtractorConfig, FeatureGroup, FeatureSelection, LabelMap, LabelSpec, LongitudinalSpec,
    MetricKind, MetricSelection, Region,
};

pub use crate::dataset::{self, home_dataset_dir_with, list_subjects, subject_loader};
pub use crate::dataset::{Sequence, SubjectDir, SubjectVolumes, VolumeKind};

pub use crate::features::{assemble, FeatureMap, FeatureRecord, VolumeExtractor};

pub use crate::metrics::{
    evaluate_subject, one_hot_encode, CohortErrorMatrix, ErrorMatrix, MetricRecord,
};
