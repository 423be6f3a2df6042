//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::{
    CtLabel, CtScan, DeformationField, LabelSlice, LabelSliceMut, NiftiHeaderAttr,
};

pub use crate::consts::label::{BACKGROUND, BODY, LUNG, LUNG_SECOND};
pub use crate::consts::{HISTOGRAM_BINS, LUNG_SPLIT_RATIO, SALT_PEPPER_MIN_AREA_MM2};

pub use crate::components::{Connectivity2d, Connectivity3d};
pub use crate::contour::{label_contours_2d, label_contours_3d, label_contours_slicewise};
pub use crate::error::{FieldError, FitError, LandmarkError};
pub use crate::field::{export_landmark_pairs, SampleMode};
pub use crate::fitting::{fit_bspline_curve, BSplineCurve, FitParams};
pub use crate::landmarks::{read_landmarks, LandmarkSet};
pub use crate::post_proc::{extract_lungs, Parallelism};
