//! 掩膜内强度统计与 Otsu 阈值选取.

use ndarray::{ArrayView3, Zip};
use ordered_float::NotNan;

use crate::consts::HISTOGRAM_BINS;

/// 统计 `data` 中掩膜 (非零) 覆盖处的最小与最大强度.
///
/// 两个数组形状必须一致, 且掩膜至少覆盖一个体素, 否则程序 panic.
pub fn masked_min_max(data: ArrayView3<'_, f32>, mask: ArrayView3<'_, u8>) -> (f32, f32) {
    assert_eq!(data.dim(), mask.dim(), "数据与掩膜形状不符");
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    Zip::from(data).and(mask).for_each(|&v, &m| {
        if m != 0 {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    });
    assert!(lo <= hi, "掩膜未覆盖任何体素");
    (lo, hi)
}

/// 等宽强度直方图.
#[derive(Debug, Clone)]
pub struct Histogram {
    counts: Vec<u64>,
    min: f32,
    max: f32,
}

impl Histogram {
    /// 在闭区间 \[`min`, `max`\] 上创建 `bins` 个等宽 bin 的空直方图.
    ///
    /// 要求 `bins >= 2` 且 `min < max`, 否则程序 panic.
    pub fn new(bins: usize, min: f32, max: f32) -> Self {
        assert!(bins >= 2, "bin 个数至少为 2");
        assert!(min < max, "直方图区间为空");
        Self {
            counts: vec![0; bins],
            min,
            max,
        }
    }

    /// 以默认 bin 个数 [`HISTOGRAM_BINS`] 创建空直方图.
    #[inline]
    pub fn with_default_bins(min: f32, max: f32) -> Self {
        Self::new(HISTOGRAM_BINS, min, max)
    }

    /// bin 个数.
    #[inline]
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// 单个 bin 的宽度.
    #[inline]
    fn bin_width(&self) -> f64 {
        (self.max - self.min) as f64 / self.bins() as f64
    }

    /// 计入一个强度值. 区间外的值被压到首/尾 bin.
    pub fn add(&mut self, v: f32) {
        let idx = ((v - self.min) as f64 / self.bin_width()).floor();
        let idx = (idx.max(0.0) as usize).min(self.bins() - 1);
        self.counts[idx] += 1;
    }

    /// 计入 `data` 中掩膜 (非零) 覆盖处的所有强度值.
    ///
    /// 两个数组形状必须一致, 否则程序 panic.
    pub fn add_masked(&mut self, data: ArrayView3<'_, f32>, mask: ArrayView3<'_, u8>) {
        assert_eq!(data.dim(), mask.dim(), "数据与掩膜形状不符");
        Zip::from(data).and(mask).for_each(|&v, &m| {
            if m != 0 {
                self.add(v);
            }
        });
    }

    /// 已计入的样本总数.
    #[inline]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// 经典 Otsu 准则: 选取使类间方差最大的划分, 返回对应 bin 的上边界强度.
    ///
    /// 以返回值 `t` 做 `v >= t` 二值化时, 最优 bin 本身落入低类.
    /// 直方图为空时程序 panic.
    pub fn otsu_threshold(&self) -> f32 {
        let total = self.total();
        assert!(total > 0, "空直方图无法选取阈值");
        let total = total as f64;

        // 以 bin 中心为代表强度.
        let center = |i: usize| self.min as f64 + (i as f64 + 0.5) * self.bin_width();
        let global_sum: f64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, &c)| c as f64 * center(i))
            .sum();

        let mut w0 = 0.0f64;
        let mut sum0 = 0.0f64;
        let mut best = 0usize;
        let mut best_sigma = NotNan::new(-1.0).unwrap();
        for i in 0..self.bins() - 1 {
            w0 += self.counts[i] as f64;
            sum0 += self.counts[i] as f64 * center(i);
            let w1 = total - w0;
            if w0 == 0.0 || w1 == 0.0 {
                continue;
            }
            let d = sum0 / w0 - (global_sum - sum0) / w1;
            // 类间方差 w0 * w1 * (mu0 - mu1)^2.
            let sigma = NotNan::new(w0 * w1 * d * d).unwrap();
            if sigma > best_sigma {
                best_sigma = sigma;
                best = i;
            }
        }

        self.min + ((best + 1) as f64 * self.bin_width()) as f32
    }
}
