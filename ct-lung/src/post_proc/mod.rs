//! 肺部初始分割管线与逐切片后处理.

use ndarray::{s, Array3, ArrayView3, Zip};

use crate::components::{label_components_3d, relabel_by_size_3d, Connectivity3d};
use crate::consts::label::{BACKGROUND, BODY, LUNG, LUNG_SECOND};
use crate::consts::{LUNG_SPLIT_RATIO, SALT_PEPPER_MIN_AREA_MM2};
use crate::data::LabelSliceMut;
use crate::threshold::{masked_min_max, Histogram};
use crate::{CtLabel, CtScan, NiftiHeaderAttr};

pub mod morph2d;

pub use morph2d::{close_diamond, fill_cavities, repair_salt_and_pepper};

/// 逐切片后处理的执行策略.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// 按 z 降序逐切片串行处理.
    #[default]
    Sequential,

    /// 切片间并行处理.
    #[cfg(feature = "rayon")]
    Rayon,
}

/// 对单张切片的肺部标签做形态学修复:
/// 闭运算弥合细缝, 填充内部腔体, 再做椒盐修复.
///
/// 修复在二值缓冲上进行, 写回时只做 "置位",
/// 因此修复阶段移除的像素不会从切片上消失.
fn repair_lung_slice(mut slice: LabelSliceMut, lung_labels: &[u8], min_px: usize) {
    for &lbl in lung_labels {
        let mut buf = slice.binary_mask(lbl);
        close_diamond(&mut buf);
        fill_cavities(&mut buf);
        repair_salt_and_pepper(&mut buf, min_px);
        slice.overlay_foreground(&buf, lbl);
    }
}

/// 从 3D CT 扫描分割出躯干与肺部, 输出四值标注:
/// [`BACKGROUND`] 为体外空气, [`BODY`] 为躯干,
/// [`LUNG`] / [`LUNG_SECOND`] 为肺部气体连通域.
///
/// # 流程
///
/// 1. 统计掩膜内强度范围, 建 200-bin 直方图并以 Otsu 准则选取气体/组织阈值;
/// 2. 对低于阈值的气体体素做 6-邻接 3D 连通域标记 (H/W 方向各补一圈体外空气,
///    保证体外背景连成单一连通域), 并按体积降序重标号;
/// 3. 按 [`LUNG_SPLIT_RATIO`] 判定左右肺是否各自成域, 映射出四值标注;
/// 4. 保留最大的躯干-肺前景连通域, 清除反相引入的游离躯干小岛;
/// 5. 按 `par` 策略逐切片做闭运算, 腔体填充与椒盐修复.
///
/// # 参数
///
/// `mask` 为感兴趣区域掩膜 (非零处参与统计与分割), 缺省时视作全图.
/// 掩膜形状必须与扫描一致, 否则程序 panic.
pub fn extract_lungs(scan: &CtScan, mask: Option<&CtLabel>, par: Parallelism) -> CtLabel {
    let (z_len, h_len, w_len) = scan.shape();
    let data = scan.data();

    let all_ones;
    let mview: ArrayView3<u8> = match mask {
        Some(m) => {
            assert_eq!(m.shape(), scan.shape(), "掩膜形状与扫描不符");
            m.data()
        }
        None => {
            all_ones = Array3::<u8>::ones(scan.shape());
            all_ones.view()
        }
    };

    let (lo, hi) = masked_min_max(data, mview);
    assert!(lo < hi, "掩膜内强度恒定, 无法分割");
    let mut hist = Histogram::with_default_bins(lo, hi);
    hist.add_masked(data, mview);
    let t = hist.otsu_threshold();

    // H/W 方向各补一圈 "体外空气", 使体外背景始终连成单一连通域.
    let mut air = Array3::<u8>::ones((z_len, h_len + 2, w_len + 2));
    {
        let mut interior = air.slice_mut(s![.., 1..h_len + 1, 1..w_len + 1]);
        Zip::from(&mut interior)
            .and(data)
            .and(mview)
            .for_each(|a, &v, &m| *a = u8::from(m != 0 && v < t));
    }

    let (mut air_labels, count) = label_components_3d(air.view(), Connectivity3d::Six);
    let sizes = relabel_by_size_3d(&mut air_labels, count);

    // 降序排列后: 1 号为体外背景, 2 号为肺 (或双肺合并域), 3 号为第二个肺或噪声.
    let separated = count >= 3 && sizes[2] as f64 >= LUNG_SPLIT_RATIO * sizes[1] as f64;

    let mut out = Array3::<u8>::zeros((z_len, h_len, w_len));
    let interior = air_labels.slice(s![.., 1..h_len + 1, 1..w_len + 1]);
    Zip::from(&mut out)
        .and(interior)
        .and(mview)
        .for_each(|o, &l, &m| {
            *o = if m == 0 {
                BACKGROUND
            } else {
                match l {
                    0 => BODY,
                    1 => BACKGROUND,
                    2 => LUNG,
                    3 if separated => LUNG_SECOND,
                    // 其余气体连通域按噪声处理.
                    _ => BACKGROUND,
                }
            };
        });

    // 反相映射会引入游离的躯干小岛 (扫描床, 衣物等),
    // 仅保留最大的躯干-肺前景连通域, 其余清为背景.
    let fg = out.map(|&p| u8::from(p != 0));
    let (mut body_labels, nbody) = label_components_3d(fg.view(), Connectivity3d::Six);
    if nbody > 1 {
        relabel_by_size_3d(&mut body_labels, nbody);
        Zip::from(&mut out).and(&body_labels).for_each(|o, &l| {
            if l > 1 {
                *o = BACKGROUND;
            }
        });
    }

    let mut label = CtLabel::with_header(scan.header(), out);
    let min_px = (SALT_PEPPER_MIN_AREA_MM2 / label.slice_pixel() + 0.5) as usize;
    let lung_labels: &[u8] = if separated {
        &[LUNG, LUNG_SECOND]
    } else {
        &[LUNG]
    };

    match par {
        Parallelism::Sequential => {
            for z in (0..z_len).rev() {
                repair_lung_slice(label.slice_at_mut(z), lung_labels, min_px);
            }
        }
        #[cfg(feature = "rayon")]
        Parallelism::Rayon => {
            let mut view = label.data_mut();
            Zip::from(view.axis_iter_mut(ndarray::Axis(0)))
                .par_for_each(|sl| repair_lung_slice(LabelSliceMut::new(sl), lung_labels, min_px));
        }
    }
    label
}
