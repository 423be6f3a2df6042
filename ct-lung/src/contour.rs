//! 标签图轮廓提取.
//!
//! 输入为以浮点存储标签值的 2D / 3D 图像. 非零像素若存在标签值不同的邻居,
//! 则保留原值, 否则置为背景 0. 图像边界外不参与比较,
//! 因此贴边的均匀标签块不会因越界而整体变成轮廓.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};

/// 提取 2D 标签图的轮廓.
///
/// `fully_connected` 为 `true` 时以 8-邻接比较邻居, 否则以 4-邻接比较.
pub fn label_contours_2d(data: ArrayView2<'_, f32>, fully_connected: bool) -> Array2<f32> {
    let (h_len, w_len) = data.dim();
    let mut out = Array2::<f32>::zeros((h_len, w_len));

    Zip::indexed(&mut out).and(data).for_each(|(h, w), o, &pix| {
        if pix == 0.0 {
            return;
        }
        let mut differs = false;
        for dh in -1i64..=1 {
            for dw in -1i64..=1 {
                if (dh, dw) == (0, 0) || (!fully_connected && dh != 0 && dw != 0) {
                    continue;
                }
                let nh = h.wrapping_add_signed(dh as isize);
                let nw = w.wrapping_add_signed(dw as isize);
                if nh < h_len && nw < w_len && data[(nh, nw)] != pix {
                    differs = true;
                }
            }
        }
        if differs {
            *o = pix;
        }
    });
    out
}

/// 提取 3D 标签体数据的轮廓. 数据布局为 (z, H, W).
///
/// `fully_connected` 为 `true` 时以 26-邻接比较邻居, 否则以 6-邻接比较.
pub fn label_contours_3d(data: ArrayView3<'_, f32>, fully_connected: bool) -> Array3<f32> {
    let (z_len, h_len, w_len) = data.dim();
    let mut out = Array3::<f32>::zeros((z_len, h_len, w_len));

    Zip::indexed(&mut out)
        .and(data)
        .for_each(|(z, h, w), o, &pix| {
            if pix == 0.0 {
                return;
            }
            let mut differs = false;
            for dz in -1i64..=1 {
                for dh in -1i64..=1 {
                    for dw in -1i64..=1 {
                        if (dz, dh, dw) == (0, 0, 0) {
                            continue;
                        }
                        // 6-邻接仅保留单轴位移.
                        if !fully_connected && dz.abs() + dh.abs() + dw.abs() != 1 {
                            continue;
                        }
                        let nz = z.wrapping_add_signed(dz as isize);
                        let nh = h.wrapping_add_signed(dh as isize);
                        let nw = w.wrapping_add_signed(dw as isize);
                        if nz < z_len && nh < h_len && nw < w_len && data[(nz, nh, nw)] != pix {
                            differs = true;
                        }
                    }
                }
            }
            if differs {
                *o = pix;
            }
        });
    out
}

/// 对 3D 标签体数据逐水平切片独立提取 2D 轮廓.
///
/// 与 [`label_contours_3d`] 的区别在于相邻切片之间不做比较.
/// 启用 `rayon` feature 时切片间并行.
pub fn label_contours_slicewise(data: ArrayView3<'_, f32>, fully_connected: bool) -> Array3<f32> {
    let mut out = Array3::<f32>::zeros(data.dim());
    let z = Zip::from(out.axis_iter_mut(Axis(0))).and(data.axis_iter(Axis(0)));

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            z.par_for_each(|mut o, s| o.assign(&label_contours_2d(s, fully_connected)));
        } else {
            z.for_each(|mut o, s| o.assign(&label_contours_2d(s, fully_connected)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3, s};

    #[test]
    fn uniform_image_has_no_contour() {
        let data = ndarray::Array2::<f32>::ones((5, 5));
        let out = label_contours_2d(data.view(), false);
        // 边界外不参与比较, 全图同值则无轮廓.
        assert!(out.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn background_stays_background() {
        let data = ndarray::Array2::<f32>::zeros((4, 4));
        let out = label_contours_2d(data.view(), true);
        assert!(out.iter().all(|&p| p == 0.0));

        let vol = Array3::<f32>::zeros((3, 4, 4));
        for fully in [false, true] {
            let out = label_contours_3d(vol.view(), fully);
            assert!(out.iter().all(|&p| p == 0.0));
            let out = label_contours_slicewise(vol.view(), fully);
            assert!(out.iter().all(|&p| p == 0.0));
        }
    }

    #[test]
    fn filled_square_keeps_ring() {
        let mut data = ndarray::Array2::<f32>::zeros((7, 7));
        data.slice_mut(s![2..5, 2..5]).fill(3.0);
        let out = label_contours_2d(data.view(), false);
        // 中心像素的 4-邻居均为同值, 被清为背景.
        assert_eq!(out[(3, 3)], 0.0);
        assert_eq!(out[(2, 2)], 3.0);
        assert_eq!(out[(2, 3)], 3.0);
        assert_eq!(out[(4, 4)], 3.0);
    }

    #[test]
    fn touching_labels_form_contour_on_both_sides() {
        let data = array![[1.0f32, 1.0, 2.0, 2.0]];
        let out = label_contours_2d(data.view(), false);
        assert_eq!(out, array![[0.0f32, 1.0, 2.0, 0.0]]);
    }

    #[test]
    fn slicewise_ignores_neighbouring_slices() {
        // 仅第 0 层有一个实心方块, 第 1 层为纯背景.
        let mut data = Array3::<f32>::zeros((2, 5, 5));
        data.slice_mut(s![0..1, 1..4, 1..4]).fill(2.0);

        let by_slice = label_contours_slicewise(data.view(), false);
        let single = label_contours_2d(data.index_axis(ndarray::Axis(0), 0), false);
        assert_eq!(by_slice.index_axis(ndarray::Axis(0), 0), single);
        assert!(by_slice
            .index_axis(ndarray::Axis(0), 1)
            .iter()
            .all(|&p| p == 0.0));

        // 3D 模式下方块内部体素在 z 方向紧邻背景, 也是轮廓.
        let vol = label_contours_3d(data.view(), false);
        assert_eq!(vol[(0, 2, 2)], 2.0);
        assert_eq!(by_slice[(0, 2, 2)], 0.0);
    }
}
