//! 二维水平切片视图.

use ndarray::iter::{Iter, IterMut};
use ndarray::{Array2, ArrayView2, ArrayViewMut2, Ix2};
use std::ops::{Index, IndexMut};

use crate::Idx2d;

/// 不可变、借用的二维水平 CT 标签切片.
pub struct LabelSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::CtLabel`].
    ///
    /// 这里有意把代码写死为 `ArrayView` 降低灵活性, 但使结构的意图更加明确.
    data: ArrayView2<'a, u8>,
}

impl Index<Idx2d> for LabelSlice<'_> {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

/// 可变、借用的二维水平 CT 标签切片.
pub struct LabelSliceMut<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::CtLabel`].
    ///
    /// 这里有意把代码写死为 `ArrayViewMut` 降低灵活性, 但使结构的意图更加明确.
    data: ArrayViewMut2<'a, u8>,
}

/// 可变方法集合.
impl<'a> LabelSliceMut<'a> {
    /// 获得 **底层** 数据的一份可变 shallow copy.
    #[inline]
    pub fn array_view_mut(&mut self) -> ArrayViewMut2<u8> {
        self.data.view_mut()
    }

    /// 获取可以迭代并修改图像像素的迭代器.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, u8, Ix2> {
        self.data.iter_mut()
    }

    /// 获取给定位置 (高, 宽) 的像素值, 并可就地修改. 越界时返回 `None`.
    #[inline]
    pub fn get_mut(&mut self, pos: Idx2d) -> Option<&mut u8> {
        self.data.get_mut(pos)
    }

    /// 将水平切片标注中值为 `old` 的像素全部替换为 `new`.
    ///
    /// 返回总共成功替换的个数.
    pub fn replace(&mut self, old: u8, new: u8) -> usize {
        let mut cnt = 0usize;
        self.data
            .iter_mut()
            .filter(|pix| **pix == old)
            .for_each(|p| {
                cnt += 1;
                *p = new;
            });
        cnt
    }

    /// 将二值缓冲 `buf` 中的前景 (非零) 像素以 `label` 覆写回切片.
    ///
    /// 仅做 "置位" 而不做 "清零": 缓冲中为 0 的位置保持切片原值不变.
    /// 如果 `buf` 形状与切片不符, 则程序 panic.
    pub fn overlay_foreground(&mut self, buf: &Array2<u8>, label: u8) {
        assert_eq!(buf.dim(), self.shape(), "二值缓冲形状不符");
        for (w, r) in self.data.iter_mut().zip(buf.iter()) {
            if *r != 0 {
                *w = label;
            }
        }
    }
}

impl Index<Idx2d> for LabelSliceMut<'_> {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx2d> for LabelSliceMut<'_> {
    #[inline]
    fn index_mut(&mut self, index: Idx2d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

/// label 不可变方法集合.
macro_rules! impl_label_slice_immut {
    ($life: lifetime, $slice: ty, $array: ty) => {
        /// 不可变方法集合.
        impl<$life> $slice {
            /// 直接初始化.
            #[inline]
            pub(crate) fn new(data: $array) -> Self {
                Self { data }
            }

            /// 获得 **底层** 数据的一份不可变 shallow copy.
            #[inline]
            pub fn array_view(&self) -> ArrayView2<u8> {
                self.data.view()
            }

            /// 获取可以迭代图像像素的迭代器.
            #[inline]
            pub fn iter(&self) -> Iter<'_, u8, Ix2> {
                self.data.iter()
            }

            /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
            #[inline]
            pub fn get(&self, pos: Idx2d) -> Option<&u8> {
                self.data.get(pos)
            }

            /// 图像的分辨率 (高, 宽).
            #[inline]
            pub fn shape(&self) -> Idx2d {
                let &[h, w] = self.data.shape() else {
                    unreachable!()
                };
                (h, w)
            }

            /// 图像的像素个数.
            #[inline]
            pub fn size(&self) -> usize {
                let (h, w) = self.shape();
                h * w
            }

            /// 判断一个索引是否合法 (未越界).
            #[inline]
            pub fn check(&self, (h, w): Idx2d) -> bool {
                let (h_len, w_len) = self.shape();
                h < h_len && w < w_len
            }

            /// 获得图像的高.
            #[inline]
            pub fn height(&self) -> usize {
                self.shape().0
            }

            /// 获得图像的宽.
            #[inline]
            pub fn width(&self) -> usize {
                self.shape().1
            }

            /// 判断一个索引是否位于图像的边缘.
            #[inline]
            pub fn is_at_border(&self, (h, w): Idx2d) -> bool {
                h == 0
                    || h.saturating_add(1) == self.height()
                    || w == 0
                    || w.saturating_add(1) == self.width()
            }

            /// 统计图像中值为 `label` 的像素总个数.
            #[inline]
            pub fn count(&self, label: u8) -> usize {
                self.data.iter().filter(|&p| *p == label).count()
            }

            /// 以行优先规则, 获取能迭代图像所有 `(索引, 像素值)` 的迭代器.
            #[inline]
            pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &u8)> {
                self.data.indexed_iter()
            }

            /// 生成切片的拥有所有权的二值镜像: 值为 `fg` 的像素取 1, 其余取 0.
            pub fn binary_mask(&self, fg: u8) -> Array2<u8> {
                self.data.map(|&p| u8::from(p == fg))
            }
        }
    };
}
impl_label_slice_immut!('a, LabelSlice<'a>, ArrayView2<'a, u8>);
impl_label_slice_immut!('a, LabelSliceMut<'a>, ArrayViewMut2<'a, u8>);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn binary_mask_and_overlay() {
        let mut data = array![[0u8, 2, 2], [1, 0, 2], [0, 1, 1]];
        let view = LabelSlice::new(data.view());
        let mask = view.binary_mask(2);
        assert_eq!(mask, array![[0u8, 1, 1], [0, 0, 1], [0, 0, 0]]);

        let mut buf = mask;
        buf[(0, 1)] = 0;
        let mut view = LabelSliceMut::new(data.view_mut());
        view.overlay_foreground(&buf, 3);
        // buf 中清零的位置不受影响.
        assert_eq!(data, array![[0u8, 2, 3], [1, 0, 3], [0, 1, 1]]);
    }

    #[test]
    fn replace_counts() {
        let mut data = array![[1u8, 1], [0, 1]];
        let mut view = LabelSliceMut::new(data.view_mut());
        assert_eq!(view.replace(1, 2), 3);
        assert_eq!(view.count(2), 3);
        assert_eq!(view.count(1), 0);
    }

    #[test]
    fn border_predicate() {
        let data = Array2::<u8>::zeros((4, 5));
        let view = LabelSlice::new(data.view());
        assert!(view.is_at_border((0, 2)));
        assert!(view.is_at_border((3, 2)));
        assert!(view.is_at_border((2, 4)));
        assert!(!view.is_at_border((2, 2)));
    }
}
