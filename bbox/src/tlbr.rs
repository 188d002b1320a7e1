use super::{Rect, HW};
use crate::common::*;

/// Bounding box in TLBR format.
///
/// The box is stored as top, left, bottom and right edges. It is either in
/// pixel units or, after [normalize](TLBR::normalize), in ratio units of the
/// image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T> {
    pub fn try_cast<V>(self) -> Option<TLBR<V>>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        Some(TLBR {
            t: V::from(self.t)?,
            l: V::from(self.l)?,
            b: V::from(self.b)?,
            r: V::from(self.r)?,
        })
    }
}

impl<T> TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Build a box from its top-left and bottom-right corners, each in `[y, x]` order.
    pub fn try_from_corners(top_left: [T; 2], bottom_right: [T; 2]) -> Result<Self> {
        let [t, l] = top_left;
        let [b, r] = bottom_right;
        Self::try_from_tlbr([t, l, b, r])
    }
}

impl<T> TLBR<T>
where
    T: Float,
{
    /// Divide vertical edges by the image height and horizontal edges by the image width.
    pub fn normalize(&self, size: &HW<T>) -> Result<TLBR<T>> {
        ensure!(
            size.is_positive(),
            "cannot normalize a box against a zero-sized image"
        );
        let h = size.h();
        let w = size.w();

        Ok(TLBR {
            t: self.t / h,
            l: self.l / w,
            b: self.b / h,
            r: self.r / w,
        })
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn h(&self) -> Self::Type {
        self.b - self.t
    }

    fn w(&self) -> Self::Type {
        self.r - self.l
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self { t, l, b, r })
    }
}
