use anyhow::Result;
use bbox::{HW, TLBR};
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// A rectangle tagged with a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label<R, C> {
    pub rect: R,
    pub class: C,
}

impl<R, C> Label<R, C> {
    pub fn map_rect<F, S>(self, f: F) -> Label<S, C>
    where
        F: FnOnce(R) -> S,
    {
        Label {
            rect: f(self.rect),
            class: self.class,
        }
    }
}

/// An annotated object with its class name and per-object flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLabel<R> {
    pub label: Label<R, String>,
    pub difficult: bool,
    pub truncated: bool,
    /// The pose or view name of the object.
    pub view: String,
}

impl<R> ObjectLabel<R> {
    pub fn class_name(&self) -> &str {
        &self.label.class
    }

    pub fn rect(&self) -> &R {
        &self.label.rect
    }
}

impl<T> ObjectLabel<TLBR<T>>
where
    T: Float,
{
    /// Convert the pixel box into ratio units of the image size.
    pub fn normalize(&self, size: &HW<T>) -> Result<Self> {
        let rect = self.label.rect.normalize(size)?;
        Ok(Self {
            label: self.label.clone().map_rect(|_| rect),
            difficult: self.difficult,
            truncated: self.truncated,
            view: self.view.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use bbox::prelude::*;

    #[test]
    fn normalize_keeps_attributes() {
        let object = ObjectLabel {
            label: Label {
                rect: TLBR::try_from_tlbr([10.0, 20.0, 30.0, 40.0]).unwrap(),
                class: "Mask".to_string(),
            },
            difficult: false,
            truncated: true,
            view: "Frontal".to_string(),
        };
        let size = HW::try_from_hw([100.0, 200.0]).unwrap();
        let normalized = object.normalize(&size).unwrap();

        assert_eq!(normalized.class_name(), "Mask");
        assert!(normalized.truncated);
        assert_eq!(normalized.view, "Frontal");
        assert_abs_diff_eq!(normalized.rect().t(), 0.1);
        assert_abs_diff_eq!(normalized.rect().r(), 0.2);
    }

    #[test]
    fn map_rect_keeps_class() {
        let label = Label {
            rect: [1, 2, 3, 4],
            class: 7usize,
        };
        let label = label.map_rect(|[t, l, b, r]| (b - t) * (r - l));
        assert_eq!(label.rect, 4);
        assert_eq!(label.class, 7);
    }
}
