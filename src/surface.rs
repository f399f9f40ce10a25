//! Display surface sizing
//!
//! Keeps the engine's canvas at the engine's aspect ratio inside a container
//! of any size, centred, with the slack split evenly on both sides.

use std::cell::Cell;

/// Container box in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerBox {
    pub width: f64,
    pub height: f64,
}

impl ContainerBox {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// Placement of the surface inside its container
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Largest box of `target_aspect` that fits `container`, centred.
///
/// The constrained side is rounded to whole pixels.
pub fn fit_surface(container: ContainerBox, target_aspect: f64) -> SurfaceRect {
    if container.is_degenerate() || !(target_aspect.is_finite() && target_aspect > 0.0) {
        return SurfaceRect::default();
    }

    let ContainerBox { width, height } = container;
    let (surface_w, surface_h) = if width / height == target_aspect {
        (width, height)
    } else {
        let candidate_w = (height * target_aspect).round();
        if candidate_w <= width {
            (candidate_w, height)
        } else {
            (width, (width / target_aspect).round())
        }
    };

    SurfaceRect {
        left: width / 2.0 - surface_w / 2.0,
        top: height / 2.0 - surface_h / 2.0,
        width: surface_w,
        height: surface_h,
    }
}

/// Receives each new surface placement
pub trait SurfaceSink {
    fn apply(&self, rect: &SurfaceRect);
}

impl<F: Fn(&SurfaceRect)> SurfaceSink for F {
    fn apply(&self, rect: &SurfaceRect) {
        self(rect)
    }
}

/// Recomputes the surface placement whenever the container changes
pub struct SurfaceSizer<S: SurfaceSink> {
    target_aspect: f64,
    sink: S,
    last: Cell<Option<SurfaceRect>>,
}

impl<S: SurfaceSink> SurfaceSizer<S> {
    pub fn new(target_aspect: f64, sink: S) -> Self {
        Self {
            target_aspect,
            sink,
            last: Cell::new(None),
        }
    }

    /// Last placement handed to the sink
    pub fn current(&self) -> Option<SurfaceRect> {
        self.last.get()
    }

    /// Container changed; forwards to the sink only if the placement moved
    pub fn relayout(&self, container: ContainerBox) -> SurfaceRect {
        let rect = fit_surface(container, self.target_aspect);
        if self.last.get() != Some(rect) {
            self.last.set(Some(rect));
            self.sink.apply(&rect);
        }
        rect
    }

    /// Recompute and always forward, e.g. once the engine has set its own
    /// resolution and may have reset the canvas style
    pub fn force_relayout(&self, container: ContainerBox) -> SurfaceRect {
        let rect = fit_surface(container, self.target_aspect);
        self.last.set(Some(rect));
        self.sink.apply(&rect);
        rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const FOUR_THREE: f64 = 800.0 / 600.0;

    #[test]
    fn test_wide_container_pillarboxes() {
        let rect = fit_surface(ContainerBox::new(1000.0, 600.0), FOUR_THREE);
        assert_eq!(
            rect,
            SurfaceRect {
                left: 100.0,
                top: 0.0,
                width: 800.0,
                height: 600.0,
            }
        );
    }

    #[test]
    fn test_square_container_letterboxes() {
        let rect = fit_surface(ContainerBox::new(400.0, 400.0), FOUR_THREE);
        assert_eq!(
            rect,
            SurfaceRect {
                left: 0.0,
                top: 50.0,
                width: 400.0,
                height: 300.0,
            }
        );
    }

    #[test]
    fn test_exact_aspect_fills_container() {
        let rect = fit_surface(ContainerBox::new(1024.0, 768.0), FOUR_THREE);
        assert_eq!(rect.width, 1024.0);
        assert_eq!(rect.height, 768.0);
        assert_eq!((rect.left, rect.top), (0.0, 0.0));
    }

    #[test]
    fn test_degenerate_container() {
        assert_eq!(
            fit_surface(ContainerBox::new(0.0, 600.0), FOUR_THREE),
            SurfaceRect::default()
        );
        assert_eq!(
            fit_surface(ContainerBox::new(f64::NAN, 600.0), FOUR_THREE),
            SurfaceRect::default()
        );
        assert_eq!(
            fit_surface(ContainerBox::new(800.0, 600.0), 0.0),
            SurfaceRect::default()
        );
    }

    #[test]
    fn test_sizer_forwards_only_changes() {
        let applied = Rc::new(RefCell::new(Vec::new()));
        let log = applied.clone();
        let sizer = SurfaceSizer::new(FOUR_THREE, move |rect: &SurfaceRect| {
            log.borrow_mut().push(*rect)
        });

        sizer.relayout(ContainerBox::new(1000.0, 600.0));
        sizer.relayout(ContainerBox::new(1000.0, 600.0));
        assert_eq!(applied.borrow().len(), 1);

        sizer.relayout(ContainerBox::new(400.0, 400.0));
        assert_eq!(applied.borrow().len(), 2);

        sizer.force_relayout(ContainerBox::new(400.0, 400.0));
        assert_eq!(applied.borrow().len(), 3);
        assert_eq!(sizer.current().map(|r| r.height), Some(300.0));
    }

    proptest! {
        #[test]
        fn surface_fits_container(
            width in 1.0f64..4000.0,
            height in 1.0f64..4000.0,
            aspect in 0.25f64..4.0,
        ) {
            let container = ContainerBox::new(width, height);
            let rect = fit_surface(container, aspect);
            prop_assert!(rect.width <= width);
            // Rounding on the letterboxed axis can overshoot slightly
            prop_assert!(rect.height <= height + 0.5 + 0.5 / aspect);
            prop_assert!(rect.width == width || rect.height == height);
            prop_assert_eq!(rect, fit_surface(container, aspect));
        }
    }
}
