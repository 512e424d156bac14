use ndarray::Array2;

/// Axis-aligned box stored as top-left corner plus size.
///
/// Detectors speak corners (`[x1, y1, x2, y2]`), the motion model speaks
/// `[center_x, center_y, area, width / height]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Box spanning the corners `(x1, y1)` and `(x2, y2)`.
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Box from motion-model coordinates.
    ///
    /// Non-positive area or aspect ratio collapse to an empty box at the center.
    pub fn from_xysr(cx: f64, cy: f64, scale: f64, aspect_ratio: f64) -> Self {
        let (w, h) = if scale > 0.0 && aspect_ratio > 0.0 {
            let w = (scale * aspect_ratio).sqrt();
            (w, scale / w)
        } else {
            (0.0, 0.0)
        };
        Self::new(
            (cx - w / 2.0) as f32,
            (cy - h / 2.0) as f32,
            w as f32,
            h as f32,
        )
    }

    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }

    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Motion-model measurement `[center_x, center_y, area, width / height]`.
    pub fn to_xysr(&self) -> [f64; 4] {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let (cx, cy) = self.center();
        let aspect_ratio = if h > 0.0 { w / h } else { 0.0 };
        [f64::from(cx), f64::from(cy), w * h, aspect_ratio]
    }

    #[inline]
    fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + 0.5 * self.width, self.y + 0.5 * self.height)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.to_tlwh().iter().all(|v| v.is_finite())
    }

    /// True when the box covers no area (NaN sizes included).
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Clip to `[0, width] x [0, height]`. A box entirely outside comes back empty.
    pub fn clip(&self, width: f32, height: f32) -> Rect {
        let [x1, y1, x2, y2] = self.to_tlbr();
        let (x1, x2) = (x1.clamp(0.0, width), x2.clamp(0.0, width));
        let (y1, y2) = (y1.clamp(0.0, height), y2.clamp(0.0, height));
        Rect::from_tlbr(x1, y1, x2.max(x1), y2.max(y1))
    }

    /// Intersection over union; 0 when both boxes are empty.
    pub fn iou(&self, other: &Rect) -> f32 {
        let overlap_w = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let overlap_h = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        let overlap = overlap_w * overlap_h;
        let union = self.area() + other.area() - overlap;
        if union > 0.0 { overlap / union } else { 0.0 }
    }
}

/// Pairwise IoU, rows indexed by `rows`, columns by `cols`.
pub fn iou_batch(rows: &[Rect], cols: &[Rect]) -> Array2<f32> {
    Array2::from_shape_fn((rows.len(), cols.len()), |(i, j)| rows[i].iou(&cols[j]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_corner_and_size_forms_agree() {
        let person = Rect::from_tlbr(120.0, 40.0, 180.0, 200.0);
        assert_eq!(person.to_tlwh(), [120.0, 40.0, 60.0, 160.0]);
        assert_eq!(person.to_tlbr(), [120.0, 40.0, 180.0, 200.0]);
        assert_eq!(person.center(), (150.0, 120.0));
        assert_eq!(person.area(), 9600.0);
    }

    #[test]
    fn test_motion_space_round_trip() {
        let person = Rect::new(120.0, 40.0, 60.0, 160.0);
        let [cx, cy, s, r] = person.to_xysr();
        assert_eq!((cx, cy, s), (150.0, 120.0, 9600.0));
        assert!((r - 0.375).abs() < 1e-9);

        let back = Rect::from_xysr(cx, cy, s, r);
        for (a, b) in back.to_tlwh().iter().zip(person.to_tlwh()) {
            assert!(close(*a, b));
        }
    }

    #[test]
    fn test_degenerate_motion_state_collapses() {
        let rect = Rect::from_xysr(25.0, 40.0, -5.0, 0.75);
        assert!(rect.is_empty());
        assert_eq!(rect.center(), (25.0, 40.0));
        assert!(Rect::from_xysr(25.0, 40.0, 100.0, 0.0).is_empty());
    }

    #[test]
    fn test_clip() {
        let rect = Rect::from_tlbr(-10.0, 5.0, 50.0, 120.0);
        assert_eq!(rect.clip(40.0, 100.0).to_tlbr(), [0.0, 5.0, 40.0, 100.0]);

        let outside = Rect::from_tlbr(200.0, 200.0, 260.0, 260.0);
        assert!(outside.clip(100.0, 100.0).is_empty());
    }

    #[test]
    fn test_is_finite() {
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).is_finite());
        assert!(!Rect::new(f32::NAN, 0.0, 1.0, 1.0).is_finite());
        assert!(!Rect::from_tlbr(0.0, 0.0, f32::INFINITY, 1.0).is_finite());
    }

    #[test]
    fn test_iou_cases() {
        let a = Rect::new(0.0, 0.0, 20.0, 40.0);
        // Half of `a` shifted right: overlap 10x40, union 1200.
        assert!(close(a.iou(&Rect::new(10.0, 0.0, 20.0, 40.0)), 400.0 / 1200.0));
        assert!(close(a.iou(&a), 1.0));
        assert_eq!(a.iou(&Rect::new(20.0, 0.0, 20.0, 40.0)), 0.0);
        assert_eq!(Rect::default().iou(&Rect::default()), 0.0);
    }

    #[test]
    fn test_iou_batch_shape() {
        let tracks = [Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(50.0, 50.0, 10.0, 10.0)];
        let dets = [Rect::new(0.0, 0.0, 10.0, 10.0)];
        let ious = iou_batch(&tracks, &dets);
        assert_eq!(ious.dim(), (2, 1));
        assert!(close(ious[[0, 0]], 1.0));
        assert_eq!(ious[[1, 0]], 0.0);
    }
}
