use crate::config::PieGeometry;
use crate::model::Task;
use std::f64::consts::PI;

const PENDING_FILL: &str = "#3b82f6";
const COMPLETED_FILL: &str = "#10b981";

/// A pie sector in degrees, clockwise from 12 o'clock, with its SVG path.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcSlice {
    pub start_angle: f64,
    pub end_angle: f64,
    pub path: String,
}

impl ArcSlice {
    fn new(pie: &PieGeometry, start_angle: f64, end_angle: f64) -> Self {
        ArcSlice {
            start_angle,
            end_angle,
            path: arc_path(pie, start_angle, end_angle),
        }
    }

    pub fn sweep(&self) -> f64 {
        self.end_angle - self.start_angle
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub completed_count: usize,
    pub pending_count: usize,
    pub completed_percent: f64,
    pub pending_percent: f64,
    /// Absent when nothing is completed.
    pub completed_arc: Option<ArcSlice>,
    /// Absent when nothing is pending.
    pub pending_arc: Option<ArcSlice>,
}

pub fn summarize(tasks: &[Task], pie: &PieGeometry) -> Summary {
    let total = tasks.len();
    let completed_count = tasks.iter().filter(|t| t.completed).count();
    let pending_count = total - completed_count;
    let percent = |count: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64 * 100.0
        }
    };
    let completed_percent = percent(completed_count);
    let pending_percent = percent(pending_count);
    let completed_angle = completed_percent / 100.0 * 360.0;
    let boundary = 360.0 - completed_angle;
    Summary {
        total,
        completed_count,
        pending_count,
        completed_percent,
        pending_percent,
        completed_arc: (completed_count > 0).then(|| ArcSlice::new(pie, boundary, 360.0)),
        pending_arc: (pending_count > 0).then(|| ArcSlice::new(pie, 0.0, boundary)),
    }
}

/// Point on the circle at `angle` degrees, measured clockwise from "up".
pub fn polar_to_cartesian(cx: f64, cy: f64, radius: f64, angle: f64) -> (f64, f64) {
    let radians = (angle - 90.0) * PI / 180.0;
    (cx + radius * radians.cos(), cy + radius * radians.sin())
}

/// Closed wedge path: centre, out to the end angle, arc back to the start.
pub fn arc_path(pie: &PieGeometry, start_angle: f64, end_angle: f64) -> String {
    let (cx, cy, r) = (pie.center_x, pie.center_y, pie.radius);
    let (sx, sy) = polar_to_cartesian(cx, cy, r, end_angle);
    let (ex, ey) = polar_to_cartesian(cx, cy, r, start_angle);
    let large_arc = if end_angle - start_angle > 180.0 { 1 } else { 0 };
    format!(
        "M {} {} L {} {} A {} {} 0 {} 0 {} {} Z",
        coord(cx),
        coord(cy),
        coord(sx),
        coord(sy),
        coord(r),
        coord(r),
        large_arc,
        coord(ex),
        coord(ey)
    )
}

fn coord(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Standalone SVG document of the donut chart.
    pub fn to_svg(&self, pie: &PieGeometry, dark: bool) -> String {
        let size = coord(pie.center_x.max(pie.center_y) * 2.0);
        let (cx, cy) = (coord(pie.center_x), coord(pie.center_y));
        let (surface, text, muted) = if dark {
            ("#1f2937", "#ffffff", "#374151")
        } else {
            ("#ffffff", "#111827", "#e5e7eb")
        };
        let mut body = Vec::new();
        if self.is_empty() {
            body.push(format!(
                r#"<circle cx="{}" cy="{}" r="{}" fill="none" stroke="{}" stroke-width="2" stroke-dasharray="5,5"/>"#,
                cx,
                cy,
                coord(pie.radius),
                muted
            ));
            body.push(format!(
                r#"<text x="{}" y="{}" text-anchor="middle" fill="{}">No tasks yet</text>"#,
                cx, cy, text
            ));
        } else {
            for (slice, fill) in [
                (&self.pending_arc, PENDING_FILL),
                (&self.completed_arc, COMPLETED_FILL),
            ] {
                let Some(slice) = slice else { continue };
                // A 360 degree wedge has coincident arc endpoints and would not render.
                if slice.sweep() >= 360.0 {
                    body.push(format!(
                        r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
                        cx,
                        cy,
                        coord(pie.radius),
                        fill
                    ));
                } else {
                    body.push(format!(
                        r#"<path d="{}" fill="{}" stroke="{}" stroke-width="2"/>"#,
                        slice.path, fill, surface
                    ));
                }
            }
            body.push(format!(
                r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
                cx,
                cy,
                coord(pie.inner_radius),
                surface
            ));
            body.push(format!(
                r#"<text x="{}" y="{}" text-anchor="middle" font-size="28" font-weight="bold" fill="{}">{}</text>"#,
                cx,
                coord(pie.center_y - 5.0),
                text,
                self.total
            ));
            body.push(format!(
                r#"<text x="{}" y="{}" text-anchor="middle" font-size="12" fill="{}">Total</text>"#,
                cx,
                coord(pie.center_y + 15.0),
                text
            ));
        }
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}">
  {}
</svg>
"#,
            body.join("\n  ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{date, task};

    fn tasks(completed: usize, pending: usize) -> Vec<Task> {
        (0..completed + pending)
            .map(|i| {
                let mut t = task(i as u32 + 1, date(2024, 3, 10), 60);
                t.completed = i < completed;
                t
            })
            .collect()
    }

    #[test]
    fn empty_collection_has_no_arcs() {
        let summary = summarize(&[], &PieGeometry::default());
        assert_eq!(summary.completed_count, 0);
        assert_eq!(summary.pending_count, 0);
        assert_eq!(summary.completed_percent, 0.0);
        assert_eq!(summary.pending_percent, 0.0);
        assert!(summary.completed_arc.is_none());
        assert!(summary.pending_arc.is_none());
        assert!(summary.is_empty());
    }

    #[test]
    fn all_completed_spans_full_circle() {
        let summary = summarize(&tasks(3, 0), &PieGeometry::default());
        assert_eq!(summary.completed_percent, 100.0);
        assert_eq!(summary.pending_percent, 0.0);
        let arc = summary.completed_arc.unwrap();
        assert_eq!((arc.start_angle, arc.end_angle), (0.0, 360.0));
        assert_eq!(arc.sweep(), 360.0);
        assert!(summary.pending_arc.is_none());
    }

    #[test]
    fn quarter_completed_geometry() {
        let summary = summarize(&tasks(1, 3), &PieGeometry::default());
        assert_eq!(summary.completed_percent, 25.0);
        assert_eq!(summary.pending_percent, 75.0);
        let done = summary.completed_arc.unwrap();
        assert_eq!((done.start_angle, done.end_angle), (270.0, 360.0));
        assert_eq!(done.path, "M 100 100 L 100 20 A 80 80 0 0 0 20 100 Z");
        let pending = summary.pending_arc.unwrap();
        assert_eq!((pending.start_angle, pending.end_angle), (0.0, 270.0));
        assert_eq!(pending.path, "M 100 100 L 20 100 A 80 80 0 1 0 100 20 Z");
    }

    #[test]
    fn polar_angle_zero_points_up() {
        let (x, y) = polar_to_cartesian(100.0, 100.0, 80.0, 0.0);
        assert!((x - 100.0).abs() < 1e-9);
        assert!((y - 20.0).abs() < 1e-9);
        let (x, y) = polar_to_cartesian(100.0, 100.0, 80.0, 90.0);
        assert!((x - 180.0).abs() < 1e-9);
        assert!((y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn large_arc_flag_only_past_half() {
        let pie = PieGeometry::default();
        assert!(arc_path(&pie, 0.0, 180.0).contains(" 0 0 0 "));
        assert!(arc_path(&pie, 0.0, 180.5).contains(" 0 1 0 "));
    }

    #[test]
    fn svg_rendering() {
        let pie = PieGeometry::default();
        let empty = summarize(&[], &pie).to_svg(&pie, false);
        assert!(empty.contains("stroke-dasharray"));
        assert!(!empty.contains("<path"));

        let mixed = summarize(&tasks(1, 1), &pie).to_svg(&pie, true);
        assert_eq!(mixed.matches("<path").count(), 2);
        assert!(mixed.contains(COMPLETED_FILL));
        assert!(mixed.contains(">2</text>"));

        let done = summarize(&tasks(2, 0), &pie).to_svg(&pie, false);
        assert!(!done.contains("<path"));
        assert!(done.contains(&format!(r#"r="80" fill="{}""#, COMPLETED_FILL)));
    }
}
