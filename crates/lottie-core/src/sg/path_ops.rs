//! Path effects evaluated on kurbo paths: trimming and corner rounding.

use kurbo::{BezPath, ParamCurve, ParamCurveArclen, PathEl, PathSeg, Point, Vec2};

const ARCLEN_ACCURACY: f64 = 1e-3;

struct Contour {
    segments: Vec<PathSeg>,
    closed: bool,
}

fn split_contours(path: &BezPath) -> Vec<Contour> {
    let mut out = Vec::new();
    let mut segments = Vec::new();
    let mut start = Point::ZERO;
    let mut last = Point::ZERO;

    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                if !segments.is_empty() {
                    out.push(Contour {
                        segments: std::mem::take(&mut segments),
                        closed: false,
                    });
                }
                start = p;
                last = p;
            }
            PathEl::LineTo(p) => {
                segments.push(PathSeg::Line(kurbo::Line::new(last, p)));
                last = p;
            }
            PathEl::QuadTo(p1, p2) => {
                segments.push(PathSeg::Quad(kurbo::QuadBez::new(last, p1, p2)));
                last = p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                segments.push(PathSeg::Cubic(kurbo::CubicBez::new(last, p1, p2, p3)));
                last = p3;
            }
            PathEl::ClosePath => {
                if last != start {
                    segments.push(PathSeg::Line(kurbo::Line::new(last, start)));
                }
                if !segments.is_empty() {
                    out.push(Contour {
                        segments: std::mem::take(&mut segments),
                        closed: true,
                    });
                }
                last = start;
            }
        }
    }
    if !segments.is_empty() {
        out.push(Contour {
            segments,
            closed: false,
        });
    }
    out
}

fn push_segment(path: &mut BezPath, seg: PathSeg, pen: &mut Option<Point>) {
    let start = seg.start();
    if *pen != Some(start) {
        path.move_to(start);
    }
    match seg {
        PathSeg::Line(l) => path.line_to(l.p1),
        PathSeg::Quad(q) => path.quad_to(q.p1, q.p2),
        PathSeg::Cubic(c) => path.curve_to(c.p1, c.p2, c.p3),
    }
    *pen = Some(seg.end());
}

fn extract(path: &BezPath, from: f64, to: f64, out: &mut BezPath) {
    let mut offset = 0.0;
    for contour in split_contours(path) {
        // Each contour restarts the pen so separate contours never join.
        let mut pen = None;
        for seg in contour.segments {
            let len = seg.arclen(ARCLEN_ACCURACY);
            let (a, b) = (offset, offset + len);
            offset = b;
            let lo = from.max(a);
            let hi = to.min(b);
            if hi <= lo || len <= 0.0 {
                continue;
            }
            let t0 = if lo <= a { 0.0 } else { seg.inv_arclen(lo - a, ARCLEN_ACCURACY) };
            let t1 = if hi >= b { 1.0 } else { seg.inv_arclen(hi - a, ARCLEN_ACCURACY) };
            push_segment(out, seg.subsegment(t0..t1), &mut pen);
        }
    }
}

pub fn path_length(path: &BezPath) -> f64 {
    split_contours(path)
        .iter()
        .flat_map(|c| c.segments.iter())
        .map(|s| s.arclen(ARCLEN_ACCURACY))
        .sum()
}

/// Keeps the portion of `path` between the `start` and `stop` fractions of
/// its total length, measured across all contours in order. With `inverted`
/// the complement is kept instead.
pub fn trim(path: &BezPath, start: f32, stop: f32, inverted: bool) -> BezPath {
    let (start, stop) = (start.clamp(0.0, 1.0) as f64, stop.clamp(0.0, 1.0) as f64);
    if !inverted && start <= 0.0 && stop >= 1.0 {
        return path.clone();
    }
    if inverted && start >= stop {
        return path.clone();
    }

    let total = path_length(path);
    let mut out = BezPath::new();
    if total <= 0.0 {
        return out;
    }

    if inverted {
        extract(path, 0.0, start * total, &mut out);
        extract(path, stop * total, total, &mut out);
    } else if stop > start {
        extract(path, start * total, stop * total, &mut out);
    }
    out
}

fn line_dir(seg: &PathSeg) -> Option<(Vec2, f64)> {
    match seg {
        PathSeg::Line(l) => {
            let v = l.p1 - l.p0;
            let len = v.hypot();
            (len > 1e-6).then(|| (v / len, len))
        }
        _ => None,
    }
}

/// Replaces line-line corners with quadratic arcs. The cut along each edge is
/// `radius`, limited to half of either adjacent edge. Curved segments keep
/// their corners.
pub fn round_corners(path: &BezPath, radius: f32) -> BezPath {
    let radius = radius as f64;
    if radius <= 0.0 {
        return path.clone();
    }

    let mut out = BezPath::new();
    for contour in split_contours(path) {
        let segs = &contour.segments;
        let n = segs.len();

        // cuts[j]: cut at the junction where segment j ends.
        let cuts: Vec<f64> = (0..n)
            .map(|j| {
                if j + 1 == n && !contour.closed {
                    return 0.0;
                }
                let next = &segs[(j + 1) % n];
                match (line_dir(&segs[j]), line_dir(next)) {
                    (Some((_, l0)), Some((_, l1))) if n > 1 => radius.min(l0 * 0.5).min(l1 * 0.5),
                    _ => 0.0,
                }
            })
            .collect();

        let start_cut = if contour.closed { cuts[n - 1] } else { 0.0 };
        let first = segs[0].start();
        let start = match line_dir(&segs[0]) {
            Some((dir, _)) => first + dir * start_cut,
            None => first,
        };
        out.move_to(start);

        for j in 0..n {
            let seg = segs[j];
            match seg {
                PathSeg::Line(l) => {
                    let end = match line_dir(&seg) {
                        Some((dir, _)) => l.p1 - dir * cuts[j],
                        None => l.p1,
                    };
                    out.line_to(end);
                }
                PathSeg::Quad(q) => out.quad_to(q.p1, q.p2),
                PathSeg::Cubic(c) => out.curve_to(c.p1, c.p2, c.p3),
            }
            if cuts[j] > 0.0 {
                let corner = seg.end();
                let next = &segs[(j + 1) % n];
                if let Some((dir, _)) = line_dir(next) {
                    out.quad_to(corner, corner + dir * cuts[j]);
                }
            }
        }
        if contour.closed {
            out.close_path();
        }
    }
    out
}
