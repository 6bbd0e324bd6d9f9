//! The shared drawing log.
//!
//! The log is the single source of truth for what gets painted. It only ever
//! grows, except for a full clear.

use kurbo::{Line, Point};
use serde::{Deserialize, Serialize};

/// One stroke increment between two consecutive pointer samples, in world space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    /// CSS color the segment was drawn with.
    pub color: String,
}

impl LineSegment {
    /// Create a segment between two world-space points.
    pub fn new(start: Point, end: Point, color: impl Into<String>) -> Self {
        Self {
            x0: start.x,
            y0: start.y,
            x1: end.x,
            y1: end.y,
            color: color.into(),
        }
    }

    pub fn start(&self) -> Point {
        Point::new(self.x0, self.y0)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    /// The segment as a kurbo line, for renderers.
    pub fn as_line(&self) -> Line {
        Line::new(self.start(), self.end())
    }
}

/// Append-only ordered sequence of segments, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct DrawingLog {
    segments: Vec<LineSegment>,
}

impl DrawingLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment. Never fails.
    pub fn append(&mut self, segment: LineSegment) {
        self.segments.push(segment);
    }

    /// Drop every segment.
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Adopt the room history. It goes ahead of any local segments, which
    /// stay in their own order after it.
    pub fn adopt_history(&mut self, mut history: Vec<LineSegment>) {
        history.append(&mut self.segments);
        self.segments = history;
    }

    /// Current contents, oldest first.
    pub fn snapshot(&self) -> &[LineSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(n: f64) -> LineSegment {
        LineSegment::new(Point::new(n, n), Point::new(n + 1.0, n), "#000000")
    }

    #[test]
    fn test_append_preserves_order() {
        let mut log = DrawingLog::new();
        for n in 0..5 {
            log.append(segment(n as f64));
        }
        let xs: Vec<f64> = log.snapshot().iter().map(|s| s.x0).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_clear_on_empty_log() {
        let mut log = DrawingLog::new();
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_clear_after_appends() {
        for count in [1, 7, 250] {
            let mut log = DrawingLog::new();
            for n in 0..count {
                log.append(segment(n as f64));
            }
            assert_eq!(log.len(), count);
            log.clear();
            assert_eq!(log.len(), 0);
        }
    }

    #[test]
    fn test_adopt_history_keeps_local_segments() {
        let mut log = DrawingLog::new();
        log.append(segment(9.0));
        log.append(segment(10.0));
        log.adopt_history(vec![segment(1.0), segment(2.0)]);
        assert_eq!(
            log.snapshot(),
            &[segment(1.0), segment(2.0), segment(9.0), segment(10.0)]
        );

        let mut empty = DrawingLog::new();
        empty.adopt_history(vec![segment(3.0)]);
        assert_eq!(empty.snapshot(), &[segment(3.0)]);
    }

    #[test]
    fn test_segment_endpoints() {
        let seg = LineSegment::new(Point::new(1.0, 2.0), Point::new(3.0, 4.0), "#ef4444");
        assert_eq!(seg.as_line(), Line::new((1.0, 2.0), (3.0, 4.0)));
        assert_eq!(seg.color, "#ef4444");
    }
}
