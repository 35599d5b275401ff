//! Cursor trajectory reconstructed from pointer events.

use glide_project_model::event::InputEvent;
use glide_project_model::pose::Point2D;

/// Time-ordered pointer samples with linear interpolation between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CursorTrack {
    samples: Vec<(f64, Point2D)>,
}

impl CursorTrack {
    /// Collect the positions of `move`, `down` and `up` events.
    pub fn from_events(events: &[InputEvent]) -> Self {
        let mut samples: Vec<(f64, Point2D)> = events
            .iter()
            .filter_map(|e| e.pointer_position().map(|(x, y)| (e.time, Point2D::new(x, y))))
            .collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Cursor position at `t`.
    ///
    /// Holds the first sample before the track starts and the last one after
    /// it ends. `None` when there are no samples at all.
    pub fn position_at(&self, t: f64) -> Option<Point2D> {
        let (first, last) = (self.samples.first()?, self.samples.last()?);
        if t <= first.0 {
            return Some(first.1);
        }
        if t >= last.0 {
            return Some(last.1);
        }

        let next = self.samples.partition_point(|(time, _)| *time <= t);
        let (t0, p0) = self.samples[next - 1];
        let (t1, p1) = self.samples[next];
        let span = t1 - t0;
        if span <= 0.0 {
            return Some(p1);
        }
        Some(Point2D::lerp(&p0, &p1, (t - t0) / span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_track_has_no_position() {
        let track = CursorTrack::from_events(&[InputEvent::key(1.0, 10.0, 10.0)]);
        assert!(track.is_empty());
        assert_eq!(track.position_at(1.0), None);
    }

    #[test]
    fn test_interpolates_and_holds_edges() {
        let track = CursorTrack::from_events(&[
            InputEvent::pointer_move(1.0, 10.0, 20.0),
            InputEvent::key(1.5, 99.0, 99.0),
            InputEvent::down(2.0, 30.0, 40.0),
        ]);
        assert_eq!(track.len(), 2);
        assert_eq!(track.position_at(0.0), Some(Point2D::new(10.0, 20.0)));
        assert_eq!(track.position_at(1.5), Some(Point2D::new(20.0, 30.0)));
        assert_eq!(track.position_at(9.0), Some(Point2D::new(30.0, 40.0)));
    }
}
