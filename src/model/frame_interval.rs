//! Closed ranges of frame numbers.

/// A closed interval `[start, end]` of frame numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameInterval {
    pub start: u64,
    pub end: u64,
}

impl FrameInterval {
    /// Creates a new interval. `start` must not exceed `end`.
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "interval start {start} exceeds end {end}");
        Self { start, end }
    }

    /// Number of frames covered, `end - start + 1`.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false: an interval covers at least one frame.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns true if `frame_id` lies within the interval.
    pub fn contains(&self, frame_id: u64) -> bool {
        self.start <= frame_id && frame_id <= self.end
    }

    /// Builds the canonical interval list covering `frame_ids`.
    ///
    /// The result is sorted, non-overlapping and non-adjacent: a new
    /// interval starts whenever the gap to the previous id exceeds one.
    /// Duplicate ids are tolerated.
    pub fn from_frame_ids<I>(frame_ids: I) -> Vec<FrameInterval>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut ids: Vec<u64> = frame_ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let mut intervals: Vec<FrameInterval> = Vec::new();
        for id in ids {
            match intervals.last_mut() {
                Some(last) if id - last.end <= 1 => last.end = id,
                _ => intervals.push(FrameInterval::new(id, id)),
            }
        }
        intervals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_yields_no_intervals() {
        assert!(FrameInterval::from_frame_ids(Vec::new()).is_empty());
    }

    #[test]
    fn test_single_frame() {
        assert_eq!(
            FrameInterval::from_frame_ids([4]),
            vec![FrameInterval::new(4, 4)]
        );
    }

    #[test]
    fn test_non_contiguous_frames() {
        let intervals = FrameInterval::from_frame_ids([0, 1, 2, 3, 6, 7, 9, 12, 13, 14]);
        assert_eq!(
            intervals,
            vec![
                FrameInterval::new(0, 3),
                FrameInterval::new(6, 7),
                FrameInterval::new(9, 9),
                FrameInterval::new(12, 14),
            ]
        );
    }

    #[test]
    fn test_unsorted_with_duplicates() {
        let intervals = FrameInterval::from_frame_ids([5, 3, 4, 4, 1]);
        assert_eq!(
            intervals,
            vec![FrameInterval::new(1, 1), FrameInterval::new(3, 5)]
        );
        assert_eq!(intervals[1].len(), 3);
        assert!(intervals[1].contains(4));
        assert!(!intervals[1].contains(2));
    }
}
