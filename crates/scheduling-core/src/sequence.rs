//! Render-sequence chaining.
//!
//! Clips in group `N` start when the longest clip of group `N - 1` ends.
//! A group whose predecessor is absent keeps whatever start it already has.

use std::collections::BTreeMap;

use reelsmith_timeline_model::ClipHandle;

/// Anything that can be placed by sequence group.
pub trait Sequenced {
    fn render_sequence(&self) -> u32;
    fn duration_secs(&self) -> f64;
    fn start_secs(&self) -> f64;
    fn set_start_secs(&mut self, start: f64);

    fn end_secs(&self) -> f64 {
        self.start_secs() + self.duration_secs()
    }
}

impl Sequenced for ClipHandle {
    fn render_sequence(&self) -> u32 {
        self.descriptor.render_sequence
    }

    fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    fn start_secs(&self) -> f64 {
        self.start_secs
    }

    fn set_start_secs(&mut self, start: f64) {
        self.start_secs = start;
    }
}

/// Indices of `clips` grouped by render sequence, groups ascending,
/// indices in input order.
pub fn group_by_sequence<T: Sequenced>(clips: &[T]) -> BTreeMap<u32, Vec<usize>> {
    let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, clip) in clips.iter().enumerate() {
        groups.entry(clip.render_sequence()).or_default().push(i);
    }
    groups
}

/// Index of the longest clip in a group. Ties go to the first encountered.
fn longest<T: Sequenced>(clips: &[T], group: &[usize]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for &i in group {
        match best {
            Some(b) if clips[i].duration_secs() <= clips[b].duration_secs() => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Assign start times by chaining each group onto its predecessor.
///
/// Groups are walked in ascending order so a chain resolves fully
/// regardless of the order clips were supplied in.
pub fn chain_sequences<T: Sequenced>(clips: &mut [T]) {
    let groups = group_by_sequence(clips);

    for (&sequence, members) in &groups {
        let Some(previous) = sequence.checked_sub(1).and_then(|p| groups.get(&p)) else {
            continue;
        };
        let Some(anchor) = longest(clips, previous) else {
            continue;
        };
        let start = clips[anchor].end_secs();
        for &i in members {
            clips[i].set_start_secs(start);
        }
        tracing::trace!(sequence, start, "chained sequence group");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Slot {
        seq: u32,
        start: f64,
        dur: f64,
    }

    impl Sequenced for Slot {
        fn render_sequence(&self) -> u32 {
            self.seq
        }
        fn duration_secs(&self) -> f64 {
            self.dur
        }
        fn start_secs(&self) -> f64 {
            self.start
        }
        fn set_start_secs(&mut self, start: f64) {
            self.start = start;
        }
    }

    fn slot(seq: u32, dur: f64) -> Slot {
        Slot {
            seq,
            start: 0.0,
            dur,
        }
    }

    #[test]
    fn test_three_group_chain() {
        let mut clips = vec![slot(0, 5.0), slot(1, 3.0), slot(2, 10.0)];
        chain_sequences(&mut clips);
        assert_eq!(clips[0].start, 0.0);
        assert_eq!(clips[1].start, 5.0);
        assert_eq!(clips[2].start, 8.0);
    }

    #[test]
    fn test_out_of_order_input_still_chains() {
        let mut clips = vec![slot(2, 10.0), slot(1, 3.0), slot(0, 5.0)];
        chain_sequences(&mut clips);
        assert_eq!(clips[1].start, 5.0);
        assert_eq!(clips[0].start, 8.0);
    }

    #[test]
    fn test_longest_clip_anchors_next_group() {
        let mut clips = vec![slot(0, 2.0), slot(0, 7.0), slot(0, 4.0), slot(1, 1.0), slot(1, 9.0)];
        chain_sequences(&mut clips);
        assert_eq!(clips[3].start, 7.0);
        assert_eq!(clips[4].start, 7.0);
    }

    #[test]
    fn test_longest_not_latest_end_is_anchor() {
        // The anchor is the longest clip, even if a shorter one ends later.
        let mut clips = vec![
            Slot {
                seq: 0,
                start: 0.0,
                dur: 6.0,
            },
            Slot {
                seq: 0,
                start: 4.0,
                dur: 5.0,
            },
            slot(1, 1.0),
        ];
        chain_sequences(&mut clips);
        assert_eq!(clips[2].start, 6.0);
    }

    #[test]
    fn test_gap_keeps_default_start() {
        let mut clips = vec![slot(0, 5.0), slot(1, 3.0), slot(3, 4.0), slot(4, 1.0)];
        clips[2].start = 1.5;
        chain_sequences(&mut clips);
        assert_eq!(clips[2].start, 1.5);
        assert_eq!(clips[3].start, 5.5);
    }

    #[test]
    fn test_group_zero_keeps_caller_start() {
        let mut clips = vec![slot(0, 5.0)];
        clips[0].start = 0.85;
        chain_sequences(&mut clips);
        assert_eq!(clips[0].start, 0.85);
    }

    #[test]
    fn test_empty_input() {
        let mut clips: Vec<Slot> = vec![];
        chain_sequences(&mut clips);
        assert!(group_by_sequence(&clips).is_empty());
    }
}
