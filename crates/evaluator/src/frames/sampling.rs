use std::time::Duration;

/// Capture instants on a fixed cadence, skipping `edge_trim` at both ends.
///
/// Videos shorter than twice the trim yield a single instant at the midpoint, so even a
/// sub-second clip produces one frame.
pub fn sample_timestamps(duration: Duration, interval: Duration, edge_trim: Duration) -> Vec<Duration> {
    if duration < edge_trim * 2 {
        return vec![duration / 2];
    }

    let start = edge_trim;
    let end = duration - edge_trim;
    if interval.is_zero() {
        return vec![start];
    }

    let mut timestamps = Vec::new();
    let mut at = start;
    while at <= end {
        timestamps.push(at);
        at += interval;
    }
    timestamps
}

/// Evenly spaced subset of at most `cap` items, keeping order. The first and last
/// items are always kept when `cap >= 2`.
pub fn select_evenly<T: Clone>(items: &[T], cap: usize) -> Vec<T> {
    if items.len() <= cap {
        return items.to_vec();
    }
    match cap {
        0 => Vec::new(),
        1 => vec![items[0].clone()],
        _ => {
            let last = items.len() - 1;
            (0..cap)
                .map(|i| items[i * last / (cap - 1)].clone())
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_cadence_respects_edge_trim() {
        let samples = sample_timestamps(ms(6_000), ms(1_500), ms(300));
        assert_eq!(samples, vec![ms(300), ms(1_800), ms(3_300), ms(4_800)]);
    }

    #[test]
    fn test_short_video_yields_midpoint() {
        assert_eq!(sample_timestamps(ms(500), ms(1_500), ms(300)), vec![ms(250)]);
        assert_eq!(sample_timestamps(Duration::ZERO, ms(1_500), ms(300)), vec![Duration::ZERO]);
    }

    #[test]
    fn test_exactly_twice_trim_yields_one_sample() {
        assert_eq!(sample_timestamps(ms(600), ms(1_500), ms(300)), vec![ms(300)]);
    }

    #[test]
    fn test_select_evenly_keeps_endpoints_and_order() {
        let items: Vec<u32> = (0..20).collect();
        let picked = select_evenly(&items, 8);

        assert_eq!(picked.len(), 8);
        assert_eq!(picked.first(), Some(&0));
        assert_eq!(picked.last(), Some(&19));
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_select_evenly_under_cap_is_identity() {
        assert_eq!(select_evenly(&[1, 2, 3], 8), vec![1, 2, 3]);
        assert_eq!(select_evenly(&[1, 2, 3], 1), vec![1]);
        assert!(select_evenly(&[1, 2, 3], 0).is_empty());
    }
}
