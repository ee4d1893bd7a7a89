//! Polarity manipulation

use event_data_core::{Event, EventStream};

/// Invert binary polarities: `p -> 1` when `p == 0`, else `0`
pub fn flip_polarity(events: &EventStream) -> EventStream {
    events
        .iter()
        .map(|e| Event {
            p: i64::from(e.p == 0),
            ..*e
        })
        .collect()
}

/// Collapse every polarity to 0
pub fn merge_polarities(events: &EventStream) -> EventStream {
    events.iter().map(|e| Event { p: 0, ..*e }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::random_input;

    #[test]
    fn test_flip_polarity() {
        let (orig, _) = random_input();
        let flipped = flip_polarity(&orig);
        assert!(orig.iter().zip(flipped.iter()).all(|(a, b)| a.p + b.p == 1));
        assert_eq!(flip_polarity(&flipped), orig);
    }

    #[test]
    fn test_merge_polarities() {
        let (orig, _) = random_input();
        let merged = merge_polarities(&orig);
        assert!(merged.iter().all(|e| e.p == 0));
        assert_eq!(merged.ts(), orig.ts());
        assert_eq!(merged.xs(), orig.xs());
    }
}
