//! Resolution selection from a device's advertised size list.
//!
//! Both selectors walk the list in the order the device reports it and take
//! the first acceptable entry. The list is never re-sorted, so results are
//! deterministic for a given device.

use crate::device::Size;

/// Target aspect ratio, or `None` for a zero-sized target.
fn target_ratio(short_side: u32, long_side: u32) -> Option<f32> {
    if short_side == 0 || long_side == 0 {
        return None;
    }
    Some(long_side as f32 / short_side as f32)
}

/// Picks the preview size for a display target of `short_side` x `long_side`.
///
/// The entry must match the target's aspect ratio exactly and fit within it
/// (`height <= short_side`, `width <= long_side`).
pub fn select_preview_size(supported: &[Size], short_side: u32, long_side: u32) -> Option<Size> {
    let ratio = target_ratio(short_side, long_side)?;
    supported.iter().copied().find(|size| {
        size.aspect_ratio() == ratio && size.height() <= short_side && size.width() <= long_side
    })
}

/// Picks the still-capture size for a display target of `short_side` x `long_side`.
///
/// Only the aspect ratio must match; there is no upper bound, so the first
/// matching entry wins even when it is larger than the target.
pub fn select_capture_size(supported: &[Size], short_side: u32, long_side: u32) -> Option<Size> {
    let ratio = target_ratio(short_side, long_side)?;
    supported
        .iter()
        .copied()
        .find(|size| size.aspect_ratio() == ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn size(width: u32, height: u32) -> Size {
        Size::new(width, height).unwrap()
    }

    fn advertised() -> Vec<Size> {
        vec![
            size(1440, 1080),
            size(640, 480),
            size(1920, 1080),
            size(1280, 720),
            size(3840, 2160),
        ]
    }

    #[test]
    fn test_preview_picks_first_fitting_ratio_match() {
        let list = advertised();
        // 16:9 portrait target
        let fhd = size(1920, 1080);
        assert_eq!(select_preview_size(&list, 1080, 1920), Some(fhd));
        // 4:3 target too small for 1440x1080: the later 640x480 fits
        assert_eq!(select_preview_size(&list, 720, 960), Some(size(640, 480)));
    }

    #[test]
    fn test_preview_respects_bounds() {
        let list = advertised();
        // Only 1280x720 fits a 720x1280 target.
        assert_eq!(select_preview_size(&list, 720, 1280), Some(size(1280, 720)));
        // Nothing 16:9 fits under 360x640.
        assert_eq!(select_preview_size(&list, 360, 640), None);
    }

    #[test]
    fn test_capture_ignores_bounds() {
        let list = vec![size(3840, 2160), size(1920, 1080)];
        let uhd = size(3840, 2160);
        assert_eq!(select_capture_size(&list, 720, 1280), Some(uhd));
        assert_eq!(select_preview_size(&list, 720, 1280), None);
    }

    #[test]
    fn test_order_is_not_resorted() {
        let list = vec![size(1280, 720), size(1920, 1080)];
        let hd = size(1280, 720);
        // The larger entry also fits, but the earlier one wins.
        assert_eq!(select_preview_size(&list, 1080, 1920), Some(hd));
        assert_eq!(select_capture_size(&list, 1080, 1920), Some(hd));
    }

    #[test]
    fn test_zero_target_is_noop() {
        assert_eq!(select_preview_size(&advertised(), 0, 1920), None);
        assert_eq!(select_capture_size(&advertised(), 1080, 0), None);
    }

    #[test]
    fn test_no_ratio_match() {
        assert_eq!(select_capture_size(&advertised(), 1000, 1000), None);
    }

    proptest! {
        #[test]
        fn prop_preview_never_exceeds_bounds(
            list in prop::collection::vec((1u32..4000, 1u32..4000), 0..20),
            short_side in 1u32..4000,
            long_side in 1u32..4000,
        ) {
            let list: Vec<Size> = list.into_iter().filter_map(|(w, h)| Size::new(w, h)).collect();
            if let Some(chosen) = select_preview_size(&list, short_side, long_side) {
                prop_assert!(chosen.height() <= short_side);
                prop_assert!(chosen.width() <= long_side);
                // First qualifying entry
                let first = list.iter().position(|s| *s == chosen).unwrap();
                for earlier in &list[..first] {
                    let ratio = long_side as f32 / short_side as f32;
                    prop_assert!(
                        earlier.aspect_ratio() != ratio
                            || earlier.height() > short_side
                            || earlier.width() > long_side
                    );
                }
            }
        }
    }
}
