//! Color histogram and top-N selection.
//!
//! Pure functions over decoded pixel data; the analysis stage calls in here
//! from its blocking workers, one histogram per image, never shared.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use image::RgbImage;

use crate::error::PipelineError;
use crate::types::ColorCount;

/// Rank the `n` most frequent colors of a decoded image.
///
/// Every pixel is visited exactly once and quantized to its 8-bit-per-channel
/// RGB value (alpha, if the source had any, is already gone after RGB8
/// conversion). The result is sorted by descending pixel count; equal counts
/// are broken by ascending hex string, so repeated runs over the same image
/// always produce the same output regardless of hash-map iteration order.
/// If the image holds fewer than `n` distinct colors, all of them are
/// returned.
///
/// `n == 0` is a usage error and fails synchronously.
pub fn rank_colors(image: &RgbImage, n: usize) -> Result<Vec<ColorCount>, PipelineError> {
    if n == 0 {
        return Err(PipelineError::InvalidTopN { requested: n });
    }

    let mut counts: HashMap<u32, u64> = HashMap::new();
    for pixel in image.pixels() {
        let [r, g, b] = pixel.0;
        let rgb = (r as u32) << 16 | (g as u32) << 8 | b as u32;
        *counts.entry(rgb).or_insert(0) += 1;
    }

    Ok(top_n(&counts, n))
}

/// Select the `n` best entries of the histogram without sorting all of it.
///
/// Large photographic images easily hold hundreds of thousands of distinct
/// colors while `n` is single-digit, so the selection keeps a bounded
/// min-heap of the current best `n` candidates and streams the histogram
/// through it once. The heap's top is always the weakest kept candidate.
fn top_n(counts: &HashMap<u32, u64>, n: usize) -> Vec<ColorCount> {
    let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(n + 1);
    for (&rgb, &count) in counts {
        let candidate = Candidate { rgb, count };
        if heap.len() < n {
            heap.push(candidate);
        } else if let Some(weakest) = heap.peek() {
            if candidate.outranks(weakest) {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    let mut kept = heap.into_vec();
    kept.sort_unstable_by(|a, b| b.count.cmp(&a.count).then_with(|| a.rgb.cmp(&b.rgb)));
    kept.into_iter()
        .map(|c| ColorCount {
            hex: format!("{:06X}", c.rgb),
            count: c.count,
        })
        .collect()
}

/// A histogram entry under consideration for the result.
#[derive(Debug, PartialEq, Eq)]
struct Candidate {
    rgb: u32,
    count: u64,
}

impl Candidate {
    /// Canonical rank order: higher count wins, equal counts go to the
    /// smaller RGB value (ascending hex).
    fn outranks(&self, other: &Self) -> bool {
        self.count > other.count || (self.count == other.count && self.rgb < other.rgb)
    }
}

impl Ord for Candidate {
    // Inverted so BinaryHeap keeps the weakest candidate on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .count
            .cmp(&self.count)
            .then_with(|| self.rgb.cmp(&other.rgb))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Build a 1-pixel-high image from a color run-length list.
    fn image_of(runs: &[(Rgb<u8>, u32)]) -> RgbImage {
        let width: u32 = runs.iter().map(|(_, len)| len).sum();
        let mut pixels = runs.iter().flat_map(|&(color, len)| {
            std::iter::repeat(color).take(len as usize)
        });
        RgbImage::from_fn(width, 1, |_, _| pixels.next().unwrap())
    }

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    #[test]
    fn test_rank_colors_rejects_zero_n() {
        let img = image_of(&[(RED, 1)]);
        let err = rank_colors(&img, 0).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTopN { requested: 0 }));
    }

    #[test]
    fn test_rank_colors_single_color() {
        let img = image_of(&[(Rgb([0x66, 0xCC, 0xFF]), 12)]);
        let colors = rank_colors(&img, 5).unwrap();
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].hex, "66CCFF");
        assert_eq!(colors[0].count, 12);
    }

    #[test]
    fn test_rank_colors_orders_by_descending_count() {
        let img = image_of(&[(GREEN, 3), (RED, 7), (BLUE, 5)]);
        let colors = rank_colors(&img, 3).unwrap();
        let counts: Vec<u64> = colors.iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![7, 5, 3]);
        assert_eq!(colors[0].hex, "FF0000");
    }

    #[test]
    fn test_rank_colors_tie_break_ascending_hex() {
        // red:5, green:3, blue:3 with n=2: the tie at count 3 goes to the
        // lexicographically smaller hex, 0000FF.
        let img = image_of(&[(RED, 5), (GREEN, 3), (BLUE, 3)]);
        let colors = rank_colors(&img, 2).unwrap();
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0].hex, "FF0000");
        assert_eq!(colors[0].count, 5);
        assert_eq!(colors[1].hex, "0000FF");
        assert_eq!(colors[1].count, 3);
    }

    #[test]
    fn test_rank_colors_all_tied() {
        let img = image_of(&[(GREEN, 2), (BLUE, 2), (RED, 2)]);
        let colors = rank_colors(&img, 3).unwrap();
        let hexes: Vec<&str> = colors.iter().map(|c| c.hex.as_str()).collect();
        assert_eq!(hexes, vec!["0000FF", "00FF00", "FF0000"]);
    }

    #[test]
    fn test_rank_colors_fewer_distinct_than_n() {
        let img = image_of(&[(RED, 4), (BLUE, 2)]);
        let colors = rank_colors(&img, 10).unwrap();
        assert_eq!(colors.len(), 2);
    }

    #[test]
    fn test_rank_colors_caps_at_n() {
        let img = image_of(&[
            (Rgb([1, 1, 1]), 9),
            (Rgb([2, 2, 2]), 8),
            (Rgb([3, 3, 3]), 7),
            (Rgb([4, 4, 4]), 6),
            (Rgb([5, 5, 5]), 5),
        ]);
        let colors = rank_colors(&img, 3).unwrap();
        assert_eq!(colors.len(), 3);
        assert_eq!(colors[2].hex, "030303");
    }

    #[test]
    fn test_rank_colors_deterministic_across_runs() {
        // Many tied entries force the selection to lean on the tie-break,
        // not on HashMap enumeration order.
        let img = RgbImage::from_fn(64, 64, |x, y| {
            Rgb([(x % 16) as u8, (y % 16) as u8, ((x + y) % 16) as u8])
        });
        let first = rank_colors(&img, 7).unwrap();
        let second = rank_colors(&img, 7).unwrap();
        assert_eq!(first, second);
        for pair in first.windows(2) {
            assert!(pair[0].count >= pair[1].count);
            if pair[0].count == pair[1].count {
                assert!(pair[0].hex < pair[1].hex);
            }
        }
    }

    #[test]
    fn test_rank_colors_empty_image() {
        let img = RgbImage::new(0, 0);
        let colors = rank_colors(&img, 3).unwrap();
        assert!(colors.is_empty());
    }

    #[test]
    fn test_hex_is_zero_padded_uppercase() {
        let img = image_of(&[(Rgb([0x00, 0x0A, 0xff]), 1)]);
        let colors = rank_colors(&img, 1).unwrap();
        assert_eq!(colors[0].hex, "000AFF");
    }
}
