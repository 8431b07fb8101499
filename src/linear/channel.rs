//! Channel Code (ANSI/AIM BC12-1998).
//!
//! A value is encoded as the `value`-th valid arrangement of bars and spaces
//! after a fixed 9-module finder. The arrangements are enumerated in order
//! by [Chnchr], starting from a per-channel-count seed.

use crate::chars::{not_sane, to_int, NEON_F};
use crate::content::{ct_cpy, Segment};
use crate::error::{ErrorKind, Result, Warning};
use crate::errtxt::{errtxtf, Arg};
use crate::symbol::{OutputOptions, Symbol};

/// Largest value for each channel count, indexed by channels.
const MAX_RANGES: [i32; 9] = [-1, -1, -1, 26, 292, 3493, 44072, 576688, 7742862];

const FINDER: &[u8] = b"111111111";

/// Seed states for 3 to 8 channels: bars, spaces, bar maxima and space
/// maxima, positioned on value 0.
const SEEDS: [([u8; 8], [u8; 8], [u8; 7], [u8; 7]); 6] = [
    ([1, 1, 1, 1, 1, 2, 1, 2], [1, 1, 1, 1, 1, 1, 1, 3], [1, 1, 1, 1, 1, 3, 2], [1, 1, 1, 1, 1, 3, 3]),
    ([1, 1, 1, 1, 2, 1, 1, 3], [1, 1, 1, 1, 1, 1, 1, 4], [1, 1, 1, 1, 4, 3, 3], [1, 1, 1, 1, 4, 4, 4]),
    ([1, 1, 1, 2, 1, 1, 2, 3], [1, 1, 1, 1, 1, 1, 1, 5], [1, 1, 1, 5, 4, 4, 4], [1, 1, 1, 5, 5, 5, 5]),
    ([1, 1, 2, 1, 1, 2, 1, 4], [1, 1, 1, 1, 1, 1, 1, 6], [1, 1, 6, 5, 5, 5, 4], [1, 1, 6, 6, 6, 6, 6]),
    ([1, 2, 1, 1, 2, 1, 1, 5], [1, 1, 1, 1, 1, 1, 1, 7], [1, 7, 6, 6, 6, 5, 5], [1, 7, 7, 7, 7, 7, 7]),
    ([2, 1, 1, 2, 1, 1, 2, 5], [1, 1, 1, 1, 1, 1, 1, 8], [8, 7, 7, 7, 6, 6, 6], [8, 8, 8, 8, 8, 8, 8]),
];

#[derive(Debug, Clone, Copy)]
enum Step {
    /// Start a new space width at this position.
    Space(usize),
    /// Start a new bar width at this position.
    Bar(usize),
    /// Try the next width at this position, backtracking when exhausted.
    Next(usize),
    /// A complete arrangement.
    Check,
}

/// Enumerator of valid bar/space arrangements.
struct Chnchr {
    bars: [u8; 8],
    spaces: [u8; 8],
    bar_max: [u8; 7],
    space_max: [u8; 7],
}

impl Chnchr {
    fn new(channels: usize) -> Self {
        let (bars, spaces, bar_max, space_max) = SEEDS[channels - 3];
        Self { bars, spaces, bar_max, space_max }
    }

    /// A first bar of width 1 would create a forbidden run of narrow
    /// elements.
    fn narrow_run(&self, i: usize) -> bool {
        let (b, s) = (&self.bars, &self.spaces);
        match i {
            0 => s[0] == 1,
            1 => s[0] + b[0] + s[1] == 3,
            _ => b[i - 2] + s[i - 1] + b[i - 1] + s[i] == 4,
        }
    }

    /// Advance to arrangement number `target`.
    fn seek(&mut self, target: i32) {
        let mut value = 0;
        let mut step = Step::Check;

        loop {
            step = match step {
                Step::Space(i) => {
                    if i < 6 {
                        self.space_max[i + 1] = self.space_max[i] + 1 - self.spaces[i];
                    } else {
                        self.spaces[7] = self.space_max[6] + 1 - self.spaces[6];
                    }
                    self.bars[i] = 1;
                    if self.narrow_run(i) { Step::Next(i) } else { Step::Bar(i) }
                }
                Step::Bar(i) if i < 6 => {
                    self.bar_max[i + 1] = self.bar_max[i] + 1 - self.bars[i];
                    self.spaces[i + 1] = 1;
                    Step::Space(i + 1)
                }
                Step::Bar(_) => {
                    self.bars[7] = self.bar_max[6] + 1 - self.bars[6];
                    let tail: u8 = self.bars[5] + self.spaces[6] + self.bars[6] + self.spaces[7] + self.bars[7];
                    if tail == 5 { Step::Next(6) } else { Step::Check }
                }
                Step::Check => {
                    if value == target {
                        return;
                    }
                    value += 1;
                    Step::Next(6)
                }
                Step::Next(i) => {
                    self.bars[i] += 1;
                    if self.bars[i] <= self.bar_max[i] {
                        Step::Bar(i)
                    } else {
                        self.spaces[i] += 1;
                        if self.spaces[i] <= self.space_max[i] {
                            Step::Space(i)
                        } else if i == 0 {
                            // callers stay within MAX_RANGES
                            return;
                        } else {
                            Step::Next(i - 1)
                        }
                    }
                }
            };
        }
    }

    /// Widths of the last `channels` space/bar pairs as ASCII digits.
    fn widths(&self, channels: usize) -> Vec<u8> {
        (8 - channels..8)
            .flat_map(|i| [b'0' + self.spaces[i], b'0' + self.bars[i]])
            .collect()
    }
}

/// Fewest channels able to hold `value` with `length` digits.
fn auto_channels(length: usize, value: i32) -> usize {
    let channels = length + 1;
    (channels..=8)
        .find(|&c| value <= MAX_RANGES[c])
        .unwrap_or(8)
        .max(3)
}

/// Encode a Channel Code number of up to 7 digits. `option_2` selects 3 to
/// 8 channels, anything else picks the fewest that fit.
pub fn encode(symbol: &mut Symbol, segs: &[Segment]) -> Result<Option<Warning>> {
    let source = segs.first().map_or(&[][..], |seg| &seg.source[..]);
    let length = source.len();

    if length > 7 {
        return Err(errtxtf(ErrorKind::TooLong, symbol, 333, "Input length %d too long (maximum 7)",
            &[Arg::Int(length as i64)]));
    }
    let bad = not_sane(NEON_F, source);
    if bad != 0 {
        return Err(errtxtf(ErrorKind::InvalidData, symbol, 334,
            "Invalid character at position %d in input (digits only)", &[Arg::Int(bad as i64)]));
    }
    let value = to_int(source).max(0);

    let channels = match symbol.option_2 {
        c @ 3..=8 => c as usize,
        _ => auto_channels(length, value),
    };

    let max = MAX_RANGES[channels];
    if value > max {
        return Err(if channels == 8 {
            errtxtf(ErrorKind::InvalidData, symbol, 318, "Input value \"%1$d\" out of range (0 to %2$d)",
                &[Arg::Int(value as i64), Arg::Int(max as i64)])
        } else {
            errtxtf(ErrorKind::InvalidData, symbol, 335,
                "Input value \"%1$d\" out of range (0 to %2$d for %3$d channels)",
                &[Arg::Int(value as i64), Arg::Int(max as i64), Arg::Int(channels as i64)])
        });
    }

    let mut chnchr = Chnchr::new(channels);
    chnchr.seek(value);

    let mut pattern = FINDER.to_vec();
    pattern.extend(chnchr.widths(channels));
    log::debug!("Channel Code {} channels, value {}: {}", channels, value, String::from_utf8_lossy(&pattern));
    symbol.expand(&pattern);

    // HRT padded with zeroes to channels - 1 digits
    let zeroes = (channels - 1).saturating_sub(length);
    let mut text = vec![b'0'; zeroes];
    text.extend_from_slice(source);
    symbol.text.cpy(&text);

    let warning = if symbol.output_options.contains(OutputOptions::COMPLIANT_HEIGHT) {
        // 5mm or 15% of the length including quiet zones, with X left to the
        // application, so 20X by default
        let min_height = (1 + 9 + 4 * channels - 2 + 2) as f32 * 0.15;
        symbol.set_height(min_height, 20.0, 0.0, false)
    } else {
        symbol.set_height(0.0, 50.0, 0.0, true);
        None
    };

    if symbol.output_options.contains(OutputOptions::CONTENT_SEGS) {
        ct_cpy(symbol, source);
    }

    Ok(warning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbology;

    fn pattern(channels: usize, value: i32) -> String {
        let mut chnchr = Chnchr::new(channels);
        chnchr.seek(value);
        String::from_utf8(chnchr.widths(channels)).unwrap()
    }

    fn encode_str(symbol: &mut Symbol, data: &str) -> Result<Option<Warning>> {
        encode(symbol, &[Segment::new(data, 0)])
    }

    #[test]
    fn test_chnchr() {
        assert_eq!(pattern(3, 0), "121132");
        assert_eq!(pattern(3, 26), "331111");
        assert_eq!(pattern(4, 27), "12212123");
        assert_eq!(pattern(4, 292), "43121111");
        assert_eq!(pattern(5, 0), "1211111253");
        assert_eq!(pattern(7, 1234), "12111121321244");
        assert_eq!(pattern(8, 0), "1211111211111285");
        assert_eq!(pattern(8, 7742862), "8611121111121111");
    }

    #[test]
    fn test_widths_sum() {
        for channels in 3..=8 {
            for value in [0, MAX_RANGES[channels] / 2, MAX_RANGES[channels]] {
                let sum: u32 = pattern(channels, value).bytes().map(|c| (c - b'0') as u32).sum();
                assert_eq!(sum as usize, 4 * channels - 2, "{} channels value {}", channels, value);
            }
        }
    }

    #[test]
    fn test_auto_channels() {
        assert_eq!(auto_channels(1, 0), 3);
        assert_eq!(auto_channels(2, 26), 3);
        assert_eq!(auto_channels(2, 27), 4);
        assert_eq!(auto_channels(3, 293), 5);
        assert_eq!(auto_channels(7, 7742862), 8);
    }

    #[test]
    fn test_encode() {
        let mut symbol = Symbol::new(Symbology::Channel);
        assert_eq!(encode_str(&mut symbol, "27"), Ok(None));
        assert_eq!((symbol.rows, symbol.width), (1, 23));
        assert_eq!(symbol.text.as_bytes(), b"027");
        assert_eq!(symbol.height, 50.0);
    }

    #[test]
    fn test_fixed_channels() {
        let mut symbol = Symbol::new(Symbology::Channel).with_options(0, 8, 0);
        encode_str(&mut symbol, "1").unwrap();
        assert_eq!(symbol.width, 39);
        assert_eq!(symbol.text.as_bytes(), b"0000001");
    }

    #[test]
    fn test_errors() {
        let mut symbol = Symbol::new(Symbology::Channel);
        assert!(encode_str(&mut symbol, "12345678").is_err());
        assert_eq!(symbol.errtxt, "333: Input length 8 too long (maximum 7)");

        let mut symbol = Symbol::new(Symbology::Channel);
        assert!(encode_str(&mut symbol, "1A").is_err());
        assert_eq!(symbol.errtxt, "334: Invalid character at position 2 in input (digits only)");

        let mut symbol = Symbol::new(Symbology::Channel).with_options(0, 3, 0);
        assert!(encode_str(&mut symbol, "27").is_err());
        assert_eq!(symbol.errtxt, "335: Input value \"27\" out of range (0 to 26 for 3 channels)");

        let mut symbol = Symbol::new(Symbology::Channel);
        assert!(encode_str(&mut symbol, "7742863").is_err());
        assert_eq!(symbol.errtxt, "318: Input value \"7742863\" out of range (0 to 7742862)");
    }

    #[test]
    fn test_compliant_height() {
        let mut symbol = Symbol::new(Symbology::Channel).with_output_options(OutputOptions::COMPLIANT_HEIGHT);
        assert_eq!(encode_str(&mut symbol, "27"), Ok(None));
        assert_eq!(symbol.height, 20.0);

        let mut symbol = Symbol::new(Symbology::Channel)
            .with_output_options(OutputOptions::COMPLIANT_HEIGHT)
            .with_height(1.0);
        assert_eq!(encode_str(&mut symbol, "27"), Ok(Some(Warning::NonCompliant)));
        assert_eq!(symbol.errtxt, "247: Height not compliant with standards");
    }
}
