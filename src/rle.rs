// rle.rs - Run-length codec for fixed-width integer arrays.
//
// Arrays of 32-, 16- and 8-bit values are encoded into 16-bit units. Every
// encoding starts with the array length as two units (high, low). Runs of four
// or more equal values become `ESCAPE, length, value`; a literal equal to the
// escape value is doubled. Byte arrays are packed two bytes per unit, high
// byte first, with a zero pad byte when the byte stream has odd length.

use std::fmt;

/// Escape value for 32- and 16-bit element arrays.
pub const ESCAPE: u16 = 0xA5A5;

/// Escape value for byte arrays.
pub const ESCAPE_BYTE: u8 = 0xA5;

/// Runs shorter than this are emitted literally.
const MIN_RUN: u32 = 4;

/// Element width of an encoded array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementWidth {
    /// 32-bit elements, two units each.
    Int,
    /// 16-bit elements, one unit each.
    Short,
    /// 8-bit elements, two per unit.
    Byte,
}

/// An array of one of the supported element widths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RleArray {
    Int(Vec<u32>),
    Short(Vec<u16>),
    Byte(Vec<u8>),
}

impl RleArray {
    /// Width of the contained elements.
    pub fn width(&self) -> ElementWidth {
        match self {
            RleArray::Int(_) => ElementWidth::Int,
            RleArray::Short(_) => ElementWidth::Short,
            RleArray::Byte(_) => ElementWidth::Byte,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            RleArray::Int(v) => v.len(),
            RleArray::Short(v) => v.len(),
            RleArray::Byte(v) => v.len(),
        }
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Failure to decode a run-length encoded array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RleError {
    /// Input ended before the length prefix, a run length, or a run value.
    UnexpectedEnd,
    /// The number of decoded elements disagrees with the declared length.
    LengthMismatch { declared: usize, decoded: usize },
    /// The byte automaton was still inside an escape sequence at end of input.
    IncompleteRun,
    /// Units remain after the declared number of elements was decoded.
    TrailingData { extra: usize },
    /// The trailing pad byte of a byte array was not zero.
    BadPadding { byte: u8 },
    /// A run is longer than the encoder ever emits for the element width.
    RunTooLong { length: u32, max: u32 },
}

impl fmt::Display for RleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RleError::UnexpectedEnd => write!(f, "unexpected end of run-length encoded data"),
            RleError::LengthMismatch { declared, decoded } => write!(
                f,
                "run-length data declares {} elements but holds {}",
                declared, decoded
            ),
            RleError::IncompleteRun => write!(f, "run-length byte data ends inside a run"),
            RleError::TrailingData { extra } => {
                write!(f, "{} excess units after run-length encoded data", extra)
            }
            RleError::BadPadding { byte } => {
                write!(f, "non-zero pad byte {:#04x} in run-length byte data", byte)
            }
            RleError::RunTooLong { length, max } => {
                write!(f, "run of {} elements exceeds the maximum of {}", length, max)
            }
        }
    }
}

impl std::error::Error for RleError {}

/// Result of decoding a byte array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteDecode {
    pub bytes: Vec<u8>,
    /// Whether the final unit carried a zero pad byte.
    pub padded: bool,
}

// === Element abstraction ===

mod sealed {
    pub trait Sealed {}
    impl Sealed for u32 {}
    impl Sealed for u16 {}
    impl Sealed for u8 {}
}

/// An integer type the codec can encode.
pub trait Element: Copy + Eq + sealed::Sealed {
    const ESCAPE: Self;
    const MAX_RUN: u32;

    fn from_run_length(length: u32) -> Self;
    fn to_run_length(self) -> u32;
}

impl Element for u32 {
    const ESCAPE: Self = ESCAPE as u32;
    const MAX_RUN: u32 = 0xFFFF;

    fn from_run_length(length: u32) -> Self {
        length
    }

    fn to_run_length(self) -> u32 {
        self
    }
}

impl Element for u16 {
    const ESCAPE: Self = ESCAPE;
    const MAX_RUN: u32 = 0xFFFF;

    fn from_run_length(length: u32) -> Self {
        length as u16
    }

    fn to_run_length(self) -> u32 {
        self as u32
    }
}

impl Element for u8 {
    const ESCAPE: Self = ESCAPE_BYTE;
    const MAX_RUN: u32 = 0xFF;

    fn from_run_length(length: u32) -> Self {
        length as u8
    }

    fn to_run_length(self) -> u32 {
        self as u32
    }
}

// === Encoding ===

/// Encode an array of any supported width.
pub fn encode(array: &RleArray) -> Vec<u16> {
    match array {
        RleArray::Int(v) => encode_u32(v),
        RleArray::Short(v) => encode_u16(v),
        RleArray::Byte(v) => encode_u8(v),
    }
}

pub fn encode_u32(values: &[u32]) -> Vec<u16> {
    let mut out = length_prefix(values.len());
    encode_runs(values, |v: u32| {
        out.push((v >> 16) as u16);
        out.push(v as u16);
    });
    out
}

pub fn encode_u16(values: &[u16]) -> Vec<u16> {
    let mut out = length_prefix(values.len());
    encode_runs(values, |v: u16| out.push(v));
    out
}

pub fn encode_u8(values: &[u8]) -> Vec<u16> {
    let mut out = length_prefix(values.len());
    let mut pending: Option<u8> = None;
    encode_runs(values, |v: u8| match pending.take() {
        Some(high) => out.push(((high as u16) << 8) | v as u16),
        None => pending = Some(v),
    });
    if let Some(high) = pending {
        out.push((high as u16) << 8);
    }
    out
}

fn length_prefix(len: usize) -> Vec<u16> {
    assert!(
        len <= u32::MAX as usize,
        "run-length codec supports at most u32::MAX elements"
    );
    vec![(len >> 16) as u16, len as u16]
}

fn encode_runs<E: Element>(values: &[E], mut put: impl FnMut(E)) {
    let Some((&first, rest)) = values.split_first() else {
        return;
    };
    let mut run_value = first;
    let mut run_length = 1u32;
    for &value in rest {
        if value == run_value && run_length < E::MAX_RUN {
            run_length += 1;
        } else {
            encode_run(run_value, run_length, &mut put);
            run_value = value;
            run_length = 1;
        }
    }
    encode_run(run_value, run_length, &mut put);
}

fn encode_run<E: Element>(value: E, mut length: u32, put: &mut impl FnMut(E)) {
    if length < MIN_RUN {
        for _ in 0..length {
            if value == E::ESCAPE {
                put(E::ESCAPE);
            }
            put(value);
        }
        return;
    }
    // A run length equal to the escape would read back as an escaped literal.
    if length == E::ESCAPE.to_run_length() {
        if value == E::ESCAPE {
            put(E::ESCAPE);
        }
        put(value);
        length -= 1;
    }
    put(E::ESCAPE);
    put(E::from_run_length(length));
    put(value);
}

// === Decoding ===

/// Decode an array of the given width. The whole input must be consumed.
pub fn decode(width: ElementWidth, units: &[u16]) -> Result<RleArray, RleError> {
    Ok(match width {
        ElementWidth::Int => RleArray::Int(decode_u32(units)?),
        ElementWidth::Short => RleArray::Short(decode_u16(units)?),
        ElementWidth::Byte => RleArray::Byte(decode_u8(units)?.bytes),
    })
}

pub fn decode_u32(units: &[u16]) -> Result<Vec<u32>, RleError> {
    let (declared, body) = split_prefix(units)?;
    let mut pairs = body.chunks(2);
    let mut partial = false;
    let values = decode_runs(declared, RleError::UnexpectedEnd, || match pairs.next() {
        Some(&[high, low]) => Some(((high as u32) << 16) | low as u32),
        Some(_) => {
            partial = true;
            None
        }
        None => None,
    });
    if partial {
        return Err(RleError::UnexpectedEnd);
    }
    let values = values?;
    let extra = pairs.map(<[u16]>::len).sum::<usize>();
    if extra != 0 {
        return Err(RleError::TrailingData { extra });
    }
    Ok(values)
}

pub fn decode_u16(units: &[u16]) -> Result<Vec<u16>, RleError> {
    let (declared, body) = split_prefix(units)?;
    let mut iter = body.iter();
    let values = decode_runs(declared, RleError::UnexpectedEnd, || iter.next().copied())?;
    let extra = iter.len();
    if extra != 0 {
        return Err(RleError::TrailingData { extra });
    }
    Ok(values)
}

pub fn decode_u8(units: &[u16]) -> Result<ByteDecode, RleError> {
    let (declared, body) = split_prefix(units)?;
    let mut iter = body.iter();
    let mut low: Option<u8> = None;
    let bytes = decode_runs(declared, RleError::IncompleteRun, || match low.take() {
        Some(byte) => Some(byte),
        None => iter.next().map(|&unit| {
            low = Some(unit as u8);
            (unit >> 8) as u8
        }),
    })?;
    let padded = match low {
        Some(0) => true,
        Some(byte) => return Err(RleError::BadPadding { byte }),
        None => false,
    };
    let extra = iter.len();
    if extra != 0 {
        return Err(RleError::TrailingData { extra });
    }
    Ok(ByteDecode { bytes, padded })
}

/// Element count declared by an encoding's length prefix.
pub fn declared_len(units: &[u16]) -> Result<usize, RleError> {
    split_prefix(units).map(|(declared, _)| declared)
}

fn split_prefix(units: &[u16]) -> Result<(usize, &[u16]), RleError> {
    match units {
        [high, low, body @ ..] => Ok(((((*high as u32) << 16) | *low as u32) as usize, body)),
        _ => Err(RleError::UnexpectedEnd),
    }
}

#[derive(Clone, Copy)]
enum RunState {
    Idle,
    Escaped,
    Run(u32),
}

/// Drive the escape automaton until `declared` elements are produced.
/// `stalled` is reported when input ends inside an escape sequence.
fn decode_runs<E: Element>(
    declared: usize,
    stalled: RleError,
    mut next: impl FnMut() -> Option<E>,
) -> Result<Vec<E>, RleError> {
    // The declared length is untrusted; grow on demand past a modest reserve.
    let mut out = Vec::with_capacity(declared.min(1 << 16));
    let mut state = RunState::Idle;
    while out.len() < declared {
        let Some(value) = next() else {
            return Err(match state {
                RunState::Idle => RleError::LengthMismatch {
                    declared,
                    decoded: out.len(),
                },
                _ => stalled,
            });
        };
        state = match state {
            RunState::Idle if value == E::ESCAPE => RunState::Escaped,
            RunState::Idle => {
                out.push(value);
                RunState::Idle
            }
            RunState::Escaped if value == E::ESCAPE => {
                out.push(value);
                RunState::Idle
            }
            RunState::Escaped => {
                let length = value.to_run_length();
                if length > E::MAX_RUN {
                    return Err(RleError::RunTooLong {
                        length,
                        max: E::MAX_RUN,
                    });
                }
                RunState::Run(length)
            }
            RunState::Run(length) => {
                let end = out.len() + length as usize;
                if end > declared {
                    return Err(RleError::LengthMismatch {
                        declared,
                        decoded: end,
                    });
                }
                out.resize(end, value);
                RunState::Idle
            }
        };
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_run_then_literal() {
        let values = [5u16, 5, 5, 5, 5, 9];
        let encoded = encode_u16(&values);
        assert_eq!(encoded, vec![0, 6, ESCAPE, 5, 5, 9]);
        assert_eq!(decode_u16(&encoded).unwrap(), values);
    }

    #[test]
    fn short_runs_stay_literal() {
        let encoded = encode_u16(&[7, 7, 7, 1]);
        assert_eq!(encoded, vec![0, 4, 7, 7, 7, 1]);
    }

    #[test]
    fn literal_escape_is_doubled() {
        let encoded = encode_u16(&[ESCAPE, 3]);
        assert_eq!(encoded, vec![0, 2, ESCAPE, ESCAPE, 3]);
        assert_eq!(decode_u16(&encoded).unwrap(), vec![ESCAPE, 3]);
    }

    #[test]
    fn run_of_escape_values() {
        let values = vec![ESCAPE; 10];
        let encoded = encode_u16(&values);
        assert_eq!(encoded, vec![0, 10, ESCAPE, 10, ESCAPE]);
        assert_eq!(decode_u16(&encoded).unwrap(), values);
    }

    #[test]
    fn run_length_equal_to_escape_is_split() {
        let values = vec![42u16; ESCAPE as usize];
        let encoded = encode_u16(&values);
        assert_eq!(&encoded[2..], &[42, ESCAPE, ESCAPE - 1, 42]);
        assert_eq!(decode_u16(&encoded).unwrap(), values);
    }

    #[test]
    fn long_runs_are_split_at_max() {
        let values = vec![3u16; 0xFFFF + 10];
        let encoded = encode_u16(&values);
        assert_eq!(&encoded[2..], &[ESCAPE, 0xFFFF, 3, ESCAPE, 10, 3]);
        assert_eq!(decode_u16(&encoded).unwrap(), values);
    }

    #[test]
    fn int_values_use_two_units() {
        let values = [0x0001_0002u32, 0xA5A5, 0xA5A5, 9, 9, 9, 9];
        let encoded = encode_u32(&values);
        assert_eq!(
            encoded,
            vec![0, 7, 1, 2, 0, ESCAPE, 0, ESCAPE, 0, ESCAPE, 0, ESCAPE, 0, ESCAPE, 0, 4, 0, 9]
        );
        assert_eq!(decode_u32(&encoded).unwrap(), values);
    }

    #[test]
    fn byte_arrays_pack_and_pad() {
        let encoded = encode_u8(&[1, 2, 3]);
        assert_eq!(encoded, vec![0, 3, 0x0102, 0x0300]);
        let decoded = decode_u8(&encoded).unwrap();
        assert_eq!(decoded.bytes, vec![1, 2, 3]);
        assert!(decoded.padded);

        let even = decode_u8(&encode_u8(&[1, 2])).unwrap();
        assert!(!even.padded);
    }

    #[test]
    fn byte_run_length_equal_to_escape() {
        let values = vec![0xA5u8; 0xA5];
        let encoded = encode_u8(&values);
        assert_eq!(decode_u8(&encoded).unwrap().bytes, values);
    }

    #[test]
    fn tagged_variant_dispatch() {
        let array = RleArray::Byte(vec![0, 0, 0, 0, 0, 0xA5]);
        let encoded = encode(&array);
        assert_eq!(decode(ElementWidth::Byte, &encoded).unwrap(), array);
        assert_eq!(array.width(), ElementWidth::Byte);
        assert_eq!(array.len(), 6);
    }

    #[test]
    fn empty_array_is_just_the_prefix() {
        assert_eq!(encode_u16(&[]), vec![0, 0]);
        assert!(decode_u16(&[0, 0]).unwrap().is_empty());
    }

    #[test]
    fn missing_prefix() {
        assert_eq!(decode_u16(&[0]), Err(RleError::UnexpectedEnd));
    }

    #[test]
    fn truncated_after_escape() {
        assert_eq!(decode_u16(&[0, 6, ESCAPE, 5]), Err(RleError::UnexpectedEnd));
        assert_eq!(decode_u8(&[0, 6, 0xA505]), Err(RleError::IncompleteRun));
    }

    #[test]
    fn short_input_is_length_mismatch() {
        assert_eq!(
            decode_u16(&[0, 3, 1, 2]),
            Err(RleError::LengthMismatch {
                declared: 3,
                decoded: 2
            })
        );
    }

    #[test]
    fn run_past_declared_length() {
        assert_eq!(
            decode_u16(&[0, 3, ESCAPE, 5, 1]),
            Err(RleError::LengthMismatch {
                declared: 3,
                decoded: 5
            })
        );
    }

    #[test]
    fn trailing_units() {
        assert_eq!(
            decode_u16(&[0, 1, 4, 4]),
            Err(RleError::TrailingData { extra: 1 })
        );
        assert_eq!(
            decode_u8(&[0, 1, 0x0400, 0]),
            Err(RleError::TrailingData { extra: 1 })
        );
    }

    #[test]
    fn odd_int_tail() {
        assert_eq!(decode_u32(&[0, 1, 0]), Err(RleError::UnexpectedEnd));
    }

    #[test]
    fn oversized_int_run() {
        // A 32-bit run length past the encoder's maximum.
        assert_eq!(
            decode_u32(&[0x0100, 0, 0, ESCAPE, 0x0100, 0, 0, 7]),
            Err(RleError::RunTooLong {
                length: 0x0100_0000,
                max: 0xFFFF
            })
        );
        assert_eq!(
            decode_u32(&[0xFFFF, 0xFFFF, 0, ESCAPE, 0xFFFF, 0xFFFF, 0, 7]),
            Err(RleError::RunTooLong {
                length: u32::MAX,
                max: 0xFFFF
            })
        );
        // The largest legal run still decodes.
        let values = decode_u32(&[0, 0xFFFF, 0, ESCAPE, 0, 0xFFFF, 0, 7]).unwrap();
        assert_eq!(values.len(), 0xFFFF);
    }

    #[test]
    fn declared_length_from_prefix() {
        assert_eq!(declared_len(&encode_u16(&[1, 2, 3])), Ok(3));
        assert_eq!(declared_len(&[0x0001, 0x0002]), Ok(0x1_0002));
        assert_eq!(declared_len(&[7]), Err(RleError::UnexpectedEnd));
    }

    #[test]
    fn non_zero_padding() {
        assert_eq!(
            decode_u8(&[0, 1, 0x0407]),
            Err(RleError::BadPadding { byte: 7 })
        );
    }
}
