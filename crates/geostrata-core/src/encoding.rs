//! Order-preserving byte encoding of literal values (lexicoding).
//!
//! Attribute index rows embed encoded values directly in the sorted key
//! space, so every encoding here must preserve the natural ordering of its
//! type under unsigned bytewise comparison.

use crate::filter::Literal;

const SIGN_BIT: u64 = 1 << 63;

/// Encodes a literal so that byte order matches value order.
#[must_use]
pub fn lexicode(literal: &Literal) -> Vec<u8> {
    match literal {
        Literal::Int(v) => (*v as u64 ^ SIGN_BIT).to_be_bytes().to_vec(),
        Literal::Float(v) => {
            // IEEE-754 total-order trick: flip all bits of negatives, flip
            // only the sign bit of non-negatives.
            let bits = v.to_bits();
            let ordered = if bits & SIGN_BIT != 0 { !bits } else { bits | SIGN_BIT };
            ordered.to_be_bytes().to_vec()
        }
        Literal::Bool(v) => vec![u8::from(*v)],
        Literal::Str(v) => v.as_bytes().to_vec(),
        Literal::Uuid(v) => v.as_bytes().to_vec(),
        Literal::Date(v) => (v.timestamp_millis() as u64 ^ SIGN_BIT)
            .to_be_bytes()
            .to_vec(),
    }
}

/// True when the lexicoded form has a fixed width for the literal's type.
/// Strings are the only variable-width encoding.
#[must_use]
pub fn is_fixed_width(literal: &Literal) -> bool {
    !matches!(literal, Literal::Str(_))
}

/// The smallest byte string strictly greater than every string with the
/// given prefix: trailing `0xFF` bytes are dropped and the last remaining
/// byte is incremented. `None` when the prefix is all `0xFF` (unbounded).
#[must_use]
pub fn successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let last = prefix.iter().rposition(|&b| b != 0xFF)?;
    let mut out = prefix[..=last].to_vec();
    out[last] += 1;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ordered(values: &[Literal]) {
        let encoded: Vec<Vec<u8>> = values.iter().map(lexicode).collect();
        for pair in encoded.windows(2) {
            assert!(pair[0] < pair[1], "{:?} !< {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_int_ordering() {
        assert_ordered(&[
            Literal::Int(i64::MIN),
            Literal::Int(-20),
            Literal::Int(-1),
            Literal::Int(0),
            Literal::Int(10),
            Literal::Int(20),
            Literal::Int(i64::MAX),
        ]);
    }

    #[test]
    fn test_float_ordering() {
        assert_ordered(&[
            Literal::Float(f64::NEG_INFINITY),
            Literal::Float(-1000.5),
            Literal::Float(-0.25),
            Literal::Float(0.0),
            Literal::Float(0.25),
            Literal::Float(1000.5),
            Literal::Float(f64::INFINITY),
        ]);
    }

    #[test]
    fn test_date_ordering() {
        assert_ordered(&[
            Literal::Date("1969-07-20T20:17:00Z".parse().unwrap()),
            Literal::Date("2012-01-01T11:00:00Z".parse().unwrap()),
            Literal::Date("2014-01-01T12:15:00Z".parse().unwrap()),
        ]);
    }

    #[test]
    fn test_successor() {
        assert_eq!(successor(b"2nd1"), Some(b"2nd2".to_vec()));
        assert_eq!(successor(&[0x01, 0xFF]), Some(vec![0x02]));
        assert_eq!(successor(&[0xFF, 0xFF]), None);
    }
}
