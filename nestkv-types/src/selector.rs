use std::{
    fmt::{Display, Formatter},
    ops,
};

use crate::{KeyPath, KeyPathBuf, Segment, SegmentBuf};

/// An index expression used to derive a child key from a parent key.
///
/// Scalars (strings, segments, integers) name a child and produce a longer
/// key path. Ranges carry no single name, so deriving a key from one is
/// rejected; the variant keeps the rendered range for error messages.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Selector {
    Scalar(String),
    Range(String),
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Scalar(scalar) => write!(f, "{scalar}"),
            Selector::Range(range) => write!(f, "{range}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Selector::Scalar(value.to_owned())
    }
}

impl From<String> for Selector {
    fn from(value: String) -> Self {
        Selector::Scalar(value)
    }
}

impl From<&Segment> for Selector {
    fn from(value: &Segment) -> Self {
        Selector::Scalar(value.as_str().to_owned())
    }
}

impl From<SegmentBuf> for Selector {
    fn from(value: SegmentBuf) -> Self {
        Selector::Scalar(value.as_str().to_owned())
    }
}

impl From<&KeyPath> for Selector {
    fn from(value: &KeyPath) -> Self {
        Selector::Scalar(value.as_str().to_owned())
    }
}

impl From<KeyPathBuf> for Selector {
    fn from(value: KeyPathBuf) -> Self {
        Selector::Scalar(value.as_str().to_owned())
    }
}

macro_rules! selector_from_int {
    ($($int:ty),* $(,)?) => {
        $(
            impl From<$int> for Selector {
                fn from(value: $int) -> Self {
                    Selector::Scalar(value.to_string())
                }
            }
        )*
    };
}

selector_from_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl<T: Display> From<ops::Range<T>> for Selector {
    fn from(value: ops::Range<T>) -> Self {
        Selector::Range(format!("{}..{}", value.start, value.end))
    }
}

impl<T: Display> From<ops::RangeInclusive<T>> for Selector {
    fn from(value: ops::RangeInclusive<T>) -> Self {
        Selector::Range(format!("{}..={}", value.start(), value.end()))
    }
}

impl<T: Display> From<ops::RangeFrom<T>> for Selector {
    fn from(value: ops::RangeFrom<T>) -> Self {
        Selector::Range(format!("{}..", value.start))
    }
}

impl<T: Display> From<ops::RangeTo<T>> for Selector {
    fn from(value: ops::RangeTo<T>) -> Self {
        Selector::Range(format!("..{}", value.end))
    }
}

impl<T: Display> From<ops::RangeToInclusive<T>> for Selector {
    fn from(value: ops::RangeToInclusive<T>) -> Self {
        Selector::Range(format!("..={}", value.end))
    }
}

impl From<ops::RangeFull> for Selector {
    fn from(_: ops::RangeFull) -> Self {
        Selector::Range("..".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{Segment, Selector};

    #[test]
    fn test_scalar_from_str() {
        assert_eq!(Selector::from("nested"), Selector::Scalar("nested".to_owned()));
    }

    #[test]
    fn test_scalar_from_segment() {
        let segment = Segment::parse("nested").unwrap();
        assert_eq!(Selector::from(segment), Selector::Scalar("nested".to_owned()));
    }

    #[test]
    fn test_scalar_from_integer() {
        assert_eq!(Selector::from(3), Selector::Scalar("3".to_owned()));
        assert_eq!(Selector::from(7u64), Selector::Scalar("7".to_owned()));
    }

    #[test]
    fn test_range_renders_bounds() {
        assert_eq!(Selector::from(0..2), Selector::Range("0..2".to_owned()));
        assert_eq!(Selector::from(1..=5), Selector::Range("1..=5".to_owned()));
        assert_eq!(Selector::from(3..), Selector::Range("3..".to_owned()));
        assert_eq!(Selector::from(..7), Selector::Range("..7".to_owned()));
        assert_eq!(Selector::from(..), Selector::Range("..".to_owned()));
    }
}
