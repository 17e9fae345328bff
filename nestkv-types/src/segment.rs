use std::{
    borrow::Borrow,
    fmt::{Display, Formatter},
    ops::Deref,
    str::FromStr,
};

use thiserror::Error;

use crate::KeyPath;

/// A nonempty string that does not contain any instances of
/// [`KeyPath::SEPARATOR`].
///
/// This is the owned variant of [`Segment`].
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct SegmentBuf(String);

impl AsRef<Segment> for SegmentBuf {
    fn as_ref(&self) -> &Segment {
        self
    }
}

impl Borrow<Segment> for SegmentBuf {
    fn borrow(&self) -> &Segment {
        self
    }
}

impl Deref for SegmentBuf {
    type Target = Segment;

    fn deref(&self) -> &Self::Target {
        unsafe { Segment::from_str_unchecked(&self.0) }
    }
}

impl Display for SegmentBuf {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SegmentBuf {
    type Err = ParseSegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Segment::parse(s)?.to_owned())
    }
}

impl From<&Segment> for SegmentBuf {
    fn from(value: &Segment) -> Self {
        value.to_owned()
    }
}

macro_rules! segment_from_int {
    ($($int:ty),* $(,)?) => {
        $(
            impl From<$int> for SegmentBuf {
                fn from(value: $int) -> Self {
                    SegmentBuf(value.to_string())
                }
            }
        )*
    };
}

segment_from_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// A nonempty string slice that does not contain any instances of
/// [`KeyPath::SEPARATOR`].
///
/// For the owned variant, see [`SegmentBuf`].
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Segment(str);

impl Segment {
    /// Parse a Segment from a string.
    ///
    /// # Examples
    /// ```rust
    /// # use nestkv_types::ParseSegmentError;
    /// use nestkv_types::Segment;
    ///
    /// # fn main() -> Result<(), ParseSegmentError> {
    /// Segment::parse("segment")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// If the string is empty or contains a [`KeyPath::SEPARATOR`] a
    /// [`ParseSegmentError`] variant will be returned.
    pub const fn parse(value: &str) -> Result<&Self, ParseSegmentError> {
        if value.is_empty() {
            Err(ParseSegmentError::Empty)
        } else if Self::contains_separator(value.as_bytes()) {
            Err(ParseSegmentError::ContainsSeparator)
        } else {
            unsafe { Ok(Segment::from_str_unchecked(value)) }
        }
    }

    /// Return the encapsulated string.
    ///
    /// # Examples
    /// ```rust
    /// # use nestkv_types::ParseSegmentError;
    /// use nestkv_types::Segment;
    ///
    /// # fn main() -> Result<(), ParseSegmentError> {
    /// let segment_str = "segment";
    /// let segment = Segment::parse(segment_str)?;
    /// assert_eq!(segment.as_str(), segment_str);
    /// # Ok(())
    /// # }
    /// ```
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creates a Segment from a string without performing any checks.
    ///
    /// # Safety
    /// This function should only be called from the [`nestkv_macros`] crate -
    /// do not use directly.
    ///
    /// [`nestkv_macros`]: ../nestkv_macros/index.html
    pub const unsafe fn from_str_unchecked(s: &str) -> &Self {
        &*(s as *const _ as *const Self)
    }

    const fn contains_separator(bytes: &[u8]) -> bool {
        let mut index = 0;

        while index < bytes.len() {
            if bytes[index] == KeyPath::SEPARATOR as u8 {
                return true;
            }
            index += 1;
        }

        false
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0)
    }
}

impl ToOwned for Segment {
    type Owned = SegmentBuf;

    fn to_owned(&self) -> Self::Owned {
        SegmentBuf(self.0.to_owned())
    }
}

/// Represents all ways parsing a string as a [`Segment`] can fail.
#[derive(Debug, Error)]
pub enum ParseSegmentError {
    #[error("segments must be nonempty")]
    Empty,
    #[error("segments must not contain the key separator")]
    ContainsSeparator,
}
