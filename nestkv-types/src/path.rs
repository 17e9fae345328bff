use std::{
    borrow::Borrow,
    fmt::{Display, Formatter},
    ops::Deref,
    str::FromStr,
};

use crate::segment::{ParseSegmentError, Segment, SegmentBuf};

/// The full, colon-joined name of a key. Consists of one or more
/// [`Segment`]s.
///
/// This is the owned variant of [`KeyPath`].
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct KeyPathBuf(String);

impl AsRef<KeyPath> for KeyPathBuf {
    fn as_ref(&self) -> &KeyPath {
        self
    }
}

impl Borrow<KeyPath> for KeyPathBuf {
    fn borrow(&self) -> &KeyPath {
        self
    }
}

impl Deref for KeyPathBuf {
    type Target = KeyPath;

    fn deref(&self) -> &Self::Target {
        unsafe { KeyPath::from_str_unchecked(&self.0) }
    }
}

impl Display for KeyPathBuf {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for KeyPathBuf {
    type Err = ParseSegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(KeyPath::parse(s)?.to_owned())
    }
}

impl From<&KeyPath> for KeyPathBuf {
    fn from(value: &KeyPath) -> Self {
        value.to_owned()
    }
}

impl From<&Segment> for KeyPathBuf {
    fn from(value: &Segment) -> Self {
        KeyPathBuf(value.as_str().to_owned())
    }
}

impl From<SegmentBuf> for KeyPathBuf {
    fn from(value: SegmentBuf) -> Self {
        KeyPathBuf(value.as_str().to_owned())
    }
}

/// The full, colon-joined name of a key, as a string slice.
///
/// Every [`KeyPath`] consists of one or more [`Segment`]s: it is nonempty
/// and none of the [`KeyPath::SEPARATOR`]s in it are leading, trailing, or
/// adjacent. For the owned variant, see [`KeyPathBuf`].
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct KeyPath(str);

impl KeyPath {
    /// Character separating the segments of a key path.
    pub const SEPARATOR: char = ':';

    /// Parse a KeyPath from a string.
    ///
    /// # Examples
    /// ```rust
    /// # use nestkv_types::ParseSegmentError;
    /// use nestkv_types::KeyPath;
    ///
    /// # fn main() -> Result<(), ParseSegmentError> {
    /// KeyPath::parse("nest-test:nested:subkey")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// If the string is empty, or any of the separator-delimited segments in
    /// it is empty, a [`ParseSegmentError`] will be returned.
    pub const fn parse(value: &str) -> Result<&Self, ParseSegmentError> {
        let bytes = value.as_bytes();

        if bytes.is_empty()
            || bytes[0] == Self::SEPARATOR as u8
            || bytes[bytes.len() - 1] == Self::SEPARATOR as u8
            || Self::contains_empty_segment(bytes)
        {
            Err(ParseSegmentError::Empty)
        } else {
            unsafe { Ok(KeyPath::from_str_unchecked(value)) }
        }
    }

    /// Return the encapsulated string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a new path by appending one segment.
    ///
    /// # Examples
    /// ```rust
    /// # use nestkv_types::ParseSegmentError;
    /// use nestkv_types::{KeyPath, Segment};
    ///
    /// # fn main() -> Result<(), ParseSegmentError> {
    /// let parent = KeyPath::parse("nest-test")?;
    /// let child = parent.join(Segment::parse("nested")?);
    /// assert_eq!(child.as_str(), "nest-test:nested");
    /// # Ok(())
    /// # }
    /// ```
    pub fn join(&self, segment: &Segment) -> KeyPathBuf {
        KeyPathBuf(format!("{}{}{}", &self.0, Self::SEPARATOR, segment))
    }

    /// Derive a new path by appending all segments of another path.
    pub fn join_path(&self, path: &KeyPath) -> KeyPathBuf {
        KeyPathBuf(format!("{}{}{}", &self.0, Self::SEPARATOR, &path.0))
    }

    /// Iterate over the segments of the path, in order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.0
            .split(Self::SEPARATOR)
            .map(|segment| unsafe { Segment::from_str_unchecked(segment) })
    }

    /// Returns whether the path equals `prefix` or descends from it. A
    /// partial segment does not count as a prefix: `ab:c` does not start
    /// with `a`.
    pub fn starts_with(&self, prefix: &KeyPath) -> bool {
        if self.0.len() == prefix.0.len() {
            self.0 == prefix.0
        } else {
            self.0.starts_with(&prefix.0)
                && self.0.as_bytes()[prefix.0.len()] == Self::SEPARATOR as u8
        }
    }

    /// Creates a KeyPath from a string without performing any checks.
    ///
    /// # Safety
    /// This function should only be called from the [`nestkv_macros`] crate -
    /// do not use directly.
    ///
    /// [`nestkv_macros`]: ../nestkv_macros/index.html
    pub const unsafe fn from_str_unchecked(s: &str) -> &Self {
        &*(s as *const _ as *const Self)
    }

    const fn contains_empty_segment(bytes: &[u8]) -> bool {
        let mut index = 0;

        while index + 1 < bytes.len() {
            if bytes[index] == Self::SEPARATOR as u8 && bytes[index + 1] == Self::SEPARATOR as u8 {
                return true;
            }
            index += 1;
        }

        false
    }
}

impl Display for KeyPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0)
    }
}

impl ToOwned for KeyPath {
    type Owned = KeyPathBuf;

    fn to_owned(&self) -> Self::Owned {
        KeyPathBuf(self.0.to_owned())
    }
}
