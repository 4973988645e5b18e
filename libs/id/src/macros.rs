//! Macros for defining validated name types.

/// Maximum length of a single name segment in bytes.
pub const MAX_NAME_LEN: usize = 253;

/// Macro to define a validated, string-backed name type.
///
/// This generates a newtype wrapper around `String` with:
/// - A `KIND` constant used in error messages
/// - `parse()` with validation (non-empty, bounded length, and no
///   character matching the `forbidden` predicate)
/// - `Display`, `FromStr`, and `AsRef<str>` implementations
/// - `Serialize` and `Deserialize` implementations (validated on input)
/// - `Ord`, `Hash`, and other standard traits
///
/// # Example
///
/// ```ignore
/// define_name!(Domain, "domain", |c: char| c == '/');
///
/// let domain: Domain = "east".parse()?;
/// ```
#[macro_export]
macro_rules! define_name {
    ($name:ident, $kind:literal, $forbidden:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// Human-readable kind of this name, used in errors.
            pub const KIND: &'static str = $kind;

            /// Parses and validates a name.
            pub fn parse(s: &str) -> Result<Self, $crate::IdError> {
                if s.is_empty() {
                    return Err($crate::IdError::Empty { kind: Self::KIND });
                }

                if s.len() > $crate::MAX_NAME_LEN {
                    return Err($crate::IdError::TooLong {
                        kind: Self::KIND,
                        len: s.len(),
                        max: $crate::MAX_NAME_LEN,
                    });
                }

                if let Some(ch) = s.chars().find(|c| ($forbidden)(*c)) {
                    return Err($crate::IdError::InvalidCharacter {
                        kind: Self::KIND,
                        ch,
                    });
                }

                Ok(Self(s.to_string()))
            }

            /// Returns the name as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = $crate::IdError;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}
