//! Typed descriptors for the product identifiers handled by the crate.
//!
//! Every identifier is validated token by token at construction: a value either parses
//! completely or fails with a [`FormatError`] naming the first offending field.
use crate::error::FormatError;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// Declares a closed set of identifier tokens with their string form.
macro_rules! token_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $token),+
                }
            }

            pub(crate) fn parse(family: &'static str, value: &str) -> Result<Self, FormatError> {
                match value {
                    $($token => Ok(Self::$variant),)+
                    _ => Err(FormatError::new(family, $field, value)),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod ewoc;
pub mod landsat8;
pub mod s1;
pub mod s2;
pub mod tile;

pub use ewoc::{EwocArdProductId, EwocS1ArdProductId, EwocTirArdProductId, OrbitDirection};
pub use landsat8::L8C2ProductId;
pub use s1::S1ProductId;
pub use s2::S2ProductId;
pub use tile::split_tile_id;

pub const SAFE_SUFFIX: &str = ".SAFE";
pub const DATETIME_FORMAT: &str = "%Y%m%dT%H%M%S";
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Any identifier the crate knows how to route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductId {
    S1(S1ProductId),
    S2(S2ProductId),
    L8C2(L8C2ProductId),
    EwocArd(EwocArdProductId),
    EwocS1Ard(EwocS1ArdProductId),
    EwocTirArd(EwocTirArdProductId),
}

impl ProductId {
    /// Parse an identifier of any supported family, choosing the grammar from its token count.
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let tokens = tokenize(raw);
        match tokens.len() {
            9 => Ok(Self::S1(S1ProductId::parse(raw)?)),
            7 if raw.starts_with("S2") => Ok(Self::S2(S2ProductId::parse(raw)?)),
            7 => Ok(Self::L8C2(L8C2ProductId::parse(raw)?)),
            6 => Ok(Self::EwocS1Ard(EwocS1ArdProductId::parse(raw)?)),
            5 if tokens[0] == "LC08" => match EwocArdProductId::parse(raw) {
                Ok(id) => Ok(Self::EwocArd(id)),
                Err(_) => Ok(Self::EwocTirArd(EwocTirArdProductId::parse(raw)?)),
            },
            5 => Ok(Self::EwocArd(EwocArdProductId::parse(raw)?)),
            n => Err(FormatError::new("product", "token count", n.to_string())),
        }
    }

    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S1(id) => id.fmt(f),
            Self::S2(id) => id.fmt(f),
            Self::L8C2(id) => id.fmt(f),
            Self::EwocArd(id) => id.fmt(f),
            Self::EwocS1Ard(id) => id.fmt(f),
            Self::EwocTirArd(id) => id.fmt(f),
        }
    }
}

pub(crate) fn strip_safe_suffix(raw: &str) -> &str {
    raw.strip_suffix(SAFE_SUFFIX).unwrap_or(raw)
}

pub(crate) fn tokenize(raw: &str) -> Vec<&str> {
    strip_safe_suffix(raw).split('_').collect()
}

/// Split `raw` and require exactly `count` tokens.
pub(crate) fn expect_tokens<'a>(
    family: &'static str,
    raw: &'a str,
    count: usize,
) -> Result<Vec<&'a str>, FormatError> {
    let tokens = tokenize(raw);
    if tokens.len() != count {
        return Err(FormatError::new(family, "token count", tokens.len().to_string()));
    }
    Ok(tokens)
}

pub(crate) fn parse_datetime(
    family: &'static str,
    field: &'static str,
    value: &str,
) -> Result<NaiveDateTime, FormatError> {
    // chrono accepts short numeric fields, the identifiers never have them
    if value.len() != 15 {
        return Err(FormatError::new(family, field, value));
    }
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map_err(|_| FormatError::new(family, field, value))
}

pub(crate) fn parse_date(
    family: &'static str,
    field: &'static str,
    value: &str,
) -> Result<NaiveDate, FormatError> {
    if value.len() != 8 {
        return Err(FormatError::new(family, field, value));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| FormatError::new(family, field, value))
}

pub(crate) fn expect_len<'a>(
    family: &'static str,
    field: &'static str,
    value: &'a str,
    len: usize,
) -> Result<&'a str, FormatError> {
    if value.len() != len || !value.is_ascii() {
        return Err(FormatError::new(family, field, value));
    }
    Ok(value)
}

pub(crate) fn expect_digits<'a>(
    family: &'static str,
    field: &'static str,
    value: &'a str,
    len: usize,
) -> Result<&'a str, FormatError> {
    if value.len() != len || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FormatError::new(family, field, value));
    }
    Ok(value)
}
