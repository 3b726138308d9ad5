//! The argument binder: decoding one request into one destination struct.
//!
//! Destinations implement [`Bind`], normally through
//! `#[derive(Bind)]` from `trellis_macros`. Each field declares its source
//! with a `#[bind(...)]` attribute; the derive emits straight-line decode
//! code that calls back into the helpers here and on
//! [`Context`](crate::pipeline::Context).

use crate::error::{Error, Result};
use crate::pipeline::Context;

/// Where a field's raw value is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Path parameters captured by the matcher.
    Path,
    /// URL query component.
    Query,
    /// Request headers, compared case-insensitively.
    Header,
    /// Urlencoded or multipart form body.
    Form,
    /// JSON request body, decoded once per request.
    Json,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Path => "path",
            Source::Query => "query",
            Source::Header => "header",
            Source::Form => "form",
            Source::Json => "json",
        }
    }
}

/// Static description of one bindable field, kept for the documentation
/// collaborator and exposed through route introspection.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Lookup key (alias when given, field name otherwise).
    pub name: &'static str,
    pub source: Source,
    /// False for `Option` fields and fields carrying a default.
    pub required: bool,
    pub default: Option<&'static str>,
    pub desc: Option<&'static str>,
    pub type_name: &'static str,
}

/// A struct that can be populated from a request.
pub trait Bind: Sized {
    /// Field descriptors in declaration order, flattened structs included
    /// by reference from their own tables.
    const FIELDS: &'static [FieldSpec] = &[];

    fn bind(ctx: &mut Context) -> Result<Self>;
}

/// Scalar conversion from a raw request string.
///
/// An empty raw value decodes to the type's zero value, so `?k=` satisfies a
/// required field without failing numeric parsing.
pub trait FromArg: Sized {
    fn from_arg(raw: &str, field: &'static str) -> Result<Self>;
}

impl FromArg for String {
    fn from_arg(raw: &str, _field: &'static str) -> Result<Self> {
        Ok(raw.to_string())
    }
}

impl FromArg for bool {
    fn from_arg(raw: &str, field: &'static str) -> Result<Self> {
        match raw {
            "" => Ok(false),
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            other => Err(Error::arg_format()
                .with_detail(format!("{field}: invalid bool {other:?}"))),
        }
    }
}

macro_rules! from_arg_numeric {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromArg for $ty {
                fn from_arg(raw: &str, field: &'static str) -> Result<Self> {
                    if raw.is_empty() {
                        return Ok(<$ty>::default());
                    }
                    raw.parse::<$ty>().map_err(|e| {
                        Error::arg_format()
                            .with_detail(format!("{field}: {e}"))
                    })
                }
            }
        )+
    };
}

from_arg_numeric!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

/// Decode a required scalar field: absent with no default is a missing-arg
/// error naming the field.
pub fn required<T: FromArg>(
    raw: Option<String>,
    default: Option<&'static str>,
    field: &'static str,
) -> Result<T> {
    match raw {
        Some(v) => T::from_arg(&v, field),
        None => match default {
            Some(d) => T::from_arg(d, field),
            None => Err(Error::missing_arg().with_detail(field)),
        },
    }
}

/// Decode an optional scalar field: absent stays `None`.
pub fn optional<T: FromArg>(raw: Option<String>, field: &'static str) -> Result<Option<T>> {
    raw.map(|v| T::from_arg(&v, field)).transpose()
}

/// Bind the first uploaded part of a required file field.
pub fn required_file(
    mut files: Vec<super::UploadedFile>,
    field: &'static str,
) -> Result<super::UploadedFile> {
    if files.is_empty() {
        Err(Error::missing_arg().with_detail(field))
    } else {
        Ok(files.remove(0))
    }
}

/// Bind every uploaded part of a required file-list field.
pub fn required_files(
    files: Vec<super::UploadedFile>,
    field: &'static str,
) -> Result<Vec<super::UploadedFile>> {
    if files.is_empty() {
        Err(Error::missing_arg().with_detail(field))
    } else {
        Ok(files)
    }
}

/// Bind the first uploaded part of an optional file field, if any.
pub fn optional_file(mut files: Vec<super::UploadedFile>) -> Option<super::UploadedFile> {
    if files.is_empty() {
        None
    } else {
        Some(files.remove(0))
    }
}

/// Decode a required json field from the body object map.
pub fn required_json<T: serde::de::DeserializeOwned>(
    value: Option<serde_json::Value>,
    field: &'static str,
) -> Result<T> {
    match value {
        Some(v) => serde_json::from_value(v)
            .map_err(|e| Error::arg_format().with_detail(field).wrap(e)),
        None => Err(Error::missing_arg().with_detail(field)),
    }
}

/// Decode an optional json field; an absent or `null` key stays `None`.
pub fn optional_json<T: serde::de::DeserializeOwned>(
    value: Option<serde_json::Value>,
    field: &'static str,
) -> Result<Option<T>> {
    match value {
        Some(serde_json::Value::Null) | None => Ok(None),
        Some(v) => serde_json::from_value(v)
            .map(Some)
            .map_err(|e| Error::arg_format().with_detail(field).wrap(e)),
    }
}
