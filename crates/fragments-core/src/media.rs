// ABOUTME: Parsed media types and the closed set of formats fragments may be stored as.
// ABOUTME: Content-Type strings are parsed once here; everything downstream works on Format.

use std::fmt;

use crate::error::FragmentError;

/// A supported fragment format. This is the construction whitelist: a
/// fragment whose declared base type is not one of these is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    TextPlain,
    TextMarkdown,
    TextHtml,
    ApplicationJson,
    ImagePng,
    ImageJpeg,
    ImageWebp,
    ImageGif,
}

impl Format {
    pub const ALL: [Format; 8] = [
        Format::TextPlain,
        Format::TextMarkdown,
        Format::TextHtml,
        Format::ApplicationJson,
        Format::ImagePng,
        Format::ImageJpeg,
        Format::ImageWebp,
        Format::ImageGif,
    ];

    /// The `type/subtype` form of this format.
    pub fn essence(self) -> &'static str {
        match self {
            Format::TextPlain => "text/plain",
            Format::TextMarkdown => "text/markdown",
            Format::TextHtml => "text/html",
            Format::ApplicationJson => "application/json",
            Format::ImagePng => "image/png",
            Format::ImageJpeg => "image/jpeg",
            Format::ImageWebp => "image/webp",
            Format::ImageGif => "image/gif",
        }
    }

    /// Look up a format by its lowercased `type/subtype`.
    pub fn from_essence(essence: &str) -> Option<Format> {
        Format::ALL.into_iter().find(|f| f.essence() == essence)
    }

    /// Map a requested file extension to its format. The table is exact:
    /// no case folding, no leading dot, no aliases such as `jpeg`.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext {
            "txt" => Some(Format::TextPlain),
            "md" => Some(Format::TextMarkdown),
            "html" => Some(Format::TextHtml),
            "json" => Some(Format::ApplicationJson),
            "png" => Some(Format::ImagePng),
            "jpg" => Some(Format::ImageJpeg),
            "webp" => Some(Format::ImageWebp),
            "gif" => Some(Format::ImageGif),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::TextPlain => "txt",
            Format::TextMarkdown => "md",
            Format::TextHtml => "html",
            Format::ApplicationJson => "json",
            Format::ImagePng => "png",
            Format::ImageJpeg => "jpg",
            Format::ImageWebp => "webp",
            Format::ImageGif => "gif",
        }
    }

    pub fn is_text(self) -> bool {
        matches!(
            self,
            Format::TextPlain | Format::TextMarkdown | Format::TextHtml
        )
    }

    pub fn is_image(self) -> bool {
        matches!(
            self,
            Format::ImagePng | Format::ImageJpeg | Format::ImageWebp | Format::ImageGif
        )
    }

    /// Formats reachable from this one in a single conversion, identity included.
    pub fn targets(self) -> &'static [Format] {
        const IMAGES: &[Format] = &[
            Format::ImagePng,
            Format::ImageJpeg,
            Format::ImageWebp,
            Format::ImageGif,
        ];
        match self {
            Format::TextPlain => &[Format::TextPlain],
            Format::TextMarkdown => &[Format::TextMarkdown, Format::TextHtml, Format::TextPlain],
            Format::TextHtml => &[Format::TextHtml, Format::TextPlain],
            Format::ApplicationJson => &[Format::ApplicationJson, Format::TextPlain],
            Format::ImagePng | Format::ImageJpeg | Format::ImageWebp | Format::ImageGif => IMAGES,
        }
    }

    pub fn can_convert_to(self, target: Format) -> bool {
        self.targets().contains(&target)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.essence())
    }
}

/// A parsed Content-Type value: a whitelisted base format plus any parameters.
///
/// The declared string is kept verbatim so the stored `type` field is exactly
/// what the caller sent, e.g. `text/plain; charset=utf-8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    raw: String,
    format: Format,
    params: Vec<(String, String)>,
}

impl MediaType {
    /// Parse a Content-Type value.
    ///
    /// Returns `Validation` for malformed input and `UnsupportedMediaType`
    /// when the value is well-formed but its base type is not whitelisted.
    pub fn parse(raw: &str) -> Result<Self, FragmentError> {
        let mut parts = raw.split(';');
        let base = parts.next().unwrap_or_default().trim().to_ascii_lowercase();

        let (top, sub) = base
            .split_once('/')
            .ok_or_else(|| FragmentError::Validation(format!("malformed media type: {raw:?}")))?;
        if top.is_empty() || sub.is_empty() || sub.contains('/') {
            return Err(FragmentError::Validation(format!(
                "malformed media type: {raw:?}"
            )));
        }

        let mut params = Vec::new();
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (name, value) = param.split_once('=').ok_or_else(|| {
                FragmentError::Validation(format!("malformed media type parameter: {param:?}"))
            })?;
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return Err(FragmentError::Validation(format!(
                    "malformed media type parameter: {param:?}"
                )));
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            params.push((name, value.to_string()));
        }

        let format =
            Format::from_essence(&base).ok_or(FragmentError::UnsupportedMediaType(base))?;

        Ok(Self {
            raw: raw.trim().to_string(),
            format,
            params,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The base type/subtype with parameters stripped.
    pub fn essence(&self) -> &'static str {
        self.format.essence()
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The value as declared by the caller.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True for the `text/*` family.
    pub fn is_text(&self) -> bool {
        self.format.is_text()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
