//! Names stored immediately before their marker.
//!
//! Layer and font names are not length-prefixed. They end right where the
//! marker begins, so we walk backward over plausible name characters.

use super::FieldExtractor;
use crate::error::{Error, Result};
use crate::scanner::{decode_ascii, name_start, Marker, FONT_MARKER, LAYER_MARKER};
use crate::MIN_LAYER_NAME_LEN;

/// Layer and group names, read backward from [`LAYER_MARKER`]
#[derive(Debug, Clone)]
pub struct LayerNames {
    marker: Marker,
}

impl Default for LayerNames {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerNames {
    /// Creates a layer name extractor anchored on [`LAYER_MARKER`]
    pub fn new() -> Self {
        Self::with_marker(LAYER_MARKER)
    }

    /// Creates a layer name extractor anchored on a custom marker
    pub fn with_marker(marker: Marker) -> Self {
        Self { marker }
    }

    fn is_name_byte(b: u8) -> bool {
        b.is_ascii_alphanumeric() || matches!(b, b'_' | b' ' | b'-' | b'.')
    }
}

impl FieldExtractor for LayerNames {
    type Item = String;

    fn marker(&self) -> &Marker {
        &self.marker
    }

    fn read_at(&self, data: &[u8], offset: usize) -> Result<String> {
        let start = name_start(data, offset, Self::is_name_byte);
        let name = decode_ascii(&data[start..offset]).trim().to_string();

        if name.is_empty() {
            return Err(Error::EmptyValue { offset });
        }
        if name.len() < MIN_LAYER_NAME_LEN {
            return Err(Error::TooShort {
                offset,
                value: name,
            });
        }
        Ok(name)
    }
}

/// Font family names, read backward from [`FONT_MARKER`]
#[derive(Debug, Clone)]
pub struct FontNames {
    marker: Marker,
}

impl Default for FontNames {
    fn default() -> Self {
        Self::new()
    }
}

impl FontNames {
    /// Creates a font name extractor anchored on [`FONT_MARKER`]
    pub fn new() -> Self {
        Self::with_marker(FONT_MARKER)
    }

    /// Creates a font name extractor anchored on a custom marker
    pub fn with_marker(marker: Marker) -> Self {
        Self { marker }
    }

    // Latin-1 letters and digits keep the walk going; decode_ascii drops them later.
    fn is_name_byte(b: u8) -> bool {
        char::from(b).is_alphanumeric() || matches!(b, b'-' | b'_')
    }
}

impl FieldExtractor for FontNames {
    type Item = String;

    fn marker(&self) -> &Marker {
        &self.marker
    }

    fn read_at(&self, data: &[u8], offset: usize) -> Result<String> {
        let start = name_start(data, offset, Self::is_name_byte);
        let font = decode_ascii(&data[start..offset]).trim().to_string();

        if font.is_empty() {
            return Err(Error::EmptyValue { offset });
        }
        Ok(font)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_layer_name_at_buffer_start() {
        let names = LayerNames::new().extract(b"MyLayer1CgaT").into_items();
        assert_eq!(names, vec!["MyLayer".to_string()]);
    }

    #[test]
    fn test_layer_name_stops_at_disallowed_byte() {
        let data = b"\x00\x01Background Group1CgaT\xff";
        let names = LayerNames::new().extract(data).into_items();
        assert_eq!(names, vec!["Background Group".to_string()]);
    }

    #[test]
    fn test_single_character_layer_rejected() {
        let extraction = LayerNames::new().extract(b"A1CgaT");
        assert!(extraction.items.is_empty());
        assert_eq!(extraction.occurrences, 1);
        assert_eq!(extraction.skipped, 1);

        assert!(LayerNames::new().extract(b"_1CgaT").items.is_empty());
    }

    #[test]
    fn test_layer_name_is_trimmed() {
        let data = b"\x00  Icon.v2 1CgaT";
        let names = LayerNames::new().extract(data).into_items();
        assert_eq!(names, vec!["Icon.v2".to_string()]);
    }

    #[test]
    fn test_layer_names_sorted_and_deduplicated() {
        let data = b"\x00Zeta1CgaT\x00Alpha1CgaT\x00Zeta1CgaT\x00 1CgaT";
        let extraction = LayerNames::new().extract(data);
        assert_eq!(extraction.items, vec!["Alpha".to_string(), "Zeta".to_string()]);
        assert_eq!(extraction.occurrences, 4);
        assert_eq!(extraction.skipped, 1);
    }

    #[test]
    fn test_layer_with_custom_marker() {
        let marker = Marker::new("custom", b"@@");
        let names = LayerNames::with_marker(marker)
            .extract(b"!hero_image@@")
            .into_items();
        assert_eq!(names, vec!["hero_image".to_string()]);
    }

    #[test]
    fn test_font_names() {
        let data = b"\x00Inter-Bold+ymaF\x00Roboto_Mono+ymaF\x00Inter-Bold+ymaF";
        let fonts = FontNames::new().extract(data).into_items();
        assert_eq!(
            fonts,
            vec!["Inter-Bold".to_string(), "Roboto_Mono".to_string()]
        );
    }

    #[test]
    fn test_font_walk_stops_at_space() {
        let fonts = FontNames::new().extract(b"Open Sans+ymaF").into_items();
        assert_eq!(fonts, vec!["Sans".to_string()]);
    }

    #[test]
    fn test_font_single_character_kept() {
        let fonts = FontNames::new().extract(b"\x00X+ymaF").into_items();
        assert_eq!(fonts, vec!["X".to_string()]);
    }

    #[test]
    fn test_font_latin1_letters_walked_but_dropped() {
        // 0xE9 is 'é' in Latin-1: part of the run, absent from the name
        let fonts = FontNames::new().extract(b"\x00Caf\xe9+ymaF").into_items();
        assert_eq!(fonts, vec!["Caf".to_string()]);
    }

    #[test]
    fn test_font_empty_name_skipped() {
        let extraction = FontNames::new().extract(b"\x00+ymaF");
        assert!(extraction.items.is_empty());
        assert_eq!(extraction.skipped, 1);
    }
}
