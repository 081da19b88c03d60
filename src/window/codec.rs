//! Window list <-> URL token.
//!
//! The list is written as compact JSON, every character outside printable
//! ASCII is replaced by its `\uXXXX` escape so non-Latin text survives any
//! transport, and the result is base64 encoded with the URL-safe alphabet
//! and no padding. The arrangement travels as its plain name.

use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::geometry::{Geometry, Viewport};
use super::item::WindowItem;
use super::layout::Arrangement;
use super::schema::{ValidationError, WindowDescriptor, WindowTarget};

/// URL query parameter holding the window list
pub const WINDOWS_PARAM: &str = "w";
/// URL query parameter holding the arrangement
pub const ARRANGEMENT_PARAM: &str = "a";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("window state is not valid base64: {0}")]
    Transport(#[from] base64::DecodeError),
    #[error("window state is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("window state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("window state must be a list of windows")]
    NotAnArray,
    #[error("window {index} in state is invalid: {source}")]
    InvalidWindow {
        index: usize,
        #[source]
        source: ValidationError,
    },
    #[error("unknown arrangement '{0}'")]
    UnknownArrangement(String),
}

/// One window as stored in the URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    pub target_type: String,
    #[serde(default = "empty_params")]
    pub params: Value,
    /// Only explicit titles are stored; derived ones are recomputed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub x: String,
    pub y: String,
    pub width: String,
    pub height: String,
    #[serde(default)]
    pub z: u32,
}

fn empty_params() -> Value {
    Value::Object(serde_json::Map::new())
}

impl WindowSnapshot {
    pub fn capture(item: &WindowItem, viewport: &Viewport) -> Self {
        Self {
            target_type: item.target_type().to_string(),
            params: item.target.params_value(),
            title: item.custom_title.then(|| item.title.clone()),
            x: viewport.percent_x(item.geometry.x),
            y: viewport.percent_y(item.geometry.y),
            width: viewport.percent_x(item.geometry.width),
            height: viewport.percent_y(item.geometry.height),
            z: item.geometry.z,
        }
    }

    /// Validate into a descriptor with pixel geometry for `viewport`.
    pub fn into_descriptor(self, viewport: &Viewport) -> Result<WindowDescriptor, ValidationError> {
        let target = WindowTarget::from_parts(&self.target_type, self.params)?;
        let px = |field: &'static str, value: &str, convert: fn(&Viewport, &str) -> Option<u32>| {
            convert(viewport, value).ok_or_else(|| ValidationError::InvalidGeometry {
                field,
                value: value.to_string(),
            })
        };
        let geometry = Geometry {
            x: px("x", &self.x, Viewport::pixels_x)?,
            y: px("y", &self.y, Viewport::pixels_y)?,
            z: self.z,
            width: px("width", &self.width, Viewport::pixels_x)?,
            height: px("height", &self.height, Viewport::pixels_y)?,
        };
        Ok(WindowDescriptor {
            target,
            title: self.title,
            geometry: Some(geometry),
        })
    }
}

/// The two URL parameters that persist a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlState {
    pub windows: String,
    pub arrangement: String,
}

impl UrlState {
    pub fn to_query_string(&self) -> String {
        format!(
            "{}={}&{}={}",
            WINDOWS_PARAM, self.windows, ARRANGEMENT_PARAM, self.arrangement
        )
    }
}

/// The persistence parameters as read from a URL; either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlQuery {
    pub windows: Option<String>,
    pub arrangement: Option<String>,
}

impl UrlQuery {
    /// Read `w` and `a` from a query string, with or without a leading `?`.
    /// Other parameters are ignored.
    pub fn parse(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut out = Self::default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                WINDOWS_PARAM => out.windows = Some(value.to_string()),
                ARRANGEMENT_PARAM => out.arrangement = Some(value.to_string()),
                _ => {}
            }
        }
        out
    }
}

impl From<UrlState> for UrlQuery {
    fn from(state: UrlState) -> Self {
        Self {
            windows: Some(state.windows),
            arrangement: Some(state.arrangement),
        }
    }
}

/// Result of a successful decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedState {
    pub windows: Vec<WindowDescriptor>,
    pub arrangement: Arrangement,
}

/// Replace everything outside printable ASCII with `\uXXXX` (UTF-16 units).
pub fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for c in json.chars() {
        if (' '..='~').contains(&c) {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

/// Serialize windows and arrangement into URL parameters.
pub fn encode(windows: &[WindowItem], arrangement: Arrangement, viewport: &Viewport) -> UrlState {
    let snapshots: Vec<WindowSnapshot> = windows
        .iter()
        .map(|w| WindowSnapshot::capture(w, viewport))
        .collect();
    // a Vec of plain structs with string keys cannot fail to serialize
    let json = serde_json::to_string(&snapshots).unwrap_or_else(|_| "[]".to_string());
    UrlState {
        windows: URL_SAFE_NO_PAD.encode(escape_non_ascii(&json)),
        arrangement: arrangement.to_string(),
    }
}

/// Decode the window token alone. All windows validate or none are returned.
pub fn decode_windows(token: &str, viewport: &Viewport) -> Result<Vec<WindowDescriptor>, CodecError> {
    let bytes = URL_SAFE_NO_PAD.decode(token.trim())?;
    let json = String::from_utf8(bytes)?;
    let value: Value = serde_json::from_str(&json)?;
    let Value::Array(items) = value else {
        return Err(CodecError::NotAnArray);
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<WindowSnapshot>(item)
                .map_err(|e| ValidationError::Malformed(e.to_string()))
                .and_then(|snapshot| snapshot.into_descriptor(viewport))
                .map_err(|source| CodecError::InvalidWindow { index, source })
        })
        .collect()
}

/// Decode both URL parameters.
pub fn decode(windows: &str, arrangement: &str, viewport: &Viewport) -> Result<DecodedState, CodecError> {
    let arrangement = Arrangement::from_str(arrangement.trim())
        .map_err(|_| CodecError::UnknownArrangement(arrangement.to_string()))?;
    Ok(DecodedState {
        windows: decode_windows(windows, viewport)?,
        arrangement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn item(target_type: &str, params: Value, geometry: Geometry) -> WindowItem {
        WindowItem::new(WindowTarget::from_parts(target_type, params).unwrap(), None, geometry)
    }

    #[test]
    fn test_escape_non_ascii() {
        assert_eq!(escape_non_ascii("abc"), "abc");
        assert_eq!(escape_non_ascii("é"), "\\u00e9");
        // outside the BMP: surrogate pair
        assert_eq!(escape_non_ascii("𐤀"), "\\ud802\\udd00");
        assert_eq!(escape_non_ascii("\u{7f}"), "\\u007f");
    }

    #[test]
    fn test_token_is_url_safe_ascii() {
        let viewport = Viewport::new(1920, 1080);
        let windows = vec![item("Text", json!({"textId": "نص_١"}), viewport.centered_half())];
        let state = encode(&windows, Arrangement::Tile, &viewport);
        assert!(state
            .windows
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(state.arrangement, "tile");
    }

    #[test]
    fn test_round_trip_keeps_non_latin_params() {
        let viewport = Viewport::new(1920, 1080);
        let windows = vec![
            item("Text", json!({"textId": "نص_١"}), Geometry { x: 0, y: 0, z: 1, width: 960, height: 540 }),
            item("DictQuery", json!({"dictionary": "apc", "queryString": "lemma:كتب"}), Geometry::default()),
        ];
        let state = encode(&windows, Arrangement::SmartTile, &viewport);
        let decoded = decode(&state.windows, &state.arrangement, &viewport).unwrap();
        assert_eq!(decoded.arrangement, Arrangement::SmartTile);
        assert_eq!(decoded.windows.len(), 2);
        assert_eq!(decoded.windows[0].target, windows[0].target);
        assert_eq!(decoded.windows[0].geometry, Some(windows[0].geometry));
        assert_eq!(decoded.windows[1].target, windows[1].target);
    }

    #[test]
    fn test_decode_errors() {
        let viewport = Viewport::default();
        assert!(matches!(decode_windows("%%%", &viewport), Err(CodecError::Transport(_))));
        let not_json = URL_SAFE_NO_PAD.encode("{nope");
        assert!(matches!(decode_windows(&not_json, &viewport), Err(CodecError::Json(_))));
        let object = URL_SAFE_NO_PAD.encode("{}");
        assert!(matches!(decode_windows(&object, &viewport), Err(CodecError::NotAnArray)));
        assert!(matches!(
            decode(&URL_SAFE_NO_PAD.encode("[]"), "spiral", &viewport),
            Err(CodecError::UnknownArrangement(_))
        ));
    }

    #[test]
    fn test_decode_is_all_or_nothing() {
        let viewport = Viewport::default();
        let json = json!([
            {"targetType": "Text", "params": {"textId": "ok"}, "x": "0.00", "y": "0.00", "width": "50.00", "height": "50.00"},
            {"targetType": "Text", "params": {"textId": ""}, "x": "0.00", "y": "0.00", "width": "50.00", "height": "50.00"}
        ]);
        let token = URL_SAFE_NO_PAD.encode(json.to_string());
        let err = decode_windows(&token, &viewport).unwrap_err();
        assert!(matches!(err, CodecError::InvalidWindow { index: 1, .. }));
    }

    #[test]
    fn test_bad_geometry_is_rejected() {
        let viewport = Viewport::default();
        let json = json!([
            {"targetType": "Search", "params": {}, "x": "left", "y": "0.00", "width": "50.00", "height": "50.00"}
        ]);
        let token = URL_SAFE_NO_PAD.encode(json.to_string());
        assert!(matches!(
            decode_windows(&token, &viewport),
            Err(CodecError::InvalidWindow {
                source: ValidationError::InvalidGeometry { field: "x", .. },
                ..
            })
        ));
    }

    #[test]
    fn test_missing_params_read_as_empty() {
        let viewport = Viewport::default();
        let json = json!([
            {"targetType": "Search", "x": "0.00", "y": "0.00", "width": "50.00", "height": "50.00"}
        ]);
        let token = URL_SAFE_NO_PAD.encode(json.to_string());
        let windows = decode_windows(&token, &viewport).unwrap();
        assert_eq!(windows[0].target.query_string(), Some(""));
    }

    #[test]
    fn test_out_of_range_percentages_are_rejected() {
        let viewport = Viewport::default();
        let json = json!([
            {"targetType": "Search", "params": {}, "x": "0.00", "y": "0.00", "width": "1e12", "height": "50.00"}
        ]);
        let token = URL_SAFE_NO_PAD.encode(json.to_string());
        assert!(matches!(
            decode_windows(&token, &viewport),
            Err(CodecError::InvalidWindow {
                source: ValidationError::InvalidGeometry { field: "width", .. },
                ..
            })
        ));
    }

    #[test]
    fn test_url_query_parse() {
        let query = UrlQuery::parse("?lang=en&w=abc&a=cascade");
        assert_eq!(query.windows.as_deref(), Some("abc"));
        assert_eq!(query.arrangement.as_deref(), Some("cascade"));
        assert_eq!(UrlQuery::parse(""), UrlQuery::default());
    }
}
