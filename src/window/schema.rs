//! Window descriptors: what a window shows and how that is validated.
//!
//! A descriptor crosses into the registry from menus, map markers, and the
//! URL. Every crossing goes through [`WindowTarget::from_parts`] or
//! [`WindowDescriptor::from_value`], which check the shape of the params for
//! the declared target type and then the per-variant rules.

use std::borrow::Cow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;

use super::geometry::Geometry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("window descriptor must be a JSON object")]
    NotAnObject,
    #[error("malformed window descriptor: {0}")]
    Malformed(String),
    #[error("window descriptor is missing '{0}'")]
    MissingField(&'static str),
    #[error("unknown window type '{0}'")]
    UnknownTargetType(String),
    #[error("invalid params for {target_type}: {reason}")]
    InvalidParams { target_type: TargetType, reason: String },
    #[error("{target_type} requires a non-empty '{param}'")]
    EmptyParam { target_type: TargetType, param: &'static str },
    #[error("'{url}' is not an http(s) URL")]
    InvalidUrl { url: String },
    #[error("invalid geometry value for '{field}': {value}")]
    InvalidGeometry { field: &'static str, value: String },
}

/// Kinds of content a window can show
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum TargetType {
    Text,
    CorpusText,
    Profile,
    Feature,
    SampleText,
    BibliographyEntry,
    DictEntry,
    Bibliography,
    CorpusQuery,
    DictQuery,
    FeatureList,
    SampleTextList,
    ProfileList,
    Search,
    Map,
    FeatureMap,
    WebPage,
}

impl TargetType {
    /// Human readable name used in window titles
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::CorpusText => "Corpus text",
            Self::Profile => "Profile",
            Self::Feature => "Feature",
            Self::SampleText => "Sample text",
            Self::BibliographyEntry => "Bibliography entry",
            Self::DictEntry => "Dictionary entry",
            Self::Bibliography => "Bibliography",
            Self::CorpusQuery => "Corpus query",
            Self::DictQuery => "Dictionary query",
            Self::FeatureList => "Features",
            Self::SampleTextList => "Sample texts",
            Self::ProfileList => "Profiles",
            Self::Search => "Search",
            Self::Map => "Map",
            Self::FeatureMap => "Feature map",
            Self::WebPage => "Web page",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextParams {
    pub text_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusTextParams {
    pub text_id: String,
    /// Hit positions to highlight, as sent by the corpus search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hits: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictEntryParams {
    pub dictionary: String,
    pub text_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    #[serde(default)]
    pub query_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictQueryParams {
    pub dictionary: String,
    #[serde(default)]
    pub query_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapParams {
    pub endpoint: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureMapParams {
    pub endpoint: String,
    #[serde(default)]
    pub query_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPageParams {
    pub url: String,
}

/// Target of a window: the type tag and that type's params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "targetType", content = "params")]
pub enum WindowTarget {
    Text(TextParams),
    CorpusText(CorpusTextParams),
    Profile(TextParams),
    Feature(TextParams),
    SampleText(TextParams),
    BibliographyEntry(TextParams),
    DictEntry(DictEntryParams),
    Bibliography(QueryParams),
    CorpusQuery(QueryParams),
    DictQuery(DictQueryParams),
    FeatureList(QueryParams),
    SampleTextList(QueryParams),
    ProfileList(QueryParams),
    Search(QueryParams),
    Map(MapParams),
    FeatureMap(FeatureMapParams),
    WebPage(WebPageParams),
}

fn non_empty(target_type: TargetType, param: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyParam { target_type, param });
    }
    Ok(())
}

impl WindowTarget {
    /// Build and validate a target from its type name and raw params.
    pub fn from_parts(target_type: &str, params: Value) -> Result<Self, ValidationError> {
        let kind = TargetType::from_str(target_type)
            .map_err(|_| ValidationError::UnknownTargetType(target_type.to_string()))?;
        let target: WindowTarget = serde_json::from_value(json!({
            "targetType": kind.as_ref(),
            "params": params,
        }))
        .map_err(|e| ValidationError::InvalidParams {
            target_type: kind,
            reason: e.to_string(),
        })?;
        target.validate()?;
        Ok(target)
    }

    pub fn target_type(&self) -> TargetType {
        match self {
            Self::Text(_) => TargetType::Text,
            Self::CorpusText(_) => TargetType::CorpusText,
            Self::Profile(_) => TargetType::Profile,
            Self::Feature(_) => TargetType::Feature,
            Self::SampleText(_) => TargetType::SampleText,
            Self::BibliographyEntry(_) => TargetType::BibliographyEntry,
            Self::DictEntry(_) => TargetType::DictEntry,
            Self::Bibliography(_) => TargetType::Bibliography,
            Self::CorpusQuery(_) => TargetType::CorpusQuery,
            Self::DictQuery(_) => TargetType::DictQuery,
            Self::FeatureList(_) => TargetType::FeatureList,
            Self::SampleTextList(_) => TargetType::SampleTextList,
            Self::ProfileList(_) => TargetType::ProfileList,
            Self::Search(_) => TargetType::Search,
            Self::Map(_) => TargetType::Map,
            Self::FeatureMap(_) => TargetType::FeatureMap,
            Self::WebPage(_) => TargetType::WebPage,
        }
    }

    /// Per-variant rules beyond the shape checked by deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let kind = self.target_type();
        match self {
            Self::Text(p) | Self::Profile(p) | Self::Feature(p) | Self::SampleText(p) | Self::BibliographyEntry(p) => {
                non_empty(kind, "textId", &p.text_id)
            }
            Self::CorpusText(p) => non_empty(kind, "textId", &p.text_id),
            Self::DictEntry(p) => {
                non_empty(kind, "dictionary", &p.dictionary)?;
                non_empty(kind, "textId", &p.text_id)
            }
            Self::DictQuery(p) => non_empty(kind, "dictionary", &p.dictionary),
            Self::Map(p) => non_empty(kind, "endpoint", &p.endpoint),
            Self::FeatureMap(p) => non_empty(kind, "endpoint", &p.endpoint),
            Self::WebPage(p) => {
                if p.url.starts_with("https://") || p.url.starts_with("http://") {
                    Ok(())
                } else {
                    Err(ValidationError::InvalidUrl { url: p.url.clone() })
                }
            }
            Self::Bibliography(_)
            | Self::CorpusQuery(_)
            | Self::FeatureList(_)
            | Self::SampleTextList(_)
            | Self::ProfileList(_)
            | Self::Search(_) => Ok(()),
        }
    }

    /// Identity param; two windows with the same type and identity are the
    /// same window. A dictionary entry is keyed as `dictionary:textId`, so
    /// the same headword in two dictionaries opens two windows.
    pub fn identity(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(p) | Self::Profile(p) | Self::Feature(p) | Self::SampleText(p) | Self::BibliographyEntry(p) => {
                Some(Cow::Borrowed(p.text_id.as_str()))
            }
            Self::CorpusText(p) => Some(Cow::Borrowed(p.text_id.as_str())),
            Self::DictEntry(p) => Some(Cow::Owned(format!("{}:{}", p.dictionary, p.text_id))),
            _ => None,
        }
    }

    pub fn query_string(&self) -> Option<&str> {
        match self {
            Self::Bibliography(p)
            | Self::CorpusQuery(p)
            | Self::FeatureList(p)
            | Self::SampleTextList(p)
            | Self::ProfileList(p)
            | Self::Search(p) => Some(p.query_string.as_str()),
            Self::DictQuery(p) => Some(p.query_string.as_str()),
            Self::FeatureMap(p) => Some(p.query_string.as_str()),
            _ => None,
        }
    }

    /// Replace the query string. Returns false if this target has none.
    pub fn set_query_string(&mut self, query: &str) -> bool {
        let slot = match self {
            Self::Bibliography(p)
            | Self::CorpusQuery(p)
            | Self::FeatureList(p)
            | Self::SampleTextList(p)
            | Self::ProfileList(p)
            | Self::Search(p) => &mut p.query_string,
            Self::DictQuery(p) => &mut p.query_string,
            Self::FeatureMap(p) => &mut p.query_string,
            _ => return false,
        };
        *slot = query.to_string();
        true
    }

    pub fn default_title(&self) -> String {
        let label = self.target_type().label();
        let detail = match self {
            Self::Text(p) | Self::Profile(p) | Self::Feature(p) | Self::SampleText(p) | Self::BibliographyEntry(p) => {
                p.label.clone().unwrap_or_else(|| p.text_id.clone())
            }
            Self::CorpusText(p) => p.text_id.clone(),
            Self::DictEntry(p) => format!("{} ({})", p.text_id, p.dictionary),
            Self::Map(p) => p.label.clone().unwrap_or_else(|| p.endpoint.clone()),
            Self::WebPage(p) => p.url.clone(),
            _ => self.query_string().unwrap_or_default().to_string(),
        };
        if detail.trim().is_empty() {
            label.to_string()
        } else {
            format!("{label}: {detail}")
        }
    }

    /// The params object as JSON.
    pub fn params_value(&self) -> Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("params").map(Value::take))
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Shallow-merge `other`'s params over ours and re-validate.
    pub fn merged_with(&self, other: &WindowTarget) -> Result<WindowTarget, ValidationError> {
        let mut merged = match self.params_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Value::Object(incoming) = other.params_value() {
            for (key, value) in incoming {
                merged.insert(key, value);
            }
        }
        WindowTarget::from_parts(self.target_type().as_ref(), Value::Object(merged))
    }
}

/// A request to open a window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDescriptor {
    pub target: WindowTarget,
    pub title: Option<String>,
    pub geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    target_type: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

impl WindowDescriptor {
    pub fn new(target: WindowTarget) -> Self {
        Self {
            target,
            title: None,
            geometry: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Validate an untyped descriptor:
    /// `{"targetType": .., "params": {..}, "title"?: .., "geometry"?: {..}}`.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        if !value.is_object() {
            return Err(ValidationError::NotAnObject);
        }
        let raw: RawDescriptor =
            serde_json::from_value(value.clone()).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        let target_type = raw.target_type.ok_or(ValidationError::MissingField("targetType"))?;
        let params = raw.params.unwrap_or_else(|| Value::Object(Map::new()));
        let target = WindowTarget::from_parts(&target_type, params)?;
        Ok(Self {
            target,
            title: raw.title.filter(|t| !t.trim().is_empty()),
            geometry: raw.geometry,
        })
    }
}

impl FromStr for WindowDescriptor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Value = serde_json::from_str(s).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        Self::from_value(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_target_type_has_a_variant() {
        assert_eq!(TargetType::iter().count(), 17);
        for kind in TargetType::iter() {
            assert_eq!(TargetType::from_str(kind.as_ref()).unwrap(), kind);
        }
    }

    #[test]
    fn test_from_parts_valid() {
        let target = WindowTarget::from_parts("Text", json!({"textId": "t_001"})).unwrap();
        assert_eq!(target.target_type(), TargetType::Text);
        assert_eq!(target.identity().as_deref(), Some("t_001"));
        assert_eq!(target.default_title(), "Text: t_001");
    }

    #[test]
    fn test_from_parts_unknown_type() {
        assert_eq!(
            WindowTarget::from_parts("Spreadsheet", json!({})),
            Err(ValidationError::UnknownTargetType("Spreadsheet".to_string()))
        );
    }

    #[test]
    fn test_from_parts_wrong_shape() {
        let err = WindowTarget::from_parts("Text", json!({"textId": 42})).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidParams { target_type: TargetType::Text, .. }));
        let err = WindowTarget::from_parts("DictEntry", json!({"textId": "x"})).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidParams { .. }));
    }

    #[test]
    fn test_semantic_rules() {
        assert!(matches!(
            WindowTarget::from_parts("Text", json!({"textId": "  "})),
            Err(ValidationError::EmptyParam { param: "textId", .. })
        ));
        assert!(matches!(
            WindowTarget::from_parts("WebPage", json!({"url": "javascript:alert(1)"})),
            Err(ValidationError::InvalidUrl { .. })
        ));
        assert!(WindowTarget::from_parts("Search", json!({})).is_ok());
    }

    #[test]
    fn test_query_string_access() {
        let mut target = WindowTarget::from_parts("FeatureList", json!({"queryString": "a:1"})).unwrap();
        assert_eq!(target.query_string(), Some("a:1"));
        assert!(target.set_query_string("a:2"));
        assert_eq!(target.default_title(), "Features: a:2");

        let mut text = WindowTarget::from_parts("Text", json!({"textId": "x"})).unwrap();
        assert!(!text.set_query_string("a:2"));
        assert_eq!(text.query_string(), None);
    }

    #[test]
    fn test_merged_with_overrides_and_keeps() {
        let existing = WindowTarget::from_parts("Text", json!({"textId": "x", "label": "Old"})).unwrap();
        let incoming = WindowTarget::from_parts("Text", json!({"textId": "x"})).unwrap();
        assert_eq!(existing.merged_with(&incoming).unwrap(), existing);

        let incoming = WindowTarget::from_parts("Text", json!({"textId": "x", "label": "New"})).unwrap();
        let merged = existing.merged_with(&incoming).unwrap();
        assert_eq!(merged.default_title(), "Text: New");
    }

    #[test]
    fn test_descriptor_from_value() {
        let value = json!({
            "targetType": "Map",
            "params": {"endpoint": "/geo/places", "scope": ["egypt"]},
            "title": "Places",
            "geometry": {"x": 10, "y": 20, "width": 300, "height": 200}
        });
        let descriptor = WindowDescriptor::from_value(&value).unwrap();
        assert_eq!(descriptor.title.as_deref(), Some("Places"));
        assert_eq!(descriptor.geometry.unwrap().width, 300);
        assert_eq!(descriptor.target.identity(), None);

        let entry = WindowTarget::from_parts("DictEntry", json!({"dictionary": "apc", "textId": "ktb"})).unwrap();
        assert_eq!(entry.identity().as_deref(), Some("apc:ktb"));
    }

    #[test]
    fn test_descriptor_errors() {
        assert_eq!(WindowDescriptor::from_value(&json!([1])), Err(ValidationError::NotAnObject));
        assert_eq!(
            WindowDescriptor::from_value(&json!({"params": {}})),
            Err(ValidationError::MissingField("targetType"))
        );
    }
}
