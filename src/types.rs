//! Shared types used by the cache, the batch warmer and the CLI.
//!
//! [`DerivativeRequest`] is what a batch file contains; [`Operation`] is
//! the closed set of named recipes the cache knows how to derive.

use crate::cache::{Derivation, DerivativeCache};
use crate::imaging::{Background, ImageCodec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A primitive cache-key parameter.
///
/// Parameters are rendered with [`Display`](fmt::Display) and joined in
/// order, so their order is part of the key.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int(i64),
    Float(f64),
    Text(String),
    None,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Int(n) => write!(f, "{n}"),
            Param::Float(x) => write!(f, "{x}"),
            Param::Text(s) => write!(f, "{s}"),
            Param::None => write!(f, "-"),
        }
    }
}

impl From<u32> for Param {
    fn from(value: u32) -> Self {
        Param::Int(value as i64)
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Int(value)
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Float(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<Background> for Param {
    fn from(value: Background) -> Self {
        Param::Text(value.to_string())
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Param::None)
    }
}

/// A named derivative recipe with its arguments.
///
/// Serialized with an `op` tag, e.g.
/// `{"op": "fit", "width": 200, "height": 200, "background": "#fff"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Operation {
    Square {
        length: u32,
    },
    Resize {
        #[serde(default)]
        width: Option<u32>,
        #[serde(default)]
        height: Option<u32>,
    },
    Fit {
        width: u32,
        height: u32,
        #[serde(default)]
        background: Option<Background>,
    },
    FitToSquare {
        length: u32,
        #[serde(default)]
        background: Option<Background>,
    },
    CropToFitSquare {
        length: u32,
        x: i64,
        y: i64,
        half_length: u32,
    },
    FitAspectRatio {
        width: u32,
        ratio: f64,
    },
}

impl Operation {
    /// The `op` tag of this operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Square { .. } => "square",
            Operation::Resize { .. } => "resize",
            Operation::Fit { .. } => "fit",
            Operation::FitToSquare { .. } => "fit-to-square",
            Operation::CropToFitSquare { .. } => "crop-to-fit-square",
            Operation::FitAspectRatio { .. } => "fit-aspect-ratio",
        }
    }

    /// Run this operation against `source` through the cache.
    pub fn apply<C: ImageCodec>(&self, cache: &DerivativeCache<C>, source: &str) -> Derivation {
        match *self {
            Operation::Square { length } => cache.square(source, length),
            Operation::Resize { width, height } => cache.resize(source, width, height),
            Operation::Fit {
                width,
                height,
                background,
            } => cache.fit(source, width, height, background),
            Operation::FitToSquare { length, background } => {
                cache.fit_to_square(source, length, background)
            }
            Operation::CropToFitSquare {
                length,
                x,
                y,
                half_length,
            } => cache.crop_to_fit_square(source, length, x, y, half_length),
            Operation::FitAspectRatio { width, ratio } => {
                cache.fit_aspect_ratio(source, width, ratio)
            }
        }
    }
}

/// One entry of a batch: derive `operation` from `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativeRequest {
    /// Source image, relative to the public root.
    pub source: String,
    #[serde(flatten)]
    pub operation: Operation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_display() {
        assert_eq!(Param::from(200u32).to_string(), "200");
        assert_eq!(Param::from(-5i64).to_string(), "-5");
        assert_eq!(Param::from(1.5f64).to_string(), "1.5");
        assert_eq!(Param::from(2.0f64).to_string(), "2");
        assert_eq!(Param::from("abc").to_string(), "abc");
        assert_eq!(Param::from(None::<u32>).to_string(), "-");
        assert_eq!(Param::from(Some(7u32)).to_string(), "7");
    }

    #[test]
    fn param_from_background_is_canonical() {
        let bg: Background = "#FFF".parse().unwrap();
        assert_eq!(Param::from(bg), Param::Text("#ffffff".into()));
    }

    #[test]
    fn parse_request_list() {
        let json = r##"[
            {"source": "avatars/a.jpg", "op": "square", "length": 64},
            {"source": "avatars/a.jpg", "op": "resize", "width": 300},
            {"source": "b.png", "op": "fit", "width": 200, "height": 100, "background": "#fff"},
            {"source": "b.png", "op": "fit-to-square", "length": 50},
            {"source": "c.jpg", "op": "crop-to-fit-square", "length": 100, "x": 150, "y": 150, "half_length": 50},
            {"source": "d.jpg", "op": "fit-aspect-ratio", "width": 800, "ratio": 1.5}
        ]"##;
        let requests: Vec<DerivativeRequest> = serde_json::from_str(json).unwrap();
        assert_eq!(requests.len(), 6);
        assert_eq!(requests[0].operation, Operation::Square { length: 64 });
        assert_eq!(
            requests[1].operation,
            Operation::Resize {
                width: Some(300),
                height: None
            }
        );
        assert_eq!(
            requests[2].operation,
            Operation::Fit {
                width: 200,
                height: 100,
                background: Some(Background::white())
            }
        );
        assert_eq!(
            requests[3].operation,
            Operation::FitToSquare {
                length: 50,
                background: None
            }
        );
        assert_eq!(requests[4].operation.name(), "crop-to-fit-square");
        assert_eq!(
            requests[5].operation,
            Operation::FitAspectRatio {
                width: 800,
                ratio: 1.5
            }
        );
    }

    #[test]
    fn unknown_op_is_rejected() {
        let json = r#"{"source": "a.jpg", "op": "sharpen", "amount": 2}"#;
        assert!(serde_json::from_str::<DerivativeRequest>(json).is_err());
    }

    #[test]
    fn bad_background_is_rejected() {
        let json = r#"{"source": "a.jpg", "op": "fit", "width": 1, "height": 1, "background": "nope"}"#;
        assert!(serde_json::from_str::<DerivativeRequest>(json).is_err());
    }

    #[test]
    fn operation_name_matches_tag() {
        let op = Operation::FitAspectRatio {
            width: 10,
            ratio: 1.0,
        };
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["op"], op.name());
    }
}
