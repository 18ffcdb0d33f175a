//! Declarative user parameters of renderers and tone mappers.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transfer::TransferFunction;

/// UI control a parameter is edited with.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Control {
    Spinner,
    Slider,
    Checkbox,
    Color,
    TransferFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamValue {
    Float(f32),
    Uint(u32),
    Bool(bool),
    Color([f32; 3]),
    TransferFunction(TransferFunction),
}

impl ParamValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Float(_) => "float",
            ParamValue::Uint(_) => "uint",
            ParamValue::Bool(_) => "bool",
            ParamValue::Color(_) => "color",
            ParamValue::TransferFunction(_) => "transfer function",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub control: Control,
    pub default: ParamValue,
    pub min: Option<f32>,
    pub max: Option<f32>,
}

impl ParamSpec {
    pub fn spinner(name: &'static str, label: &'static str, default: f32) -> Self {
        Self {
            name,
            label,
            control: Control::Spinner,
            default: ParamValue::Float(default),
            min: Some(0.0),
            max: None,
        }
    }

    pub fn count(name: &'static str, label: &'static str, default: u32) -> Self {
        Self {
            default: ParamValue::Uint(default),
            ..Self::spinner(name, label, 0.0)
        }
    }

    pub fn slider(name: &'static str, label: &'static str, default: f32, min: f32, max: f32) -> Self {
        Self {
            name,
            label,
            control: Control::Slider,
            default: ParamValue::Float(default),
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn checkbox(name: &'static str, label: &'static str, default: bool) -> Self {
        Self {
            name,
            label,
            control: Control::Checkbox,
            default: ParamValue::Bool(default),
            min: None,
            max: None,
        }
    }

    pub fn color(name: &'static str, label: &'static str, default: [f32; 3]) -> Self {
        Self {
            name,
            label,
            control: Control::Color,
            default: ParamValue::Color(default),
            min: None,
            max: None,
        }
    }

    pub fn transfer_function() -> Self {
        Self {
            name: "transferFunction",
            label: "Transfer function",
            control: Control::TransferFunction,
            default: ParamValue::TransferFunction(TransferFunction::default()),
            min: None,
            max: None,
        }
    }

    pub fn with_max(mut self, max: f32) -> Self {
        self.max = Some(max);
        self
    }

    /// Checks the value kind and clamps numbers into `[min, max]`.
    fn accept(&self, value: ParamValue) -> Result<ParamValue> {
        let clamp = |v: f32| {
            let v = self.min.map_or(v, |m| v.max(m));
            self.max.map_or(v, |m| v.min(m))
        };
        match (&self.default, value) {
            (ParamValue::Float(_), ParamValue::Float(v)) => Ok(ParamValue::Float(clamp(v))),
            (ParamValue::Float(_), ParamValue::Uint(v)) => Ok(ParamValue::Float(clamp(v as f32))),
            (ParamValue::Uint(_), ParamValue::Uint(v)) => Ok(ParamValue::Uint(clamp(v as f32) as u32)),
            (ParamValue::Bool(_), v @ ParamValue::Bool(_)) => Ok(v),
            (ParamValue::Color(_), ParamValue::Color(c)) => {
                Ok(ParamValue::Color(c.map(|x| x.clamp(0.0, 1.0))))
            }
            (ParamValue::TransferFunction(_), v @ ParamValue::TransferFunction(_)) => Ok(v),
            (expected, _) => Err(Error::ParameterType {
                name: self.name.to_string(),
                expected: expected.kind(),
            }),
        }
    }
}

/// Current values of a list of parameters, initialized to their defaults.
#[derive(Debug, Clone)]
pub struct ParamSet {
    specs: Vec<ParamSpec>,
    values: Vec<ParamValue>,
}

impl ParamSet {
    pub fn new(specs: Vec<ParamSpec>) -> Self {
        let values = specs.iter().map(|s| s.default.clone()).collect();
        Self { specs, values }
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.index(name).map(|i| &self.values[i])
    }

    /// Validates and stores `value`; returns the stored (clamped) value.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<&ParamValue> {
        let i = self
            .index(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        self.values[i] = self.specs[i].accept(value)?;
        Ok(&self.values[i])
    }

    pub fn float(&self, name: &str) -> f32 {
        match self.get(name) {
            Some(ParamValue::Float(v)) => *v,
            Some(ParamValue::Uint(v)) => *v as f32,
            _ => 0.0,
        }
    }

    pub fn uint(&self, name: &str) -> u32 {
        match self.get(name) {
            Some(ParamValue::Uint(v)) => *v,
            Some(ParamValue::Float(v)) => v.max(0.0) as u32,
            _ => 0,
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(ParamValue::Bool(true)))
    }

    pub fn color(&self, name: &str) -> [f32; 3] {
        match self.get(name) {
            Some(ParamValue::Color(c)) => *c,
            _ => [0.0; 3],
        }
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> ParamSet {
        ParamSet::new(vec![
            ParamSpec::spinner("extinction", "Extinction", 100.0),
            ParamSpec::slider("anisotropy", "Anisotropy", 0.0, -1.0, 1.0),
            ParamSpec::count("bounces", "Max bounces", 8),
        ])
    }

    #[test]
    fn defaults_are_applied() {
        let p = set();
        assert_eq!(p.float("extinction"), 100.0);
        assert_eq!(p.uint("bounces"), 8);
    }

    #[test]
    fn values_are_clamped_to_range() {
        let mut p = set();
        p.set("anisotropy", ParamValue::Float(3.0)).unwrap();
        assert_eq!(p.float("anisotropy"), 1.0);
        p.set("extinction", ParamValue::Float(-5.0)).unwrap();
        assert_eq!(p.float("extinction"), 0.0);
    }

    #[test]
    fn unknown_names_and_wrong_kinds_fail() {
        let mut p = set();
        assert!(matches!(
            p.set("nope", ParamValue::Float(1.0)),
            Err(Error::UnknownParameter(_))
        ));
        assert!(matches!(
            p.set("bounces", ParamValue::Bool(true)),
            Err(Error::ParameterType { expected: "uint", .. })
        ));
        assert_eq!(p.uint("bounces"), 8);
    }

    #[test]
    fn values_deserialize_from_json() {
        let v: ParamValue = serde_json::from_str(r#"{ "float": 0.25 }"#).unwrap();
        assert_eq!(v, ParamValue::Float(0.25));
    }
}
