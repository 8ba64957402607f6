//! Declarative field tables for status text extraction.
//!
//! A schema is two ordered lists of [`FieldSpec`]:
//! - **simple** fields carry one value per label (`vdsl status`)
//! - **paired** fields carry a near-end and a far-end value (`vdsl status more`)
//!
//! Construction rejects tables in which two fields would produce the same
//! record key.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::key;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Fields {first:?} and {second:?} both normalize to key {key:?}")]
    DuplicateKey {
        key: String,
        first: String,
        second: String,
    },
    #[error("Invalid pattern for field {label:?}: {message}")]
    Pattern { label: String, message: String },
}

/// How a captured token becomes a record value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coercion {
    /// Keep the token as text.
    #[default]
    Identity,
    /// Base-10 signed integer.
    Integer,
    /// Device truthy/falsy token.
    Boolean,
}

impl fmt::Display for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coercion::Identity => write!(f, "identity"),
            Coercion::Integer => write!(f, "integer"),
            Coercion::Boolean => write!(f, "boolean"),
        }
    }
}

/// One field to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Literal label as printed by the device, spacing included.
    pub label: &'static str,
    /// Unit token that must follow the value.
    pub unit: Option<&'static str>,
    /// Readable name used for the key instead of the label.
    pub description: Option<&'static str>,
    pub coercion: Coercion,
}

impl FieldSpec {
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            unit: None,
            description: None,
            coercion: Coercion::Identity,
        }
    }

    pub const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub const fn integer(mut self) -> Self {
        self.coercion = Coercion::Integer;
        self
    }

    pub const fn boolean(mut self) -> Self {
        self.coercion = Coercion::Boolean;
        self
    }

    /// Record key (without near/far suffix).
    pub fn key(&self) -> String {
        key::normalize(self.description.unwrap_or(self.label))
    }
}

/// Validated pair of field tables.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    simple: Vec<FieldSpec>,
    paired: Vec<FieldSpec>,
}

impl FieldSchema {
    pub fn new(simple: Vec<FieldSpec>, paired: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        let mut owners: HashMap<String, &'static str> = HashMap::new();

        let simple_keys = simple.iter().map(|f| (f.key(), f.label));
        let paired_keys = paired.iter().flat_map(|f| {
            let (near, far) = key::paired(&f.key());
            [(near, f.label), (far, f.label)]
        });

        for (key, label) in simple_keys.chain(paired_keys) {
            if let Some(first) = owners.get(&key) {
                return Err(SchemaError::DuplicateKey {
                    first: first.to_string(),
                    second: label.to_string(),
                    key,
                });
            }
            owners.insert(key, label);
        }

        Ok(Self { simple, paired })
    }

    /// Field tables for the DrayTek Vigor 130.
    pub fn vigor130() -> Result<Self, SchemaError> {
        Self::new(VIGOR_130_SIMPLE.to_vec(), VIGOR_130_PAIRED.to_vec())
    }

    pub fn simple(&self) -> &[FieldSpec] {
        &self.simple
    }

    pub fn paired(&self) -> &[FieldSpec] {
        &self.paired
    }
}

/// Fields of `vdsl status`.
pub const VIGOR_130_SIMPLE: &[FieldSpec] = &[
    FieldSpec::new("Running Mode"),
    FieldSpec::new("State"),
    FieldSpec::new("Power Management Mode"),
    FieldSpec::new("DS Actual Rate").unit("bps").integer(),
    FieldSpec::new("DS Attainable Rate").unit("bps").integer(),
    FieldSpec::new("DS Interleave Depth").integer(),
    FieldSpec::new("NE Current Attenuation").unit("dB").integer(),
    FieldSpec::new("NE CRC Count").integer(),
    FieldSpec::new("NE ES Count").integer(),
    FieldSpec::new("US Actual Rate").unit("bps").integer(),
    FieldSpec::new("US Attainable Rate").unit("bps").integer(),
    FieldSpec::new("US Interleave Depth").integer(),
    FieldSpec::new("Cur SNR Margin").unit("dB").integer(),
    FieldSpec::new("FE CRC Count").integer(),
    FieldSpec::new("FE  ES Count").integer(),
    FieldSpec::new("Far Current Attenuation").unit("dB").integer(),
    FieldSpec::new("Far SNR Margin").unit("dB").integer(),
    FieldSpec::new("Xdsl Reset Times").integer(),
    FieldSpec::new("Xdsl Link  Times").integer(),
];

/// Near-end/far-end fields of `vdsl status more`.
pub const VIGOR_130_PAIRED: &[FieldSpec] = &[
    FieldSpec::new("Trellis").boolean(),
    FieldSpec::new("Bitswap").boolean(),
    FieldSpec::new("ReTxEnable").boolean(),
    FieldSpec::new("VirtualNoise").boolean(),
    FieldSpec::new("LOS").describe("Loss Of Signal Count").integer(),
    FieldSpec::new("LOF").describe("Loss Of Frame Count").integer(),
    FieldSpec::new("LPR").describe("Loss Of Power Count").integer(),
    FieldSpec::new("LOM").describe("Loss Of Margin Count").integer(),
    FieldSpec::new("SosSuccess").describe("Successful SOS Procedure Count").integer(),
    FieldSpec::new("NCD").describe("No Cell Delineation Failure Count").integer(),
    FieldSpec::new("LCD").describe("Loss Of Cell Delineation Failure Count").integer(),
    FieldSpec::new("FECS").describe("Forward Error Correction Seconds").integer(),
    FieldSpec::new("ES").describe("Errored Seconds").integer(),
    FieldSpec::new("SES").describe("Severely Errored Seconds").integer(),
    FieldSpec::new("LOSS").describe("Loss Of Signal Seconds").integer(),
    FieldSpec::new("UAS").describe("Unavailable Seconds").integer(),
    FieldSpec::new("HECError").describe("Header Error Check Error Count").integer(),
    FieldSpec::new("CRC").describe("CRC Error Count").integer(),
    FieldSpec::new("INP").describe("Impulse Noise Protection").integer(),
    FieldSpec::new("InterleaveDelay").describe("Interleave Delay").integer(),
    FieldSpec::new("NFEC").integer(),
    FieldSpec::new("RFEC").integer(),
    FieldSpec::new("LSYMB").integer(),
    FieldSpec::new("INTLVBLOCK").integer(),
];
