//! Schema-driven extraction of status text into an [`OutputRecord`].
//!
//! Each field is located by its literal label followed by a colon. Simple
//! fields capture one word token (optionally followed by a unit); paired
//! fields capture two numbers on the same line, near end first. A field that
//! is missing or fails coercion is left out of the record and reported as a
//! [`Diagnostic`]; the remaining fields are still extracted.

pub mod coerce;
pub mod record;

use std::fmt;

use regex::Regex;
use tracing::{info, warn};

use crate::key;
use crate::schema::{FieldSchema, FieldSpec, SchemaError};

pub use coerce::{BOOLEAN_FALSE_TOKENS, BOOLEAN_TRUE_TOKENS, CoercionError};
pub use record::{FieldValue, OutputRecord};

/// Why a field is absent from the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// The label does not appear in the text.
    LabelNotFound,
    /// The label appears but the value layout does not match.
    ValueNotFound,
    /// A captured token failed coercion.
    Coercion(CoercionError),
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::LabelNotFound => write!(f, "label not found"),
            MissReason::ValueNotFound => write!(f, "value not found after label"),
            MissReason::Coercion(e) => write!(f, "{}", e),
        }
    }
}

/// Non-fatal extraction miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub field_label: String,
    pub reason: MissReason,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field_label, self.reason)
    }
}

pub type Diagnostics = Vec<Diagnostic>;

/// Result of one extraction pass.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub record: OutputRecord,
    pub diagnostics: Diagnostics,
}

/// Patterns compiled for one field.
#[derive(Debug)]
struct CompiledField {
    spec: FieldSpec,
    key: String,
    anchor: Regex,
    value: Regex,
}

impl CompiledField {
    fn compile(spec: FieldSpec, value_pattern: &str) -> Result<Self, SchemaError> {
        let anchor = format!(r"\b{}[ \t]*:", regex::escape(spec.label));
        let value = format!("{}[ \t]*{}", anchor, value_pattern);
        let build = |pattern: &str| {
            Regex::new(pattern).map_err(|e| SchemaError::Pattern {
                label: spec.label.to_string(),
                message: e.to_string(),
            })
        };

        Ok(Self {
            spec,
            key: spec.key(),
            anchor: build(&anchor)?,
            value: build(&value)?,
        })
    }

    fn miss(&self, text: &str) -> Diagnostic {
        let reason = if self.anchor.is_match(text) {
            MissReason::ValueNotFound
        } else {
            MissReason::LabelNotFound
        };
        self.diagnostic(reason)
    }

    fn diagnostic(&self, reason: MissReason) -> Diagnostic {
        Diagnostic {
            field_label: self.spec.label.to_string(),
            reason,
        }
    }
}

/// Applies a [`FieldSchema`] to captured status text.
#[derive(Debug)]
pub struct FieldExtractor {
    simple: Vec<CompiledField>,
    paired: Vec<CompiledField>,
}

impl FieldExtractor {
    pub fn new(schema: &FieldSchema) -> Result<Self, SchemaError> {
        let simple = schema
            .simple()
            .iter()
            .map(|spec| {
                let unit = spec
                    .unit
                    .map(|u| format!(r"[ \t]+{}\b", regex::escape(u)))
                    .unwrap_or_default();
                CompiledField::compile(*spec, &format!(r"(\w+){}", unit))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let paired = schema
            .paired()
            .iter()
            .map(|spec| CompiledField::compile(*spec, r"(\d+)[ \t]+(\d+)"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { simple, paired })
    }

    /// Extract simple fields from `basic` and paired fields from `extended`.
    pub fn extract(&self, basic: &str, extended: &str) -> Extraction {
        let mut out = Extraction::default();

        info!(bytes = basic.len(), "Parsing basic status");
        for field in &self.simple {
            match self.simple_value(field, basic) {
                Ok(value) => {
                    out.record.insert(field.key.clone(), value);
                }
                Err(diagnostic) => out.diagnostics.push(diagnostic),
            }
        }

        info!(bytes = extended.len(), "Parsing extended status");
        for field in &self.paired {
            match self.paired_values(field, extended) {
                Ok((near, far)) => {
                    let (near_key, far_key) = key::paired(&field.key);
                    out.record.insert(near_key, near);
                    out.record.insert(far_key, far);
                }
                Err(diagnostic) => out.diagnostics.push(diagnostic),
            }
        }

        for diagnostic in &out.diagnostics {
            warn!(field = %diagnostic.field_label, reason = %diagnostic.reason, "Field not extracted");
        }

        out
    }

    fn simple_value(&self, field: &CompiledField, text: &str) -> Result<FieldValue, Diagnostic> {
        let caps = field.value.captures(text).ok_or_else(|| field.miss(text))?;
        field
            .spec
            .coercion
            .apply(&caps[1])
            .map_err(|e| field.diagnostic(MissReason::Coercion(e)))
    }

    fn paired_values(
        &self,
        field: &CompiledField,
        text: &str,
    ) -> Result<(FieldValue, FieldValue), Diagnostic> {
        let caps = field.value.captures(text).ok_or_else(|| field.miss(text))?;
        let coerce = |token: &str| {
            field
                .spec
                .coercion
                .apply(token)
                .map_err(|e| field.diagnostic(MissReason::Coercion(e)))
        };
        Ok((coerce(&caps[1])?, coerce(&caps[2])?))
    }
}

/// One-shot extraction with a freshly compiled schema.
pub fn extract(
    basic: &str,
    extended: &str,
    schema: &FieldSchema,
) -> Result<(OutputRecord, Diagnostics), SchemaError> {
    let extraction = FieldExtractor::new(schema)?.extract(basic, extended);
    Ok((extraction.record, extraction.diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = "\
  ---------------------- ATU-R Info (hw: annex A, f/w: annex A/B/C) -----------
   Running Mode            :      17A        State                : SHOWTIME
   DS Actual Rate          :  68929000 bps   US Actual Rate       :  19999000 bps
   DS Attainable Rate      : 102692284 bps   US Attainable Rate   :  31544000 bps
   DS Interleave Depth     :         1       US Interleave Depth  :         1
   NE Current Attenuation  :        14 dB    Cur SNR Margin       :        15  dB
   NE CRC Count            :         0       FE CRC Count         :       280
   NE ES Count             :         0       FE  ES Count         :        41
   Xdsl Reset Times        :         0       Xdsl Link  Times     :         1
   Power Management Mode   :  DSL_G997_PMS_L0
  -------------------------------- ATU-C Info ---------------------------------
   Far Current Attenuation :         0 dB    Far SNR Margin       :        15  dB
";

    const EXTENDED: &str = "\
                  Near End        Far End    Note
 Trellis      :       1             1
 Bitswap      :       1             0
 LOS          :       0             3
 LOSS         :       0            39 (seconds)
 FECS         :   345097            633047 (seconds)
 ES           :      29              1081 (seconds)
 SES          :      12               291 (seconds)
";

    fn schema(simple: Vec<FieldSpec>, paired: Vec<FieldSpec>) -> FieldSchema {
        FieldSchema::new(simple, paired).unwrap()
    }

    #[test]
    fn test_rate_with_unit() {
        let s = schema(vec![FieldSpec::new("DS Actual Rate").unit("bps").integer()], vec![]);
        let (record, diagnostics) =
            extract("DS Actual Rate    :   123456   bps", "", &s).unwrap();
        assert_eq!(record.get("ds_actual_rate"), Some(&FieldValue::Integer(123456)));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_paired_counter() {
        let s = schema(
            vec![],
            vec![FieldSpec::new("FECS").describe("Forward Error Correction Seconds").integer()],
        );
        let (record, _) = extract(
            "",
            "FECS         :   345097            633047 (seconds)",
            &s,
        )
        .unwrap();
        assert_eq!(
            record.get("forward_error_correction_seconds_near"),
            Some(&FieldValue::Integer(345097))
        );
        assert_eq!(
            record.get("forward_error_correction_seconds_far"),
            Some(&FieldValue::Integer(633047))
        );
    }

    #[test]
    fn test_full_basic_blob() {
        let extractor = FieldExtractor::new(&FieldSchema::vigor130().unwrap()).unwrap();
        let out = extractor.extract(BASIC, "");

        assert_eq!(out.record.get("running_mode"), Some(&FieldValue::from("17A")));
        assert_eq!(out.record.get("state"), Some(&FieldValue::from("SHOWTIME")));
        assert_eq!(
            out.record.get("power_management_mode"),
            Some(&FieldValue::from("DSL_G997_PMS_L0"))
        );
        assert_eq!(out.record.get("us_actual_rate"), Some(&FieldValue::Integer(19999000)));
        assert_eq!(out.record.get("cur_snr_margin"), Some(&FieldValue::Integer(15)));
        assert_eq!(out.record.get("fe_es_count"), Some(&FieldValue::Integer(41)));
        assert_eq!(out.record.get("ne_es_count"), Some(&FieldValue::Integer(0)));
        assert_eq!(out.record.get("xdsl_link_times"), Some(&FieldValue::Integer(1)));
        assert_eq!(out.record.len(), 19);
        // Every paired field is missing from the empty extended text.
        assert_eq!(out.diagnostics.len(), 24);
    }

    #[test]
    fn test_label_is_word_anchored() {
        let s = schema(
            vec![],
            vec![
                FieldSpec::new("ES").describe("Errored Seconds").integer(),
                FieldSpec::new("LOS").describe("Loss Of Signal Count").integer(),
            ],
        );
        let (record, _) = extract("", EXTENDED, &s).unwrap();
        assert_eq!(record.get("errored_seconds_near"), Some(&FieldValue::Integer(29)));
        assert_eq!(record.get("errored_seconds_far"), Some(&FieldValue::Integer(1081)));
        assert_eq!(record.get("loss_of_signal_count_far"), Some(&FieldValue::Integer(3)));
    }

    #[test]
    fn test_missing_line_only_affects_its_field() {
        let without_los: String = EXTENDED
            .lines()
            .filter(|l| !l.trim_start().starts_with("LOS "))
            .map(|l| format!("{}\n", l))
            .collect();
        let extractor = FieldExtractor::new(&FieldSchema::vigor130().unwrap()).unwrap();
        let out = extractor.extract(BASIC, &without_los);

        assert!(!out.record.contains_key("loss_of_signal_count_near"));
        assert!(!out.record.contains_key("loss_of_signal_count_far"));
        let los: Vec<_> = out
            .diagnostics
            .iter()
            .filter(|d| d.field_label == "LOS")
            .collect();
        assert_eq!(los.len(), 1);
        assert_eq!(los[0].reason, MissReason::LabelNotFound);
        assert_eq!(
            out.record.get("loss_of_signal_seconds_far"),
            Some(&FieldValue::Integer(39))
        );
        assert_eq!(out.record.get("trellis_near"), Some(&FieldValue::Boolean(true)));
        assert_eq!(out.record.get("bitswap_far"), Some(&FieldValue::Boolean(false)));
    }

    #[test]
    fn test_unit_mismatch_is_reported() {
        let s = schema(vec![FieldSpec::new("Cur SNR Margin").unit("dB").integer()], vec![]);
        let (record, diagnostics) = extract("Cur SNR Margin : 15 bps", "", &s).unwrap();
        assert!(record.is_empty());
        assert_eq!(diagnostics[0].reason, MissReason::ValueNotFound);
    }

    #[test]
    fn test_coercion_failure_skips_field_only() {
        let s = schema(
            vec![
                FieldSpec::new("Running Mode").integer(),
                FieldSpec::new("State"),
            ],
            vec![],
        );
        let (record, diagnostics) = extract(BASIC, "", &s).unwrap();
        assert!(!record.contains_key("running_mode"));
        assert_eq!(record.get("state"), Some(&FieldValue::from("SHOWTIME")));
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0].reason, MissReason::Coercion(_)));
    }

    #[test]
    fn test_paired_boolean_failure_drops_both_halves() {
        let s = schema(vec![], vec![FieldSpec::new("Trellis").boolean()]);
        let (record, diagnostics) = extract("", "Trellis : 1 7", &s).unwrap();
        assert!(!record.contains_key("trellis_near"));
        assert!(!record.contains_key("trellis_far"));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_simple_boolean_accepts_word_tokens() {
        let s = schema(
            vec![
                FieldSpec::new("Vectoring").boolean(),
                FieldSpec::new("G.INP").boolean(),
                FieldSpec::new("Test Mode").boolean(),
            ],
            vec![],
        );
        let (record, diagnostics) = extract(
            "Vectoring : Enable\nG.INP : off\nTest Mode : maybe\n",
            "",
            &s,
        )
        .unwrap();

        assert_eq!(record.get("vectoring"), Some(&FieldValue::Boolean(true)));
        assert_eq!(record.get("g.inp"), Some(&FieldValue::Boolean(false)));
        assert!(!record.contains_key("test_mode"));
        assert!(matches!(
            diagnostics[0].reason,
            MissReason::Coercion(CoercionError::NotBoolean { .. })
        ));
    }

    #[test]
    fn test_pair_must_share_a_line() {
        let s = schema(vec![], vec![FieldSpec::new("CRC").integer()]);
        let (record, diagnostics) = extract("", "CRC : 57\n 0\n", &s).unwrap();
        assert!(record.is_empty());
        assert_eq!(diagnostics[0].reason, MissReason::ValueNotFound);
    }

    #[test]
    fn test_deterministic() {
        let extractor = FieldExtractor::new(&FieldSchema::vigor130().unwrap()).unwrap();
        let a = serde_json::to_string(&extractor.extract(BASIC, EXTENDED).record).unwrap();
        let b = serde_json::to_string(&extractor.extract(BASIC, EXTENDED).record).unwrap();
        assert_eq!(a, b);
    }
}
