//! Validation of the model's JSON answer.

use crate::personality::{
    BigFiveScores, BigFiveTrait, MbtiAxes, MbtiAxis, MbtiResult, MbtiType, PersonalityResult,
};
use crate::{Error, Result};
use serde_json::{Map, Value};

/// Which sections the answer must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sections {
    pub big_five: bool,
    pub mbti: bool,
    pub behavior_tags: bool,
}

/// Parse and validate a raw model response.
///
/// Accepts bare JSON or a JSON object embedded in prose or code fences.
/// Sections that were not requested are ignored even when present.
pub fn parse_response(raw: &str, sections: Sections) -> Result<PersonalityResult> {
    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(_) => {
            let extracted = extract_json_object(raw)?;
            serde_json::from_str::<Value>(&extracted)
                .map_err(|e| malformed(format!("response is not valid JSON: {e}")))?
        }
    };

    let Some(root) = parsed.as_object() else {
        return Err(malformed("response must be a JSON object"));
    };

    let mut result = PersonalityResult::empty();

    if sections.big_five {
        result.big_five = Some(parse_big_five(required_object(root, "big_five")?)?);
    }

    if sections.mbti {
        let mbti = parse_mbti(required_object(root, "mbti")?)?;
        let implied = mbti.axes.implied_type();
        if implied != mbti.mbti_type {
            tracing::warn!(
                reported = %mbti.mbti_type,
                implied = %implied,
                "MBTI type disagrees with axis percentages"
            );
        }
        result.mbti = Some(mbti);
    }

    if sections.behavior_tags {
        result.behavior_tags = parse_tags(root.get("behavior_tags"))?;
    }

    result.summary = match root.get("summary") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => return Err(malformed("`summary` must be a string")),
    };

    Ok(result)
}

fn malformed(msg: impl Into<String>) -> Error {
    Error::MalformedResponse(msg.into())
}

fn required_object<'a>(root: &'a Map<String, Value>, key: &str) -> Result<&'a Map<String, Value>> {
    match root.get(key) {
        None | Some(Value::Null) => Err(malformed(format!("missing required key `{key}`"))),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(malformed(format!("`{key}` must be an object"))),
    }
}

fn number(map: &Map<String, Value>, path: &str, key: &str) -> Result<f64> {
    match map.get(key) {
        None | Some(Value::Null) => Err(malformed(format!("missing required key `{path}.{key}`"))),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| malformed(format!("`{path}.{key}` must be a number"))),
    }
}

fn parse_big_five(map: &Map<String, Value>) -> Result<BigFiveScores> {
    let mut scores = [0u8; 5];
    for (slot, t) in scores.iter_mut().zip(BigFiveTrait::ALL) {
        let value = number(map, "big_five", t.key())?;
        if value.fract() != 0.0 {
            return Err(malformed(format!(
                "`big_five.{}` must be an integer, got {value}",
                t.key()
            )));
        }
        if !(0.0..=100.0).contains(&value) {
            return Err(malformed(format!(
                "`big_five.{}` out of range 0-100: {value}",
                t.key()
            )));
        }
        *slot = value as u8;
    }
    let [openness, conscientiousness, extraversion, agreeableness, neuroticism] = scores;
    Ok(BigFiveScores {
        openness,
        conscientiousness,
        extraversion,
        agreeableness,
        neuroticism,
    })
}

fn parse_mbti(map: &Map<String, Value>) -> Result<MbtiResult> {
    let mbti_type: MbtiType = match map.get("type") {
        Some(Value::String(code)) => code.parse().map_err(malformed)?,
        None | Some(Value::Null) => return Err(malformed("missing required key `mbti.type`")),
        Some(_) => return Err(malformed("`mbti.type` must be a string")),
    };

    let confidence = number(map, "mbti", "confidence")?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(malformed(format!(
            "`mbti.confidence` out of range 0-1: {confidence}"
        )));
    }

    let axes_map = match map.get("axes") {
        Some(Value::Object(axes)) => axes,
        None | Some(Value::Null) => return Err(malformed("missing required key `mbti.axes`")),
        Some(_) => return Err(malformed("`mbti.axes` must be an object")),
    };
    let mut values = [0f64; 4];
    for (slot, axis) in values.iter_mut().zip(MbtiAxis::ALL) {
        let value = number(axes_map, "mbti.axes", axis.key())?;
        if !(0.0..=100.0).contains(&value) {
            return Err(malformed(format!(
                "`mbti.axes.{}` out of range 0-100: {value}",
                axis.key()
            )));
        }
        *slot = value;
    }
    let [energy_source, perception, judgment, lifestyle] = values;

    Ok(MbtiResult {
        mbti_type,
        confidence,
        axes: MbtiAxes {
            energy_source,
            perception,
            judgment,
            lifestyle,
        },
    })
}

fn parse_tags(value: Option<&Value>) -> Result<Vec<String>> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(malformed("`behavior_tags` must be an array of strings")),
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(|s| s.trim().to_string())
                .ok_or_else(|| malformed("`behavior_tags` must be an array of strings"))
        })
        .filter(|tag| !matches!(tag, Ok(t) if t.is_empty()))
        .collect()
}

fn extract_json_object(raw: &str) -> Result<String> {
    let start = raw
        .find('{')
        .ok_or_else(|| malformed("response did not contain a JSON object"))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| malformed("response did not contain a JSON object"))?;
    if end <= start {
        return Err(malformed("response JSON bounds are invalid"));
    }
    Ok(raw[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: Sections = Sections {
        big_five: true,
        mbti: true,
        behavior_tags: true,
    };

    const FULL: &str = r#"{
        "big_five": {"openness": 82, "conscientiousness": 55, "extraversion": 35, "agreeableness": 70, "neuroticism": 40},
        "mbti": {"type": "infp", "confidence": 0.72, "axes": {"E-I": 30, "S-N": 25, "T-F": 35, "J-P": 40}},
        "behavior_tags": ["thoughtful listener", "  ", "shares links"],
        "summary": "A reflective, warm participant."
    }"#;

    fn message(err: Error) -> String {
        match err {
            Error::MalformedResponse(msg) => msg,
            other => panic!("expected malformed response, got {other:?}"),
        }
    }

    #[test]
    fn parses_complete_response() {
        let result = parse_response(FULL, ALL).unwrap();
        let big_five = result.big_five.unwrap();
        assert_eq!(big_five.openness, 82);
        assert_eq!(big_five.neuroticism, 40);
        let mbti = result.mbti.unwrap();
        assert_eq!(mbti.mbti_type, MbtiType::Infp);
        assert_eq!(mbti.axes.perception, 25.0);
        assert_eq!(result.behavior_tags, vec!["thoughtful listener", "shares links"]);
        assert_eq!(result.summary.as_deref(), Some("A reflective, warm participant."));
    }

    #[test]
    fn accepts_fenced_json() {
        let raw = format!("Here is the analysis:\n```json\n{FULL}\n```\nHope this helps!");
        assert!(parse_response(&raw, ALL).is_ok());
    }

    #[test]
    fn missing_big_five_is_malformed() {
        let raw = r#"{"mbti": {"type": "INTJ", "confidence": 0.5, "axes": {"E-I": 20, "S-N": 30, "T-F": 70, "J-P": 80}}}"#;
        let err = parse_response(raw, ALL).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ModelFailure);
        assert!(message(err).contains("big_five"));
    }

    #[test]
    fn disabled_sections_are_not_required() {
        let raw = r#"{"big_five": {"openness": 1, "conscientiousness": 2, "extraversion": 3, "agreeableness": 4, "neuroticism": 5}}"#;
        let sections = Sections {
            big_five: true,
            mbti: false,
            behavior_tags: false,
        };
        let result = parse_response(raw, sections).unwrap();
        assert!(result.mbti.is_none());
        assert!(result.behavior_tags.is_empty());
    }

    #[test]
    fn rejects_out_of_range_and_wrong_types() {
        let too_high = FULL.replace("\"openness\": 82", "\"openness\": 140");
        assert!(message(parse_response(&too_high, ALL).unwrap_err()).contains("out of range"));

        let fractional = FULL.replace("\"openness\": 82", "\"openness\": 82.5");
        assert!(message(parse_response(&fractional, ALL).unwrap_err()).contains("integer"));

        let stringly = FULL.replace("\"openness\": 82", "\"openness\": \"high\"");
        assert!(message(parse_response(&stringly, ALL).unwrap_err()).contains("number"));

        let confidence = FULL.replace("0.72", "72");
        assert!(message(parse_response(&confidence, ALL).unwrap_err()).contains("confidence"));
    }

    #[test]
    fn rejects_unknown_mbti_code() {
        let raw = FULL.replace("infp", "ABCD");
        assert!(message(parse_response(&raw, ALL).unwrap_err()).contains("unknown MBTI type"));
    }

    #[test]
    fn rejects_non_json() {
        let err = parse_response("I cannot analyze this person.", ALL).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ModelFailure);
    }
}
