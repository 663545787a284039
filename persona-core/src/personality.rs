//! Personality model: Big Five scores and MBTI typing.
//!
//! These are the validated shapes of the model's answer. Anything that reaches
//! a [`PersonalityResult`] has already passed range checks.

use serde::{Deserialize, Serialize};

// ============================================
// Big Five
// ============================================

/// The five Big Five traits, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BigFiveTrait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl BigFiveTrait {
    pub const ALL: [BigFiveTrait; 5] = [
        BigFiveTrait::Openness,
        BigFiveTrait::Conscientiousness,
        BigFiveTrait::Extraversion,
        BigFiveTrait::Agreeableness,
        BigFiveTrait::Neuroticism,
    ];

    /// JSON key used in the model schema.
    pub fn key(&self) -> &'static str {
        match self {
            BigFiveTrait::Openness => "openness",
            BigFiveTrait::Conscientiousness => "conscientiousness",
            BigFiveTrait::Extraversion => "extraversion",
            BigFiveTrait::Agreeableness => "agreeableness",
            BigFiveTrait::Neuroticism => "neuroticism",
        }
    }

    /// Get the display name for this trait.
    pub fn name(&self) -> &'static str {
        match self {
            BigFiveTrait::Openness => "Openness",
            BigFiveTrait::Conscientiousness => "Conscientiousness",
            BigFiveTrait::Extraversion => "Extraversion",
            BigFiveTrait::Agreeableness => "Agreeableness",
            BigFiveTrait::Neuroticism => "Neuroticism",
        }
    }

    /// One-line explanation shown under the bar.
    pub fn description(&self) -> &'static str {
        match self {
            BigFiveTrait::Openness => "Openness to new experiences, creativity, curiosity",
            BigFiveTrait::Conscientiousness => "Organization, reliability, self-discipline",
            BigFiveTrait::Extraversion => "Sociability, energy, initiative",
            BigFiveTrait::Agreeableness => "Cooperation, empathy, friendliness",
            BigFiveTrait::Neuroticism => "Emotional volatility (lower is steadier)",
        }
    }
}

/// Big Five scores, each in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigFiveScores {
    pub openness: u8,
    pub conscientiousness: u8,
    pub extraversion: u8,
    pub agreeableness: u8,
    pub neuroticism: u8,
}

impl BigFiveScores {
    /// Score for one trait.
    pub fn get(&self, t: BigFiveTrait) -> u8 {
        match t {
            BigFiveTrait::Openness => self.openness,
            BigFiveTrait::Conscientiousness => self.conscientiousness,
            BigFiveTrait::Extraversion => self.extraversion,
            BigFiveTrait::Agreeableness => self.agreeableness,
            BigFiveTrait::Neuroticism => self.neuroticism,
        }
    }
}

// ============================================
// MBTI
// ============================================

/// The sixteen MBTI types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MbtiType {
    Intj,
    Intp,
    Entj,
    Entp,
    Infj,
    Infp,
    Enfj,
    Enfp,
    Istj,
    Isfj,
    Estj,
    Esfj,
    Istp,
    Isfp,
    Estp,
    Esfp,
}

impl MbtiType {
    pub const ALL: [MbtiType; 16] = [
        MbtiType::Intj,
        MbtiType::Intp,
        MbtiType::Entj,
        MbtiType::Entp,
        MbtiType::Infj,
        MbtiType::Infp,
        MbtiType::Enfj,
        MbtiType::Enfp,
        MbtiType::Istj,
        MbtiType::Isfj,
        MbtiType::Estj,
        MbtiType::Esfj,
        MbtiType::Istp,
        MbtiType::Isfp,
        MbtiType::Estp,
        MbtiType::Esfp,
    ];

    /// Four-letter code, e.g. "INFP".
    pub fn as_str(&self) -> &'static str {
        match self {
            MbtiType::Intj => "INTJ",
            MbtiType::Intp => "INTP",
            MbtiType::Entj => "ENTJ",
            MbtiType::Entp => "ENTP",
            MbtiType::Infj => "INFJ",
            MbtiType::Infp => "INFP",
            MbtiType::Enfj => "ENFJ",
            MbtiType::Enfp => "ENFP",
            MbtiType::Istj => "ISTJ",
            MbtiType::Isfj => "ISFJ",
            MbtiType::Estj => "ESTJ",
            MbtiType::Esfj => "ESFJ",
            MbtiType::Istp => "ISTP",
            MbtiType::Isfp => "ISFP",
            MbtiType::Estp => "ESTP",
            MbtiType::Esfp => "ESFP",
        }
    }

    /// Get the archetype name for this type.
    pub fn name(&self) -> &'static str {
        match self {
            MbtiType::Intj => "The Architect",
            MbtiType::Intp => "The Logician",
            MbtiType::Entj => "The Commander",
            MbtiType::Entp => "The Debater",
            MbtiType::Infj => "The Advocate",
            MbtiType::Infp => "The Mediator",
            MbtiType::Enfj => "The Protagonist",
            MbtiType::Enfp => "The Campaigner",
            MbtiType::Istj => "The Logistician",
            MbtiType::Isfj => "The Defender",
            MbtiType::Estj => "The Executive",
            MbtiType::Esfj => "The Consul",
            MbtiType::Istp => "The Virtuoso",
            MbtiType::Isfp => "The Adventurer",
            MbtiType::Estp => "The Entrepreneur",
            MbtiType::Esfp => "The Entertainer",
        }
    }

    /// Get the short description for this type.
    pub fn description(&self) -> &'static str {
        match self {
            MbtiType::Intj => "Imaginative and strategic thinker with a plan for everything",
            MbtiType::Intp => "Inventive mind with an unquenchable thirst for knowledge",
            MbtiType::Entj => "Bold, imaginative and strong-willed leader",
            MbtiType::Entp => "Smart and curious thinker who cannot resist an intellectual challenge",
            MbtiType::Infj => "Quiet and mystical, yet very inspiring idealist",
            MbtiType::Infp => "Poetic, kind and altruistic, always eager to help a good cause",
            MbtiType::Enfj => "Charismatic and inspiring leader who captivates listeners",
            MbtiType::Enfp => "Enthusiastic, creative and sociable free spirit",
            MbtiType::Istj => "Practical and fact-minded, reliability cannot be doubted",
            MbtiType::Isfj => "Very dedicated and warm protector, always ready to defend loved ones",
            MbtiType::Estj => "Excellent administrator, unsurpassed at managing things and people",
            MbtiType::Esfj => "Extraordinarily caring, social and popular, always eager to help",
            MbtiType::Istp => "Bold and practical experimenter, master of all kinds of tools",
            MbtiType::Isfp => "Flexible and charming artist, always ready to explore something new",
            MbtiType::Estp => "Smart, energetic and perceptive, truly enjoys living on the edge",
            MbtiType::Esfp => "Spontaneous, energetic and enthusiastic entertainer",
        }
    }
}

impl std::fmt::Display for MbtiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MbtiType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        MbtiType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == code)
            .ok_or_else(|| format!("unknown MBTI type: {}", s))
    }
}

/// One MBTI axis, named by its two poles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbtiAxis {
    EnergySource,
    Perception,
    Judgment,
    Lifestyle,
}

impl MbtiAxis {
    pub const ALL: [MbtiAxis; 4] = [
        MbtiAxis::EnergySource,
        MbtiAxis::Perception,
        MbtiAxis::Judgment,
        MbtiAxis::Lifestyle,
    ];

    /// JSON key used in the model schema.
    pub fn key(&self) -> &'static str {
        match self {
            MbtiAxis::EnergySource => "E-I",
            MbtiAxis::Perception => "S-N",
            MbtiAxis::Judgment => "T-F",
            MbtiAxis::Lifestyle => "J-P",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MbtiAxis::EnergySource => "Energy source",
            MbtiAxis::Perception => "Information processing",
            MbtiAxis::Judgment => "Decision making",
            MbtiAxis::Lifestyle => "Lifestyle",
        }
    }

    /// (first pole, second pole) as (letter, word).
    pub fn poles(&self) -> ((char, &'static str), (char, &'static str)) {
        match self {
            MbtiAxis::EnergySource => (('E', "Extraversion"), ('I', "Introversion")),
            MbtiAxis::Perception => (('S', "Sensing"), ('N', "Intuition")),
            MbtiAxis::Judgment => (('T', "Thinking"), ('F', "Feeling")),
            MbtiAxis::Lifestyle => (('J', "Judging"), ('P', "Perceiving")),
        }
    }
}

/// Per-axis leaning, as the percentage toward the first pole (E, S, T, J).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MbtiAxes {
    #[serde(rename = "E-I")]
    pub energy_source: f64,
    #[serde(rename = "S-N")]
    pub perception: f64,
    #[serde(rename = "T-F")]
    pub judgment: f64,
    #[serde(rename = "J-P")]
    pub lifestyle: f64,
}

impl MbtiAxes {
    pub fn get(&self, axis: MbtiAxis) -> f64 {
        match axis {
            MbtiAxis::EnergySource => self.energy_source,
            MbtiAxis::Perception => self.perception,
            MbtiAxis::Judgment => self.judgment,
            MbtiAxis::Lifestyle => self.lifestyle,
        }
    }

    /// The type these percentages point at (ties go to the second pole).
    pub fn implied_type(&self) -> MbtiType {
        let code: String = MbtiAxis::ALL
            .iter()
            .map(|axis| {
                let ((first, _), (second, _)) = axis.poles();
                if self.get(*axis) > 50.0 {
                    first
                } else {
                    second
                }
            })
            .collect();
        code.parse().unwrap_or(MbtiType::Infp)
    }
}

/// MBTI assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MbtiResult {
    #[serde(rename = "type")]
    pub mbti_type: MbtiType,
    /// Overall confidence in 0.0..=1.0
    pub confidence: f64,
    pub axes: MbtiAxes,
}

// ============================================
// Result
// ============================================

/// Everything the model contributed to one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityResult {
    #[serde(default)]
    pub big_five: Option<BigFiveScores>,
    #[serde(default)]
    pub mbti: Option<MbtiResult>,
    /// Short behavior descriptions from the model
    #[serde(default)]
    pub behavior_tags: Vec<String>,
    /// Model's one-paragraph portrait
    #[serde(default)]
    pub summary: Option<String>,
    /// SHA-256 of the prompt that produced this result
    #[serde(default)]
    pub prompt_hash: Option<String>,
}

impl PersonalityResult {
    /// A result with no model contribution (behavior-only analyses).
    pub fn empty() -> Self {
        Self {
            big_five: None,
            mbti: None,
            behavior_tags: Vec::new(),
            summary: None,
            prompt_hash: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mbti_table_is_complete() {
        for t in MbtiType::ALL {
            let parsed: MbtiType = t.as_str().parse().unwrap();
            assert_eq!(parsed, t);
            assert!(!t.name().is_empty());
            assert!(!t.description().is_empty());
        }
    }

    #[test]
    fn test_mbti_parse_is_case_insensitive() {
        assert_eq!("infp".parse::<MbtiType>().unwrap(), MbtiType::Infp);
        assert!("XXXX".parse::<MbtiType>().is_err());
    }

    #[test]
    fn test_mbti_serde_uses_code() {
        let json = serde_json::to_string(&MbtiType::Enfj).unwrap();
        assert_eq!(json, "\"ENFJ\"");
    }

    #[test]
    fn test_implied_type() {
        let axes = MbtiAxes {
            energy_source: 30.0,
            perception: 20.0,
            judgment: 40.0,
            lifestyle: 35.0,
        };
        assert_eq!(axes.implied_type(), MbtiType::Infp);

        let axes = MbtiAxes {
            energy_source: 80.0,
            perception: 70.0,
            judgment: 60.0,
            lifestyle: 90.0,
        };
        assert_eq!(axes.implied_type(), MbtiType::Estj);
    }

    #[test]
    fn test_big_five_lookup() {
        let scores = BigFiveScores {
            openness: 82,
            conscientiousness: 40,
            extraversion: 55,
            agreeableness: 70,
            neuroticism: 25,
        };
        assert_eq!(scores.get(BigFiveTrait::Openness), 82);
        assert_eq!(scores.get(BigFiveTrait::Neuroticism), 25);
        assert_eq!(BigFiveTrait::ALL.len(), 5);
    }
}
