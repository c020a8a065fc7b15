use crate::error::DiagnosisError;
use serde::{Deserialize, Serialize};

/// `diseaseName` value meaning no disease or pest was found
pub const HEALTHY_SENTINEL: &str = "Healthy";

/// Structured diagnosis returned by the inference service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub disease_name: String,
    pub confidence_score: f64,
    pub analysis: String,
    pub pesticide_recommendations: Vec<Pesticide>,
    pub organic_alternatives: Vec<String>,
}

/// One chemical treatment option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pesticide {
    pub name: String,
    pub dosage: String,
    pub application: String,
}

impl Analysis {
    /// Whether the diagnosis is the healthy sentinel (case-insensitive)
    pub fn is_healthy(&self) -> bool {
        self.disease_name.trim().eq_ignore_ascii_case(HEALTHY_SENTINEL)
    }

    /// Reject replies that parse but carry unusable values
    pub fn validate(&self) -> Result<(), DiagnosisError> {
        if self.disease_name.trim().is_empty() {
            return Err(DiagnosisError::transient("diseaseName is empty"));
        }

        if !self.confidence_score.is_finite() || !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(DiagnosisError::transient(format!(
                "confidenceScore {} outside [0, 1]",
                self.confidence_score
            )));
        }

        for (index, pesticide) in self.pesticide_recommendations.iter().enumerate() {
            let missing = [
                ("name", &pesticide.name),
                ("dosage", &pesticide.dosage),
                ("application", &pesticide.application),
            ]
            .into_iter()
            .find(|(_, value)| value.trim().is_empty());

            if let Some((field, _)) = missing {
                return Err(DiagnosisError::transient(format!(
                    "pesticideRecommendations[{}].{} is empty",
                    index, field
                )));
            }
        }

        Ok(())
    }

    /// Confidence as a whole percentage
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence_score.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blast() -> Analysis {
        Analysis {
            disease_name: "Rice Blast".to_string(),
            confidence_score: 0.87,
            analysis: "Diamond-shaped lesions with grey centres.".to_string(),
            pesticide_recommendations: vec![Pesticide {
                name: "Tricyclazole 75% WP".to_string(),
                dosage: "0.6 g per litre of water".to_string(),
                application: "Foliar spray at tillering".to_string(),
            }],
            organic_alternatives: vec!["Pseudomonas fluorescens spray".to_string()],
        }
    }

    #[test]
    fn test_healthy_sentinel_is_case_insensitive() {
        let mut analysis = blast();
        assert!(!analysis.is_healthy());

        for name in ["Healthy", "healthy", "HEALTHY", " Healthy "] {
            analysis.disease_name = name.to_string();
            assert!(analysis.is_healthy(), "{:?} should be healthy", name);
        }
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(blast().validate().is_ok());
        assert_eq!(blast().confidence_percent(), 87);
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        for score in [-0.1, 1.5, f64::NAN, f64::INFINITY] {
            let mut analysis = blast();
            analysis.confidence_score = score;
            assert!(matches!(
                analysis.validate(),
                Err(DiagnosisError::TransientServiceFailure { .. })
            ));
        }
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut analysis = blast();
        analysis.disease_name = "  ".to_string();
        assert!(analysis.validate().is_err());

        let mut analysis = blast();
        analysis.pesticide_recommendations[0].dosage.clear();
        match analysis.validate() {
            Err(DiagnosisError::TransientServiceFailure { details }) => {
                assert!(details.contains("dosage"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
