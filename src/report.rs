use crate::config::ReportConfig;
use crate::diagnosis::Analysis;
use std::fmt::Write as _;

pub const HEALTHY_BANNER: &str = "Crop is Healthy!";
pub const NO_ORGANIC_MESSAGE: &str = "No organic alternatives suggested.";
pub const NO_PESTICIDE_MESSAGE: &str = "No specific pesticides recommended.";

/// Coarse reading of the confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Moderate,
    Low,
}

impl ConfidenceLevel {
    /// Levels are cut on the rounded percentage: above 75 is high, above 50 moderate
    pub fn from_percent(percent: u32) -> Self {
        if percent > 75 {
            ConfidenceLevel::High
        } else if percent > 50 {
            ConfidenceLevel::Moderate
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Moderate => "moderate",
            ConfidenceLevel::Low => "low",
        }
    }
}

/// Renders an `Analysis` for the terminal
pub struct Report {
    config: ReportConfig,
}

impl Report {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Text report. A healthy result gets the banner and the analysis text
    /// only; anything else gets the full treatment breakdown.
    pub fn render(&self, analysis: &Analysis) -> String {
        let mut out = String::new();

        if analysis.is_healthy() {
            self.render_healthy(&mut out, analysis);
        } else {
            self.render_disease(&mut out, analysis);
        }

        if self.config.show_timestamp {
            let _ = writeln!(
                out,
                "\nGenerated {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );
        }

        out
    }

    /// The analysis as pretty JSON with its wire field names
    pub fn render_json(&self, analysis: &Analysis) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(analysis)
    }

    /// A bar of `meter_width` cells, filled in proportion to the percentage
    pub fn meter(&self, percent: u32) -> String {
        let width = self.config.meter_width;
        let filled = ((percent.min(100) as usize * width) + 50) / 100;
        format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
    }

    fn render_healthy(&self, out: &mut String, analysis: &Analysis) {
        let _ = writeln!(out, "{}", HEALTHY_BANNER);
        let _ = writeln!(out, "{}", analysis.analysis);
    }

    fn render_disease(&self, out: &mut String, analysis: &Analysis) {
        let percent = analysis.confidence_percent();
        let level = ConfidenceLevel::from_percent(percent);

        let _ = writeln!(out, "{}", analysis.disease_name);
        let _ = writeln!(
            out,
            "Confidence Score: {}% {} ({})",
            percent,
            self.meter(percent),
            level.label()
        );

        section(out, "Analysis");
        let _ = writeln!(out, "  {}", analysis.analysis);

        section(out, "Organic Alternatives");
        if analysis.organic_alternatives.is_empty() {
            let _ = writeln!(out, "  {}", NO_ORGANIC_MESSAGE);
        } else {
            for alternative in &analysis.organic_alternatives {
                let _ = writeln!(out, "  - {}", alternative);
            }
        }

        section(out, "Pesticide Recommendations");
        if analysis.pesticide_recommendations.is_empty() {
            let _ = writeln!(out, "  {}", NO_PESTICIDE_MESSAGE);
        } else {
            for (index, pesticide) in analysis.pesticide_recommendations.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", index + 1, pesticide.name);
                let _ = writeln!(out, "     Dosage: {}", pesticide.dosage);
                let _ = writeln!(out, "     Application: {}", pesticide.application);
            }
        }
    }
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}\n{}", title, "-".repeat(title.len()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::Pesticide;

    fn report() -> Report {
        Report::new(ReportConfig {
            meter_width: 20,
            show_timestamp: false,
        })
    }

    fn sheath_blight() -> Analysis {
        Analysis {
            disease_name: "Sheath Blight".to_string(),
            confidence_score: 0.876,
            analysis: "Greenish-grey lesions on the leaf sheath near the waterline.".to_string(),
            pesticide_recommendations: vec![Pesticide {
                name: "Hexaconazole 5% EC".to_string(),
                dosage: "2 ml/L".to_string(),
                application: "Spray on the sheath at early tillering".to_string(),
            }],
            organic_alternatives: vec!["Trichoderma viride seed treatment".to_string()],
        }
    }

    #[test]
    fn test_healthy_report_has_no_treatment_sections() {
        let analysis = Analysis {
            disease_name: "healthy".to_string(),
            confidence_score: 1.0,
            analysis: "No lesions or pests visible.".to_string(),
            // present anyway; must not be shown
            pesticide_recommendations: sheath_blight().pesticide_recommendations,
            organic_alternatives: sheath_blight().organic_alternatives,
        };

        let text = report().render(&analysis);
        assert!(text.starts_with(HEALTHY_BANNER));
        assert!(text.contains("No lesions or pests visible."));
        assert!(!text.contains("Pesticide Recommendations"));
        assert!(!text.contains("Organic Alternatives"));
        assert!(!text.contains("Hexaconazole"));
        assert!(!text.contains("Confidence"));
    }

    #[test]
    fn test_disease_report() {
        let text = report().render(&sheath_blight());

        assert!(text.starts_with("Sheath Blight\n"));
        assert!(text.contains("Confidence Score: 88% [##################--] (high)"));
        assert!(text.contains("Greenish-grey lesions"));
        assert!(text.contains("  - Trichoderma viride seed treatment"));
        assert!(text.contains("  1. Hexaconazole 5% EC"));
        assert!(text.contains("     Dosage: 2 ml/L"));
        assert!(text.contains("     Application: Spray on the sheath at early tillering"));
        assert!(!text.contains(HEALTHY_BANNER));
        assert!(!text.contains("Generated"));
    }

    #[test]
    fn test_empty_treatment_lists() {
        let mut analysis = sheath_blight();
        analysis.pesticide_recommendations.clear();
        analysis.organic_alternatives.clear();

        let text = report().render(&analysis);
        assert!(text.contains(NO_ORGANIC_MESSAGE));
        assert!(text.contains(NO_PESTICIDE_MESSAGE));
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::from_percent(100), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_percent(76), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_percent(75), ConfidenceLevel::Moderate);
        assert_eq!(ConfidenceLevel::from_percent(51), ConfidenceLevel::Moderate);
        assert_eq!(ConfidenceLevel::from_percent(50), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_percent(0), ConfidenceLevel::Low);
    }

    #[test]
    fn test_meter() {
        let report = report();
        assert_eq!(report.meter(0), format!("[{}]", "-".repeat(20)));
        assert_eq!(report.meter(100), format!("[{}]", "#".repeat(20)));
        assert_eq!(report.meter(50), format!("[{}{}]", "#".repeat(10), "-".repeat(10)));
    }

    #[test]
    fn test_timestamp_is_optional() {
        let report = Report::new(ReportConfig {
            meter_width: 10,
            show_timestamp: true,
        });
        assert!(report.render(&sheath_blight()).contains("\nGenerated "));
    }

    #[test]
    fn test_json_uses_wire_names() {
        let json = report().render_json(&sheath_blight()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["diseaseName"], "Sheath Blight");
        assert_eq!(value["pesticideRecommendations"][0]["dosage"], "2 ml/L");
        assert_eq!(value["organicAlternatives"][0], "Trichoderma viride seed treatment");
    }
}
