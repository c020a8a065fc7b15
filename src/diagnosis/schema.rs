use serde_json::{json, Value};

/// Instruction sent alongside every image
pub const DIAGNOSIS_PROMPT: &str = "You are an expert agricultural scientist specializing in paddy (rice) crop diseases. \
Analyze the provided image of a paddy crop. Identify any diseases or pests present. \
If the plant appears healthy, state that clearly. \
Provide a concise analysis, suggest specific pesticide recommendations (including dosage and application methods) \
and organic alternatives if a problem is detected. \
Provide a confidence score for your diagnosis. \
Structure your response strictly in the requested JSON format.";

/// Fields every reply object must carry, in declaration order
pub const REQUIRED_FIELDS: [&str; 5] = [
    "diseaseName",
    "confidenceScore",
    "analysis",
    "pesticideRecommendations",
    "organicAlternatives",
];

/// Output schema declared to the service, in its OpenAPI subset
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "diseaseName": {
                "type": "STRING",
                "description": "The common name of the identified disease or pest. If the plant is healthy, return 'Healthy'."
            },
            "confidenceScore": {
                "type": "NUMBER",
                "description": "A confidence score from 0.0 to 1.0 for the diagnosis. If healthy, this should be 1.0."
            },
            "analysis": {
                "type": "STRING",
                "description": "A detailed analysis of the symptoms and causes of the disease. If healthy, provide a brief confirmation."
            },
            "pesticideRecommendations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "dosage": { "type": "STRING" },
                        "application": { "type": "STRING" }
                    },
                    "required": ["name", "dosage", "application"]
                },
                "description": "A list of recommended chemical pesticides. If healthy, return an empty array."
            },
            "organicAlternatives": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "A list of organic or non-chemical treatment alternatives. If healthy, return an empty array."
            }
        },
        "required": REQUIRED_FIELDS,
        "propertyOrdering": REQUIRED_FIELDS
    })
}
