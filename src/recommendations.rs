use crate::models::{CropRecommendation, CurrentConditions, Suitability};

const WARM_ABOVE_C: f64 = 25.0;
const MILD_ABOVE_C: f64 = 15.0;
const HUMID_ABOVE_PCT: u8 = 70;
const DRY_BELOW_PCT: u8 = 40;

fn recommend(crop: &str, suitability: Suitability, reason: &str) -> CropRecommendation {
    CropRecommendation {
        crop_name: crop.to_string(),
        suitability,
        reason: reason.to_string(),
    }
}

/// Derive crop suggestions from current conditions.
///
/// The temperature tier always contributes exactly two entries, the humidity
/// tier zero or one, in that order. Output is neither sorted nor deduplicated.
pub fn evaluate(conditions: &CurrentConditions) -> Vec<CropRecommendation> {
    let mut recommendations = Vec::with_capacity(3);
    let temperature = conditions.temperature_c;

    if temperature > WARM_ABOVE_C {
        recommendations.push(recommend(
            "Tomatoes",
            Suitability::High,
            "Warm temperatures are ideal for tomato growth",
        ));
        recommendations.push(recommend(
            "Peppers",
            Suitability::High,
            "Thrives in warm weather conditions",
        ));
    } else if temperature > MILD_ABOVE_C {
        recommendations.push(recommend(
            "Lettuce",
            Suitability::High,
            "Moderate temperatures are perfect for leafy greens",
        ));
        recommendations.push(recommend(
            "Spinach",
            Suitability::High,
            "Grows well in mild temperatures",
        ));
    } else {
        recommendations.push(recommend(
            "Kale",
            Suitability::High,
            "Cold-tolerant crop that can withstand lower temperatures",
        ));
        recommendations.push(recommend(
            "Carrots",
            Suitability::Medium,
            "Can grow in cooler conditions but prefers moderate temperatures",
        ));
    }

    let humidity = conditions.humidity_pct;
    if humidity > HUMID_ABOVE_PCT {
        recommendations.push(recommend(
            "Rice",
            Suitability::High,
            "High humidity levels are ideal for rice cultivation",
        ));
    } else if humidity < DRY_BELOW_PCT {
        recommendations.push(recommend(
            "Wheat",
            Suitability::High,
            "Tolerates drier conditions well",
        ));
    }

    recommendations
}
