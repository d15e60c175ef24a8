//! Crop Classifier Facade
//!
//! Wraps a loaded classifier and its label decoder behind the two questions
//! the HTTP layer asks: "which crop?" and "which three crops?".

use crate::models::{Classifier, ClassifierArtifact, LabelDecoder, ModelError};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::path::Path;

/// Soil and climate measurements for one field
///
/// Field order matches the classifier's training columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilClimateFeatures {
    #[serde(rename = "N")]
    pub n: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
}

impl SoilClimateFeatures {
    pub fn to_vector(&self) -> [f64; 5] {
        [self.n, self.temperature, self.humidity, self.ph, self.rainfall]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCrop {
    pub name: String,
    pub score: f64,
}

pub type TopCrops = SmallVec<[RankedCrop; 3]>;

pub struct CropClassifier {
    model: Box<dyn Classifier>,
    decoder: LabelDecoder,
}

impl CropClassifier {
    pub fn new(model: Box<dyn Classifier>, decoder: LabelDecoder) -> Self {
        Self { model, decoder }
    }

    pub fn load(model_path: &Path, decoder_path: &Path) -> Result<Self> {
        tracing::info!("Loading crop classifier: {}", model_path.display());
        let model = ClassifierArtifact::load(model_path)?;
        let decoder = LabelDecoder::load(decoder_path)?;

        if model.n_features() != 5 {
            anyhow::bail!(
                "Crop classifier expects {} features, soil/climate input has 5",
                model.n_features()
            );
        }
        tracing::info!(
            "Crop classifier ready: {} classes, probabilities: {}",
            decoder.len(),
            model.as_probabilistic().is_some()
        );

        Ok(Self::new(model, decoder))
    }

    pub fn supports_probabilities(&self) -> bool {
        self.model.as_probabilistic().is_some()
    }

    /// Most likely crop name
    pub fn classify(&self, features: &SoilClimateFeatures) -> Result<String, ModelError> {
        let code = self.model.predict(&features.to_vector())?;
        Ok(self.decoder.inverse_transform(code)?.to_string())
    }

    /// Up to `k` crops ranked by probability
    ///
    /// Models without probabilities yield the single predicted crop with a
    /// score of 1.0. A class the decoder does not know is reported by its
    /// numeric code.
    pub fn top_k(&self, features: &SoilClimateFeatures, k: usize) -> Result<TopCrops, ModelError> {
        let x = features.to_vector();

        let Some(proba_model) = self.model.as_probabilistic() else {
            let label = self.classify(features)?;
            let mut ranked = TopCrops::new();
            ranked.push(RankedCrop { name: label, score: 1.0 });
            return Ok(ranked);
        };

        let proba = proba_model.predict_proba(&x)?;
        let classes = proba_model.classes();

        let mut columns: Vec<usize> = (0..proba.len().min(classes.len())).collect();
        // Stable: equal probabilities keep column order
        columns.sort_by(|&a, &b| proba[b].total_cmp(&proba[a]));

        Ok(columns
            .into_iter()
            .take(k)
            .map(|col| {
                let code = classes[col];
                let name = match self.decoder.inverse_transform(code) {
                    Ok(name) => name.to_string(),
                    Err(e) => {
                        tracing::warn!("Label decoding failed: {}", e);
                        code.to_string()
                    }
                };
                RankedCrop { name, score: proba[col] }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbabilisticClassifier;
    use approx::assert_relative_eq;

    struct FixedProba {
        classes: Vec<usize>,
        proba: Vec<f64>,
    }

    impl Classifier for FixedProba {
        fn n_features(&self) -> usize {
            5
        }

        fn predict(&self, _x: &[f64]) -> Result<usize, ModelError> {
            Ok(self.classes[1])
        }

        fn as_probabilistic(&self) -> Option<&dyn ProbabilisticClassifier> {
            Some(self)
        }
    }

    impl ProbabilisticClassifier for FixedProba {
        fn classes(&self) -> &[usize] {
            &self.classes
        }

        fn predict_proba(&self, _x: &[f64]) -> Result<Vec<f64>, ModelError> {
            Ok(self.proba.clone())
        }
    }

    struct LabelOnly;

    impl Classifier for LabelOnly {
        fn n_features(&self) -> usize {
            5
        }

        fn predict(&self, _x: &[f64]) -> Result<usize, ModelError> {
            Ok(2)
        }
    }

    fn features() -> SoilClimateFeatures {
        SoilClimateFeatures {
            n: 90.0,
            temperature: 25.0,
            humidity: 80.0,
            ph: 6.5,
            rainfall: 200.0,
        }
    }

    fn decoder() -> LabelDecoder {
        LabelDecoder::new(vec!["A".to_string(), "B".to_string(), "C".to_string()])
    }

    #[test]
    fn test_top_k_orders_by_probability() {
        let clf = CropClassifier::new(
            Box::new(FixedProba {
                classes: vec![0, 1, 2],
                proba: vec![0.1, 0.7, 0.2],
            }),
            decoder(),
        );
        let ranked = clf.top_k(&features(), 3).unwrap();
        let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
        assert_relative_eq!(ranked[0].score, 0.7);
        assert_eq!(clf.classify(&features()).unwrap(), "B");
    }

    #[test]
    fn test_top_k_truncates_and_keeps_ties_in_column_order() {
        let clf = CropClassifier::new(
            Box::new(FixedProba {
                classes: vec![0, 1, 2],
                proba: vec![0.4, 0.2, 0.4],
            }),
            decoder(),
        );
        let ranked = clf.top_k(&features(), 2).unwrap();
        let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_label_only_model_falls_back_to_single_entry() {
        let clf = CropClassifier::new(Box::new(LabelOnly), decoder());
        assert!(!clf.supports_probabilities());
        let ranked = clf.top_k(&features(), 3).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0], RankedCrop { name: "C".to_string(), score: 1.0 });
    }

    #[test]
    fn test_unknown_class_code_is_reported_numerically() {
        let clf = CropClassifier::new(
            Box::new(FixedProba {
                classes: vec![0, 9],
                proba: vec![0.3, 0.7],
            }),
            decoder(),
        );
        let ranked = clf.top_k(&features(), 3).unwrap();
        assert_eq!(ranked[0].name, "9");
        assert!(clf.classify(&features()).is_err());
    }

    #[test]
    fn test_fixture_model_recommends_rice() {
        let dir = format!("{}/tests/fixtures", env!("CARGO_MANIFEST_DIR"));
        let clf = CropClassifier::load(
            Path::new(&format!("{}/crop_model.json", dir)),
            Path::new(&format!("{}/label_encoder.json", dir)),
        )
        .unwrap();

        assert_eq!(clf.classify(&features()).unwrap(), "rice");
        let ranked = clf.top_k(&features(), 3).unwrap();
        assert_eq!(ranked[0].name, "rice");
        assert_relative_eq!(ranked[0].score, 0.75);
        assert_eq!(ranked[1].name, "maize");
        assert_relative_eq!(ranked[1].score, 0.25);
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn test_features_use_uppercase_n() {
        let parsed: SoilClimateFeatures = serde_json::from_str(
            r#"{"N": 90, "temperature": 25, "humidity": 80, "ph": 6.5, "rainfall": 200}"#,
        )
        .unwrap();
        assert_eq!(parsed.to_vector(), [90.0, 25.0, 80.0, 6.5, 200.0]);
    }
}
