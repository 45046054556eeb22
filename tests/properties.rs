//! Property tests over the pipeline core

use approx::assert_relative_eq;
use polars::prelude::*;
use proptest::prelude::*;
use readmission_anova::config::SchemaConfig;
use readmission_anova::{
    Condition, HospitalRecord, OverallRating, PipelineConfig, ReadmissionMeasurement,
    ReadmissionPipeline, SchemaNormalizer,
};
use std::collections::BTreeMap;

const RATINGS: [OverallRating; 3] = [OverallRating::Two, OverallRating::Three, OverallRating::Four];
const CONDITIONS: [Condition; 3] = [Condition::Ami, Condition::Hf, Condition::Pn];

fn hospital(i: usize) -> HospitalRecord {
    HospitalRecord {
        id: format!("{:06}", i),
        name: format!("Hospital {}", i),
        state: "OH".to_string(),
        hospital_type: "Acute Care Hospitals".to_string(),
        ownership: None,
        emergency_services: Some(true),
        overall_rating: Some(RATINGS[i % RATINGS.len()]),
        comparisons: BTreeMap::new(),
        coordinates: Some((-82.0 - i as f64 * 0.1, 40.0)),
    }
}

fn measurement(hospital: usize, condition: Condition, ratio: f64) -> ReadmissionMeasurement {
    ReadmissionMeasurement {
        hospital_id: format!("{:06}", hospital),
        condition,
        expected: Some(12.0),
        predicted: Some(ratio * 12.0),
        ratio: Some(ratio),
        discharges: Some(300.0),
        readmissions: None,
    }
}

/// 9 hospitals × 3 conditions with one ratio per row
fn fixture(ratios: &[f64]) -> (Vec<HospitalRecord>, Vec<ReadmissionMeasurement>) {
    let hospitals: Vec<HospitalRecord> = (0..9).map(hospital).collect();
    let measurements = ratios
        .iter()
        .enumerate()
        .map(|(k, ratio)| measurement(k / 3, CONDITIONS[k % 3], *ratio))
        .collect();
    (hospitals, measurements)
}

fn type_iii_f_values(
    pipeline: &ReadmissionPipeline,
    hospitals: &[HospitalRecord],
    measurements: &[ReadmissionMeasurement],
) -> Vec<Option<f64>> {
    let report = pipeline.analyze(hospitals, measurements).unwrap();
    match &report.variance.type_iii {
        Ok(table) => table
            .rows
            .iter()
            .map(|row| row.effect.as_ref().ok().map(|e| e.f_value))
            .collect(),
        Err(_) => Vec::new(),
    }
}

proptest! {
    #[test]
    fn prop_variance_is_row_order_invariant(
        ratios in prop::collection::vec(0.6f64..1.4f64, 27),
        order in Just((0..27usize).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let pipeline = ReadmissionPipeline::new(PipelineConfig::default());
        let (hospitals, measurements) = fixture(&ratios);
        let shuffled: Vec<ReadmissionMeasurement> =
            order.iter().map(|&k| measurements[k].clone()).collect();

        let original = type_iii_f_values(&pipeline, &hospitals, &measurements);
        let permuted = type_iii_f_values(&pipeline, &hospitals, &shuffled);

        prop_assert_eq!(original.len(), permuted.len());
        for (a, b) in original.iter().zip(&permuted) {
            match (a, b) {
                (Some(a), Some(b)) => assert_relative_eq!(*a, *b, epsilon = 1e-10, max_relative = 1e-8),
                (None, None) => {}
                _ => prop_assert!(false, "applicability differs: {:?} vs {:?}", a, b),
            }
        }
    }

    #[test]
    fn prop_posthoc_fractions_in_unit_interval(
        ratios in prop::collection::vec(0.6f64..1.4f64, 27)
    ) {
        let pipeline = ReadmissionPipeline::new(PipelineConfig::default());
        let (hospitals, measurements) = fixture(&ratios);
        let report = pipeline.analyze(&hospitals, &measurements).unwrap();

        if let Ok(outcomes) = &report.posthoc {
            for summary in outcomes.iter().filter_map(|o| o.outcome.as_ref().ok()) {
                prop_assert!(summary.significant <= summary.pairs);
                prop_assert!((0.0..=1.0).contains(&summary.fraction_significant));
            }
        }
    }

    #[test]
    fn prop_mean_ratio_within_reported_range(
        ratios in prop::collection::vec(0.6f64..1.4f64, 27)
    ) {
        let pipeline = ReadmissionPipeline::new(PipelineConfig::default());
        let (hospitals, measurements) = fixture(&ratios);
        let report = pipeline.analyze(&hospitals, &measurements).unwrap();

        for summary in &report.summaries {
            let present: Vec<f64> = summary.ratios.iter().flatten().copied().collect();
            let min = present.iter().copied().fold(f64::INFINITY, f64::min);
            let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(summary.mean_ratio >= min - 1e-12 && summary.mean_ratio <= max + 1e-12);
        }
    }

    #[test]
    fn prop_normalization_is_idempotent(
        cells in prop::collection::vec(
            prop_oneof![
                (0.5f64..1.5f64).prop_map(|r| format!("{:.4}", r)),
                Just("Not Available".to_string()),
                Just("Too Few to Report".to_string()),
            ],
            1..20
        )
    ) {
        let n = cells.len();
        let raw = DataFrame::new(vec![
            Column::new("Facility ID".into(), (0..n).map(|i| format!("{:06}", i)).collect::<Vec<_>>()),
            Column::new("Measure Name".into(), vec!["READM-30-HF-HRRP".to_string(); n]),
            Column::new("Number of Discharges".into(), vec!["120".to_string(); n]),
            Column::new("Excess Readmission Ratio".into(), cells.clone()),
            Column::new("Predicted Readmission Rate".into(), vec!["Not Available".to_string(); n]),
            Column::new("Expected Readmission Rate".into(), vec!["14.2".to_string(); n]),
            Column::new("Number of Readmissions".into(), vec!["17".to_string(); n]),
        ]).unwrap();

        let config = SchemaConfig::default();
        let normalizer = SchemaNormalizer::new(&config);
        let once = normalizer.normalize(&raw, &config.readmissions).unwrap();
        let twice = normalizer.normalize(&once, &config.readmissions).unwrap();

        prop_assert!(once.equals_missing(&twice));
        let ratio = once.column("ratio").unwrap().f64().unwrap();
        for (cell, value) in cells.iter().zip(ratio.into_iter()) {
            prop_assert_eq!(value.is_some(), cell.parse::<f64>().is_ok());
        }
    }
}
