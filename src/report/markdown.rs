use crate::analysis::{LabeledOutcome, PosthocOutcome};
use crate::error::StepOutcome;
use crate::model::Condition;
use crate::pipeline::PipelineReport;
use crate::stats::anova::{AnovaTable, FittedModel};
use crate::stats::VarianceTestResult;

const NOT_APPLICABLE: &str = "insufficient data";

/// Markdown formatter for pipeline reports
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    /// Format the whole report as markdown
    pub fn format(report: &PipelineReport) -> String {
        let mut md = String::with_capacity(8192);

        md.push_str("# Hospital Readmission Analysis\n\n");
        md.push_str(&format!(
            "**Hospitals:** {} | **Measurements:** {} | **Alpha:** {}\n\n",
            report.hospitals, report.measurements, report.alpha
        ));
        if !report.warnings.is_empty() {
            md.push_str(&format!(
                "⚠️ {} join integrity warnings (hospitals without measurements or orphan measurements)\n\n",
                report.warnings.len()
            ));
        }

        Self::format_summaries(&mut md, report);
        Self::format_ratio_classes(&mut md, report);
        Self::format_shares(&mut md, report);
        Self::format_distribution(&mut md, report);
        Self::format_variance(&mut md, report);
        Self::format_posthoc(&mut md, &report.posthoc);
        Self::format_geo(&mut md, report);

        md
    }

    fn format_summaries(md: &mut String, report: &PipelineReport) {
        md.push_str("## Hospital Summary\n\n");
        md.push_str("| Hospital | State | Status | Rating |");
        for condition in Condition::ALL {
            md.push_str(&format!(" {} |", condition.code()));
        }
        md.push_str(" Mean |\n");
        md.push_str("|----------|-------|--------|--------|");
        for _ in Condition::ALL {
            md.push_str("------|");
        }
        md.push_str("------|\n");

        for summary in &report.summaries {
            md.push_str(&format!(
                "| {} | {} | {} | {} |",
                summary.name,
                summary.state,
                summary.status.label(),
                summary.overall_rating.map(|r| r.label()).unwrap_or("-")
            ));
            for ratio in &summary.ratios {
                md.push_str(&format!(" {} |", optional_number(*ratio)));
            }
            md.push_str(&format!(" {} |\n", number(summary.mean_ratio)));
        }

        let unreported = report.summaries.iter().filter(|s| !s.has_any_report).count();
        md.push_str(&format!("\n{} hospitals report no readmission ratio.\n\n", unreported));
    }

    fn format_ratio_classes(md: &mut String, report: &PipelineReport) {
        md.push_str("## Readmission Ratio Classes\n\n");
        md.push_str("| Condition | Ratio ≥ 1 | Ratio < 1 |\n");
        md.push_str("|-----------|-----------|-----------|\n");
        for classes in &report.ratio_classes {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                classes.condition.code(),
                classes.at_or_above,
                classes.below
            ));
        }
        md.push('\n');
    }

    fn format_shares(md: &mut String, report: &PipelineReport) {
        md.push_str("## National Comparisons\n\n");
        if report.shares.is_empty() {
            md.push_str(&format!("*{}*\n\n", NOT_APPLICABLE));
            return;
        }
        md.push_str("| Group | Metric | Category | Count | Percent |\n");
        md.push_str("|-------|--------|----------|-------|---------|\n");
        for share in &report.shares {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {:.1}% |\n",
                share.group,
                share.metric.column(),
                share.category.short_label(),
                share.count,
                share.percent
            ));
        }
        md.push('\n');
    }

    fn format_distribution(md: &mut String, report: &PipelineReport) {
        md.push_str("## Ratio Distribution\n\n");
        if report.distribution.is_empty() {
            md.push_str(&format!("*{}*\n\n", NOT_APPLICABLE));
            return;
        }
        md.push_str("| Group | n | Mean | Median | Q1 | Q3 | Min | Max |\n");
        md.push_str("|-------|---|------|--------|----|----|-----|-----|\n");
        for group in &report.distribution {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                group.group,
                group.n,
                number(group.mean),
                number(group.median),
                number(group.q1),
                number(group.q3),
                number(group.min),
                number(group.max)
            ));
        }
        md.push('\n');
    }

    fn format_variance(md: &mut String, report: &PipelineReport) {
        let variance = &report.variance;
        md.push_str("## Variance Analysis\n\n");
        md.push_str(&format!(
            "{} observations ({} rows excluded for a missing rating, condition or ratio)\n\n",
            variance.observations, variance.excluded
        ));

        md.push_str("### Homogeneity of Variance\n\n");
        Self::format_labeled(md, &variance.levene);

        md.push_str("### Additive Model\n\n");
        Self::format_model(md, &variance.additive);

        md.push_str("### Interaction Model\n\n");
        Self::format_model(md, &variance.interaction);

        md.push_str("### Model Comparison\n\n");
        match &variance.comparison {
            Ok(test) => {
                md.push_str(&format!("{}\n\n", test_line(test)));
                let verdict = if test.is_significant(report.alpha) {
                    "The interaction term improves the fit."
                } else {
                    "The additive model is sufficient."
                };
                md.push_str(&format!("{}\n\n", verdict));
            }
            Err(err) => md.push_str(&format!("*{}: {}*\n\n", NOT_APPLICABLE, err)),
        }

        md.push_str("### Residual Normality\n\n");
        Self::format_labeled(md, &variance.normality);

        md.push_str("### Type III Sums of Squares\n\n");
        match &variance.type_iii {
            Ok(table) => Self::format_table(md, table),
            Err(err) => md.push_str(&format!("*{}: {}*\n\n", NOT_APPLICABLE, err)),
        }
    }

    fn format_labeled(md: &mut String, outcomes: &[LabeledOutcome]) {
        for labeled in outcomes {
            match &labeled.outcome {
                Ok(test) => md.push_str(&format!("- **{}**: {}\n", labeled.label, test_line(test))),
                Err(err) => md.push_str(&format!("- **{}**: *{}* ({})\n", labeled.label, NOT_APPLICABLE, err)),
            }
        }
        md.push('\n');
    }

    fn format_model(md: &mut String, model: &StepOutcome<FittedModel>) {
        match model {
            Ok(fit) => Self::format_table(md, &fit.table),
            Err(err) => md.push_str(&format!("*{}: {}*\n\n", NOT_APPLICABLE, err)),
        }
    }

    fn format_table(md: &mut String, table: &AnovaTable) {
        md.push_str("| Term | Df | Sum Sq | Mean Sq | F | p |\n");
        md.push_str("|------|----|--------|---------|---|---|\n");
        for row in &table.rows {
            match &row.effect {
                Ok(effect) => md.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} |\n",
                    row.term,
                    effect.df,
                    number(effect.sum_sq),
                    number(effect.mean_sq),
                    number(effect.f_value),
                    p_value(effect.p_value)
                )),
                Err(_) => md.push_str(&format!("| {} | - | - | - | {} | - |\n", row.term, NOT_APPLICABLE)),
            }
        }
        md.push_str(&format!(
            "| Residuals | {} | {} | {} | | |\n\n",
            table.residual_df,
            number(table.residual_ss),
            number(table.residual_ms())
        ));
    }

    fn format_posthoc(md: &mut String, posthoc: &StepOutcome<Vec<PosthocOutcome>>) {
        md.push_str("## Post-hoc Comparisons (Tukey HSD)\n\n");
        let outcomes = match posthoc {
            Ok(outcomes) => outcomes,
            Err(err) => {
                md.push_str(&format!("*{}: {}*\n\n", NOT_APPLICABLE, err));
                return;
            }
        };

        md.push_str("| Term | Pairs | Significant | Fraction |\n");
        md.push_str("|------|-------|-------------|----------|\n");
        for posthoc in outcomes {
            match &posthoc.outcome {
                Ok(summary) => md.push_str(&format!(
                    "| {} | {} | {} | {:.1}% |\n",
                    summary.term,
                    summary.pairs,
                    summary.significant,
                    summary.fraction_significant * 100.0
                )),
                Err(_) => md.push_str(&format!("| {} | - | - | {} |\n", posthoc.term, NOT_APPLICABLE)),
            }
        }
        md.push('\n');
    }

    fn format_geo(md: &mut String, report: &PipelineReport) {
        md.push_str("## Geo View\n\n");
        match &report.geo {
            Ok(points) => {
                md.push_str(&format!(
                    "{} of {} hospitals have coordinates.\n\n",
                    points.len(),
                    report.summaries.len()
                ));
            }
            Err(err) => md.push_str(&format!("*{}: {}*\n\n", NOT_APPLICABLE, err)),
        }
    }
}

fn test_line(test: &VarianceTestResult) -> String {
    let df = match test.df_den {
        Some(den) => format!("df = ({}, {})", df_format(test.df_num), df_format(den)),
        None => format!("n = {}", df_format(test.df_num)),
    };
    format!(
        "{} statistic = {}, {}, p = {}",
        test.kind.label(),
        number(test.statistic),
        df,
        p_value(test.p_value)
    )
}

fn df_format(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn number(value: f64) -> String {
    if value.is_finite() {
        format!("{:.4}", value)
    } else {
        "-".to_string()
    }
}

fn optional_number(value: Option<f64>) -> String {
    value.map(number).unwrap_or_else(|| "-".to_string())
}

fn p_value(p: f64) -> String {
    if !p.is_finite() {
        "-".to_string()
    } else if p < 1e-4 {
        "< 0.0001".to_string()
    } else {
        format!("{:.4}", p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::join::fixtures::{hospital, measurement};
    use crate::model::{HospitalRecord, OverallRating, ReadmissionMeasurement};
    use crate::pipeline::ReadmissionPipeline;

    const ACUTE: &str = "Acute Care Hospitals";

    #[test]
    fn test_format_markdown_sections() {
        use OverallRating::*;
        let ratings = [Two, Three, Four, Two, Three, Four, Two, Three, Four];
        let hospitals: Vec<HospitalRecord> = ratings
            .iter()
            .enumerate()
            .map(|(i, r)| hospital(&format!("H{}", i), "AL", ACUTE, Some(*r)))
            .collect();
        let measurements: Vec<ReadmissionMeasurement> = (0..ratings.len())
            .flat_map(|i| {
                [Condition::Hf, Condition::Pn].into_iter().map(move |c| {
                    let ratio = 0.9 + 0.015 * ((i * 7 + c.index() * 3) % 11) as f64;
                    measurement(&format!("H{}", i), c, Some(ratio))
                })
            })
            .collect();

        let report = ReadmissionPipeline::new(PipelineConfig::default())
            .analyze(&hospitals, &measurements)
            .unwrap();
        let md = MarkdownFormatter::format(&report);

        assert!(md.starts_with("# Hospital Readmission Analysis"));
        assert!(md.contains("## Hospital Summary"));
        assert!(md.contains("| AMI | COPD | HF | PN | CABG | HIP-KNEE | Mean |"));
        assert!(md.contains("### Type III Sums of Squares"));
        assert!(md.contains("| overall_rating:condition |"));
        assert!(md.contains("## Post-hoc Comparisons (Tukey HSD)"));
    }

    #[test]
    fn test_insufficient_data_marked() {
        let hospitals = vec![hospital("A", "AL", ACUTE, Some(OverallRating::Five))];
        let measurements = vec![measurement("A", Condition::Hf, Some(1.0))];

        let report = ReadmissionPipeline::new(PipelineConfig::default())
            .analyze(&hospitals, &measurements)
            .unwrap();
        let md = MarkdownFormatter::format(&report);

        assert!(md.contains(NOT_APPLICABLE));
        assert!(!md.contains("NaN"));
    }

    #[test]
    fn test_empty_sections_keep_their_headings() {
        let mut unrated = hospital("A", "AL", ACUTE, None);
        unrated.comparisons.clear();
        let measurements = vec![measurement("A", Condition::Hf, Some(1.0))];

        let report = ReadmissionPipeline::new(PipelineConfig::default())
            .analyze(&[unrated], &measurements)
            .unwrap();
        assert!(report.shares.is_empty());
        assert!(report.distribution.is_empty());

        let md = MarkdownFormatter::format(&report);
        let shares_at = md.find("## National Comparisons").unwrap();
        let distribution_at = md.find("## Ratio Distribution").unwrap();
        assert!(md[shares_at..distribution_at].contains(NOT_APPLICABLE));
        assert!(md[distribution_at..].contains(NOT_APPLICABLE));
    }

    #[test]
    fn test_p_value_formatting() {
        assert_eq!(p_value(0.5), "0.5000");
        assert_eq!(p_value(1e-9), "< 0.0001");
        assert_eq!(p_value(f64::NAN), "-");
    }
}
