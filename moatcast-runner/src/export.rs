//! Artifact export: CSV tables, JSON report and manifest, Markdown summary.
//!
//! Files are rendered in memory, written into a staging directory next to
//! their destination, and renamed into place only after every write
//! succeeded. A failed export leaves no new artifacts behind and puts back
//! any files it had already replaced.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use moatcast_core::data::AnomalyReport;
use moatcast_core::domain::{IndicatorForecastTable, PriceForecast};

use crate::baseline::BaselineReport;
use crate::config::{PipelineConfig, RunId};
use crate::pipeline::{PipelineOutput, RowCounts};

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

pub const KPI_FORECAST_FILE: &str = "kpi_forecast.csv";
pub const PRICE_FORECAST_FILE: &str = "price_forecast.csv";
pub const BASELINE_REPORT_FILE: &str = "baseline_report.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const REPORT_FILE: &str = "report.md";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: RunId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub config: PipelineConfig,
    pub counts: RowCounts,
    pub degraded_indicators: Vec<String>,
    pub excluded_indicators: Vec<String>,
    #[serde(default)]
    pub shared_fields: Vec<String>,
    pub anomalies: Vec<AnomalyReport>,
    pub last_realized_price: f64,
    pub files: Vec<String>,
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Wide indicator forecast: `date`, then one column per indicator. Missing
/// values are empty cells.
pub fn export_kpi_csv(forecasts: &IndicatorForecastTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["date".to_string()];
    header.extend(forecasts.indicators.iter().cloned());
    wtr.write_record(&header)?;

    for step in &forecasts.steps {
        let mut record = vec![step.date.to_string()];
        record.extend(
            step.values
                .iter()
                .map(|v| v.map(|v| format!("{v:.6}")).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }

    let bytes = wtr.into_inner().context("failed to flush kpi forecast CSV")?;
    String::from_utf8(bytes).context("kpi forecast CSV is not UTF-8")
}

/// Price forecast table: `date,predicted_price`.
pub fn export_price_csv(forecast: &PriceForecast) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "predicted_price"])?;
    wtr.write_record([
        forecast.date.to_string(),
        format!("{:.6}", forecast.predicted_price),
    ])?;
    let bytes = wtr.into_inner().context("failed to flush price forecast CSV")?;
    String::from_utf8(bytes).context("price forecast CSV is not UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

/// Baseline report as pretty JSON; `null` when the comparison did not run.
pub fn export_baseline_json(report: Option<&BaselineReport>) -> Result<String> {
    serde_json::to_string_pretty(&report).context("failed to serialize baseline report")
}

pub fn build_manifest(output: &PipelineOutput, config: &PipelineConfig) -> RunManifest {
    RunManifest {
        schema_version: SCHEMA_VERSION,
        run_id: output.run_id.clone(),
        created_at: chrono::Utc::now(),
        config: config.clone(),
        counts: output.counts.clone(),
        degraded_indicators: output.indicator_forecasts.degraded.clone(),
        excluded_indicators: output.excluded_indicators.clone(),
        shared_fields: output.shared_fields.clone(),
        anomalies: output.anomalies.clone(),
        last_realized_price: output.last_realized_price,
        files: vec![
            KPI_FORECAST_FILE.into(),
            PRICE_FORECAST_FILE.into(),
            BASELINE_REPORT_FILE.into(),
            MANIFEST_FILE.into(),
            REPORT_FILE.into(),
        ],
    }
}

// ─── Markdown export ────────────────────────────────────────────────

/// Human-readable run summary.
pub fn render_report(output: &PipelineOutput) -> String {
    let forecast = &output.price_forecast;
    let mut report = format!(
        "# MoatCast Forecast Report\n\n\
Run ID: `{}`\n\n\
## Price Forecast\n\
- Date: {}\n\
- Predicted price: {:.2}\n\
- Last realized price: {:.2}\n\
- Change: {:+.2}%\n",
        output.run_id,
        forecast.date,
        forecast.predicted_price,
        output.last_realized_price,
        pct_change(output.last_realized_price, forecast.predicted_price),
    );

    let c = &output.counts;
    report.push_str(&format!(
        "\n## Data\n\
- Fundamentals rows: {} ({} duplicates dropped)\n\
- Market rows: {} ({} duplicates dropped)\n\
- Aligned rows: {}\n\
- Feature rows: {}\n",
        c.fundamentals,
        c.fundamentals_duplicates,
        c.market,
        c.market_duplicates,
        c.aligned,
        c.feature_rows,
    ));

    let kpi = &output.indicator_forecasts;
    report.push_str("\n## Indicator Forecast\n\n");
    report.push_str(&format!("| Date | {} |\n", kpi.indicators.join(" | ")));
    report.push_str(&format!("|------|{}\n", "------|".repeat(kpi.indicators.len())));
    for step in &kpi.steps {
        let cells: Vec<String> = step
            .values
            .iter()
            .map(|v| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}")))
            .collect();
        report.push_str(&format!("| {} | {} |\n", step.date, cells.join(" | ")));
    }
    if !kpi.degraded.is_empty() {
        report.push_str(&format!(
            "\nNot forecast (too few observations): {}\n",
            kpi.degraded.join(", ")
        ));
    }
    if !output.excluded_indicators.is_empty() {
        report.push_str(&format!(
            "\nLeft out of the price model: {}\n",
            output.excluded_indicators.join(", ")
        ));
    }

    report.push_str("\n## Baseline Comparison\n\n");
    match &output.baseline {
        Some(b) => {
            report.push_str(&format!(
                "Split: {} train / {} test rows (seed {})\n\n",
                b.train_rows, b.test_rows, b.seed
            ));
            report.push_str("| Model | MAE | R² |\n");
            report.push_str("|-------|-----|----|\n");
            for s in &b.scores {
                let r2 = s
                    .r_squared
                    .map_or_else(|| "n/a".to_string(), |r| format!("{r:.3}"));
                report.push_str(&format!(
                    "| {} | {:.2} | {} |\n",
                    s.model_name, s.mean_absolute_error, r2
                ));
            }
            report.push_str(&format!(
                "\nSingle-stage reference forecast: {:.2} on {}\n",
                b.reference_forecast.predicted_price, b.reference_forecast.date
            ));
        }
        None => report.push_str("Not run.\n"),
    }

    if !output.anomalies.is_empty() {
        report.push_str("\n## Data Anomalies\n\n");
        for a in &output.anomalies {
            report.push_str(&format!(
                "- {:?} ({:?}): {} rows\n",
                a.anomaly_type, a.severity, a.count
            ));
        }
    }

    report
}

fn pct_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        0.0
    } else {
        (to - from) / from * 100.0
    }
}

// ─── Writing ────────────────────────────────────────────────────────

/// Render and write every artifact into `output_dir`.
///
/// Returns the final paths. On error nothing new is left in `output_dir`.
pub fn write_artifacts(
    output_dir: &Path,
    output: &PipelineOutput,
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>> {
    let manifest = build_manifest(output, config);
    let files: Vec<(&str, String)> = vec![
        (KPI_FORECAST_FILE, export_kpi_csv(&output.indicator_forecasts)?),
        (PRICE_FORECAST_FILE, export_price_csv(&output.price_forecast)?),
        (
            BASELINE_REPORT_FILE,
            export_baseline_json(output.baseline.as_ref())?,
        ),
        (
            MANIFEST_FILE,
            serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?,
        ),
        (REPORT_FILE, render_report(output)),
    ];

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let staging = output_dir.join(format!(".staging-{}", output.run_id));

    let staged = stage_files(&staging, &files);
    let committed = staged.and_then(|paths| commit(&staging, output_dir, &paths));
    // Staging is scratch space either way.
    let _ = fs::remove_dir_all(&staging);

    let written = committed?;
    tracing::info!(dir = %output_dir.display(), files = written.len(), "artifacts written");
    Ok(written)
}

fn stage_files(staging: &Path, files: &[(&str, String)]) -> Result<Vec<String>> {
    fs::create_dir_all(staging)
        .with_context(|| format!("failed to create staging dir {}", staging.display()))?;
    for (name, body) in files {
        let path = staging.join(name);
        fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(files.iter().map(|(name, _)| name.to_string()).collect())
}

/// Move staged files over their destinations. Any file already at a
/// destination is parked in staging as `<name>.prev` and put back if a later
/// move fails.
fn commit(staging: &Path, output_dir: &Path, names: &[String]) -> Result<Vec<PathBuf>> {
    let mut done: Vec<(PathBuf, Option<PathBuf>)> = Vec::with_capacity(names.len());
    for name in names {
        let dest = output_dir.join(name);
        let backup = staging.join(format!("{name}.prev"));
        match swap_in(&staging.join(name), &dest, &backup) {
            Ok(previous) => done.push((dest, previous)),
            Err(e) => {
                rollback(&done);
                return Err(e).with_context(|| format!("failed to move {name} into place"));
            }
        }
    }
    Ok(done.into_iter().map(|(dest, _)| dest).collect())
}

fn swap_in(src: &Path, dest: &Path, backup: &Path) -> std::io::Result<Option<PathBuf>> {
    let previous = if fs::symlink_metadata(dest).is_ok() {
        fs::rename(dest, backup)?;
        Some(backup.to_path_buf())
    } else {
        None
    };
    if let Err(e) = fs::rename(src, dest) {
        if let Some(prev) = &previous {
            let _ = fs::rename(prev, dest);
        }
        return Err(e);
    }
    Ok(previous)
}

fn rollback(done: &[(PathBuf, Option<PathBuf>)]) {
    for (dest, previous) in done.iter().rev() {
        let _ = fs::remove_file(dest);
        if let Some(prev) = previous {
            if let Err(e) = fs::rename(prev, dest) {
                tracing::error!(file = %dest.display(), error = %e, "failed to restore previous artifact");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use moatcast_core::domain::ForecastStep;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn kpi() -> IndicatorForecastTable {
        IndicatorForecastTable {
            indicators: vec!["ROIC (%)".into(), "Free Cash Flow".into()],
            steps: vec![
                ForecastStep {
                    step: 1,
                    date: date("2024-03-30"),
                    values: vec![Some(18.0), None],
                },
                ForecastStep {
                    step: 2,
                    date: date("2024-06-28"),
                    values: vec![Some(19.5), None],
                },
            ],
            degraded: vec!["Free Cash Flow".into()],
        }
    }

    #[test]
    fn test_kpi_csv_layout() {
        let csv = export_kpi_csv(&kpi()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,ROIC (%),Free Cash Flow");
        assert_eq!(lines[1], "2024-03-30,18.000000,");
        assert_eq!(lines[2], "2024-06-28,19.500000,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_price_csv_layout() {
        let csv = export_price_csv(&PriceForecast {
            date: date("2024-03-30"),
            predicted_price: 151.25,
        })
        .unwrap();
        assert_eq!(csv, "date,predicted_price\n2024-03-30,151.250000\n");
    }

    #[test]
    fn test_baseline_json_null_when_skipped() {
        assert_eq!(export_baseline_json(None).unwrap(), "null");
    }

    #[test]
    fn test_pct_change() {
        assert_eq!(pct_change(100.0, 110.0), 10.0);
        assert_eq!(pct_change(0.0, 5.0), 0.0);
    }

    fn staged(dir: &Path, files: &[(&str, &str)]) -> PathBuf {
        let staging = dir.join(".staging-test");
        fs::create_dir_all(&staging).unwrap();
        for (name, body) in files {
            fs::write(staging.join(name), body).unwrap();
        }
        staging
    }

    #[test]
    fn test_commit_replaces_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(KPI_FORECAST_FILE), "old").unwrap();
        let staging = staged(dir.path(), &[(KPI_FORECAST_FILE, "new"), (REPORT_FILE, "report")]);

        let names = vec![KPI_FORECAST_FILE.to_string(), REPORT_FILE.to_string()];
        let written = commit(&staging, dir.path(), &names).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(dir.path().join(KPI_FORECAST_FILE)).unwrap(), "new");
        assert_eq!(fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap(), "report");
    }

    #[test]
    fn test_failed_commit_restores_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(KPI_FORECAST_FILE), "old kpi").unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "old manifest").unwrap();
        // The price table was never staged, so its move fails midway.
        let staging = staged(
            dir.path(),
            &[(KPI_FORECAST_FILE, "new kpi"), (MANIFEST_FILE, "new manifest")],
        );

        let names = vec![
            KPI_FORECAST_FILE.to_string(),
            MANIFEST_FILE.to_string(),
            PRICE_FORECAST_FILE.to_string(),
        ];
        let err = commit(&staging, dir.path(), &names).unwrap_err();

        assert!(err.to_string().contains(PRICE_FORECAST_FILE));
        assert_eq!(
            fs::read_to_string(dir.path().join(KPI_FORECAST_FILE)).unwrap(),
            "old kpi"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap(),
            "old manifest"
        );
        assert!(!dir.path().join(PRICE_FORECAST_FILE).exists());
    }

    #[test]
    fn test_failed_commit_removes_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let staging = staged(dir.path(), &[(KPI_FORECAST_FILE, "new kpi")]);

        let names = vec![KPI_FORECAST_FILE.to_string(), REPORT_FILE.to_string()];
        assert!(commit(&staging, dir.path(), &names).is_err());
        assert!(!dir.path().join(KPI_FORECAST_FILE).exists());
    }
}
