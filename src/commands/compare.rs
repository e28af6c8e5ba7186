use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::CompareArgs;
use crate::model::SampleSet;
use crate::stats::{describe, student_t_test, DescriptiveStats};
use crate::util::{now_utc_string, write_json_pretty};

#[derive(Debug, Clone, Serialize)]
struct DimensionComparison {
    dimension: String,
    t_statistic: f64,
    p_value: f64,
    a: DescriptiveStats,
    b: DescriptiveStats,
}

#[derive(Debug, Clone, Serialize)]
struct ComparisonReport {
    manifest_version: u32,
    generated_at: String,
    paired: bool,
    strategy_a: String,
    strategy_b: String,
    latency: DimensionComparison,
    accuracy: DimensionComparison,
}

pub fn run(args: CompareArgs) -> Result<()> {
    let sample_a = load_sample_set(&args.samples_a)?;
    let sample_b = load_sample_set(&args.samples_b)?;

    if !args.unpaired {
        check_pairing(&sample_a, &sample_b)?;
    }

    let latency = compare_dimension("latency", &sample_a.latencies, &sample_b.latencies)?;
    let accuracy = compare_dimension("accuracy", &sample_a.accuracies, &sample_b.accuracies)?;

    print_comparison(&sample_a, &sample_b, &latency, &accuracy)?;

    if let Some(plot_path) = &args.plot_path {
        let svg = render_svg(
            &sample_a.strategy_name,
            &sample_b.strategy_name,
            &latency,
            &accuracy,
        );
        fs::write(plot_path, svg)
            .with_context(|| format!("failed to write plot: {}", plot_path.display()))?;
        info!(path = %plot_path.display(), "distribution plot written");
    }

    if let Some(report_path) = &args.report_path {
        let report = ComparisonReport {
            manifest_version: 1,
            generated_at: now_utc_string(),
            paired: !args.unpaired,
            strategy_a: sample_a.strategy_name.clone(),
            strategy_b: sample_b.strategy_name.clone(),
            latency,
            accuracy,
        };
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "comparison report written");
    }

    Ok(())
}

fn load_sample_set(path: &Path) -> Result<SampleSet> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Samples are paired by position (same index = same trial), so a paired
/// reading is only meaningful when both strategies carry the same number of
/// trials per dimension.
fn check_pairing(sample_a: &SampleSet, sample_b: &SampleSet) -> Result<()> {
    if sample_a.latencies.len() != sample_b.latencies.len() {
        bail!(
            "paired comparison requires equal latency sample lengths ({} vs {}); pass --unpaired for independent samples",
            sample_a.latencies.len(),
            sample_b.latencies.len()
        );
    }
    if sample_a.accuracies.len() != sample_b.accuracies.len() {
        bail!(
            "paired comparison requires equal accuracy sample lengths ({} vs {}); pass --unpaired for independent samples",
            sample_a.accuracies.len(),
            sample_b.accuracies.len()
        );
    }
    Ok(())
}

fn compare_dimension(
    dimension: &str,
    values_a: &[f64],
    values_b: &[f64],
) -> Result<DimensionComparison> {
    let test = student_t_test(values_a, values_b)
        .with_context(|| format!("{dimension} samples are not comparable"))?;

    let (Some(stats_a), Some(stats_b)) = (describe(values_a), describe(values_b)) else {
        bail!("{dimension} samples are empty");
    };

    Ok(DimensionComparison {
        dimension: dimension.to_string(),
        t_statistic: test.t_statistic,
        p_value: test.p_value,
        a: stats_a,
        b: stats_b,
    })
}

fn print_comparison(
    sample_a: &SampleSet,
    sample_b: &SampleSet,
    latency: &DimensionComparison,
    accuracy: &DimensionComparison,
) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(
        output,
        "Latency T-test: t={:.2}, p={:.4}",
        latency.t_statistic, latency.p_value
    )?;
    writeln!(
        output,
        "Accuracy T-test: t={:.2}, p={:.4}",
        accuracy.t_statistic, accuracy.p_value
    )?;

    write_summary_table(
        &mut output,
        "Latency Summary",
        &sample_a.strategy_name,
        &sample_b.strategy_name,
        &latency.a,
        &latency.b,
    )?;
    write_summary_table(
        &mut output,
        "Accuracy Summary",
        &sample_a.strategy_name,
        &sample_b.strategy_name,
        &accuracy.a,
        &accuracy.b,
    )?;

    write_box_plots(
        &mut output,
        "Latency distribution",
        &sample_a.strategy_name,
        &sample_b.strategy_name,
        &latency.a,
        &latency.b,
    )?;
    write_box_plots(
        &mut output,
        "Accuracy distribution",
        &sample_a.strategy_name,
        &sample_b.strategy_name,
        &accuracy.a,
        &accuracy.b,
    )?;

    output.flush()?;
    Ok(())
}

fn write_summary_table(
    output: &mut impl Write,
    title: &str,
    name_a: &str,
    name_b: &str,
    stats_a: &DescriptiveStats,
    stats_b: &DescriptiveStats,
) -> io::Result<()> {
    writeln!(output)?;
    writeln!(output, "{title}:")?;
    writeln!(output, "{:>6}  {:>14}  {:>14}", "", name_a, name_b)?;
    writeln!(output, "{:>6}  {:>14}  {:>14}", "count", stats_a.count, stats_b.count)?;
    writeln!(output, "{:>6}  {:>14.6}  {:>14.6}", "mean", stats_a.mean, stats_b.mean)?;
    writeln!(
        output,
        "{:>6}  {:>14}  {:>14}",
        "std",
        format_optional(stats_a.std),
        format_optional(stats_b.std)
    )?;
    writeln!(output, "{:>6}  {:>14.6}  {:>14.6}", "min", stats_a.min, stats_b.min)?;
    writeln!(output, "{:>6}  {:>14.6}  {:>14.6}", "25%", stats_a.q1, stats_b.q1)?;
    writeln!(output, "{:>6}  {:>14.6}  {:>14.6}", "50%", stats_a.median, stats_b.median)?;
    writeln!(output, "{:>6}  {:>14.6}  {:>14.6}", "75%", stats_a.q3, stats_b.q3)?;
    writeln!(output, "{:>6}  {:>14.6}  {:>14.6}", "max", stats_a.max, stats_b.max)?;
    Ok(())
}

fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.6}"),
        None => "-".to_string(),
    }
}

fn write_box_plots(
    output: &mut impl Write,
    title: &str,
    name_a: &str,
    name_b: &str,
    stats_a: &DescriptiveStats,
    stats_b: &DescriptiveStats,
) -> io::Result<()> {
    let low = stats_a.min.min(stats_b.min);
    let high = stats_a.max.max(stats_b.max);

    writeln!(output)?;
    writeln!(output, "{title} [{low:.3} .. {high:.3}]:")?;
    for (name, stats) in [(name_a, stats_a), (name_b, stats_b)] {
        writeln!(output, "{:>14}  {}", name, box_line(stats, low, high, 48))?;
    }
    Ok(())
}

/// Whiskers span min..max, `=` fills the interquartile box, `#` marks the
/// median, all on a scale shared by both strategies.
fn box_line(stats: &DescriptiveStats, low: f64, high: f64, width: usize) -> String {
    let span = high - low;
    let position = |value: f64| -> usize {
        if span <= 0.0 {
            0
        } else {
            (((value - low) / span) * width as f64).round() as usize
        }
    };

    let whisker_low = position(stats.min);
    let whisker_high = position(stats.max);
    let box_low = position(stats.q1);
    let box_high = position(stats.q3);
    let median = position(stats.median);

    let mut cells = vec![' '; width + 1];
    for cell in cells.iter_mut().take(whisker_high + 1).skip(whisker_low) {
        *cell = '-';
    }
    for cell in cells.iter_mut().take(box_high + 1).skip(box_low) {
        *cell = '=';
    }
    cells[whisker_low] = '|';
    cells[whisker_high] = '|';
    cells[median] = '#';

    cells.into_iter().collect()
}

fn render_svg(
    name_a: &str,
    name_b: &str,
    latency: &DimensionComparison,
    accuracy: &DimensionComparison,
) -> String {
    let mut svg = String::new();
    svg.push_str(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="900" height="400" font-family="sans-serif" font-size="13">"#,
    );
    svg.push('\n');
    svg.push_str(&svg_panel(20.0, "Latency distribution", name_a, name_b, latency));
    svg.push_str(&svg_panel(470.0, "Accuracy distribution", name_a, name_b, accuracy));
    svg.push_str("</svg>\n");
    svg
}

fn svg_panel(
    x_offset: f64,
    title: &str,
    name_a: &str,
    name_b: &str,
    comparison: &DimensionComparison,
) -> String {
    const PLOT_TOP: f64 = 50.0;
    const PLOT_HEIGHT: f64 = 280.0;
    const BOX_HALF_WIDTH: f64 = 45.0;

    let low = comparison.a.min.min(comparison.b.min);
    let high = comparison.a.max.max(comparison.b.max);
    let span = if high > low { high - low } else { 1.0 };
    let scale_y = |value: f64| PLOT_TOP + (high - value) / span * PLOT_HEIGHT;

    let mut panel = format!(
        r#"<text x="{:.1}" y="28" font-weight="bold">{} (t={:.2}, p={:.4})</text>"#,
        x_offset + 40.0,
        title,
        comparison.t_statistic,
        comparison.p_value
    );
    panel.push('\n');

    let groups = [
        (name_a, &comparison.a, "#4c72b0"),
        (name_b, &comparison.b, "#dd8452"),
    ];
    for (index, (name, stats, fill)) in groups.into_iter().enumerate() {
        let center_x = x_offset + 130.0 + index as f64 * 170.0;
        let y_min = scale_y(stats.min);
        let y_max = scale_y(stats.max);
        let y_q1 = scale_y(stats.q1);
        let y_q3 = scale_y(stats.q3);
        let y_median = scale_y(stats.median);

        panel.push_str(&format!(
            r#"<line x1="{center_x:.1}" y1="{y_max:.1}" x2="{center_x:.1}" y2="{y_min:.1}" stroke="black"/>"#
        ));
        panel.push('\n');
        for y_cap in [y_min, y_max] {
            panel.push_str(&format!(
                r#"<line x1="{:.1}" y1="{y_cap:.1}" x2="{:.1}" y2="{y_cap:.1}" stroke="black"/>"#,
                center_x - BOX_HALF_WIDTH / 2.0,
                center_x + BOX_HALF_WIDTH / 2.0
            ));
            panel.push('\n');
        }
        panel.push_str(&format!(
            r#"<rect x="{:.1}" y="{y_q3:.1}" width="{:.1}" height="{:.1}" fill="{fill}" stroke="black"/>"#,
            center_x - BOX_HALF_WIDTH,
            BOX_HALF_WIDTH * 2.0,
            (y_q1 - y_q3).max(1.0)
        ));
        panel.push('\n');
        panel.push_str(&format!(
            r#"<line x1="{:.1}" y1="{y_median:.1}" x2="{:.1}" y2="{y_median:.1}" stroke="black" stroke-width="2"/>"#,
            center_x - BOX_HALF_WIDTH,
            center_x + BOX_HALF_WIDTH
        ));
        panel.push('\n');
        panel.push_str(&format!(
            r#"<text x="{center_x:.1}" y="{:.1}" text-anchor="middle">{name}</text>"#,
            PLOT_TOP + PLOT_HEIGHT + 30.0
        ));
        panel.push('\n');
    }

    panel
}
