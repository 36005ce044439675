//! WoE bar charts.
//!
//! With a save path the chart is written as SVG; without one a text chart
//! goes to stdout.

use crate::{
    error::{FeatureError, FeatureResult},
    woe::WoeTable,
};
use plotters::prelude::*;
use std::path::Path;

const CHART_SIZE: (u32, u32) = (800, 500);
const TEXT_BAR_WIDTH: usize = 40;

fn plot_err(e: impl std::fmt::Display) -> FeatureError {
    FeatureError::Plot(e.to_string())
}

/// Plot per-bin WoE for `feature_name`.
pub fn visualize_woe(
    woe: &WoeTable,
    feature_name: &str,
    save_path: Option<&Path>,
) -> FeatureResult<()> {
    match save_path {
        Some(path) => {
            draw_svg(woe, feature_name, path)
                .inspect_err(|e| log::error!("Error in WoE visualization: {e}"))?;
            log::info!("WoE plot saved to {}", path.display());
        }
        None => print!("{}", render_text(woe, feature_name)),
    }
    Ok(())
}

fn draw_svg(woe: &WoeTable, feature_name: &str, path: &Path) -> FeatureResult<()> {
    if woe.bins.is_empty() {
        return Err(FeatureError::Plot(format!("no bins to plot for '{feature_name}'")));
    }
    let labels: Vec<String> = woe.bins.iter().map(|b| b.bin.clone()).collect();
    let lo = woe.bins.iter().map(|b| b.woe).fold(0.0_f64, f64::min);
    let hi = woe.bins.iter().map(|b| b.woe).fold(0.0_f64, f64::max);
    let pad = ((hi - lo) * 0.1).max(0.1);

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Weight of Evidence for {feature_name}"), ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0usize..labels.len()).into_segmented(), (lo - pad)..(hi + pad))
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(format!("{feature_name} Bins"))
        .y_desc("WoE")
        .x_labels(labels.len())
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .axis_desc_style(("sans-serif", 15))
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(woe.bins.iter().enumerate().map(|(i, bin)| {
            let color = if bin.woe >= 0.0 { BLUE } else { RED };
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), bin.woe)],
                color.mix(0.7).filled(),
            );
            bar.set_margin(0, 0, 5, 5);
            bar
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// One line per bin: label, WoE value and a bar scaled to the largest |WoE|.
pub fn render_text(woe: &WoeTable, feature_name: &str) -> String {
    let mut out = format!("Weight of Evidence for {feature_name}\n");
    let width = woe.bins.iter().map(|b| b.bin.len()).max().unwrap_or(0);
    let peak = woe.bins.iter().map(|b| b.woe.abs()).fold(0.0_f64, f64::max);
    for bin in &woe.bins {
        let len = if peak > 0.0 {
            ((bin.woe.abs() / peak) * TEXT_BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let glyph = if bin.woe >= 0.0 { "+" } else { "-" };
        out.push_str(&format!(
            "{:<width$}  {:>9.4}  {}\n",
            bin.bin,
            bin.woe,
            glyph.repeat(len)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::woe::WoeBin;

    fn woe_table() -> WoeTable {
        let bin = |name: &str, woe: f64| WoeBin {
            bin: name.into(),
            count: 1,
            good: 1,
            bad: 0,
            good_dist: 0.5,
            bad_dist: 0.5,
            woe,
        };
        WoeTable {
            feature:    "f".into(),
            target:     "y".into(),
            epsilon:    1e-6,
            total_good: 2,
            total_bad:  2,
            bins:       vec![bin("A", 2.0), bin("B", -1.0)],
        }
    }

    #[test]
    fn text_chart_scales_to_peak() {
        let text = render_text(&woe_table(), "f");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Weight of Evidence for f");
        assert!(lines[1].ends_with(&"+".repeat(TEXT_BAR_WIDTH)));
        assert!(lines[2].ends_with(&"-".repeat(TEXT_BAR_WIDTH / 2)));
    }

    #[test]
    fn svg_written_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("woe.svg");
        visualize_woe(&woe_table(), "f", Some(path.as_path())).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn unwritable_path_is_plot_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("woe.svg");
        assert!(matches!(
            visualize_woe(&woe_table(), "f", Some(path.as_path())),
            Err(FeatureError::Plot(_))
        ));
    }
}
