// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! SVG dashboard rendered with `plotters`
//!
//! Layout:
//!
//! ```text
//! ┌──────────────┬──────────────┐
//! │              │ X / Y angle  │
//! │   position   ├──────────────┤
//! │              │ status       │
//! └──────────────┴──────────────┘
//! ```

use std::f64::consts::TAU;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;

use super::{CloseHandle, Frame, RenderSink};

/// Fixed angle range of the X/Y timeline.
const ANGLE_RANGE: f64 = 5.0;
const CIRCLE_POINTS: usize = 51;

/// Writes the dashboard to an SVG file on every update.
pub struct PlotSink {
    path: PathBuf,
    size: (u32, u32),
    max_angle: f64,
    close: CloseHandle,
}

impl PlotSink {
    pub fn new(path: impl Into<PathBuf>, size: (u32, u32), max_angle: f64) -> Self {
        Self {
            path: path.into(),
            size,
            max_angle,
            close: CloseHandle::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle used to close this surface.
    pub fn close_handle(&self) -> CloseHandle {
        self.close.clone()
    }

    /// Render `frame` into an in-memory SVG document.
    pub fn render_to_string(&self, frame: &Frame) -> anyhow::Result<String> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, self.size).into_drawing_area();
            draw_dashboard(&root, frame, self.max_angle)
                .map_err(|e| anyhow!("failed to render dashboard: {e}"))?;
        }
        Ok(svg)
    }
}

impl RenderSink for PlotSink {
    fn update(&mut self, frame: &Frame) -> anyhow::Result<()> {
        let root = SVGBackend::new(&self.path, self.size).into_drawing_area();
        draw_dashboard(&root, frame, self.max_angle)
            .with_context(|| format!("failed to render {}", self.path.display()))?;
        debug!("Dashboard written to {}", self.path.display());
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.close.is_closed()
    }
}

fn draw_dashboard<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    frame: &Frame,
    max_angle: f64,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let (width, height) = root.dim_in_pixel();
    let (position_area, timelines) = root.split_horizontally((width / 2) as i32);
    let (angle_area, status_area) = timelines.split_vertically((height / 2) as i32);

    draw_position(&position_area, frame, max_angle)?;
    draw_angles(&angle_area, frame)?;
    draw_status(&status_area, frame)?;

    root.present()
}

fn draw_position<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
    max_angle: f64,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let lim = max_angle + 0.5;
    let mut chart = ChartBuilder::on(area)
        .caption("Wellhead position", ("sans-serif", 20))
        .margin(10)
        .build_cartesian_2d(-lim..lim, -lim..lim)?;

    let cross = max_angle + 0.2;
    chart.draw_series(LineSeries::new(vec![(0.0, -cross), (0.0, cross)], &BLACK))?;
    chart.draw_series(LineSeries::new(vec![(-cross, 0.0), (cross, 0.0)], &BLACK))?;

    let rings = (max_angle / 0.5).floor() as usize;
    for i in 1..=rings {
        let radius = i as f64 * 0.5;
        let circle = (0..CIRCLE_POINTS).map(|k| {
            let a = TAU * k as f64 / (CIRCLE_POINTS - 1) as f64;
            (radius * a.sin(), radius * a.cos())
        });
        chart.draw_series(LineSeries::new(circle, BLACK.mix(0.3)))?;
        chart.draw_series(std::iter::once(Text::new(
            format!("{:.1}°", radius),
            (0.1, radius - 0.05),
            ("sans-serif", 11).into_font(),
        )))?;
    }

    if let Some(ring) = &frame.polygon {
        chart.draw_series(LineSeries::new(ring.iter().map(|p| (p.x, p.y)), &BLACK))?;
    }

    let trail = frame.xs.iter().copied().zip(frame.ys.iter().copied());
    chart.draw_series(LineSeries::new(trail, &RED))?;

    if let Some(latest) = frame.latest() {
        chart.draw_series(std::iter::once(Circle::new(
            (latest.x, latest.y),
            6,
            RED.filled(),
        )))?;
    }

    Ok(())
}

fn draw_angles<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (start, end) = frame.time_range();
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(start..end, -ANGLE_RANGE..ANGLE_RANGE)?;

    chart
        .configure_mesh()
        .y_desc("Wellhead Angle")
        .draw()?;

    let times = frame.times.iter().copied();
    chart
        .draw_series(LineSeries::new(times.clone().zip(frame.xs.iter().copied()), &BLACK))?
        .label("X")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));
    chart
        .draw_series(LineSeries::new(times.zip(frame.ys.iter().copied()), &RED))?
        .label("Y")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
}

fn draw_status<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (start, end) = frame.time_range();
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(start..end, -0.5..2.5)?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_labels(3)
        .y_label_formatter(&|v: &f64| match v.round() as i64 {
            0 => "OK".to_string(),
            2 => "Not OK".to_string(),
            _ => String::new(),
        })
        .draw()?;

    let codes = frame
        .times
        .iter()
        .copied()
        .zip(frame.statuses.iter().map(|s| s.code() as f64));
    chart.draw_series(LineSeries::new(codes, &BLACK))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryBuffer, HistorySample};
    use crate::safety::{ReferencePolygon, SafetyStatus};
    use crate::signal::Position;

    fn sample_frame() -> Frame {
        let mut history = HistoryBuffer::new();
        for (i, status) in [SafetyStatus::Nominal, SafetyStatus::Fault].into_iter().enumerate() {
            let t = i as f64 * 5.0;
            history.append(HistorySample::new(t, Position::new(t / 5.0, -1.0), status));
        }
        Frame::new(&history, Some(&ReferencePolygon::default_tolerance()), 30.0)
    }

    #[test]
    fn renders_an_svg_document() {
        let sink = PlotSink::new("unused.svg", (800, 400), 3.0);
        let svg = sink.render_to_string(&sample_frame()).unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains("Wellhead position"));
        assert!(svg.contains("polyline"));
    }

    #[test]
    fn update_writes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.svg");
        let mut sink = PlotSink::new(&path, (800, 400), 3.0);

        sink.update(&sample_frame()).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("</svg>"));
    }

    #[test]
    fn close_handle_closes_the_sink() {
        let sink = PlotSink::new("unused.svg", (800, 400), 3.0);
        assert!(!sink.is_closed());
        sink.close_handle().close();
        assert!(sink.is_closed());
    }
}
