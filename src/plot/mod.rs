use std::fs;
use std::path::Path;

use plotters::prelude::*;
use plotters::style::colors::colormaps::{Bone, ColorMap, Copper, ViridisRGB};
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::errors::CovError;
use crate::logging::Logger;
use crate::table::CoverageTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    Viridis,
    Bone,
    Copper,
}

impl Colormap {
    fn color_at(&self, h: f32) -> RGBColor {
        match self {
            Colormap::Viridis => ViridisRGB.get_color(h),
            Colormap::Bone => Bone.get_color(h),
            Colormap::Copper => Copper.get_color(h),
        }
    }
}

/// Rendering knobs with the defaults the batch pipeline uses: a 10x8 plot
/// area at 100 px per unit, a perceptually uniform colormap and integer
/// cell annotations.
#[derive(Debug, Clone)]
pub struct HeatmapOptions {
    pub width_px: u32,
    pub height_px: u32,
    pub colormap: Colormap,
    pub title: String,
    pub annotate: bool,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            width_px: 1000,
            height_px: 800,
            colormap: Colormap::Viridis,
            title: "Test Coverage Matrix".to_string(),
            annotate: true,
        }
    }
}

/// Render the table as a color-coded matrix image, overwriting any file
/// already at `output_path`.
pub fn render_heatmap(
    table: &CoverageTable,
    output_path: &Path,
    options: &HeatmapOptions,
    logger: &Logger,
) -> Result<(), CovError> {
    let (nrows, ncols) = table.shape();
    let (min, max) = table
        .value_span()
        .ok_or_else(|| CovError::Render("Cannot render a heatmap of an empty table".to_string()))?;

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let root =
        BitMapBackend::new(output_path, (options.width_px, options.height_px)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(70)
        .y_label_area_size(140)
        // Inverted y range puts the first data row at the top.
        .build_cartesian_2d(0i32..ncols as i32, nrows as i32..0i32)?;

    let (x_pixels, y_pixels) = chart.plotting_area().get_pixel_range();
    let cell_width = (x_pixels.end - x_pixels.start) / ncols as i32;
    let cell_height = (y_pixels.end - y_pixels.start).abs() / nrows as i32;

    let col_labels = table.col_labels().to_vec();
    let row_labels = table.row_labels().to_vec();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(ncols)
        .y_labels(nrows)
        .x_label_offset(cell_width / 2)
        .y_label_offset(cell_height / 2)
        .x_label_formatter(&|x| {
            col_labels
                .get(*x as usize)
                .cloned()
                .unwrap_or_default()
        })
        .y_label_formatter(&|y| {
            row_labels
                .get(*y as usize)
                .cloned()
                .unwrap_or_default()
        })
        .x_desc("Modules")
        .y_desc("Test Cases")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 20))
        .draw()?;

    let span = max - min;
    chart.draw_series((0..nrows).flat_map(|row| {
        (0..ncols).map(move |col| {
            let value = table.cell(row, col);
            let h = if span == 0.0 {
                0.0
            } else {
                ((value - min) / span) as f32
            };
            Rectangle::new(
                [
                    (col as i32, row as i32),
                    (col as i32 + 1, row as i32 + 1),
                ],
                options.colormap.color_at(h).filled(),
            )
        })
    }))?;

    if options.annotate {
        let annotation_style = TextStyle::from(("sans-serif", 16).into_font())
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Center));
        chart.draw_series((0..nrows).flat_map(|row| {
            let annotation_style = annotation_style.clone();
            (0..ncols).map(move |col| {
                let value = table.cell(row, col).round() as i64;
                EmptyElement::at((col as i32, row as i32))
                    + Text::new(
                        format!("{}", value),
                        (cell_width / 2, cell_height / 2),
                        annotation_style.clone(),
                    )
            })
        }))?;
    }

    root.present()?;
    logger.info(&format!(
        "Heatmap saved successfully to {}",
        output_path.display()
    ));
    Ok(())
}
