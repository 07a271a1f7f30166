//! PNG figures: count histograms, state city plots and circuit layouts.
//!
//! Text is drawn with a small built-in pixel font, so the figures need no
//! font files on the host.

use std::path::Path;

use num_complex::Complex64;
use plotters::prelude::*;
use qisjob_hal::Counts;
use tracing::info;

use crate::error::{QisJobError, QisJobResult};

const BAR: RGBColor = RGBColor(0x64, 0x8f, 0xff);
const BAR_TOP: RGBColor = RGBColor(0xa8, 0xc0, 0xff);
const NEGATIVE: RGBColor = RGBColor(0xdc, 0x26, 0x7f);
const NEGATIVE_TOP: RGBColor = RGBColor(0xef, 0x8f, 0xbd);
const GRID: RGBColor = RGBColor(0xc8, 0xc8, 0xc8);

/// 3x5 glyphs, one row per byte, high bit on the left.
const GLYPHS: &[(char, [u8; 5])] = &[
    ('0', [0b111, 0b101, 0b101, 0b101, 0b111]),
    ('1', [0b010, 0b110, 0b010, 0b010, 0b111]),
    ('2', [0b111, 0b001, 0b111, 0b100, 0b111]),
    ('3', [0b111, 0b001, 0b111, 0b001, 0b111]),
    ('4', [0b101, 0b101, 0b111, 0b001, 0b001]),
    ('5', [0b111, 0b100, 0b111, 0b001, 0b111]),
    ('6', [0b111, 0b100, 0b111, 0b101, 0b111]),
    ('7', [0b111, 0b001, 0b010, 0b010, 0b010]),
    ('8', [0b111, 0b101, 0b111, 0b101, 0b111]),
    ('9', [0b111, 0b101, 0b111, 0b001, 0b111]),
    ('.', [0b000, 0b000, 0b000, 0b000, 0b010]),
    ('-', [0b000, 0b000, 0b111, 0b000, 0b000]),
];

type Area<'a> = DrawingArea<BitMapBackend<'a>, plotters::coord::Shift>;

fn draw_err(path: &Path, e: impl std::fmt::Display) -> QisJobError {
    QisJobError::runtime(format!("Cannot draw {}: {e}", path.display()))
}

/// Draw `text` with its top-left corner at `(x, y)`, `scale` pixels per dot.
fn draw_text(area: &Area<'_>, path: &Path, text: &str, (x, y): (i32, i32), scale: i32) -> QisJobResult<()> {
    let mut cx = x;
    for ch in text.chars() {
        if let Some((_, rows)) = GLYPHS.iter().find(|(g, _)| *g == ch) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..3 {
                    if bits & (0b100 >> col) != 0 {
                        let px = cx + col * scale;
                        let py = y + row as i32 * scale;
                        area.draw(&Rectangle::new(
                            [(px, py), (px + scale, py + scale)],
                            BLACK.filled(),
                        ))
                        .map_err(|e| draw_err(path, e))?;
                    }
                }
            }
        }
        cx += 4 * scale;
    }
    Ok(())
}

fn text_width(text: &str, scale: i32) -> i32 {
    text.chars().count() as i32 * 4 * scale
}

/// Bar chart of outcome probabilities, one bar per label in label order.
pub fn histogram(path: &Path, counts: &Counts) -> QisJobResult<()> {
    let total = counts.total_shots().max(1) as f64;
    let bars = counts.len().max(1) as i32;
    let label_len = counts.iter().map(|(l, _)| l.len()).max().unwrap_or(1) as i32;
    let slot = (text_width("0.000", 2) + 8).max(label_len * 8 + 8);
    let (width, height) = ((bars * slot + 80).max(320), 420);
    let (left, bottom, top) = (40, height - 30 - label_len * 8, 40);

    let area = BitMapBackend::new(path, (width as u32, height as u32)).into_drawing_area();
    area.fill(&WHITE).map_err(|e| draw_err(path, e))?;
    area.draw(&PathElement::new(
        vec![(left, top), (left, bottom), (width - 20, bottom)],
        BLACK.stroke_width(1),
    ))
    .map_err(|e| draw_err(path, e))?;

    for (i, (label, count)) in counts.iter().enumerate() {
        let p = count as f64 / total;
        let x0 = left + 8 + i as i32 * slot;
        let x1 = x0 + slot - 8;
        let y = bottom - (p * f64::from(bottom - top)).round() as i32;
        area.draw(&Rectangle::new([(x0, y), (x1, bottom)], BAR.filled()))
            .map_err(|e| draw_err(path, e))?;
        draw_text(&area, path, &format!("{p:.3}"), (x0, y - 14), 2)?;

        // labels run top to bottom below the axis
        for (row, ch) in label.chars().filter(|c| *c != ' ').enumerate() {
            draw_text(&area, path, &ch.to_string(), (x0 + (slot - 8) / 2 - 3, bottom + 6 + row as i32 * 8), 1)?;
        }
    }
    area.present().map_err(|e| draw_err(path, e))?;
    info!(path = %path.display(), "wrote histogram");
    Ok(())
}

/// Density matrix `|psi><psi|`, entries rounded to `decimals` places.
pub fn density_matrix(statevector: &[Complex64], decimals: u32) -> Vec<Vec<Complex64>> {
    let scale = 10f64.powi(decimals.min(15) as i32);
    let round = |v: f64| (v * scale).round() / scale;
    statevector
        .iter()
        .map(|a| {
            statevector
                .iter()
                .map(|b| {
                    let z = a * b.conj();
                    Complex64::new(round(z.re), round(z.im))
                })
                .collect()
        })
        .collect()
}

/// Two "cities" side by side: real and imaginary parts of the density
/// matrix, one bar per entry.
pub fn state_city(path: &Path, statevector: &[Complex64], decimals: u32) -> QisJobResult<()> {
    let rho = density_matrix(statevector, decimals);
    let n = rho.len().max(1) as i32;
    let cell = (240 / n).clamp(4, 40);
    let depth = cell / 2;
    let panel = n * cell + n * depth + 60;
    let height = 2 * n * cell + n * depth + 100;
    let area = BitMapBackend::new(path, ((2 * panel) as u32, height as u32)).into_drawing_area();
    area.fill(&WHITE).map_err(|e| draw_err(path, e))?;

    let max_height = f64::from(n * cell);
    let parts: [fn(&Complex64) -> f64; 2] = [|z| z.re, |z| z.im];
    for (p, part) in parts.iter().enumerate() {
        let ox = p as i32 * panel + 30;
        let base = height / 2 + n * depth / 2;
        // back rows first so nearer bars cover farther ones
        for i in (0..rho.len()).rev() {
            for (j, z) in rho[i].iter().enumerate() {
                let x0 = ox + j as i32 * cell + i as i32 * depth;
                let y0 = base - i as i32 * depth;
                area.draw(&PathElement::new(
                    vec![(x0, y0), (x0 + cell, y0)],
                    GRID.stroke_width(1),
                ))
                .map_err(|e| draw_err(path, e))?;

                let v = part(z);
                if v == 0.0 {
                    continue;
                }
                let h = (v.abs() * max_height).round().max(1.0) as i32;
                let (face, roof) = if v > 0.0 { (BAR, BAR_TOP) } else { (NEGATIVE, NEGATIVE_TOP) };
                let (top, bottom) = if v > 0.0 { (y0 - h, y0) } else { (y0, y0 + h) };
                area.draw(&Rectangle::new([(x0, top), (x0 + cell - 1, bottom)], face.filled()))
                    .map_err(|e| draw_err(path, e))?;
                area.draw(&Polygon::new(
                    vec![
                        (x0, top),
                        (x0 + cell - 1, top),
                        (x0 + cell - 1 + depth / 2, top - depth / 2),
                        (x0 + depth / 2, top - depth / 2),
                    ],
                    roof.filled(),
                ))
                .map_err(|e| draw_err(path, e))?;
            }
        }
    }
    area.present().map_err(|e| draw_err(path, e))?;
    info!(path = %path.display(), "wrote state city");
    Ok(())
}

/// The coupling map with the qubits a layout uses filled in and numbered by
/// their virtual index.
///
/// `layout` pairs virtual with physical qubits.
pub fn circuit_layout(
    path: &Path,
    num_qubits: u32,
    edges: &[(u32, u32)],
    layout: &[(u32, u32)],
) -> QisJobResult<()> {
    let size = 480;
    let center = f64::from(size) / 2.0;
    let radius = center - 40.0;
    let n = num_qubits.max(1);
    let position = |q: u32| {
        let angle = std::f64::consts::TAU * f64::from(q) / f64::from(n) - std::f64::consts::FRAC_PI_2;
        (
            (center + radius * angle.cos()).round() as i32,
            (center + radius * angle.sin()).round() as i32,
        )
    };

    let area = BitMapBackend::new(path, (size as u32, size as u32)).into_drawing_area();
    area.fill(&WHITE).map_err(|e| draw_err(path, e))?;
    for &(a, b) in edges {
        area.draw(&PathElement::new(
            vec![position(a), position(b)],
            GRID.stroke_width(3),
        ))
        .map_err(|e| draw_err(path, e))?;
    }
    for q in 0..num_qubits {
        let used = layout.iter().find(|(_, physical)| *physical == q);
        let color = if used.is_some() { BAR } else { GRID };
        area.draw(&Circle::new(position(q), 14, color.filled()))
            .map_err(|e| draw_err(path, e))?;
        if let Some((virt, _)) = used {
            let text = virt.to_string();
            let (x, y) = position(q);
            draw_text(&area, path, &text, (x - text_width(&text, 2) / 2 + 1, y - 5), 2)?;
        }
    }
    area.present().map_err(|e| draw_err(path, e))?;
    info!(path = %path.display(), "wrote circuit layout");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_1_SQRT_2;

    use super::*;

    fn is_png(path: &Path) -> bool {
        std::fs::read(path).is_ok_and(|bytes| bytes.starts_with(b"\x89PNG"))
    }

    #[test]
    fn test_density_matrix_rounding() {
        let bell = [
            Complex64::new(FRAC_1_SQRT_2, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(FRAC_1_SQRT_2, 0.0),
        ];
        let rho = density_matrix(&bell, 3);
        assert_eq!(rho.len(), 4);
        assert_eq!(rho[0][0], Complex64::new(0.5, 0.0));
        assert_eq!(rho[0][3], Complex64::new(0.5, 0.0));
        assert_eq!(rho[1][1], Complex64::new(0.0, 0.0));

        let rho = density_matrix(&[Complex64::new(0.123_456, 0.0)], 2);
        assert_eq!(rho[0][0].re, 0.02);
    }

    #[test]
    fn test_histogram_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.histogram.png");
        let counts: Counts = [("00".to_string(), 509), ("11".to_string(), 515)]
            .into_iter()
            .collect();
        histogram(&path, &counts).unwrap();
        assert!(is_png(&path));
    }

    #[test]
    fn test_state_city_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.state_city.png");
        let plus_i = [
            Complex64::new(FRAC_1_SQRT_2, 0.0),
            Complex64::new(0.0, FRAC_1_SQRT_2),
        ];
        state_city(&path, &plus_i, 3).unwrap();
        assert!(is_png(&path));
    }

    #[test]
    fn test_layout_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("l.plot_circuit.png");
        circuit_layout(&path, 5, &[(0, 1), (1, 0), (1, 2), (2, 1)], &[(0, 1), (1, 2)]).unwrap();
        assert!(is_png(&path));
    }
}
