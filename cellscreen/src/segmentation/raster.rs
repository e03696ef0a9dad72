//! Rasterization of contours onto 0/1 canvases.

use image_lib::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut, BresenhamLineIter};

use super::contour::Contour;

const ON: Luma<u8> = Luma([1]);

/// Draws each closed contour as a band centered on the boundary.
///
/// Disks of radius `thickness / 2` are stamped along the boundary, so an
/// even `thickness` gives a band of `thickness + 1` pixels.
pub fn draw_outlines(canvas: &mut GrayImage, contours: &[Contour], thickness: u32) {
    let radius = (thickness / 2) as i32;
    for contour in contours {
        for (x, y) in outline_pixels(contour) {
            stamp(canvas, x, y, radius);
        }
    }
}

/// Fills each closed contour, boundary included.
pub fn draw_filled(canvas: &mut GrayImage, contours: &[Contour]) {
    for contour in contours {
        if contour.points.len() < 3 {
            for (x, y) in outline_pixels(contour) {
                stamp(canvas, x, y, 0);
            }
        } else {
            draw_polygon_mut(canvas, &contour.points, ON);
        }
    }
}

fn outline_pixels(contour: &Contour) -> Vec<(i32, i32)> {
    let points = &contour.points;
    match points.len() {
        0 => Vec::new(),
        1 => vec![(points[0].x, points[0].y)],
        n => (0..n)
            .flat_map(|i| {
                let a = points[i];
                let b = points[(i + 1) % n];
                BresenhamLineIter::new((a.x as f32, a.y as f32), (b.x as f32, b.y as f32))
            })
            .collect(),
    }
}

fn stamp(canvas: &mut GrayImage, x: i32, y: i32, radius: i32) {
    if radius == 0 {
        let (w, h) = canvas.dimensions();
        if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
            canvas.put_pixel(x as u32, y as u32, ON);
        }
    } else {
        draw_filled_circle_mut(canvas, (x, y), radius, ON);
    }
}
