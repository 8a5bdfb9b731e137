//! Preset sketch catalog.
//!
//! A small set of ready-made input sketches so the service is usable
//! without uploading anything. "llama" and "birds" are real sketch
//! files loaded from the presets directory when present; "house" and
//! "face" are rendered at startup so at least those two always exist.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use serde::Serialize;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// One preset sketch.
pub struct Preset {
    pub id: &'static str,
    pub name: &'static str,
    pub default_prompt: &'static str,
    pub image_bytes: Vec<u8>,
}

/// Listing entry returned by `GET /api/sketches`.
#[derive(Debug, Serialize)]
pub struct PresetInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub default_prompt: &'static str,
}

/// Immutable catalog built once at startup.
pub struct PresetCatalog {
    presets: Vec<Preset>,
}

impl PresetCatalog {
    /// Build the catalog, loading file-based presets from `dir`.
    /// Missing files are skipped with a log line, not an error.
    pub fn load(dir: &Path) -> Self {
        let mut presets = Vec::new();

        for (id, name, default_prompt, filename) in [
            (
                "llama",
                "Llama",
                "a pencil sketch of a llama cartoon abstract logo",
                "llama-sketch.png",
            ),
            (
                "birds",
                "Birds",
                "a colorful illustration of birds perched on branches, vibrant feathers, \
                 detailed nature scene",
                "input-sketch.png",
            ),
        ] {
            let path = dir.join(filename);
            match std::fs::read(&path) {
                Ok(image_bytes) => presets.push(Preset {
                    id,
                    name,
                    default_prompt,
                    image_bytes,
                }),
                Err(_) => {
                    tracing::info!(preset = id, path = %path.display(), "Preset file not found, skipping");
                }
            }
        }

        presets.push(Preset {
            id: "house",
            name: "House",
            default_prompt: "a colorful illustration of a cozy house with a red roof, \
                             green grass, blue sky, warm sunlight",
            image_bytes: render_house(),
        });
        presets.push(Preset {
            id: "face",
            name: "Face",
            default_prompt: "a colorful portrait illustration, warm skin tones, \
                             expressive eyes, soft lighting",
            image_bytes: render_face(),
        });

        Self { presets }
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn list(&self) -> Vec<PresetInfo> {
        self.presets
            .iter()
            .map(|p| PresetInfo {
                id: p.id,
                name: p.name,
                default_prompt: p.default_prompt,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Sketch rendering
// ---------------------------------------------------------------------------

fn blank() -> RgbImage {
    RgbImage::from_pixel(512, 512, WHITE)
}

fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("in-memory PNG encode cannot fail");
    bytes
}

/// Thick line segment between two points.
fn draw_line(img: &mut RgbImage, from: (i32, i32), to: (i32, i32), width: i32) {
    let (x0, y0) = from;
    let (x1, y1) = to;
    let steps = (x1 - x0).abs().max((y1 - y0).abs()).max(1);
    for i in 0..=steps {
        let x = x0 + (x1 - x0) * i / steps;
        let y = y0 + (y1 - y0) * i / steps;
        draw_dot(img, x, y, width);
    }
}

/// Filled square of side `width` centred on (x, y).
fn draw_dot(img: &mut RgbImage, x: i32, y: i32, width: i32) {
    let half = width / 2;
    for dy in -half..=half {
        for dx in -half..=half {
            let (px, py) = (x + dx, y + dy);
            if px >= 0 && py >= 0 && (px as u32) < img.width() && (py as u32) < img.height() {
                img.put_pixel(px as u32, py as u32, BLACK);
            }
        }
    }
}

fn draw_rect(img: &mut RgbImage, x0: i32, y0: i32, x1: i32, y1: i32, width: i32) {
    draw_line(img, (x0, y0), (x1, y0), width);
    draw_line(img, (x1, y0), (x1, y1), width);
    draw_line(img, (x1, y1), (x0, y1), width);
    draw_line(img, (x0, y1), (x0, y0), width);
}

/// Filled disc.
fn draw_disc(img: &mut RgbImage, cx: i32, cy: i32, r: i32) {
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                draw_dot(img, cx + dx, cy + dy, 1);
            }
        }
    }
}

/// Circle outline band of the given stroke width.
fn draw_ring(img: &mut RgbImage, cx: i32, cy: i32, r: i32, stroke: i32) {
    let inner = (r - stroke) * (r - stroke);
    let outer = r * r;
    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = dx * dx + dy * dy;
            if d2 <= outer && d2 >= inner {
                draw_dot(img, cx + dx, cy + dy, 1);
            }
        }
    }
}

fn render_house() -> Vec<u8> {
    let mut img = blank();
    // Body and roof.
    draw_rect(&mut img, 100, 250, 412, 450, 4);
    draw_line(&mut img, (80, 250), (256, 80), 4);
    draw_line(&mut img, (256, 80), (432, 250), 4);
    // Door with knob.
    draw_rect(&mut img, 220, 330, 292, 450, 3);
    draw_disc(&mut img, 276, 391, 6);
    // Windows with cross bars.
    for x in [130, 317] {
        draw_rect(&mut img, x, 290, x + 65, 340, 3);
        draw_line(&mut img, (x + 32, 290), (x + 32, 340), 2);
        draw_line(&mut img, (x, 315), (x + 65, 315), 2);
    }
    encode_png(&img)
}

fn render_face() -> Vec<u8> {
    let mut img = blank();
    // Head.
    draw_ring(&mut img, 256, 256, 176, 4);
    // Eyes.
    draw_disc(&mut img, 190, 195, 20);
    draw_disc(&mut img, 322, 195, 20);
    // Smile: lower arc of a smaller circle.
    let (cx, cy, r, stroke) = (256, 270, 96, 4);
    let inner = (r - stroke) * (r - stroke);
    for dy in r / 3..=r {
        for dx in -r..=r {
            let d2 = dx * dx + dy * dy;
            if d2 <= r * r && d2 >= inner {
                draw_dot(&mut img, cx + dx, cy + dy, 1);
            }
        }
    }
    encode_png(&img)
}
