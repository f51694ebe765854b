//! The static guide image: loading, resizing and compositing.
//!
//! The asset is looked up next to the executable and then in the working
//! directory. Without it the guide circle is drawn in memory at the asset's
//! native size, so scaling behaves the same either way.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::geometry::{ImageSize, OverlayPlacement};
use crate::model::constants::*;

/// Places an asset at `relative` is looked for, in order.
pub fn asset_candidates(relative: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(2);
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join(relative));
    }
    candidates.push(PathBuf::from(relative));
    candidates
}

/// Load the first readable asset, or generate the guide.
pub fn load_guide_image() -> RgbaImage {
    for path in asset_candidates(OVERLAY_ASSET_PATH) {
        if !path.is_file() {
            continue;
        }
        match image::open(&path) {
            Ok(img) => {
                log::info!("Overlay asset loaded from {}", path.display());
                return img.to_rgba8();
            }
            Err(e) => log::warn!("Failed to load overlay asset {}: {e}", path.display()),
        }
    }
    log::info!("Overlay asset not found, generating guide circle");
    generate_guide()
}

/// Transparent image at native size with the anti-aliased guide ring.
pub fn generate_guide() -> RgbaImage {
    let width = SOURCE_IMAGE_WIDTH as u32;
    let height = SOURCE_IMAGE_HEIGHT as u32;
    let mut img = RgbaImage::new(width, height);
    draw_ring(
        &mut img,
        GUIDE_CENTER,
        GUIDE_RADIUS,
        GUIDE_THICKNESS,
        GUIDE_COLOR,
    );
    img
}

/// Stroke a circle of `radius` centered at `center` into `img`.
fn draw_ring(img: &mut RgbaImage, center: (f64, f64), radius: f64, thickness: f64, color: [u8; 4]) {
    let half = thickness / 2.0;
    let reach = radius + half + 1.0;
    let (cx, cy) = center;

    let x0 = (cx - reach).floor().max(0.0) as u32;
    let y0 = (cy - reach).floor().max(0.0) as u32;
    let x1 = ((cx + reach).ceil() as u32).min(img.width());
    let y1 = ((cy + reach).ceil() as u32).min(img.height());

    for y in y0..y1 {
        for x in x0..x1 {
            // Sample at the pixel center
            let dx = f64::from(x) + 0.5 - cx;
            let dy = f64::from(y) + 0.5 - cy;
            let edge = (dx.hypot(dy) - radius).abs();
            let coverage = (half + 0.5 - edge).clamp(0.0, 1.0);
            if coverage > 0.0 {
                let alpha = (f64::from(color[3]) * coverage).round() as u8;
                img.put_pixel(x, y, Rgba([color[0], color[1], color[2], alpha]));
            }
        }
    }
}

/// The guide image plus its last resized copy.
#[derive(Debug, Clone)]
pub struct OverlayImage {
    source: RgbaImage,
    cached: Option<VisiblePart>,
}

/// A resized piece of the guide and its top-left position in the frame.
#[derive(Debug, Clone)]
struct VisiblePart {
    key: (OverlayPlacement, ImageSize),
    x: i32,
    y: i32,
    image: RgbaImage,
}

impl OverlayImage {
    pub fn new(source: RgbaImage) -> Self {
        Self {
            source,
            cached: None,
        }
    }

    /// Load the asset (or generate it).
    pub fn load() -> Self {
        Self::new(load_guide_image())
    }

    pub fn native_size(&self) -> ImageSize {
        ImageSize::new(self.source.width(), self.source.height())
    }

    /// The on-screen part of the image at `placement`, resized with Lanczos3.
    ///
    /// Only source pixels that land inside `frame` are resized, so large
    /// scales cost no more than a frame's worth of pixels. Returns the image
    /// and where to blit it. Resizing only happens when the placement or the
    /// frame changed since the last call.
    pub fn visible(
        &mut self,
        placement: OverlayPlacement,
        frame: ImageSize,
    ) -> Option<(&RgbaImage, i32, i32)> {
        let key = (placement, frame);
        if !self.cached.as_ref().is_some_and(|part| part.key == key) {
            self.cached = self.resize_visible(placement, frame).map(|(x, y, image)| VisiblePart {
                key,
                x,
                y,
                image,
            });
        }
        self.cached.as_ref().map(|part| (&part.image, part.x, part.y))
    }

    fn resize_visible(
        &self,
        placement: OverlayPlacement,
        frame: ImageSize,
    ) -> Option<(i32, i32, RgbaImage)> {
        let (src_w, src_h) = self.source.dimensions();
        if placement.width == 0 || placement.height == 0 || src_w == 0 || src_h == 0 {
            return None;
        }

        let (dx0, dx1) = visible_span(placement.x, placement.width, frame.width)?;
        let (dy0, dy1) = visible_span(placement.y, placement.height, frame.height)?;
        let (sx0, sx1) = source_span(dx0, dx1, placement.width, src_w);
        let (sy0, sy1) = source_span(dy0, dy1, placement.height, src_h);

        // Snap to the destination edges of whole source pixels
        let (ox0, ox1) = (
            scale_edge(sx0, src_w, placement.width),
            scale_edge(sx1, src_w, placement.width),
        );
        let (oy0, oy1) = (
            scale_edge(sy0, src_h, placement.height),
            scale_edge(sy1, src_h, placement.height),
        );
        let (width, height) = (ox1 - ox0, oy1 - oy0);
        if width == 0 || height == 0 {
            return None;
        }

        log::debug!(
            "Resizing overlay source {}x{} at ({sx0}, {sy0}) to {width}x{height}",
            sx1 - sx0,
            sy1 - sy0
        );
        let image = if (sx0, sy0, sx1, sy1) == (0, 0, src_w, src_h) {
            imageops::resize(&self.source, width, height, FilterType::Lanczos3)
        } else {
            let crop = imageops::crop_imm(&self.source, sx0, sy0, sx1 - sx0, sy1 - sy0).to_image();
            imageops::resize(&crop, width, height, FilterType::Lanczos3)
        };
        Some((
            placement.x + ox0 as i32,
            placement.y + oy0 as i32,
            image,
        ))
    }
}

/// Part of `[origin, origin + len)` inside `[0, frame)`, relative to `origin`.
fn visible_span(origin: i32, len: u32, frame: u32) -> Option<(u32, u32)> {
    let start = (-i64::from(origin)).max(0);
    let end = i64::from(len).min(i64::from(frame) - i64::from(origin));
    (start < end).then(|| (start as u32, end as u32))
}

/// Source pixels covering destination span `[d0, d1)`.
fn source_span(d0: u32, d1: u32, dst_len: u32, src_len: u32) -> (u32, u32) {
    let (dst, src) = (u64::from(dst_len), u64::from(src_len));
    let s0 = u64::from(d0) * src / dst;
    let s1 = (u64::from(d1) * src).div_ceil(dst).min(src);
    (s0 as u32, s1 as u32)
}

/// Destination offset of source edge `s`, rounded.
fn scale_edge(s: u32, src_len: u32, dst_len: u32) -> u32 {
    let (dst, src) = (u64::from(dst_len), u64::from(src_len));
    ((u64::from(s) * dst + src / 2) / src) as u32
}

/// Composite `img` (straight RGBA) onto a premultiplied BGRA frame at `(x, y)`.
///
/// `frame` is `frame_size.width * frame_size.height * 4` bytes, top-down.
/// Parts of the image outside the frame are clipped.
pub fn blit_premultiplied_bgra(
    frame: &mut [u8],
    frame_size: ImageSize,
    img: &RgbaImage,
    x: i32,
    y: i32,
) {
    let fw = i64::from(frame_size.width);
    let fh = i64::from(frame_size.height);
    if frame.len() < (fw * fh * 4) as usize {
        log::warn!("Frame buffer smaller than {}x{}", fw, fh);
        return;
    }

    let left = i64::from(x).max(0);
    let top = i64::from(y).max(0);
    let right = (i64::from(x) + i64::from(img.width())).min(fw);
    let bottom = (i64::from(y) + i64::from(img.height())).min(fh);
    if left >= right || top >= bottom {
        return;
    }

    for fy in top..bottom {
        let sy = (fy - i64::from(y)) as u32;
        for fx in left..right {
            let sx = (fx - i64::from(x)) as u32;
            let Rgba([r, g, b, a]) = *img.get_pixel(sx, sy);
            if a == 0 {
                continue;
            }
            let i = ((fy * fw + fx) * 4) as usize;
            let px = &mut frame[i..i + 4];
            let inv = 255 - u32::from(a);
            px[0] = (premultiply(b, a) + mul_div255(u32::from(px[0]), inv)) as u8;
            px[1] = (premultiply(g, a) + mul_div255(u32::from(px[1]), inv)) as u8;
            px[2] = (premultiply(r, a) + mul_div255(u32::from(px[2]), inv)) as u8;
            px[3] = (u32::from(a) + mul_div255(u32::from(px[3]), inv)) as u8;
        }
    }
}

fn premultiply(c: u8, a: u8) -> u32 {
    mul_div255(u32::from(c), u32::from(a))
}

fn mul_div255(v: u32, a: u32) -> u32 {
    (v * a + 127) / 255
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_candidates_try_exe_dir_then_cwd() {
        let candidates = asset_candidates(TRAY_ICON_PATH);
        let last = candidates.last().map(PathBuf::as_path);
        assert_eq!(last, Some(Path::new(TRAY_ICON_PATH)));
        assert!(candidates.len() <= 2);
        assert!(candidates.iter().all(|p| p.ends_with(TRAY_ICON_PATH)));
    }

    #[test]
    fn test_generated_guide_has_native_size() {
        let img = generate_guide();
        assert_eq!(img.dimensions(), (2475, 2475));
    }

    #[test]
    fn test_generated_guide_ring_and_center() {
        let img = generate_guide();
        let (cx, cy) = GUIDE_CENTER;
        // On the ring, directly right of the center
        let on_ring = img.get_pixel((cx + GUIDE_RADIUS) as u32, cy as u32);
        assert_eq!(on_ring.0[3], 255);
        assert_eq!(&on_ring.0[..3], &GUIDE_COLOR[..3]);
        // Inside and far outside stay transparent
        assert_eq!(img.get_pixel(cx as u32, cy as u32).0[3], 0);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
    }

    fn placement(x: i32, y: i32, width: u32, height: u32) -> OverlayPlacement {
        OverlayPlacement {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_fully_visible_overlay_is_resized_whole() {
        let mut overlay = OverlayImage::new(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])));
        assert_eq!(overlay.native_size(), ImageSize::new(8, 8));

        let frame = ImageSize::new(20, 20);
        let part = overlay
            .visible(placement(3, 5, 4, 4), frame)
            .map(|(img, x, y)| (img.dimensions(), x, y));
        assert_eq!(part, Some(((4, 4), 3, 5)));
    }

    #[test]
    fn test_upscaled_overlay_only_resizes_on_screen_part() {
        let mut overlay = OverlayImage::new(RgbaImage::from_pixel(100, 100, Rgba([9, 9, 9, 255])));
        // 4x scale, 150 px hanging off the left edge of a 200x200 frame
        let part = overlay
            .visible(placement(-150, 0, 400, 400), ImageSize::new(200, 200))
            .map(|(img, x, y)| (img.dimensions(), x, y));
        // Source columns 37..88 and rows 0..50, snapped to whole source pixels
        assert_eq!(part, Some(((204, 200), -2, 0)));
    }

    #[test]
    fn test_max_scale_stays_frame_sized() {
        let mut overlay = OverlayImage::new(RgbaImage::new(2475, 2475));
        let frame = ImageSize::new(2560, 1440);
        let scale = crate::geometry::final_scale(crate::geometry::DisplayMode::Qhd, MAX_SCALE_FACTOR);
        let placed = crate::geometry::overlay_placement(overlay.native_size(), frame, scale, (0, 0));
        assert!(placed.width > 7000);

        let (img, _, _) = overlay.visible(placed, frame).unwrap();
        assert!(img.width() <= frame.width + 2 * scale.ceil() as u32);
        assert!(img.height() <= frame.height + 2 * scale.ceil() as u32);
    }

    #[test]
    fn test_visible_part_is_cached_per_placement() {
        let mut overlay = OverlayImage::new(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])));
        let frame = ImageSize::new(10, 10);

        let first = overlay.visible(placement(0, 0, 4, 4), frame).map(|(img, _, _)| img as *const RgbaImage);
        let again = overlay.visible(placement(0, 0, 4, 4), frame).map(|(img, _, _)| img as *const RgbaImage);
        assert_eq!(first, again);

        let other = overlay
            .visible(placement(1, 1, 2, 6), frame)
            .map(|(img, x, y)| (img.dimensions(), x, y));
        assert_eq!(other, Some(((2, 6), 1, 1)));
    }

    #[test]
    fn test_off_screen_or_empty_overlay_is_skipped() {
        let mut overlay = OverlayImage::new(RgbaImage::new(8, 8));
        let frame = ImageSize::new(10, 10);
        assert!(overlay.visible(placement(0, 0, 0, 5), frame).is_none());
        assert!(overlay.visible(placement(10, 0, 4, 4), frame).is_none());
        assert!(overlay.visible(placement(-4, -4, 4, 4), frame).is_none());
    }

    #[test]
    fn test_blit_converts_to_premultiplied_bgra() {
        let mut frame = vec![0u8; 2 * 2 * 4];
        let img = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 255]));
        blit_premultiplied_bgra(&mut frame, ImageSize::new(2, 2), &img, 1, 1);
        assert_eq!(&frame[12..16], &[50, 100, 200, 255]);
        assert!(frame[..12].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_blit_premultiplies_half_alpha() {
        let mut frame = vec![0u8; 4];
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 128]));
        blit_premultiplied_bgra(&mut frame, ImageSize::new(1, 1), &img, 0, 0);
        assert_eq!(frame, vec![0, 0, 128, 128]);
    }

    #[test]
    fn test_blit_clips_to_frame() {
        let mut frame = vec![0u8; 2 * 2 * 4];
        let img = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 255]));
        blit_premultiplied_bgra(&mut frame, ImageSize::new(2, 2), &img, -2, -2);
        assert_eq!(&frame[..4], &[255, 255, 255, 255]);
        assert!(frame[4..].iter().all(|&b| b == 0));

        let mut untouched = vec![0u8; 16];
        blit_premultiplied_bgra(&mut untouched, ImageSize::new(2, 2), &img, 5, 5);
        assert!(untouched.iter().all(|&b| b == 0));
    }
}
