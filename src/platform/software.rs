use crate::error::{Error, PlatformError, Result};
use crate::presenter::{QUAD_TEX_COORDS, RenderBackend};
use crate::types::Size;

/// A CPU stand-in for the GPU backend.
///
/// Holds the uploaded luminance texture and rasterises the full-screen quad
/// into an RGBA8 framebuffer the size of the viewport, sampling with
/// bilinear filtering and clamp-to-edge wrapping. Framebuffer row 0 is the
/// top of the screen.
#[derive(Debug, Clone)]
pub struct SoftwareBackend {
    initialised: bool,
    viewport: Size,
    texture: Vec<u8>,
    texture_size: Size,
    framebuffer: Vec<u8>,
    uploads: u64,
    reinits: u64,
    draws: u64,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        let viewport = Size::new(width, height);
        SoftwareBackend {
            initialised: false,
            viewport,
            texture: Vec::new(),
            texture_size: Size::default(),
            framebuffer: vec![0; viewport.pixel_count() * 4],
            uploads: 0,
            reinits: 0,
            draws: 0,
        }
    }

    pub fn texture(&self) -> &[u8] {
        &self.texture
    }

    pub fn texture_size(&self) -> Size {
        self.texture_size
    }

    /// RGBA8 pixels of the last draw or clear.
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// One RGBA pixel of the framebuffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.viewport.width || y >= self.viewport.height {
            return None;
        }
        let i = (y as usize * self.viewport.width as usize + x as usize) * 4;
        let px = self.framebuffer.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// The red channel of every framebuffer pixel, i.e. the displayed luminance.
    pub fn displayed_luma(&self) -> Vec<u8> {
        self.framebuffer.chunks_exact(4).map(|px| px[0]).collect()
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn reinits(&self) -> u64 {
        self.reinits
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    fn texel(&self, x: isize, y: isize) -> f32 {
        let w = self.texture_size.width as isize;
        let h = self.texture_size.height as isize;
        let x = x.clamp(0, w - 1) as usize;
        let y = y.clamp(0, h - 1) as usize;
        self.texture[y * w as usize + x] as f32
    }

    fn sample_linear(&self, u: f32, v: f32) -> u8 {
        let x = u * self.texture_size.width as f32 - 0.5;
        let y = v * self.texture_size.height as f32 - 0.5;
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as isize, y0 as isize);

        let top = self.texel(x0, y0) * (1.0 - fx) + self.texel(x0 + 1, y0) * fx;
        let bottom = self.texel(x0, y0 + 1) * (1.0 - fx) + self.texel(x0 + 1, y0 + 1) * fx;
        (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
    }

    fn fill(&mut self, color: [f32; 4]) {
        let rgba = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        for px in self.framebuffer.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn init(&mut self) -> Result<()> {
        self.initialised = true;
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Size::new(width, height);
        self.framebuffer = vec![0; self.viewport.pixel_count() * 4];
    }

    fn upload_luminance(&mut self, size: Size, data: &[u8], reinit: bool) -> Result<()> {
        if !self.initialised {
            return Err(Error::Platform(PlatformError::Message(
                "upload before init".into(),
            )));
        }
        if data.len() != size.pixel_count() {
            return Err(Error::BufferSize {
                expected: size.pixel_count(),
                actual: data.len(),
            });
        }
        if reinit {
            self.texture = vec![0; size.pixel_count()];
            self.texture_size = size;
            self.reinits += 1;
        } else if size != self.texture_size {
            return Err(Error::Platform(PlatformError::Message(format!(
                "upload of {}x{} into a {}x{} texture without reinit",
                size.width, size.height, self.texture_size.width, self.texture_size.height
            ))));
        }
        self.texture.copy_from_slice(data);
        self.uploads += 1;
        Ok(())
    }

    fn draw_quad(&mut self, clear_color: [f32; 4]) -> Result<()> {
        self.fill(clear_color);
        if self.texture_size.is_empty() {
            return Ok(());
        }

        // Top-left and bottom-right corners of the strip.
        let (u0, v0) = (QUAD_TEX_COORDS[0], QUAD_TEX_COORDS[1]);
        let (u1, v1) = (QUAD_TEX_COORDS[6], QUAD_TEX_COORDS[7]);
        let (vw, vh) = (self.viewport.width as usize, self.viewport.height as usize);

        for py in 0..vh {
            let v = v0 + (v1 - v0) * ((py as f32 + 0.5) / vh as f32);
            for px in 0..vw {
                let u = u0 + (u1 - u0) * ((px as f32 + 0.5) / vw as f32);
                let gray = self.sample_linear(u, v);
                let i = (py * vw + px) * 4;
                self.framebuffer[i..i + 4].copy_from_slice(&[gray, gray, gray, 255]);
            }
        }
        self.draws += 1;
        Ok(())
    }

    fn clear(&mut self, clear_color: [f32; 4]) -> Result<()> {
        self.fill(clear_color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_with(size: Size, data: &[u8]) -> SoftwareBackend {
        let mut b = SoftwareBackend::new(size.width, size.height);
        b.init().unwrap();
        b.upload_luminance(size, data, true).unwrap();
        b
    }

    #[test]
    fn same_size_viewport_reproduces_texture() {
        let size = Size::new(4, 3);
        let data: Vec<u8> = (0..12).map(|i| i * 20).collect();
        let mut b = backend_with(size, &data);
        b.draw_quad([0.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(b.displayed_luma(), data);
        assert_eq!(b.pixel(1, 0), Some([20, 20, 20, 255]));
    }

    #[test]
    fn edges_clamp_instead_of_wrapping() {
        let size = Size::new(2, 1);
        let mut b = backend_with(size, &[0, 200]);
        b.set_viewport(8, 1);
        b.draw_quad([0.0; 4]).unwrap();
        let row = b.displayed_luma();
        assert_eq!(row[0], 0);
        assert_eq!(row[7], 200);
        assert!(row.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn upload_without_reinit_must_match_size() {
        let mut b = backend_with(Size::new(2, 2), &[0; 4]);
        assert!(b.upload_luminance(Size::new(2, 2), &[1; 4], false).is_ok());
        assert!(b.upload_luminance(Size::new(3, 2), &[1; 6], false).is_err());
        assert_eq!(b.reinits(), 1);
        assert_eq!(b.uploads(), 2);
    }

    #[test]
    fn clear_fills_the_framebuffer() {
        let mut b = SoftwareBackend::new(2, 2);
        b.init().unwrap();
        b.clear([1.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(b.pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(b.pixel(2, 0), None);
    }
}
