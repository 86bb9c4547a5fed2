/// Logical size of the drawing area and the pixel ratio the surface renders at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl Viewport {
    /// `device_pixel_ratio` is capped at `max_pixel_ratio`.
    pub fn new(width: u32, height: u32, device_pixel_ratio: f64, max_pixel_ratio: f64) -> Self {
        let pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio.min(max_pixel_ratio)
        } else {
            1.0
        };
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Size of the backing surface in physical pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        (
            ((self.width as f64 * self.pixel_ratio).round() as u32).max(1),
            ((self.height as f64 * self.pixel_ratio).round() as u32).max(1),
        )
    }

    /// Size the GPU surface is configured to. The web canvas backing store follows
    /// the capped pixel ratio; a native surface has to match the window's physical
    /// size or presentation reports it as outdated.
    pub fn surface_size_for(&self, window_physical: (u32, u32)) -> (u32, u32) {
        if cfg!(target_arch = "wasm32") {
            self.surface_size()
        } else {
            (window_physical.0.max(1), window_physical.1.max(1))
        }
    }
}
