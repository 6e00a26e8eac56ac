//! Frame geometry value types.
//!
//! All sizes are in output pixels.

use serde::{Deserialize, Serialize};

/// Width and height of a frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// 1920x1080.
    pub const LANDSCAPE_HD: FrameSize = FrameSize {
        width: 1920,
        height: 1080,
    };

    /// 1080x1920.
    pub const PORTRAIT_HD: FrameSize = FrameSize {
        width: 1080,
        height: 1920,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    pub fn is_portrait(&self) -> bool {
        self.width < self.height
    }

    /// Pixel midpoint `(W/2, H/2)`.
    pub fn midpoint(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

/// Output orientation. Only two profiles exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    #[default]
    Landscape,
    Portrait,
}

impl AspectRatio {
    pub fn for_short_form(is_short_form: bool) -> Self {
        if is_short_form {
            AspectRatio::Portrait
        } else {
            AspectRatio::Landscape
        }
    }

    /// Orientation of an existing frame; square counts as landscape.
    pub fn of_frame(size: FrameSize) -> Self {
        if size.is_portrait() {
            AspectRatio::Portrait
        } else {
            AspectRatio::Landscape
        }
    }

    /// Target frame for full-program renders.
    pub fn frame(self) -> FrameSize {
        match self {
            AspectRatio::Landscape => FrameSize::LANDSCAPE_HD,
            AspectRatio::Portrait => FrameSize::PORTRAIT_HD,
        }
    }

    /// Display aspect string passed to the encoder.
    pub fn as_ratio_str(self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }

    pub fn parse_label(label: &str) -> Option<Self> {
        match label {
            "Landscape" => Some(AspectRatio::Landscape),
            "Portrait" => Some(AspectRatio::Portrait),
            _ => None,
        }
    }
}

/// How a mismatched source is reconciled with the target frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Cover the target, discarding overflow.
    Crop,
    /// Contain within the target, letterboxing with a solid fill.
    Pad,
}

impl FitMode {
    pub fn from_allow_cropping(allow_cropping: bool) -> Self {
        if allow_cropping {
            FitMode::Crop
        } else {
            FitMode::Pad
        }
    }
}

/// A pixel rectangle within a (scaled) source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    /// Window of `width`x`height` centred at `(cx, cy)`, shrunk and shifted
    /// so it stays inside `bounds`.
    pub fn centered(cx: f64, cy: f64, width: u32, height: u32, bounds: FrameSize) -> Self {
        let width = width.min(bounds.width);
        let height = height.min(bounds.height);

        let max_x = (bounds.width - width) as f64;
        let max_y = (bounds.height - height) as f64;
        let x = (cx - width as f64 / 2.0).round().clamp(0.0, max_x);
        let y = (cy - height as f64 / 2.0).round().clamp(0.0, max_y);

        Self {
            x: x as u32,
            y: y as u32,
            width,
            height,
        }
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_profiles() {
        assert_eq!(AspectRatio::for_short_form(true).frame(), FrameSize::PORTRAIT_HD);
        assert_eq!(AspectRatio::for_short_form(false).as_ratio_str(), "16:9");
        assert_eq!(
            AspectRatio::of_frame(FrameSize::new(720, 1280)),
            AspectRatio::Portrait
        );
        assert_eq!(
            AspectRatio::of_frame(FrameSize::new(1000, 1000)),
            AspectRatio::Landscape
        );
    }

    #[test]
    fn test_centered_crop_inside_bounds() {
        let bounds = FrameSize::new(3413, 1920);
        let window = CropWindow::centered(540.0, 960.0, 1080, 1920, bounds);
        assert_eq!(window.x, 0);
        assert_eq!(window.y, 0);
        assert_eq!(window.size(), FrameSize::new(1080, 1920));
    }

    #[test]
    fn test_centered_crop_is_clamped_to_far_edge() {
        let bounds = FrameSize::new(1200, 1080);
        let window = CropWindow::centered(1150.0, 540.0, 1000, 1080, bounds);
        assert_eq!(window.right(), 1200);
        assert_eq!(window.x, 200);
    }

    #[test]
    fn test_crop_larger_than_bounds_shrinks() {
        let bounds = FrameSize::new(800, 600);
        let window = CropWindow::centered(400.0, 300.0, 1920, 1080, bounds);
        assert_eq!(window.size(), bounds);
        assert_eq!((window.x, window.y), (0, 0));
    }

    #[test]
    fn test_fit_mode_from_flag() {
        assert_eq!(FitMode::from_allow_cropping(true), FitMode::Crop);
        assert_eq!(FitMode::from_allow_cropping(false), FitMode::Pad);
    }
}
