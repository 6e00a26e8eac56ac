//! Frame fitting.
//!
//! Two independent paths:
//!
//! - **Program fit** (full renders): scale to cover the target (by height,
//!   or by width for sources narrower than the target aspect), cut a
//!   target-sized window centred on the frame midpoint, scale the window
//!   to target width. Every visual track comes out at the target size.
//! - **Sub-clip fit** (ad-hoc extraction): cover-and-crop or
//!   contain-and-pad to exactly the requested pixel size.

use reelsmith_timeline_model::{CropWindow, FitMode, FrameSize, VisualFit};

/// Aspect ratios closer than this are treated as equal.
pub const ASPECT_TOLERANCE: f64 = 0.01;

fn scale_dim(value: u32, factor: f64) -> u32 {
    ((value as f64 * factor).round() as u32).max(1)
}

/// Program-fit geometry for one visual source.
pub fn program_fit(source: FrameSize, target: FrameSize) -> VisualFit {
    if source.width == 0 || source.height == 0 {
        return VisualFit {
            scaled: target,
            crop: CropWindow::centered(0.0, 0.0, target.width, target.height, target),
            output: target,
        };
    }

    // Cross-multiplied aspect comparison avoids float ties.
    let wider = source.width as u64 * target.height as u64
        >= target.width as u64 * source.height as u64;
    let scaled = if wider {
        let height_scale = target.height as f64 / source.height as f64;
        FrameSize::new(
            scale_dim(source.width, height_scale).max(target.width),
            target.height,
        )
    } else {
        let width_scale = target.width as f64 / source.width as f64;
        FrameSize::new(
            target.width,
            scale_dim(source.height, width_scale).max(target.height),
        )
    };

    let (cx, cy) = target.midpoint();
    let crop = CropWindow::centered(cx, cy, target.width, target.height, scaled);

    let width_scale = target.width as f64 / crop.width as f64;
    let output = FrameSize::new(target.width, scale_dim(crop.height, width_scale));

    VisualFit {
        scaled,
        crop,
        output,
    }
}

/// Geometry for an extracted sub-clip. Every variant produces exactly the
/// target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubclipGeometry {
    /// Aspect already matches; plain resize.
    ScaleOnly { target: FrameSize },
    /// Scale to cover, then cut the centred window.
    Crop {
        scaled: FrameSize,
        window: CropWindow,
    },
    /// Scale to fit inside, then letterbox.
    Pad {
        scaled: FrameSize,
        x: u32,
        y: u32,
        target: FrameSize,
    },
}

impl SubclipGeometry {
    pub fn output(&self) -> FrameSize {
        match *self {
            SubclipGeometry::ScaleOnly { target } => target,
            SubclipGeometry::Crop { window, .. } => window.size(),
            SubclipGeometry::Pad { target, .. } => target,
        }
    }
}

fn even_up(n: u32) -> u32 {
    n + (n & 1)
}

fn even_down(n: u32) -> u32 {
    (n - (n & 1)).max(2)
}

/// Choose and size the sub-clip transform.
pub fn subclip_geometry(source: FrameSize, target: FrameSize, mode: FitMode) -> SubclipGeometry {
    if source.width == 0
        || source.height == 0
        || (source.aspect() - target.aspect()).abs() < ASPECT_TOLERANCE
    {
        return SubclipGeometry::ScaleOnly { target };
    }

    let sx = target.width as f64 / source.width as f64;
    let sy = target.height as f64 / source.height as f64;

    match mode {
        FitMode::Crop => {
            // The dominant axis lands exactly on the target; the other overflows.
            let (w, h) = if sx >= sy {
                let h = even_up((source.height as f64 * sx).ceil() as u32);
                (target.width, h.max(target.height))
            } else {
                let w = even_up((source.width as f64 * sy).ceil() as u32);
                (w.max(target.width), target.height)
            };
            let scaled = FrameSize::new(w, h);
            let window = CropWindow {
                x: (w - target.width) / 2,
                y: (h - target.height) / 2,
                width: target.width,
                height: target.height,
            };
            SubclipGeometry::Crop { scaled, window }
        }
        FitMode::Pad => {
            let (w, h) = if sx <= sy {
                let h = even_down((source.height as f64 * sx).floor() as u32);
                (target.width, h.min(target.height))
            } else {
                let w = even_down((source.width as f64 * sy).floor() as u32);
                (w.min(target.width), target.height)
            };
            SubclipGeometry::Pad {
                scaled: FrameSize::new(w, h),
                x: (target.width - w) / 2,
                y: (target.height - h) / 2,
                target,
            }
        }
    }
}
