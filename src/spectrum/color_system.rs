//! A working colour gamut: xy primaries and white point, the RGB<->XYZ
//! matrices they imply, gamut-constraining, and Bradford chromatic
//! adaptation between two white points.

use super::{RGBColor, XYZColor};
use crate::pbrt::Float;

/// How `Limit` handles an RGB triple with out-of-range components.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GamutLimitMethod {
    Clamp,
    LuminancePreserving,
    MaxComponentScaling,
}

#[derive(Copy, Clone, Debug)]
pub struct ColorSystem {
    red: (Float, Float),
    green: (Float, Float),
    blue: (Float, Float),
    white: (Float, Float),
    xyz_to_rgb: [[Float; 3]; 3],
    rgb_to_xyz: [[Float; 3]; 3],
}

impl ColorSystem {
    /// Builds the RGB<->XYZ matrices (the standard three-primaries
    /// construction) from chromaticities of the primaries and white point.
    pub fn new(red: (Float, Float), green: (Float, Float), blue: (Float, Float), white: (Float, Float)) -> Self {
        let to_xyz = |(x, y): (Float, Float)| -> [Float; 3] { [x / y, 1.0, (1.0 - x - y) / y] };
        let xr = to_xyz(red);
        let xg = to_xyz(green);
        let xb = to_xyz(blue);
        let xw = to_xyz(white);

        let m = [
            [xr[0], xg[0], xb[0]],
            [xr[1], xg[1], xb[1]],
            [xr[2], xg[2], xb[2]],
        ];
        let m_inv = invert3(&m);
        let s = mat_vec3(&m_inv, &xw);

        let rgb_to_xyz = [
            [m[0][0] * s[0], m[0][1] * s[1], m[0][2] * s[2]],
            [m[1][0] * s[0], m[1][1] * s[1], m[1][2] * s[2]],
            [m[2][0] * s[0], m[2][1] * s[1], m[2][2] * s[2]],
        ];
        let xyz_to_rgb = invert3(&rgb_to_xyz);

        Self {
            red,
            green,
            blue,
            white,
            xyz_to_rgb,
            rgb_to_xyz,
        }
    }

    /// Rec. 709 / sRGB primaries with a D65 white point — the default
    /// working space.
    pub fn srgb() -> Self {
        Self::new((0.64, 0.33), (0.30, 0.60), (0.15, 0.06), (0.3127, 0.3290))
    }

    pub fn white_point(&self) -> (Float, Float) {
        self.white
    }

    pub fn to_rgb(&self, xyz: &XYZColor) -> RGBColor {
        let v = mat_vec3(&self.xyz_to_rgb, &[xyz.x, xyz.y, xyz.z]);
        RGBColor::new(v[0], v[1], v[2])
    }

    pub fn to_xyz(&self, rgb: &RGBColor) -> XYZColor {
        let v = mat_vec3(&self.rgb_to_xyz, &[rgb.r, rgb.g, rgb.b]);
        XYZColor::new(v[0], v[1], v[2])
    }

    fn in_gamut(&self, rgb: &RGBColor) -> bool {
        rgb.r >= 0.0 && rgb.g >= 0.0 && rgb.b >= 0.0
    }

    /// Desaturates an out-of-gamut XYZ toward the white point by
    /// intersecting the line from the white point through the requested
    /// chromaticity with the nearest Maxwell-triangle edge, preserving
    /// luminance.
    pub fn to_rgb_constrained(&self, xyz: &XYZColor) -> RGBColor {
        let rgb = self.to_rgb(xyz);
        if self.in_gamut(&rgb) {
            return rgb;
        }

        let (cx, cy) = xyz.chromaticity();
        let (wx, wy) = self.white;
        let edges = [(self.red, self.green), (self.green, self.blue), (self.blue, self.red)];

        let mut best: Option<(Float, Float, Float)> = None;
        for (a, b) in edges {
            if let Some((ix, iy)) = line_segment_intersection((wx, wy), (cx, cy), a, b) {
                let dist = (ix - wx).hypot(iy - wy);
                if best.map_or(true, |(_, _, d)| dist < d) {
                    best = Some((ix, iy, dist));
                }
            }
        }

        let (nx, ny) = best.map(|(x, y, _)| (x, y)).unwrap_or((wx, wy));
        let constrained_xyz = chromaticity_at_luminance(nx, ny, xyz.y);
        self.to_rgb(&constrained_xyz)
    }

    /// Handles a super-bright (but in-gamut-hue) RGB triple.
    pub fn limit(&self, rgb: &RGBColor, method: GamutLimitMethod) -> RGBColor {
        match method {
            GamutLimitMethod::Clamp => rgb.clamp(0.0, 1.0),
            GamutLimitMethod::MaxComponentScaling => {
                let m = rgb.max_component();
                if m > 1.0 {
                    *rgb * (1.0 / m)
                } else {
                    *rgb
                }
            }
            GamutLimitMethod::LuminancePreserving => {
                let xyz = self.to_xyz(rgb);
                let m = rgb.max_component();
                if m <= 1.0 {
                    return *rgb;
                }
                let (x, y) = xyz.chromaticity();
                self.to_rgb(&chromaticity_at_luminance(x, y, xyz.y.min(1.0)))
            }
        }
    }

    /// Bradford-cone-response chromatic adaptation from this system's white
    /// point to `dest_white`.
    pub fn bradford_adapt(&self, xyz: &XYZColor, dest_white: (Float, Float)) -> XYZColor {
        const BRADFORD: [[Float; 3]; 3] = [
            [0.8951, 0.2664, -0.1614],
            [-0.7502, 1.7135, 0.0367],
            [0.0389, -0.0685, 1.0296],
        ];
        let bradford_inv = invert3(&BRADFORD);

        let src_xyz = chromaticity_to_xyz(self.white);
        let dst_xyz = chromaticity_to_xyz(dest_white);
        let src_cone = mat_vec3(&BRADFORD, &[src_xyz[0], src_xyz[1], src_xyz[2]]);
        let dst_cone = mat_vec3(&BRADFORD, &[dst_xyz[0], dst_xyz[1], dst_xyz[2]]);

        let scale = [
            [dst_cone[0] / src_cone[0], 0.0, 0.0],
            [0.0, dst_cone[1] / src_cone[1], 0.0],
            [0.0, 0.0, dst_cone[2] / src_cone[2]],
        ];

        let cone = mat_vec3(&BRADFORD, &[xyz.x, xyz.y, xyz.z]);
        let adapted_cone = mat_vec3(&scale, &cone);
        let adapted = mat_vec3(&bradford_inv, &adapted_cone);
        XYZColor::new(adapted[0], adapted[1], adapted[2])
    }
}

fn chromaticity_to_xyz((x, y): (Float, Float)) -> [Float; 3] {
    [x / y, 1.0, (1.0 - x - y) / y]
}

fn chromaticity_at_luminance(x: Float, y: Float, target_y: Float) -> XYZColor {
    if y == 0.0 {
        return XYZColor::BLACK;
    }
    let scale = target_y / y;
    XYZColor::new(x * scale, target_y, (1.0 - x - y) * scale)
}

fn line_segment_intersection(
    p1: (Float, Float),
    p2: (Float, Float),
    p3: (Float, Float),
    p4: (Float, Float),
) -> Option<(Float, Float)> {
    let (x1, y1) = p1;
    let (x2, y2) = p2;
    let (x3, y3) = p3;
    let (x4, y4) = p4;

    let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / denom;
    let u = -((x1 - x2) * (y1 - y3) - (y1 - y2) * (x1 - x3)) / denom;
    if !(0.0..=1.0).contains(&u) || t < 0.0 {
        return None;
    }
    Some((x1 + t * (x2 - x1), y1 + t * (y2 - y1)))
}

fn invert3(m: &[[Float; 3]; 3]) -> [[Float; 3]; 3] {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    let inv_det = 1.0 / det;
    [
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ]
}

fn mat_vec3(m: &[[Float; 3]; 3], v: &[Float; 3]) -> [Float; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn in_gamut_round_trip_within_1e4() {
        let cs = ColorSystem::srgb();
        for c in [RGBColor::new(0.2, 0.4, 0.6), RGBColor::new(1.0, 0.0, 0.0), RGBColor::new(0.0, 1.0, 0.0)] {
            let xyz = cs.to_xyz(&c);
            let back = cs.to_rgb(&xyz);
            assert_relative_eq!(back.r, c.r, epsilon = 1e-4);
            assert_relative_eq!(back.g, c.g, epsilon = 1e-4);
            assert_relative_eq!(back.b, c.b, epsilon = 1e-4);
        }
    }

    #[test]
    fn constrain_of_in_gamut_color_is_unchanged() {
        let cs = ColorSystem::srgb();
        let rgb = RGBColor::new(0.5, 0.25, 0.1);
        let xyz = cs.to_xyz(&rgb);
        let constrained = cs.to_rgb_constrained(&xyz);
        assert_relative_eq!(constrained.r, rgb.r, epsilon = 1e-4);
        assert_relative_eq!(constrained.g, rgb.g, epsilon = 1e-4);
        assert_relative_eq!(constrained.b, rgb.b, epsilon = 1e-4);
    }

    #[test]
    fn max_component_scaling_never_exceeds_one() {
        let cs = ColorSystem::srgb();
        let bright = RGBColor::new(4.0, 2.0, 1.0);
        let limited = cs.limit(&bright, GamutLimitMethod::MaxComponentScaling);
        assert!(limited.max_component() <= 1.0 + 1e-6);
    }
}
