//! RGB -> DICOM CIELab
//!
//! sRGB (0-255) -> 线性 RGB -> XYZ (D65) -> CIELab -> DICOM 缩放整数 (0-65535)

const WHITE_POINT: [f64; 3] = [0.950456, 1.0, 1.088754];

const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

fn linearize(channel: f64) -> f64 {
    let n = channel / 255.0;
    if n <= 0.0404482362771076 {
        n / 12.92
    } else {
        ((n + 0.055) / 1.055).powf(2.4)
    }
}

fn lab_f(t: f64) -> f64 {
    if t > 0.008856451679 {
        t.cbrt()
    } else {
        7.787037037 * t + 16.0 / 116.0
    }
}

/// 计算 CIELab (L, a, b)
pub fn rgb_to_lab(rgb: [f64; 3]) -> [f64; 3] {
    let linear = rgb.map(linearize);
    let xyz = SRGB_TO_XYZ.map(|row| row[0] * linear[0] + row[1] * linear[1] + row[2] * linear[2]);

    let fx = lab_f(xyz[0] / WHITE_POINT[0]);
    let fy = lab_f(xyz[1] / WHITE_POINT[1]);
    let fz = lab_f(xyz[2] / WHITE_POINT[2]);

    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// 转换为 DICOM `RecommendedDisplayCIELabValue`
pub fn rgb_to_dicom_lab(rgb: [f64; 3]) -> [u16; 3] {
    let [l, a, b] = rgb_to_lab(rgb);
    let scale = |v: f64| v.round().clamp(0.0, 65535.0) as u16;
    [
        scale(l * 65535.0 / 100.0),
        scale((a + 128.0) * 65535.0 / 255.0),
        scale((b + 128.0) * 65535.0 / 255.0),
    ]
}

/// 段颜色 RGBA -> DICOM Lab，忽略 alpha
pub fn segment_color_to_dicom_lab(color: [u8; 4]) -> [u16; 3] {
    rgb_to_dicom_lab([color[0] as f64, color[1] as f64, color[2] as f64])
}
