//! Pixel-level blending for layer compositing.
//!
//! The integer math mirrors Aseprite's own blender so flattened frames come
//! out byte-identical to the editor's rendering. Channel modes work on
//! fixed-point u8 arithmetic; the HSL family and soft light switch to f64
//! like the reference code does.

use crate::layer::BlendMode;
use image::Rgba;

pub(crate) type Color8 = Rgba<u8>;

/// Pixel combinator used by the compositor: `f(backdrop, src, opacity)`.
pub(crate) type BlendFn = fn(Color8, Color8, u8) -> Color8;

/// The pixel combinator for a blend mode.
///
/// Every known mode maps to its blender; codes this library does not know
/// keep the backdrop unchanged.
pub(crate) fn blend_fn(mode: BlendMode) -> BlendFn {
    match mode {
        BlendMode::Normal => normal,
        BlendMode::Multiply => multiply,
        BlendMode::Screen => screen,
        BlendMode::Overlay => overlay,
        BlendMode::Darken => darken,
        BlendMode::Lighten => lighten,
        BlendMode::ColorDodge => color_dodge,
        BlendMode::ColorBurn => color_burn,
        BlendMode::HardLight => hard_light,
        BlendMode::SoftLight => soft_light,
        BlendMode::Difference => difference,
        BlendMode::Exclusion => exclusion,
        BlendMode::Hue => hsl_hue,
        BlendMode::Saturation => hsl_saturation,
        BlendMode::Color => hsl_color,
        BlendMode::Luminosity => hsl_luminosity,
        BlendMode::Addition => addition,
        BlendMode::Subtract => subtract,
        BlendMode::Divide => divide,
        BlendMode::Unsupported(_) => keep_backdrop,
    }
}

/// Fallback for unknown blend mode codes.
pub(crate) fn keep_backdrop(backdrop: Color8, _src: Color8, _opacity: u8) -> Color8 {
    backdrop
}

pub(crate) fn merge(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    let [back_r, back_g, back_b, back_a] = backdrop.0;
    let [src_r, src_g, src_b, src_a] = src.0;
    let res_r;
    let res_g;
    let res_b;

    if back_a == 0 {
        res_r = src_r;
        res_g = src_g;
        res_b = src_b;
    } else if src_a == 0 {
        res_r = back_r;
        res_g = back_g;
        res_b = back_b;
    } else {
        res_r = blend8(back_r, src_r, opacity);
        res_g = blend8(back_g, src_g, opacity);
        res_b = blend8(back_b, src_b, opacity);
    }
    let res_a = blend8(back_a, src_a, opacity);
    if res_a == 0 {
        Rgba([0, 0, 0, 0])
    } else {
        Rgba([res_r, res_g, res_b, res_a])
    }
}

/// Alpha-composites `src` over `backdrop`. `opacity` scales the source
/// pixel's own alpha.
pub(crate) fn normal(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    let (back_r, back_g, back_b, back_a) = as_rgba_i32(backdrop);
    let (src_r, src_g, src_b, src_a) = as_rgba_i32(src);
    let src_a = mul_un8(src_a, opacity as i32) as i32;

    if back_a == 0 {
        return Rgba([src_r as u8, src_g as u8, src_b as u8, src_a as u8]);
    } else if src_a == 0 {
        return backdrop;
    }

    let res_a = src_a + back_a - mul_un8(back_a, src_a) as i32;
    let res_r = back_r + (src_r - back_r) * src_a / res_a;
    let res_g = back_g + (src_g - back_g) * src_a / res_a;
    let res_b = back_b + (src_b - back_b) * src_a / res_a;
    Rgba([res_r as u8, res_g as u8, res_b as u8, res_a as u8])
}

// When the backdrop carries alpha the blended result is merged with the
// plain composite, weighted by the backdrop and composite alphas.
fn blender<F>(backdrop: Color8, src: Color8, opacity: u8, baseline: F) -> Color8
where
    F: Fn(Color8, Color8, u8) -> Color8,
{
    if backdrop[3] != 0 && src[3] != 0 {
        let norm = normal(backdrop, src, opacity);
        let blend = baseline(backdrop, src, opacity);
        let back_alpha = backdrop[3];
        let normal_to_blend_merge = merge(norm, blend, back_alpha);
        let src_total_alpha = mul_un8(src[3] as i32, opacity as i32);
        let composite_alpha = mul_un8(back_alpha as i32, src_total_alpha as i32);
        merge(normal_to_blend_merge, blend, composite_alpha)
    } else {
        normal(backdrop, src, opacity)
    }
}

// Combines each color channel with `f`, keeps the source alpha, and
// composites the result over the backdrop.
fn blend_channel<F>(backdrop: Color8, src: Color8, opacity: u8, f: F) -> Color8
where
    F: Fn(i32, i32) -> u8,
{
    let (back_r, back_g, back_b, _) = as_rgba_i32(backdrop);
    let (src_r, src_g, src_b, src_a) = as_rgba_i32(src);
    let src = Rgba([
        f(back_r, src_r),
        f(back_g, src_g),
        f(back_b, src_b),
        src_a as u8,
    ]);
    normal(backdrop, src, opacity)
}

pub(crate) fn multiply(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, |b, s| mul_un8(b, s))
    })
}

pub(crate) fn screen(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, blend_screen)
    })
}

pub(crate) fn overlay(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, |b, s| blend_hard_light(s, b))
    })
}

pub(crate) fn darken(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, |b, s| b.min(s) as u8)
    })
}

pub(crate) fn lighten(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, |b, s| b.max(s) as u8)
    })
}

pub(crate) fn color_dodge(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, |b, s| {
            if b == 0 {
                return 0;
            }
            let s = 255 - s;
            if b >= s {
                255
            } else {
                div_un8(b, s)
            }
        })
    })
}

pub(crate) fn color_burn(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, |b, s| {
            if b == 255 {
                return 255;
            }
            let b = 255 - b;
            if b >= s {
                0
            } else {
                255 - div_un8(b, s)
            }
        })
    })
}

pub(crate) fn hard_light(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, blend_hard_light)
    })
}

pub(crate) fn soft_light(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, blend_soft_light)
    })
}

pub(crate) fn difference(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, |b, s| (b - s).abs() as u8)
    })
}

pub(crate) fn exclusion(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, |b, s| {
            (b + s - 2 * mul_un8(b, s) as i32) as u8
        })
    })
}

pub(crate) fn addition(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, |b, s| (b + s).min(255) as u8)
    })
}

pub(crate) fn subtract(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, |b, s| (b - s).max(0) as u8)
    })
}

pub(crate) fn divide(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        blend_channel(backdrop, src, opacity, |b, s| {
            if b == 0 {
                0
            } else if b >= s {
                255
            } else {
                div_un8(b, s)
            }
        })
    })
}

pub(crate) fn hsl_hue(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        let (back_r, back_g, back_b) = as_rgb_f64(backdrop);
        let s = sat(back_r, back_g, back_b);
        let l = lum(back_r, back_g, back_b);
        let (mut r, mut g, mut b) = as_rgb_f64(src);
        set_sat(&mut r, &mut g, &mut b, s);
        set_lum(&mut r, &mut g, &mut b, l);
        normal(backdrop, from_rgb_f64(r, g, b, src[3]), opacity)
    })
}

pub(crate) fn hsl_saturation(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        let (src_r, src_g, src_b) = as_rgb_f64(src);
        let s = sat(src_r, src_g, src_b);
        let (mut r, mut g, mut b) = as_rgb_f64(backdrop);
        let l = lum(r, g, b);
        set_sat(&mut r, &mut g, &mut b, s);
        set_lum(&mut r, &mut g, &mut b, l);
        normal(backdrop, from_rgb_f64(r, g, b, src[3]), opacity)
    })
}

pub(crate) fn hsl_color(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        let (back_r, back_g, back_b) = as_rgb_f64(backdrop);
        let l = lum(back_r, back_g, back_b);
        let (mut r, mut g, mut b) = as_rgb_f64(src);
        set_lum(&mut r, &mut g, &mut b, l);
        normal(backdrop, from_rgb_f64(r, g, b, src[3]), opacity)
    })
}

pub(crate) fn hsl_luminosity(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    blender(backdrop, src, opacity, |backdrop, src, opacity| {
        let (src_r, src_g, src_b) = as_rgb_f64(src);
        let l = lum(src_r, src_g, src_b);
        let (mut r, mut g, mut b) = as_rgb_f64(backdrop);
        set_lum(&mut r, &mut g, &mut b, l);
        normal(backdrop, from_rgb_f64(r, g, b, src[3]), opacity)
    })
}

fn blend_screen(b: i32, s: i32) -> u8 {
    (b + s - mul_un8(b, s) as i32) as u8
}

fn blend_hard_light(b: i32, s: i32) -> u8 {
    if s < 128 {
        mul_un8(b, s << 1)
    } else {
        blend_screen(b, (s << 1) - 255)
    }
}

fn blend_soft_light(b: i32, s: i32) -> u8 {
    let b = b as f64 / 255.0;
    let s = s as f64 / 255.0;
    let d = if b <= 0.25 {
        ((16.0 * b - 12.0) * b + 4.0) * b
    } else {
        b.sqrt()
    };
    let r = if s <= 0.5 {
        b - (1.0 - 2.0 * s) * b * (1.0 - b)
    } else {
        b + (2.0 * s - 1.0) * (d - b)
    };
    (r * 255.0 + 0.5) as u8
}

// HSL helpers, in f64 like the reference blender.

fn lum(r: f64, g: f64, b: f64) -> f64 {
    0.3 * r + 0.59 * g + 0.11 * b
}

fn sat(r: f64, g: f64, b: f64) -> f64 {
    r.max(g).max(b) - r.min(g).min(b)
}

fn clip_color(r: &mut f64, g: &mut f64, b: &mut f64) {
    let l = lum(*r, *g, *b);
    let n = r.min(*g).min(*b);
    let x = r.max(*g).max(*b);
    if n < 0.0 {
        *r = l + ((*r - l) * l) / (l - n);
        *g = l + ((*g - l) * l) / (l - n);
        *b = l + ((*b - l) * l) / (l - n);
    }
    if x > 1.0 {
        *r = l + ((*r - l) * (1.0 - l)) / (x - l);
        *g = l + ((*g - l) * (1.0 - l)) / (x - l);
        *b = l + ((*b - l) * (1.0 - l)) / (x - l);
    }
}

fn set_lum(r: &mut f64, g: &mut f64, b: &mut f64, l: f64) {
    let d = l - lum(*r, *g, *b);
    *r += d;
    *g += d;
    *b += d;
    clip_color(r, g, b);
}

// The reference blender picks min/mid/max as *references* into the three
// channels and writes through them in order. The index chains below copy
// its comparisons verbatim, so ties select, and write through, the same
// channels.
fn set_sat(r: &mut f64, g: &mut f64, b: &mut f64, s: f64) {
    let mut v = [*r, *g, *b];
    let min = if v[0] < v[1] {
        if v[0] < v[2] {
            0
        } else {
            2
        }
    } else if v[1] < v[2] {
        1
    } else {
        2
    };
    let mid = if v[0] > v[1] {
        if v[1] > v[2] {
            1
        } else if v[0] > v[2] {
            2
        } else {
            0
        }
    } else if v[0] > v[2] {
        0
    } else if v[1] > v[2] {
        2
    } else {
        1
    };
    let max = if v[0] > v[1] {
        if v[0] > v[2] {
            0
        } else {
            2
        }
    } else if v[1] > v[2] {
        1
    } else {
        2
    };

    // Assignment order matters when two of the picks alias, e.g. for a
    // fully gray pixel.
    if v[max] > v[min] {
        v[mid] = ((v[mid] - v[min]) * s) / (v[max] - v[min]);
        v[max] = s;
    } else {
        v[mid] = 0.0;
        v[max] = 0.0;
    }
    v[min] = 0.0;
    *r = v[0];
    *g = v[1];
    *b = v[2];
}

fn as_rgba_i32(color: Color8) -> (i32, i32, i32, i32) {
    let [r, g, b, a] = color.0;
    (r as i32, g as i32, b as i32, a as i32)
}

fn as_rgb_f64(color: Color8) -> (f64, f64, f64) {
    let [r, g, b, _] = color.0;
    (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
}

fn from_rgb_f64(r: f64, g: f64, b: f64, alpha: u8) -> Color8 {
    Rgba([
        (r * 255.0 + 0.5) as u8,
        (g * 255.0 + 0.5) as u8,
        (b * 255.0 + 0.5) as u8,
        alpha,
    ])
}

fn blend8(back: u8, src: u8, opacity: u8) -> u8 {
    let src_x = src as i32;
    let back_x = back as i32;
    let a = src_x - back_x;
    let b = opacity as i32;
    let t = a * b + 0x80;
    let r = ((t >> 8) + t) >> 8;
    (back_x + r) as u8
}

fn mul_un8(a: i32, b: i32) -> u8 {
    let t = a * b + 0x80;
    (((t >> 8) + t) >> 8) as u8
}

fn div_un8(a: i32, b: i32) -> u8 {
    ((a * 0xff + (b / 2)) / b) as u8
}

#[test]
fn test_blend8() {
    assert_eq!(blend8(0, 0, 255), 0);
    assert_eq!(blend8(0, 255, 255), 255);
    assert_eq!(blend8(255, 0, 255), 0);
    assert_eq!(blend8(0, 255, 0), 0);
    assert_eq!(blend8(0, 255, 128), 128);
    assert_eq!(blend8(128, 255, 255), 255);
    assert_eq!(blend8(128, 255, 128), 192);
}

#[test]
fn test_normal() {
    let back = Rgba([0, 0, 0, 255]);
    let front = Rgba([255, 255, 255, 255]);
    assert_eq!(normal(back, front, 255), front);
    assert_eq!(normal(back, front, 0), back);
    assert_eq!(normal(back, front, 128), Rgba([128, 128, 128, 255]));

    let transparent = Rgba([90, 90, 90, 0]);
    assert_eq!(normal(back, transparent, 255), back);
}

#[test]
fn test_multiply() {
    let back = Rgba([255, 128, 0, 255]);
    let front = Rgba([128, 128, 128, 255]);
    // mul_un8 rounds to nearest, so 128 * 128 lands on 64.
    assert_eq!(multiply(back, front, 255), Rgba([128, 64, 0, 255]));
    // A fully transparent source leaves the backdrop untouched.
    assert_eq!(multiply(back, Rgba([7, 7, 7, 0]), 255), back);
}

#[test]
fn test_divide() {
    let back = Rgba([128, 0, 200, 255]);
    let front = Rgba([64, 64, 100, 255]);
    // b >= s saturates, b == 0 stays black.
    assert_eq!(divide(back, front, 255), Rgba([255, 0, 255, 255]));
}

#[test]
fn test_addition_clamps() {
    let back = Rgba([200, 10, 0, 255]);
    let front = Rgba([100, 10, 0, 255]);
    assert_eq!(addition(back, front, 255), Rgba([255, 20, 0, 255]));
}

#[test]
fn test_subtract_clamps() {
    let back = Rgba([100, 10, 255, 255]);
    let front = Rgba([200, 10, 55, 255]);
    assert_eq!(subtract(back, front, 255), Rgba([0, 0, 200, 255]));
}

#[test]
fn test_hsl_luminosity_gray_source() {
    // A gray source forces the backdrop's luminosity to its own level
    // without shifting hue.
    let back = Rgba([255, 0, 0, 255]);
    let front = Rgba([255, 255, 255, 255]);
    let result = hsl_luminosity(back, front, 255);
    assert_eq!(result[3], 255);
    assert_eq!(result, Rgba([255, 255, 255, 255]));
}

#[test]
fn test_hsl_saturation_gray_source() {
    // A gray source drains all saturation, leaving a gray with the
    // backdrop's luminosity. Pure red carries luminosity 0.3.
    let back = Rgba([255, 0, 0, 255]);
    let front = Rgba([128, 128, 128, 255]);
    assert_eq!(hsl_saturation(back, front, 255), Rgba([77, 77, 77, 255]));
}

#[test]
fn test_keep_backdrop() {
    let back = Rgba([1, 2, 3, 4]);
    let front = Rgba([200, 200, 200, 255]);
    assert_eq!(keep_backdrop(back, front, 255), back);
}
