//! Fixed-point trigonometry and interpolation helpers shared by the
//! animation, track and action code.
//!
//! Angles live on a 1024-unit circle. The sine table peaks at `0x7FFF`, and
//! products are truncated to their high word the way the game's
//! assembly did it, so results can differ from exact trigonometry by one
//! unit.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Units in a full turn.
pub const ANGLE_UNITS: i32 = 0x400;

static SINE_TABLE: Lazy<[i32; 1024]> = Lazy::new(|| {
    let mut table = [0i32; 1024];
    for (index, entry) in table.iter_mut().enumerate() {
        let radians = index as f64 * std::f64::consts::TAU / 1024.0;
        *entry = (radians.sin() * 32767.0).round() as i32;
    }
    table
});

pub fn sine(angle: i32) -> i32 {
    SINE_TABLE[(angle & 0x3FF) as usize]
}

pub fn cosine(angle: i32) -> i32 {
    SINE_TABLE[((angle + 0x100) & 0x3FF) as usize]
}

/// Rotates the `(y, z)` pair by `angle`, returning `(x_out, y_out)` in the
/// order the game's routine wrote its outputs.
pub fn rotate(angle: i32, y: i32, z: i32) -> (i32, i32) {
    if angle == 0 {
        return (z, y);
    }
    let s = sine(angle);
    let c = cosine(angle);
    let high = |value: i32| value.wrapping_shl(1) & (0xFFFF_0000u32 as i32);
    let y_out = (high(c.wrapping_mul(y)).wrapping_sub(high(s.wrapping_mul(z)))) >> 16;
    let x_out = (high(s.wrapping_mul(y)).wrapping_add(high(c.wrapping_mul(z)))) >> 16;
    (x_out, y_out)
}

/// Turns a model-local `(x, z)` displacement by the heading `angle`.
/// Models face local -Z, so a forward walk has a negative `forward`.
/// Returns `[dx, dz]`.
pub fn walk_step(side: i32, forward: i32, angle: i32) -> [i32; 2] {
    let (move_z, move_x) = rotate(angle, side, forward);
    [move_x, move_z]
}

/// Manhattan distance on the ground plane, saturating to `0x7D00` the way the
/// game's 16-bit accumulator did.
pub fn distance_to_point(x1: i32, z1: i32, x2: i32, z2: i32) -> i32 {
    let fold = |delta: i32| {
        if (delta as i16) < 0 {
            -i32::from(delta as i16)
        } else {
            delta
        }
    };
    let dx = fold(x1.wrapping_sub(x2));
    let dz = fold(z1.wrapping_sub(z2));
    if dx + dz > 0xFFFF {
        0x7D00
    } else {
        dx + dz
    }
}

/// Linear rule of three: where `x1 + (x2 - x1)` sits once `y2` of `y1`
/// has elapsed.
pub fn make_proportional(x1: i32, x2: i32, y1: i32, y2: i32) -> i32 {
    if y1 == 0 {
        return x1;
    }
    x1 + (x2 - x1) * y2 / y1
}

/// A value travelling from `old_value` to `new_value` over `param` timer
/// ticks, started at `time_of_rotate`. `param == 0` means at rest and
/// `param == -1` asks for the target value on the next read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpolatedValue {
    pub old_value: i16,
    pub new_value: i16,
    pub param: i16,
    pub time_of_rotate: u32,
}

impl InterpolatedValue {
    pub fn init(&mut self, old_value: i32, new_value: i32, param: i32, timer: u32) {
        self.old_value = old_value as i16;
        self.new_value = new_value as i16;
        self.param = param as i16;
        self.time_of_rotate = timer;
    }

    pub fn is_at_rest(&self) -> bool {
        self.param == 0
    }

    /// Angle read-out: interpolates along the shorter arc of the circle.
    pub fn update_rotation(&mut self, timer: u32) -> i32 {
        if self.param == 0 {
            return i32::from(self.new_value);
        }
        let elapsed = timer.wrapping_sub(self.time_of_rotate) as i32;
        let param = i32::from(self.param);
        if elapsed > param {
            self.param = 0;
            return i32::from(self.new_value);
        }
        let old = i32::from(self.old_value) & 0x3FF;
        let new = i32::from(self.new_value) & 0x3FF;
        let diff = new - old;
        if diff > 0x200 {
            (new - (old + ANGLE_UNITS)) * elapsed / param + old
        } else if diff < -0x200 {
            old + (new + ANGLE_UNITS - old) * elapsed / param
        } else {
            old + diff * elapsed / param
        }
    }

    /// Plain linear read-out used for speeds and vertical motion.
    pub fn evaluate(&mut self, timer: u32) -> i32 {
        if self.param == 0 {
            return i32::from(self.new_value);
        }
        let elapsed = timer.wrapping_sub(self.time_of_rotate);
        if elapsed > i32::from(self.param) as u32 {
            self.param = 0;
            return i32::from(self.new_value);
        }
        let param = i32::from(self.param);
        (i32::from(self.new_value) - i32::from(self.old_value)) * elapsed as i32 / param
            + i32::from(self.old_value)
    }
}

/// Elapsed timer ticks since `chrono` was started.
pub fn eval_chrono(chrono: u32, timer: u32) -> u32 {
    timer.wrapping_sub(chrono)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_table_peaks() {
        assert_eq!(sine(0), 0);
        assert_eq!(sine(0x100), 0x7FFF);
        assert_eq!(cosine(0), 0x7FFF);
        assert_eq!(sine(0x300), -0x7FFF);
        assert_eq!(sine(0x500), sine(0x100));
    }

    #[test]
    fn rotate_quarter_turns() {
        assert_eq!(rotate(0, 7, 100), (100, 7));
        let (x, y) = rotate(0x100, 0, 1000);
        assert!((y + 1000).abs() <= 1);
        assert!(x.abs() <= 1);
        let (x, y) = rotate(0x200, 0, 1000);
        assert!(y.abs() <= 1);
        assert!((x + 1000).abs() <= 1);
    }

    #[test]
    fn walk_step_forward_follows_heading() {
        assert_eq!(walk_step(0, 100, 0), [0, 100]);
        let [dx, dz] = walk_step(0, 100, 0x100);
        assert!(dx == -100 || dx == -99);
        assert!(dz.abs() <= 1);
    }

    #[test]
    fn distance_saturates() {
        assert_eq!(distance_to_point(1000, 5000, 1000, 1000), 4000);
        assert_eq!(distance_to_point(-200, 0, 100, -50), 350);
        assert_eq!(distance_to_point(70000, 0, 0, 0), 0x7D00);
    }

    #[test]
    fn rotation_takes_short_arc_across_zero() {
        let mut value = InterpolatedValue::default();
        value.init(1020, 4, 8, 100);
        assert_eq!(value.update_rotation(100), 1020);
        assert_eq!(value.update_rotation(104), 1024);
        assert_eq!(value.update_rotation(106) & 0x3FF, 2);
        assert_eq!(value.update_rotation(109), 4);
        assert!(value.is_at_rest());

        value.init(4, 1020, 8, 0);
        assert_eq!(value.update_rotation(4), 0);
    }

    #[test]
    fn rotation_within_half_turn_is_linear() {
        let mut value = InterpolatedValue::default();
        value.init(0, 0x200, 10, 0);
        assert_eq!(value.update_rotation(5), 0x100);
        value.init(0, 0x201, 10, 0);
        assert_eq!(value.update_rotation(5), -0xFF);
    }

    #[test]
    fn evaluate_snaps_when_expired_or_sentinel() {
        let mut value = InterpolatedValue::default();
        value.init(0, 2000, 40, 10);
        assert_eq!(value.evaluate(30), 1000);
        assert_eq!(value.evaluate(51), 2000);
        assert!(value.is_at_rest());
        assert_eq!(make_proportional(0, 100, 10, 5), 50);
        assert_eq!(make_proportional(3, 100, 0, 5), 3);
    }
}
