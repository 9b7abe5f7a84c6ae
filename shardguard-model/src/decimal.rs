//! Fixed precision/scale normalization for decimal fields.
//!
//! Values are parsed from their decimal text (never through binary floating
//! point), rounded half away from zero to `scale` fractional digits, and
//! rejected if the result needs more than `precision` significant digits.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Precision (total digits) and scale (fractional digits) of a decimal column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecimalSpec {
    pub precision: u32,
    pub scale: u32,
}

/// The precision every decimal field is normalized to: 9 digits, 2 after the point.
pub const MONEY: DecimalSpec = DecimalSpec {
    precision: 9,
    scale: 2,
};

impl DecimalSpec {
    /// Largest number of integral digits a value may have.
    pub fn integral_digits(&self) -> u32 {
        self.precision.saturating_sub(self.scale)
    }

    /// Normalizes a JSON number or numeric string to this spec.
    pub fn normalize(&self, value: &Value) -> Result<Value, String> {
        let text = match value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            other => return Err(format!("expected a decimal number, got {other}")),
        };
        let scaled = self.to_scaled(&text)?;
        let number = Number::from_f64(scaled as f64 / 10f64.powi(self.scale as i32))
            .ok_or_else(|| format!("'{text}' is not a finite number"))?;
        Ok(Value::Number(number))
    }

    /// Parses `text` into an integer count of `10^-scale` units.
    pub fn to_scaled(&self, text: &str) -> Result<i64, String> {
        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(pos) => {
                let exp: i64 = unsigned[pos + 1..]
                    .parse()
                    .map_err(|_| format!("'{text}' has an invalid exponent"))?;
                (&unsigned[..pos], exp)
            }
            None => (unsigned, 0),
        };

        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(format!("'{text}' is not a number"));
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(format!("'{text}' is not a number"));
        }

        let mut digits: Vec<u8> = int_part
            .bytes()
            .chain(frac_part.bytes())
            .map(|b| b - b'0')
            .skip_while(|d| *d == 0)
            .collect();
        if digits.is_empty() {
            return Ok(0);
        }

        // value = digits * 10^(exponent - frac_len); we want digits * 10^shift units.
        let shift = exponent
            .checked_sub(frac_part.len() as i64)
            .and_then(|s| s.checked_add(i64::from(self.scale)));
        let Some(shift) = shift else {
            // Out of i64 range: far too large, or so small it rounds to zero.
            return if exponent > 0 { Err(self.overflow(text)) } else { Ok(0) };
        };
        // Only `precision` digits fit, so any larger shift overflows regardless of the digits.
        if shift > i64::from(self.precision) {
            return Err(self.overflow(text));
        }

        if shift >= 0 {
            digits.extend(std::iter::repeat_n(0, shift as usize));
        } else {
            let drop = usize::try_from(shift.unsigned_abs()).unwrap_or(usize::MAX);
            let round_up = if drop > digits.len() {
                false
            } else {
                digits[digits.len() - drop] >= 5
            };
            digits.truncate(digits.len().saturating_sub(drop));
            if round_up {
                increment(&mut digits);
            }
        }

        if digits.len() > self.precision as usize {
            return Err(self.overflow(text));
        }
        let units = digits.iter().fold(0i64, |acc, d| acc * 10 + i64::from(*d));
        Ok(if negative { -units } else { units })
    }

    fn overflow(&self, text: &str) -> String {
        format!(
            "'{text}' exceeds decimal({},{}): at most {} integral digits",
            self.precision,
            self.scale,
            self.integral_digits()
        )
    }
}

fn increment(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, 1);
}
