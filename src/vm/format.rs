//! Number formatting in the style of C's `%.14g`, which is how scripts see
//! numbers printed.

/// Significant digits shown for numbers.
pub const NUM_PRECISION: i32 = 14;

/// Format a number the way `toString` does.
pub fn num_to_string(num: f64) -> String {
    if num.is_nan() {
        return "nan".to_string();
    }
    if num.is_infinite() {
        return if num > 0.0 { "infinity" } else { "-infinity" }.to_string();
    }
    format_general(num, NUM_PRECISION)
}

/// Multiply `value` by `10^-exponent` without building tiny inexact powers.
fn scale(value: f64, exponent: i32) -> f64 {
    if exponent >= 0 {
        value / 10f64.powi(exponent)
    } else {
        value * 10f64.powi(-exponent)
    }
}

/// Exponent `e` with `10^e <= |num| < 10^(e+1)`, or 0 for zero.
fn decimal_exponent(num: f64) -> i32 {
    let abs = num.abs();
    if abs == 0.0 {
        return 0;
    }
    let mut exponent = abs.log10().floor() as i32;
    while scale(abs, exponent) >= 10.0 {
        exponent += 1;
    }
    while scale(abs, exponent) < 1.0 {
        exponent -= 1;
    }
    exponent
}

/// Integer part and `digits` rounded fractional digits of `value`.
fn split_digits(value: f64, digits: i32) -> (u64, u64) {
    let mut integer = value.trunc() as u64;
    let mask = 10f64.powi(digits);
    let mut fraction = (mask * value.fract()).round();
    if fraction >= mask {
        integer += 1;
        fraction = 0.0;
    }
    (integer, fraction as u64)
}

/// `%.{precision}g`: scientific notation only when the exponent is below -4
/// or at least `precision`; trailing zeros dropped.
pub fn format_general(num: f64, precision: i32) -> String {
    let abs = num.abs();
    let mut exponent = decimal_exponent(num);

    // The rounded scientific mantissa decides the final exponent.
    let (mut integer, mut fraction) = split_digits(scale(abs, exponent), precision - 1);
    if integer == 10 {
        integer = 1;
        exponent += 1;
    }

    let scientific = exponent < -4 || exponent >= precision;
    let digits = if scientific {
        precision - 1
    } else {
        let digits = precision - 1 - exponent;
        (integer, fraction) = split_digits(abs, digits);
        digits
    };

    let mut out = String::new();
    if num.is_sign_negative() {
        out.push('-');
    }
    out.push_str(&integer.to_string());
    if fraction != 0 {
        let frac = fraction.to_string();
        out.push('.');
        for _ in frac.len() as i32..digits {
            out.push('0');
        }
        out.push_str(frac.trim_end_matches('0'));
    }
    if scientific {
        out.push('e');
        out.push(if exponent < 0 { '-' } else { '+' });
        out.push_str(&format!("{:02}", exponent.abs()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_have_no_fraction() {
        assert_eq!(num_to_string(1.0), "1");
        assert_eq!(num_to_string(100.0), "100");
        assert_eq!(num_to_string(0.0), "0");
        assert_eq!(num_to_string(-0.0), "-0");
        assert_eq!(num_to_string(12345678901234.0), "12345678901234");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(num_to_string(1.5), "1.5");
        assert_eq!(num_to_string(0.3), "0.3");
        assert_eq!(num_to_string(0.1 + 0.2), "0.3");
        assert_eq!(num_to_string(1.5707963267948966), "1.5707963267949");
        assert_eq!(num_to_string(0.9999999999999999), "1");
        assert_eq!(num_to_string(-0.25), "-0.25");
        assert_eq!(num_to_string(0.001), "0.001");
    }

    #[test]
    fn test_scientific() {
        assert_eq!(num_to_string(1e20), "1e+20");
        assert_eq!(num_to_string(-9007199254740991.0), "-9.007199254741e+15");
        assert_eq!(num_to_string(0.00001), "1e-05");
        assert_eq!(num_to_string(f64::MAX), "1.7976931348623e+308");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(num_to_string(f64::NAN), "nan");
        assert_eq!(num_to_string(f64::INFINITY), "infinity");
        assert_eq!(num_to_string(f64::NEG_INFINITY), "-infinity");
    }
}
