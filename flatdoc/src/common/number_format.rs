/// Significant digits used by the general number format.
const PRECISION: i32 = 6;

/// Renders a float the way a C stream does by default (`%g` with six
/// significant digits): `30`, `45.5`, `0.333333`, `1.23457e+06`, `1e-05`.
///
/// Equality-index bucket keys are built from this rendering, so it must stay
/// byte-for-byte stable.
pub fn format_general(value: f64) -> String {
    if value.is_nan() {
        let sign = if value.is_sign_negative() { "-" } else { "" };
        return format!("{}nan", sign);
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        let sign = if value.is_sign_negative() { "-" } else { "" };
        return format!("{}0", sign);
    }

    // the exponent must come from the value rounded to PRECISION digits
    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exponent) => (mantissa, exponent),
            Err(_) => return value.to_string(),
        },
        None => return value.to_string(),
    };

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        let fixed = format!("{:.*}", decimals, value);
        trim_fraction(&fixed).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
