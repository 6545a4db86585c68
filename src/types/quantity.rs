use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Numeric value of a Kubernetes quantity string (`250m`, `1Gi`, `1e3`).
///
/// The API server canonicalises quantities on write (`1000m` comes back as
/// `1`), so comparisons go through this instead of string equality.
/// Returns `None` for anything that is not a well-formed quantity.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(raw.len());
    let (number, suffix) = raw.split_at(split);
    if number.is_empty() {
        return None;
    }
    let number: f64 = number.parse().ok()?;

    let multiplier = match suffix {
        "" => 1.0,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024f64,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        exp if exp.starts_with(['e', 'E']) => {
            let exponent: i32 = exp[1..].parse().ok()?;
            10f64.powi(exponent)
        }
        _ => return None,
    };

    Some(number * multiplier)
}

/// Present, well-formed and not zero. The sign is not checked.
pub fn is_non_zero(quantity: Option<&Quantity>) -> bool {
    matches!(quantity.and_then(|q| parse_quantity(&q.0)), Some(v) if v != 0.0)
}

/// Compares two quantities by value; malformed strings fall back to exact
/// string comparison.
pub fn same_quantity(a: &Quantity, b: &Quantity) -> bool {
    match (parse_quantity(&a.0), parse_quantity(&b.0)) {
        (Some(x), Some(y)) => (x - y).abs() <= f64::EPSILON * x.abs().max(y.abs()).max(1.0),
        _ => a.0 == b.0,
    }
}
