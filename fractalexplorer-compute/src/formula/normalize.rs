//! Text-level preparation of user formulas.

/// Canonical formula text: lowercase, no whitespace, `^` as `**`, arrow
/// notation resolved.
pub fn normalize(input: &str) -> String {
    let result: String = input
        .trim()
        .to_lowercase()
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .replace('^', "**");

    if result.contains("->") {
        resolve_arrows(&result)
    } else {
        result
    }
}

/// `x -> e1, y -> e2` (either order) becomes `(e1)+(e2)*i`; `z -> e` becomes `e`.
fn resolve_arrows(formula: &str) -> String {
    if let (Some(x_start), Some(y_start)) = (formula.find("x->"), formula.find("y->")) {
        let parts = if x_start < y_start {
            split_pair(formula, x_start, y_start)
        } else {
            split_pair(formula, y_start, x_start).map(|(y, x)| (x, y))
        };
        if let Some((x_part, y_part)) = parts {
            return format!("({})+({})*i", x_part, y_part);
        }
    }

    match formula.find("->") {
        Some(pos) if pos + 2 < formula.len() => formula[pos + 2..].to_string(),
        _ => formula.to_string(),
    }
}

/// Split `a->e1,b->e2` given the offsets of `a->` and `b->`.
fn split_pair(formula: &str, first: usize, second: usize) -> Option<(&str, &str)> {
    let comma = first + formula[first..].find(',')?;
    if comma <= first + 3 || comma >= second {
        return None;
    }
    let head = &formula[first + 3..comma];
    let tail = &formula[second + 3..];
    if head.is_empty() || tail.is_empty() {
        return None;
    }
    Some((head, tail))
}

const PERP_CELTIC: &str = "(abs(re(z)**2-abs(im(z))**2)+i*2*re(z)*abs(im(z)))+c";
const BURNING_SHIP: &str = "(abs(re(z))+i*abs(im(z)))**2+c";
const BUFFALO_CELTIC: &str = "(abs(abs(re(z))**2-im(z)**2)+i*2*abs(re(z))*im(z))+c";

/// Named fractals that may appear inside a custom formula.
const FRACTAL_NAMES: &[(&str, &str)] = &[
    ("burning_ship", BURNING_SHIP),
    ("burningship", BURNING_SHIP),
    ("perpendicular_celtic", PERP_CELTIC),
    ("perpceltic", PERP_CELTIC),
    ("perpendicular", "(re(z)+i*abs(im(z)))**2+c"),
    ("perp", "(re(z)+i*abs(im(z)))**2+c"),
    ("mandelbrot", "z**2+c"),
    ("tricorn", "conj(z)**2+c"),
    ("buffalo", "(abs(re(z))+i*im(z))**2+c"),
    ("celtic", "(abs(re(z)**2-im(z)**2)+i*2*re(z)*im(z))+c"),
    ("plume", "z**2/(1+abs(z))+c"),
    ("sine", "sin(z)+c"),
    ("magnet", "((z**2+c-1)/(2*z+c-2))**2"),
    ("cosh", "cosh(z)+c"),
    ("sfx", "z*abs(z)**2-z*c**2"),
];

/// Replace fractal names inside a formula with their formulas.
///
/// Combinations (perp + celtic, perp + buffalo, buffalo + celtic) resolve to
/// the combined fractal. Otherwise each standalone name is replaced; a name
/// used as a function call, such as `cosh(z)`, is left alone.
pub fn preprocess_fractal_names(formula: &str) -> String {
    let compact: String = formula
        .trim()
        .to_lowercase()
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect();

    if compact.contains("perp") && compact.contains("celtic") {
        return PERP_CELTIC.to_string();
    }
    if compact.contains("perp") && compact.contains("buffalo") {
        return BURNING_SHIP.to_string();
    }
    if compact.contains("buffalo") && compact.contains("celtic") {
        return BUFFALO_CELTIC.to_string();
    }

    let mut out = String::with_capacity(compact.len());
    let bytes = compact.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let ch = bytes[i];
        if ch.is_ascii_alphabetic() || ch == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphabetic() || bytes[i] == b'_') {
                i += 1;
            }
            let word = &compact[start..i];
            let is_call = bytes.get(i) == Some(&b'(');
            match FRACTAL_NAMES.iter().find(|(name, _)| *name == word) {
                Some((_, replacement)) if !is_call => out.push_str(replacement),
                _ => out.push_str(word),
            }
        } else {
            let len = compact[i..].chars().next().map_or(1, char::len_utf8);
            out.push_str(&compact[i..i + len]);
            i += len;
        }
    }
    out
}

/// Exponent for smooth colouring: `N` from the first `z**N`, 3 for `z*z*z`,
/// otherwise 2.
pub fn extract_power(formula: &str) -> f64 {
    let f = normalize(formula);
    if let Some(idx) = f.find("z**") {
        let digits: String = f[idx + 3..]
            .chars()
            .take_while(|ch| ch.is_ascii_digit() || *ch == '.')
            .collect();
        if !digits.is_empty() {
            return digits.parse().unwrap_or(2.0);
        }
    }
    if f.contains("z*z*z") {
        return 3.0;
    }
    2.0
}

/// Whether the formula adds `c` itself (`+c`, `-c`, or a trailing `c` that is
/// not an exponent). Formulas that do not add `c` start iterating at `c`.
pub fn adds_c(formula: &str) -> bool {
    let f = normalize(formula);
    f.contains("+c") || f.contains("-c") || (f.ends_with('c') && !f.ends_with("**c"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_spaces_and_caret() {
        assert_eq!(normalize("  Z^2 + C "), "z**2+c");
    }

    #[test]
    fn normalize_resolves_single_arrow() {
        assert_eq!(normalize("z -> z^3 + c"), "z**3+c");
    }

    #[test]
    fn normalize_resolves_xy_arrows_in_either_order() {
        assert_eq!(normalize("x -> x*x - y*y, y -> 2*x*y"), "(x*x-y*y)+(2*x*y)*i");
        assert_eq!(normalize("y -> 2*x*y, x -> x*x - y*y"), "(x*x-y*y)+(2*x*y)*i");
    }

    #[test]
    fn normalize_keeps_dangling_arrow() {
        assert_eq!(normalize("z->"), "z->");
    }

    #[test]
    fn preprocess_replaces_single_name() {
        assert_eq!(preprocess_fractal_names("Mandelbrot"), "z**2+c");
        assert_eq!(preprocess_fractal_names("burning_ship"), BURNING_SHIP);
        assert_eq!(preprocess_fractal_names("perp"), "(re(z)+i*abs(im(z)))**2+c");
    }

    #[test]
    fn preprocess_resolves_combinations_first() {
        assert_eq!(preprocess_fractal_names("perp + celtic"), PERP_CELTIC);
        assert_eq!(preprocess_fractal_names("celtic+perpendicular"), PERP_CELTIC);
        assert_eq!(preprocess_fractal_names("perp+buffalo"), BURNING_SHIP);
        assert_eq!(preprocess_fractal_names("buffalo celtic"), BUFFALO_CELTIC);
    }

    #[test]
    fn preprocess_leaves_function_calls_alone() {
        assert_eq!(preprocess_fractal_names("cosh(z)+c"), "cosh(z)+c");
        assert_eq!(preprocess_fractal_names("cosh"), "cosh(z)+c");
        assert_eq!(preprocess_fractal_names("sin(z)+c"), "sin(z)+c");
    }

    #[test]
    fn extract_power_reads_exponent() {
        assert_eq!(extract_power("z^3 + c"), 3.0);
        assert_eq!(extract_power("z**2.5+c"), 2.5);
        assert_eq!(extract_power("z*z*z+c"), 3.0);
        assert_eq!(extract_power("sin(z)+c"), 2.0);
    }

    #[test]
    fn adds_c_detection() {
        assert!(adds_c("z^2 + c"));
        assert!(adds_c("z*z - c"));
        assert!(adds_c("z*c"));
        assert!(!adds_c("z**c"));
        assert!(adds_c("((z**2+c-1)/(2*z+c-2))**2"));
        assert!(!adds_c("sin(z)*z"));
    }
}
