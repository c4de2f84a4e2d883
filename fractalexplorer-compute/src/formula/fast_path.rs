//! Closed forms for common formulas, selected on the normalized text.

use super::functions;
use fractalexplorer_core::Complex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FastPath {
    Square,
    Cube,
    Quartic,
    Quintic,
    Sin,
    Cos,
    Tan,
    Exp,
    Sinh,
    Cosh,
    Tanh,
    SquarePlusZ,
    SquareMinusZ,
    SumSquared,
    ConjSquare,
    DoubleC,
    HalfC,
    DoubleSquare,
    SquarePlusCSquared,
    SquarePlusCz,
    TripleC,
    AbsSquare,
    Sqrt,
    Log,
    ZcPlusC,
}

impl FastPath {
    pub const ALL: [FastPath; 25] = [
        FastPath::Square,
        FastPath::Cube,
        FastPath::Quartic,
        FastPath::Quintic,
        FastPath::Sin,
        FastPath::Cos,
        FastPath::Tan,
        FastPath::Exp,
        FastPath::Sinh,
        FastPath::Cosh,
        FastPath::Tanh,
        FastPath::SquarePlusZ,
        FastPath::SquareMinusZ,
        FastPath::SumSquared,
        FastPath::ConjSquare,
        FastPath::DoubleC,
        FastPath::HalfC,
        FastPath::DoubleSquare,
        FastPath::SquarePlusCSquared,
        FastPath::SquarePlusCz,
        FastPath::TripleC,
        FastPath::AbsSquare,
        FastPath::Sqrt,
        FastPath::Log,
        FastPath::ZcPlusC,
    ];

    /// Identify a fast path from normalized formula text.
    pub fn identify(normalized: &str) -> Option<Self> {
        let path = match normalized {
            "z**2+c" | "z*z+c" => FastPath::Square,
            "z**3+c" | "z*z*z+c" => FastPath::Cube,
            "z**4+c" => FastPath::Quartic,
            "z**5+c" => FastPath::Quintic,
            "sin(z)+c" => FastPath::Sin,
            "cos(z)+c" => FastPath::Cos,
            "tan(z)+c" => FastPath::Tan,
            "exp(z)+c" => FastPath::Exp,
            "sinh(z)+c" => FastPath::Sinh,
            "cosh(z)+c" => FastPath::Cosh,
            "tanh(z)+c" => FastPath::Tanh,
            "z**2+z+c" => FastPath::SquarePlusZ,
            "z**2-z+c" => FastPath::SquareMinusZ,
            "(z+c)**2" => FastPath::SumSquared,
            "conj(z)**2+c" => FastPath::ConjSquare,
            "z**2+c*2" | "z**2+2*c" | "z**2+2c" => FastPath::DoubleC,
            "z**2+c/2" | "z**2+0.5*c" => FastPath::HalfC,
            "2*z**2+c" | "2z**2+c" => FastPath::DoubleSquare,
            "z**2+c**2" => FastPath::SquarePlusCSquared,
            "z**2+c*z" | "z**2+z*c" => FastPath::SquarePlusCz,
            "z**2+c*3" | "z**2+3*c" | "z**2+3c" => FastPath::TripleC,
            "abs(z)**2+c" => FastPath::AbsSquare,
            "sqrt(z)+c" => FastPath::Sqrt,
            "log(z)+c" | "ln(z)+c" => FastPath::Log,
            "z*c+c" | "zc+c" => FastPath::ZcPlusC,
            _ => return None,
        };
        Some(path)
    }

    /// Canonical formula text for this path.
    pub fn formula(self) -> &'static str {
        match self {
            FastPath::Square => "z**2+c",
            FastPath::Cube => "z**3+c",
            FastPath::Quartic => "z**4+c",
            FastPath::Quintic => "z**5+c",
            FastPath::Sin => "sin(z)+c",
            FastPath::Cos => "cos(z)+c",
            FastPath::Tan => "tan(z)+c",
            FastPath::Exp => "exp(z)+c",
            FastPath::Sinh => "sinh(z)+c",
            FastPath::Cosh => "cosh(z)+c",
            FastPath::Tanh => "tanh(z)+c",
            FastPath::SquarePlusZ => "z**2+z+c",
            FastPath::SquareMinusZ => "z**2-z+c",
            FastPath::SumSquared => "(z+c)**2",
            FastPath::ConjSquare => "conj(z)**2+c",
            FastPath::DoubleC => "z**2+c*2",
            FastPath::HalfC => "z**2+c/2",
            FastPath::DoubleSquare => "2*z**2+c",
            FastPath::SquarePlusCSquared => "z**2+c**2",
            FastPath::SquarePlusCz => "z**2+c*z",
            FastPath::TripleC => "z**2+c*3",
            FastPath::AbsSquare => "abs(z)**2+c",
            FastPath::Sqrt => "sqrt(z)+c",
            FastPath::Log => "log(z)+c",
            FastPath::ZcPlusC => "z*c+c",
        }
    }

    #[inline]
    pub fn eval(self, z: Complex, c: Complex) -> Complex {
        match self {
            FastPath::Square => z.square() + c,
            FastPath::Cube => z.cube() + c,
            FastPath::Quartic => z.square().square() + c,
            FastPath::Quintic => z.powi(5) + c,
            FastPath::Sin => z.sin() + c,
            FastPath::Cos => z.cos() + c,
            FastPath::Tan => z.tan() + c,
            FastPath::Exp => z.exp() + c,
            FastPath::Sinh => z.sinh() + c,
            FastPath::Cosh => z.cosh() + c,
            FastPath::Tanh => z.tanh() + c,
            FastPath::SquarePlusZ => z.square() + z + c,
            FastPath::SquareMinusZ => z.square() - z + c,
            FastPath::SumSquared => (z + c).square(),
            FastPath::ConjSquare => z.conj().square() + c,
            FastPath::DoubleC => z.square() + c.scale(2.0),
            FastPath::HalfC => z.square() + c.scale(0.5),
            FastPath::DoubleSquare => z.square().scale(2.0) + c,
            FastPath::SquarePlusCSquared => z.square() + c.square(),
            FastPath::SquarePlusCz => z.square() + c * z,
            FastPath::TripleC => z.square() + c.scale(3.0),
            FastPath::AbsSquare => {
                let mag = z.norm();
                Complex::new(mag * mag, 0.0) + c
            }
            FastPath::Sqrt => z.sqrt() + c,
            FastPath::Log => functions::ln(z) + c,
            FastPath::ZcPlusC => z * c + c,
        }
    }
}
