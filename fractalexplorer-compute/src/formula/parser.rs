//! Recursive descent parser producing an expression tree.
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := power (('*' | '/' | '%' | <implicit>) power)*
//! power      := unary ('**' unary)?
//! unary      := '-' unary | '+' unary | atom
//! atom       := '(' expression ')' | function atom | constant | variable | number
//! ```
//!
//! Implicit multiplication joins a number, variable, constant or `)` with a
//! following variable, constant, function or `(` (and a variable or `)` with a
//! following number), so `2z`, `zc`, `z(z+1)` and `(z)(c)` all multiply.
//!
//! An `e` after a number is an exponent marker only when digits follow it
//! (optionally after a sign): `2e3` and `1.5e-3` are literals, while `2e`,
//! `2ez` and `2e+c` read as Euler's constant times 2 (plus `c`).

use super::functions::{Func, FUNCTION_NAMES};
use super::FormulaError;
use fractalexplorer_core::Complex;

/// Squared magnitude below which a divisor or power base counts as zero.
const ZERO_EPSILON: f64 = 1e-30;

/// Result of dividing by a vanishing value; large enough to escape.
const DIVISION_SENTINEL: Complex = Complex::new(1e15, 1e15);

/// Result of raising zero to a negative power.
const ZERO_NEGATIVE_POWER: Complex = Complex::new(1e10, 0.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Var {
    Z,
    C,
    /// Real part of z
    X,
    /// Imaginary part of z
    Y,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Const(Complex),
    Var(Var),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

impl Expr {
    pub fn eval(&self, z: Complex, c: Complex) -> Complex {
        match self {
            Expr::Const(v) => *v,
            Expr::Var(Var::Z) => z,
            Expr::Var(Var::C) => c,
            Expr::Var(Var::X) => Complex::new(z.re, 0.0),
            Expr::Var(Var::Y) => Complex::new(z.im, 0.0),
            Expr::Neg(inner) => -inner.eval(z, c),
            Expr::Call(func, arg) => func.apply(arg.eval(z, c)),
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(z, c);
                let b = rhs.eval(z, c);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => divide(a, b),
                    BinOp::Rem => remainder(a, b),
                    BinOp::Pow => power(a, b),
                }
            }
        }
    }

    fn is_literal_zero(&self) -> bool {
        match self {
            Expr::Const(v) => *v == Complex::ZERO,
            Expr::Neg(inner) => inner.is_literal_zero(),
            _ => false,
        }
    }
}

fn divide(a: Complex, b: Complex) -> Complex {
    let denom = b.norm_sqr();
    if denom < ZERO_EPSILON {
        return DIVISION_SENTINEL;
    }
    Complex::new(
        (a.re * b.re + a.im * b.im) / denom,
        (a.im * b.re - a.re * b.im) / denom,
    )
}

fn remainder(a: Complex, b: Complex) -> Complex {
    let re = if b.re.abs() > ZERO_EPSILON { a.re % b.re } else { a.re };
    let im = if b.im.abs() > ZERO_EPSILON { a.im % b.im } else { a.im };
    Complex::new(re, im)
}

/// `a ** b` with exact small integer powers.
pub(crate) fn power(a: Complex, b: Complex) -> Complex {
    if a.norm_sqr() < ZERO_EPSILON {
        return if b.re > 0.0 {
            Complex::ZERO
        } else if b.re < 0.0 {
            ZERO_NEGATIVE_POWER
        } else {
            Complex::ONE
        };
    }
    if b.im == 0.0 && (b.re - b.re.round()).abs() < 1e-10 {
        let n = b.re.round();
        if (-20.0..=20.0).contains(&n) {
            return match n as i32 {
                2 => a.square(),
                3 => a.cube(),
                n => a.powi(n),
            };
        }
    }
    (b * a.ln()).exp()
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Num(f64),
    Var(Var),
    Const(Complex),
    Func(Func),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    LParen,
    RParen,
}

impl Token {
    /// Can end an operand, so that a following atom multiplies implicitly.
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Num(_) | Token::Var(_) | Token::Const(_) | Token::RParen
        )
    }

    fn starts_implicit_operand(&self, previous: &Token) -> bool {
        match self {
            Token::Var(_) | Token::Const(_) | Token::Func(_) | Token::LParen => true,
            Token::Num(_) => !matches!(previous, Token::Num(_)),
            _ => false,
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, FormulaError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let ch = bytes[pos];
        let token = match ch {
            b'+' => {
                pos += 1;
                Token::Plus
            }
            b'-' => {
                pos += 1;
                Token::Minus
            }
            b'*' if bytes.get(pos + 1) == Some(&b'*') => {
                pos += 2;
                Token::StarStar
            }
            b'*' => {
                pos += 1;
                Token::Star
            }
            b'/' => {
                pos += 1;
                Token::Slash
            }
            b'%' => {
                pos += 1;
                Token::Percent
            }
            b'(' => {
                pos += 1;
                Token::LParen
            }
            b')' => {
                pos += 1;
                Token::RParen
            }
            b'0'..=b'9' | b'.' => {
                let (value, end) = lex_number(input, pos)?;
                pos = end;
                Token::Num(value)
            }
            b'a'..=b'z' => {
                let (token, end) = lex_word(input, pos)?;
                pos = end;
                token
            }
            _ => {
                let found = input[pos..].chars().next().unwrap_or('\0');
                return Err(FormulaError::UnexpectedChar { pos, found });
            }
        };
        tokens.push((start, token));
    }

    Ok(tokens)
}

fn lex_number(input: &str, start: usize) -> Result<(f64, usize), FormulaError> {
    let bytes = input.as_bytes();
    let mut pos = start;
    let mut seen_dot = false;

    while pos < bytes.len() {
        match bytes[pos] {
            b'0'..=b'9' => pos += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                pos += 1;
            }
            _ => break,
        }
    }

    // Exponent only when digits follow, so `2e` stays `2 * e`
    if pos < bytes.len() && bytes[pos] == b'e' {
        let mut exp_end = pos + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        if bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            pos = exp_end;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }

    let text = &input[start..pos];
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok((value, pos)),
        _ => Err(FormulaError::InvalidNumber(text.to_string())),
    }
}

fn lex_word(input: &str, start: usize) -> Result<(Token, usize), FormulaError> {
    let rest = &input[start..];

    if let Some((name, func)) = FUNCTION_NAMES.iter().find(|(name, _)| rest.starts_with(name)) {
        return Ok((Token::Func(*func), start + name.len()));
    }
    if rest.starts_with("pi") {
        return Ok((Token::Const(Complex::new(std::f64::consts::PI, 0.0)), start + 2));
    }

    let token = match rest.as_bytes()[0] {
        b'z' => Token::Var(Var::Z),
        b'c' => Token::Var(Var::C),
        b'x' => Token::Var(Var::X),
        b'y' => Token::Var(Var::Y),
        b'i' => Token::Const(Complex::I),
        b'e' => Token::Const(Complex::new(std::f64::consts::E, 0.0)),
        _ => {
            let word: String = rest
                .chars()
                .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
                .collect();
            return Err(FormulaError::UnknownIdentifier(word));
        }
    };
    Ok((token, start + 1))
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn previous(&self) -> Option<&Token> {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(p, _)| *p)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expression(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.power()?;
        loop {
            let implicit = match (self.peek(), self.previous()) {
                (Some(next), Some(prev)) => prev.ends_operand() && next.starts_implicit_operand(prev),
                _ => false,
            };
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ if implicit => {
                    let right = self.power()?;
                    left = Expr::Binary(BinOp::Mul, Box::new(left), Box::new(right));
                    continue;
                }
                _ => return Ok(left),
            };
            self.advance();
            let right = self.power()?;
            if matches!(op, BinOp::Div | BinOp::Rem) && right.is_literal_zero() {
                return Err(FormulaError::DivisionByZeroLiteral);
            }
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn power(&mut self) -> Result<Expr, FormulaError> {
        let base = self.unary()?;
        if self.peek() == Some(&Token::StarStar) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Expr, FormulaError> {
        let offset = self.offset();
        match self.advance() {
            None => Err(FormulaError::UnexpectedEnd),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(FormulaError::UnbalancedParens),
                }
            }
            Some(Token::Func(func)) => Ok(Expr::Call(func, Box::new(self.atom()?))),
            Some(Token::Num(value)) => Ok(Expr::Const(Complex::new(value, 0.0))),
            Some(Token::Const(value)) => Ok(Expr::Const(value)),
            Some(Token::Var(var)) => Ok(Expr::Var(var)),
            Some(Token::RParen) => Err(FormulaError::UnbalancedParens),
            Some(other) => Err(FormulaError::UnexpectedChar {
                pos: offset,
                found: operator_char(&other),
            }),
        }
    }
}

fn operator_char(token: &Token) -> char {
    match token {
        Token::Plus => '+',
        Token::Minus => '-',
        Token::Star | Token::StarStar => '*',
        Token::Slash => '/',
        Token::Percent => '%',
        Token::LParen => '(',
        Token::RParen => ')',
        _ => '?',
    }
}

/// Parse normalized formula text into an expression tree.
pub fn parse(input: &str) -> Result<Expr, FormulaError> {
    if input.is_empty() {
        return Err(FormulaError::Empty);
    }
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
    };
    let expr = parser.expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(Token::RParen) => Err(FormulaError::UnbalancedParens),
        Some(_) => Err(FormulaError::TrailingInput(parser.offset())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Z: Complex = Complex::new(0.3, -0.4);
    const C: Complex = Complex::new(-0.7, 0.2);

    fn eval(src: &str) -> Complex {
        parse(src).unwrap().eval(Z, C)
    }

    fn close(a: Complex, b: Complex) -> bool {
        (a.re - b.re).abs() < 1e-12 && (a.im - b.im).abs() < 1e-12
    }

    #[test]
    fn mandelbrot_step() {
        assert!(close(eval("z**2+c"), Z.square() + C));
    }

    #[test]
    fn precedence_mul_over_add() {
        let two = Complex::new(2.0, 0.0);
        assert!(close(eval("c+2*z"), C + two * Z));
        assert!(close(eval("2*z**2+c"), two * Z.square() + C));
    }

    #[test]
    fn unary_minus_binds_to_power_base() {
        // power := unary ('**' unary)?, so -z**2 is (-z)**2
        assert!(close(eval("-z**2"), Z.square()));
    }

    #[test]
    fn implicit_multiplication() {
        let two = Complex::new(2.0, 0.0);
        assert!(close(eval("2z+c"), two * Z + C));
        assert!(close(eval("zc"), Z * C));
        assert!(close(eval("z(z+c)"), Z * (Z + C)));
        assert!(close(eval("(z)(c)"), Z * C));
        assert!(close(eval("2sin(z)"), two * Z.sin()));
        assert!(close(eval("z2"), two * Z));
    }

    #[test]
    fn xy_variables_are_components() {
        let v = eval("x**2-y**2+2*x*y*i+c");
        assert!(close(v, Z.square() + C));
    }

    #[test]
    fn functions_take_an_atom() {
        assert!(close(eval("sin(z)**2"), Z.sin().square()));
        assert!(close(eval("sinz"), Z.sin()));
        assert!(close(eval("log10(z)"), eval("ln(z)/ln(10)")));
    }

    #[test]
    fn longest_function_name_wins() {
        assert!(close(eval("sinh(z)"), Z.sinh()));
        assert!(close(eval("sech(z)"), Complex::ONE.div(Z.cosh())));
        assert!(close(eval("real(z)"), Complex::new(Z.re, 0.0)));
    }

    #[test]
    fn numbers_with_exponents() {
        assert!(close(eval("1.5e-3"), Complex::new(1.5e-3, 0.0)));
        assert!(close(eval("2e"), Complex::new(2.0 * std::f64::consts::E, 0.0)));
        assert!(close(eval("2e3"), Complex::new(2000.0, 0.0)));
    }

    #[test]
    fn bare_exponent_marker_is_euler_constant() {
        let two_e = Complex::new(2.0 * std::f64::consts::E, 0.0);
        assert!(close(eval("2e+c"), two_e + C));
        assert!(close(eval("2e-z"), two_e - Z));
        assert!(close(eval("2ez"), two_e * Z));
        assert!(close(eval(".5"), Complex::new(0.5, 0.0)));
    }

    #[test]
    fn constants() {
        assert!(close(eval("pi"), Complex::new(std::f64::consts::PI, 0.0)));
        assert!(close(eval("i*i"), Complex::new(-1.0, 0.0)));
    }

    #[test]
    fn runtime_division_by_zero_yields_sentinel() {
        let expr = parse("c/(z-z)").unwrap();
        assert_eq!(expr.eval(Z, C), DIVISION_SENTINEL);
    }

    #[test]
    fn modulo_keeps_component_when_divisor_zero() {
        let expr = parse("z%c").unwrap();
        let v = expr.eval(Complex::new(5.5, 3.0), Complex::new(2.0, 0.0));
        assert_eq!(v, Complex::new(1.5, 3.0));
    }

    #[test]
    fn power_of_zero_base() {
        let zero = Complex::ZERO;
        assert_eq!(parse("z**2").unwrap().eval(zero, C), Complex::ZERO);
        assert_eq!(parse("z**-1").unwrap().eval(zero, C), ZERO_NEGATIVE_POWER);
        assert_eq!(parse("z**(2*i)").unwrap().eval(zero, C), Complex::ONE);
    }

    #[test]
    fn fractional_power_uses_exp_log() {
        let v = eval("z**0.5");
        assert!(close(v, Z.sqrt()));
    }

    #[test]
    fn negative_integer_power() {
        assert!(close(eval("z**-2"), Complex::ONE.div(Z.square())));
    }

    #[test]
    fn compile_errors() {
        assert_eq!(parse(""), Err(FormulaError::Empty));
        assert_eq!(parse("(z+c"), Err(FormulaError::UnbalancedParens));
        assert_eq!(parse("z+c)"), Err(FormulaError::UnbalancedParens));
        assert_eq!(parse("z+"), Err(FormulaError::UnexpectedEnd));
        assert_eq!(parse("z/0"), Err(FormulaError::DivisionByZeroLiteral));
        assert_eq!(parse("z%0.0"), Err(FormulaError::DivisionByZeroLiteral));
        assert_eq!(parse("z**2**3"), Err(FormulaError::TrailingInput(4)));
        assert!(matches!(parse("foo(z)"), Err(FormulaError::UnknownIdentifier(_))));
        assert!(matches!(parse("z$c"), Err(FormulaError::UnexpectedChar { pos: 1, found: '$' })));
        assert!(matches!(parse("z+*c"), Err(FormulaError::UnexpectedChar { .. })));
        assert!(matches!(parse("."), Err(FormulaError::InvalidNumber(_))));
    }
}
