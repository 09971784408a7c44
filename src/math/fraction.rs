// Exact rational numbers over BigInt.
//
// Ratios and tolerances are never compared as floats: equality and ordering
// go through cross-multiplication, so a ratio sitting exactly on the
// tolerance boundary is classified the same way every time.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use rust_decimal::Decimal;

/// `num / den` with `den > 0`. Not reduced eagerly; `reduced()` normalizes.
#[derive(Clone, Debug)]
pub struct Fraction {
    num: BigInt,
    den: BigInt,
}

impl Fraction {
    /// Returns `None` for a zero denominator.
    pub fn new(num: BigInt, den: BigInt) -> Option<Self> {
        if den.is_zero() {
            return None;
        }
        if den.is_negative() {
            Some(Self { num: -num, den: -den })
        } else {
            Some(Self { num, den })
        }
    }

    pub fn from_integer(v: BigInt) -> Self {
        Self { num: v, den: BigInt::one() }
    }

    pub fn zero() -> Self {
        Self::from_integer(BigInt::zero())
    }

    pub fn one() -> Self {
        Self::from_integer(BigInt::one())
    }

    /// Exact conversion: a Decimal is `mantissa / 10^scale`.
    pub fn from_decimal(d: Decimal) -> Self {
        let num = BigInt::from(d.mantissa());
        let den = BigInt::from(10u8).pow(d.scale());
        Self { num, den }
    }

    pub fn numerator(&self) -> &BigInt {
        &self.num
    }

    pub fn denominator(&self) -> &BigInt {
        &self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.num.is_negative()
    }

    pub fn abs(&self) -> Self {
        Self { num: self.num.abs(), den: self.den.clone() }
    }

    /// `None` when the fraction is zero.
    pub fn invert(&self) -> Option<Self> {
        Self::new(self.den.clone(), self.num.clone())
    }

    /// Floor of the value (rounds toward negative infinity).
    pub fn floor(&self) -> BigInt {
        self.num.div_floor(&self.den)
    }

    pub fn reduced(&self) -> Self {
        let g = self.num.gcd(&self.den);
        if g.is_zero() || g.is_one() {
            return self.clone();
        }
        Self { num: &self.num / &g, den: &self.den / &g }
    }

    /// Lossy, reporting only.
    pub fn to_f64(&self) -> f64 {
        let n = self.num.to_f64().unwrap_or(0.0);
        let d = self.den.to_f64().unwrap_or(1.0);
        if d == 0.0 || !n.is_finite() || !d.is_finite() {
            // huge operands: scale both down before converting
            let shift = self.den.bits().max(self.num.bits()).saturating_sub(1000);
            let n = (&self.num >> shift).to_f64().unwrap_or(0.0);
            let d = (&self.den >> shift).to_f64().unwrap_or(1.0);
            return if d == 0.0 { 0.0 } else { n / d };
        }
        n / d
    }

    pub fn mul_int(&self, v: &BigInt) -> Self {
        Self { num: &self.num * v, den: self.den.clone() }
    }
}

impl PartialEq for Fraction {
    fn eq(&self, other: &Self) -> bool {
        &self.num * &other.den == &other.num * &self.den
    }
}

impl Eq for Fraction {}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.num * &other.den).cmp(&(&other.num * &self.den))
    }
}

impl Add for &Fraction {
    type Output = Fraction;
    fn add(self, rhs: &Fraction) -> Fraction {
        Fraction {
            num: &self.num * &rhs.den + &rhs.num * &self.den,
            den: &self.den * &rhs.den,
        }
    }
}

impl Sub for &Fraction {
    type Output = Fraction;
    fn sub(self, rhs: &Fraction) -> Fraction {
        Fraction {
            num: &self.num * &rhs.den - &rhs.num * &self.den,
            den: &self.den * &rhs.den,
        }
    }
}

impl Mul for &Fraction {
    type Output = Fraction;
    fn mul(self, rhs: &Fraction) -> Fraction {
        Fraction { num: &self.num * &rhs.num, den: &self.den * &rhs.den }
    }
}

/// Panics on division by zero, like integer division. Callers check
/// `is_zero()` first or use `invert()`.
impl Div for &Fraction {
    type Output = Fraction;
    fn div(self, rhs: &Fraction) -> Fraction {
        assert!(!rhs.is_zero(), "division by zero fraction");
        Fraction::new(&self.num * &rhs.den, &self.den * &rhs.num)
            .unwrap_or_else(Fraction::zero)
    }
}

impl Neg for Fraction {
    type Output = Fraction;
    fn neg(self) -> Fraction {
        Fraction { num: -self.num, den: self.den }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.reduced();
        write!(f, "{}/{}", r.num, r.den)
    }
}
