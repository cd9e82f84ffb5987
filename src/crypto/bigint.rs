//! Arbitrary-precision unsigned integers, sized for RSA.
//!
//! Limbs are `u32`, least significant first, with `u64` intermediates.
//! The representation is kept normalized: no zero limbs at the top, and
//! zero is the empty limb vector.

use std::cmp::Ordering;
use std::fmt;

const LIMB_BITS: u32 = 32;
const BASE: u64 = 1 << LIMB_BITS;

/// Unsigned big integer.
#[derive(Clone, PartialEq, Eq, Default, Hash)]
pub struct BigUint {
    limbs: Vec<u32>,
}

impl BigUint {
    /// The value zero.
    pub fn zero() -> Self {
        Self { limbs: Vec::new() }
    }

    /// The value one.
    pub fn one() -> Self {
        Self::from_u64(1)
    }

    /// Build from a machine integer.
    pub fn from_u64(value: u64) -> Self {
        let mut n = Self {
            limbs: vec![value as u32, (value >> LIMB_BITS) as u32],
        };
        n.normalize();
        n
    }

    /// Build from big-endian bytes. Leading zero bytes are ignored.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        let mut limbs = Vec::with_capacity(bytes.len() / 4 + 1);
        for chunk in bytes.rchunks(4) {
            let mut limb = 0u32;
            for &b in chunk {
                limb = (limb << 8) | u32::from(b);
            }
            limbs.push(limb);
        }
        let mut n = Self { limbs };
        n.normalize();
        n
    }

    /// Minimal big-endian encoding. Zero encodes as an empty vector.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.limbs.len() * 4);
        for limb in self.limbs.iter().rev() {
            out.extend_from_slice(&limb.to_be_bytes());
        }
        let first = out.iter().position(|&b| b != 0).unwrap_or(out.len());
        out.drain(..first);
        out
    }

    /// Big-endian encoding left-padded with zeros to exactly `len` bytes.
    ///
    /// Returns `None` when the value needs more than `len` bytes.
    pub fn to_bytes_be_padded(&self, len: usize) -> Option<Vec<u8>> {
        let bytes = self.to_bytes_be();
        if bytes.len() > len {
            return None;
        }
        let mut out = vec![0u8; len - bytes.len()];
        out.extend_from_slice(&bytes);
        Some(out)
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.limbs.is_empty()
    }

    /// Whether the value is odd.
    pub fn is_odd(&self) -> bool {
        self.limbs.first().map_or(false, |l| l & 1 == 1)
    }

    /// Number of significant bits.
    pub fn bits(&self) -> usize {
        match self.limbs.last() {
            None => 0,
            Some(top) => {
                (self.limbs.len() - 1) * LIMB_BITS as usize
                    + (LIMB_BITS - top.leading_zeros()) as usize
            }
        }
    }

    fn bit(&self, index: usize) -> bool {
        let limb = index / LIMB_BITS as usize;
        let shift = index % LIMB_BITS as usize;
        self.limbs.get(limb).map_or(false, |l| (l >> shift) & 1 == 1)
    }

    fn normalize(&mut self) {
        while self.limbs.last() == Some(&0) {
            self.limbs.pop();
        }
    }

    /// `self + other`.
    pub fn add(&self, other: &BigUint) -> BigUint {
        let (long, short) = if self.limbs.len() >= other.limbs.len() {
            (&self.limbs, &other.limbs)
        } else {
            (&other.limbs, &self.limbs)
        };

        let mut limbs = Vec::with_capacity(long.len() + 1);
        let mut carry = 0u64;
        for (i, &l) in long.iter().enumerate() {
            let s = u64::from(l) + u64::from(short.get(i).copied().unwrap_or(0)) + carry;
            limbs.push(s as u32);
            carry = s >> LIMB_BITS;
        }
        if carry != 0 {
            limbs.push(carry as u32);
        }

        let mut n = BigUint { limbs };
        n.normalize();
        n
    }

    /// `self - other`, or `None` if the result would be negative.
    pub fn checked_sub(&self, other: &BigUint) -> Option<BigUint> {
        if *self < *other {
            return None;
        }

        let mut limbs = Vec::with_capacity(self.limbs.len());
        let mut borrow = 0i64;
        for (i, &l) in self.limbs.iter().enumerate() {
            let mut d = i64::from(l) - i64::from(other.limbs.get(i).copied().unwrap_or(0)) - borrow;
            if d < 0 {
                d += BASE as i64;
                borrow = 1;
            } else {
                borrow = 0;
            }
            limbs.push(d as u32);
        }

        let mut n = BigUint { limbs };
        n.normalize();
        Some(n)
    }

    /// `self * other` (schoolbook).
    pub fn mul(&self, other: &BigUint) -> BigUint {
        if self.is_zero() || other.is_zero() {
            return BigUint::zero();
        }

        let mut limbs = vec![0u32; self.limbs.len() + other.limbs.len()];
        for (i, &x) in self.limbs.iter().enumerate() {
            let mut carry = 0u64;
            for (j, &y) in other.limbs.iter().enumerate() {
                let t = u64::from(x) * u64::from(y) + u64::from(limbs[i + j]) + carry;
                limbs[i + j] = t as u32;
                carry = t >> LIMB_BITS;
            }
            limbs[i + other.limbs.len()] = carry as u32;
        }

        let mut n = BigUint { limbs };
        n.normalize();
        n
    }

    /// Quotient and remainder.
    ///
    /// # Panics
    /// Panics if `divisor` is zero.
    pub fn div_rem(&self, divisor: &BigUint) -> (BigUint, BigUint) {
        assert!(!divisor.is_zero(), "BigUint division by zero");

        if *self < *divisor {
            return (BigUint::zero(), self.clone());
        }

        let (q, r) = if divisor.limbs.len() == 1 {
            div_rem_short(&self.limbs, divisor.limbs[0])
        } else {
            div_rem_knuth(&self.limbs, &divisor.limbs)
        };

        let mut q = BigUint { limbs: q };
        let mut r = BigUint { limbs: r };
        q.normalize();
        r.normalize();
        (q, r)
    }

    /// `self mod modulus`.
    ///
    /// # Panics
    /// Panics if `modulus` is zero.
    pub fn rem(&self, modulus: &BigUint) -> BigUint {
        self.div_rem(modulus).1
    }

    /// `self ^ exponent mod modulus`, left-to-right square-and-multiply.
    ///
    /// Every exponent bit costs one squaring; set bits add a multiply.
    ///
    /// # Panics
    /// Panics if `modulus` is zero.
    pub fn mod_pow(&self, exponent: &BigUint, modulus: &BigUint) -> BigUint {
        assert!(!modulus.is_zero(), "BigUint modulus must be non-zero");

        if *modulus == BigUint::one() {
            return BigUint::zero();
        }

        let base = self.rem(modulus);
        let mut result = BigUint::one();
        for i in (0..exponent.bits()).rev() {
            result = result.mul(&result).rem(modulus);
            if exponent.bit(i) {
                result = result.mul(&base).rem(modulus);
            }
        }
        result
    }
}

impl Ord for BigUint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.limbs
            .len()
            .cmp(&other.limbs.len())
            .then_with(|| self.limbs.iter().rev().cmp(other.limbs.iter().rev()))
    }
}

impl PartialOrd for BigUint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for BigUint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "BigUint(0x0)");
        }
        write!(f, "BigUint(0x{})", hex::encode(self.to_bytes_be()))
    }
}

fn div_rem_short(u: &[u32], d: u32) -> (Vec<u32>, Vec<u32>) {
    let d = u64::from(d);
    let mut q = vec![0u32; u.len()];
    let mut rem = 0u64;
    for i in (0..u.len()).rev() {
        let cur = (rem << LIMB_BITS) | u64::from(u[i]);
        q[i] = (cur / d) as u32;
        rem = cur % d;
    }
    (q, vec![rem as u32])
}

/// Knuth, TAOCP vol. 2, 4.3.1 algorithm D. Requires `v.len() >= 2`
/// and `u >= v`.
fn div_rem_knuth(u: &[u32], v: &[u32]) -> (Vec<u32>, Vec<u32>) {
    let n = v.len();
    let m = u.len() - n;
    let s = v[n - 1].leading_zeros();

    let vn = shl_limbs(v, s, false);
    let mut un = shl_limbs(u, s, true);
    let mut q = vec![0u32; m + 1];

    let v_top = u64::from(vn[n - 1]);
    let v_next = u64::from(vn[n - 2]);

    for j in (0..=m).rev() {
        let num = (u64::from(un[j + n]) << LIMB_BITS) | u64::from(un[j + n - 1]);
        let mut qhat = num / v_top;
        let mut rhat = num % v_top;

        loop {
            if qhat >= BASE || qhat * v_next > (rhat << LIMB_BITS) + u64::from(un[j + n - 2]) {
                qhat -= 1;
                rhat += v_top;
                if rhat < BASE {
                    continue;
                }
            }
            break;
        }

        // Multiply and subtract qhat * vn from un[j..=j+n].
        let mut k = 0i64;
        for i in 0..n {
            let p = qhat * u64::from(vn[i]);
            let t = i64::from(un[i + j]) - k - (p & 0xFFFF_FFFF) as i64;
            un[i + j] = t as u32;
            k = (p >> LIMB_BITS) as i64 - (t >> LIMB_BITS);
        }
        let t = i64::from(un[j + n]) - k;
        un[j + n] = t as u32;

        if t < 0 {
            // qhat was one too large; add the divisor back.
            qhat -= 1;
            let mut carry = 0u64;
            for i in 0..n {
                let s = u64::from(un[i + j]) + u64::from(vn[i]) + carry;
                un[i + j] = s as u32;
                carry = s >> LIMB_BITS;
            }
            un[j + n] = un[j + n].wrapping_add(carry as u32);
        }

        q[j] = qhat as u32;
    }

    let mut r = vec![0u32; n];
    for i in 0..n {
        r[i] = if s == 0 {
            un[i]
        } else {
            (un[i] >> s) | (un[i + 1] << (LIMB_BITS - s))
        };
    }
    (q, r)
}

fn shl_limbs(x: &[u32], shift: u32, extra_limb: bool) -> Vec<u32> {
    let mut out = Vec::with_capacity(x.len() + 1);
    let mut carry = 0u32;
    for &limb in x {
        if shift == 0 {
            out.push(limb);
        } else {
            out.push((limb << shift) | carry);
            carry = limb >> (LIMB_BITS - shift);
        }
    }
    if extra_limb {
        out.push(carry);
    }
    out
}
