// `InclusiveRange<T>` (§3.2 "InclusiveRange", §4.4).
//
// Construction enforces the contract the spec gives this type:
// `start`/`end`/`step` share one numeric kind, `step` is never zero,
// and its sign must agree with the direction from `start` to `end`.
// `RangeValue` itself is just the closed interval description;
// `RangeIter` walks it, so a `for`-loop over a range doesn't need any
// interpreter-side special casing beyond calling `.iter()`.

use std::cmp::Ordering;

use crate::errors::{Result, ValueError};
use crate::numeric::{Numeric, NumericKind};

#[derive(Clone, Debug)]
pub struct RangeValue {
    pub element_type: NumericKind,
    pub start: Numeric,
    pub end: Numeric,
    pub step: Numeric,
}

impl RangeValue {
    pub fn new(start: Numeric, end: Numeric, step: Option<Numeric>) -> Result<RangeValue> {
        let kind = start.kind();
        if end.kind() != kind {
            return Err(ValueError::InclusiveRangeConstruction("start and end must share a numeric kind").into());
        }
        let step = match step {
            Some(s) => {
                if s.kind() != kind {
                    return Err(ValueError::InclusiveRangeConstruction("step must share start's numeric kind").into());
                }
                s
            }
            None => Numeric::from_i64(kind, 1)
                .map_err(|_| ValueError::InclusiveRangeConstruction("kind has no representable default step"))?,
        };
        if step.as_bigint().sign() == num_bigint::Sign::NoSign {
            return Err(ValueError::InclusiveRangeConstruction("step must not be zero").into());
        }
        let ordering = start.cmp_value(&end).map_err(|_| ValueError::InclusiveRangeConstruction("start and end incomparable"))?;
        let step_is_negative = step.as_bigint().sign() == num_bigint::Sign::Minus;
        match ordering {
            Ordering::Greater if !step_is_negative => {
                return Err(ValueError::InclusiveRangeConstruction("step must be negative when end < start").into());
            }
            Ordering::Less if step_is_negative => {
                return Err(ValueError::InclusiveRangeConstruction("step must be positive when end > start").into());
            }
            _ => {}
        }
        Ok(RangeValue { element_type: kind, start, end, step })
    }

    pub fn contains(&self, value: &Numeric) -> Result<bool> {
        if value.kind() != self.element_type {
            return Ok(false);
        }
        let within = match self.step.as_bigint().sign() {
            num_bigint::Sign::Minus => self.start.cmp_value(value)? != Ordering::Less && value.cmp_value(&self.end)? != Ordering::Less,
            _ => self.start.cmp_value(value)? != Ordering::Greater && value.cmp_value(&self.end)? != Ordering::Greater,
        };
        if !within {
            return Ok(false);
        }
        let delta = value.checked_sub(&self.start)?;
        let remainder = delta.checked_rem(&self.step)?;
        Ok(remainder.as_bigint().sign() == num_bigint::Sign::NoSign)
    }

    pub fn iter(&self) -> RangeIter {
        RangeIter { range: self.clone(), current: Some(self.start.clone()) }
    }
}

pub struct RangeIter {
    range: RangeValue,
    current: Option<Numeric>,
}

impl Iterator for RangeIter {
    type Item = Numeric;

    fn next(&mut self) -> Option<Numeric> {
        let current = self.current.take()?;
        let descending = self.range.step.as_bigint().sign() == num_bigint::Sign::Minus;
        let past_end = if descending {
            current.cmp_value(&self.range.end).map(|o| o == Ordering::Less).unwrap_or(true)
        } else {
            current.cmp_value(&self.range.end).map(|o| o == Ordering::Greater).unwrap_or(true)
        };
        if past_end {
            return None;
        }
        self.current = current.checked_add(&self.range.step).ok();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascending_range_contains_respects_step() {
        let start = Numeric::from_i64(NumericKind::Int8, 0).unwrap();
        let end = Numeric::from_i64(NumericKind::Int8, 10).unwrap();
        let step = Numeric::from_i64(NumericKind::Int8, 2).unwrap();
        let range = RangeValue::new(start, end, Some(step)).unwrap();
        assert!(range.contains(&Numeric::from_i64(NumericKind::Int8, 4).unwrap()).unwrap());
        assert!(!range.contains(&Numeric::from_i64(NumericKind::Int8, 5).unwrap()).unwrap());
    }

    #[test]
    fn zero_step_is_rejected() {
        let start = Numeric::from_i64(NumericKind::Int8, 0).unwrap();
        let end = Numeric::from_i64(NumericKind::Int8, 10).unwrap();
        let step = Numeric::from_i64(NumericKind::Int8, 0).unwrap();
        assert!(RangeValue::new(start, end, Some(step)).is_err());
    }

    #[test]
    fn descending_range_requires_negative_step() {
        let start = Numeric::from_i64(NumericKind::Int8, 10).unwrap();
        let end = Numeric::from_i64(NumericKind::Int8, 0).unwrap();
        assert!(RangeValue::new(start.clone(), end.clone(), None).is_err());
        let step = Numeric::from_i64(NumericKind::Int8, -2).unwrap();
        assert!(RangeValue::new(start, end, Some(step)).is_ok());
    }

    #[test]
    fn iterator_walks_ascending_range() {
        let start = Numeric::from_i64(NumericKind::Int8, 0).unwrap();
        let end = Numeric::from_i64(NumericKind::Int8, 6).unwrap();
        let step = Numeric::from_i64(NumericKind::Int8, 2).unwrap();
        let range = RangeValue::new(start, end, Some(step)).unwrap();
        let values: Vec<i64> = range.iter().map(|n| n.to_i64().unwrap()).collect();
        assert_eq!(values, vec![0, 2, 4, 6]);
    }
}
