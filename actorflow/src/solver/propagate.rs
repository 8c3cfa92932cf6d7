//! Bound propagation through structured terms.
//!
//! For `lower <= upper`:
//! - the value of `lower` (variables read at their lower bounds) raises the
//!   lower bounds of the variables in `upper`
//! - the value of `upper` (variables read at their upper bounds) lowers the
//!   upper bounds of the variables in `lower`
//!
//! Arrays, records and functions (arguments and result alike) keep the
//! direction.

use actorflow_types::{LatticeCache, TypeDescriptor};

use super::constraint::Constraint;
use super::variable::TypeVariable;

/// Which bound a variable is read at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Polarity {
    Lower,
    Upper,
}

/// Replace every variable in `term` by one of its bounds.
pub(crate) fn evaluate(
    term: &TypeDescriptor,
    vars: &[TypeVariable],
    polarity: Polarity,
) -> TypeDescriptor {
    match term {
        TypeDescriptor::Unknown(id) => match (vars.get(id.0 as usize), polarity) {
            (Some(var), Polarity::Lower) => var.lower.clone(),
            (Some(var), Polarity::Upper) => var.upper.clone(),
            (None, Polarity::Lower) => TypeDescriptor::Bottom,
            (None, Polarity::Upper) => TypeDescriptor::Top,
        },
        TypeDescriptor::Array(element) => TypeDescriptor::array(evaluate(element, vars, polarity)),
        TypeDescriptor::Record(fields) => {
            TypeDescriptor::Record(fields.map_types(|ty| evaluate(ty, vars, polarity)))
        }
        TypeDescriptor::Function { args, ret } => TypeDescriptor::function(
            args.iter().map(|arg| evaluate(arg, vars, polarity)).collect(),
            evaluate(ret, vars, polarity),
        ),
        other => other.clone(),
    }
}

/// Record `value <= term` in the variables of `term`.
fn push_lower(
    term: &TypeDescriptor,
    value: &TypeDescriptor,
    vars: &mut [TypeVariable],
    cache: &mut LatticeCache<'_>,
) -> bool {
    match (term, value) {
        (TypeDescriptor::Unknown(id), _) => match vars.get_mut(id.0 as usize) {
            Some(var) => {
                let lower = cache.least_upper_bound(&var.lower, value);
                var.raise_lower(lower)
            }
            None => false,
        },
        (TypeDescriptor::Array(t), TypeDescriptor::Array(v)) => push_lower(t, v, vars, cache),
        (TypeDescriptor::Record(tf), TypeDescriptor::Record(vf)) => {
            let mut changed = false;
            for (label, t) in tf.iter() {
                if let Some(v) = vf.get(label) {
                    changed |= push_lower(t, v, vars, cache);
                }
            }
            changed
        }
        (
            TypeDescriptor::Function { args: ta, ret: tr },
            TypeDescriptor::Function { args: va, ret: vr },
        ) if ta.len() == va.len() => {
            let mut changed = false;
            for (t, v) in ta.iter().zip(va) {
                changed |= push_lower(t, v, vars, cache);
            }
            changed | push_lower(tr, vr, vars, cache)
        }
        _ => false,
    }
}

/// Record `term <= value` in the variables of `term`.
fn push_upper(
    term: &TypeDescriptor,
    value: &TypeDescriptor,
    vars: &mut [TypeVariable],
    cache: &mut LatticeCache<'_>,
) -> bool {
    match (term, value) {
        (TypeDescriptor::Unknown(id), _) => match vars.get_mut(id.0 as usize) {
            Some(var) => {
                let upper = cache.greatest_lower_bound(&var.upper, value);
                var.lower_upper(upper)
            }
            None => false,
        },
        (TypeDescriptor::Array(t), TypeDescriptor::Array(v)) => push_upper(t, v, vars, cache),
        (TypeDescriptor::Record(tf), TypeDescriptor::Record(vf)) => {
            let mut changed = false;
            for (label, v) in vf.iter() {
                if let Some(t) = tf.get(label) {
                    changed |= push_upper(t, v, vars, cache);
                }
            }
            changed
        }
        (
            TypeDescriptor::Function { args: ta, ret: tr },
            TypeDescriptor::Function { args: va, ret: vr },
        ) if ta.len() == va.len() => {
            let mut changed = false;
            for (t, v) in ta.iter().zip(va) {
                changed |= push_upper(t, v, vars, cache);
            }
            changed | push_upper(tr, vr, vars, cache)
        }
        _ => false,
    }
}

/// One propagation step for `constraint`; returns true if any bound moved.
pub(crate) fn propagate(
    constraint: &Constraint,
    vars: &mut [TypeVariable],
    cache: &mut LatticeCache<'_>,
) -> bool {
    let mut changed = false;
    for (lower, upper) in constraint.inequalities() {
        let value = evaluate(lower, vars, Polarity::Lower);
        changed |= push_lower(upper, &value, vars, cache);
        let value = evaluate(upper, vars, Polarity::Upper);
        changed |= push_upper(lower, &value, vars, cache);
    }
    changed
}

/// Only the lower-bound half of [`propagate`].
pub(crate) fn propagate_lower(
    constraint: &Constraint,
    vars: &mut [TypeVariable],
    cache: &mut LatticeCache<'_>,
) -> bool {
    let mut changed = false;
    for (lower, upper) in constraint.inequalities() {
        let value = evaluate(lower, vars, Polarity::Lower);
        changed |= push_lower(upper, &value, vars, cache);
    }
    changed
}

/// Only the upper-bound half of [`propagate`].
pub(crate) fn propagate_upper(
    constraint: &Constraint,
    vars: &mut [TypeVariable],
    cache: &mut LatticeCache<'_>,
) -> bool {
    let mut changed = false;
    for (lower, upper) in constraint.inequalities() {
        let value = evaluate(upper, vars, Polarity::Upper);
        changed |= push_upper(lower, &value, vars, cache);
    }
    changed
}

/// Replace every variable in `term` using `lookup`; unknown ids stay.
pub(crate) fn substitute(
    term: &TypeDescriptor,
    lookup: &impl Fn(usize) -> Option<TypeDescriptor>,
) -> TypeDescriptor {
    match term {
        TypeDescriptor::Unknown(id) => lookup(id.0 as usize).unwrap_or_else(|| term.clone()),
        TypeDescriptor::Array(element) => TypeDescriptor::array(substitute(element, lookup)),
        TypeDescriptor::Record(fields) => {
            TypeDescriptor::Record(fields.map_types(|ty| substitute(ty, lookup)))
        }
        TypeDescriptor::Function { args, ret } => TypeDescriptor::function(
            args.iter().map(|arg| substitute(arg, lookup)).collect(),
            substitute(ret, lookup),
        ),
        other => other.clone(),
    }
}
