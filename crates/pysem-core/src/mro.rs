//! Class MRO computation (C6, §4.4): C3 linearisation, adapted from the
//! teacher's `compute_c3_mro` (`types/class.rs`) over `Weak<ClassMember>`
//! chains instead of heap ids.

use std::sync::{Arc, Weak};

use crate::types::class::ClassMember;

/// Maximum inheritance chain length accepted before giving up and falling
/// back to `[self]` (§4.4 edge case: "reject chains deeper than..." mirrors
/// the teacher's `MAX_INHERITANCE_DEPTH` guard).
const MAX_INHERITANCE_DEPTH: usize = 1_000;

/// C3-linearises `class` given its already-constructed `bases` and installs
/// the result on the class itself (§4.4). Safe to call more than once; only
/// the first call's result sticks (`ClassMember::install_mro`).
///
/// On failure to find a consistent linearisation — or when the bases
/// contain a cycle back to `class` itself — returns `[class]` alone, per
/// §4.4's "single-element fallback" and §7's "recursive MRO returns
/// `[self]` and surfaces a trace-level warning rather than throwing".
pub fn compute_mro(class: &Arc<ClassMember>) -> Vec<Weak<ClassMember>> {
    let bases: Vec<Arc<ClassMember>> = class
        .bases()
        .into_iter()
        .filter_map(|member| match member {
            crate::member::Member::Class(base) => Some(base),
            _ => None,
        })
        .collect();

    if bases.is_empty() {
        let mro = vec![Arc::downgrade(class)];
        class.install_mro(mro.clone());
        return mro;
    }

    if bases.iter().any(|base| Arc::ptr_eq(base, class)) {
        let mro = vec![Arc::downgrade(class)];
        class.install_mro(mro.clone());
        return mro;
    }

    let mut linearizations: Vec<Vec<Arc<ClassMember>>> = Vec::with_capacity(bases.len() + 1);
    for base in &bases {
        let base_mro = base
            .mro()
            .map(|weak_chain| weak_chain.iter().filter_map(Weak::upgrade).collect())
            .unwrap_or_else(|| compute_mro(base).iter().filter_map(Weak::upgrade).collect());
        if base_mro.len() > MAX_INHERITANCE_DEPTH {
            let mro = vec![Arc::downgrade(class)];
            class.install_mro(mro.clone());
            return mro;
        }
        linearizations.push(base_mro);
    }
    linearizations.push(bases.clone());

    let mut result = vec![class.clone()];
    'merge: loop {
        linearizations.retain(|lin| !lin.is_empty());
        if linearizations.is_empty() {
            break;
        }

        let mut found = None;
        for lin in &linearizations {
            let candidate = &lin[0];
            let in_tail = linearizations.iter().any(|other| other[1..].iter().any(|c| Arc::ptr_eq(c, candidate)));
            if !in_tail {
                found = Some(candidate.clone());
                break;
            }
        }

        match found {
            Some(next) => {
                result.push(next.clone());
                for lin in &mut linearizations {
                    if !lin.is_empty() && Arc::ptr_eq(&lin[0], &next) {
                        lin.remove(0);
                    }
                }
            }
            None => {
                // No consistent linearisation exists (§4.4 edge case).
                let mro = vec![Arc::downgrade(class)];
                class.install_mro(mro.clone());
                return mro;
            }
        }

        if result.len() > MAX_INHERITANCE_DEPTH {
            break 'merge;
        }
    }

    let mro: Vec<Weak<ClassMember>> = result.iter().map(Arc::downgrade).collect();
    class.install_mro(mro.clone());
    mro
}
