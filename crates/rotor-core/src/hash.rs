//! Deterministic state hashing.
//!
//! Uses FNV-1a over a canonical walk of the state (insertion order for
//! every map). Not cryptographically secure: it exists to compare runs
//! for bit-for-bit reproducibility.

use crate::id::SimTime;
use crate::model::{Pool, Unit};
use crate::state::SimState;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
fn fnv1a_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

#[inline]
fn fnv1a_u32(hash: u64, v: u32) -> u64 {
    fnv1a_bytes(hash, &v.to_le_bytes())
}

#[inline]
fn fnv1a_u64(hash: u64, v: u64) -> u64 {
    fnv1a_bytes(hash, &v.to_le_bytes())
}

/// Strings are length-prefixed so that `"ab" + "c"` and `"a" + "bc"` differ.
#[inline]
fn fnv1a_str(hash: u64, s: &str) -> u64 {
    fnv1a_bytes(fnv1a_u64(hash, s.len() as u64), s.as_bytes())
}

#[inline]
fn fnv1a_time(hash: u64, t: SimTime) -> u64 {
    fnv1a_u64(hash, t.0)
}

fn fnv1a_pool(hash: u64, pool: &Pool) -> u64 {
    fnv1a_u64(fnv1a_u64(hash, pool.current), pool.max)
}

fn fnv1a_unit(mut hash: u64, unit: &Unit) -> u64 {
    hash = fnv1a_str(hash, unit.id.as_str());
    hash = fnv1a_pool(hash, &unit.health);
    hash = fnv1a_pool(hash, &unit.power);
    hash = fnv1a_u64(hash, unit.position.x.to_bits());
    hash = fnv1a_u64(hash, unit.position.y.to_bits());
    hash = fnv1a_time(hash, unit.gcd_ready_at);
    hash = fnv1a_u64(hash, unit.damage_done);

    match &unit.casting {
        Some(cast) => {
            hash = fnv1a_byte(hash, 1);
            hash = fnv1a_u32(hash, cast.spell.0);
            hash = fnv1a_time(hash, cast.completes_at);
        }
        None => hash = fnv1a_byte(hash, 0),
    }

    hash = fnv1a_u64(hash, unit.spells.len() as u64);
    for (id, spell) in &unit.spells {
        hash = fnv1a_u32(hash, id.0);
        hash = fnv1a_u32(hash, spell.charges);
        hash = fnv1a_time(hash, spell.cooldown_expiry);
    }

    hash = fnv1a_u64(hash, unit.auras.len() as u64);
    for (id, aura) in &unit.auras {
        hash = fnv1a_u32(hash, id.0);
        hash = fnv1a_u32(hash, aura.stacks);
        hash = fnv1a_time(hash, aura.expires_at);
    }

    for talent in &unit.talents {
        hash = fnv1a_u32(hash, talent.0);
    }
    hash
}

/// Hash every simulation-relevant value in `state`.
///
/// Two runs with the same inputs and seed must produce the same hash.
/// Static metadata and modifier identity are not hashed.
pub fn state_hash(state: &SimState) -> u64 {
    let mut hash = FNV_OFFSET;
    hash = fnv1a_time(hash, state.current_time);
    hash = fnv1a_u64(hash, state.iteration_count);

    hash = fnv1a_u64(hash, state.units.len() as u64);
    for unit in state.units.values() {
        hash = fnv1a_unit(hash, unit);
    }

    hash = fnv1a_u64(hash, state.projectiles.len() as u64);
    for (id, p) in &state.projectiles {
        hash = fnv1a_u64(hash, id.0);
        hash = fnv1a_str(hash, p.target.as_str());
        hash = fnv1a_u64(hash, p.damage);
        hash = fnv1a_time(hash, p.impact_at);
    }
    hash
}
