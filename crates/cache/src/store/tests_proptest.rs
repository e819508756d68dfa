//! Property tests pitting the cache against a plain map.
//!
//! With no leases held by the test, revocation reclaims instantly and every
//! observation reconciles first, so the cache must agree with a `HashMap`
//! that treats revoked keys as removed. Forged notices are thrown in to
//! check they never perturb the state.

use std::collections::HashMap;

use proptest::prelude::*;

use super::*;
use crate::channel::Reclamation;
use crate::handle::HandleId;

#[derive(Debug, Clone)]
enum Op {
    Put(u8, u16),
    Remove(u8),
    Revoke(u8),
    Clear,
    ForgeNotice(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..6_u8, any::<u16>()).prop_map(|(k, v)| Op::Put(k, v)),
        (0..6_u8).prop_map(Op::Remove),
        (0..6_u8).prop_map(Op::Revoke),
        Just(Op::Clear),
        (0..6_u8).prop_map(Op::ForgeNotice),
    ]
}

proptest! {
    #[test]
    fn agrees_with_a_plain_map_when_nothing_is_leased(
        ops in proptest::collection::vec(op_strategy(), 0..64)
    ) {
        let mut cache: Cache<u8, u16> = Cache::new();
        let mut model: HashMap<u8, u16> = HashMap::new();

        for op in ops {
            match op {
                Op::Put(k, v) => {
                    let previous = cache.put(k, v);
                    prop_assert_eq!(previous.as_deref().copied(), model.insert(k, v));
                }
                Op::Remove(k) => {
                    prop_assert_eq!(cache.remove(&k).as_deref().copied(), model.remove(&k));
                }
                Op::Revoke(k) => {
                    prop_assert_eq!(cache.revoke(&k), model.remove(&k).is_some());
                }
                Op::Clear => {
                    cache.clear();
                    model.clear();
                }
                Op::ForgeNotice(k) => {
                    cache.channel.notify(Reclamation {
                        key: k,
                        id: HandleId::next(),
                    });
                }
            }

            prop_assert_eq!(cache.len(), model.len());
            let mut keys = cache.keys();
            keys.sort_unstable();
            let mut expected: Vec<u8> = model.keys().copied().collect();
            expected.sort_unstable();
            prop_assert_eq!(keys, expected);
            for k in 0..6_u8 {
                prop_assert_eq!(
                    cache.get(&k).as_deref().copied(),
                    model.get(&k).copied(),
                    "key {}",
                    k
                );
            }
        }
    }
}
