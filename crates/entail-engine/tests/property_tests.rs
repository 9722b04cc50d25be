use entail_core::{NodeId, RuleKind, Substitution};
use entail_engine::evidence::{merge_into_slot, FlagNode, FlagNodeSet, RuleUseInfo};
use entail_engine::{firing_decision, Polarity, SupportSet};
use proptest::prelude::*;

/// Unit evidence records with distinct contributing nodes.
fn arb_contributions() -> impl Strategy<Value = Vec<RuleUseInfo>> {
    prop::collection::vec((any::<bool>(), prop::collection::btree_set(0u32..50, 0..4)), 1..6)
        .prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (positive, supports))| {
                    let polarity = if positive {
                        Polarity::Positive
                    } else {
                        Polarity::Negative
                    };
                    let supports: SupportSet = supports.into_iter().map(NodeId).collect();
                    RuleUseInfo {
                        substitution: Substitution::new(),
                        pos: u32::from(positive),
                        neg: u32::from(!positive),
                        flags: FlagNodeSet::singleton(FlagNode::new(
                            NodeId(1_000 + i as u32),
                            supports,
                            polarity,
                        )),
                    }
                })
                .collect()
        })
}

proptest! {
    #[test]
    fn prop_combine_is_commutative(contribs in arb_contributions()) {
        if contribs.len() < 2 {
            return Ok(());
        }
        let a = &contribs[0];
        let b = &contribs[1];
        let ab = a.combine(b).unwrap();
        let ba = b.combine(a).unwrap();
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn prop_combine_is_associative(contribs in arb_contributions()) {
        if contribs.len() < 3 {
            return Ok(());
        }
        let (a, b, c) = (&contribs[0], &contribs[1], &contribs[2]);
        let left = a.combine(b).unwrap().combine(c).unwrap();
        let right = a.combine(&b.combine(c).unwrap()).unwrap();
        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_combine_sums_counts_and_unions_flags(contribs in arb_contributions()) {
        let total_pos: u32 = contribs.iter().map(|r| r.pos).sum();
        let total_neg: u32 = contribs.iter().map(|r| r.neg).sum();

        let mut iter = contribs.iter();
        let mut acc = iter.next().unwrap().clone();
        for rui in iter {
            acc = acc.combine(rui).unwrap();
        }

        prop_assert_eq!(acc.pos, total_pos);
        prop_assert_eq!(acc.neg, total_neg);
        // The flag-set cardinality equals the contributions merged in.
        prop_assert_eq!(acc.flags.len() as u32, acc.pos + acc.neg);

        let mut expected_supports = SupportSet::new();
        for rui in &contribs {
            expected_supports.extend(rui.supports_union());
        }
        prop_assert_eq!(acc.supports_union(), expected_supports);
    }

    /// Aggregation through a slot is order-independent, so the firing
    /// decision cannot depend on arrival order.
    #[test]
    fn prop_firing_decision_is_order_independent(
        contribs in arb_contributions(),
        seed in any::<u64>(),
    ) {
        let mut shuffled = contribs.clone();
        // Cheap deterministic shuffle.
        let len = shuffled.len();
        for i in (1..len).rev() {
            let j = (seed as usize).wrapping_mul(i + 7) % (i + 1);
            shuffled.swap(i, j);
        }

        let mut slot_a = None;
        for rui in &contribs {
            merge_into_slot(&mut slot_a, rui.clone()).unwrap();
        }
        let mut slot_b = None;
        for rui in &shuffled {
            merge_into_slot(&mut slot_b, rui.clone()).unwrap();
        }

        let a = slot_a.unwrap();
        let b = slot_b.unwrap();
        prop_assert_eq!(&a, &b);

        let n = contribs.len();
        for kind in [
            RuleKind::AndEntailment,
            RuleKind::OrEntailment,
            RuleKind::Implication,
            RuleKind::Numerical { min: 1, max: n as u32 },
        ] {
            prop_assert_eq!(
                firing_decision(&kind, n, &a),
                firing_decision(&kind, n, &b)
            );
        }
    }

    #[test]
    fn prop_substitution_merge_is_commutative(
        left in prop::collection::btree_map(0u32..8, 100u32..108, 0..5),
        right in prop::collection::btree_map(0u32..8, 100u32..108, 0..5),
    ) {
        let s1: Substitution = left.into_iter().map(|(v, t)| (NodeId(v), NodeId(t))).collect();
        let s2: Substitution = right.into_iter().map(|(v, t)| (NodeId(v), NodeId(t))).collect();

        prop_assert_eq!(s1.compatible(&s2), s2.compatible(&s1));
        match (s1.merge(&s2), s2.merge(&s1)) {
            (Some(a), Some(b)) => prop_assert_eq!(a, b),
            (None, None) => {}
            _ => prop_assert!(false, "merge succeeded in only one direction"),
        }
    }
}
