//! Algebraic properties of the delta engine over generated snapshots.

use proptest::prelude::*;

use object_delta::{
    apply, decode, diff, encode, is_equivalent, ContainerValue, DiffOptions, ItemDefinition,
    ItemDeltaBuilder, ItemKind, ItemPath, NoDefinitions, ObjectDelta, ObjectSnapshot, QName,
    ScalarType, StaticRegistry, Value,
};

fn name(local: &str) -> QName {
    QName::qualified("c", local)
}

fn registry() -> StaticRegistry {
    StaticRegistry::new()
        .with_definition(
            name("UserType"),
            &ItemPath::of_name(name("givenName")),
            ItemDefinition::new(name("givenName"), ItemKind::Property)
                .single_valued()
                .typed(ScalarType::String),
        )
        .with_definition(
            name("UserType"),
            &ItemPath::of_name(name("mail")),
            ItemDefinition::new(name("mail"), ItemKind::Property).typed(ScalarType::String),
        )
        .with_definition(
            name("UserType"),
            &ItemPath::of_name(name("assignment")).append_name(name("name")),
            ItemDefinition::new(name("name"), ItemKind::Property)
                .single_valued()
                .typed(ScalarType::String),
        )
}

fn assignment(id: Option<i64>, label: &str) -> ContainerValue {
    let mut cv = ContainerValue::new(id);
    cv.ensure_item(&name("name"), ItemKind::Property)
        .add_value(Value::scalar(label));
    cv
}

/// Snapshot shape: optional single-valued given name, a multi-valued mail
/// set, up to three id-carrying assignments, and up to two id-less ones.
fn arb_snapshot() -> impl Strategy<Value = ObjectSnapshot> {
    let given = proptest::option::of(prop_oneof![Just("Jack"), Just("Joe"), Just("Jim")]);
    let mails = proptest::sample::subsequence(vec!["a@x", "b@x", "c@x", "d@x"], 0..=4);
    let ided = (
        proptest::option::of(prop_oneof![Just("A"), Just("A2")]),
        proptest::option::of(prop_oneof![Just("B"), Just("B2")]),
        proptest::option::of(prop_oneof![Just("C"), Just("C2")]),
    );
    let idless = proptest::sample::subsequence(vec!["x", "y"], 0..=2);
    (given, mails, ided, idless).prop_map(|(given, mails, (a, b, c), idless)| {
        let mut snapshot = ObjectSnapshot::new(name("UserType")).with_oid("u-1");
        if let Some(given) = given {
            snapshot
                .root
                .ensure_item(&name("givenName"), ItemKind::Property)
                .add_value(Value::scalar(given));
        }
        if !mails.is_empty() {
            let item = snapshot.root.ensure_item(&name("mail"), ItemKind::Property);
            for mail in mails {
                item.add_value(Value::scalar(mail));
            }
        }
        let assignments: Vec<ContainerValue> = [(1, a), (2, b), (3, c)]
            .into_iter()
            .filter_map(|(id, label)| label.map(|l| assignment(Some(id), l)))
            .chain(idless.into_iter().map(|l| assignment(None, l)))
            .collect();
        if !assignments.is_empty() {
            let item = snapshot
                .root
                .ensure_item(&name("assignment"), ItemKind::Container);
            for cv in assignments {
                item.add_value(Value::Container(cv));
            }
        }
        snapshot
    })
}

proptest! {
    /// `diff(A, A)` is empty, and emptiness agrees with `is_equivalent`.
    #[test]
    fn diff_self_is_empty(a in arb_snapshot()) {
        let delta = diff(&a, &a, &DiffOptions::default());
        prop_assert!(delta.is_empty());
        prop_assert!(is_equivalent(&a, &a));
    }

    /// Applying `diff(A, B)` to A yields a snapshot equivalent to B.
    #[test]
    fn diff_apply_round_trip(a in arb_snapshot(), b in arb_snapshot()) {
        let delta = diff(&a, &b, &DiffOptions::default());
        prop_assert_eq!(delta.is_empty(), is_equivalent(&a, &b));
        let mut target = a.clone();
        apply(&delta, &mut target, &NoDefinitions).unwrap();
        prop_assert!(is_equivalent(&target, &b));
    }

    /// A modify delta is idempotent: applying it twice equals applying once.
    #[test]
    fn apply_is_idempotent(a in arb_snapshot(), b in arb_snapshot()) {
        let delta = diff(&a, &b, &DiffOptions::default());
        let mut once = a.clone();
        apply(&delta, &mut once, &NoDefinitions).unwrap();
        let mut twice = once.clone();
        apply(&delta, &mut twice, &NoDefinitions).unwrap();
        prop_assert!(is_equivalent(&once, &twice));
    }

    /// Going there and back returns to the starting snapshot.
    #[test]
    fn diff_symmetry(a in arb_snapshot(), b in arb_snapshot()) {
        let there = diff(&a, &b, &DiffOptions::default());
        let back = diff(&b, &a, &DiffOptions::default());
        let mut target = a.clone();
        apply(&there, &mut target, &NoDefinitions).unwrap();
        apply(&back, &mut target, &NoDefinitions).unwrap();
        prop_assert!(is_equivalent(&target, &a));
    }

    /// Wire round-trip is the identity on deltas whose items have
    /// resolvable definitions.
    #[test]
    fn wire_round_trip(a in arb_snapshot(), b in arb_snapshot()) {
        let delta = diff(&a, &b, &DiffOptions::default());
        let wire = encode(&delta);
        let decoded = decode(&wire, Some(&registry())).unwrap();
        prop_assert_eq!(decoded, delta);
    }

    /// With disjoint add and delete sets, the internal application order of
    /// add vs. delete does not matter.
    #[test]
    fn add_delete_commute_when_disjoint(
        adds in proptest::sample::subsequence(vec!["a@x", "b@x"], 0..=2),
        deletes in proptest::sample::subsequence(vec!["c@x", "d@x"], 0..=2),
        existing in proptest::sample::subsequence(vec!["e@x", "f@x"], 0..=2),
    ) {
        let path = ItemPath::of_name(name("mail"));
        let mut base = ObjectSnapshot::new(name("UserType")).with_oid("u-1");
        {
            let item = base.root.ensure_item(&name("mail"), ItemKind::Property);
            for v in &existing {
                item.add_value(Value::scalar(*v));
            }
        }

        let combined = {
            let mut od = ObjectDelta::modify(Some("u-1".into()), name("UserType"));
            od.add_modification(
                ItemDeltaBuilder::new(path.clone(), ItemKind::Property)
                    .add_all(adds.iter().map(|v| Value::scalar(*v)))
                    .delete_all(deletes.iter().map(|v| Value::scalar(*v)))
                    .build()
                    .unwrap(),
            )
            .unwrap();
            od
        };
        let only = |build: fn(ItemDeltaBuilder, Vec<Value>) -> ItemDeltaBuilder, values: &[&str]| {
            let mut od = ObjectDelta::modify(Some("u-1".into()), name("UserType"));
            od.add_modification(
                build(
                    ItemDeltaBuilder::new(path.clone(), ItemKind::Property),
                    values.iter().map(|v| Value::scalar(*v)).collect(),
                )
                .build()
                .unwrap(),
            )
            .unwrap();
            od
        };
        let add_only = only(|b, vs| b.add_all(vs), &adds);
        let delete_only = only(|b, vs| b.delete_all(vs), &deletes);

        let mut combined_target = base.clone();
        apply(&combined, &mut combined_target, &NoDefinitions).unwrap();

        let mut add_first = base.clone();
        apply(&add_only, &mut add_first, &NoDefinitions).unwrap();
        apply(&delete_only, &mut add_first, &NoDefinitions).unwrap();

        let mut delete_first = base.clone();
        apply(&delete_only, &mut delete_first, &NoDefinitions).unwrap();
        apply(&add_only, &mut delete_first, &NoDefinitions).unwrap();

        prop_assert!(is_equivalent(&combined_target, &add_first));
        prop_assert!(is_equivalent(&combined_target, &delete_first));
    }
}
