use std::collections::BTreeMap;

use layered_theme::{MemoryLoader, ThemeEngine, Value, DEFAULT_SOURCE_NAME};
use proptest::prelude::*;

fn document(constants: &BTreeMap<String, i64>) -> Value {
    let section = constants
        .iter()
        .map(|(name, value)| (name.clone(), Value::Integer(*value)))
        .collect::<BTreeMap<_, _>>();
    let mut root = BTreeMap::new();
    root.insert("constants".to_string(), Value::Map(section));
    Value::Map(root)
}

fn engine(
    default: &BTreeMap<String, i64>,
    alternates: &[BTreeMap<String, i64>],
) -> ThemeEngine {
    let mut loader = MemoryLoader::new().with_value(DEFAULT_SOURCE_NAME, document(default));
    let mut names = Vec::new();
    for (i, constants) in alternates.iter().enumerate() {
        let name = format!("alt{}", i);
        loader = loader.with_value(name.clone(), document(constants));
        names.push(name);
    }
    ThemeEngine::builder()
        .loader(loader)
        .alternates(names)
        .build()
        .unwrap()
}

fn constants() -> impl Strategy<Value = BTreeMap<String, i64>> {
    prop::collection::btree_map("[a-e]", any::<i64>(), 0..5)
}

proptest! {
    #[test]
    fn literal_constants_follow_source_order(
        default in constants(),
        alternates in prop::collection::vec(constants(), 0..3),
    ) {
        let engine = engine(&default, &alternates);

        for name in ["a", "b", "c", "d", "e"] {
            let expected = alternates
                .iter()
                .find_map(|constants| constants.get(name))
                .or_else(|| default.get(name));

            match expected {
                Some(value) => {
                    prop_assert_eq!(engine.constant(name).unwrap(), Value::Integer(*value));
                }
                None => {
                    prop_assert!(engine.constant(name).is_err());
                }
            }
        }
    }

    #[test]
    fn clearing_alternates_reverts_to_default(
        default in constants(),
        alternate in constants(),
    ) {
        let engine = engine(&default, &[alternate]);
        engine.set_alternates::<&str>(&[]).unwrap();

        for (name, value) in &default {
            prop_assert_eq!(engine.constant(name).unwrap(), Value::Integer(*value));
        }
    }

    #[test]
    fn overrides_win_and_reset_restores(
        default in constants(),
        name in "[a-e]",
        value in any::<i64>(),
    ) {
        let engine = engine(&default, &[]);
        let before = engine.constant(&name).ok();

        engine.modify_constant(&name, value);
        prop_assert_eq!(engine.constant(&name).unwrap(), Value::Integer(value));

        engine.reset().unwrap();
        prop_assert_eq!(engine.constant(&name).ok(), before);
    }
}
