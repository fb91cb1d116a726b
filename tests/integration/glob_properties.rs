//! Property-based tests for document search patterns

use graphql_typegen::documents::GlobPattern;
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,8}"
}

proptest! {
    #[test]
    fn test_recursive_pattern_matches_any_depth(
        dirs in prop::collection::vec(segment(), 0..4),
        name in segment(),
    ) {
        let glob = GlobPattern::new("./src/**/*.{ts,tsx}").unwrap();
        let mut parts = vec!["src".to_string()];
        parts.extend(dirs);

        let ts = format!("{}/{}.ts", parts.join("/"), name);
        let tsx = format!("{}/{}.tsx", parts.join("/"), name);
        let js = format!("{}/{}.js", parts.join("/"), name);
        prop_assert!(glob.is_match(&ts));
        let dotted_tsx = format!("./{}", tsx);
        prop_assert!(glob.is_match(&dotted_tsx));
        prop_assert!(!glob.is_match(&js));
    }

    #[test]
    fn test_single_star_never_crosses_directories(
        dir in segment(),
        name in segment(),
    ) {
        let glob = GlobPattern::new("queries/*.graphql").unwrap();
        let direct = format!("queries/{}.graphql", name);
        let nested = format!("queries/{}/{}.graphql", dir, name);
        prop_assert!(glob.is_match(&direct));
        prop_assert!(!glob.is_match(&nested));
    }

    #[test]
    fn test_literal_characters_are_not_regex(name in "[a-z]{1,8}") {
        let glob = GlobPattern::new(&format!("src/{}.graphql", name)).unwrap();
        let dotted = format!("src/{}.graphql", name);
        let wildcard = format!("src/{}xgraphql", name);
        prop_assert!(glob.is_match(&dotted));
        prop_assert!(!glob.is_match(&wildcard));
    }
}
