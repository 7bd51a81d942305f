#[macro_export]
macro_rules! assert_structurally_eq {
    ($expected:expr, $actual:expr) => {{
        let expected = &$expected;
        let actual = &$actual;
        assert!(
            $crate::structurally_equal(expected, actual),
            "Views do not match.\nExpected: {}\nActual:   {}",
            expected,
            actual,
        );
    }};
}

#[macro_export]
macro_rules! assert_elements {
    ($view:expr, [$($x:expr),* $(,)?]) => {{
        let view = &$view;
        let expected: Vec<i64> = vec![$($x),*];
        assert_eq!(
            view.to_vec().unwrap(),
            expected,
            "Unexpected elements for {}",
            view,
        );
    }};
}
