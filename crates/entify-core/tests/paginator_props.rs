//! Property tests for page windows.

use entify_core::Paginator;
use proptest::prelude::*;

proptest! {
    #[test]
    fn windows_stay_within_bounds(
        page in 1usize..200,
        per_page in 1usize..50,
        total in 0usize..5_000,
        previous in 0usize..10,
        next in 0usize..10,
    ) {
        let paginator = Paginator::new(page, per_page, total).unwrap();
        let info = paginator.to_page_info_with(0, previous, next);

        prop_assert!(info.previous_pages.len() <= previous);
        prop_assert!(info.next_pages.len() <= next);
        prop_assert!(info.previous_pages.iter().all(|p| *p >= 1 && *p < page));
        prop_assert!(info.next_pages.iter().all(|p| *p > page && *p <= paginator.last_page()));
        prop_assert!(info.previous_pages.windows(2).all(|pair| pair[1] == pair[0] + 1));
        prop_assert!(info.next_pages.windows(2).all(|pair| pair[1] == pair[0] + 1));
    }

    #[test]
    fn page_arithmetic_matches_definition(
        page in 1usize..200,
        per_page in 1usize..50,
        total in 0usize..5_000,
        current in 0usize..50,
    ) {
        let paginator = Paginator::new(page, per_page, total).unwrap();
        prop_assert_eq!(paginator.offset(), (page - 1) * per_page);
        prop_assert!(paginator.last_page() * per_page >= total);
        prop_assert!(paginator.last_page() == 0 || (paginator.last_page() - 1) * per_page < total);

        let info = paginator.to_page_info(current);
        prop_assert_eq!(info.from, paginator.offset() + 1);
        prop_assert_eq!(info.to, paginator.offset() + current);
    }
}
