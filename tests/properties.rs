//! Properties of highlighting, filtering and sorting over generated inputs.

use std::cmp::Ordering;
use std::ptr;

use paper_browser::query::compare_titles;
use paper_browser::{highlight, project, Criteria, Paper, Segment, SortKey, YearBounds};
use proptest::prelude::*;

fn term_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "\\PC{0,4}",
        "[.*+?()\\[\\]{}|^$\\\\]{1,4}",
        prop::sample::select(vec!["ß", "ΟΔΟΣ", "σ", "İ", "K", "é"]).prop_map(str::to_string),
    ]
}

fn paper_strategy() -> impl Strategy<Value = Paper> {
    (
        0i64..50,
        prop::sample::select(vec!["", "Same", "same", " Same", "Étude", "etude", "Zebra", "abc", "ABD"]),
        prop::option::of("[a-cA-C ]{0,5}"),
        prop::option::of(2000i32..2004),
    )
        .prop_map(|(id, title, authors, year)| {
            let mut paper = Paper::new(id, title);
            paper.authors = authors;
            paper.publication_year = year;
            paper
        })
}

fn sort_key_strategy() -> impl Strategy<Value = SortKey> {
    prop::sample::select(vec![SortKey::Newest, SortKey::Oldest, SortKey::Title, SortKey::Unsorted])
}

fn criteria_strategy() -> impl Strategy<Value = Criteria> {
    (
        "[a-cA-C]{0,2}",
        "[a-cA-C]{0,2}",
        prop::option::of(1999i32..2005),
        prop::option::of(1999i32..2005),
        sort_key_strategy(),
    )
        .prop_map(|(title, author, min, max, sort_key)| Criteria {
            title_search: title,
            author_search: author,
            year_bounds: YearBounds::new(min, max),
            sort_key,
        })
}

/// Whether `sub` appears in `full` in the same order, compared by address.
fn is_subsequence(sub: &[&Paper], full: &[&Paper]) -> bool {
    let mut rest = full.iter();
    sub.iter().all(|p| rest.any(|q| ptr::eq(*p, *q)))
}

fn index_of(records: &[Paper], paper: &Paper) -> usize {
    records
        .iter()
        .position(|r| ptr::eq(r, paper))
        .unwrap_or(usize::MAX)
}

fn ties(sort_key: SortKey, a: &Paper, b: &Paper) -> bool {
    match sort_key {
        SortKey::Newest | SortKey::Oldest => a.publication_year == b.publication_year,
        SortKey::Title => compare_titles(&a.title, &b.title) == Ordering::Equal,
        SortKey::Unsorted => true,
    }
}

proptest! {
    #[test]
    fn test_highlight_segments_rebuild_text(text in "\\PC{0,40}", term in term_strategy()) {
        let segments = highlight(&text, &term);
        let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
        prop_assert_eq!(&joined, &text);

        if text.is_empty() || term.is_empty() {
            prop_assert_eq!(segments, vec![Segment::plain(text.as_str())]);
        } else {
            prop_assert!(segments.iter().all(|s| !s.text.is_empty()));
            prop_assert!(segments.windows(2).all(|w| w[0].matched || w[1].matched));
        }
    }

    #[test]
    fn test_highlight_finds_embedded_term(
        prefix in "[a-z ]{0,8}",
        term in "\\PC{1,4}",
        suffix in "[a-z ]{0,8}",
    ) {
        let text = format!("{}{}{}", prefix, term, suffix);
        prop_assert!(highlight(&text, &term).iter().any(|s| s.matched));
    }

    #[test]
    fn test_extra_clause_never_grows_projection(
        records in prop::collection::vec(paper_strategy(), 0..20),
        base in criteria_strategy(),
        extra in "[a-cA-C]{1,2}",
        year in 1999i32..2005,
    ) {
        let full = project(&records, &base);

        let mut narrower = vec![
            Criteria { title_search: format!("{}{}", base.title_search, extra), ..base.clone() },
            Criteria { author_search: format!("{}{}", base.author_search, extra), ..base.clone() },
        ];
        let mut tighter_min = base.clone();
        tighter_min.year_bounds.min = Some(base.year_bounds.min.map_or(year, |m| m.max(year)));
        narrower.push(tighter_min);
        let mut tighter_max = base.clone();
        tighter_max.year_bounds.max = Some(base.year_bounds.max.map_or(year, |m| m.min(year)));
        narrower.push(tighter_max);

        for criteria in &narrower {
            let out = project(&records, criteria);
            prop_assert!(out.len() <= full.len());
            prop_assert!(is_subsequence(&out, &full), "criteria {:?}", criteria);
        }
    }

    #[test]
    fn test_sort_keeps_input_order_for_ties(
        records in prop::collection::vec(paper_strategy(), 0..20),
        sort_key in sort_key_strategy(),
    ) {
        let out = project(&records, &Criteria::new().with_sort(sort_key));
        prop_assert_eq!(out.len(), records.len());

        for (i, a) in out.iter().enumerate() {
            for b in &out[i + 1..] {
                if ties(sort_key, a, b) {
                    prop_assert!(index_of(&records, a) < index_of(&records, b));
                }
            }
        }
    }
}
