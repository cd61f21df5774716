//! Hero product pinning.
//!
//! Administrators configure an ordered list of "hero" product ids. When any
//! of them appear in a result set they are moved to the front, in list
//! order, while every other document keeps its relevance order. Heroes that
//! did not match the query are never injected.

use std::collections::HashSet;

use crate::document::ProductDocument;

/// Parse a comma-separated hero list (`"5, 2,x,5"` → `[5, 2]`).
///
/// Whitespace is trimmed, unparseable entries are skipped and duplicates
/// keep their first position.
pub fn parse_hero_products(raw: &str) -> Vec<i64> {
    let mut seen = HashSet::new();
    raw.split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            match part.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(entry = %part, "ignoring invalid hero product id");
                    None
                }
            }
        })
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Move hero items to the front of `items`, in hero-list order.
///
/// Walks the hero list from last to first; each hero found at a position
/// greater than zero is shifted to index 0. Non-hero items keep their
/// relative order and applying the same list twice changes nothing.
pub fn pin_hero_products<T>(items: &mut [T], heroes: &[i64], id_of: impl Fn(&T) -> i64) {
    for hero in heroes.iter().rev() {
        if let Some(pos) = items.iter().position(|item| id_of(item) == *hero) {
            if pos > 0 {
                items[..=pos].rotate_right(1);
            }
        }
    }
}

/// [`pin_hero_products`] for engine documents.
pub fn pin_documents(documents: &mut [ProductDocument], heroes: &[i64]) {
    if heroes.is_empty() || documents.is_empty() {
        return;
    }
    pin_hero_products(documents, heroes, |doc| doc.id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinned(mut ids: Vec<i64>, heroes: &[i64]) -> Vec<i64> {
        pin_hero_products(&mut ids, heroes, |id| *id);
        ids
    }

    #[test]
    fn test_parse_hero_products() {
        assert_eq!(parse_hero_products("5,2"), vec![5, 2]);
        assert_eq!(parse_hero_products(" 5 , x, 2,,5 "), vec![5, 2]);
        assert!(parse_hero_products("").is_empty());
    }

    #[test]
    fn test_pin_moves_heroes_to_front_in_list_order() {
        assert_eq!(pinned(vec![1, 2, 3, 5, 4], &[5, 2]), vec![5, 2, 1, 3, 4]);
    }

    #[test]
    fn test_heroes_in_reverse_relative_order() {
        assert_eq!(pinned(vec![5, 1, 2], &[2, 5]), vec![2, 5, 1]);
        assert_eq!(pinned(vec![3, 4, 2, 5], &[2, 5]), vec![2, 5, 3, 4]);
    }

    #[test]
    fn test_adjacent_heroes() {
        assert_eq!(pinned(vec![2, 5, 3], &[5, 2]), vec![5, 2, 3]);
        assert_eq!(pinned(vec![1, 5, 2, 3], &[5, 2]), vec![5, 2, 1, 3]);
        assert_eq!(pinned(vec![5, 2, 3], &[5, 2]), vec![5, 2, 3]);
    }

    #[test]
    fn test_pin_is_idempotent() {
        let once = pinned(vec![1, 2, 3, 5, 4], &[5, 2]);
        assert_eq!(pinned(once.clone(), &[5, 2]), once);
    }

    #[test]
    fn test_missing_heroes_are_not_injected() {
        assert_eq!(pinned(vec![1, 2, 3], &[9, 3]), vec![3, 1, 2]);
        assert_eq!(pinned(vec![1, 2, 3], &[9]), vec![1, 2, 3]);
    }

    #[test]
    fn test_hero_already_first_stays() {
        assert_eq!(pinned(vec![7, 1, 2], &[7]), vec![7, 1, 2]);
        assert_eq!(pinned(vec![], &[7]), Vec::<i64>::new());
    }

    #[test]
    fn test_pin_documents() {
        let mut docs: Vec<ProductDocument> = [1, 2, 3]
            .into_iter()
            .map(|id| ProductDocument {
                id,
                ..Default::default()
            })
            .collect();
        pin_documents(&mut docs, &[3]);
        assert_eq!(docs.iter().map(|d| d.id).collect::<Vec<_>>(), vec![3, 1, 2]);
    }
}
