use uuid::Uuid;

/// Every unordered pair of distinct submissions, each in canonical `(low, high)` order.
pub fn all_pairs(submissions: &[Uuid]) -> Vec<(Uuid, Uuid)> {
    let mut ids = submissions.to_vec();
    ids.sort();
    ids.dedup();

    let mut pairs = Vec::with_capacity(pair_count(ids.len()));
    for (i, low) in ids.iter().enumerate() {
        for high in &ids[i + 1..] {
            pairs.push((*low, *high));
        }
    }
    pairs
}

pub fn pair_count(submissions: usize) -> usize {
    submissions * submissions.saturating_sub(1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_pairs_is_complete_and_canonical() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let pairs = all_pairs(&ids);

        assert_eq!(pairs.len(), pair_count(5));
        assert_eq!(pairs.len(), 10);
        assert!(pairs.iter().all(|(low, high)| low < high));
        let unique: HashSet<_> = pairs.iter().collect();
        assert_eq!(unique.len(), pairs.len());
    }

    #[test]
    fn test_degenerate_fields() {
        assert!(all_pairs(&[]).is_empty());
        assert!(all_pairs(&[Uuid::new_v4()]).is_empty());
        let id = Uuid::new_v4();
        assert!(all_pairs(&[id, id]).is_empty());
        assert_eq!(pair_count(0), 0);
        assert_eq!(pair_count(30), 435);
    }
}
