use rand::Rng;

/// Scores closer than this are treated as a tie.
pub const TIE_EPSILON: f64 = 1e-9;

/// Lowest-score candidate. On a tie the incumbent is swapped out with
/// probability 0.5 so the first-shuffled candidate has no built-in advantage.
pub fn select_lowest<T, R, F>(
    candidates: impl IntoIterator<Item = T>,
    rng: &mut R,
    mut score: F,
) -> Option<T>
where
    R: Rng + ?Sized,
    F: FnMut(&T) -> f64,
{
    let mut best: Option<(T, f64)> = None;

    for candidate in candidates {
        let candidate_score = score(&candidate);
        let replace = match best.as_ref().map(|(_, s)| *s) {
            None => true,
            Some(best_score) => {
                candidate_score < best_score - TIE_EPSILON
                    || ((candidate_score - best_score).abs() < TIE_EPSILON && rng.gen_bool(0.5))
            }
        };
        if replace {
            best = Some((candidate, candidate_score));
        }
    }

    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn empty_list_selects_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_lowest(Vec::<u32>::new(), &mut rng, |_| 0.0), None);
    }

    #[test]
    fn strictly_lowest_score_always_wins() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..50 {
            let picked = select_lowest(vec![5, 1, 3], &mut rng, |c| f64::from(*c));
            assert_eq!(picked, Some(1));
        }
    }

    #[test]
    fn ties_are_broken_both_ways() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen_first = false;
        let mut seen_second = false;
        for _ in 0..200 {
            match select_lowest(vec!["x", "y"], &mut rng, |_| 2.0) {
                Some("x") => seen_first = true,
                Some("y") => seen_second = true,
                other => panic!("unexpected pick {other:?}"),
            }
        }
        assert!(seen_first && seen_second);
    }
}
